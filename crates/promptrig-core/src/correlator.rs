//! Admission filtering for incoming run events.
//!
//! The correlator is the only component that reads and writes the current
//! run id. Rejected events are expected races between a fast user and a
//! slow host, so they are dropped silently (debug-logged, never surfaced).

use std::collections::HashSet;

use tracing::debug;

use crate::aggregate::RunAggregate;
use crate::event::RunEvent;
use crate::model::{PromptId, RunId};

/// Outcome of offering an event to the correlator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Rejected(RejectReason),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Why an event was dropped before reaching the reducer.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    /// The event belongs to a different prompt instance.
    #[error("event prompt does not match the tracked prompt")]
    PromptMismatch,
    /// No run is currently tracked, so non-start events have nowhere to go.
    #[error("no live run is tracked")]
    NoLiveRun,
    /// The event references a superseded or already-cleared run.
    #[error("event run is stale")]
    StaleRun,
    /// A result-scoped event references a result the aggregate never saw.
    #[error("event references an unknown result")]
    UnknownResult,
}

/// Decides whether a lifecycle event applies to the currently tracked run.
#[derive(Debug)]
pub struct EventCorrelator {
    prompt_id: PromptId,
    current_run_id: Option<RunId>,
    /// Run ids that were superseded, completed, or cleared. One entry per
    /// user-initiated run, so the set stays small.
    retired: HashSet<RunId>,
}

impl EventCorrelator {
    pub fn new(prompt_id: PromptId) -> Self {
        Self {
            prompt_id,
            current_run_id: None,
            retired: HashSet::new(),
        }
    }

    pub fn prompt_id(&self) -> &PromptId {
        &self.prompt_id
    }

    pub fn current_run_id(&self) -> Option<&RunId> {
        self.current_run_id.as_ref()
    }

    /// Records a freshly minted run id as current before any of its events
    /// can arrive. Called by the execution controller on start; the
    /// previously tracked run, if any, is retired.
    pub fn expect(&mut self, run_id: RunId) {
        self.retire_current_except(&run_id);
        self.current_run_id = Some(run_id);
    }

    /// Drops the current-run reference, e.g. when the host clears state.
    /// The dropped run is retired so its stray events cannot come back.
    pub fn reset(&mut self) {
        self.retire_current();
    }

    /// Admits or rejects an event against the tracked run and aggregate.
    ///
    /// Admitting a start event atomically makes its run id current; this is
    /// the one case allowed to change identity. A start bearing a retired
    /// run id is a late echo of a dead run and is rejected as stale.
    /// Admitting a terminal event retires the current run so stray events
    /// for it are rejected from then on. `ResultCompleted` is exempt from
    /// the unknown-result check so the reducer can record results that
    /// never announced a shell.
    pub fn admit(&mut self, event: &RunEvent, aggregate: &RunAggregate) -> Admission {
        if let Admission::Rejected(reason) = self.check(event, aggregate) {
            debug!(
                run_id = %event.run_id(),
                prompt_id = %event.prompt_id(),
                %reason,
                "dropping run event"
            );
            return Admission::Rejected(reason);
        }

        if let RunEvent::Started { run_id, .. } = event {
            self.retire_current_except(run_id);
            self.current_run_id = Some(run_id.clone());
        } else if event.is_terminal() {
            self.retire_current();
        }
        Admission::Admitted
    }

    fn retire_current(&mut self) {
        if let Some(run_id) = self.current_run_id.take() {
            self.retired.insert(run_id);
        }
    }

    fn retire_current_except(&mut self, keep: &RunId) {
        if self.current_run_id.as_ref() == Some(keep) {
            return;
        }
        self.retire_current();
    }

    fn check(&self, event: &RunEvent, aggregate: &RunAggregate) -> Admission {
        if *event.prompt_id() != self.prompt_id {
            return Admission::Rejected(RejectReason::PromptMismatch);
        }

        // A start with a fresh run id always wins; it supersedes whatever
        // is currently tracked. A retired id must not resurrect its run.
        if matches!(event, RunEvent::Started { .. }) {
            if self.retired.contains(event.run_id()) {
                return Admission::Rejected(RejectReason::StaleRun);
            }
            return Admission::Admitted;
        }

        match &self.current_run_id {
            None => return Admission::Rejected(RejectReason::NoLiveRun),
            Some(current) if current != event.run_id() => {
                return Admission::Rejected(RejectReason::StaleRun);
            }
            Some(_) => {}
        }

        let targeted = match event {
            RunEvent::Update { result_id, .. } => Some(result_id),
            RunEvent::Error {
                result_id: Some(result_id),
                ..
            } => Some(result_id),
            _ => None,
        };
        if let Some(result_id) = targeted
            && aggregate.result(result_id).is_none()
        {
            return Admission::Rejected(RejectReason::UnknownResult);
        }

        Admission::Admitted
    }
}
