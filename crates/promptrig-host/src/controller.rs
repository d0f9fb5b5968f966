//! Orchestrates run execution: the only place that mints run ids, requests
//! cancellation, and folds events into the aggregate.
//!
//! The controller is the single writer. Pump tasks only produce events into
//! the bounded channel; every fold happens on the controller's event path,
//! one event to completion at a time, so transitions are atomic with
//! respect to each other.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::StreamExt as _;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use promptrig_core::{
    EventCorrelator, PromptId, ResultId, ResultShell, RunAggregate, RunEvent, RunId, RunSnapshot,
    RunView, fold, project,
};

use crate::executor::{ExecRequest, RunExecutor, RunInit};

/// Error string reported when a run ends because the user stopped it.
pub const CANCELLED_RUN_ERROR: &str = "Prompt run cancelled.";

const EVENT_BUFFER_CAPACITY: usize = 128;

/// Errors returned by controller commands.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    /// Clear/restore are only permitted while no run is in flight.
    #[error("a run is currently in flight")]
    RunInFlight,
}

/// Per-run UI toggles that reset whenever a new run starts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransientUi {
    collapsed: HashSet<ResultId>,
    active_result: usize,
}

impl TransientUi {
    pub fn reset(&mut self) {
        self.collapsed.clear();
        self.active_result = 0;
    }

    /// Flips the collapsed state for a result panel; returns the new state.
    pub fn toggle_collapsed(&mut self, id: &ResultId) -> bool {
        if self.collapsed.remove(id) {
            false
        } else {
            self.collapsed.insert(id.clone());
            true
        }
    }

    pub fn is_collapsed(&self, id: &ResultId) -> bool {
        self.collapsed.contains(id)
    }

    pub fn collapsed(&self) -> &HashSet<ResultId> {
        &self.collapsed
    }

    pub fn set_active_result(&mut self, index: usize) {
        self.active_result = index;
    }

    pub fn active_result(&self) -> usize {
        self.active_result
    }
}

struct CancelState {
    run_id: RunId,
    tx: watch::Sender<bool>,
    stopping: bool,
}

/// Owns the current-run reference, the aggregate, and the fold loop.
pub struct ExecutionController {
    executor: Arc<dyn RunExecutor>,
    correlator: EventCorrelator,
    aggregate: RunAggregate,
    ui: TransientUi,
    events_tx: mpsc::Sender<RunEvent>,
    events_rx: mpsc::Receiver<RunEvent>,
    view_tx: watch::Sender<RunView>,
    cancel: Option<CancelState>,
}

impl ExecutionController {
    pub fn new(prompt_id: PromptId, executor: Arc<dyn RunExecutor>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER_CAPACITY);
        let (view_tx, _) = watch::channel(RunView::default());
        Self {
            executor,
            correlator: EventCorrelator::new(prompt_id),
            aggregate: RunAggregate::idle(),
            ui: TransientUi::default(),
            events_tx,
            events_rx,
            view_tx,
            cancel: None,
        }
    }

    /// Starts a run, superseding any unterminated one.
    ///
    /// Mints the run id and result shells, resets transient UI state, and
    /// records the id as current before the executor can emit anything.
    /// Cancellation and executor start failures come back through the
    /// event channel as run-level errors rather than return values.
    pub fn start(&mut self, init: RunInit) -> RunId {
        if init.prompt_id != *self.correlator.prompt_id() {
            warn!(
                init_prompt = %init.prompt_id,
                tracked_prompt = %self.correlator.prompt_id(),
                "run init prompt does not match this controller; its events will be dropped"
            );
        }

        let run_id = RunId::random();
        let shells: Vec<ResultShell> = init
            .models
            .iter()
            .map(|spec| ResultShell {
                result_id: ResultId::random(),
                label: spec.label.clone(),
                run_label: spec.run_label.clone(),
                model: spec.model.clone(),
                streaming: spec.streaming,
            })
            .collect();

        self.ui.reset();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.cancel = Some(CancelState {
            run_id: run_id.clone(),
            tx: cancel_tx,
            stopping: false,
        });
        self.correlator.expect(run_id.clone());

        let request = ExecRequest {
            run_id: run_id.clone(),
            prompt_id: init.prompt_id,
            prompt_text: init.prompt_text,
            streaming: init.streaming,
            shells,
            run_settings: init.run_settings,
        };
        info!(run_id = %run_id, models = request.shells.len(), "starting prompt run");
        tokio::spawn(pump_task(
            self.executor.clone(),
            request,
            self.events_tx.clone(),
            cancel_rx,
        ));
        run_id
    }

    /// Requests cancellation of the current run.
    ///
    /// No-op when the id does not match the current run or a stop is
    /// already pending. Never mutates the aggregate: the run reaches its
    /// terminal state only through the resulting error event.
    pub fn stop(&mut self, run_id: &RunId) {
        let Some(cancel) = self.cancel.as_mut() else {
            return;
        };
        if cancel.run_id != *run_id || cancel.stopping {
            return;
        }
        cancel.stopping = true;
        info!(run_id = %run_id, "requesting run cancellation");
        let _ = cancel.tx.send(true);
    }

    pub fn is_stopping(&self) -> bool {
        self.cancel.as_ref().is_some_and(|cancel| cancel.stopping)
    }

    /// Resets to the idle state. Only permitted while no run is in flight,
    /// including the window before a started run's first event arrives.
    pub fn clear(&mut self) -> Result<RunView, ControllerError> {
        if self.run_in_flight() {
            return Err(ControllerError::RunInFlight);
        }
        self.aggregate = RunAggregate::idle();
        self.correlator.reset();
        self.cancel = None;
        self.ui.reset();
        Ok(self.publish())
    }

    /// Pre-fills the aggregate from a persisted snapshot, e.g. when a
    /// prompt panel reopens. Only permitted while no run is in flight; the
    /// next start event replaces the restored state wholesale.
    pub fn restore(&mut self, snapshot: RunSnapshot) -> Result<RunView, ControllerError> {
        if self.run_in_flight() {
            return Err(ControllerError::RunInFlight);
        }
        self.aggregate = RunAggregate::restore(snapshot);
        Ok(self.publish())
    }

    /// The aggregate alone cannot answer this: between `start` and the fold
    /// of the run's start event only the correlator knows about the run.
    fn run_in_flight(&self) -> bool {
        self.aggregate.is_live() || self.correlator.current_run_id().is_some()
    }

    /// Admits and folds one event, then publishes the refreshed view.
    ///
    /// This is the single-writer fold entry; hosts bridging their own event
    /// transport call it directly.
    pub fn apply(&mut self, event: RunEvent) -> RunView {
        if self
            .correlator
            .admit(&event, &self.aggregate)
            .is_admitted()
        {
            let state = std::mem::take(&mut self.aggregate);
            self.aggregate = fold(state, event);
        }
        self.publish()
    }

    /// Waits for the next pumped event and folds it.
    pub async fn next_view(&mut self) -> Option<RunView> {
        let event = self.events_rx.recv().await?;
        Some(self.apply(event))
    }

    /// Watch channel carrying the latest published view.
    pub fn subscribe(&self) -> watch::Receiver<RunView> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> RunView {
        project(&self.aggregate)
    }

    pub fn aggregate(&self) -> &RunAggregate {
        &self.aggregate
    }

    pub fn ui(&self) -> &TransientUi {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut TransientUi {
        &mut self.ui
    }

    fn publish(&mut self) -> RunView {
        let view = project(&self.aggregate);
        self.view_tx.send_replace(view.clone());
        view
    }
}

/// Forwards executor events into the controller's channel; a cancellation
/// request ends the run with a terminal run-level error event.
async fn pump_task(
    executor: Arc<dyn RunExecutor>,
    request: ExecRequest,
    tx: mpsc::Sender<RunEvent>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    let run_id = request.run_id.clone();
    let prompt_id = request.prompt_id.clone();

    let handle = match executor.start(request).await {
        Ok(handle) => handle,
        Err(err) => {
            warn!(run_id = %run_id, error = %err, "executor failed to start run");
            let _ = tx
                .send(RunEvent::Error {
                    run_id,
                    prompt_id,
                    result_id: None,
                    error: err.to_string(),
                    timestamp: now_ms(),
                })
                .await;
            return;
        }
    };

    let mut events = handle.events;
    loop {
        tokio::select! {
            changed = cancel_rx.changed() => {
                match changed {
                    Ok(()) if *cancel_rx.borrow() => {
                        debug!(run_id = %run_id, "cancellation observed, ending run");
                        let _ = tx
                            .send(RunEvent::Error {
                                run_id,
                                prompt_id,
                                result_id: None,
                                error: CANCELLED_RUN_ERROR.into(),
                                timestamp: now_ms(),
                            })
                            .await;
                        return;
                    }
                    Ok(()) => {}
                    // Controller replaced or dropped this run; stop pumping.
                    Err(_) => return,
                }
            }
            next = events.next() => {
                match next {
                    Some(event) => {
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    None => return,
                }
            }
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
