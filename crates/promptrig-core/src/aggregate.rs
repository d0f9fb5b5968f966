use serde::{Deserialize, Serialize};

use crate::model::{PromptId, ResultId, RunId};
use crate::record::ResultRecord;

/// The set of result records belonging to one run plus run-level timing,
/// error, and streaming flags.
///
/// Created idle, populated wholesale when a start event is admitted, mutated
/// field-by-field as later events are folded in, and replaced entirely on
/// clear or supersession. Exactly one writer (the reducer) mutates it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunAggregate {
    /// Identifier assigned at start; `None` while idle.
    pub run_id: Option<RunId>,
    pub prompt_id: Option<PromptId>,
    /// Run-level streaming intent; individual records may differ.
    pub streaming: bool,
    pub started_at: Option<u64>,
    pub completed_at: Option<u64>,
    /// Records in insertion order. Display order lives in `order`; records
    /// appended after start (never-announced results) simply follow it.
    pub results: Vec<ResultRecord>,
    /// Display order fixed at start, never reordered.
    pub order: Vec<ResultId>,
    /// Run-level error, distinct from any per-result error.
    pub error: Option<String>,
}

impl RunAggregate {
    /// The idle aggregate shown before any run has started.
    pub fn idle() -> Self {
        Self::default()
    }

    /// True while a run has started but not reached a terminal state.
    pub fn is_live(&self) -> bool {
        self.run_id.is_some() && self.completed_at.is_none()
    }

    pub fn result(&self, id: &ResultId) -> Option<&ResultRecord> {
        self.results.iter().find(|record| record.id == *id)
    }

    pub fn result_mut(&mut self, id: &ResultId) -> Option<&mut ResultRecord> {
        self.results.iter_mut().find(|record| record.id == *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_aggregate_is_not_live() {
        let aggregate = RunAggregate::idle();
        assert_eq!(aggregate.run_id, None);
        assert!(aggregate.results.is_empty());
        assert!(aggregate.order.is_empty());
        assert!(!aggregate.is_live());
    }

    #[test]
    fn live_until_completed() {
        let mut aggregate = RunAggregate {
            run_id: Some(RunId::new("r1")),
            ..RunAggregate::idle()
        };
        assert!(aggregate.is_live());
        aggregate.completed_at = Some(10);
        assert!(!aggregate.is_live());
    }
}
