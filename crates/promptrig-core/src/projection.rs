//! Display-ready view derived from a `RunAggregate`.
//!
//! Stateless and recomputed after every fold; never mutates the aggregate
//! and never panics on inconsistent data (a missing record yields a
//! placeholder entry instead).

use serde::{Deserialize, Serialize};

use crate::aggregate::RunAggregate;
use crate::model::{ModelInfo, ResultId, RunId};
use crate::record::{ResultMetadata, ResultRecord};

/// Ordered, display-ready view of one run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunView {
    pub run_id: Option<RunId>,
    pub started_at: Option<u64>,
    pub completed_at: Option<u64>,
    /// Run-level error, rendered once at the run's scope.
    pub error: Option<String>,
    pub in_flight: bool,
    pub results: Vec<ResultView>,
}

/// One row of the view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultView {
    pub id: ResultId,
    pub label: String,
    pub run_label: String,
    pub model: ModelInfo,
    /// Finalized or partially streamed text.
    pub text: String,
    pub loading: bool,
    pub success: Option<bool>,
    pub error: Option<String>,
    pub non_streaming_note: Option<String>,
    pub metadata: ResultMetadata,
    /// True for the synthetic placeholder emitted when `order` names a
    /// result the aggregate has no record for.
    pub missing: bool,
}

impl ResultView {
    fn of(record: &ResultRecord) -> Self {
        Self {
            id: record.id.clone(),
            label: record.label.clone(),
            run_label: record.run_label.clone(),
            model: record.model.clone(),
            text: record.resolved_text(),
            loading: record.loading,
            success: record.success,
            error: record.error.clone(),
            non_streaming_note: record.non_streaming_note.clone(),
            metadata: record.metadata.clone(),
            missing: false,
        }
    }

    fn missing(id: &ResultId) -> Self {
        Self {
            id: id.clone(),
            label: String::new(),
            run_label: String::new(),
            model: ModelInfo::default(),
            text: String::new(),
            loading: false,
            success: None,
            error: Some("result data unavailable".into()),
            non_streaming_note: None,
            metadata: ResultMetadata::default(),
            missing: true,
        }
    }
}

/// Maps the aggregate into its view: `order` first, then any records the
/// run never announced, in insertion order.
pub fn project(aggregate: &RunAggregate) -> RunView {
    let mut results: Vec<ResultView> = aggregate
        .order
        .iter()
        .map(|id| match aggregate.result(id) {
            Some(record) => ResultView::of(record),
            None => ResultView::missing(id),
        })
        .collect();
    results.extend(
        aggregate
            .results
            .iter()
            .filter(|record| !aggregate.order.contains(&record.id))
            .map(ResultView::of),
    );

    RunView {
        run_id: aggregate.run_id.clone(),
        started_at: aggregate.started_at,
        completed_at: aggregate.completed_at,
        error: aggregate.error.clone(),
        in_flight: aggregate.is_live(),
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ResultData, ResultShell, RunEvent, UpdateDelta};
    use crate::model::PromptId;
    use crate::reducer::fold;

    fn shell(id: &str) -> ResultShell {
        ResultShell {
            result_id: ResultId::new(id),
            label: format!("label-{id}"),
            run_label: format!("run-{id}"),
            model: ModelInfo::default(),
            streaming: true,
        }
    }

    fn running(ids: &[&str]) -> RunAggregate {
        fold(
            RunAggregate::idle(),
            RunEvent::Started {
                run_id: RunId::new("r1"),
                prompt_id: PromptId::new("p1"),
                timestamp: 1,
                streaming: true,
                results: ids.iter().map(|id| shell(id)).collect(),
                run_settings: None,
            },
        )
    }

    #[test]
    fn idle_aggregate_projects_to_an_empty_view() {
        let view = project(&RunAggregate::idle());
        assert_eq!(view, RunView::default());
    }

    #[test]
    fn view_follows_display_order_with_partial_text() {
        let state = running(&["res1", "res2"]);
        let state = fold(
            state,
            RunEvent::Update {
                run_id: RunId::new("r1"),
                prompt_id: PromptId::new("p1"),
                result_id: ResultId::new("res2"),
                timestamp: 2,
                delta: UpdateDelta::Text { text: "Hel".into() },
            },
        );
        let view = project(&state);
        assert!(view.in_flight);
        assert_eq!(view.results.len(), 2);
        assert_eq!(view.results[0].id, ResultId::new("res1"));
        assert_eq!(view.results[0].text, "");
        assert!(view.results[0].loading);
        assert_eq!(view.results[1].text, "Hel");
    }

    #[test]
    fn missing_record_becomes_a_placeholder() {
        let mut state = running(&["res1"]);
        state.results.clear();
        let view = project(&state);
        assert_eq!(view.results.len(), 1);
        assert!(view.results[0].missing);
        assert!(!view.results[0].loading);
    }

    #[test]
    fn unannounced_records_follow_in_insertion_order() {
        let state = running(&["res1"]);
        let mut ghost = ResultData::new(ResultId::new("ghost"), true);
        ghost.text = Some("late".into());
        let state = fold(
            state,
            RunEvent::ResultCompleted {
                run_id: RunId::new("r1"),
                prompt_id: PromptId::new("p1"),
                timestamp: 2,
                result: ghost,
            },
        );
        let view = project(&state);
        assert_eq!(view.results.len(), 2);
        assert_eq!(view.results[0].id, ResultId::new("res1"));
        assert_eq!(view.results[1].id, ResultId::new("ghost"));
        assert_eq!(view.results[1].text, "late");
        assert!(!view.results[1].missing);
    }
}
