//! Persistable snapshot of a run's results.
//!
//! A host layer saves the last projection-equivalent state per prompt
//! instance and restores it into a fresh aggregate before the first start
//! event, so previous results reappear across sessions. How snapshots are
//! keyed and stored is the host's business.

use serde::{Deserialize, Serialize};

use crate::aggregate::RunAggregate;
use crate::model::{ModelInfo, PromptId, ResultId};
use crate::record::{ResultMetadata, ResultRecord};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub prompt_id: Option<PromptId>,
    pub completed_at: Option<u64>,
    pub error: Option<String>,
    pub results: Vec<ResultSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultSnapshot {
    pub id: ResultId,
    pub label: String,
    pub run_label: String,
    pub model: ModelInfo,
    pub text: String,
    pub success: Option<bool>,
    pub error: Option<String>,
    pub non_streaming_note: Option<String>,
    #[serde(default)]
    pub metadata: ResultMetadata,
}

impl RunSnapshot {
    /// Captures the displayable remains of an aggregate. In-flight loading
    /// state is deliberately not preserved; a snapshot is always settled.
    pub fn capture(aggregate: &RunAggregate) -> Self {
        Self {
            prompt_id: aggregate.prompt_id.clone(),
            completed_at: aggregate.completed_at,
            error: aggregate.error.clone(),
            results: aggregate
                .results
                .iter()
                .map(|record| ResultSnapshot {
                    id: record.id.clone(),
                    label: record.label.clone(),
                    run_label: record.run_label.clone(),
                    model: record.model.clone(),
                    text: record.resolved_text(),
                    success: record.success,
                    error: record.error.clone(),
                    non_streaming_note: record.non_streaming_note.clone(),
                    metadata: record.metadata.clone(),
                })
                .collect(),
        }
    }
}

impl RunAggregate {
    /// Rebuilds a non-live aggregate from a snapshot: no run id, every
    /// record finalized, display order matching the snapshot. The next
    /// start event replaces it wholesale as usual.
    pub fn restore(snapshot: RunSnapshot) -> Self {
        let order: Vec<ResultId> = snapshot
            .results
            .iter()
            .map(|result| result.id.clone())
            .collect();
        Self {
            run_id: None,
            prompt_id: snapshot.prompt_id,
            streaming: false,
            started_at: None,
            completed_at: snapshot.completed_at,
            error: snapshot.error,
            order,
            results: snapshot
                .results
                .into_iter()
                .map(|result| ResultRecord {
                    id: result.id,
                    label: result.label,
                    run_label: result.run_label,
                    model: result.model,
                    streaming: false,
                    full_text: Some(result.text.clone()),
                    text_parts: vec![result.text],
                    success: result.success,
                    error: result.error,
                    loading: false,
                    non_streaming_note: result.non_streaming_note,
                    metadata: result.metadata,
                })
                .collect(),
        }
    }
}
