use serde::{Deserialize, Serialize};

use crate::event::{ResultData, ResultShell};
use crate::model::{ModelInfo, ResultId};

/// Note attached to a result whose model cannot stream while the run as a
/// whole requested streaming.
pub const NON_STREAMING_NOTE: &str =
    "This model does not stream; the full response will appear once it completes.";

/// Accumulated output and status for one model configuration within a run.
///
/// `label`, `run_label`, and `model` are fixed at creation. Once `loading`
/// flips to false the text and outcome fields are only ever touched again by
/// authoritative completion data, never by deltas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: ResultId,
    pub label: String,
    pub run_label: String,
    pub model: ModelInfo,
    /// Whether this result was expected to receive incremental deltas.
    pub streaming: bool,
    /// Ordered text chunks, append-only until finalization.
    pub text_parts: Vec<String>,
    /// Running accumulator while streaming; authoritative final text once a
    /// completion carries one.
    pub full_text: Option<String>,
    /// Tri-state outcome: `None` = pending.
    pub success: Option<bool>,
    pub error: Option<String>,
    pub loading: bool,
    pub non_streaming_note: Option<String>,
    #[serde(default)]
    pub metadata: ResultMetadata,
}

impl ResultRecord {
    /// Creates the pending record for a shell announced by a Started event.
    pub fn pending(shell: &ResultShell, run_streaming: bool) -> Self {
        let non_streaming_note =
            (run_streaming && !shell.streaming).then(|| NON_STREAMING_NOTE.to_string());
        Self {
            id: shell.result_id.clone(),
            label: shell.label.clone(),
            run_label: shell.run_label.clone(),
            model: shell.model.clone(),
            streaming: shell.streaming,
            text_parts: Vec::new(),
            full_text: None,
            success: None,
            error: None,
            loading: true,
            non_streaming_note,
            metadata: ResultMetadata::default(),
        }
    }

    /// Creates a record straight from completion data, for results that
    /// never announced a shell.
    pub fn from_completion(data: &ResultData) -> Self {
        let mut record = Self {
            id: data.result_id.clone(),
            label: data.label.clone(),
            run_label: data.run_label.clone(),
            model: data.model.clone().unwrap_or_default(),
            streaming: false,
            text_parts: Vec::new(),
            full_text: None,
            success: None,
            error: None,
            loading: true,
            non_streaming_note: None,
            metadata: ResultMetadata::default(),
        };
        record.finalize(data);
        record
    }

    /// Merges authoritative completion data and leaves the record terminal.
    ///
    /// Present text replaces the streamed accumulation (the empty string
    /// included); absent text keeps it. Re-applying the same data is
    /// idempotent.
    pub fn finalize(&mut self, data: &ResultData) {
        self.success = Some(data.success);
        if data.error.is_some() {
            self.error = data.error.clone();
        }
        self.metadata.merge(&ResultMetadata::of(data));
        if let Some(text) = &data.text {
            self.full_text = Some(text.clone());
            self.text_parts = vec![text.clone()];
        }
        self.loading = false;
    }

    /// Appends a streamed text chunk to the parts and the running
    /// accumulator. Callers guard `loading`; empty chunks are no-ops.
    pub fn append_chunk(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        self.text_parts.push(chunk.to_string());
        match &mut self.full_text {
            Some(acc) => acc.push_str(chunk),
            None => self.full_text = Some(chunk.to_string()),
        }
    }

    /// Display text: authoritative `full_text` when non-empty, else the
    /// joined parts, else empty.
    pub fn resolved_text(&self) -> String {
        match &self.full_text {
            Some(text) if !text.is_empty() => text.clone(),
            _ => self.text_parts.concat(),
        }
    }
}

/// Late-arriving per-result fields.
///
/// The JSON-valued fields are double-`Option`: `None` means "not yet
/// known", `Some(None)` is an explicit `null` ("known to be cleared"), and
/// both are preserved through a merge and a serde round trip.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "crate::event::nullable")]
    pub usage: Option<Option<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "crate::event::nullable")]
    pub total_usage: Option<Option<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "crate::event::nullable")]
    pub steps: Option<Option<serde_json::Value>>,
    pub finish_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "crate::event::nullable")]
    pub warnings: Option<Option<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "crate::event::nullable")]
    pub request: Option<Option<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "crate::event::nullable")]
    pub response: Option<Option<serde_json::Value>>,
}

impl ResultMetadata {
    /// Extracts the metadata slice of completion data.
    pub fn of(data: &ResultData) -> Self {
        Self {
            usage: data.usage.clone(),
            total_usage: data.total_usage.clone(),
            steps: data.steps.clone(),
            finish_reason: data.finish_reason.clone(),
            warnings: data.warnings.clone(),
            request: data.request.clone(),
            response: data.response.clone(),
        }
    }

    /// Overwrites only the fields present in `incoming`; absent fields keep
    /// their current value.
    pub fn merge(&mut self, incoming: &ResultMetadata) {
        if incoming.usage.is_some() {
            self.usage = incoming.usage.clone();
        }
        if incoming.total_usage.is_some() {
            self.total_usage = incoming.total_usage.clone();
        }
        if incoming.steps.is_some() {
            self.steps = incoming.steps.clone();
        }
        if incoming.finish_reason.is_some() {
            self.finish_reason = incoming.finish_reason.clone();
        }
        if incoming.warnings.is_some() {
            self.warnings = incoming.warnings.clone();
        }
        if incoming.request.is_some() {
            self.request = incoming.request.clone();
        }
        if incoming.response.is_some() {
            self.response = incoming.response.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shell(id: &str, streaming: bool) -> ResultShell {
        ResultShell {
            result_id: ResultId::new(id),
            label: format!("label-{id}"),
            run_label: format!("run-{id}"),
            model: ModelInfo::default(),
            streaming,
        }
    }

    #[test]
    fn pending_record_starts_loading_and_empty() {
        let record = ResultRecord::pending(&shell("res1", true), true);
        assert!(record.loading);
        assert!(record.text_parts.is_empty());
        assert_eq!(record.full_text, None);
        assert_eq!(record.success, None);
        assert_eq!(record.non_streaming_note, None);
    }

    #[test]
    fn non_streaming_note_set_when_run_streams_but_shell_does_not() {
        let record = ResultRecord::pending(&shell("res1", false), true);
        assert_eq!(record.non_streaming_note.as_deref(), Some(NON_STREAMING_NOTE));

        let record = ResultRecord::pending(&shell("res1", false), false);
        assert_eq!(record.non_streaming_note, None);
    }

    #[test]
    fn append_chunk_accumulates_parts_and_full_text() {
        let mut record = ResultRecord::pending(&shell("res1", true), true);
        record.append_chunk("Hel");
        record.append_chunk("");
        record.append_chunk("lo");
        assert_eq!(record.text_parts, vec!["Hel".to_string(), "lo".to_string()]);
        assert_eq!(record.full_text.as_deref(), Some("Hello"));
        assert_eq!(record.resolved_text(), "Hello");
    }

    #[test]
    fn resolved_text_falls_back_to_parts_when_full_text_empty() {
        let mut record = ResultRecord::pending(&shell("res1", true), true);
        record.text_parts = vec!["a".into(), "b".into()];
        record.full_text = Some(String::new());
        assert_eq!(record.resolved_text(), "ab");
    }

    #[test]
    fn finalize_replaces_streamed_text_with_authoritative_text() {
        let mut record = ResultRecord::pending(&shell("res1", true), true);
        record.append_chunk("Hello");
        let mut data = ResultData::new(ResultId::new("res1"), true);
        data.text = Some("Hello world".into());
        record.finalize(&data);
        assert!(!record.loading);
        assert_eq!(record.full_text.as_deref(), Some("Hello world"));
        assert_eq!(record.text_parts, vec!["Hello world".to_string()]);
    }

    #[test]
    fn finalize_without_text_keeps_streamed_accumulation() {
        let mut record = ResultRecord::pending(&shell("res1", true), true);
        record.append_chunk("streamed");
        let data = ResultData::new(ResultId::new("res1"), true);
        record.finalize(&data);
        assert_eq!(record.resolved_text(), "streamed");
        assert_eq!(record.success, Some(true));
    }

    #[test]
    fn metadata_merge_keeps_absent_fields_and_takes_explicit_null() {
        let mut current = ResultMetadata {
            usage: Some(Some(json!({"tokens": 3}))),
            finish_reason: Some("stop".into()),
            ..ResultMetadata::default()
        };
        let incoming = ResultMetadata {
            usage: Some(None),
            warnings: Some(Some(json!(["w"]))),
            ..ResultMetadata::default()
        };
        current.merge(&incoming);
        assert_eq!(current.usage, Some(None));
        assert_eq!(current.warnings, Some(Some(json!(["w"]))));
        assert_eq!(current.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn metadata_null_and_absent_survive_a_json_round_trip() {
        let metadata = ResultMetadata {
            usage: Some(None),
            warnings: Some(Some(json!(["w"]))),
            ..ResultMetadata::default()
        };
        let json = serde_json::to_value(&metadata).expect("serialize");
        assert_eq!(json["usage"], serde_json::Value::Null);
        assert!(json.as_object().expect("object").get("steps").is_none());

        let back: ResultMetadata = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, metadata);
    }
}
