use serde::{Deserialize, Serialize};

use crate::model::{ModelInfo, PromptId, ResultId, RunId};

/// Serde codec for double-`Option` fields where a JSON `null` and an absent
/// key mean different things: `None` = key absent (not yet known),
/// `Some(None)` = explicit `null` (known to be cleared), `Some(Some(v))` =
/// value. Pair with `#[serde(default, skip_serializing_if = "Option::is_none")]`.
pub(crate) mod nullable {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(field: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match field {
            Some(value) => value.serialize(serializer),
            // Unreachable under skip_serializing_if.
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Lifecycle events emitted by an execution host for an in-flight run.
///
/// This is the complete, transport-agnostic event contract consumed by the
/// aggregator. The enum is deliberately closed: every consumer matches it
/// exhaustively, so adding a kind is a compile-time obligation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// A run was accepted by the host; one shell per model configuration.
    Started {
        run_id: RunId,
        prompt_id: PromptId,
        timestamp: u64,
        /// Run-level streaming intent. Individual shells may still opt out.
        streaming: bool,
        results: Vec<ResultShell>,
        run_settings: Option<serde_json::Value>,
    },
    /// Incremental content for a single result.
    Update {
        run_id: RunId,
        prompt_id: PromptId,
        result_id: ResultId,
        timestamp: u64,
        delta: UpdateDelta,
    },
    /// Authoritative final data for a single result; siblings keep running.
    ResultCompleted {
        run_id: RunId,
        prompt_id: PromptId,
        timestamp: u64,
        result: ResultData,
    },
    /// Terminal success/failure summary for the whole run.
    Completed {
        run_id: RunId,
        prompt_id: PromptId,
        timestamp: u64,
        success: bool,
        results: Vec<ResultData>,
    },
    /// A failure scoped to one result (`result_id` present) or to the whole
    /// run (`result_id` absent).
    Error {
        run_id: RunId,
        prompt_id: PromptId,
        result_id: Option<ResultId>,
        error: String,
        timestamp: u64,
    },
}

impl RunEvent {
    /// Returns the run this event belongs to.
    pub fn run_id(&self) -> &RunId {
        match self {
            Self::Started { run_id, .. }
            | Self::Update { run_id, .. }
            | Self::ResultCompleted { run_id, .. }
            | Self::Completed { run_id, .. }
            | Self::Error { run_id, .. } => run_id,
        }
    }

    /// Returns the prompt instance this event belongs to.
    pub fn prompt_id(&self) -> &PromptId {
        match self {
            Self::Started { prompt_id, .. }
            | Self::Update { prompt_id, .. }
            | Self::ResultCompleted { prompt_id, .. }
            | Self::Completed { prompt_id, .. }
            | Self::Error { prompt_id, .. } => prompt_id,
        }
    }

    /// True for events that end the run (`Completed`, or `Error` with no
    /// result scope).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Error { result_id: None, .. }
        )
    }
}

/// Pending-result announcement carried by `RunEvent::Started`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultShell {
    pub result_id: ResultId,
    pub label: String,
    pub run_label: String,
    pub model: ModelInfo,
    /// Whether this particular result is expected to stream deltas.
    pub streaming: bool,
}

/// One incremental content fragment.
///
/// Only `Text` affects the aggregate today; the other kinds exist so hosts
/// can ship richer deltas without breaking older consumers, which ignore
/// them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum UpdateDelta {
    Text {
        text: String,
    },
    ToolInput {
        tool_call_id: String,
        name: String,
        input_text: String,
    },
    ToolOutput {
        tool_call_id: String,
        name: String,
        output: serde_json::Value,
        is_final: Option<bool>,
    },
    Raw {
        raw: serde_json::Value,
    },
}

/// Authoritative completion data for one result.
///
/// `text: Some(..)` replaces any streamed accumulation, including the empty
/// string; `text: None` means "keep what was streamed". The JSON-valued
/// metadata fields are double-`Option` (see [`nullable`]): an absent key is
/// "not yet known" while an explicit `null` is "known to be cleared", and
/// the two survive a serde round trip unmerged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultData {
    pub result_id: ResultId,
    pub success: bool,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub run_label: String,
    pub model: Option<ModelInfo>,
    pub text: Option<String>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub usage: Option<Option<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub total_usage: Option<Option<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub steps: Option<Option<serde_json::Value>>,
    pub finish_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub warnings: Option<Option<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub request: Option<Option<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub response: Option<Option<serde_json::Value>>,
}

impl ResultData {
    /// Minimal completion data; every optional field starts unknown.
    pub fn new(result_id: ResultId, success: bool) -> Self {
        Self {
            result_id,
            success,
            label: String::new(),
            run_label: String::new(),
            model: None,
            text: None,
            error: None,
            usage: None,
            total_usage: None,
            steps: None,
            finish_reason: None,
            warnings: None,
            request: None,
            response: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_expose_run_and_prompt_ids() {
        let event = RunEvent::Error {
            run_id: RunId::new("r1"),
            prompt_id: PromptId::new("p1"),
            result_id: None,
            error: "boom".into(),
            timestamp: 7,
        };
        assert_eq!(event.run_id().as_str(), "r1");
        assert_eq!(event.prompt_id().as_str(), "p1");
        assert!(event.is_terminal());
    }

    #[test]
    fn result_scoped_error_is_not_terminal() {
        let event = RunEvent::Error {
            run_id: RunId::new("r1"),
            prompt_id: PromptId::new("p1"),
            result_id: Some(ResultId::new("res1")),
            error: "boom".into(),
            timestamp: 7,
        };
        assert!(!event.is_terminal());
    }

    #[test]
    fn update_delta_round_trips_through_tagged_json() {
        let delta = UpdateDelta::Text {
            text: "chunk".into(),
        };
        let json = serde_json::to_value(&delta).expect("serialize");
        assert_eq!(json["type"], "text");
        let back: UpdateDelta = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, delta);
    }

    #[test]
    fn result_data_distinguishes_absent_text_from_empty() {
        let absent: ResultData = serde_json::from_value(serde_json::json!({
            "result_id": "res1",
            "success": true,
        }))
        .expect("deserialize");
        assert_eq!(absent.text, None);

        let empty: ResultData = serde_json::from_value(serde_json::json!({
            "result_id": "res1",
            "success": true,
            "text": "",
        }))
        .expect("deserialize");
        assert_eq!(empty.text, Some(String::new()));
    }

    #[test]
    fn result_data_distinguishes_cleared_from_unknown_metadata() {
        let data: ResultData = serde_json::from_value(serde_json::json!({
            "result_id": "res1",
            "success": true,
            "usage": null,
        }))
        .expect("deserialize");
        assert_eq!(data.usage, Some(None));
        assert_eq!(data.total_usage, None);

        let json = serde_json::to_value(&data).expect("serialize");
        assert_eq!(json["usage"], serde_json::Value::Null);
        assert!(json.as_object().expect("object").get("total_usage").is_none());
    }
}
