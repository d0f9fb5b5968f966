use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Creates an id from any string-like value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Mints a fresh random (uuid v4) id.
            pub fn random() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Returns the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

string_id! {
    /// Identifier of the prompt instance an aggregator belongs to.
    PromptId
}

string_id! {
    /// Identifier of one end-to-end execution of a prompt.
    RunId
}

string_id! {
    /// Identifier of one model configuration's result within a run, unique
    /// within that run.
    ResultId
}

/// Immutable descriptor for the model configuration behind a result.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Stable configuration key chosen by the host UI.
    pub key: String,
    pub provider_id: Option<String>,
    pub model_id: Option<String>,
    pub label: Option<String>,
    /// Settings snapshot taken when the run started.
    #[serde(default)]
    pub settings: ModelSettings,
}

/// Per-model settings captured at run start.
///
/// Everything here is pass-through for display and persistence; the
/// aggregator never interprets it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub options: Option<serde_json::Value>,
    pub provider_options: Option<serde_json::Value>,
    pub tools: Option<serde_json::Value>,
    pub reasoning: Option<ReasoningSettings>,
    pub attachments: Option<Vec<AttachmentMeta>>,
}

/// Reasoning configuration for models that support it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReasoningSettings {
    pub enabled: bool,
    pub effort: ReasoningEffort,
    pub budget_tokens: Option<u32>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

/// Attachment metadata carried alongside a model configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub name: String,
    pub mime: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_their_inner_value() {
        let id = ResultId::new("res-1");
        assert_eq!(id.as_str(), "res-1");
        assert_eq!(id.to_string(), "res-1");
        assert_eq!(ResultId::from("res-1"), id);
    }

    #[test]
    fn random_ids_are_unique() {
        assert_ne!(RunId::random(), RunId::random());
    }

    #[test]
    fn reasoning_effort_serializes_lowercase() {
        let json = serde_json::to_string(&ReasoningEffort::Medium).expect("serialize");
        assert_eq!(json, "\"medium\"");
    }
}
