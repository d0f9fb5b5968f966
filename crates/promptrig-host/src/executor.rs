//! The transport seam between the controller and whatever actually talks to
//! model providers.
//!
//! An executor accepts a fully prepared request (run id and result shells
//! already minted) and returns a stream of lifecycle events. How it reaches
//! the providers is its own business.

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use promptrig_core::{ModelInfo, PromptId, ResultShell, RunEvent, RunId};

/// User-facing inputs for starting a run, one entry per model configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunInit {
    pub prompt_id: PromptId,
    pub prompt_text: String,
    /// Run-level streaming intent; models that cannot stream still run.
    pub streaming: bool,
    pub models: Vec<ModelSpec>,
    pub run_settings: Option<serde_json::Value>,
}

/// One model configuration selected for a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub label: String,
    pub run_label: String,
    pub model: ModelInfo,
    pub streaming: bool,
}

/// Prepared request handed to the executor. The controller mints the run id
/// and shells so it can track them before any event arrives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecRequest {
    pub run_id: RunId,
    pub prompt_id: PromptId,
    pub prompt_text: String,
    pub streaming: bool,
    pub shells: Vec<ResultShell>,
    pub run_settings: Option<serde_json::Value>,
}

/// Handle over the executor's event stream for one run.
pub struct ExecutorStreamHandle {
    /// Lifecycle events in emission order. Per-result ordering must be
    /// preserved; the aggregator does not re-sequence deltas.
    pub events: BoxStream<'static, RunEvent>,
}

/// Starts runs against model providers.
#[async_trait::async_trait]
pub trait RunExecutor: Send + Sync {
    /// Starts executing the request and returns its event stream.
    ///
    /// Failures here happen before any event was emitted; the controller
    /// converts them into a run-level error event.
    async fn start(&self, request: ExecRequest) -> Result<ExecutorStreamHandle, ExecutorError>;
}

/// Errors surfaced by an executor before its event stream exists.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
    /// The request could not be started (configuration, auth, validation).
    #[error("failed to start run: {message}")]
    Start { message: String },
    /// The underlying transport failed while establishing the stream.
    #[error("transport error: {message}")]
    Transport { message: String },
}

impl ExecutorError {
    pub fn start(message: impl Into<String>) -> Self {
        Self::Start {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}
