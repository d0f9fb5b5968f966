//! Async host layer for the promptrig run aggregator.
//!
//! Where `promptrig-core` is pure state, this crate owns the runtime side:
//! the [`RunExecutor`] seam an integration implements to talk to model
//! providers, and the [`ExecutionController`] that starts and cancels runs,
//! folds their event streams single-threaded, and publishes [`RunView`]s
//! over a watch channel.
//!
//! ```no_run
//! use std::sync::Arc;
//! use promptrig_core::PromptId;
//! use promptrig_host::{ExecutionController, RunExecutor};
//!
//! # async fn demo(executor: Arc<dyn RunExecutor>) {
//! let mut controller = ExecutionController::new(PromptId::new("p1"), executor);
//! let mut views = controller.subscribe();
//! while let Some(view) = controller.next_view().await {
//!     if !view.in_flight {
//!         break;
//!     }
//! }
//! # let _ = views.changed().await;
//! # }
//! ```

/// Run orchestration and the single-writer fold loop.
pub mod controller;
/// The executor seam and its request types.
pub mod executor;

pub use controller::{
    CANCELLED_RUN_ERROR, ControllerError, ExecutionController, TransientUi,
};
pub use executor::{
    ExecRequest, ExecutorError, ExecutorStreamHandle, ModelSpec, RunExecutor, RunInit,
};

pub use promptrig_core::{RunView, prelude};
