//! Core domain for the promptrig run aggregator.
//!
//! A run executes one prompt against N model configurations at once; the
//! host streams lifecycle events as results arrive. This crate holds the
//! pure half of the system: the event contract, the correlator that admits
//! or drops events, the total fold that builds the `RunAggregate`, and the
//! projection that turns it into a display-ready `RunView`.
//!
//! ```
//! use promptrig_core::prelude::*;
//!
//! let mut correlator = EventCorrelator::new(PromptId::new("p1"));
//! let mut state = RunAggregate::idle();
//!
//! let event = RunEvent::Started {
//!     run_id: RunId::new("r1"),
//!     prompt_id: PromptId::new("p1"),
//!     timestamp: 0,
//!     streaming: true,
//!     results: vec![],
//!     run_settings: None,
//! };
//! if correlator.admit(&event, &state).is_admitted() {
//!     state = fold(state, event);
//! }
//! let view = project(&state);
//! assert!(view.in_flight);
//! ```

/// Run and result aggregate state.
pub mod aggregate;
/// Admission filtering for incoming events.
pub mod correlator;
/// The transport-agnostic lifecycle event contract.
pub mod event;
/// Identifiers and model configuration descriptors.
pub mod model;
/// Tracing/logging initialization.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Display-ready view derivation.
pub mod projection;
/// Per-result records and metadata.
pub mod record;
/// The pure event fold.
pub mod reducer;
/// Persistable result snapshots.
pub mod snapshot;

pub use aggregate::RunAggregate;
pub use correlator::{Admission, EventCorrelator, RejectReason};
pub use event::{ResultData, ResultShell, RunEvent, UpdateDelta};
pub use model::{
    AttachmentMeta, ModelInfo, ModelSettings, PromptId, ReasoningEffort, ReasoningSettings,
    ResultId, RunId,
};
pub use observability::{LogConfig, init_logging};
pub use projection::{ResultView, RunView, project};
pub use record::{NON_STREAMING_NOTE, ResultMetadata, ResultRecord};
pub use reducer::fold;
pub use snapshot::{ResultSnapshot, RunSnapshot};
