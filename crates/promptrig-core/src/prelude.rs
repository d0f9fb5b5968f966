//! Common imports for typical aggregator usage.
pub use crate::{
    Admission, EventCorrelator, ModelInfo, PromptId, RejectReason, ResultData, ResultId,
    ResultShell, ResultView, RunAggregate, RunEvent, RunId, RunView, UpdateDelta, fold, project,
};
