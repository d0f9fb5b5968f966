//! Pure state-transition function folding admitted lifecycle events into a
//! `RunAggregate`.
//!
//! The fold is total: every well-typed event produces a next state, and
//! every error path is a normal transition rather than a failure. All I/O
//! and admission filtering happen outside (see `correlator`).

use crate::aggregate::RunAggregate;
use crate::event::{ResultData, ResultShell, RunEvent, UpdateDelta};
use crate::model::{PromptId, ResultId, RunId};
use crate::record::ResultRecord;

/// Folds one admitted event into the aggregate and returns the next state.
///
/// Update events for the same result id must be folded in arrival order;
/// the reducer does not re-sequence deltas.
pub fn fold(state: RunAggregate, event: RunEvent) -> RunAggregate {
    match event {
        RunEvent::Started {
            run_id,
            prompt_id,
            timestamp,
            streaming,
            results,
            run_settings: _,
        } => start_run(run_id, prompt_id, timestamp, streaming, &results),
        RunEvent::Update {
            result_id, delta, ..
        } => apply_update(state, &result_id, &delta),
        RunEvent::ResultCompleted { result, .. } => {
            let mut state = state;
            finalize_result(&mut state, &result);
            state
        }
        RunEvent::Completed {
            timestamp,
            success,
            results,
            ..
        } => complete_run(state, timestamp, success, &results),
        RunEvent::Error {
            result_id,
            error,
            timestamp,
            ..
        } => apply_error(state, result_id.as_ref(), error, timestamp),
    }
}

/// Wholesale replacement: a new run supersedes whatever came before, even a
/// run that never reached a terminal state.
fn start_run(
    run_id: RunId,
    prompt_id: PromptId,
    timestamp: u64,
    streaming: bool,
    shells: &[ResultShell],
) -> RunAggregate {
    RunAggregate {
        run_id: Some(run_id),
        prompt_id: Some(prompt_id),
        streaming,
        started_at: Some(timestamp),
        completed_at: None,
        order: shells.iter().map(|shell| shell.result_id.clone()).collect(),
        results: shells
            .iter()
            .map(|shell| ResultRecord::pending(shell, streaming))
            .collect(),
        error: None,
    }
}

fn apply_update(mut state: RunAggregate, result_id: &ResultId, delta: &UpdateDelta) -> RunAggregate {
    // Deltas never re-open a finished result, and unknown delta kinds are
    // ignored for forward compatibility.
    if let Some(record) = state.result_mut(result_id)
        && record.loading
        && let UpdateDelta::Text { text } = delta
    {
        record.append_chunk(text);
    }
    state
}

/// Merge-and-finalize, creating the record when the result never announced
/// a shell. Created records land after `order`; the projection falls back
/// to insertion order for them.
fn finalize_result(state: &mut RunAggregate, data: &ResultData) {
    match state.result_mut(&data.result_id) {
        Some(record) => record.finalize(data),
        None => state.results.push(ResultRecord::from_completion(data)),
    }
}

fn complete_run(
    mut state: RunAggregate,
    timestamp: u64,
    success: bool,
    results: &[ResultData],
) -> RunAggregate {
    for data in results {
        finalize_result(&mut state, data);
    }
    // Terminal event: nothing may stay loading, but resolved outcomes on
    // records the payload did not mention are left as they are.
    for record in &mut state.results {
        record.loading = false;
    }
    state.completed_at = Some(timestamp);
    if success {
        state.error = None;
    }
    state
}

fn apply_error(
    mut state: RunAggregate,
    result_id: Option<&ResultId>,
    error: String,
    timestamp: u64,
) -> RunAggregate {
    match result_id {
        Some(result_id) => {
            // One result failed; siblings keep running. A record that
            // already reached a terminal outcome is left untouched.
            if let Some(record) = state.result_mut(result_id)
                && record.loading
            {
                record.error = Some(error);
                record.success = Some(false);
                record.loading = false;
            }
        }
        None => {
            for record in &mut state.results {
                record.loading = false;
            }
            state.error = Some(error);
            state.completed_at = Some(timestamp);
        }
    }
    state
}
