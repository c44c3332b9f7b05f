//! Error types for the sequencer

use thiserror::Error;

/// Errors surfaced by submission gateways and payload handling.
///
/// Input-ordering races (a response before a trial is armed, or after it
/// finalized) are not errors; the runners absorb them silently.
#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),

    #[error("Submission transport failure: {0}")]
    SubmissionTransport(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
