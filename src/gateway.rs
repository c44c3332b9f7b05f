//! Submission gateway
//!
//! The sequencer hands its aggregate payload to a `SubmissionGateway` and
//! consumes whatever normalized scores come back. Transport, retry, and
//! persistence all live behind this seam; the crate ships a local
//! implementation that applies the backend's scoring formulas in-process.

use crate::error::SequencerError;
use crate::scoring;
use crate::types::{SubmissionRequest, SubmissionResponse};

/// Collaborator that accepts the aggregate payload and returns normalized
/// 0-100 scores. Implementations may fail; the sequencer recovers locally
/// and still reaches its terminal phase.
pub trait SubmissionGateway {
    fn submit(&mut self, request: &SubmissionRequest) -> Result<SubmissionResponse, SequencerError>;
}

/// Gateway that scores the payload in-process with the backend formulas.
/// Used by tests, the CLI, and offline operation.
#[derive(Debug, Clone, Default)]
pub struct LocalScoringGateway;

impl SubmissionGateway for LocalScoringGateway {
    fn submit(&mut self, request: &SubmissionRequest) -> Result<SubmissionResponse, SequencerError> {
        Ok(scoring::score_submission(request))
    }
}
