//! Braincap Sequencer - On-device sequencer for the cognitive test battery
//!
//! Runs the three timed cognitive tasks — attention (arrow reaction time),
//! memory (digit span), flexibility (Stroop) — as a single-threaded state
//! machine paced by cancellable delayed actions, then aggregates the
//! outcomes into a submission payload and resolves normalized 0-100 scores.
//!
//! ## Modules
//!
//! - **Task runners**: per-task trial state machines (`attention`, `memory`,
//!   `flexibility`)
//! - **Sequencer**: phase orchestration, timer pacing, input routing
//! - **Aggregation & scoring**: summary reduction and score normalization

pub mod attention;
pub mod clock;
pub mod error;
pub mod flexibility;
pub mod gateway;
pub mod memory;
pub mod scoring;
pub mod sequencer;
pub mod summary;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::SequencerError;
pub use gateway::{LocalScoringGateway, SubmissionGateway};
pub use sequencer::TestSequencer;
pub use types::{
    Phase, SubmissionRequest, SubmissionResponse, TestOutcome, UserInput,
};

/// Sequencer version embedded in emitted outcome records
pub const SEQUENCER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for outcome records
pub const PRODUCER_NAME: &str = "braincap-sequencer";
