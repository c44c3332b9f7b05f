//! Core types for the cognitive test battery
//!
//! This module defines the data that flows through a battery run: per-trial
//! records captured by the task runners, the summaries reduced from them,
//! and the wire types exchanged with the scoring backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Battery phase. Transitions are strictly forward; `Result` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Intro,
    Attention,
    Memory,
    Flexibility,
    Result,
}

impl Phase {
    /// Next phase in the fixed battery order, or `None` from `Result`.
    pub fn next(&self) -> Option<Phase> {
        use Phase::*;
        Some(match self {
            Intro => Attention,
            Attention => Memory,
            Memory => Flexibility,
            Flexibility => Result,
            Result => return None,
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Result)
    }
}

/// Directional stimulus for the attention task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];
}

/// Color vocabulary shared by the Stroop word and its ink color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StroopColor {
    Red,
    Blue,
    Green,
    Yellow,
}

impl StroopColor {
    pub const ALL: [StroopColor; 4] = [
        StroopColor::Red,
        StroopColor::Blue,
        StroopColor::Green,
        StroopColor::Yellow,
    ];
}

/// One stimulus-response unit of the attention task.
///
/// `presented_at_ms` is set when the stimulus is armed; the response fields
/// are written exactly once, on the first accepted input, and never mutated
/// afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttentionTrial {
    pub direction: Direction,
    pub presented_at_ms: Option<u64>,
    pub responded: bool,
    pub correct: bool,
    pub reaction_time_ms: u64,
}

impl AttentionTrial {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            presented_at_ms: None,
            responded: false,
            correct: false,
            reaction_time_ms: 0,
        }
    }
}

/// One show-then-reproduce unit of the memory task.
///
/// `correct` is meaningful only once `user_input` has reached the length of
/// `sequence`; it is exact ordered equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRound {
    pub sequence: Vec<u8>,
    pub user_input: Vec<u8>,
    pub correct: bool,
}

impl MemoryRound {
    pub fn new(sequence: Vec<u8>) -> Self {
        Self {
            sequence,
            user_input: Vec::new(),
            correct: false,
        }
    }

    /// True once the reproduction attempt is full-length and scored.
    pub fn is_finalized(&self) -> bool {
        self.user_input.len() == self.sequence.len()
    }
}

/// One stimulus-response unit of the flexibility (Stroop) task.
///
/// `word` is the semantic meaning displayed as text, `display_color` the ink
/// it is rendered in. Correctness compares the response to `display_color`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StroopTrial {
    pub word: StroopColor,
    pub display_color: StroopColor,
    pub presented_at_ms: Option<u64>,
    pub responded: bool,
    pub correct: bool,
    pub reaction_time_ms: u64,
}

impl StroopTrial {
    pub fn new(word: StroopColor, display_color: StroopColor) -> Self {
        Self {
            word,
            display_color,
            presented_at_ms: None,
            responded: false,
            correct: false,
            reaction_time_ms: 0,
        }
    }

    /// Ink color differs from the word's meaning.
    pub fn is_incongruent(&self) -> bool {
        self.word != self.display_color
    }
}

/// User input surface, routed to the runner of the active phase.
/// Inputs that do not match the active phase are silently absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInput {
    Direction(Direction),
    Digit(u8),
    Erase,
    Color(StroopColor),
}

/// Attention summary submitted to the scoring backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionSummary {
    /// Average reaction time over correct trials only (fallback if none).
    pub avg_reaction_ms: f64,
    /// Correct trials / total trials, in 0..=1.
    pub correct_rate: f64,
    pub total_trials: u32,
}

/// Memory summary submitted to the scoring backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySummary {
    pub correct_count: u32,
    pub total_trials: u32,
}

/// Flexibility summary submitted to the scoring backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlexibilitySummary {
    pub avg_reaction_ms: f64,
    pub correct_rate: f64,
    pub total_trials: u32,
}

/// Aggregate payload sent to the submission gateway after the last task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub attention: AttentionSummary,
    pub memory: MemorySummary,
    pub flexibility: FlexibilitySummary,
}

/// Normalized scores returned by the scoring backend, each 0-100 or absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub attention_score: Option<f64>,
    pub memory_score: Option<f64>,
    pub flexibility_score: Option<f64>,
    pub pillar3_score: Option<f64>,
}

impl SubmissionResponse {
    /// All scores present and zero. Used when submission fails outright so
    /// the battery still reaches its terminal phase with displayable values.
    pub fn zeroed() -> Self {
        Self {
            attention_score: Some(0.0),
            memory_score: Some(0.0),
            flexibility_score: Some(0.0),
            pillar3_score: Some(0.0),
        }
    }
}

/// Terminal record of a completed battery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOutcome {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub request: SubmissionRequest,
    pub response: SubmissionResponse,
}
