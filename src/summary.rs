//! Outcome aggregation
//!
//! Reduces the three finalized outcome lists into the summaries of the
//! submission payload. Reaction-time averages run over correct trials only;
//! a run with zero correct trials falls back to a fixed constant instead of
//! dividing by zero.

use crate::types::{
    AttentionSummary, AttentionTrial, FlexibilitySummary, MemoryRound, MemorySummary,
    StroopTrial, SubmissionRequest,
};

/// Average RT reported when no attention trial was answered correctly.
pub const ATTENTION_FALLBACK_AVG_RT_MS: f64 = 500.0;
/// Average RT reported when no flexibility trial was answered correctly.
pub const FLEXIBILITY_FALLBACK_AVG_RT_MS: f64 = 600.0;

/// Reduce attention trials to their submission summary.
pub fn summarize_attention(trials: &[AttentionTrial]) -> AttentionSummary {
    let correct: Vec<&AttentionTrial> = trials.iter().filter(|t| t.correct).collect();
    let avg_reaction_ms = average_rt(
        correct.iter().map(|t| t.reaction_time_ms),
        ATTENTION_FALLBACK_AVG_RT_MS,
    );
    AttentionSummary {
        avg_reaction_ms,
        correct_rate: rate(correct.len(), trials.len()),
        total_trials: trials.len() as u32,
    }
}

/// Reduce memory rounds to their submission summary.
pub fn summarize_memory(rounds: &[MemoryRound]) -> MemorySummary {
    MemorySummary {
        correct_count: rounds.iter().filter(|r| r.correct).count() as u32,
        total_trials: rounds.len() as u32,
    }
}

/// Reduce Stroop trials to their submission summary.
pub fn summarize_flexibility(trials: &[StroopTrial]) -> FlexibilitySummary {
    let correct: Vec<&StroopTrial> = trials.iter().filter(|t| t.correct).collect();
    let avg_reaction_ms = average_rt(
        correct.iter().map(|t| t.reaction_time_ms),
        FLEXIBILITY_FALLBACK_AVG_RT_MS,
    );
    FlexibilitySummary {
        avg_reaction_ms,
        correct_rate: rate(correct.len(), trials.len()),
        total_trials: trials.len() as u32,
    }
}

/// Assemble the aggregate payload from the three outcome lists.
pub fn build_submission(
    attention: &[AttentionTrial],
    memory: &[MemoryRound],
    flexibility: &[StroopTrial],
) -> SubmissionRequest {
    SubmissionRequest {
        attention: summarize_attention(attention),
        memory: summarize_memory(memory),
        flexibility: summarize_flexibility(flexibility),
    }
}

fn average_rt(times: impl Iterator<Item = u64>, fallback: f64) -> f64 {
    let (sum, count) = times.fold((0u64, 0u64), |(s, c), rt| (s + rt, c + 1));
    if count == 0 {
        fallback
    } else {
        sum as f64 / count as f64
    }
}

fn rate(correct: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64
    }
}
