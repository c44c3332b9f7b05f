//! Score normalization
//!
//! Normalizes raw test summaries to 0-100 scores the way the scoring
//! backend does: reaction-time components are mapped linearly over a fixed
//! band and blended half-and-half with accuracy, memory is a plain ratio,
//! and the pillar score is a weighted mean of the available test scores.

use crate::types::{SubmissionRequest, SubmissionResponse};

/// Reaction-time band for the attention score (best..worst, ms).
const ATTENTION_RT_BAND: (f64, f64) = (150.0, 800.0);
/// Reaction-time band for the flexibility score (best..worst, ms).
const FLEXIBILITY_RT_BAND: (f64, f64) = (200.0, 1000.0);
/// Weight of cognitive test scores in the pillar blend.
const TEST_SCORE_WEIGHT: f64 = 1.5;

/// Normalize the attention summary: lower RT and higher accuracy are better.
pub fn attention_score(avg_reaction_ms: f64, correct_rate: f64) -> f64 {
    blend_rt_and_accuracy(avg_reaction_ms, correct_rate, ATTENTION_RT_BAND)
}

/// Normalize the memory summary as a correct-round ratio.
pub fn memory_score(correct_count: u32, total_trials: u32) -> f64 {
    let total = total_trials.max(1) as f64;
    round1((correct_count as f64 / total * 100.0).min(100.0))
}

/// Normalize the flexibility (Stroop) summary.
pub fn flexibility_score(avg_reaction_ms: f64, correct_rate: f64) -> f64 {
    blend_rt_and_accuracy(avg_reaction_ms, correct_rate, FLEXIBILITY_RT_BAND)
}

/// Weighted mean of item scores, clamped to 0-100, one decimal.
pub fn pillar_score(scores: &[f64], weights: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let total_weight: f64 = weights.iter().sum();
    if total_weight == 0.0 {
        return 0.0;
    }
    let weighted_sum: f64 = scores.iter().zip(weights).map(|(s, w)| s * w).sum();
    round1((weighted_sum / total_weight).clamp(0.0, 100.0))
}

/// Score a full submission the way the backend's submit endpoint does,
/// including the pillar-3 blend over the three test scores.
pub fn score_submission(request: &SubmissionRequest) -> SubmissionResponse {
    let attention = attention_score(
        request.attention.avg_reaction_ms,
        request.attention.correct_rate,
    );
    let memory = memory_score(request.memory.correct_count, request.memory.total_trials);
    let flexibility = flexibility_score(
        request.flexibility.avg_reaction_ms,
        request.flexibility.correct_rate,
    );

    let scores = [attention, memory, flexibility];
    let weights = [TEST_SCORE_WEIGHT; 3];
    let pillar3 = pillar_score(&scores, &weights);

    SubmissionResponse {
        attention_score: Some(attention),
        memory_score: Some(memory),
        flexibility_score: Some(flexibility),
        pillar3_score: Some(pillar3),
    }
}

fn blend_rt_and_accuracy(avg_reaction_ms: f64, correct_rate: f64, band: (f64, f64)) -> f64 {
    let (best, worst) = band;
    let rt_score = ((1.0 - (avg_reaction_ms - best) / (worst - best)) * 100.0).clamp(0.0, 100.0);
    let acc_score = correct_rate * 100.0;
    round1(rt_score * 0.5 + acc_score * 0.5)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
