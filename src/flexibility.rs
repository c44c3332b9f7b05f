//! Flexibility (Stroop) task runner
//!
//! Structurally the same state machine as the attention runner: a settling
//! gap precedes arming each trial, the first accepted color input finalizes
//! it, and there is no response timeout. Correctness compares the response
//! to the ink color, not the word's meaning.

use rand::Rng;

use crate::attention::TrialStep;
use crate::types::{StroopColor, StroopTrial};

/// Fixed trial count per run.
pub const STROOP_TRIALS: usize = 15;
/// Settling gap before each stimulus is armed.
pub const STROOP_TRIAL_GAP_MS: u64 = 500;
/// Settling delay after the last response, before aggregation.
pub const STROOP_HANDOFF_MS: u64 = 600;
/// Probability that a trial is congruent (ink matches word).
pub const CONGRUENT_PROBABILITY: f64 = 0.4;

/// Runner for the Stroop interference task.
#[derive(Debug)]
pub struct FlexibilityRunner {
    trials: Vec<StroopTrial>,
    index: usize,
    armed: bool,
}

impl FlexibilityRunner {
    /// Generate the full trial list up front. Incongruent trials resample
    /// the ink color until it differs from the word, so a "congruent by
    /// accident" incongruent trial cannot be constructed.
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        let trials = (0..STROOP_TRIALS)
            .map(|_| {
                let word = StroopColor::ALL[rng.random_range(0..StroopColor::ALL.len())];
                let display_color = if rng.random_bool(1.0 - CONGRUENT_PROBABILITY) {
                    loop {
                        let candidate =
                            StroopColor::ALL[rng.random_range(0..StroopColor::ALL.len())];
                        if candidate != word {
                            break candidate;
                        }
                    }
                } else {
                    word
                };
                StroopTrial::new(word, display_color)
            })
            .collect();
        Self {
            trials,
            index: 0,
            armed: false,
        }
    }

    /// Arm the current trial. No-op once the run is complete.
    pub fn arm(&mut self, now_ms: u64) {
        if let Some(trial) = self.trials.get_mut(self.index) {
            trial.presented_at_ms = Some(now_ms);
            self.armed = true;
        }
    }

    /// First-response-wins: finalize the armed trial against the ink color.
    pub fn respond(&mut self, now_ms: u64, color: StroopColor) -> TrialStep {
        if !self.armed {
            return TrialStep::Ignored;
        }
        let trial = match self.trials.get_mut(self.index) {
            Some(t) if !t.responded => t,
            _ => return TrialStep::Ignored,
        };

        let presented = trial.presented_at_ms.unwrap_or(now_ms);
        trial.responded = true;
        trial.correct = color == trial.display_color;
        trial.reaction_time_ms = now_ms.saturating_sub(presented);

        self.armed = false;
        self.index += 1;
        if self.index >= self.trials.len() {
            TrialStep::Complete
        } else {
            TrialStep::Advanced
        }
    }

    pub fn is_complete(&self) -> bool {
        self.index >= self.trials.len()
    }

    /// The visible stimulus as (word, ink color), if a trial is armed.
    pub fn current_stimulus(&self) -> Option<(StroopColor, StroopColor)> {
        if self.armed {
            self.trials
                .get(self.index)
                .map(|t| (t.word, t.display_color))
        } else {
            None
        }
    }

    /// (finalized, total)
    pub fn progress(&self) -> (usize, usize) {
        (self.index, self.trials.len())
    }

    /// Hand the full outcome list back once the run is complete.
    pub fn into_trials(self) -> Vec<StroopTrial> {
        self.trials
    }
}
