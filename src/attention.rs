//! Attention task runner
//!
//! Drives a fixed sequence of directional-stimulus trials. Each trial moves
//! `pending-display → armed → responded`: the stimulus is armed after a
//! settling gap, the first accepted directional input finalizes the trial,
//! and anything before arming or after finalization is absorbed. There is
//! no response timeout; a trial waits indefinitely.

use rand::Rng;

use crate::types::{AttentionTrial, Direction};

/// Fixed trial count per run.
pub const ATTENTION_TRIALS: usize = 15;
/// Settling gap before each stimulus is armed.
pub const ATTENTION_TRIAL_GAP_MS: u64 = 600;
/// Settling delay after the last response, before the memory task begins.
pub const ATTENTION_HANDOFF_MS: u64 = 800;

/// Result of feeding a response to a trial runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialStep {
    /// Input arrived outside an armed trial; absorbed without effect.
    Ignored,
    /// Trial finalized; more trials remain.
    Advanced,
    /// Trial finalized and it was the last one.
    Complete,
}

/// Runner for the directional attention task.
#[derive(Debug)]
pub struct AttentionRunner {
    trials: Vec<AttentionTrial>,
    index: usize,
    armed: bool,
}

impl AttentionRunner {
    /// Generate the full trial list up front, directions drawn uniformly.
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        let trials = (0..ATTENTION_TRIALS)
            .map(|_| {
                let direction = Direction::ALL[rng.random_range(0..Direction::ALL.len())];
                AttentionTrial::new(direction)
            })
            .collect();
        Self {
            trials,
            index: 0,
            armed: false,
        }
    }

    /// Arm the current trial: stamp its presentation time and start
    /// accepting input. No-op once the run is complete.
    pub fn arm(&mut self, now_ms: u64) {
        if let Some(trial) = self.trials.get_mut(self.index) {
            trial.presented_at_ms = Some(now_ms);
            self.armed = true;
        }
    }

    /// First-response-wins: finalize the armed trial against `direction`.
    /// Responses while unarmed (or re-responses) are ignored.
    pub fn respond(&mut self, now_ms: u64, direction: Direction) -> TrialStep {
        if !self.armed {
            return TrialStep::Ignored;
        }
        let trial = match self.trials.get_mut(self.index) {
            Some(t) if !t.responded => t,
            _ => return TrialStep::Ignored,
        };

        let presented = trial.presented_at_ms.unwrap_or(now_ms);
        trial.responded = true;
        trial.correct = direction == trial.direction;
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

    /// Direction of the visible stimulus, if a trial is currently armed.
    pub fn current_direction(&self) -> Option<Direction> {
        if self.armed {
            self.trials.get(self.index).map(|t| t.direction)
        } else {
            None
        }
    }

    /// (finalized, total)
    pub fn progress(&self) -> (usize, usize) {
        (self.index, self.trials.len())
    }

    /// Hand the full outcome list back once the run is complete.
    pub fn into_trials(self) -> Vec<AttentionTrial> {
        self.trials
    }
}
