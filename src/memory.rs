//! Memory (digit span) task runner
//!
//! Each round runs in two stages: `show`, during which the sequence is
//! revealed digit by digit and the input surface is disabled, then `input`,
//! during which digit presses accumulate until the reproduction attempt
//! reaches the sequence length. The round finalizes at that instant by
//! exact ordered comparison.

use rand::Rng;

use crate::types::MemoryRound;

/// Fixed round count per run.
pub const MEMORY_ROUNDS: usize = 5;
/// Sequence length of round 0; round r has length `MEMORY_BASE_LENGTH + r`.
pub const MEMORY_BASE_LENGTH: usize = 3;
/// Lead-in before the first reveal step of a round.
pub const MEMORY_LEAD_IN_MS: u64 = 500;
/// Interval between reveal steps.
pub const MEMORY_REVEAL_STEP_MS: u64 = 800;
/// Settling gap between a finalized round and the next round's reveal.
pub const MEMORY_ROUND_GAP_MS: u64 = 400;
/// Settling delay after the last round, before the flexibility task begins.
pub const MEMORY_HANDOFF_MS: u64 = 600;

/// Stage of the active round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStage {
    /// Revealing the sequence; `shown` digits are visible so far.
    Reveal { shown: usize },
    /// Accepting the reproduction attempt.
    Input,
}

/// Result of a reveal timer step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    /// Another reveal step should be scheduled.
    MoreToShow,
    /// The full sequence has been shown; input is now open.
    InputOpen,
}

/// Result of feeding a digit to the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryStep {
    /// Input arrived outside the input stage (or after finalization).
    Ignored,
    /// Digit appended; the attempt is still shorter than the sequence.
    Accepted,
    /// Attempt reached full length and the round was scored.
    RoundComplete { last: bool },
}

/// Runner for the digit span task.
#[derive(Debug)]
pub struct MemoryRunner {
    rounds: Vec<MemoryRound>,
    index: usize,
    stage: RoundStage,
}

impl MemoryRunner {
    /// Generate all rounds up front: round r gets an independent random
    /// sequence of length r+3, digits 1-9, repeats allowed.
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        let rounds = (0..MEMORY_ROUNDS)
            .map(|r| {
                let len = MEMORY_BASE_LENGTH + r;
                let sequence = (0..len).map(|_| rng.random_range(1..=9u8)).collect();
                MemoryRound::new(sequence)
            })
            .collect();
        Self {
            rounds,
            index: 0,
            stage: RoundStage::Reveal { shown: 0 },
        }
    }

    /// Advance the reveal by one step. Called from the reveal timer; the
    /// step that runs past the last digit is the one that opens input.
    pub fn reveal_next(&mut self) -> RevealOutcome {
        let len = self.rounds[self.index].sequence.len();
        match self.stage {
            RoundStage::Reveal { shown } if shown < len => {
                self.stage = RoundStage::Reveal { shown: shown + 1 };
                RevealOutcome::MoreToShow
            }
            _ => {
                self.stage = RoundStage::Input;
                RevealOutcome::InputOpen
            }
        }
    }

    /// Append a digit to the reproduction attempt. The round finalizes the
    /// instant the attempt reaches the sequence length.
    pub fn push_digit(&mut self, digit: u8) -> MemoryStep {
        if self.stage != RoundStage::Input || digit > 9 {
            return MemoryStep::Ignored;
        }
        let round = &mut self.rounds[self.index];
        if round.is_finalized() {
            return MemoryStep::Ignored;
        }

        round.user_input.push(digit);
        if round.user_input.len() == round.sequence.len() {
            round.correct = round.user_input == round.sequence;
            MemoryStep::RoundComplete {
                last: self.index + 1 >= self.rounds.len(),
            }
        } else {
            MemoryStep::Accepted
        }
    }

    /// Erase the last entered digit. No-op on an empty attempt, outside the
    /// input stage, or after the round finalized.
    pub fn erase(&mut self) {
        if self.stage != RoundStage::Input {
            return;
        }
        let round = &mut self.rounds[self.index];
        if !round.is_finalized() {
            round.user_input.pop();
        }
    }

    /// Move to the next round's reveal stage. Called after the inter-round
    /// settling gap.
    pub fn begin_next_round(&mut self) {
        if self.index + 1 < self.rounds.len() {
            self.index += 1;
            self.stage = RoundStage::Reveal { shown: 0 };
        }
    }

    pub fn stage(&self) -> RoundStage {
        self.stage
    }

    /// Digits of the current sequence revealed so far (empty outside the
    /// reveal stage).
    pub fn revealed(&self) -> &[u8] {
        match self.stage {
            RoundStage::Reveal { shown } => &self.rounds[self.index].sequence[..shown],
            RoundStage::Input => &[],
        }
    }

    pub fn current_round(&self) -> &MemoryRound {
        &self.rounds[self.index]
    }

    /// (current round, total rounds)
    pub fn progress(&self) -> (usize, usize) {
        (self.index, self.rounds.len())
    }

    /// Hand the full outcome list back once the last round finalized.
    pub fn into_rounds(self) -> Vec<MemoryRound> {
        self.rounds
    }
}
