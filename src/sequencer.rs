//! Battery orchestration
//!
//! `TestSequencer` owns the phase state machine, constructs each task
//! runner at the moment its phase begins, routes user input to the active
//! runner, and drives all pacing through a queue of cancellable delayed
//! actions. After the last task it reduces the three outcome lists into the
//! aggregate payload and submits it; a failed submission still lands the
//! battery in its terminal phase with zeroed scores.
//!
//! The host owns the loop: call `tick()` whenever time may have passed
//! (`next_due_ms` says when the next wakeup is needed) and `handle_input`
//! for user responses. Everything mutates on the caller's thread.

use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::attention::{
    AttentionRunner, TrialStep, ATTENTION_HANDOFF_MS, ATTENTION_TRIAL_GAP_MS,
};
use crate::clock::{Clock, TimerQueue};
use crate::flexibility::{FlexibilityRunner, STROOP_HANDOFF_MS, STROOP_TRIAL_GAP_MS};
use crate::gateway::SubmissionGateway;
use crate::memory::{
    MemoryRunner, MemoryStep, RevealOutcome, RoundStage, MEMORY_HANDOFF_MS, MEMORY_LEAD_IN_MS,
    MEMORY_REVEAL_STEP_MS, MEMORY_ROUND_GAP_MS,
};
use crate::summary;
use crate::types::{
    AttentionTrial, Direction, MemoryRound, Phase, StroopColor, StroopTrial, SubmissionResponse,
    TestOutcome, UserInput,
};

/// Delayed actions driving battery pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    ArmAttentionTrial,
    BeginMemory,
    RevealMemoryDigit,
    BeginMemoryRound,
    BeginFlexibility,
    ArmStroopTrial,
    FinishBattery,
}

/// Orchestrator for one battery run. `Result` is terminal; a fresh run
/// requires a fresh sequencer.
pub struct TestSequencer<C, R, G>
where
    C: Clock,
    R: Rng,
    G: SubmissionGateway,
{
    clock: C,
    rng: R,
    gateway: G,
    phase: Phase,
    timers: TimerQueue<Action>,
    session_id: Uuid,
    started_at: Option<DateTime<Utc>>,
    attention: Option<AttentionRunner>,
    memory: Option<MemoryRunner>,
    flexibility: Option<FlexibilityRunner>,
    attention_trials: Vec<AttentionTrial>,
    memory_rounds: Vec<MemoryRound>,
    stroop_trials: Vec<StroopTrial>,
    outcome: Option<TestOutcome>,
}

impl<C, R, G> TestSequencer<C, R, G>
where
    C: Clock,
    R: Rng,
    G: SubmissionGateway,
{
    pub fn new(clock: C, rng: R, gateway: G) -> Self {
        Self {
            clock,
            rng,
            gateway,
            phase: Phase::Intro,
            timers: TimerQueue::new(),
            session_id: Uuid::new_v4(),
            started_at: None,
            attention: None,
            memory: None,
            flexibility: None,
            attention_trials: Vec::new(),
            memory_rounds: Vec::new(),
            stroop_trials: Vec::new(),
            outcome: None,
        }
    }

    /// Leave the intro and begin the attention task. Ignored outside intro.
    pub fn start(&mut self) {
        if self.phase != Phase::Intro {
            return;
        }
        self.phase = Phase::Attention;
        self.started_at = Some(Utc::now());
        self.attention = Some(AttentionRunner::new(&mut self.rng));
        let now = self.clock.now_ms();
        self.timers
            .schedule(now, ATTENTION_TRIAL_GAP_MS, Action::ArmAttentionTrial);
    }

    /// Drain and dispatch every due action. Actions scheduled while
    /// dispatching are re-checked, so a large clock jump settles in one
    /// call.
    pub fn tick(&mut self) {
        loop {
            let now = self.clock.now_ms();
            let due = self.timers.fire_due(now);
            if due.is_empty() {
                return;
            }
            for action in due {
                self.dispatch(action, now);
            }
        }
    }

    /// Route a user response to the active runner. Inputs that do not match
    /// the active phase or trial state are absorbed silently.
    pub fn handle_input(&mut self, input: UserInput) {
        let now = self.clock.now_ms();
        match (self.phase, input) {
            (Phase::Attention, UserInput::Direction(direction)) => {
                self.attention_response(now, direction)
            }
            (Phase::Memory, UserInput::Digit(digit)) => self.memory_digit(now, digit),
            (Phase::Memory, UserInput::Erase) => {
                if let Some(runner) = self.memory.as_mut() {
                    runner.erase();
                }
            }
            (Phase::Flexibility, UserInput::Color(color)) => self.stroop_response(now, color),
            _ => {}
        }
    }

    /// Teardown: cancel every pending timer so no stale callback can mutate
    /// state afterwards. The phase is left where it was.
    pub fn abort(&mut self) {
        self.timers.cancel_all();
        self.attention = None;
        self.memory = None;
        self.flexibility = None;
    }

    fn dispatch(&mut self, action: Action, now: u64) {
        match action {
            Action::ArmAttentionTrial => {
                if let Some(runner) = self.attention.as_mut() {
                    runner.arm(now);
                }
            }
            Action::BeginMemory => {
                self.phase = Phase::Memory;
                self.memory = Some(MemoryRunner::new(&mut self.rng));
                self.timers
                    .schedule(now, MEMORY_LEAD_IN_MS, Action::RevealMemoryDigit);
            }
            Action::RevealMemoryDigit => {
                if let Some(runner) = self.memory.as_mut() {
                    if runner.reveal_next() == RevealOutcome::MoreToShow {
                        self.timers
                            .schedule(now, MEMORY_REVEAL_STEP_MS, Action::RevealMemoryDigit);
                    }
                }
            }
            Action::BeginMemoryRound => {
                if let Some(runner) = self.memory.as_mut() {
                    runner.begin_next_round();
                    self.timers
                        .schedule(now, MEMORY_LEAD_IN_MS, Action::RevealMemoryDigit);
                }
            }
            Action::BeginFlexibility => {
                self.phase = Phase::Flexibility;
                self.flexibility = Some(FlexibilityRunner::new(&mut self.rng));
                self.timers
                    .schedule(now, STROOP_TRIAL_GAP_MS, Action::ArmStroopTrial);
            }
            Action::ArmStroopTrial => {
                if let Some(runner) = self.flexibility.as_mut() {
                    runner.arm(now);
                }
            }
            Action::FinishBattery => self.finish_battery(),
        }
    }

    fn attention_response(&mut self, now: u64, direction: Direction) {
        let Some(runner) = self.attention.as_mut() else {
            return;
        };
        match runner.respond(now, direction) {
            TrialStep::Ignored => {}
            TrialStep::Advanced => {
                self.timers
                    .schedule(now, ATTENTION_TRIAL_GAP_MS, Action::ArmAttentionTrial);
            }
            TrialStep::Complete => {
                // Runner hands its outcome list back before the handoff
                // delay; the memory runner does not exist yet.
                if let Some(runner) = self.attention.take() {
                    self.attention_trials = runner.into_trials();
                }
                self.timers
                    .schedule(now, ATTENTION_HANDOFF_MS, Action::BeginMemory);
            }
        }
    }

    fn memory_digit(&mut self, now: u64, digit: u8) {
        let Some(runner) = self.memory.as_mut() else {
            return;
        };
        match runner.push_digit(digit) {
            MemoryStep::Ignored | MemoryStep::Accepted => {}
            MemoryStep::RoundComplete { last: false } => {
                self.timers
                    .schedule(now, MEMORY_ROUND_GAP_MS, Action::BeginMemoryRound);
            }
            MemoryStep::RoundComplete { last: true } => {
                if let Some(runner) = self.memory.take() {
                    self.memory_rounds = runner.into_rounds();
                }
                self.timers
                    .schedule(now, MEMORY_HANDOFF_MS, Action::BeginFlexibility);
            }
        }
    }

    fn stroop_response(&mut self, now: u64, color: StroopColor) {
        let Some(runner) = self.flexibility.as_mut() else {
            return;
        };
        match runner.respond(now, color) {
            TrialStep::Ignored => {}
            TrialStep::Advanced => {
                self.timers
                    .schedule(now, STROOP_TRIAL_GAP_MS, Action::ArmStroopTrial);
            }
            TrialStep::Complete => {
                if let Some(runner) = self.flexibility.take() {
                    self.stroop_trials = runner.into_trials();
                }
                self.timers
                    .schedule(now, STROOP_HANDOFF_MS, Action::FinishBattery);
            }
        }
    }

    fn finish_battery(&mut self) {
        let request = summary::build_submission(
            &self.attention_trials,
            &self.memory_rounds,
            &self.stroop_trials,
        );
        let response = match self.gateway.submit(&request) {
            Ok(response) => response,
            // Submission failure degrades to zeroed scores; the battery
            // still terminates.
            Err(_) => SubmissionResponse::zeroed(),
        };

        let completed_at = Utc::now();
        self.outcome = Some(TestOutcome {
            session_id: self.session_id,
            started_at: self.started_at.unwrap_or(completed_at),
            completed_at,
            request,
            response,
        });
        self.phase = Phase::Result;
        self.timers.cancel_all();
    }

    // --- Host-facing views -------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Terminal record, present once the phase is `Result`.
    pub fn outcome(&self) -> Option<&TestOutcome> {
        self.outcome.as_ref()
    }

    /// Earliest pending deadline; hosts schedule their next wakeup off it.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.timers.next_due_ms()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    /// Visible attention stimulus, if one is armed.
    pub fn current_arrow(&self) -> Option<Direction> {
        self.attention.as_ref().and_then(|r| r.current_direction())
    }

    /// Visible Stroop stimulus as (word, ink color), if one is armed.
    pub fn current_stroop(&self) -> Option<(StroopColor, StroopColor)> {
        self.flexibility.as_ref().and_then(|r| r.current_stimulus())
    }

    /// Stage of the active memory round.
    pub fn memory_stage(&self) -> Option<RoundStage> {
        self.memory.as_ref().map(|r| r.stage())
    }

    /// The active memory round (sequence, attempt so far, score).
    pub fn memory_round(&self) -> Option<&MemoryRound> {
        self.memory.as_ref().map(|r| r.current_round())
    }

    /// Digits of the active sequence revealed so far.
    pub fn memory_revealed(&self) -> Option<&[u8]> {
        self.memory.as_ref().map(|r| r.revealed())
    }

    /// (finalized units, total units) of the active task, if any.
    pub fn progress(&self) -> Option<(usize, usize)> {
        match self.phase {
            Phase::Attention => self.attention.as_ref().map(|r| r.progress()),
            Phase::Memory => self.memory.as_ref().map(|r| r.progress()),
            Phase::Flexibility => self.flexibility.as_ref().map(|r| r.progress()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::SequencerError;
    use crate::gateway::LocalScoringGateway;
    use crate::memory::MEMORY_ROUNDS;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct FailingGateway;

    impl SubmissionGateway for FailingGateway {
        fn submit(
            &mut self,
            _request: &crate::types::SubmissionRequest,
        ) -> Result<SubmissionResponse, SequencerError> {
            Err(SequencerError::SubmissionTransport(
                "connection refused".into(),
            ))
        }
    }

    type Sequencer<G> = TestSequencer<ManualClock, StdRng, G>;

    fn sequencer<G: SubmissionGateway>(seed: u64, gateway: G) -> (Sequencer<G>, ManualClock) {
        let clock = ManualClock::new();
        let seq = TestSequencer::new(clock.clone(), StdRng::seed_from_u64(seed), gateway);
        (seq, clock)
    }

    /// Jump to the next pending deadline and dispatch it.
    fn fire_next<G: SubmissionGateway>(seq: &mut Sequencer<G>, clock: &ManualClock) {
        let due = seq.next_due_ms().expect("a timer should be pending");
        clock.set(due);
        seq.tick();
    }

    /// Answer every attention trial correctly with the given reaction time.
    /// Leaves the memory handoff timer pending.
    fn run_attention<G: SubmissionGateway>(seq: &mut Sequencer<G>, clock: &ManualClock, rt_ms: u64) {
        for _ in 0..crate::attention::ATTENTION_TRIALS {
            fire_next(seq, clock);
            let arrow = seq.current_arrow().expect("stimulus should be armed");
            clock.advance(rt_ms);
            seq.handle_input(UserInput::Direction(arrow));
        }
    }

    /// Play every memory round, reproducing the sequence exactly when
    /// `correct_rounds` still has budget, otherwise flipping one digit.
    fn run_memory<G: SubmissionGateway>(
        seq: &mut Sequencer<G>,
        clock: &ManualClock,
        mut correct_rounds: usize,
    ) {
        while seq.phase() == Phase::Memory {
            match seq.memory_stage() {
                Some(RoundStage::Reveal { .. }) => fire_next(seq, clock),
                Some(RoundStage::Input) => {
                    let round = seq.memory_round().expect("active round");
                    if round.is_finalized() {
                        fire_next(seq, clock);
                        continue;
                    }
                    let mut attempt = round.sequence.clone();
                    if correct_rounds == 0 {
                        attempt[0] = if attempt[0] == 9 { 1 } else { attempt[0] + 1 };
                    } else {
                        correct_rounds -= 1;
                    }
                    for digit in attempt {
                        clock.advance(150);
                        seq.handle_input(UserInput::Digit(digit));
                    }
                }
                None => fire_next(seq, clock),
            }
        }
    }

    /// Answer every Stroop trial by naming the ink color.
    fn run_flexibility<G: SubmissionGateway>(
        seq: &mut Sequencer<G>,
        clock: &ManualClock,
        rt_ms: u64,
    ) {
        while seq.phase() != Phase::Result {
            fire_next(seq, clock);
            if let Some((_word, ink)) = seq.current_stroop() {
                clock.advance(rt_ms);
                seq.handle_input(UserInput::Color(ink));
            }
        }
    }

    fn run_full_battery<G: SubmissionGateway>(seq: &mut Sequencer<G>, clock: &ManualClock) {
        seq.start();
        run_attention(seq, clock, 300);
        fire_next(seq, clock); // handoff into memory
        run_memory(seq, clock, MEMORY_ROUNDS);
        run_flexibility(seq, clock, 350);
    }

    #[test]
    fn test_first_stimulus_armed_after_settling_gap() {
        let (mut seq, clock) = sequencer(1, LocalScoringGateway);
        seq.start();

        assert_eq!(seq.phase(), Phase::Attention);
        assert_eq!(seq.next_due_ms(), Some(ATTENTION_TRIAL_GAP_MS));
        assert_eq!(seq.current_arrow(), None);

        clock.set(ATTENTION_TRIAL_GAP_MS - 1);
        seq.tick();
        assert_eq!(seq.current_arrow(), None);

        clock.set(ATTENTION_TRIAL_GAP_MS);
        seq.tick();
        assert!(seq.current_arrow().is_some());
    }

    #[test]
    fn test_start_is_ignored_outside_intro() {
        let (mut seq, _clock) = sequencer(1, LocalScoringGateway);
        seq.start();
        let pending = seq.pending_timers();
        seq.start();
        assert_eq!(seq.pending_timers(), pending);
        assert_eq!(seq.phase(), Phase::Attention);
    }

    #[test]
    fn test_input_before_arming_is_absorbed() {
        let (mut seq, _clock) = sequencer(2, LocalScoringGateway);
        seq.start();

        seq.handle_input(UserInput::Direction(Direction::Up));
        assert_eq!(seq.progress(), Some((0, 15)));
    }

    #[test]
    fn test_rapid_double_response_records_only_first() {
        let (mut seq, clock) = sequencer(3, LocalScoringGateway);
        seq.start();
        fire_next(&mut seq, &clock);

        let arrow = seq.current_arrow().unwrap();
        clock.advance(280);
        seq.handle_input(UserInput::Direction(arrow));
        // Second press a few ms later must be a no-op.
        clock.advance(5);
        seq.handle_input(UserInput::Direction(arrow));

        assert_eq!(seq.progress(), Some((1, 15)));
        assert_eq!(seq.current_arrow(), None);
    }

    #[test]
    fn test_memory_begins_after_handoff_delay() {
        let (mut seq, clock) = sequencer(4, LocalScoringGateway);
        seq.start();
        run_attention(&mut seq, &clock, 300);

        // The attention runner handed back its list; memory is not yet
        // constructed.
        assert_eq!(seq.phase(), Phase::Attention);
        let finished_at = clock.now_ms();
        assert_eq!(seq.next_due_ms(), Some(finished_at + ATTENTION_HANDOFF_MS));

        fire_next(&mut seq, &clock);
        assert_eq!(seq.phase(), Phase::Memory);
        assert!(matches!(
            seq.memory_stage(),
            Some(RoundStage::Reveal { shown: 0 })
        ));
    }

    #[test]
    fn test_memory_input_opens_one_step_after_last_reveal() {
        let (mut seq, clock) = sequencer(5, LocalScoringGateway);
        seq.start();
        run_attention(&mut seq, &clock, 300);
        fire_next(&mut seq, &clock);

        let begun_at = clock.now_ms();
        let len = seq.memory_round().unwrap().sequence.len();

        // Digits reveal at +500, +1300, ... input opens 800ms after the
        // last digit.
        for shown in 1..=len {
            fire_next(&mut seq, &clock);
            assert_eq!(seq.memory_revealed().unwrap().len(), shown);
            assert_eq!(
                clock.now_ms(),
                begun_at + MEMORY_LEAD_IN_MS + (shown as u64 - 1) * MEMORY_REVEAL_STEP_MS
            );
        }
        fire_next(&mut seq, &clock);
        assert_eq!(seq.memory_stage(), Some(RoundStage::Input));
        assert_eq!(
            clock.now_ms(),
            begun_at + MEMORY_LEAD_IN_MS + (len as u64) * MEMORY_REVEAL_STEP_MS
        );
    }

    #[test]
    fn test_digits_rejected_during_reveal() {
        let (mut seq, clock) = sequencer(6, LocalScoringGateway);
        seq.start();
        run_attention(&mut seq, &clock, 300);
        fire_next(&mut seq, &clock);

        seq.handle_input(UserInput::Digit(5));
        seq.handle_input(UserInput::Erase);
        assert!(seq.memory_round().unwrap().user_input.is_empty());
    }

    #[test]
    fn test_flexibility_not_constructed_until_memory_completes() {
        let (mut seq, clock) = sequencer(7, LocalScoringGateway);
        seq.start();
        run_attention(&mut seq, &clock, 300);
        fire_next(&mut seq, &clock);

        assert_eq!(seq.current_stroop(), None);
        run_memory(&mut seq, &clock, MEMORY_ROUNDS);
        assert_eq!(seq.phase(), Phase::Flexibility);
        // Stroop gap precedes the first arm.
        assert!(seq.current_stroop().is_none());
        fire_next(&mut seq, &clock);
        assert!(seq.current_stroop().is_some());
    }

    #[test]
    fn test_full_battery_reaches_result_with_scores() {
        let (mut seq, clock) = sequencer(8, LocalScoringGateway);
        run_full_battery(&mut seq, &clock);

        assert_eq!(seq.phase(), Phase::Result);
        assert!(seq.phase().is_terminal());
        assert_eq!(seq.pending_timers(), 0);

        let outcome = seq.outcome().expect("terminal outcome");
        assert_eq!(outcome.request.attention.total_trials, 15);
        assert_eq!(outcome.request.attention.correct_rate, 1.0);
        assert_eq!(outcome.request.attention.avg_reaction_ms, 300.0);
        assert_eq!(outcome.request.memory.correct_count, 5);
        assert_eq!(outcome.request.flexibility.total_trials, 15);
        assert_eq!(outcome.request.flexibility.avg_reaction_ms, 350.0);
        assert!(outcome.response.pillar3_score.is_some());
        assert_eq!(outcome.session_id, seq.session_id());
    }

    #[test]
    fn test_partially_incorrect_memory_counts_correctly() {
        let (mut seq, clock) = sequencer(9, LocalScoringGateway);
        seq.start();
        run_attention(&mut seq, &clock, 300);
        fire_next(&mut seq, &clock);
        run_memory(&mut seq, &clock, 3);
        run_flexibility(&mut seq, &clock, 350);

        let outcome = seq.outcome().unwrap();
        assert_eq!(outcome.request.memory.correct_count, 3);
        assert_eq!(outcome.request.memory.total_trials, 5);
    }

    #[test]
    fn test_submission_failure_still_terminates_with_zeroed_scores() {
        let (mut seq, clock) = sequencer(10, FailingGateway);
        run_full_battery(&mut seq, &clock);

        assert_eq!(seq.phase(), Phase::Result);
        let outcome = seq.outcome().unwrap();
        assert_eq!(outcome.response, SubmissionResponse::zeroed());
        // The payload itself is intact even though scoring failed.
        assert_eq!(outcome.request.attention.total_trials, 15);
    }

    #[test]
    fn test_abort_cancels_pending_timers() {
        let (mut seq, clock) = sequencer(11, LocalScoringGateway);
        seq.start();
        fire_next(&mut seq, &clock);
        let arrow = seq.current_arrow().unwrap();
        clock.advance(300);
        seq.handle_input(UserInput::Direction(arrow));
        assert!(seq.pending_timers() > 0);

        seq.abort();
        assert_eq!(seq.pending_timers(), 0);

        // Nothing stale fires, no input lands, phase stays put.
        clock.advance(60_000);
        seq.tick();
        seq.handle_input(UserInput::Direction(Direction::Left));
        assert_eq!(seq.phase(), Phase::Attention);
        assert_eq!(seq.current_arrow(), None);
        assert!(seq.outcome().is_none());
    }

    #[test]
    fn test_cross_phase_inputs_are_absorbed() {
        let (mut seq, clock) = sequencer(12, LocalScoringGateway);
        seq.start();
        fire_next(&mut seq, &clock);

        // Digits and colors during the attention phase change nothing.
        seq.handle_input(UserInput::Digit(4));
        seq.handle_input(UserInput::Color(StroopColor::Red));
        seq.handle_input(UserInput::Erase);
        assert_eq!(seq.progress(), Some((0, 15)));
        assert!(seq.current_arrow().is_some());
    }

    #[test]
    fn test_seeded_runs_are_deterministic() {
        let (mut a, clock_a) = sequencer(99, LocalScoringGateway);
        run_full_battery(&mut a, &clock_a);
        let (mut b, clock_b) = sequencer(99, LocalScoringGateway);
        run_full_battery(&mut b, &clock_b);

        assert_eq!(a.outcome().unwrap().request, b.outcome().unwrap().request);
        assert_eq!(a.outcome().unwrap().response, b.outcome().unwrap().response);
    }
}
