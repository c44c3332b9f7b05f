//! Cogtest CLI - Command-line interface for the Braincap sequencer
//!
//! Commands:
//! - simulate: Run a full deterministic battery with a scripted respondent
//! - score: Apply the scoring formulas to a submission payload

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use rand::rngs::StdRng;
use rand::SeedableRng;

use braincap_sequencer::memory::{RoundStage, MEMORY_ROUNDS};
use braincap_sequencer::types::{SubmissionRequest, TestOutcome};
use braincap_sequencer::{
    LocalScoringGateway, ManualClock, Phase, SequencerError, SubmissionGateway, TestSequencer,
    UserInput, PRODUCER_NAME, SEQUENCER_VERSION,
};

/// Cogtest - Run and score the cognitive test battery
#[derive(Parser)]
#[command(name = "cogtest")]
#[command(version = SEQUENCER_VERSION)]
#[command(about = "Run and score the cognitive test battery", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full battery with a scripted respondent on a virtual clock
    Simulate {
        /// Seed for stimulus generation
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Scripted reaction time per trial, in milliseconds
        #[arg(long, default_value = "300")]
        reaction_ms: u64,

        /// Number of memory rounds the respondent gets wrong (0-5)
        #[arg(long, default_value = "0")]
        memory_errors: u32,

        /// Pretty-print the outcome record (default when stdout is a TTY)
        #[arg(long)]
        pretty: bool,
    },

    /// Score a submission payload with the local formulas
    Score {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Pretty-print the response
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("cogtest: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CogtestError> {
    match cli.command {
        Commands::Simulate {
            seed,
            reaction_ms,
            memory_errors,
            pretty,
        } => cmd_simulate(seed, reaction_ms, memory_errors, pretty),

        Commands::Score { input, pretty } => cmd_score(&input, pretty),
    }
}

/// Outcome record envelope with sequencer provenance.
#[derive(serde::Serialize)]
struct OutcomeRecord<'a> {
    producer: &'static str,
    version: &'static str,
    #[serde(flatten)]
    outcome: &'a TestOutcome,
}

fn cmd_simulate(
    seed: u64,
    reaction_ms: u64,
    memory_errors: u32,
    pretty: bool,
) -> Result<(), CogtestError> {
    let clock = ManualClock::new();
    let mut seq = TestSequencer::new(
        clock.clone(),
        StdRng::seed_from_u64(seed),
        LocalScoringGateway,
    );
    let mut wrong_budget = memory_errors.min(MEMORY_ROUNDS as u32);

    seq.start();
    while seq.phase() != Phase::Result {
        // Answer whatever stimulus is armed; otherwise jump the virtual
        // clock to the next pending deadline.
        if let Some(direction) = seq.current_arrow() {
            clock.advance(reaction_ms);
            seq.handle_input(UserInput::Direction(direction));
            continue;
        }
        if let Some((_word, ink)) = seq.current_stroop() {
            clock.advance(reaction_ms);
            seq.handle_input(UserInput::Color(ink));
            continue;
        }
        if seq.memory_stage() == Some(RoundStage::Input) {
            if let Some(round) = seq.memory_round() {
                if !round.is_finalized() {
                    let mut attempt = round.sequence.clone();
                    if wrong_budget > 0 {
                        wrong_budget -= 1;
                        attempt[0] = if attempt[0] == 9 { 1 } else { attempt[0] + 1 };
                    }
                    for digit in attempt {
                        clock.advance(reaction_ms);
                        seq.handle_input(UserInput::Digit(digit));
                    }
                    continue;
                }
            }
        }
        match seq.next_due_ms() {
            Some(due) => {
                clock.set(due);
                seq.tick();
            }
            None => return Err(CogtestError::Stalled),
        }
    }

    let outcome = seq.outcome().ok_or(CogtestError::Stalled)?;
    let record = OutcomeRecord {
        producer: PRODUCER_NAME,
        version: SEQUENCER_VERSION,
        outcome,
    };
    print_json(&record, pretty)
}

fn cmd_score(input: &PathBuf, pretty: bool) -> Result<(), CogtestError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let request: SubmissionRequest = serde_json::from_str(&input_data)?;
    let response = LocalScoringGateway.submit(&request)?;
    print_json(&response, pretty)
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<(), CogtestError> {
    let rendered = if pretty || atty::is(atty::Stream::Stdout) {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", rendered);
    Ok(())
}

// Error types

#[derive(Debug)]
enum CogtestError {
    Io(io::Error),
    Json(serde_json::Error),
    Sequencer(SequencerError),
    Stalled,
}

impl std::fmt::Display for CogtestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CogtestError::Io(e) => write!(f, "io error: {}", e),
            CogtestError::Json(e) => write!(f, "json error: {}", e),
            CogtestError::Sequencer(e) => write!(f, "{}", e),
            CogtestError::Stalled => {
                write!(f, "battery stalled: no armed stimulus and no pending timer")
            }
        }
    }
}

impl From<io::Error> for CogtestError {
    fn from(e: io::Error) -> Self {
        CogtestError::Io(e)
    }
}

impl From<serde_json::Error> for CogtestError {
    fn from(e: serde_json::Error) -> Self {
        CogtestError::Json(e)
    }
}

impl From<SequencerError> for CogtestError {
    fn from(e: SequencerError) -> Self {
        CogtestError::Sequencer(e)
    }
}
