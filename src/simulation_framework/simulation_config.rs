use std::fs;
use std::path::Path;

use crate::shared::{RngKind, SimError, TieBreak, UpdateMode, ASN, DEFAULT_MAX_ROUNDS};

/// Everything one simulation run needs.
///
/// Missing keys in a JSON config fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of ASes
    pub num_participants: usize,

    /// Seed for the policy generator's random source, used once per run
    pub seed: i64,

    /// AS every other AS tries to reach
    pub destination: ASN,

    /// Round cap for the convergence engine
    pub max_rounds: u32,

    /// Which eligible candidate wins the scan over an ordering
    pub tie_break: TieBreak,

    /// Whether a round reads a snapshot or its own in-place writes
    pub update_mode: UpdateMode,

    /// Random stream for policy generation
    pub rng: RngKind,

    /// Evaluate synchronous rounds on a worker pool
    pub parallel: bool,

    /// Size of the worker pool when `parallel` is set
    pub threads: usize,

    /// Show a progress bar while generating policies
    pub show_progress: bool,
}

impl SimulationConfig {
    pub fn new(num_participants: usize, seed: i64) -> Self {
        SimulationConfig {
            num_participants,
            seed,
            ..SimulationConfig::default()
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, SimError> {
        let contents = fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn with_destination(mut self, destination: ASN) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn with_update_mode(mut self, update_mode: UpdateMode) -> Self {
        self.update_mode = update_mode;
        self
    }

    pub fn with_rng(mut self, rng: RngKind) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_parallel(mut self, threads: usize) -> Self {
        self.parallel = true;
        self.threads = threads;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Reject configs the engine cannot run.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.num_participants == 0 {
            return Err(SimError::NoParticipants);
        }
        if self.destination >= self.num_participants {
            return Err(SimError::DestinationOutOfRange {
                destination: self.destination,
                num_participants: self.num_participants,
            });
        }
        if self.max_rounds == 0 {
            return Err(SimError::MaxRoundsZero);
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            num_participants: 100,
            seed: 42,
            destination: 12,
            max_rounds: DEFAULT_MAX_ROUNDS,
            tie_break: TieBreak::default(),
            update_mode: UpdateMode::default(),
            rng: RngKind::default(),
            parallel: false,
            threads: num_cpus::get().max(1),
            show_progress: false,
        }
    }
}
