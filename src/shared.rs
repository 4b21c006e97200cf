use std::fmt;

/// Index of an AS in the simulation. ASes are numbered `0..num_participants`.
pub type ASN = usize;

/// Round cap of the reference model.
pub const DEFAULT_MAX_ROUNDS: u32 = 500;

/// Which eligible candidate an AS keeps after scanning its ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep overwriting the choice through the whole scan, so the last
    /// eligible entry of the ordering wins. This is the reference behavior.
    #[default]
    #[value(name = "last")]
    LastEligible,
    /// Stop at the first eligible entry of the ordering.
    #[value(name = "first")]
    FirstEligible,
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TieBreak::LastEligible => "LAST_ELIGIBLE",
            TieBreak::FirstEligible => "FIRST_ELIGIBLE",
        };
        write!(f, "{}", s)
    }
}

/// How writes made during a round become visible to later ASes of the same round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Every AS of a round reads the state as of the start of that round.
    #[default]
    Synchronous,
    /// Updates are written in place as the pass proceeds, so ASes later in
    /// the pass already see them.
    InPlace,
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UpdateMode::Synchronous => "SYNCHRONOUS",
            UpdateMode::InPlace => "IN_PLACE",
        };
        write!(f, "{}", s)
    }
}

/// Pseudo-random stream used for policy generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RngKind {
    /// POSIX `drand48` family stream, reproduces the reference program.
    #[default]
    Lrand48,
    /// `rand::rngs::StdRng` seeded from the same seed.
    StdRng,
}

impl fmt::Display for RngKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RngKind::Lrand48 => "LRAND48",
            RngKind::StdRng => "STD_RNG",
        };
        write!(f, "{}", s)
    }
}

/// Why a convergence run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceOutcome {
    /// A full round produced no change.
    Converged,
    /// The round cap was hit while ASes were still changing.
    IterationCapReached,
}

impl fmt::Display for ConvergenceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConvergenceOutcome::Converged => "CONVERGED",
            ConvergenceOutcome::IterationCapReached => "ITERATION_CAP_REACHED",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("The simulation needs at least one participant.")]
    NoParticipants,
    #[error("Destination AS {destination} is out of range for {num_participants} participants.")]
    DestinationOutOfRange {
        destination: ASN,
        num_participants: usize,
    },
    #[error("Policy for AS {as_number} does not match the simulation: {reason}")]
    ParticipantMismatch { as_number: ASN, reason: String },
    #[error("Ordering of AS {0} is not a permutation of all participants.")]
    InvalidOrdering(ASN),
    #[error("Export policy of AS {as_number} has {len} entries, expected {expected}.")]
    ExportPolicyShape {
        as_number: ASN,
        len: usize,
        expected: usize,
    },
    #[error("Could not allocate policy buffers for {0} participants.")]
    Allocation(usize),
    #[error("Convergence state holds {state} participants but the policies describe {policies}.")]
    StateMismatch { state: usize, policies: usize },
    #[error("The round cap must be at least 1.")]
    MaxRoundsZero,
    #[error("Could not build the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Invalid progress bar template: {0}")]
    Progress(#[from] indicatif::style::TemplateError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
