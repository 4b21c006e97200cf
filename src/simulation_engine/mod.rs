pub mod engine;
pub mod policy;
pub mod random;

pub use engine::{ConvergenceEngine, ConvergenceResult, ConvergenceState, NextHops, RoundStats};
pub use policy::{ExportPolicy, PolicyGenerator, PolicyInput, PolicyStore};
pub use random::{make_source, Lrand48, RandomSource, StdRandomSource};
