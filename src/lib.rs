// Re-export all public modules
pub mod shared;
pub mod simulation_engine;
pub mod simulation_framework;

// Re-export commonly used types at the crate root
pub use shared::{ConvergenceOutcome, RngKind, SimError, TieBreak, UpdateMode, ASN};
pub use simulation_engine::{ConvergenceEngine, ConvergenceResult, PolicyGenerator, PolicyInput, PolicyStore};
pub use simulation_framework::{ConvergenceReport, Simulation, SimulationConfig};
