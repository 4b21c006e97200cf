pub mod data_tracker;
pub mod simulation;
pub mod simulation_config;

pub use data_tracker::ConvergenceReport;
pub use simulation::{Simulation, SimulationRun};
pub use simulation_config::SimulationConfig;
