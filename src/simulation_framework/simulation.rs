use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use crate::shared::SimError;
use crate::simulation_engine::{make_source, ConvergenceEngine, ConvergenceResult, PolicyGenerator, PolicyStore};

use super::simulation_config::SimulationConfig;

/// Seeds the random source, generates every AS's policy and runs the
/// convergence engine towards the configured destination.
pub struct Simulation {
    pub config: SimulationConfig,
}

/// Output of one simulation run.
#[derive(Debug)]
pub struct SimulationRun {
    pub policies: PolicyStore,
    pub result: ConvergenceResult,
    /// Time spent generating policies
    pub init_elapsed: Duration,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Simulation { config }
    }

    pub fn run(&self) -> Result<SimulationRun, SimError> {
        self.config.validate()?;
        log::info!(
            "simulating {} ASes towards AS {} (seed {}, {} rng)",
            self.config.num_participants,
            self.config.destination,
            self.config.seed,
            self.config.rng
        );

        let start = Instant::now();
        let policies = self.generate_policies()?;
        let init_elapsed = start.elapsed();
        log::info!("Initialization took {} usec", init_elapsed.as_micros());

        let engine = self.build_engine()?;
        let result = engine.compute_next_hop(self.config.destination, &policies)?;

        Ok(SimulationRun {
            policies,
            result,
            init_elapsed,
        })
    }

    /// Policies for all ASes from a freshly seeded source.
    pub fn generate_policies(&self) -> Result<PolicyStore, SimError> {
        let mut generator = PolicyGenerator::new(make_source(self.config.rng, self.config.seed));

        if !self.config.show_progress {
            return generator.generate_all(self.config.num_participants);
        }

        let pb = ProgressBar::new(self.config.num_participants as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} policies")?
                .progress_chars("##-"),
        );
        generator.generate_all_with_progress(self.config.num_participants, Some(&pb))
    }

    pub fn build_engine(&self) -> Result<ConvergenceEngine, SimError> {
        let engine = ConvergenceEngine::new()
            .with_max_rounds(self.config.max_rounds)
            .with_tie_break(self.config.tie_break)
            .with_update_mode(self.config.update_mode);

        if self.config.parallel {
            engine.with_threads(self.config.threads)
        } else {
            Ok(engine)
        }
    }
}
