use std::path::PathBuf;

use clap::Parser;

use pathvector_sim::shared::{RngKind, TieBreak, UpdateMode};
use pathvector_sim::simulation_framework::{ConvergenceReport, Simulation, SimulationConfig};

/// Next-hop convergence towards a single destination under random AS policies.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of ASes [default: 100]. Below 13 also pass --destination,
    /// since the default destination is AS 12.
    #[arg(short, long)]
    size: Option<usize>,
    /// Seed of the random source [default: 42]
    #[arg(short = 'r', long = "random-seed", allow_negative_numbers = true)]
    seed: Option<i64>,
    /// Destination AS [default: 12]
    #[arg(short, long)]
    destination: Option<usize>,
    /// Stop after this many rounds even if ASes keep changing [default: 500]
    #[arg(long)]
    max_rounds: Option<u32>,
    /// Which eligible candidate of an ordering wins [default: last]
    #[arg(long, value_enum)]
    tie_break: Option<TieBreak>,
    /// Whether ASes of a round see each other's updates [default: synchronous]
    #[arg(long, value_enum)]
    update_mode: Option<UpdateMode>,
    /// Random stream used for policy generation [default: lrand48]
    #[arg(long, value_enum)]
    rng: Option<RngKind>,
    /// Evaluate synchronous rounds on a worker pool.
    #[arg(long)]
    parallel: bool,
    /// Worker pool size, implies --parallel [default: number of CPUs]
    #[arg(long)]
    threads: Option<usize>,
    /// Read the simulation config from a JSON file. Flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Write a JSON report of the run to this path.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Show a progress bar during policy generation.
    #[arg(long)]
    progress: bool,
    /// Do not list the next-hop of every AS.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn into_config(self) -> Result<(SimulationConfig, Option<PathBuf>, bool), Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_json_file(path)?,
            None => SimulationConfig::default(),
        };

        if let Some(size) = self.size {
            config.num_participants = size;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(destination) = self.destination {
            config.destination = destination;
        }
        if let Some(max_rounds) = self.max_rounds {
            config.max_rounds = max_rounds;
        }
        if let Some(tie_break) = self.tie_break {
            config.tie_break = tie_break;
        }
        if let Some(update_mode) = self.update_mode {
            config.update_mode = update_mode;
        }
        if let Some(rng) = self.rng {
            config.rng = rng;
        }
        if let Some(threads) = self.threads {
            config = config.with_parallel(threads);
        } else if self.parallel {
            config.parallel = true;
        }
        if self.progress {
            config = config.with_progress(true);
        }

        Ok((config, self.output, self.quiet))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let (config, output, quiet) = Args::parse().into_config()?;
    let simulation = Simulation::new(config);
    let run = simulation.run()?;
    let result = &run.result;
    let destination = simulation.config.destination;

    println!("Initialization took {} usec", run.init_elapsed.as_micros());
    println!("Total size {} KB", run.policies.total_bytes() / 1024);

    println!("Export policy for {}", destination);
    let row = run.policies[destination].export_policy().row(destination);
    let row: Vec<&str> = row.iter().map(|&export| if export { "1" } else { "0" }).collect();
    println!("{}", row.join(" "));

    for stats in &result.round_stats {
        println!("Loop {} took {} usecs", stats.round, stats.elapsed.as_micros());
    }
    println!("Took {} iters", result.rounds);
    if !result.converged() {
        println!("Stopped at the round cap without converging");
    }

    if !quiet {
        for (asn, hop) in result.next_hops.to_dense().iter().enumerate() {
            println!("{} {}", asn, hop);
        }
    }

    if let Some(path) = output {
        ConvergenceReport::from_run(&simulation.config, &run).save_to_file(&path)?;
        log::info!("wrote report to {:?}", path);
    }

    Ok(())
}
