use std::fs;
use std::path::Path;

use crate::shared::{ConvergenceOutcome, SimError, ASN};

use super::simulation::SimulationRun;
use super::simulation_config::SimulationConfig;

/// Summary of one run, written as JSON.
#[derive(Debug, Clone)]
pub struct ConvergenceReport {
    pub config: SimulationConfig,
    pub outcome: ConvergenceOutcome,
    pub rounds: u32,
    pub round_usecs: Vec<u64>,
    pub round_changes: Vec<usize>,
    pub init_usecs: u64,
    pub next_hops: Vec<Option<ASN>>,
    pub reachable: usize,
    pub policy_bytes: usize,
}

impl ConvergenceReport {
    pub fn from_run(config: &SimulationConfig, run: &SimulationRun) -> Self {
        let result = &run.result;
        ConvergenceReport {
            config: config.clone(),
            outcome: result.outcome,
            rounds: result.rounds,
            round_usecs: result
                .round_stats
                .iter()
                .map(|stats| stats.elapsed.as_micros() as u64)
                .collect(),
            round_changes: result.round_stats.iter().map(|stats| stats.changes).collect(),
            init_usecs: run.init_elapsed.as_micros() as u64,
            next_hops: result.next_hops.as_slice().to_vec(),
            reachable: result.available,
            policy_bytes: run.policies.total_bytes(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "config": self.config,
            "outcome": self.outcome,
            "rounds": self.rounds,
            "round_usecs": self.round_usecs,
            "round_changes": self.round_changes,
            "init_usecs": self.init_usecs,
            "next_hops": self.next_hops,
            "reachable": self.reachable,
            "policy_bytes": self.policy_bytes,
        })
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), SimError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.to_json())?;
        fs::write(path, json)?;
        Ok(())
    }
}
