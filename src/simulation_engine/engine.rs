use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::shared::{ConvergenceOutcome, SimError, TieBreak, UpdateMode, ASN, DEFAULT_MAX_ROUNDS};
use crate::simulation_engine::policy::PolicyStore;

/// Chosen next-hop of every AS. `None` means the AS never found a route.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NextHops(Vec<Option<ASN>>);

impl NextHops {
    pub fn get(&self, asn: ASN) -> Option<ASN> {
        self.0.get(asn).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Option<ASN>] {
        &self.0
    }

    /// Hops with unset entries written as AS 0, the layout the reference
    /// model prints.
    pub fn to_dense(&self) -> Vec<ASN> {
        self.0.iter().map(|hop| hop.unwrap_or(0)).collect()
    }
}

/// Measurements of one finished round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundStats {
    /// 1-based round index.
    pub round: u32,
    /// Number of ASes whose next-hop or availability changed.
    pub changes: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct ConvergenceResult {
    pub destination: ASN,
    pub next_hops: NextHops,
    /// Number of rounds actually run, including the final quiet round when
    /// the run converged.
    pub rounds: u32,
    pub outcome: ConvergenceOutcome,
    /// ASes that had a route to the destination after the last round.
    pub available: usize,
    pub round_stats: Vec<RoundStats>,
}

impl ConvergenceResult {
    pub fn converged(&self) -> bool {
        self.outcome == ConvergenceOutcome::Converged
    }
}

/// Working state of one `compute_next_hop` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergenceState {
    destination: ASN,
    hops: Vec<Option<ASN>>,
    available: Vec<bool>,
    rounds: u32,
}

impl ConvergenceState {
    /// Only the destination is available and it routes to itself.
    pub fn new(destination: ASN, num_participants: usize) -> Result<Self, SimError> {
        if num_participants == 0 {
            return Err(SimError::NoParticipants);
        }
        if destination >= num_participants {
            return Err(SimError::DestinationOutOfRange {
                destination,
                num_participants,
            });
        }

        let mut hops = vec![None; num_participants];
        let mut available = vec![false; num_participants];
        hops[destination] = Some(destination);
        available[destination] = true;

        Ok(ConvergenceState {
            destination,
            hops,
            available,
            rounds: 0,
        })
    }

    pub fn destination(&self) -> ASN {
        self.destination
    }

    pub fn num_participants(&self) -> usize {
        self.hops.len()
    }

    /// `None` for an unset hop or an `asn` outside the state.
    pub fn hop(&self, asn: ASN) -> Option<ASN> {
        self.hops.get(asn).copied().flatten()
    }

    pub fn hops(&self) -> &[Option<ASN>] {
        &self.hops
    }

    pub fn is_available(&self, asn: ASN) -> bool {
        self.available.get(asn).copied().unwrap_or(false)
    }

    pub fn available_count(&self) -> usize {
        self.available.iter().filter(|&&a| a).count()
    }

    /// Rounds applied to this state so far.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Candidate `asn` would pick from the current state, or `None` if no
    /// entry of its ordering is eligible.
    ///
    /// A candidate is eligible when it is available and its export policy,
    /// for the next-hop it currently uses, exports to `asn`.
    pub fn choose_next_hop(
        &self,
        asn: ASN,
        policies: &PolicyStore,
        tie_break: TieBreak,
    ) -> Option<ASN> {
        let mut chosen = None;
        for &candidate in policies[asn].ordering() {
            if !self.available[candidate] {
                continue;
            }
            let Some(via) = self.hops[candidate] else {
                continue;
            };
            if policies[candidate].export_policy().get(via, asn) {
                chosen = Some(candidate);
                if tie_break == TieBreak::FirstEligible {
                    break;
                }
            }
        }
        chosen
    }

    /// Store the outcome of `asn`'s scan. Returns whether anything changed.
    fn apply(&mut self, asn: ASN, choice: Option<ASN>) -> bool {
        let mut changed = false;
        match choice {
            Some(next_hop) => {
                if self.hops[asn] != Some(next_hop) {
                    log::trace!("AS {} switches next-hop {:?} -> {}", asn, self.hops[asn], next_hop);
                    self.hops[asn] = Some(next_hop);
                    changed = true;
                }
                if !self.available[asn] {
                    self.available[asn] = true;
                    changed = true;
                }
            }
            None => {
                if self.available[asn] {
                    log::trace!("AS {} lost its route", asn);
                    self.available[asn] = false;
                    changed = true;
                }
            }
        }
        changed
    }

    pub fn into_next_hops(self) -> NextHops {
        NextHops(self.hops)
    }
}

/// Round-based fixed-point computation of every AS's next-hop towards a
/// single destination.
///
/// Nothing tracks AS paths, so a run may settle on a cyclic hop assignment
/// or oscillate until the round cap.
#[derive(Debug)]
pub struct ConvergenceEngine {
    pub max_rounds: u32,
    pub tie_break: TieBreak,
    pub update_mode: UpdateMode,
    pool: Option<rayon::ThreadPool>,
}

impl Default for ConvergenceEngine {
    fn default() -> Self {
        ConvergenceEngine::new()
    }
}

impl ConvergenceEngine {
    pub fn new() -> Self {
        ConvergenceEngine {
            max_rounds: DEFAULT_MAX_ROUNDS,
            tie_break: TieBreak::default(),
            update_mode: UpdateMode::default(),
            pool: None,
        }
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

    /// Evaluate the ASes of a synchronous round on a pool of `threads`
    /// workers. In-place rounds ignore the pool.
    pub fn with_threads(mut self, threads: usize) -> Result<Self, SimError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?;
        self.pool = Some(pool);
        Ok(self)
    }

    /// Run rounds until one produces no change or `max_rounds` is reached.
    ///
    /// Hitting the cap is not an error; the result carries the hops as of
    /// the last round together with `ConvergenceOutcome::IterationCapReached`.
    pub fn compute_next_hop(
        &self,
        destination: ASN,
        policies: &PolicyStore,
    ) -> Result<ConvergenceResult, SimError> {
        if self.max_rounds == 0 {
            return Err(SimError::MaxRoundsZero);
        }
        let mut state = ConvergenceState::new(destination, policies.len())?;
        let mut round_stats = Vec::new();

        let outcome = loop {
            let stats = self.run_round(&mut state, policies)?;
            log::debug!(
                "Loop {} took {} usecs, {} changes",
                stats.round,
                stats.elapsed.as_micros(),
                stats.changes
            );
            round_stats.push(stats);

            if stats.changes == 0 {
                break ConvergenceOutcome::Converged;
            }
            if state.rounds() >= self.max_rounds {
                log::warn!(
                    "no convergence towards AS {} after {} rounds",
                    destination,
                    state.rounds()
                );
                break ConvergenceOutcome::IterationCapReached;
            }
        };

        log::info!("Took {} iters ({})", state.rounds(), outcome);

        Ok(ConvergenceResult {
            destination,
            rounds: state.rounds(),
            outcome,
            available: state.available_count(),
            next_hops: state.into_next_hops(),
            round_stats,
        })
    }

    /// Re-evaluate every non-destination AS once.
    ///
    /// Fails without touching `state` when it was created for a different
    /// participant count than `policies`.
    pub fn run_round(
        &self,
        state: &mut ConvergenceState,
        policies: &PolicyStore,
    ) -> Result<RoundStats, SimError> {
        if state.num_participants() != policies.len() {
            return Err(SimError::StateMismatch {
                state: state.num_participants(),
                policies: policies.len(),
            });
        }
        let start = Instant::now();
        let destination = state.destination();
        let mut changes = 0;

        match self.update_mode {
            UpdateMode::Synchronous => {
                let snapshot: &ConvergenceState = state;
                let choose = |asn: ASN| {
                    if asn == destination {
                        None
                    } else {
                        snapshot.choose_next_hop(asn, policies, self.tie_break)
                    }
                };
                let choices: Vec<Option<ASN>> = match &self.pool {
                    Some(pool) => {
                        pool.install(|| (0..policies.len()).into_par_iter().map(choose).collect())
                    }
                    None => (0..policies.len()).map(choose).collect(),
                };

                for (asn, choice) in choices.into_iter().enumerate() {
                    if asn != destination && state.apply(asn, choice) {
                        changes += 1;
                    }
                }
            }
            UpdateMode::InPlace => {
                for asn in 0..policies.len() {
                    if asn == destination {
                        continue;
                    }
                    let choice = state.choose_next_hop(asn, policies, self.tie_break);
                    if state.apply(asn, choice) {
                        changes += 1;
                    }
                }
            }
        }

        state.rounds += 1;
        Ok(RoundStats {
            round: state.rounds,
            changes,
            elapsed: start.elapsed(),
        })
    }
}
