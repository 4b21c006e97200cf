use indicatif::ProgressBar;

use crate::shared::{ASN, SimError};
use crate::simulation_engine::policy::{PolicyInput, PolicyStore};
use crate::simulation_engine::random::{rand_below, shuffle, RandomSource};

/// Draws random policies from a single seeded source.
///
/// Every record consumes the stream in the same order: first the shuffle of
/// its ordering, then one bit per export entry in row-major order.
pub struct PolicyGenerator<R: RandomSource> {
    source: R,
}

impl<R: RandomSource> PolicyGenerator<R> {
    pub fn new(source: R) -> Self {
        PolicyGenerator { source }
    }

    /// A uniformly random ordering and N² uniform export bits for one AS.
    pub fn generate(
        &mut self,
        as_number: ASN,
        num_participants: usize,
    ) -> Result<PolicyInput, SimError> {
        let mut policy = PolicyInput::new(as_number, num_participants)?;
        let (ordering, export_policy) = policy.parts_mut();

        shuffle(&mut self.source, ordering);
        for next_hop in 0..num_participants {
            for export_to in 0..num_participants {
                let bit = rand_below(&mut self.source, 2) == 1;
                export_policy.set(next_hop, export_to, bit);
            }
        }

        Ok(policy)
    }

    /// Policies for every AS `0..num_participants`, generated in AS order.
    pub fn generate_all(&mut self, num_participants: usize) -> Result<PolicyStore, SimError> {
        self.generate_all_with_progress(num_participants, None)
    }

    pub fn generate_all_with_progress(
        &mut self,
        num_participants: usize,
        progress: Option<&ProgressBar>,
    ) -> Result<PolicyStore, SimError> {
        if num_participants == 0 {
            return Err(SimError::NoParticipants);
        }
        let mut policies = Vec::new();
        policies
            .try_reserve_exact(num_participants)
            .map_err(|_| SimError::Allocation(num_participants))?;

        for as_number in 0..num_participants {
            policies.push(self.generate(as_number, num_participants)?);
            if let Some(pb) = progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish();
        }
        log::debug!("generated policies for {} ASes", num_participants);

        PolicyStore::new(policies)
    }
}
