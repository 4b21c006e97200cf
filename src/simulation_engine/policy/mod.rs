pub mod generator;

use std::mem;

use crate::shared::{ASN, SimError};

pub use generator::PolicyGenerator;

/// N×N export decisions of one AS, stored row-major in a flat buffer.
///
/// `get(h, d)` tells whether the AS, while routing via next-hop `h`,
/// exports that route to neighbor `d`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPolicy {
    num_participants: usize,
    entries: Vec<bool>,
}

impl ExportPolicy {
    /// An export policy that exports nothing.
    pub fn new(num_participants: usize) -> Result<Self, SimError> {
        let len = num_participants
            .checked_mul(num_participants)
            .ok_or(SimError::Allocation(num_participants))?;
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(len)
            .map_err(|_| SimError::Allocation(num_participants))?;
        entries.resize(len, false);

        Ok(ExportPolicy {
            num_participants,
            entries,
        })
    }

    pub fn from_entries(
        as_number: ASN,
        num_participants: usize,
        entries: Vec<bool>,
    ) -> Result<Self, SimError> {
        let expected = num_participants
            .checked_mul(num_participants)
            .ok_or(SimError::Allocation(num_participants))?;
        if entries.len() != expected {
            return Err(SimError::ExportPolicyShape {
                as_number,
                len: entries.len(),
                expected,
            });
        }
        Ok(ExportPolicy {
            num_participants,
            entries,
        })
    }

    #[inline]
    pub fn get(&self, next_hop: ASN, export_to: ASN) -> bool {
        self.entries[next_hop * self.num_participants + export_to]
    }

    #[inline]
    pub fn set(&mut self, next_hop: ASN, export_to: ASN, export: bool) {
        self.entries[next_hop * self.num_participants + export_to] = export;
    }

    /// Export decisions towards every neighbor while routing via `next_hop`.
    pub fn row(&self, next_hop: ASN) -> &[bool] {
        let start = next_hop * self.num_participants;
        &self.entries[start..start + self.num_participants]
    }

    pub fn entries(&self) -> &[bool] {
        &self.entries
    }

    pub fn num_participants(&self) -> usize {
        self.num_participants
    }
}

/// Preference ordering and export policy of a single AS towards the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyInput {
    as_number: ASN,
    num_participants: usize,
    ordering: Vec<ASN>,
    export_policy: ExportPolicy,
}

impl PolicyInput {
    /// Identity ordering, nothing exported.
    pub fn new(as_number: ASN, num_participants: usize) -> Result<Self, SimError> {
        if num_participants == 0 {
            return Err(SimError::NoParticipants);
        }
        let mut ordering = Vec::new();
        ordering
            .try_reserve_exact(num_participants)
            .map_err(|_| SimError::Allocation(num_participants))?;
        ordering.extend(0..num_participants);

        Ok(PolicyInput {
            as_number,
            num_participants,
            ordering,
            export_policy: ExportPolicy::new(num_participants)?,
        })
    }

    /// Assemble a policy from caller-supplied parts, checking that `ordering`
    /// is a permutation of `0..num_participants` and that `export_policy`
    /// has the matching size.
    pub fn from_parts(
        as_number: ASN,
        ordering: Vec<ASN>,
        export_policy: ExportPolicy,
    ) -> Result<Self, SimError> {
        let num_participants = ordering.len();
        if num_participants == 0 {
            return Err(SimError::NoParticipants);
        }
        if export_policy.num_participants() != num_participants {
            return Err(SimError::ExportPolicyShape {
                as_number,
                len: export_policy.entries().len(),
                expected: num_participants * num_participants,
            });
        }
        if !is_permutation(&ordering) {
            return Err(SimError::InvalidOrdering(as_number));
        }

        Ok(PolicyInput {
            as_number,
            num_participants,
            ordering,
            export_policy,
        })
    }

    pub fn with_ordering(self, ordering: Vec<ASN>) -> Result<Self, SimError> {
        if ordering.len() != self.num_participants {
            return Err(SimError::InvalidOrdering(self.as_number));
        }
        PolicyInput::from_parts(self.as_number, ordering, self.export_policy)
    }

    pub fn with_export(mut self, next_hop: ASN, export_to: ASN, export: bool) -> Self {
        self.export_policy.set(next_hop, export_to, export);
        self
    }

    pub fn as_number(&self) -> ASN {
        self.as_number
    }

    pub fn num_participants(&self) -> usize {
        self.num_participants
    }

    pub fn ordering(&self) -> &[ASN] {
        &self.ordering
    }

    pub fn export_policy(&self) -> &ExportPolicy {
        &self.export_policy
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut [ASN], &mut ExportPolicy) {
        (&mut self.ordering, &mut self.export_policy)
    }

    /// Heap bytes held by the ordering and export buffers.
    pub fn heap_bytes(&self) -> usize {
        self.ordering.capacity() * mem::size_of::<ASN>()
            + self.export_policy.entries.capacity() * mem::size_of::<bool>()
    }
}

fn is_permutation(ordering: &[ASN]) -> bool {
    let mut seen = vec![false; ordering.len()];
    for &asn in ordering {
        match seen.get_mut(asn) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}

/// Policies of every participant, indexed by AS number.
///
/// Construction checks that every record agrees on the participant count
/// and sits at the index of its own AS number, so the engine can index
/// freely afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyStore {
    policies: Vec<PolicyInput>,
}

impl PolicyStore {
    pub fn new(policies: Vec<PolicyInput>) -> Result<Self, SimError> {
        if policies.is_empty() {
            return Err(SimError::NoParticipants);
        }
        let num_participants = policies.len();
        for (index, policy) in policies.iter().enumerate() {
            if policy.as_number != index {
                return Err(SimError::ParticipantMismatch {
                    as_number: policy.as_number,
                    reason: format!("stored at index {}", index),
                });
            }
            if policy.num_participants != num_participants {
                return Err(SimError::ParticipantMismatch {
                    as_number: policy.as_number,
                    reason: format!(
                        "built for {} participants, store holds {}",
                        policy.num_participants, num_participants
                    ),
                });
            }
        }
        Ok(PolicyStore { policies })
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn get(&self, asn: ASN) -> Option<&PolicyInput> {
        self.policies.get(asn)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PolicyInput> {
        self.policies.iter()
    }

    pub fn as_slice(&self) -> &[PolicyInput] {
        &self.policies
    }

    pub fn into_inner(self) -> Vec<PolicyInput> {
        self.policies
    }

    /// Approximate memory footprint of all records, in bytes.
    pub fn total_bytes(&self) -> usize {
        self.policies.len() * mem::size_of::<PolicyInput>()
            + self.policies.iter().map(PolicyInput::heap_bytes).sum::<usize>()
    }
}

impl std::ops::Index<ASN> for PolicyStore {
    type Output = PolicyInput;

    fn index(&self, asn: ASN) -> &PolicyInput {
        &self.policies[asn]
    }
}
