//! The in-memory proof tree and its document root.

use crate::attestation::Attestation;
use crate::op::{HashAlgorithm, Operation};

/// A node in the proof tree: the set of attestations reachable at this
/// point plus the operations that continue the path further.
///
/// Attestations and continuations at the same node are parallel branches.
/// Order between the two groups is not semantically significant, but the
/// writer always emits attestations before continuations (spec §4.1), and
/// within each group in storage order — so `Timestamp` stores both as
/// ordered `Vec`s rather than a true unordered set, even though its
/// *semantic* identity (used by equality and the property tests) is its set
/// of attestation/continuation branches.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Timestamp {
    pub attestations: Vec<Attestation>,
    pub operations: Vec<(Operation, Timestamp)>,
}

impl Timestamp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attestation(attestation: Attestation) -> Self {
        Self {
            attestations: vec![attestation],
            operations: Vec::new(),
        }
    }

    /// Number of branches (attestations + continuations) at this node.
    pub(crate) fn branch_count(&self) -> usize {
        self.attestations.len() + self.operations.len()
    }

    /// `true` if no `Pending` attestation is reachable anywhere below this
    /// node.
    pub fn is_complete(&self) -> bool {
        !self
            .attestations
            .iter()
            .any(|a| matches!(a, Attestation::Pending { .. }))
            && self.operations.iter().all(|(_, t)| t.is_complete())
    }
}

/// The document root: a hash algorithm, the digest of the original file
/// under that algorithm, and the proof tree rooted at that digest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtsFile {
    pub hash_algorithm: HashAlgorithm,
    pub file_digest: Vec<u8>,
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_complete_false_with_pending_leaf() {
        let t = Timestamp::with_attestation(Attestation::Pending {
            uri: "https://example.org".to_string(),
        });
        assert!(!t.is_complete());
    }

    #[test]
    fn is_complete_true_with_only_bitcoin() {
        let t = Timestamp::with_attestation(Attestation::Bitcoin { height: 1 });
        assert!(t.is_complete());
    }

    #[test]
    fn is_complete_recurses_into_continuations() {
        let pending = Timestamp::with_attestation(Attestation::Pending {
            uri: "https://example.org".to_string(),
        });
        let root = Timestamp {
            attestations: vec![],
            operations: vec![(Operation::Sha256, pending)],
        };
        assert!(!root.is_complete());
    }
}
