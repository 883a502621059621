//! Replays a proof tree against a target message and checks any Bitcoin
//! attestations reached along the way against a real block header.

use crate::attestation::Attestation;
use crate::collaborators::{BlockLookup, Collaborators, HashOracle};
use crate::error::VerifyError;
use crate::op::apply;
use crate::timestamp::{OtsFile, Timestamp};
use crate::util::ct_eq;

/// What to verify: the parsed proof plus either the original message it was
/// computed over, or an already-computed digest to compare directly against
/// `file.file_digest`.
pub struct VerifyInput<'a> {
    pub file: &'a OtsFile,
    pub target: VerifyTarget<'a>,
}

/// The pre-image supplied alongside a proof: raw data that still needs
/// hashing, or a digest a caller already computed.
pub enum VerifyTarget<'a> {
    Data(&'a [u8]),
    Digest(&'a [u8]),
}

/// The outcome of checking a single attestation reached while replaying the
/// tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathResult {
    /// The computed digest at this leaf matches the Bitcoin block's merkle
    /// root at the claimed height.
    BitcoinConfirmed {
        height: u64,
        block_hash: String,
        block_time: u64,
    },
    /// The computed digest does not match the block's merkle root.
    BitcoinMismatch {
        height: u64,
        expected: Vec<u8>,
        computed: Vec<u8>,
    },
    /// Litecoin/Ethereum attestations are recognized but never checked
    /// against a real chain (see crate-level Non-goals); surfaced so a
    /// caller knows one was present.
    Unchecked(Attestation),
    /// Still waiting on a calendar server to confirm.
    Pending { uri: String },
    /// The path could not be followed to a verdict: a block lookup failed,
    /// an operation could not be applied, or the path exceeded the maximum
    /// traversal depth.
    Error(String),
}

/// Replays every path of a proof tree and checks Bitcoin attestations.
pub struct Verifier {
    collaborators: Collaborators,
    max_depth: usize,
}

impl Verifier {
    /// Build a verifier with the default 256-deep traversal cap (spec §6).
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            max_depth: crate::Config::default().max_depth,
        }
    }

    /// Build a verifier whose traversal depth cap comes from `config`,
    /// matching the same bound the parser enforces for this proof.
    pub fn with_config(collaborators: Collaborators, config: &crate::Config) -> Self {
        Self {
            collaborators,
            max_depth: config.max_depth,
        }
    }

    /// Verify `input.file` against `input.target`, returning one
    /// [`PathResult`] per attestation reachable in the tree.
    ///
    /// Fails outright only if `file_digest` does not match the computed or
    /// supplied digest — every other outcome, including a Bitcoin mismatch,
    /// is reported per-path rather than raised as an error.
    pub async fn verify(&self, input: VerifyInput<'_>) -> Result<Vec<PathResult>, VerifyError> {
        let computed = match input.target {
            VerifyTarget::Data(message) => self
                .collaborators
                .hash_oracle
                .digest(input.file.hash_algorithm, message)
                .map_err(|_| VerifyError::DigestMismatch)?,
            VerifyTarget::Digest(digest) => digest.to_vec(),
        };

        if !ct_eq(&computed, &input.file.file_digest) {
            return Err(VerifyError::DigestMismatch);
        }

        let mut results = Vec::new();
        self.walk(&input.file.timestamp, &computed, 0, &mut results)
            .await;
        Ok(results)
    }

    fn walk<'a>(
        &'a self,
        node: &'a Timestamp,
        msg: &'a [u8],
        depth: usize,
        results: &'a mut Vec<PathResult>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            if depth > self.max_depth {
                results.push(PathResult::Error(format!(
                    "proof tree exceeds the maximum depth of {}",
                    self.max_depth
                )));
                return;
            }

            for attestation in &node.attestations {
                let outcome = self.check_attestation(attestation, msg).await;
                results.push(outcome);
            }

            for (op, child) in &node.operations {
                match apply(op, msg, self.collaborators.hash_oracle.as_ref()) {
                    Ok(next_msg) => self.walk(child, &next_msg, depth + 1, results).await,
                    Err(_) => results.push(PathResult::Error(format!(
                        "operation {} could not be applied",
                        op.label()
                    ))),
                }
            }
        })
    }

    async fn check_attestation(&self, attestation: &Attestation, msg: &[u8]) -> PathResult {
        match attestation {
            Attestation::Bitcoin { height } => self.check_bitcoin(*height, msg).await,
            Attestation::Litecoin { .. } | Attestation::Ethereum { .. } => {
                PathResult::Unchecked(attestation.clone())
            }
            Attestation::Pending { uri } => PathResult::Pending { uri: uri.clone() },
            Attestation::Unknown { .. } => PathResult::Unchecked(attestation.clone()),
        }
    }

    async fn check_bitcoin(&self, height: u64, msg: &[u8]) -> PathResult {
        match self.collaborators.block_lookup.block_by_height(height).await {
            Ok(info) => match hex::decode(&info.merkle_root_hex) {
                Ok(mut root_bytes) => {
                    // Block explorers report the merkle root in big-endian
                    // display order; the proof's leaf digest is produced in
                    // internal (little-endian) byte order.
                    root_bytes.reverse();
                    if ct_eq(&root_bytes, msg) {
                        PathResult::BitcoinConfirmed {
                            height,
                            block_hash: info.block_hash,
                            block_time: info.timestamp,
                        }
                    } else {
                        tracing::warn!(height, "computed digest does not match block merkle root");
                        PathResult::BitcoinMismatch {
                            height,
                            expected: root_bytes,
                            computed: msg.to_vec(),
                        }
                    }
                }
                Err(_) => PathResult::Error(format!(
                    "block {height}: malformed merkle root in explorer response"
                )),
            },
            Err(e) => PathResult::Error(format!("block {height}: {e}")),
        }
    }
}

/// Convenience constructor for callers that only need the default,
/// production collaborators.
impl Default for Verifier {
    fn default() -> Self {
        Self::new(Collaborators::from_config(&crate::Config::default()))
    }
}
