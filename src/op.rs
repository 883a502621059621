//! Hash algorithms and the eight operation variants the replay engine
//! applies along a proof path.

use crate::collaborators::HashOracle;
use crate::error::OperationError;

/// A closed set of digest algorithms, identified on the wire by a single
/// tag byte. Keccak-256 is parseable but never executable (see crate-level
/// Non-goals).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha256,
    Sha1,
    Ripemd160,
    Keccak256,
}

impl HashAlgorithm {
    pub const fn tag(self) -> u8 {
        match self {
            HashAlgorithm::Sha256 => 0x08,
            HashAlgorithm::Sha1 => 0x02,
            HashAlgorithm::Ripemd160 => 0x03,
            HashAlgorithm::Keccak256 => 0x67,
        }
    }

    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x08 => Some(HashAlgorithm::Sha256),
            0x02 => Some(HashAlgorithm::Sha1),
            0x03 => Some(HashAlgorithm::Ripemd160),
            0x67 => Some(HashAlgorithm::Keccak256),
            _ => None,
        }
    }

    /// Digest length in bytes for this algorithm.
    pub const fn digest_len(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Ripemd160 => 20,
            HashAlgorithm::Keccak256 => 32,
        }
    }

    /// Display name used in rendered output, matching the mnemonics
    /// [`Operation::label`] already uses for the corresponding hash ops.
    pub const fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA256",
            HashAlgorithm::Sha1 => "SHA1",
            HashAlgorithm::Ripemd160 => "RIPEMD160",
            HashAlgorithm::Keccak256 => "KECCAK256",
        }
    }
}

/// A single node-to-child transformation along a proof path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Append(Vec<u8>),
    Prepend(Vec<u8>),
    Reverse,
    Hexlify,
    Sha256,
    Sha1,
    Ripemd160,
    Keccak256,
}

impl Operation {
    pub(crate) const fn tag(&self) -> u8 {
        match self {
            Operation::Append(_) => 0xF0,
            Operation::Prepend(_) => 0xF1,
            Operation::Reverse => 0xF2,
            Operation::Hexlify => 0xF3,
            Operation::Sha256 => HashAlgorithm::Sha256.tag(),
            Operation::Sha1 => HashAlgorithm::Sha1.tag(),
            Operation::Ripemd160 => HashAlgorithm::Ripemd160.tag(),
            Operation::Keccak256 => HashAlgorithm::Keccak256.tag(),
        }
    }

    /// Short mnemonic used by the [`crate::format`] module.
    pub(crate) fn label(&self) -> String {
        match self {
            Operation::Append(d) => format!("append({})", hex::encode(d)),
            Operation::Prepend(d) => format!("prepend({})", hex::encode(d)),
            Operation::Reverse => "reverse".to_string(),
            Operation::Hexlify => "hexlify".to_string(),
            Operation::Sha256 => "SHA256".to_string(),
            Operation::Sha1 => "SHA1".to_string(),
            Operation::Ripemd160 => "RIPEMD160".to_string(),
            Operation::Keccak256 => "KECCAK256".to_string(),
        }
    }
}

/// Apply `op` to `msg`, returning a freshly allocated result. Pure: never
/// mutates `msg` in place.
pub fn apply(
    op: &Operation,
    msg: &[u8],
    hash_oracle: &dyn HashOracle,
) -> Result<Vec<u8>, OperationError> {
    match op {
        Operation::Append(d) => {
            let mut out = Vec::with_capacity(msg.len() + d.len());
            out.extend_from_slice(msg);
            out.extend_from_slice(d);
            Ok(out)
        }
        Operation::Prepend(d) => {
            let mut out = Vec::with_capacity(msg.len() + d.len());
            out.extend_from_slice(d);
            out.extend_from_slice(msg);
            Ok(out)
        }
        Operation::Reverse => {
            let mut out = msg.to_vec();
            out.reverse();
            Ok(out)
        }
        Operation::Hexlify => Ok(hex::encode(msg).into_bytes()),
        Operation::Sha256 => hash_oracle.digest(HashAlgorithm::Sha256, msg),
        Operation::Sha1 => hash_oracle.digest(HashAlgorithm::Sha1, msg),
        Operation::Ripemd160 => hash_oracle.digest(HashAlgorithm::Ripemd160, msg),
        Operation::Keccak256 => hash_oracle.digest(HashAlgorithm::Keccak256, msg),
    }
}
