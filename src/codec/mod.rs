//! Parser and writer for the binary `.ots` grammar:
//!
//! ```text
//! OtsFile     := Magic(31B) Version:varuint HashTag:1B FileDigest:N  Timestamp
//! Timestamp   := (Fork Branch)*  Branch
//! Fork        := 0xFF
//! Branch      := Attestation | Continuation
//! Attestation := 0x00 AttTag:8B VarBytes
//! Continuation:= Operation  Timestamp
//! Operation   := 0xF0 VarBytes | 0xF1 VarBytes | 0xF2 | 0xF3 | 0x08 | 0x02 | 0x03 | 0x67
//! VarBytes    := Length:varuint  Bytes(Length)
//! ```
//!
//! A node with *k* branches is encoded as `0xFF B1 0xFF B2 … 0xFF B(k-1) Bk`:
//! one fewer fork marker than branch, each marker immediately preceding the
//! sibling it introduces.

mod reader;
mod writer;

use reader::Reader;
use writer::Writer;

use crate::attestation::{Attestation, BITCOIN_TAG, ETHEREUM_TAG, LITECOIN_TAG, PENDING_TAG};
use crate::config::Config;
use crate::error::CodecError;
use crate::op::{HashAlgorithm, Operation};
use crate::timestamp::{OtsFile, Timestamp};

const MAGIC: [u8; 31] = *b"\x00OpenTimestamps\x00\x00Proof\x00\xbf\x89\xe2\xe8\x84\xe8\x92\x94";
const VERSION: u64 = 1;

const OP_APPEND: u8 = 0xF0;
const OP_PREPEND: u8 = 0xF1;
const OP_REVERSE: u8 = 0xF2;
const OP_HEXLIFY: u8 = 0xF3;
const FORK: u8 = 0xFF;
const ATTESTATION_MARKER: u8 = 0x00;

impl OtsFile {
    /// Parse a complete `.ots` file using [`Config::default`]'s limits.
    pub fn parse(data: &[u8]) -> Result<Self, CodecError> {
        Self::parse_with_config(data, &Config::default())
    }

    /// Parse a complete `.ots` file, enforcing `config`'s varbytes/depth
    /// caps.
    pub fn parse_with_config(data: &[u8], config: &Config) -> Result<Self, CodecError> {
        let mut r = Reader::new(data, config.max_varbytes);

        let magic = r.fixed::<31>().map_err(|_| CodecError::BadMagic)?;
        if magic != MAGIC {
            return Err(CodecError::BadMagic);
        }

        let version = r.varuint()?;
        if version != VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }

        let hash_tag = r.u8()?;
        let hash_algorithm =
            HashAlgorithm::from_tag(hash_tag).ok_or(CodecError::UnknownHashTag(hash_tag))?;

        let file_digest = r.bytes(hash_algorithm.digest_len())?.to_vec();

        let timestamp = parse_timestamp(&mut r, config.max_depth, 0)?;

        Ok(OtsFile {
            hash_algorithm,
            file_digest,
            timestamp,
        })
    }

    /// Serialize to the canonical `.ots` byte form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.bytes(&MAGIC);
        w.varuint(VERSION);
        w.u8(self.hash_algorithm.tag());
        w.bytes(&self.file_digest);
        write_timestamp(&mut w, &self.timestamp);
        w.into_bytes()
    }
}

impl Timestamp {
    /// Parse a standalone `Timestamp` (no file header), as returned by a
    /// calendar server's `/digest` or `/timestamp/{hex}` endpoints.
    pub fn parse_standalone(data: &[u8], config: &Config) -> Result<Self, CodecError> {
        let mut r = Reader::new(data, config.max_varbytes);
        parse_timestamp(&mut r, config.max_depth, 0)
    }

    /// Serialize a standalone `Timestamp` (no file header).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new();
        write_timestamp(&mut w, self);
        w.into_bytes()
    }
}

fn parse_timestamp(r: &mut Reader, max_depth: usize, depth: usize) -> Result<Timestamp, CodecError> {
    if depth > max_depth {
        return Err(CodecError::DepthExceeded(max_depth));
    }

    let mut attestations = Vec::new();
    let mut operations = Vec::new();

    loop {
        let is_fork = r.remaining() > 0 && r.peek_u8()? == FORK;
        if is_fork {
            r.u8()?;
        }

        let tag = r.peek_u8()?;
        if tag == ATTESTATION_MARKER {
            attestations.push(parse_attestation(r)?);
        } else {
            let op = parse_operation(r)?;
            let child = parse_timestamp(r, max_depth, depth + 1)?;
            operations.push((op, child));
        }

        if !is_fork {
            break;
        }
    }

    Ok(Timestamp {
        attestations,
        operations,
    })
}

fn parse_attestation(r: &mut Reader) -> Result<Attestation, CodecError> {
    r.u8()?; // 0x00 marker, already peeked by the caller.
    let tag: [u8; 8] = r.fixed::<8>()?;
    let payload = r.varbytes()?;

    Ok(match tag {
        BITCOIN_TAG => Attestation::Bitcoin {
            height: decode_height(&payload)?,
        },
        LITECOIN_TAG => Attestation::Litecoin {
            height: decode_height(&payload)?,
        },
        ETHEREUM_TAG => Attestation::Ethereum {
            height: decode_height(&payload)?,
        },
        PENDING_TAG => Attestation::Pending {
            uri: decode_pending_uri(&payload)?,
        },
        other => Attestation::Unknown {
            tag: other,
            payload,
        },
    })
}

/// Bitcoin/Litecoin/Ethereum attestation payloads are a single varuint
/// (the block height), itself wrapped in the outer varbytes envelope.
fn decode_height(payload: &[u8]) -> Result<u64, CodecError> {
    let mut pos = 0;
    let height = crate::util::read_varuint(payload, &mut pos)?;
    Ok(height)
}

/// `Pending`'s payload is a *nested* varbytes: the outer varbytes unwraps
/// once to `len || uri_bytes`, and a second read unwraps the inner length
/// prefix to get the URI bytes themselves.
fn decode_pending_uri(payload: &[u8]) -> Result<String, CodecError> {
    let mut inner = Reader::new(payload, payload.len());
    let uri_bytes = inner.varbytes()?;
    String::from_utf8(uri_bytes).map_err(|_| CodecError::InvalidUtf8)
}

fn parse_operation(r: &mut Reader) -> Result<Operation, CodecError> {
    let tag = r.u8()?;
    Ok(match tag {
        OP_APPEND => Operation::Append(r.varbytes()?),
        OP_PREPEND => Operation::Prepend(r.varbytes()?),
        OP_REVERSE => Operation::Reverse,
        OP_HEXLIFY => Operation::Hexlify,
        _ => match HashAlgorithm::from_tag(tag) {
            Some(HashAlgorithm::Sha256) => Operation::Sha256,
            Some(HashAlgorithm::Sha1) => Operation::Sha1,
            Some(HashAlgorithm::Ripemd160) => Operation::Ripemd160,
            Some(HashAlgorithm::Keccak256) => Operation::Keccak256,
            None => return Err(CodecError::UnknownOperationTag(tag)),
        },
    })
}

fn write_timestamp(w: &mut Writer, t: &Timestamp) {
    let total = t.branch_count().max(1);
    let mut emitted = 0;

    for attestation in &t.attestations {
        emitted += 1;
        if emitted < total {
            w.u8(FORK);
        }
        write_attestation(w, attestation);
    }

    for (op, child) in &t.operations {
        emitted += 1;
        if emitted < total {
            w.u8(FORK);
        }
        write_operation(w, op);
        write_timestamp(w, child);
    }
}

fn write_attestation(w: &mut Writer, attestation: &Attestation) {
    w.u8(ATTESTATION_MARKER);
    w.bytes(&attestation.tag());

    match attestation {
        Attestation::Bitcoin { height } | Attestation::Litecoin { height } | Attestation::Ethereum { height } => {
            let mut inner = Writer::new();
            inner.varuint(*height);
            w.varbytes(&inner.into_bytes());
        }
        Attestation::Pending { uri } => {
            let mut inner = Writer::new();
            inner.varbytes(uri.as_bytes());
            w.varbytes(&inner.into_bytes());
        }
        Attestation::Unknown { payload, .. } => {
            w.varbytes(payload);
        }
    }
}

fn write_operation(w: &mut Writer, op: &Operation) {
    match op {
        Operation::Append(d) => {
            w.u8(OP_APPEND);
            w.varbytes(d);
        }
        Operation::Prepend(d) => {
            w.u8(OP_PREPEND);
            w.varbytes(d);
        }
        Operation::Reverse => w.u8(OP_REVERSE),
        Operation::Hexlify => w.u8(OP_HEXLIFY),
        Operation::Sha256 => w.u8(HashAlgorithm::Sha256.tag()),
        Operation::Sha1 => w.u8(HashAlgorithm::Sha1.tag()),
        Operation::Ripemd160 => w.u8(HashAlgorithm::Ripemd160.tag()),
        Operation::Keccak256 => w.u8(HashAlgorithm::Keccak256.tag()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file() -> OtsFile {
        OtsFile {
            hash_algorithm: HashAlgorithm::Sha256,
            file_digest: vec![0u8; 32],
            timestamp: Timestamp::with_attestation(Attestation::Bitcoin { height: 358_391 }),
        }
    }

    #[test]
    fn rejects_bad_magic() {
        let data = [0x42u8; 31];
        assert_eq!(OtsFile::parse(&data), Err(CodecError::BadMagic));
    }

    #[test]
    fn rejects_short_input() {
        let data = [0x00u8; 10];
        assert_eq!(OtsFile::parse(&data), Err(CodecError::BadMagic));
    }

    #[test]
    fn roundtrip_single_attestation() {
        let file = sample_file();
        let bytes = file.to_bytes();
        assert_eq!(&bytes[..31], &MAGIC);
        let parsed = OtsFile::parse(&bytes).unwrap();
        assert_eq!(parsed, file);
    }

    #[test]
    fn roundtrip_fork_with_two_attestations() {
        let file = OtsFile {
            hash_algorithm: HashAlgorithm::Sha256,
            file_digest: vec![1u8; 32],
            timestamp: Timestamp {
                attestations: vec![
                    Attestation::Bitcoin { height: 100 },
                    Attestation::Pending {
                        uri: "https://example.org".to_string(),
                    },
                ],
                operations: vec![],
            },
        };
        let bytes = file.to_bytes();
        let parsed = OtsFile::parse(&bytes).unwrap();
        assert_eq!(parsed, file);
    }

    #[test]
    fn roundtrip_operation_chain() {
        let inner = Timestamp::with_attestation(Attestation::Bitcoin { height: 500_000 });
        let mid = Timestamp {
            attestations: vec![],
            operations: vec![(Operation::Sha256, inner)],
        };
        let file = OtsFile {
            hash_algorithm: HashAlgorithm::Sha256,
            file_digest: vec![2u8; 32],
            timestamp: Timestamp {
                attestations: vec![],
                operations: vec![(Operation::Prepend(vec![9, 9]), mid)],
            },
        };
        let bytes = file.to_bytes();
        let parsed = OtsFile::parse(&bytes).unwrap();
        assert_eq!(parsed, file);
    }

    #[test]
    fn roundtrip_unknown_attestation_preserved() {
        let file = OtsFile {
            hash_algorithm: HashAlgorithm::Sha256,
            file_digest: vec![3u8; 32],
            timestamp: Timestamp::with_attestation(Attestation::Unknown {
                tag: [1, 2, 3, 4, 5, 6, 7, 8],
                payload: vec![0xAB, 0xCD, 0xEF],
            }),
        };
        let bytes = file.to_bytes();
        let parsed = OtsFile::parse(&bytes).unwrap();
        assert_eq!(parsed, file);
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut w = Writer::new();
        w.bytes(&MAGIC);
        w.varuint(2);
        w.u8(HashAlgorithm::Sha256.tag());
        w.bytes(&[0u8; 32]);
        let bytes = w.into_bytes();
        assert_eq!(
            OtsFile::parse(&bytes),
            Err(CodecError::UnsupportedVersion(2))
        );
    }

    #[test]
    fn depth_exceeded_is_rejected() {
        let mut t = Timestamp::with_attestation(Attestation::Bitcoin { height: 1 });
        for _ in 0..300 {
            t = Timestamp {
                attestations: vec![],
                operations: vec![(Operation::Reverse, t)],
            };
        }
        let file = OtsFile {
            hash_algorithm: HashAlgorithm::Sha256,
            file_digest: vec![0u8; 32],
            timestamp: t,
        };
        let bytes = file.to_bytes();
        assert!(matches!(
            OtsFile::parse(&bytes),
            Err(CodecError::DepthExceeded(_))
        ));
    }

    #[test]
    fn varbytes_too_large_is_rejected() {
        let mut config = Config::default();
        config.max_varbytes = 4;
        let file = OtsFile {
            hash_algorithm: HashAlgorithm::Sha256,
            file_digest: vec![0u8; 32],
            timestamp: Timestamp {
                attestations: vec![],
                operations: vec![(
                    Operation::Append(vec![0u8; 10]),
                    Timestamp::with_attestation(Attestation::Bitcoin { height: 1 }),
                )],
            },
        };
        let bytes = file.to_bytes();
        assert!(matches!(
            OtsFile::parse_with_config(&bytes, &config),
            Err(CodecError::VarbytesTooLarge(_, _))
        ));
    }

    proptest::proptest! {
        #[test]
        fn arbitrary_bitcoin_height_roundtrips(height in 0u64..(1u64 << 40)) {
            let file = OtsFile {
                hash_algorithm: HashAlgorithm::Sha256,
                file_digest: vec![7u8; 32],
                timestamp: Timestamp::with_attestation(Attestation::Bitcoin { height }),
            };
            let bytes = file.to_bytes();
            let parsed = OtsFile::parse(&bytes).unwrap();
            proptest::prop_assert_eq!(parsed, file);
        }
    }
}
