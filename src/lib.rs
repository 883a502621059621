//! Client library for the [OpenTimestamps](https://opentimestamps.org) protocol.
//!
//! OpenTimestamps proves that a piece of data existed at some point in time
//! by anchoring its cryptographic hash to the Bitcoin blockchain. This crate
//! implements the full lifecycle for a single proof artifact:
//!
//! * [`stamp`](crate::stamp) — hash data, submit it to calendar servers,
//!   assemble a pending `.ots` proof.
//! * [`upgrade`](crate::upgrade) — replace pending leaves with a complete
//!   chain once Bitcoin has confirmed.
//! * [`verify`](crate::verify) — replay a proof chain and compare the result
//!   against a real Bitcoin block header.
//!
//! The binary `.ots` format is a recursive, variable-length tagged grammar;
//! see [`codec`] for the parser/writer and [`timestamp`] for the in-memory
//! tree it produces.

mod attestation;
pub mod codec;
pub mod collaborators;
pub mod config;
mod error;
pub mod format;
mod op;
pub mod stamp;
mod timestamp;
pub mod upgrade;
mod util;
pub mod verify;

pub use attestation::Attestation;
pub use collaborators::Collaborators;
pub use config::Config;
pub use error::{CodecError, OperationError, StampError, VerifyError};
pub use format::Formatter;
pub use op::{HashAlgorithm, Operation};
pub use stamp::{StampInput, Stamper};
pub use timestamp::{OtsFile, Timestamp};
pub use upgrade::{UpgradeReport, Upgrader};
pub use verify::{PathResult, VerifyInput, VerifyTarget, Verifier};
