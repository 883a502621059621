//! Error taxonomy. One `thiserror`-derived enum per subsystem, matching this
//! crate's error-per-component convention rather than a single catch-all.

use thiserror::Error;

/// Failures from [`crate::codec`] — all fatal to the parse in progress.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("bad magic bytes")]
    BadMagic,
    #[error("unsupported OTS version {0}, only version 1 is supported")]
    UnsupportedVersion(u64),
    #[error("unknown hash algorithm tag {0:#04x}")]
    UnknownHashTag(u8),
    #[error("unknown operation tag {0:#04x}")]
    UnknownOperationTag(u8),
    #[error("unexpected end of data")]
    UnexpectedEnd,
    #[error("varuint overflow")]
    VaruintOverflow,
    #[error("varbytes field of {0} bytes exceeds the {1} byte cap")]
    VarbytesTooLarge(u64, usize),
    #[error("proof tree exceeds the maximum depth of {0}")]
    DepthExceeded(usize),
    #[error("invalid UTF-8 in pending attestation URI")]
    InvalidUtf8,
}

impl From<crate::util::VaruintError> for CodecError {
    fn from(e: crate::util::VaruintError) -> Self {
        match e {
            crate::util::VaruintError::UnexpectedEnd => CodecError::UnexpectedEnd,
            crate::util::VaruintError::Overflow => CodecError::VaruintOverflow,
        }
    }
}

/// Failures applying a single [`crate::Operation`] to a message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("keccak256 is recognized but not implemented for replay")]
    UnsupportedOperation,
}

/// Fatal failures from [`crate::verify::Verifier::verify`]. Per-attestation
/// outcomes are never raised as errors; they are always returned in the
/// result list as a [`crate::verify::PathResult`] variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("parse error: {0}")]
    Codec(#[from] CodecError),
    #[error("computed digest does not match the file digest recorded in the proof")]
    DigestMismatch,
}

/// Fatal failure from [`crate::stamp::Stamper::stamp`]: no calendar server
/// returned a usable response.
#[derive(Error, Debug, Clone)]
pub enum StampError {
    #[error("no calendar server returned a response: {0:?}")]
    NoCalendarResponse(Vec<String>),
}

/// Collaborator-level HTTP failure, wrapped by the higher-level error types
/// where it surfaces.
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to parse response body: {0}")]
    Parse(String),
}

/// Failure looking up a Bitcoin block by height.
#[derive(Error, Debug)]
pub enum BlockLookupError {
    #[error("every configured block explorer failed: {0:?}")]
    AllExplorersFailed(Vec<String>),
}
