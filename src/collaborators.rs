//! External collaborators the core engines are built against: a hash
//! oracle, a random-bytes source, an HTTP client, and a Bitcoin block
//! lookup. Each is a trait so tests can inject deterministic behavior
//! instead of touching the network (spec §9 design note).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::RngCore;
use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::OperationError;
pub use crate::error::{BlockLookupError, HttpError};
use crate::op::HashAlgorithm;

/// Computes digests for the hash operations the operation engine can apply.
///
/// Keccak-256 is recognized by [`crate::HashAlgorithm`] but rejected here,
/// per the crate's Non-goals.
pub trait HashOracle: Send + Sync {
    fn digest(&self, algorithm: HashAlgorithm, bytes: &[u8]) -> Result<Vec<u8>, OperationError>;
}

/// The production [`HashOracle`], backed by `sha2`, `sha1` and `ripemd`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHashOracle;

impl HashOracle for DefaultHashOracle {
    fn digest(&self, algorithm: HashAlgorithm, bytes: &[u8]) -> Result<Vec<u8>, OperationError> {
        match algorithm {
            HashAlgorithm::Sha256 => Ok(Sha256::digest(bytes).to_vec()),
            HashAlgorithm::Sha1 => Ok(Sha1::digest(bytes).to_vec()),
            HashAlgorithm::Ripemd160 => Ok(Ripemd160::digest(bytes).to_vec()),
            HashAlgorithm::Keccak256 => Err(OperationError::UnsupportedOperation),
        }
    }
}

/// A source of cryptographically strong random bytes, used for the stamp
/// nonce.
pub trait RandomSource: Send + Sync {
    fn random_bytes(&self, n: usize) -> Vec<u8>;
}

/// The production [`RandomSource`], backed by the OS CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandomSource;

impl RandomSource for OsRandomSource {
    fn random_bytes(&self, n: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; n];
        OsRng.fill_bytes(&mut bytes);
        bytes
    }
}

/// A minimal HTTP response: status code and body, nothing more.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// The HTTP transport calendar servers and block explorers are reached
/// through. Kept behind a trait so tests can supply deterministic mock
/// responses instead of hitting the network.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpResponse, HttpError>;

    async fn post(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<HttpResponse, HttpError>;
}

/// The production [`HttpClient`], backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpResponse, HttpError> {
        let mut req = self.client.get(url).timeout(timeout);
        for (k, v) in headers {
            req = req.header(*k, *v);
        }

        let resp = req.send().await.map_err(map_reqwest_err)?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(map_reqwest_err)?.to_vec();
        Ok(HttpResponse { status, body })
    }

    async fn post(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<HttpResponse, HttpError> {
        let mut req = self.client.post(url).timeout(timeout).body(body);
        for (k, v) in headers {
            req = req.header(*k, *v);
        }

        let resp = req.send().await.map_err(map_reqwest_err)?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(map_reqwest_err)?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

fn map_reqwest_err(e: reqwest::Error) -> HttpError {
    if e.is_timeout() {
        HttpError::Timeout
    } else {
        HttpError::Transport(e)
    }
}

/// Bitcoin block metadata as needed to verify a merkle-root attestation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub height: u64,
    pub block_hash: String,
    /// Big-endian (block-explorer display order) hex merkle root.
    pub merkle_root_hex: String,
    pub timestamp: u64,
}

/// Fetches Bitcoin block metadata by height.
#[async_trait]
pub trait BlockLookup: Send + Sync {
    async fn block_by_height(&self, height: u64) -> Result<BlockInfo, BlockLookupError>;
}

#[derive(serde::Deserialize)]
struct EsploraBlock {
    merkle_root: String,
    timestamp: u64,
}

/// The production [`BlockLookup`], querying a primary and fallback Esplora-
/// compatible block explorer in order.
pub struct EsploraBlockLookup {
    explorers: Vec<String>,
    http: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl EsploraBlockLookup {
    pub fn new(explorers: Vec<String>, http: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        Self {
            explorers,
            http,
            timeout,
        }
    }

    async fn lookup_one(&self, base: &str, height: u64) -> Result<BlockInfo, HttpError> {
        let hash_resp = self
            .http
            .get(&format!("{base}/block-height/{height}"), &[], self.timeout)
            .await?;
        let block_hash = String::from_utf8_lossy(&hash_resp.body).trim().to_string();

        let block_resp = self
            .http
            .get(&format!("{base}/block/{block_hash}"), &[], self.timeout)
            .await?;
        let block: EsploraBlock = serde_json::from_slice(&block_resp.body)
            .map_err(|e| HttpError::Parse(e.to_string()))?;

        Ok(BlockInfo {
            height,
            block_hash,
            merkle_root_hex: block.merkle_root,
            timestamp: block.timestamp,
        })
    }
}

#[async_trait]
impl BlockLookup for EsploraBlockLookup {
    async fn block_by_height(&self, height: u64) -> Result<BlockInfo, BlockLookupError> {
        let mut errors = Vec::new();

        for base in &self.explorers {
            match self.lookup_one(base, height).await {
                Ok(info) => return Ok(info),
                Err(e) => {
                    tracing::warn!(explorer = %base, height, error = %e, "block lookup failed, trying next explorer");
                    errors.push(format!("{base}: {e}"));
                }
            }
        }

        Err(BlockLookupError::AllExplorersFailed(errors))
    }
}

/// Bundles the four collaborators behind shared trait objects so the
/// verifier, upgrader and stamper can all take a single argument.
#[derive(Clone)]
pub struct Collaborators {
    pub hash_oracle: Arc<dyn HashOracle>,
    pub random_source: Arc<dyn RandomSource>,
    pub http_client: Arc<dyn HttpClient>,
    pub block_lookup: Arc<dyn BlockLookup>,
}

impl Collaborators {
    /// Wire the production implementations together from `config`.
    pub fn from_config(config: &crate::Config) -> Self {
        let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
        let block_lookup = Arc::new(EsploraBlockLookup::new(
            config.block_explorers.clone(),
            http_client.clone(),
            config.request_timeout,
        ));

        Self {
            hash_oracle: Arc::new(DefaultHashOracle),
            random_source: Arc::new(OsRandomSource),
            http_client,
            block_lookup,
        }
    }
}
