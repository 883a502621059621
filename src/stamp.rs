//! Builds a fresh `.ots` proof for a piece of data: hash it, blind the hash
//! with a nonce, submit the blinded digest to every configured calendar
//! server, and merge whatever comes back into one pending proof tree.

use futures::future::join_all;

use crate::attestation::Attestation;
use crate::collaborators::Collaborators;
use crate::config::Config;
use crate::error::StampError;
use crate::op::{apply, HashAlgorithm, Operation};
use crate::timestamp::{OtsFile, Timestamp};

const NONCE_LEN: usize = 16;

/// What to stamp: the raw bytes of the artifact being timestamped, or a
/// 32-byte SHA-256 digest the caller already computed.
pub enum StampInput<'a> {
    Data(&'a [u8]),
    Digest([u8; 32]),
}

/// Submits a digest to calendar servers and assembles a pending proof.
pub struct Stamper {
    collaborators: Collaborators,
    config: Config,
}

impl Stamper {
    pub fn new(collaborators: Collaborators, config: Config) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    /// Hash `input` (unless it's already a digest), submit a nonce-blinded
    /// digest to every configured calendar server, and return the resulting
    /// `.ots` proof.
    ///
    /// Fails only if every calendar server was unreachable; a proof with at
    /// least one `Pending` leaf is still a successful stamp.
    pub async fn stamp(&self, input: StampInput<'_>) -> Result<OtsFile, StampError> {
        let hash_oracle = self.collaborators.hash_oracle.as_ref();

        let file_digest = match input {
            StampInput::Data(message) => hash_oracle
                .digest(HashAlgorithm::Sha256, message)
                .expect("SHA-256 is always supported"),
            StampInput::Digest(digest) => digest.to_vec(),
        };

        let nonce = self.collaborators.random_source.random_bytes(NONCE_LEN);
        let blinded = apply(&Operation::Prepend(nonce.clone()), &file_digest, hash_oracle)
            .expect("prepend never fails");
        let submission_digest =
            apply(&Operation::Sha256, &blinded, hash_oracle).expect("SHA-256 is always supported");

        tracing::debug!(
            servers = self.config.calendar_servers.len(),
            "submitting stamp digest to calendar servers"
        );

        let calls = self.config.calendar_servers.iter().map(|server| {
            let digest = submission_digest.clone();
            async move { (server.clone(), self.submit_to_calendar(server, &digest).await) }
        });
        let responses = join_all(calls).await;

        if responses.iter().all(|(_, outcome)| outcome.is_err()) {
            let errors: Vec<String> = responses
                .iter()
                .map(|(server, outcome)| match outcome {
                    Err(e) => format!("{server}: {e}"),
                    Ok(_) => unreachable!(),
                })
                .collect();
            tracing::warn!(?errors, "no calendar server returned a usable response");
            return Err(StampError::NoCalendarResponse(errors));
        }

        let mut leaf = Timestamp::new();
        for (server, outcome) in responses {
            match outcome {
                Ok(sub) => {
                    leaf.attestations.extend(sub.attestations);
                    leaf.operations.extend(sub.operations);
                }
                Err(_) => leaf
                    .attestations
                    .push(Attestation::Pending { uri: server }),
            }
        }

        let commitment = Timestamp {
            attestations: Vec::new(),
            operations: vec![(Operation::Sha256, leaf)],
        };
        let blind = Timestamp {
            attestations: Vec::new(),
            operations: vec![(Operation::Prepend(nonce), commitment)],
        };

        Ok(OtsFile {
            hash_algorithm: HashAlgorithm::Sha256,
            file_digest,
            timestamp: blind,
        })
    }

    /// Submit `digest` to one calendar server. Returns the descriptive
    /// failure reason (rather than a hard error) on any transport failure or
    /// malformed response, so one unreachable calendar never aborts the
    /// whole stamp — the caller decides whether to treat it as a `Pending`
    /// leaf or, if every server failed, surface all the reasons together.
    async fn submit_to_calendar(&self, server: &str, digest: &[u8]) -> Result<Timestamp, String> {
        let url = format!("{}/digest", server.trim_end_matches('/'));
        let resp = match self
            .collaborators
            .http_client
            .post(&url, &[], digest.to_vec(), self.config.request_timeout)
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(%server, error = %e, "calendar submission failed");
                return Err(format!("request failed: {e}"));
            }
        };

        if !resp.is_success() {
            tracing::warn!(%server, status = %resp.status, "calendar rejected submission");
            return Err(format!("server returned status {}", resp.status));
        }
        if resp.body.len() > self.config.max_calendar_response_bytes {
            return Err(format!(
                "response of {} bytes exceeds the {} byte cap",
                resp.body.len(),
                self.config.max_calendar_response_bytes
            ));
        }

        Timestamp::parse_standalone(&resp.body, &self.config)
            .map_err(|e| format!("malformed response: {e}"))
    }
}
