//! Replaces `Pending` leaves with whatever a calendar server now has to
//! offer, without discarding attestations the proof already carries.

use crate::attestation::Attestation;
use crate::collaborators::{Collaborators, HashOracle, HttpClient};
use crate::config::Config;
use crate::op::apply;
use crate::timestamp::{OtsFile, Timestamp};

/// Summarizes what an [`Upgrader::upgrade`] call actually changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeReport {
    /// Calendar URIs that were polled and returned a usable upgrade.
    pub upgraded: Vec<String>,
    /// Calendar URIs that were polled and returned nothing new yet.
    pub still_pending: Vec<String>,
    /// Calendar URIs that could not be reached or returned malformed data.
    pub failed: Vec<String>,
}

impl UpgradeReport {
    /// `true` if every `Pending` leaf present before the call is gone.
    pub fn is_complete(&self) -> bool {
        self.still_pending.is_empty() && self.failed.is_empty()
    }
}

/// Polls calendar servers referenced by `Pending` attestations and splices
/// in whatever they return.
pub struct Upgrader {
    collaborators: Collaborators,
    config: Config,
}

impl Upgrader {
    pub fn new(collaborators: Collaborators, config: Config) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    /// Upgrade `file` in place, returning a report of what changed.
    ///
    /// Short-circuits with an empty, complete report if the tree already
    /// has no `Pending` leaves — a no-op upgrade never touches the network.
    pub async fn upgrade(&self, file: &mut OtsFile) -> UpgradeReport {
        if file.timestamp.is_complete() {
            return UpgradeReport::default();
        }

        let digest = file.file_digest.clone();
        let mut report = UpgradeReport::default();
        Self::upgrade_node(
            &mut file.timestamp,
            &digest,
            0,
            self.collaborators.http_client.as_ref(),
            self.collaborators.hash_oracle.as_ref(),
            &self.config,
            &mut report,
        )
        .await;
        report
    }

    fn upgrade_node<'a>(
        node: &'a mut Timestamp,
        msg: &'a [u8],
        depth: usize,
        http: &'a dyn HttpClient,
        hash_oracle: &'a dyn HashOracle,
        config: &'a Config,
        report: &'a mut UpgradeReport,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            if depth > config.max_depth {
                report
                    .failed
                    .push(format!("proof tree exceeds the maximum depth of {}", config.max_depth));
                return;
            }

            // Snapshot the original continuation count before any splicing:
            // newly appended continuations come straight from the calendar's
            // response and must never be recursed into, or an upgraded leaf
            // the server already completed would be walked (and re-polled)
            // all over again (spec §4.4's mutation-ordering invariant).
            let original_operation_count = node.operations.len();

            let mut splices: Vec<(usize, Timestamp)> = Vec::new();

            for (i, attestation) in node.attestations.iter().enumerate() {
                if let Attestation::Pending { uri } = attestation {
                    match Self::poll_calendar(http, uri, msg, config).await {
                        PollOutcome::Upgraded(sub) => {
                            report.upgraded.push(uri.clone());
                            splices.push((i, sub));
                        }
                        PollOutcome::StillPending => report.still_pending.push(uri.clone()),
                        PollOutcome::Failed => report.failed.push(uri.clone()),
                    }
                }
            }

            // Each upgraded `Pending` leaf is removed and the sub-tree the
            // calendar returned is merged directly into this node's own
            // branches: the sub-tree proves the same message, so it is an
            // alternative set of branches for this node, not a nested
            // continuation under an operation this node never performed.
            // Highest index first so earlier indices stay valid as later
            // ones are removed.
            for (i, sub) in splices.into_iter().rev() {
                node.attestations.remove(i);
                node.attestations.extend(sub.attestations);
                node.operations.extend(sub.operations);
            }

            for (op, child) in node.operations[..original_operation_count].iter_mut() {
                match apply(op, msg, hash_oracle) {
                    Ok(next_msg) => {
                        Self::upgrade_node(child, &next_msg, depth + 1, http, hash_oracle, config, report)
                            .await;
                    }
                    Err(e) => report.failed.push(format!(
                        "operation {} could not be applied: {e}",
                        op.label()
                    )),
                }
            }
        })
    }

    async fn poll_calendar(
        http: &dyn HttpClient,
        uri: &str,
        msg: &[u8],
        config: &Config,
    ) -> PollOutcome {
        let url = format!("{}/timestamp/{}", uri.trim_end_matches('/'), hex::encode(msg));
        let resp = match http.get(&url, &[], config.request_timeout).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(calendar = uri, error = %e, "upgrade poll failed");
                return PollOutcome::Failed;
            }
        };

        if resp.is_not_found() {
            return PollOutcome::StillPending;
        }
        if !resp.is_success() {
            tracing::warn!(calendar = uri, status = %resp.status, "unexpected upgrade response");
            return PollOutcome::Failed;
        }
        if resp.body.len() > config.max_calendar_response_bytes {
            tracing::warn!(calendar = uri, "upgrade response exceeds size cap");
            return PollOutcome::Failed;
        }

        match Timestamp::parse_standalone(&resp.body, config) {
            Ok(sub) if sub.is_complete() => PollOutcome::Upgraded(sub),
            Ok(_) => PollOutcome::StillPending,
            Err(e) => {
                tracing::warn!(calendar = uri, error = %e, "malformed upgrade response");
                PollOutcome::Failed
            }
        }
    }
}

enum PollOutcome {
    Upgraded(Timestamp),
    StillPending,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{BlockLookup, BlockLookupError, DefaultHashOracle, HttpError, HttpResponse, OsRandomSource};
    use crate::op::HashAlgorithm;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    struct ScriptedHttp {
        response: Vec<u8>,
        status: u16,
    }

    #[async_trait]
    impl HttpClient for ScriptedHttp {
        async fn get(&self, _url: &str, _headers: &[(&str, &str)], _timeout: Duration) -> Result<HttpResponse, HttpError> {
            Ok(HttpResponse {
                status: self.status,
                body: self.response.clone(),
            })
        }
        async fn post(&self, _url: &str, _headers: &[(&str, &str)], _body: Vec<u8>, _timeout: Duration) -> Result<HttpResponse, HttpError> {
            unimplemented!()
        }
    }

    struct UnusedBlockLookup;
    #[async_trait]
    impl BlockLookup for UnusedBlockLookup {
        async fn block_by_height(&self, _height: u64) -> Result<crate::collaborators::BlockInfo, BlockLookupError> {
            unimplemented!()
        }
    }

    fn collaborators_with_http(http: Arc<dyn HttpClient>) -> Collaborators {
        Collaborators {
            hash_oracle: Arc::new(DefaultHashOracle),
            random_source: Arc::new(OsRandomSource),
            http_client: http,
            block_lookup: Arc::new(UnusedBlockLookup),
        }
    }

    #[tokio::test]
    async fn already_complete_tree_is_untouched() {
        let upgrader = Upgrader::new(
            collaborators_with_http(Arc::new(ScriptedHttp {
                response: vec![],
                status: 404,
            })),
            Config::default(),
        );
        let mut file = OtsFile {
            hash_algorithm: HashAlgorithm::Sha256,
            file_digest: vec![0u8; 32],
            timestamp: Timestamp::with_attestation(Attestation::Bitcoin { height: 1 }),
        };
        let report = upgrader.upgrade(&mut file).await;
        assert_eq!(report, UpgradeReport::default());
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn still_pending_when_calendar_returns_404() {
        let upgrader = Upgrader::new(
            collaborators_with_http(Arc::new(ScriptedHttp {
                response: vec![],
                status: 404,
            })),
            Config::default(),
        );
        let mut file = OtsFile {
            hash_algorithm: HashAlgorithm::Sha256,
            file_digest: vec![0u8; 32],
            timestamp: Timestamp::with_attestation(Attestation::Pending {
                uri: "https://alice.btc.calendar.opentimestamps.org".to_string(),
            }),
        };
        let report = upgrader.upgrade(&mut file).await;
        assert_eq!(report.still_pending.len(), 1);
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn upgrades_when_calendar_returns_complete_subtree() {
        let sub = Timestamp::with_attestation(Attestation::Bitcoin { height: 700_000 });
        let body = sub.to_bytes();

        let upgrader = Upgrader::new(
            collaborators_with_http(Arc::new(ScriptedHttp {
                response: body,
                status: 200,
            })),
            Config::default(),
        );
        let mut file = OtsFile {
            hash_algorithm: HashAlgorithm::Sha256,
            file_digest: vec![0u8; 32],
            timestamp: Timestamp::with_attestation(Attestation::Pending {
                uri: "https://alice.btc.calendar.opentimestamps.org".to_string(),
            }),
        };
        let report = upgrader.upgrade(&mut file).await;
        assert_eq!(report.upgraded.len(), 1);
        assert!(report.is_complete());
        assert!(file.timestamp.is_complete());
    }

    #[tokio::test]
    async fn depth_exceeded_is_reported_as_a_failure_instead_of_recursing_forever() {
        let upgrader = Upgrader::new(
            collaborators_with_http(Arc::new(ScriptedHttp {
                response: vec![],
                status: 404,
            })),
            Config::default(),
        );

        let mut t = Timestamp::with_attestation(Attestation::Pending {
            uri: "https://alice.btc.calendar.opentimestamps.org".to_string(),
        });
        for _ in 0..300 {
            t = Timestamp {
                attestations: vec![],
                operations: vec![(crate::op::Operation::Reverse, t)],
            };
        }
        let mut file = OtsFile {
            hash_algorithm: HashAlgorithm::Sha256,
            file_digest: vec![0u8; 32],
            timestamp: t,
        };

        let report = upgrader.upgrade(&mut file).await;
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].contains("maximum depth"));
    }

    struct RecordingHttp {
        requested_url: std::sync::Mutex<Option<String>>,
    }

    #[async_trait]
    impl HttpClient for RecordingHttp {
        async fn get(&self, url: &str, _headers: &[(&str, &str)], _timeout: Duration) -> Result<HttpResponse, HttpError> {
            *self.requested_url.lock().unwrap() = Some(url.to_string());
            Ok(HttpResponse {
                status: 404,
                body: vec![],
            })
        }
        async fn post(&self, _url: &str, _headers: &[(&str, &str)], _body: Vec<u8>, _timeout: Duration) -> Result<HttpResponse, HttpError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn polls_with_the_message_at_the_pending_leaf_not_the_root_digest() {
        use sha2::{Digest, Sha256};

        let http = Arc::new(RecordingHttp {
            requested_url: std::sync::Mutex::new(None),
        });
        let upgrader = Upgrader::new(
            Collaborators {
                hash_oracle: Arc::new(DefaultHashOracle),
                random_source: Arc::new(OsRandomSource),
                http_client: http.clone(),
                block_lookup: Arc::new(UnusedBlockLookup),
            },
            Config::default(),
        );

        let file_digest = vec![0u8; 32];
        let nonce = vec![0x42u8; 16];
        let blinded = Sha256::digest([nonce.as_slice(), file_digest.as_slice()].concat()).to_vec();

        // Mirrors the shape `Stamper::stamp` actually produces: the `Pending`
        // leaf sits two operations below the root, reached by
        // `Prepend(nonce) -> Sha256 -> Pending`.
        let mut file = OtsFile {
            hash_algorithm: HashAlgorithm::Sha256,
            file_digest: file_digest.clone(),
            timestamp: Timestamp {
                attestations: vec![],
                operations: vec![(
                    crate::op::Operation::Prepend(nonce),
                    Timestamp {
                        attestations: vec![],
                        operations: vec![(
                            crate::op::Operation::Sha256,
                            Timestamp::with_attestation(Attestation::Pending {
                                uri: "https://alice.btc.calendar.opentimestamps.org".to_string(),
                            }),
                        )],
                    },
                )],
            },
        };

        upgrader.upgrade(&mut file).await;

        let requested = http.requested_url.lock().unwrap().clone().unwrap();
        assert!(
            requested.ends_with(&hex::encode(&blinded)),
            "expected poll against the nonce-blinded submission digest, got {requested}"
        );
        assert!(!requested.ends_with(&hex::encode(&file_digest)));
    }
}
