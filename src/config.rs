//! Recognized configuration options (spec §6).

use std::time::Duration;

/// Tunables for the stamper, upgrader, verifier and codec. `Config::default`
/// matches the documented defaults exactly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Ordered list of calendar server base URLs to submit to / poll.
    pub calendar_servers: Vec<String>,
    /// Ordered fallback list of block explorer base URLs.
    pub block_explorers: Vec<String>,
    /// Per-request timeout for every outbound HTTP call.
    pub request_timeout: Duration,
    /// Maximum length of a single varbytes field, in bytes.
    pub max_varbytes: usize,
    /// Maximum proof tree traversal depth.
    pub max_depth: usize,
    /// Maximum accepted calendar response body size, in bytes.
    pub max_calendar_response_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            calendar_servers: vec![
                "https://alice.btc.calendar.opentimestamps.org".to_string(),
                "https://bob.btc.calendar.opentimestamps.org".to_string(),
            ],
            block_explorers: vec![
                "https://blockstream.info/api".to_string(),
                "https://mempool.space/api".to_string(),
            ],
            request_timeout: Duration::from_secs(10),
            max_varbytes: 1_048_576,
            max_depth: 256,
            max_calendar_response_bytes: 65_536,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.calendar_servers.len(), 2);
        assert_eq!(cfg.block_explorers.len(), 2);
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));
        assert_eq!(cfg.max_varbytes, 1_048_576);
        assert_eq!(cfg.max_depth, 256);
        assert_eq!(cfg.max_calendar_response_bytes, 65_536);
    }
}
