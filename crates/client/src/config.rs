//! Client configuration.

use crate::protocol::DEFAULT_MAX_FRAME_BYTES;
use crate::types::{JoinTarget, DEFAULT_HOST, DEFAULT_PORT};

/// Startup options consumed by the transport and the initial join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Reservation code of a prepared match.
    pub reservation: Option<String>,
    /// Existing room to join.
    pub room: Option<String>,
    /// Keep the wrapping process alive after a failed session.
    pub survive: bool,
    pub log: bool,
    pub verbose: bool,
    pub max_frame_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            reservation: None,
            room: None,
            survive: false,
            log: false,
            verbose: false,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl ClientConfig {
    /// Create from environment variables.
    ///
    /// - `SOCHA_HOST`, `SOCHA_PORT`
    /// - `SOCHA_RESERVATION`, `SOCHA_ROOM`
    /// - `SOCHA_SURVIVE`, `SOCHA_LOG`, `SOCHA_VERBOSE` ("1" or "true")
    /// - `SOCHA_MAX_FRAME_BYTES`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .and_then(|s| if s.is_empty() { None } else { Some(s) })
        };
        let flag = |key: &str| {
            non_empty(key)
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        };

        Self {
            host: non_empty("SOCHA_HOST").unwrap_or(defaults.host),
            port: non_empty("SOCHA_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            reservation: non_empty("SOCHA_RESERVATION"),
            room: non_empty("SOCHA_ROOM"),
            survive: flag("SOCHA_SURVIVE"),
            log: flag("SOCHA_LOG"),
            verbose: flag("SOCHA_VERBOSE"),
            max_frame_bytes: non_empty("SOCHA_MAX_FRAME_BYTES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_frame_bytes),
        }
    }

    /// Join request derived from `reservation` / `room`.
    pub fn join_target(&self) -> JoinTarget {
        JoinTarget::from_options(self.reservation.as_deref(), self.room.as_deref())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.addr(), "localhost:13050");
        assert_eq!(config.join_target(), JoinTarget::Any);
    }

    #[test]
    fn test_from_lookup_reads_all_options() {
        let vars: HashMap<&str, &str> = [
            ("SOCHA_HOST", "10.0.0.7"),
            ("SOCHA_PORT", "13051"),
            ("SOCHA_RESERVATION", " c0ffee "),
            ("SOCHA_ROOM", "r1"),
            ("SOCHA_SURVIVE", "true"),
            ("SOCHA_LOG", "1"),
            ("SOCHA_VERBOSE", "no"),
            ("SOCHA_MAX_FRAME_BYTES", "1024"),
        ]
        .into_iter()
        .collect();
        let config = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.host, "10.0.0.7");
        assert_eq!(config.port, 13051);
        assert_eq!(config.reservation.as_deref(), Some("c0ffee"));
        assert!(config.survive);
        assert!(config.log);
        assert!(!config.verbose);
        assert_eq!(config.max_frame_bytes, 1024);
        assert_eq!(config.join_target(), JoinTarget::Reservation("c0ffee".to_string()));
    }

    #[test]
    fn test_bad_port_falls_back_to_default() {
        let config = ClientConfig::from_lookup(|k| (k == "SOCHA_PORT").then(|| "http".to_string()));
        assert_eq!(config.port, DEFAULT_PORT);
    }
}
