//! Server settings, read from `SCRAWL_*` environment variables.

use crate::ScrawlError;

/// Runtime configuration for the server process.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Address the websocket listener binds to.
    pub bind_addr: String,
    /// Idle room lifetime; any handled command refreshes it.
    pub room_ttl_sec: u64,
    /// How often the sweeper evicts expired rooms.
    pub sweep_interval_sec: u64,
    /// Allowed `Origin` header values. Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bind_addr: "127.0.0.1:8080".to_string(),
            room_ttl_sec: 1800,
            sweep_interval_sec: 60,
            allowed_origins: Vec::new(),
        }
    }
}

impl Settings {
    /// Reads settings from the environment, falling back to defaults
    /// for anything unset.
    ///
    /// - `SCRAWL_BIND` (default `127.0.0.1:8080`)
    /// - `SCRAWL_ROOM_TTL_SEC` (default `1800`)
    /// - `SCRAWL_SWEEP_INTERVAL_SEC` (default `60`)
    /// - `SCRAWL_ALLOWED_ORIGINS`, comma-separated (default: any)
    pub fn from_env() -> Result<Self, ScrawlError> {
        let defaults = Settings::default();
        Ok(Settings {
            bind_addr: std::env::var("SCRAWL_BIND").unwrap_or(defaults.bind_addr),
            room_ttl_sec: env_u64("SCRAWL_ROOM_TTL_SEC", defaults.room_ttl_sec)?,
            sweep_interval_sec: env_u64("SCRAWL_SWEEP_INTERVAL_SEC", defaults.sweep_interval_sec)?,
            allowed_origins: std::env::var("SCRAWL_ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    /// Whether a handshake with the given `Origin` header is allowed.
    pub fn origin_allowed(&self, origin: Option<&str>) -> bool {
        if self.allowed_origins.is_empty() {
            return true;
        }
        origin.is_some_and(|o| self.allowed_origins.iter().any(|allowed| allowed == o))
    }
}

fn env_u64(key: &str, default: u64) -> Result<u64, ScrawlError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .parse()
            .map_err(|_| ScrawlError::Config(format!("{key} must be an integer, got {raw:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.bind_addr, "127.0.0.1:8080");
        assert_eq!(settings.room_ttl_sec, 1800);
        assert!(settings.allowed_origins.is_empty());
    }

    #[test]
    fn test_empty_allowlist_accepts_anything() {
        let settings = Settings::default();
        assert!(settings.origin_allowed(None));
        assert!(settings.origin_allowed(Some("http://evil.example")));
    }

    #[test]
    fn test_allowlist_matches_exactly() {
        let settings = Settings {
            allowed_origins: vec!["http://localhost:3000".into()],
            ..Settings::default()
        };
        assert!(settings.origin_allowed(Some("http://localhost:3000")));
        assert!(!settings.origin_allowed(Some("http://localhost:3001")));
        assert!(!settings.origin_allowed(None));
    }
}
