//! config.rs
//!
//! Timings and endpoint settings for the dispatch layer.
//!
//! Environment variables (a `.env` next to Cargo.toml is honoured):
//! ```env
//! SPACETIME_HOST=http://localhost:3000
//! SPACETIME_DATABASE=broth-bullets
//! SPACETIME_TOKEN=...               # optional
//! UPKEEP_POLL_INTERVAL_MS=5000      # optional, default 5000
//! UPKEEP_REREAD_DELAY_MS=100        # optional, default 100
//! PRIVILEGE_TIMEOUT_MS=5000         # optional, default 5000
//! DROP_GRACE_WINDOW_MS=200          # optional, default 200
//! ```

use std::env;
use std::time::Duration;

pub const DEFAULT_SPACETIME_HOST: &str = "http://localhost:3000";
pub const DEFAULT_DATABASE: &str = "broth-bullets";
pub const DEFAULT_UPKEEP_POLL_INTERVAL_MS: u64 = 5_000;
/// Empirical tolerance for the commit/table-update race, not a proven bound.
pub const DEFAULT_UPKEEP_REREAD_DELAY_MS: u64 = 100;
pub const DEFAULT_PRIVILEGE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_DROP_GRACE_WINDOW_MS: u64 = 200;

#[derive(Clone, Debug, PartialEq)]
pub struct DispatchConfig {
    pub spacetime_host: String,
    pub database: String,
    pub token: Option<String>,
    pub upkeep_poll_interval: Duration,
    pub upkeep_reread_delay: Duration,
    pub privilege_timeout: Duration,
    pub drop_grace_window: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            spacetime_host: DEFAULT_SPACETIME_HOST.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            token: None,
            upkeep_poll_interval: Duration::from_millis(DEFAULT_UPKEEP_POLL_INTERVAL_MS),
            upkeep_reread_delay: Duration::from_millis(DEFAULT_UPKEEP_REREAD_DELAY_MS),
            privilege_timeout: Duration::from_millis(DEFAULT_PRIVILEGE_TIMEOUT_MS),
            drop_grace_window: Duration::from_millis(DEFAULT_DROP_GRACE_WINDOW_MS),
        }
    }
}

impl DispatchConfig {
    /// Loads `.env` (if any) and reads the process environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = DispatchConfig::default();
        let millis = |key: &str, default: Duration| -> Duration {
            match lookup(key) {
                None => default,
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(ms) => Duration::from_millis(ms),
                    Err(e) => {
                        log::warn!("[Config] Ignoring {}={:?} ({}). Using {:?}.", key, raw, e, default);
                        default
                    }
                },
            }
        };

        DispatchConfig {
            spacetime_host: lookup("SPACETIME_HOST")
                .map(|h| h.trim_end_matches('/').to_string())
                .unwrap_or(defaults.spacetime_host),
            database: lookup("SPACETIME_DATABASE").unwrap_or(defaults.database),
            token: lookup("SPACETIME_TOKEN").filter(|t| !t.is_empty()),
            upkeep_poll_interval: millis("UPKEEP_POLL_INTERVAL_MS", defaults.upkeep_poll_interval),
            upkeep_reread_delay: millis("UPKEEP_REREAD_DELAY_MS", defaults.upkeep_reread_delay),
            privilege_timeout: millis("PRIVILEGE_TIMEOUT_MS", defaults.privilege_timeout),
            drop_grace_window: millis("DROP_GRACE_WINDOW_MS", defaults.drop_grace_window),
        }
    }
}
