use std::path::PathBuf;
use std::time::Duration;

use crate::limits::*;
use crate::model::Ms;

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// Tunables of the booking core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub claim_ttl_ms: Ms,
    /// Always strictly below `claim_ttl_ms`; see [`EngineConfig::normalized`].
    pub claim_grace_ms: Ms,
    pub cancellation_cutoff_ms: Ms,
    pub reaper_interval_ms: Ms,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            claim_ttl_ms: DEFAULT_CLAIM_TTL_MS,
            claim_grace_ms: DEFAULT_CLAIM_GRACE_MS,
            cancellation_cutoff_ms: CANCELLATION_CUTOFF_MS,
            reaper_interval_ms: DEFAULT_REAPER_INTERVAL_MS,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            claim_ttl_ms: env_parse("INNKEEP_CLAIM_TTL_MS").unwrap_or(defaults.claim_ttl_ms),
            claim_grace_ms: env_parse("INNKEEP_CLAIM_GRACE_MS").unwrap_or(defaults.claim_grace_ms),
            cancellation_cutoff_ms: env_parse("INNKEEP_CANCEL_CUTOFF_MS")
                .unwrap_or(defaults.cancellation_cutoff_ms),
            reaper_interval_ms: env_parse("INNKEEP_REAPER_INTERVAL_MS")
                .unwrap_or(defaults.reaper_interval_ms),
        }
        .normalized()
    }

    /// Release claims as soon as the attempt finishes.
    pub fn without_grace(mut self) -> Self {
        self.claim_grace_ms = 0;
        self
    }

    /// Clamp values into a usable range. A delayed release must fire while the
    /// claim is still live, otherwise it could drop a later holder's claim.
    pub fn normalized(mut self) -> Self {
        self.claim_ttl_ms = self.claim_ttl_ms.max(1);
        self.claim_grace_ms = self.claim_grace_ms.clamp(0, self.claim_ttl_ms - 1);
        self.cancellation_cutoff_ms = self.cancellation_cutoff_ms.max(0);
        self.reaper_interval_ms = self.reaper_interval_ms.max(1);
        self
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.claim_grace_ms as u64)
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_millis(self.reaper_interval_ms as u64)
    }
}

/// Settings of the demo binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub metrics_port: Option<u16>,
    pub catalog_path: Option<PathBuf>,
    pub compact_threshold: u64,
    pub simulated_guests: usize,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var("INNKEEP_DATA_DIR")
                .unwrap_or_else(|_| "./data".into())
                .into(),
            metrics_port: env_parse("INNKEEP_METRICS_PORT"),
            catalog_path: std::env::var("INNKEEP_CATALOG").ok().map(PathBuf::from),
            compact_threshold: env_parse("INNKEEP_COMPACT_THRESHOLD").unwrap_or(1000),
            simulated_guests: env_parse("INNKEEP_SIMULATED_GUESTS").unwrap_or(8),
        }
    }
}
