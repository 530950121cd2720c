//! Run configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use napdkg_core::{GroupParameters, ProtocolParameters};

use crate::error::{PartyError, Result};

/// Configuration for one DKG run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DkgConfig {
    /// Threshold (degree of every dealer's sharing polynomial)
    pub t: usize,

    /// Number of participants
    pub n: usize,

    /// Liveness slack: Q1 and Q2 target `t + fa` entries
    pub fa: usize,

    /// Fallback polling interval when no board notification arrives (milliseconds)
    pub poll_interval_ms: u64,

    /// How long to wait for all `n` ephemeral keys (milliseconds)
    pub setup_timeout_ms: u64,

    /// How long to wait for any one dealer before treating it as absent (milliseconds)
    pub dealer_timeout_ms: u64,

    /// How long to collect threshold outputs (milliseconds)
    pub collect_timeout_ms: u64,

    /// Concurrent party tasks
    pub max_workers: usize,

    /// Share one background poller over dealer outputs between all parties
    pub use_dealer_poller: bool,
}

impl Default for DkgConfig {
    fn default() -> Self {
        Self::with_threshold(6, 10, 1)
    }
}

impl DkgConfig {
    /// Defaults for the given `(t, n, fa)` with one worker per party
    pub fn with_threshold(t: usize, n: usize, fa: usize) -> Self {
        Self {
            t,
            n,
            fa,
            poll_interval_ms: 20,
            setup_timeout_ms: 30_000,
            dealer_timeout_ms: 30_000,
            collect_timeout_ms: 30_000,
            max_workers: n,
            use_dealer_poller: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.n < self.t + 3 {
            return Err(PartyError::Config(format!(
                "Requires n - t - 2 > 0, got t={} n={}",
                self.t, self.n
            )));
        }
        if self.t == 0 {
            return Err(PartyError::Config("Threshold must be >= 1".to_string()));
        }
        if self.fa == 0 {
            return Err(PartyError::Config("fa must be >= 1".to_string()));
        }
        if self.t + self.fa > self.n {
            return Err(PartyError::Config(format!(
                "Quorum target t + fa = {} exceeds n = {}",
                self.t + self.fa,
                self.n
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(PartyError::Config(
                "Poll interval must be non-zero".to_string(),
            ));
        }
        if self.max_workers == 0 {
            return Err(PartyError::Config("max_workers must be >= 1".to_string()));
        }
        Ok(())
    }

    /// Derive the protocol parameters over secp256k1
    pub fn protocol_parameters(&self) -> Result<ProtocolParameters> {
        self.validate()?;
        Ok(ProtocolParameters::derive(
            GroupParameters::secp256k1(),
            self.t,
            self.n,
        )?)
    }

    /// Target size of Q1 and Q2
    pub fn quorum_target(&self) -> usize {
        self.t + self.fa
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn setup_timeout(&self) -> Duration {
        Duration::from_millis(self.setup_timeout_ms)
    }

    pub fn dealer_timeout(&self) -> Duration {
        Duration::from_millis(self.dealer_timeout_ms)
    }

    pub fn collect_timeout(&self) -> Duration {
        Duration::from_millis(self.collect_timeout_ms)
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
