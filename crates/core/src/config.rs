// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller configuration
//!
//! Everything is derived from a single lease duration. The ratios applied to
//! it are fields rather than constants so that controllers sharing a process
//! can run with independent policies.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Renewal period as a fraction of the lease
pub const DEFAULT_RENEWAL_FACTOR: f64 = 0.7;
/// Retry period as a multiple of the lease
pub const DEFAULT_WAIT_FACTOR: f64 = 1.1;
/// Upper bound (exclusive) of the startup jitter
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(100);

/// Errors from loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("lease duration must be greater than zero")]
    ZeroLease,
    #[error("renewal factor must be in (0, 1), got {0}")]
    RenewalFactor(f64),
    #[error("wait factor must be greater than 1, got {0}")]
    WaitFactor(f64),
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Lock controller configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ControllerConfig {
    /// Lease duration the backend grants
    #[serde(with = "humantime_serde")]
    pub lease: Duration,
    #[serde(default = "default_renewal_factor")]
    pub renewal_factor: f64,
    #[serde(default = "default_wait_factor")]
    pub wait_factor: f64,
    #[serde(default = "default_max_jitter", with = "humantime_serde")]
    pub max_jitter: Duration,
    /// Seed for the jitter source; OS entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
    /// Fixed controller identity; generated when absent
    #[serde(default)]
    pub id: Option<String>,
}

fn default_renewal_factor() -> f64 {
    DEFAULT_RENEWAL_FACTOR
}

fn default_wait_factor() -> f64 {
    DEFAULT_WAIT_FACTOR
}

fn default_max_jitter() -> Duration {
    DEFAULT_MAX_JITTER
}

impl ControllerConfig {
    pub fn new(lease: Duration) -> Self {
        Self {
            lease,
            renewal_factor: DEFAULT_RENEWAL_FACTOR,
            wait_factor: DEFAULT_WAIT_FACTOR,
            max_jitter: DEFAULT_MAX_JITTER,
            seed: None,
            id: None,
        }
    }

    pub fn with_renewal_factor(mut self, factor: f64) -> Self {
        self.renewal_factor = factor;
        self
    }

    pub fn with_wait_factor(mut self, factor: f64) -> Self {
        self.wait_factor = factor;
        self
    }

    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Check `renewal < lease < wait`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lease.is_zero() {
            return Err(ConfigError::ZeroLease);
        }
        let renewal = self.renewal_factor;
        if renewal.is_nan() || renewal <= 0.0 || renewal >= 1.0 {
            return Err(ConfigError::RenewalFactor(self.renewal_factor));
        }
        if self.wait_factor.is_nan() || self.wait_factor <= 1.0 {
            return Err(ConfigError::WaitFactor(self.wait_factor));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
