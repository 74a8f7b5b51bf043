// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timing policy derived from the lease duration

use crate::config::{ConfigError, ControllerConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// The three durations that pace a controller.
///
/// Fixed for the controller's lifetime. `random_delay` is drawn once per
/// controller and reused for the startup wait and every post-loss wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimingPolicy {
    /// Interval between renewals while leading
    pub renewal_period: Duration,
    /// Interval between acquisition attempts while not leading
    pub wait_period: Duration,
    /// Startup and post-loss jitter
    pub random_delay: Duration,
}

impl TimingPolicy {
    /// Explicit policy, no ordering checks.
    pub fn new(renewal_period: Duration, wait_period: Duration, random_delay: Duration) -> Self {
        Self {
            renewal_period,
            wait_period,
            random_delay,
        }
    }

    /// Validate `config` and derive a policy, seeding the jitter source from
    /// `config.seed` or OS entropy.
    pub fn from_config(config: &ControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self::derive(config, &mut rng))
    }

    /// Derive a policy drawing the jitter from `rng`
    pub fn derive(config: &ControllerConfig, rng: &mut impl Rng) -> Self {
        Self {
            renewal_period: scale(config.lease, config.renewal_factor),
            wait_period: scale(config.lease, config.wait_factor),
            random_delay: draw_jitter(config.max_jitter, rng),
        }
    }

    pub fn with_random_delay(mut self, random_delay: Duration) -> Self {
        self.random_delay = random_delay;
        self
    }

    /// Whether `renewal_period < lease < wait_period`
    pub fn brackets(&self, lease: Duration) -> bool {
        self.renewal_period < lease && lease < self.wait_period
    }
}

/// `duration * factor`, rounded to the nanosecond
fn scale(duration: Duration, factor: f64) -> Duration {
    Duration::from_nanos((duration.as_nanos() as f64 * factor).round() as u64)
}

/// Uniform whole milliseconds in `[0, max)`
pub fn draw_jitter(max: Duration, rng: &mut impl Rng) -> Duration {
    let max_ms = saturating_millis(max);
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rng.random_range(0..max_ms))
}

/// Whole milliseconds in `duration`, capped at `u64::MAX`
pub fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[path = "timing_tests.rs"]
mod tests;
