// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock controller: active/standby leadership over an external lease
//!
//! One controller per process instance. It waits a random startup delay,
//! then tries to acquire the lease every `wait_period`. While it holds the
//! lease it renews every `renewal_period` and keeps the protected task
//! running. A failed renewal ends the episode: the task is cancelled, the
//! controller waits its random delay again and goes back to retrying.
//!
//! Errors from the backend are logged and never returned; `run` only ends
//! when its cancellation token fires.

use crate::config::{ConfigError, ControllerConfig};
use crate::episode::{LeadershipEpisode, ProtectedTask};
use crate::id::{ControllerId, IdGen, UuidIdGen};
use crate::lock::{LeaseLock, LockError, LockToken};
use crate::timing::{saturating_millis, TimingPolicy};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// `tokio::time::interval` panics on a zero period
const MIN_RENEWAL_TICK: Duration = Duration::from_millis(1);

/// Where a controller is in its leadership cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControllerState {
    /// Constructed, `run` not started
    Idle,
    /// Sleeping before the next acquisition attempt
    Waiting,
    /// Acquire call in flight
    Attempting,
    /// Holding the lease; protected task running
    Leading,
    /// `run` returned; terminal
    Stopped,
}

impl ControllerState {
    pub fn is_leading(&self) -> bool {
        matches!(self, ControllerState::Leading)
    }
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ControllerState::Idle => "idle",
            ControllerState::Waiting => "waiting",
            ControllerState::Attempting => "attempting",
            ControllerState::Leading => "leading",
            ControllerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// How a leadership episode ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EpisodeEnd {
    LeaseLost,
    Shutdown,
}

/// Per-instance leader election state machine
pub struct LockController<L> {
    id: ControllerId,
    timing: TimingPolicy,
    lock: L,
    state: watch::Sender<ControllerState>,
}

impl<L: LeaseLock> LockController<L> {
    /// Build from configuration, generating a UUID identity unless
    /// `config.id` is set.
    pub fn new(lock: L, config: &ControllerConfig) -> Result<Self, ConfigError> {
        Self::with_id_gen(lock, config, &UuidIdGen)
    }

    pub fn with_id_gen(
        lock: L,
        config: &ControllerConfig,
        id_gen: &impl IdGen,
    ) -> Result<Self, ConfigError> {
        let timing = TimingPolicy::from_config(config)?;
        let id = match &config.id {
            Some(id) => ControllerId::new(id.clone()),
            None => ControllerId::generate(id_gen),
        };
        Ok(Self::with_timing(lock, id, timing))
    }

    /// Build with an explicit policy; no ordering checks are applied.
    pub fn with_timing(lock: L, id: ControllerId, timing: TimingPolicy) -> Self {
        let (state, _) = watch::channel(ControllerState::Idle);
        Self {
            id,
            timing,
            lock,
            state,
        }
    }

    pub fn id(&self) -> &ControllerId {
        &self.id
    }

    pub fn timing(&self) -> TimingPolicy {
        self.timing
    }

    pub fn state(&self) -> ControllerState {
        *self.state.borrow()
    }

    /// Watch state transitions; stays readable after `run` returns
    pub fn subscribe(&self) -> watch::Receiver<ControllerState> {
        self.state.subscribe()
    }

    /// Run the election loop until `shutdown` is cancelled.
    ///
    /// Consumes the controller: a stopped controller cannot be restarted.
    /// The protected task is spawned under a child of `shutdown` at the start
    /// of each leadership episode and cancelled when the episode ends; the
    /// controller never waits for it to exit.
    pub async fn run<T: ProtectedTask>(self, shutdown: CancellationToken, task: T) {
        let span = tracing::info_span!("ha_mode", id = %self.id);
        self.elect(&shutdown, &task).instrument(span).await;
        self.set_state(ControllerState::Stopped);
    }

    async fn elect<T: ProtectedTask>(&self, shutdown: &CancellationToken, task: &T) {
        tracing::info!(
            renewal_period = %humantime::format_duration(self.timing.renewal_period),
            wait_period = %humantime::format_duration(self.timing.wait_period),
            random_delay = %humantime::format_duration(self.timing.random_delay),
            "starting election"
        );

        // Spread out instances that start at the same moment
        self.set_state(ControllerState::Waiting);
        if !wait_or_cancel(shutdown, self.timing.random_delay).await {
            tracing::debug!("cancelled during startup delay");
            return;
        }

        loop {
            self.set_state(ControllerState::Attempting);
            tracing::debug!("attempting to acquire lock");

            let attempt = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::debug!("cancelled during acquire, returning");
                    return;
                }
                result = self.lock.acquire(&self.id) => result,
            };

            match attempt {
                Ok(Some(token)) if !token.is_empty() => {
                    if self.lead(shutdown, task, token).await == EpisodeEnd::Shutdown {
                        return;
                    }
                }
                Ok(_) => tracing::debug!("lock held by another instance"),
                Err(e) => tracing::warn!(error = %e, "unable to get lock"),
            }

            self.set_state(ControllerState::Waiting);
            if !wait_or_cancel(shutdown, self.timing.wait_period).await {
                tracing::debug!("cancelled, returning");
                return;
            }
        }
    }

    /// One leadership episode, from grant to loss or shutdown
    async fn lead<T: ProtectedTask>(
        &self,
        shutdown: &CancellationToken,
        task: &T,
        token: LockToken,
    ) -> EpisodeEnd {
        tracing::info!(lock_token = %token, "lock acquired, starting protected task");
        self.set_state(ControllerState::Leading);
        let episode = LeadershipEpisode::begin(task, token, shutdown);

        let Err(e) = self.maintain_lease(shutdown).await else {
            tracing::debug!("cancelled while leading, returning");
            return EpisodeEnd::Shutdown;
        };

        tracing::warn!(
            error = %e,
            lock_token = %episode.lock_token(),
            held_ms = saturating_millis(episode.held_for()),
            "lease lost, stopping protected task"
        );
        let handle = episode.end();
        self.set_state(ControllerState::Waiting);

        // Give the task time to return before it can be started again
        let completed = wait_or_cancel(shutdown, self.timing.random_delay).await;
        // A zero delay returns before the cancelled task is polled
        tokio::task::yield_now().await;
        if !handle.is_finished() {
            tracing::warn!("protected task still running after lease loss");
        }

        if completed {
            EpisodeEnd::LeaseLost
        } else {
            EpisodeEnd::Shutdown
        }
    }

    /// Renew every `renewal_period` until a renewal fails or `shutdown`
    /// fires. Cancellation is `Ok`, not a loss, and abandons a renewal still
    /// in flight.
    async fn maintain_lease(&self, shutdown: &CancellationToken) -> Result<(), LockError> {
        let period = self.timing.renewal_period.max(MIN_RENEWAL_TICK);
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(()),
                _ = ticker.tick() => {
                    tracing::debug!("renewing lease");
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => return Ok(()),
                        result = self.lock.renew() => result?,
                    }
                }
            }
        }
    }

    fn set_state(&self, next: ControllerState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::trace!(from = %previous, to = %next, "state transition");
        }
    }
}

/// Sleep for `duration` unless `cancel` fires first.
///
/// Returns `true` when the full duration elapsed, `false` when cancelled.
/// An already-cancelled token returns immediately.
pub async fn wait_or_cancel(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
