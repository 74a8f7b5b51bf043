// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake lock backend and protected task for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::clock::{Clock, RuntimeClock};
use crate::episode::ProtectedTask;
use crate::id::ControllerId;
use crate::lock::{LeaseLock, LockError, LockToken};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct FakeLockState {
    locked: bool,
    holder: Option<ControllerId>,
    acquire_calls: HashMap<ControllerId, usize>,
    renews: usize,
    lease_started: Option<Instant>,
    failing_acquires: usize,
    failing_renews: usize,
}

/// Shared lock double.
///
/// Every clone sees the same lease. Renewals do not check the caller, so a
/// single `FakeLock` can be handed to several controllers to exercise their
/// interplay. A renewal arriving more than `ttl` after the previous one loses
/// the lease.
#[derive(Clone)]
pub struct FakeLock<C: Clock = RuntimeClock> {
    ttl: Duration,
    clock: C,
    state: Arc<Mutex<FakeLockState>>,
}

impl FakeLock<RuntimeClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, RuntimeClock)
    }
}

impl<C: Clock> FakeLock<C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            ttl,
            clock,
            state: Arc::new(Mutex::new(FakeLockState::default())),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeLockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_locked(&self) -> bool {
        self.state().locked
    }

    pub fn holder(&self) -> Option<ControllerId> {
        self.state().holder.clone()
    }

    /// Number of `acquire` calls made by `caller`
    pub fn acquire_calls(&self, caller: &ControllerId) -> usize {
        self.state().acquire_calls.get(caller).copied().unwrap_or(0)
    }

    /// Successful renewals since the lease was last granted or released
    pub fn renew_count(&self) -> usize {
        self.state().renews
    }

    /// Drop the lease from outside, as an operator or expiry would
    pub fn force_release(&self) {
        let mut state = self.state();
        state.locked = false;
        state.holder = None;
        state.renews = 0;
    }

    /// Make the next `n` acquire calls fail with a backend error
    pub fn fail_next_acquires(&self, n: usize) {
        self.state().failing_acquires = n;
    }

    /// Make the next `n` renew calls fail with a backend error
    pub fn fail_next_renews(&self, n: usize) {
        self.state().failing_renews = n;
    }
}

#[async_trait]
impl<C: Clock> LeaseLock for FakeLock<C> {
    async fn acquire(&self, caller: &ControllerId) -> Result<Option<LockToken>, LockError> {
        let mut state = self.state();
        *state.acquire_calls.entry(caller.clone()).or_insert(0) += 1;

        if state.failing_acquires > 0 {
            state.failing_acquires -= 1;
            return Err(LockError::Backend("injected acquire failure".to_string()));
        }
        if state.locked {
            return Ok(None);
        }

        state.locked = true;
        state.holder = Some(caller.clone());
        state.lease_started = Some(self.clock.now());
        Ok(Some(LockToken::new("fake-lock")))
    }

    async fn release(&self) -> Result<(), LockError> {
        let mut state = self.state();
        if !state.locked {
            return Err(LockError::NotHeld);
        }
        state.locked = false;
        state.holder = None;
        state.renews = 0;
        Ok(())
    }

    async fn renew(&self) -> Result<(), LockError> {
        let mut state = self.state();
        if state.failing_renews > 0 {
            state.failing_renews -= 1;
            return Err(LockError::Backend("injected renew failure".to_string()));
        }
        if !state.locked {
            return Err(LockError::NotHeld);
        }

        let now = self.clock.now();
        let started = state.lease_started.unwrap_or(now);
        if now.duration_since(started) > self.ttl {
            state.locked = false;
            state.holder = None;
            return Err(LockError::Expired);
        }

        state.lease_started = Some(now);
        state.renews += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RecordingState {
    starts: usize,
    runner: Option<ControllerId>,
    live: usize,
    max_live: usize,
}

/// Protected task double that records who runs it and how often.
///
/// Clones share one record, so a single `RecordingTask` observes every
/// controller it is handed to.
#[derive(Clone, Default)]
pub struct RecordingTask {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingTask {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Task body for the controller identified by `id`.
    ///
    /// Marks `id` as the runner until cancelled.
    pub fn for_runner(&self, id: &ControllerId) -> impl ProtectedTask {
        let record = self.clone();
        let id = id.clone();
        move |cancel: CancellationToken| {
            let record = record.clone();
            let id = id.clone();
            async move {
                {
                    let mut state = record.state();
                    state.starts += 1;
                    state.runner = Some(id.clone());
                    state.live += 1;
                    state.max_live = state.max_live.max(state.live);
                }

                cancel.cancelled().await;

                let mut state = record.state();
                state.live -= 1;
                if state.runner.as_ref() == Some(&id) {
                    state.runner = None;
                }
            }
        }
    }

    /// Total task invocations so far
    pub fn starts(&self) -> usize {
        self.state().starts
    }

    /// Controller whose task is currently running
    pub fn runner(&self) -> Option<ControllerId> {
        self.state().runner.clone()
    }

    /// Task instances currently running
    pub fn live(&self) -> usize {
        self.state().live
    }

    /// Highest number of simultaneously running instances observed
    pub fn max_live(&self) -> usize {
        self.state().max_live
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
