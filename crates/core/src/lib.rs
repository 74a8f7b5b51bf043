// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! ha-core: leader election over an external lease
//!
//! This crate provides:
//! - [`LockController`], the per-instance acquire/renew/retry state machine
//! - The [`LeaseLock`] capability trait consumed from lock backends
//! - A pure [`Lease`] state machine for backends to build on
//! - Configuration, timing policy, identity and clock abstractions

pub mod clock;
pub mod config;
pub mod controller;
pub mod episode;
pub mod id;
pub mod lease;
pub mod lock;
pub mod timing;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use clock::{Clock, FakeClock, RuntimeClock};
pub use config::{ConfigError, ControllerConfig};
pub use controller::{wait_or_cancel, ControllerState, LockController};
pub use episode::{LeadershipEpisode, ProtectedTask};
pub use id::{ControllerId, IdGen, SequentialIdGen, UuidIdGen};
pub use lease::{Lease, LeaseConfig, LeaseEvent, LeaseInput, LeaseState};
pub use lock::{LeaseLock, LockError, LockToken};
pub use timing::TimingPolicy;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeLock, RecordingTask};
