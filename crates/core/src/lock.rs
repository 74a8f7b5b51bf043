// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock backend capability consumed by the controller

use crate::id::ControllerId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Opaque identifier of a granted lease.
///
/// Only its presence matters to the controller; the value is logged.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LockToken(pub String);

impl LockToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for LockToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors from lock backend operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("lock is held by {0}")]
    Held(String),
    #[error("lock is not held by this client")]
    NotHeld,
    #[error("lease expired")]
    Expired,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Distributed lock with bounded leases.
///
/// A client value represents one participant: `renew` and `release` act on
/// whatever lease that client was last granted by `acquire`.
#[async_trait]
pub trait LeaseLock: Send + Sync + 'static {
    /// Try to take the lease for `caller`.
    ///
    /// `Ok(None)` means another holder currently owns it. Errors are
    /// transport or backend failures.
    async fn acquire(&self, caller: &ControllerId) -> Result<Option<LockToken>, LockError>;

    /// Give up the currently held lease
    async fn release(&self) -> Result<(), LockError>;

    /// Extend the currently held lease; fails if it was lost or never held
    async fn renew(&self) -> Result<(), LockError>;
}

#[async_trait]
impl<L: LeaseLock + ?Sized> LeaseLock for Arc<L> {
    async fn acquire(&self, caller: &ControllerId) -> Result<Option<LockToken>, LockError> {
        (**self).acquire(caller).await
    }

    async fn release(&self) -> Result<(), LockError> {
        (**self).release().await
    }

    async fn renew(&self) -> Result<(), LockError> {
        (**self).renew().await
    }
}
