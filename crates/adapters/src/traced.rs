// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced lock wrapper for consistent observability

use async_trait::async_trait;
use ha_core::timing::saturating_millis;
use ha_core::{ControllerId, LeaseLock, LockError, LockToken};
use tokio::time::Instant;
use tracing::Instrument;

/// Wrapper that adds tracing to any LeaseLock
#[derive(Clone)]
pub struct TracedLock<L> {
    inner: L,
}

impl<L> TracedLock<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

#[async_trait]
impl<L: LeaseLock> LeaseLock for TracedLock<L> {
    async fn acquire(&self, caller: &ControllerId) -> Result<Option<LockToken>, LockError> {
        let span = tracing::info_span!("lock.acquire", %caller);
        async {
            let start = Instant::now();
            let result = self.inner.acquire(caller).await;
            let elapsed_ms = saturating_millis(start.elapsed());

            match &result {
                Ok(Some(token)) => tracing::info!(%token, elapsed_ms, "granted"),
                Ok(None) => tracing::debug!(elapsed_ms, "held elsewhere"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "acquire failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn release(&self) -> Result<(), LockError> {
        let span = tracing::info_span!("lock.release");
        async {
            let result = self.inner.release().await;
            // Releasing a lease that already lapsed is often expected
            match &result {
                Ok(()) => tracing::info!("released"),
                Err(e) => tracing::warn!(error = %e, "release failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn renew(&self) -> Result<(), LockError> {
        let span = tracing::debug_span!("lock.renew");
        async {
            let start = Instant::now();
            let result = self.inner.renew().await;
            let elapsed_ms = saturating_millis(start.elapsed());

            match &result {
                Ok(()) => tracing::trace!(elapsed_ms, "renewed"),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "renew failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
