// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Leadership episodes and the protected task they own

use crate::lock::LockToken;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Work that must run on at most one instance at a time.
///
/// Implementations must return promptly once `cancel` fires. The controller
/// never observes the output.
pub trait ProtectedTask: Send + Sync + 'static {
    type Future: Future<Output = ()> + Send + 'static;

    fn start(&self, cancel: CancellationToken) -> Self::Future;
}

impl<F, Fut> ProtectedTask for F
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    type Future = Fut;

    fn start(&self, cancel: CancellationToken) -> Fut {
        self(cancel)
    }
}

/// The interval during which a controller holds the lease.
///
/// Owns the one running instance of the protected task. Ending the episode,
/// or dropping it, cancels the task; neither waits for it to exit.
pub struct LeadershipEpisode {
    lock_token: LockToken,
    started_at: Instant,
    guard: DropGuard,
    handle: JoinHandle<()>,
}

impl LeadershipEpisode {
    /// Spawn `task` under a child of `parent`
    pub fn begin(
        task: &impl ProtectedTask,
        lock_token: LockToken,
        parent: &CancellationToken,
    ) -> Self {
        let cancel = parent.child_token();
        let handle = tokio::spawn(task.start(cancel.clone()));
        Self {
            lock_token,
            started_at: Instant::now(),
            guard: cancel.drop_guard(),
            handle,
        }
    }

    pub fn lock_token(&self) -> &LockToken {
        &self.lock_token
    }

    pub fn held_for(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Cancel the task and hand back its join handle.
    ///
    /// The handle is only for inspection; dropping it detaches the task.
    pub fn end(self) -> JoinHandle<()> {
        let Self { guard, handle, .. } = self;
        drop(guard);
        handle
    }
}

#[cfg(test)]
#[path = "episode_tests.rs"]
mod tests;
