// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process lease backend
//!
//! A [`LeaseTable`] holds one lease shared by every participant in the
//! process. Each participant gets its own [`InMemoryLock`] client, which
//! remembers the grant it was issued so that `renew` and `release` act on it.

use async_trait::async_trait;
use ha_core::{
    Clock, ControllerId, Lease, LeaseConfig, LeaseEvent, LeaseInput, LeaseLock, LockError,
    LockToken, RuntimeClock,
};
use std::sync::{Arc, Mutex};

/// Shared lease state; clones refer to the same lease
#[derive(Clone)]
pub struct LeaseTable<C: Clock = RuntimeClock> {
    lease: Arc<Mutex<Lease>>,
    clock: C,
}

impl LeaseTable<RuntimeClock> {
    pub fn new(config: LeaseConfig) -> Self {
        Self::with_clock(config, RuntimeClock)
    }
}

impl<C: Clock> LeaseTable<C> {
    pub fn with_clock(config: LeaseConfig, clock: C) -> Self {
        Self {
            lease: Arc::new(Mutex::new(Lease::new(config))),
            clock,
        }
    }

    /// A new participant with no grant
    pub fn client(&self) -> InMemoryLock<C> {
        InMemoryLock {
            table: self.clone(),
            grant: Mutex::new(None),
        }
    }

    /// Current holder, if the lease is held and not expired
    pub fn holder(&self) -> Option<ControllerId> {
        let lease = self.lease.lock().unwrap_or_else(|e| e.into_inner());
        if lease.is_expired(&self.clock) {
            return None;
        }
        lease.holder().cloned()
    }

    /// Free the lease if it has expired
    pub fn tick(&self) -> Vec<LeaseEvent> {
        self.apply(LeaseInput::Tick)
    }

    fn apply(&self, input: LeaseInput) -> Vec<LeaseEvent> {
        let mut lease = self.lease.lock().unwrap_or_else(|e| e.into_inner());
        let (next, events) = lease.transition(input, &self.clock);
        *lease = next;

        let name = lease.config.name.as_str();
        for event in &events {
            log_event(name, event);
        }
        events
    }
}

fn log_event(lease: &str, event: &LeaseEvent) {
    match event {
        LeaseEvent::Acquired { holder, token } => {
            tracing::info!(lease, %holder, %token, "lease granted")
        }
        LeaseEvent::Denied {
            holder,
            current_holder,
        } => tracing::debug!(lease, %holder, %current_holder, "lease denied"),
        LeaseEvent::Renewed { holder } => tracing::trace!(lease, %holder, "lease renewed"),
        LeaseEvent::RenewRejected { holder, reason } => {
            tracing::debug!(lease, %holder, %reason, "renewal rejected")
        }
        LeaseEvent::Released { holder } => tracing::info!(lease, %holder, "lease released"),
        LeaseEvent::ReleaseRejected { holder, reason } => {
            tracing::debug!(lease, %holder, %reason, "release rejected")
        }
        LeaseEvent::Expired { holder } => tracing::warn!(lease, %holder, "lease expired"),
        LeaseEvent::Reclaimed {
            previous_holder,
            new_holder,
        } => tracing::info!(lease, %previous_holder, %new_holder, "expired lease reclaimed"),
    }
}

/// One participant's handle on a [`LeaseTable`]
pub struct InMemoryLock<C: Clock = RuntimeClock> {
    table: LeaseTable<C>,
    grant: Mutex<Option<(ControllerId, LockToken)>>,
}

impl<C: Clock> InMemoryLock<C> {
    fn grant(&self) -> Option<(ControllerId, LockToken)> {
        self.grant.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_grant(&self, grant: Option<(ControllerId, LockToken)>) {
        *self.grant.lock().unwrap_or_else(|e| e.into_inner()) = grant;
    }
}

#[async_trait]
impl<C: Clock> LeaseLock for InMemoryLock<C> {
    async fn acquire(&self, caller: &ControllerId) -> Result<Option<LockToken>, LockError> {
        let events = self.table.apply(LeaseInput::Acquire {
            holder: caller.clone(),
        });

        let token = events.into_iter().find_map(|event| match event {
            LeaseEvent::Acquired { token, .. } => Some(token),
            _ => None,
        });
        if let Some(token) = &token {
            self.set_grant(Some((caller.clone(), token.clone())));
        }
        Ok(token)
    }

    async fn release(&self) -> Result<(), LockError> {
        let (holder, token) = self.grant().ok_or(LockError::NotHeld)?;
        let events = self.table.apply(LeaseInput::Release { holder, token });
        self.set_grant(None);

        match events.as_slice() {
            [LeaseEvent::Released { .. }] => Ok(()),
            [LeaseEvent::ReleaseRejected { reason, .. }] => Err(reason.clone()),
            _ => Err(LockError::Backend("unexpected release outcome".to_string())),
        }
    }

    async fn renew(&self) -> Result<(), LockError> {
        let (holder, token) = self.grant().ok_or(LockError::NotHeld)?;
        let events = self.table.apply(LeaseInput::Renew { holder, token });

        let rejection = events.into_iter().find_map(|event| match event {
            LeaseEvent::RenewRejected { reason, .. } => Some(reason),
            _ => None,
        });
        match rejection {
            None => Ok(()),
            Some(reason) => {
                self.set_grant(None);
                Err(reason)
            }
        }
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
