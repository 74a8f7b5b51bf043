// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lease state machine for a single exclusive grant
//!
//! A lease is held until it is released or goes `ttl` without a renewal.
//! Expired leases refuse renewal and are reclaimed by the next acquirer.

use crate::clock::Clock;
use crate::id::ControllerId;
use crate::lock::{LockError, LockToken};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Lease configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LeaseConfig {
    /// Name identifying this lease; prefixes issued tokens
    pub name: String,
    /// How long a grant survives without renewal
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl LeaseConfig {
    pub fn new(name: impl Into<String>, ttl: Duration) -> Self {
        Self {
            name: name.into(),
            ttl,
        }
    }
}

/// Lease state
#[derive(Clone, Debug)]
pub enum LeaseState {
    /// Nobody holds the lease
    Free,
    /// Granted to `holder`
    Held {
        holder: ControllerId,
        token: LockToken,
        /// Grant or last successful renewal
        renewed_at: Instant,
    },
}

/// Inputs that drive lease transitions
#[derive(Clone, Debug)]
pub enum LeaseInput {
    Acquire { holder: ControllerId },
    Release { holder: ControllerId, token: LockToken },
    Renew { holder: ControllerId, token: LockToken },
    /// Periodic check; frees an expired lease
    Tick,
}

/// Facts produced by a transition
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeaseEvent {
    Acquired {
        holder: ControllerId,
        token: LockToken,
    },
    Denied {
        holder: ControllerId,
        current_holder: ControllerId,
    },
    Renewed {
        holder: ControllerId,
    },
    RenewRejected {
        holder: ControllerId,
        reason: LockError,
    },
    Released {
        holder: ControllerId,
    },
    ReleaseRejected {
        holder: ControllerId,
        reason: LockError,
    },
    /// Holder went a full `ttl` without renewing
    Expired {
        holder: ControllerId,
    },
    Reclaimed {
        previous_holder: ControllerId,
        new_holder: ControllerId,
    },
}

/// A single exclusive lease with ttl-based expiry
#[derive(Clone, Debug)]
pub struct Lease {
    pub config: LeaseConfig,
    pub state: LeaseState,
    /// Number of grants issued so far, used to mint tokens
    grants: u64,
}

impl Lease {
    pub fn new(config: LeaseConfig) -> Self {
        Self {
            config,
            state: LeaseState::Free,
            grants: 0,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self.state, LeaseState::Free)
    }

    pub fn is_held_by(&self, holder: &ControllerId) -> bool {
        matches!(&self.state, LeaseState::Held { holder: h, .. } if h == holder)
    }

    pub fn holder(&self) -> Option<&ControllerId> {
        match &self.state {
            LeaseState::Free => None,
            LeaseState::Held { holder, .. } => Some(holder),
        }
    }

    /// Whether the current grant has outlived its ttl
    pub fn is_expired(&self, clock: &impl Clock) -> bool {
        match &self.state {
            LeaseState::Free => false,
            LeaseState::Held { renewed_at, .. } => {
                clock.now().duration_since(*renewed_at) > self.config.ttl
            }
        }
    }

    fn grant(&mut self, holder: &ControllerId, clock: &impl Clock) -> LockToken {
        self.grants += 1;
        let token = LockToken::new(format!("{}-{}", self.config.name, self.grants));
        self.state = LeaseState::Held {
            holder: holder.clone(),
            token: token.clone(),
            renewed_at: clock.now(),
        };
        token
    }

    /// Pure state transition function
    pub fn transition(&self, input: LeaseInput, clock: &impl Clock) -> (Lease, Vec<LeaseEvent>) {
        let mut next = self.clone();
        let mut events = Vec::new();
        let expired = self.is_expired(clock);

        match input {
            LeaseInput::Acquire { holder } => match &self.state {
                LeaseState::Free => {
                    let token = next.grant(&holder, clock);
                    events.push(LeaseEvent::Acquired { holder, token });
                }
                LeaseState::Held {
                    holder: current, ..
                } if expired => {
                    let previous = current.clone();
                    let token = next.grant(&holder, clock);
                    events.push(LeaseEvent::Expired {
                        holder: previous.clone(),
                    });
                    events.push(LeaseEvent::Reclaimed {
                        previous_holder: previous,
                        new_holder: holder.clone(),
                    });
                    events.push(LeaseEvent::Acquired { holder, token });
                }
                LeaseState::Held {
                    holder: current, ..
                } => {
                    events.push(LeaseEvent::Denied {
                        holder,
                        current_holder: current.clone(),
                    });
                }
            },

            LeaseInput::Renew { holder, token } => match &self.state {
                LeaseState::Held {
                    holder: current,
                    token: granted,
                    ..
                } if current == &holder && granted == &token => {
                    if expired {
                        next.state = LeaseState::Free;
                        events.push(LeaseEvent::Expired {
                            holder: holder.clone(),
                        });
                        events.push(LeaseEvent::RenewRejected {
                            holder,
                            reason: LockError::Expired,
                        });
                    } else {
                        next.state = LeaseState::Held {
                            holder: holder.clone(),
                            token,
                            renewed_at: clock.now(),
                        };
                        events.push(LeaseEvent::Renewed { holder });
                    }
                }
                _ => {
                    events.push(LeaseEvent::RenewRejected {
                        holder,
                        reason: LockError::NotHeld,
                    });
                }
            },

            LeaseInput::Release { holder, token } => match &self.state {
                LeaseState::Held {
                    holder: current,
                    token: granted,
                    ..
                } if current == &holder && granted == &token => {
                    next.state = LeaseState::Free;
                    events.push(LeaseEvent::Released { holder });
                }
                _ => {
                    events.push(LeaseEvent::ReleaseRejected {
                        holder,
                        reason: LockError::NotHeld,
                    });
                }
            },

            LeaseInput::Tick => {
                if expired {
                    if let LeaseState::Held { holder, .. } = &self.state {
                        events.push(LeaseEvent::Expired {
                            holder: holder.clone(),
                        });
                    }
                    next.state = LeaseState::Free;
                }
            }
        }

        (next, events)
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
