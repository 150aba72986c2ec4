//! Failover state machine.
//!
//! # States
//! - UsingPrimary: traffic goes to the primary store
//! - UsingFallback: traffic goes to the fallback store (initial state)
//!
//! # State Transitions
//! ```text
//! UsingFallback → UsingPrimary: probe of the primary reports healthy
//! UsingPrimary → UsingFallback: probe reports unhealthy, or a call
//!                               against the primary fails to reach it
//! same → same: no-op, last_switched_at unchanged
//! ```
//!
//! # Design Decisions
//! - The state is an immutable snapshot behind `ArcSwap`; readers never
//!   lock and never see a half-applied transition
//! - A transition is one compare-and-set from an expected role, so of two
//!   racing callers exactly one applies it and emits the event

use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::broadcast;

use crate::failover::events::{FailoverEvent, SwitchReason};
use crate::store::Role;

/// Immutable view of the failover state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverSnapshot {
    pub active: Role,
    pub last_switched_at: Option<SystemTime>,
    pub switch_count: u64,
}

/// Owner of the active role.
#[derive(Debug)]
pub struct FailoverState {
    current: ArcSwap<FailoverSnapshot>,
    events: broadcast::Sender<FailoverEvent>,
}

impl FailoverState {
    /// Start on the fallback, the store that is always available.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        crate::observability::metrics::record_active_role(Role::Fallback);
        Self {
            current: ArcSwap::from_pointee(FailoverSnapshot {
                active: Role::Fallback,
                last_switched_at: None,
                switch_count: 0,
            }),
            events,
        }
    }

    pub fn active(&self) -> Role {
        self.current.load().active
    }

    pub fn snapshot(&self) -> FailoverSnapshot {
        FailoverSnapshot::clone(&self.current.load())
    }

    /// Receive every transition applied from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<FailoverEvent> {
        self.events.subscribe()
    }

    /// Move from `from` to `to` if `from` is still the active role.
    ///
    /// Returns the event when this call applied the transition, `None` when
    /// it was a no-op or another caller got there first.
    pub fn transition(&self, from: Role, to: Role, reason: SwitchReason) -> Option<FailoverEvent> {
        if from == to {
            return None;
        }

        loop {
            let current = self.current.load_full();
            if current.active != from {
                return None;
            }

            let now = SystemTime::now();
            let next = Arc::new(FailoverSnapshot {
                active: to,
                last_switched_at: Some(now),
                switch_count: current.switch_count + 1,
            });

            let previous = self.current.compare_and_swap(&current, next);
            if Arc::ptr_eq(&previous, &current) {
                let event = FailoverEvent::new(from, to, reason, now);
                event.emit();
                // No subscribers is fine.
                let _ = self.events.send(event.clone());
                return Some(event);
            }
            // Lost the race; re-read and check whether the transition still applies.
        }
    }
}

impl Default for FailoverState {
    fn default() -> Self {
        Self::new()
    }
}
