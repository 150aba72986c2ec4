//! Failover events.

use serde::Serialize;
use std::fmt;
use std::time::SystemTime;

use crate::observability::logging::unix_millis;
use crate::observability::metrics;
use crate::store::Role;

/// Why traffic moved between stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SwitchReason {
    /// A scheduled health probe of the primary.
    #[serde(rename = "probe")]
    Probe,
    /// A call against the primary failed to reach it.
    #[serde(rename = "operation-error")]
    OperationError,
}

impl SwitchReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchReason::Probe => "probe",
            SwitchReason::OperationError => "operation-error",
        }
    }
}

impl fmt::Display for SwitchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One applied transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailoverEvent {
    pub event: &'static str,
    pub from: Role,
    pub to: Role,
    pub reason: SwitchReason,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl FailoverEvent {
    pub fn new(from: Role, to: Role, reason: SwitchReason, at: SystemTime) -> Self {
        Self {
            event: "failover",
            from,
            to,
            reason,
            timestamp: unix_millis(at),
        }
    }

    /// Log and count the event.
    pub fn emit(&self) {
        tracing::info!(
            event = self.event,
            from = %self.from,
            to = %self.to,
            reason = %self.reason,
            timestamp = self.timestamp,
            "Store failover"
        );
        metrics::record_failover(self.from, self.to, self.reason.as_str());
        metrics::record_active_role(self.to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_event_serializes_wire_names() {
        let at = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        let event = FailoverEvent::new(Role::Primary, Role::Fallback, SwitchReason::OperationError, at);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "event": "failover",
                "from": "primary",
                "to": "fallback",
                "reason": "operation-error",
                "timestamp": 1_700_000_000_123u64,
            })
        );
    }
}
