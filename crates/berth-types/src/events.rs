//! Lifecycle event records for deployment progress polling
//!
//! An event is immutable once appended to a cache entry; its position in the
//! entry's sequence is append order, which is also chronological.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::InstanceId;

/// A single timestamped progress record for one deployed unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,

    /// Canonical unit name (`<application>.<service>`) the event pertains to.
    pub unit: String,

    /// The instance the event pertains to, when instance-scoped.
    pub instance: Option<InstanceId>,

    /// Human-readable description.
    pub description: String,
}

impl LifecycleEvent {
    /// Create an event for `unit` with an arbitrary description.
    pub fn new(unit: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            unit: unit.into(),
            instance: None,
            description: description.into(),
        }
    }

    /// Appended by a watcher the first time it observes an instance.
    pub fn instance_started(unit: impl Into<String>, instance: InstanceId) -> Self {
        let unit = unit.into();
        Self {
            timestamp: Utc::now(),
            description: format!("Instance {} of {} has started", instance, unit),
            instance: Some(instance),
            unit,
        }
    }

    /// Appended by a watcher when a unit reaches its planned instance count.
    pub fn deployment_completed(unit: impl Into<String>) -> Self {
        let unit = unit.into();
        let description = format!("Service {} installed successfully", unit);
        Self::new(unit, description)
    }

    /// Terminal failure appended by a watcher whose deadline passed.
    pub fn deployment_timed_out(unit: impl Into<String>) -> Self {
        let unit = unit.into();
        let description = format!("Timed out waiting for deployment of {}", unit);
        Self::new(unit, description)
    }

    /// Appended for a background batch when a trigger fails mid-batch.
    pub fn trigger_failed(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        let unit = unit.into();
        let description = format!("Deployment of {} failed: {}", unit, reason.into());
        Self::new(unit, description)
    }

    /// Synthetic completion appended when an undeploy is confirmed.
    pub fn undeploy_succeeded(unit: impl Into<String>) -> Self {
        let unit = unit.into();
        let description = format!("Service {} undeployed successfully", unit);
        Self::new(unit, description)
    }

    /// Appended when the provider did not confirm an undeploy in time.
    pub fn undeploy_timed_out(unit: impl Into<String>) -> Self {
        let unit = unit.into();
        let description = format!("Timed out waiting for undeploy of {}", unit);
        Self::new(unit, description)
    }

    /// Appended when an undeploy fails outright.
    pub fn undeploy_failed(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        let unit = unit.into();
        let description = format!("Undeploy of {} failed: {}", unit, reason.into());
        Self::new(unit, description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_event_carries_instance_id() {
        let event = LifecycleEvent::instance_started("shop.db", InstanceId::new("db-1"));
        assert_eq!(event.unit, "shop.db");
        assert_eq!(event.instance, Some(InstanceId::new("db-1")));
        assert!(event.description.contains("db-1"));
    }

    #[test]
    fn test_terminal_events_name_the_unit() {
        let timed_out = LifecycleEvent::deployment_timed_out("shop.web");
        assert!(timed_out.description.contains("Timed out"));
        assert!(timed_out.description.contains("shop.web"));

        let undeployed = LifecycleEvent::undeploy_succeeded("shop.web");
        assert!(undeployed.description.contains("undeployed successfully"));
        assert_eq!(undeployed.instance, None);
    }
}
