//! # Event Records
//!
//! One record per noteworthy event, appended to the event log by the store
//! crate. The shape is fixed:
//!
//! ```json
//! {"timestamp":"2026-01-05T10:00:00Z","category":"RESTOCK","entity_id":"mt-1","status":"SUCCESS","message":"..."}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which part of the cycle produced the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCategory {
    /// Mariana Tek → Webflow pass.
    Restock,
    /// Webflow → Mariana Tek pass.
    Sale,
    /// Scheduler, startup, persistence.
    System,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Restock => write!(f, "RESTOCK"),
            EventCategory::Sale => write!(f, "SALE"),
            EventCategory::System => write!(f, "SYSTEM"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Success,
    Error,
    Retry,
    Warning,
    Info,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Success => write!(f, "SUCCESS"),
            EventStatus::Error => write!(f, "ERROR"),
            EventStatus::Retry => write!(f, "RETRY"),
            EventStatus::Warning => write!(f, "WARNING"),
            EventStatus::Info => write!(f, "INFO"),
        }
    }
}

/// A single event log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEvent {
    pub timestamp: DateTime<Utc>,
    pub category: EventCategory,
    pub entity_id: String,
    pub status: EventStatus,
    pub message: String,
}

impl SyncEvent {
    /// Creates an event stamped with an explicit time.
    pub fn at(
        timestamp: DateTime<Utc>,
        category: EventCategory,
        entity_id: impl Into<String>,
        status: EventStatus,
        message: impl Into<String>,
    ) -> Self {
        SyncEvent {
            timestamp,
            category,
            entity_id: entity_id.into(),
            status,
            message: message.into(),
        }
    }

    /// Creates an event stamped with the current time.
    pub fn now(
        category: EventCategory,
        entity_id: impl Into<String>,
        status: EventStatus,
        message: impl Into<String>,
    ) -> Self {
        Self::at(Utc::now(), category, entity_id, status, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_json_shape() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
        let event = SyncEvent::at(
            ts,
            EventCategory::Restock,
            "mt-1",
            EventStatus::Success,
            "Set Webflow quantity to 7",
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["category"], "RESTOCK");
        assert_eq!(json["status"], "SUCCESS");
        assert_eq!(json["entity_id"], "mt-1");
        assert_eq!(json["timestamp"], "2026-01-05T10:00:00Z");
    }

    #[test]
    fn test_display_matches_serde() {
        for status in [
            EventStatus::Success,
            EventStatus::Error,
            EventStatus::Retry,
            EventStatus::Warning,
            EventStatus::Info,
        ] {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, status.to_string());
        }
    }
}
