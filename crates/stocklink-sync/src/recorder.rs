//! # Event Recorder
//!
//! Writes [`SyncEvent`]s to the configured [`EventSink`] and mirrors each one
//! to tracing. A failed sink write is logged and swallowed; losing one log
//! line never aborts a pass.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use stocklink_core::{EventCategory, EventStatus, SyncEvent};
use stocklink_store::EventSink;

/// Shared handle for recording sync events.
#[derive(Clone)]
pub struct EventRecorder {
    sink: Arc<dyn EventSink>,
}

impl EventRecorder {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        EventRecorder { sink }
    }

    pub fn record(
        &self,
        category: EventCategory,
        entity_id: &str,
        status: EventStatus,
        message: impl Into<String>,
    ) {
        let event = SyncEvent::now(category, entity_id, status, message);
        mirror(&event);

        if let Err(e) = self.sink.record(&event) {
            error!(error = %e, "Failed to append sync event");
        }
    }

    pub fn success(&self, category: EventCategory, entity_id: &str, message: impl Into<String>) {
        self.record(category, entity_id, EventStatus::Success, message);
    }

    pub fn failure(&self, category: EventCategory, entity_id: &str, message: impl Into<String>) {
        self.record(category, entity_id, EventStatus::Error, message);
    }

    pub fn warning(&self, category: EventCategory, entity_id: &str, message: impl Into<String>) {
        self.record(category, entity_id, EventStatus::Warning, message);
    }

    pub fn info(&self, category: EventCategory, entity_id: &str, message: impl Into<String>) {
        self.record(category, entity_id, EventStatus::Info, message);
    }
}

impl std::fmt::Debug for EventRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRecorder").finish_non_exhaustive()
    }
}

fn mirror(event: &SyncEvent) {
    let category = event.category;
    let entity = event.entity_id.as_str();
    let message = event.message.as_str();

    match event.status {
        EventStatus::Error => error!(%category, entity, "{}", message),
        EventStatus::Warning | EventStatus::Retry => warn!(%category, entity, "{}", message),
        EventStatus::Success => info!(%category, entity, "{}", message),
        EventStatus::Info => debug!(%category, entity, "{}", message),
    }
}
