//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the central publish/subscribe hub for [`ShotEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shotforge_core::types::DbId;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// A batch of shots was handed to the render backend.
pub const EVENT_GENERATION_DISPATCHED: &str = "generation.dispatched";
/// A finished result replaced the media of an existing placement.
pub const EVENT_PLACEMENT_UPDATED: &str = "placement.updated";
/// A finished result was inserted as a new placement.
pub const EVENT_PLACEMENT_INSERTED: &str = "placement.inserted";
/// A media asset row was registered for a finished result.
pub const EVENT_ASSET_CREATED: &str = "asset.created";
/// A finished result could not be matched to any placement.
pub const EVENT_ASSET_ORPHANED: &str = "asset.orphaned";

// ---------------------------------------------------------------------------
// ShotEvent
// ---------------------------------------------------------------------------

/// A domain event emitted as shots move through their lifecycle.
///
/// Constructed via [`ShotEvent::new`] and enriched with the builder
/// methods [`in_project`](ShotEvent::in_project),
/// [`with_entity`](ShotEvent::with_entity), and
/// [`with_payload`](ShotEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShotEvent {
    /// Dot-separated event name, e.g. `"placement.updated"`.
    pub event_type: String,

    /// Project the event belongs to. `None` for orphaned results whose
    /// project could not be resolved.
    pub project_id: Option<DbId>,

    /// Optional subject entity kind (e.g. `"placement"`, `"media_asset"`).
    pub entity_type: Option<String>,

    /// Optional subject entity database id.
    pub entity_id: Option<DbId>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl ShotEvent {
    /// Create a new event with only the required `event_type`.
    ///
    /// All optional fields default to `None` / empty object.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            project_id: None,
            entity_type: None,
            entity_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Scope the event to a project.
    pub fn in_project(mut self, project_id: DbId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Attach the subject entity to the event.
    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id);
        self
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`ShotEvent`].
///
/// # Usage
///
/// ```rust
/// use shotforge_events::bus::{EventBus, ShotEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(ShotEvent::new("placement.updated"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<ShotEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: ShotEvent) {
        // Ignore the SendError -- it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<ShotEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let event = ShotEvent::new(EVENT_PLACEMENT_UPDATED)
            .in_project(3)
            .with_entity("placement", 42)
            .with_payload(serde_json::json!({"media_asset_id": 9}));

        bus.publish(event);

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, "placement.updated");
        assert_eq!(received.project_id, Some(3));
        assert_eq!(received.entity_type.as_deref(), Some("placement"));
        assert_eq!(received.entity_id, Some(42));
        assert_eq!(received.payload["media_asset_id"], 9);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(ShotEvent::new(EVENT_GENERATION_DISPATCHED));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert_eq!(e1.event_type, "generation.dispatched");
        assert_eq!(e2.event_type, "generation.dispatched");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        // No subscribers -- this must not panic.
        bus.publish(ShotEvent::new(EVENT_ASSET_ORPHANED));
    }

    #[test]
    fn default_event_has_empty_optional_fields() {
        let event = ShotEvent::new("bare.event");
        assert_eq!(event.event_type, "bare.event");
        assert!(event.project_id.is_none());
        assert!(event.entity_type.is_none());
        assert!(event.entity_id.is_none());
        assert!(event.payload.is_object());
    }
}
