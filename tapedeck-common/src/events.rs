//! Event types for the Tapedeck event system
//!
//! Provides shared event definitions and the EventBus used by all services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Tapedeck event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
/// All events use this central enum for type safety and exhaustive matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TapedeckEvent {
    /// A download job was accepted and queued
    ///
    /// Triggers:
    /// - SSE: Show the new job in connected UIs
    JobQueued {
        /// Job UUID assigned at submission
        job_id: Uuid,
        /// Media URL the job will fetch
        url: String,
        /// When the job was queued
        timestamp: DateTime<Utc>,
    },

    /// A job moved to a new lifecycle status
    ///
    /// Statuses only move forward (queued → downloading → processing →
    /// completed/error); a rejected transition emits nothing.
    ///
    /// Triggers:
    /// - SSE: Update job status display
    JobStatusChanged {
        /// Job UUID
        job_id: Uuid,
        /// Status before the transition
        old_status: String,
        /// Status after the transition
        new_status: String,
        /// Human-readable status message
        message: String,
        /// When the transition happened
        timestamp: DateTime<Utc>,
    },

    /// Download progress update
    ///
    /// Emitted while a job is in the downloading status. Not persisted;
    /// only transmitted via SSE.
    ///
    /// Triggers:
    /// - SSE: Update progress bar
    JobProgress {
        /// Job UUID
        job_id: Uuid,
        /// Progress percentage string (e.g. "42.7%")
        progress: String,
        /// When the update was produced
        timestamp: DateTime<Utc>,
    },
}

impl TapedeckEvent {
    /// Get event type as string for SSE event naming and filtering
    pub fn event_type(&self) -> &str {
        match self {
            TapedeckEvent::JobQueued { .. } => "JobQueued",
            TapedeckEvent::JobStatusChanged { .. } => "JobStatusChanged",
            TapedeckEvent::JobProgress { .. } => "JobProgress",
        }
    }
}

/// Central event distribution bus for application-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TapedeckEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    ///
    /// `capacity` is the number of events buffered before old events are
    /// dropped for lagging subscribers.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Returns a receiver that will receive all events emitted after
    /// subscription. Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<TapedeckEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: TapedeckEvent,
    ) -> Result<usize, broadcast::error::SendError<TapedeckEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Useful for non-critical events where it's acceptable if no
    /// component is currently listening.
    pub fn emit_lossy(&self, event: TapedeckEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> TapedeckEvent {
        TapedeckEvent::JobQueued {
            job_id: Uuid::new_v4(),
            url: "https://example.com/watch?v=abc".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_subscribe() {
        let bus = EventBus::new(10);
        let _rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_eventbus_emit() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit(sample_event()).expect("emit should succeed");

        let received = rx.try_recv().expect("should receive event");
        assert_eq!(received.event_type(), "JobQueued");
    }

    #[test]
    fn test_eventbus_emit_without_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(sample_event()).is_err());

        // Lossy variant swallows the error
        bus.emit_lossy(sample_event());
    }

    #[test]
    fn test_eventbus_emit_lossy_on_full_channel() {
        let bus = EventBus::new(2); // Small capacity
        let mut _rx = bus.subscribe(); // Subscribe but don't receive

        for _ in 0..10 {
            bus.emit_lossy(sample_event()); // Should not panic even when full
        }

        assert_eq!(bus.capacity(), 2);
    }

    #[test]
    fn test_eventbus_multiple_subscribers() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        let mut rx3 = bus.subscribe();

        assert_eq!(bus.subscriber_count(), 3);

        bus.emit(sample_event()).expect("emit should succeed");

        assert_eq!(rx1.try_recv().expect("rx1").event_type(), "JobQueued");
        assert_eq!(rx2.try_recv().expect("rx2").event_type(), "JobQueued");
        assert_eq!(rx3.try_recv().expect("rx3").event_type(), "JobQueued");
    }

    #[test]
    fn test_event_serialization_uses_type_tag() {
        let job_id = Uuid::new_v4();
        let event = TapedeckEvent::JobStatusChanged {
            job_id,
            old_status: "queued".to_string(),
            new_status: "downloading".to_string(),
            message: "Starting download...".to_string(),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&event).expect("serialization should succeed");
        assert!(json.contains("\"type\":\"JobStatusChanged\""));
        assert!(json.contains("\"new_status\":\"downloading\""));

        let back: TapedeckEvent = serde_json::from_str(&json).expect("deserialization");
        match back {
            TapedeckEvent::JobStatusChanged { job_id: id, .. } => assert_eq!(id, job_id),
            other => panic!("wrong event type deserialized: {}", other.event_type()),
        }
    }

    #[test]
    fn test_event_type_method() {
        let progress = TapedeckEvent::JobProgress {
            job_id: Uuid::new_v4(),
            progress: "50.0%".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(progress.event_type(), "JobProgress");
        assert_eq!(sample_event().event_type(), "JobQueued");
    }
}
