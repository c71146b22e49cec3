//! Event types for the sample organizer event system
//!
//! Provides shared event definitions and the EventBus used to fan events out to
//! Server-Sent-Events clients (the front end's progress and change notifications).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Sample organizer event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AisoEvent {
    /// A batch started processing
    BatchStarted {
        batch_id: Uuid,
        /// Number of files in the batch
        total: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One file of a batch finished (successfully or not)
    ///
    /// Emitted exactly once per processed file, with `current` running 1..=total.
    BatchProgress {
        batch_id: Uuid,
        current: usize,
        total: usize,
        /// Rounded percentage (0-100)
        percentage: u8,
        current_file: String,
        /// Per-file outcome (processed sample or `{path, name, error}`)
        result: serde_json::Value,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Batch finished all files
    BatchCompleted {
        batch_id: Uuid,
        processed: usize,
        failed: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Batch stopped early on user request
    BatchCancelled {
        batch_id: Uuid,
        /// Files handled before cancellation
        processed: usize,
        total: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A stored sample changed (update, tag assignment, play, description)
    SampleUpdated {
        sample_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A stored sample was deleted
    SampleDeleted {
        sample_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Provider credentials were (re)initialized
    AiProvidersChanged {
        openai: bool,
        anthropic: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl AisoEvent {
    /// Event type name used as the SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            AisoEvent::BatchStarted { .. } => "BatchStarted",
            AisoEvent::BatchProgress { .. } => "BatchProgress",
            AisoEvent::BatchCompleted { .. } => "BatchCompleted",
            AisoEvent::BatchCancelled { .. } => "BatchCancelled",
            AisoEvent::SampleUpdated { .. } => "SampleUpdated",
            AisoEvent::SampleDeleted { .. } => "SampleDeleted",
            AisoEvent::AiProvidersChanged { .. } => "AiProvidersChanged",
        }
    }

    /// Whether the event belongs to batch progress reporting
    pub fn is_batch_event(&self) -> bool {
        matches!(
            self,
            AisoEvent::BatchStarted { .. }
                | AisoEvent::BatchProgress { .. }
                | AisoEvent::BatchCompleted { .. }
                | AisoEvent::BatchCancelled { .. }
        )
    }
}

/// Broadcast bus for AisoEvent
///
/// Cloning is cheap; every clone shares the same channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AisoEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before lagging receivers drop old events
    ///
    /// # Examples
    ///
    /// ```
    /// use aiso_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<AisoEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: AisoEvent,
    ) -> Result<usize, broadcast::error::SendError<AisoEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: AisoEvent) {
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

    #[tokio::test]
    async fn subscriber_receives_emitted_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        let batch_id = Uuid::new_v4();
        let count = bus
            .emit(AisoEvent::BatchStarted {
                batch_id,
                total: 3,
                timestamp: chrono::Utc::now(),
            })
            .unwrap();
        assert_eq!(count, 1);

        match rx.recv().await.unwrap() {
            AisoEvent::BatchStarted { batch_id: got, total, .. } => {
                assert_eq!(got, batch_id);
                assert_eq!(total, 3);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn emit_without_subscribers_errors_but_lossy_does_not_panic() {
        let bus = EventBus::new(4);
        let event = AisoEvent::SampleDeleted {
            sample_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
        };
        assert!(bus.emit(event.clone()).is_err());
        bus.emit_lossy(event);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn serialized_event_carries_type_tag() {
        let event = AisoEvent::BatchCompleted {
            batch_id: Uuid::nil(),
            processed: 2,
            failed: 1,
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "BatchCompleted");
        assert_eq!(json["failed"], 1);
        assert_eq!(event.event_type(), "BatchCompleted");
        assert!(event.is_batch_event());
    }
}
