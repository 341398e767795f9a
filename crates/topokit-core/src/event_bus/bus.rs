//! Event Bus implementation.
//!
//! Provides the EventBus struct and the global instance used for
//! application-wide event distribution.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::events::{AppEvent, EventCategory};

/// Subscription handle for unsubscribing from events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Filter to receive only specific event types
#[derive(Debug, Clone, Default)]
pub enum EventFilter {
    /// Receive all events.
    #[default]
    All,
    /// Receive events matching any of these categories.
    Categories(Vec<EventCategory>),
}

impl EventFilter {
    /// Check if an event matches this filter
    pub fn matches(&self, event: &AppEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Categories(categories) => categories.contains(&event.category()),
        }
    }
}

type EventHandler = Arc<dyn Fn(AppEvent) + Send + Sync>;

/// Error types for event bus operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventBusError {
    /// Nobody is listening
    #[error("No active subscribers")]
    NoSubscribers,
}

/// Central event bus for application-wide event distribution
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
    handlers: RwLock<HashMap<SubscriptionId, (EventFilter, EventHandler)>>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new event bus with a custom broadcast capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Publish an event to all subscribers
    ///
    /// Handlers run on the publishing thread. The handler table is
    /// snapshotted first, so a handler may subscribe or unsubscribe without
    /// deadlocking. Returns the number of handlers plus async receivers
    /// reached.
    pub fn publish(&self, event: AppEvent) -> Result<usize, EventBusError> {
        let matching: Vec<EventHandler> = self
            .handlers
            .read()
            .values()
            .filter(|(filter, _)| filter.matches(&event))
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        tracing::trace!("Publishing {}", event.description());

        for handler in &matching {
            handler(event.clone());
        }

        let receivers = self.sender.send(event).unwrap_or(0);
        let reached = matching.len() + receivers;
        if reached == 0 {
            Err(EventBusError::NoSubscribers)
        } else {
            Ok(reached)
        }
    }

    /// Subscribe to events with a synchronous handler
    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(AppEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.handlers.write().insert(id, (filter, Arc::new(handler)));
        tracing::debug!("Subscription {} added", id);
        id
    }

    /// Get a receiver for polling events from a tokio task
    pub fn receiver(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Unsubscribe from events
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.handlers.write().remove(&id).is_some();
        if removed {
            tracing::debug!("Subscription {} removed", id);
        }
        removed
    }

    /// Number of registered handlers
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

static EVENT_BUS: OnceLock<Arc<EventBus>> = OnceLock::new();

/// Get or initialize the global event bus
pub fn event_bus() -> Arc<EventBus> {
    Arc::clone(EVENT_BUS.get_or_init(|| Arc::new(EventBus::new())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::events::{ProjectEvent, WindowEvent};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn resized(width: u32, height: u32) -> AppEvent {
        AppEvent::Window(WindowEvent::Resized { width, height })
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let bus = EventBus::new();

        let id = bus.subscribe(EventFilter::All, |_| {});
        assert_eq!(bus.subscriber_count(), 1);

        assert!(bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(), 0);

        // Double unsubscribe should return false
        assert!(!bus.unsubscribe(id));
    }

    #[test]
    fn test_event_filtering() {
        let bus = EventBus::new();
        let window_count = Arc::new(AtomicUsize::new(0));
        let project_count = Arc::new(AtomicUsize::new(0));

        let wc = window_count.clone();
        bus.subscribe(
            EventFilter::Categories(vec![EventCategory::Window]),
            move |_| {
                wc.fetch_add(1, Ordering::SeqCst);
            },
        );
        let pc = project_count.clone();
        bus.subscribe(
            EventFilter::Categories(vec![EventCategory::Project]),
            move |_| {
                pc.fetch_add(1, Ordering::SeqCst);
            },
        );

        bus.publish(resized(640, 480)).ok();
        bus.publish(resized(800, 600)).ok();
        bus.publish(AppEvent::Project(ProjectEvent::ListLoaded { count: 3 }))
            .ok();

        assert_eq!(window_count.load(Ordering::SeqCst), 2);
        assert_eq!(project_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        assert!(matches!(
            bus.publish(resized(1, 1)),
            Err(EventBusError::NoSubscribers)
        ));
    }

    #[test]
    fn test_handler_may_unsubscribe_itself() {
        let bus = Arc::new(EventBus::new());
        let slot: Arc<parking_lot::Mutex<Option<SubscriptionId>>> =
            Arc::new(parking_lot::Mutex::new(None));

        let bus_clone = Arc::clone(&bus);
        let slot_clone = Arc::clone(&slot);
        let id = bus.subscribe(EventFilter::All, move |_| {
            if let Some(id) = slot_clone.lock().take() {
                bus_clone.unsubscribe(id);
            }
        });
        *slot.lock() = Some(id);

        bus.publish(resized(10, 10)).ok();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_async_receiver() {
        let bus = EventBus::new();
        let mut rx = bus.receiver();

        bus.publish(resized(320, 200)).expect("receiver is listening");
        let event = rx.recv().await.expect("event delivered");
        assert_eq!(event, resized(320, 200));
    }
}
