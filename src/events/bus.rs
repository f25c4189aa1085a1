//! Publish/subscribe bus with ordered, failure-isolated delivery.

use super::{Event, EventKind};

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A subscriber callback.
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Token returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Synchronous event bus.
///
/// Handlers for a kind run in subscription order on the publisher's thread.
/// A panicking handler is logged and skipped; the remaining handlers still run.
/// Handlers may subscribe or unsubscribe while an event is being delivered;
/// the change applies from the next publish.
pub struct EventBus {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<EventKind, Vec<(SubscriptionId, Handler)>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// Register a handler for `kind`, appended after existing handlers.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        tracing::debug!("EventBus: {:?} subscribed to {:?}", id, kind);
        id
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut handlers = self.lock();
        let Some(list) = handlers.get_mut(&kind) else {
            return false;
        };

        match list.iter().position(|(sub, _)| *sub == id) {
            Some(index) => {
                list.remove(index);
                if list.is_empty() {
                    handlers.remove(&kind);
                }
                tracing::debug!("EventBus: {:?} unsubscribed from {:?}", id, kind);
                true
            }
            None => false,
        }
    }

    /// Deliver `event` to every handler of its kind.
    ///
    /// Returns the number of handlers that ran to completion.
    pub fn publish(&self, event: Event) -> usize {
        let kind = event.kind();

        // Snapshot so handlers can touch the bus without deadlocking.
        let snapshot: Vec<(SubscriptionId, Handler)> = match self.lock().get(&kind) {
            Some(list) => list.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for (id, handler) in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    tracing::error!(
                        "EventBus: handler {:?} for {:?} panicked: {}",
                        id,
                        kind,
                        panic_message(payload.as_ref())
                    );
                }
            }
        }

        delivered
    }

    /// Number of handlers currently registered for `kind`.
    #[cfg(test)]
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.lock().get(&kind).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EventKind, Vec<(SubscriptionId, Handler)>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::FetchError;
    use crate::uptime::FormattedUptime;

    fn recorder(
        bus: &EventBus,
        kind: EventKind,
        tag: &'static str,
        log: &Arc<Mutex<Vec<String>>>,
    ) -> SubscriptionId {
        let log = log.clone();
        bus.subscribe(kind, move |_| log.lock().unwrap().push(tag.to_string()))
    }

    #[test]
    fn test_delivery_in_subscription_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b", "c", "d"] {
            recorder(&bus, EventKind::AssetsLoaded, tag, &log);
        }

        assert_eq!(bus.publish(Event::AssetsLoaded), 4);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_unsubscribe_middle_handler() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        recorder(&bus, EventKind::AssetsLoaded, "a", &log);
        let b = recorder(&bus, EventKind::AssetsLoaded, "b", &log);
        recorder(&bus, EventKind::AssetsLoaded, "c", &log);

        assert_eq!(bus.publish(Event::AssetsLoaded), 3);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);

        assert!(bus.unsubscribe(EventKind::AssetsLoaded, b));
        assert_eq!(bus.publish(Event::AssetsLoaded), 2);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c", "a", "c"]);

        // Second removal and unknown kinds are no-ops.
        assert!(!bus.unsubscribe(EventKind::AssetsLoaded, b));
        assert!(!bus.unsubscribe(EventKind::SceneChange, b));
        assert_eq!(bus.handler_count(EventKind::AssetsLoaded), 2);
    }

    #[test]
    fn test_payload_routed_by_kind() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        bus.subscribe(EventKind::DataUpdated, move |event| {
            seen_clone.lock().unwrap().push(event.clone());
        });

        let up = FormattedUptime {
            days: 1,
            hours: 2,
            minutes: 3,
            seconds: 4,
        };
        assert_eq!(bus.publish(Event::DataUpdated(up)), 1);
        assert_eq!(
            bus.publish(Event::Error(FetchError {
                message: "nope".to_string()
            })),
            0
        );
        assert_eq!(*seen.lock().unwrap(), vec![Event::DataUpdated(up)]);
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        recorder(&bus, EventKind::Error, "before", &log);
        bus.subscribe(EventKind::Error, |_| panic!("subscriber fault"));
        recorder(&bus, EventKind::Error, "after", &log);

        let delivered = bus.publish(Event::Error(FetchError {
            message: "boom".to_string(),
        }));
        assert_eq!(delivered, 2);
        assert_eq!(*log.lock().unwrap(), vec!["before", "after"]);
    }

    #[test]
    fn test_handler_may_unsubscribe_itself() {
        let bus = Arc::new(EventBus::new());
        let calls = Arc::new(AtomicU64::new(0));
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let handler_bus = bus.clone();
        let handler_calls = calls.clone();
        let handler_slot = slot.clone();
        let id = bus.subscribe(EventKind::AssetsLoaded, move |_| {
            handler_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *handler_slot.lock().unwrap() {
                handler_bus.unsubscribe(EventKind::AssetsLoaded, id);
            }
        });
        *slot.lock().unwrap() = Some(id);

        bus.publish(Event::AssetsLoaded);
        bus.publish(Event::AssetsLoaded);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bus.handler_count(EventKind::AssetsLoaded), 0);
    }
}
