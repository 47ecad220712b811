//! In-process event bus.
//!
//! Maps event names to an ordered list of handlers. Delivery is synchronous
//! on the publishing task, in subscription order. The registry lock is
//! released before handlers run, so a handler may itself subscribe,
//! unsubscribe or publish.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// A subscriber callback.
pub type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Identifies one registration returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Registry {
    topics: HashMap<String, Vec<(SubscriptionId, Handler)>>,
    owners: HashMap<SubscriptionId, String>,
}

/// Publish/subscribe registry keyed by event name.
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    registry: RwLock<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event`. Several handlers per name are allowed.
    pub fn subscribe<F>(&self, event: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut registry = self.registry.write();
        registry
            .topics
            .entry(event.to_string())
            .or_default()
            .push((id, Arc::new(handler)));
        registry.owners.insert(id, event.to_string());
        id
    }

    /// Remove exactly one registration. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.write();
        let Some(event) = registry.owners.remove(&id) else {
            return false;
        };
        if let Some(handlers) = registry.topics.get_mut(&event) {
            handlers.retain(|(sid, _)| *sid != id);
            if handlers.is_empty() {
                registry.topics.remove(&event);
            }
        }
        true
    }

    /// Deliver `payload` to every handler currently registered for `event`.
    ///
    /// A panicking handler is logged and skipped; later handlers still run.
    /// Returns the number of handlers that completed.
    pub fn publish(&self, event: &str, payload: &Value) -> usize {
        let handlers: Vec<(SubscriptionId, Handler)> = {
            let registry = self.registry.read();
            match registry.topics.get(event) {
                Some(handlers) => handlers.clone(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for (id, handler) in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    warn!(event = %event, subscription = id.0, reason = %reason, "Event handler failed");
                    crate::metrics::record_handler_failure();
                }
            }
        }
        debug!(event = %event, delivered, "Published event");
        delivered
    }

    /// Number of handlers registered for `event`.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.registry
            .read()
            .topics
            .get(event)
            .map_or(0, |handlers| handlers.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&'static str) -> Handler) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let make = {
            let log = Arc::clone(&log);
            move |tag: &'static str| -> Handler {
                let log = Arc::clone(&log);
                Arc::new(move |v: &Value| log.lock().push(format!("{tag}:{v}")))
            }
        };
        (log, make)
    }

    #[test]
    fn delivers_in_subscription_order() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let first = make("a");
        let second = make("b");
        bus.subscribe("message", move |v| first(v));
        bus.subscribe("message", move |v| second(v));

        assert_eq!(bus.publish("message", &json!(1)), 2);
        assert_eq!(*log.lock(), vec!["a:1", "b:1"]);
    }

    #[test]
    fn other_events_are_not_delivered() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let h = make("a");
        bus.subscribe("typing", move |v| h(v));

        assert_eq!(bus.publish("message", &json!(null)), 0);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn unsubscribe_removes_exactly_one() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let a = make("a");
        let b = make("b");
        let first = bus.subscribe("message", move |v| a(v));
        bus.subscribe("message", move |v| b(v));

        assert!(bus.unsubscribe(first));
        assert!(!bus.unsubscribe(first));
        bus.publish("message", &json!("x"));
        assert_eq!(*log.lock(), vec!["b:\"x\""]);
        assert_eq!(bus.subscriber_count("message"), 1);
    }

    #[test]
    fn panicking_handler_does_not_stop_delivery() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let after = make("after");
        bus.subscribe("message", |_| panic!("boom"));
        bus.subscribe("message", move |v| after(v));

        assert_eq!(bus.publish("message", &json!(2)), 1);
        assert_eq!(*log.lock(), vec!["after:2"]);
    }

    #[test]
    fn handler_may_subscribe_reentrantly() {
        let bus = Arc::new(EventBus::new());
        let inner = Arc::clone(&bus);
        bus.subscribe("message", move |_| {
            inner.subscribe("message", |_| {});
        });

        bus.publish("message", &json!(null));
        assert_eq!(bus.subscriber_count("message"), 2);
    }
}
