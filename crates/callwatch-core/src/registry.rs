//! Event subscription registry.
//!
//! Maps an event name to the ordered list of handlers registered for it.
//! The same handler may be registered more than once; every registration
//! fires.

use callwatch_protocol::ServerEvent;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// A subscription callback.
///
/// Handlers run on the session task, one message at a time. Identity for
/// [`EventRegistry::off`] is pointer identity of the `Arc`, so keep a clone
/// of the handler you intend to remove later.
pub type Handler = Arc<dyn Fn(&ServerEvent) + Send + Sync>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&ServerEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

fn same_handler(a: &Handler, b: &Handler) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Event name → handlers.
#[derive(Default)]
pub struct EventRegistry {
    handlers: DashMap<String, Vec<Handler>>,
}

impl EventRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every future message of type `event`.
    pub fn on(&self, event: impl Into<String>, handler: Handler) {
        let event = event.into();
        let mut entry = self.handlers.entry(event.clone()).or_default();
        entry.push(handler);
        debug!(event = %event, handlers = entry.len(), "Handler registered");
    }

    /// Remove the first registration of `handler` for `event`.
    ///
    /// Returns `true` if a registration was removed.
    pub fn off(&self, event: &str, handler: &Handler) -> bool {
        let removed = match self.handlers.get_mut(event) {
            Some(mut entry) => match entry.iter().position(|h| same_handler(h, handler)) {
                Some(index) => {
                    entry.remove(index);
                    true
                }
                None => false,
            },
            None => false,
        };

        if removed {
            self.handlers.remove_if(event, |_, list| list.is_empty());
            debug!(event = %event, "Handler removed");
        }
        removed
    }

    /// Invoke every handler registered for the event's type, in
    /// registration order.
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, event: &ServerEvent) -> usize {
        // Clone the list so handlers may call `on`/`off` without deadlocking.
        let handlers = match self.handlers.get(event.event_type()) {
            Some(entry) => entry.value().clone(),
            None => {
                trace!(event = %event.event_type(), "No handlers");
                return 0;
            }
        };

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Remove every registration.
    pub fn clear(&self) {
        self.handlers.clear();
        debug!("All handlers removed");
    }

    /// Number of handlers registered for `event`.
    #[must_use]
    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.get(event).map(|e| e.len()).unwrap_or(0)
    }

    /// Check whether no handler is registered at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.iter().all(|e| e.is_empty())
    }

    /// Names with at least one handler.
    #[must_use]
    pub fn event_names(&self) -> Vec<String> {
        self.handlers.iter().map(|e| e.key().clone()).collect()
    }

    /// Registry statistics.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            event_count: self.handlers.len(),
            handler_count: self.handlers.iter().map(|e| e.len()).sum(),
        }
    }
}

/// Registry statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of distinct event names.
    pub event_count: usize,
    /// Total registrations.
    pub handler_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use callwatch_protocol::events::StatusUpdate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn counting(counter: &Arc<AtomicUsize>) -> Handler {
        let counter = Arc::clone(counter);
        handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn status_update() -> ServerEvent {
        ServerEvent::StatusUpdate(StatusUpdate::default())
    }

    #[test]
    fn test_dispatch_matches_event_type() {
        let registry = EventRegistry::new();
        let status = Arc::new(AtomicUsize::new(0));
        let progress = Arc::new(AtomicUsize::new(0));

        registry.on("status_update", counting(&status));
        registry.on("transcription_progress", counting(&progress));

        assert_eq!(registry.dispatch(&status_update()), 1);
        assert_eq!(status.load(Ordering::SeqCst), 1);
        assert_eq!(progress.load(Ordering::SeqCst), 0);
        assert_eq!(registry.dispatch(&ServerEvent::Pong), 0);
    }

    #[test]
    fn test_registration_order() {
        let registry = EventRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = Arc::clone(&order);
            registry.on(
                "status_update",
                handler(move |_| order.lock().unwrap().push(i)),
            );
        }

        registry.dispatch(&status_update());
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_duplicates_accumulate_and_off_removes_one() {
        let registry = EventRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let h = counting(&count);

        registry.on("status_update", Arc::clone(&h));
        registry.on("status_update", Arc::clone(&h));
        registry.dispatch(&status_update());
        assert_eq!(count.load(Ordering::SeqCst), 2);

        assert!(registry.off("status_update", &h));
        assert_eq!(registry.handler_count("status_update"), 1);
        registry.dispatch(&status_update());
        assert_eq!(count.load(Ordering::SeqCst), 3);

        assert!(registry.off("status_update", &h));
        assert!(registry.is_empty());
        assert!(registry.event_names().is_empty());
    }

    #[test]
    fn test_off_unknown_is_noop() {
        let registry = EventRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let registered = counting(&count);
        let stranger = counting(&count);

        assert!(!registry.off("status_update", &stranger));

        registry.on("status_update", Arc::clone(&registered));
        assert!(!registry.off("status_update", &stranger));
        assert!(!registry.off("transcription_error", &registered));
        assert_eq!(registry.handler_count("status_update"), 1);
    }

    #[test]
    fn test_handler_may_unsubscribe_itself() {
        let registry = Arc::new(EventRegistry::new());
        let slot: Arc<Mutex<Option<Handler>>> = Arc::new(Mutex::new(None));

        let h = {
            let registry = Arc::clone(&registry);
            let slot = Arc::clone(&slot);
            handler(move |_| {
                if let Some(me) = slot.lock().unwrap().take() {
                    registry.off("status_update", &me);
                }
            })
        };
        *slot.lock().unwrap() = Some(Arc::clone(&h));
        registry.on("status_update", h);

        assert_eq!(registry.dispatch(&status_update()), 1);
        assert_eq!(registry.handler_count("status_update"), 0);
    }

    #[test]
    fn test_clear_and_stats() {
        let registry = EventRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        registry.on("status_update", counting(&count));
        registry.on("status_update", counting(&count));
        registry.on("transcription_error", counting(&count));

        assert_eq!(
            registry.stats(),
            RegistryStats {
                event_count: 2,
                handler_count: 3
            }
        );

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.dispatch(&status_update()), 0);
    }
}
