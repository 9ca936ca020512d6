//! Observer registration for host events
//!
//! Handlers are registered on an [`EventHub`] and stay registered for as long
//! as the returned [`Subscription`] lives. Dropping the subscription (or
//! calling [`Subscription::unsubscribe`]) removes the handler, so teardown
//! happens on every exit path.

use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

use super::sync::lock;

type Handler<T> = Arc<Mutex<Box<dyn FnMut(&T) + Send>>>;

struct Registry<T> {
    next_id: u64,
    handlers: Vec<(u64, Handler<T>)>,
}

/// Synchronous event source: handlers run on the emitting thread, in
/// registration order.
///
/// The registry lock is released before handlers run, so a handler may
/// subscribe, unsubscribe (itself included) or drop the object that owns its
/// subscription. A handler must not emit the same event into itself.
pub struct EventHub<T> {
    name: &'static str,
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T: 'static> EventHub<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                handlers: Vec::new(),
            })),
        }
    }

    /// Register a handler; it is removed when the returned subscription drops
    #[must_use = "dropping the subscription unregisters the handler immediately"]
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: FnMut(&T) + Send + 'static,
    {
        let handler: Box<dyn FnMut(&T) + Send> = Box::new(handler);
        let handler: Handler<T> = Arc::new(Mutex::new(handler));
        let id = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.handlers.push((id, handler));
            id
        };
        debug!(hub = self.name, id = id, "Handler subscribed");

        let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        let name = self.name;
        Subscription {
            detach: Some(Box::new(move || {
                let Some(registry) = weak.upgrade() else {
                    return;
                };
                let removed = {
                    let mut registry = lock(&registry);
                    let position = registry.handlers.iter().position(|(h, _)| *h == id);
                    position.map(|index| registry.handlers.remove(index))
                };
                // `removed` outlives the guard, so the handler drops unlocked
                if removed.is_some() {
                    debug!(hub = name, id = id, "Handler unsubscribed");
                }
            })),
        }
    }

    /// Deliver an event to every registered handler
    pub fn emit(&self, event: &T) {
        let handlers: Vec<(u64, Handler<T>)> = lock(&self.registry)
            .handlers
            .iter()
            .map(|(id, handler)| (*id, handler.clone()))
            .collect();

        for (id, handler) in handlers {
            // An earlier handler may have unsubscribed this one
            if !self.is_registered(id) {
                continue;
            }
            let mut call = lock(&handler);
            (*call)(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).handlers.len()
    }

    fn is_registered(&self, id: u64) -> bool {
        lock(&self.registry).handlers.iter().any(|(h, _)| *h == id)
    }
}

/// Handle keeping a handler registered; unsubscribes on drop
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.detach_now();
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.detach.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_reaches_subscribers_in_order() {
        let hub = EventHub::<u16>::new("test");
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let seen = seen.clone();
            hub.subscribe(move |v| seen.lock().unwrap().push(("first", *v)))
        };
        let second = {
            let seen = seen.clone();
            hub.subscribe(move |v| seen.lock().unwrap().push(("second", *v)))
        };

        hub.emit(&7);

        assert_eq!(*seen.lock().unwrap(), vec![("first", 7), ("second", 7)]);
        drop((first, second));
    }

    #[test]
    fn test_drop_unsubscribes() {
        let hub = EventHub::<()>::new("test");
        let count = Arc::new(AtomicUsize::new(0));

        let subscription = {
            let count = count.clone();
            hub.subscribe(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };
        hub.emit(&());
        assert_eq!(hub.subscriber_count(), 1);

        drop(subscription);
        hub.emit(&());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_explicit_unsubscribe_only_removes_own_handler() {
        let hub = EventHub::<()>::new("test");
        let a = hub.subscribe(|_| {});
        let b = hub.subscribe(|_| {});

        a.unsubscribe();

        assert_eq!(hub.subscriber_count(), 1);
        drop(b);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_handler_can_unsubscribe_itself_during_emit() {
        let hub = EventHub::<()>::new("test");
        let calls = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let subscription = {
            let calls = calls.clone();
            let slot = slot.clone();
            hub.subscribe(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                drop(slot.lock().unwrap().take());
            })
        };
        *slot.lock().unwrap() = Some(subscription);

        hub.emit(&());
        hub.emit(&());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_handler_removed_mid_emit_is_not_called() {
        let hub = EventHub::<()>::new("test");
        let later_calls = Arc::new(AtomicUsize::new(0));
        let later_slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let first = {
            let later_slot = later_slot.clone();
            hub.subscribe(move |_| drop(later_slot.lock().unwrap().take()))
        };
        let later = {
            let later_calls = later_calls.clone();
            hub.subscribe(move |_| {
                later_calls.fetch_add(1, Ordering::SeqCst);
            })
        };
        *later_slot.lock().unwrap() = Some(later);

        hub.emit(&());

        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
        assert_eq!(hub.subscriber_count(), 1);
        drop(first);
    }

    #[test]
    fn test_emit_from_another_thread() {
        let hub = Arc::new(EventHub::<u16>::new("test"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let subscription = {
            let seen = seen.clone();
            hub.subscribe(move |v| seen.lock().unwrap().push(*v))
        };

        let emitter = {
            let hub = hub.clone();
            std::thread::spawn(move || hub.emit(&3))
        };
        emitter.join().unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![3]);
        drop(subscription);
    }

    #[test]
    fn test_subscription_outliving_hub_is_harmless() {
        let hub = EventHub::<()>::new("test");
        let subscription = hub.subscribe(|_| {});

        drop(hub);
        drop(subscription);
    }
}
