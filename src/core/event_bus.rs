//! Typed pub/sub bus for session -> collaborator notifications.
//!
//! The render layer subscribes to `TextureUpdated`, the UI to placement
//! and decode events; the session emits and continues (fire-and-continue,
//! non-blocking, multiple listeners, at-least-once within a session).
//!
//! Two delivery modes that work together:
//! - Immediate: subscribe() callbacks run synchronously inside emit()
//! - Deferred: emit() also queues the event for poll() on the next tick
//!
//! Callback order is FIFO within one event type; cross-type order is
//! undefined.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::warn;

/// Deferred queue cap. A host that never polls would otherwise grow the
/// queue without bound; past the cap each emit drops the oldest half.
const QUEUE_CAP: usize = 1000;

/// Marker trait for events. Events must be Send + Sync + 'static.
pub trait Event: Any + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Send + Sync + 'static> Event for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

type Callback = Arc<dyn Fn(&dyn Any) + Send + Sync>;
type SubscriberMap = HashMap<TypeId, Vec<Callback>>;

/// Boxed event for queue storage.
pub type BoxedEvent = Box<dyn Event>;

/// Pub/sub bus with deferred processing support.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<SubscriberMap>>,
    queue: Arc<Mutex<Vec<BoxedEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock here only means a subscriber callback panicked
    // while holding it; the maps stay structurally sound, so keep serving
    // later callers rather than spreading the panic.
    fn read_subscribers(&self) -> RwLockReadGuard<'_, SubscriberMap> {
        self.subscribers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_subscribers(&self) -> RwLockWriteGuard<'_, SubscriberMap> {
        self.subscribers.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_queue(&self) -> MutexGuard<'_, Vec<BoxedEvent>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to events of type E. The callback runs synchronously on
    /// every emit; use Arc<Mutex<..>> inside for state mutations.
    pub fn subscribe<E, F>(&self, callback: F)
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let erased: Callback = Arc::new(move |event: &dyn Any| {
            let Some(event) = event.downcast_ref::<E>() else {
                return;
            };
            callback(event);
        });
        self.write_subscribers()
            .entry(TypeId::of::<E>())
            .or_default()
            .push(erased);
    }

    /// Emit: invoke callbacks immediately AND queue for poll().
    pub fn emit<E: Event + Clone>(&self, event: E) {
        self.dispatch(TypeId::of::<E>(), &event);
        self.enqueue(Box::new(event));
    }

    fn dispatch(&self, type_id: TypeId, event: &dyn Any) {
        let subscribers = self.read_subscribers();
        let Some(callbacks) = subscribers.get(&type_id) else {
            return;
        };
        for callback in callbacks {
            callback(event);
        }
    }

    fn enqueue(&self, event: BoxedEvent) {
        let mut queue = self.lock_queue();
        if queue.len() >= QUEUE_CAP {
            let dropped = queue.len() - queue.len() / 2;
            warn!(
                "Deferred event queue at {} entries and nobody polls; dropping {} oldest",
                queue.len(),
                dropped
            );
            queue.drain(..dropped);
        }
        queue.push(event);
    }

    /// Drain all queued events for batch processing in the host's loop.
    pub fn poll(&self) -> Vec<BoxedEvent> {
        std::mem::take(&mut *self.lock_queue())
    }

    /// Remove all subscribers for type E.
    pub fn unsubscribe_all<E: Event>(&self) {
        self.write_subscribers().remove(&TypeId::of::<E>());
    }

    pub fn has_subscribers<E: Event>(&self) -> bool {
        self.read_subscribers()
            .get(&TypeId::of::<E>())
            .is_some_and(|callbacks| !callbacks.is_empty())
    }

    pub fn queue_len(&self) -> usize {
        self.lock_queue().len()
    }
}

/// Downcast a polled event to a concrete type.
///
/// The explicit `(**event)` is load-bearing: `Box<dyn Event>` is itself
/// `Any + Send + Sync`, so the blanket impl covers the box too, and
/// `event.as_any()` would hand back the box instead of the inner event.
/// Deref through to the `dyn Event` before erasing.
#[inline]
pub fn downcast_event<E: Event>(event: &BoxedEvent) -> Option<&E> {
    (**event).as_any().downcast_ref::<E>()
}
