//! Synchronous observer bus
//!
//! Handlers are registered per event type and receive the event by mutable
//! reference, so a subscriber can amend the payload before the publisher
//! continues (the transport relies on this to collect request headers).

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

type Handler = Arc<dyn Fn(&mut dyn Any) + Send + Sync>;

/// Handle returned by [`NotifyStream::attach`], used to detach again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    event_type: TypeId,
    id: u64,
}

/// Event bus keyed by event type
#[derive(Default)]
pub struct NotifyStream {
    handlers: RwLock<HashMap<TypeId, Vec<(u64, Handler)>>>,
    next_id: AtomicU64,
}

impl NotifyStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events of type `E`
    pub fn attach<E, F>(&self, handler: F) -> Subscription
    where
        E: Any,
        F: Fn(&mut E) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let event_type = TypeId::of::<E>();
        let handler: Handler = Arc::new(move |event: &mut dyn Any| {
            if let Some(event) = event.downcast_mut::<E>() {
                handler(event);
            }
        });

        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event_type)
            .or_default()
            .push((id, handler));

        Subscription { event_type, id }
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn detach(&self, subscription: Subscription) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = handlers.get_mut(&subscription.event_type) else {
            return false;
        };
        let before = list.len();
        list.retain(|(id, _)| *id != subscription.id);
        before != list.len()
    }

    /// Deliver `event` to every subscriber of its type, in attach order.
    /// Returns the number of handlers invoked.
    pub fn trigger<E: Any>(&self, event: &mut E) -> usize {
        // Handlers run without the lock held so they may attach/detach or trigger
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<E>())
            .map(|list| list.iter().map(|(_, handler)| Arc::clone(handler)).collect())
            .unwrap_or_default();

        trace!(
            event = std::any::type_name::<E>(),
            handlers = handlers.len(),
            "Triggering event"
        );
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }
}

impl std::fmt::Debug for NotifyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("NotifyStream")
            .field("event_types", &handlers.len())
            .field(
                "handlers",
                &handlers.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}
