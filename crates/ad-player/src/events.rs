//! Event hubs and explicit subscriptions.
//!
//! Host collaborators own an [`EventHub`] per event family. Binding a handler
//! returns a [`Subscription`]; dropping it removes exactly that handler, so a
//! display cycle can hold all of its bindings and release them at completion.
//!
//! Handlers run synchronously inside [`EventHub::emit`], in subscription order.
//! The handler list is snapshotted before dispatch, so a handler may drop its own
//! (or any other) subscription while the event is being delivered.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Whether an event should continue to its default action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    #[default]
    Continue,
    /// Suppress the default action (e.g. navigation on click).
    Stop,
}

/// Events emitted by the host player itself.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// The user clicked the player surface.
    Click,
    /// Playback was requested on the player.
    Play,
    /// The control bar became visible.
    ControlBarShown { height: f64 },
    /// The control bar was hidden.
    ControlBarHidden,
}

/// Lifecycle events of a single playback surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    Play,
    Pause,
    Seeked,
    Ended,
}

/// Interaction with elements the engine inserted into the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Click { element_id: String },
}

type Handler<E> = Arc<dyn Fn(&E) -> Propagation + Send + Sync>;

struct HubInner<E> {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(u64, Handler<E>)>>,
}

/// Synchronous pub/sub hub for one event type.
pub struct EventHub<E> {
    inner: Arc<HubInner<E>>,
}

impl<E> Default for EventHub<E> {
    fn default() -> Self {
        Self {
            inner: Arc::new(HubInner {
                next_id: AtomicU64::new(1),
                handlers: Mutex::new(Vec::new()),
            }),
        }
    }
}

impl<E: 'static> fmt::Debug for EventHub<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<E: 'static> EventHub<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler that may suppress the default action.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&E) -> Propagation + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let handler: Handler<E> = Arc::new(handler);
        self.inner.handlers.lock().push((id, handler));

        let weak: Weak<HubInner<E>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.handlers.lock().retain(|(handler_id, _)| *handler_id != id);
            }
        })
    }

    /// Bind a handler that never suppresses the default action.
    pub fn listen<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribe(move |event| {
            handler(event);
            Propagation::Continue
        })
    }

    /// Deliver an event to every bound handler.
    ///
    /// Returns [`Propagation::Stop`] if any handler asked to suppress the
    /// default action.
    pub fn emit(&self, event: &E) -> Propagation {
        let snapshot: Vec<Handler<E>> = self
            .inner
            .handlers
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        let mut propagation = Propagation::Continue;
        for handler in snapshot {
            if handler(event) == Propagation::Stop {
                propagation = Propagation::Stop;
            }
        }
        propagation
    }

    pub fn listener_count(&self) -> usize {
        self.inner.handlers.lock().len()
    }
}

/// Handle to one bound handler. Unbinds on drop.
#[must_use = "dropping a Subscription unbinds its handler immediately"]
pub struct Subscription {
    unbind: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new(unbind: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            unbind: Some(Box::new(unbind)),
        }
    }

    /// Unbind now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(unbind) = self.unbind.take() {
            unbind();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("bound", &self.unbind.is_some())
            .finish()
    }
}
