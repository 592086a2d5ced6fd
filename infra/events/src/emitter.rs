use crate::error::EmitterError;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// An event that knows the name it is dispatched under.
///
/// Names follow the `kind` or `kind:target` convention (`change`, `change:title`).
pub trait Topic {
    fn topic(&self) -> Cow<'_, str>;
}

/// Handle returned by every registration, used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Listener<E> {
    id: ListenerId,
    handler: Handler<E>,
    once: bool,
}

impl<E> Clone for Listener<E> {
    fn clone(&self) -> Self {
        Self { id: self.id, handler: Arc::clone(&self.handler), once: self.once }
    }
}

struct Listeners<E> {
    named: FxHashMap<String, Vec<Listener<E>>>,
    all: Vec<Listener<E>>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self { named: FxHashMap::default(), all: Vec::new() }
    }
}

impl<E> Listeners<E> {
    fn remove(&mut self, id: ListenerId) -> bool {
        let mut removed = false;
        self.named.retain(|_, list| {
            let before = list.len();
            list.retain(|l| l.id != id);
            removed |= list.len() != before;
            !list.is_empty()
        });
        let before = self.all.len();
        self.all.retain(|l| l.id != id);
        removed | (self.all.len() != before)
    }

    fn len(&self) -> usize {
        self.named.values().map(Vec::len).sum::<usize>() + self.all.len()
    }
}

/// A synchronous event emitter.
///
/// Listeners are registered either under one or more topic names or as catch-all
/// listeners. [`Emitter::emit`] invokes the named listeners for the event's topic first,
/// then the catch-all listeners, each in registration order.
///
/// The listener table is snapshotted before dispatch and no lock is held while a
/// handler runs, so handlers may emit, subscribe or unsubscribe on the same emitter.
pub struct Emitter<E> {
    listeners: RwLock<Listeners<E>>,
    next_id: AtomicU64,
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self { listeners: RwLock::new(Listeners::default()), next_id: AtomicU64::new(1) }
    }
}

impl<E> fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read();
        f.debug_struct("Emitter")
            .field("topics", &listeners.named.len())
            .field("catch_all", &listeners.all.len())
            .finish()
    }
}

impl<E: Topic> Emitter<E> {
    /// Creates an emitter without listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for every whitespace-separated name in `topic`.
    ///
    /// # Errors
    /// Returns [`EmitterError::InvalidTopic`] if `topic` contains no names.
    ///
    /// # Examples
    /// ```rust
    /// use arbor_events::{Emitter, Topic};
    /// use std::borrow::Cow;
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    ///
    /// struct Ping(&'static str);
    ///
    /// impl Topic for Ping {
    ///     fn topic(&self) -> Cow<'_, str> {
    ///         Cow::Borrowed(self.0)
    ///     }
    /// }
    ///
    /// # fn main() -> Result<(), arbor_events::EmitterError> {
    /// let emitter = Emitter::new();
    /// let hits = Arc::new(AtomicUsize::new(0));
    /// let counter = Arc::clone(&hits);
    /// emitter.on("add remove", move |_: &Ping| {
    ///     counter.fetch_add(1, Ordering::SeqCst);
    /// })?;
    ///
    /// emitter.emit(&Ping("add"));
    /// emitter.emit(&Ping("remove"));
    /// emitter.emit(&Ping("reset"));
    /// assert_eq!(hits.load(Ordering::SeqCst), 2);
    /// # Ok(())
    /// # }
    /// ```
    pub fn on(
        &self,
        topic: &str,
        handler: impl Fn(&E) + Send + Sync + 'static,
    ) -> Result<ListenerId, EmitterError> {
        self.register(topic, Arc::new(handler), false)
    }

    /// Like [`Emitter::on`], but the listener is removed before its first invocation.
    ///
    /// # Errors
    /// Returns [`EmitterError::InvalidTopic`] if `topic` contains no names.
    pub fn once(
        &self,
        topic: &str,
        handler: impl Fn(&E) + Send + Sync + 'static,
    ) -> Result<ListenerId, EmitterError> {
        self.register(topic, Arc::new(handler), true)
    }

    /// Registers a catch-all listener that receives every emitted event.
    pub fn on_all(&self, handler: impl Fn(&E) + Send + Sync + 'static) -> ListenerId {
        let id = self.next_id();
        self.listeners.write().all.push(Listener { id, handler: Arc::new(handler), once: false });
        trace!(?id, "Catch-all listener registered");
        id
    }

    /// Removes the listener registered under `id`. Returns `false` if it was already gone.
    pub fn off(&self, id: ListenerId) -> bool {
        self.listeners.write().remove(id)
    }

    /// Removes every listener registered for the exact name `topic`.
    ///
    /// Returns the number of removed registrations.
    pub fn off_topic(&self, topic: &str) -> usize {
        self.listeners.write().named.remove(topic).map_or(0, |list| list.len())
    }

    /// Drops every listener. Returns the number of removed registrations.
    pub fn clear(&self) -> usize {
        let mut listeners = self.listeners.write();
        let count = listeners.len();
        *listeners = Listeners::default();
        count
    }

    /// Number of live registrations (a listener bound to two names counts twice).
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Whether anything would observe an event named `topic`.
    #[must_use]
    pub fn has_listeners(&self, topic: &str) -> bool {
        let listeners = self.listeners.read();
        !listeners.all.is_empty() || listeners.named.contains_key(topic)
    }

    /// Dispatches `event` synchronously and returns how many handlers ran.
    pub fn emit(&self, event: &E) -> usize {
        let topic = event.topic();
        let snapshot: Vec<Listener<E>> = {
            let listeners = self.listeners.read();
            listeners
                .named
                .get(topic.as_ref())
                .into_iter()
                .flatten()
                .chain(listeners.all.iter())
                .cloned()
                .collect()
        };

        if snapshot.is_empty() {
            trace!(topic = %topic, "Event dropped: no listeners");
            return 0;
        }

        let mut invoked = 0;
        for listener in snapshot {
            if listener.once && !self.off(listener.id) {
                continue;
            }
            (listener.handler)(event);
            invoked += 1;
        }

        trace!(topic = %topic, invoked, "Event dispatched");
        invoked
    }

    fn register(
        &self,
        topic: &str,
        handler: Handler<E>,
        once: bool,
    ) -> Result<ListenerId, EmitterError> {
        let names: Vec<&str> = topic.split_whitespace().collect();
        if names.is_empty() {
            return Err(EmitterError::InvalidTopic {
                message: format!("'{topic}'").into(),
                context: Some("Topic must name at least one event".into()),
            });
        }

        let id = self.next_id();
        {
            let mut listeners = self.listeners.write();
            for name in names {
                listeners.named.entry(name.to_owned()).or_default().push(Listener {
                    id,
                    handler: Arc::clone(&handler),
                    once,
                });
            }
        }

        trace!(?id, topic, once, "Listener registered");
        Ok(id)
    }

    fn next_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}
