//! Events emitted by entities and collections.
//!
//! Every event carries a [`EventKind`] and an optional attribute path. The dispatch
//! name is the kind alone (`change`) or `kind:path` (`change:address.city`).
//! Events raised inside a child are re-emitted by its owner with the attribute name
//! prepended to the path, so listeners on the root observe the whole tree.

use crate::{Collection, Entity};
use arbor_events::{Emitter, EmitterError, ListenerId, Topic};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

/// Kind of a [`ModelEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// One or more attributes changed.
    Change,
    /// An element was appended to a collection.
    Add,
    /// An element was removed from a collection.
    Remove,
    /// A collection's elements were replaced wholesale.
    Reset,
    /// A collection was reordered.
    Sort,
    /// An entity announced its own destruction.
    Destroy,
    /// A validator vetoed a write.
    Invalid,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Change => "change",
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Reset => "reset",
            Self::Sort => "sort",
            Self::Destroy => "destroy",
            Self::Invalid => "invalid",
        }
    }

    /// Kinds that alter the shape of a collection or the lifetime of an entity.
    #[must_use]
    pub const fn is_structural(self) -> bool {
        matches!(self, Self::Add | Self::Remove | Self::Reset | Self::Sort | Self::Destroy)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The object an event is reported as coming from.
///
/// Re-emitted child events name the re-emitting owner. Events forwarded by a
/// collection keep the element that raised them.
#[derive(Debug, Clone)]
pub enum Origin {
    Entity(Entity),
    Collection(Collection),
}

impl Origin {
    #[must_use]
    pub const fn as_entity(&self) -> Option<&Entity> {
        match self {
            Self::Entity(entity) => Some(entity),
            Self::Collection(_) => None,
        }
    }

    #[must_use]
    pub const fn as_collection(&self) -> Option<&Collection> {
        match self {
            Self::Collection(collection) => Some(collection),
            Self::Entity(_) => None,
        }
    }
}

/// A notification raised by an [`Entity`] or a [`Collection`].
#[derive(Debug, Clone)]
pub struct ModelEvent {
    pub kind: EventKind,
    /// Attribute path qualifying the event, relative to the emitter.
    pub path: Option<String>,
    pub origin: Origin,
    /// New value for `change:<attr>`, or the message for `invalid`.
    pub value: Option<Value>,
    /// Element position for `add` and `remove`.
    pub index: Option<usize>,
}

impl ModelEvent {
    pub(crate) const fn new(kind: EventKind, origin: Origin) -> Self {
        Self { kind, path: None, origin, value: None, index: None }
    }

    #[must_use]
    pub(crate) fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub(crate) fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    #[must_use]
    pub(crate) const fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Dispatch name: `kind` or `kind:path`.
    #[must_use]
    pub fn name(&self) -> String {
        self.topic().into_owned()
    }

    /// Whether the owner of the emitting child should also report a plain `change`.
    #[must_use]
    pub const fn bubbles_as_change(&self) -> bool {
        self.kind.is_structural() || (matches!(self.kind, EventKind::Change) && self.path.is_none())
    }

    /// Copy of this event as seen from the owner of attribute `attr`.
    pub(crate) fn relabel(&self, attr: &str, origin: Origin) -> Self {
        let path = match &self.path {
            Some(tail) => format!("{attr}.{tail}"),
            None => attr.to_owned(),
        };
        Self {
            kind: self.kind,
            path: Some(path),
            origin,
            value: self.value.clone(),
            index: self.index,
        }
    }
}

impl Topic for ModelEvent {
    fn topic(&self) -> Cow<'_, str> {
        match &self.path {
            Some(path) => Cow::Owned(format!("{}:{path}", self.kind.as_str())),
            None => Cow::Borrowed(self.kind.as_str()),
        }
    }
}

/// Subscription surface shared by entities and collections.
pub trait Observable {
    fn emitter(&self) -> &Emitter<ModelEvent>;

    /// Subscribes `handler` to one or more space-separated event names.
    ///
    /// # Errors
    /// Returns [`EmitterError::InvalidTopic`] if `topics` names no event.
    fn on(
        &self,
        topics: &str,
        handler: impl Fn(&ModelEvent) + Send + Sync + 'static,
    ) -> Result<ListenerId, EmitterError> {
        self.emitter().on(topics, handler)
    }

    /// Like [`Observable::on`], but the handler is removed after its first call.
    ///
    /// # Errors
    /// Returns [`EmitterError::InvalidTopic`] if `topics` names no event.
    fn once(
        &self,
        topics: &str,
        handler: impl Fn(&ModelEvent) + Send + Sync + 'static,
    ) -> Result<ListenerId, EmitterError> {
        self.emitter().once(topics, handler)
    }

    /// Subscribes `handler` to every event.
    fn on_all(&self, handler: impl Fn(&ModelEvent) + Send + Sync + 'static) -> ListenerId {
        self.emitter().on_all(handler)
    }

    fn off(&self, id: ListenerId) -> bool {
        self.emitter().off(id)
    }

    /// Dispatches `event` to this object's listeners and returns how many ran.
    fn trigger(&self, event: &ModelEvent) -> usize {
        self.emitter().emit(event)
    }
}
