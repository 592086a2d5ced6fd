//! Ordered collections of entities.
//!
//! A [`Collection`] owns entities of one registered type. Every element event is
//! forwarded unchanged on the collection; an element's `destroy` also removes it.

use crate::attr::{self, ToJson};
use crate::entity::Entity;
use crate::error::StructError;
use crate::event::{EventKind, ModelEvent, Observable, Origin};
use crate::options::SetOptions;
use crate::registry::Registry;
use crate::schema::{PLAIN_TYPE, Schema};
use arbor_events::{Emitter, ListenerId};
use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
struct Member {
    entity: Entity,
    listener: ListenerId,
}

struct CollectionInner {
    schema: Arc<Schema>,
    registry: Arc<Registry>,
    members: RwLock<Vec<Member>>,
    emitter: Emitter<ModelEvent>,
}

/// An ordered list of entities of one type.
///
/// Like [`Entity`], a `Collection` is a shared handle.
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

impl Default for Collection {
    fn default() -> Self {
        Self::new()
    }
}

impl Collection {
    /// Creates an empty collection of plain entities.
    #[must_use]
    pub fn new() -> Self {
        let registry = Registry::standalone();
        let schema =
            registry.schema(PLAIN_TYPE).cloned().unwrap_or_else(|| Arc::new(Schema::plain()));
        Self::with_schema(schema, registry)
    }

    pub(crate) fn with_schema(schema: Arc<Schema>, registry: Arc<Registry>) -> Self {
        Self {
            inner: Arc::new(CollectionInner {
                schema,
                registry,
                members: RwLock::new(Vec::new()),
                emitter: Emitter::new(),
            }),
        }
    }

    /// Type of the elements.
    #[must_use]
    pub fn element_type(&self) -> &str {
        self.inner.schema.name()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.members.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.members.read().is_empty()
    }

    /// Element at `index`, if any.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<Entity> {
        self.inner.members.read().get(index).map(|member| member.entity.clone())
    }

    /// Snapshot of the elements in order.
    #[must_use]
    pub fn models(&self) -> Vec<Entity> {
        self.inner.members.read().iter().map(|member| member.entity.clone()).collect()
    }

    /// Position of `entity`, compared by identity.
    #[must_use]
    pub fn index_of(&self, entity: &Entity) -> Option<usize> {
        self.inner.members.read().iter().position(|member| member.entity.ptr_eq(entity))
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Builds an element from `attrs` and appends it.
    ///
    /// # Errors
    /// Returns [`StructError::UnexpectedValue`] if `attrs` is neither an object nor `null`.
    pub fn add(&self, attrs: Value) -> Result<Entity, StructError> {
        self.add_with(attrs, SetOptions::default())
    }

    /// [`Collection::add`] with explicit options. `add` is announced on the new
    /// element and forwarded here.
    ///
    /// # Errors
    /// See [`Collection::add`].
    pub fn add_with(&self, attrs: Value, options: SetOptions) -> Result<Entity, StructError> {
        let entity = self.build(attrs)?;
        let member = self.attach(entity.clone());

        let index = {
            let mut members = self.inner.members.write();
            members.push(member);
            members.len() - 1
        };

        if !options.silent {
            entity.trigger(
                &ModelEvent::new(EventKind::Add, Origin::Entity(entity.clone())).with_index(index),
            );
        }
        Ok(entity)
    }

    /// Removes and returns the element at `index`.
    pub fn remove(&self, index: usize) -> Option<Entity> {
        self.remove_with(index, SetOptions::default())
    }

    /// [`Collection::remove`] with explicit options.
    pub fn remove_with(&self, index: usize, options: SetOptions) -> Option<Entity> {
        let member = {
            let mut members = self.inner.members.write();
            if index >= members.len() {
                return None;
            }
            members.remove(index)
        };

        if !options.silent {
            member.entity.trigger(
                &ModelEvent::new(EventKind::Remove, Origin::Entity(member.entity.clone()))
                    .with_index(index),
            );
        }
        member.entity.off(member.listener);
        Some(member.entity)
    }

    /// Replaces every element.
    ///
    /// `null` empties the collection, an array supplies one element per item and a
    /// single object becomes the only element.
    ///
    /// # Errors
    /// Returns [`StructError::UnexpectedValue`] for any other value, or if an item is
    /// neither an object nor `null`. The collection is left untouched on error.
    pub fn reset(&self, value: Value) -> Result<(), StructError> {
        self.reset_with(value, SetOptions::default())
    }

    /// [`Collection::reset`] with explicit options.
    ///
    /// # Errors
    /// See [`Collection::reset`].
    pub fn reset_with(&self, value: Value, options: SetOptions) -> Result<(), StructError> {
        let items = match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items,
            item @ Value::Object(_) => vec![item],
            other => {
                return Err(StructError::UnexpectedValue {
                    message: format!(
                        "Expected an array or object to reset a '{}' collection, found {}",
                        self.element_type(),
                        attr::describe(&other)
                    )
                    .into(),
                    context: None,
                });
            },
        };

        let entities = items.into_iter().map(|item| self.build(item)).collect::<Result<Vec<_>, _>>()?;
        let members: Vec<Member> = entities.into_iter().map(|entity| self.attach(entity)).collect();
        let count = members.len();
        let previous = std::mem::replace(&mut *self.inner.members.write(), members);

        for member in previous {
            member.entity.off(member.listener);
        }

        debug!(collection = self.element_type(), elements = count, "Collection reset");
        if !options.silent {
            self.trigger(&ModelEvent::new(EventKind::Reset, Origin::Collection(self.clone())));
        }
        Ok(())
    }

    /// Reorders the elements with `compare`, then emits `sort`.
    pub fn sort_by(&self, compare: impl FnMut(&Entity, &Entity) -> Ordering) {
        self.sort_by_with(compare, SetOptions::default());
    }

    /// [`Collection::sort_by`] with explicit options.
    ///
    /// `compare` runs without the collection locked and may read the elements.
    pub fn sort_by_with(
        &self,
        mut compare: impl FnMut(&Entity, &Entity) -> Ordering,
        options: SetOptions,
    ) {
        let mut members = self.inner.members.read().clone();
        members.sort_by(|a, b| compare(&a.entity, &b.entity));
        *self.inner.members.write() = members;

        if !options.silent {
            self.trigger(&ModelEvent::new(EventKind::Sort, Origin::Collection(self.clone())));
        }
    }

    fn build(&self, attrs: Value) -> Result<Entity, StructError> {
        Entity::build(Arc::clone(&self.inner.schema), Arc::clone(&self.inner.registry), attrs)
    }

    /// Forwards every event of `entity` on this collection.
    fn attach(&self, entity: Entity) -> Member {
        let owner = Arc::downgrade(&self.inner);
        let listener = entity.on_all(move |event| {
            if let Some(inner) = owner.upgrade() {
                Self { inner }.forward(event);
            }
        });
        Member { entity, listener }
    }

    fn forward(&self, event: &ModelEvent) {
        if event.kind == EventKind::Destroy
            && event.path.is_none()
            && let Some(entity) = event.origin.as_entity()
            && let Some(index) = self.index_of(entity)
        {
            self.remove_with(index, SetOptions::default());
        }
        self.trigger(event);
    }
}

impl Observable for Collection {
    fn emitter(&self) -> &Emitter<ModelEvent> {
        &self.inner.emitter
    }
}

impl ToJson for Collection {
    /// Elements rendered in order.
    fn to_json(&self) -> Result<Value, StructError> {
        self.models().iter().map(ToJson::to_json).collect::<Result<Vec<_>, _>>().map(Value::Array)
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().map_err(serde::ser::Error::custom)?.serialize(serializer)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("element_type", &self.element_type())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
