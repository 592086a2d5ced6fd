//! Structured entities.
//!
//! An [`Entity`] holds flat attributes (plain JSON values keyed by name) next to
//! structured attributes declared by its [`Schema`]. Structured attributes are child
//! entities or collections, created on first write (or on first read when the type
//! auto-initializes) and kept for the lifetime of the owner.
//!
//! Paths address the tree: `customer.name`, `lines[2]`, `lines[2].sku`. A path whose
//! first segment is not a structured attribute is an ordinary flat key, dots included.
//!
//! # Events
//!
//! Flat writes emit `change:<key>` for every key whose value changed and then a
//! single `change`. Child events are re-emitted by the owner under
//! `<kind>:<attr>.<path>`; a plain `change` or a structural event of the child also
//! raises a plain `change` on the owner first.

use crate::attr::{self, Attr, ToJson};
use crate::collection::Collection;
use crate::error::StructError;
use crate::event::{EventKind, ModelEvent, Observable, Origin};
use crate::options::{SetOptions, SetOutcome};
use crate::path::{self, AttrPath};
use crate::registry::Registry;
use crate::schema::{ChildType, Schema};
use arbor_events::Emitter;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// An instantiated structured attribute.
#[derive(Debug, Clone)]
pub(crate) enum Child {
    Entity(Entity),
    Collection(Collection),
}

impl Child {
    fn emitter(&self) -> &Emitter<ModelEvent> {
        match self {
            Self::Entity(entity) => entity.emitter(),
            Self::Collection(collection) => collection.emitter(),
        }
    }

    /// Writes `value` into the child as a whole.
    fn assign(&self, value: Value, options: SetOptions) -> Result<SetOutcome, StructError> {
        match self {
            Self::Collection(collection) => {
                collection.reset_with(value, options).map(|()| SetOutcome::Applied)
            },
            Self::Entity(entity) => match value {
                Value::Null => entity.clear_with(options),
                Value::Object(attrs) => entity.apply(attrs, options),
                other => Err(StructError::UnexpectedValue {
                    message: format!(
                        "Expected an object for a '{}' entity, found {}",
                        entity.type_name(),
                        attr::describe(&other)
                    )
                    .into(),
                    context: None,
                }),
            },
        }
    }
}

impl From<Child> for Attr {
    fn from(child: Child) -> Self {
        match child {
            Child::Entity(entity) => Self::Entity(entity),
            Child::Collection(collection) => Self::Collection(collection),
        }
    }
}

#[derive(Debug, Default)]
struct ChangeState {
    changed: Map<String, Value>,
    previous: Map<String, Value>,
    validation_error: Option<String>,
}

struct EntityInner {
    schema: Arc<Schema>,
    registry: Arc<Registry>,
    values: RwLock<Map<String, Value>>,
    children: RwLock<FxHashMap<String, Child>>,
    state: RwLock<ChangeState>,
    emitter: Emitter<ModelEvent>,
}

/// A node of an attribute tree.
///
/// `Entity` is a cheap handle: clones share the same state and listeners. Locks are
/// never held while listeners run, so handlers may read and write the tree.
#[derive(Clone)]
pub struct Entity {
    inner: Arc<EntityInner>,
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl Entity {
    /// Creates an entity of the plain type, which has no structured attributes.
    #[must_use]
    pub fn new() -> Self {
        let registry = Registry::standalone();
        let schema = registry.schema(crate::PLAIN_TYPE).cloned().unwrap_or_else(|| Arc::new(Schema::plain()));
        Self::from_parts(schema, registry)
    }

    /// Creates a plain entity holding `attrs`.
    ///
    /// # Errors
    /// Returns [`StructError::UnexpectedValue`] if `attrs` is neither an object nor `null`.
    pub fn from_value(attrs: Value) -> Result<Self, StructError> {
        let entity = Self::new();
        entity.set_many(attrs, SetOptions::construction())?;
        Ok(entity)
    }

    pub(crate) fn build(
        schema: Arc<Schema>,
        registry: Arc<Registry>,
        attrs: Value,
    ) -> Result<Self, StructError> {
        let mut initial = schema.defaults().clone();
        match attrs {
            Value::Object(attrs) => initial.extend(attrs),
            Value::Null => {},
            other => {
                return Err(StructError::UnexpectedValue {
                    message: format!(
                        "Expected an object to build a '{}' entity, found {}",
                        schema.name(),
                        attr::describe(&other)
                    )
                    .into(),
                    context: None,
                });
            },
        }

        let entity = Self::from_parts(schema, registry);
        if !initial.is_empty() {
            entity.apply(initial, SetOptions::construction())?;
        }
        Ok(entity)
    }

    fn from_parts(schema: Arc<Schema>, registry: Arc<Registry>) -> Self {
        Self {
            inner: Arc::new(EntityInner {
                schema,
                registry,
                values: RwLock::new(Map::new()),
                children: RwLock::new(FxHashMap::default()),
                state: RwLock::new(ChangeState::default()),
                emitter: Emitter::new(),
            }),
        }
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.inner.schema
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        self.inner.schema.name()
    }

    /// Whether both handles refer to the same entity.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Reads `path`.
    ///
    /// Returns `Ok(None)` when nothing is stored there, including a missing
    /// collection element or a sub-path below an uninitialized child.
    ///
    /// # Errors
    /// Returns an error only if reading materializes a child (see
    /// [`crate::Policy::auto_initialize`]) and that fails.
    pub fn get(&self, path: &str) -> Result<Option<Attr>, StructError> {
        let attr_path = path::resolve(path);
        if attr_path.is_compound() && self.inner.schema.child(attr_path.base).is_some() {
            let Some(base) = self.get(attr_path.base)? else {
                return Ok(None);
            };
            let target = match (base, attr_path.index) {
                (Attr::Collection(collection), Some(index)) => collection.at(index).map(Attr::Entity),
                (_, Some(_)) => None,
                (base, None) => Some(base),
            };
            let Some(target) = target else {
                return Ok(None);
            };
            return match (target, attr_path.sub) {
                (Attr::Entity(entity), Some(sub)) => entity.get(sub),
                (_, Some(_)) => Ok(None),
                (target, None) => Ok(Some(target)),
            };
        }

        if let Some(ty) = self.inner.schema.child(path) {
            if self.inner.schema.policy().auto_initialize {
                return self.ensure_child(path, ty).map(|child| Some(child.into()));
            }
            return Ok(self.inner.children.read().get(path).cloned().map(Attr::from));
        }

        Ok(self.inner.values.read().get(path).cloned().map(Attr::Value))
    }

    /// Reads `path` and renders it as JSON.
    ///
    /// # Errors
    /// See [`Entity::get`].
    pub fn value(&self, path: &str) -> Result<Option<Value>, StructError> {
        self.get(path)?.map(|attr| attr.to_json()).transpose()
    }

    /// Whether `path` holds something other than `null`.
    ///
    /// # Errors
    /// See [`Entity::get`].
    pub fn has(&self, path: &str) -> Result<bool, StructError> {
        Ok(!matches!(self.get(path)?, None | Some(Attr::Value(Value::Null))))
    }

    /// Whether the structured attribute `attr` has been created.
    #[must_use]
    pub fn is_initialized(&self, attr: &str) -> bool {
        self.inner.children.read().contains_key(attr)
    }

    /// Snapshot of the flat attributes.
    #[must_use]
    pub fn attributes(&self) -> Map<String, Value> {
        self.inner.values.read().clone()
    }

    /// Writes `value` at `path` with default options.
    ///
    /// # Errors
    /// * [`StructError::UnsupportedIndex`] if an index addresses an entity attribute.
    /// * [`StructError::IndexOutOfBounds`] if an index addresses no element.
    /// * [`StructError::InvalidPath`] if a sub-path addresses a collection directly.
    /// * [`StructError::UnexpectedValue`] if `value` does not fit the target child.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<SetOutcome, StructError> {
        self.set_with(path, value, SetOptions::default())
    }

    /// Writes `value` at `path`.
    ///
    /// # Errors
    /// See [`Entity::set`].
    pub fn set_with(
        &self,
        path: &str,
        value: impl Into<Value>,
        options: SetOptions,
    ) -> Result<SetOutcome, StructError> {
        if path.is_empty() {
            return Ok(SetOutcome::Applied);
        }
        let mut attrs = Map::new();
        attrs.insert(path.to_owned(), value.into());
        self.apply(attrs, options)
    }

    /// Writes the JSON rendering of `source` at `path`.
    ///
    /// Use this to copy another entity or collection into this tree; the source
    /// instance itself is never adopted.
    ///
    /// # Errors
    /// See [`Entity::set`].
    pub fn set_from(&self, path: &str, source: &impl ToJson) -> Result<SetOutcome, StructError> {
        let value = source.to_json()?;
        self.set(path, value)
    }

    /// Writes every `path: value` pair of the object `attrs`.
    ///
    /// `null` writes nothing.
    ///
    /// # Errors
    /// Returns [`StructError::UnexpectedValue`] if `attrs` is neither an object nor
    /// `null`, and otherwise see [`Entity::set`].
    pub fn set_many(&self, attrs: Value, options: SetOptions) -> Result<SetOutcome, StructError> {
        match attrs {
            Value::Object(attrs) => self.apply(attrs, options),
            Value::Null => Ok(SetOutcome::Applied),
            other => Err(StructError::UnexpectedValue {
                message: format!("Expected an object of attributes, found {}", attr::describe(&other))
                    .into(),
                context: None,
            }),
        }
    }

    /// Removes the attribute at `path`. A structured attribute is emptied instead.
    ///
    /// # Errors
    /// See [`Entity::set`].
    pub fn unset(&self, path: &str) -> Result<SetOutcome, StructError> {
        self.set_with(path, Value::Null, SetOptions::default().unsetting())
    }

    /// Removes every flat attribute and empties every created child.
    ///
    /// Child instances are kept, so handles obtained earlier stay attached.
    ///
    /// # Errors
    /// See [`Entity::set`].
    pub fn clear(&self) -> Result<SetOutcome, StructError> {
        self.clear_with(SetOptions::default())
    }

    /// [`Entity::clear`] with explicit options.
    ///
    /// # Errors
    /// See [`Entity::set`].
    pub fn clear_with(&self, options: SetOptions) -> Result<SetOutcome, StructError> {
        let mut attrs: Map<String, Value> =
            self.inner.values.read().keys().map(|key| (key.clone(), Value::Null)).collect();
        attrs.extend(self.inner.children.read().keys().map(|attr| (attr.clone(), Value::Null)));
        self.apply(attrs, options.unsetting())
    }

    /// Announces that this entity is going away. Owning collections drop it.
    pub fn destroy(&self) {
        debug!(entity = self.type_name(), "Entity destroyed");
        self.trigger(&ModelEvent::new(EventKind::Destroy, Origin::Entity(self.clone())));
    }

    /// Flat attributes changed by the last flat write, with their new values
    /// (`null` for removed keys).
    #[must_use]
    pub fn changed(&self) -> Map<String, Value> {
        self.inner.state.read().changed.clone()
    }

    /// Value of the flat attribute `key` before the last flat write.
    #[must_use]
    pub fn previous(&self, key: &str) -> Option<Value> {
        self.inner.state.read().previous.get(key).cloned()
    }

    /// Message of the last validator veto, cleared by the next accepted write.
    #[must_use]
    pub fn validation_error(&self) -> Option<String> {
        self.inner.state.read().validation_error.clone()
    }

    pub(crate) fn apply(
        &self,
        attrs: Map<String, Value>,
        options: SetOptions,
    ) -> Result<SetOutcome, StructError> {
        if options.validate && !self.validate(&attrs, options) {
            return Ok(SetOutcome::Rejected);
        }

        let mut flat = Map::new();
        let applied = attrs.into_iter().try_fold(
            SetOutcome::Applied,
            |outcome, (attr, value)| -> Result<SetOutcome, StructError> {
                let attr_path = path::resolve(&attr);
                if attr_path.is_compound()
                    && let Some(ty) = self.inner.schema.child(attr_path.base)
                {
                    return Ok(outcome.and(self.set_nested(&attr_path, ty, value, options)?));
                }

                if let Some(ty) = self.inner.schema.child(&attr) {
                    let child = self.ensure_child(&attr, ty)?;
                    return Ok(outcome.and(child.assign(value, options)?));
                }

                flat.insert(attr, value);
                Ok(outcome)
            },
        );

        // Flat keys reached before a failing part are kept, like the children already written.
        if !flat.is_empty() {
            self.store(flat, options);
        }
        applied
    }

    fn set_nested(
        &self,
        attr_path: &AttrPath<'_>,
        ty: &ChildType,
        value: Value,
        options: SetOptions,
    ) -> Result<SetOutcome, StructError> {
        let child = self.ensure_child(attr_path.base, ty)?;

        let target = match (child, attr_path.index) {
            (Child::Collection(collection), Some(index)) => {
                let element = collection.at(index).ok_or_else(|| StructError::IndexOutOfBounds {
                    message: format!(
                        "No element at {}[{index}], length is {}",
                        attr_path.base,
                        collection.len()
                    )
                    .into(),
                    context: None,
                })?;
                Child::Entity(element)
            },
            (Child::Entity(_), Some(_)) => {
                return Err(StructError::UnsupportedIndex {
                    message: format!("'{}' is an entity, not a collection", attr_path.base).into(),
                    context: Some(attr_path.to_string().into()),
                });
            },
            (child, None) => child,
        };

        match (target, attr_path.sub) {
            (Child::Entity(entity), Some(sub)) => entity.set_with(sub, value, options),
            (Child::Collection(_), Some(_)) => Err(StructError::InvalidPath {
                message: format!("'{}' is a collection; select an element with [index]", attr_path.base)
                    .into(),
                context: Some(attr_path.to_string().into()),
            }),
            (target, None) => target.assign(value, options),
        }
    }

    /// Returns the child bound to `attr`, creating and wiring it on first use.
    fn ensure_child(&self, attr: &str, ty: &ChildType) -> Result<Child, StructError> {
        if let Some(child) = self.inner.children.read().get(attr) {
            return Ok(child.clone());
        }

        let created = self.inner.registry.instantiate(ty)?;
        self.bridge(attr, &created);

        let mut children = self.inner.children.write();
        if let Some(existing) = children.get(attr) {
            return Ok(existing.clone());
        }
        children.insert(attr.to_owned(), created.clone());
        drop(children);

        debug!(entity = self.type_name(), attr, child = %ty, "Child initialized");
        Ok(created)
    }

    /// Re-emits every event of `child` on this entity.
    fn bridge(&self, attr: &str, child: &Child) {
        let owner = Arc::downgrade(&self.inner);
        let attr = attr.to_owned();
        child.emitter().on_all(move |event| {
            if let Some(inner) = owner.upgrade() {
                Self { inner }.reemit(&attr, event);
            }
        });
    }

    fn reemit(&self, attr: &str, event: &ModelEvent) {
        let origin = Origin::Entity(self.clone());
        if event.bubbles_as_change() {
            self.trigger(&ModelEvent::new(EventKind::Change, origin.clone()));
        }
        let relabeled = event.relabel(attr, origin);
        trace!(entity = self.type_name(), event = %relabeled.name(), "Re-emitting child event");
        self.trigger(&relabeled);
    }

    /// Runs the validator against the flat state this write would produce.
    fn validate(&self, attrs: &Map<String, Value>, options: SetOptions) -> bool {
        let Some(validator) = self.inner.schema.validator() else {
            return true;
        };

        let mut candidate = self.inner.values.read().clone();
        for (key, value) in attrs {
            if options.unset {
                candidate.remove(key);
            } else {
                candidate.insert(key.clone(), value.clone());
            }
        }

        match validator(&candidate) {
            Ok(()) => {
                self.inner.state.write().validation_error = None;
                true
            },
            Err(message) => {
                warn!(entity = self.type_name(), error = %message, "Write rejected by validator");
                self.inner.state.write().validation_error = Some(message.clone());
                self.trigger(
                    &ModelEvent::new(EventKind::Invalid, Origin::Entity(self.clone()))
                        .with_value(Value::String(message)),
                );
                false
            },
        }
    }

    /// Applies a batch of flat attributes and emits the resulting change events.
    fn store(&self, attrs: Map<String, Value>, options: SetOptions) {
        let changes = {
            let mut values = self.inner.values.write();
            let previous = values.clone();
            let mut changes = Vec::new();
            for (key, value) in attrs {
                if options.unset {
                    if values.remove(&key).is_some() {
                        changes.push((key, Value::Null));
                    }
                } else if values.get(&key) != Some(&value) {
                    values.insert(key.clone(), value.clone());
                    changes.push((key, value));
                }
            }

            let mut state = self.inner.state.write();
            state.previous = previous;
            state.changed = changes.iter().cloned().collect();
            changes
        };

        if options.silent || changes.is_empty() {
            return;
        }

        let origin = Origin::Entity(self.clone());
        for (key, value) in changes {
            self.trigger(&ModelEvent::new(EventKind::Change, origin.clone()).with_path(key).with_value(value));
        }
        self.trigger(&ModelEvent::new(EventKind::Change, origin));
    }
}

impl Observable for Entity {
    fn emitter(&self) -> &Emitter<ModelEvent> {
        &self.inner.emitter
    }
}

impl ToJson for Entity {
    /// Flat attributes plus every structured attribute, rendered recursively.
    ///
    /// Uninitialized structured attributes render as `null` unless the type
    /// auto-initializes, in which case they are created first.
    fn to_json(&self) -> Result<Value, StructError> {
        let mut json = self.inner.values.read().clone();
        let policy = self.inner.schema.policy();

        for (attr, _) in self.inner.schema.fields() {
            let rendered = match self.get(attr)? {
                Some(child) => child.to_json()?,
                None => Value::Null,
            };
            let rendered =
                if policy.nullify_empty && attr::is_empty(&rendered) { Value::Null } else { rendered };

            if policy.clear_empty && attr::is_empty(&rendered) {
                json.remove(attr);
            } else {
                json.insert(attr.to_owned(), rendered);
            }
        }

        Ok(Value::Object(json))
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().map_err(serde::ser::Error::custom)?.serialize(serializer)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let children: Vec<String> = self.inner.children.read().keys().cloned().collect();
        f.debug_struct("Entity")
            .field("type", &self.type_name())
            .field("attributes", &*self.inner.values.read())
            .field("children", &children)
            .finish_non_exhaustive()
    }
}
