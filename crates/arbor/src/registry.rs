//! Type registry.
//!
//! Child types are referenced by name, so a type may contain itself or any type
//! registered alongside it. Every reference is checked when the registry is built;
//! instantiation never meets an unknown name afterwards.

use crate::collection::Collection;
use crate::entity::{Child, Entity};
use crate::error::StructError;
use crate::schema::{ChildType, PLAIN_TYPE, Policy, Schema, SchemaBuilder};
use fxhash::{FxHashMap, FxHashSet};
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

static STANDALONE: LazyLock<Arc<Registry>> = LazyLock::new(|| {
    let mut types = FxHashMap::default();
    types.insert(PLAIN_TYPE.to_owned(), Arc::new(Schema::plain()));
    Arc::new(Registry { types })
});

/// Immutable set of [`Schema`]s addressable by type name.
///
/// The plain type [`PLAIN_TYPE`] is always present.
#[derive(Debug)]
pub struct Registry {
    types: FxHashMap<String, Arc<Schema>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder { defaults: Policy::default(), types: Vec::new() }
    }

    /// Shared registry holding only the plain type.
    #[must_use]
    pub fn standalone() -> Arc<Self> {
        Arc::clone(&STANDALONE)
    }

    #[must_use]
    pub fn schema(&self, type_name: &str) -> Option<&Arc<Schema>> {
        self.types.get(type_name)
    }

    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Registered type names, sorted.
    #[must_use]
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Creates an entity of `type_name` with its defaults applied.
    ///
    /// # Errors
    /// Returns [`StructError::TypeResolution`] if `type_name` is not registered.
    pub fn create(self: &Arc<Self>, type_name: &str) -> Result<Entity, StructError> {
        self.create_with(type_name, Value::Null)
    }

    /// Creates an entity of `type_name` from `attrs`, filling gaps from the type defaults.
    ///
    /// Construction emits no events and skips validation.
    ///
    /// # Errors
    /// Returns [`StructError::TypeResolution`] if `type_name` is not registered and
    /// [`StructError::UnexpectedValue`] if `attrs` is neither an object nor `null`.
    pub fn create_with(self: &Arc<Self>, type_name: &str, attrs: Value) -> Result<Entity, StructError> {
        let schema = self.lookup(type_name)?;
        Entity::build(schema, Arc::clone(self), attrs)
    }

    /// Creates an empty collection of `type_name` elements.
    ///
    /// # Errors
    /// Returns [`StructError::TypeResolution`] if `type_name` is not registered.
    pub fn collection(self: &Arc<Self>, type_name: &str) -> Result<Collection, StructError> {
        let schema = self.lookup(type_name)?;
        Ok(Collection::with_schema(schema, Arc::clone(self)))
    }

    pub(crate) fn instantiate(self: &Arc<Self>, ty: &ChildType) -> Result<Child, StructError> {
        Ok(match ty {
            ChildType::Entity(name) => Child::Entity(self.create(name)?),
            ChildType::Collection(name) => Child::Collection(self.collection(name)?),
        })
    }

    fn lookup(&self, type_name: &str) -> Result<Arc<Schema>, StructError> {
        self.types.get(type_name).cloned().ok_or_else(|| StructError::TypeResolution {
            message: format!("Unknown type '{type_name}'").into(),
            context: None,
        })
    }
}

/// Collects schemas and checks their references.
#[derive(Debug)]
#[must_use = "A registry builder does nothing until `build` is called."]
pub struct RegistryBuilder {
    defaults: Policy,
    types: Vec<SchemaBuilder>,
}

impl RegistryBuilder {
    /// Policy inherited by every type that does not override a flag.
    pub const fn defaults(mut self, policy: Policy) -> Self {
        self.defaults = policy;
        self
    }

    pub fn register(mut self, schema: SchemaBuilder) -> Self {
        self.types.push(schema);
        self
    }

    /// Resolves policies, checks references and freezes the registry.
    ///
    /// # Errors
    /// Returns [`StructError::TypeResolution`] when:
    /// * two schemas share a name,
    /// * a structured attribute names an unregistered type,
    /// * auto-initialized entity attributes form a cycle (serializing such a type
    ///   would never terminate).
    pub fn build(self) -> Result<Arc<Registry>, StructError> {
        let mut names = FxHashSet::default();
        for schema in &self.types {
            if !names.insert(schema.name()) {
                return Err(StructError::TypeResolution {
                    message: format!("Type '{}' is registered twice", schema.name()).into(),
                    context: None,
                });
            }
        }

        for schema in &self.types {
            for (attr, ty) in schema.fields() {
                let target = ty.type_name();
                if target != PLAIN_TYPE && !names.contains(target) {
                    return Err(StructError::TypeResolution {
                        message: format!("Unknown type '{target}'").into(),
                        context: Some(format!("{}.{attr}", schema.name()).into()),
                    });
                }
            }
        }

        let mut types = FxHashMap::default();
        types.insert(PLAIN_TYPE.to_owned(), Arc::new(Schema::plain()));
        for schema in self.types {
            let schema = schema.finish(self.defaults);
            debug!(type_name = schema.name(), fields = schema.fields().count(), "Type registered");
            types.insert(schema.name().to_owned(), Arc::new(schema));
        }

        let registry = Registry { types };
        registry.check_auto_initialize_cycles()?;

        info!(types = registry.types.len(), "Registry built");
        Ok(Arc::new(registry))
    }
}

impl Registry {
    fn check_auto_initialize_cycles(&self) -> Result<(), StructError> {
        let mut done = FxHashSet::default();
        for name in self.types.keys() {
            let mut trail = Vec::new();
            self.visit(name, &mut trail, &mut done)?;
        }
        Ok(())
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        trail: &mut Vec<&'a str>,
        done: &mut FxHashSet<&'a str>,
    ) -> Result<(), StructError> {
        if done.contains(name) {
            return Ok(());
        }
        if trail.contains(&name) {
            trail.push(name);
            return Err(StructError::TypeResolution {
                message: format!("Auto-initialized attributes form a cycle: {}", trail.join(" -> "))
                    .into(),
                context: None,
            });
        }

        let Some(schema) = self.types.get(name) else {
            return Ok(());
        };
        if schema.policy().auto_initialize {
            trail.push(name);
            for (_, ty) in schema.fields() {
                if let ChildType::Entity(target) = ty {
                    self.visit(target, trail, done)?;
                }
            }
            trail.pop();
        }
        done.insert(name);
        Ok(())
    }
}
