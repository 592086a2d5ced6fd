//! Entity type descriptions.
//!
//! A [`Schema`] names the structured attributes of a type (each bound to an entity
//! or collection type), its serialization [`Policy`], attribute defaults and an
//! optional validator. Schemas are assembled through [`SchemaBuilder`] and become
//! usable once registered in a [`crate::Registry`].

use crate::error::StructError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Name of the built-in type with no structured attributes.
pub const PLAIN_TYPE: &str = "model";

/// Validation hook. Receives the prospective flat attributes of a write and returns
/// an error message to veto it.
pub type Validator = Arc<dyn Fn(&Map<String, Value>) -> Result<(), String> + Send + Sync>;

/// The kind and type name of a structured attribute.
///
/// Written as `"address"` for an entity of type `address` and `"[address]"` for a
/// collection of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ChildType {
    Entity(String),
    Collection(String),
}

impl ChildType {
    pub fn entity(type_name: impl Into<String>) -> Self {
        Self::Entity(type_name.into())
    }

    pub fn collection(type_name: impl Into<String>) -> Self {
        Self::Collection(type_name.into())
    }

    /// Registered type of the entity, or of the collection's elements.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Entity(name) | Self::Collection(name) => name,
        }
    }

    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self, Self::Collection(_))
    }
}

impl fmt::Display for ChildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(name) => f.write_str(name),
            Self::Collection(name) => write!(f, "[{name}]"),
        }
    }
}

impl FromStr for ChildType {
    type Err = StructError;

    fn from_str(descriptor: &str) -> Result<Self, Self::Err> {
        let descriptor = descriptor.trim();
        let (name, collection) =
            match descriptor.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
                Some(inner) => (inner.trim(), true),
                None => (descriptor, false),
            };

        if name.is_empty() || name.contains(['[', ']']) {
            return Err(StructError::TypeResolution {
                message: format!("Malformed child type descriptor '{descriptor}'").into(),
                context: None,
            });
        }

        Ok(if collection { Self::collection(name) } else { Self::entity(name) })
    }
}

impl TryFrom<String> for ChildType {
    type Error = StructError;

    fn try_from(descriptor: String) -> Result<Self, Self::Error> {
        descriptor.parse()
    }
}

impl From<ChildType> for String {
    fn from(ty: ChildType) -> Self {
        ty.to_string()
    }
}

/// Serialization and materialization flags of a type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Reading a structured attribute creates it when absent.
    pub auto_initialize: bool,
    /// Empty structured attributes serialize as `null`.
    pub nullify_empty: bool,
    /// Empty structured attributes are left out of serialized output.
    pub clear_empty: bool,
}

/// Per-type policy flags. Unset flags inherit the registry default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PolicyOverrides {
    pub auto_initialize: Option<bool>,
    pub nullify_empty: Option<bool>,
    pub clear_empty: Option<bool>,
}

impl PolicyOverrides {
    #[must_use]
    pub fn resolve(self, base: Policy) -> Policy {
        Policy {
            auto_initialize: self.auto_initialize.unwrap_or(base.auto_initialize),
            nullify_empty: self.nullify_empty.unwrap_or(base.nullify_empty),
            clear_empty: self.clear_empty.unwrap_or(base.clear_empty),
        }
    }
}

/// A registered entity type.
pub struct Schema {
    name: String,
    fields: Vec<(String, ChildType)>,
    policy: Policy,
    defaults: Map<String, Value>,
    validator: Option<Validator>,
}

impl Schema {
    /// Starts describing a type called `name`.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            overrides: PolicyOverrides::default(),
            defaults: Map::new(),
            validator: None,
        }
    }

    pub(crate) fn plain() -> Self {
        Self {
            name: PLAIN_TYPE.to_owned(),
            fields: Vec::new(),
            policy: Policy::default(),
            defaults: Map::new(),
            validator: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Structured attributes in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &ChildType)> {
        self.fields.iter().map(|(attr, ty)| (attr.as_str(), ty))
    }

    /// The child type bound to `attr`, if `attr` is structured.
    #[must_use]
    pub fn child(&self, attr: &str) -> Option<&ChildType> {
        self.fields.iter().find(|(name, _)| name == attr).map(|(_, ty)| ty)
    }

    #[must_use]
    pub const fn policy(&self) -> Policy {
        self.policy
    }

    #[must_use]
    pub const fn defaults(&self) -> &Map<String, Value> {
        &self.defaults
    }

    pub(crate) fn validator(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("policy", &self.policy)
            .field("defaults", &self.defaults)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

/// Builder for [`Schema`]. Consumed by [`crate::RegistryBuilder::register`].
#[must_use = "A schema builder does nothing until it is registered."]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<(String, ChildType)>,
    overrides: PolicyOverrides,
    defaults: Map<String, Value>,
    validator: Option<Validator>,
}

impl SchemaBuilder {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Binds `attr` to `ty`. Binding the same attribute twice keeps the last type.
    pub fn child(mut self, attr: impl Into<String>, ty: ChildType) -> Self {
        let attr = attr.into();
        match self.fields.iter_mut().find(|(name, _)| *name == attr) {
            Some(field) => field.1 = ty,
            None => self.fields.push((attr, ty)),
        }
        self
    }

    /// Binds `attr` to a single entity of `type_name`.
    pub fn entity(self, attr: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.child(attr, ChildType::entity(type_name))
    }

    /// Binds `attr` to a collection of `type_name` entities.
    pub fn collection(self, attr: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.child(attr, ChildType::collection(type_name))
    }

    pub const fn auto_initialize(mut self, enabled: bool) -> Self {
        self.overrides.auto_initialize = Some(enabled);
        self
    }

    pub const fn nullify_empty(mut self, enabled: bool) -> Self {
        self.overrides.nullify_empty = Some(enabled);
        self
    }

    pub const fn clear_empty(mut self, enabled: bool) -> Self {
        self.overrides.clear_empty = Some(enabled);
        self
    }

    pub const fn overrides(mut self, overrides: PolicyOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Default for `key`, applied when an instance is created without it.
    pub fn default_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }

    pub fn defaults(mut self, defaults: Map<String, Value>) -> Self {
        self.defaults.extend(defaults);
        self
    }

    pub fn validator(
        mut self,
        validator: impl Fn(&Map<String, Value>) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub(crate) fn fields(&self) -> impl Iterator<Item = (&str, &ChildType)> {
        self.fields.iter().map(|(attr, ty)| (attr.as_str(), ty))
    }

    pub(crate) fn finish(self, base: Policy) -> Schema {
        Schema {
            name: self.name,
            fields: self.fields,
            policy: self.overrides.resolve(base),
            defaults: self.defaults,
            validator: self.validator,
        }
    }
}

impl fmt::Debug for SchemaBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaBuilder")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptors_parse_into_child_types() {
        assert_eq!("address".parse::<ChildType>().unwrap(), ChildType::entity("address"));
        assert_eq!("[item]".parse::<ChildType>().unwrap(), ChildType::collection("item"));
        assert_eq!("[ item ]".parse::<ChildType>().unwrap(), ChildType::collection("item"));

        for bad in ["", "[]", "[[item]]", "item]"] {
            assert!(
                matches!(bad.parse::<ChildType>(), Err(StructError::TypeResolution { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn descriptors_round_trip_through_display() {
        assert_eq!(ChildType::collection("line").to_string(), "[line]");
        assert_eq!(String::from(ChildType::entity("address")), "address");
    }

    #[test]
    fn overrides_inherit_unset_flags() {
        let base = Policy { auto_initialize: true, nullify_empty: false, clear_empty: true };
        let overrides = PolicyOverrides { nullify_empty: Some(true), ..PolicyOverrides::default() };

        assert_eq!(
            overrides.resolve(base),
            Policy { auto_initialize: true, nullify_empty: true, clear_empty: true }
        );
    }

    #[test]
    fn rebinding_an_attribute_keeps_the_last_type() {
        let schema = Schema::builder("order")
            .entity("customer", "person")
            .collection("customer", "person")
            .finish(Policy::default());

        assert_eq!(schema.fields().count(), 1);
        assert_eq!(schema.child("customer"), Some(&ChildType::collection("person")));
        assert_eq!(schema.child("missing"), None);
    }
}
