use crate::collection::Collection;
use crate::entity::Entity;
use crate::error::StructError;
use serde_json::Value;

/// The result of reading an attribute path.
#[derive(Debug, Clone)]
pub enum Attr {
    /// A plain attribute.
    Value(Value),
    Entity(Entity),
    Collection(Collection),
}

impl Attr {
    #[must_use]
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_entity(&self) -> Option<&Entity> {
        match self {
            Self::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_collection(&self) -> Option<&Collection> {
        match self {
            Self::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_entity(self) -> Option<Entity> {
        match self {
            Self::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_collection(self) -> Option<Collection> {
        match self {
            Self::Collection(collection) => Some(collection),
            _ => None,
        }
    }
}

/// Conversion into a plain JSON tree.
///
/// Structured attributes render recursively; empty children follow the owning
/// type's [`crate::Policy`].
pub trait ToJson {
    /// # Errors
    /// Returns an error if rendering materializes a child whose type cannot be resolved.
    fn to_json(&self) -> Result<Value, StructError>;
}

impl ToJson for Value {
    fn to_json(&self) -> Result<Value, StructError> {
        Ok(self.clone())
    }
}

impl ToJson for Attr {
    fn to_json(&self) -> Result<Value, StructError> {
        match self {
            Self::Value(value) => Ok(value.clone()),
            Self::Entity(entity) => entity.to_json(),
            Self::Collection(collection) => collection.to_json(),
        }
    }
}

/// `null`, `{}`, `[]` and `""` count as empty.
pub(crate) fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Short name of a JSON value's type, for error messages.
pub(crate) const fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
