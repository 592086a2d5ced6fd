//! Registries described in configuration files.
//!
//! ```toml
//! [defaults]
//! nullify_empty = true
//!
//! [types.order]
//! clear_empty = true
//! fields = { customer = "person", lines = "[line]" }
//! defaults = { status = "draft" }
//!
//! [types.person]
//!
//! [types.line]
//! auto_initialize = true
//! ```
//!
//! Every key can be overridden from the environment with the `ARBOR__` prefix and
//! `__` as the nesting separator (`ARBOR__DEFAULTS__AUTO_INITIALIZE=true`).

use crate::error::{StructError, StructErrorExt};
use crate::registry::{Registry, RegistryBuilder};
use crate::schema::{ChildType, Policy, PolicyOverrides, Schema};
use config::{Config, Environment, File};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const ENV_PREFIX: &str = "ARBOR";
const ENV_SEPARATOR: &str = "__";

/// Serialized form of a [`Registry`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Policy inherited by every type.
    pub defaults: Policy,
    pub types: BTreeMap<String, TypeConfig>,
}

/// Serialized form of a [`Schema`]. Validators can only be attached in code.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TypeConfig {
    /// Structured attributes: `"type"` for an entity, `"[type]"` for a collection.
    pub fields: BTreeMap<String, ChildType>,
    pub auto_initialize: Option<bool>,
    pub nullify_empty: Option<bool>,
    pub clear_empty: Option<bool>,
    pub defaults: Map<String, Value>,
}

impl TypeConfig {
    const fn overrides(&self) -> PolicyOverrides {
        PolicyOverrides {
            auto_initialize: self.auto_initialize,
            nullify_empty: self.nullify_empty,
            clear_empty: self.clear_empty,
        }
    }
}

impl RegistryConfig {
    /// Turns the description into a builder, so validators can be added before building.
    pub fn into_builder(self) -> RegistryBuilder {
        self.types.into_iter().fold(Registry::builder().defaults(self.defaults), |builder, (name, ty)| {
            let overrides = ty.overrides();
            let schema = ty
                .fields
                .into_iter()
                .fold(Schema::builder(name), |schema, (attr, child)| schema.child(attr, child))
                .overrides(overrides)
                .defaults(ty.defaults);
            builder.register(schema)
        })
    }

    /// # Errors
    /// See [`RegistryBuilder::build`].
    pub fn build(self) -> Result<Arc<Registry>, StructError> {
        self.into_builder().build()
    }
}

/// Loads a [`RegistryConfig`] from `path` with environment overrides and builds it.
///
/// The file format is inferred from the extension (TOML, JSON, YAML and others
/// supported by the `config` crate).
///
/// # Errors
/// Returns [`StructError::Config`] if the file is missing or malformed and
/// [`StructError::TypeResolution`] if the described types do not resolve.
///
/// # Example
/// ```rust,no_run
/// let registry = arbor::config::load_registry("registry.toml").unwrap();
/// let order = registry.create("order").unwrap();
/// ```
pub fn load_registry(path: impl AsRef<Path>) -> Result<Arc<Registry>, StructError> {
    load_config::<RegistryConfig>(path)?.build()
}

/// Layers the file at `path` under `ARBOR__*` environment variables and deserializes `T`.
///
/// # Errors
/// Returns [`StructError::Config`] if the file cannot be read or does not match `T`.
pub fn load_config<T>(path: impl AsRef<Path>) -> Result<T, StructError>
where
    T: DeserializeOwned,
{
    load_layered(path.as_ref(), environment())
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}

fn load_layered<T>(path: &Path, env: Environment) -> Result<T, StructError>
where
    T: DeserializeOwned,
{
    info!(path = %path.display(), "Loading config");

    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(env)
        .build()
        .context(format!("Failed to build config from {}", path.display()))?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
