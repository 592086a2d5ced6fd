//! # Arbor
//!
//! Nested, observable attribute trees.
//!
//! An [`Entity`] stores flat JSON attributes plus *structured* attributes: child
//! entities and [`Collection`]s declared by its type's [`Schema`]. Paths reach into
//! the tree (`customer.name`, `lines[0].sku`), events raised deep inside are
//! re-emitted by every owner up to the root, and [`ToJson`] renders the whole tree
//! following each type's serialization [`Policy`].
//!
//! ## Example
//!
//! ```rust
//! use arbor::{Observable, Registry, Schema, ToJson};
//! use serde_json::json;
//! use std::sync::{Arc, Mutex};
//!
//! let registry = Registry::builder()
//!     .register(Schema::builder("order").entity("customer", "person").collection("lines", "line"))
//!     .register(Schema::builder("person"))
//!     .register(Schema::builder("line"))
//!     .build()
//!     .unwrap();
//!
//! let order = registry.create("order").unwrap();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let log = Arc::clone(&seen);
//! order.on_all(move |event| log.lock().unwrap().push(event.name()));
//!
//! order.set("customer.name", "Olena").unwrap();
//! order.set("lines", json!([{ "sku": "A-1" }, { "sku": "B-2" }])).unwrap();
//! order.set("lines[1].qty", 3).unwrap();
//!
//! assert_eq!(order.value("customer.name").unwrap(), Some(json!("Olena")));
//! assert_eq!(
//!     order.to_json().unwrap(),
//!     json!({
//!         "customer": { "name": "Olena" },
//!         "lines": [{ "sku": "A-1" }, { "sku": "B-2", "qty": 3 }],
//!     })
//! );
//! assert!(seen.lock().unwrap().contains(&"change:lines.qty".to_owned()));
//! ```

mod attr;
mod collection;
mod entity;
mod error;
mod event;
mod options;
mod registry;
mod schema;

pub mod config;
pub mod path;

pub use arbor_events::{EmitterError, ListenerId};
pub use attr::{Attr, ToJson};
pub use collection::Collection;
pub use entity::Entity;
pub use error::{StructError, StructErrorExt};
pub use event::{EventKind, ModelEvent, Observable, Origin};
pub use options::{SetOptions, SetOutcome};
pub use registry::{Registry, RegistryBuilder};
pub use schema::{ChildType, PLAIN_TYPE, Policy, PolicyOverrides, Schema, SchemaBuilder, Validator};
