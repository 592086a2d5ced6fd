//! # Event Emitter
//!
//! A small, synchronous observer primitive for object graphs that notify their owners.
//!
//! ## Overview
//!
//! An [`Emitter`] dispatches events by name. Listeners subscribe to one or more names
//! (`"change"`, `"change:title add"`) or to everything through a catch-all listener.
//! Dispatch happens on the caller's stack and runs to completion before `emit` returns.
//!
//! ## Features
//!
//! * **Named and catch-all listeners**: named listeners run first, catch-all listeners after.
//! * **Reentrant**: handlers may emit, subscribe and unsubscribe during dispatch.
//! * **Thread-safe**: `FxHashMap` + `parking_lot::RwLock`; handlers are `Send + Sync`.
//!
//! # Example
//!
//! ```rust
//! use arbor_events::{Emitter, Topic};
//! use std::borrow::Cow;
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Debug)]
//! struct Renamed { field: &'static str }
//!
//! impl Topic for Renamed {
//!     fn topic(&self) -> Cow<'_, str> {
//!         Cow::Owned(format!("change:{}", self.field))
//!     }
//! }
//!
//! let emitter = Emitter::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let log = Arc::clone(&seen);
//! emitter.on_all(move |event: &Renamed| log.lock().unwrap().push(event.topic().into_owned()));
//!
//! emitter.emit(&Renamed { field: "title" });
//! assert_eq!(*seen.lock().unwrap(), vec!["change:title".to_owned()]);
//! ```

mod emitter;
mod error;

pub use emitter::{Emitter, ListenerId, Topic};
pub use error::{EmitterError, EmitterErrorExt};
