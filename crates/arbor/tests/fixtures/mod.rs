use arbor::{Entity, Observable, PLAIN_TYPE, Policy, Registry, Schema};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Registry with a `structured` type holding a plain `model` and a `collection` of plain models.
/// # Panics
/// * If the registry fails to build.
#[must_use]
pub fn registry_with(policy: Policy) -> Arc<Registry> {
    Registry::builder()
        .defaults(policy)
        .register(
            Schema::builder("structured")
                .entity("model", PLAIN_TYPE)
                .collection("collection", PLAIN_TYPE),
        )
        .build()
        .expect("Registry setup failed")
}

/// Creates a `structured` entity from `attrs` under the default policy.
/// # Panics
/// * If `attrs` cannot be applied.
#[must_use]
pub fn structured(attrs: Value) -> Entity {
    structured_with(Policy::default(), attrs)
}

/// # Panics
/// * If `attrs` cannot be applied.
#[must_use]
pub fn structured_with(policy: Policy, attrs: Value) -> Entity {
    registry_with(policy).create_with("structured", attrs).expect("Entity setup failed")
}

/// Records the name of every event `target` emits.
pub fn record(target: &impl Observable) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    target.on_all(move |event| sink.lock().unwrap().push(event.name()));
    log
}

/// Recorded names, in order.
/// # Panics
/// * If the log mutex is poisoned.
#[must_use]
pub fn names(log: &Mutex<Vec<String>>) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// How many times `name` was recorded.
/// # Panics
/// * If the log mutex is poisoned.
#[must_use]
pub fn count(log: &Mutex<Vec<String>>, name: &str) -> usize {
    log.lock().unwrap().iter().filter(|n| *n == name).count()
}
