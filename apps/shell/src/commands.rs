use crate::args::EvalArgs;
use anyhow::{Context, Result, bail};
use arbor::{Entity, Observable, Registry, SetOutcome, ToJson};
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Prints every type of the registry at `path` with its fields and policy.
pub(crate) fn types(path: &Path) -> Result<()> {
    let registry = arbor::config::load_registry(path)?;
    print_json(&describe(&registry), true)
}

/// Creates the requested entity, applies the writes and prints the result.
pub(crate) fn eval(args: EvalArgs) -> Result<()> {
    let registry = arbor::config::load_registry(&args.registry)?;
    let input = match &args.input {
        Some(raw) => read_input(raw)?,
        None => Value::Null,
    };
    let entity = registry.create_with(&args.type_name, input)?;

    if args.watch {
        entity.on_all(|event| {
            info!(event = %event.name(), value = ?event.value, index = ?event.index, "Event");
        });
    }

    for (path, value) in args.sets {
        let outcome = entity.set(&path, value).with_context(|| format!("Failed to set '{path}'"))?;
        ensure_applied(&entity, outcome, &path)?;
    }
    for path in &args.unsets {
        let outcome = entity.unset(path).with_context(|| format!("Failed to unset '{path}'"))?;
        ensure_applied(&entity, outcome, path)?;
    }

    if args.gets.is_empty() {
        return print_json(&entity.to_json()?, args.pretty);
    }
    for path in &args.gets {
        let value = entity.value(path).with_context(|| format!("Failed to read '{path}'"))?;
        print_json(&value.unwrap_or(Value::Null), args.pretty)?;
    }
    Ok(())
}

fn read_input(raw: &str) -> Result<Value> {
    let text = match raw.strip_prefix('@') {
        Some(file) => fs::read_to_string(file).with_context(|| format!("Failed to read {file}"))?,
        None => raw.to_owned(),
    };
    serde_json::from_str(&text).context("Input is not valid JSON")
}

fn ensure_applied(entity: &Entity, outcome: SetOutcome, path: &str) -> Result<()> {
    if outcome.is_applied() {
        return Ok(());
    }
    let reason = entity.validation_error().unwrap_or_else(|| "rejected by a validator".to_owned());
    bail!("Write to '{path}' was rejected: {reason}")
}

fn describe(registry: &Arc<Registry>) -> Value {
    let types = registry
        .type_names()
        .into_iter()
        .filter_map(|name| registry.schema(name))
        .map(|schema| {
            let fields: serde_json::Map<String, Value> = schema
                .fields()
                .map(|(attr, ty)| (attr.to_owned(), Value::String(ty.to_string())))
                .collect();
            let policy = schema.policy();
            let body = json!({
                "fields": fields,
                "auto_initialize": policy.auto_initialize,
                "nullify_empty": policy.nullify_empty,
                "clear_empty": policy.clear_empty,
                "defaults": schema.defaults(),
            });
            (schema.name().to_owned(), body)
        })
        .collect::<serde_json::Map<_, _>>();

    info!(types = types.len(), "Registry described");
    Value::Object(types)
}

fn print_json(value: &Value, pretty: bool) -> Result<()> {
    let text = if pretty { serde_json::to_string_pretty(value)? } else { serde_json::to_string(value)? };
    println!("{text}");
    Ok(())
}
