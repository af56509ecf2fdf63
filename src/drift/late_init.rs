//! Late initialization of server-defaulted fields.

use super::{is_empty, join_path, kind_of, DriftError, LateInitOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Copy observed values into empty declared fields.
///
/// Walks every declared field, plus every observed field that maps onto a
/// declared name. A field is written only when the declared side is null or
/// an empty array. Non-empty arrays of objects are paired by natural key and
/// merged element by element; elements present on one side only are left
/// alone. Returns whether anything was written.
pub fn late_initialize(
    parent: &str,
    declared: &mut Value,
    observed: &Value,
    opts: &LateInitOptions,
) -> Result<bool, DriftError> {
    let observed = match observed {
        Value::Null => return Ok(false),
        Value::Object(map) => map,
        other => {
            return Err(DriftError::UnsupportedShape(format!(
                "observed {} at '{parent}' is not an object",
                kind_of(other)
            )))
        }
    };
    if declared.is_null() {
        *declared = Value::Object(Map::new());
    }
    match declared {
        Value::Object(map) => merge_object(parent, map, observed, opts),
        other => Err(DriftError::UnsupportedShape(format!(
            "declared {} at '{parent}' is not an object",
            kind_of(other)
        ))),
    }
}

/// Late-initialize a typed declared value from any serializable observation.
///
/// The result is decoded back into `D`, so observed fields the declared type
/// has no place for are dropped, and `changed` reflects the typed value.
pub fn late_initialize_typed<D, O>(
    declared: &mut D,
    observed: &O,
    opts: &LateInitOptions,
) -> Result<bool, DriftError>
where
    D: Serialize + DeserializeOwned,
    O: Serialize + ?Sized,
{
    let before = serde_json::to_value(&*declared)?;
    let observed = serde_json::to_value(observed)?;
    let mut working = before.clone();
    if !late_initialize("", &mut working, &observed, opts)? {
        return Ok(false);
    }
    let updated: D = serde_json::from_value(working)?;
    if serde_json::to_value(&updated)? == before {
        return Ok(false);
    }
    *declared = updated;
    Ok(true)
}

fn merge_object(
    path: &str,
    declared: &mut Map<String, Value>,
    observed: &Map<String, Value>,
    opts: &LateInitOptions,
) -> Result<bool, DriftError> {
    let mut names: BTreeSet<String> = declared.keys().cloned().collect();
    names.extend(observed.keys().filter_map(|k| opts.declared_name(k)));

    let mut changed = false;
    for name in names {
        let field_path = join_path(path, &name);
        if opts.filter.skips(&field_path) {
            continue;
        }
        let Some(obs) = opts.lookup(observed, &name) else {
            continue;
        };
        if obs.is_null() {
            continue;
        }
        match declared.get_mut(&name) {
            Some(slot) => changed |= merge_value(&field_path, slot, obs, opts)?,
            None => {
                let value = fill(&field_path, obs, opts)?;
                if !is_empty(&value) {
                    declared.insert(name, value);
                    changed = true;
                }
            }
        }
    }
    Ok(changed)
}

fn merge_value(
    path: &str,
    slot: &mut Value,
    observed: &Value,
    opts: &LateInitOptions,
) -> Result<bool, DriftError> {
    match (slot, observed) {
        (slot @ Value::Null, obs) => {
            let value = fill(path, obs, opts)?;
            if is_empty(&value) {
                return Ok(false);
            }
            *slot = value;
            Ok(true)
        }
        (Value::Array(declared), Value::Array(obs)) if declared.is_empty() => {
            let items = fill_array(path, obs, opts)?;
            if items.is_empty() {
                return Ok(false);
            }
            *declared = items;
            Ok(true)
        }
        (Value::Array(declared), Value::Array(obs)) => merge_keyed(path, declared, obs, opts),
        (Value::Object(declared), Value::Object(obs)) => merge_object(path, declared, obs, opts),
        (declared, obs) if kind_of(declared) == kind_of(obs) => Ok(false),
        (declared, obs) => Err(DriftError::TypeMismatch {
            path: path.to_string(),
            declared: kind_of(declared),
            observed: kind_of(obs),
        }),
    }
}

/// Pair elements by natural key and merge each pair
fn merge_keyed(
    path: &str,
    declared: &mut [Value],
    observed: &[Value],
    opts: &LateInitOptions,
) -> Result<bool, DriftError> {
    let keys = opts.keys_for(path);
    let mut changed = false;
    for element in declared.iter_mut() {
        let Value::Object(element) = element else {
            continue;
        };
        let Some((key, value)) = natural_key(element, &keys) else {
            continue;
        };
        let matched = observed.iter().find_map(|candidate| match candidate {
            Value::Object(candidate) if opts.lookup(candidate, key) == Some(&value) => {
                Some(candidate)
            }
            _ => None,
        });
        if let Some(candidate) = matched {
            changed |= merge_object(path, element, candidate, opts)?;
        }
    }
    Ok(changed)
}

/// First natural key the element carries a non-null value for
pub(super) fn natural_key<'k>(
    element: &Map<String, Value>,
    keys: &[&'k str],
) -> Option<(&'k str, Value)> {
    keys.iter().find_map(|key| match element.get(*key) {
        Some(v) if !v.is_null() => Some((*key, v.clone())),
        _ => None,
    })
}

/// Build a declared-shaped copy of an observed value
fn fill(path: &str, observed: &Value, opts: &LateInitOptions) -> Result<Value, DriftError> {
    match observed {
        Value::Object(obs) => {
            let mut map = Map::new();
            merge_object(path, &mut map, obs, opts)?;
            Ok(Value::Object(map))
        }
        Value::Array(items) => Ok(Value::Array(fill_array(path, items, opts)?)),
        scalar => Ok(scalar.clone()),
    }
}

fn fill_array(
    path: &str,
    observed: &[Value],
    opts: &LateInitOptions,
) -> Result<Vec<Value>, DriftError> {
    observed.iter().map(|item| fill(path, item, opts)).collect()
}
