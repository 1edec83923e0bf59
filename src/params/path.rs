//! Dotted-path access into parameter trees (`otherOptions.mrkdwn`).
//!
//! A key that exists verbatim wins over splitting on dots, so parameters whose
//! names contain a dot stay addressable.

use serde_json::{Map, Value};

pub fn get_path<'a>(params: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if let Some(v) = params.get(path) {
        return Some(v);
    }
    let (head, rest) = path.split_once('.')?;
    match params.get(head)? {
        Value::Object(inner) => get_path(inner, rest),
        _ => None,
    }
}

/// Writes `value` at `path`, creating intermediate objects. An intermediate
/// that is not an object is replaced.
pub fn set_path(params: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            params.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let slot = params
                .entry(head)
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(inner) = slot {
                set_path(inner, rest, value);
            }
        }
    }
}

/// Removes and returns the value at `path`. Objects left empty by the removal
/// are pruned.
pub fn remove_path(params: &mut Map<String, Value>, path: &str) -> Option<Value> {
    if let Some(v) = params.shift_remove(path) {
        return Some(v);
    }
    let (head, rest) = path.split_once('.')?;
    let (value, now_empty) = match params.get_mut(head)? {
        Value::Object(inner) => {
            let value = remove_path(inner, rest)?;
            (value, inner.is_empty())
        }
        _ => return None,
    };
    if now_empty {
        params.shift_remove(head);
    }
    Some(value)
}
