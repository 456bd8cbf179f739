//! Path operations on a JSON document tree.
//!
//! Shared by both store implementations. Semantics follow the backend:
//! - writing `null` deletes the node
//! - objects left empty by a delete are pruned
//! - a write through a non-object node replaces it with an object

use serde_json::{Map, Value};

/// Borrow the node at `segments`, if present
pub(crate) fn get<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments {
        node = node.as_object()?.get(segment)?;
    }
    if node.is_null() {
        None
    } else {
        Some(node)
    }
}

/// Set (or with `Value::Null`, delete) the node at `segments`
pub(crate) fn set(root: &mut Value, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        *root = if value.is_null() {
            Value::Object(Map::new())
        } else {
            value
        };
        return;
    };

    if value.is_null() {
        remove(root, parents, last);
        return;
    }

    let mut node = root;
    for segment in parents {
        node = ensure_object(node)
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(node).insert(last.clone(), value);
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}

/// Delete `parents/last`, then prune ancestors that became empty
fn remove(root: &mut Value, parents: &[String], last: &str) -> bool {
    let Some(map) = root.as_object_mut() else {
        return false;
    };
    match parents.split_first() {
        None => map.remove(last).is_some(),
        Some((head, rest)) => {
            let Some(child) = map.get_mut(head) else {
                return false;
            };
            let removed = remove(child, rest, last);
            if removed && child.as_object().is_some_and(Map::is_empty) {
                map.remove(head);
            }
            removed
        }
    }
}

/// Interpret a stored value as a counter. Absent counts as 0; anything that
/// is not an integer yields `None`.
pub(crate) fn as_counter(value: Option<&Value>) -> Option<i64> {
    match value {
        None => Some(0),
        Some(v) => v.as_i64().or_else(|| v.as_u64().and_then(|n| i64::try_from(n).ok())),
    }
}

/// Key of the first child of `node` whose value satisfies `matches`
pub(crate) fn find_child<F>(node: Option<&Value>, matches: F) -> Option<String>
where
    F: Fn(&Value) -> bool,
{
    node?
        .as_object()?
        .iter()
        .find(|(_, v)| matches(v))
        .map(|(k, _)| k.clone())
}
