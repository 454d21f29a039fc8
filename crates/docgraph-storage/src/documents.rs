//! Identity-field handling shared by the embedded stores

use crate::error::{StoreError, StoreResult};
use crate::traits::CollectionKind;
use docgraph_core::document::{FROM_FIELD, ID_FIELD, KEY_FIELD, REV_FIELD, TO_FIELD};
use docgraph_core::DocumentMeta;
use serde_json::{Map, Value};
use ulid::Ulid;

/// Split `collection/key`
pub fn split_handle(handle: &str) -> StoreResult<(&str, &str)> {
    handle
        .split_once('/')
        .filter(|(collection, key)| !collection.is_empty() && !key.is_empty())
        .ok_or_else(|| StoreError::Database(format!("invalid document handle '{}'", handle)))
}

fn new_revision() -> String {
    Ulid::new().to_string()
}

fn body(document: Value) -> StoreResult<Map<String, Value>> {
    match document {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Database(format!("document must be an object, got {}", other))),
    }
}

fn check_edge(collection: &str, kind: CollectionKind, body: &Map<String, Value>) -> StoreResult<()> {
    if kind == CollectionKind::Edge {
        for field in [FROM_FIELD, TO_FIELD] {
            let valid = body
                .get(field)
                .and_then(Value::as_str)
                .map_or(false, |handle| split_handle(handle).is_ok());
            if !valid {
                return Err(StoreError::Database(format!(
                    "edge document in '{}' needs a valid {}",
                    collection, field
                )));
            }
        }
    }
    Ok(())
}

fn stamp(mut body: Map<String, Value>, meta: &DocumentMeta) -> Value {
    body.insert(ID_FIELD.to_string(), Value::from(meta.id.clone()));
    body.insert(KEY_FIELD.to_string(), Value::from(meta.key.clone()));
    body.insert(REV_FIELD.to_string(), Value::from(meta.rev.clone()));
    Value::Object(body)
}

/// Validate a new document and fill in its identity fields
///
/// `exists` reports whether a key is already taken in the collection.
pub fn prepare_insert(
    collection: &str,
    kind: CollectionKind,
    document: Value,
    exists: impl Fn(&str) -> StoreResult<bool>,
) -> StoreResult<(DocumentMeta, Value)> {
    let body = body(document)?;
    check_edge(collection, kind, &body)?;

    let key = match body.get(KEY_FIELD) {
        Some(Value::String(key)) => {
            if key.is_empty() || key.contains('/') {
                return Err(StoreError::Database(format!("invalid document key '{}'", key)));
            }
            if exists(key)? {
                return Err(StoreError::Conflict(format!("{}/{}", collection, key)));
            }
            key.clone()
        }
        Some(other) => {
            return Err(StoreError::Database(format!("document key must be a string, got {}", other)));
        }
        None => Ulid::new().to_string(),
    };

    let meta = DocumentMeta {
        id: format!("{}/{}", collection, key),
        key,
        rev: new_revision(),
    };
    let stored = stamp(body, &meta);
    Ok((meta, stored))
}

/// Validate a replacement body and give it a fresh revision
pub fn prepare_replace(
    collection: &str,
    kind: CollectionKind,
    key: &str,
    document: Value,
) -> StoreResult<(DocumentMeta, Value)> {
    let body = body(document)?;
    check_edge(collection, kind, &body)?;
    let meta = DocumentMeta {
        id: format!("{}/{}", collection, key),
        key: key.to_string(),
        rev: new_revision(),
    };
    let stored = stamp(body, &meta);
    Ok((meta, stored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prepare_insert_assigns_key() {
        let (meta, stored) =
            prepare_insert("g_a", CollectionKind::Document, json!({"label": "a"}), |_| Ok(false)).unwrap();
        assert_eq!(meta.id, format!("g_a/{}", meta.key));
        assert_eq!(stored["_key"], json!(meta.key));
        assert_eq!(stored["_rev"], json!(meta.rev));
        assert_eq!(stored["label"], json!("a"));
    }

    #[test]
    fn test_prepare_insert_conflict() {
        let err = prepare_insert("g_a", CollectionKind::Document, json!({"_key": "1"}), |k| Ok(k == "1"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_edge_needs_endpoints() {
        assert!(prepare_insert("g_e", CollectionKind::Edge, json!({"_from": "g_a/1"}), |_| Ok(false)).is_err());
        assert!(prepare_insert(
            "g_e",
            CollectionKind::Edge,
            json!({"_from": "g_a/1", "_to": "g_a/2"}),
            |_| Ok(false)
        )
        .is_ok());
    }

    #[test]
    fn test_split_handle() {
        assert_eq!(split_handle("g_a/1").unwrap(), ("g_a", "1"));
        assert!(split_handle("g_a").is_err());
        assert!(split_handle("/1").is_err());
    }
}
