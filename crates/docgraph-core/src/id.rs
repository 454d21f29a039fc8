//! Composite element identifiers
//!
//! A complex graph exposes ids as `<graph>_<label>/<key>`, which is also the
//! store's native document handle. A simple graph exposes only the bare key;
//! its single collection is implied.

use crate::error::{Error, Result};
use crate::naming::{validate_name, GraphType, NamePolicy, KEY_SEPARATOR, PREFIX_SEPARATOR};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a vertex or edge
///
/// Immutable: attaching a store-assigned key produces a new value through
/// [`ElementId::with_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId {
    kind: GraphType,
    prefix: String,
    collection: String,
    key: Option<String>,
}

impl ElementId {
    fn new(kind: GraphType, prefix: &str, collection: &str, key: Option<&str>) -> Result<Self> {
        validate_name("graph", prefix)?;
        validate_name("collection", collection)?;
        if let Some(key) = key {
            validate_name("key", key)?;
        }
        Ok(Self {
            kind,
            prefix: prefix.to_string(),
            collection: collection.to_string(),
            key: key.map(str::to_string),
        })
    }

    pub fn kind(&self) -> GraphType {
        self.kind
    }

    /// Graph name
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Collection label, without the graph prefix
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Collection name as stored: `<graph>_<collection>`
    pub fn store_collection(&self) -> String {
        format!("{}{}{}", self.prefix, PREFIX_SEPARATOR, self.collection)
    }

    /// Native store handle `<graph>_<collection>/<key>`, once a key exists
    pub fn document_handle(&self) -> Option<String> {
        self.key
            .as_ref()
            .map(|key| format!("{}{}{}", self.store_collection(), KEY_SEPARATOR, key))
    }

    /// Same prefix and collection, different key
    pub fn with_key(&self, key: &str) -> Result<Self> {
        validate_name("key", key)?;
        Ok(Self {
            kind: self.kind,
            prefix: self.prefix.clone(),
            collection: self.collection.clone(),
            key: Some(key.to_string()),
        })
    }

    /// External text form; `None` until the store has assigned a key
    pub fn to_text(&self) -> Option<String> {
        match self.kind {
            GraphType::Complex => self.document_handle(),
            GraphType::Simple => self.key.clone(),
        }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "{}{}(unassigned)", self.store_collection(), KEY_SEPARATOR),
        }
    }
}

/// A raw id or an already materialized one, as accepted by bulk lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdRef {
    Text(String),
    Id(ElementId),
}

impl From<&str> for IdRef {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for IdRef {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<ElementId> for IdRef {
    fn from(id: ElementId) -> Self {
        Self::Id(id)
    }
}

impl From<&ElementId> for IdRef {
    fn from(id: &ElementId) -> Self {
        Self::Id(id.clone())
    }
}

/// Encodes and decodes element ids for one graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdCodec {
    policy: NamePolicy,
}

impl IdCodec {
    pub fn new(policy: NamePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &NamePolicy {
        &self.policy
    }

    /// Build an id from its parts; `key` is `None` for elements the store has
    /// not yet seen
    pub fn element_id(&self, collection: &str, key: Option<&str>) -> Result<ElementId> {
        ElementId::new(
            self.policy.graph_type(),
            self.policy.graph_name(),
            self.policy.unprefixed(collection),
            key,
        )
    }

    /// Parse an external id
    ///
    /// In a complex graph the part before the first `/` names the collection,
    /// with or without the graph prefix; without it, `explicit_label` or else
    /// `default_label` is used. An explicit label that disagrees with the one
    /// recovered from the id is rejected. A collection carrying another
    /// graph's prefix yields an id of that graph, which callers can tell apart
    /// by [`ElementId::prefix`]. In a simple graph the whole text is the key
    /// and the element lives in `default_label`.
    pub fn parse(
        &self,
        text: &str,
        explicit_label: Option<&str>,
        default_label: &str,
    ) -> Result<ElementId> {
        match self.policy.graph_type() {
            GraphType::Simple => self.element_id(default_label, Some(text)),
            GraphType::Complex => {
                let (prefix, recovered, key) = match text.split_once(KEY_SEPARATOR) {
                    Some((collection, key)) => {
                        let (prefix, label) = self.split_collection(collection);
                        (prefix, Some(label), key)
                    }
                    None => (self.policy.graph_name(), None, text),
                };
                let label = match (explicit_label, recovered) {
                    (Some(expected), Some(found)) if expected != found => {
                        return Err(Error::MismatchedLabel {
                            expected: expected.to_string(),
                            found: found.to_string(),
                        });
                    }
                    (_, Some(found)) => found,
                    (Some(expected), None) => expected,
                    (None, None) => default_label,
                };
                ElementId::new(GraphType::Complex, prefix, self.policy.unprefixed(label), Some(key))
            }
        }
    }

    /// Graph prefix and label of a collection name as it appears in an id
    fn split_collection<'a>(&'a self, collection: &'a str) -> (&'a str, &'a str) {
        if let Some(label) = self.policy.strip(collection) {
            return (self.policy.graph_name(), label);
        }
        match collection.split_once(PREFIX_SEPARATOR) {
            Some((prefix, label)) => (prefix, label),
            None => (self.policy.graph_name(), collection),
        }
    }

    /// External text form of an id; inverse of [`IdCodec::parse`]
    pub fn format(&self, id: &ElementId) -> Result<String> {
        id.to_text()
            .ok_or_else(|| Error::InvalidState(format!("element {} has no key yet", id)))
    }

    /// Recover an id from a native store handle `<graph>_<collection>/<key>`
    pub fn from_handle(&self, handle: &str) -> Result<ElementId> {
        let (collection, key) = handle
            .split_once(KEY_SEPARATOR)
            .ok_or_else(|| Error::MalformedDocument(format!("'{}' is not a document handle", handle)))?;
        let label = self.policy.strip(collection).ok_or_else(|| {
            Error::MalformedDocument(format!(
                "'{}' does not belong to graph '{}'",
                handle,
                self.policy.graph_name()
            ))
        })?;
        self.element_id(label, Some(key))
    }

    /// Normalize raw ids and materialized ids, preserving order. Duplicates
    /// are kept.
    pub fn normalize<I, T>(&self, ids: I, default_label: &str) -> Result<Vec<ElementId>>
    where
        I: IntoIterator<Item = T>,
        T: Into<IdRef>,
    {
        ids.into_iter()
            .map(|id| match id.into() {
                IdRef::Text(text) => self.parse(&text, None, default_label),
                IdRef::Id(id) => Ok(id),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complex() -> IdCodec {
        IdCodec::new(NamePolicy::new("social", GraphType::Complex).unwrap())
    }

    fn simple() -> IdCodec {
        IdCodec::new(NamePolicy::new("social", GraphType::Simple).unwrap())
    }

    #[test]
    fn test_complex_round_trip() {
        let codec = complex();
        for (label, key) in [("person", "1"), ("city", "abc"), ("x", "01HZX9")] {
            let id = codec.element_id(label, Some(key)).unwrap();
            let text = codec.format(&id).unwrap();
            assert_eq!(text, format!("social_{}/{}", label, key));
            assert_eq!(codec.parse(&text, None, "vertex").unwrap(), id);
        }
    }

    #[test]
    fn test_simple_round_trip() {
        let codec = simple();
        let id = codec.element_id("vertex", Some("42")).unwrap();
        assert_eq!(codec.format(&id).unwrap(), "42");
        assert_eq!(codec.parse("42", None, "vertex").unwrap(), id);
        assert_eq!(id.document_handle().unwrap(), "social_vertex/42");
    }

    #[test]
    fn test_parse_label_resolution() {
        let codec = complex();

        let id = codec.parse("person/7", None, "vertex").unwrap();
        assert_eq!(id.collection(), "person");

        let id = codec.parse("7", Some("city"), "vertex").unwrap();
        assert_eq!(id.collection(), "city");

        let id = codec.parse("7", None, "vertex").unwrap();
        assert_eq!(id.collection(), "vertex");

        let id = codec.parse("social_person/7", Some("person"), "vertex").unwrap();
        assert_eq!(id.key(), Some("7"));
    }

    #[test]
    fn test_parse_mismatched_label() {
        let err = complex()
            .parse("social_person/7", Some("city"), "vertex")
            .unwrap_err();
        assert!(matches!(err, Error::MismatchedLabel { .. }));
        assert!(err.is_validation());
    }

    #[test]
    fn test_rejects_reserved_characters() {
        let codec = complex();
        assert!(codec.parse("social_person/a_b", None, "vertex").is_err());
        assert!(codec.parse("social_person/a/b", None, "vertex").is_err());
        assert!(codec.parse("other_x_person/1", None, "vertex").is_err());
        assert!(codec.element_id("my_label", Some("1")).is_err());

        let codec = simple();
        assert!(codec.parse("a_b", None, "vertex").is_err());
        assert!(codec.parse("social_vertex/1", None, "vertex").is_err());
        assert!(codec.parse("", None, "vertex").is_err());
    }

    #[test]
    fn test_foreign_graph_prefix() {
        let id = complex().parse("other_person/1", None, "vertex").unwrap();
        assert_eq!(id.prefix(), "other");
        assert_eq!(id.collection(), "person");
        assert_eq!(id.to_text().unwrap(), "other_person/1");
    }

    #[test]
    fn test_with_key() {
        let codec = complex();
        let transient = codec.element_id("person", None).unwrap();
        assert!(codec.format(&transient).is_err());

        let stored = transient.with_key("99").unwrap();
        assert_eq!(stored.key(), Some("99"));
        assert_eq!(transient.key(), None);
        assert_eq!(stored.collection(), transient.collection());

        assert!(matches!(
            transient.with_key("9_9"),
            Err(Error::InvalidCharacter { .. })
        ));
        assert!(transient.with_key("9/9").is_err());
    }

    #[test]
    fn test_from_handle() {
        let codec = simple();
        let id = codec.from_handle("social_vertex/5").unwrap();
        assert_eq!(id.collection(), "vertex");
        assert_eq!(id.key(), Some("5"));
        assert!(codec.from_handle("other_vertex/5").is_err());
        assert!(codec.from_handle("social_vertex").is_err());
    }

    #[test]
    fn test_normalize_preserves_order_and_duplicates() {
        let codec = complex();
        let known = codec.element_id("city", Some("3")).unwrap();
        let ids = codec
            .normalize(
                vec![
                    IdRef::from("social_person/1"),
                    IdRef::from(&known),
                    IdRef::from("social_person/1"),
                ],
                "vertex",
            )
            .unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0].key(), Some("1"));
        assert_eq!(ids[1], known);
        assert_eq!(ids[0], ids[2]);
    }
}
