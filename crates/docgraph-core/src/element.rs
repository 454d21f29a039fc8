//! Vertex and edge data held in memory
//!
//! Elements move through [`ElementState`] in one direction only:
//! `Transient` (built locally) to `Persisted` (stored, key and revision known)
//! to `Removed`. The graph client drives the transitions.

use crate::error::{Error, Result};
use crate::id::{ElementId, IdRef};
use crate::naming::validate_name;
use crate::property::PropertyValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ulid::Ulid;

/// Lifecycle of an in-memory element handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementState {
    #[default]
    Transient,
    Persisted,
    Removed,
}

/// Identity and lifecycle shared by vertices and edges
#[derive(Debug, Clone, PartialEq)]
struct Identity {
    id: ElementId,
    label: String,
    revision: Option<String>,
    state: ElementState,
}

impl Identity {
    fn new(id: ElementId, label: String) -> Result<Self> {
        validate_name("label", &label)?;
        Ok(Self {
            id,
            label,
            revision: None,
            state: ElementState::Transient,
        })
    }

    fn stored(id: ElementId, label: String, revision: String) -> Self {
        Self {
            id,
            label,
            revision: Some(revision),
            state: ElementState::Persisted,
        }
    }

    fn mark_persisted(&mut self, key: &str, revision: &str) -> Result<()> {
        if self.state == ElementState::Removed {
            return Err(Error::InvalidState(format!("{} was removed", self.id)));
        }
        if self.id.key() != Some(key) {
            self.id = self.id.with_key(key)?;
        }
        self.revision = Some(revision.to_string());
        self.state = ElementState::Persisted;
        Ok(())
    }

    fn mark_removed(&mut self) {
        self.state = ElementState::Removed;
    }
}

fn validate_property_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::EmptyName("property key"));
    }
    Ok(())
}

/// One value of a (possibly multi-valued) vertex property, with its
/// meta-properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexProperty {
    /// Identifier of this value, unique within the vertex
    pub id: String,

    /// The value
    #[serde(flatten)]
    pub value: PropertyValue,

    /// Properties of this property value
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl VertexProperty {
    pub fn new(value: PropertyValue) -> Self {
        Self {
            id: Ulid::new().to_string(),
            value,
            properties: BTreeMap::new(),
        }
    }
}

/// A vertex
#[derive(Debug, Clone, PartialEq)]
pub struct VertexData {
    identity: Identity,
    properties: BTreeMap<String, Vec<VertexProperty>>,
}

impl VertexData {
    /// Create a transient vertex
    pub fn new(id: ElementId, label: impl Into<String>) -> Result<Self> {
        Ok(Self {
            identity: Identity::new(id, label.into())?,
            properties: BTreeMap::new(),
        })
    }

    pub(crate) fn stored(
        id: ElementId,
        label: String,
        revision: String,
        properties: BTreeMap<String, Vec<VertexProperty>>,
    ) -> Self {
        Self {
            identity: Identity::stored(id, label, revision),
            properties,
        }
    }

    pub fn id(&self) -> &ElementId {
        &self.identity.id
    }

    pub fn label(&self) -> &str {
        &self.identity.label
    }

    pub fn revision(&self) -> Option<&str> {
        self.identity.revision.as_deref()
    }

    pub fn state(&self) -> ElementState {
        self.identity.state
    }

    /// Record the key and revision assigned by the store
    pub fn mark_persisted(&mut self, key: &str, revision: &str) -> Result<()> {
        self.identity.mark_persisted(key, revision)
    }

    pub fn mark_removed(&mut self) {
        self.identity.mark_removed();
    }

    /// Append a value under `key`; earlier values keep their position
    pub fn add_property(&mut self, key: &str, value: impl Into<PropertyValue>) -> Result<&VertexProperty> {
        validate_property_key(key)?;
        let values = self.properties.entry(key.to_string()).or_default();
        values.push(VertexProperty::new(value.into()));
        let last = values.len() - 1;
        Ok(&values[last])
    }

    /// Replace every value under `key` with a single one
    pub fn set_property(&mut self, key: &str, value: impl Into<PropertyValue>) -> Result<&VertexProperty> {
        validate_property_key(key)?;
        self.properties.remove(key);
        self.add_property(key, value)
    }

    /// All values under `key`, in insertion order
    pub fn properties(&self, key: &str) -> &[VertexProperty] {
        self.properties.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bare values under `key`, in insertion order
    pub fn property_values(&self, key: &str) -> Vec<&PropertyValue> {
        self.properties(key).iter().map(|p| &p.value).collect()
    }

    /// First value under `key`
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties(key).first().map(|p| &p.value)
    }

    pub fn property_keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn all_properties(&self) -> &BTreeMap<String, Vec<VertexProperty>> {
        &self.properties
    }

    /// Remove one value; the key disappears with its last value
    pub fn remove_property_value(&mut self, key: &str, property_id: &str) -> bool {
        let Some(values) = self.properties.get_mut(key) else {
            return false;
        };
        let before = values.len();
        values.retain(|p| p.id != property_id);
        let removed = values.len() != before;
        if values.is_empty() {
            self.properties.remove(key);
        }
        removed
    }

    /// Remove every value under `key`
    pub fn remove_property(&mut self, key: &str) -> bool {
        self.properties.remove(key).is_some()
    }

    /// Attach a meta-property to one property value
    pub fn set_meta_property(
        &mut self,
        key: &str,
        property_id: &str,
        meta_key: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<()> {
        validate_property_key(meta_key)?;
        let property = self
            .properties
            .get_mut(key)
            .and_then(|values| values.iter_mut().find(|p| p.id == property_id))
            .ok_or_else(|| {
                Error::InvalidState(format!("no value {} under property '{}'", property_id, key))
            })?;
        property.properties.insert(meta_key.to_string(), value.into());
        Ok(())
    }
}

/// An edge
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeData {
    identity: Identity,
    from: ElementId,
    to: ElementId,
    properties: BTreeMap<String, PropertyValue>,
}

impl EdgeData {
    /// Create a transient edge between two stored vertices
    pub fn new(id: ElementId, label: impl Into<String>, from: ElementId, to: ElementId) -> Result<Self> {
        for endpoint in [&from, &to] {
            if endpoint.key().is_none() {
                return Err(Error::InvalidState(format!(
                    "edge endpoint {} has not been stored",
                    endpoint
                )));
            }
        }
        Ok(Self {
            identity: Identity::new(id, label.into())?,
            from,
            to,
            properties: BTreeMap::new(),
        })
    }

    pub(crate) fn stored(
        id: ElementId,
        label: String,
        revision: String,
        from: ElementId,
        to: ElementId,
        properties: BTreeMap<String, PropertyValue>,
    ) -> Self {
        Self {
            identity: Identity::stored(id, label, revision),
            from,
            to,
            properties,
        }
    }

    pub fn id(&self) -> &ElementId {
        &self.identity.id
    }

    pub fn label(&self) -> &str {
        &self.identity.label
    }

    pub fn revision(&self) -> Option<&str> {
        self.identity.revision.as_deref()
    }

    pub fn state(&self) -> ElementState {
        self.identity.state
    }

    pub fn from(&self) -> &ElementId {
        &self.from
    }

    pub fn to(&self) -> &ElementId {
        &self.to
    }

    pub fn mark_persisted(&mut self, key: &str, revision: &str) -> Result<()> {
        self.identity.mark_persisted(key, revision)
    }

    pub fn mark_removed(&mut self) {
        self.identity.mark_removed();
    }

    pub fn set_property(&mut self, key: &str, value: impl Into<PropertyValue>) -> Result<()> {
        validate_property_key(key)?;
        self.properties.insert(key.to_string(), value.into());
        Ok(())
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn remove_property(&mut self, key: &str) -> Option<PropertyValue> {
        self.properties.remove(key)
    }

    pub fn property_keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn all_properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.properties
    }
}

impl From<&VertexData> for IdRef {
    fn from(vertex: &VertexData) -> Self {
        IdRef::Id(vertex.id().clone())
    }
}

impl From<&EdgeData> for IdRef {
    fn from(edge: &EdgeData) -> Self {
        IdRef::Id(edge.id().clone())
    }
}
