//! Stored document shapes
//!
//! Vertices and edges map onto the store's native identity fields (`_id`,
//! `_key`, `_rev`, and `_from`/`_to` for edges) plus `label` and
//! `properties`. The element id itself is never written as a field; it is
//! rebuilt from `_id` with the graph's [`IdCodec`].

use crate::element::{EdgeData, VertexData, VertexProperty};
use crate::error::{Error, Result};
use crate::id::{ElementId, IdCodec};
use crate::property::PropertyValue;
use crate::version::SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const ID_FIELD: &str = "_id";
pub const KEY_FIELD: &str = "_key";
pub const REV_FIELD: &str = "_rev";
pub const FROM_FIELD: &str = "_from";
pub const TO_FIELD: &str = "_to";
pub const LABEL_FIELD: &str = "label";

/// Identity fields returned by the store after a write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(rename = "_rev")]
    pub rev: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct VertexDoc {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "_key", default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    rev: Option<String>,
    label: String,
    #[serde(default)]
    properties: BTreeMap<String, Vec<VertexProperty>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EdgeDoc {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "_key", default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    rev: Option<String>,
    #[serde(rename = "_from")]
    from: String,
    #[serde(rename = "_to")]
    to: String,
    label: String,
    #[serde(default)]
    properties: BTreeMap<String, PropertyValue>,
}

fn required(field: Option<String>, name: &str) -> Result<String> {
    field.ok_or_else(|| Error::MalformedDocument(format!("missing {}", name)))
}

/// Id recovered from `_id`, which must agree with `_key`
fn stored_id(codec: &IdCodec, id: Option<String>, key: Option<String>) -> Result<ElementId> {
    let id = codec.from_handle(&required(id, ID_FIELD)?)?;
    let key = required(key, KEY_FIELD)?;
    if id.key() != Some(key.as_str()) {
        return Err(Error::MalformedDocument(format!("_key {} disagrees with _id {}", key, id)));
    }
    Ok(id)
}

/// Document body for inserting or replacing a vertex
pub fn encode_vertex(vertex: &VertexData) -> Result<Value> {
    let doc = VertexDoc {
        id: None,
        key: vertex.id().key().map(str::to_string),
        rev: None,
        label: vertex.label().to_string(),
        properties: vertex.all_properties().clone(),
    };
    Ok(serde_json::to_value(doc)?)
}

/// Document body for inserting or replacing an edge
pub fn encode_edge(edge: &EdgeData) -> Result<Value> {
    let handle = |id: &ElementId| {
        id.document_handle()
            .ok_or_else(|| Error::InvalidState(format!("edge endpoint {} has not been stored", id)))
    };
    let doc = EdgeDoc {
        id: None,
        key: edge.id().key().map(str::to_string),
        rev: None,
        from: handle(edge.from())?,
        to: handle(edge.to())?,
        label: edge.label().to_string(),
        properties: edge.all_properties().clone(),
    };
    Ok(serde_json::to_value(doc)?)
}

/// Rebuild a stored vertex
pub fn decode_vertex(codec: &IdCodec, value: Value) -> Result<VertexData> {
    let doc: VertexDoc = serde_json::from_value(value)?;
    let id = stored_id(codec, doc.id, doc.key)?;
    Ok(VertexData::stored(id, doc.label, required(doc.rev, REV_FIELD)?, doc.properties))
}

/// Rebuild a stored edge
pub fn decode_edge(codec: &IdCodec, value: Value) -> Result<EdgeData> {
    let doc: EdgeDoc = serde_json::from_value(value)?;
    let id = stored_id(codec, doc.id, doc.key)?;
    Ok(EdgeData::stored(
        id,
        doc.label,
        required(doc.rev, REV_FIELD)?,
        codec.from_handle(&doc.from)?,
        codec.from_handle(&doc.to)?,
        doc.properties,
    ))
}

/// Result of decoding a document whose shape is not known in advance
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Vertex(VertexData),
    Edge(EdgeData),
    Array(Vec<Decoded>),
    Object(BTreeMap<String, Decoded>),
    Value(Value),
}

/// Document shape as judged from its fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentShape {
    Vertex,
    Edge,
    Other,
}

/// Classify a document: identity fields plus `label` make a vertex, and
/// `_from`/`_to` on top of that make an edge
pub fn classify(value: &Value) -> DocumentShape {
    let Some(object) = value.as_object() else {
        return DocumentShape::Other;
    };
    let has = |field: &str| object.get(field).map_or(false, Value::is_string);
    if !(has(ID_FIELD) && has(KEY_FIELD) && has(REV_FIELD) && has(LABEL_FIELD)) {
        return DocumentShape::Other;
    }
    if has(FROM_FIELD) && has(TO_FIELD) {
        DocumentShape::Edge
    } else {
        DocumentShape::Vertex
    }
}

/// Decode any query result, recognising graph elements wherever they appear
pub fn decode(codec: &IdCodec, value: Value) -> Result<Decoded> {
    match classify(&value) {
        DocumentShape::Vertex => return decode_vertex(codec, value).map(Decoded::Vertex),
        DocumentShape::Edge => return decode_edge(codec, value).map(Decoded::Edge),
        DocumentShape::Other => {}
    }
    Ok(match value {
        Value::Array(items) => Decoded::Array(
            items
                .into_iter()
                .map(|item| decode(codec, item))
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Object(entries) => Decoded::Object(
            entries
                .into_iter()
                .map(|(k, v)| Ok((k, decode(codec, v)?)))
                .collect::<Result<BTreeMap<_, _>>>()?,
        ),
        other => Decoded::Value(other),
    })
}

/// Per-graph variables document, keyed by graph name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariablesData {
    #[serde(rename = "_key")]
    graph: String,

    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    revision: Option<String>,

    /// Schema version that wrote this graph
    version: u32,

    #[serde(default)]
    variables: BTreeMap<String, PropertyValue>,
}

impl VariablesData {
    /// Fresh record stamped with the running schema version
    pub fn new(graph: impl Into<String>) -> Self {
        Self {
            graph: graph.into(),
            revision: None,
            version: SCHEMA_VERSION,
            variables: BTreeMap::new(),
        }
    }

    pub fn graph_name(&self) -> &str {
        &self.graph
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    pub fn set_revision(&mut self, revision: impl Into<String>) {
        self.revision = Some(revision.into());
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.variables.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<PropertyValue>) -> Result<()> {
        if key.is_empty() {
            return Err(Error::EmptyName("variable"));
        }
        self.variables.insert(key.to_string(), value.into());
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.variables.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn encode(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn decode(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementState;
    use crate::naming::{GraphType, NamePolicy};
    use serde_json::json;

    fn codec() -> IdCodec {
        IdCodec::new(NamePolicy::new("g", GraphType::Complex).unwrap())
    }

    #[test]
    fn test_vertex_encoding() {
        let codec = codec();
        let mut vertex = VertexData::new(codec.element_id("person", Some("1")).unwrap(), "person").unwrap();
        vertex.add_property("name", "marko").unwrap();
        vertex.add_property("name", "mark").unwrap();

        let doc = encode_vertex(&vertex).unwrap();
        assert_eq!(doc["_key"], json!("1"));
        assert_eq!(doc["label"], json!("person"));
        assert!(doc.get("_id").is_none());
        let names = doc["properties"]["name"].as_array().unwrap();
        assert_eq!(names[0]["value"], json!("marko"));
        assert_eq!(names[0]["valueType"], json!("String"));
        assert_eq!(names[1]["value"], json!("mark"));
    }

    #[test]
    fn test_vertex_decoding_keeps_order() {
        let doc = json!({
            "_id": "g_person/1",
            "_key": "1",
            "_rev": "r1",
            "label": "person",
            "properties": {
                "name": [
                    {"id": "a", "value": "v1", "valueType": "String"},
                    {"id": "b", "value": "v2", "valueType": "String",
                     "properties": {"since": {"value": 3, "valueType": "Int"}}}
                ]
            }
        });
        let vertex = decode_vertex(&codec(), doc).unwrap();
        assert_eq!(vertex.state(), ElementState::Persisted);
        assert_eq!(vertex.revision(), Some("r1"));
        assert_eq!(vertex.id().collection(), "person");
        let ids: Vec<_> = vertex.properties("name").iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(
            vertex.properties("name")[1].properties.get("since"),
            Some(&PropertyValue::Int(3))
        );
    }

    #[test]
    fn test_edge_decoding() {
        let doc = json!({
            "_id": "g_knows/9",
            "_key": "9",
            "_rev": "r",
            "_from": "g_person/1",
            "_to": "g_person/2",
            "label": "knows",
            "properties": {"weight": {"value": 0.5, "valueType": "Double"}}
        });
        let edge = decode_edge(&codec(), doc).unwrap();
        assert_eq!(edge.from().key(), Some("1"));
        assert_eq!(edge.to().key(), Some("2"));
        assert_eq!(edge.property("weight"), Some(&PropertyValue::Double(0.5)));
    }

    #[test]
    fn test_key_must_match_id() {
        let edge = json!({
            "_id": "g_knows/9",
            "_key": "8",
            "_rev": "r",
            "_from": "g_person/1",
            "_to": "g_person/2",
            "label": "knows"
        });
        assert!(matches!(decode_edge(&codec(), edge), Err(Error::MalformedDocument(_))));

        let vertex = json!({"_id": "g_person/1", "_key": "2", "_rev": "r", "label": "person"});
        assert!(matches!(decode_vertex(&codec(), vertex), Err(Error::MalformedDocument(_))));

        let keyless = json!({
            "_id": "g_knows/9",
            "_rev": "r",
            "_from": "g_person/1",
            "_to": "g_person/2",
            "label": "knows"
        });
        assert!(matches!(decode_edge(&codec(), keyless), Err(Error::MalformedDocument(_))));
    }

    #[test]
    fn test_classify() {
        let vertex = json!({"_id": "g_a/1", "_key": "1", "_rev": "r", "label": "a"});
        let edge = json!({"_id": "g_e/1", "_key": "1", "_rev": "r", "label": "e",
                          "_from": "g_a/1", "_to": "g_a/2"});
        assert_eq!(classify(&vertex), DocumentShape::Vertex);
        assert_eq!(classify(&edge), DocumentShape::Edge);
        assert_eq!(classify(&json!({"_id": "g_a/1", "label": "a"})), DocumentShape::Other);
        assert_eq!(classify(&json!(3)), DocumentShape::Other);
    }

    #[test]
    fn test_decode_nested() {
        let value = json!({
            "count": 2,
            "items": [
                {"_id": "g_a/1", "_key": "1", "_rev": "r", "label": "a"},
                "plain"
            ]
        });
        let Decoded::Object(entries) = decode(&codec(), value).unwrap() else {
            panic!("expected object");
        };
        assert_eq!(entries["count"], Decoded::Value(json!(2)));
        let Decoded::Array(items) = &entries["items"] else {
            panic!("expected array");
        };
        assert!(matches!(items[0], Decoded::Vertex(_)));
        assert_eq!(items[1], Decoded::Value(json!("plain")));
    }

    #[test]
    fn test_variables_round_trip() {
        let mut vars = VariablesData::new("g");
        vars.set("owner", "ops").unwrap();
        vars.set("limit", 10i64).unwrap();
        let back = VariablesData::decode(vars.encode().unwrap()).unwrap();
        assert_eq!(back, vars);
        assert_eq!(back.version(), SCHEMA_VERSION);
        assert_eq!(back.keys().collect::<Vec<_>>(), vec!["limit", "owner"]);
    }
}
