//! Output formatting utilities

use std::collections::BTreeMap;
use std::fmt;

use docgraph_core::{EdgeData, IdCodec, PropertyValue, VertexData};
use serde::Serialize;
use serde_json::Value;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Format output based on format type
pub fn format_output<T: Serialize + fmt::Display>(data: &T, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string()),
        OutputFormat::Text => data.to_string(),
    }
}

/// Format a list; text output puts one item per line
pub fn format_list<T: Serialize + fmt::Display>(items: &[T], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string()),
        OutputFormat::Text => items.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n"),
    }
}

fn plain(value: &PropertyValue) -> anyhow::Result<Value> {
    Ok(value.encode()?.value)
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn write_properties<'a>(
    f: &mut fmt::Formatter<'_>,
    properties: impl Iterator<Item = (&'a String, String)>,
) -> fmt::Result {
    for (key, value) in properties {
        write!(f, " {}={}", key, value)?;
    }
    Ok(())
}

/// Printable vertex
#[derive(Debug, Serialize)]
pub struct VertexView {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    pub properties: BTreeMap<String, Vec<Value>>,
}

impl VertexView {
    pub fn new(codec: &IdCodec, vertex: &VertexData) -> anyhow::Result<Self> {
        let mut properties = BTreeMap::new();
        for (key, values) in vertex.all_properties() {
            let values = values
                .iter()
                .map(|p| plain(&p.value))
                .collect::<anyhow::Result<Vec<_>>>()?;
            properties.insert(key.clone(), values);
        }
        Ok(Self {
            id: codec.format(vertex.id())?,
            label: vertex.label().to_string(),
            revision: vertex.revision().map(str::to_string),
            properties,
        })
    }
}

impl fmt::Display for VertexView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.label)?;
        write_properties(
            f,
            self.properties.iter().map(|(key, values)| {
                let rendered: Vec<String> = values.iter().map(render).collect();
                (key, rendered.join("|"))
            }),
        )
    }
}

/// Printable edge
#[derive(Debug, Serialize)]
pub struct EdgeView {
    pub id: String,
    pub label: String,
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    pub properties: BTreeMap<String, Value>,
}

impl EdgeView {
    pub fn new(codec: &IdCodec, edge: &EdgeData) -> anyhow::Result<Self> {
        let mut properties = BTreeMap::new();
        for (key, value) in edge.all_properties() {
            properties.insert(key.clone(), plain(value)?);
        }
        Ok(Self {
            id: codec.format(edge.id())?,
            label: edge.label().to_string(),
            from: codec.format(edge.from())?,
            to: codec.format(edge.to())?,
            revision: edge.revision().map(str::to_string),
            properties,
        })
    }
}

impl fmt::Display for EdgeView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) {} -> {}", self.id, self.label, self.from, self.to)?;
        write_properties(f, self.properties.iter().map(|(key, value)| (key, render(value))))
    }
}

/// A single key and value, for variables
#[derive(Debug, Serialize)]
pub struct Entry {
    pub key: String,
    pub value: Value,
}

impl Entry {
    pub fn new(key: &str, value: &PropertyValue) -> anyhow::Result<Self> {
        Ok(Self {
            key: key.to_string(),
            value: plain(value)?,
        })
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.key, render(&self.value))
    }
}

/// Parse `key=value`; the value is read as JSON when it parses, else as a
/// string
pub fn parse_property(text: &str) -> anyhow::Result<(String, PropertyValue)> {
    let (key, raw) = text
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Expected key=value, got '{}'", text))?;
    let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.trim().to_string(), PropertyValue::try_from(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_property() {
        let (key, value) = parse_property("age=29").unwrap();
        assert_eq!(key, "age");
        assert_eq!(value, PropertyValue::Long(29));

        let (_, value) = parse_property("name=marko").unwrap();
        assert_eq!(value, PropertyValue::from("marko"));

        let (_, value) = parse_property("tags=[\"a\",\"b\"]").unwrap();
        assert!(matches!(value, PropertyValue::List(ref items) if items.len() == 2));

        assert!(parse_property("novalue").is_err());
        assert!(parse_property("x=null").is_err());
    }

    #[test]
    fn test_output_format() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("text"), OutputFormat::Text);
        let entry = Entry::new("owner", &PropertyValue::from("ops")).unwrap();
        assert_eq!(format_output(&entry, OutputFormat::Text), "owner = ops");
    }
}
