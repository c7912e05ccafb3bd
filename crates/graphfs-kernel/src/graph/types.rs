//! Records exchanged with the graph engine.
//!
//! These are the raw property-map results of engine calls. The node facade
//! (`crate::node`) wraps them in typed views.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Engine-assigned element identifier.
///
/// Only meaningful within one engine instance. External addressing goes
/// through the `uuid` property or the structured identifier string.
pub type ElementId = u64;

/// A single property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Integer value (timestamps, mode bits, ids).
    Int(i64),
    /// Text value.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl PropertyValue {
    /// Borrow the value as text, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret the value as an integer. Text is parsed.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            PropertyValue::Text(s) => s.trim().parse().ok(),
            PropertyValue::Bytes(_) => None,
        }
    }

    /// The value as bytes (text is UTF-8 encoded, integers are rendered).
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PropertyValue::Int(i) => i.to_string().into_bytes(),
            PropertyValue::Text(s) => s.as_bytes().to_vec(),
            PropertyValue::Bytes(b) => b.clone(),
        }
    }

    /// Returns true for empty text or empty bytes.
    pub fn is_empty(&self) -> bool {
        match self {
            PropertyValue::Int(_) => false,
            PropertyValue::Text(s) => s.is_empty(),
            PropertyValue::Bytes(b) => b.is_empty(),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(i) => write!(f, "{i}"),
            PropertyValue::Text(s) => f.write_str(s),
            PropertyValue::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Text(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Int(i)
    }
}

impl From<u32> for PropertyValue {
    fn from(i: u32) -> Self {
        PropertyValue::Int(i64::from(i))
    }
}

impl From<Vec<u8>> for PropertyValue {
    fn from(b: Vec<u8>) -> Self {
        PropertyValue::Bytes(b)
    }
}

/// Ordered property map.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// A vertex as returned by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexRecord {
    /// Engine id.
    pub id: ElementId,
    /// Type tag.
    pub label: String,
    /// All properties.
    pub properties: PropertyMap,
}

/// An edge as returned by the engine.
///
/// `out_vertex` is the tail (source), `in_vertex` the head (target).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Engine id.
    pub id: ElementId,
    /// Relation type.
    pub label: String,
    /// Source vertex.
    pub out_vertex: ElementId,
    /// Target vertex.
    pub in_vertex: ElementId,
    /// All properties.
    pub properties: PropertyMap,
}

/// Edge direction relative to a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Edges whose head is the vertex.
    In,
    /// Edges whose tail is the vertex.
    Out,
}

impl Direction {
    /// `In` when `inbound` is true, `Out` otherwise.
    pub fn inbound(inbound: bool) -> Self {
        if inbound { Direction::In } else { Direction::Out }
    }
}

/// Vertex filter: optional label plus property equality.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexQuery {
    /// Required label.
    pub label: Option<String>,
    /// Required property values.
    pub properties: PropertyMap,
}

impl VertexQuery {
    /// Match every vertex.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Require a property value.
    pub fn has(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Returns true if the record satisfies this query.
    pub fn matches(&self, vertex: &VertexRecord) -> bool {
        label_matches(self.label.as_deref(), &vertex.label)
            && properties_match(&self.properties, &vertex.properties)
    }
}

/// Edge filter: optional label plus property equality.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeQuery {
    /// Required label.
    pub label: Option<String>,
    /// Required property values.
    pub properties: PropertyMap,
}

impl EdgeQuery {
    /// Match every edge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Require a property value.
    pub fn has(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Returns true if the record satisfies this query.
    pub fn matches(&self, edge: &EdgeRecord) -> bool {
        label_matches(self.label.as_deref(), &edge.label)
            && properties_match(&self.properties, &edge.properties)
    }
}

fn label_matches(wanted: Option<&str>, actual: &str) -> bool {
    wanted.is_none_or(|l| l == actual)
}

fn properties_match(wanted: &PropertyMap, actual: &PropertyMap) -> bool {
    wanted
        .iter()
        .all(|(k, v)| actual.get(k).is_some_and(|a| a == v))
}

/// An edge to create together with a new vertex (tail = the new vertex).
#[derive(Debug, Clone)]
pub struct NewEdge {
    /// Head vertex.
    pub to: ElementId,
    /// Relation type.
    pub label: String,
    /// Edge properties.
    pub properties: PropertyMap,
}

/// A vertex to create.
#[derive(Debug, Clone)]
pub struct NewVertex {
    /// Type tag.
    pub label: String,
    /// Initial properties.
    pub properties: PropertyMap,
    /// Outbound edges created atomically with the vertex.
    pub out_edges: Vec<NewEdge>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_value_conversions() {
        assert_eq!(PropertyValue::from("42").as_int(), Some(42));
        assert_eq!(PropertyValue::from(7i64).to_bytes(), b"7");
        assert_eq!(PropertyValue::from(vec![1u8, 2]).as_str(), None);
        assert!(PropertyValue::from("").is_empty());
    }

    #[test]
    fn test_vertex_query_matches() {
        let mut properties = PropertyMap::new();
        properties.insert("name".into(), "a".into());
        let record = VertexRecord {
            id: 1,
            label: "vertex".into(),
            properties,
        };

        assert!(VertexQuery::new().matches(&record));
        assert!(VertexQuery::new().label("vertex").has("name", "a").matches(&record));
        assert!(!VertexQuery::new().label("group").matches(&record));
        assert!(!VertexQuery::new().has("name", "b").matches(&record));
    }
}
