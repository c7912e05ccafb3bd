//! Typed views over graph engine results.
//!
//! [`Vertex`] and [`Edge`] wrap the raw records and translate every
//! filesystem-level mutation (create, rename, move, link, ...) into engine
//! calls. They hold no state beyond the property map they were fetched with.

mod edge;
mod vertex;

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::graph::{ElementId, GraphError, GraphResult, PropertyMap, PropertyValue};

pub use edge::Edge;
pub use vertex::{Vertex, VertexDraft};

/// Well-known property keys.
pub mod keys {
    pub const NAME: &str = "name";
    pub const UUID: &str = "uuid";
    pub const NAMESPACE: &str = "namespace";
    pub const CREATED: &str = "created";
    pub const MODIFIED: &str = "modified";
    pub const MODE: &str = "mode";
    pub const OWNER: &str = "owner";
    pub const GROUP: &str = "group";
    pub const TYPE: &str = "type";
    pub const IN_LABEL: &str = "in_label";
    pub const IN_NAME: &str = "in_name";
}

const BASE64_PREFIX: &str = "base64:";

/// Common accessors for vertices and edges.
pub trait Element {
    fn id(&self) -> ElementId;
    fn label(&self) -> &str;
    fn properties(&self) -> &PropertyMap;

    fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties().get(key)
    }

    fn has_property(&self, key: &str) -> bool {
        self.properties().contains_key(key)
    }

    fn name(&self) -> Option<&str> {
        self.property(keys::NAME).and_then(PropertyValue::as_str)
    }

    fn uuid(&self) -> Option<&str> {
        self.property(keys::UUID).and_then(PropertyValue::as_str)
    }

    fn int_property(&self, key: &str) -> Option<i64> {
        self.property(key).and_then(PropertyValue::as_int)
    }
}

/// How byte content is stored in a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropertyEncoding {
    /// Stored as text when valid UTF-8, raw bytes otherwise.
    #[default]
    Plain,
    /// Stored as `"base64:<payload>"` text.
    Base64,
}

impl PropertyEncoding {
    /// Encode bytes for storage.
    pub fn encode(self, value: &[u8]) -> PropertyValue {
        match self {
            PropertyEncoding::Plain => match std::str::from_utf8(value) {
                Ok(text) => PropertyValue::Text(text.to_string()),
                Err(_) => PropertyValue::Bytes(value.to_vec()),
            },
            PropertyEncoding::Base64 => {
                PropertyValue::Text(format!("{BASE64_PREFIX}{}", STANDARD.encode(value)))
            }
        }
    }

    /// Decode a stored value. Base64 only applies to prefixed text; anything
    /// else is returned as its raw bytes.
    pub fn decode(self, value: &PropertyValue) -> GraphResult<Vec<u8>> {
        match (self, value) {
            (PropertyEncoding::Base64, PropertyValue::Text(text)) => {
                match text.strip_prefix(BASE64_PREFIX) {
                    Some(payload) => STANDARD
                        .decode(payload)
                        .map_err(|e| GraphError::invalid(format!("bad base64 content: {e}"))),
                    None => Ok(text.as_bytes().to_vec()),
                }
            }
            _ => Ok(value.to_bytes()),
        }
    }
}

/// Seconds since the Unix epoch.
pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_encoding() {
        let stored = PropertyEncoding::Base64.encode(b"hello");
        assert_eq!(stored, PropertyValue::from("base64:aGVsbG8="));
        assert_eq!(PropertyEncoding::Base64.decode(&stored).unwrap(), b"hello");

        // Unprefixed text passes through.
        let plain = PropertyValue::from("raw");
        assert_eq!(PropertyEncoding::Base64.decode(&plain).unwrap(), b"raw");

        let bad = PropertyValue::from("base64:***");
        assert!(PropertyEncoding::Base64.decode(&bad).is_err());
    }

    #[test]
    fn test_plain_encoding() {
        assert_eq!(PropertyEncoding::Plain.encode(b"abc"), PropertyValue::from("abc"));
        assert_eq!(
            PropertyEncoding::Plain.encode(&[0xff, 0xfe]),
            PropertyValue::Bytes(vec![0xff, 0xfe])
        );
        // Plain never interprets the prefix.
        let stored = PropertyValue::from("base64:aGVsbG8=");
        assert_eq!(PropertyEncoding::Plain.decode(&stored).unwrap(), b"base64:aGVsbG8=");
    }
}
