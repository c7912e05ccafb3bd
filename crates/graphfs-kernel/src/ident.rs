//! Structured identifiers.
//!
//! A directory entry names a vertex with one of these shapes, tried most
//! specific first (`.` and `@` are the configured separators):
//!
//! | shape | example |
//! |---|---|
//! | `name.type@label@uuid` | `notes.txt@doc@6f1c...` |
//! | `name@label@uuid` | `notes@doc@6f1c...` |
//! | `name.type@uuid` | `notes.txt@6f1c...` |
//! | `name@uuid` | `notes@6f1c...` |
//! | `name.type` | `notes.txt` |
//! | `uuid` | `6f1c...` |
//! | `name` | anything else |
//!
//! When a `.type` suffix matched, the reported name keeps it.

use regex::Regex;
use uuid::Uuid;

use crate::config::{ConfigError, GraphFsConfig};

const UUID_PATTERN: &str = "[0-9a-fA-F]{8}-(?:[0-9a-fA-F]{4}-){3}[0-9a-fA-F]{12}";

/// Parsed vertex identifier. Parsing never fails: unstructured input is a bare name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identifier {
    pub name: Option<String>,
    /// Extension after the type separator.
    pub kind: Option<String>,
    pub label: Option<String>,
    pub uuid: Option<Uuid>,
}

impl Identifier {
    /// A bare-name identifier.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// Parsed edge identifier: `name@label`, or a bare label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeIdentifier {
    pub name: Option<String>,
    pub label: String,
}

/// Parses and formats identifiers with the configured separators and labels.
#[derive(Debug, Clone)]
pub struct IdentifierCodec {
    name_type_label_uuid: Regex,
    name_label_uuid: Regex,
    name_type_uuid: Regex,
    name_uuid: Regex,
    name_type: Regex,
    uuid: Regex,
    edge: Regex,
    type_separator: char,
    label_separator: char,
    vertex_label: String,
    folder_label: String,
}

impl IdentifierCodec {
    /// Build a codec from config.
    pub fn new(config: &GraphFsConfig) -> Result<Self, ConfigError> {
        let t = regex::escape(&config.type_separator.to_string());
        let l = regex::escape(&config.label_separator.to_string());
        let u = UUID_PATTERN;
        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|source| ConfigError::Pattern { pattern, source })
        };
        Ok(Self {
            name_type_label_uuid: compile(format!("^(.+){t}(.+){l}(.+){l}({u})$"))?,
            name_label_uuid: compile(format!("^(.+){l}(.+){l}({u})$"))?,
            name_type_uuid: compile(format!("^(.+){t}(.+){l}({u})$"))?,
            name_uuid: compile(format!("^(.+){l}({u})$"))?,
            name_type: compile(format!("^(.+){t}(.+)$"))?,
            uuid: compile(format!("^({u})$"))?,
            edge: compile(format!("^(.+){l}(.+)$"))?,
            type_separator: config.type_separator,
            label_separator: config.label_separator,
            vertex_label: config.vertex_label.clone(),
            folder_label: config.folder_label.clone(),
        })
    }

    /// Parse a vertex identifier.
    pub fn parse(&self, id: &str) -> Identifier {
        let group =
            |caps: &regex::Captures<'_>, i: usize| caps.get(i).map(|m| m.as_str().to_string());
        let uuid_at = |caps: &regex::Captures<'_>, i: usize| {
            caps.get(i).and_then(|m| Uuid::parse_str(m.as_str()).ok())
        };
        let typed_name = |caps: &regex::Captures<'_>| {
            format!("{}{}{}", &caps[1], self.type_separator, &caps[2])
        };

        if let Some(caps) = self.name_type_label_uuid.captures(id) {
            return Identifier {
                name: Some(typed_name(&caps)),
                kind: group(&caps, 2),
                label: group(&caps, 3),
                uuid: uuid_at(&caps, 4),
            };
        }
        if let Some(caps) = self.name_label_uuid.captures(id) {
            return Identifier {
                name: group(&caps, 1),
                kind: None,
                label: group(&caps, 2),
                uuid: uuid_at(&caps, 3),
            };
        }
        if let Some(caps) = self.name_type_uuid.captures(id) {
            return Identifier {
                name: Some(typed_name(&caps)),
                kind: group(&caps, 2),
                label: None,
                uuid: uuid_at(&caps, 3),
            };
        }
        if let Some(caps) = self.name_uuid.captures(id) {
            return Identifier {
                name: group(&caps, 1),
                kind: None,
                label: None,
                uuid: uuid_at(&caps, 2),
            };
        }
        if let Some(caps) = self.name_type.captures(id) {
            return Identifier {
                name: Some(typed_name(&caps)),
                kind: group(&caps, 2),
                label: None,
                uuid: None,
            };
        }
        if let Some(caps) = self.uuid.captures(id) {
            return Identifier {
                uuid: uuid_at(&caps, 1),
                ..Default::default()
            };
        }
        Identifier::named(id)
    }

    /// Format a vertex as a directory-entry name.
    ///
    /// `short` collapses the default vertex and folder labels to the bare name.
    pub fn format(
        &self,
        name: Option<&str>,
        label: &str,
        uuid: Option<&str>,
        short: bool,
    ) -> String {
        let name = name.map(clean_name).unwrap_or_default();
        let Some(uuid) = uuid.filter(|u| !u.is_empty()) else {
            return name;
        };
        if name.is_empty() {
            return uuid.to_string();
        }
        let sep = self.label_separator;
        if short && (label == self.vertex_label || label == self.folder_label) {
            name
        } else if label == self.vertex_label {
            format!("{name}{sep}{uuid}")
        } else {
            format!("{name}{sep}{label}{sep}{uuid}")
        }
    }

    /// Parse an edge identifier. The label is everything after the last separator.
    pub fn parse_edge(&self, id: &str) -> EdgeIdentifier {
        match self.edge.captures(id) {
            Some(caps) => EdgeIdentifier {
                name: Some(caps[1].to_string()),
                label: caps[2].to_string(),
            },
            None => EdgeIdentifier {
                name: None,
                label: id.to_string(),
            },
        }
    }

    /// Format an edge as a directory-entry name.
    pub fn format_edge(&self, name: Option<&str>, label: &str) -> String {
        match name.filter(|n| !n.is_empty()) {
            Some(name) => format!("{name}{}{label}", self.label_separator),
            None => label.to_string(),
        }
    }
}

/// Strip surrounding whitespace and any control characters.
fn clean_name(name: &str) -> String {
    name.trim().chars().filter(|c| !c.is_control()).collect()
}
