//! Filesystem configuration.
//!
//! Every field has a default, so an empty RON document `()` is a valid
//! configuration:
//!
//! ```ron
//! (
//!     fs_ns: "gfs1",
//!     folder_label: "group",
//!     labels: [
//!         (label: "note", pattern: r"\.md$", kind: file),
//!     ],
//! )
//! ```

use std::path::Path;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::EnumString;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid RON.
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// A label rule carries an invalid regex.
    #[error("invalid label pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A value is structurally unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which kind of entry a label rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum EntryKind {
    /// Leaf vertex.
    File,
    /// Folder vertex.
    #[strum(serialize = "folder", serialize = "dir", serialize = "directory")]
    Folder,
}

impl EntryKind {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }
}

/// Assigns a label to newly created entries whose name matches `pattern`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRule {
    /// Label to apply.
    pub label: String,
    /// Regex tested against the new entry's name.
    pub pattern: String,
    /// Entry kind the rule applies to.
    pub kind: EntryKind,
}

/// Filesystem configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphFsConfig {
    /// Prefix of absolute symlink targets.
    pub mount_point: Option<String>,
    /// Host registration id.
    pub client_id: String,
    /// Namespace tag written on every created vertex.
    pub fs_ns: String,
    /// Identifier of the vertex acting as filesystem root.
    pub fs_root: Option<String>,
    /// Create `fs_root` at bootstrap when missing.
    pub fs_root_init: bool,

    pub folder_label: String,
    pub vertex_label: String,
    pub in_label: String,
    pub in_name: String,
    pub self_label: String,
    pub self_name: String,
    pub register_label: String,

    /// Flat-namespace token.
    pub vertex_folder: String,
    pub in_edge_folder: String,
    pub out_edge_folder: String,

    pub type_separator: char,
    pub label_separator: char,

    /// Property holding file content.
    pub data_property: String,

    pub default_uid: u32,
    pub default_gid: u32,
    pub default_mode: u32,

    /// Reject every mutating operation.
    pub read_only: bool,
    pub caching: bool,
    pub cache_expiry_secs: u64,

    /// Label rules, first match wins.
    pub labels: Vec<LabelRule>,
}

impl Default for GraphFsConfig {
    fn default() -> Self {
        Self {
            mount_point: None,
            client_id: "0010".into(),
            fs_ns: "gfs1".into(),
            fs_root: None,
            fs_root_init: false,
            folder_label: "group".into(),
            vertex_label: "vertex".into(),
            in_label: "ref".into(),
            in_name: "in0".into(),
            self_label: "self".into(),
            self_name: "self0".into(),
            register_label: "register".into(),
            vertex_folder: ".V".into(),
            in_edge_folder: "EI".into(),
            out_edge_folder: "EO".into(),
            type_separator: '.',
            label_separator: '@',
            data_property: "data".into(),
            default_uid: 1001,
            default_gid: 1001,
            default_mode: 0o777,
            read_only: false,
            caching: true,
            cache_expiry_secs: 60,
            labels: Vec::new(),
        }
    }
}

impl GraphFsConfig {
    /// Load and validate a RON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    /// Parse and validate a RON document.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: GraphFsConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check tokens and compile label rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tokens = [
            ("folder_label", &self.folder_label),
            ("vertex_label", &self.vertex_label),
            ("in_label", &self.in_label),
            ("self_label", &self.self_label),
            ("vertex_folder", &self.vertex_folder),
            ("in_edge_folder", &self.in_edge_folder),
            ("out_edge_folder", &self.out_edge_folder),
            ("data_property", &self.data_property),
        ];
        for (field, value) in tokens {
            if value.is_empty() {
                return Err(ConfigError::Invalid(format!("{field} must not be empty")));
            }
            if value.contains('/') {
                return Err(ConfigError::Invalid(format!("{field} must not contain '/'")));
            }
        }
        if self.in_edge_folder == self.out_edge_folder {
            return Err(ConfigError::Invalid(
                "in_edge_folder and out_edge_folder must differ".into(),
            ));
        }
        if self.type_separator == self.label_separator {
            return Err(ConfigError::Invalid(
                "type_separator and label_separator must differ".into(),
            ));
        }
        self.compiled_label_rules()?;
        Ok(())
    }

    /// Compile the label rules.
    pub fn compiled_label_rules(&self) -> Result<Vec<CompiledLabelRule>, ConfigError> {
        self.labels
            .iter()
            .map(|rule| {
                let regex = Regex::new(&rule.pattern).map_err(|source| ConfigError::Pattern {
                    pattern: rule.pattern.clone(),
                    source,
                })?;
                Ok(CompiledLabelRule {
                    label: rule.label.clone(),
                    kind: rule.kind,
                    regex,
                })
            })
            .collect()
    }

    /// Mount point without a trailing slash, or empty.
    pub fn mount_prefix(&self) -> &str {
        self.mount_point
            .as_deref()
            .map(|m| m.trim_end_matches('/'))
            .unwrap_or("")
    }
}

/// A label rule with its pattern compiled.
#[derive(Debug, Clone)]
pub struct CompiledLabelRule {
    pub label: String,
    pub kind: EntryKind,
    pub regex: Regex,
}

/// First rule of `kind` whose pattern matches `name`.
pub fn match_label<'a>(
    rules: &'a [CompiledLabelRule],
    kind: EntryKind,
    name: &str,
) -> Option<&'a str> {
    rules
        .iter()
        .find(|r| r.kind == kind && r.regex.is_match(name))
        .map(|r| r.label.as_str())
}
