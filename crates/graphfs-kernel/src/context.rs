//! Shared handle passed to every resolver and node call.

use std::fmt;
use std::sync::Arc;

use crate::config::{match_label, CompiledLabelRule, ConfigError, EntryKind, GraphFsConfig};
use crate::graph::GraphEngine;
use crate::ident::IdentifierCodec;

/// Graph engine handle plus the configuration derived state.
///
/// Cheap to clone; there is no process-wide instance.
#[derive(Clone)]
pub struct GraphContext {
    engine: Arc<dyn GraphEngine>,
    config: Arc<GraphFsConfig>,
    codec: Arc<IdentifierCodec>,
    label_rules: Arc<[CompiledLabelRule]>,
}

impl GraphContext {
    /// Validate `config` and bind it to `engine`.
    pub fn new(engine: Arc<dyn GraphEngine>, config: GraphFsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let codec = IdentifierCodec::new(&config)?;
        let label_rules = config.compiled_label_rules()?;
        Ok(Self {
            engine,
            config: Arc::new(config),
            codec: Arc::new(codec),
            label_rules: label_rules.into(),
        })
    }

    pub fn engine(&self) -> &dyn GraphEngine {
        self.engine.as_ref()
    }

    pub fn config(&self) -> &GraphFsConfig {
        &self.config
    }

    pub fn codec(&self) -> &IdentifierCodec {
        &self.codec
    }

    /// Label for a new entry named `name`, from the label rules.
    pub fn rule_label(&self, kind: EntryKind, name: &str) -> Option<&str> {
        match_label(&self.label_rules, kind, name)
    }
}

impl fmt::Debug for GraphContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphContext")
            .field("config", &self.config)
            .field("label_rules", &self.label_rules.len())
            .finish_non_exhaustive()
    }
}
