//! Edge view.

use crate::context::GraphContext;
use crate::graph::{EdgeRecord, ElementId, GraphResult, PropertyMap};

use super::{Element, Vertex};

/// A directed edge: `out_vertex -> in_vertex`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    record: EdgeRecord,
}

impl Edge {
    pub fn from_record(record: EdgeRecord) -> Self {
        Self { record }
    }

    /// Tail (source) vertex id.
    pub fn out_vertex_id(&self) -> ElementId {
        self.record.out_vertex
    }

    /// Head (target) vertex id.
    pub fn in_vertex_id(&self) -> ElementId {
        self.record.in_vertex
    }

    /// Entry name: `name@label`, or the bare label.
    pub fn identifier(&self, ctx: &GraphContext) -> String {
        ctx.codec().format_edge(self.name(), self.label())
    }

    /// The vertex at one end. `head` picks the in-vertex.
    pub async fn vertex(&self, ctx: &GraphContext, head: bool) -> GraphResult<Option<Vertex>> {
        let id = if head {
            self.record.in_vertex
        } else {
            self.record.out_vertex
        };
        Ok(ctx.engine().vertex(id).await?.map(Vertex::from_record))
    }

    pub async fn delete(&self, ctx: &GraphContext) -> GraphResult<()> {
        ctx.engine().drop_edge(self.record.id).await
    }
}

impl Element for Edge {
    fn id(&self) -> ElementId {
        self.record.id
    }

    fn label(&self) -> &str {
        &self.record.label
    }

    fn properties(&self) -> &PropertyMap {
        &self.record.properties
    }
}
