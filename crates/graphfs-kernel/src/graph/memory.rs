//! In-memory property graph.
//!
//! Vertices and edges share one id sequence, so an id names exactly one
//! element. Iteration is in ascending id order, which keeps listings
//! deterministic for a fixed graph state.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::error::{GraphError, GraphResult};
use super::types::{
    Direction, EdgeQuery, EdgeRecord, ElementId, NewVertex, PropertyMap, PropertyValue,
    VertexQuery, VertexRecord,
};
use super::GraphEngine;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct GraphState {
    next_id: ElementId,
    vertices: BTreeMap<ElementId, VertexRecord>,
    edges: BTreeMap<ElementId, EdgeRecord>,
}

impl GraphState {
    fn allocate(&mut self) -> ElementId {
        self.next_id += 1;
        self.next_id
    }

    fn insert_edge(
        &mut self,
        from: ElementId,
        to: ElementId,
        label: &str,
        properties: PropertyMap,
    ) -> GraphResult<EdgeRecord> {
        if !self.vertices.contains_key(&from) {
            return Err(GraphError::invalid(format!("edge source {from} does not exist")));
        }
        if !self.vertices.contains_key(&to) {
            return Err(GraphError::invalid(format!("edge target {to} does not exist")));
        }
        if label.is_empty() {
            return Err(GraphError::invalid("edge label must not be empty"));
        }
        let id = self.allocate();
        let edge = EdgeRecord {
            id,
            label: label.to_string(),
            out_vertex: from,
            in_vertex: to,
            properties,
        };
        self.edges.insert(id, edge.clone());
        Ok(edge)
    }

    fn properties_mut(&mut self, id: ElementId) -> GraphResult<&mut PropertyMap> {
        if let Some(v) = self.vertices.get_mut(&id) {
            return Ok(&mut v.properties);
        }
        self.edges
            .get_mut(&id)
            .map(|e| &mut e.properties)
            .ok_or_else(|| GraphError::not_found(format!("element {id}")))
    }
}

/// In-process property graph.
///
/// Thread-safe via an internal `RwLock` held only for the duration of one
/// call. Can be persisted to and restored from a JSON snapshot.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    state: RwLock<GraphState>,
}

impl MemoryGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a graph from a snapshot file. A missing file yields an empty graph.
    pub fn open(path: &Path) -> GraphResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let bytes = std::fs::read(path)?;
        let state: GraphState = serde_json::from_slice(&bytes)?;
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Write a snapshot of the current graph to `path`.
    pub fn save(&self, path: &Path) -> GraphResult<()> {
        let json = {
            let state = self.state.read();
            serde_json::to_vec_pretty(&*state)?
        };
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.state.read().vertices.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.state.read().edges.len()
    }
}

#[async_trait]
impl GraphEngine for MemoryGraph {
    async fn vertex(&self, id: ElementId) -> GraphResult<Option<VertexRecord>> {
        Ok(self.state.read().vertices.get(&id).cloned())
    }

    async fn find_vertices(&self, query: &VertexQuery) -> GraphResult<Vec<VertexRecord>> {
        let state = self.state.read();
        Ok(state
            .vertices
            .values()
            .filter(|v| query.matches(v))
            .cloned()
            .collect())
    }

    async fn vertices_without_out_edge(
        &self,
        label: &str,
        query: &VertexQuery,
    ) -> GraphResult<Vec<VertexRecord>> {
        let state = self.state.read();
        Ok(state
            .vertices
            .values()
            .filter(|v| query.matches(v))
            .filter(|v| {
                !state
                    .edges
                    .values()
                    .any(|e| e.out_vertex == v.id && e.label == label)
            })
            .cloned()
            .collect())
    }

    async fn edges(
        &self,
        vertex: ElementId,
        direction: Direction,
        query: &EdgeQuery,
    ) -> GraphResult<Vec<EdgeRecord>> {
        let state = self.state.read();
        Ok(state
            .edges
            .values()
            .filter(|e| match direction {
                Direction::In => e.in_vertex == vertex,
                Direction::Out => e.out_vertex == vertex,
            })
            .filter(|e| query.matches(e))
            .cloned()
            .collect())
    }

    async fn edge(&self, id: ElementId) -> GraphResult<Option<EdgeRecord>> {
        Ok(self.state.read().edges.get(&id).cloned())
    }

    async fn add_vertex(&self, vertex: NewVertex) -> GraphResult<VertexRecord> {
        if vertex.label.is_empty() {
            return Err(GraphError::invalid("vertex label must not be empty"));
        }
        let mut state = self.state.write();
        // Validate edge targets before allocating so a bad request leaves no trace.
        if let Some(missing) = vertex
            .out_edges
            .iter()
            .find(|e| !state.vertices.contains_key(&e.to))
        {
            return Err(GraphError::invalid(format!(
                "edge target {} does not exist",
                missing.to
            )));
        }

        let id = state.allocate();
        let record = VertexRecord {
            id,
            label: vertex.label,
            properties: vertex.properties,
        };
        state.vertices.insert(id, record.clone());
        for edge in vertex.out_edges {
            state.insert_edge(id, edge.to, &edge.label, edge.properties)?;
        }
        Ok(record)
    }

    async fn add_edge(
        &self,
        from: ElementId,
        to: ElementId,
        label: &str,
        properties: PropertyMap,
    ) -> GraphResult<EdgeRecord> {
        self.state.write().insert_edge(from, to, label, properties)
    }

    async fn drop_edge(&self, id: ElementId) -> GraphResult<()> {
        self.state
            .write()
            .edges
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| GraphError::not_found(format!("edge {id}")))
    }

    async fn drop_vertex(&self, id: ElementId) -> GraphResult<()> {
        let mut state = self.state.write();
        if state.vertices.remove(&id).is_none() {
            return Err(GraphError::not_found(format!("vertex {id}")));
        }
        state
            .edges
            .retain(|_, e| e.out_vertex != id && e.in_vertex != id);
        Ok(())
    }

    async fn set_property(
        &self,
        id: ElementId,
        key: &str,
        value: PropertyValue,
    ) -> GraphResult<()> {
        let mut state = self.state.write();
        state.properties_mut(id)?.insert(key.to_string(), value);
        Ok(())
    }

    async fn unset_property(&self, id: ElementId, key: &str) -> GraphResult<()> {
        let mut state = self.state.write();
        state.properties_mut(id)?.remove(key);
        Ok(())
    }
}
