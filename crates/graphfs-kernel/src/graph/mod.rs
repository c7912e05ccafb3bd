//! Graph engine contract.
//!
//! The filesystem never talks to storage directly. Everything goes through
//! [`GraphEngine`], a small set of per-call atomic primitives:
//!
//! - fetch vertex by id, find vertices by label + property equality
//! - list inbound/outbound edges filtered by label + property
//! - vertices lacking an outbound edge of some label (root listing)
//! - create/drop vertex and edge, set/unset property
//!
//! No multi-call transaction is assumed. [`MemoryGraph`] is the in-process
//! engine used by tests and the command-line front end.

mod error;
mod memory;
mod types;

use async_trait::async_trait;

pub use error::{GraphError, GraphResult};
pub use memory::MemoryGraph;
pub use types::{
    Direction, EdgeQuery, EdgeRecord, ElementId, NewEdge, NewVertex, PropertyMap, PropertyValue,
    VertexQuery, VertexRecord,
};

/// Property-graph storage contract.
///
/// Each call is individually atomic. Implementations return results in a
/// stable order for a fixed graph state.
#[async_trait]
pub trait GraphEngine: Send + Sync {
    /// Fetch a vertex by engine id.
    async fn vertex(&self, id: ElementId) -> GraphResult<Option<VertexRecord>>;

    /// All vertices matching the query.
    async fn find_vertices(&self, query: &VertexQuery) -> GraphResult<Vec<VertexRecord>>;

    /// Vertices matching `query` that have no outbound edge labelled `label`.
    async fn vertices_without_out_edge(
        &self,
        label: &str,
        query: &VertexQuery,
    ) -> GraphResult<Vec<VertexRecord>>;

    /// Edges incident to `vertex` in `direction` that match `query`.
    ///
    /// A missing vertex has no edges.
    async fn edges(
        &self,
        vertex: ElementId,
        direction: Direction,
        query: &EdgeQuery,
    ) -> GraphResult<Vec<EdgeRecord>>;

    /// Fetch an edge by engine id.
    async fn edge(&self, id: ElementId) -> GraphResult<Option<EdgeRecord>>;

    /// Create a vertex and its outbound edges in one step.
    async fn add_vertex(&self, vertex: NewVertex) -> GraphResult<VertexRecord>;

    /// Create an edge `from -> to`.
    async fn add_edge(
        &self,
        from: ElementId,
        to: ElementId,
        label: &str,
        properties: PropertyMap,
    ) -> GraphResult<EdgeRecord>;

    /// Drop an edge. Dropping a missing edge is `NotFound`.
    async fn drop_edge(&self, id: ElementId) -> GraphResult<()>;

    /// Drop a vertex together with every incident edge.
    async fn drop_vertex(&self, id: ElementId) -> GraphResult<()>;

    /// Set a property on a vertex or edge.
    async fn set_property(
        &self,
        id: ElementId,
        key: &str,
        value: PropertyValue,
    ) -> GraphResult<()>;

    /// Remove a property from a vertex or edge. Removing an absent key is a no-op.
    async fn unset_property(&self, id: ElementId, key: &str) -> GraphResult<()>;
}
