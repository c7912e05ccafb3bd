//! Vertex view and vertex creation.

use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use crate::context::GraphContext;
use crate::graph::{
    Direction, EdgeQuery, ElementId, GraphError, GraphResult, NewEdge, NewVertex, PropertyMap,
    PropertyValue, VertexQuery, VertexRecord,
};

use super::{keys, now_secs, Edge, Element, PropertyEncoding};

/// Upper bound on containment depth walked by [`Vertex::ancestry`].
const MAX_ANCESTRY_DEPTH: usize = 256;

/// A vertex fetched from the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    record: VertexRecord,
}

impl Vertex {
    pub fn from_record(record: VertexRecord) -> Self {
        Self { record }
    }

    pub fn into_record(self) -> VertexRecord {
        self.record
    }

    // ========================================================================
    // Classification
    // ========================================================================

    /// Folder-kind: carries the folder label, or was created as a folder
    /// under a custom label.
    pub fn is_folder(&self, ctx: &GraphContext) -> bool {
        let folder_label = ctx.config().folder_label.as_str();
        self.label() == folder_label
            || self
                .property(keys::TYPE)
                .and_then(PropertyValue::as_str)
                .is_some_and(|t| t == folder_label)
    }

    pub fn is_file(&self, ctx: &GraphContext) -> bool {
        !self.is_folder(ctx)
    }

    /// Directory-entry name for this vertex.
    pub fn identifier(&self, ctx: &GraphContext, short: bool) -> String {
        ctx.codec()
            .format(self.name(), self.label(), self.uuid(), short)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Load a vertex from a structured identifier.
    ///
    /// Only identifiers carrying a uuid address a vertex directly. An explicit
    /// non-default label narrows the lookup.
    pub async fn load(ctx: &GraphContext, identifier: &str) -> GraphResult<Option<Vertex>> {
        let parsed = ctx.codec().parse(identifier);
        let Some(uuid) = parsed.uuid else {
            return Ok(None);
        };
        let label = parsed
            .label
            .filter(|l| *l != ctx.config().vertex_label);
        Self::find_by_uuid(ctx, &uuid.to_string(), label.as_deref()).await
    }

    /// Find a vertex of this namespace by uuid.
    pub async fn find_by_uuid(
        ctx: &GraphContext,
        uuid: &str,
        label: Option<&str>,
    ) -> GraphResult<Option<Vertex>> {
        let mut query = VertexQuery::new()
            .has(keys::UUID, uuid)
            .has(keys::NAMESPACE, ctx.config().fs_ns.as_str());
        if let Some(label) = label {
            query = query.label(label);
        }
        let found = ctx.engine().find_vertices(&query).await?;
        Ok(found.into_iter().next().map(Vertex::from_record))
    }

    /// Every vertex of this namespace.
    pub async fn all(ctx: &GraphContext) -> GraphResult<Vec<Vertex>> {
        let query = VertexQuery::new().has(keys::NAMESPACE, ctx.config().fs_ns.as_str());
        let found = ctx.engine().find_vertices(&query).await?;
        Ok(found.into_iter().map(Vertex::from_record).collect())
    }

    /// Re-fetch this vertex.
    pub async fn refresh(&self, ctx: &GraphContext) -> GraphResult<Vertex> {
        ctx.engine()
            .vertex(self.id())
            .await?
            .map(Vertex::from_record)
            .ok_or_else(|| GraphError::not_found(format!("vertex {}", self.id())))
    }

    // ========================================================================
    // Containment
    // ========================================================================

    /// The containment parent, or `None` at root level.
    pub async fn parent(&self, ctx: &GraphContext) -> GraphResult<Option<Vertex>> {
        let query = EdgeQuery::new().label(ctx.config().in_label.as_str());
        let edges = ctx.engine().edges(self.id(), Direction::Out, &query).await?;
        match edges.first() {
            Some(edge) => Ok(ctx.engine().vertex(edge.in_vertex).await?.map(Vertex::from_record)),
            None => Ok(None),
        }
    }

    /// Containment children.
    pub async fn children(&self, ctx: &GraphContext) -> GraphResult<Vec<Vertex>> {
        let query = EdgeQuery::new().label(ctx.config().in_label.as_str());
        let edges = ctx.engine().edges(self.id(), Direction::In, &query).await?;
        let mut children = Vec::with_capacity(edges.len());
        for edge in edges {
            if let Some(child) = ctx.engine().vertex(edge.out_vertex).await? {
                children.push(Vertex::from_record(child));
            }
        }
        Ok(children)
    }

    /// Entries of a folder: children of `folder`, or the parentless vertices
    /// of this namespace when `folder` is `None`.
    pub async fn entries(ctx: &GraphContext, folder: Option<&Vertex>) -> GraphResult<Vec<Vertex>> {
        match folder {
            Some(folder) => folder.children(ctx).await,
            None => {
                let query = VertexQuery::new().has(keys::NAMESPACE, ctx.config().fs_ns.as_str());
                let roots = ctx
                    .engine()
                    .vertices_without_out_edge(&ctx.config().in_label, &query)
                    .await?;
                // Host registration records share the namespace but are not entries.
                Ok(roots
                    .into_iter()
                    .filter(|v| v.label != ctx.config().register_label)
                    .map(Vertex::from_record)
                    .collect())
            }
        }
    }

    /// Chain of containment ancestors from the top down, ending with `self`.
    ///
    /// The walk stops below `stop_at` (exclusive), at a vertex without
    /// parent, on a repeated vertex or after a fixed depth, whichever comes
    /// first.
    pub async fn ancestry(
        &self,
        ctx: &GraphContext,
        stop_at: Option<ElementId>,
    ) -> GraphResult<Vec<Vertex>> {
        if stop_at == Some(self.id()) {
            return Ok(Vec::new());
        }
        let mut chain = vec![self.clone()];
        let mut visited = HashSet::from([self.id()]);
        let mut current = self.clone();
        while chain.len() < MAX_ANCESTRY_DEPTH {
            let Some(parent) = current.parent(ctx).await? else {
                break;
            };
            if Some(parent.id()) == stop_at || !visited.insert(parent.id()) {
                break;
            }
            chain.push(parent.clone());
            current = parent;
        }
        chain.reverse();
        Ok(chain)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Set `name`; returns the committed vertex.
    pub async fn rename(&self, ctx: &GraphContext, name: &str) -> GraphResult<Vertex> {
        if name.is_empty() {
            return Err(GraphError::invalid("vertex name must not be empty"));
        }
        let engine = ctx.engine();
        engine.set_property(self.id(), keys::NAME, name.into()).await?;
        engine
            .set_property(self.id(), keys::MODIFIED, now_secs().into())
            .await?;
        self.refresh(ctx).await
    }

    /// Replace the containment edge.
    ///
    /// The old edge is dropped before the new one is added, so a failure in
    /// between leaves the vertex parentless rather than doubly parented.
    /// `None` leaves it at root level.
    pub async fn move_to(
        &self,
        ctx: &GraphContext,
        parent: Option<&Vertex>,
    ) -> GraphResult<Vertex> {
        let engine = ctx.engine();
        let config = ctx.config();

        if parent.is_some_and(|p| p.id() == self.id()) {
            return Err(GraphError::invalid("cannot move a vertex into itself"));
        }

        let query = EdgeQuery::new().label(config.in_label.as_str());
        for edge in engine.edges(self.id(), Direction::Out, &query).await? {
            match engine.drop_edge(edge.id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }

        if let Some(parent) = parent {
            let mut properties = PropertyMap::new();
            properties.insert(keys::NAME.into(), config.in_name.as_str().into());
            engine
                .add_edge(self.id(), parent.id(), &config.in_label, properties)
                .await?;
        }
        self.refresh(ctx).await
    }

    /// Drop the vertex and its edges.
    pub async fn delete(&self, ctx: &GraphContext) -> GraphResult<()> {
        ctx.engine().drop_vertex(self.id()).await
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Read a property as bytes.
    pub fn read_property(
        &self,
        key: &str,
        encoding: PropertyEncoding,
    ) -> GraphResult<Option<Vec<u8>>> {
        self.property(key).map(|v| encoding.decode(v)).transpose()
    }

    pub async fn set_property(
        &mut self,
        ctx: &GraphContext,
        key: &str,
        value: PropertyValue,
    ) -> GraphResult<()> {
        ctx.engine().set_property(self.id(), key, value.clone()).await?;
        self.record.properties.insert(key.to_string(), value);
        Ok(())
    }

    /// Store bytes in a property.
    pub async fn write_property(
        &mut self,
        ctx: &GraphContext,
        key: &str,
        value: &[u8],
        encoding: PropertyEncoding,
    ) -> GraphResult<()> {
        self.set_property(ctx, key, encoding.encode(value)).await
    }

    pub async fn unset_property(&mut self, ctx: &GraphContext, key: &str) -> GraphResult<()> {
        ctx.engine().unset_property(self.id(), key).await?;
        self.record.properties.remove(key);
        Ok(())
    }

    /// Refresh the `modified` timestamp.
    pub async fn touch(&mut self, ctx: &GraphContext) -> GraphResult<()> {
        self.set_property(ctx, keys::MODIFIED, now_secs().into()).await
    }

    // ========================================================================
    // Edges
    // ========================================================================

    /// Edges in `direction`, optionally filtered by an edge identifier.
    pub async fn edges(
        &self,
        ctx: &GraphContext,
        edge_id: Option<&str>,
        direction: Direction,
    ) -> GraphResult<Vec<Edge>> {
        let mut query = EdgeQuery::new();
        if let Some(edge_id) = edge_id {
            let parsed = ctx.codec().parse_edge(edge_id);
            query = query.label(parsed.label);
            if let Some(name) = parsed.name {
                query = query.has(keys::NAME, name);
            }
        }
        let edges = ctx.engine().edges(self.id(), direction, &query).await?;
        Ok(edges.into_iter().map(Edge::from_record).collect())
    }

    /// First edge matching `edge_id` in `direction`.
    pub async fn edge(
        &self,
        ctx: &GraphContext,
        edge_id: &str,
        direction: Direction,
    ) -> GraphResult<Option<Edge>> {
        Ok(self
            .edges(ctx, Some(edge_id), direction)
            .await?
            .into_iter()
            .next())
    }

    /// Vertex at the far end of the matching edge. `want_in_vertex` picks the
    /// edge head, otherwise the tail.
    pub async fn edge_node(
        &self,
        ctx: &GraphContext,
        edge_id: &str,
        inbound: bool,
        want_in_vertex: bool,
    ) -> GraphResult<Option<Vertex>> {
        match self.edge(ctx, edge_id, Direction::inbound(inbound)).await? {
            Some(edge) => edge.vertex(ctx, want_in_vertex).await,
            None => Ok(None),
        }
    }

    /// Add an edge `self -> target`.
    pub async fn create_link(
        &self,
        ctx: &GraphContext,
        target: &Vertex,
        label: &str,
        name: Option<&str>,
    ) -> GraphResult<Edge> {
        if label.is_empty() {
            return Err(GraphError::invalid("link label must not be empty"));
        }
        let mut properties = PropertyMap::new();
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            properties.insert(keys::NAME.into(), name.into());
        }
        properties.insert(keys::UUID.into(), Uuid::new_v4().to_string().into());
        let edge = ctx
            .engine()
            .add_edge(self.id(), target.id(), label, properties)
            .await?;
        Ok(Edge::from_record(edge))
    }

    /// Drop every edge in `direction` with `label` (and `name`, when given).
    /// Returns the number dropped.
    pub async fn delete_link(
        &self,
        ctx: &GraphContext,
        label: &str,
        name: Option<&str>,
        direction: Direction,
    ) -> GraphResult<usize> {
        let mut query = EdgeQuery::new().label(label);
        if let Some(name) = name {
            query = query.has(keys::NAME, name);
        }
        let edges = ctx.engine().edges(self.id(), direction, &query).await?;
        for edge in &edges {
            ctx.engine().drop_edge(edge.id).await?;
        }
        Ok(edges.len())
    }
}

impl Element for Vertex {
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

/// A vertex about to be created.
#[derive(Debug, Clone)]
pub struct VertexDraft {
    pub name: String,
    pub label: Option<String>,
    pub uuid: Option<Uuid>,
    pub mode: Option<u32>,
    pub owner: Option<u32>,
    pub group: Option<u32>,
}

impl VertexDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            uuid: None,
            mode: None,
            owner: None,
            group: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }

    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn owner(mut self, owner: u32, group: u32) -> Self {
        self.owner = Some(owner);
        self.group = Some(group);
        self
    }

    /// Create a file vertex, contained in `parent` when given.
    pub async fn create(self, ctx: &GraphContext, parent: Option<&Vertex>) -> GraphResult<Vertex> {
        let label = self
            .label
            .clone()
            .unwrap_or_else(|| ctx.config().vertex_label.clone());
        self.commit(ctx, label, parent, PropertyMap::new()).await
    }

    /// Create a folder vertex: folder metadata plus a self edge.
    pub async fn create_folder(
        self,
        ctx: &GraphContext,
        parent: Option<&Vertex>,
    ) -> GraphResult<Vertex> {
        let config = ctx.config();
        let label = self
            .label
            .clone()
            .unwrap_or_else(|| config.folder_label.clone());

        let mut extra = PropertyMap::new();
        extra.insert(keys::TYPE.into(), config.folder_label.as_str().into());
        extra.insert(keys::IN_LABEL.into(), config.in_label.as_str().into());
        extra.insert(keys::IN_NAME.into(), config.in_name.as_str().into());
        let folder = self.commit(ctx, label, parent, extra).await?;

        let mut properties = PropertyMap::new();
        properties.insert(keys::NAME.into(), config.self_name.as_str().into());
        ctx.engine()
            .add_edge(folder.id(), folder.id(), &config.self_label, properties)
            .await?;
        Ok(folder)
    }

    async fn commit(
        self,
        ctx: &GraphContext,
        label: String,
        parent: Option<&Vertex>,
        extra: PropertyMap,
    ) -> GraphResult<Vertex> {
        if self.name.is_empty() {
            return Err(GraphError::invalid("vertex name must not be empty"));
        }
        let config = ctx.config();
        let uuid = self.uuid.unwrap_or_else(Uuid::new_v4).to_string();
        if Vertex::find_by_uuid(ctx, &uuid, None).await?.is_some() {
            return Err(GraphError::invalid(format!("uuid {uuid} already in use")));
        }

        let now = now_secs();
        let mut properties = extra;
        properties.insert(keys::NAME.into(), self.name.as_str().into());
        properties.insert(keys::UUID.into(), uuid.as_str().into());
        properties.insert(keys::NAMESPACE.into(), config.fs_ns.as_str().into());
        properties.insert(keys::CREATED.into(), now.into());
        properties.insert(keys::MODIFIED.into(), now.into());
        properties.insert(
            keys::MODE.into(),
            self.mode.unwrap_or(config.default_mode).into(),
        );
        properties.insert(
            keys::OWNER.into(),
            self.owner.unwrap_or(config.default_uid).into(),
        );
        properties.insert(
            keys::GROUP.into(),
            self.group.unwrap_or(config.default_gid).into(),
        );

        let mut out_edges = Vec::new();
        if let Some(parent) = parent {
            let mut edge_properties = PropertyMap::new();
            edge_properties.insert(keys::NAME.into(), config.in_name.as_str().into());
            edge_properties.insert(keys::UUID.into(), Uuid::new_v4().to_string().into());
            out_edges.push(NewEdge {
                to: parent.id(),
                label: config.in_label.clone(),
                properties: edge_properties,
            });
        }

        ctx.engine()
            .add_vertex(NewVertex {
                label: label.clone(),
                properties,
                out_edges,
            })
            .await?;
        debug!(name = %self.name, %label, %uuid, "created vertex");

        Vertex::find_by_uuid(ctx, &uuid, None)
            .await?
            .ok_or_else(|| GraphError::not_found(format!("vertex {uuid} after create")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphFsConfig;
    use crate::graph::MemoryGraph;
    use std::sync::Arc;

    fn ctx() -> GraphContext {
        GraphContext::new(Arc::new(MemoryGraph::new()), GraphFsConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_create_sets_defaults() {
        let ctx = ctx();
        let v = VertexDraft::new("a").create(&ctx, None).await.unwrap();
        assert_eq!(v.label(), "vertex");
        assert_eq!(v.name(), Some("a"));
        assert!(v.uuid().is_some());
        assert_eq!(v.property(keys::NAMESPACE).and_then(|p| p.as_str()), Some("gfs1"));
        assert_eq!(v.int_property(keys::MODE), Some(0o777));
        assert_eq!(v.int_property(keys::OWNER), Some(1001));
        assert_eq!(v.int_property(keys::GROUP), Some(1001));
        assert!(v.int_property(keys::CREATED).is_some());
        assert!(v.is_file(&ctx));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_name() {
        let ctx = ctx();
        let err = VertexDraft::new("").create(&ctx, None).await.unwrap_err();
        assert!(matches!(err, GraphError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_uuid() {
        let ctx = ctx();
        let uuid = Uuid::new_v4();
        VertexDraft::new("a").uuid(uuid).create(&ctx, None).await.unwrap();
        let err = VertexDraft::new("b").uuid(uuid).create(&ctx, None).await.unwrap_err();
        assert!(matches!(err, GraphError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_create_folder_and_children() {
        let ctx = ctx();
        let folder = VertexDraft::new("f").create_folder(&ctx, None).await.unwrap();
        assert!(folder.is_folder(&ctx));
        assert_eq!(folder.label(), "group");

        let self_edge = folder.edge(&ctx, "self0@self", Direction::Out).await.unwrap();
        assert!(self_edge.is_some());

        let child = VertexDraft::new("c").create(&ctx, Some(&folder)).await.unwrap();
        let children = folder.children(&ctx).await.unwrap();
        assert_eq!(children, vec![child.clone()]);
        assert_eq!(child.parent(&ctx).await.unwrap(), Some(folder.clone()));

        let roots = Vertex::entries(&ctx, None).await.unwrap();
        assert_eq!(roots, vec![folder]);
    }

    #[tokio::test]
    async fn test_custom_label_folder_is_folder() {
        let ctx = ctx();
        let folder = VertexDraft::new("p")
            .label("project")
            .create_folder(&ctx, None)
            .await
            .unwrap();
        assert_eq!(folder.label(), "project");
        assert!(folder.is_folder(&ctx));
    }

    #[tokio::test]
    async fn test_load_by_identifier() {
        let ctx = ctx();
        let v = VertexDraft::new("doc")
            .label("note")
            .create(&ctx, None)
            .await
            .unwrap();
        let uuid = v.uuid().unwrap().to_string();

        let long = v.identifier(&ctx, false);
        assert_eq!(long, format!("doc@note@{uuid}"));
        assert_eq!(Vertex::load(&ctx, &long).await.unwrap(), Some(v.clone()));
        assert_eq!(Vertex::load(&ctx, &uuid).await.unwrap(), Some(v.clone()));

        // Wrong label narrows the lookup to nothing.
        let wrong = format!("doc@person@{uuid}");
        assert_eq!(Vertex::load(&ctx, &wrong).await.unwrap(), None);
        // No uuid, no direct address.
        assert_eq!(Vertex::load(&ctx, "doc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rename_and_move() {
        let ctx = ctx();
        let f1 = VertexDraft::new("f1").create_folder(&ctx, None).await.unwrap();
        let f2 = VertexDraft::new("f2").create_folder(&ctx, None).await.unwrap();
        let v = VertexDraft::new("a").create(&ctx, Some(&f1)).await.unwrap();

        let v = v.rename(&ctx, "b").await.unwrap();
        assert_eq!(v.name(), Some("b"));

        let v = v.move_to(&ctx, Some(&f2)).await.unwrap();
        assert_eq!(v.parent(&ctx).await.unwrap(), Some(f2.clone()));
        assert!(f1.children(&ctx).await.unwrap().is_empty());
        let containment = v.edges(&ctx, Some("in0@ref"), Direction::Out).await.unwrap();
        assert_eq!(containment.len(), 1);

        let v = v.move_to(&ctx, None).await.unwrap();
        assert_eq!(v.parent(&ctx).await.unwrap(), None);
        assert!(v.move_to(&ctx, Some(&v)).await.is_err());
    }

    #[tokio::test]
    async fn test_properties_and_encoding() {
        let ctx = ctx();
        let mut v = VertexDraft::new("a").create(&ctx, None).await.unwrap();
        v.write_property(&ctx, "data", b"hello", PropertyEncoding::Base64)
            .await
            .unwrap();
        let v2 = v.refresh(&ctx).await.unwrap();
        assert_eq!(
            v2.read_property("data", PropertyEncoding::Base64).unwrap(),
            Some(b"hello".to_vec())
        );
        assert_eq!(
            v2.property("data").and_then(|p| p.as_str()),
            Some("base64:aGVsbG8=")
        );

        v.unset_property(&ctx, "data").await.unwrap();
        assert!(!v.refresh(&ctx).await.unwrap().has_property("data"));
    }

    #[tokio::test]
    async fn test_links() {
        let ctx = ctx();
        let a = VertexDraft::new("a").create(&ctx, None).await.unwrap();
        let b = VertexDraft::new("b").create(&ctx, None).await.unwrap();

        let edge = a.create_link(&ctx, &b, "knows", Some("link1")).await.unwrap();
        assert_eq!(edge.identifier(&ctx), "link1@knows");

        let far = a.edge_node(&ctx, "link1@knows", false, true).await.unwrap();
        assert_eq!(far, Some(b.clone()));
        let near = b.edge_node(&ctx, "link1@knows", true, false).await.unwrap();
        assert_eq!(near, Some(a.clone()));

        // Label alone matches any name.
        assert!(a.edge(&ctx, "knows", Direction::Out).await.unwrap().is_some());
        assert!(a.edge(&ctx, "other@knows", Direction::Out).await.unwrap().is_none());

        let dropped = a
            .delete_link(&ctx, "knows", Some("link1"), Direction::Out)
            .await
            .unwrap();
        assert_eq!(dropped, 1);
        assert!(a.edge(&ctx, "link1@knows", Direction::Out).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ancestry_terminates_on_cycle() {
        let ctx = ctx();
        let f1 = VertexDraft::new("f1").create_folder(&ctx, None).await.unwrap();
        let f2 = VertexDraft::new("f2").create_folder(&ctx, Some(&f1)).await.unwrap();
        let leaf = VertexDraft::new("x").create(&ctx, Some(&f2)).await.unwrap();

        let names: Vec<_> = leaf
            .ancestry(&ctx, None)
            .await
            .unwrap()
            .iter()
            .map(|v| v.name().unwrap_or_default().to_string())
            .collect();
        assert_eq!(names, ["f1", "f2", "x"]);

        let below_f1 = leaf.ancestry(&ctx, Some(f1.id())).await.unwrap();
        assert_eq!(below_f1.len(), 2);

        // Close a containment cycle f1 -> f2 -> f1.
        f1.move_to(&ctx, Some(&f2)).await.unwrap();
        let chain = leaf.ancestry(&ctx, None).await.unwrap();
        assert_eq!(chain.len(), 3);
    }
}
