//! Filesystem semantics per path kind.
//!
//! | operation | at_path | vertex_property | vertex_in/out_edge | other |
//! |---|---|---|---|---|
//! | create | new vertex under parent | set empty property | - | - |
//! | read/write | `data` property, base64 | the property | - | - |
//! | delete | drop vertex | unset property | - | - |
//! | move | rename + re-parent | copy then unset | - | - |
//! | link ops | - | - | create/read/delete edge | - |

use crate::config::EntryKind;
use crate::context::GraphContext;
use crate::graph::{Direction, PropertyValue};
use crate::node::{keys, Element, PropertyEncoding, Vertex, VertexDraft};
use crate::splice::irepl;

use super::{Match, PathError, PathKind, PathResult, TypeHint};

/// One folder listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub name: String,
    pub hint: TypeHint,
}

impl ListEntry {
    fn new(name: impl Into<String>, hint: TypeHint) -> Self {
        Self {
            name: name.into(),
            hint,
        }
    }
}

impl Match {
    // ========================================================================
    // Classification
    // ========================================================================

    pub fn is_folder(&self, ctx: &GraphContext) -> bool {
        match self.kind {
            PathKind::AtPath => self.node.as_ref().is_some_and(|n| n.is_folder(ctx)),
            kind => kind.type_hint() == TypeHint::Folder,
        }
    }

    pub fn is_file(&self, ctx: &GraphContext) -> bool {
        match self.kind {
            PathKind::AtPath => self.node.as_ref().is_some_and(|n| n.is_file(ctx)),
            kind => kind.type_hint() == TypeHint::File,
        }
    }

    pub fn is_link(&self) -> bool {
        self.kind.type_hint() == TypeHint::Link
    }

    /// Does the addressed entry exist?
    pub async fn is_found(&self, ctx: &GraphContext) -> PathResult<bool> {
        match self.kind {
            PathKind::Root => Ok(true),
            PathKind::Vertexes => Ok(self.parent_resolved),
            PathKind::AtPath
            | PathKind::Vertex
            | PathKind::VertexInEdges
            | PathKind::VertexOutEdges => Ok(self.node.is_some()),
            PathKind::VertexProperty => {
                let (Some(node), Some(property)) = (&self.node, &self.vertex_property) else {
                    return Ok(false);
                };
                if node.has_property(property) {
                    return Ok(true);
                }
                Ok(node.edge(ctx, property, Direction::Out).await?.is_some())
            }
            PathKind::VertexInEdge | PathKind::VertexOutEdge => {
                let (Some(node), Some(edge)) = (&self.node, &self.vertex_edge) else {
                    return Ok(false);
                };
                Ok(node.edge(ctx, edge, self.edge_direction()).await?.is_some())
            }
            PathKind::Unresolved => Ok(false),
        }
    }

    fn edge_direction(&self) -> Direction {
        Direction::inbound(self.kind == PathKind::VertexInEdge)
    }

    fn found_node(&self) -> PathResult<&Vertex> {
        self.node
            .as_ref()
            .ok_or_else(|| PathError::not_found(self.path()))
    }

    fn found_node_mut(&mut self) -> PathResult<&mut Vertex> {
        let path = self.path();
        self.node.as_mut().ok_or_else(|| PathError::not_found(path))
    }

    fn unsupported(&self, op: &str) -> PathError {
        PathError::not_supported(format!("{op} on {} path {}", self.kind, self.path()))
    }

    /// `uuid` and `namespace` are how a vertex is found; they never change
    /// through the filesystem.
    fn check_property_mutable(&self) -> PathResult<()> {
        if self.kind != PathKind::VertexProperty {
            return Ok(());
        }
        match self.vertex_property.as_deref() {
            Some(keys::UUID | keys::NAMESPACE) => Err(PathError::protected(self.path())),
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Create a file: a vertex under the parent, or an empty property.
    pub async fn create_file(&mut self, ctx: &GraphContext, mode: Option<u32>) -> PathResult<()> {
        match self.kind {
            PathKind::AtPath => {
                let draft = self.draft(ctx, EntryKind::File, mode)?;
                let vertex = draft.create(ctx, self.parent.as_ref()).await?;
                self.node = Some(vertex);
                Ok(())
            }
            PathKind::VertexProperty => {
                self.check_property_mutable()?;
                if self.is_found(ctx).await? {
                    return Err(PathError::already_exists(self.path()));
                }
                let property = self.property_key()?;
                let node = self.found_node_mut()?;
                node.set_property(ctx, &property, PropertyValue::from("")).await?;
                Ok(())
            }
            _ => Err(self.unsupported("create")),
        }
    }

    /// Create a folder vertex under the parent.
    pub async fn create_folder(&mut self, ctx: &GraphContext, mode: Option<u32>) -> PathResult<()> {
        if self.kind != PathKind::AtPath {
            return Err(self.unsupported("mkdir"));
        }
        let draft = self.draft(ctx, EntryKind::Folder, mode)?;
        let vertex = draft.create_folder(ctx, self.parent.as_ref()).await?;
        self.node = Some(vertex);
        Ok(())
    }

    /// Name, label and uuid for a new vertex, inferred from the last segment.
    fn draft(
        &self,
        ctx: &GraphContext,
        kind: EntryKind,
        mode: Option<u32>,
    ) -> PathResult<VertexDraft> {
        if self.node.is_some() {
            return Err(PathError::already_exists(self.path()));
        }
        if !self.parent_resolved {
            return Err(PathError::not_found(self.path()));
        }
        if self.parent.as_ref().is_some_and(|p| !p.is_folder(ctx)) {
            return Err(PathError::is_file(self.path()));
        }
        let segment = self
            .name
            .as_deref()
            .ok_or_else(|| PathError::not_found(self.path()))?;
        let parsed = ctx.codec().parse(segment);
        let name = match (&parsed.name, parsed.uuid) {
            (Some(name), _) => name.clone(),
            (None, Some(uuid)) => uuid.to_string(),
            (None, None) => segment.to_string(),
        };

        let mut draft = VertexDraft::new(name.clone());
        if let Some(label) = parsed
            .label
            .as_deref()
            .or_else(|| ctx.rule_label(kind, &name))
        {
            draft = draft.label(label);
        }
        if let Some(uuid) = parsed.uuid {
            draft = draft.uuid(uuid);
        }
        if let Some(mode) = mode {
            draft = draft.mode(mode);
        }
        Ok(draft)
    }

    // ========================================================================
    // Listing
    // ========================================================================

    /// List a folder-kind path.
    pub async fn read_folder(&self, ctx: &GraphContext) -> PathResult<Vec<ListEntry>> {
        let config = ctx.config();
        match self.kind {
            PathKind::Root | PathKind::AtPath => {
                let folder = match self.kind {
                    PathKind::Root => self.node.as_ref(),
                    _ => {
                        let node = self.found_node()?;
                        if !node.is_folder(ctx) {
                            return Err(PathError::is_file(self.path()));
                        }
                        Some(node)
                    }
                };
                let mut entries =
                    vec![ListEntry::new(config.vertex_folder.as_str(), TypeHint::Folder)];
                for child in Vertex::entries(ctx, folder).await? {
                    entries.push(vertex_entry(ctx, &child, true));
                }
                Ok(entries)
            }
            PathKind::Vertexes => {
                if !self.parent_resolved {
                    return Err(PathError::not_found(self.path()));
                }
                let (vertices, short) = match self.parent.as_ref() {
                    Some(parent) => (parent.children(ctx).await?, true),
                    None => (Vertex::all(ctx).await?, false),
                };
                Ok(vertices
                    .iter()
                    .map(|v| ListEntry::new(v.identifier(ctx, short), TypeHint::Folder))
                    .collect())
            }
            PathKind::Vertex => {
                let node = self.found_node()?;
                let mut entries: Vec<ListEntry> = node
                    .properties()
                    .keys()
                    .map(|k| ListEntry::new(k.as_str(), TypeHint::File))
                    .collect();
                entries.push(ListEntry::new(config.in_edge_folder.as_str(), TypeHint::Folder));
                entries.push(ListEntry::new(config.out_edge_folder.as_str(), TypeHint::Folder));
                for edge in node.edges(ctx, None, Direction::Out).await? {
                    entries.push(ListEntry::new(edge.identifier(ctx), TypeHint::Link));
                }
                Ok(entries)
            }
            PathKind::VertexInEdges | PathKind::VertexOutEdges => {
                let node = self.found_node()?;
                let direction = Direction::inbound(self.kind == PathKind::VertexInEdges);
                Ok(node
                    .edges(ctx, None, direction)
                    .await?
                    .iter()
                    .map(|e| ListEntry::new(e.identifier(ctx), TypeHint::Link))
                    .collect())
            }
            PathKind::VertexProperty | PathKind::VertexInEdge | PathKind::VertexOutEdge => {
                Err(PathError::is_file(self.path()))
            }
            PathKind::Unresolved => Err(PathError::not_found(self.path())),
        }
    }

    // ========================================================================
    // Content
    // ========================================================================

    /// Full content of a file-kind path.
    pub fn content(&self, ctx: &GraphContext) -> PathResult<Vec<u8>> {
        match self.kind {
            PathKind::AtPath => {
                let node = self.found_node()?;
                if node.is_folder(ctx) {
                    return Err(PathError::is_folder(self.path()));
                }
                Ok(node
                    .read_property(&ctx.config().data_property, PropertyEncoding::Base64)?
                    .unwrap_or_default())
            }
            PathKind::VertexProperty => {
                let property = self.property_key()?;
                self.found_node()?
                    .read_property(&property, PropertyEncoding::Plain)?
                    .ok_or_else(|| PathError::not_found(self.path()))
            }
            PathKind::Unresolved => Err(PathError::not_found(self.path())),
            _ => Err(PathError::is_folder(self.path())),
        }
    }

    /// Read `size` bytes at `offset`. Zero `size` reads to the end.
    pub fn read_file(&self, ctx: &GraphContext, offset: usize, size: usize) -> PathResult<Vec<u8>> {
        let content = self.content(ctx)?;
        Ok(slice(&content, offset, size).to_vec())
    }

    /// Splice `data` into the content at `offset`.
    ///
    /// Always returns `data.len()`, including when an offset past the end
    /// leaves the content as it was. `modified` only moves on a real change.
    pub async fn write_file(
        &mut self,
        ctx: &GraphContext,
        data: &[u8],
        offset: usize,
    ) -> PathResult<usize> {
        let (key, encoding) = self.content_slot(ctx)?;
        let node = self.found_node_mut()?;
        let old = node.read_property(&key, encoding)?;
        let changed = irepl(old.as_deref(), data, offset)
            .filter(|new| old.as_deref() != Some(new.as_slice()));
        if let Some(new) = changed {
            node.write_property(ctx, &key, &new, encoding).await?;
            node.touch(ctx).await?;
        }
        Ok(data.len())
    }

    /// Cut the content to `len` bytes. Growing is a no-op.
    pub async fn truncate(&mut self, ctx: &GraphContext, len: usize) -> PathResult<()> {
        let (key, encoding) = self.content_slot(ctx)?;
        let node = self.found_node_mut()?;
        let old = node.read_property(&key, encoding)?.unwrap_or_default();
        if len < old.len() {
            node.write_property(ctx, &key, &old[..len], encoding).await?;
            node.touch(ctx).await?;
        }
        Ok(())
    }

    /// Property key and encoding holding this path's content.
    fn content_slot(&self, ctx: &GraphContext) -> PathResult<(String, PropertyEncoding)> {
        match self.kind {
            PathKind::AtPath => {
                if self.found_node()?.is_folder(ctx) {
                    return Err(PathError::is_folder(self.path()));
                }
                Ok((ctx.config().data_property.clone(), PropertyEncoding::Base64))
            }
            PathKind::VertexProperty => {
                self.found_node()?;
                self.check_property_mutable()?;
                Ok((self.property_key()?, PropertyEncoding::Plain))
            }
            PathKind::Unresolved => Err(PathError::not_found(self.path())),
            _ => Err(PathError::is_folder(self.path())),
        }
    }

    fn property_key(&self) -> PathResult<String> {
        self.vertex_property
            .clone()
            .ok_or_else(|| PathError::not_found(self.path()))
    }

    // ========================================================================
    // Deletion and moves
    // ========================================================================

    /// Delete a file vertex or unset a property.
    pub async fn delete_file(&mut self, ctx: &GraphContext) -> PathResult<()> {
        match self.kind {
            PathKind::AtPath => {
                let node = self.found_node()?;
                if node.is_folder(ctx) {
                    return Err(PathError::is_folder(self.path()));
                }
                node.delete(ctx).await?;
                self.node = None;
                Ok(())
            }
            PathKind::VertexProperty => {
                self.check_property_mutable()?;
                let property = self.property_key()?;
                let node = self.found_node_mut()?;
                if !node.has_property(&property) {
                    return Err(PathError::not_found(property));
                }
                node.unset_property(ctx, &property).await?;
                Ok(())
            }
            _ => Err(self.unsupported("unlink")),
        }
    }

    /// Delete an empty folder vertex.
    pub async fn delete_folder(&mut self, ctx: &GraphContext) -> PathResult<()> {
        if self.kind != PathKind::AtPath {
            return Err(self.unsupported("rmdir"));
        }
        let node = self.found_node()?;
        if !node.is_folder(ctx) {
            return Err(PathError::is_file(self.path()));
        }
        if !node.children(ctx).await?.is_empty() {
            return Err(PathError::not_empty(self.path()));
        }
        node.delete(ctx).await?;
        self.node = None;
        Ok(())
    }

    /// Fail unless this entry can be moved to `target`: matching kinds, a
    /// resolved destination folder outside this entry's own subtree.
    pub async fn check_move(&self, ctx: &GraphContext, target: &Match) -> PathResult<()> {
        match (self.kind, target.kind) {
            (PathKind::AtPath, PathKind::AtPath) => {
                if !target.parent_resolved {
                    return Err(PathError::not_found(target.path()));
                }
                let node = self.found_node()?;
                if let Some(parent) = target.parent.as_ref() {
                    if !parent.is_folder(ctx) {
                        return Err(PathError::is_file(target.path()));
                    }
                    let lineage = parent.ancestry(ctx, None).await?;
                    if lineage.iter().any(|a| a.id() == node.id()) {
                        return Err(PathError::not_supported(format!(
                            "cannot move {} into itself",
                            self.path()
                        )));
                    }
                }
                Ok(())
            }
            (PathKind::VertexProperty, PathKind::VertexProperty) => {
                self.found_node()?;
                target.found_node()?;
                self.check_property_mutable()?;
                target.check_property_mutable()

            }
            _ => Err(self.unsupported("rename")),
        }
    }

    /// Move this entry to `target`.
    ///
    /// Vertices are renamed to the target's name and re-parented; properties
    /// are copied and the source is unset once the copy is confirmed.
    pub async fn move_node(&mut self, ctx: &GraphContext, target: &Match) -> PathResult<()> {
        self.check_move(ctx, target).await?;
        match (self.kind, target.kind) {
            (PathKind::AtPath, PathKind::AtPath) => {
                let node = self.found_node()?;
                let segment = target
                    .name
                    .as_deref()
                    .ok_or_else(|| PathError::not_found(target.path()))?;
                let name = ctx
                    .codec()
                    .parse(segment)
                    .name
                    .unwrap_or_else(|| segment.to_string());
                let renamed = if node.name() == Some(name.as_str()) {
                    node.clone()
                } else {
                    node.rename(ctx, &name).await?
                };
                let moved = renamed.move_to(ctx, target.parent.as_ref()).await?;
                self.node = Some(moved);
                Ok(())
            }
            (PathKind::VertexProperty, PathKind::VertexProperty) => {
                let from_key = self.property_key()?;
                let to_key = target.property_key()?;
                let value = self
                    .found_node()?
                    .property(&from_key)
                    .cloned()
                    .ok_or_else(|| PathError::not_found(self.path()))?;
                let mut dest = target.found_node()?.clone();
                dest.set_property(ctx, &to_key, value.clone()).await?;

                let committed = dest.refresh(ctx).await?;
                if committed.property(&to_key) == Some(&value)
                    && !(dest.id() == self.found_node()?.id() && from_key == to_key)
                {
                    self.found_node_mut()?.unset_property(ctx, &from_key).await?;
                }
                Ok(())
            }
            _ => Err(self.unsupported("rename")),
        }
    }

    // ========================================================================
    // Links
    // ========================================================================

    /// Create the addressed edge between this vertex and `source`'s vertex.
    ///
    /// `EI/<edge>` makes `source -> this`, `EO/<edge>` makes `this -> source`.
    pub async fn create_link(&self, ctx: &GraphContext, source: &Match) -> PathResult<()> {
        if !self.kind.is_edge() {
            return Err(self.unsupported("symlink"));
        }
        if self.is_found(ctx).await? {
            return Err(PathError::already_exists(self.path()));
        }
        let node = self.found_node()?;
        let other = source.found_node()?;
        let edge_id = self
            .vertex_edge
            .as_deref()
            .ok_or_else(|| PathError::not_found(self.path()))?;
        let parsed = ctx.codec().parse_edge(edge_id);

        let (from, to) = match self.kind {
            PathKind::VertexInEdge => (other, node),
            _ => (node, other),
        };
        from.create_link(ctx, to, &parsed.label, parsed.name.as_deref())
            .await?;
        Ok(())
    }

    /// Absolute filesystem path of the vertex at the far end of the edge.
    pub async fn read_link(&self, ctx: &GraphContext) -> PathResult<String> {
        if !self.kind.is_edge() {
            return Err(self.unsupported("readlink"));
        }
        let node = self.found_node()?;
        let edge_id = self
            .vertex_edge
            .as_deref()
            .ok_or_else(|| PathError::not_found(self.path()))?;
        let inbound = self.kind == PathKind::VertexInEdge;
        let target = node
            .edge_node(ctx, edge_id, inbound, !inbound)
            .await?
            .ok_or_else(|| PathError::not_found(self.path()))?;

        let config = ctx.config();
        let mount = config.mount_prefix();
        let root_id = self.root.as_ref().map(|r| r.id());
        if root_id == Some(target.id()) {
            return Ok(format!("{mount}/"));
        }

        let chain = target.ancestry(ctx, root_id).await?;
        let anchored = match chain.first() {
            Some(top) => top.parent(ctx).await?.map(|p| p.id()) == root_id,
            None => false,
        };
        if !anchored {
            // Not reachable by containment; address it directly.
            return Ok(format!(
                "{mount}/{}/{}",
                config.vertex_folder,
                target.identifier(ctx, false)
            ));
        }

        let segments: Vec<String> = chain.iter().map(|v| v.identifier(ctx, true)).collect();
        Ok(format!("{mount}/{}", segments.join("/")))
    }

    /// Drop the addressed edge(s).
    pub async fn delete_link(&self, ctx: &GraphContext) -> PathResult<()> {
        if !self.kind.is_edge() {
            return Err(self.unsupported("unlink"));
        }
        let node = self.found_node()?;
        let edge_id = self
            .vertex_edge
            .as_deref()
            .ok_or_else(|| PathError::not_found(self.path()))?;
        let parsed = ctx.codec().parse_edge(edge_id);
        let dropped = node
            .delete_link(ctx, &parsed.label, parsed.name.as_deref(), self.edge_direction())
            .await?;
        if dropped == 0 {
            return Err(PathError::not_found(self.path()));
        }
        Ok(())
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    /// Set the cosmetic mode bits.
    pub async fn set_mode(&mut self, ctx: &GraphContext, mode: u32) -> PathResult<()> {
        let node = self.attribute_node()?;
        node.set_property(ctx, keys::MODE, mode.into()).await?;
        Ok(())
    }

    /// Set owner and/or group.
    pub async fn set_owner(
        &mut self,
        ctx: &GraphContext,
        uid: Option<u32>,
        gid: Option<u32>,
    ) -> PathResult<()> {
        let node = self.attribute_node()?;
        if let Some(uid) = uid {
            node.set_property(ctx, keys::OWNER, uid.into()).await?;
        }
        if let Some(gid) = gid {
            node.set_property(ctx, keys::GROUP, gid.into()).await?;
        }
        Ok(())
    }

    fn attribute_node(&mut self) -> PathResult<&mut Vertex> {
        match self.kind {
            PathKind::Root | PathKind::AtPath | PathKind::Vertex | PathKind::VertexProperty => {
                self.found_node_mut()
            }
            _ => Err(self.unsupported("setattr")),
        }
    }
}

fn vertex_entry(ctx: &GraphContext, vertex: &Vertex, short: bool) -> ListEntry {
    let hint = if vertex.is_folder(ctx) {
        TypeHint::Folder
    } else {
        TypeHint::File
    };
    ListEntry::new(vertex.identifier(ctx, short), hint)
}

/// Offset/size window over `content`, clamped to its bounds.
fn slice(content: &[u8], offset: usize, size: usize) -> &[u8] {
    let start = offset.min(content.len());
    let end = if size > 0 {
        start.saturating_add(size).min(content.len())
    } else {
        content.len()
    };
    &content[start..end]
}
