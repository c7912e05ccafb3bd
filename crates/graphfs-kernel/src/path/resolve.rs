//! Path string to [`Match`].

use tracing::debug;

use crate::context::GraphContext;
use crate::graph::Direction;
use crate::node::{Element, Vertex};

use super::{split_path, Match, PathError, PathKind, PathResult};

impl Match {
    /// Resolve `path` against the current graph state.
    pub async fn resolve(ctx: &GraphContext, path: &str) -> PathResult<Match> {
        let full = split_path(path);
        let root = root_vertex(ctx).await?;
        let config = ctx.config();

        let found = if full.is_empty() {
            let mut m = Match::new(PathKind::Root, full, root.clone());
            m.node = root;
            m
        } else if let Some(v) = full.iter().rposition(|s| *s == config.vertex_folder) {
            resolve_flat(ctx, full, v, root).await?
        } else {
            resolve_at_path(ctx, full, root).await?
        };

        debug!(
            path,
            kind = %found.kind,
            found = found.node.is_some(),
            "resolved path"
        );
        Ok(found)
    }
}

/// The configured filesystem root, if any.
async fn root_vertex(ctx: &GraphContext) -> PathResult<Option<Vertex>> {
    let Some(fs_root) = ctx.config().fs_root.as_deref() else {
        return Ok(None);
    };
    match Vertex::load(ctx, fs_root).await? {
        Some(root) => Ok(Some(root)),
        None => Err(PathError::not_found(format!("filesystem root {fs_root}"))),
    }
}

/// Child of `folder` (or of the root level) addressed by `segment`.
///
/// A segment names a child by its short identifier, or by its long form.
async fn child(
    ctx: &GraphContext,
    folder: Option<&Vertex>,
    segment: &str,
) -> PathResult<Option<Vertex>> {
    let entries = Vertex::entries(ctx, folder).await?;
    Ok(entries
        .into_iter()
        .find(|c| c.identifier(ctx, true) == segment || c.identifier(ctx, false) == segment))
}

/// Walk containment edges from `root` along `segments`.
async fn walk(
    ctx: &GraphContext,
    root: Option<&Vertex>,
    segments: &[String],
) -> PathResult<Option<Vertex>> {
    let mut current = root.cloned();
    for segment in segments {
        match child(ctx, current.as_ref(), segment).await? {
            Some(next) => current = Some(next),
            None => return Ok(None),
        }
    }
    Ok(current)
}

async fn resolve_at_path(
    ctx: &GraphContext,
    full: Vec<String>,
    root: Option<Vertex>,
) -> PathResult<Match> {
    let (name, prefix) = match full.split_last() {
        Some((name, prefix)) => (name.clone(), prefix.to_vec()),
        None => return Ok(Match::new(PathKind::Root, full, root)),
    };

    let mut m = Match::new(PathKind::AtPath, full, root.clone());
    if prefix.is_empty() {
        m.parent = root;
    } else {
        m.parent = walk(ctx, root.as_ref(), &prefix).await?;
        m.parent_resolved = m.parent.is_some();
    }
    if m.parent_resolved {
        m.node = child(ctx, m.parent.as_ref(), &name).await?;
    }
    m.name = Some(name);
    Ok(m)
}

async fn resolve_flat(
    ctx: &GraphContext,
    full: Vec<String>,
    v: usize,
    root: Option<Vertex>,
) -> PathResult<Match> {
    let config = ctx.config();
    let prefix = full[..v].to_vec();
    let rest = full[v + 1..].to_vec();

    let parent = if prefix.is_empty() {
        None
    } else {
        match walk(ctx, root.as_ref(), &prefix).await? {
            Some(parent) => Some(parent),
            None => {
                let mut m = Match::new(PathKind::Unresolved, full, root);
                m.parent_resolved = false;
                return Ok(m);
            }
        }
    };

    let kind = match rest.len() {
        0 => PathKind::Vertexes,
        1 => PathKind::Vertex,
        2 if rest[1] == config.in_edge_folder => PathKind::VertexInEdges,
        2 if rest[1] == config.out_edge_folder => PathKind::VertexOutEdges,
        // Property or edge shorthand; settled below once the node is known.
        2 => PathKind::VertexProperty,
        3 if rest[1] == config.in_edge_folder => PathKind::VertexInEdge,
        3 if rest[1] == config.out_edge_folder => PathKind::VertexOutEdge,
        _ => PathKind::Unresolved,
    };

    let mut m = Match::new(kind, full, root);
    m.parent = parent;
    if kind == PathKind::Vertexes || kind == PathKind::Unresolved {
        return Ok(m);
    }

    let vertex_id = rest[0].clone();
    m.node = match m.parent.as_ref() {
        Some(parent) => scoped_child(ctx, parent, &vertex_id).await?,
        None => Vertex::load(ctx, &vertex_id).await?,
    };
    m.vertex_id = Some(vertex_id);

    match kind {
        PathKind::VertexProperty => {
            let segment = rest[1].clone();
            // An outbound edge of that identifier wins over a property.
            let is_edge = match m.node.as_ref() {
                Some(node) => node.edge(ctx, &segment, Direction::Out).await?.is_some(),
                None => false,
            };
            if is_edge {
                m.kind = PathKind::VertexOutEdge;
                m.vertex_edge = Some(segment);
            } else {
                m.vertex_property = Some(segment);
            }
        }
        PathKind::VertexInEdge | PathKind::VertexOutEdge => {
            m.vertex_edge = Some(rest[2].clone());
        }
        _ => {}
    }
    Ok(m)
}

/// Child of `parent` named by `id`: plain name, short or long identifier.
async fn scoped_child(
    ctx: &GraphContext,
    parent: &Vertex,
    id: &str,
) -> PathResult<Option<Vertex>> {
    let children = parent.children(ctx).await?;
    Ok(children.into_iter().find(|c| {
        c.name() == Some(id) || c.identifier(ctx, true) == id || c.identifier(ctx, false) == id
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphFsConfig;
    use crate::graph::MemoryGraph;
    use crate::node::VertexDraft;
    use std::sync::Arc;

    fn ctx() -> GraphContext {
        GraphContext::new(Arc::new(MemoryGraph::new()), GraphFsConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_root() {
        let ctx = ctx();
        let m = Match::resolve(&ctx, "/").await.unwrap();
        assert_eq!(m.kind, PathKind::Root);
        assert!(m.full.is_empty());
        assert!(m.node.is_none());
    }

    #[tokio::test]
    async fn test_at_path() {
        let ctx = ctx();
        let f = VertexDraft::new("folder1").create_folder(&ctx, None).await.unwrap();
        let t = VertexDraft::new("test1").create(&ctx, Some(&f)).await.unwrap();

        let m = Match::resolve(&ctx, "/folder1").await.unwrap();
        assert_eq!(m.kind, PathKind::AtPath);
        assert_eq!(m.node.as_ref(), Some(&f));
        assert!(m.parent.is_none());

        let m = Match::resolve(&ctx, "/folder1/test1").await.unwrap();
        assert_eq!(m.node.as_ref(), Some(&t));
        assert_eq!(m.parent.as_ref(), Some(&f));
        assert_eq!(m.name.as_deref(), Some("test1"));

        let m = Match::resolve(&ctx, "/folder1/missing").await.unwrap();
        assert!(m.node.is_none());
        assert_eq!(m.parent.as_ref(), Some(&f));
        assert!(m.parent_resolved);

        let m = Match::resolve(&ctx, "/nope/test1").await.unwrap();
        assert!(m.node.is_none());
        assert!(!m.parent_resolved);
    }

    #[tokio::test]
    async fn test_long_identifier_segment() {
        let ctx = ctx();
        let v = VertexDraft::new("a").create(&ctx, None).await.unwrap();
        let long = v.identifier(&ctx, false);
        let m = Match::resolve(&ctx, &format!("/{long}")).await.unwrap();
        assert_eq!(m.node, Some(v));
    }

    #[tokio::test]
    async fn test_flat_namespace() {
        let ctx = ctx();
        let f = VertexDraft::new("folder1").create_folder(&ctx, None).await.unwrap();
        let t = VertexDraft::new("test1").create(&ctx, Some(&f)).await.unwrap();
        let uuid = t.uuid().unwrap().to_string();

        let m = Match::resolve(&ctx, "/.V").await.unwrap();
        assert_eq!(m.kind, PathKind::Vertexes);
        assert!(m.parent.is_none());

        let m = Match::resolve(&ctx, &format!("/.V/{uuid}")).await.unwrap();
        assert_eq!(m.kind, PathKind::Vertex);
        assert_eq!(m.node.as_ref(), Some(&t));

        let m = Match::resolve(&ctx, "/folder1/.V/test1").await.unwrap();
        assert_eq!(m.kind, PathKind::Vertex);
        assert_eq!(m.parent.as_ref(), Some(&f));
        assert_eq!(m.node.as_ref(), Some(&t));

        let m = Match::resolve(&ctx, &format!("/.V/{uuid}/EI")).await.unwrap();
        assert_eq!(m.kind, PathKind::VertexInEdges);
        let m = Match::resolve(&ctx, &format!("/.V/{uuid}/EO/in0@ref")).await.unwrap();
        assert_eq!(m.kind, PathKind::VertexOutEdge);
        assert_eq!(m.vertex_edge.as_deref(), Some("in0@ref"));

        let m = Match::resolve(&ctx, &format!("/.V/{uuid}/name")).await.unwrap();
        assert_eq!(m.kind, PathKind::VertexProperty);
        assert_eq!(m.vertex_property.as_deref(), Some("name"));

        let m = Match::resolve(&ctx, &format!("/.V/{uuid}/a/b/c")).await.unwrap();
        assert_eq!(m.kind, PathKind::Unresolved);
        assert!(m.node.is_none());

        let m = Match::resolve(&ctx, "/nope/.V").await.unwrap();
        assert_eq!(m.kind, PathKind::Unresolved);
    }

    #[tokio::test]
    async fn test_edge_shorthand_wins_over_property() {
        let ctx = ctx();
        let mut a = VertexDraft::new("a").create(&ctx, None).await.unwrap();
        let b = VertexDraft::new("b").create(&ctx, None).await.unwrap();
        a.set_property(&ctx, "knows", "text".into()).await.unwrap();
        let uuid = a.uuid().unwrap().to_string();

        let m = Match::resolve(&ctx, &format!("/.V/{uuid}/knows")).await.unwrap();
        assert_eq!(m.kind, PathKind::VertexProperty);

        a.create_link(&ctx, &b, "knows", None).await.unwrap();
        let m = Match::resolve(&ctx, &format!("/.V/{uuid}/knows")).await.unwrap();
        assert_eq!(m.kind, PathKind::VertexOutEdge);
        assert_eq!(m.vertex_edge.as_deref(), Some("knows"));
    }

    #[tokio::test]
    async fn test_last_vertex_token_wins() {
        let ctx = ctx();
        let f = VertexDraft::new(".V").create_folder(&ctx, None).await.unwrap();
        let t = VertexDraft::new("x").create(&ctx, Some(&f)).await.unwrap();

        // The second token is the namespace; the first is a folder name.
        let m = Match::resolve(&ctx, "/.V/.V/x").await.unwrap();
        assert_eq!(m.kind, PathKind::Vertex);
        assert_eq!(m.parent.as_ref(), Some(&f));
        assert_eq!(m.node.as_ref(), Some(&t));
    }

    #[tokio::test]
    async fn test_fs_root_scopes_walk() {
        let graph = Arc::new(MemoryGraph::new());
        let plain = GraphContext::new(graph.clone(), GraphFsConfig::default()).unwrap();
        let top = VertexDraft::new("top").create_folder(&plain, None).await.unwrap();
        let inner = VertexDraft::new("inner").create(&plain, Some(&top)).await.unwrap();

        let config = GraphFsConfig {
            fs_root: Some(top.identifier(&plain, false)),
            ..Default::default()
        };
        let ctx = GraphContext::new(graph, config).unwrap();
        let m = Match::resolve(&ctx, "/inner").await.unwrap();
        assert_eq!(m.node, Some(inner));
        assert_eq!(m.parent.as_ref(), Some(&top));

        let m = Match::resolve(&ctx, "/").await.unwrap();
        assert_eq!(m.node, Some(top));
    }

    #[tokio::test]
    async fn test_missing_fs_root_is_not_found() {
        let config = GraphFsConfig {
            fs_root: Some("root@00000000-0000-4000-8000-000000000000".into()),
            ..Default::default()
        };
        let ctx = GraphContext::new(Arc::new(MemoryGraph::new()), config).unwrap();
        let err = Match::resolve(&ctx, "/x").await.unwrap_err();
        assert!(matches!(err, PathError::NotFound(_)));
    }
}
