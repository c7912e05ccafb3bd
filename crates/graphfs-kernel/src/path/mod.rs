//! Path resolution.
//!
//! A slash-delimited path is classified into a [`Match`]: a [`PathKind`]
//! plus the graph elements it resolved to. Two grammars exist:
//!
//! - **containment**: `/a/b/c` walks containment edges from the root,
//!   matching each segment against child identifiers
//! - **flat namespace**: `[prefix]/.V/<id>[/<prop> | /EI[/<edge>] | /EO[/<edge>]]`
//!   addresses any vertex directly, optionally scoped to the children of
//!   the prefix folder
//!
//! Resolution never fails on a missing node: `node == None` is the only
//! not-found signal. Operations on a [`Match`] live in `ops.rs`.

mod error;
mod ops;
mod resolve;

use serde::Serialize;
use strum::{Display, IntoStaticStr};

use crate::node::Vertex;

pub use error::{PathError, PathResult};
pub use ops::ListEntry;

/// Classification of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    /// `/`
    Root,
    /// A containment path.
    AtPath,
    /// `.../.V`
    Vertexes,
    /// `.../.V/<id>`
    Vertex,
    /// `.../.V/<id>/<property>`
    VertexProperty,
    /// `.../.V/<id>/EI`
    VertexInEdges,
    /// `.../.V/<id>/EO`
    VertexOutEdges,
    /// `.../.V/<id>/EI/<edge>`
    VertexInEdge,
    /// `.../.V/<id>/EO/<edge>`, or `.../.V/<id>/<edge>` when such an
    /// outbound edge exists
    VertexOutEdge,
    /// Anything else inside the flat namespace; never found.
    Unresolved,
}

/// Entry type implied by a path kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TypeHint {
    Folder,
    File,
    Link,
    None,
}

impl PathKind {
    /// Static entry type. For `AtPath` this is only a default; the node's
    /// label decides.
    pub fn type_hint(self) -> TypeHint {
        match self {
            PathKind::Root
            | PathKind::Vertexes
            | PathKind::Vertex
            | PathKind::VertexInEdges
            | PathKind::VertexOutEdges => TypeHint::Folder,
            PathKind::AtPath | PathKind::VertexProperty => TypeHint::File,
            PathKind::VertexInEdge | PathKind::VertexOutEdge => TypeHint::Link,
            PathKind::Unresolved => TypeHint::None,
        }
    }

    /// Kinds addressing a single edge.
    pub fn is_edge(self) -> bool {
        matches!(self, PathKind::VertexInEdge | PathKind::VertexOutEdge)
    }
}

/// Resolved, classified path. Ephemeral: valid for one call only.
#[derive(Debug, Clone)]
pub struct Match {
    pub kind: PathKind,
    /// Normalised path segments.
    pub full: Vec<String>,
    /// Resolved target vertex.
    pub node: Option<Vertex>,
    /// Containment parent: the folder an `AtPath` entry lives in, or the
    /// folder scoping a flat-namespace path.
    pub parent: Option<Vertex>,
    /// False when the parent prefix itself did not resolve.
    pub parent_resolved: bool,
    /// Last segment of an `AtPath`.
    pub name: Option<String>,
    pub vertex_id: Option<String>,
    pub vertex_property: Option<String>,
    pub vertex_edge: Option<String>,
    /// Filesystem root vertex, when one is configured.
    pub root: Option<Vertex>,
}

impl Match {
    fn new(kind: PathKind, full: Vec<String>, root: Option<Vertex>) -> Self {
        Self {
            kind,
            full,
            node: None,
            parent: None,
            parent_resolved: true,
            name: None,
            vertex_id: None,
            vertex_property: None,
            vertex_edge: None,
            root,
        }
    }

    pub fn type_hint(&self) -> TypeHint {
        self.kind.type_hint()
    }

    /// The normalised path, `/`-joined.
    pub fn path(&self) -> String {
        format!("/{}", self.full.join("/"))
    }
}

/// Split a path into segments, dropping empty and `.` segments and
/// resolving `..`.
pub fn split_path(path: &str) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s.to_string()),
        }
    }
    segments
}
