//! # graphfs-kernel
//!
//! A property graph exposed as a filesystem.
//!
//! Vertices are files and folders, containment edges give the tree, and a
//! flat namespace (`.V`) addresses any vertex, its properties and its edges
//! directly:
//! - `/a/b/file` - a vertex reached by containment
//! - `/.V/<id>/<property>` - a property as a file
//! - `/.V/<id>/EI/<edge>`, `/.V/<id>/EO/<edge>` - edges as symlinks
//!
//! [`GraphFs`] dispatches filesystem calls ([`VfsOps`]) to the resolver and
//! node facade over any [`GraphEngine`]; [`CachingFs`] adds a short-lived
//! result cache in front of it.

pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod context;
pub mod fs;
pub mod graph;
pub mod ident;
pub mod node;
pub mod path;
pub mod splice;
pub mod vfs;

pub use bootstrap::{ensure_root, register};
pub use cache::CachingFs;
pub use config::{ConfigError, EntryKind, GraphFsConfig, LabelRule};
pub use context::GraphContext;
pub use fs::GraphFs;
pub use graph::{GraphEngine, GraphError, GraphResult, MemoryGraph, PropertyValue};
pub use ident::{EdgeIdentifier, Identifier, IdentifierCodec};
pub use node::{Edge, Element, Vertex, VertexDraft};
pub use path::{Match, PathError, PathKind, PathResult, TypeHint};
pub use splice::irepl;
pub use vfs::{
    DirEntry, FileAttr, FileType, OpenFlags, SetAttr, StatFs, VfsError, VfsOps, VfsResult,
};
