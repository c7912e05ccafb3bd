//! Resolver and Match operation errors.

use thiserror::Error;

use crate::graph::GraphError;

/// Typed failure of a path-level operation. Carries no POSIX codes; the
/// dispatcher decides how each maps to the filesystem surface.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A file operation addressed a folder.
    #[error("is a folder: {0}")]
    IsFolder(String),

    /// A folder operation addressed a file.
    #[error("is a file: {0}")]
    IsFile(String),

    /// The operation has no meaning for this kind of path.
    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("folder not empty: {0}")]
    NotEmpty(String),

    /// A property that addresses the vertex (`uuid`, `namespace`).
    #[error("protected property: {0}")]
    Protected(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl PathError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    pub fn is_folder(path: impl Into<String>) -> Self {
        Self::IsFolder(path.into())
    }

    pub fn is_file(path: impl Into<String>) -> Self {
        Self::IsFile(path.into())
    }

    pub fn not_supported(what: impl Into<String>) -> Self {
        Self::NotSupported(what.into())
    }

    pub fn not_empty(path: impl Into<String>) -> Self {
        Self::NotEmpty(path.into())
    }

    pub fn protected(path: impl Into<String>) -> Self {
        Self::Protected(path.into())
    }
}

pub type PathResult<T> = Result<T, PathError>;
