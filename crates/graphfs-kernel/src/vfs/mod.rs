//! Filesystem-call surface.
//!
//! - [`VfsOps`] - the operations a FUSE shim calls
//! - [`VfsError`] - the only error type with POSIX meaning ([`VfsError::errno`])
//! - [`FileAttr`], [`DirEntry`], [`StatFs`], ... - plain data exchanged
//!
//! Implemented by [`GraphFs`](crate::GraphFs) and wrapped by
//! [`CachingFs`](crate::CachingFs).

mod error;
mod ops;
mod types;

pub use error::{VfsError, VfsResult};
pub use ops::VfsOps;
pub use types::{DirEntry, FileAttr, FileType, OpenFlags, SetAttr, StatFs};
