//! VFS operations trait.
//!
//! The filesystem-call surface: path-based, no inodes, explicit
//! offset/size. A FUSE shim maps its callbacks one-to-one onto these.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::types::{DirEntry, FileAttr, OpenFlags, SetAttr, StatFs};
use super::{VfsError, VfsResult};

/// Core VFS operations trait.
///
/// Paths are absolute within the filesystem (`/` is its root).
#[async_trait]
pub trait VfsOps: Send + Sync {
    // ========================================================================
    // Reading
    // ========================================================================

    /// Get file attributes.
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr>;

    /// Read directory entries.
    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>>;

    /// Check that a file can be opened.
    async fn open(&self, path: &Path, flags: OpenFlags) -> VfsResult<()>;

    /// Read file contents.
    ///
    /// Reads up to `size` bytes starting at `offset`; `size == 0` reads to
    /// the end.
    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>>;

    /// Read symbolic link target.
    async fn readlink(&self, path: &Path) -> VfsResult<PathBuf>;

    /// Check that a path exists. Permission bits are not enforced.
    async fn access(&self, path: &Path, mask: u32) -> VfsResult<()>;

    // ========================================================================
    // Writing
    // ========================================================================

    /// Write data to a file.
    ///
    /// Writes `data` at the specified `offset`.
    /// Returns the number of bytes written.
    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> VfsResult<u32>;

    /// Create a new file.
    ///
    /// Returns the attributes of the newly created file.
    async fn create(&self, path: &Path, mode: u32) -> VfsResult<FileAttr>;

    /// Create a new directory.
    ///
    /// Returns the attributes of the newly created directory.
    async fn mkdir(&self, path: &Path, mode: u32) -> VfsResult<FileAttr>;

    /// Create a device node.
    async fn mknod(&self, path: &Path, mode: u32, rdev: u32) -> VfsResult<FileAttr>;

    /// Remove a file.
    async fn unlink(&self, path: &Path) -> VfsResult<()>;

    /// Remove an empty directory.
    async fn rmdir(&self, path: &Path) -> VfsResult<()>;

    /// Rename a file or directory, replacing an existing destination.
    async fn rename(&self, from: &Path, to: &Path) -> VfsResult<()>;

    /// Truncate a file to the specified size.
    async fn truncate(&self, path: &Path, size: u64) -> VfsResult<()>;

    /// Set permission bits.
    async fn chmod(&self, path: &Path, mode: u32) -> VfsResult<()>;

    /// Set owner and/or group.
    async fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> VfsResult<()>;

    /// Create a symbolic link.
    ///
    /// Creates a symlink at `path` pointing to `target`.
    async fn symlink(&self, path: &Path, target: &Path) -> VfsResult<FileAttr>;

    /// Create a hard link.
    async fn link(&self, oldpath: &Path, newpath: &Path) -> VfsResult<FileAttr>;

    // ========================================================================
    // Handles
    // ========================================================================

    /// Flush buffered data for an open file.
    async fn flush(&self, path: &Path) -> VfsResult<()>;

    /// Synchronise file contents to storage.
    async fn fsync(&self, path: &Path, datasync: bool) -> VfsResult<()>;

    /// Release an open file.
    async fn release(&self, path: &Path) -> VfsResult<()>;

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Returns true if this filesystem is read-only.
    fn read_only(&self) -> bool;

    /// Get filesystem statistics.
    async fn statfs(&self) -> VfsResult<StatFs>;

    // ========================================================================
    // Convenience methods (default implementations)
    // ========================================================================

    /// Set file attributes: size, then mode, then ownership.
    async fn setattr(&self, path: &Path, attr: SetAttr) -> VfsResult<FileAttr> {
        if let Some(size) = attr.size {
            self.truncate(path, size).await?;
        }
        if let Some(perm) = attr.perm {
            self.chmod(path, perm).await?;
        }
        if attr.uid.is_some() || attr.gid.is_some() {
            self.chown(path, attr.uid, attr.gid).await?;
        }
        self.getattr(path).await
    }

    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> bool {
        self.getattr(path).await.is_ok()
    }

    /// Read entire file contents.
    async fn read_all(&self, path: &Path) -> VfsResult<Vec<u8>> {
        self.read(path, 0, 0).await
    }

    /// Write entire file contents.
    ///
    /// Convenience method that truncates and writes the whole file.
    async fn write_all(&self, path: &Path, data: &[u8]) -> VfsResult<()> {
        if self.exists(path).await {
            self.truncate(path, 0).await?;
        } else {
            self.create(path, 0o644).await?;
        }
        let written = self.write(path, 0, data).await?;
        if (written as usize) < data.len() {
            return Err(VfsError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "short write",
            )));
        }
        Ok(())
    }
}
