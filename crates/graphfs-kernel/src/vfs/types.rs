//! Core VFS types.
//!
//! Path-based, no inodes. Attributes are built from vertex properties by
//! the dispatcher.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }

    /// Returns true if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        matches!(self, FileType::Symlink)
    }
}

/// File attributes (metadata).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAttr {
    /// Size in bytes.
    pub size: u64,
    /// File type.
    pub kind: FileType,
    /// Unix permissions (e.g., 0o644).
    pub perm: u32,
    /// Last modification time.
    pub mtime: SystemTime,
    /// Creation time (optional).
    pub ctime: Option<SystemTime>,
    /// Number of hard links.
    pub nlink: u32,
    /// Owner user ID.
    pub uid: Option<u32>,
    /// Owner group ID.
    pub gid: Option<u32>,
}

impl FileAttr {
    /// Attributes for a file.
    pub fn file(size: u64, perm: u32) -> Self {
        let now = SystemTime::now();
        Self {
            size,
            kind: FileType::File,
            perm,
            mtime: now,
            ctime: Some(now),
            nlink: 1,
            uid: None,
            gid: None,
        }
    }

    /// Attributes for a directory.
    pub fn directory(perm: u32) -> Self {
        let now = SystemTime::now();
        Self {
            size: 0,
            kind: FileType::Directory,
            perm,
            mtime: now,
            ctime: Some(now),
            nlink: 2, // . and ..
            uid: None,
            gid: None,
        }
    }

    /// Attributes for a symlink.
    pub fn symlink(target_len: u64) -> Self {
        let now = SystemTime::now();
        Self {
            size: target_len,
            kind: FileType::Symlink,
            perm: 0o777,
            mtime: now,
            ctime: Some(now),
            nlink: 1,
            uid: None,
            gid: None,
        }
    }

    /// Set owner and group.
    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = Some(uid);
        self.gid = Some(gid);
        self
    }

    /// Set creation and modification times from Unix seconds.
    pub fn with_times(mut self, created: Option<i64>, modified: Option<i64>) -> Self {
        if let Some(created) = created.and_then(from_unix_secs) {
            self.ctime = Some(created);
        }
        if let Some(modified) = modified.and_then(from_unix_secs) {
            self.mtime = modified;
        }
        self
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Returns true if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.kind.is_symlink()
    }
}

fn from_unix_secs(secs: i64) -> Option<SystemTime> {
    u64::try_from(secs)
        .ok()
        .map(|s| UNIX_EPOCH + Duration::from_secs(s))
}

/// Directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Entry type.
    pub kind: FileType,
}

impl DirEntry {
    /// Create a new directory entry.
    pub fn new(name: impl Into<String>, kind: FileType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Create a file entry.
    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, FileType::File)
    }

    /// Create a directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        Self::new(name, FileType::Directory)
    }

    /// Create a symlink entry.
    pub fn symlink(name: impl Into<String>) -> Self {
        Self::new(name, FileType::Symlink)
    }
}

/// Attributes to set (for setattr operation).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetAttr {
    /// New size (truncate).
    pub size: Option<u64>,
    /// New permissions.
    pub perm: Option<u32>,
    /// New user ID.
    pub uid: Option<u32>,
    /// New group ID.
    pub gid: Option<u32>,
}

impl SetAttr {
    /// Create a new empty SetAttr.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Set permissions.
    pub fn with_perm(mut self, perm: u32) -> Self {
        self.perm = Some(perm);
        self
    }

    /// Set owner.
    pub fn with_owner(mut self, uid: Option<u32>, gid: Option<u32>) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }
}

/// Filesystem statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatFs {
    /// Total blocks.
    pub blocks: u64,
    /// Free blocks.
    pub bfree: u64,
    /// Available blocks (to non-root).
    pub bavail: u64,
    /// Total inodes.
    pub files: u64,
    /// Free inodes.
    pub ffree: u64,
    /// Block size.
    pub bsize: u32,
    /// Maximum name length.
    pub namelen: u32,
    /// Fragment size.
    pub frsize: u32,
}

impl Default for StatFs {
    fn default() -> Self {
        Self {
            blocks: 1024 * 1024,
            bfree: 512 * 1024,
            bavail: 512 * 1024,
            files: 1024 * 1024,
            ffree: 512 * 1024,
            bsize: 4096,
            namelen: 255,
            frsize: 4096,
        }
    }
}

/// Open file flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    /// Read access requested.
    pub read: bool,
    /// Write access requested.
    pub write: bool,
    /// Truncate on open.
    pub truncate: bool,
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self {
            read: true,
            write: false,
            truncate: false,
        }
    }
}

impl OpenFlags {
    /// Read-only access.
    pub fn read() -> Self {
        Self::default()
    }

    /// Write access (also enables read).
    pub fn write() -> Self {
        Self {
            read: true,
            write: true,
            ..Default::default()
        }
    }

    /// Write access, truncating existing content.
    pub fn write_truncate() -> Self {
        Self {
            read: true,
            write: true,
            truncate: true,
        }
    }

    /// Returns true if the open may modify the file.
    pub fn mutates(&self) -> bool {
        self.write || self.truncate
    }
}
