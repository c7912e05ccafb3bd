//! Graph-backed filesystem.
//!
//! Every call resolves its path to a [`Match`], runs the per-kind
//! operation and translates the outcome into the [`VfsOps`] surface. This is
//! the only place errors become POSIX errors: typed path errors map to
//! their natural codes, anything unexpected (including graph engine
//! failures) is logged and reported as not found.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::context::GraphContext;
use crate::node::{keys, Element, Vertex};
use crate::path::{split_path, Match, PathError, PathKind, TypeHint};
use crate::vfs::{DirEntry, FileAttr, OpenFlags, StatFs, VfsError, VfsOps, VfsResult};

impl From<PathError> for VfsError {
    fn from(e: PathError) -> Self {
        match e {
            PathError::NotFound(p) => VfsError::NotFound(p),
            PathError::AlreadyExists(p) => VfsError::AlreadyExists(p),
            PathError::IsFolder(p) => VfsError::IsADirectory(p),
            PathError::IsFile(p) => VfsError::NotADirectory(p),
            PathError::NotSupported(what) => VfsError::NotSupported(what),
            PathError::NotEmpty(p) => VfsError::DirectoryNotEmpty(p),
            PathError::Protected(p) => VfsError::PermissionDenied(p),
            PathError::Graph(err) => {
                warn!(error = %err, "graph failure reported as not found");
                VfsError::NotFound(err.to_string())
            }
        }
    }
}

/// A property graph exposed through [`VfsOps`].
#[derive(Debug, Clone)]
pub struct GraphFs {
    ctx: GraphContext,
}

impl GraphFs {
    pub fn new(ctx: GraphContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &GraphContext {
        &self.ctx
    }

    async fn resolve(&self, path: &Path) -> VfsResult<Match> {
        Ok(Match::resolve(&self.ctx, &path.to_string_lossy()).await?)
    }

    /// Resolve and require the entry to exist.
    async fn resolve_found(&self, path: &Path) -> VfsResult<Match> {
        let m = self.resolve(path).await?;
        if !m.is_found(&self.ctx).await? {
            return Err(VfsError::not_found(path.display().to_string()));
        }
        Ok(m)
    }

    fn check_writable(&self) -> VfsResult<()> {
        if self.ctx.config().read_only {
            return Err(VfsError::ReadOnly);
        }
        Ok(())
    }

    /// Attributes of a found match.
    async fn attr(&self, m: &Match) -> VfsResult<FileAttr> {
        let ctx = &self.ctx;
        let attr = if m.is_link() {
            let target = m.read_link(ctx).await?;
            FileAttr::symlink(target.len() as u64)
        } else if m.is_folder(ctx) {
            FileAttr::directory(self.mode_of(m.node.as_ref()))
        } else {
            let size = m.content(ctx)?.len() as u64;
            FileAttr::file(size, self.mode_of(m.node.as_ref()))
        };

        let config = ctx.config();
        let node = m.node.as_ref();
        let uid = node
            .and_then(|n| n.int_property(keys::OWNER))
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(config.default_uid);
        let gid = node
            .and_then(|n| n.int_property(keys::GROUP))
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(config.default_gid);
        Ok(attr.with_owner(uid, gid).with_times(
            node.and_then(|n| n.int_property(keys::CREATED)),
            node.and_then(|n| n.int_property(keys::MODIFIED)),
        ))
    }

    fn mode_of(&self, node: Option<&Vertex>) -> u32 {
        node.and_then(|n| n.int_property(keys::MODE))
            .and_then(|v| u32::try_from(v).ok())
            .map(|m| m & 0o7777)
            .unwrap_or(self.ctx.config().default_mode)
    }

    /// Symlink target as a path inside this filesystem.
    fn link_source(&self, link: &Path, target: &Path) -> String {
        let target = target.to_string_lossy();
        let mount = self.ctx.config().mount_prefix();
        if !mount.is_empty() {
            if let Some(rest) = target.strip_prefix(mount) {
                if rest.is_empty() || rest.starts_with('/') {
                    return rest.to_string();
                }
            }
        }
        if target.starts_with('/') {
            return target.into_owned();
        }
        // Relative to the folder holding the link.
        let base = link.parent().unwrap_or_else(|| Path::new("/"));
        base.join(target.as_ref()).to_string_lossy().into_owned()
    }
}

fn dir_entry(name: String, hint: TypeHint) -> DirEntry {
    match hint {
        TypeHint::Folder => DirEntry::directory(name),
        TypeHint::Link => DirEntry::symlink(name),
        TypeHint::File | TypeHint::None => DirEntry::file(name),
    }
}

#[async_trait]
impl VfsOps for GraphFs {
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        debug!(path = %path.display(), "getattr");
        let m = self.resolve_found(path).await?;
        self.attr(&m).await
    }

    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        debug!(path = %path.display(), "readdir");
        let m = self.resolve_found(path).await?;
        let entries = m.read_folder(&self.ctx).await?;
        Ok(entries
            .into_iter()
            .map(|e| dir_entry(e.name, e.hint))
            .collect())
    }

    async fn open(&self, path: &Path, flags: OpenFlags) -> VfsResult<()> {
        debug!(path = %path.display(), ?flags, "open");
        let mut m = self.resolve_found(path).await?;
        if m.is_folder(&self.ctx) {
            return Err(VfsError::is_a_directory(path.display().to_string()));
        }
        if flags.mutates() {
            self.check_writable()?;
        }
        if flags.truncate {
            m.truncate(&self.ctx, 0).await?;
        }
        Ok(())
    }

    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        debug!(path = %path.display(), offset, size, "read");
        let m = self.resolve_found(path).await?;
        Ok(m.read_file(&self.ctx, offset as usize, size as usize)?)
    }

    async fn readlink(&self, path: &Path) -> VfsResult<PathBuf> {
        debug!(path = %path.display(), "readlink");
        let m = self.resolve_found(path).await?;
        if !m.is_link() {
            return Err(VfsError::not_a_symlink(path.display().to_string()));
        }
        Ok(PathBuf::from(m.read_link(&self.ctx).await?))
    }

    async fn access(&self, path: &Path, mask: u32) -> VfsResult<()> {
        debug!(path = %path.display(), mask, "access");
        self.resolve_found(path).await?;
        Ok(())
    }

    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> VfsResult<u32> {
        debug!(path = %path.display(), offset, len = data.len(), "write");
        self.check_writable()?;
        let mut m = self.resolve_found(path).await?;
        let written = m.write_file(&self.ctx, data, offset as usize).await?;
        Ok(written as u32)
    }

    async fn create(&self, path: &Path, mode: u32) -> VfsResult<FileAttr> {
        debug!(path = %path.display(), mode, "create");
        self.check_writable()?;
        let mut m = self.resolve(path).await?;
        m.create_file(&self.ctx, Some(mode)).await?;
        self.attr(&m).await
    }

    async fn mkdir(&self, path: &Path, mode: u32) -> VfsResult<FileAttr> {
        debug!(path = %path.display(), mode, "mkdir");
        self.check_writable()?;
        let mut m = self.resolve(path).await?;
        m.create_folder(&self.ctx, Some(mode)).await?;
        self.attr(&m).await
    }

    async fn mknod(&self, path: &Path, _mode: u32, _rdev: u32) -> VfsResult<FileAttr> {
        debug!(path = %path.display(), "mknod");
        Err(VfsError::not_supported("mknod"))
    }

    async fn unlink(&self, path: &Path) -> VfsResult<()> {
        debug!(path = %path.display(), "unlink");
        self.check_writable()?;
        let mut m = self.resolve_found(path).await?;
        if m.is_link() {
            m.delete_link(&self.ctx).await?;
        } else {
            m.delete_file(&self.ctx).await?;
        }
        Ok(())
    }

    async fn rmdir(&self, path: &Path) -> VfsResult<()> {
        debug!(path = %path.display(), "rmdir");
        self.check_writable()?;
        let mut m = self.resolve_found(path).await?;
        m.delete_folder(&self.ctx).await?;
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> VfsResult<()> {
        debug!(from = %from.display(), to = %to.display(), "rename");
        self.check_writable()?;
        let ctx = &self.ctx;
        if split_path(&from.to_string_lossy()) == split_path(&to.to_string_lossy()) {
            self.resolve_found(from).await?;
            return Ok(());
        }

        let mut source = self.resolve_found(from).await?;
        let mut dest = self.resolve(to).await?;
        source.check_move(ctx, &dest).await?;
        if dest.is_found(ctx).await? {
            let to_display = to.display().to_string();
            match (source.is_folder(ctx), dest.is_folder(ctx)) {
                (false, true) => return Err(VfsError::is_a_directory(to_display)),
                (true, false) => return Err(VfsError::not_a_directory(to_display)),
                _ => {}
            }
            let same_vertex = source.kind == PathKind::AtPath
                && dest.kind == PathKind::AtPath
                && source.node.as_ref().map(|n| n.id()) == dest.node.as_ref().map(|n| n.id());
            if same_vertex {
                return Ok(());
            }
            if dest.is_folder(ctx) {
                dest.delete_folder(ctx).await?;
            } else {
                dest.delete_file(ctx).await?;
            }
        }
        source.move_node(ctx, &dest).await?;
        Ok(())
    }

    async fn truncate(&self, path: &Path, size: u64) -> VfsResult<()> {
        debug!(path = %path.display(), size, "truncate");
        self.check_writable()?;
        let mut m = self.resolve_found(path).await?;
        m.truncate(&self.ctx, size as usize).await?;
        Ok(())
    }

    async fn chmod(&self, path: &Path, mode: u32) -> VfsResult<()> {
        debug!(path = %path.display(), mode, "chmod");
        self.check_writable()?;
        let mut m = self.resolve_found(path).await?;
        m.set_mode(&self.ctx, mode).await?;
        Ok(())
    }

    async fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> VfsResult<()> {
        debug!(path = %path.display(), ?uid, ?gid, "chown");
        self.check_writable()?;
        let mut m = self.resolve_found(path).await?;
        m.set_owner(&self.ctx, uid, gid).await?;
        Ok(())
    }

    async fn symlink(&self, path: &Path, target: &Path) -> VfsResult<FileAttr> {
        debug!(path = %path.display(), target = %target.display(), "symlink");
        self.check_writable()?;
        let link = self.resolve(path).await?;
        let source_path = self.link_source(path, target);
        let source = Match::resolve(&self.ctx, &source_path).await?;
        if !source.is_found(&self.ctx).await? || source.node.is_none() {
            return Err(VfsError::not_found(source_path));
        }
        link.create_link(&self.ctx, &source).await?;
        self.attr(&link).await
    }

    async fn link(&self, _oldpath: &Path, newpath: &Path) -> VfsResult<FileAttr> {
        debug!(path = %newpath.display(), "link");
        Err(VfsError::not_supported("hard links"))
    }

    async fn flush(&self, _path: &Path) -> VfsResult<()> {
        Ok(())
    }

    async fn fsync(&self, _path: &Path, _datasync: bool) -> VfsResult<()> {
        Ok(())
    }

    async fn release(&self, _path: &Path) -> VfsResult<()> {
        Ok(())
    }

    fn read_only(&self) -> bool {
        self.ctx.config().read_only
    }

    async fn statfs(&self) -> VfsResult<StatFs> {
        Ok(StatFs::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphFsConfig;
    use crate::graph::MemoryGraph;
    use crate::vfs::SetAttr;
    use std::sync::Arc;

    fn fs_with(config: GraphFsConfig) -> GraphFs {
        GraphFs::new(GraphContext::new(Arc::new(MemoryGraph::new()), config).unwrap())
    }

    fn fs() -> GraphFs {
        fs_with(GraphFsConfig::default())
    }

    fn p(s: &str) -> &Path {
        Path::new(s)
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let fs = fs();
        fs.mkdir(p("/folder1"), 0o755).await.unwrap();
        let attr = fs.create(p("/folder1/test1"), 0o644).await.unwrap();
        assert!(attr.is_file());
        assert_eq!(attr.perm, 0o644);

        fs.write(p("/folder1/test1"), 0, b"hello").await.unwrap();
        assert_eq!(fs.read(p("/folder1/test1"), 0, 0).await.unwrap(), b"hello");
        assert_eq!(fs.read(p("/folder1/test1"), 1, 3).await.unwrap(), b"ell");

        let attr = fs.getattr(p("/folder1/test1")).await.unwrap();
        assert_eq!(attr.size, 5);
        assert_eq!(attr.uid, Some(1001));
    }

    #[tokio::test]
    async fn test_getattr_kinds() {
        let fs = fs();
        assert!(fs.getattr(p("/")).await.unwrap().is_dir());
        assert!(fs.getattr(p("/.V")).await.unwrap().is_dir());
        fs.mkdir(p("/d"), 0o755).await.unwrap();
        let attr = fs.getattr(p("/d")).await.unwrap();
        assert!(attr.is_dir());
        assert_eq!(attr.perm, 0o755);

        let err = fs.getattr(p("/missing")).await.unwrap_err();
        assert_eq!(err.errno(), libc::ENOENT);
    }

    #[tokio::test]
    async fn test_readdir() {
        let fs = fs();
        fs.mkdir(p("/d"), 0o755).await.unwrap();
        fs.create(p("/d/f"), 0o644).await.unwrap();
        let entries = fs.readdir(p("/d")).await.unwrap();
        assert_eq!(entries, vec![DirEntry::directory(".V"), DirEntry::file("f")]);
    }

    #[tokio::test]
    async fn test_create_existing_is_eexist() {
        let fs = fs();
        fs.create(p("/a"), 0o644).await.unwrap();
        let err = fs.create(p("/a"), 0o644).await.unwrap_err();
        assert_eq!(err.errno(), libc::EEXIST);
    }

    #[tokio::test]
    async fn test_unlink_and_rmdir() {
        let fs = fs();
        fs.mkdir(p("/d"), 0o755).await.unwrap();
        fs.create(p("/d/f"), 0o644).await.unwrap();

        assert_eq!(fs.rmdir(p("/d")).await.unwrap_err().errno(), libc::ENOTEMPTY);
        assert_eq!(fs.unlink(p("/d")).await.unwrap_err().errno(), libc::EISDIR);

        fs.unlink(p("/d/f")).await.unwrap();
        fs.rmdir(p("/d")).await.unwrap();
        assert!(!fs.exists(p("/d")).await);
    }

    #[tokio::test]
    async fn test_rename_replaces_destination() {
        let fs = fs();
        fs.create(p("/a"), 0o644).await.unwrap();
        fs.write(p("/a"), 0, b"aaa").await.unwrap();
        fs.create(p("/b"), 0o644).await.unwrap();
        fs.write(p("/b"), 0, b"bbb").await.unwrap();

        fs.rename(p("/a"), p("/b")).await.unwrap();
        assert!(!fs.exists(p("/a")).await);
        assert_eq!(fs.read_all(p("/b")).await.unwrap(), b"aaa");

        // Renaming onto itself is a no-op.
        fs.rename(p("/b"), p("/b")).await.unwrap();
        assert!(fs.exists(p("/b")).await);
    }

    #[tokio::test]
    async fn test_truncate_and_write_all() {
        let fs = fs();
        fs.write_all(p("/a"), b"hello world").await.unwrap();
        fs.truncate(p("/a"), 5).await.unwrap();
        assert_eq!(fs.read_all(p("/a")).await.unwrap(), b"hello");
        fs.write_all(p("/a"), b"xy").await.unwrap();
        assert_eq!(fs.read_all(p("/a")).await.unwrap(), b"xy");
    }

    #[tokio::test]
    async fn test_symlink_lifecycle() {
        let config = GraphFsConfig {
            mount_point: Some("/mnt/graph".into()),
            ..Default::default()
        };
        let fs = fs_with(config);
        fs.mkdir(p("/f"), 0o755).await.unwrap();
        fs.create(p("/a"), 0o644).await.unwrap();
        fs.create(p("/f/b"), 0o644).await.unwrap();

        let ctx = fs.context();
        let a = Match::resolve(ctx, "/a").await.unwrap().node.unwrap();
        let link = format!("/.V/{}/EO/link1@knows", a.identifier(ctx, false));

        let attr = fs.symlink(p(&link), p("/mnt/graph/f/b")).await.unwrap();
        assert!(attr.is_symlink());
        assert!(fs.getattr(p(&link)).await.unwrap().is_symlink());
        assert_eq!(
            fs.readlink(p(&link)).await.unwrap(),
            PathBuf::from("/mnt/graph/f/b")
        );

        fs.unlink(p(&link)).await.unwrap();
        assert!(!fs.exists(p(&link)).await);
    }

    #[tokio::test]
    async fn test_readlink_on_file() {
        let fs = fs();
        fs.create(p("/a"), 0o644).await.unwrap();
        assert_eq!(fs.readlink(p("/a")).await.unwrap_err().errno(), libc::EINVAL);
    }

    #[tokio::test]
    async fn test_chmod_chown() {
        let fs = fs();
        fs.create(p("/a"), 0o644).await.unwrap();
        fs.chmod(p("/a"), 0o600).await.unwrap();
        fs.chown(p("/a"), Some(42), Some(43)).await.unwrap();
        let attr = fs.getattr(p("/a")).await.unwrap();
        assert_eq!(attr.perm, 0o600);
        assert_eq!(attr.uid, Some(42));
        assert_eq!(attr.gid, Some(43));
    }

    #[tokio::test]
    async fn test_read_only() {
        let config = GraphFsConfig {
            read_only: true,
            ..Default::default()
        };
        let fs = fs_with(config);
        assert!(fs.read_only());
        let err = fs.create(p("/a"), 0o644).await.unwrap_err();
        assert_eq!(err.errno(), libc::EROFS);
        assert!(fs.readdir(p("/")).await.is_ok());
    }

    #[tokio::test]
    async fn test_unsupported_ops() {
        let fs = fs();
        assert_eq!(
            fs.mknod(p("/n"), 0o644, 0).await.unwrap_err().errno(),
            libc::ENOTTY
        );
        fs.create(p("/a"), 0o644).await.unwrap();
        assert_eq!(
            fs.link(p("/a"), p("/b")).await.unwrap_err().errno(),
            libc::ENOTTY
        );
        assert_eq!(fs.statfs().await.unwrap(), StatFs::default());
    }

    #[tokio::test]
    async fn test_open_and_access() {
        let fs = fs();
        fs.mkdir(p("/d"), 0o755).await.unwrap();
        fs.create(p("/a"), 0o644).await.unwrap();
        fs.write(p("/a"), 0, b"abc").await.unwrap();

        fs.open(p("/a"), OpenFlags::read()).await.unwrap();
        fs.open(p("/a"), OpenFlags::write()).await.unwrap();
        assert_eq!(fs.read_all(p("/a")).await.unwrap(), b"abc");
        assert_eq!(
            fs.open(p("/d"), OpenFlags::read()).await.unwrap_err().errno(),
            libc::EISDIR
        );
        fs.open(p("/a"), OpenFlags::write_truncate()).await.unwrap();
        assert!(fs.read_all(p("/a")).await.unwrap().is_empty());

        fs.access(p("/a"), 0).await.unwrap();
        assert_eq!(fs.access(p("/zz"), 0).await.unwrap_err().errno(), libc::ENOENT);
    }

    #[tokio::test]
    async fn test_setattr_applies_size_mode_owner() {
        let fs = fs();
        fs.write_all(p("/a"), b"hello").await.unwrap();
        let attr = fs
            .setattr(
                p("/a"),
                SetAttr::new()
                    .with_size(2)
                    .with_perm(0o600)
                    .with_owner(Some(7), None),
            )
            .await
            .unwrap();
        assert_eq!(attr.size, 2);
        assert_eq!(attr.perm, 0o600);
        assert_eq!(attr.uid, Some(7));
        assert_eq!(fs.read_all(p("/a")).await.unwrap(), b"he");
    }

    #[tokio::test]
    async fn test_addressing_properties_are_protected() {
        let fs = fs();
        fs.create(p("/a"), 0o644).await.unwrap();
        let ctx = fs.context();
        let a = Match::resolve(ctx, "/a").await.unwrap().node.unwrap();
        let uuid = a.uuid().unwrap().to_string();
        let base = format!("/.V/{uuid}");
        let prop = |name: &str| format!("{base}/{name}");

        let eperm = |err: VfsError| assert_eq!(err.errno(), libc::EPERM);
        eperm(fs.write(p(&prop("uuid")), 0, b"x").await.unwrap_err());
        eperm(fs.truncate(p(&prop("uuid")), 0).await.unwrap_err());
        eperm(fs.open(p(&prop("uuid")), OpenFlags::write_truncate()).await.unwrap_err());
        eperm(fs.unlink(p(&prop("namespace"))).await.unwrap_err());
        eperm(fs.unlink(p(&prop("uuid"))).await.unwrap_err());

        fs.create(p(&prop("color")), 0o644).await.unwrap();
        eperm(fs.rename(p(&prop("color")), p(&prop("uuid"))).await.unwrap_err());
        eperm(fs.rename(p(&prop("namespace")), p(&prop("ns"))).await.unwrap_err());

        // Still reachable and readable under its identity.
        assert_eq!(fs.read_all(p(&prop("uuid"))).await.unwrap(), uuid.as_bytes());
        assert!(fs.exists(p(&prop("namespace"))).await);
        assert!(fs.exists(p(&prop("color"))).await);
        let names: Vec<String> = fs
            .readdir(p("/"))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert!(names.contains(&"a".to_string()));
    }

    #[tokio::test]
    async fn test_no_entries_under_files() {
        let fs = fs();
        fs.create(p("/f"), 0o644).await.unwrap();
        fs.create(p("/g"), 0o644).await.unwrap();

        let enotdir = |err: VfsError| assert_eq!(err.errno(), libc::ENOTDIR);
        enotdir(fs.create(p("/f/child"), 0o644).await.unwrap_err());
        enotdir(fs.mkdir(p("/f/sub"), 0o755).await.unwrap_err());
        enotdir(fs.rename(p("/g"), p("/f/g")).await.unwrap_err());

        assert!(fs.exists(p("/g")).await);
        assert_eq!(fs.read_all(p("/f")).await.unwrap(), b"");
        enotdir(fs.readdir(p("/f")).await.unwrap_err());
    }

    #[tokio::test]
    async fn test_ignored_write_keeps_modified() {
        let fs = fs();
        fs.write_all(p("/a"), b"abc").await.unwrap();
        let ctx = fs.context();
        let mut a = Match::resolve(ctx, "/a").await.unwrap().node.unwrap();
        a.set_property(ctx, keys::MODIFIED, 0i64.into()).await.unwrap();

        // Past the end: nothing stored, length still reported.
        assert_eq!(fs.write(p("/a"), 10, b"zz").await.unwrap(), 2);
        let a = Match::resolve(ctx, "/a").await.unwrap().node.unwrap();
        assert_eq!(a.int_property(keys::MODIFIED), Some(0));
        assert_eq!(fs.read_all(p("/a")).await.unwrap(), b"abc");

        fs.write(p("/a"), 3, b"d").await.unwrap();
        let a = Match::resolve(ctx, "/a").await.unwrap().node.unwrap();
        assert!(a.int_property(keys::MODIFIED).unwrap() > 0);
    }

    #[tokio::test]
    async fn test_graph_failure_folds_to_enoent() {
        let err: VfsError = PathError::Graph(crate::graph::GraphError::backend("down")).into();
        assert_eq!(err.errno(), libc::ENOENT);
    }
}
