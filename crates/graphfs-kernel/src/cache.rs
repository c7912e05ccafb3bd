//! Short-lived result cache in front of a [`VfsOps`].
//!
//! `getattr` and `readdir` results are kept per `(path, op)` until they
//! expire. Mutations evict the touched path and its parent listing; other
//! paths that observe the same vertex (flat-namespace aliases, link targets)
//! may stay stale until expiry.
//!
//! The map is bounded: expired entries are swept once per expiry period,
//! and at capacity the entries closest to expiry go first.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::trace;

use crate::config::GraphFsConfig;
use crate::path::split_path;
use crate::vfs::{DirEntry, FileAttr, OpenFlags, StatFs, VfsOps, VfsResult};

/// Default maximum number of cached results.
const DEFAULT_MAX_CACHED: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CachedOp {
    Getattr,
    Readdir,
}

#[derive(Debug, Clone)]
enum CachedValue {
    Attr(FileAttr),
    Entries(Vec<DirEntry>),
}

struct CacheEntry {
    value: CachedValue,
    expires: Instant,
}

/// Caching wrapper. A zero expiry disables caching.
pub struct CachingFs<F> {
    inner: F,
    entries: DashMap<(String, CachedOp), CacheEntry>,
    expiry: Duration,
    max_cached: usize,
    next_sweep: Mutex<Instant>,
}

impl<F: VfsOps> CachingFs<F> {
    pub fn new(inner: F, expiry: Duration) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
            expiry,
            max_cached: DEFAULT_MAX_CACHED,
            next_sweep: Mutex::new(Instant::now() + expiry),
        }
    }

    /// Cap the number of cached results (at least one).
    pub fn with_max_cached(mut self, max_cached: usize) -> Self {
        self.max_cached = max_cached.max(1);
        self
    }

    /// Expiry from `cache_expiry_secs`, or disabled when `caching` is off.
    pub fn from_config(inner: F, config: &GraphFsConfig) -> Self {
        let expiry = if config.caching {
            Duration::from_secs(config.cache_expiry_secs)
        } else {
            Duration::ZERO
        };
        Self::new(inner, expiry)
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    pub fn enabled(&self) -> bool {
        !self.expiry.is_zero()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.expires > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn key(path: &Path, op: CachedOp) -> (String, CachedOp) {
        (format!("/{}", split_path(&path.to_string_lossy()).join("/")), op)
    }

    fn lookup(&self, path: &Path, op: CachedOp) -> Option<CachedValue> {
        if !self.enabled() {
            return None;
        }
        let key = Self::key(path, op);
        let hit = {
            let entry = self.entries.get(&key)?;
            (entry.expires > Instant::now()).then(|| entry.value.clone())
        };
        if hit.is_none() {
            self.entries.remove(&key);
        }
        hit
    }

    fn store(&self, path: &Path, op: CachedOp, value: CachedValue) {
        if !self.enabled() {
            return;
        }
        let now = Instant::now();
        self.evict_if_needed(now);
        self.entries.insert(
            Self::key(path, op),
            CacheEntry {
                value,
                expires: now + self.expiry,
            },
        );
    }

    /// Sweep expired entries when a sweep is due or the cache is full, then
    /// make room for one more.
    fn evict_if_needed(&self, now: Instant) {
        let sweep_due = {
            let mut next = self.next_sweep.lock();
            if now >= *next {
                *next = now + self.expiry;
                true
            } else {
                false
            }
        };
        if sweep_due || self.entries.len() >= self.max_cached {
            self.entries.retain(|_, e| e.expires > now);
        }
        while self.entries.len() >= self.max_cached {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.expires)
                .map(|e| e.key().clone());
            let Some(key) = oldest else {
                break;
            };
            self.entries.remove(&key);
            trace!(path = %key.0, "cache full, dropped oldest");
        }
    }

    /// Drop cached results for `path` and its parent's listing.
    fn evict(&self, path: &Path) {
        self.entries.remove(&Self::key(path, CachedOp::Getattr));
        self.entries.remove(&Self::key(path, CachedOp::Readdir));
        let mut segments = split_path(&path.to_string_lossy());
        if segments.pop().is_some() {
            let parent = PathBuf::from(format!("/{}", segments.join("/")));
            self.entries.remove(&Self::key(&parent, CachedOp::Getattr));
            self.entries.remove(&Self::key(&parent, CachedOp::Readdir));
        }
        trace!(path = %path.display(), "cache evict");
    }
}

#[async_trait]
impl<F: VfsOps> VfsOps for CachingFs<F> {
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        if let Some(CachedValue::Attr(attr)) = self.lookup(path, CachedOp::Getattr) {
            return Ok(attr);
        }
        let attr = self.inner.getattr(path).await?;
        self.store(path, CachedOp::Getattr, CachedValue::Attr(attr.clone()));
        Ok(attr)
    }

    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        if let Some(CachedValue::Entries(entries)) = self.lookup(path, CachedOp::Readdir) {
            return Ok(entries);
        }
        let entries = self.inner.readdir(path).await?;
        self.store(path, CachedOp::Readdir, CachedValue::Entries(entries.clone()));
        Ok(entries)
    }

    async fn open(&self, path: &Path, flags: OpenFlags) -> VfsResult<()> {
        let result = self.inner.open(path, flags).await;
        if flags.truncate {
            self.evict(path);
        }
        result
    }

    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        self.inner.read(path, offset, size).await
    }

    async fn readlink(&self, path: &Path) -> VfsResult<PathBuf> {
        self.inner.readlink(path).await
    }

    async fn access(&self, path: &Path, mask: u32) -> VfsResult<()> {
        self.inner.access(path, mask).await
    }

    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> VfsResult<u32> {
        let result = self.inner.write(path, offset, data).await;
        self.evict(path);
        result
    }

    async fn create(&self, path: &Path, mode: u32) -> VfsResult<FileAttr> {
        let result = self.inner.create(path, mode).await;
        self.evict(path);
        result
    }

    async fn mkdir(&self, path: &Path, mode: u32) -> VfsResult<FileAttr> {
        let result = self.inner.mkdir(path, mode).await;
        self.evict(path);
        result
    }

    async fn mknod(&self, path: &Path, mode: u32, rdev: u32) -> VfsResult<FileAttr> {
        let result = self.inner.mknod(path, mode, rdev).await;
        self.evict(path);
        result
    }

    async fn unlink(&self, path: &Path) -> VfsResult<()> {
        let result = self.inner.unlink(path).await;
        self.evict(path);
        result
    }

    async fn rmdir(&self, path: &Path) -> VfsResult<()> {
        let result = self.inner.rmdir(path).await;
        self.evict(path);
        result
    }

    async fn rename(&self, from: &Path, to: &Path) -> VfsResult<()> {
        let result = self.inner.rename(from, to).await;
        self.evict(from);
        self.evict(to);
        result
    }

    async fn truncate(&self, path: &Path, size: u64) -> VfsResult<()> {
        let result = self.inner.truncate(path, size).await;
        self.evict(path);
        result
    }

    async fn chmod(&self, path: &Path, mode: u32) -> VfsResult<()> {
        let result = self.inner.chmod(path, mode).await;
        self.evict(path);
        result
    }

    async fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> VfsResult<()> {
        let result = self.inner.chown(path, uid, gid).await;
        self.evict(path);
        result
    }

    async fn symlink(&self, path: &Path, target: &Path) -> VfsResult<FileAttr> {
        let result = self.inner.symlink(path, target).await;
        self.evict(path);
        result
    }

    async fn link(&self, oldpath: &Path, newpath: &Path) -> VfsResult<FileAttr> {
        let result = self.inner.link(oldpath, newpath).await;
        self.evict(newpath);
        result
    }

    async fn flush(&self, path: &Path) -> VfsResult<()> {
        self.inner.flush(path).await
    }

    async fn fsync(&self, path: &Path, datasync: bool) -> VfsResult<()> {
        self.inner.fsync(path, datasync).await
    }

    async fn release(&self, path: &Path) -> VfsResult<()> {
        self.inner.release(path).await
    }

    fn read_only(&self) -> bool {
        self.inner.read_only()
    }

    async fn statfs(&self) -> VfsResult<StatFs> {
        self.inner.statfs().await
    }
}
