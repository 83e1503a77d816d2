//! Downstream HTTP response cache.
//!
//! Rendered pages are cached by the web layer, keyed by request URI. When a
//! template is found stale the cached page for the current request has to go
//! too, otherwise the recompiled template would never be seen. The
//! [`HttpCacheStore`] trait is that contract; [`FsHttpCacheStore`] keeps one
//! file per URI under a cache directory.
//!
//! Every removal here is idempotent: a missing entry is not an error, since
//! concurrent requests may race to invalidate the same page.

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

const LOCK_EXTENSION: &str = "lck";

/// The request whose cached representation is being managed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRequest {
    pub uri: String,
}

impl CacheRequest {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

pub trait HttpCacheStore {
    /// Drop any stored representation of `request`.
    fn invalidate(&self, request: &CacheRequest) -> io::Result<()>;

    /// Housekeeping sweep (stale locks and the like).
    fn cleanup(&self) -> io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FsHttpCacheStore {
    dir: PathBuf,
}

impl FsHttpCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn entry_path(&self, request: &CacheRequest) -> PathBuf {
        self.dir.join(entry_key(&request.uri))
    }

    fn lock_path(&self, request: &CacheRequest) -> PathBuf {
        self.dir
            .join(format!("{}.{LOCK_EXTENSION}", entry_key(&request.uri)))
    }

    pub fn store(&self, request: &CacheRequest, body: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.entry_path(request), body)
    }

    pub fn lookup(&self, request: &CacheRequest) -> Option<Vec<u8>> {
        fs::read(self.entry_path(request)).ok()
    }

    /// Mark `request` as being written. Locks left behind by a crashed
    /// render are released by [`HttpCacheStore::cleanup`].
    pub fn lock(&self, request: &CacheRequest) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.lock_path(request), b"")
    }

    pub fn is_locked(&self, request: &CacheRequest) -> bool {
        self.lock_path(request).exists()
    }

    /// Release a lock taken with [`FsHttpCacheStore::lock`].
    pub fn unlock(&self, request: &CacheRequest) -> io::Result<()> {
        remove_if_present(&self.lock_path(request))
    }
}

impl HttpCacheStore for FsHttpCacheStore {
    fn invalidate(&self, request: &CacheRequest) -> io::Result<()> {
        remove_if_present(&self.entry_path(request))?;
        debug!(uri = %request.uri, "invalidated cached response");
        Ok(())
    }

    fn cleanup(&self) -> io::Result<()> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        let mut released = 0usize;
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == LOCK_EXTENSION) {
                remove_if_present(&path)?;
                released += 1;
            }
        }
        debug!(dir = %self.dir.display(), released, "http cache cleanup");
        Ok(())
    }
}

/// SHA-256 of the URI, hex encoded.
fn entry_key(uri: &str) -> String {
    format!("{:x}", Sha256::digest(uri.as_bytes()))
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
