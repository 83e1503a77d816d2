//! Shared test utilities for the smak-folio test suite.
//!
//! Builds content trees in temp directories, pins file mtimes, and provides
//! recording fakes for the template engine and HTTP cache collaborators.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let dir = add_set(tmp.path(), "2024", "00-spring", 3);
//! set_mtime(&dir.join("00-spring.html.twig"), days_ago(SystemTime::now(), 10));
//! ```

use std::cell::{Cell, RefCell};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::engine::TemplateEngine;
use crate::http_cache::{CacheRequest, HttpCacheStore};
use crate::types::Set;

// =========================================================================
// Content trees
// =========================================================================

/// Create `<root>/<subpath>/<name>/` with a `<name>.html.twig` template and
/// `items` fake images. Returns the set directory.
pub fn add_set(root: &Path, subpath: &str, name: &str, items: usize) -> PathBuf {
    let dir = add_bare_set(root, subpath, name, items);
    fs::write(dir.join(format!("{name}.html.twig")), format!("{{# {name} #}}")).unwrap();
    dir
}

/// Like [`add_set`] but without a template.
pub fn add_bare_set(root: &Path, subpath: &str, name: &str, items: usize) -> PathBuf {
    let parent = if subpath.is_empty() {
        root.to_path_buf()
    } else {
        root.join(subpath)
    };
    let dir = parent.join(name);
    fs::create_dir_all(&dir).unwrap();
    for i in 1..=items {
        fs::write(dir.join(format!("{i:02}.jpg")), "fake image").unwrap();
    }
    dir
}

/// Set a file's modification time.
pub fn set_mtime(path: &Path, when: SystemTime) {
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(when)
        .unwrap();
}

pub fn days_ago(now: SystemTime, days: u64) -> SystemTime {
    now - Duration::from_secs(days * 86_400)
}

/// Link names in listing order.
pub fn link_names(sets: &[Set]) -> Vec<&str> {
    sets.iter().map(|s| s.link_name.as_str()).collect()
}

// =========================================================================
// Recording collaborators
// =========================================================================

/// Template engine that answers freshness with a fixed value and counts
/// cache flushes.
pub struct RecordingEngine {
    fresh: bool,
    fresh_queries: RefCell<Vec<(String, SystemTime)>>,
    compiled_clears: Cell<usize>,
    template_clears: Cell<usize>,
    fail_clear: Cell<bool>,
}

impl RecordingEngine {
    pub fn new(fresh: bool) -> Self {
        Self {
            fresh,
            fresh_queries: RefCell::new(Vec::new()),
            compiled_clears: Cell::new(0),
            template_clears: Cell::new(0),
            fail_clear: Cell::new(false),
        }
    }

    pub fn fail_clear(&self) {
        self.fail_clear.set(true);
    }

    pub fn fresh_queries(&self) -> Vec<(String, SystemTime)> {
        self.fresh_queries.borrow().clone()
    }

    pub fn compiled_clears(&self) -> usize {
        self.compiled_clears.get()
    }

    pub fn template_clears(&self) -> usize {
        self.template_clears.get()
    }
}

impl TemplateEngine for RecordingEngine {
    fn is_template_fresh(&self, template_id: &str, reference: SystemTime) -> bool {
        self.fresh_queries
            .borrow_mut()
            .push((template_id.to_string(), reference));
        self.fresh
    }

    fn compiled_artifact_path(&self, template_id: &str) -> PathBuf {
        PathBuf::from("/nonexistent/smak-folio-compiled").join(template_id)
    }

    fn clear_compiled_cache(&self) -> io::Result<()> {
        self.compiled_clears.set(self.compiled_clears.get() + 1);
        if self.fail_clear.get() {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        Ok(())
    }

    fn clear_template_cache(&self) {
        self.template_clears.set(self.template_clears.get() + 1);
    }
}

/// HTTP cache that records invalidated URIs and cleanup calls.
#[derive(Default)]
pub struct RecordingHttpCache {
    invalidated: RefCell<Vec<String>>,
    cleanups: Cell<usize>,
    fail_invalidate: Cell<bool>,
    fail_cleanup: Cell<bool>,
}

impl RecordingHttpCache {
    pub fn fail_invalidate(&self) {
        self.fail_invalidate.set(true);
    }

    pub fn fail_cleanup(&self) {
        self.fail_cleanup.set(true);
    }

    pub fn invalidated(&self) -> Vec<String> {
        self.invalidated.borrow().clone()
    }

    pub fn cleanups(&self) -> usize {
        self.cleanups.get()
    }
}

impl HttpCacheStore for RecordingHttpCache {
    fn invalidate(&self, request: &CacheRequest) -> io::Result<()> {
        if self.fail_invalidate.get() {
            return Err(io::Error::other("store offline"));
        }
        self.invalidated.borrow_mut().push(request.uri.clone());
        Ok(())
    }

    fn cleanup(&self) -> io::Result<()> {
        self.cleanups.set(self.cleanups.get() + 1);
        if self.fail_cleanup.get() {
            return Err(io::Error::other("store offline"));
        }
        Ok(())
    }
}
