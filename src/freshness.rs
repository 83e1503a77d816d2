//! Template freshness check run before each render.
//!
//! Two states per template, recomputed on every call and never persisted:
//!
//! ```text
//! artifact mtime >= source mtime  →  Fresh    (nothing to do)
//! artifact mtime <  source mtime  →  Evicted  (artifact deleted,
//!                                              cached page invalidated)
//! ```
//!
//! A missing artifact has mtime 0, so a template that was never compiled is
//! always evicted and its cached page invalidated.
//!
//! In debug mode the engine recompiles on every render anyway, and the check
//! returns [`TemplateState::Skipped`] without touching anything.

use crate::engine::TemplateEngine;
use crate::http_cache::{CacheRequest, HttpCacheStore};
use std::fs;
use std::io;
use std::time::SystemTime;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateState {
    Fresh,
    /// The compiled artifact was stale and has been removed.
    Evicted,
    /// Debug mode: not checked.
    Skipped,
}

pub struct FreshnessChecker<'a> {
    debug: bool,
    engine: &'a dyn TemplateEngine,
    http_cache: &'a dyn HttpCacheStore,
}

impl<'a> FreshnessChecker<'a> {
    pub fn new(
        debug: bool,
        engine: &'a dyn TemplateEngine,
        http_cache: &'a dyn HttpCacheStore,
    ) -> Self {
        Self {
            debug,
            engine,
            http_cache,
        }
    }

    /// Make sure the next render of `template_id` sees its current source.
    ///
    /// Never fails: deletion and invalidation errors are logged and dropped.
    pub fn check(&self, template_id: &str, request: &CacheRequest) -> TemplateState {
        if self.debug {
            return TemplateState::Skipped;
        }

        let artifact = self.engine.compiled_artifact_path(template_id);
        let compiled_at = fs::metadata(&artifact)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        if self.engine.is_template_fresh(template_id, compiled_at) {
            return TemplateState::Fresh;
        }

        match fs::remove_file(&artifact) {
            Ok(()) => debug!(template = template_id, "evicted stale compiled template"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                template = template_id,
                artifact = %artifact.display(),
                error = %e,
                "failed to delete compiled template"
            ),
        }
        if let Err(e) = self.http_cache.invalidate(request) {
            warn!(uri = %request.uri, error = %e, "failed to invalidate cached response");
        }
        TemplateState::Evicted
    }
}
