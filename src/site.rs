//! Wiring of the concrete collaborators for one site directory.
//!
//! A [`Site`] owns the filesystem template engine, HTTP cache and clock, and
//! hands out borrowing [`SetProvider`]s and [`FreshnessChecker`]s configured
//! from one [`PortfolioConfig`]. The web layer (or the CLI) builds one per
//! process and one session store per visitor.
//!
//! [`Site::render`] runs the per-request page path on top of them:
//!
//! ```text
//! freshness check ─► cached page? ─┬─► serve it
//!                                  └─► compile if needed ─► cache page ─► serve
//! ```
//!
//! Debug mode bypasses the page cache and recompiles on every render.

use crate::clock::{Clock, SystemClock};
use crate::config::{self, ConfigError, Paths, PortfolioConfig};
use crate::engine::{FsTemplateEngine, TemplateEngine};
use crate::freshness::{FreshnessChecker, TemplateState};
use crate::http_cache::{CacheRequest, FsHttpCacheStore};
use crate::provider::SetProvider;
use crate::scan::Scanner;
use crate::session::FileSessionStore;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Outcome of [`Site::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// What the freshness check found before rendering.
    pub state: TemplateState,
    /// The page was served from the HTTP cache.
    pub cached: bool,
    /// The template was compiled for this render.
    pub compiled: bool,
    pub body: Vec<u8>,
}

pub struct Site {
    config: PortfolioConfig,
    paths: Paths,
    engine: FsTemplateEngine,
    http_cache: FsHttpCacheStore,
    scanner: Scanner,
    clock: Box<dyn Clock>,
}

impl Site {
    /// Load `config.toml` from `dir` and anchor every path there.
    pub fn open(dir: &Path) -> Result<Self, ConfigError> {
        let config = config::load_config(dir)?;
        Self::with_config(config, dir)
    }

    pub fn with_config(config: PortfolioConfig, dir: &Path) -> Result<Self, ConfigError> {
        config.validate()?;
        let paths = Paths::resolve(&config, dir);
        let scanner = Scanner::new(
            &paths.content_root,
            &config.gallery_pattern,
            config.template_suffix.clone(),
        )
        .map_err(|e| ConfigError::Validation(format!("gallery_pattern: {e}")))?;
        let engine = FsTemplateEngine::new(
            vec![paths.templates_dir.clone(), paths.content_root.clone()],
            paths.compiled_dir(),
        );
        let http_cache = FsHttpCacheStore::new(paths.http_cache_dir());

        Ok(Self {
            config,
            paths,
            engine,
            http_cache,
            scanner,
            clock: Box::new(SystemClock),
        })
    }

    /// Replace the wall clock, for reproducible freshness flags.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &PortfolioConfig {
        &self.config
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn engine(&self) -> &FsTemplateEngine {
        &self.engine
    }

    pub fn http_cache(&self) -> &FsHttpCacheStore {
        &self.http_cache
    }

    pub fn provider(&self) -> SetProvider<'_> {
        SetProvider::new(
            self.scanner.clone(),
            self.config.freshness.clone(),
            self.config.debug,
            self.clock.as_ref(),
            &self.engine,
            &self.http_cache,
        )
    }

    pub fn checker(&self) -> FreshnessChecker<'_> {
        FreshnessChecker::new(self.config.debug, &self.engine, &self.http_cache)
    }

    /// File-backed session store for `session_id`.
    pub fn session(&self, session_id: &str) -> FileSessionStore {
        FileSessionStore::new(self.paths.sessions_dir(), session_id)
    }

    /// Produce the page for `request` from `template_id`.
    ///
    /// Fails only when the template cannot be compiled or its artifact read.
    pub fn render(&self, template_id: &str, request: &CacheRequest) -> io::Result<Rendered> {
        let state = self.checker().check(template_id, request);
        let debug_mode = self.config.debug;

        if !debug_mode && let Some(body) = self.http_cache.lookup(request) {
            debug!(template = template_id, uri = %request.uri, "served cached page");
            return Ok(Rendered {
                state,
                cached: true,
                compiled: false,
                body,
            });
        }

        let artifact = self.engine.compiled_artifact_path(template_id);
        let compiled = debug_mode || !artifact.exists();
        if compiled {
            // An evicted template may still be loaded from before the edit.
            if debug_mode || state == TemplateState::Evicted {
                self.engine.clear_template_cache();
            }
            self.engine.compile(template_id)?;
        }
        let body = fs::read(&artifact)?;
        if !debug_mode {
            self.cache_page(request, &body);
        }

        Ok(Rendered {
            state,
            cached: false,
            compiled,
            body,
        })
    }

    /// Store a rendered page unless another worker holds its lock.
    fn cache_page(&self, request: &CacheRequest, body: &[u8]) {
        if self.http_cache.is_locked(request) {
            debug!(uri = %request.uri, "page locked by another render, not caching");
            return;
        }
        let result = self
            .http_cache
            .lock(request)
            .and_then(|()| self.http_cache.store(request, body))
            .and_then(|()| self.http_cache.unlock(request));
        if let Err(e) = result {
            warn!(uri = %request.uri, error = %e, "failed to cache rendered page");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn paths_anchor_at_site_directory() {
        let tmp = TempDir::new().unwrap();
        let site = Site::with_config(PortfolioConfig::default(), tmp.path()).unwrap();

        assert_eq!(site.paths().content_root, tmp.path().join("content"));
        assert!(
            site.engine()
                .compiled_artifact_path("index.html.twig")
                .starts_with(tmp.path().join(".smak-cache/compiled"))
        );
        assert_eq!(
            site.session("abc").path().parent(),
            Some(tmp.path().join(".smak-cache/sessions").as_path())
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let config = PortfolioConfig {
            gallery_pattern: "[oops".to_string(),
            ..PortfolioConfig::default()
        };
        assert!(matches!(
            Site::with_config(config, tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    fn site_with_index(tmp: &TempDir, debug: bool) -> Site {
        fs::create_dir_all(tmp.path().join("templates")).unwrap();
        fs::write(tmp.path().join("templates/index.html.twig"), "<h1>v1</h1>").unwrap();
        let config = PortfolioConfig {
            debug,
            ..PortfolioConfig::default()
        };
        Site::with_config(config, tmp.path()).unwrap()
    }

    #[test]
    fn first_render_compiles_and_caches_the_page() {
        let tmp = TempDir::new().unwrap();
        let site = site_with_index(&tmp, false);
        let request = CacheRequest::new("/");

        let first = site.render("index.html.twig", &request).unwrap();
        assert_eq!(first.state, TemplateState::Evicted);
        assert!(first.compiled);
        assert!(!first.cached);
        assert_eq!(first.body, b"<h1>v1</h1>");
        assert_eq!(site.http_cache().lookup(&request), Some(b"<h1>v1</h1>".to_vec()));
        assert!(!site.http_cache().is_locked(&request));
    }

    #[test]
    fn repeat_render_is_fresh_and_served_from_cache() {
        let tmp = TempDir::new().unwrap();
        let site = site_with_index(&tmp, false);
        let request = CacheRequest::new("/");
        site.render("index.html.twig", &request).unwrap();
        let artifact = site.engine().compiled_artifact_path("index.html.twig");

        for _ in 0..2 {
            let again = site.render("index.html.twig", &request).unwrap();
            assert_eq!(again.state, TemplateState::Fresh);
            assert!(again.cached);
            assert!(!again.compiled);
            assert!(artifact.exists());
        }
    }

    #[test]
    fn edited_template_is_recompiled() {
        let tmp = TempDir::new().unwrap();
        let site = site_with_index(&tmp, false);
        let request = CacheRequest::new("/");
        site.render("index.html.twig", &request).unwrap();

        let artifact = site.engine().compiled_artifact_path("index.html.twig");
        let source = tmp.path().join("templates/index.html.twig");
        let compiled_at = fs::metadata(&artifact).unwrap().modified().unwrap();
        fs::write(&source, "<h1>v2</h1>").unwrap();
        fs::File::options()
            .write(true)
            .open(&source)
            .unwrap()
            .set_modified(compiled_at + std::time::Duration::from_secs(60))
            .unwrap();

        let next = site.render("index.html.twig", &request).unwrap();
        assert_eq!(next.state, TemplateState::Evicted);
        assert!(next.compiled);
        assert_eq!(next.body, b"<h1>v2</h1>");
    }

    #[test]
    fn locked_page_is_rendered_but_not_cached() {
        let tmp = TempDir::new().unwrap();
        let site = site_with_index(&tmp, false);
        let request = CacheRequest::new("/");
        site.http_cache().lock(&request).unwrap();

        let page = site.render("index.html.twig", &request).unwrap();
        assert_eq!(page.body, b"<h1>v1</h1>");
        assert_eq!(site.http_cache().lookup(&request), None);
        assert!(site.http_cache().is_locked(&request));
    }

    #[test]
    fn debug_render_skips_page_cache() {
        let tmp = TempDir::new().unwrap();
        let site = site_with_index(&tmp, true);
        let request = CacheRequest::new("/");

        for _ in 0..2 {
            let page = site.render("index.html.twig", &request).unwrap();
            assert_eq!(page.state, TemplateState::Skipped);
            assert!(page.compiled);
            assert!(!page.cached);
        }
        assert_eq!(site.http_cache().lookup(&request), None);
    }

    #[test]
    fn render_of_missing_template_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let site = site_with_index(&tmp, false);
        let err = site
            .render("missing.html.twig", &CacheRequest::new("/missing"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn open_reads_config_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            "debug = true\ncontent_root = \"galleries\"\n",
        )
        .unwrap();

        let site = Site::open(tmp.path()).unwrap();
        assert!(site.config().debug);
        assert_eq!(site.paths().content_root, tmp.path().join("galleries"));
    }
}
