//! The set provider: entry point from the web layer into the set pipeline.
//!
//! ```text
//! Scanner ─► session check ─┬─► cached listing
//!                           └─► Enricher ─► Orderer ─► store in session
//!                                                     ─► cache sweep
//! ```
//!
//! The debug flag is read here once and handed down: it bypasses session
//! reuse for the listing. The sweep (compiled templates, loaded templates,
//! HTTP cache housekeeping) runs after every recompute and never fails the
//! request.
//!
//! Lookups on top of the listing ([`SetProvider::sets_for_year`],
//! [`SetProvider::find_set`]) report [`ProviderError`] when nothing matches;
//! the web layer turns that into a 404.

use crate::clock::Clock;
use crate::config::FreshnessConfig;
use crate::engine::TemplateEngine;
use crate::http_cache::HttpCacheStore;
use crate::scan::Scanner;
use crate::session::{self, Origin, SessionStore};
use crate::sets;
use crate::types::{Navigation, Set};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProviderError {
    #[error("no sets found")]
    NoSets,
    #[error("no sets for year {0}")]
    NoSetsForYear(String),
    #[error("set not found: {year}/{name}")]
    SetNotFound { year: String, name: String },
}

pub struct SetProvider<'a> {
    scanner: Scanner,
    freshness: FreshnessConfig,
    debug: bool,
    clock: &'a dyn Clock,
    engine: &'a dyn TemplateEngine,
    http_cache: &'a dyn HttpCacheStore,
}

impl<'a> SetProvider<'a> {
    pub fn new(
        scanner: Scanner,
        freshness: FreshnessConfig,
        debug: bool,
        clock: &'a dyn Clock,
        engine: &'a dyn TemplateEngine,
        http_cache: &'a dyn HttpCacheStore,
    ) -> Self {
        Self {
            scanner,
            freshness,
            debug,
            clock,
            engine,
            http_cache,
        }
    }

    /// The aggregated listing for this session.
    ///
    /// Fails with [`ProviderError::NoSets`] only when the scan matches no
    /// directory at all; a scan whose sets are all filtered out yields an
    /// empty listing.
    pub fn sets(&self, session: &mut dyn SessionStore) -> Result<Vec<Set>, ProviderError> {
        let raw = self.scanner.scan();
        if raw.is_empty() {
            return Err(ProviderError::NoSets);
        }

        let root = self.scanner.root();
        let (listing, origin) = session::get_or_compute(session, self.debug, raw.len(), || {
            sets::aggregate(raw, root, &self.freshness, self.clock)
        });
        if origin == Origin::Computed {
            self.sweep();
        }
        Ok(listing)
    }

    /// Sets filed under `year`, in listing order.
    pub fn sets_for_year(
        &self,
        session: &mut dyn SessionStore,
        year: &str,
    ) -> Result<Vec<Set>, ProviderError> {
        let listing = self.sets(session)?;
        let matching: Vec<Set> = listing.into_iter().filter(|s| s.subpath == year).collect();
        if matching.is_empty() {
            return Err(ProviderError::NoSetsForYear(year.to_string()));
        }
        Ok(matching)
    }

    /// One set and its neighbours in the full listing.
    ///
    /// `set_name` may be the directory name or the link name; an exact
    /// directory match wins over a link-name match.
    pub fn find_set(
        &self,
        session: &mut dyn SessionStore,
        year: &str,
        set_name: &str,
    ) -> Result<(Set, Navigation), ProviderError> {
        let not_found = || ProviderError::SetNotFound {
            year: year.to_string(),
            name: set_name.to_string(),
        };
        let listing = self.sets(session).map_err(|_| not_found())?;

        let in_year = |s: &Set| s.subpath == year;
        let index = listing
            .iter()
            .position(|s| in_year(s) && s.name == set_name)
            .or_else(|| {
                listing
                    .iter()
                    .position(|s| in_year(s) && s.link_name == set_name)
            })
            .ok_or_else(not_found)?;

        let nav = Navigation::around(&listing, index);
        Ok((listing[index].clone(), nav))
    }

    fn sweep(&self) {
        if let Err(e) = self.engine.clear_compiled_cache() {
            warn!(error = %e, "failed to clear compiled templates");
        }
        self.engine.clear_template_cache();
        if let Err(e) = self.http_cache.cleanup() {
            warn!(error = %e, "http cache cleanup failed");
        }
        debug!("cache sweep after recompute");
    }
}
