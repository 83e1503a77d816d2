//! # smak-folio
//!
//! Set aggregation and template cache coherence for a dated photography
//! portfolio. The filesystem is the data source: gallery directories become
//! sets, each rendered by the template file that sits next to its images.
//!
//! # Architecture: Listing and Freshness
//!
//! Two independent paths run for every page request:
//!
//! ```text
//! 1. Listing     content/  →  Scanner → Enricher → Orderer → session
//! 2. Freshness   template  →  compiled artifact vs source mtime
//! ```
//!
//! The listing is memoized per session and rebuilt when the number of
//! scanned set directories changes; every rebuild sweeps the compiled
//! template and HTTP caches. The freshness check runs before each render and
//! evicts one stale compiled template plus the cached page for the current
//! request.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Walks the content root and reports matching set directories |
//! | [`sets`] | Filters, enriches and orders raw sets into the listing |
//! | [`session`] | Session stores and the per-session listing memoizer |
//! | [`provider`] | Entry point: listing, per-year and per-set lookups |
//! | [`freshness`] | Per-render compiled-template freshness check |
//! | [`engine`] | Template engine contract and filesystem compiled cache |
//! | [`http_cache`] | HTTP response cache contract and filesystem store |
//! | [`site`] | Wires the concrete collaborators; renders pages through the caches |
//! | [`config`] | `config.toml` loading, merging and validation |
//! | [`types`] | `Set` and `Navigation`, shared with the rendering layer |
//! | [`naming`] | `00` ordering-prefix handling |
//! | [`clock`] | Injectable time source |
//! | [`telemetry`] | tracing subscriber setup |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Nothing Fails the Request
//!
//! An unreadable content root is an empty scan, a set with an unreadable
//! template is dropped, and cache deletions that fail are logged and
//! ignored. The only error a caller sees is "not found", which the web
//! layer maps to a 404.
//!
//! ## Count-Based Session Reuse
//!
//! A stored listing is reused while the scan finds the same number of set
//! directories. Replacing one set with another in place is not noticed until
//! the count changes; a changed template is still picked up at render time
//! by the freshness check.
//!
//! ## Explicit Collaborators
//!
//! The session store, template engine, HTTP cache and clock are passed in
//! as trait objects. There is no global state, and tests drive every path
//! with temp directories and a fixed clock.

pub mod clock;
pub mod config;
pub mod engine;
pub mod freshness;
pub mod http_cache;
pub mod naming;
pub mod output;
pub mod provider;
pub mod scan;
pub mod session;
pub mod sets;
pub mod site;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
