//! Set enrichment and ordering.
//!
//! Turns the scanner's [`RawSet`]s into the view-facing [`Set`] listing in
//! two explicit passes:
//!
//! 1. **Filter** into a new sequence: drop sets without a template or without
//!    items, and drop repeated `(subpath, name)` identities.
//! 2. **Enrich** each survivor: subpath, template path and mtime, link name,
//!    and the fresh flag.
//!
//! [`order`] then puts the listing in its final shape. It runs once per
//! aggregation; consumers must not re-sort. Both the scanner and the orderer
//! use the same key, reverse `(subpath, name)`, so fresh sets are promoted
//! out of the very sequence the rest are listed in.

use crate::clock::{Clock, unix_secs};
use crate::config::FreshnessConfig;
use crate::naming;
use crate::scan::RawSet;
use crate::types::Set;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// A raw set that passed the filter pass.
struct Candidate {
    name: String,
    subpath: String,
    template: PathBuf,
    item_count: usize,
}

/// Filter, enrich and order raw sets into the aggregated listing.
pub fn aggregate(
    raw: Vec<RawSet>,
    root: &Path,
    freshness: &FreshnessConfig,
    clock: &dyn Clock,
) -> Vec<Set> {
    order(enrich(raw, root, freshness, clock))
}

/// Filter and enrich raw sets, preserving scan order.
pub fn enrich(
    raw: Vec<RawSet>,
    root: &Path,
    freshness: &FreshnessConfig,
    clock: &dyn Clock,
) -> Vec<Set> {
    let threshold = freshness
        .enabled
        .then(|| fresh_threshold(clock.now(), freshness));

    filter(raw, root)
        .into_iter()
        .filter_map(|candidate| enrich_one(candidate, threshold))
        .collect()
}

fn filter(raw: Vec<RawSet>, root: &Path) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(raw.len());

    for set in raw {
        let Some(template) = set.template else {
            debug!(set = %set.name, "skipping set without template");
            continue;
        };
        if set.item_count == 0 {
            debug!(set = %set.name, "skipping empty set");
            continue;
        }
        let subpath = set
            .dir
            .parent()
            .map(|parent| relative_path(parent, root))
            .unwrap_or_default();
        if !seen.insert((subpath.clone(), set.name.clone())) {
            continue;
        }
        kept.push(Candidate {
            name: set.name,
            subpath,
            template,
            item_count: set.item_count,
        });
    }
    kept
}

fn enrich_one(candidate: Candidate, fresh_after: Option<u64>) -> Option<Set> {
    let mtime = match fs::metadata(&candidate.template).and_then(|m| m.modified()) {
        Ok(t) => unix_secs(t),
        Err(e) => {
            debug!(
                template = %candidate.template.display(),
                error = %e,
                "skipping set with unreadable template"
            );
            return None;
        }
    };

    let template_file = candidate
        .template
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let template_path = join_segments(&[&candidate.subpath, &candidate.name, &template_file]);

    Some(Set {
        link_name: naming::link_name(&candidate.name),
        is_fresh: fresh_after.is_some_and(|threshold| mtime >= threshold),
        name: candidate.name,
        subpath: candidate.subpath,
        template_path,
        template_mtime: mtime,
        item_count: candidate.item_count,
    })
}

/// Oldest template mtime (Unix seconds) that still counts as fresh.
fn fresh_threshold(now: SystemTime, freshness: &FreshnessConfig) -> u64 {
    now.checked_sub(freshness.interval)
        .map(unix_secs)
        .unwrap_or(0)
}

/// Put enriched sets in listing order.
///
/// Fresh sets go to the front, each one inserted ahead of those encountered
/// before it. The rest follow in reverse `(subpath, name)` order: newest
/// year directory first, and strictly reverse raw name within a directory.
pub fn order(sets: Vec<Set>) -> Vec<Set> {
    let (fresh, mut rest): (Vec<Set>, Vec<Set>) = sets.into_iter().partition(|s| s.is_fresh);
    rest.sort_by(|a, b| b.key().cmp(&a.key()));

    let mut listing = Vec::with_capacity(fresh.len() + rest.len());
    listing.extend(fresh.into_iter().rev());
    listing.extend(rest);
    listing
}

/// `path` relative to `root`, `/`-separated. Empty when `path` is the root.
fn relative_path(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    parts.join("/")
}

fn join_segments(segments: &[&str]) -> String {
    segments
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}
