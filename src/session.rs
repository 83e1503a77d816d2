//! Per-session memoization of the aggregated listing.
//!
//! The session store is passed in explicitly; there is no ambient session.
//! A store holds one serialized blob per session and is assumed to read and
//! write that blob atomically.
//!
//! ## Reuse rule
//!
//! A stored listing is reused when debug mode is off **and** its length
//! equals the cardinality of the current raw scan. The check is count-only:
//! replacing a set without changing the total is not noticed here. Stale
//! individual templates are caught at render time by
//! [`FreshnessChecker`](crate::freshness::FreshnessChecker).
//!
//! Because filtered-out sets still count towards the raw cardinality, a
//! content root holding an empty or template-less set never matches its
//! stored listing and is recomputed on every call.

use crate::types::Set;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// Session key under which the listing is stored.
pub const SETS_KEY: &str = "smak.portfolio.sets";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Session-scoped key-value storage for listings.
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<Vec<Set>>;
    fn set(&mut self, key: &str, sets: &[Set]);
}

/// Session held in memory as one JSON blob.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    blob: String,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<Vec<Set>> {
        read_key(&self.blob, key)
    }

    fn set(&mut self, key: &str, sets: &[Set]) {
        match write_key(&self.blob, key, sets) {
            Ok(blob) => self.blob = blob,
            Err(e) => warn!(key, error = %e, "failed to serialize session value"),
        }
    }
}

/// Session persisted as `<dir>/<sha256(session_id)>.json`.
///
/// Lets a listing survive between process runs, which is what a session
/// cookie buys a web visitor. The id arrives from outside (cookie, CLI
/// flag), so it only ever reaches the filesystem as a hash and can never
/// name a path outside `dir`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>, session_id: &str) -> Self {
        Self {
            path: dir.into().join(format!("{}.json", session_key(session_id))),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn load_blob(&self) -> String {
        match fs::read_to_string(&self.path) {
            Ok(blob) => blob,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "session unreadable");
                String::new()
            }
        }
    }

    fn save_blob(&self, blob: &str) -> Result<(), SessionError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        // Write beside and rename so readers never see a half-written blob.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, blob)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<Vec<Set>> {
        read_key(&self.load_blob(), key)
    }

    fn set(&mut self, key: &str, sets: &[Set]) {
        let result = write_key(&self.load_blob(), key, sets)
            .map_err(SessionError::from)
            .and_then(|blob| self.save_blob(&blob));
        if let Err(e) = result {
            warn!(path = %self.path.display(), key, error = %e, "failed to store session value");
        }
    }
}

/// SHA-256 of the session id, hex encoded.
fn session_key(session_id: &str) -> String {
    format!("{:x}", Sha256::digest(session_id.as_bytes()))
}

fn read_key(blob: &str, key: &str) -> Option<Vec<Set>> {
    if blob.is_empty() {
        return None;
    }
    let mut map: HashMap<String, Value> = match serde_json::from_str(blob) {
        Ok(m) => m,
        Err(e) => {
            debug!(error = %e, "discarding corrupt session blob");
            return None;
        }
    };
    let value = map.remove(key)?;
    match serde_json::from_value(value) {
        Ok(sets) => Some(sets),
        Err(e) => {
            debug!(key, error = %e, "discarding unreadable session value");
            None
        }
    }
}

fn write_key(blob: &str, key: &str, sets: &[Set]) -> Result<String, serde_json::Error> {
    let mut map: HashMap<String, Value> = if blob.is_empty() {
        HashMap::new()
    } else {
        serde_json::from_str(blob).unwrap_or_default()
    };
    map.insert(key.to_string(), serde_json::to_value(sets)?);
    serde_json::to_string(&map)
}

/// Where a listing returned by [`get_or_compute`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Session,
    Computed,
}

/// Return the session's listing if it can be reused, otherwise compute,
/// store and return a fresh one.
pub fn get_or_compute<F>(
    store: &mut dyn SessionStore,
    debug_mode: bool,
    raw_count: usize,
    compute: F,
) -> (Vec<Set>, Origin)
where
    F: FnOnce() -> Vec<Set>,
{
    if !debug_mode
        && let Some(cached) = store.get(SETS_KEY)
        && cached.len() == raw_count
    {
        debug!(count = cached.len(), "reusing session listing");
        return (cached, Origin::Session);
    }

    let sets = compute();
    store.set(SETS_KEY, &sets);
    debug!(count = sets.len(), debug_mode, "stored recomputed listing");
    (sets, Origin::Computed)
}
