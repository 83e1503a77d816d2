//! Shared types handed from the set pipeline to the rendering layer.
//!
//! A [`Set`] is serialized into the session store between requests, so every
//! view-facing field lives on the struct itself rather than being recomputed
//! from the filesystem on read.

use chrono::{DateTime, Datelike, Local};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One gallery: a directory of items plus the template that renders it.
///
/// Identity is `(subpath, name)`. Two sets with the same identity compare
/// equal even if their enrichment fields differ, which is what the listing
/// dedup relies on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Set {
    /// Raw directory name, ordering prefix included (`00-spring`).
    pub name: String,
    /// Name with the `00` ordering prefix stripped, used in URLs.
    pub link_name: String,
    /// Parent directory relative to the content root (`2024`, or empty).
    pub subpath: String,
    /// Template file relative to the content root.
    pub template_path: String,
    /// Template modification time, seconds since the Unix epoch.
    pub template_mtime: u64,
    #[serde(default)]
    pub is_fresh: bool,
    pub item_count: usize,
}

impl Set {
    /// The `(subpath, name)` identity pair.
    pub fn key(&self) -> (&str, &str) {
        (&self.subpath, &self.name)
    }

    pub fn last_modified(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.template_mtime)
    }

    /// Human-readable template date, e.g. `"March 3rd, 2024"`.
    pub fn last_modified_label(&self) -> String {
        let local: DateTime<Local> = self.last_modified().into();
        format!(
            "{} {}{}, {}",
            local.format("%B"),
            local.day(),
            ordinal_suffix(local.day()),
            local.year()
        )
    }
}

impl PartialEq for Set {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Set {}

impl Hash for Set {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Neighbours of a set within the aggregated listing.
///
/// The listing runs newest first, so `next` is the entry *before* the set
/// and `previous` the entry after it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Navigation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<Set>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<Set>,
}

impl Navigation {
    /// Neighbours of the entry at `index` in `listing`.
    pub fn around(listing: &[Set], index: usize) -> Self {
        Self {
            next: index
                .checked_sub(1)
                .and_then(|i| listing.get(i))
                .cloned(),
            previous: listing.get(index + 1).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(subpath: &str, name: &str) -> Set {
        Set {
            name: name.to_string(),
            link_name: name.to_string(),
            subpath: subpath.to_string(),
            template_path: String::new(),
            template_mtime: 0,
            is_fresh: false,
            item_count: 1,
        }
    }

    #[test]
    fn identity_ignores_enrichment_fields() {
        let a = set("2024", "spring");
        let mut b = set("2024", "spring");
        b.is_fresh = true;
        b.item_count = 9;
        assert_eq!(a, b);
    }

    #[test]
    fn identity_includes_subpath() {
        assert_ne!(set("2023", "spring"), set("2024", "spring"));
    }

    #[test]
    fn ordinal_suffixes() {
        assert_eq!(ordinal_suffix(1), "st");
        assert_eq!(ordinal_suffix(2), "nd");
        assert_eq!(ordinal_suffix(3), "rd");
        assert_eq!(ordinal_suffix(4), "th");
        assert_eq!(ordinal_suffix(11), "th");
        assert_eq!(ordinal_suffix(12), "th");
        assert_eq!(ordinal_suffix(13), "th");
        assert_eq!(ordinal_suffix(21), "st");
        assert_eq!(ordinal_suffix(22), "nd");
        assert_eq!(ordinal_suffix(31), "st");
    }

    #[test]
    fn last_modified_label_has_year() {
        let mut s = set("", "x");
        // 2024-03-15 12:00:00 UTC, mid-month so no timezone moves the day far
        s.template_mtime = 1_710_504_000;
        let label = s.last_modified_label();
        assert!(label.starts_with("March 1"), "{label}");
        assert!(label.ends_with(", 2024"), "{label}");
    }

    #[test]
    fn navigation_in_the_middle() {
        let listing = vec![set("", "c"), set("", "b"), set("", "a")];
        let nav = Navigation::around(&listing, 1);
        assert_eq!(nav.next.unwrap().name, "c");
        assert_eq!(nav.previous.unwrap().name, "a");
    }

    #[test]
    fn navigation_at_the_edges() {
        let listing = vec![set("", "c"), set("", "b")];
        let first = Navigation::around(&listing, 0);
        assert!(first.next.is_none());
        assert_eq!(first.previous.unwrap().name, "b");

        let last = Navigation::around(&listing, 1);
        assert_eq!(last.next.unwrap().name, "c");
        assert!(last.previous.is_none());
    }

    #[test]
    fn navigation_single_entry() {
        let listing = vec![set("", "only")];
        let nav = Navigation::around(&listing, 0);
        assert!(nav.next.is_none());
        assert!(nav.previous.is_none());
    }
}
