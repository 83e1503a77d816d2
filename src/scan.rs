//! Content set discovery.
//!
//! Walks the content root and reports every directory whose name matches the
//! gallery glob as a [`RawSet`]. Nothing is enriched here: the scanner only
//! records what is on disk (name, location, template file, item count) so the
//! enricher can decide what makes it into the listing.
//!
//! ## Directory Structure
//!
//! ```text
//! content/                        # Content root
//! ├── 2024/                       # Year (does not match "*-*")
//! │   └── 00-spring/              # Set, link name "spring"
//! │       ├── spring.html.twig    # Set template
//! │       ├── 01.jpg              # Items
//! │       └── 02.jpg
//! └── 2023/
//!     ├── 2023-fall/
//!     └── 2023-summer/
//! ```
//!
//! A matched directory is not descended into: items below a set never count
//! as sets themselves.
//!
//! Symlinks are followed, so a set or year directory may live elsewhere and
//! be linked into the content root. A link cycle is reported by the walker
//! as an unreadable entry and skipped.
//!
//! An unreadable content root or a root with no matches yields an empty scan.
//! Both are normal states and are only logged.

use globset::{Glob, GlobMatcher};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// File extensions counted as gallery items.
const ITEM_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "avif"];

/// A set directory as found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSet {
    pub name: String,
    /// Absolute path of the set directory (content root joined).
    pub dir: PathBuf,
    /// The template file, if the directory has one.
    pub template: Option<PathBuf>,
    pub item_count: usize,
}

#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    pattern: GlobMatcher,
    template_suffix: String,
}

impl Scanner {
    pub fn new(
        root: impl Into<PathBuf>,
        gallery_pattern: &str,
        template_suffix: impl Into<String>,
    ) -> Result<Self, globset::Error> {
        Ok(Self {
            root: root.into(),
            pattern: Glob::new(gallery_pattern)?.compile_matcher(),
            template_suffix: template_suffix.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the content root, returning sets in reverse path order: newest
    /// year directory first, reverse name within a directory.
    pub fn scan(&self) -> Vec<RawSet> {
        let mut sets = Vec::new();
        let mut walker = WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!(root = %self.root.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if name.starts_with('.') {
                walker.skip_current_dir();
                continue;
            }
            if !self.pattern.is_match(name.as_ref()) {
                continue;
            }

            sets.push(self.read_set(entry.path(), name.into_owned()));
            walker.skip_current_dir();
        }

        sets.sort_by(|a, b| b.dir.cmp(&a.dir));
        debug!(root = %self.root.display(), count = sets.len(), "scanned content root");
        sets
    }

    fn read_set(&self, dir: &Path, name: String) -> RawSet {
        let mut files: Vec<PathBuf> = match fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect(),
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "set directory unreadable");
                Vec::new()
            }
        };
        files.sort();

        let template = files
            .iter()
            .find(|p| self.is_template(p))
            .cloned();
        let item_count = files.iter().filter(|p| is_item(p)).count();

        RawSet {
            name,
            dir: dir.to_path_buf(),
            template,
            item_count,
        }
    }

    fn is_template(&self, path: &Path) -> bool {
        path.file_name()
            .map(|n| n.to_string_lossy().ends_with(&self.template_suffix))
            .unwrap_or(false)
    }
}

fn is_item(path: &Path) -> bool {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    ITEM_EXTENSIONS.contains(&ext.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn scanner(root: &Path) -> Scanner {
        Scanner::new(root, "*-*", ".html.twig").unwrap()
    }

    fn names(sets: &[RawSet]) -> Vec<&str> {
        sets.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn finds_sets_in_reverse_path_order() {
        let tmp = TempDir::new().unwrap();
        add_set(tmp.path(), "2023", "2023-fall", 2);
        add_set(tmp.path(), "2023", "2023-summer", 1);
        add_set(tmp.path(), "2024", "00-2024-spring", 3);
        add_set(tmp.path(), "2024", "2024-summer", 1);

        let sets = scanner(tmp.path()).scan();
        assert_eq!(
            names(&sets),
            vec!["2024-summer", "00-2024-spring", "2023-summer", "2023-fall"]
        );
    }

    #[test]
    fn records_template_and_item_count() {
        let tmp = TempDir::new().unwrap();
        let dir = add_set(tmp.path(), "2024", "00-spring", 3);

        let sets = scanner(tmp.path()).scan();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].dir, dir);
        assert_eq!(sets[0].item_count, 3);
        assert_eq!(sets[0].template, Some(dir.join("00-spring.html.twig")));
    }

    #[test]
    fn set_without_template_is_still_reported() {
        let tmp = TempDir::new().unwrap();
        let dir = add_bare_set(tmp.path(), "2024", "00-spring", 2);

        let sets = scanner(tmp.path()).scan();
        assert_eq!(sets[0].dir, dir);
        assert_eq!(sets[0].template, None);
        assert_eq!(sets[0].item_count, 2);
    }

    #[test]
    fn non_item_files_are_not_counted() {
        let tmp = TempDir::new().unwrap();
        let dir = add_set(tmp.path(), "", "00-notes", 0);
        fs::write(dir.join("readme.txt"), "hello").unwrap();
        fs::write(dir.join("photo.JPG"), "fake").unwrap();

        let sets = scanner(tmp.path()).scan();
        assert_eq!(sets[0].item_count, 1);
    }

    #[test]
    fn non_matching_directories_are_ignored() {
        let tmp = TempDir::new().unwrap();
        add_set(tmp.path(), "2024", "00-spring", 1);
        fs::create_dir_all(tmp.path().join("drafts")).unwrap();

        let sets = scanner(tmp.path()).scan();
        assert_eq!(names(&sets), vec!["00-spring"]);
    }

    #[test]
    fn does_not_descend_into_sets() {
        let tmp = TempDir::new().unwrap();
        let dir = add_set(tmp.path(), "", "00-spring", 1);
        fs::create_dir_all(dir.join("raw-files")).unwrap();

        let sets = scanner(tmp.path()).scan();
        assert_eq!(names(&sets), vec!["00-spring"]);
    }

    #[test]
    fn hidden_directories_are_skipped() {
        let tmp = TempDir::new().unwrap();
        add_set(tmp.path(), ".trash", "00-old", 1);
        add_set(tmp.path(), "2024", "00-new", 1);

        let sets = scanner(tmp.path()).scan();
        assert_eq!(names(&sets), vec!["00-new"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_set_directory_is_found() {
        let tmp = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let target = add_set(elsewhere.path(), "", "2024-summer", 2);
        fs::create_dir_all(tmp.path().join("2024")).unwrap();
        std::os::unix::fs::symlink(&target, tmp.path().join("2024/2024-summer")).unwrap();

        let sets = scanner(tmp.path()).scan();
        assert_eq!(names(&sets), vec!["2024-summer"]);
        assert_eq!(sets[0].dir, tmp.path().join("2024/2024-summer"));
        assert_eq!(sets[0].item_count, 2);
        assert!(sets[0].template.is_some());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycle_is_skipped() {
        let tmp = TempDir::new().unwrap();
        add_set(tmp.path(), "2024", "00-spring", 1);
        std::os::unix::fs::symlink(tmp.path(), tmp.path().join("2024/loop")).unwrap();

        let sets = scanner(tmp.path()).scan();
        assert_eq!(names(&sets), vec!["00-spring"]);
    }

    #[test]
    fn missing_root_is_empty() {
        let tmp = TempDir::new().unwrap();
        let sets = scanner(&tmp.path().join("nope")).scan();
        assert!(sets.is_empty());
    }

    #[test]
    fn empty_root_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(scanner(tmp.path()).scan().is_empty());
    }

    #[test]
    fn custom_pattern() {
        let tmp = TempDir::new().unwrap();
        add_set(tmp.path(), "2024", "00-spring", 1);
        add_set(tmp.path(), "2024", "wip-summer", 1);

        let sets = Scanner::new(tmp.path(), "[0-9][0-9]-*", ".html.twig")
            .unwrap()
            .scan();
        assert_eq!(names(&sets), vec!["00-spring"]);
    }

    #[test]
    fn invalid_pattern_is_error() {
        assert!(Scanner::new("/tmp", "[oops", ".html.twig").is_err());
    }
}
