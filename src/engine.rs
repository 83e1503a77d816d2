//! Compiled-template cache.
//!
//! Rendering itself lives in the web layer. What this crate needs from the
//! template engine is narrow: where the compiled copy of a template lives,
//! whether a source is still fresh relative to a timestamp, and a way to
//! flush both the on-disk compiled cache and the in-memory loaded templates.
//! That contract is the [`TemplateEngine`] trait.
//!
//! [`FsTemplateEngine`] is the filesystem implementation:
//!
//! ```text
//! templates/index.html.twig                     # site template
//! content/2024/00-spring/00-spring.html.twig    # set template
//! .smak-cache/compiled/<sha256(id)>.compiled    # compiled artifact
//! ```
//!
//! Template ids are paths relative to one of the search directories. Site
//! templates are looked up first, then the content root.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use tracing::debug;

const ARTIFACT_EXTENSION: &str = "compiled";

pub trait TemplateEngine {
    /// Whether the source of `template_id` is unchanged since `reference`.
    fn is_template_fresh(&self, template_id: &str, reference: SystemTime) -> bool;

    /// Location of the compiled artifact, whether or not it exists yet.
    fn compiled_artifact_path(&self, template_id: &str) -> PathBuf;

    /// Remove every compiled artifact.
    fn clear_compiled_cache(&self) -> io::Result<()>;

    /// Forget templates loaded into memory.
    fn clear_template_cache(&self);
}

#[derive(Debug)]
pub struct FsTemplateEngine {
    search_dirs: Vec<PathBuf>,
    compiled_dir: PathBuf,
    /// Loaded sources keyed by template id.
    /// Uses Mutex (not RefCell) so the engine can be shared across threads.
    loaded: Mutex<HashMap<String, String>>,
}

impl FsTemplateEngine {
    pub fn new(search_dirs: Vec<PathBuf>, compiled_dir: impl Into<PathBuf>) -> Self {
        Self {
            search_dirs,
            compiled_dir: compiled_dir.into(),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// First search directory containing `template_id`.
    pub fn source_path(&self, template_id: &str) -> Option<PathBuf> {
        self.search_dirs
            .iter()
            .map(|dir| dir.join(template_id))
            .find(|p| p.is_file())
    }

    /// Load a template source, serving repeats from memory.
    pub fn load(&self, template_id: &str) -> io::Result<String> {
        let mut loaded = self.loaded.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(source) = loaded.get(template_id) {
            return Ok(source.clone());
        }
        let path = self.source_path(template_id).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("template not found: {template_id}"),
            )
        })?;
        let source = fs::read_to_string(path)?;
        loaded.insert(template_id.to_string(), source.clone());
        Ok(source)
    }

    /// Write the compiled artifact for `template_id`.
    pub fn compile(&self, template_id: &str) -> io::Result<PathBuf> {
        let source = self.load(template_id)?;
        fs::create_dir_all(&self.compiled_dir)?;
        let artifact = self.compiled_artifact_path(template_id);
        fs::write(&artifact, source)?;
        debug!(template = template_id, artifact = %artifact.display(), "compiled template");
        Ok(artifact)
    }

    #[cfg(test)]
    pub(crate) fn loaded_count(&self) -> usize {
        self.loaded.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl TemplateEngine for FsTemplateEngine {
    fn is_template_fresh(&self, template_id: &str, reference: SystemTime) -> bool {
        // A missing source has nothing newer to recompile from.
        let Some(path) = self.source_path(template_id) else {
            return true;
        };
        match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(mtime) => mtime <= reference,
            Err(e) => {
                debug!(template = template_id, error = %e, "template mtime unavailable");
                true
            }
        }
    }

    fn compiled_artifact_path(&self, template_id: &str) -> PathBuf {
        self.compiled_dir
            .join(format!("{}.{ARTIFACT_EXTENSION}", artifact_key(template_id)))
    }

    fn clear_compiled_cache(&self) -> io::Result<()> {
        remove_artifacts(&self.compiled_dir)
    }

    fn clear_template_cache(&self) {
        self.loaded.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

/// SHA-256 of the template id, hex encoded.
fn artifact_key(template_id: &str) -> String {
    format!("{:x}", Sha256::digest(template_id.as_bytes()))
}

fn remove_artifacts(dir: &Path) -> io::Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    for entry in entries {
        let path = entry?.path();
        let is_artifact = path
            .extension()
            .is_some_and(|ext| ext == ARTIFACT_EXTENSION);
        if !is_artifact {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
