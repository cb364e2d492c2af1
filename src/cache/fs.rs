use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;

use super::{CacheError, CacheStore, Category, Result};

/// Cache backed by `{root}/{category}/{key}.json` files.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open (and create if needed) a cache rooted at `root`.
    pub fn open(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root).map_err(|source| CacheError::Io {
            path: root.display().to_string(),
            source,
        })?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, category: Category, key: &str) -> PathBuf {
        self.root
            .join(category.dir_name())
            .join(format!("{key}.json"))
    }

    /// The category's subdirectory, created if missing.
    fn category_dir(&self, category: Category) -> Result<PathBuf> {
        let dir = self.root.join(category.dir_name());
        std::fs::create_dir_all(&dir).map_err(|source| CacheError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(dir)
    }
}

impl CacheStore for FsStore {
    fn get(&self, category: Category, key: &str) -> Result<Option<Value>> {
        // Category directories exist after any lookup, hit or miss
        self.category_dir(category)?;
        let path = self.path_for(category, key);
        if !path.is_file() {
            return Ok(None);
        }

        let text = std::fs::read_to_string(&path).map_err(|source| CacheError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let value = serde_json::from_str(&text).map_err(|source| CacheError::Json {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Some(value))
    }

    fn put(&self, category: Category, key: &str, value: &Value) -> Result<()> {
        let dir = self.category_dir(category)?;
        let io_err = |source: std::io::Error| CacheError::Io {
            path: dir.display().to_string(),
            source,
        };

        let text = to_pretty_json(value).map_err(|source| CacheError::Json {
            path: dir.display().to_string(),
            source,
        })?;

        // Write beside the target and rename into place, so readers only ever
        // see a complete document.
        let mut tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(text.as_bytes()).map_err(io_err)?;
        tmp.flush().map_err(io_err)?;

        let path = self.path_for(category, key);
        tmp.persist(&path).map_err(|e| CacheError::Io {
            path: path.display().to_string(),
            source: e.error,
        })?;
        log::debug!("Cached {}", path.display());
        Ok(())
    }
}

/// Serialize with 4-space indentation.
fn to_pretty_json(value: &Value) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    // serde_json only ever emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
