//! Flat JSON response cache keyed by entity id.
//!
//! Cached documents are served forever; there is no TTL and no invalidation.
//! Delete the file (or the whole data directory) to force a re-fetch.

pub mod fs;
pub mod memory;

use std::fmt;

use serde_json::Value;
use thiserror::Error;

pub use fs::FsStore;
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Unreadable cache file {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Cache key {0:?} is not filesystem-safe")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Kind of cached document; each kind has its own subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Albums,
    AudioFeatures,
    AudioAnalysis,
}

impl Category {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Albums => "albums",
            Self::AudioFeatures => "audio features",
            Self::AudioAnalysis => "songs",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Storage backend for cached documents.
pub trait CacheStore {
    /// Return the cached document, or `None` if there is none.
    fn get(&self, category: Category, key: &str) -> Result<Option<Value>>;

    /// Persist a document, replacing any previous one.
    fn put(&self, category: Category, key: &str, value: &Value) -> Result<()>;
}

/// Return the cached document for `key`, or call `fetch` and cache its result.
///
/// `fetch` only runs on a miss. If it fails nothing is written.
pub fn fetch_or_load<S, F, E>(
    store: &S,
    category: Category,
    key: &str,
    fetch: F,
) -> std::result::Result<Value, E>
where
    S: CacheStore + ?Sized,
    F: FnOnce() -> std::result::Result<Value, E>,
    E: From<CacheError>,
{
    validate_key(key)?;

    if let Some(cached) = store.get(category, key)? {
        log::info!("Reading saved data: {category}/{key}");
        return Ok(cached);
    }

    log::info!("New connection: {category}/{key}");
    let content = fetch()?;
    store.put(category, key, &content)?;
    Ok(content)
}

/// Reject keys that could escape the category directory or aren't valid
/// file names.
pub fn validate_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key == "."
        || key == ".."
        || key.chars().any(is_unsafe_char);
    if bad {
        return Err(CacheError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Turn a display name (e.g. an album title) into a safe cache key.
pub fn sanitize_key(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if is_unsafe_char(c) { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".repeat(cleaned.len().max(1)),
        _ => cleaned,
    }
}

fn is_unsafe_char(c: char) -> bool {
    matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn test_second_call_served_from_cache() {
        let store = MemoryStore::new();
        let calls = Cell::new(0);

        let first = fetch_or_load(&store, Category::Albums, "alb1", || -> anyhow::Result<Value> {
            calls.set(calls.get() + 1);
            Ok(json!({"id": "alb1", "name": "Animals"}))
        })
        .unwrap();

        // A fetch that fails proves the store answered the second request
        let second = fetch_or_load(&store, Category::Albums, "alb1", || -> anyhow::Result<Value> {
            anyhow::bail!("catalog unreachable")
        })
        .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_failed_fetch_writes_nothing() {
        let store = MemoryStore::new();
        let r = fetch_or_load(&store, Category::AudioAnalysis, "t1", || -> anyhow::Result<Value> {
            anyhow::bail!("rate limited")
        });
        assert!(r.is_err());
        assert!(!store.contains(Category::AudioAnalysis, "t1"));
    }

    #[test]
    fn test_categories_are_separate() {
        let store = MemoryStore::new();
        fetch_or_load(&store, Category::Albums, "x", || -> anyhow::Result<Value> { Ok(json!(1)) }).unwrap();
        let v = fetch_or_load(&store, Category::AudioAnalysis, "x", || -> anyhow::Result<Value> {
            Ok(json!(2))
        })
        .unwrap();
        assert_eq!(v, json!(2));
    }

    #[test]
    fn test_invalid_keys_rejected() {
        for key in ["", ".", "..", "a/b", "..\\x", "a\0b", "x\ny"] {
            assert!(validate_key(key).is_err(), "{key:?} should be rejected");
        }
        assert!(validate_key("2217d2VN6Nn3zzU9mlApdK").is_ok());
        assert!(validate_key("13.0.0.0.0").is_ok());
        assert!(validate_key("This Town Needs Guns").is_ok());
    }

    #[test]
    fn test_invalid_key_never_fetches() {
        let store = MemoryStore::new();
        let r = fetch_or_load(&store, Category::Albums, "../etc", || -> anyhow::Result<Value> {
            panic!("fetch must not run for an invalid key")
        });
        assert!(r.is_err());
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("AC/DC: Live"), "AC_DC_ Live");
        assert_eq!(sanitize_key("Animals"), "Animals");
        assert_eq!(sanitize_key(".."), "__");
        assert_eq!(sanitize_key("  "), "_");
        assert!(validate_key(&sanitize_key("a/b\\c?")).is_ok());
    }
}
