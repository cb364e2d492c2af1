//! Offline catalog used by tests.

use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::{Value, json};

use super::{Catalog, CatalogError, Result};

#[derive(Default)]
pub struct FakeCatalog {
    pub albums: HashMap<String, Value>,
    pub features: HashMap<String, Value>,
    pub analyses: HashMap<String, Value>,
    pub images: HashMap<String, Vec<u8>>,
    /// Every call, as "kind:id".
    pub calls: RefCell<Vec<String>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Register an album whose tracks are `(id, name)` pairs numbered from 1.
    pub fn with_album(mut self, id: &str, name: &str, tracks: &[(&str, &str)]) -> Self {
        let items: Vec<Value> = tracks
            .iter()
            .enumerate()
            .map(|(i, (tid, tname))| json!({"id": tid, "name": tname, "track_number": i + 1}))
            .collect();
        self.albums.insert(
            id.to_string(),
            json!({
                "id": id,
                "name": name,
                "artists": [{"name": "Test Artist"}],
                "images": [{"url": format!("https://img.test/{id}.png"), "width": 4, "height": 4}],
                "tracks": {"items": items}
            }),
        );
        self
    }

    pub fn with_analysis(mut self, track_id: &str, analysis: Value) -> Self {
        self.analyses.insert(track_id.to_string(), analysis);
        self
    }

    pub fn with_features(mut self, track_id: &str, features: Value) -> Self {
        self.features.insert(track_id.to_string(), features);
        self
    }

    pub fn with_image(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.images.insert(url.to_string(), bytes);
        self
    }

    fn not_found(what: &str) -> CatalogError {
        CatalogError::Response {
            what: what.to_string(),
            message: "not found".to_string(),
        }
    }
}

impl Catalog for FakeCatalog {
    fn album(&self, id: &str) -> Result<Value> {
        self.calls.borrow_mut().push(format!("album:{id}"));
        self.albums.get(id).cloned().ok_or_else(|| Self::not_found(id))
    }

    fn audio_features(&self, track_ids: &[String]) -> Result<Value> {
        self.calls
            .borrow_mut()
            .push(format!("features:{}", track_ids.join(",")));
        let list = track_ids
            .iter()
            .map(|id| self.features.get(id).cloned().unwrap_or(Value::Null))
            .collect();
        Ok(Value::Array(list))
    }

    fn audio_analysis(&self, track_id: &str) -> Result<Value> {
        self.calls.borrow_mut().push(format!("analysis:{track_id}"));
        self.analyses
            .get(track_id)
            .cloned()
            .ok_or_else(|| Self::not_found(track_id))
    }

    fn image(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.borrow_mut().push(format!("image:{url}"));
        self.images.get(url).cloned().ok_or_else(|| Self::not_found(url))
    }
}
