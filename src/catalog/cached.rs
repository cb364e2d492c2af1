use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{Catalog, CatalogError, Result};
use crate::cache::{self, CacheStore, Category};
use crate::models::{Album, AudioAnalysis, AudioFeatures, parse_feature_list};

/// Catalog lookups served from the response cache when possible.
pub struct CachedCatalog<'a> {
    catalog: &'a dyn Catalog,
    store: &'a dyn CacheStore,
}

impl<'a> CachedCatalog<'a> {
    pub fn new(catalog: &'a dyn Catalog, store: &'a dyn CacheStore) -> Self {
        Self { catalog, store }
    }

    /// Album with track listing, cached under `albums/{id}`.
    pub fn album(&self, id: &str) -> Result<Album> {
        let value = cache::fetch_or_load(self.store, Category::Albums, id, || self.catalog.album(id))?;
        decode(&format!("album {id}"), value)
    }

    /// Features for `track_ids`, cached as one document under
    /// `audio features/{name}` (typically the album name).
    pub fn audio_features(&self, track_ids: &[String], name: &str) -> Result<Vec<AudioFeatures>> {
        let key = cache::sanitize_key(name);
        let value = cache::fetch_or_load(self.store, Category::AudioFeatures, &key, || {
            self.catalog.audio_features(track_ids)
        })?;
        parse_feature_list(value).map_err(|source| CatalogError::Decode {
            what: format!("audio features {name}"),
            source,
        })
    }

    /// Audio analysis, cached under `songs/{track_id}`.
    pub fn audio_analysis(&self, track_id: &str) -> Result<AudioAnalysis> {
        let value = cache::fetch_or_load(self.store, Category::AudioAnalysis, track_id, || {
            self.catalog.audio_analysis(track_id)
        })?;
        decode(&format!("audio analysis {track_id}"), value)
    }

    /// Cover-art bytes for an album (not cached). `None` if the album has no images.
    pub fn cover_art(&self, album: &Album) -> Result<Option<Vec<u8>>> {
        match album.cover() {
            Some(image) => self.catalog.image(&image.url).map(Some),
            None => Ok(None),
        }
    }
}

fn decode<T: DeserializeOwned>(what: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|source| CatalogError::Decode {
        what: what.to_string(),
        source,
    })
}
