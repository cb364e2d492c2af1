//! Typed views of the catalog's JSON payloads.
//!
//! Only the fields the pipelines use are modelled; everything else in the
//! cached documents is ignored on deserialization.

use serde::{Deserialize, Serialize};

/// An album with its track listing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub images: Vec<Image>,
    pub tracks: TrackPage,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Artist {
    pub name: String,
}

/// Cover-art reference. The catalog lists the largest image first.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Image {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackPage {
    pub items: Vec<Track>,
}

/// A track as listed on its album.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    /// 1-based position within the album (disc-relative).
    pub track_number: u32,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl Album {
    /// Comma-joined artist names.
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn cover(&self) -> Option<&Image> {
        self.images.first()
    }

    pub fn track_ids(&self) -> Vec<String> {
        self.tracks.items.iter().map(|t| t.id.clone()).collect()
    }
}

/// Audio analysis of one track. Only `segments` is modelled.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioAnalysis {
    #[serde(default)]
    pub segments: Vec<Segment>,
}

/// A raw analysis breakpoint describing loudness over a sub-interval.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Segment {
    /// Seconds from the start of the track.
    pub start: f64,
    /// Seconds.
    pub duration: f64,
    /// dB at `start`.
    pub loudness_start: f64,
    /// Peak dB within the segment.
    pub loudness_max: f64,
    /// Offset of the peak from `start`, in seconds.
    pub loudness_max_time: f64,
    /// dB at the end of the segment. 0 means "no end sample" and is
    /// what the catalog sends for every segment but the last.
    #[serde(default)]
    pub loudness_end: f64,
}

/// Scalar audio features for one track.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AudioFeatures {
    pub id: String,
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub key: Option<i32>,
    pub loudness: Option<f64>,
    pub mode: Option<i32>,
    pub speechiness: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub valence: Option<f64>,
    pub tempo: Option<f64>,
    pub duration_ms: Option<u64>,
    pub time_signature: Option<i32>,
}

/// A scalar column of [`AudioFeatures`] that charts can plot. Config files
/// name it in lowercase (`bar_feature: valence`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    #[default]
    Danceability,
    Energy,
    Speechiness,
    Acousticness,
    Instrumentalness,
    Liveness,
    Valence,
}

impl Feature {
    pub fn get(&self, f: &AudioFeatures) -> Option<f64> {
        match self {
            Self::Danceability => f.danceability,
            Self::Energy => f.energy,
            Self::Speechiness => f.speechiness,
            Self::Acousticness => f.acousticness,
            Self::Instrumentalness => f.instrumentalness,
            Self::Liveness => f.liveness,
            Self::Valence => f.valence,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Danceability => "danceability",
            Self::Energy => "energy",
            Self::Speechiness => "speechiness",
            Self::Acousticness => "acousticness",
            Self::Instrumentalness => "instrumentalness",
            Self::Liveness => "liveness",
            Self::Valence => "valence",
        }
    }

    /// Capitalized label for axis ticks.
    pub fn title(&self) -> String {
        let label = self.label();
        let mut chars = label.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Parse the catalog's feature list, skipping the `null` entries it returns
/// for ids it has no features for.
pub fn parse_feature_list(value: serde_json::Value) -> serde_json::Result<Vec<AudioFeatures>> {
    let entries: Vec<Option<AudioFeatures>> = serde_json::from_value(value)?;
    Ok(entries.into_iter().flatten().collect())
}
