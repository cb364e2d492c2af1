//! End-to-end runs: catalog → cache → analysis → image files.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};

use crate::cache::{self, CacheStore};
use crate::catalog::{CachedCatalog, Catalog};
use crate::config::AppConfig;
use crate::features::{self, FeatureRow};
use crate::render::{self, Palette};
use crate::waveform::{self, TrackWaveform};

/// Scatter plot file name, shared by every album set.
pub const SCATTER_FILE: &str = "dance-energy.png";

#[derive(Debug)]
pub struct WaveformRunResult {
    pub album: String,
    pub artists: String,
    pub tracks: usize,
    pub output: PathBuf,
}

#[derive(Debug)]
pub struct FeaturesRunResult {
    pub albums: usize,
    pub rows: usize,
    pub outputs: Vec<PathBuf>,
}

/// Build the waveform poster for `config.album_id` and write it to
/// `{output_dir}/{album name}.png`.
pub fn run_waveform(config: &AppConfig, catalog: &dyn Catalog, store: &dyn CacheStore) -> Result<WaveformRunResult> {
    let album_id = config.require_album_id()?;
    let (coarse, fine) = config.resample.intervals()?;

    let cached = CachedCatalog::new(catalog, store);
    let album = cached
        .album(album_id)
        .with_context(|| format!("Failed to fetch album {album_id}"))?;
    log::info!(
        "{} by {} ({} tracks)",
        album.name,
        album.artist_names(),
        album.tracks.items.len()
    );

    let pb = ProgressBar::new(album.tracks.items.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("  [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tracks {msg}")?
            .progress_chars("##-"),
    );

    let mut waveforms: Vec<TrackWaveform> = Vec::with_capacity(album.tracks.items.len());
    for track in &album.tracks.items {
        pb.set_message(track.name.clone());
        let analysis = cached
            .audio_analysis(&track.id)
            .with_context(|| format!("Failed to fetch analysis for {}", track.name))?;
        let wave = waveform::extract_waveform(&analysis.segments, &track.name, track.track_number, coarse, fine)?;
        waveforms.push(wave);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let centered = waveform::center_album(&waveforms);

    let cover = match cached.cover_art(&album).context("Failed to fetch cover art")? {
        Some(bytes) => Some(image::load_from_memory(&bytes).context("Cover art is not a readable image")?),
        None => {
            log::warn!("{} has no cover art", album.name);
            None
        }
    };

    let artists = album.artist_names();
    let poster = render::render_waveform_poster(&album.name, &artists, cover.as_ref(), &centered, &config.style)?;
    let output = config
        .output_dir()
        .join(format!("{}.png", cache::sanitize_key(&album.name)));
    render::save_png(&poster, &output).with_context(|| format!("Failed to write {}", output.display()))?;

    Ok(WaveformRunResult {
        album: album.name.clone(),
        artists,
        tracks: centered.len(),
        output,
    })
}

/// Fetch audio features for every configured album and draw the
/// `bar_feature` bars (first album) and the energy/danceability scatter (all).
pub fn run_features(config: &AppConfig, catalog: &dyn Catalog, store: &dyn CacheStore) -> Result<FeaturesRunResult> {
    let album_ids: Vec<String> = if !config.albums.is_empty() {
        config.albums.clone()
    } else if let Some(id) = &config.album_id {
        vec![id.clone()]
    } else {
        bail!("No albums to chart. Set albums (or album_id) in config.");
    };

    let cached = CachedCatalog::new(catalog, store);
    let mut names = Vec::with_capacity(album_ids.len());
    let mut per_album: Vec<Vec<FeatureRow>> = Vec::with_capacity(album_ids.len());

    for id in &album_ids {
        let album = cached
            .album(id)
            .with_context(|| format!("Failed to fetch album {id}"))?;
        let feats = cached
            .audio_features(&album.track_ids(), &album.name)
            .with_context(|| format!("Failed to fetch audio features for {}", album.name))?;
        let rows = features::aggregate(&album.tracks.items, &feats, &album.name);
        log::info!("{}: {} of {} tracks have features", album.name, rows.len(), album.tracks.items.len());
        names.push(album.name);
        per_album.push(rows);
    }

    let palette = Palette::new(&config.palette, &names)?;
    let output_dir = config.output_dir();
    let mut outputs = Vec::new();

    let first_rows = &per_album[0];
    let feature = config.bar_feature;
    let bars = render::render_feature_bars(first_rows, feature, palette.get(&names[0]), &config.style)
        .with_context(|| format!("Failed to chart {}", names[0]))?;
    let bars_path = output_dir.join(format!("{}-{}.png", slug(&names[0]), feature.label()));
    render::save_png(&bars, &bars_path).with_context(|| format!("Failed to write {}", bars_path.display()))?;
    outputs.push(bars_path);

    let all_rows: Vec<FeatureRow> = per_album.into_iter().flatten().collect();
    let scatter = render::render_feature_scatter(
        &all_rows,
        &palette,
        config.highlight_prefix.as_deref(),
        &config.style,
    )?;
    let scatter_path = output_dir.join(SCATTER_FILE);
    render::save_png(&scatter, &scatter_path).with_context(|| format!("Failed to write {}", scatter_path.display()))?;
    outputs.push(scatter_path);

    Ok(FeaturesRunResult {
        albums: names.len(),
        rows: all_rows.len(),
        outputs,
    })
}

/// Lowercase, ASCII-alphanumeric runs joined by single dashes.
fn slug(name: &str) -> String {
    let mut out = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() { "album".to_string() } else { out }
}
