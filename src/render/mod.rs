pub mod charts;
pub mod poster;
pub mod text;

use std::collections::HashMap;
use std::path::Path;

use image::{Rgba, RgbaImage, imageops};
use serde::Deserialize;
use thiserror::Error;

pub use charts::{render_feature_bars, render_feature_scatter};
pub use poster::render_waveform_poster;

use text::{Align, Fonts, TextStyle};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid colour {0:?} (expected #rrggbb)")]
    InvalidColor(String),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Nothing to draw: {0}")]
    Empty(&'static str),
    #[error("Bundled font {0} failed to load")]
    Font(&'static str),
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// Colour cycle for albums without a configured colour.
pub const DEFAULT_PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd",
    "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
];

/// Rendering-style overrides from the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Style {
    pub background: String,
    pub foreground: String,
    /// Waveform colour.
    pub accent: String,
    /// Poster width in pixels.
    pub width: u32,
    /// Height of one track row on the poster.
    pub row_height: u32,
    /// Height of the cover-art header.
    pub header_height: u32,
    pub line_width: f64,
    pub fill_alpha: f64,
    pub chart_width: u32,
    pub chart_height: u32,
    /// Scatter plots are square.
    pub scatter_size: u32,
    pub marker_radius: f64,
    /// Album title size on the poster; long titles are drawn smaller.
    pub title_size: f32,
    /// Track names, tick labels and legend entries.
    pub label_size: f32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            background: "#141414".to_string(),
            foreground: "#e6e6e6".to_string(),
            accent: "#d5b785".to_string(),
            width: 1280,
            row_height: 96,
            header_height: 320,
            line_width: 2.0,
            fill_alpha: 0.6,
            chart_width: 700,
            chart_height: 400,
            scatter_size: 600,
            marker_radius: 5.0,
            title_size: 30.0,
            label_size: 12.0,
        }
    }
}

/// An opaque RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 3]);

impl Color {
    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn parse(hex: &str) -> Result<Self> {
        let h = hex.trim().trim_start_matches('#');
        if h.len() != 6 || !h.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(RenderError::InvalidColor(hex.to_string()));
        }
        let channel = |i: usize| u8::from_str_radix(&h[i..i + 2], 16);
        match (channel(0), channel(2), channel(4)) {
            (Ok(r), Ok(g), Ok(b)) => Ok(Self([r, g, b])),
            _ => Err(RenderError::InvalidColor(hex.to_string())),
        }
    }

    pub fn rgba(&self) -> Rgba<u8> {
        let [r, g, b] = self.0;
        Rgba([r, g, b, 255])
    }

    /// `self` blended toward `other` by `t` in 0..=1.
    pub fn mix(&self, other: Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let channel = |i: usize| (self.0[i] as f64 * (1.0 - t) + other.0[i] as f64 * t).round() as u8;
        Color([channel(0), channel(1), channel(2)])
    }
}

/// Album name → colour, configured first then filled from [`DEFAULT_PALETTE`].
#[derive(Debug, Clone)]
pub struct Palette {
    colors: HashMap<String, Color>,
    fallback: Color,
}

impl Palette {
    pub fn new(configured: &HashMap<String, String>, albums: &[String]) -> Result<Self> {
        let mut colors = HashMap::new();
        for (album, hex) in configured {
            colors.insert(album.clone(), Color::parse(hex)?);
        }
        let mut cycle = DEFAULT_PALETTE.iter().cycle();
        for album in albums {
            if !colors.contains_key(album) {
                // cycle() over a non-empty array never ends
                let hex = cycle.next().copied().unwrap_or(DEFAULT_PALETTE[0]);
                colors.insert(album.clone(), Color::parse(hex)?);
            }
        }
        Ok(Self {
            colors,
            fallback: Color::parse(DEFAULT_PALETTE[7])?,
        })
    }

    pub fn get(&self, album: &str) -> Color {
        self.colors.get(album).copied().unwrap_or(self.fallback)
    }
}

/// Linear map from data coordinates to pixel coordinates.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Axis {
    pub lo: f64,
    pub hi: f64,
    pub px_lo: f64,
    pub px_hi: f64,
}

impl Axis {
    pub fn map(&self, v: f64) -> f64 {
        let span = self.hi - self.lo;
        if span == 0.0 {
            return (self.px_lo + self.px_hi) / 2.0;
        }
        self.px_lo + (v - self.lo) / span * (self.px_hi - self.px_lo)
    }
}

/// Alpha-blending drawing surface over an RGBA image.
pub(crate) struct Canvas {
    img: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            img: RgbaImage::from_pixel(width.max(1), height.max(1), background.rgba()),
        }
    }

    pub fn width(&self) -> u32 {
        self.img.width()
    }

    pub fn into_image(self) -> RgbaImage {
        self.img
    }

    pub fn text(&mut self, fonts: &Fonts, text: &str, x: f64, y: f64, align: Align, style: &TextStyle) {
        fonts.draw(&mut self.img, text, x, y, align, style);
    }

    /// Copy `tile` with its top-left corner at (`x`, `y`).
    pub fn overlay(&mut self, tile: &RgbaImage, x: f64, y: f64) {
        imageops::overlay(&mut self.img, tile, x.round() as i64, y.round() as i64);
    }

    pub fn blend(&mut self, x: i64, y: i64, color: Color, alpha: f64) {
        if x < 0 || y < 0 || x >= self.img.width() as i64 || y >= self.img.height() as i64 {
            return;
        }
        let a = alpha.clamp(0.0, 1.0);
        let px = self.img.get_pixel_mut(x as u32, y as u32);
        for c in 0..3 {
            let src = color.0[c] as f64;
            let dst = px.0[c] as f64;
            px.0[c] = (src * a + dst * (1.0 - a)).round() as u8;
        }
        let dst_a = px.0[3] as f64 / 255.0;
        px.0[3] = ((a + dst_a * (1.0 - a)) * 255.0).round() as u8;
    }

    /// Fill the half-open pixel rectangle [x0, x1) × [y0, y1).
    pub fn fill_rect(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, color: Color, alpha: f64) {
        let (xa, xb) = (x0.min(x1).round() as i64, x0.max(x1).round() as i64);
        let (ya, yb) = (y0.min(y1).round() as i64, y0.max(y1).round() as i64);
        for y in ya..yb {
            for x in xa..xb {
                self.blend(x, y, color, alpha);
            }
        }
    }

    /// Fill column `x` between `y0` and `y1` inclusive.
    pub fn vspan(&mut self, x: i64, y0: f64, y1: f64, color: Color, alpha: f64) {
        let (ya, yb) = (y0.min(y1).round() as i64, y0.max(y1).round() as i64);
        for y in ya..=yb {
            self.blend(x, y, color, alpha);
        }
    }

    pub fn fill_circle(&mut self, cx: f64, cy: f64, r: f64, color: Color, alpha: f64) {
        let r2 = r * r;
        let (x0, x1) = ((cx - r).floor() as i64, (cx + r).ceil() as i64);
        let (y0, y1) = ((cy - r).floor() as i64, (cy + r).ceil() as i64);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let (dx, dy) = (x as f64 - cx, y as f64 - cy);
                if dx * dx + dy * dy <= r2 {
                    self.blend(x, y, color, alpha);
                }
            }
        }
    }

    /// Opaque line of `width` pixels with round caps.
    pub fn line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, width: f64, color: Color) {
        let r = (width / 2.0).max(0.5);
        let len = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        let steps = (len * 2.0).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            self.fill_circle(x0 + (x1 - x0) * t, y0 + (y1 - y0) * t, r, color, 1.0);
        }
    }

    pub fn polyline(&mut self, points: &[(f64, f64)], width: f64, color: Color) {
        for w in points.windows(2) {
            self.line(w[0].0, w[0].1, w[1].0, w[1].1, width, color);
        }
    }

    pub fn dashed_hline(&mut self, y: f64, x0: f64, x1: f64, color: Color, alpha: f64) {
        let y = y.round() as i64;
        let (xa, xb) = (x0.min(x1).round() as i64, x0.max(x1).round() as i64);
        for x in xa..=xb {
            if (x - xa) % 8 < 5 {
                self.blend(x, y, color, alpha);
            }
        }
    }

    pub fn dashed_vline(&mut self, x: f64, y0: f64, y1: f64, color: Color, alpha: f64) {
        let x = x.round() as i64;
        let (ya, yb) = (y0.min(y1).round() as i64, y0.max(y1).round() as i64);
        for y in ya..=yb {
            if (y - ya) % 8 < 5 {
                self.blend(x, y, color, alpha);
            }
        }
    }
}

/// Write a PNG, creating parent directories. Existing files are overwritten.
pub fn save_png(img: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| RenderError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
    }
    img.save_with_format(path, image::ImageFormat::Png)?;
    log::info!("Wrote {}", path.display());
    Ok(())
}
