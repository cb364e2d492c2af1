//! Album waveform poster: a header with cover art, album title and artists
//! above one named, mirrored waveform row per track. All rows share the same
//! time and loudness scales so track lengths and dynamics compare at a glance.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

use super::text::{Align, Fonts, TextStyle};
use super::{Axis, Canvas, Color, RenderError, Result, Style};
use crate::features::wrap_text;
use crate::waveform::{CenteredSample, CenteredTrack};

/// Horizontal margin as a fraction of the shared time range.
const X_MARGIN: f64 = 0.003;

/// Vertical padding inside each waveform band, as a fraction of its height.
const ROW_PAD: f64 = 0.1;

/// Titles longer than this many characters wrap and shrink.
const TITLE_WRAP: usize = 40;

/// Render the poster. `tracks` are drawn top to bottom in the given order,
/// each under its name.
pub fn render_waveform_poster(
    title: &str,
    artists: &str,
    cover: Option<&DynamicImage>,
    tracks: &[CenteredTrack],
    style: &Style,
) -> Result<RgbaImage> {
    if tracks.is_empty() {
        return Err(RenderError::Empty("album has no tracks to draw"));
    }

    let fonts = Fonts::load()?;
    let background = Color::parse(&style.background)?;
    let accent = Color::parse(&style.accent)?;
    let mut header = render_header(cover, style, background);
    draw_title(&mut header, &fonts, title, artists, style, background, accent)?;
    let body = render_body(&fonts, tracks, style, background, accent);

    let mut poster = RgbaImage::from_pixel(
        style.width.max(1),
        header.height() + body.height(),
        background.rgba(),
    );
    imageops::overlay(&mut poster, &header, 0, 0);
    imageops::overlay(&mut poster, &body, 0, header.height() as i64);
    Ok(poster)
}

/// The title text and its size: long titles wrap and drop to two thirds.
pub(crate) fn title_layout(title: &str, size: f32) -> (String, f32) {
    if title.chars().count() > TITLE_WRAP {
        (wrap_text(title, TITLE_WRAP), size * 2.0 / 3.0)
    } else {
        (title.to_string(), size)
    }
}

fn render_header(cover: Option<&DynamicImage>, style: &Style, background: Color) -> RgbaImage {
    let mut header = RgbaImage::from_pixel(style.width.max(1), style.header_height.max(1), background.rgba());

    let Some(cover) = cover else {
        return header;
    };
    let (cw, ch) = (cover.width(), cover.height());
    if cw == 0 || ch == 0 || style.header_height == 0 {
        return header;
    }

    // Cover sits in the middle 40% of the width, above the title
    let box_w = style.width as f64 * 0.4;
    let box_h = style.header_height as f64 * 0.65;
    let scale = (box_w / cw as f64).min(box_h / ch as f64);
    let nw = ((cw as f64 * scale).round() as u32).max(1);
    let nh = ((ch as f64 * scale).round() as u32).max(1);

    let scaled = imageops::resize(&cover.to_rgba8(), nw, nh, FilterType::Lanczos3);
    let x = (style.width as i64 - nw as i64) / 2;
    let y = (style.header_height as f64 * 0.05).round() as i64;
    imageops::overlay(&mut header, &scaled, x, y);
    header
}

/// Album title (bold, with a soft drop shadow) and the artist line under it.
fn draw_title(
    header: &mut RgbaImage,
    fonts: &Fonts,
    title: &str,
    artists: &str,
    style: &Style,
    background: Color,
    accent: Color,
) -> Result<()> {
    let foreground = Color::parse(&style.foreground)?;
    let (text, size) = title_layout(title, style.title_size);
    let centre = style.width as f64 / 2.0;
    let top = style.header_height as f64 * 0.72;

    let title_style = TextStyle::new(size, accent).bold();
    let shadow = TextStyle {
        color: background.mix(foreground, 0.3),
        ..title_style
    };
    fonts.draw(header, &text, centre + 2.0, top + 2.0, Align::Center, &shadow);
    fonts.draw(header, &text, centre, top, Align::Center, &title_style);

    let (_, title_h) = fonts.measure(&text, &title_style);
    let artist_style = TextStyle::new((size - 5.0).max(6.0), accent);
    fonts.draw(header, artists, centre, top + title_h + size as f64 * 0.3, Align::Center, &artist_style);
    Ok(())
}

fn render_body(fonts: &Fonts, tracks: &[CenteredTrack], style: &Style, background: Color, accent: Color) -> RgbaImage {
    let width = style.width.max(1);
    let row_h = style.row_height.max(1);
    let mut canvas = Canvas::new(width, row_h * tracks.len() as u32, background);

    let name_style = TextStyle::new(style.label_size, accent).bold();
    let strip = (style.label_size as f64 * 1.5).round();
    let band = (row_h as f64 - strip).max(1.0);
    for (row, track) in tracks.iter().enumerate() {
        let top = (row as u32 * row_h) as f64;
        canvas.text(fonts, &track.name, width as f64 / 2.0, top + 1.0, Align::Center, &name_style);
    }

    let all = || tracks.iter().flat_map(|t| t.samples.iter());
    let t_min = all().map(|s| s.time).fold(f64::INFINITY, f64::min);
    let t_max = all().map(|s| s.time).fold(f64::NEG_INFINITY, f64::max);
    let mut amp = all()
        .map(|s| s.loudness.abs().max(s.inverted.abs()))
        .fold(0.0, f64::max);
    if amp == 0.0 {
        amp = 1.0;
    }
    if !t_min.is_finite() {
        // Every track is empty; leave the rows with just their names
        return canvas.into_image();
    }

    let margin = (t_max - t_min) * X_MARGIN;
    let x_axis = Axis {
        lo: t_min - margin,
        hi: t_max + margin,
        px_lo: 0.0,
        px_hi: width as f64,
    };

    for (row, track) in tracks.iter().enumerate() {
        if track.samples.is_empty() {
            log::debug!("Track {} ({}) has no samples", track.track_number, track.name);
            continue;
        }
        let band_top = (row as u32 * row_h) as f64 + strip;
        let pad = band * ROW_PAD;
        let y_axis = Axis {
            lo: -amp,
            hi: amp,
            px_lo: band_top + band - pad,
            px_hi: band_top + pad,
        };
        draw_track(&mut canvas, &track.samples, x_axis, y_axis, accent, style);
    }

    canvas.into_image()
}

fn draw_track(canvas: &mut Canvas, samples: &[CenteredSample], x: Axis, y: Axis, color: Color, style: &Style) {
    let first = samples[0];
    let last = samples[samples.len() - 1];

    // Fill between the two halves, one pixel column at a time
    let col_start = x.map(first.time).ceil() as i64;
    let col_end = x.map(last.time).floor() as i64;
    for col in col_start.max(0)..=col_end.min(canvas.width() as i64 - 1) {
        let t = x.lo + (col as f64 - x.px_lo) / (x.px_hi - x.px_lo) * (x.hi - x.lo);
        let (low, high) = interpolate(samples, t);
        canvas.vspan(col, y.map(low), y.map(high), color, style.fill_alpha);
    }

    let lower: Vec<(f64, f64)> = samples.iter().map(|s| (x.map(s.time), y.map(s.loudness))).collect();
    let upper: Vec<(f64, f64)> = samples.iter().map(|s| (x.map(s.time), y.map(s.inverted))).collect();
    canvas.polyline(&lower, style.line_width, color);
    canvas.polyline(&upper, style.line_width, color);

    // Close both ends
    for s in [first, last] {
        let px = x.map(s.time);
        canvas.line(px, y.map(s.loudness), px, y.map(s.inverted), style.line_width, color);
    }
}

/// Linearly interpolated (loudness, inverted) at time `t`. Samples are sorted.
fn interpolate(samples: &[CenteredSample], t: f64) -> (f64, f64) {
    let i = samples.partition_point(|s| s.time < t);
    if i == 0 {
        return (samples[0].loudness, samples[0].inverted);
    }
    if i >= samples.len() {
        let s = samples[samples.len() - 1];
        return (s.loudness, s.inverted);
    }
    let (a, b) = (samples[i - 1], samples[i]);
    let span = b.time - a.time;
    let f = if span > 0.0 { (t - a.time) / span } else { 0.0 };
    (
        a.loudness + (b.loudness - a.loudness) * f,
        a.inverted + (b.inverted - a.inverted) * f,
    )
}
