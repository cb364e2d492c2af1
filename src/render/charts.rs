use image::RgbaImage;

use super::text::{Align, Fonts, TextStyle};
use super::{Axis, Canvas, Color, Palette, RenderError, Result, Style};
use crate::features::{FeatureRow, label_rows};
use crate::models::Feature;

/// Outer margin around everything drawn.
const EDGE: f64 = 12.0;

/// Space between the plot area and its tick labels.
const GAP: f64 = 6.0;

/// Data range of both scatter axes.
const SCATTER_RANGE: (f64, f64) = (-0.05, 1.05);

/// Horizontal distance from a scatter point to its name, in data units.
const LABEL_OFFSET: f64 = 0.02;

const TICKS: [(f64, &str); 3] = [(0.0, "Lowest"), (0.5, "Medium"), (1.0, "Highest")];

const GRID_ALPHA: f64 = 0.25;
const POINT_ALPHA: f64 = 0.8;

/// Plot area inside a chart image. The plot keeps its configured size and
/// the image grows to fit the labels around it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Layout {
    pub left: f64,
    pub top: f64,
    pub plot_w: f64,
    pub plot_h: f64,
    pub width: u32,
    pub height: u32,
}

impl Layout {
    pub fn right(&self) -> f64 {
        self.left + self.plot_w
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.plot_h
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ScatterLayout {
    pub plot: Layout,
    pub legend_left: f64,
    pub legend_top: f64,
    pub column_width: f64,
    pub entry_height: f64,
}

/// "Lowest\nDanceability" and friends at 0, 0.5 and 1.
fn tick_labels(feature: Feature) -> Vec<(f64, String)> {
    TICKS
        .iter()
        .map(|(v, level)| (*v, format!("{level}\n{}", feature.title())))
        .collect()
}

fn widest(fonts: &Fonts, labels: &[(f64, String)], style: &TextStyle) -> (f64, f64) {
    labels
        .iter()
        .map(|(_, l)| fonts.measure(l, style))
        .fold((0.0, 0.0), |(w, h), (lw, lh)| (w.max(lw), h.max(lh)))
}

pub(crate) fn bar_layout(fonts: &Fonts, rows: &[FeatureRow], feature: Feature, style: &Style) -> Layout {
    let label = TextStyle::new(style.label_size, Color([0, 0, 0]));
    let (tick_w, tick_h) = widest(fonts, &tick_labels(feature), &label);
    // Names are turned upright, so their width becomes height
    let names_h = rows
        .iter()
        .map(|r| fonts.measure(&r.display_name, &label).0)
        .fold(0.0, f64::max);

    let left = EDGE + tick_w + GAP;
    let top = EDGE.max(tick_h / 2.0 + 2.0);
    let (plot_w, plot_h) = (style.chart_width.max(1) as f64, style.chart_height.max(1) as f64);
    Layout {
        left,
        top,
        plot_w,
        plot_h,
        width: (left + plot_w + EDGE).ceil() as u32,
        height: (top + plot_h + GAP + names_h + EDGE).ceil() as u32,
    }
}

/// Bar chart of one feature, one bar per row in row order, each named
/// underneath. Rows missing the feature leave an empty slot.
pub fn render_feature_bars(rows: &[FeatureRow], feature: Feature, color: Color, style: &Style) -> Result<RgbaImage> {
    if rows.is_empty() {
        return Err(RenderError::Empty("no feature rows for bar chart"));
    }
    let fonts = Fonts::load()?;
    let background = Color::parse(&style.background)?;
    let foreground = Color::parse(&style.foreground)?;
    let label = TextStyle::new(style.label_size, foreground);

    let layout = bar_layout(&fonts, rows, feature, style);
    let mut canvas = Canvas::new(layout.width, layout.height, background);
    let (left, top, right, bottom) = (layout.left, layout.top, layout.right(), layout.bottom());
    let y = Axis {
        lo: 0.0,
        hi: 1.0,
        px_lo: bottom,
        px_hi: top,
    };
    for (tick, text) in tick_labels(feature) {
        canvas.dashed_hline(y.map(tick), left, right, foreground, GRID_ALPHA);
        let (_, h) = fonts.measure(&text, &label);
        canvas.text(&fonts, &text, left - GAP, y.map(tick) - h / 2.0, Align::Right, &label);
    }

    let slot = (right - left) / rows.len() as f64;
    for (i, row) in rows.iter().enumerate() {
        let centre = left + slot * (i as f64 + 0.5);
        let name = fonts.vertical(&row.display_name, &label, background);
        canvas.overlay(&name, centre - name.width() as f64 / 2.0, bottom + GAP);

        let Some(v) = row.get(feature) else {
            log::debug!("{} has no {}", row.name, feature.label());
            continue;
        };
        let half = slot * 0.25;
        canvas.fill_rect(centre - half, y.map(v.clamp(0.0, 1.0)), centre + half, y.map(0.0), color, 1.0);
    }

    canvas.fill_rect(left, bottom, right, bottom + 1.0, foreground, 1.0);
    Ok(canvas.into_image())
}

/// Albums in first-seen order.
fn legend_albums(rows: &[FeatureRow]) -> Vec<&str> {
    let mut albums: Vec<&str> = Vec::new();
    for row in rows {
        if !albums.contains(&row.album.as_str()) {
            albums.push(&row.album);
        }
    }
    albums
}

fn annotation_style(row: &FeatureRow, highlight_prefix: Option<&str>, size: f32, color: Color) -> TextStyle {
    let style = TextStyle::new(size, color);
    match highlight_prefix {
        Some(prefix) if row.name_starts_with(prefix) => style.bold(),
        _ => style,
    }
}

/// Names sit to the right of high-energy points and to the left of the rest.
fn annotation_anchor(energy: f64, px: f64, offset: f64) -> (f64, Align) {
    if energy > 0.5 {
        (px + offset, Align::Left)
    } else {
        (px - offset, Align::Right)
    }
}

fn scatter_axis(px_lo: f64, px_hi: f64) -> Axis {
    Axis {
        lo: SCATTER_RANGE.0,
        hi: SCATTER_RANGE.1,
        px_lo,
        px_hi,
    }
}

pub(crate) fn scatter_layout(
    fonts: &Fonts,
    rows: &[FeatureRow],
    labels: &[usize],
    highlight_prefix: Option<&str>,
    style: &Style,
) -> ScatterLayout {
    let ink = Color([0, 0, 0]);
    let label = TextStyle::new(style.label_size, ink);
    let (y_tick_w, y_tick_h) = widest(fonts, &tick_labels(Feature::Danceability), &label);
    let (_, x_tick_h) = widest(fonts, &tick_labels(Feature::Energy), &label);

    // Extents of the point names relative to the plot's top-left corner
    let size = style.scatter_size.max(1) as f64;
    let (x, y) = (scatter_axis(0.0, size), scatter_axis(size, 0.0));
    let offset = LABEL_OFFSET / (SCATTER_RANGE.1 - SCATTER_RANGE.0) * size;
    let (mut min_x, mut max_x, mut min_y) = (0.0_f64, size, 0.0_f64);
    for &i in labels {
        let row = &rows[i];
        let Some((energy, dance)) = position(row) else { continue };
        let text = annotation_style(row, highlight_prefix, style.label_size, ink);
        let (w, h) = fonts.measure(&row.name, &text);
        let (ax, align) = annotation_anchor(energy, x.map(energy), offset);
        match align {
            Align::Left => max_x = max_x.max(ax + w),
            _ => min_x = min_x.min(ax - w),
        }
        min_y = min_y.min(y.map(dance) - h / 2.0);
    }

    let albums = legend_albums(rows);
    let swatch = style.label_size as f64;
    let column_width = albums
        .iter()
        .map(|a| swatch * 1.5 + fonts.measure(a, &label).0 + 2.0 * EDGE)
        .fold(0.0, f64::max);
    let entry_height = fonts.line_height(&label) + 4.0;
    let columns = albums.len().min(2) as f64;
    let legend_w = column_width * columns;
    let legend_h = albums.len().div_ceil(2) as f64 * entry_height;

    let left = (EDGE + y_tick_w + GAP).max(EDGE - min_x);
    let top = EDGE.max(y_tick_h / 2.0 + 2.0).max(EDGE - min_y);
    let right_margin = EDGE.max(max_x - size + EDGE);
    let centre = left + size / 2.0;
    let legend_top = top + size + GAP + x_tick_h + GAP;
    let width = (left + size + right_margin).max(centre + legend_w / 2.0 + EDGE);

    ScatterLayout {
        plot: Layout {
            left,
            top,
            plot_w: size,
            plot_h: size,
            width: width.ceil() as u32,
            height: (legend_top + legend_h + EDGE).ceil() as u32,
        },
        legend_left: EDGE.max(centre - legend_w / 2.0),
        legend_top,
        column_width,
        entry_height,
    }
}

/// Energy (x) against danceability (y), one colour per album. The extremes
/// of each axis and rows matching `highlight_prefix` are named beside their
/// point, the highlighted ones in bold. A two-column legend of album names
/// sits under the plot.
pub fn render_feature_scatter(
    rows: &[FeatureRow],
    palette: &Palette,
    highlight_prefix: Option<&str>,
    style: &Style,
) -> Result<RgbaImage> {
    if rows.is_empty() {
        return Err(RenderError::Empty("no feature rows for scatter plot"));
    }
    let fonts = Fonts::load()?;
    let background = Color::parse(&style.background)?;
    let foreground = Color::parse(&style.foreground)?;
    let label = TextStyle::new(style.label_size, foreground);

    let labels = label_rows(rows, highlight_prefix);
    let layout = scatter_layout(&fonts, rows, &labels, highlight_prefix, style);
    let plot = layout.plot;
    let mut canvas = Canvas::new(plot.width, plot.height, background);

    let (left, top, right, bottom) = (plot.left, plot.top, plot.right(), plot.bottom());
    let x = scatter_axis(left, right);
    let y = scatter_axis(bottom, top);
    for tick in [0.0, 0.5, 1.0] {
        canvas.dashed_hline(y.map(tick), left, right, foreground, GRID_ALPHA);
        canvas.dashed_vline(x.map(tick), top, bottom, foreground, GRID_ALPHA);
    }
    for (tick, text) in tick_labels(Feature::Danceability) {
        let (_, h) = fonts.measure(&text, &label);
        canvas.text(&fonts, &text, left - GAP, y.map(tick) - h / 2.0, Align::Right, &label);
    }
    for (tick, text) in tick_labels(Feature::Energy) {
        canvas.text(&fonts, &text, x.map(tick), bottom + GAP, Align::Center, &label);
    }

    for row in rows {
        if let Some((energy, dance)) = position(row) {
            canvas.fill_circle(x.map(energy), y.map(dance), style.marker_radius, palette.get(&row.album), POINT_ALPHA);
        }
    }

    let offset = LABEL_OFFSET / (SCATTER_RANGE.1 - SCATTER_RANGE.0) * plot.plot_w;
    for i in labels {
        let row = &rows[i];
        let Some((energy, dance)) = position(row) else { continue };
        let text = annotation_style(row, highlight_prefix, style.label_size, palette.get(&row.album));
        let (_, h) = fonts.measure(&row.name, &text);
        let (ax, align) = annotation_anchor(energy, x.map(energy), offset);
        canvas.text(&fonts, &row.name, ax, y.map(dance) - h / 2.0, align, &text);
    }

    let swatch = style.label_size as f64;
    for (k, album) in legend_albums(rows).into_iter().enumerate() {
        let ex = layout.legend_left + (k % 2) as f64 * layout.column_width;
        let ey = layout.legend_top + (k / 2) as f64 * layout.entry_height;
        let cy = ey + layout.entry_height / 2.0;
        canvas.fill_circle(ex + swatch / 2.0, cy, swatch / 2.0 - 1.0, palette.get(album), 1.0);
        canvas.text(&fonts, album, ex + swatch * 1.5, ey + 2.0, Align::Left, &label);
    }

    Ok(canvas.into_image())
}

/// (energy, danceability) if the row has both.
fn position(row: &FeatureRow) -> Option<(f64, f64)> {
    Some((row.get(Feature::Energy)?, row.get(Feature::Danceability)?))
}
