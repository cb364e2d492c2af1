//! Text on rendered images, using the DejaVu Sans faces bundled under
//! `assets/fonts`. Multi-line strings are laid out one line at a time.

use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use image::{RgbaImage, imageops};
use imageproc::drawing::{draw_text_mut, text_size};

use super::{Color, RenderError, Result};

static SANS: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
static SANS_BOLD: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    Regular,
    Bold,
}

/// Horizontal anchor of each line relative to the x coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    /// Pixel height of the em square.
    pub size: f32,
    pub weight: Weight,
    pub color: Color,
}

impl TextStyle {
    pub fn new(size: f32, color: Color) -> Self {
        Self {
            size,
            weight: Weight::Regular,
            color,
        }
    }

    pub fn bold(self) -> Self {
        Self {
            weight: Weight::Bold,
            ..self
        }
    }
}

pub struct Fonts {
    regular: FontRef<'static>,
    bold: FontRef<'static>,
}

impl Fonts {
    pub fn load() -> Result<Self> {
        Ok(Self {
            regular: FontRef::try_from_slice(SANS).map_err(|_| RenderError::Font("DejaVuSans"))?,
            bold: FontRef::try_from_slice(SANS_BOLD).map_err(|_| RenderError::Font("DejaVuSans-Bold"))?,
        })
    }

    fn face(&self, weight: Weight) -> &FontRef<'static> {
        match weight {
            Weight::Regular => &self.regular,
            Weight::Bold => &self.bold,
        }
    }

    /// Distance between consecutive baselines.
    pub fn line_height(&self, style: &TextStyle) -> f64 {
        let scaled = self.face(style.weight).as_scaled(PxScale::from(style.size));
        (scaled.height() + scaled.line_gap()) as f64
    }

    /// Width of the widest line and total height of `text`.
    pub fn measure(&self, text: &str, style: &TextStyle) -> (f64, f64) {
        let face = self.face(style.weight);
        let mut width = 0.0_f64;
        let mut lines = 0;
        for line in text.lines() {
            let (w, _) = text_size(PxScale::from(style.size), face, line);
            width = width.max(w as f64);
            lines += 1;
        }
        (width, lines as f64 * self.line_height(style))
    }

    /// Draw `text` with its first line's top edge at `y`.
    pub fn draw(&self, img: &mut RgbaImage, text: &str, x: f64, y: f64, align: Align, style: &TextStyle) {
        let face = self.face(style.weight);
        let scale = PxScale::from(style.size);
        let line_height = self.line_height(style);
        for (i, line) in text.lines().enumerate() {
            let (w, _) = text_size(scale, face, line);
            let left = match align {
                Align::Left => x,
                Align::Center => x - w as f64 / 2.0,
                Align::Right => x - w as f64,
            };
            let top = y + i as f64 * line_height;
            draw_text_mut(img, style.color.rgba(), left.round() as i32, top.round() as i32, scale, face, line);
        }
    }

    /// `text` on an opaque `background` tile, turned to read bottom to top.
    /// Lines are centred on each other.
    pub fn vertical(&self, text: &str, style: &TextStyle, background: Color) -> RgbaImage {
        let (w, h) = self.measure(text, style);
        let mut tile = RgbaImage::from_pixel(
            (w.ceil() as u32).max(1),
            (h.ceil() as u32).max(1),
            background.rgba(),
        );
        self.draw(&mut tile, text, w / 2.0, 0.0, Align::Center, style);
        imageops::rotate270(&tile)
    }
}
