//! Procedural renderer for studio canvases.
//!
//! A render is fully determined by its [`ArtParams`] and canvas size: the
//! seed drives every random choice, so the same inputs always produce the
//! same pixels.

use std::f32::consts::TAU;
use std::io::Cursor;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageError, ImageFormat, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::StudioError;
use crate::studio::palette::{Palette, Rgb, Shape};

pub const DEFAULT_COMPLEXITY: u32 = 15;
pub const DEFAULT_RANDOMNESS: u32 = 60;
pub const MAX_COMPLEXITY: u32 = 100;
pub const MAX_RANDOMNESS: u32 = 100;

/// Generator parameters chosen in the studio form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtParams {
    pub palette: Palette,
    pub shape: Shape,
    /// Number of shapes, 1..=100.
    pub complexity: u32,
    /// How far sizes and rotations stray from the base, 0..=100.
    pub randomness: u32,
    pub seed: u64,
}

impl Default for ArtParams {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            shape: Shape::default(),
            complexity: DEFAULT_COMPLEXITY,
            randomness: DEFAULT_RANDOMNESS,
            seed: 0,
        }
    }
}

impl ArtParams {
    /// Clamps out-of-range values into the supported ranges.
    pub fn clamped(mut self) -> Self {
        self.complexity = self.complexity.clamp(1, MAX_COMPLEXITY);
        self.randomness = self.randomness.min(MAX_RANDOMNESS);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Outline {
    Circle { cx: f32, cy: f32, r: f32 },
    Rect { x0: f32, y0: f32, x1: f32, y1: f32 },
    Triangle { pts: [(f32, f32); 3] },
}

impl Outline {
    /// Horizontal extent covered at height `y`, if any.
    fn span(&self, y: f32) -> Option<(f32, f32)> {
        match *self {
            Outline::Circle { cx, cy, r } => {
                let dy = y - cy;
                if dy.abs() > r {
                    return None;
                }
                let half = (r * r - dy * dy).sqrt();
                Some((cx - half, cx + half))
            }
            Outline::Rect { x0, y0, x1, y1 } => (y >= y0 && y < y1).then_some((x0, x1)),
            Outline::Triangle { pts } => {
                let mut lo = f32::INFINITY;
                let mut hi = f32::NEG_INFINITY;
                for i in 0..3 {
                    let (ax, ay) = pts[i];
                    let (bx, by) = pts[(i + 1) % 3];
                    if ay == by || y < ay.min(by) || y > ay.max(by) {
                        continue;
                    }
                    let x = ax + (y - ay) * (bx - ax) / (by - ay);
                    lo = lo.min(x);
                    hi = hi.max(x);
                }
                (lo <= hi).then_some((lo, hi))
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Stroke {
    outline: Outline,
    color: Rgb,
    alpha: u8,
}

fn compose(params: &ArtParams, width: u32, height: u32) -> Vec<Stroke> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let spread = params.randomness as f32 / 100.0;
    let base = width.min(height) as f32 / 10.0;
    let colors = params.palette.foreground();

    (0..params.complexity)
        .map(|_| {
            let kind = match params.shape {
                Shape::Mixed => [Shape::Circle, Shape::Square, Shape::Triangle][rng.random_range(0..3)],
                fixed => fixed,
            };
            let cx = rng.random_range(0.0..width as f32);
            let cy = rng.random_range(0.0..height as f32);
            let size = base * (1.0 + spread * rng.random_range(-0.5..2.0f32));
            let color = colors[rng.random_range(0..colors.len())];
            let alpha = rng.random_range(140..=230u8);

            let outline = match kind {
                Shape::Circle => Outline::Circle { cx, cy, r: size / 2.0 },
                Shape::Square => {
                    let half = size / 2.0;
                    Outline::Rect { x0: cx - half, y0: cy - half, x1: cx + half, y1: cy + half }
                }
                _ => {
                    let turn = spread * rng.random_range(0.0..TAU);
                    let r = size / 1.5;
                    let vertex = |k: f32| {
                        let a = turn + k * TAU / 3.0;
                        (cx + r * a.cos(), cy + r * a.sin())
                    };
                    Outline::Triangle { pts: [vertex(0.0), vertex(1.0), vertex(2.0)] }
                }
            };

            Stroke { outline, color, alpha }
        })
        .collect()
}

/// A rendered piece, ready to be shown or serialized.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbaImage,
    params: ArtParams,
}

impl Canvas {
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn params(&self) -> &ArtParams {
        &self.params
    }

    pub fn to_png(&self) -> Result<Vec<u8>, ImageError> {
        let mut bytes = Vec::new();
        self.image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    /// The canvas as a `data:image/png;base64,...` string, the form the
    /// server stores.
    pub fn to_data_url(&self) -> Result<String, StudioError> {
        let png = self.to_png()?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
    }

    pub fn save_png(&self, path: &Path) -> Result<(), ImageError> {
        self.image.save_with_format(path, ImageFormat::Png)
    }
}

/// Paints `params` onto a fresh `width` x `height` canvas. Rows are
/// rasterized in parallel; within a row strokes are applied in order.
pub fn render(params: &ArtParams, width: u32, height: u32) -> Canvas {
    let params = params.clamped();
    let width = width.max(1);
    let height = height.max(1);
    let strokes = compose(&params, width, height);
    let [br, bg, bb] = params.palette.background();

    let mut image = RgbaImage::new(width, height);
    let row_len = width as usize * 4;
    image.par_chunks_mut(row_len).enumerate().for_each(|(y, row)| {
        for px in row.chunks_exact_mut(4) {
            px.copy_from_slice(&[br, bg, bb, 255]);
        }

        let yc = y as f32 + 0.5;
        for stroke in &strokes {
            let Some((left, right)) = stroke.outline.span(yc) else {
                continue;
            };
            // Pixel x is covered when its centre x + 0.5 lies inside the span.
            let first = (left - 0.5).ceil().max(0.0);
            let last = (right - 0.5).floor().min(width as f32 - 1.0);
            if first > last {
                continue;
            }
            for x in first as usize..=last as usize {
                blend(&mut row[x * 4..x * 4 + 4], stroke.color, stroke.alpha);
            }
        }
    });

    Canvas { image, params }
}

fn blend(px: &mut [u8], color: Rgb, alpha: u8) {
    let a = alpha as u16;
    for (dst, src) in px.iter_mut().zip(color) {
        *dst = ((src as u16 * a + *dst as u16 * (255 - a)) / 255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_is_deterministic_per_seed() {
        let params = ArtParams { seed: 7, ..ArtParams::default() };
        let a = render(&params, 64, 48);
        let b = render(&params, 64, 48);
        assert_eq!(a.image().as_raw(), b.image().as_raw());

        let other = render(&ArtParams { seed: 8, ..params }, 64, 48);
        assert_ne!(a.image().as_raw(), other.image().as_raw());
    }

    #[test]
    fn test_render_paints_shapes_over_background() {
        let params = ArtParams {
            palette: Palette::Monochrome,
            complexity: 40,
            ..ArtParams::default()
        };
        let canvas = render(&params, 80, 80);
        assert_eq!(canvas.image().dimensions(), (80, 80));

        let [r, g, b] = Palette::Monochrome.background();
        let painted = canvas
            .image()
            .pixels()
            .filter(|p| p.0 != [r, g, b, 255])
            .count();
        assert!(painted > 0);
    }

    #[test]
    fn test_zero_sized_canvas_is_clamped() {
        let canvas = render(&ArtParams::default(), 0, 0);
        assert_eq!(canvas.image().dimensions(), (1, 1));
    }

    #[test]
    fn test_params_are_clamped() {
        let params = ArtParams { complexity: 0, randomness: 500, ..ArtParams::default() }.clamped();
        assert_eq!(params.complexity, 1);
        assert_eq!(params.randomness, MAX_RANDOMNESS);
    }

    #[test]
    fn test_data_url_holds_png() {
        let canvas = render(&ArtParams::default(), 16, 16);
        let url = canvas.to_data_url().unwrap();
        let payload = url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = STANDARD.decode(payload).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_circle_span() {
        let circle = Outline::Circle { cx: 10.0, cy: 10.0, r: 5.0 };
        assert_eq!(circle.span(10.0), Some((5.0, 15.0)));
        assert_eq!(circle.span(16.0), None);
    }

    #[test]
    fn test_triangle_span() {
        let tri = Outline::Triangle { pts: [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)] };
        let (lo, hi) = tri.span(5.0).unwrap();
        assert!((lo - 0.0).abs() < 1e-4);
        assert!((hi - 5.0).abs() < 1e-4);
        assert_eq!(tri.span(11.0), None);
    }

    #[test]
    fn test_blend_is_weighted_by_alpha() {
        let mut px = [0u8, 0, 0, 255];
        blend(&mut px, [255, 255, 255], 255);
        assert_eq!(px, [255, 255, 255, 255]);

        let mut px = [0u8, 0, 0, 255];
        blend(&mut px, [255, 0, 0], 0);
        assert_eq!(px, [0, 0, 0, 255]);
    }
}
