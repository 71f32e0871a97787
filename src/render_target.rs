//! C13: the abstract boundary between the interpreter and a concrete
//! rasterizer (§6 "Render-target contract"). The interpreter drives any
//! `RenderTarget` implementation; `text::TextExtractor` is the one
//! shipped in this core, a concrete pixel rasterizer is an external
//! collaborator (§1).

use crate::color::Color;
use crate::font::Font;
use crate::graphics_state::GraphicsState;
use crate::matrix::Matrix;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    CubicTo(f32, f32, f32, f32, f32, f32),
    ClosePath,
}

/// A single path under construction, in the coordinate space it was
/// built in (user space — the interpreter applies the CTM once, at
/// paint time, via `GraphicsState::ctm`, rather than baking it into
/// each segment).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    pub segments: Vec<Segment>,
}

impl Path {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.segments.push(Segment::MoveTo(x, y));
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        self.segments.push(Segment::LineTo(x, y));
    }

    pub fn cubic_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32) {
        self.segments.push(Segment::CubicTo(x1, y1, x2, y2, x3, y3));
    }

    /// `re x y w h`: a move, three lines and an implicit close (§4.7).
    pub fn rectangle(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.segments.push(Segment::MoveTo(x, y));
        self.segments.push(Segment::LineTo(x + w, y));
        self.segments.push(Segment::LineTo(x + w, y + h));
        self.segments.push(Segment::LineTo(x, y + h));
        self.segments.push(Segment::ClosePath);
    }

    pub fn close_path(&mut self) {
        self.segments.push(Segment::ClosePath);
    }

    /// The point a subsequent `h`/close should return to: the most
    /// recent `MoveTo` (or subpath start after a previous `ClosePath`).
    pub fn current_subpath_start(&self) -> Option<(f32, f32)> {
        let mut start = None;
        for seg in &self.segments {
            match seg {
                Segment::MoveTo(x, y) => start = Some((*x, *y)),
                Segment::ClosePath => start = None,
                _ => {}
            }
        }
        start
    }

    pub fn current_point(&self) -> Option<(f32, f32)> {
        for seg in self.segments.iter().rev() {
            match seg {
                Segment::MoveTo(x, y) | Segment::LineTo(x, y) => return Some((*x, *y)),
                Segment::CubicTo(.., x3, y3) => return Some((*x3, *y3)),
                Segment::ClosePath => continue,
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageHandle<'a> {
    /// A named XObject resolved from `/XObject` resources.
    Named(&'a str),
}

/// A single decoded glyph position + advance emitted by `DrawText`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphAdvance {
    pub advance_x: f32,
    pub advance_y: f32,
}

/// The render-target contract (§6). The interpreter (C10) and the text
/// extractor (C12) are both drivers of this trait; a concrete pixel
/// rasterizer is the one external collaborator this core never
/// implements itself (§1).
pub trait RenderTarget {
    fn begin_page(&mut self, page_number: usize, width: f32, height: f32, scale: f32, crop_offset_x: f32, crop_offset_y: f32);
    fn end_page(&mut self);
    fn clear(&mut self);
    fn current_page_number(&self) -> usize;

    fn save_state(&mut self);
    fn restore_state(&mut self);
    fn apply_ctm(&mut self, matrix: Matrix);
    fn on_graphics_state_changed(&mut self, state: &GraphicsState);

    fn stroke_path(&mut self, path: &Path, state: &GraphicsState);
    fn fill_path(&mut self, path: &Path, state: &GraphicsState, even_odd: bool);
    fn fill_and_stroke_path(&mut self, path: &Path, state: &GraphicsState, even_odd: bool);
    fn set_clipping_path(&mut self, path: &Path, state: &GraphicsState, even_odd: bool);

    fn draw_text(
        &mut self,
        decoded_text: &str,
        per_glyph_advances: &[GlyphAdvance],
        state: &GraphicsState,
        font: &dyn Font,
        original_char_codes: &[u32],
    );
    fn draw_image(&mut self, image: ImageHandle, state: &GraphicsState);
}

/// Convenience device-color accessor most `RenderTarget` impls want
/// alongside `GraphicsState`'s raw `ColorState`.
pub fn fill_device_color(state: &GraphicsState) -> Color {
    state.fill_color.color()
}

pub fn stroke_device_color(state: &GraphicsState) -> Color {
    state.stroke_color.color()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_emits_moveto_three_linetos_and_close() {
        let mut p = Path::default();
        p.rectangle(0.0, 0.0, 10.0, 20.0);
        assert_eq!(
            p.segments,
            vec![
                Segment::MoveTo(0.0, 0.0),
                Segment::LineTo(10.0, 0.0),
                Segment::LineTo(10.0, 20.0),
                Segment::LineTo(0.0, 20.0),
                Segment::ClosePath,
            ]
        );
    }

    #[test]
    fn current_point_follows_curve_endpoint() {
        let mut p = Path::default();
        p.move_to(0.0, 0.0);
        p.cubic_to(1.0, 1.0, 2.0, 2.0, 3.0, 3.0);
        assert_eq!(p.current_point(), Some((3.0, 3.0)));
    }
}
