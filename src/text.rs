//! C12: a `RenderTarget` that reconstructs reading-order text instead of
//! rasterizing. Ignores everything that isn't `draw_text` (paths,
//! images, clipping) and applies the §4.8 spacing heuristics when
//! stitching glyph runs into words and lines.

use crate::font::Font;
use crate::graphics_state::GraphicsState;
use crate::matrix::Matrix;
use crate::render_target::{GlyphAdvance, ImageHandle, Path, RenderTarget};

/// One `draw_text` call's worth of decoded text, in device space.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub page: usize,
}

/// Reconstructs text in reading order across a document's pages.
/// Consecutive fragments are joined with a newline when the vertical
/// gap between baselines exceeds half the font size, a space when the
/// horizontal gap exceeds a fifth of the font size, and otherwise
/// concatenated directly (§4.8).
pub struct TextExtractor {
    fragments: Vec<Fragment>,
    current_page: usize,
}

impl TextExtractor {
    pub fn new() -> TextExtractor {
        TextExtractor { fragments: Vec::new(), current_page: 0 }
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn into_text(self) -> String {
        let mut out = String::new();
        let mut prev: Option<&Fragment> = None;
        for frag in &self.fragments {
            if let Some(p) = prev {
                if frag.page != p.page {
                    out.push('\n');
                } else {
                    let dy = (frag.y - p.y).abs();
                    let dx = frag.x - (p.x + p.font_size * 0.5 * p.text.chars().count() as f32);
                    let effective_size = p.font_size.max(1.0);
                    if dy > 0.5 * effective_size {
                        out.push('\n');
                    } else if dx > 0.2 * effective_size {
                        out.push(' ');
                    }
                }
            }
            out.push_str(&frag.text);
            prev = Some(frag);
        }
        out
    }
}

impl Default for TextExtractor {
    fn default() -> TextExtractor {
        TextExtractor::new()
    }
}

/// Effective font size for spacing decisions: `sqrt(m12^2 + m22^2)` of
/// the combined text-rendering matrix (§4.8), which accounts for
/// rotation and non-uniform scale baked into the text/line matrices.
fn effective_font_size(ctm: Matrix, text_matrix: Matrix) -> f32 {
    let combined = text_matrix.compose(&ctm);
    let m = combined.as_array();
    (m[1] * m[1] + m[3] * m[3]).sqrt()
}

impl RenderTarget for TextExtractor {
    fn begin_page(&mut self, page_number: usize, _width: f32, _height: f32, _scale: f32, _crop_offset_x: f32, _crop_offset_y: f32) {
        self.current_page = page_number;
    }

    fn end_page(&mut self) {}

    fn clear(&mut self) {
        self.fragments.clear();
    }

    fn current_page_number(&self) -> usize {
        self.current_page
    }

    fn save_state(&mut self) {}
    fn restore_state(&mut self) {}
    fn apply_ctm(&mut self, _matrix: Matrix) {}
    fn on_graphics_state_changed(&mut self, _state: &GraphicsState) {}

    fn stroke_path(&mut self, _path: &Path, _state: &GraphicsState) {}
    fn fill_path(&mut self, _path: &Path, _state: &GraphicsState, _even_odd: bool) {}
    fn fill_and_stroke_path(&mut self, _path: &Path, _state: &GraphicsState, _even_odd: bool) {}
    fn set_clipping_path(&mut self, _path: &Path, _state: &GraphicsState, _even_odd: bool) {}

    fn draw_text(
        &mut self,
        decoded_text: &str,
        _per_glyph_advances: &[GlyphAdvance],
        state: &GraphicsState,
        _font: &dyn Font,
        _original_char_codes: &[u32],
    ) {
        if decoded_text.is_empty() {
            return;
        }
        let (x, y) = state.ctm.apply_point(state.text_matrix.0[4], state.text_matrix.0[5]);
        let scaled = Matrix([state.text.font_size, 0.0, 0.0, state.text.font_size, 0.0, 0.0]).compose(&state.text_matrix);
        let size = effective_font_size(state.ctm, scaled);
        self.fragments.push(Fragment { text: decoded_text.to_string(), x, y, font_size: size.max(1.0), page: self.current_page });
    }

    fn draw_image(&mut self, _image: ImageHandle, _state: &GraphicsState) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::StandardFont;

    fn dummy_state(tx: f32, ty: f32, font_size: f32) -> GraphicsState {
        let mut state = GraphicsState::default();
        state.text_matrix = Matrix::translate(crate::units::Pt(tx), crate::units::Pt(ty));
        state.text.font_size = font_size;
        state
    }

    #[test]
    fn joins_adjacent_runs_without_separator() {
        let mut ex = TextExtractor::new();
        let font = crate::font::standard_font("Helvetica").unwrap();
        let state1 = dummy_state(100.0, 700.0, 12.0);
        ex.draw_text("Hello", &[], &state1, &font, &[]);
        let state2 = dummy_state(130.0, 700.0, 12.0);
        ex.draw_text("World", &[], &state2, &font, &[]);
        let text = ex.into_text();
        assert!(text.contains("Hello") && text.contains("World"));
    }

    #[test]
    fn large_vertical_gap_inserts_newline() {
        let mut ex = TextExtractor::new();
        let font: StandardFont = crate::font::standard_font("Helvetica").unwrap();
        let state1 = dummy_state(100.0, 700.0, 12.0);
        ex.draw_text("Line one", &[], &state1, &font, &[]);
        let state2 = dummy_state(100.0, 650.0, 12.0);
        ex.draw_text("Line two", &[], &state2, &font, &[]);
        assert!(ex.into_text().contains('\n'));
    }

    #[test]
    fn different_pages_always_separate_with_newline() {
        let mut ex = TextExtractor::new();
        let font = crate::font::standard_font("Helvetica").unwrap();
        ex.begin_page(0, 612.0, 792.0, 1.0, 0.0, 0.0);
        ex.draw_text("Page one", &[], &dummy_state(0.0, 0.0, 12.0), &font, &[]);
        ex.begin_page(1, 612.0, 792.0, 1.0, 0.0, 0.0);
        ex.draw_text("Page two", &[], &dummy_state(0.0, 0.0, 12.0), &font, &[]);
        assert!(ex.into_text().contains('\n'));
    }
}
