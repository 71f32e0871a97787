//! C9: the graphics state record and its save/restore stack (§3
//! "Graphics state", §5 "deep-clones mutable sub-structures ... aliases
//! immutable ones").

use std::rc::Rc;

use smallvec::SmallVec;

use crate::color::Color;
use crate::colorspace::ColorSpace;
use crate::matrix::Matrix;

#[derive(Debug, Clone, PartialEq)]
pub struct TextState {
    pub char_spacing: f32,
    pub word_spacing: f32,
    pub horizontal_scaling: f32,
    pub leading: f32,
    pub font_name: Option<String>,
    pub font_size: f32,
    pub rendering_mode: u8,
    pub rise: f32,
}

impl Default for TextState {
    fn default() -> TextState {
        TextState {
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 100.0,
            leading: 0.0,
            font_name: None,
            font_size: 0.0,
            rendering_mode: 0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeState {
    pub line_width: f32,
    pub line_cap: u8,
    pub line_join: u8,
    pub miter_limit: f32,
    pub dash_array: Vec<f32>,
    pub dash_phase: f32,
    pub flatness: f32,
    pub smoothness: f32,
}

impl Default for StrokeState {
    fn default() -> StrokeState {
        StrokeState {
            line_width: 1.0,
            line_cap: 0,
            line_join: 0,
            miter_limit: 10.0,
            dash_array: Vec::new(),
            dash_phase: 0.0,
            flatness: 0.0,
            smoothness: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorState {
    pub space: Rc<ColorSpace>,
    pub components: SmallVec<[f32; 4]>,
    pub pattern_name: Option<String>,
}

impl Default for ColorState {
    fn default() -> ColorState {
        ColorState { space: Rc::new(ColorSpace::DeviceGray), components: SmallVec::from_slice(&[0.0]), pattern_name: None }
    }
}

impl ColorState {
    pub fn color(&self) -> Color {
        self.space.to_color(&self.components)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SoftMaskSubtype {
    Alpha,
    Luminosity,
}

/// A soft mask is treated as a shared, immutable handle per §5 ("soft
/// masks ... are shared by immutable handle"): cloning a `GraphicsState`
/// on `q` bumps only the `Rc`, never re-renders the transparency group.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftMask {
    pub subtype: SoftMaskSubtype,
    pub group_stream: Rc<crate::object::Stream>,
    pub backdrop_color: Option<Vec<f32>>,
    pub transfer_function: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsState {
    pub ctm: Matrix,
    pub text_matrix: Matrix,
    pub text_line_matrix: Matrix,
    pub text: TextState,
    pub stroke: StrokeState,
    pub fill_color: ColorState,
    pub stroke_color: ColorState,
    pub fill_alpha: f32,
    pub stroke_alpha: f32,
    pub alpha_is_shape: bool,
    pub text_knockout: bool,
    pub stroke_overprint: bool,
    pub fill_overprint: bool,
    pub overprint_mode: i32,
    pub blend_mode: String,
    pub soft_mask: Option<Rc<SoftMask>>,
    /// `W`/`W*` sets this; the next path-painting operator intersects
    /// the clip with the just-finished path and clears the flag (§4.7).
    pub pending_clip: Option<bool>,
}

impl Default for GraphicsState {
    fn default() -> GraphicsState {
        GraphicsState {
            ctm: Matrix::IDENTITY,
            text_matrix: Matrix::IDENTITY,
            text_line_matrix: Matrix::IDENTITY,
            text: TextState::default(),
            stroke: StrokeState::default(),
            fill_color: ColorState::default(),
            stroke_color: ColorState::default(),
            fill_alpha: 1.0,
            stroke_alpha: 1.0,
            alpha_is_shape: false,
            text_knockout: true,
            stroke_overprint: false,
            fill_overprint: false,
            overprint_mode: 0,
            blend_mode: "Normal".to_string(),
            soft_mask: None,
            pending_clip: None,
        }
    }
}

/// Per-page graphics-state stack depth default (§7 Limits).
pub const MAX_GRAPHICS_STATE_DEPTH: usize = 64;

/// The explicit `Vec<GraphicsState>` stack the interpreter owns (§9
/// redesign note: "the stack is an explicit sequence owned by the
/// interpreter"). Never empty; `restore` on a single-element stack is a
/// silent no-op (§4.7 `Q`: "underflow is ignored, not fatal").
pub struct GraphicsStateStack {
    stack: Vec<GraphicsState>,
    max_depth: usize,
}

impl GraphicsStateStack {
    pub fn new(initial: GraphicsState) -> GraphicsStateStack {
        GraphicsStateStack::with_limit(initial, MAX_GRAPHICS_STATE_DEPTH)
    }

    /// Same as [`Self::new`], but with the save-depth cap taken from the
    /// caller's [`crate::config::Limits`] rather than the module default.
    pub fn with_limit(initial: GraphicsState, max_depth: usize) -> GraphicsStateStack {
        GraphicsStateStack { stack: vec![initial], max_depth }
    }

    pub fn current(&self) -> &GraphicsState {
        self.stack.last().expect("graphics state stack is never empty")
    }

    pub fn current_mut(&mut self) -> &mut GraphicsState {
        self.stack.last_mut().expect("graphics state stack is never empty")
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Pushes a clone of the current state. Returns `false` without
    /// pushing if `MAX_GRAPHICS_STATE_DEPTH` is already reached — the
    /// caller treats this as a best-effort interpreter-scope condition
    /// (§7), not a fatal error.
    pub fn save(&mut self) -> bool {
        if self.stack.len() >= self.max_depth {
            return false;
        }
        let top = self.current().clone();
        self.stack.push(top);
        true
    }

    pub fn restore(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_on_singleton_stack_is_noop() {
        let mut stack = GraphicsStateStack::new(GraphicsState::default());
        stack.restore();
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn save_refuses_past_max_depth() {
        let mut stack = GraphicsStateStack::new(GraphicsState::default());
        for _ in 0..(MAX_GRAPHICS_STATE_DEPTH - 1) {
            assert!(stack.save());
        }
        assert_eq!(stack.depth(), MAX_GRAPHICS_STATE_DEPTH);
        assert!(!stack.save());
        assert_eq!(stack.depth(), MAX_GRAPHICS_STATE_DEPTH);
    }

    #[test]
    fn save_restore_roundtrips_state() {
        let mut stack = GraphicsStateStack::new(GraphicsState::default());
        stack.save();
        stack.current_mut().stroke.line_width = 5.0;
        assert_eq!(stack.depth(), 2);
        stack.restore();
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.current().stroke.line_width, 1.0);
    }
}
