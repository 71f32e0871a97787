//! C10: the content-stream interpreter. Walks a `Vec<Operator>`,
//! maintaining a `GraphicsStateStack` and a `ResourceStack`, and drives
//! a `RenderTarget` implementation — `text::TextExtractor` or an
//! external rasterizer (§1, §4.7).

use std::rc::Rc;

use log::warn;

use crate::colorspace::ColorSpace;
use crate::config::{Limits, ParseOptions};
use crate::content::{ContentParser, Operator, TextArrayItem};
use crate::document::Document;
use crate::error::{Error, Result};
use crate::font::{Font, SimpleFont, Type0Font};
use crate::graphics_state::{ColorState, GraphicsState, GraphicsStateStack, SoftMask, SoftMaskSubtype, TextState};
use crate::matrix::Matrix;
use crate::object::{Dictionary, DictionaryExt, Object};
use crate::render_target::{GlyphAdvance, ImageHandle, Path, RenderTarget};
use crate::resources::ResourceStack;

/// Form XObject recursion depth cap (§7: "cap Form XObject nesting, do
/// not let a self-referential `/XObject` hang the interpreter").
pub const MAX_FORM_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
enum TextObjectState {
    OutsideText,
    InsideText,
}

pub struct ContentInterpreter<'d> {
    doc: &'d Document,
    state: GraphicsStateStack,
    resources: ResourceStack,
    path: Path,
    text_mode: TextObjectState,
    fonts: std::collections::HashMap<String, Rc<dyn Font>>,
    form_depth: usize,
    limits: Limits,
    fail_on_error: bool,
}

impl<'d> ContentInterpreter<'d> {
    pub fn new(doc: &'d Document, initial_resources: Dictionary, initial_ctm: Matrix) -> ContentInterpreter<'d> {
        ContentInterpreter::with_options(doc, initial_resources, initial_ctm, &ParseOptions::default())
    }

    /// Same as [`Self::new`], but with depth/stack caps and the
    /// strict/best-effort error posture taken from `options` rather than
    /// their module defaults.
    pub fn with_options(
        doc: &'d Document,
        initial_resources: Dictionary,
        initial_ctm: Matrix,
        options: &ParseOptions,
    ) -> ContentInterpreter<'d> {
        let mut initial_state = GraphicsState::default();
        initial_state.ctm = initial_ctm;
        ContentInterpreter {
            doc,
            state: GraphicsStateStack::with_limit(initial_state, options.limits.max_graphics_state_depth),
            resources: ResourceStack::new(initial_resources),
            path: Path::default(),
            text_mode: TextObjectState::OutsideText,
            fonts: std::collections::HashMap::new(),
            form_depth: 0,
            limits: options.limits,
            fail_on_error: options.fail_on_error,
        }
    }

    /// The graphics state as of the most recently dispatched operator —
    /// callers that need to inspect CTM/text-matrix/color state after a
    /// `run` (or between multiple `run` calls against the same page)
    /// without threading it through a `RenderTarget`.
    pub fn current_state(&self) -> &GraphicsState {
        self.state.current()
    }

    /// Runs a page (or Form XObject, or annotation appearance stream)
    /// content stream against `target`.
    pub fn run(&mut self, content: &[u8], target: &mut dyn RenderTarget) -> Result<()> {
        let ops = ContentParser::parse_all_with_limit(content, self.limits.max_operand_stack_depth);
        for op in ops {
            if let Err(e) = self.dispatch(&op, target) {
                if self.fail_on_error {
                    return Err(e);
                }
                warn!("content operator failed, skipping: {e}");
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, op: &Operator, target: &mut dyn RenderTarget) -> Result<()> {
        match op {
            Operator::PushGraphicsState => {
                if self.state.save() {
                    target.save_state();
                } else {
                    warn!("graphics state stack depth exceeded, dropping q");
                }
            }
            Operator::PopGraphicsState => {
                self.state.restore();
                target.restore_state();
            }
            Operator::ConcatMatrix(m) => {
                let new = Matrix(*m).compose(&self.state.current().ctm);
                self.state.current_mut().ctm = new;
                target.apply_ctm(new);
            }
            Operator::SetLineWidth(w) => self.state.current_mut().stroke.line_width = *w,
            Operator::SetLineCap(c) => self.state.current_mut().stroke.line_cap = (*c).clamp(0, 2) as u8,
            Operator::SetLineJoin(j) => self.state.current_mut().stroke.line_join = (*j).clamp(0, 2) as u8,
            Operator::SetMiterLimit(m) => self.state.current_mut().stroke.miter_limit = *m,
            Operator::SetDashPattern(arr, phase) => {
                self.state.current_mut().stroke.dash_array = arr.clone();
                self.state.current_mut().stroke.dash_phase = *phase;
            }
            Operator::SetRenderingIntent(_) => {}
            Operator::SetFlatness(f) => self.state.current_mut().stroke.flatness = *f,
            Operator::SetExtGState(name) => self.apply_ext_gstate(name, target)?,

            Operator::MoveTo(x, y) => self.path.move_to(*x, *y),
            Operator::LineTo(x, y) => self.path.line_to(*x, *y),
            Operator::CurveTo(x1, y1, x2, y2, x3, y3) => self.path.cubic_to(*x1, *y1, *x2, *y2, *x3, *y3),
            Operator::CurveToV(x2, y2, x3, y3) => {
                let (x1, y1) = self.path.current_point().unwrap_or((*x2, *y2));
                self.path.cubic_to(x1, y1, *x2, *y2, *x3, *y3);
            }
            Operator::CurveToY(x1, y1, x3, y3) => self.path.cubic_to(*x1, *y1, *x3, *y3, *x3, *y3),
            Operator::Rectangle(x, y, w, h) => self.path.rectangle(*x, *y, *w, *h),
            Operator::ClosePath => self.path.close_path(),

            Operator::Stroke => self.paint(target, Paint::Stroke),
            Operator::CloseAndStroke => {
                self.path.close_path();
                self.paint(target, Paint::Stroke);
            }
            Operator::Fill => self.paint(target, Paint::Fill(false)),
            Operator::FillEvenOdd => self.paint(target, Paint::Fill(true)),
            Operator::FillAndStroke => self.paint(target, Paint::FillAndStroke(false)),
            Operator::FillAndStrokeEvenOdd => self.paint(target, Paint::FillAndStroke(true)),
            Operator::CloseFillAndStroke => {
                self.path.close_path();
                self.paint(target, Paint::FillAndStroke(false));
            }
            Operator::CloseFillAndStrokeEvenOdd => {
                self.path.close_path();
                self.paint(target, Paint::FillAndStroke(true));
            }
            Operator::EndPathNoPaint => self.paint(target, Paint::None),

            Operator::ClipNonZero => self.state.current_mut().pending_clip = Some(false),
            Operator::ClipEvenOdd => self.state.current_mut().pending_clip = Some(true),

            Operator::BeginText => {
                self.text_mode = TextObjectState::InsideText;
                self.state.current_mut().text_matrix = Matrix::IDENTITY;
                self.state.current_mut().text_line_matrix = Matrix::IDENTITY;
            }
            Operator::EndText => self.text_mode = TextObjectState::OutsideText,

            Operator::SetCharSpacing(v) => self.state.current_mut().text.char_spacing = *v,
            Operator::SetWordSpacing(v) => self.state.current_mut().text.word_spacing = *v,
            Operator::SetHorizontalScaling(v) => self.state.current_mut().text.horizontal_scaling = *v,
            Operator::SetLeading(v) => self.state.current_mut().text.leading = *v,
            Operator::SetFont(name, size) => {
                self.state.current_mut().text.font_name = Some(name.clone());
                self.state.current_mut().text.font_size = *size;
            }
            Operator::SetRenderingMode(m) => self.state.current_mut().text.rendering_mode = (*m).max(0) as u8,
            Operator::SetTextRise(v) => self.state.current_mut().text.rise = *v,

            // §4.7 "text positioning"/"text showing": issued OutsideText
            // these are silently dropped (spec.md:103, :118).
            Operator::MoveTextPosition(tx, ty) => {
                if self.text_mode == TextObjectState::InsideText {
                    self.move_text_position(*tx, *ty);
                }
            }
            Operator::MoveTextPositionAndSetLeading(tx, ty) => {
                if self.text_mode == TextObjectState::InsideText {
                    self.state.current_mut().text.leading = -*ty;
                    self.move_text_position(*tx, *ty);
                }
            }
            Operator::SetTextMatrix(m) => {
                if self.text_mode == TextObjectState::InsideText {
                    self.state.current_mut().text_matrix = Matrix(*m);
                    self.state.current_mut().text_line_matrix = Matrix(*m);
                }
            }
            Operator::NextLine => {
                if self.text_mode == TextObjectState::InsideText {
                    let leading = self.state.current().text.leading;
                    self.move_text_position(0.0, -leading);
                }
            }

            Operator::ShowText(bytes) => {
                if self.text_mode == TextObjectState::InsideText {
                    self.show_text(bytes, target)?;
                }
            }
            Operator::ShowTextArray(items) => {
                if self.text_mode == TextObjectState::InsideText {
                    self.show_text_array(items, target)?;
                }
            }
            Operator::NextLineShowText(bytes) => {
                if self.text_mode == TextObjectState::InsideText {
                    let leading = self.state.current().text.leading;
                    self.move_text_position(0.0, -leading);
                    self.show_text(bytes, target)?;
                }
            }
            Operator::SetSpacingNextLineShowText(aw, ac, bytes) => {
                if self.text_mode == TextObjectState::InsideText {
                    self.state.current_mut().text.word_spacing = *aw;
                    self.state.current_mut().text.char_spacing = *ac;
                    let leading = self.state.current().text.leading;
                    self.move_text_position(0.0, -leading);
                    self.show_text(bytes, target)?;
                }
            }

            Operator::SetFillColorSpace(name) => self.set_color_space(name, true)?,
            Operator::SetStrokeColorSpace(name) => self.set_color_space(name, false)?,
            Operator::SetFillColor(comps, pat) => self.set_color(comps.clone(), pat.clone(), true),
            Operator::SetStrokeColor(comps, pat) => self.set_color(comps.clone(), pat.clone(), false),
            Operator::SetFillGray(g) => self.set_device_color(ColorSpace::DeviceGray, vec![*g], true),
            Operator::SetStrokeGray(g) => self.set_device_color(ColorSpace::DeviceGray, vec![*g], false),
            Operator::SetFillRgb(r, g, b) => self.set_device_color(ColorSpace::DeviceRgb, vec![*r, *g, *b], true),
            Operator::SetStrokeRgb(r, g, b) => self.set_device_color(ColorSpace::DeviceRgb, vec![*r, *g, *b], false),
            Operator::SetFillCmyk(c, m, y, k) => self.set_device_color(ColorSpace::DeviceCmyk, vec![*c, *m, *y, *k], true),
            Operator::SetStrokeCmyk(c, m, y, k) => self.set_device_color(ColorSpace::DeviceCmyk, vec![*c, *m, *y, *k], false),

            Operator::PaintXObject(name) => self.paint_xobject(name, target)?,
            Operator::InlineImage { .. } => target.draw_image(ImageHandle::Named("__inline__"), self.state.current()),

            Operator::MarkedContentPoint
            | Operator::BeginMarkedContent
            | Operator::EndMarkedContent
            | Operator::BeginCompatibility
            | Operator::EndCompatibility => {}

            Operator::Generic { name, .. } => warn!("unrecognized or malformed operator {name:?}"),
        }
        Ok(())
    }

    fn move_text_position(&mut self, tx: f32, ty: f32) {
        let translate = Matrix::translate(crate::units::Pt(tx), crate::units::Pt(ty));
        let new = translate.compose(&self.state.current().text_line_matrix);
        self.state.current_mut().text_line_matrix = new;
        self.state.current_mut().text_matrix = new;
    }

    fn paint(&mut self, target: &mut dyn RenderTarget, kind: Paint) {
        let state = self.state.current().clone();
        if let Some(even_odd) = state.pending_clip {
            target.set_clipping_path(&self.path, &state, even_odd);
        }
        match kind {
            Paint::Stroke => target.stroke_path(&self.path, &state),
            Paint::Fill(eo) => target.fill_path(&self.path, &state, eo),
            Paint::FillAndStroke(eo) => target.fill_and_stroke_path(&self.path, &state, eo),
            Paint::None => {}
        }
        self.state.current_mut().pending_clip = None;
        self.path.clear();
    }

    fn resolve_font(&mut self, name: &str) -> Result<Rc<dyn Font>> {
        if let Some(f) = self.fonts.get(name) {
            return Ok(f.clone());
        }
        let obj = self
            .resources
            .lookup_resolved(self.doc, "Font", name)?
            .ok_or_else(|| Error::ParseError(format!("font resource {name:?} not found")))?;
        let dict = obj.as_dict().cloned().unwrap_or_default();
        let subtype = dict.get_str("Subtype").unwrap_or("");
        let font: Rc<dyn Font> = if subtype == "Type0" {
            Rc::new(Type0Font::load(self.doc, &dict)?)
        } else {
            Rc::new(SimpleFont::load(self.doc, &dict)?)
        };
        self.fonts.insert(name.to_string(), font.clone());
        Ok(font)
    }

    /// Applies `text.horizontal_scaling` exactly once, in the shared
    /// advance computation below, rather than separately in both the
    /// advance and the rendered glyph transform.
    fn show_text(&mut self, bytes: &[u8], target: &mut dyn RenderTarget) -> Result<()> {
        let Some(font_name) = self.state.current().text.font_name.clone() else {
            warn!("Tj/' with no active font, skipping");
            return Ok(());
        };
        let font = self.resolve_font(&font_name)?;
        self.render_run(font.as_ref(), bytes, target);
        Ok(())
    }

    fn show_text_array(&mut self, items: &[TextArrayItem], target: &mut dyn RenderTarget) -> Result<()> {
        let Some(font_name) = self.state.current().text.font_name.clone() else {
            warn!("TJ with no active font, skipping");
            return Ok(());
        };
        let font = self.resolve_font(&font_name)?;
        for item in items {
            match item {
                TextArrayItem::String(bytes) => self.render_run(font.as_ref(), bytes, target),
                TextArrayItem::Adjustment(amount) => self.apply_kerning(*amount),
            }
        }
        Ok(())
    }

    /// Horizontal displacement for a `TJ` number, in unscaled text-space
    /// units (§4.8): subtracted from the advance, scaled by font size
    /// and the single horizontal-scaling factor applied here.
    fn apply_kerning(&mut self, amount: f32) {
        let text = &self.state.current().text;
        let hscale = text.horizontal_scaling / 100.0;
        let tx = -(amount / 1000.0) * text.font_size * hscale;
        let translate = Matrix::translate(crate::units::Pt(tx), crate::units::Pt(0.0));
        let new = translate.compose(&self.state.current().text_matrix);
        self.state.current_mut().text_matrix = new;
    }

    fn render_run(&mut self, font: &dyn Font, bytes: &[u8], target: &mut dyn RenderTarget) {
        let codes = font.decode_codes(bytes);
        let text = self.state.current().text.clone();
        let hscale = text.horizontal_scaling / 100.0;
        let mut decoded = String::new();
        let mut advances = Vec::with_capacity(codes.len());
        for &code in &codes {
            decoded.push_str(&font.to_unicode(code));
            let w0 = font.character_width(code) / 1000.0;
            let is_space = code == 32 && font.font_type() != crate::font::FontKind::Type0;
            let word = if is_space { text.word_spacing } else { 0.0 };
            let tx = (w0 * text.font_size + text.char_spacing + word) * hscale;
            advances.push(GlyphAdvance { advance_x: tx, advance_y: 0.0 });
        }
        target.draw_text(&decoded, &advances, self.state.current(), font, &codes);
        let total_tx: f32 = advances.iter().map(|a| a.advance_x).sum();
        let translate = Matrix::translate(crate::units::Pt(total_tx), crate::units::Pt(0.0));
        let new = translate.compose(&self.state.current().text_matrix);
        self.state.current_mut().text_matrix = new;
    }

    fn set_color_space(&mut self, name: &str, fill: bool) -> Result<()> {
        let cs_resources = self.resources.lookup("ColorSpace", name).is_some();
        let space = if cs_resources {
            let obj = self.resources.lookup_resolved(self.doc, "ColorSpace", name)?;
            match obj {
                Some(o) => ColorSpace::resolve_object(self.doc, &o, None)?,
                None => ColorSpace::DeviceGray,
            }
        } else {
            ColorSpace::resolve_name(self.doc, name, None)?
        };
        let default_components: smallvec::SmallVec<[f32; 4]> = space.default_components().into();
        let state = ColorState { space: Rc::new(space), components: default_components, pattern_name: None };
        if fill {
            self.state.current_mut().fill_color = state;
        } else {
            self.state.current_mut().stroke_color = state;
        }
        Ok(())
    }

    fn set_color(&mut self, components: Vec<f32>, pattern: Option<String>, fill: bool) {
        let state = if fill { &mut self.state.current_mut().fill_color } else { &mut self.state.current_mut().stroke_color };
        state.components = components.into();
        state.pattern_name = pattern;
    }

    fn set_device_color(&mut self, space: ColorSpace, components: Vec<f32>, fill: bool) {
        let state = ColorState { space: Rc::new(space), components: components.into(), pattern_name: None };
        if fill {
            self.state.current_mut().fill_color = state;
        } else {
            self.state.current_mut().stroke_color = state;
        }
    }

    fn apply_ext_gstate(&mut self, name: &str, target: &mut dyn RenderTarget) -> Result<()> {
        let Some(obj) = self.resources.lookup_resolved(self.doc, "ExtGState", name)? else {
            warn!("ExtGState {name:?} not found, skipping");
            return Ok(());
        };
        let Some(dict) = obj.as_dict() else { return Ok(()) };
        let gs = self.state.current_mut();
        if let Some(lw) = dict.get_f32("LW") {
            gs.stroke.line_width = lw;
        }
        if let Some(lc) = dict.get_i64("LC") {
            gs.stroke.line_cap = lc.clamp(0, 2) as u8;
        }
        if let Some(lj) = dict.get_i64("LJ") {
            gs.stroke.line_join = lj.clamp(0, 2) as u8;
        }
        if let Some(ml) = dict.get_f32("ML") {
            gs.stroke.miter_limit = ml;
        }
        if let Some(op) = dict.get_bool("OP") {
            gs.stroke_overprint = op;
        }
        if let Some(op) = dict.get_bool("op") {
            gs.fill_overprint = op;
        }
        if let Some(opm) = dict.get_i64("OPM") {
            gs.overprint_mode = opm as i32;
        }
        if let Some(fl) = dict.get_f32("FL") {
            gs.stroke.flatness = fl;
        }
        if let Some(sa) = dict.get_bool("SA") {
            gs.stroke.smoothness = if sa { 0.0 } else { gs.stroke.smoothness };
        }
        if let Some(bm) = dict.get("BM") {
            let name = match bm {
                Object::Name(n) => Some(n.as_str().to_string()),
                Object::Array(a) => a.first().and_then(Object::as_name).map(str::to_string),
                _ => None,
            };
            if let Some(name) = name {
                gs.blend_mode = name;
            }
        }
        if let Some(ca) = dict.get_f32("ca") {
            gs.fill_alpha = ca;
        }
        if let Some(ca) = dict.get_f32("CA") {
            gs.stroke_alpha = ca;
        }
        if let Some(ais) = dict.get_bool("AIS") {
            gs.alpha_is_shape = ais;
        }
        if let Some(tk) = dict.get_bool("TK") {
            gs.text_knockout = tk;
        }
        if let Some(font_arr) = dict.get_array("Font") {
            if let Some(size) = font_arr.get(1).and_then(Object::as_f32) {
                gs.text.font_size = size;
            }
        }
        match dict.get("SMask") {
            Some(Object::Name(n)) if n.as_str() == "None" => gs.soft_mask = None,
            Some(smask_obj) => {
                let resolved = self.doc.resolve(smask_obj)?;
                if let Some(sm_dict) = resolved.as_dict() {
                    let subtype = if sm_dict.get_str("S") == Some("Luminosity") {
                        SoftMaskSubtype::Luminosity
                    } else {
                        SoftMaskSubtype::Alpha
                    };
                    if let Some(group_ref) = sm_dict.get("G") {
                        let group = self.doc.resolve(group_ref)?;
                        if let Some(stream) = group.as_stream() {
                            gs.soft_mask = Some(Rc::new(SoftMask {
                                subtype,
                                group_stream: Rc::new(stream.clone()),
                                backdrop_color: sm_dict.get_array("BC").map(|a| a.iter().filter_map(Object::as_f32).collect()),
                                transfer_function: None,
                            }));
                        }
                    }
                }
            }
            None => {}
        }
        target.on_graphics_state_changed(self.state.current());
        Ok(())
    }

    fn paint_xobject(&mut self, name: &str, target: &mut dyn RenderTarget) -> Result<()> {
        let Some(obj) = self.resources.lookup_resolved(self.doc, "XObject", name)? else {
            warn!("XObject {name:?} not found, skipping Do");
            return Ok(());
        };
        let Some(stream) = obj.as_stream() else { return Ok(()) };
        let subtype = stream.dict.get_str("Subtype").unwrap_or("");
        if subtype == "Image" {
            target.draw_image(ImageHandle::Named(name), self.state.current());
            return Ok(());
        }
        if subtype != "Form" {
            return Ok(());
        }
        if self.form_depth >= self.limits.max_form_depth {
            return Err(Error::LimitExceeded("form xobject recursion depth"));
        }
        let form_matrix = stream
            .dict
            .get_array("Matrix")
            .map(|a| {
                let v: Vec<f32> = a.iter().filter_map(Object::as_f32).collect();
                if v.len() == 6 { Matrix([v[0], v[1], v[2], v[3], v[4], v[5]]) } else { Matrix::IDENTITY }
            })
            .unwrap_or(Matrix::IDENTITY);
        let form_resources = crate::resources::resolve_resources(self.doc, &stream.dict);
        let form_resources = if form_resources.is_empty() { self.resources.current_scope().clone() } else { form_resources };
        let content = self.doc.decode_stream_data(stream)?;

        self.state.save();
        target.save_state();
        let new_ctm = form_matrix.compose(&self.state.current().ctm);
        self.state.current_mut().ctm = new_ctm;
        target.apply_ctm(new_ctm);
        // §4.7: the sub-interpretation starts with a fresh text state and
        // identity text matrices, inheriting only the CTM from the caller.
        self.state.current_mut().text = TextState::default();
        self.state.current_mut().text_matrix = Matrix::IDENTITY;
        self.state.current_mut().text_line_matrix = Matrix::IDENTITY;
        self.form_depth += 1;
        let saved_path = std::mem::take(&mut self.path);
        self.resources.push(form_resources);
        let result = self.run(&content, target);
        self.resources.pop();
        self.path = saved_path;
        self.form_depth -= 1;
        self.state.restore();
        target.restore_state();
        result
    }
}

enum Paint {
    Stroke,
    Fill(bool),
    FillAndStroke(bool),
    None,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn minimal_pdf() -> Vec<u8> {
        b"%PDF-1.4\n1 0 obj<</Type/Catalog/Pages 2 0 R>>endobj\n2 0 obj<</Type/Pages/Kids[]/Count 0>>endobj\ntrailer<</Root 1 0 R/Size 3>>\n%%EOF".to_vec()
    }

    #[test]
    fn q_cm_q_restores_ctm() {
        let buf = minimal_pdf();
        let doc = Document::load(buf, b"").unwrap();
        let mut interp = ContentInterpreter::new(&doc, Dictionary::new(), Matrix::IDENTITY);
        struct Noop;
        impl RenderTarget for Noop {
            fn begin_page(&mut self, _: usize, _: f32, _: f32, _: f32, _: f32, _: f32) {}
            fn end_page(&mut self) {}
            fn clear(&mut self) {}
            fn current_page_number(&self) -> usize {
                0
            }
            fn save_state(&mut self) {}
            fn restore_state(&mut self) {}
            fn apply_ctm(&mut self, _: Matrix) {}
            fn on_graphics_state_changed(&mut self, _: &GraphicsState) {}
            fn stroke_path(&mut self, _: &Path, _: &GraphicsState) {}
            fn fill_path(&mut self, _: &Path, _: &GraphicsState, _: bool) {}
            fn fill_and_stroke_path(&mut self, _: &Path, _: &GraphicsState, _: bool) {}
            fn set_clipping_path(&mut self, _: &Path, _: &GraphicsState, _: bool) {}
            fn draw_text(&mut self, _: &str, _: &[GlyphAdvance], _: &GraphicsState, _: &dyn Font, _: &[u32]) {}
            fn draw_image(&mut self, _: ImageHandle, _: &GraphicsState) {}
        }
        let mut target = Noop;
        interp.run(b"q 2 0 0 2 0 0 cm Q", &mut target).unwrap();
        assert_eq!(interp.state.current().ctm, Matrix::IDENTITY);
    }

    #[test]
    fn cm_premultiplies_ctm() {
        let buf = minimal_pdf();
        let doc = Document::load(buf, b"").unwrap();
        let mut interp = ContentInterpreter::new(&doc, Dictionary::new(), Matrix::IDENTITY);
        struct Noop;
        impl RenderTarget for Noop {
            fn begin_page(&mut self, _: usize, _: f32, _: f32, _: f32, _: f32, _: f32) {}
            fn end_page(&mut self) {}
            fn clear(&mut self) {}
            fn current_page_number(&self) -> usize {
                0
            }
            fn save_state(&mut self) {}
            fn restore_state(&mut self) {}
            fn apply_ctm(&mut self, _: Matrix) {}
            fn on_graphics_state_changed(&mut self, _: &GraphicsState) {}
            fn stroke_path(&mut self, _: &Path, _: &GraphicsState) {}
            fn fill_path(&mut self, _: &Path, _: &GraphicsState, _: bool) {}
            fn fill_and_stroke_path(&mut self, _: &Path, _: &GraphicsState, _: bool) {}
            fn set_clipping_path(&mut self, _: &Path, _: &GraphicsState, _: bool) {}
            fn draw_text(&mut self, _: &str, _: &[GlyphAdvance], _: &GraphicsState, _: &dyn Font, _: &[u32]) {}
            fn draw_image(&mut self, _: ImageHandle, _: &GraphicsState) {}
        }
        let mut target = Noop;
        interp.run(b"2 0 0 2 10 10 cm", &mut target).unwrap();
        assert_eq!(interp.state.current().ctm, Matrix([2.0, 0.0, 0.0, 2.0, 10.0, 10.0]));
    }
}
