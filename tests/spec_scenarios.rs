//! End-to-end scenarios driving the public API the way an embedder
//! would: build a tiny PDF in memory, load it, and check the observable
//! result (extracted text, resolved object, painted path).

use md5::{Digest, Md5};

use pdf_interp::document::Document;
use pdf_interp::interpreter::ContentInterpreter;
use pdf_interp::matrix::Matrix;
use pdf_interp::object::Object;
use pdf_interp::render_target::{GlyphAdvance, ImageHandle, Path, RenderTarget};
use pdf_interp::text::TextExtractor;

/// Appends `num 0 obj\n{body}\nendobj\n`, returning the byte offset the
/// object started at (for the xref table).
fn push_obj(buf: &mut Vec<u8>, num: u32, body: &str) -> usize {
    let start = buf.len();
    buf.extend_from_slice(format!("{num} 0 obj\n").as_bytes());
    buf.extend_from_slice(body.as_bytes());
    buf.extend_from_slice(b"\nendobj\n");
    start
}

/// A minimal single-section classic-xref PDF: every entry in
/// `objects` becomes an indirect object, followed by a standard xref
/// table/trailer pointing `/Root` at `root`.
fn classic_pdf(objects: &[(u32, &str)], root: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"%PDF-1.7\n");
    let mut offsets = Vec::new();
    for (num, body) in objects {
        offsets.push((*num, push_obj(&mut buf, *num, body)));
    }
    let xref_offset = buf.len();
    let max_num = offsets.iter().map(|(n, _)| *n).max().unwrap_or(0);
    buf.extend_from_slice(format!("xref\n0 {}\n", max_num + 1).as_bytes());
    buf.extend_from_slice(b"0000000000 65535 f \n");
    for n in 1..=max_num {
        match offsets.iter().find(|(num, _)| *num == n) {
            Some((_, off)) => buf.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes()),
            None => buf.extend_from_slice(b"0000000000 65535 f \n"),
        }
    }
    buf.extend_from_slice(format!("trailer\n<< /Size {} /Root {} 0 R >>\n", max_num + 1, root).as_bytes());
    buf.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF").as_bytes());
    buf
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

fn hello_world_pdf() -> Vec<u8> {
    let content = "BT /F1 12 Tf 100 700 Td (Hello) Tj ET";
    let content_obj = format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content);
    classic_pdf(
        &[
            (1, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>"),
            (3, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"),
            (4, "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>"),
            (5, &content_obj),
        ],
        1,
    )
}

#[test]
fn hello_world_extracts_text_and_one_fragment() {
    let doc = Document::load(hello_world_pdf(), b"").unwrap();
    let pages = doc.pages().unwrap();
    assert_eq!(pages.len(), 1);
    let page = &pages[0];

    let mut extractor = TextExtractor::new();
    let mut interp = ContentInterpreter::new(&doc, page.resources.clone(), Matrix::IDENTITY);
    let contents = page.dict.get("Contents").unwrap();
    let stream = doc.resolve(contents).unwrap();
    let stream = stream.as_stream().unwrap();
    let decoded = doc.decode_stream_data(stream).unwrap();
    interp.run(&decoded, &mut extractor).unwrap();

    assert_eq!(extractor.fragments().len(), 1);
    let frag = &extractor.fragments()[0];
    assert_eq!(frag.text, "Hello");
    assert!((frag.x - 100.0).abs() < 0.01);
    assert!((frag.y - 700.0).abs() < 0.01);
    assert_eq!(extractor.into_text(), "Hello");
}

#[test]
fn incremental_update_shadows_the_base_object() {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"%PDF-1.7\n");
    let off1 = push_obj(&mut buf, 1, "<< /Type /Catalog /Pages 2 0 R >>");
    let off2 = push_obj(&mut buf, 2, "<< /Type /Pages /Kids [] /Count 0 >>");
    let off5_old = push_obj(&mut buf, 5, "(old)");
    let base_xref_offset = buf.len();
    buf.extend_from_slice(b"xref\n0 6\n");
    buf.extend_from_slice(b"0000000000 65535 f \n");
    buf.extend_from_slice(format!("{off1:010} 00000 n \n").as_bytes());
    buf.extend_from_slice(format!("{off2:010} 00000 n \n").as_bytes());
    buf.extend_from_slice(b"0000000000 65535 f \n");
    buf.extend_from_slice(b"0000000000 65535 f \n");
    buf.extend_from_slice(format!("{off5_old:010} 00000 n \n").as_bytes());
    buf.extend_from_slice(b"trailer\n<< /Size 6 /Root 1 0 R >>\n");
    buf.extend_from_slice(format!("startxref\n{base_xref_offset}\n%%EOF\n").as_bytes());

    let off5_new = push_obj(&mut buf, 5, "(new)");
    let update_xref_offset = buf.len();
    buf.extend_from_slice(b"xref\n5 1\n");
    buf.extend_from_slice(format!("{off5_new:010} 00000 n \n").as_bytes());
    buf.extend_from_slice(format!("trailer\n<< /Size 6 /Root 1 0 R /Prev {base_xref_offset} >>\n").as_bytes());
    buf.extend_from_slice(format!("startxref\n{update_xref_offset}\n%%EOF").as_bytes());

    let doc = Document::load(buf, b"").unwrap();
    let obj = doc.get_object(5).unwrap();
    assert_eq!(obj.as_str_bytes(), Some(b"new".as_slice()));
}

#[test]
fn object_number_zero_is_always_null() {
    let doc = Document::load(hello_world_pdf(), b"").unwrap();
    assert_eq!(doc.get_object(0).unwrap(), Object::Null);
}

#[test]
fn compressed_object_stream_resolves_sub_objects() {
    // Object 30 is an ObjStm holding object 10 ("a") at relative offset
    // 0 and object 20 ("bb") at relative offset 3, header "10 0 20 3"
    // (9 bytes, so /First 9).
    let header = "10 0 20 3";
    let data = "(a)(bb)";
    let stream_content = format!("{header}{data}");
    let objstm_obj = format!(
        "<< /Type /ObjStm /N 2 /First {} /Length {} >>\nstream\n{}\nendstream",
        header.len(),
        stream_content.len(),
        stream_content
    );

    let mut buf = Vec::new();
    buf.extend_from_slice(b"%PDF-1.6\n");
    let off30 = push_obj(&mut buf, 30, &objstm_obj);

    // Cross-reference stream: entries for objects 10 (compressed, in
    // stream 30 at index 0), 20 (compressed, index 1) and 30 itself
    // (uncompressed, at off30). /W [1 2 1].
    let mut rows = Vec::new();
    let mut push_row = |kind: u8, f2: u16, f3: u8| {
        rows.push(kind);
        rows.extend_from_slice(&f2.to_be_bytes());
        rows.push(f3);
    };
    push_row(2, 30, 0); // object 10
    push_row(2, 30, 1); // object 20
    push_row(1, off30 as u16, 0); // object 30

    let xref_dict = format!(
        "<< /Type /XRef /Size 31 /W [1 2 1] /Index [10 1 20 1 30 1] /Root 1 0 R /Length {} >>",
        rows.len()
    );
    let xref_obj_offset = buf.len();
    buf.extend_from_slice(format!("2 0 obj\n{xref_dict}\nstream\n").as_bytes());
    buf.extend_from_slice(&rows);
    buf.extend_from_slice(b"\nendstream\nendobj\n");
    buf.extend_from_slice(format!("startxref\n{xref_obj_offset}\n%%EOF").as_bytes());

    let doc = Document::load(buf, b"").unwrap();
    assert_eq!(doc.get_object(10).unwrap().as_str_bytes(), Some(b"a".as_slice()));
    assert_eq!(doc.get_object(20).unwrap().as_str_bytes(), Some(b"bb".as_slice()));
}

const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut s: [u8; 256] = [0; 256];
    for (i, v) in s.iter_mut().enumerate() {
        *v = i as u8;
    }
    let mut j: u8 = 0;
    for i in 0..256 {
        j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
        s.swap(i, j as usize);
    }
    let mut out = Vec::with_capacity(data.len());
    let (mut i, mut j) = (0u8, 0u8);
    for &byte in data {
        i = i.wrapping_add(1);
        j = j.wrapping_add(s[i as usize]);
        s.swap(i as usize, j as usize);
        let k = s[(s[i as usize].wrapping_add(s[j as usize])) as usize];
        out.push(byte ^ k);
    }
    out
}

/// Replicates `SecurityHandler`'s Algorithm 2 (R3, empty user password).
fn derive_file_key_r3_empty(o: &[u8], p: i32, id0: &[u8], key_len: usize) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(PASSWORD_PAD);
    hasher.update(&o[..o.len().min(32)]);
    hasher.update(p.to_le_bytes());
    hasher.update(id0);
    let mut digest = hasher.finalize().to_vec();
    for _ in 0..50 {
        let mut h = Md5::new();
        h.update(&digest[..key_len.min(digest.len())]);
        digest = h.finalize().to_vec();
    }
    digest.truncate(key_len);
    digest
}

/// Replicates Algorithm 5 (R3/R4 /U computation) so the fixture's /U
/// entry authenticates against the file key derived above.
fn compute_u_r3(file_key: &[u8], id0: &[u8]) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(PASSWORD_PAD);
    hasher.update(id0);
    let mut buf = hasher.finalize().to_vec();
    buf = rc4(file_key, &buf);
    for i in 1..=19u8 {
        let round_key: Vec<u8> = file_key.iter().map(|b| b ^ i).collect();
        buf = rc4(&round_key, &buf);
    }
    buf.extend_from_slice(&[0u8; 16]);
    buf
}

fn object_key(file_key: &[u8], num: u32, gen: u16) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(file_key);
    hasher.update(&num.to_le_bytes()[0..3]);
    hasher.update(&gen.to_le_bytes()[0..2]);
    let digest = hasher.finalize();
    let n = (file_key.len() + 5).min(16);
    digest[0..n].to_vec()
}

#[test]
fn encrypted_rc4_128_r3_empty_password_round_trips() {
    let id0 = b"0123456789ABCDEF".to_vec();
    let o = vec![0u8; 32];
    let p: i32 = -4;
    let key_len = 16;
    let file_key = derive_file_key_r3_empty(&o, p, &id0, key_len);
    let u = compute_u_r3(&file_key, &id0);

    let content = "BT /F1 12 Tf 100 700 Td (Secret) Tj ET";
    let content_key = object_key(&file_key, 5, 0);
    let ciphertext = rc4(&content_key, content.as_bytes());

    let mut buf = Vec::new();
    buf.extend_from_slice(b"%PDF-1.7\n");
    let off1 = push_obj(&mut buf, 1, "<< /Type /Catalog /Pages 2 0 R >>");
    let off2 = push_obj(&mut buf, 2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    let off3 = push_obj(
        &mut buf,
        3,
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>",
    );
    let off4 = push_obj(&mut buf, 4, "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>");
    let off5 = buf.len();
    buf.extend_from_slice(format!("5 0 obj\n<< /Length {} >>\nstream\n", ciphertext.len()).as_bytes());
    buf.extend_from_slice(&ciphertext);
    buf.extend_from_slice(b"\nendstream\nendobj\n");

    let xref_offset = buf.len();
    buf.extend_from_slice(b"xref\n0 6\n0000000000 65535 f \n");
    for off in [off1, off2, off3, off4, off5] {
        buf.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }

    let encrypt_dict = format!(
        "<< /Filter /Standard /V 2 /R 3 /Length 128 /P {p} /O <{}> /U <{}> >>",
        hex(&o),
        hex(&u)
    );
    buf.extend_from_slice(
        format!(
            "trailer\n<< /Size 6 /Root 1 0 R /Encrypt {encrypt_dict} /ID [<{}> <{}>] >>\n",
            hex(&id0),
            hex(&id0)
        )
        .as_bytes(),
    );
    buf.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF").as_bytes());

    let doc = Document::load(buf, b"").unwrap();
    assert!(doc.is_encrypted());

    let pages = doc.pages().unwrap();
    let page = &pages[0];
    let contents = page.dict.get("Contents").unwrap();
    let stream = doc.resolve(contents).unwrap();
    let stream = stream.as_stream().unwrap();
    let decoded = doc.decode_stream_data(stream).unwrap();
    assert_eq!(decoded, content.as_bytes());

    let mut extractor = TextExtractor::new();
    let mut interp = ContentInterpreter::new(&doc, page.resources.clone(), Matrix::IDENTITY);
    interp.run(&decoded, &mut extractor).unwrap();
    assert_eq!(extractor.into_text(), "Secret");
}

/// Captures every stroked path, in device space (CTM applied at paint
/// time, matching how a concrete rasterizer would consume the trait).
#[derive(Default)]
struct PathRecorder {
    stroked: Vec<Vec<(f32, f32)>>,
}

impl RenderTarget for PathRecorder {
    fn begin_page(&mut self, _n: usize, _w: f32, _h: f32, _s: f32, _cx: f32, _cy: f32) {}
    fn end_page(&mut self) {}
    fn clear(&mut self) {}
    fn current_page_number(&self) -> usize {
        0
    }
    fn save_state(&mut self) {}
    fn restore_state(&mut self) {}
    fn apply_ctm(&mut self, _m: Matrix) {}
    fn on_graphics_state_changed(&mut self, _s: &pdf_interp::graphics_state::GraphicsState) {}

    fn stroke_path(&mut self, path: &Path, state: &pdf_interp::graphics_state::GraphicsState) {
        let points = path
            .segments
            .iter()
            .filter_map(|seg| match *seg {
                pdf_interp::render_target::Segment::MoveTo(x, y) | pdf_interp::render_target::Segment::LineTo(x, y) => {
                    Some(state.ctm.apply_point(x, y))
                }
                _ => None,
            })
            .collect();
        self.stroked.push(points);
    }
    fn fill_path(&mut self, _p: &Path, _s: &pdf_interp::graphics_state::GraphicsState, _eo: bool) {}
    fn fill_and_stroke_path(&mut self, _p: &Path, _s: &pdf_interp::graphics_state::GraphicsState, _eo: bool) {}
    fn set_clipping_path(&mut self, _p: &Path, _s: &pdf_interp::graphics_state::GraphicsState, _eo: bool) {}
    fn draw_text(
        &mut self,
        _t: &str,
        _a: &[GlyphAdvance],
        _s: &pdf_interp::graphics_state::GraphicsState,
        _f: &dyn pdf_interp::font::Font,
        _c: &[u32],
    ) {
    }
    fn draw_image(&mut self, _i: ImageHandle, _s: &pdf_interp::graphics_state::GraphicsState) {}
}

#[test]
fn cm_composition_transforms_path_points() {
    let doc = Document::load(hello_world_pdf(), b"").unwrap();
    let content = b"q 2 0 0 2 10 20 cm 1 0 0 1 5 0 cm 0 0 m 1 1 l S Q";
    let mut interp = ContentInterpreter::new(&doc, Default::default(), Matrix::IDENTITY);
    let mut target = PathRecorder::default();
    interp.run(content, &mut target).unwrap();

    assert_eq!(target.stroked.len(), 1);
    let pts = &target.stroked[0];
    assert_eq!(pts.len(), 2);
    assert!((pts[0].0 - 20.0).abs() < 0.01 && (pts[0].1 - 20.0).abs() < 0.01);
    assert!((pts[1].0 - 22.0).abs() < 0.01 && (pts[1].1 - 22.0).abs() < 0.01);
}

#[test]
fn q_with_empty_stack_is_a_no_op() {
    let doc = Document::load(hello_world_pdf(), b"").unwrap();
    let mut interp = ContentInterpreter::new(&doc, Default::default(), Matrix::IDENTITY);
    let mut target = PathRecorder::default();
    // A bare Q with nothing pushed must not error or panic.
    interp.run(b"Q 0 0 m 1 1 l S", &mut target).unwrap();
    assert_eq!(target.stroked.len(), 1);
}

#[test]
fn empty_content_stream_drives_no_paint_calls() {
    let doc = Document::load(hello_world_pdf(), b"").unwrap();
    let mut interp = ContentInterpreter::new(&doc, Default::default(), Matrix::IDENTITY);
    let mut target = PathRecorder::default();
    interp.run(b"", &mut target).unwrap();
    assert!(target.stroked.is_empty());
}

#[test]
fn tj_kerning_advances_text_matrix_by_spec_formula() {
    let font_obj = "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /FirstChar 65 /LastChar 66 /Widths [500 500] >>";
    let doc = Document::load(
        classic_pdf(&[(1, "<< /Type /Catalog /Pages 2 0 R >>"), (2, "<< /Type /Pages /Kids [] /Count 0 >>"), (4, font_obj)], 1),
        b"",
    )
    .unwrap();

    let mut resources = pdf_interp::object::Dictionary::new();
    let mut fonts = pdf_interp::object::Dictionary::new();
    fonts.insert(pdf_interp::object::Name::new("F1"), Object::Reference(pdf_interp::object::Reference::new(4, 0)));
    resources.insert(pdf_interp::object::Name::new("Font"), Object::Dictionary(fonts));

    let mut interp = ContentInterpreter::new(&doc, resources, Matrix::IDENTITY);
    let mut target = TextExtractor::new();
    interp.run(b"BT /F1 10 Tf [(A) -50 (B)] TJ ET", &mut target).unwrap();

    let tx = interp.current_state().text_matrix.as_array()[4];
    assert!((tx - 10.5).abs() < 0.01, "expected text matrix tx 10.5, got {tx}");
}

#[test]
fn tj_with_empty_array_leaves_text_matrix_untranslated() {
    let font_obj = "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /FirstChar 65 /LastChar 66 /Widths [500 500] >>";
    let doc = Document::load(
        classic_pdf(&[(1, "<< /Type /Catalog /Pages 2 0 R >>"), (2, "<< /Type /Pages /Kids [] /Count 0 >>"), (4, font_obj)], 1),
        b"",
    )
    .unwrap();

    let mut resources = pdf_interp::object::Dictionary::new();
    let mut fonts = pdf_interp::object::Dictionary::new();
    fonts.insert(pdf_interp::object::Name::new("F1"), Object::Reference(pdf_interp::object::Reference::new(4, 0)));
    resources.insert(pdf_interp::object::Name::new("Font"), Object::Dictionary(fonts));

    let mut interp = ContentInterpreter::new(&doc, resources, Matrix::IDENTITY);
    let mut target = TextExtractor::new();
    interp.run(b"BT /F1 10 Tf [] TJ ET", &mut target).unwrap();

    assert!(target.fragments().is_empty());
    let tx = interp.current_state().text_matrix.as_array()[4];
    assert_eq!(tx, 0.0);
}

#[test]
fn text_operators_outside_bt_et_are_silently_dropped() {
    let doc = Document::load(hello_world_pdf(), b"").unwrap();
    let pages = doc.pages().unwrap();
    let page = &pages[0];

    let mut extractor = TextExtractor::new();
    let mut interp = ContentInterpreter::new(&doc, page.resources.clone(), Matrix::IDENTITY);
    // No surrounding BT/ET: Td and Tj must be no-ops per spec.md:103/:118.
    interp.run(b"100 700 Td (Hello) Tj", &mut extractor).unwrap();

    assert!(extractor.fragments().is_empty());
    assert_eq!(extractor.into_text(), "");
    let tm = interp.current_state().text_matrix.as_array();
    assert_eq!(tm, Matrix::IDENTITY.as_array());
}

#[test]
fn form_xobject_does_not_inherit_callers_text_state() {
    let form_content = "(child) Tj";
    let form_obj = format!(
        "<< /Type /XObject /Subtype /Form /Resources << /Font << /F1 6 0 R >> >> /Length {} >>\nstream\n{}\nendstream",
        form_content.len(),
        form_content
    );
    let content = "BT /F1 24 Tf 3 Tc 1 0 0 1 0 0 Tm (caller) Tj ET /Fm1 Do";
    let content_obj = format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content);
    let doc = Document::load(
        classic_pdf(
            &[
                (1, "<< /Type /Catalog /Pages 2 0 R >>"),
                (2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>"),
                (
                    3,
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                     /Resources << /Font << /F1 4 0 R >> /XObject << /Fm1 5 0 R >> >> /Contents 7 0 R >>",
                ),
                (4, "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>"),
                (5, &form_obj),
                (6, "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>"),
                (7, &content_obj),
            ],
            1,
        ),
        b"",
    )
    .unwrap();

    let pages = doc.pages().unwrap();
    let page = &pages[0];
    let mut extractor = TextExtractor::new();
    let mut interp = ContentInterpreter::new(&doc, page.resources.clone(), Matrix::IDENTITY);
    let contents = page.dict.get("Contents").unwrap();
    let stream = doc.resolve(contents).unwrap();
    let stream = stream.as_stream().unwrap();
    let decoded = doc.decode_stream_data(stream).unwrap();

    // The form's content runs `Tj` with no `Tf` of its own: if it inherited
    // the caller's font/char-spacing it would draw text; per spec.md:108 it
    // must instead start with a fresh text state and log+skip for lack of
    // an active font, leaving the form's contribution empty.
    interp.run(&decoded, &mut extractor).unwrap();

    assert_eq!(extractor.fragments().len(), 1);
    assert_eq!(extractor.fragments()[0].text, "caller");
    assert_eq!(extractor.into_text(), "caller");
}
