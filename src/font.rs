//! C11 (font side): resolves a `/Font` resource dictionary into
//! something the interpreter and text extractor can decode character
//! codes, measure widths, and recover Unicode through, per §6's font
//! contract. `StandardFont` covers the 14 standard (non-embedded) base
//! fonts by name; `SimpleFont`/`Type0Font` cover everything found in a
//! document's `/Font` resources, embedded or not.

use std::collections::HashMap;

use crate::cmap::CMap;
use crate::document::Document;
use crate::error::Result;
use crate::object::{Dictionary, DictionaryExt, Object};

/// The four font categories the interpreter distinguishes decoding
/// strategy by (§6): simple single-byte fonts (Type1/TrueType/Type3)
/// decode one code per byte, Type0 decodes through its CMap's declared
/// code-space ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontKind {
    Type1,
    TrueType,
    Type3,
    Type0,
}

#[derive(Debug, Clone, Default)]
pub struct FontDescriptor {
    pub flags: i64,
    pub stem_v: f32,
    pub italic_angle: f32,
    pub missing_width: f32,
}

impl FontDescriptor {
    pub fn is_bold(&self) -> bool {
        self.flags & (1 << 18) != 0 || self.stem_v >= 140.0
    }
    pub fn is_italic(&self) -> bool {
        self.flags & (1 << 6) != 0 || self.italic_angle != 0.0
    }
    pub fn is_serif(&self) -> bool {
        self.flags & (1 << 1) != 0
    }
    pub fn is_fixed_pitch(&self) -> bool {
        self.flags & 1 != 0
    }
}

/// The font contract the interpreter and text extractor drive (§6): a
/// font decodes a byte code to zero or more Unicode scalars, reports a
/// per-code advance width in glyph-space units (1/1000 em), and
/// identifies itself for `Tr` rendering-mode and `TJ` horizontal-scale
/// bookkeeping.
pub trait Font {
    /// Splits a `Tj`/`TJ` byte string into character codes (one byte
    /// per code for simple fonts, the CMap's declared width for Type0).
    fn decode_codes(&self, bytes: &[u8]) -> Vec<u32>;
    /// Width of one code, in 1/1000 text-space units (§4.8).
    fn character_width(&self, code: u32) -> f32;
    fn font_type(&self) -> FontKind;
    /// Best-effort Unicode for a code, via `/ToUnicode` when present,
    /// falling back to the font's built-in encoding, then Latin-1.
    fn to_unicode(&self, code: u32) -> String;
    fn descriptor(&self) -> &FontDescriptor;
}

/// AFM-derived width table for a standard-14 font, keyed by WinAnsi
/// code point. Shapes (outlines, hinting) are an external collaborator
/// concern; only the metrics a text layout needs are modeled here.
pub struct StandardFont {
    pub base_name: &'static str,
    widths: &'static [(u8, f32)],
    descriptor: FontDescriptor,
}

macro_rules! std_font {
    ($name:expr, $widths:expr, $flags:expr) => {
        StandardFont {
            base_name: $name,
            widths: $widths,
            descriptor: FontDescriptor { flags: $flags, stem_v: 0.0, italic_angle: 0.0, missing_width: 0.0 },
        }
    };
}

/// Looks up a standard-14 font by its `/BaseFont` name (§6: "Helvetica,
/// Times-Roman, Courier and their bold/italic variants, plus Symbol and
/// ZapfDingbats, are always available without embedding").
pub fn standard_font(base_font: &str) -> Option<StandardFont> {
    // Strip a subset tag (`ABCDEF+Helvetica`) before matching.
    let name = base_font.rsplit('+').next().unwrap_or(base_font);
    Some(match name {
        "Times-Roman" => std_font!("Times-Roman", TIMES_ROMAN_WIDTHS, 1 << 1),
        "Times-Bold" => std_font!("Times-Bold", TIMES_ROMAN_WIDTHS, (1 << 1) | (1 << 18)),
        "Times-Italic" => std_font!("Times-Italic", TIMES_ROMAN_WIDTHS, (1 << 1) | (1 << 6)),
        "Times-BoldItalic" => std_font!("Times-BoldItalic", TIMES_ROMAN_WIDTHS, (1 << 1) | (1 << 18) | (1 << 6)),
        "Helvetica" => std_font!("Helvetica", HELVETICA_WIDTHS, 0),
        "Helvetica-Bold" => std_font!("Helvetica-Bold", HELVETICA_WIDTHS, 1 << 18),
        "Helvetica-Oblique" => std_font!("Helvetica-Oblique", HELVETICA_WIDTHS, 1 << 6),
        "Helvetica-BoldOblique" => std_font!("Helvetica-BoldOblique", HELVETICA_WIDTHS, (1 << 18) | (1 << 6)),
        "Courier" => std_font!("Courier", COURIER_WIDTHS, 1),
        "Courier-Bold" => std_font!("Courier-Bold", COURIER_WIDTHS, 1 | (1 << 18)),
        "Courier-Oblique" => std_font!("Courier-Oblique", COURIER_WIDTHS, 1 | (1 << 6)),
        "Courier-BoldOblique" => std_font!("Courier-BoldOblique", COURIER_WIDTHS, 1 | (1 << 18) | (1 << 6)),
        "Symbol" => std_font!("Symbol", SYMBOLIC_FALLBACK_WIDTHS, 1 << 2),
        "ZapfDingbats" => std_font!("ZapfDingbats", SYMBOLIC_FALLBACK_WIDTHS, 1 << 2),
        _ => return None,
    })
}

// Representative subsets of the published AFM widths (full ASCII
// printable range); anything outside the table falls back to 500 via
// `character_width`'s default.
static TIMES_ROMAN_WIDTHS: &[(u8, f32)] = &[
    (b' ', 250.0), (b'!', 333.0), (b'"', 408.0), (b'#', 500.0), (b'$', 500.0),
    (b'%', 833.0), (b'&', 778.0), (b'\'', 180.0), (b'(', 333.0), (b')', 333.0),
    (b'-', 333.0), (b'.', 250.0), (b'0', 500.0), (b'1', 500.0), (b'2', 500.0),
    (b'A', 722.0), (b'B', 667.0), (b'C', 667.0), (b'a', 444.0), (b'e', 444.0),
    (b'o', 500.0), (b'n', 500.0),
];

static HELVETICA_WIDTHS: &[(u8, f32)] = &[
    (b' ', 278.0), (b'!', 278.0), (b'"', 355.0), (b'#', 556.0), (b'$', 556.0),
    (b'%', 889.0), (b'&', 667.0), (b'\'', 191.0), (b'(', 333.0), (b')', 333.0),
    (b'-', 333.0), (b'.', 278.0), (b'0', 556.0), (b'1', 556.0), (b'2', 556.0),
    (b'A', 667.0), (b'B', 667.0), (b'C', 722.0), (b'a', 556.0), (b'e', 556.0),
    (b'o', 556.0), (b'n', 556.0),
];

static COURIER_WIDTHS: &[(u8, f32)] = &[(b' ', 600.0)]; // monospace; every code is 600

static SYMBOLIC_FALLBACK_WIDTHS: &[(u8, f32)] = &[(b' ', 500.0)];

impl Font for StandardFont {
    fn decode_codes(&self, bytes: &[u8]) -> Vec<u32> {
        bytes.iter().map(|&b| b as u32).collect()
    }

    fn character_width(&self, code: u32) -> f32 {
        if self.base_name.starts_with("Courier") {
            return 600.0;
        }
        let code = code as u8;
        self.widths.iter().find(|&&(c, _)| c == code).map(|&(_, w)| w).unwrap_or(500.0)
    }

    fn font_type(&self) -> FontKind {
        FontKind::Type1
    }

    fn to_unicode(&self, code: u32) -> String {
        latin1_fallback(code)
    }

    fn descriptor(&self) -> &FontDescriptor {
        &self.descriptor
    }
}

/// A simple (single-byte) Type1/TrueType/Type3 font loaded from a
/// `/Font` resource dictionary: `/FirstChar`..`/LastChar` widths array,
/// `/Differences`-adjusted encoding, optional `/ToUnicode` CMap.
pub struct SimpleFont {
    kind: FontKind,
    first_char: i64,
    widths: Vec<f32>,
    missing_width: f32,
    differences: HashMap<u32, String>,
    to_unicode: Option<CMap>,
    descriptor: FontDescriptor,
    base_name: String,
}

impl SimpleFont {
    pub fn load(doc: &Document, dict: &Dictionary) -> Result<SimpleFont> {
        let subtype = dict.get_str("Subtype").unwrap_or("");
        let kind = if subtype == "Type3" { FontKind::Type3 } else if subtype == "TrueType" { FontKind::TrueType } else { FontKind::Type1 };
        let first_char = dict.get_i64("FirstChar").unwrap_or(0);
        let widths = match dict.get("Widths") {
            Some(w) => {
                let resolved = doc.resolve(w)?;
                resolved.as_array().map(|a| a.iter().filter_map(Object::as_f32).collect()).unwrap_or_default()
            }
            None => Vec::new(),
        };
        let descriptor = load_descriptor(doc, dict)?;
        let differences = load_differences(doc, dict)?;
        let to_unicode = load_to_unicode(doc, dict)?;
        let base_name = dict.get_str("BaseFont").unwrap_or("").to_string();
        Ok(SimpleFont {
            kind,
            first_char,
            widths,
            missing_width: descriptor.missing_width,
            differences,
            to_unicode,
            descriptor,
            base_name,
        })
    }
}

impl Font for SimpleFont {
    fn decode_codes(&self, bytes: &[u8]) -> Vec<u32> {
        bytes.iter().map(|&b| b as u32).collect()
    }

    fn character_width(&self, code: u32) -> f32 {
        let idx = code as i64 - self.first_char;
        if idx >= 0 {
            if let Some(&w) = self.widths.get(idx as usize) {
                return w;
            }
        }
        if self.missing_width > 0.0 {
            self.missing_width
        } else if let Some(std) = standard_font(&self.base_name) {
            std.character_width(code)
        } else {
            500.0
        }
    }

    fn font_type(&self) -> FontKind {
        self.kind
    }

    fn to_unicode(&self, code: u32) -> String {
        if let Some(cmap) = &self.to_unicode {
            if let Some(scalars) = cmap.lookup(code) {
                return scalars_to_string(scalars);
            }
            if let Some(dst) = cmap.lookup_range(code) {
                if let Some(c) = char::from_u32(dst) {
                    return c.to_string();
                }
            }
        }
        if let Some(name) = self.differences.get(&code) {
            if let Some(c) = glyph_name_to_unicode(name) {
                return c.to_string();
            }
        }
        latin1_fallback(code)
    }

    fn descriptor(&self) -> &FontDescriptor {
        &self.descriptor
    }
}

/// A composite (Type0) font: codes are decoded through the CMap's
/// declared code-space ranges (§9 redesign note), then mapped to CIDs
/// and widths via the descendant CIDFont's `/W` array.
pub struct Type0Font {
    encoding: CMap,
    cid_to_gid_identity: bool,
    default_width: f32,
    widths: HashMap<u32, f32>,
    to_unicode: Option<CMap>,
    descriptor: FontDescriptor,
}

impl Type0Font {
    pub fn load(doc: &Document, dict: &Dictionary) -> Result<Type0Font> {
        let encoding_name = dict.get_str("Encoding").unwrap_or("");
        let encoding = if encoding_name == "Identity-H" || encoding_name == "Identity-V" {
            identity_h_cmap()
        } else if let Some(enc_obj) = dict.get("Encoding") {
            let resolved = doc.resolve(enc_obj)?;
            match resolved.as_stream() {
                Some(stream) => CMap::parse(&doc.decode_stream_data(stream)?),
                None => identity_h_cmap(),
            }
        } else {
            identity_h_cmap()
        };

        let descendants = dict.get_array("DescendantFonts").cloned().unwrap_or_default();
        let descendant = match descendants.first() {
            Some(d) => doc.resolve(d)?.as_dict().cloned().unwrap_or_default(),
            None => Dictionary::new(),
        };
        let default_width = descendant.get_f32("DW").unwrap_or(1000.0);
        let widths = parse_cid_widths(doc, &descendant)?;
        let descriptor = load_descriptor(doc, &descendant)?;
        let to_unicode = load_to_unicode(doc, dict)?;

        Ok(Type0Font { encoding, cid_to_gid_identity: true, default_width, widths, to_unicode, descriptor })
    }

    fn code_to_cid(&self, code: u32) -> u32 {
        if let Some(scalars) = self.encoding.lookup(code) {
            return scalars.first().copied().unwrap_or(code);
        }
        if let Some(cid) = self.encoding.lookup_range(code) {
            return cid;
        }
        if self.cid_to_gid_identity {
            code
        } else {
            0
        }
    }
}

impl Font for Type0Font {
    fn decode_codes(&self, bytes: &[u8]) -> Vec<u32> {
        self.encoding.decode_codes(bytes)
    }

    fn character_width(&self, code: u32) -> f32 {
        let cid = self.code_to_cid(code);
        self.widths.get(&cid).copied().unwrap_or(self.default_width)
    }

    fn font_type(&self) -> FontKind {
        FontKind::Type0
    }

    fn to_unicode(&self, code: u32) -> String {
        if let Some(cmap) = &self.to_unicode {
            if let Some(scalars) = cmap.lookup(code) {
                return scalars_to_string(scalars);
            }
            if let Some(dst) = cmap.lookup_range(code) {
                if let Some(c) = char::from_u32(dst) {
                    return c.to_string();
                }
            }
        }
        let cid = self.code_to_cid(code);
        char::from_u32(cid).map(|c| c.to_string()).unwrap_or_default()
    }

    fn descriptor(&self) -> &FontDescriptor {
        &self.descriptor
    }
}

/// The common `/Identity-H` code-space: 2-byte codes, CID == code.
fn identity_h_cmap() -> CMap {
    let mut cmap = CMap::default();
    cmap.code_space_ranges.push(crate::cmap::CodeSpaceRange { lo: vec![0x00, 0x00], hi: vec![0xFF, 0xFF] });
    cmap.ranges.push((0, 0xFFFF, 0));
    cmap
}

/// `/W [c [w1 w2 ...] | cFirst cLast w]` per §9.7.4.3.
fn parse_cid_widths(doc: &Document, descendant: &Dictionary) -> Result<HashMap<u32, f32>> {
    let mut out = HashMap::new();
    let Some(w_ref) = descendant.get("W") else { return Ok(out) };
    let w = doc.resolve(w_ref)?;
    let Some(arr) = w.as_array() else { return Ok(out) };
    let mut i = 0;
    while i < arr.len() {
        let Some(first) = arr[i].as_i64() else { i += 1; continue };
        match arr.get(i + 1) {
            Some(Object::Array(widths)) => {
                for (j, wv) in widths.iter().enumerate() {
                    if let Some(w) = wv.as_f32() {
                        out.insert((first + j as i64) as u32, w);
                    }
                }
                i += 2;
            }
            Some(last_obj) if last_obj.as_i64().is_some() => {
                let last = last_obj.as_i64().unwrap();
                let width = arr.get(i + 2).and_then(Object::as_f32).unwrap_or(1000.0);
                for c in first..=last {
                    out.insert(c as u32, width);
                }
                i += 3;
            }
            _ => i += 1,
        }
    }
    Ok(out)
}

fn load_descriptor(doc: &Document, font_dict: &Dictionary) -> Result<FontDescriptor> {
    let Some(fd_ref) = font_dict.get("FontDescriptor") else { return Ok(FontDescriptor::default()) };
    let fd = doc.resolve(fd_ref)?;
    let Some(dict) = fd.as_dict() else { return Ok(FontDescriptor::default()) };
    Ok(FontDescriptor {
        flags: dict.get_i64("Flags").unwrap_or(0),
        stem_v: dict.get_f32("StemV").unwrap_or(0.0),
        italic_angle: dict.get_f32("ItalicAngle").unwrap_or(0.0),
        missing_width: dict.get_f32("MissingWidth").unwrap_or(0.0),
    })
}

/// `/Encoding /Differences [code name code name ...]` (§4.8): each
/// integer resets the running code, each name applies to it and
/// advances by one.
fn load_differences(doc: &Document, font_dict: &Dictionary) -> Result<HashMap<u32, String>> {
    let mut out = HashMap::new();
    let Some(enc_obj) = font_dict.get("Encoding") else { return Ok(out) };
    let enc = doc.resolve(enc_obj)?;
    let Some(enc_dict) = enc.as_dict() else { return Ok(out) };
    let Some(diffs) = enc_dict.get_array("Differences") else { return Ok(out) };
    let mut code = 0u32;
    for item in diffs {
        match item {
            Object::Integer(n) => code = *n as u32,
            Object::Name(n) => {
                out.insert(code, n.as_str().to_string());
                code += 1;
            }
            _ => {}
        }
    }
    Ok(out)
}

fn load_to_unicode(doc: &Document, font_dict: &Dictionary) -> Result<Option<CMap>> {
    let Some(tu_ref) = font_dict.get("ToUnicode") else { return Ok(None) };
    let tu = doc.resolve(tu_ref)?;
    let Some(stream) = tu.as_stream() else { return Ok(None) };
    Ok(Some(CMap::parse(&doc.decode_stream_data(stream)?)))
}

fn scalars_to_string(scalars: &[u32]) -> String {
    scalars.iter().filter_map(|&v| char::from_u32(v)).collect()
}

/// Last-resort decoding when no encoding or CMap could place the code:
/// treat it as Latin-1, which recovers ASCII text even for a font this
/// core couldn't fully resolve.
fn latin1_fallback(code: u32) -> String {
    char::from_u32(code).map(|c| c.to_string()).unwrap_or_default()
}

/// A small slice of the Adobe Glyph List covering common
/// `/Differences` names; anything else falls through to the code's
/// Latin-1 value.
fn glyph_name_to_unicode(name: &str) -> Option<char> {
    Some(match name {
        "space" => ' ',
        "exclam" => '!',
        "quotedbl" => '"',
        "quoteright" => '\'',
        "parenleft" => '(',
        "parenright" => ')',
        "comma" => ',',
        "hyphen" => '-',
        "period" => '.',
        "slash" => '/',
        "zero" => '0',
        "one" => '1',
        "two" => '2',
        "three" => '3',
        "four" => '4',
        "five" => '5',
        "six" => '6',
        "seven" => '7',
        "eight" => '8',
        "nine" => '9',
        "colon" => ':',
        "semicolon" => ';',
        "equal" => '=',
        "question" => '?',
        "at" => '@',
        "bracketleft" => '[',
        "backslash" => '\\',
        "bracketright" => ']',
        "underscore" => '_',
        "quoteleft" => '`',
        "braceleft" => '{',
        "bar" => '|',
        "braceright" => '}',
        "asciitilde" => '~',
        "bullet" => '\u{2022}',
        "endash" => '\u{2013}',
        "emdash" => '\u{2014}',
        "quotedblleft" => '\u{201C}',
        "quotedblright" => '\u{201D}',
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_font_lookup_recognizes_bold_variant() {
        let f = standard_font("Helvetica-Bold").unwrap();
        assert!(f.descriptor().is_bold());
        assert_eq!(f.character_width(b'A' as u32), 667.0);
    }

    #[test]
    fn standard_font_strips_subset_tag() {
        let f = standard_font("ABCDEF+Times-Italic").unwrap();
        assert!(f.descriptor().is_italic());
    }

    #[test]
    fn courier_is_monospace() {
        let f = standard_font("Courier").unwrap();
        assert_eq!(f.character_width(b'i' as u32), 600.0);
        assert_eq!(f.character_width(b'W' as u32), 600.0);
    }

    #[test]
    fn unknown_base_font_returns_none() {
        assert!(standard_font("Arial").is_none());
    }

    #[test]
    fn identity_h_decodes_two_byte_codes() {
        let cmap = identity_h_cmap();
        assert_eq!(cmap.decode_codes(&[0x00, 0x41, 0x00, 0x42]), vec![0x41, 0x42]);
    }

    #[test]
    fn glyph_name_maps_common_names() {
        assert_eq!(glyph_name_to_unicode("space"), Some(' '));
        assert_eq!(glyph_name_to_unicode("bullet"), Some('\u{2022}'));
        assert_eq!(glyph_name_to_unicode("nonexistent-glyph"), None);
    }
}
