//! C5: loads the cross-reference chain (classic tables and xref
//! streams), follows `/Prev` (capped at 100 hops, §4.4/§7), and resolves
//! object numbers to byte offsets or object-stream locations.

use crate::error::{Error, Result};
use crate::filters::{decode_stream, NullRegistry};
use crate::lexer::{Lexer, Token};
use crate::object::{Dictionary, DictionaryExt, Object, Reference};
use crate::parser::{NoResolve, ObjectParser, Resolve};

pub const MAX_PREV_CHAIN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    Free { next_free: u32 },
    Uncompressed { offset: usize, generation: u16 },
    Compressed { stream_number: u32, index: u32 },
}

#[derive(Default)]
pub struct XrefTable {
    entries: std::collections::HashMap<u32, XrefEntry>,
    pub trailer: Dictionary,
}

impl XrefTable {
    pub fn get(&self, object_number: u32) -> Option<XrefEntry> {
        self.entries.get(&object_number).copied()
    }

    pub fn size(&self) -> i64 {
        self.trailer.get_i64("Size").unwrap_or(0)
    }

    /// Loads the xref chain starting at `startxref_pos` (already
    /// adjusted for any header byte offset), merging `/Prev` sections so
    /// the first-seen entry for an object number wins (§4.4 step 2-3).
    /// Follows at most `MAX_PREV_CHAIN` hops (see [`Self::load_with_limit`]
    /// to configure that bound).
    pub fn load(buf: &[u8], startxref_pos: usize, header_offset: usize) -> Result<XrefTable> {
        XrefTable::load_with_limit(buf, startxref_pos, header_offset, MAX_PREV_CHAIN)
    }

    /// Same as [`Self::load`], but with the `/Prev` hop cap taken from
    /// the caller's [`crate::config::Limits`] rather than the module
    /// default.
    pub fn load_with_limit(
        buf: &[u8],
        startxref_pos: usize,
        header_offset: usize,
        max_prev_chain: usize,
    ) -> Result<XrefTable> {
        let mut table = XrefTable::default();
        let mut next_pos = Some(startxref_pos);
        let mut seen_offsets = std::collections::HashSet::new();
        let mut hops = 0usize;
        let mut trailer_is_set = false;

        while let Some(pos) = next_pos {
            hops += 1;
            if hops > max_prev_chain {
                return Err(Error::CorruptXref(format!("xref /Prev chain exceeds {max_prev_chain} hops")));
            }
            if !seen_offsets.insert(pos) {
                return Err(Error::CorruptXref("cyclic /Prev chain".into()));
            }
            let adjusted = pos + header_offset;
            let section = parse_section(buf, adjusted)?;
            for (num, entry) in section.entries {
                table.entries.entry(num).or_insert(entry);
            }
            if !trailer_is_set {
                table.trailer = section.trailer.clone();
                trailer_is_set = true;
            }
            next_pos = section
                .trailer
                .get_i64("Prev")
                .filter(|p| *p >= 0)
                .map(|p| p as usize);
            // A hybrid-reference file may point to a classic table via
            // /Prev and additionally carry compressed entries in
            // /XRefStm; fold those in too, preferring entries already
            // present (most-recent-first).
            if let Some(xrefstm) = section.trailer.get_i64("XRefStm").filter(|p| *p >= 0) {
                let hybrid = parse_section(buf, xrefstm as usize + header_offset)?;
                for (num, entry) in hybrid.entries {
                    table.entries.entry(num).or_insert(entry);
                }
            }
        }
        if !trailer_is_set || table.trailer.get("Root").is_none() {
            return Err(Error::CorruptXref("no trailer /Root found".into()));
        }
        Ok(table)
    }
}

struct Section {
    entries: Vec<(u32, XrefEntry)>,
    trailer: Dictionary,
}

fn parse_section(buf: &[u8], pos: usize) -> Result<Section> {
    let mut lex = Lexer::at(buf, pos);
    let save = lex.pos();
    match lex.next_token()? {
        Token::Keyword(k) if k == "xref" => parse_classic_table(buf, lex.pos()),
        _ => {
            lex.seek(save);
            parse_xref_stream(buf, pos)
        }
    }
}

fn parse_classic_table(buf: &[u8], start: usize) -> Result<Section> {
    let mut lex = Lexer::at(buf, start);
    let mut entries = Vec::new();
    loop {
        let save = lex.pos();
        let tok = lex.next_token()?;
        let first = match tok {
            Token::Integer(n) if n >= 0 => n as u32,
            Token::Keyword(k) if k == "trailer" => break,
            _ => {
                lex.seek(save);
                break;
            }
        };
        let count = match lex.next_token()? {
            Token::Integer(n) if n >= 0 => n as u32,
            other => return Err(Error::CorruptXref(format!("expected subsection count, found {other:?}"))),
        };
        for i in 0..count {
            let offset = match lex.next_token()? {
                Token::Integer(n) if n >= 0 => n as usize,
                other => return Err(Error::CorruptXref(format!("bad xref offset: {other:?}"))),
            };
            let generation = match lex.next_token()? {
                Token::Integer(n) if n >= 0 && n <= u16::MAX as i64 => n as u16,
                other => return Err(Error::CorruptXref(format!("bad xref generation: {other:?}"))),
            };
            let kind = match lex.next_token()? {
                Token::Keyword(k) if k == "n" => Some(()),
                Token::Keyword(k) if k == "f" => None,
                other => return Err(Error::CorruptXref(format!("bad xref entry type: {other:?}"))),
            };
            let num = first + i;
            let entry = match kind {
                Some(()) => XrefEntry::Uncompressed { offset, generation },
                None => XrefEntry::Free { next_free: offset as u32 },
            };
            entries.push((num, entry));
        }
    }
    let mut resolver = NoResolve;
    let mut parser = ObjectParser::new(buf, lex.pos(), &mut resolver);
    let trailer_obj = parser.parse_object()?;
    let trailer = trailer_obj.as_dict().cloned().ok_or_else(|| {
        Error::CorruptXref("trailer is not a dictionary".into())
    })?;
    Ok(Section { entries, trailer })
}

fn parse_xref_stream(buf: &[u8], pos: usize) -> Result<Section> {
    let mut resolver = NoResolve;
    let mut parser = ObjectParser::new(buf, pos, &mut resolver);
    let (_num, _gen, obj) = parser.parse_indirect_object()?;
    let stream = match obj {
        Object::Stream(s) => s,
        _ => return Err(Error::CorruptXref("expected xref stream object".into())),
    };
    let dict = &stream.dict;
    let decoded = decode_stream(dict, &stream.raw_data, &NullRegistry)?;

    let widths_obj = dict.get_array("W").ok_or_else(|| Error::CorruptXref("xref stream missing /W".into()))?;
    let widths: Vec<usize> = widths_obj.iter().map(|o| o.as_i64().unwrap_or(0) as usize).collect();
    if widths.len() != 3 {
        return Err(Error::CorruptXref("/W must have exactly 3 entries".into()));
    }
    let size = dict.get_i64("Size").unwrap_or(0);
    let index: Vec<i64> = match dict.get_array("Index") {
        Some(arr) => arr.iter().filter_map(|o| o.as_i64()).collect(),
        None => vec![0, size],
    };

    let row_len = widths[0] + widths[1] + widths[2];
    let mut entries = Vec::new();
    let mut cursor = 0usize;
    let mut idx_iter = index.chunks(2);
    while let Some(chunk) = idx_iter.next() {
        if chunk.len() != 2 {
            break;
        }
        let first = chunk[0];
        let count = chunk[1];
        for i in 0..count {
            if cursor + row_len > decoded.len() {
                break;
            }
            let row = &decoded[cursor..cursor + row_len];
            cursor += row_len;
            let f1 = be_field(&row[0..widths[0]], 1);
            let f2 = be_field(&row[widths[0]..widths[0] + widths[1]], 0);
            let f3 = be_field(&row[widths[0] + widths[1]..], 0);
            let num = (first + i) as u32;
            let entry = match f1 {
                0 => XrefEntry::Free { next_free: f2 as u32 },
                1 => XrefEntry::Uncompressed { offset: f2 as usize, generation: f3 as u16 },
                2 => XrefEntry::Compressed { stream_number: f2 as u32, index: f3 as u32 },
                _ => continue,
            };
            entries.push((num, entry));
        }
    }
    Ok(Section { entries, trailer: dict.clone() })
}

/// Reads a big-endian field of `width` bytes (0 width uses `default`,
/// per spec's "if the first width is zero, type defaults to 1" rule and
/// the analogous rule for generation defaulting to 0).
fn be_field(bytes: &[u8], default: i64) -> i64 {
    if bytes.is_empty() {
        return default;
    }
    let mut v: i64 = 0;
    for &b in bytes {
        v = (v << 8) | b as i64;
    }
    v
}

/// Locates the header (`%PDF-`) and `startxref` tail pointer per §4.4's
/// tolerance notes. Returns `(header_offset, startxref_value)`.
pub fn locate_header_and_startxref(buf: &[u8]) -> Result<(usize, usize)> {
    let scan_len = buf.len().min(1024);
    let header_offset = buf[..scan_len]
        .windows(5)
        .position(|w| w == b"%PDF-")
        .ok_or(Error::InvalidHeader)?;

    let tail_start = buf.len().saturating_sub(1024);
    let tail = &buf[tail_start..];
    let rel = tail
        .windows(b"startxref".len())
        .rposition(|w| w == b"startxref")
        .ok_or_else(|| Error::CorruptXref("no startxref found in file tail".into()))?;
    let mut lex = Lexer::at(buf, tail_start + rel + b"startxref".len());
    let value = match lex.next_token()? {
        Token::Integer(n) if n >= 0 => n as usize,
        other => return Err(Error::CorruptXref(format!("startxref value is not an integer: {other:?}"))),
    };
    Ok((header_offset, value))
}

/// Parses a single indirect object at `offset` (already header-adjusted),
/// tolerating a mildly corrupt offset by scanning forward up to 64 bytes
/// for the `N G obj` header (§4.4 object-lookup algorithm).
pub fn parse_object_at<R: Resolve>(buf: &[u8], offset: usize, expect_num: u32, resolver: &mut R) -> Result<Object> {
    let start = find_obj_header(buf, offset, expect_num).unwrap_or(offset);
    let mut parser = ObjectParser::new(buf, start, resolver);
    let (num, _gen, obj) = parser.parse_indirect_object()?;
    if num != expect_num {
        // xref offset pointed somewhere plausible but not at this
        // object; still return what we found rather than failing the
        // whole load (best-effort per §7 tier 2).
    }
    Ok(obj)
}

fn find_obj_header(buf: &[u8], offset: usize, expect_num: u32) -> Option<usize> {
    let window_end = (offset + 64).min(buf.len());
    if offset >= buf.len() {
        return None;
    }
    let needle = format!("{expect_num} ");
    for start in offset..window_end {
        if buf[start..].starts_with(needle.as_bytes()) {
            let mut lex = Lexer::at(buf, start);
            if let Ok(Token::Integer(n)) = lex.next_token() {
                if n as u32 == expect_num {
                    if let Ok(Token::Integer(_)) = lex.next_token() {
                        if let Ok(Token::Keyword(k)) = lex.next_token() {
                            if k == "obj" {
                                return Some(start);
                            }
                        }
                    }
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn be_field_defaults_when_width_zero() {
        assert_eq!(be_field(&[], 1), 1);
        assert_eq!(be_field(&[0x01, 0x02], 0), 0x0102);
    }

    #[test]
    fn classic_table_parses_entries_and_trailer() {
        let src = b"xref\n0 3\n0000000000 65535 f \n0000000010 00000 n \n0000000020 00000 n \ntrailer\n<< /Size 3 /Root 1 0 R >>\n";
        let section = parse_classic_table(src, 5).unwrap();
        assert_eq!(section.entries.len(), 3);
        assert_eq!(section.entries[1].1, XrefEntry::Uncompressed { offset: 10, generation: 0 });
        assert_eq!(section.trailer.get_i64("Size"), Some(3));
    }

    #[test]
    fn locates_header_with_leading_garbage() {
        let mut data = vec![0u8; 3];
        data.extend_from_slice(b"%PDF-1.7\n...\nstartxref\n1234\n%%EOF");
        let (header_offset, sx) = locate_header_and_startxref(&data).unwrap();
        assert_eq!(header_offset, 3);
        assert_eq!(sx, 1234);
    }
}
