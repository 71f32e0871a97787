//! Parses `/ToUnicode` CMaps (`bfchar`/`bfrange`) and Type0 font CMap
//! code-space ranges, so Type0 fonts decode their byte stream as an
//! explicit loop over declared code-space widths rather than
//! byte-by-byte (§9 redesign note).

use std::collections::BTreeMap;

use crate::lexer::{Lexer, Token};

/// One `begincodespacerange`/`endcodespacerange` entry: codes whose
/// byte length falls in `[lo.len(), hi.len()]` (always equal for a
/// well-formed CMap) and byte value falls between `lo` and `hi`.
#[derive(Debug, Clone)]
pub struct CodeSpaceRange {
    pub lo: Vec<u8>,
    pub hi: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct CMap {
    pub code_space_ranges: Vec<CodeSpaceRange>,
    /// CID CMaps: code -> CID. ToUnicode CMaps: code -> one or more
    /// Unicode scalar values (a `bfchar`/`bfrange` destination can be a
    /// short string of several UTF-16 code units).
    pub single: BTreeMap<u32, Vec<u32>>,
    pub ranges: Vec<(u32, u32, u32)>,
}

impl CMap {
    /// Parses a CMap program (`/ToUnicode` stream contents, or an
    /// embedded CID CMap) from its decoded bytes.
    pub fn parse(data: &[u8]) -> CMap {
        let mut cmap = CMap::default();
        let mut lex = Lexer::new(data);
        let mut pending: Vec<Token> = Vec::new();
        loop {
            let tok = match lex.next_token() {
                Ok(Token::Eof) => break,
                Ok(t) => t,
                Err(_) => break,
            };
            match &tok {
                Token::Keyword(k) if k == "begincodespacerange" => {
                    parse_codespace_block(&mut lex, &mut cmap);
                }
                Token::Keyword(k) if k == "begincidrange" || k == "beginbfrange" => {
                    parse_range_block(&mut lex, &mut cmap);
                }
                Token::Keyword(k) if k == "begincidchar" || k == "beginbfchar" => {
                    parse_char_block(&mut lex, &mut cmap);
                }
                _ => pending.push(tok),
            }
            if pending.len() > 8 {
                pending.remove(0);
            }
        }
        cmap
    }

    /// Splits `bytes` into codes using the declared code-space ranges
    /// (defaulting to 2-byte codes, the common Type0 case, if none were
    /// declared — §9 redesign note).
    pub fn decode_codes(&self, bytes: &[u8]) -> Vec<u32> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            let width = self.matching_width(&bytes[i..]).unwrap_or(2.min(bytes.len() - i).max(1));
            let mut code = 0u32;
            for &b in &bytes[i..(i + width).min(bytes.len())] {
                code = (code << 8) | b as u32;
            }
            out.push(code);
            i += width;
        }
        out
    }

    fn matching_width(&self, remaining: &[u8]) -> Option<usize> {
        for range in &self.code_space_ranges {
            let w = range.lo.len();
            if remaining.len() < w {
                continue;
            }
            let candidate = &remaining[..w];
            if candidate >= range.lo.as_slice() && candidate <= range.hi.as_slice() {
                return Some(w);
            }
        }
        self.code_space_ranges.first().map(|r| r.lo.len())
    }

    /// Maps a single code to its destination value(s) (a CID, or one or
    /// more Unicode scalars for a ToUnicode CMap).
    pub fn lookup(&self, code: u32) -> Option<&[u32]> {
        if let Some(v) = self.single.get(&code) {
            return Some(v);
        }
        None
    }

    pub fn lookup_range(&self, code: u32) -> Option<u32> {
        for &(lo, hi, dst) in &self.ranges {
            if code >= lo && code <= hi {
                return Some(dst + (code - lo));
            }
        }
        None
    }
}

fn token_bytes(tok: &Token) -> Option<Vec<u8>> {
    match tok {
        Token::HexString(b) => Some(b.clone()),
        Token::LiteralString(b) => Some(b.clone()),
        _ => None,
    }
}

fn bytes_to_u32(b: &[u8]) -> u32 {
    let mut v = 0u32;
    for &byte in b {
        v = (v << 8) | byte as u32;
    }
    v
}

fn parse_codespace_block(lex: &mut Lexer, cmap: &mut CMap) {
    loop {
        let Ok(tok) = lex.next_token() else { return };
        match &tok {
            Token::Keyword(k) if k == "endcodespacerange" => return,
            Token::Eof => return,
            _ => {
                let Some(lo) = token_bytes(&tok) else { continue };
                let Ok(hi_tok) = lex.next_token() else { return };
                let Some(hi) = token_bytes(&hi_tok) else { continue };
                cmap.code_space_ranges.push(CodeSpaceRange { lo, hi });
            }
        }
    }
}

fn parse_range_block(lex: &mut Lexer, cmap: &mut CMap) {
    loop {
        let Ok(first) = lex.next_token() else { return };
        match &first {
            Token::Keyword(k) if k.starts_with("end") => return,
            Token::Eof => return,
            _ => {}
        }
        let Some(lo) = token_bytes(&first) else { continue };
        let Ok(hi_tok) = lex.next_token() else { return };
        let Some(hi) = token_bytes(&hi_tok) else { continue };
        let Ok(dst_tok) = lex.next_token() else { return };
        let lo_v = bytes_to_u32(&lo);
        let hi_v = bytes_to_u32(&hi);
        match &dst_tok {
            Token::Integer(n) => cmap.ranges.push((lo_v, hi_v, *n as u32)),
            Token::HexString(dst) => {
                let dst_v = bytes_to_u32(dst);
                cmap.ranges.push((lo_v, hi_v, dst_v));
            }
            Token::ArrayOpen => {
                // bfrange with an array of individual destination
                // strings, one per code in [lo, hi].
                let mut code = lo_v;
                loop {
                    let Ok(item) = lex.next_token() else { break };
                    match &item {
                        Token::ArrayClose => break,
                        Token::HexString(s) => {
                            cmap.single.insert(code, decode_utf16_be(s));
                            code += 1;
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
}

fn parse_char_block(lex: &mut Lexer, cmap: &mut CMap) {
    loop {
        let Ok(code_tok) = lex.next_token() else { return };
        match &code_tok {
            Token::Keyword(k) if k.starts_with("end") => return,
            Token::Eof => return,
            _ => {}
        }
        let Some(code_bytes) = token_bytes(&code_tok) else { continue };
        let Ok(dst_tok) = lex.next_token() else { return };
        let code = bytes_to_u32(&code_bytes);
        match &dst_tok {
            Token::Integer(n) => {
                cmap.single.insert(code, vec![*n as u32]);
            }
            Token::HexString(dst) => {
                cmap.single.insert(code, decode_utf16_be(dst));
            }
            _ => {}
        }
    }
}

/// ToUnicode destinations are UTF-16BE byte strings, possibly multiple
/// code units (combining sequences, ligature expansions).
fn decode_utf16_be(bytes: &[u8]) -> Vec<u32> {
    let units: Vec<u16> = bytes.chunks(2).filter(|c| c.len() == 2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
    char::decode_utf16(units).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER) as u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bfchar_block() {
        let data = b"1 beginbfchar\n<0041> <0041>\nendbfchar";
        let cmap = CMap::parse(data);
        assert_eq!(cmap.lookup(0x41), Some(&[0x41][..]));
    }

    #[test]
    fn parses_bfrange_with_array() {
        let data = b"1 beginbfrange\n<0000> <0002> [<0041> <0042> <0043>]\nendbfrange";
        let cmap = CMap::parse(data);
        assert_eq!(cmap.lookup(1), Some(&[0x42][..]));
    }

    #[test]
    fn decode_codes_uses_declared_width() {
        let data = b"1 begincodespacerange\n<00> <FF>\nendcodespacerange";
        let cmap = CMap::parse(data);
        assert_eq!(cmap.decode_codes(&[0x41, 0x42]), vec![0x41, 0x42]);
    }

    #[test]
    fn decode_codes_defaults_to_two_bytes() {
        let cmap = CMap::default();
        assert_eq!(cmap.decode_codes(&[0x00, 0x41]), vec![0x41]);
    }
}
