//! C1+C2: tokenizes a byte range into the PDF token classes of ISO
//! 32000-1 §7.2. The lexer is lazy — it holds a `ByteCursor` and yields
//! one `Token` per call to `next_token`, it never buffers a whole
//! content stream up front.

use crate::bytes::{is_delimiter, is_regular, is_whitespace, ByteCursor};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Integer(i64),
    Real(f64),
    LiteralString(Vec<u8>),
    HexString(Vec<u8>),
    Name(String),
    ArrayOpen,
    ArrayClose,
    DictOpen,
    DictClose,
    /// Any other alphabetic run: `obj`, `endobj`, `stream`, `xref`,
    /// `true`, `false`, `null`, an operator name inside a content
    /// stream, etc. The caller interprets the keyword in context.
    Keyword(String),
    Eof,
}

pub struct Lexer<'a> {
    pub cursor: ByteCursor<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(buf: &'a [u8]) -> Lexer<'a> {
        Lexer { cursor: ByteCursor::new(buf) }
    }

    pub fn at(buf: &'a [u8], pos: usize) -> Lexer<'a> {
        Lexer { cursor: ByteCursor::at(buf, pos) }
    }

    pub fn pos(&self) -> usize {
        self.cursor.pos()
    }

    pub fn seek(&mut self, pos: usize) {
        self.cursor.seek(pos);
    }

    /// Returns the next token, advancing the cursor past it.
    pub fn next_token(&mut self) -> Result<Token> {
        self.cursor.skip_whitespace();
        let Some(b) = self.cursor.peek() else {
            return Ok(Token::Eof);
        };
        match b {
            b'/' => self.lex_name(),
            b'(' => self.lex_literal_string(),
            b'<' => {
                if self.cursor.peek_at(1) == Some(b'<') {
                    self.cursor.seek(self.cursor.pos() + 2);
                    Ok(Token::DictOpen)
                } else {
                    self.lex_hex_string()
                }
            }
            b'>' => {
                if self.cursor.peek_at(1) == Some(b'>') {
                    self.cursor.seek(self.cursor.pos() + 2);
                    Ok(Token::DictClose)
                } else {
                    Err(Error::LexError("stray '>' outside dict close".into()))
                }
            }
            b'[' => {
                self.cursor.advance();
                Ok(Token::ArrayOpen)
            }
            b']' => {
                self.cursor.advance();
                Ok(Token::ArrayClose)
            }
            b'+' | b'-' | b'.' | b'0'..=b'9' => self.lex_number(),
            b')' => Err(Error::LexError("stray ')' with no matching '('".into())),
            b'{' | b'}' => {
                // Used by PostScript calculator functions embedded in
                // content streams (rare); treat as its own keyword so
                // callers can skip it.
                self.cursor.advance();
                Ok(Token::Keyword(if b == b'{' { "{".into() } else { "}".into() }))
            }
            _ => self.lex_keyword(),
        }
    }

    fn lex_number(&mut self) -> Result<Token> {
        let start = self.cursor.pos();
        let mut is_real = false;
        if matches!(self.cursor.peek(), Some(b'+') | Some(b'-')) {
            self.cursor.advance();
        }
        while let Some(c) = self.cursor.peek() {
            match c {
                b'0'..=b'9' => {
                    self.cursor.advance();
                }
                b'.' => {
                    is_real = true;
                    self.cursor.advance();
                }
                // some malformed producers emit a stray trailing '-' or
                // repeated sign; swallow additional digits only
                _ => break,
            }
        }
        let text = std::str::from_utf8(&self.cursor.remaining_from(start, self.cursor.pos()))
            .map_err(|_| Error::LexError("non-utf8 number literal".into()))?;
        if is_real {
            let v: f64 = text.parse().unwrap_or(0.0);
            Ok(Token::Real(v))
        } else {
            match text.parse::<i64>() {
                Ok(v) => Ok(Token::Integer(v)),
                // overflow or bare "-"/"+." style tokens from broken
                // producers: fall back to real, then to zero.
                Err(_) => Ok(Token::Real(text.parse().unwrap_or(0.0))),
            }
        }
    }

    fn lex_name(&mut self) -> Result<Token> {
        self.cursor.advance(); // '/'
        let mut out = String::new();
        while let Some(c) = self.cursor.peek() {
            if !is_regular(c) {
                break;
            }
            if c == b'#' {
                if let (Some(h1), Some(h2)) = (self.cursor.peek_at(1), self.cursor.peek_at(2)) {
                    if let (Some(d1), Some(d2)) = (hex_digit(h1), hex_digit(h2)) {
                        out.push((d1 * 16 + d2) as char);
                        self.cursor.seek(self.cursor.pos() + 3);
                        continue;
                    }
                }
            }
            out.push(c as char);
            self.cursor.advance();
        }
        Ok(Token::Name(out))
    }

    fn lex_keyword(&mut self) -> Result<Token> {
        let start = self.cursor.pos();
        while let Some(c) = self.cursor.peek() {
            if !is_regular(c) {
                break;
            }
            self.cursor.advance();
        }
        if self.cursor.pos() == start {
            // unrecognized delimiter byte on its own; consume it so we
            // make forward progress instead of looping forever.
            self.cursor.advance();
            return Ok(Token::Keyword(String::new()));
        }
        let text = String::from_utf8_lossy(&self.cursor.remaining_from(start, self.cursor.pos()))
            .into_owned();
        Ok(Token::Keyword(text))
    }

    fn lex_literal_string(&mut self) -> Result<Token> {
        self.cursor.advance(); // '('
        let mut out = Vec::new();
        let mut depth = 1i32;
        loop {
            let Some(c) = self.cursor.advance() else {
                return Err(Error::LexError("unterminated literal string".into()));
            };
            match c {
                b'(' => {
                    depth += 1;
                    out.push(c);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    out.push(c);
                }
                b'\\' => {
                    let Some(e) = self.cursor.advance() else {
                        return Err(Error::LexError("unterminated escape in string".into()));
                    };
                    match e {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0C),
                        b'(' => out.push(b'('),
                        b')' => out.push(b')'),
                        b'\\' => out.push(b'\\'),
                        b'\r' => {
                            // line continuation; swallow an optional \n too
                            if self.cursor.peek() == Some(b'\n') {
                                self.cursor.advance();
                            }
                        }
                        b'\n' => {}
                        b'0'..=b'7' => {
                            let mut val = (e - b'0') as u32;
                            for _ in 0..2 {
                                match self.cursor.peek() {
                                    Some(d @ b'0'..=b'7') => {
                                        val = val * 8 + (d - b'0') as u32;
                                        self.cursor.advance();
                                    }
                                    _ => break,
                                }
                            }
                            out.push((val & 0xFF) as u8);
                        }
                        other => out.push(other),
                    }
                }
                _ => out.push(c),
            }
        }
        Ok(Token::LiteralString(out))
    }

    fn lex_hex_string(&mut self) -> Result<Token> {
        self.cursor.advance(); // '<'
        let mut digits = Vec::new();
        loop {
            let Some(c) = self.cursor.advance() else {
                return Err(Error::LexError("unterminated hex string".into()));
            };
            if c == b'>' {
                break;
            }
            if is_whitespace(c) {
                continue;
            }
            match hex_digit(c) {
                Some(d) => digits.push(d),
                None => return Err(Error::LexError(format!("invalid hex digit: {}", c as char))),
            }
        }
        if digits.len() % 2 == 1 {
            digits.push(0);
        }
        let bytes = digits.chunks(2).map(|pair| pair[0] * 16 + pair[1]).collect();
        Ok(Token::HexString(bytes))
    }
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &[u8]) -> Vec<Token> {
        let mut lex = Lexer::new(s);
        let mut out = Vec::new();
        loop {
            let t = lex.next_token().unwrap();
            if t == Token::Eof {
                break;
            }
            out.push(t);
        }
        out
    }

    #[test]
    fn lexes_numbers() {
        assert_eq!(toks(b"1 -2 3.14 -.5 +4"), vec![
            Token::Integer(1),
            Token::Integer(-2),
            Token::Real(3.14),
            Token::Real(-0.5),
            Token::Integer(4),
        ]);
    }

    #[test]
    fn lexes_names_with_hex_escape() {
        assert_eq!(toks(b"/Name1 /A#42"), vec![
            Token::Name("Name1".into()),
            Token::Name("AB".into()),
        ]);
    }

    #[test]
    fn lexes_literal_string_with_nesting_and_escapes() {
        assert_eq!(
            toks(b"(Hello (World) \\n\\101)"),
            vec![Token::LiteralString(b"Hello (World) \nA".to_vec())]
        );
    }

    #[test]
    fn lexes_hex_string_odd_digit_count() {
        assert_eq!(toks(b"<41 42 5>"), vec![Token::HexString(vec![0x41, 0x42, 0x50])]);
    }

    #[test]
    fn lexes_dict_and_array_delimiters() {
        assert_eq!(
            toks(b"<< /A [1 2] >>"),
            vec![
                Token::DictOpen,
                Token::Name("A".into()),
                Token::ArrayOpen,
                Token::Integer(1),
                Token::Integer(2),
                Token::ArrayClose,
                Token::DictClose,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_lex_error() {
        let mut lex = Lexer::new(b"(abc");
        assert!(lex.next_token().is_err());
    }
}
