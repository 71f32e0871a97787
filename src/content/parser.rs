//! C8 continued: turns content-stream bytes into a `Vec<Operator>`. Runs
//! a per-stream operand stack; when an operator keyword appears, it pops
//! the declared arity and constructs a typed `Operator`, then clears the
//! stack (§4.6). Also special-cases inline images (`BI ... ID ... EI`).

use crate::content::operator::{Operator, TextArrayItem};
use crate::error::{Error, Result};
use crate::lexer::{Lexer, Token};
use crate::object::{Name, Object};
use crate::parser::{NoResolve, ObjectParser};

pub const MAX_OPERAND_STACK_DEPTH: usize = 1024;

pub struct ContentParser<'a> {
    lexer: Lexer<'a>,
    operands: Vec<Object>,
    max_operand_stack_depth: usize,
}

impl<'a> ContentParser<'a> {
    pub fn new(buf: &'a [u8]) -> ContentParser<'a> {
        ContentParser::with_limit(buf, MAX_OPERAND_STACK_DEPTH)
    }

    /// Same as [`Self::new`], but with the operand stack cap taken from
    /// the caller's [`crate::config::Limits`] rather than the module
    /// default.
    pub fn with_limit(buf: &'a [u8], max_operand_stack_depth: usize) -> ContentParser<'a> {
        ContentParser { lexer: Lexer::new(buf), operands: Vec::new(), max_operand_stack_depth }
    }

    pub fn parse_all(buf: &[u8]) -> Vec<Operator> {
        ContentParser::parse_all_with_limit(buf, MAX_OPERAND_STACK_DEPTH)
    }

    /// Same as [`Self::parse_all`], but with the operand stack cap taken
    /// from the caller's [`crate::config::Limits`] rather than the
    /// module default.
    pub fn parse_all_with_limit(buf: &[u8], max_operand_stack_depth: usize) -> Vec<Operator> {
        let mut parser = ContentParser::with_limit(buf, max_operand_stack_depth);
        let mut out = Vec::new();
        loop {
            match parser.next_operator() {
                Ok(Some(op)) => out.push(op),
                Ok(None) => break,
                Err(_) => {
                    // best-effort per §4.7/§7: drop the malformed token
                    // and keep scanning rather than abort the stream.
                    if parser.lexer.next_token().is_err() {
                        break;
                    }
                }
            }
        }
        out
    }

    fn next_operator(&mut self) -> Result<Option<Operator>> {
        loop {
            let tok = self.lexer.next_token()?;
            match tok {
                Token::Eof => return Ok(None),
                Token::Integer(n) => self.push(Object::Integer(n))?,
                Token::Real(r) => self.push(Object::Real(r))?,
                Token::LiteralString(s) => self.push(Object::String(s))?,
                Token::HexString(s) => self.push(Object::String(s))?,
                Token::Name(n) => self.push(Object::Name(Name::new(n)))?,
                Token::ArrayOpen => {
                    let arr = self.parse_nested_array()?;
                    self.push(Object::Array(arr))?;
                }
                Token::DictOpen => {
                    let dict = self.parse_nested_dict()?;
                    self.push(Object::Dictionary(dict))?;
                }
                Token::ArrayClose | Token::DictClose => {
                    // stray closer outside a nested construct; ignore.
                }
                Token::Keyword(k) if k == "BI" => return Ok(Some(self.parse_inline_image()?)),
                Token::Keyword(k) => {
                    let op = self.dispatch(&k);
                    self.operands.clear();
                    return Ok(Some(op));
                }
            }
        }
    }

    fn push(&mut self, obj: Object) -> Result<()> {
        if self.operands.len() >= self.max_operand_stack_depth {
            return Err(Error::LimitExceeded("content-stream operand stack depth"));
        }
        self.operands.push(obj);
        Ok(())
    }

    fn parse_nested_array(&mut self) -> Result<Vec<Object>> {
        let mut items = Vec::new();
        loop {
            let tok = self.lexer.next_token()?;
            match tok {
                Token::ArrayClose => break,
                Token::Eof => return Err(Error::ParseError("unterminated array in content stream".into())),
                Token::ArrayOpen => items.push(Object::Array(self.parse_nested_array()?)),
                Token::DictOpen => items.push(Object::Dictionary(self.parse_nested_dict()?)),
                Token::Integer(n) => items.push(Object::Integer(n)),
                Token::Real(r) => items.push(Object::Real(r)),
                Token::LiteralString(s) | Token::HexString(s) => items.push(Object::String(s)),
                Token::Name(n) => items.push(Object::Name(Name::new(n))),
                Token::Keyword(_) | Token::DictClose => {}
            }
        }
        Ok(items)
    }

    fn parse_nested_dict(&mut self) -> Result<crate::object::Dictionary> {
        let mut dict = crate::object::Dictionary::new();
        loop {
            let tok = self.lexer.next_token()?;
            match tok {
                Token::DictClose => break,
                Token::Eof => return Err(Error::ParseError("unterminated dict in content stream".into())),
                Token::Name(key) => {
                    let value_tok = self.lexer.next_token()?;
                    let value = match value_tok {
                        Token::ArrayOpen => Object::Array(self.parse_nested_array()?),
                        Token::DictOpen => Object::Dictionary(self.parse_nested_dict()?),
                        Token::Integer(n) => Object::Integer(n),
                        Token::Real(r) => Object::Real(r),
                        Token::LiteralString(s) | Token::HexString(s) => Object::String(s),
                        Token::Name(n) => Object::Name(Name::new(n)),
                        Token::Keyword(k) if k == "true" => Object::Boolean(true),
                        Token::Keyword(k) if k == "false" => Object::Boolean(false),
                        _ => Object::Null,
                    };
                    dict.insert(Name::new(key), value);
                }
                _ => {}
            }
        }
        Ok(dict)
    }

    fn parse_inline_image(&mut self) -> Result<Operator> {
        let mut params = Vec::new();
        loop {
            let save = self.lexer.pos();
            match self.lexer.next_token()? {
                Token::Keyword(k) if k == "ID" => break,
                Token::Name(key) => {
                    let mut tmp_resolver = NoResolve;
                    let mut tmp_parser = ObjectParser::new(self.lexer.cursor.buf(), self.lexer.pos(), &mut tmp_resolver);
                    let value = tmp_parser.parse_object()?;
                    self.lexer.seek(tmp_parser.pos());
                    params.push((key, value));
                }
                Token::Eof => return Err(Error::ParseError("unterminated inline image dict".into())),
                _ => {
                    self.lexer.seek(save);
                    self.lexer.next_token()?;
                }
            }
        }
        // exactly one whitespace byte follows `ID` before raw data.
        let buf = self.lexer.cursor.buf();
        let mut pos = self.lexer.pos();
        if buf.get(pos).map(|b| crate::bytes::is_whitespace(*b)).unwrap_or(false) {
            pos += 1;
        }
        let declared_len = params.iter().find(|(k, _)| k == "L" || k == "Length").and_then(|(_, v)| v.as_i64());
        let end = match declared_len {
            Some(len) if pos + len as usize <= buf.len() => pos + len as usize,
            _ => find_ei(buf, pos).unwrap_or(buf.len()),
        };
        let data = buf[pos..end].to_vec();
        self.lexer.seek(end);
        // consume trailing whitespace + EI
        loop {
            let save = self.lexer.pos();
            match self.lexer.next_token()? {
                Token::Keyword(k) if k == "EI" => break,
                Token::Eof => break,
                _ => {
                    self.lexer.seek(save);
                    break;
                }
            }
        }
        Ok(Operator::InlineImage { params, data })
    }

    fn dispatch(&mut self, keyword: &str) -> Operator {
        let ops = std::mem::take(&mut self.operands);
        build_operator(keyword, ops)
    }
}

fn find_ei(buf: &[u8], from: usize) -> Option<usize> {
    let mut i = from;
    while i + 2 <= buf.len() {
        if &buf[i..i + 2] == b"EI"
            && (i == from || crate::bytes::is_whitespace(buf[i - 1]))
            && (i + 2 == buf.len() || crate::bytes::is_whitespace(buf[i + 2]))
        {
            let mut end = i;
            if end > from && crate::bytes::is_whitespace(buf[end - 1]) {
                end -= 1;
            }
            return Some(end);
        }
        i += 1;
    }
    None
}

fn num(ops: &[Object], i: usize) -> f32 {
    ops.get(i).and_then(Object::as_f32).unwrap_or(0.0)
}

fn int(ops: &[Object], i: usize) -> i64 {
    ops.get(i).and_then(Object::as_i64).unwrap_or(0)
}

fn name_at(ops: &[Object], i: usize) -> String {
    ops.get(i).and_then(Object::as_name).unwrap_or("").to_string()
}

fn bytes_at(ops: &[Object], i: usize) -> Vec<u8> {
    ops.get(i).and_then(Object::as_str_bytes).map(|b| b.to_vec()).unwrap_or_default()
}

fn generic(name: &str, ops: Vec<Object>) -> Operator {
    Operator::Generic { name: name.to_string(), operands: ops }
}

/// Builds the typed operator for `keyword` from its operand snapshot,
/// falling back to `Generic` on an unrecognized name or wrong arity
/// (§4.7 error policy).
fn build_operator(keyword: &str, ops: Vec<Object>) -> Operator {
    match keyword {
        "q" if ops.is_empty() => Operator::PushGraphicsState,
        "Q" if ops.is_empty() => Operator::PopGraphicsState,
        "cm" if ops.len() == 6 => Operator::ConcatMatrix([num(&ops, 0), num(&ops, 1), num(&ops, 2), num(&ops, 3), num(&ops, 4), num(&ops, 5)]),
        "w" if ops.len() == 1 => Operator::SetLineWidth(num(&ops, 0)),
        "J" if ops.len() == 1 => Operator::SetLineCap(int(&ops, 0)),
        "j" if ops.len() == 1 => Operator::SetLineJoin(int(&ops, 0)),
        "M" if ops.len() == 1 => Operator::SetMiterLimit(num(&ops, 0)),
        "d" if ops.len() == 2 => {
            let arr = ops[0].as_array().map(|a| a.iter().filter_map(Object::as_f32).collect()).unwrap_or_default();
            Operator::SetDashPattern(arr, num(&ops, 1))
        }
        "ri" if ops.len() == 1 => Operator::SetRenderingIntent(name_at(&ops, 0)),
        "i" if ops.len() == 1 => Operator::SetFlatness(num(&ops, 0)),
        "gs" if ops.len() == 1 => Operator::SetExtGState(name_at(&ops, 0)),
        "m" if ops.len() == 2 => Operator::MoveTo(num(&ops, 0), num(&ops, 1)),
        "l" if ops.len() == 2 => Operator::LineTo(num(&ops, 0), num(&ops, 1)),
        "c" if ops.len() == 6 => Operator::CurveTo(num(&ops, 0), num(&ops, 1), num(&ops, 2), num(&ops, 3), num(&ops, 4), num(&ops, 5)),
        "v" if ops.len() == 4 => Operator::CurveToV(num(&ops, 0), num(&ops, 1), num(&ops, 2), num(&ops, 3)),
        "y" if ops.len() == 4 => Operator::CurveToY(num(&ops, 0), num(&ops, 1), num(&ops, 2), num(&ops, 3)),
        "re" if ops.len() == 4 => Operator::Rectangle(num(&ops, 0), num(&ops, 1), num(&ops, 2), num(&ops, 3)),
        "h" if ops.is_empty() => Operator::ClosePath,
        "S" if ops.is_empty() => Operator::Stroke,
        "s" if ops.is_empty() => Operator::CloseAndStroke,
        "f" | "F" if ops.is_empty() => Operator::Fill,
        "f*" if ops.is_empty() => Operator::FillEvenOdd,
        "B" if ops.is_empty() => Operator::FillAndStroke,
        "B*" if ops.is_empty() => Operator::FillAndStrokeEvenOdd,
        "b" if ops.is_empty() => Operator::CloseFillAndStroke,
        "b*" if ops.is_empty() => Operator::CloseFillAndStrokeEvenOdd,
        "n" if ops.is_empty() => Operator::EndPathNoPaint,
        "W" if ops.is_empty() => Operator::ClipNonZero,
        "W*" if ops.is_empty() => Operator::ClipEvenOdd,
        "BT" if ops.is_empty() => Operator::BeginText,
        "ET" if ops.is_empty() => Operator::EndText,
        "Tc" if ops.len() == 1 => Operator::SetCharSpacing(num(&ops, 0)),
        "Tw" if ops.len() == 1 => Operator::SetWordSpacing(num(&ops, 0)),
        "Tz" if ops.len() == 1 => Operator::SetHorizontalScaling(num(&ops, 0)),
        "TL" if ops.len() == 1 => Operator::SetLeading(num(&ops, 0)),
        "Tf" if ops.len() == 2 => Operator::SetFont(name_at(&ops, 0), num(&ops, 1)),
        "Tr" if ops.len() == 1 => Operator::SetRenderingMode(int(&ops, 0)),
        "Ts" if ops.len() == 1 => Operator::SetTextRise(num(&ops, 0)),
        "Td" if ops.len() == 2 => Operator::MoveTextPosition(num(&ops, 0), num(&ops, 1)),
        "TD" if ops.len() == 2 => Operator::MoveTextPositionAndSetLeading(num(&ops, 0), num(&ops, 1)),
        "Tm" if ops.len() == 6 => Operator::SetTextMatrix([num(&ops, 0), num(&ops, 1), num(&ops, 2), num(&ops, 3), num(&ops, 4), num(&ops, 5)]),
        "T*" if ops.is_empty() => Operator::NextLine,
        "Tj" if ops.len() == 1 => Operator::ShowText(bytes_at(&ops, 0)),
        "TJ" if ops.len() == 1 => {
            let items = ops[0]
                .as_array()
                .map(|a| {
                    a.iter()
                        .filter_map(|o| match o {
                            Object::String(s) => Some(TextArrayItem::String(s.clone())),
                            Object::Integer(_) | Object::Real(_) => Some(TextArrayItem::Adjustment(o.as_f32().unwrap_or(0.0))),
                            _ => None,
                        })
                        .collect()
                })
                .unwrap_or_default();
            Operator::ShowTextArray(items)
        }
        "'" if ops.len() == 1 => Operator::NextLineShowText(bytes_at(&ops, 0)),
        "\"" if ops.len() == 3 => Operator::SetSpacingNextLineShowText(num(&ops, 0), num(&ops, 1), bytes_at(&ops, 2)),
        "cs" if ops.len() == 1 => Operator::SetFillColorSpace(name_at(&ops, 0)),
        "CS" if ops.len() == 1 => Operator::SetStrokeColorSpace(name_at(&ops, 0)),
        "sc" | "scn" => {
            let (nums, pat) = split_color_operands(&ops);
            Operator::SetFillColor(nums, pat)
        }
        "SC" | "SCN" => {
            let (nums, pat) = split_color_operands(&ops);
            Operator::SetStrokeColor(nums, pat)
        }
        "g" if ops.len() == 1 => Operator::SetFillGray(num(&ops, 0)),
        "G" if ops.len() == 1 => Operator::SetStrokeGray(num(&ops, 0)),
        "rg" if ops.len() == 3 => Operator::SetFillRgb(num(&ops, 0), num(&ops, 1), num(&ops, 2)),
        "RG" if ops.len() == 3 => Operator::SetStrokeRgb(num(&ops, 0), num(&ops, 1), num(&ops, 2)),
        "k" if ops.len() == 4 => Operator::SetFillCmyk(num(&ops, 0), num(&ops, 1), num(&ops, 2), num(&ops, 3)),
        "K" if ops.len() == 4 => Operator::SetStrokeCmyk(num(&ops, 0), num(&ops, 1), num(&ops, 2), num(&ops, 3)),
        "Do" if ops.len() == 1 => Operator::PaintXObject(name_at(&ops, 0)),
        "MP" => Operator::MarkedContentPoint,
        "BMC" | "BDC" => Operator::BeginMarkedContent,
        "EMC" if ops.is_empty() => Operator::EndMarkedContent,
        "BX" if ops.is_empty() => Operator::BeginCompatibility,
        "EX" if ops.is_empty() => Operator::EndCompatibility,
        "" => Operator::Generic { name: String::new(), operands: ops },
        other => generic(other, ops),
    }
}

fn split_color_operands(ops: &[Object]) -> (Vec<f32>, Option<String>) {
    let mut nums = Vec::new();
    let mut pattern = None;
    for op in ops {
        match op {
            Object::Name(n) => pattern = Some(n.as_str().to_string()),
            _ => {
                if let Some(f) = op.as_f32() {
                    nums.push(f);
                }
            }
        }
    }
    (nums, pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hello_world_stream() {
        let ops = ContentParser::parse_all(b"BT /F1 12 Tf 100 700 Td (Hello) Tj ET");
        assert_eq!(
            ops,
            vec![
                Operator::BeginText,
                Operator::SetFont("F1".into(), 12.0),
                Operator::MoveTextPosition(100.0, 700.0),
                Operator::ShowText(b"Hello".to_vec()),
                Operator::EndText,
            ]
        );
    }

    #[test]
    fn wrong_arity_falls_back_to_generic() {
        let ops = ContentParser::parse_all(b"1 2 cm");
        assert_eq!(ops, vec![Operator::Generic { name: "cm".into(), operands: vec![Object::Integer(1), Object::Integer(2)] }]);
    }

    #[test]
    fn tj_array_mixes_strings_and_numbers() {
        let ops = ContentParser::parse_all(b"[(A) -50 (B)] TJ");
        assert_eq!(
            ops,
            vec![Operator::ShowTextArray(vec![
                TextArrayItem::String(b"A".to_vec()),
                TextArrayItem::Adjustment(-50.0),
                TextArrayItem::String(b"B".to_vec()),
            ])]
        );
    }

    #[test]
    fn re_emits_rectangle_operator() {
        let ops = ContentParser::parse_all(b"10 20 30 40 re");
        assert_eq!(ops, vec![Operator::Rectangle(10.0, 20.0, 30.0, 40.0)]);
    }

    #[test]
    fn marked_content_operands_are_consumed() {
        let ops = ContentParser::parse_all(b"/OC /MC0 BDC q Q EMC");
        assert_eq!(ops, vec![Operator::BeginMarkedContent, Operator::PushGraphicsState, Operator::PopGraphicsState, Operator::EndMarkedContent]);
    }

    #[test]
    fn inline_image_captures_raw_bytes() {
        let ops = ContentParser::parse_all(b"BI /W 1 /H 1 /BPC 8 /CS /G ID \x7f EI");
        match &ops[0] {
            Operator::InlineImage { data, .. } => assert_eq!(data, &vec![0x7f]),
            other => panic!("expected inline image, got {other:?}"),
        }
    }
}
