//! C4: the stream-filter pipeline. `/Filter` (a name or array of names)
//! and `/DecodeParms` are applied left to right (§4.3). Flate, LZW,
//! ASCIIHex/85 and RunLength are built in; DCT/CCITT/JPX are delegated
//! to a pluggable `FilterRegistry` since decoding them is explicitly an
//! external-collaborator concern (§1).

use std::io::Read;

use crate::error::{Error, Result};
use crate::object::{Dictionary, DictionaryExt, Object};

/// Decoders this crate cannot implement itself (image codecs) are
/// resolved through this trait object, injected by the caller. The
/// default `Document` has none registered, so `/DCTDecode` etc. streams
/// simply pass through undecoded (their raw bytes are still accessible
/// via `Stream::raw_data` for a downstream image decoder).
pub trait FilterRegistry {
    fn decode(&self, filter: &str, data: &[u8], parms: Option<&Dictionary>) -> Result<Vec<u8>>;
}

/// A registry with no entries: every external filter name is passed
/// through unchanged rather than erroring, matching §7 tier-2 recovery
/// ("unknown filter on a non-essential stream: log, skip").
pub struct NullRegistry;

impl FilterRegistry for NullRegistry {
    fn decode(&self, _filter: &str, data: &[u8], _parms: Option<&Dictionary>) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

const BUILTIN_FILTERS: &[&str] = &[
    "FlateDecode", "Fl", "LZWDecode", "LZW", "ASCIIHexDecode", "AHx", "ASCII85Decode", "A85",
    "RunLengthDecode", "RL",
];

fn is_builtin(name: &str) -> bool {
    BUILTIN_FILTERS.contains(&name)
}

/// Runs `stream.dict`'s `/Filter` chain over `raw_data`, in order.
/// External filters (DCT/CCITT/JPX/Crypt) are routed through `registry`;
/// `/Crypt` is always a no-op here (stream decryption already happened
/// upstream in `crypt.rs`, before this function ever sees the bytes).
pub fn decode_stream(dict: &Dictionary, raw_data: &[u8], registry: &dyn FilterRegistry) -> Result<Vec<u8>> {
    let filters = filter_names(dict);
    let parms = decode_parms(dict, filters.len());

    let mut data = raw_data.to_vec();
    for (i, name) in filters.iter().enumerate() {
        let parm = parms.get(i).and_then(|p| p.as_ref());
        data = match name.as_str() {
            "FlateDecode" | "Fl" => {
                let decoded = inflate(&data)?;
                apply_predictor(decoded, parm)?
            }
            "LZWDecode" | "LZW" => {
                let early_change = parm.and_then(|p| p.get_i64("EarlyChange")).unwrap_or(1);
                let decoded = lzw_decode(&data, early_change != 0)?;
                apply_predictor(decoded, parm)?
            }
            "ASCIIHexDecode" | "AHx" => ascii_hex_decode(&data)?,
            "ASCII85Decode" | "A85" => ascii85_decode(&data)?,
            "RunLengthDecode" | "RL" => run_length_decode(&data),
            "Crypt" => data,
            other => registry.decode(other, &data, parm)?,
        };
    }
    Ok(data)
}

/// Returns the chain of filter names a stream declares, in application
/// order, whether `/Filter` is a bare name or an array.
pub fn filter_names(dict: &Dictionary) -> Vec<String> {
    match dict.get("Filter") {
        Some(Object::Name(n)) => vec![n.as_str().to_string()],
        Some(Object::Array(arr)) => arr.iter().filter_map(|o| o.as_name().map(|s| s.to_string())).collect(),
        _ => Vec::new(),
    }
}

fn decode_parms(dict: &Dictionary, count: usize) -> Vec<Option<Dictionary>> {
    match dict.get("DecodeParms").or_else(|| dict.get("DP")) {
        Some(Object::Dictionary(d)) => {
            let mut v = vec![None; count];
            if !v.is_empty() {
                v[0] = Some(d.clone());
            }
            v
        }
        Some(Object::Array(arr)) => arr
            .iter()
            .map(|o| o.as_dict().cloned())
            .chain(std::iter::repeat(None))
            .take(count)
            .collect(),
        _ => vec![None; count],
    }
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::read::ZlibDecoder;
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    match decoder.read_to_end(&mut out) {
        Ok(_) => Ok(out),
        Err(e) => {
            // some producers write raw deflate (no zlib header); retry
            // with the raw inflater before giving up.
            let mut raw = flate2::read::DeflateDecoder::new(data);
            let mut out2 = Vec::new();
            raw.read_to_end(&mut out2)
                .map(|_| out2)
                .map_err(|_| Error::DecoderError(format!("FlateDecode: {e}")))
        }
    }
}

fn lzw_decode(data: &[u8], early_change: bool) -> Result<Vec<u8>> {
    let mut decoder = if early_change {
        weezl::decode::Decoder::new(weezl::BitOrder::Msb, 8)
    } else {
        weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
    };
    decoder
        .decode(data)
        .map_err(|e| Error::DecoderError(format!("LZWDecode: {e:?}")))
}

fn ascii_hex_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut digits = Vec::new();
    for &b in data {
        if b == b'>' {
            break;
        }
        if b.is_ascii_hexdigit() {
            digits.push(b);
        }
    }
    if digits.len() % 2 == 1 {
        digits.push(b'0');
    }
    let mut out = Vec::with_capacity(digits.len() / 2);
    for pair in digits.chunks(2) {
        let hi = (pair[0] as char).to_digit(16).unwrap_or(0) as u8;
        let lo = (pair[1] as char).to_digit(16).unwrap_or(0) as u8;
        out.push(hi * 16 + lo);
    }
    Ok(out)
}

fn ascii85_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut group = [0u8; 5];
    let mut n = 0;
    let mut iter = data.iter().copied().peekable();
    // skip an optional leading "<~"
    if data.starts_with(b"<~") {
        iter.next();
        iter.next();
    }
    while let Some(b) = iter.next() {
        if b == b'~' {
            break;
        }
        if b.is_ascii_whitespace() {
            continue;
        }
        if b == b'z' && n == 0 {
            out.extend_from_slice(&[0, 0, 0, 0]);
            continue;
        }
        if !(b'!'..=b'u').contains(&b) {
            continue;
        }
        group[n] = b - b'!';
        n += 1;
        if n == 5 {
            out.extend_from_slice(&decode_group_85(&group, 5));
            n = 0;
        }
    }
    if n > 0 {
        for slot in group.iter_mut().skip(n) {
            *slot = 84;
        }
        let bytes = decode_group_85(&group, n);
        out.extend_from_slice(&bytes[..n - 1]);
    }
    Ok(out)
}

fn decode_group_85(group: &[u8; 5], _n: usize) -> [u8; 4] {
    let mut val: u32 = 0;
    for &d in group {
        val = val.wrapping_mul(85).wrapping_add(d as u32);
    }
    val.to_be_bytes()
}

fn run_length_decode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let len = data[i];
        i += 1;
        if len == 128 {
            break;
        } else if len < 128 {
            let n = len as usize + 1;
            if i + n > data.len() {
                out.extend_from_slice(&data[i..]);
                break;
            }
            out.extend_from_slice(&data[i..i + n]);
            i += n;
        } else {
            if i >= data.len() {
                break;
            }
            let count = 257 - len as usize;
            out.extend(std::iter::repeat(data[i]).take(count));
            i += 1;
        }
    }
    out
}

/// PNG predictors (10-14) and TIFF predictor 2, applied post-Flate/LZW
/// per `/DecodeParms` (§4.3).
fn apply_predictor(data: Vec<u8>, parm: Option<&Dictionary>) -> Result<Vec<u8>> {
    let Some(parm) = parm else { return Ok(data) };
    let predictor = parm.get_i64("Predictor").unwrap_or(1);
    if predictor <= 1 {
        return Ok(data);
    }
    let colors = parm.get_i64("Colors").unwrap_or(1).max(1) as usize;
    let bpc = parm.get_i64("BitsPerComponent").unwrap_or(8).max(1) as usize;
    let columns = parm.get_i64("Columns").unwrap_or(1).max(1) as usize;
    let bytes_per_pixel = ((colors * bpc) as f64 / 8.0).ceil().max(1.0) as usize;
    let row_bytes = (colors * bpc * columns + 7) / 8;

    if predictor == 2 {
        return Ok(undo_tiff_predictor(data, colors, bpc, columns));
    }

    // PNG predictors: each row is prefixed with a one-byte filter tag.
    let stride = row_bytes + 1;
    let n_rows = data.len() / stride;
    let mut out = Vec::with_capacity(n_rows * row_bytes);
    let mut prev = vec![0u8; row_bytes];
    for r in 0..n_rows {
        let row_start = r * stride;
        let tag = data[row_start];
        let row = &data[row_start + 1..row_start + 1 + row_bytes];
        let mut cur = vec![0u8; row_bytes];
        for i in 0..row_bytes {
            let a = if i >= bytes_per_pixel { cur[i - bytes_per_pixel] } else { 0 };
            let b = prev[i];
            let c = if i >= bytes_per_pixel { prev[i - bytes_per_pixel] } else { 0 };
            let x = row[i];
            cur[i] = match tag {
                0 => x,
                1 => x.wrapping_add(a),
                2 => x.wrapping_add(b),
                3 => x.wrapping_add(((a as u16 + b as u16) / 2) as u8),
                4 => x.wrapping_add(paeth(a, b, c)),
                _ => x,
            };
        }
        out.extend_from_slice(&cur);
        prev = cur;
    }
    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let (a, b, c) = (a as i32, b as i32, c as i32);
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        a as u8
    } else if pb <= pc {
        b as u8
    } else {
        c as u8
    }
}

fn undo_tiff_predictor(mut data: Vec<u8>, colors: usize, bpc: usize, columns: usize) -> Vec<u8> {
    if bpc != 8 {
        // sub-byte TIFF prediction is rare; not implemented, pass through.
        return data;
    }
    let row_bytes = colors * columns;
    for row in data.chunks_mut(row_bytes) {
        for i in colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - colors]);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_hex_roundtrip() {
        let decoded = ascii_hex_decode(b"48656c6c6f>").unwrap();
        assert_eq!(decoded, b"Hello");
    }

    #[test]
    fn ascii85_decodes_known_vector() {
        // "Man " in ascii85 is well known from the Adobe spec example.
        let decoded = ascii85_decode(b"9jqo^").unwrap();
        assert_eq!(decoded, b"Man ");
    }

    #[test]
    fn run_length_literal_and_repeat() {
        let data = [2, b'a', b'b', b'c', 254, b'z', 128];
        assert_eq!(run_length_decode(&data), b"abczzz".to_vec());
    }

    #[test]
    fn png_predictor_up_roundtrips_identity_for_tag_zero() {
        // two rows of 1-byte, tag 0 (no filter): predictor is a no-op.
        let data = vec![0u8, 10, 0u8, 20];
        let mut parm = Dictionary::new();
        parm.insert("Predictor".into(), Object::Integer(12));
        parm.insert("Colors".into(), Object::Integer(1));
        parm.insert("BitsPerComponent".into(), Object::Integer(8));
        parm.insert("Columns".into(), Object::Integer(1));
        let out = apply_predictor(data, Some(&parm)).unwrap();
        assert_eq!(out, vec![10, 20]);
    }

    #[test]
    fn flate_roundtrip_via_zlib_header() {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::fast());
        enc.write_all(b"hello world").unwrap();
        let compressed = enc.finish().unwrap();
        let out = inflate(&compressed).unwrap();
        assert_eq!(out, b"hello world");
    }
}
