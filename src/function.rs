//! A small PDF function evaluator (ISO 32000-1 §7.10), used by
//! `colorspace::resolve` to evaluate Separation/DeviceN tint transforms.
//! Types 0 (sampled), 2 (exponential interpolation) and 3 (stitching)
//! are implemented; type 4 (PostScript calculator) is reduced to the
//! fallback heuristic spec §4.9 documents, since a full calculator-
//! function interpreter is out of proportion to this core's scope.

use crate::document::Document;
use crate::error::Result;
use crate::object::{Dictionary, DictionaryExt, Object};

#[derive(Debug, Clone)]
pub enum Function {
    Sampled {
        domain: Vec<(f32, f32)>,
        range: Vec<(f32, f32)>,
        size: Vec<usize>,
        bits_per_sample: u32,
        encode: Vec<(f32, f32)>,
        decode: Vec<(f32, f32)>,
        samples: Vec<u8>,
        n_out: usize,
    },
    Exponential {
        domain: (f32, f32),
        c0: Vec<f32>,
        c1: Vec<f32>,
        exponent: f32,
    },
    Stitching {
        domain: (f32, f32),
        functions: Vec<Function>,
        bounds: Vec<f32>,
        encode: Vec<(f32, f32)>,
    },
    /// Type 4 / unrecognized: the caller should use the documented
    /// fallback heuristic instead of calling `eval`.
    Unsupported,
}

impl Function {
    pub fn parse(doc: &Document, obj: &Object) -> Result<Function> {
        let dict = obj.as_dict().cloned().unwrap_or_default();
        let ftype = dict.get_i64("FunctionType").unwrap_or(-1);
        let domain = pairs(dict.get_array("Domain").unwrap_or(&[]));
        match ftype {
            0 => {
                let stream = obj.as_stream();
                let samples = match stream {
                    Some(s) => doc.decode_stream_data(s)?,
                    None => Vec::new(),
                };
                let size: Vec<usize> = dict
                    .get_array("Size")
                    .unwrap_or(&[])
                    .iter()
                    .filter_map(|o| o.as_i64())
                    .map(|v| v.max(0) as usize)
                    .collect();
                let bits_per_sample = dict.get_i64("BitsPerSample").unwrap_or(8) as u32;
                let range = pairs(dict.get_array("Range").unwrap_or(&[]));
                let n_out = range.len().max(1);
                let default_encode: Vec<(f32, f32)> =
                    size.iter().map(|&s| (0.0, (s.max(1) - 1) as f32)).collect();
                let encode = if dict.get("Encode").is_some() {
                    pairs(dict.get_array("Encode").unwrap_or(&[]))
                } else {
                    default_encode
                };
                let decode = if dict.get("Decode").is_some() {
                    pairs(dict.get_array("Decode").unwrap_or(&[]))
                } else {
                    range.clone()
                };
                Ok(Function::Sampled { domain, range, size, bits_per_sample, encode, decode, samples, n_out })
            }
            2 => {
                let c0 = floats(dict.get_array("C0").unwrap_or(&[Object::Real(0.0)]));
                let c1 = floats(dict.get_array("C1").unwrap_or(&[Object::Real(1.0)]));
                let exponent = dict.get_f32("N").unwrap_or(1.0);
                Ok(Function::Exponential { domain: domain.first().copied().unwrap_or((0.0, 1.0)), c0, c1, exponent })
            }
            3 => {
                let funcs_arr = dict.get_array("Functions").unwrap_or(&[]);
                let mut functions = Vec::with_capacity(funcs_arr.len());
                for f in funcs_arr {
                    let resolved = doc.resolve(f)?;
                    functions.push(Function::parse(doc, &resolved)?);
                }
                let bounds = floats(dict.get_array("Bounds").unwrap_or(&[]));
                let encode = pairs(dict.get_array("Encode").unwrap_or(&[]));
                Ok(Function::Stitching { domain: domain.first().copied().unwrap_or((0.0, 1.0)), functions, bounds, encode })
            }
            _ => Ok(Function::Unsupported),
        }
    }

    /// Evaluates the function at `input`, clamped to `Domain`.
    pub fn eval(&self, input: &[f32]) -> Vec<f32> {
        match self {
            Function::Exponential { domain, c0, c1, exponent } => {
                let x = input.first().copied().unwrap_or(0.0).clamp(domain.0, domain.1);
                let xe = x.powf(*exponent);
                c0.iter().zip(c1.iter()).map(|(&a, &b)| a + xe * (b - a)).collect()
            }
            Function::Stitching { domain, functions, bounds, encode } => {
                if functions.is_empty() {
                    return vec![0.0];
                }
                let x = input.first().copied().unwrap_or(0.0).clamp(domain.0, domain.1);
                let mut k = 0;
                while k < bounds.len() && x >= bounds[k] {
                    k += 1;
                }
                let lo = if k == 0 { domain.0 } else { bounds[k - 1] };
                let hi = if k == bounds.len() { domain.1 } else { bounds[k] };
                let (e0, e1) = encode.get(k).copied().unwrap_or((0.0, 1.0));
                let encoded = interpolate(x, lo, hi, e0, e1);
                functions[k.min(functions.len() - 1)].eval(&[encoded])
            }
            Function::Sampled { domain, range, size, bits_per_sample, encode, decode, samples, n_out } => {
                eval_sampled(domain, range, size, *bits_per_sample, encode, decode, samples, *n_out, input)
            }
            Function::Unsupported => Vec::new(),
        }
    }
}

fn pairs(arr: &[Object]) -> Vec<(f32, f32)> {
    arr.chunks(2)
        .filter(|c| c.len() == 2)
        .map(|c| (c[0].as_f32().unwrap_or(0.0), c[1].as_f32().unwrap_or(0.0)))
        .collect()
}

fn floats(arr: &[Object]) -> Vec<f32> {
    arr.iter().map(|o| o.as_f32().unwrap_or(0.0)).collect()
}

fn interpolate(x: f32, xmin: f32, xmax: f32, ymin: f32, ymax: f32) -> f32 {
    if (xmax - xmin).abs() < f32::EPSILON {
        return ymin;
    }
    ymin + (x - xmin) * (ymax - ymin) / (xmax - xmin)
}

#[allow(clippy::too_many_arguments)]
fn eval_sampled(
    domain: &[(f32, f32)],
    range: &[(f32, f32)],
    size: &[usize],
    bits_per_sample: u32,
    encode: &[(f32, f32)],
    decode: &[(f32, f32)],
    samples: &[u8],
    n_out: usize,
    input: &[f32],
) -> Vec<f32> {
    if size.is_empty() || n_out == 0 {
        return vec![0.0; n_out.max(1)];
    }
    // nearest-neighbor sampling; good enough for the tint-transform use
    // case this evaluator exists for (spline interpolation between
    // samples is not implemented).
    let mut index = 0usize;
    let mut stride = 1usize;
    for (i, &dim_size) in size.iter().enumerate() {
        let (d0, d1) = domain.get(i).copied().unwrap_or((0.0, 1.0));
        let (e0, e1) = encode.get(i).copied().unwrap_or((0.0, (dim_size.max(1) - 1) as f32));
        let x = input.get(i).copied().unwrap_or(0.0).clamp(d0, d1);
        let encoded = interpolate(x, d0, d1, e0, e1).round().clamp(0.0, (dim_size.max(1) - 1) as f32);
        index += encoded as usize * stride;
        stride *= dim_size.max(1);
    }
    let max_val = (1u64 << bits_per_sample) - 1;
    let mut out = Vec::with_capacity(n_out);
    for j in 0..n_out {
        let sample_index = index * n_out + j;
        let bit_offset = sample_index as u64 * bits_per_sample as u64;
        let raw = read_bits(samples, bit_offset, bits_per_sample);
        let (r0, r1) = range.get(j).copied().unwrap_or((0.0, 1.0));
        let (dec0, dec1) = decode.get(j).copied().unwrap_or((r0, r1));
        let value = interpolate(raw as f32, 0.0, max_val as f32, dec0, dec1).clamp(r0.min(r1), r0.max(r1));
        out.push(value);
    }
    out
}

fn read_bits(data: &[u8], bit_offset: u64, n_bits: u32) -> u64 {
    let mut value: u64 = 0;
    for i in 0..n_bits as u64 {
        let bit_index = bit_offset + i;
        let byte_index = (bit_index / 8) as usize;
        let bit_in_byte = 7 - (bit_index % 8);
        let bit = data.get(byte_index).map(|b| (b >> bit_in_byte) & 1).unwrap_or(0);
        value = (value << 1) | bit as u64;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_linear_interpolates_endpoints() {
        let f = Function::Exponential { domain: (0.0, 1.0), c0: vec![0.0], c1: vec![1.0], exponent: 1.0 };
        assert_eq!(f.eval(&[0.0]), vec![0.0]);
        assert_eq!(f.eval(&[1.0]), vec![1.0]);
        assert!((f.eval(&[0.5])[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn stitching_picks_correct_subfunction() {
        let lo = Function::Exponential { domain: (0.0, 1.0), c0: vec![0.0], c1: vec![0.0], exponent: 1.0 };
        let hi = Function::Exponential { domain: (0.0, 1.0), c0: vec![1.0], c1: vec![1.0], exponent: 1.0 };
        let stitched = Function::Stitching {
            domain: (0.0, 1.0),
            functions: vec![lo, hi],
            bounds: vec![0.5],
            encode: vec![(0.0, 1.0), (0.0, 1.0)],
        };
        assert_eq!(stitched.eval(&[0.1]), vec![0.0]);
        assert_eq!(stitched.eval(&[0.9]), vec![1.0]);
    }
}
