//! C9/C11: color-space resolution (§4.9). A name used by `CS`/`cs`/
//! `SC`/`scn` is resolved against the active `/ColorSpace` resource
//! entry into a `ColorSpace`, which then knows how to reduce its
//! component vector to a device `Color`.

use crate::color::Color;
use crate::document::Document;
use crate::error::Result;
use crate::function::Function;
use crate::object::{Dictionary, DictionaryExt, Object};

#[derive(Debug, Clone)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRgb,
    DeviceCmyk,
    CalGray,
    CalRgb,
    Lab { range: [f32; 4] },
    /// Reduced eagerly to its alternate (or the `/N`-inferred device
    /// space) since the ICC profile bytes themselves are out of scope.
    IccBased(Box<ColorSpace>, usize),
    Indexed { base: Box<ColorSpace>, hival: i64, lookup: Vec<u8> },
    Separation { alternate: Box<ColorSpace>, tint_transform: Option<Function>, names: Vec<String> },
    Pattern(Option<Box<ColorSpace>>),
}

impl ColorSpace {
    pub fn n_components(&self) -> usize {
        match self {
            ColorSpace::DeviceGray | ColorSpace::CalGray => 1,
            ColorSpace::DeviceRgb | ColorSpace::CalRgb | ColorSpace::Lab { .. } => 3,
            ColorSpace::DeviceCmyk => 4,
            ColorSpace::IccBased(_, n) => *n,
            ColorSpace::Indexed { .. } => 1,
            ColorSpace::Separation { names, .. } => names.len().max(1),
            ColorSpace::Pattern(Some(base)) => base.n_components(),
            ColorSpace::Pattern(None) => 0,
        }
    }

    /// The spec-mandated reset vector when `CS`/`cs` selects a new
    /// space: all-zero components, which is black in every device space
    /// this core supports (§3: "defaults DeviceGray [0]").
    pub fn default_components(&self) -> Vec<f32> {
        vec![0.0; self.n_components().max(1)]
    }

    /// Reduces a component vector to a device color, per §4.9's
    /// resolution rules.
    pub fn to_color(&self, components: &[f32]) -> Color {
        match self {
            ColorSpace::DeviceGray | ColorSpace::CalGray => {
                Color::Gray(components.first().copied().unwrap_or(0.0))
            }
            ColorSpace::DeviceRgb | ColorSpace::CalRgb => Color::Rgb(
                components.first().copied().unwrap_or(0.0),
                components.get(1).copied().unwrap_or(0.0),
                components.get(2).copied().unwrap_or(0.0),
            ),
            ColorSpace::DeviceCmyk => Color::Cmyk(
                components.first().copied().unwrap_or(0.0),
                components.get(1).copied().unwrap_or(0.0),
                components.get(2).copied().unwrap_or(0.0),
                components.get(3).copied().unwrap_or(1.0),
            ),
            ColorSpace::Lab { range } => lab_to_rgb(components, range),
            ColorSpace::IccBased(alt, _) => alt.to_color(components),
            ColorSpace::Indexed { base, hival, lookup } => {
                let idx = (components.first().copied().unwrap_or(0.0).round() as i64).clamp(0, *hival) as usize;
                let n = base.n_components();
                let start = idx * n;
                let comps: Vec<f32> = (0..n)
                    .map(|i| lookup.get(start + i).map(|&b| b as f32 / 255.0).unwrap_or(0.0))
                    .collect();
                base.to_color(&comps)
            }
            ColorSpace::Separation { alternate, tint_transform, names } => {
                if let Some(f) = tint_transform {
                    let out = f.eval(components);
                    if !out.is_empty() {
                        return alternate.to_color(&out);
                    }
                }
                // documented fallback heuristic (§4.9) when the tint
                // transform is unavailable: "All"/"Black" => gray =
                // 1 - tint; anything else, same gray heuristic.
                let tint = components.first().copied().unwrap_or(0.0);
                let _ = names;
                Color::Gray(1.0 - tint)
            }
            ColorSpace::Pattern(Some(base)) => base.to_color(components),
            ColorSpace::Pattern(None) => Color::BLACK,
        }
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, ColorSpace::Pattern(_))
    }

    /// Resolves a color-space *name* as it appears in `CS`/`cs`/`Do`'s
    /// image `/ColorSpace` entry: the device names are recognized
    /// directly; anything else is looked up in the active resource
    /// dictionary's `/ColorSpace` subdictionary (§4.9).
    pub fn resolve_name(doc: &Document, name: &str, color_space_resources: Option<&Dictionary>) -> Result<ColorSpace> {
        match name {
            "DeviceGray" | "G" | "CalGray" => return Ok(ColorSpace::DeviceGray),
            "DeviceRGB" | "RGB" => return Ok(ColorSpace::DeviceRgb),
            "DeviceCMYK" | "CMYK" => return Ok(ColorSpace::DeviceCmyk),
            "Pattern" => return Ok(ColorSpace::Pattern(None)),
            _ => {}
        }
        let entry = color_space_resources.and_then(|d| d.get(name));
        match entry {
            Some(obj) => {
                let resolved = doc.resolve(obj)?;
                ColorSpace::resolve_object(doc, &resolved, color_space_resources)
            }
            None => Ok(ColorSpace::DeviceGray),
        }
    }

    /// Resolves an already-fetched color-space object (a name or a
    /// `[type ...]` array, §4.9).
    pub fn resolve_object(doc: &Document, obj: &Object, color_space_resources: Option<&Dictionary>) -> Result<ColorSpace> {
        match obj {
            Object::Name(n) => ColorSpace::resolve_name(doc, n.as_str(), color_space_resources),
            Object::Array(arr) => {
                let Some(kind) = arr.first().and_then(Object::as_name) else {
                    return Ok(ColorSpace::DeviceGray);
                };
                match kind {
                    "ICCBased" => {
                        let stream_obj = arr.get(1).map(|o| doc.resolve(o)).transpose()?;
                        let n = stream_obj
                            .as_ref()
                            .and_then(|o| o.as_dict())
                            .and_then(|d| d.get_i64("N"))
                            .unwrap_or(3);
                        let alt = stream_obj
                            .as_ref()
                            .and_then(|o| o.as_dict())
                            .and_then(|d| d.get("Alternate"))
                            .cloned();
                        let alternate = match alt {
                            Some(a) => ColorSpace::resolve_object(doc, &a, color_space_resources)?,
                            None => match n {
                                1 => ColorSpace::DeviceGray,
                                4 => ColorSpace::DeviceCmyk,
                                _ => ColorSpace::DeviceRgb,
                            },
                        };
                        Ok(ColorSpace::IccBased(Box::new(alternate), n as usize))
                    }
                    "CalRGB" => Ok(ColorSpace::CalRgb),
                    "CalGray" => Ok(ColorSpace::CalGray),
                    "Lab" => {
                        let params = arr.get(1).and_then(Object::as_dict);
                        let range_arr = params.and_then(|d| d.get_array("Range"));
                        let mut range = [-100.0, 100.0, -100.0, 100.0];
                        if let Some(r) = range_arr {
                            for (i, v) in r.iter().take(4).enumerate() {
                                range[i] = v.as_f32().unwrap_or(range[i]);
                            }
                        }
                        Ok(ColorSpace::Lab { range })
                    }
                    "Indexed" => {
                        let base_obj = arr.get(1).map(|o| doc.resolve(o)).transpose()?;
                        let base = match base_obj {
                            Some(b) => ColorSpace::resolve_object(doc, &b, color_space_resources)?,
                            None => ColorSpace::DeviceRgb,
                        };
                        let hival = arr.get(2).and_then(Object::as_i64).unwrap_or(0);
                        let lookup_obj = arr.get(3).map(|o| doc.resolve(o)).transpose()?;
                        let lookup = match lookup_obj.as_deref() {
                            Some(Object::String(s)) => s.clone(),
                            Some(Object::Stream(s)) => doc.decode_stream_data(s)?,
                            _ => Vec::new(),
                        };
                        Ok(ColorSpace::Indexed { base: Box::new(base), hival, lookup })
                    }
                    "Separation" | "DeviceN" => {
                        let names: Vec<String> = match arr.get(1) {
                            Some(Object::Name(n)) => vec![n.as_str().to_string()],
                            Some(Object::Array(names)) => {
                                names.iter().filter_map(Object::as_name).map(str::to_string).collect()
                            }
                            _ => Vec::new(),
                        };
                        let alt_obj = arr.get(2).map(|o| doc.resolve(o)).transpose()?;
                        let alternate = match alt_obj {
                            Some(a) => ColorSpace::resolve_object(doc, &a, color_space_resources)?,
                            None => ColorSpace::DeviceGray,
                        };
                        let tint_transform = match arr.get(3) {
                            Some(f_obj) => {
                                let resolved = doc.resolve(f_obj)?;
                                Function::parse(doc, &resolved).ok()
                            }
                            None => None,
                        };
                        Ok(ColorSpace::Separation { alternate: Box::new(alternate), tint_transform, names })
                    }
                    "Pattern" => {
                        let base = match arr.get(1) {
                            Some(b) => {
                                let resolved = doc.resolve(b)?;
                                Some(Box::new(ColorSpace::resolve_object(doc, &resolved, color_space_resources)?))
                            }
                            None => None,
                        };
                        Ok(ColorSpace::Pattern(base))
                    }
                    "DeviceGray" => Ok(ColorSpace::DeviceGray),
                    "DeviceRGB" => Ok(ColorSpace::DeviceRgb),
                    "DeviceCMYK" => Ok(ColorSpace::DeviceCmyk),
                    _ => Ok(ColorSpace::DeviceGray),
                }
            }
            _ => Ok(ColorSpace::DeviceGray),
        }
    }
}

fn lab_to_rgb(components: &[f32], _range: &[f32; 4]) -> Color {
    let l = components.first().copied().unwrap_or(0.0);
    let a = components.get(1).copied().unwrap_or(0.0);
    let b = components.get(2).copied().unwrap_or(0.0);
    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;
    let finv = |t: f32| if t > 6.0 / 29.0 { t * t * t } else { 3.0 * (6.0f32 / 29.0).powi(2) * (t - 4.0 / 29.0) };
    // D50 reference white, then a simplified linear XYZ->sRGB matrix.
    let (xn, yn, zn) = (0.9642, 1.0, 0.8249);
    let (x, y, z) = (finv(fx) * xn, finv(fy) * yn, finv(fz) * zn);
    let r = 3.1338 * x - 1.6168 * y - 0.4906 * z;
    let g = -0.9787 * x + 1.9161 * y + 0.0334 * z;
    let bl = 0.0719 * x - 0.2289 * y + 1.4052 * z;
    Color::Rgb(r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), bl.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_gray_reduces_to_itself() {
        let cs = ColorSpace::DeviceGray;
        assert_eq!(cs.to_color(&[0.5]), Color::Gray(0.5));
        assert_eq!(cs.default_components(), vec![0.0]);
    }

    #[test]
    fn separation_fallback_inverts_tint_without_function() {
        let cs = ColorSpace::Separation {
            alternate: Box::new(ColorSpace::DeviceGray),
            tint_transform: None,
            names: vec!["Black".into()],
        };
        assert_eq!(cs.to_color(&[1.0]), Color::Gray(0.0));
        assert_eq!(cs.to_color(&[0.0]), Color::Gray(1.0));
    }

    #[test]
    fn indexed_looks_up_rgb_triplet() {
        let cs = ColorSpace::Indexed {
            base: Box::new(ColorSpace::DeviceRgb),
            hival: 1,
            lookup: vec![0, 0, 0, 255, 128, 0],
        };
        match cs.to_color(&[1.0]) {
            Color::Rgb(r, g, b) => {
                assert!((r - 1.0).abs() < 1e-3);
                assert!((g - 0.50196).abs() < 1e-2);
                assert_eq!(b, 0.0);
            }
            _ => panic!("expected rgb"),
        }
    }
}
