//! C7: the document façade. Owns the xref table and the byte buffer,
//! lazily loads and caches indirect objects (including through
//! decryption and object streams), and walks the page tree exposing
//! inheritable attributes (§3 "Page tree").

use std::cell::RefCell;
use std::collections::HashMap;

use crate::config::{Limits, ParseOptions};
use crate::crypt::{Permissions, SecurityHandler};
use crate::error::{Error, Result};
use crate::filters::{decode_stream, FilterRegistry, NullRegistry};
use crate::object::{Dictionary, DictionaryExt, Object, Reference};
use crate::parser::{ObjectParser, Resolve};
use crate::xref::{self, XrefEntry, XrefTable};

pub const MAX_OBJSTM_SUBOBJECTS: usize = 65_535;

pub struct Document {
    buf: Vec<u8>,
    header_offset: usize,
    xref: XrefTable,
    cache: RefCell<HashMap<u32, Object>>,
    security: Option<SecurityHandler>,
    registry: Box<dyn FilterRegistry>,
    limits: Limits,
    fail_on_error: bool,
}

/// Bridges `Document::fetch_object` back into `ObjectParser`'s resolver
/// callback so an indirect `/Length` resolves during stream parsing.
struct DocResolver<'d> {
    doc: &'d Document,
}

impl<'d> Resolve for DocResolver<'d> {
    fn resolve(&mut self, r: Reference) -> Result<Object> {
        self.doc.get_object(r.number)
    }
}

impl Document {
    /// Loads a document from an in-memory byte buffer. `password` is
    /// tried only if the document is encrypted; pass `b""` for the
    /// common empty-user-password case. Uses every [`Limits`] default and
    /// the best-effort (`fail_on_error: false`) error posture; see
    /// [`Self::load_with_options`] to configure either.
    pub fn load(buf: Vec<u8>, password: &[u8]) -> Result<Document> {
        Document::load_with_options(buf, &ParseOptions::with_password(password))
    }

    /// Same as [`Self::load`], but with the password, depth/stack caps,
    /// and strict/best-effort error posture taken from `options`.
    pub fn load_with_options(buf: Vec<u8>, options: &ParseOptions) -> Result<Document> {
        let (header_offset, startxref) = xref::locate_header_and_startxref(&buf)?;
        let xref = XrefTable::load_with_limit(&buf, startxref, header_offset, options.limits.max_prev_chain)?;

        let mut doc = Document {
            buf,
            header_offset,
            xref,
            cache: RefCell::new(HashMap::new()),
            security: None,
            registry: Box::new(NullRegistry),
            limits: options.limits,
            fail_on_error: options.fail_on_error,
        };

        if let Some(encrypt_ref) = doc.xref.trailer.get("Encrypt").cloned() {
            let encrypt_dict = match &encrypt_ref {
                Object::Reference(r) => doc.get_object(r.number)?.as_dict().cloned(),
                Object::Dictionary(d) => Some(d.clone()),
                _ => None,
            }
            .ok_or_else(|| Error::UnsupportedEncryption("/Encrypt is not a dictionary".into()))?;
            let filter = encrypt_dict.get_str("Filter").unwrap_or("Standard");
            if filter != "Standard" {
                return Err(Error::UnsupportedEncryption(format!("non-standard handler: {filter}")));
            }
            let id0 = doc
                .xref
                .trailer
                .get_array("ID")
                .and_then(|a| a.first())
                .and_then(Object::as_str_bytes)
                .unwrap_or(&[])
                .to_vec();
            let handler = SecurityHandler::new(&encrypt_dict, &id0, &options.password)?;
            doc.security = Some(handler);
            // the Encrypt dict itself must never be treated as encrypted
            // (§4.5); invalidate anything cached while unauthenticated.
            doc.cache.borrow_mut().clear();
        }

        Ok(doc)
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn fail_on_error(&self) -> bool {
        self.fail_on_error
    }

    pub fn set_filter_registry(&mut self, registry: Box<dyn FilterRegistry>) {
        self.registry = registry;
    }

    pub fn is_encrypted(&self) -> bool {
        self.security.is_some()
    }

    pub fn permissions(&self) -> Option<Permissions> {
        self.security.as_ref().map(|s| s.permissions)
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.xref.trailer
    }

    /// Resolves `obj` one level if it's a `Reference`, otherwise returns
    /// it unchanged. The common "give me the value, following at most
    /// one indirection" accessor content-stream operators and the page
    /// tree walk both want.
    pub fn resolve<'a>(&self, obj: &'a Object) -> Result<std::borrow::Cow<'a, Object>> {
        match obj {
            Object::Reference(r) => Ok(std::borrow::Cow::Owned(self.get_object(r.number)?)),
            other => Ok(std::borrow::Cow::Borrowed(other)),
        }
    }

    /// Object number 0 is always null (§8 boundary behavior); otherwise
    /// loads from cache or the xref table, decrypting strings/streams
    /// transparently per §4.5.
    pub fn get_object(&self, number: u32) -> Result<Object> {
        if number == 0 {
            return Ok(Object::Null);
        }
        if let Some(cached) = self.cache.borrow().get(&number) {
            return Ok(cached.clone());
        }
        let value = match self.xref.get(number) {
            Some(XrefEntry::Uncompressed { offset, generation }) => {
                let mut resolver = DocResolver { doc: self };
                let obj = xref::parse_object_at(&self.buf, offset + self.header_offset, number, &mut resolver)?;
                self.decrypt_object(number, generation, obj)?
            }
            Some(XrefEntry::Compressed { stream_number, index }) => {
                self.load_from_object_stream(stream_number, index)?
            }
            Some(XrefEntry::Free { .. }) | None => Object::Null,
        };
        self.cache.borrow_mut().insert(number, value.clone());
        Ok(value)
    }

    fn decrypt_object(&self, number: u32, generation: u16, obj: Object) -> Result<Object> {
        let Some(security) = &self.security else { return Ok(obj) };
        decrypt_recursive(obj, number, generation, security)
    }

    fn load_from_object_stream(&self, stream_number: u32, index: u32) -> Result<Object> {
        let stream_obj = self.get_object(stream_number)?;
        let stream = stream_obj
            .as_stream()
            .ok_or_else(|| Error::ParseError("ObjStm xref entry does not point at a stream".into()))?;
        let n = stream.dict.get_i64("N").unwrap_or(0).max(0) as usize;
        let first = stream.dict.get_i64("First").unwrap_or(0).max(0) as usize;
        if n > self.limits.max_objstm_subobjects {
            return Err(Error::LimitExceeded("object-stream sub-object count"));
        }
        let decoded = decode_stream(&stream.dict, &stream.raw_data, self.registry.as_ref())?;

        // header: N pairs of (object-number, relative-offset)
        let mut header_lexer = crate::lexer::Lexer::new(&decoded);
        let mut offsets = Vec::with_capacity(n);
        for _ in 0..n {
            let num = match header_lexer.next_token()? {
                crate::lexer::Token::Integer(v) => v as u32,
                other => return Err(Error::ParseError(format!("ObjStm header expected integer, found {other:?}"))),
            };
            let rel = match header_lexer.next_token()? {
                crate::lexer::Token::Integer(v) => v as usize,
                other => return Err(Error::ParseError(format!("ObjStm header expected integer, found {other:?}"))),
            };
            offsets.push((num, rel));
        }
        // parse every sub-object in one pass, amortizing the decode
        // (§4.4 step "parse every sub-object ... and cache them all").
        let mut found = None;
        for (i, (num, rel)) in offsets.iter().enumerate() {
            let mut resolver = crate::parser::NoResolve;
            let mut parser = ObjectParser::new(&decoded, first + rel, &mut resolver);
            let obj = parser.parse_object()?;
            self.cache.borrow_mut().insert(*num, obj.clone());
            if i as u32 == index {
                found = Some(obj);
            }
        }
        found.ok_or_else(|| Error::MissingObject(stream_number, 0))
    }

    /// Returns a stream's decoded (filter-applied) bytes.
    pub fn decode_stream_data(&self, stream: &crate::object::Stream) -> Result<Vec<u8>> {
        decode_stream(&stream.dict, &stream.raw_data, self.registry.as_ref())
    }

    pub fn catalog(&self) -> Result<Dictionary> {
        let root = self
            .xref
            .trailer
            .get("Root")
            .ok_or_else(|| Error::ParseError("trailer has no /Root".into()))?;
        self.resolve(root)?
            .as_dict()
            .cloned()
            .ok_or_else(|| Error::TypeMismatch { expected: "dictionary", found: "other" })
    }

    /// Walks `/Pages` depth-first, returning every `/Page` leaf with
    /// `/Resources`/`/MediaBox`/`/CropBox`/`/Rotate` inherited from
    /// ancestor `/Pages` nodes where the leaf doesn't override them.
    pub fn pages(&self) -> Result<Vec<Page>> {
        let catalog = self.catalog()?;
        let pages_ref = catalog
            .get("Pages")
            .ok_or_else(|| Error::ParseError("catalog has no /Pages".into()))?;
        let root = self.resolve(pages_ref)?.as_dict().cloned().unwrap_or_default();
        let mut out = Vec::new();
        let mut visited = std::collections::HashSet::new();
        self.walk_pages(&root, &Inherited::default(), &mut out, &mut visited, 0)?;
        Ok(out)
    }

    fn walk_pages(
        &self,
        node: &Dictionary,
        inherited: &Inherited,
        out: &mut Vec<Page>,
        visited: &mut std::collections::HashSet<u32>,
        depth: usize,
    ) -> Result<()> {
        if depth > 256 {
            return Err(Error::LimitExceeded("page tree depth"));
        }
        let mut next = inherited.clone();
        if node.get("Resources").is_some() {
            next.resources = Some(crate::resources::resolve_resources(self, node));
        }
        if let Some(mb) = node.get_array("MediaBox") {
            next.media_box = Some(rect_from_array(mb));
        }
        if let Some(cb) = node.get_array("CropBox") {
            next.crop_box = Some(rect_from_array(cb));
        }
        if let Some(rot) = node.get_i64("Rotate") {
            next.rotate = rot;
        }

        if node.is_type("Page") || (!node.is_type("Pages") && node.get("Kids").is_none()) {
            out.push(Page {
                dict: node.clone(),
                resources: next.resources.clone().unwrap_or_default(),
                media_box: next.media_box.unwrap_or(DEFAULT_MEDIA_BOX),
                crop_box: next.crop_box.or(next.media_box).unwrap_or(DEFAULT_MEDIA_BOX),
                rotate: ((next.rotate % 360) + 360) % 360,
            });
            return Ok(());
        }

        if let Some(kids) = node.get_array("Kids") {
            for kid in kids {
                if let Object::Reference(r) = kid {
                    if !visited.insert(r.number) {
                        continue; // cyclic page tree; skip rather than loop forever
                    }
                }
                let Ok(resolved) = self.resolve(kid) else { continue };
                let Some(dict) = resolved.as_dict() else { continue };
                self.walk_pages(dict, &next, out, visited, depth + 1)?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
struct Inherited {
    resources: Option<Dictionary>,
    media_box: Option<Rect>,
    crop_box: Option<Rect>,
    rotate: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl Rect {
    pub fn width(&self) -> f32 {
        (self.urx - self.llx).abs()
    }
    pub fn height(&self) -> f32 {
        (self.ury - self.lly).abs()
    }
}

const DEFAULT_MEDIA_BOX: Rect = Rect { llx: 0.0, lly: 0.0, urx: 612.0, ury: 792.0 };

fn rect_from_array(arr: &[Object]) -> Rect {
    let v: Vec<f32> = arr.iter().filter_map(Object::as_f32).collect();
    if v.len() == 4 {
        Rect { llx: v[0].min(v[2]), lly: v[1].min(v[3]), urx: v[0].max(v[2]), ury: v[1].max(v[3]) }
    } else {
        DEFAULT_MEDIA_BOX
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    pub dict: Dictionary,
    pub resources: Dictionary,
    pub media_box: Rect,
    pub crop_box: Rect,
    pub rotate: i64,
}

/// Recursively decrypts every string in `obj` and, if it's a stream,
/// the stream payload too, keyed by `(number, generation)` — except the
/// xref stream itself and the `/ID` trailer entry, which callers never
/// route through here (the xref stream is parsed before a
/// `SecurityHandler` exists, and `/ID` lives in the trailer dict, never
/// loaded as an indirect object).
fn decrypt_recursive(obj: Object, num: u32, gen: u16, security: &SecurityHandler) -> Result<Object> {
    Ok(match obj {
        Object::String(s) => Object::String(security.decrypt_string(num, gen, &s)?),
        Object::Array(items) => Object::Array(
            items.into_iter().map(|o| decrypt_recursive(o, num, gen, security)).collect::<Result<_>>()?,
        ),
        Object::Dictionary(dict) => Object::Dictionary(decrypt_dict(dict, num, gen, security)?),
        Object::Stream(stream) => {
            let is_xref_stream = stream.dict.get_str("Type") == Some("XRef");
            let dict = decrypt_dict(stream.dict, num, gen, security)?;
            let raw_data = if is_xref_stream {
                stream.raw_data
            } else {
                security.decrypt_stream(num, gen, &stream.raw_data)?
            };
            Object::Stream(crate::object::Stream { dict, raw_data })
        }
        other => other,
    })
}

fn decrypt_dict(dict: Dictionary, num: u32, gen: u16, security: &SecurityHandler) -> Result<Dictionary> {
    let mut out = Dictionary::new();
    for (k, v) in dict {
        out.insert(k, decrypt_recursive(v, num, gen, security)?);
    }
    Ok(out)
}
