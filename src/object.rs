//! The PDF value universe: the single tagged union every parsed object —
//! direct or indirect, array element or dictionary entry — is stored as.

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// An indirect object reference, `N G R` in PDF syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reference {
    pub number: u32,
    pub generation: u16,
}

impl Reference {
    pub fn new(number: u32, generation: u16) -> Reference {
        Reference { number, generation }
    }
}

/// A PDF name object, e.g. `/Type`. Stored unescaped (the lexer resolves
/// `#hh` sequences) and compared byte-exact — PDF names are
/// case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(pub Box<str>);

impl Name {
    pub fn new(s: impl Into<Box<str>>) -> Name {
        Name(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Name {
        Name(s.into())
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}", self.0)
    }
}

pub type Dictionary = IndexMap<Name, Object>;

/// The contents of a stream object: its dictionary plus the *raw*
/// (still-encoded) bytes between `stream` and `endstream`. Decoding
/// happens on demand through `crate::filters::decode_stream`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    pub raw_data: Vec<u8>,
}

/// One parsed PDF object. Indirect objects resolve to one of these through
/// `crate::xref::XrefTable`/`crate::document::Document`; this type itself
/// only ever holds direct values plus unreduced `Reference`s.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(Vec<u8>),
    Name(Name),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(Reference),
}

impl Object {
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "null",
            Object::Boolean(_) => "boolean",
            Object::Integer(_) => "integer",
            Object::Real(_) => "real",
            Object::String(_) => "string",
            Object::Name(_) => "name",
            Object::Array(_) => "array",
            Object::Dictionary(_) => "dictionary",
            Object::Stream(_) => "stream",
            Object::Reference(_) => "reference",
        }
    }

    pub fn as_reference(&self) -> Option<Reference> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            Object::Real(r) => Some(*r as i64),
            _ => None,
        }
    }

    /// Numeric objects (`Integer` or `Real`) coerced to `f32`, the
    /// precision the graphics pipeline works in.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r as f32),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(n) => Some(n.as_str()),
            _ => None,
        }
    }

    pub fn as_str_bytes(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Object]> {
        match self {
            Object::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Object::Stream(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    pub fn expect_dict(&self) -> Result<&Dictionary> {
        self.as_dict().ok_or_else(|| Error::TypeMismatch {
            expected: "dictionary",
            found: self.type_name(),
        })
    }

    pub fn expect_array(&self) -> Result<&[Object]> {
        self.as_array().ok_or_else(|| Error::TypeMismatch {
            expected: "array",
            found: self.type_name(),
        })
    }
}

/// Convenience accessors on `Dictionary` for the common "get by name,
/// fall back to a default, coerce to a primitive" pattern used all over
/// the object parser and the content interpreter.
pub trait DictionaryExt {
    fn get_name(&self, key: &str) -> Option<&Name>;
    fn get_str(&self, key: &str) -> Option<&str>;
    fn get_i64(&self, key: &str) -> Option<i64>;
    fn get_f32(&self, key: &str) -> Option<f32>;
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn get_array(&self, key: &str) -> Option<&[Object]>;
    fn get_dict(&self, key: &str) -> Option<&Dictionary>;
    fn is_type(&self, expected: &str) -> bool;
}

impl DictionaryExt for Dictionary {
    fn get_name(&self, key: &str) -> Option<&Name> {
        match self.get(key)? {
            Object::Name(n) => Some(n),
            _ => None,
        }
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_name()
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key)?.as_i64()
    }

    fn get_f32(&self, key: &str) -> Option<f32> {
        self.get(key)?.as_f32()
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    fn get_array(&self, key: &str) -> Option<&[Object]> {
        self.get(key)?.as_array()
    }

    fn get_dict(&self, key: &str) -> Option<&Dictionary> {
        self.get(key)?.as_dict()
    }

    fn is_type(&self, expected: &str) -> bool {
        self.get_str("Type") == Some(expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_equality_is_case_sensitive() {
        assert_ne!(Name::new("Type"), Name::new("type"));
    }

    #[test]
    fn dictionary_ext_coerces_numbers() {
        let mut dict = Dictionary::new();
        dict.insert(Name::new("Count"), Object::Integer(3));
        assert_eq!(dict.get_i64("Count"), Some(3));
        assert_eq!(dict.get_f32("Count"), Some(3.0));
    }
}
