//! Error types shared by every layer of the parser and interpreter.

use std::fmt;

/// The single error type returned by this crate.
///
/// Variants are grouped roughly by the layer that raises them (lexer,
/// object parser, xref, crypto, interpreter) but all flow through one
/// enum so callers don't need to match on nested error types.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// The byte stream doesn't start with `%PDF-1.x` (or `%PDF-2.0`).
    InvalidHeader,
    /// A lexer-level problem: malformed number, unterminated string, etc.
    LexError(String),
    /// A parser-level problem: unexpected token, malformed dictionary, etc.
    ParseError(String),
    /// The xref table/stream chain is broken beyond recovery (no
    /// `startxref`, cyclic `/Prev`, or a section that fails to parse).
    CorruptXref(String),
    /// An indirect reference points at an object number not present in
    /// the xref table.
    MissingObject(u32, u16),
    /// An object was expected to be one PDF type but was another.
    TypeMismatch { expected: &'static str, found: &'static str },
    /// `/Filter` names a filter this `FilterRegistry` has no decoder for.
    UnsupportedFilter(String),
    /// `/Encrypt` names a security handler or algorithm we don't implement.
    UnsupportedEncryption(String),
    /// Password (owner or user) did not validate against `/Encrypt`.
    AuthFailure,
    /// A configured `Limits` bound was exceeded (recursion depth, stack
    /// depth, chain length, sub-object count).
    LimitExceeded(&'static str),
    /// A registered external decoder (DCT/CCITT/JPX) returned an error.
    DecoderError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::InvalidHeader => write!(f, "not a PDF file: missing %PDF- header"),
            Error::LexError(msg) => write!(f, "lex error: {msg}"),
            Error::ParseError(msg) => write!(f, "parse error: {msg}"),
            Error::CorruptXref(msg) => write!(f, "corrupt cross-reference table: {msg}"),
            Error::MissingObject(num, gen) => {
                write!(f, "object {num} {gen} R not found in cross-reference table")
            }
            Error::TypeMismatch { expected, found } => {
                write!(f, "expected a {expected} object, found {found}")
            }
            Error::UnsupportedFilter(name) => write!(f, "unsupported filter: {name}"),
            Error::UnsupportedEncryption(msg) => write!(f, "unsupported encryption: {msg}"),
            Error::AuthFailure => write!(f, "password did not validate against /Encrypt"),
            Error::LimitExceeded(which) => write!(f, "limit exceeded: {which}"),
            Error::DecoderError(msg) => write!(f, "decoder error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($src:ty, $variant:ident) => {
        impl From<$src> for Error {
            fn from(e: $src) -> Error {
                Error::$variant(e)
            }
        }
    };
}

impl_from!(std::io::Error, Io);

impl From<std::string::FromUtf8Error> for Error {
    fn from(e: std::string::FromUtf8Error) -> Error {
        Error::ParseError(format!("invalid utf-8: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
