//! # pdf-interp
//!
//! Reads ISO 32000-1/2 PDF files: parses the object graph (xref tables,
//! cross-reference streams, object streams, the standard security
//! handler), decodes the built-in filter pipeline, and interprets page
//! content streams against a pluggable [`render_target::RenderTarget`].
//!
//! A concrete pixel rasterizer is outside this crate's scope — it ships
//! one [`render_target::RenderTarget`] implementation,
//! [`text::TextExtractor`], for reading-order text extraction.
//!
//! ## Getting started
//!
//! ```no_run
//! use pdf_interp::document::Document;
//! use pdf_interp::interpreter::ContentInterpreter;
//! use pdf_interp::text::TextExtractor;
//!
//! let bytes = std::fs::read("example.pdf")?;
//! let doc = Document::load(bytes, b"")?;
//! for page in doc.pages()? {
//!     let mut extractor = TextExtractor::new();
//!     let mut interp = pdf_interp::interpreter::ContentInterpreter::new(
//!         &doc,
//!         page.resources.clone(),
//!         pdf_interp::matrix::Matrix::IDENTITY,
//!     );
//!     for obj in page.dict.get("Contents").into_iter() {
//!         if let Some(stream) = doc.resolve(obj)?.as_stream() {
//!             let content = doc.decode_stream_data(stream)?;
//!             interp.run(&content, &mut extractor)?;
//!         }
//!     }
//!     println!("{}", extractor.into_text());
//! }
//! # Ok::<(), pdf_interp::error::Error>(())
//! ```

#![allow(dead_code)]

#[macro_use]
extern crate log;

pub mod bytes;
pub mod cache;
pub mod cmap;
pub mod color;
pub mod colorspace;
pub mod config;
pub mod content;
pub mod crypt;
pub mod date;
pub mod document;
pub mod error;
pub mod filters;
pub mod font;
pub mod function;
pub mod graphics_state;
pub mod interpreter;
pub mod lexer;
pub mod matrix;
pub mod object;
pub mod parser;
pub mod render_target;
pub mod resources;
pub mod text;
pub mod units;
pub mod xref;

pub use config::{Limits, ParseOptions};
pub use document::Document;
pub use error::{Error, Result};
pub use interpreter::ContentInterpreter;
pub use object::Object;
pub use render_target::RenderTarget;
pub use text::TextExtractor;
