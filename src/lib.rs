//! textdom - Lazy XML syntax tree over a live token stream
//!
//! Layers:
//! - buffer: editable text with scoped reads and atomic edits
//! - core: lexical tokenizer and entity codec
//! - dom: rematerialized-on-demand elements, tag pairing, attributes
//!
//! There is no stored tree. A [`SyntaxElement`] remembers only the
//! (offset, len) it was derived at and re-scans the token stream whenever
//! the advisory caches cannot answer; two handles are the same node iff
//! their offsets are equal. The model is read-only except for attribute
//! value replacement.
//!
//! ```
//! use textdom::XmlSource;
//!
//! let src = XmlSource::new("<greeting lang=\"en\">hello</greeting>");
//! let tag = src.first_element().unwrap();
//! assert_eq!(tag.name(), Some("greeting"));
//! assert_eq!(tag.next().unwrap().value().as_deref(), Some("hello"));
//!
//! let mut lang = tag.attribute("lang").unwrap();
//! lang.set_value("fr").unwrap();
//! assert_eq!(src.text(), "<greeting lang=\"fr\">hello</greeting>");
//! ```

pub mod buffer;
pub mod core;
pub mod dom;
mod error;

pub use buffer::{EditScope, TextBuffer};
pub use self::core::{Token, TokenCursor, TokenKind};
pub use dom::{Attr, Attributes, ElementKind, SyntaxElement, XmlSource};
pub use error::DomError;
