//! Lexical layer
//!
//! The building blocks the lazy tree is rematerialized from:
//! - Token: typed (offset, len) lexical units
//! - Tokenizer: lenient pull lexer over the buffer text
//! - Entities: entity decoding with Cow (zero-copy when possible)

pub mod entities;
pub mod token;
pub mod tokenizer;

pub use token::{Token, TokenKind};
pub use tokenizer::TokenCursor;
