//! Lexical token model
//!
//! Tokens are the editor-style lexical classes the tree layer is built on.
//! A token never owns text: it is an (offset, len) address into the buffer,
//! valid for the buffer version it was produced from.

/// Lexical class of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Tag punctuation and name: `<name`, `</name`, `>`, `/>`
    Tag,
    /// Attribute name inside a tag
    Argument,
    /// The `=` between an attribute name and its value
    Operator,
    /// A chunk of a quoted attribute value (quotes included in the chunk
    /// that carries them; a lone quote can be a one-character chunk)
    Value,
    /// Text content between tags
    Text,
    /// Whitespace inside a tag
    Ws,
    /// Entity or character reference: `&name;`, `&#10;`
    Character,
    /// Comment: `<!--` through `-->`
    Comment,
    /// CDATA section: `<![CDATA[` through `]]>`
    Cdata,
    /// Processing instruction: `<?` through `?>`
    Pi,
    /// `<!DOCTYPE ...>` and other `<!` declarations
    Declaration,
    /// An unparseable span (stray `<`, bare `&`, junk inside a tag)
    Error,
}

/// A lexical token: kind plus an (offset, len) address into the buffer.
///
/// Copyable by design so it can be cached cheaply; the text is re-sliced
/// from the buffer on use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset into the buffer
    pub offset: usize,
    /// Length in bytes
    pub len: usize,
}

impl Token {
    /// Create a new token
    #[inline]
    pub const fn new(kind: TokenKind, offset: usize, len: usize) -> Self {
        Self { kind, offset, len }
    }

    /// End offset (exclusive)
    #[inline]
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Check whether the token's span covers the given offset
    #[inline]
    pub const fn covers(&self, offset: usize) -> bool {
        self.offset <= offset && offset < self.end()
    }

    /// Slice the token's text out of the buffer content.
    ///
    /// Returns an empty string if the span no longer fits the buffer,
    /// which happens when the token outlived an edit.
    #[inline]
    pub fn text<'a>(&self, input: &'a str) -> &'a str {
        input.get(self.offset..self.end()).unwrap_or("")
    }

    /// True for the tag tokens that close a tag's opening markup.
    #[inline]
    pub fn closes_tag(&self, input: &str) -> bool {
        self.kind == TokenKind::Tag && matches!(self.text(input), ">" | "/>")
    }
}
