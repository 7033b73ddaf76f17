//! Editor-style XML tokenizer
//!
//! A pull lexer over the buffer text that yields [`Token`]s with their
//! lexical class and (offset, len) address. The lexer is lenient: it never
//! fails, it emits `Error` tokens for unparseable spans and keeps going.
//!
//! Two artifacts of the lexical classes matter to the tree layer:
//! - entity references inside text *and* inside quoted attribute values are
//!   emitted as separate `Character` tokens, so a value like `"a&amp;b"`
//!   lexes as `Value("a`, `Character(&amp;)`, `Value(b")` — and a value that
//!   starts with a reference produces a lone-quote `Value` token;
//! - an unterminated value (`"x` at end of a tag) lexes as a `Value` chunk
//!   with no closing quote.

use super::token::{Token, TokenKind};
use memchr::{memchr2, memchr3, memmem};

/// Lexer state between tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Between tags (text content, markup starts)
    Content,
    /// Inside a tag's opening markup, after `<name` / `</name`
    InTag,
    /// Inside a quoted attribute value, after a `Character` split;
    /// carries the opening quote byte
    InValue(u8),
}

/// Forward-only token cursor over the buffer text.
///
/// Always starts lexing at offset 0 so the state is well defined; use
/// [`TokenCursor::seek`] to position it at the token covering an offset.
pub struct TokenCursor<'a> {
    input: &'a str,
    pos: usize,
    state: State,
    peeked: Option<Token>,
}

impl<'a> TokenCursor<'a> {
    /// Create a cursor at the start of the input
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            state: State::Content,
            peeked: None,
        }
    }

    /// The underlying input text
    #[inline]
    pub fn input(&self) -> &'a str {
        self.input
    }

    /// Slice a token's text out of the input
    #[inline]
    pub fn text(&self, tok: Token) -> &'a str {
        tok.text(self.input)
    }

    /// Advance until the token covering `offset`, leaving it as the next
    /// token to be returned. Returns `None` when `offset` is past the end.
    pub fn seek(&mut self, offset: usize) -> Option<Token> {
        loop {
            let tok = self.peek()?;
            if tok.end() > offset {
                return Some(tok);
            }
            self.next_token();
        }
    }

    /// Look at the next token without consuming it
    pub fn peek(&mut self) -> Option<Token> {
        if self.peeked.is_none() {
            self.peeked = self.lex();
        }
        self.peeked
    }

    /// Get the next token, or `None` at end of input
    pub fn next_token(&mut self) -> Option<Token> {
        if let Some(tok) = self.peeked.take() {
            return Some(tok);
        }
        self.lex()
    }

    // ------------------------------------------------------------------
    // Lexing
    // ------------------------------------------------------------------

    fn lex(&mut self) -> Option<Token> {
        loop {
            let bytes = self.input.as_bytes();
            if self.pos >= bytes.len() {
                return None;
            }
            match self.state {
                State::Content => return Some(self.lex_content()),
                State::InTag => match self.lex_in_tag() {
                    Some(tok) => return Some(tok),
                    // '<' inside a tag: switch to content and re-dispatch
                    None => continue,
                },
                State::InValue(quote) => return Some(self.lex_in_value(quote)),
            }
        }
    }

    fn lex_content(&mut self) -> Token {
        let bytes = self.input.as_bytes();
        let p = self.pos;
        match bytes[p] {
            b'<' => self.lex_markup_start(),
            b'&' => self.lex_reference(),
            _ => {
                // Text runs until the next markup or reference start
                let end = memchr2(b'<', b'&', &bytes[p..])
                    .map(|i| p + i)
                    .unwrap_or(bytes.len());
                self.token(TokenKind::Text, p, end)
            }
        }
    }

    fn lex_markup_start(&mut self) -> Token {
        let bytes = self.input.as_bytes();
        let p = self.pos;
        let rest = &bytes[p..];

        if rest.starts_with(b"<!--") {
            let end = memmem::find(&bytes[p + 4..], b"-->")
                .map(|i| p + 4 + i + 3)
                .unwrap_or(bytes.len());
            return self.token(TokenKind::Comment, p, end);
        }
        if rest.starts_with(b"<![CDATA[") {
            let end = memmem::find(&bytes[p + 9..], b"]]>")
                .map(|i| p + 9 + i + 3)
                .unwrap_or(bytes.len());
            return self.token(TokenKind::Cdata, p, end);
        }
        if rest.starts_with(b"<!") {
            return self.lex_declaration();
        }
        if rest.starts_with(b"<?") {
            let end = memmem::find(&bytes[p + 2..], b"?>")
                .map(|i| p + 2 + i + 2)
                .unwrap_or(bytes.len());
            return self.token(TokenKind::Pi, p, end);
        }

        // `</name` or `<name`
        let name_start = if rest.starts_with(b"</") { p + 2 } else { p + 1 };
        if name_start < bytes.len() && is_name_start(bytes[name_start]) {
            let mut j = name_start;
            while j < bytes.len() && is_name_char(bytes[j]) {
                j += 1;
            }
            self.state = State::InTag;
            return self.token(TokenKind::Tag, p, j);
        }

        // Stray '<'
        self.token(TokenKind::Error, p, p + 1)
    }

    /// `<!DOCTYPE ...>` with a possible `[...]` internal subset
    fn lex_declaration(&mut self) -> Token {
        let bytes = self.input.as_bytes();
        let p = self.pos;
        let mut depth = 0usize;
        let mut j = p + 2;
        while j < bytes.len() {
            match bytes[j] {
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => return self.token(TokenKind::Declaration, p, j + 1),
                _ => {}
            }
            j += 1;
        }
        self.token(TokenKind::Declaration, p, bytes.len())
    }

    /// `&name;` / `&#nn;` — an `Error` token for a bare ampersand
    fn lex_reference(&mut self) -> Token {
        let bytes = self.input.as_bytes();
        let p = self.pos;
        let mut j = p + 1;
        while j < bytes.len() && (is_name_char(bytes[j]) || bytes[j] == b'#') {
            j += 1;
        }
        if j > p + 1 && j < bytes.len() && bytes[j] == b';' {
            self.token(TokenKind::Character, p, j + 1)
        } else {
            self.token(TokenKind::Error, p, p + 1)
        }
    }

    /// Returns `None` when a '<' is hit, after switching back to content
    /// state, so an unclosed tag does not swallow the following markup.
    fn lex_in_tag(&mut self) -> Option<Token> {
        let bytes = self.input.as_bytes();
        let p = self.pos;
        match bytes[p] {
            b'<' => {
                self.state = State::Content;
                None
            }
            b'>' => {
                self.state = State::Content;
                Some(self.token(TokenKind::Tag, p, p + 1))
            }
            b'/' if p + 1 < bytes.len() && bytes[p + 1] == b'>' => {
                self.state = State::Content;
                Some(self.token(TokenKind::Tag, p, p + 2))
            }
            b'/' => Some(self.token(TokenKind::Error, p, p + 1)),
            b'=' => Some(self.token(TokenKind::Operator, p, p + 1)),
            b'"' | b'\'' => Some(self.lex_value_chunk(p, bytes[p], true)),
            b if is_ws(b) => {
                let mut j = p;
                while j < bytes.len() && is_ws(bytes[j]) {
                    j += 1;
                }
                Some(self.token(TokenKind::Ws, p, j))
            }
            b if is_name_start(b) => {
                let mut j = p;
                while j < bytes.len() && is_name_char(bytes[j]) {
                    j += 1;
                }
                Some(self.token(TokenKind::Argument, p, j))
            }
            _ => {
                // Junk inside a tag: one error run up to the next thing we
                // can make sense of
                let mut j = p + 1;
                while j < bytes.len()
                    && !is_ws(bytes[j])
                    && !matches!(bytes[j], b'<' | b'>' | b'=' | b'"' | b'\'' | b'&' | b'/')
                    && !is_name_start(bytes[j])
                {
                    j += 1;
                }
                Some(self.token(TokenKind::Error, p, j))
            }
        }
    }

    fn lex_in_value(&mut self, quote: u8) -> Token {
        let bytes = self.input.as_bytes();
        let p = self.pos;
        if bytes[p] == b'&' {
            return self.lex_reference();
        }
        self.lex_value_chunk(p, quote, false)
    }

    /// A `Value` chunk starting at `p`. When `opening` is set, `p` is the
    /// opening quote itself. The chunk ends at the closing quote
    /// (inclusive), at a reference start, at a '<', or at end of input.
    fn lex_value_chunk(&mut self, p: usize, quote: u8, opening: bool) -> Token {
        let bytes = self.input.as_bytes();
        let scan_from = if opening { p + 1 } else { p };
        match memchr3(quote, b'&', b'<', &bytes[scan_from..]).map(|i| scan_from + i) {
            Some(j) if bytes[j] == quote => {
                self.state = State::InTag;
                self.token(TokenKind::Value, p, j + 1)
            }
            Some(j) if bytes[j] == b'&' => {
                self.state = State::InValue(quote);
                self.token(TokenKind::Value, p, j)
            }
            Some(j) => {
                // '<' — the value is unterminated, let the markup lex next
                self.state = State::Content;
                self.token(TokenKind::Value, p, j)
            }
            None => {
                self.state = State::InTag;
                self.token(TokenKind::Value, p, bytes.len())
            }
        }
    }

    #[inline]
    fn token(&mut self, kind: TokenKind, start: usize, end: usize) -> Token {
        self.pos = end;
        Token::new(kind, start, end - start)
    }
}

#[inline]
fn is_ws(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Valid XML NameStartChar (ASCII fast path, non-ASCII accepted)
#[inline]
fn is_name_start(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

/// Valid in an XML name
#[inline]
fn is_name_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}
