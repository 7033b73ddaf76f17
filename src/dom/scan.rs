//! Token-to-element grouping
//!
//! One forward pass over the token stream, folding tokens into element
//! summaries. This is the re-derivation primitive behind every cache miss:
//! "which element covers offset N" is answered by scanning records until
//! one spans N.
//!
//! Elements partition the buffer: a tag element spans from its `<name`
//! token through its closing `>` / `/>` (or as far as lexing got for a
//! truncated tag), every other element is one token or a run of them.

use super::ElementKind;
use crate::core::{Token, TokenCursor, TokenKind};
use log::trace;

/// A scanned element summary: kind, span, and tag/target name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRec {
    pub kind: ElementKind,
    pub offset: usize,
    pub len: usize,
    pub name: Option<String>,
}

impl ElementRec {
    /// End offset (exclusive)
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Folds the token stream into element records.
pub struct ElementScanner<'a> {
    cursor: TokenCursor<'a>,
}

impl<'a> ElementScanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            cursor: TokenCursor::new(input),
        }
    }

    /// Scan forward until the element covering `offset`, or `None` when
    /// the offset lies past the last element.
    pub fn element_covering(&mut self, offset: usize) -> Option<ElementRec> {
        loop {
            let rec = self.next_element()?;
            if rec.end() > offset {
                trace!(
                    "re-derived {:?} at {}..{} for offset {}",
                    rec.kind,
                    rec.offset,
                    rec.end(),
                    offset
                );
                return Some(rec);
            }
        }
    }

    /// The next element record, or `None` at end of input.
    pub fn next_element(&mut self) -> Option<ElementRec> {
        let first = self.cursor.next_token()?;
        let input = self.cursor.input();
        Some(match first.kind {
            TokenKind::Tag => self.assemble_tag(first),
            TokenKind::Text => rec(ElementKind::Text, first, None),
            TokenKind::Character => {
                let name = reference_name(first.text(input));
                rec(ElementKind::EntityRef, first, Some(name))
            }
            TokenKind::Comment => rec(ElementKind::Comment, first, None),
            TokenKind::Cdata => rec(ElementKind::Cdata, first, None),
            TokenKind::Pi => {
                let name = pi_target(first.text(input));
                rec(ElementKind::Pi, first, name)
            }
            TokenKind::Declaration => rec(ElementKind::Declaration, first, None),
            TokenKind::Error => self.assemble_error(first),
            // In-tag classes never lead an element; a stray one is an
            // unparseable span
            TokenKind::Argument
            | TokenKind::Operator
            | TokenKind::Value
            | TokenKind::Ws => self.assemble_error(first),
        })
    }

    /// `<name ...>` / `</name ...>` through the closing `>` or `/>`, or as
    /// far as the in-tag tokens go when the tag is cut short.
    fn assemble_tag(&mut self, first: Token) -> ElementRec {
        let input = self.cursor.input();
        let text = first.text(input);
        let closing = text.starts_with("</");
        let name = text.trim_start_matches(['<', '/']).to_string();
        let mut end = first.end();
        let mut kind = if closing {
            ElementKind::EndTag
        } else {
            ElementKind::StartTag
        };

        while let Some(tok) = self.cursor.peek() {
            match tok.kind {
                TokenKind::Tag if tok.closes_tag(input) => {
                    self.cursor.next_token();
                    if !closing && tok.text(input) == "/>" {
                        kind = ElementKind::EmptyTag;
                    }
                    end = tok.end();
                    break;
                }
                // A fresh `<...` means this tag was never closed
                TokenKind::Tag => break,
                TokenKind::Ws
                | TokenKind::Argument
                | TokenKind::Operator
                | TokenKind::Value
                | TokenKind::Character
                | TokenKind::Error => {
                    self.cursor.next_token();
                    end = tok.end();
                }
                // Anything else: lexing already fell back to content
                _ => break,
            }
        }

        ElementRec {
            kind,
            offset: first.offset,
            len: end - first.offset,
            name: Some(name),
        }
    }

    /// Merge a run of error tokens into one sentinel span
    fn assemble_error(&mut self, first: Token) -> ElementRec {
        let mut end = first.end();
        while let Some(tok) = self.cursor.peek() {
            if tok.kind != TokenKind::Error || tok.offset != end {
                break;
            }
            self.cursor.next_token();
            end = tok.end();
        }
        ElementRec {
            kind: ElementKind::Error,
            offset: first.offset,
            len: end - first.offset,
            name: None,
        }
    }
}

fn rec(kind: ElementKind, tok: Token, name: Option<String>) -> ElementRec {
    ElementRec {
        kind,
        offset: tok.offset,
        len: tok.len,
        name,
    }
}

/// `&name;` / `&#nn;` -> `name` / `#nn`
fn reference_name(text: &str) -> String {
    text.trim_start_matches('&').trim_end_matches(';').to_string()
}

/// `<?target rest?>` -> `target`
fn pi_target(text: &str) -> Option<String> {
    let body = text.strip_prefix("<?")?;
    let target: String = body
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '?')
        .collect();
    if target.is_empty() {
        None
    } else {
        Some(target)
    }
}
