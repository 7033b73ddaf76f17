//! Attribute materializer and the one supported mutation
//!
//! A tag's attribute list is parsed lazily from its first token on every
//! call — nothing is incrementally maintained. Attribute keys are
//! case-sensitive byte-for-byte (XML 1.0 names); the map preserves
//! document order.
//!
//! The parse is tolerant of two lexer artifacts: whitespace/error tokens
//! interleaved anywhere in the opening markup, and a quoted value split
//! around `Character` tokens so that a lone `"` / `'` is a one-character
//! `Value` chunk to be absorbed, not an attribute boundary.
//!
//! Attribute value replacement is the only write path: the old value's
//! span is replaced inside one atomic edit, an unterminated value gets
//! closed with its opening quote on the way, and the Attr re-resolves its
//! anchor at the (possibly shifted) original offset afterwards.

use super::node::{resolve_covering, SyntaxElement};
use super::ElementKind;
use crate::core::entities::{decode_text, encode_text};
use crate::core::{TokenCursor, TokenKind};
use crate::error::DomError;
use indexmap::IndexMap;
use log::debug;

/// One attribute of a tag, addressed by `(owner, index)`.
///
/// Attrs are not part of the sibling chain; their only parent link is the
/// owning tag.
#[derive(Debug, Clone)]
pub struct Attr {
    owner: SyntaxElement,
    index: usize,
    name: String,
    name_offset: usize,
    /// (offset, len) of the raw value span, quotes included; `None` for a
    /// valueless attribute
    value_span: Option<(usize, usize)>,
}

/// Document-ordered attribute map of a tag.
pub struct Attributes {
    items: IndexMap<String, Attr>,
}

impl Attributes {
    fn empty() -> Self {
        Self {
            items: IndexMap::new(),
        }
    }

    /// Exact-name lookup (case-sensitive)
    pub fn get(&self, name: &str) -> Option<&Attr> {
        self.items.get(name)
    }

    /// Attributes in document order
    pub fn iter(&self) -> impl Iterator<Item = &Attr> {
        self.items.values()
    }

    /// Attribute names in document order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl SyntaxElement {
    /// Parse this tag's attribute list from its first token.
    ///
    /// Computed fresh on each call; an end tag or a non-tag element has no
    /// attributes. On a duplicated name the first occurrence wins.
    pub fn attributes(&self) -> Attributes {
        if !matches!(
            self.kind(),
            ElementKind::StartTag | ElementKind::EmptyTag
        ) {
            return Attributes::empty();
        }
        let raw = self
            .data
            .doc
            .buffer
            .with_token_sequence(self.offset(), |cursor| parse_raw(cursor))
            .unwrap_or_default();
        let mut items = IndexMap::new();
        for (index, r) in raw.into_iter().enumerate() {
            items.entry(r.name.clone()).or_insert(Attr {
                owner: self.clone(),
                index,
                name: r.name,
                name_offset: r.name_offset,
                value_span: r.value_span,
            });
        }
        Attributes { items }
    }

    /// Shorthand for a single attribute lookup
    pub fn attribute(&self, name: &str) -> Option<Attr> {
        self.attributes().get(name).cloned()
    }
}

impl Attr {
    /// Attribute name as written in the markup
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the tag's attribute list
    pub fn index(&self) -> usize {
        self.index
    }

    /// Byte offset of the attribute name in the buffer, at derivation time
    pub fn name_offset(&self) -> usize {
        self.name_offset
    }

    /// The owning tag
    pub fn owner(&self) -> &SyntaxElement {
        &self.owner
    }

    /// The decoded attribute value: value chunks concatenated, known
    /// entity references decoded, one pair of surrounding quotes stripped.
    /// For an unterminated value the opening quote is stripped and the
    /// rest returned as far as tokenization got. `None` for a valueless
    /// attribute or when the span no longer fits the buffer.
    pub fn value(&self) -> Option<String> {
        let (offset, len) = self.value_span?;
        self.owner.data.doc.buffer.with_read(|text, _| {
            let raw = text.get(offset..offset + len)?;
            Some(unquote(&decode_text(raw)).to_string())
        })
    }

    /// Replace the attribute's value in the buffer.
    ///
    /// The whole replacement happens inside one atomic edit scope. An
    /// unterminated value is closed with its opening quote character; a
    /// terminated one keeps its shape. Fails with
    /// [`DomError::PositionUnavailable`] when the owning tag or the
    /// attribute can no longer be located, and with [`DomError::ReadOnly`]
    /// for a valueless attribute (that would be attribute addition).
    pub fn set_value(&mut self, new_value: &str) -> Result<(), DomError> {
        let doc = self.owner.data.doc.clone();
        let owner_offset = self.owner.offset();
        let name = self.name.clone();

        let new_span = doc.buffer.run_atomic_edit(|edit| {
            // Relocate the value span against the text this edit sees;
            // the stored span may predate another edit.
            let text = edit.as_str().to_string();
            let mut cursor = TokenCursor::new(&text);
            if cursor.seek(owner_offset).is_none() {
                return Err(DomError::PositionUnavailable {
                    offset: owner_offset,
                });
            }
            let current = parse_raw(&mut cursor)
                .into_iter()
                .find(|r| r.name == name)
                .ok_or(DomError::PositionUnavailable {
                    offset: owner_offset,
                })?;
            let (offset, len) = current
                .value_span
                .ok_or(DomError::read_only("attribute value addition"))?;

            let raw = &text[offset..offset + len];
            let quote = raw.chars().next().filter(|&c| matches!(c, '"' | '\''));
            let encoded = encode_text(new_value);
            let replacement = match quote {
                Some(q) => {
                    if raw.len() < 2 || !raw.ends_with(q) {
                        debug!("closing unterminated value of {name} at offset {offset}");
                    }
                    format!("{q}{encoded}{q}")
                }
                None => encoded.into_owned(),
            };
            edit.remove(offset, len)?;
            edit.insert(offset, &replacement)?;
            Ok((current.name_offset, offset, replacement.len()))
        })?;

        // Re-synchronize against the edited buffer
        let (name_offset, offset, len) = new_span;
        self.name_offset = name_offset;
        self.value_span = Some((offset, len));
        if let Some(node) = resolve_covering(&doc, owner_offset) {
            self.owner = SyntaxElement::from_data(node);
            let _ = self.owner.anchor_token();
        }
        Ok(())
    }

    /// Unsupported; fails with [`DomError::ReadOnly`].
    pub fn remove(&self) -> Result<(), DomError> {
        Err(DomError::read_only("attribute removal"))
    }
}

/// A parsed attribute before it is bound to an owner handle
#[derive(Debug, Default)]
struct RawAttr {
    name: String,
    name_offset: usize,
    value_span: Option<(usize, usize)>,
}

/// Scan a tag's opening markup for attributes, starting at its `<name`
/// token. Stops at the first token that cannot continue the attribute
/// list — any tag token, or content the lexer fell back to.
fn parse_raw(cursor: &mut TokenCursor<'_>) -> Vec<RawAttr> {
    let mut attrs: Vec<RawAttr> = Vec::new();
    let input = cursor.input();

    let Some(first) = cursor.next_token() else {
        return attrs;
    };
    if first.kind != TokenKind::Tag || !first.text(input).starts_with('<') {
        return attrs;
    }

    let mut pending: Option<RawAttr> = None;
    let mut seen_eq = false;

    while let Some(tok) = cursor.peek() {
        match tok.kind {
            // Robustly skipped wherever they appear
            TokenKind::Ws | TokenKind::Comment | TokenKind::Error => {}
            TokenKind::Argument => {
                if let Some(done) = pending.take() {
                    attrs.push(done);
                }
                pending = Some(RawAttr {
                    name: tok.text(input).to_string(),
                    name_offset: tok.offset,
                    value_span: None,
                });
                seen_eq = false;
            }
            TokenKind::Operator => {
                if pending.is_some() {
                    seen_eq = true;
                }
            }
            TokenKind::Value | TokenKind::Character => {
                match pending.as_mut() {
                    Some(attr) if seen_eq => match attr.value_span {
                        None => attr.value_span = Some((tok.offset, tok.len)),
                        // Chunks of one value are contiguous; anything
                        // else is a stray token
                        Some((start, len)) if start + len == tok.offset => {
                            attr.value_span = Some((start, len + tok.len));
                        }
                        Some(_) => {}
                    },
                    // A value with no attribute name; nothing to bind to
                    _ => {}
                }
            }
            // End of the tag's opening markup
            _ => break,
        }
        cursor.next_token();
    }

    if let Some(done) = pending.take() {
        attrs.push(done);
    }
    attrs
}

/// Strip one matching pair of surrounding quotes; an unpaired leading
/// quote is stripped alone.
fn unquote(value: &str) -> &str {
    let mut chars = value.chars();
    match chars.next() {
        Some(q @ ('"' | '\'')) => {
            let rest = &value[1..];
            if rest.ends_with(q) {
                &rest[..rest.len() - 1]
            } else {
                rest
            }
        }
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::super::node::XmlSource;
    use super::*;
    use pretty_assertions::assert_eq;

    fn tag(src: &XmlSource) -> SyntaxElement {
        src.first_element().unwrap()
    }

    #[test]
    fn test_attribute_round_trip() {
        let src = XmlSource::new("<div class=\"x\" id='y'>");
        let attrs = tag(&src).attributes();
        let pairs: Vec<_> = attrs
            .iter()
            .map(|a| (a.name().to_string(), a.value().unwrap()))
            .collect();
        assert_eq!(
            pairs,
            vec![("class".into(), "x".to_string()), ("id".into(), "y".to_string())]
        );
        assert_eq!(attrs.get("class").unwrap().index(), 0);
        assert_eq!(attrs.get("id").unwrap().index(), 1);
    }

    #[test]
    fn test_set_value_preserves_surrounding_markup() {
        let src = XmlSource::new("<div class=\"x\" id='y'>body</div>");
        let mut class = tag(&src).attribute("class").unwrap();
        class.set_value("z").unwrap();
        assert_eq!(src.text(), "<div class=\"z\" id='y'>body</div>");
        // Re-parse reflects the edit, order unchanged
        let attrs = src.first_element().unwrap().attributes();
        assert_eq!(attrs.get("class").unwrap().value().as_deref(), Some("z"));
        assert_eq!(attrs.get("id").unwrap().value().as_deref(), Some("y"));
    }

    #[test]
    fn test_set_value_closes_unterminated() {
        let src = XmlSource::new("<div class=\"x");
        let mut class = tag(&src).attribute("class").unwrap();
        assert_eq!(class.value().as_deref(), Some("x"));
        class.set_value("w").unwrap();
        assert_eq!(src.text(), "<div class=\"w\"");
    }

    #[test]
    fn test_set_value_already_closed_stays_closed() {
        let src = XmlSource::new("<div class=\"x\"/>");
        let mut class = tag(&src).attribute("class").unwrap();
        class.set_value("w").unwrap();
        assert_eq!(src.text(), "<div class=\"w\"/>");
    }

    #[test]
    fn test_value_with_entities_and_split_tokens() {
        let src = XmlSource::new("<a title=\"&lt;hi&gt;\">");
        let title = tag(&src).attribute("title").unwrap();
        assert_eq!(title.value().as_deref(), Some("<hi>"));
    }

    #[test]
    fn test_lone_quote_chunk_absorbed() {
        // The value lexes as `"`, `&x;`, `"` — three chunks, one attribute
        let src = XmlSource::new("<a t=\"&x;\" u=\"v\">");
        let attrs = tag(&src).attributes();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get("t").unwrap().value().as_deref(), Some("&x;"));
        assert_eq!(attrs.get("u").unwrap().value().as_deref(), Some("v"));
    }

    #[test]
    fn test_whitespace_around_equals() {
        let src = XmlSource::new("<a  b  =  \"c\"  >");
        let b = tag(&src).attribute("b").unwrap();
        assert_eq!(b.value().as_deref(), Some("c"));
    }

    #[test]
    fn test_valueless_attribute() {
        let src = XmlSource::new("<input disabled>");
        let attrs = tag(&src).attributes();
        let disabled = attrs.get("disabled").unwrap();
        assert_eq!(disabled.value(), None);
        let mut disabled = disabled.clone();
        assert!(matches!(
            disabled.set_value("x"),
            Err(DomError::ReadOnly { .. })
        ));
    }

    #[test]
    fn test_case_sensitive_keys() {
        let src = XmlSource::new("<a Name=\"1\" name=\"2\">");
        let attrs = tag(&src).attributes();
        assert_eq!(attrs.get("Name").unwrap().value().as_deref(), Some("1"));
        assert_eq!(attrs.get("name").unwrap().value().as_deref(), Some("2"));
        assert!(attrs.get("NAME").is_none());
    }

    #[test]
    fn test_duplicate_name_first_wins() {
        let src = XmlSource::new("<a x=\"1\" x=\"2\">");
        let attrs = tag(&src).attributes();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.get("x").unwrap().value().as_deref(), Some("1"));
    }

    #[test]
    fn test_end_tag_has_no_attributes() {
        let src = XmlSource::new("<a></a>");
        let end = src.element_at(3).unwrap();
        assert!(end.attributes().is_empty());
    }

    #[test]
    fn test_set_value_on_stale_owner() {
        let src = XmlSource::new("<a b=\"c\"/>");
        let mut b = tag(&src).attribute("b").unwrap();
        // The tag is edited away entirely
        src.buffer()
            .run_atomic_edit(|edit| {
                let n = edit.len();
                edit.remove(0, n)?;
                edit.insert(0, "plain text")
            })
            .unwrap();
        assert!(matches!(
            b.set_value("d"),
            Err(DomError::PositionUnavailable { .. })
        ));
    }

    #[test]
    fn test_owner_links_attr() {
        let src = XmlSource::new("<a b=\"c\"/>");
        let el = tag(&src);
        let b = el.attribute("b").unwrap();
        assert_eq!(*b.owner(), el);
    }

    #[test]
    fn test_attr_remove_is_read_only() {
        let src = XmlSource::new("<a b=\"c\"/>");
        let b = tag(&src).attribute("b").unwrap();
        assert!(matches!(b.remove(), Err(DomError::ReadOnly { .. })));
    }
}
