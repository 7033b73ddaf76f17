//! Syntax Element base
//!
//! A [`SyntaxElement`] is a handle to one rematerialized node. Identity is
//! the (offset, len) address the node was derived at — two handles are the
//! same logical node iff their offsets are equal, regardless of allocation.
//! That is a deliberate third equality law next to reference identity and
//! structural equality, and it is what lets a re-derived node after a cache
//! miss still compare equal to the handle a caller kept.
//!
//! Navigation never escalates a bad position: a stale offset or a failed
//! re-scan yields `None`, because missing across a concurrent edit is an
//! expected state, not a fault.

use super::cache::{LinkCache, NodeCache};
use super::scan::{ElementRec, ElementScanner};
use super::ElementKind;
use crate::buffer::TextBuffer;
use crate::core::entities::decode_entity;
use crate::core::Token;
use parking_lot::Mutex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Everything shared between a document handle and its live nodes.
pub(crate) struct DocShared {
    pub(crate) buffer: TextBuffer,
    pub(crate) cache: NodeCache,
}

/// Handle to a live, editable XML text buffer and its lazy tree.
///
/// The tree has no stored form; [`XmlSource::element_at`] and the
/// navigation methods on [`SyntaxElement`] re-derive nodes from the token
/// stream on demand.
pub struct XmlSource {
    shared: Arc<DocShared>,
}

impl XmlSource {
    /// Create a source over `text`
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(DocShared {
                buffer: TextBuffer::new(text),
                cache: NodeCache::new(),
            }),
        }
    }

    /// The underlying buffer, for host-driven edits
    pub fn buffer(&self) -> &TextBuffer {
        &self.shared.buffer
    }

    /// Snapshot of the current text
    pub fn text(&self) -> String {
        self.shared.buffer.snapshot()
    }

    /// Current edit version of the buffer
    pub fn version(&self) -> u64 {
        self.shared.buffer.version()
    }

    /// The element whose span covers `offset`, or `None` past the end
    pub fn element_at(&self, offset: usize) -> Option<SyntaxElement> {
        resolve_covering(&self.shared, offset).map(SyntaxElement::from_data)
    }

    /// The first element of the document
    pub fn first_element(&self) -> Option<SyntaxElement> {
        self.element_at(0)
    }

    /// Drop the advisory node cache. Navigation results are unaffected;
    /// subsequent lookups re-derive from the token stream.
    pub fn clear_cache(&self) {
        self.shared.cache.clear();
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Arc<DocShared> {
        &self.shared
    }
}

/// One resolved node: its address, kind, name, and advisory links.
pub(crate) struct NodeData {
    pub(crate) doc: Arc<DocShared>,
    pub(crate) offset: usize,
    pub(crate) len: usize,
    pub(crate) kind: ElementKind,
    pub(crate) name: Option<String>,
    pub(crate) links: Mutex<LinkCache>,
}

/// Resolve the element covering `offset`, interning the node so repeated
/// resolution of one offset shares an allocation.
pub(crate) fn resolve_covering(doc: &Arc<DocShared>, offset: usize) -> Option<Arc<NodeData>> {
    doc.buffer.with_read(|text, version| {
        if offset >= text.len() {
            return None;
        }
        // Exact-offset hit covers the common case of re-resolving an
        // element's own start
        if let Some(node) = doc.cache.lookup(offset, version) {
            return Some(node);
        }
        let rec = ElementScanner::new(text).element_covering(offset)?;
        Some(intern(doc, version, rec))
    })
}

fn intern(doc: &Arc<DocShared>, version: u64, rec: ElementRec) -> Arc<NodeData> {
    if let Some(existing) = doc.cache.lookup(rec.offset, version) {
        return existing;
    }
    let node = Arc::new(NodeData {
        doc: Arc::clone(doc),
        offset: rec.offset,
        len: rec.len,
        kind: rec.kind,
        name: rec.name,
        links: Mutex::new(LinkCache::new(version)),
    });
    doc.cache.insert(node.offset, version, &node);
    node
}

/// A node of the lazy tree.
///
/// Cheap to clone; holds the document alive but never holds other nodes
/// strongly — neighbor links are weak and advisory.
#[derive(Clone)]
pub struct SyntaxElement {
    pub(crate) data: Arc<NodeData>,
}

impl SyntaxElement {
    pub(crate) fn from_data(data: Arc<NodeData>) -> Self {
        Self { data }
    }

    /// Element kind
    #[inline]
    pub fn kind(&self) -> ElementKind {
        self.data.kind
    }

    /// Byte offset of the element's span at the time it was derived
    #[inline]
    pub fn offset(&self) -> usize {
        self.data.offset
    }

    /// Span length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len
    }

    /// True for a zero-length span (never produced by scanning)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.len == 0
    }

    /// Tag name, PI target, or entity-reference name
    pub fn name(&self) -> Option<&str> {
        self.data.name.as_deref()
    }

    /// True for start tags (a self-closing tag is both start and end)
    pub fn is_start(&self) -> bool {
        matches!(self.kind(), ElementKind::StartTag | ElementKind::EmptyTag)
    }

    /// True for end tags (a self-closing tag is both start and end)
    pub fn is_end(&self) -> bool {
        matches!(self.kind(), ElementKind::EndTag | ElementKind::EmptyTag)
    }

    /// True for `<name/>`
    pub fn is_self_closing(&self) -> bool {
        self.kind() == ElementKind::EmptyTag
    }

    /// The next element in document order, or `None` at the buffer's end.
    ///
    /// Checks the weak link first; on miss, re-derives the element
    /// covering the first offset past this span and cross-links both
    /// caches symmetrically.
    pub fn next(&self) -> Option<SyntaxElement> {
        let doc = &self.data.doc;
        let version = doc.buffer.version();
        if let Some(node) = self.data.links.lock().next(version) {
            return Some(SyntaxElement::from_data(node));
        }
        let node = resolve_covering(doc, self.data.offset + self.data.len)?;
        if node.offset == self.data.offset {
            // A retokenization that does not advance yields no neighbor
            return None;
        }
        self.data.links.lock().set_next(version, &node);
        // Cross-link only when this handle's span is still adjacent in the
        // current buffer; a stale span must not leak into a fresh node's
        // cache under the live version stamp
        if self.data.offset + self.data.len == node.offset {
            node.links.lock().set_prev(version, &self.data);
        }
        Some(SyntaxElement::from_data(node))
    }

    /// The previous element in document order, or `None` at the start.
    pub fn previous(&self) -> Option<SyntaxElement> {
        if self.data.offset == 0 {
            return None;
        }
        let doc = &self.data.doc;
        let version = doc.buffer.version();
        if let Some(node) = self.data.links.lock().prev(version) {
            return Some(SyntaxElement::from_data(node));
        }
        let node = resolve_covering(doc, self.data.offset - 1)?;
        if node.offset == self.data.offset {
            return None;
        }
        self.data.links.lock().set_prev(version, &node);
        if node.offset + node.len == self.data.offset {
            node.links.lock().set_next(version, &self.data);
        }
        Some(SyntaxElement::from_data(node))
    }

    /// The first lexical token of this element, re-fetched from the token
    /// stream when the cached one is gone or stale.
    pub fn anchor_token(&self) -> Option<Token> {
        let doc = &self.data.doc;
        let version = doc.buffer.version();
        if let Some(tok) = self.data.links.lock().anchor(version) {
            return Some(tok);
        }
        let tok = doc
            .buffer
            .with_token_sequence(self.data.offset, |cursor| cursor.next_token())
            .ok()
            .flatten()?;
        self.data.links.lock().set_anchor(version, tok);
        Some(tok)
    }

    /// The element's textual value:
    ///
    /// - Text: the raw span (entity references are separate elements)
    /// - Comment / Cdata: the span with delimiters stripped
    /// - Pi: the content after the target
    /// - EntityRef: the decoded character, when the reference is known
    /// - Declaration / Error: the raw span
    /// - tags: `None`
    ///
    /// Returns `None` when the stored span no longer fits the buffer.
    pub fn value(&self) -> Option<String> {
        let doc = &self.data.doc;
        doc.buffer.with_read(|text, _| {
            let raw = text.get(self.data.offset..self.data.offset + self.data.len)?;
            match self.data.kind {
                ElementKind::Text => Some(raw.to_string()),
                ElementKind::Comment => Some(strip_delimiters(raw, "<!--", "-->").to_string()),
                ElementKind::Cdata => {
                    Some(strip_delimiters(raw, "<![CDATA[", "]]>").to_string())
                }
                ElementKind::Pi => Some(pi_content(raw).to_string()),
                ElementKind::EntityRef => self
                    .data
                    .name
                    .as_deref()
                    .and_then(decode_entity)
                    .map(String::from),
                ElementKind::Declaration | ElementKind::Error => Some(raw.to_string()),
                ElementKind::StartTag | ElementKind::EmptyTag | ElementKind::EndTag => None,
            }
        })
    }

    /// For an error sentinel: the nearest preceding real element, skipping
    /// further error spans. `None` when only errors precede it.
    pub fn enclosing_element(&self) -> Option<SyntaxElement> {
        let mut cur = self.previous()?;
        while cur.kind() == ElementKind::Error {
            cur = cur.previous()?;
        }
        Some(cur)
    }

    // Unsupported mutations: the tree is read-only apart from attribute
    // value replacement.

    /// Unsupported; fails with [`crate::DomError::ReadOnly`].
    pub fn add_attribute(&self, _name: &str, _value: &str) -> Result<(), crate::DomError> {
        Err(crate::DomError::read_only("attribute addition"))
    }

    /// Unsupported; fails with [`crate::DomError::ReadOnly`].
    pub fn remove_attribute(&self, _name: &str) -> Result<(), crate::DomError> {
        Err(crate::DomError::read_only("attribute removal"))
    }

    /// Unsupported; fails with [`crate::DomError::ReadOnly`].
    pub fn append_child(&self, _markup: &str) -> Result<(), crate::DomError> {
        Err(crate::DomError::read_only("child insertion"))
    }
}

fn strip_delimiters<'a>(raw: &'a str, open: &str, close: &str) -> &'a str {
    let inner = raw.strip_prefix(open).unwrap_or(raw);
    inner.strip_suffix(close).unwrap_or(inner)
}

/// `<?target content?>` -> `content` (leading whitespace trimmed)
fn pi_content(raw: &str) -> &str {
    let body = strip_delimiters(raw, "<?", "?>");
    match body.find(char::is_whitespace) {
        Some(i) => body[i..].trim_start(),
        None => "",
    }
}

/// Offset equality: the identity law of the lazy tree.
impl PartialEq for SyntaxElement {
    fn eq(&self, other: &Self) -> bool {
        self.data.offset == other.data.offset
    }
}

impl Eq for SyntaxElement {}

impl Hash for SyntaxElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data.offset.hash(state);
    }
}

impl fmt::Debug for SyntaxElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxElement")
            .field("kind", &self.data.kind)
            .field("offset", &self.data.offset)
            .field("len", &self.data.len)
            .field("name", &self.data.name)
            .finish()
    }
}
