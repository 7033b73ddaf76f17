//! Tag resolver: start/end pairing, children, parents
//!
//! Start/end pairing is a computed relationship, never a stored one: the
//! whole sibling chain is re-walked on every query, so the answer always
//! reflects the current buffer even across edits. The walk is an explicit
//! iterative scan with a depth-bounded stack of open tag names; an
//! over-deep or exhausted search reports the tag unmatched (`None`), which
//! callers read as "not well-formed here", not as a failure.

use super::node::SyntaxElement;
use super::ElementKind;
use log::debug;

/// Upper bound on open-tag nesting tracked by one pairing search
const MAX_PAIRING_DEPTH: usize = 512;

impl SyntaxElement {
    /// The end tag paired with this tag.
    ///
    /// A self-closing tag is its own end; an end tag answers itself. For a
    /// start tag, scans forward tracking same-name nesting; `None` when
    /// the buffer ends first or a nested tag is itself unterminated.
    pub fn matching_end_tag(&self) -> Option<SyntaxElement> {
        match self.kind() {
            ElementKind::EmptyTag | ElementKind::EndTag => Some(self.clone()),
            ElementKind::StartTag => search_forward(self),
            _ => None,
        }
    }

    /// The start tag paired with this tag; mirror of
    /// [`SyntaxElement::matching_end_tag`].
    pub fn matching_start_tag(&self) -> Option<SyntaxElement> {
        match self.kind() {
            ElementKind::EmptyTag | ElementKind::StartTag => Some(self.clone()),
            ElementKind::EndTag => search_backward(self),
            _ => None,
        }
    }

    /// Whether two handles view the same logical tag: equal resolved start
    /// tags, falling back to plain offset identity when no start tag
    /// resolves. A start tag and its paired end tag compare equal here.
    pub fn same_tag(&self, other: &SyntaxElement) -> bool {
        let a = self.matching_start_tag().unwrap_or_else(|| self.clone());
        let b = other.matching_start_tag().unwrap_or_else(|| other.clone());
        a == b
    }

    /// The elements strictly between this tag's resolved start and end
    /// tags, one entry per top-level child. Empty when pairing fails or
    /// the tag is self-closing.
    pub fn children(&self) -> Vec<SyntaxElement> {
        let Some((start, end)) = self.resolved_pair() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut cur = start.next();
        while let Some(child) = cur {
            if child == end {
                break;
            }
            cur = match child.matching_end_tag() {
                // Skip over the child's own subtree
                Some(close) if close != child => close.next(),
                _ => child.next(),
            };
            out.push(child);
        }
        out
    }

    /// First element between the resolved pair, or `None`
    pub fn first_child(&self) -> Option<SyntaxElement> {
        let (start, end) = self.resolved_pair()?;
        let child = start.next()?;
        (child != end).then_some(child)
    }

    /// Last element between the resolved pair, or `None`.
    ///
    /// A nested paired element is reported by its start tag, the same view
    /// [`SyntaxElement::children`] gives.
    pub fn last_child(&self) -> Option<SyntaxElement> {
        let (start, end) = self.resolved_pair()?;
        let child = end.previous()?;
        if child == start {
            return None;
        }
        if child.kind() == ElementKind::EndTag {
            if let Some(open) = child.matching_start_tag() {
                if open.offset() > start.offset() {
                    return Some(open);
                }
            }
        }
        Some(child)
    }

    /// The nearest enclosing start tag: the first unmatched start tag
    /// found scanning backward. `None` at the document's top level.
    pub fn parent_tag(&self) -> Option<SyntaxElement> {
        // An end tag's parent search starts before its own start tag
        let mut cur = match self.kind() {
            ElementKind::EndTag => self.matching_start_tag().unwrap_or_else(|| self.clone()),
            _ => self.clone(),
        };
        let mut open: Vec<String> = Vec::new();
        loop {
            cur = cur.previous()?;
            match cur.kind() {
                ElementKind::EndTag => {
                    if open.len() >= MAX_PAIRING_DEPTH {
                        debug!("parent search gave up at depth {MAX_PAIRING_DEPTH}");
                        return None;
                    }
                    open.push(cur.name().unwrap_or_default().to_string());
                }
                ElementKind::StartTag => {
                    let name = cur.name().unwrap_or_default();
                    match open.last() {
                        Some(top) if top == name => {
                            open.pop();
                        }
                        Some(_) => {}
                        None => return Some(cur),
                    }
                }
                _ => {}
            }
        }
    }

    /// `(start, end)` when both sides of the pair resolve; `None`
    /// degrades children queries to empty rather than failing.
    fn resolved_pair(&self) -> Option<(SyntaxElement, SyntaxElement)> {
        if self.kind() == ElementKind::EmptyTag {
            return None;
        }
        let start = self.matching_start_tag()?;
        let end = self.matching_end_tag()?;
        if start == end {
            return None;
        }
        Some((start, end))
    }
}

/// Forward scan for a start tag's matching end tag.
///
/// The stack holds the names of tags opened past the search root; a
/// same-name end tag with an empty stack is the match. An end tag that
/// matches nothing on the stack is skipped — the nested search would have
/// skipped it too — and exhausting the buffer means unmatched.
fn search_forward(start: &SyntaxElement) -> Option<SyntaxElement> {
    let name = start.name().unwrap_or_default().to_string();
    let mut open: Vec<String> = Vec::new();
    let mut cur = start.clone();
    loop {
        let Some(next) = cur.next() else {
            debug!("no end tag for <{name}> at offset {}", start.offset());
            return None;
        };
        cur = next;
        match cur.kind() {
            ElementKind::StartTag => {
                if open.len() >= MAX_PAIRING_DEPTH {
                    debug!("pairing search gave up at depth {MAX_PAIRING_DEPTH}");
                    return None;
                }
                open.push(cur.name().unwrap_or_default().to_string());
            }
            ElementKind::EndTag => {
                let n = cur.name().unwrap_or_default();
                match open.last() {
                    Some(top) if top == n => {
                        open.pop();
                    }
                    Some(_) => {}
                    None if n == name => return Some(cur),
                    None => {}
                }
            }
            _ => {}
        }
    }
}

/// Backward mirror of [`search_forward`].
fn search_backward(end: &SyntaxElement) -> Option<SyntaxElement> {
    let name = end.name().unwrap_or_default().to_string();
    let mut open: Vec<String> = Vec::new();
    let mut cur = end.clone();
    loop {
        let Some(prev) = cur.previous() else {
            debug!("no start tag for </{name}> at offset {}", end.offset());
            return None;
        };
        cur = prev;
        match cur.kind() {
            ElementKind::EndTag => {
                if open.len() >= MAX_PAIRING_DEPTH {
                    debug!("pairing search gave up at depth {MAX_PAIRING_DEPTH}");
                    return None;
                }
                open.push(cur.name().unwrap_or_default().to_string());
            }
            ElementKind::StartTag => {
                let n = cur.name().unwrap_or_default();
                match open.last() {
                    Some(top) if top == n => {
                        open.pop();
                    }
                    Some(_) => {}
                    None if n == name => return Some(cur),
                    None => {}
                }
            }
            _ => {}
        }
    }
}
