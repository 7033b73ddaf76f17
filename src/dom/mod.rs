//! Lazy syntax tree
//!
//! The tree is never built or stored: every node is a [`SyntaxElement`]
//! rematerialized on demand from the token stream at its remembered
//! (offset, len) address. Navigation caches (neighbor links, anchor
//! tokens, the per-document node table) are advisory — dropping them
//! changes cost, never results.
//!
//! ## Architecture
//!
//! ```text
//! XmlSource
//! ├── TextBuffer            # editable text + edit version
//! └── NodeCache             # LRU of offset -> Weak<NodeData>
//!     └── NodeData          # one resolved element, weak neighbor links
//! ```

pub mod attr;
pub mod cache;
pub mod node;
pub mod scan;
pub mod tag;

pub use attr::{Attr, Attributes};
pub use node::{SyntaxElement, XmlSource};

/// The kind of a syntax element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// `<name ...>`
    StartTag,
    /// `<name .../>` — its own start and end tag
    EmptyTag,
    /// `</name>`
    EndTag,
    /// Text content between tags
    Text,
    /// `<![CDATA[...]]>`
    Cdata,
    /// `<!--...-->`
    Comment,
    /// `<?target ...?>`, XML declaration included
    Pi,
    /// `&name;` / `&#nn;` reference in content
    EntityRef,
    /// `<!DOCTYPE ...>` and other `<!` declarations
    Declaration,
    /// Sentinel for an unparseable span
    Error,
}

impl ElementKind {
    /// True for the three tag variants
    #[inline]
    pub fn is_tag(&self) -> bool {
        matches!(
            self,
            ElementKind::StartTag | ElementKind::EmptyTag | ElementKind::EndTag
        )
    }
}
