//! Advisory caches
//!
//! Two layers, both droppable at any time without changing observable
//! navigation results:
//!
//! - [`NodeCache`]: a per-document LRU interning live nodes by offset, so
//!   repeated resolution of the same offset reuses one allocation. Entries
//!   hold `Weak` references and a version stamp; a dead or stale entry is
//!   just a miss.
//! - [`LinkCache`]: per-node resolved prev/next neighbors and the anchor
//!   token, version-stamped. The stand-in for collected weak references in
//!   a non-GC runtime: an entry from an older buffer version is never
//!   trusted.

use super::node::NodeData;
use crate::core::Token;
use log::trace;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};

/// Upper bound on live interned nodes per document
const NODE_CACHE_CAPACITY: usize = 1024;

struct CachedNode {
    version: u64,
    node: Weak<NodeData>,
}

/// Per-document offset -> node interning table.
pub(crate) struct NodeCache {
    inner: Mutex<LruCache<usize, CachedNode>>,
}

impl NodeCache {
    pub(crate) fn new() -> Self {
        let cap = NonZeroUsize::new(NODE_CACHE_CAPACITY).unwrap();
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    /// A live node at `offset` derived from buffer version `version`, if
    /// one is interned. Dead and stale entries are evicted on the way.
    pub(crate) fn lookup(&self, offset: usize, version: u64) -> Option<Arc<NodeData>> {
        let mut lru = self.inner.lock();
        match lru.get(&offset) {
            Some(entry) if entry.version == version => match entry.node.upgrade() {
                Some(node) => {
                    trace!("node cache hit at offset {offset}");
                    Some(node)
                }
                None => {
                    lru.pop(&offset);
                    None
                }
            },
            Some(_) => {
                lru.pop(&offset);
                None
            }
            None => None,
        }
    }

    pub(crate) fn insert(&self, offset: usize, version: u64, node: &Arc<NodeData>) {
        self.inner.lock().put(
            offset,
            CachedNode {
                version,
                node: Arc::downgrade(node),
            },
        );
    }

    /// Drop everything. Purely a cost change.
    pub(crate) fn clear(&self) {
        self.inner.lock().clear();
    }

    #[cfg(test)]
    pub(crate) fn live_count(&self) -> usize {
        self.inner
            .lock()
            .iter()
            .filter(|(_, e)| e.node.strong_count() > 0)
            .count()
    }
}

/// Per-node neighbor links and anchor token, valid for one buffer version.
pub(crate) struct LinkCache {
    version: u64,
    prev: Weak<NodeData>,
    next: Weak<NodeData>,
    anchor: Option<Token>,
}

impl LinkCache {
    pub(crate) fn new(version: u64) -> Self {
        Self {
            version,
            prev: Weak::new(),
            next: Weak::new(),
            anchor: None,
        }
    }

    /// Reset when the stamp no longer matches the live version
    fn refresh(&mut self, version: u64) {
        if self.version != version {
            *self = LinkCache::new(version);
        }
    }

    pub(crate) fn prev(&self, version: u64) -> Option<Arc<NodeData>> {
        (self.version == version).then(|| self.prev.upgrade()).flatten()
    }

    pub(crate) fn next(&self, version: u64) -> Option<Arc<NodeData>> {
        (self.version == version).then(|| self.next.upgrade()).flatten()
    }

    pub(crate) fn anchor(&self, version: u64) -> Option<Token> {
        if self.version == version {
            self.anchor
        } else {
            None
        }
    }

    pub(crate) fn set_prev(&mut self, version: u64, node: &Arc<NodeData>) {
        self.refresh(version);
        self.prev = Arc::downgrade(node);
    }

    pub(crate) fn set_next(&mut self, version: u64, node: &Arc<NodeData>) {
        self.refresh(version);
        self.next = Arc::downgrade(node);
    }

    pub(crate) fn set_anchor(&mut self, version: u64, token: Token) {
        self.refresh(version);
        self.anchor = Some(token);
    }
}

#[cfg(test)]
mod tests {
    use super::super::XmlSource;
    use crate::core::{Token, TokenKind};

    #[test]
    fn test_same_offset_interns_one_node() {
        let src = XmlSource::new("<a>hi</a>");
        let first = src.element_at(0).unwrap();
        let again = src.element_at(1).unwrap();
        // Both resolve the element covering offsets 0 and 1: `<a>`
        assert_eq!(first, again);
        assert_eq!(src.shared().cache.live_count(), 1);
    }

    #[test]
    fn test_stale_version_misses() {
        let src = XmlSource::new("<a>hi</a>");
        let _el = src.element_at(0).unwrap();
        let version = src.version();
        assert!(src.shared().cache.lookup(0, version).is_some());
        assert!(src.shared().cache.lookup(0, version + 1).is_none());
    }

    #[test]
    fn test_dropping_cache_keeps_results() {
        let src = XmlSource::new("<a>hi</a>");
        let before: Vec<_> = {
            let mut out = Vec::new();
            let mut cur = src.first_element();
            while let Some(el) = cur {
                out.push((el.kind(), el.offset()));
                cur = el.next();
            }
            out
        };
        src.clear_cache();
        let after: Vec<_> = {
            let mut out = Vec::new();
            let mut cur = src.first_element();
            while let Some(el) = cur {
                out.push((el.kind(), el.offset()));
                cur = el.next();
            }
            out
        };
        assert_eq!(before, after);
    }

    #[test]
    fn test_link_cache_version_stamp() {
        use super::LinkCache;
        let mut links = LinkCache::new(3);
        let tok = Token::new(TokenKind::Tag, 0, 2);
        links.set_anchor(3, tok);
        assert_eq!(links.anchor(3), Some(tok));
        // A different version never trusts the entry
        assert_eq!(links.anchor(4), None);
        // Setting under a new version discards the old generation
        links.set_anchor(4, tok);
        assert_eq!(links.anchor(3), None);
        assert_eq!(links.anchor(4), Some(tok));
    }
}
