//! Editable text buffer with scoped access
//!
//! The buffer is the one shared mutable resource. Readers get a consistent
//! token sequence for the duration of a single scan via
//! [`TextBuffer::with_token_sequence`]; writers get an atomic edit scope via
//! [`TextBuffer::run_atomic_edit`]. Both are lock-guarded callbacks: a
//! reader racing a writer observes either the whole pre-edit or the whole
//! post-edit buffer, never a partial edit.
//!
//! Every atomic edit that actually changes the text bumps a monotonically
//! increasing version. Cached tokens and links are stamped with the version
//! they were derived from; a stale stamp means "cache miss", which is the
//! non-GC stand-in for a collected weak reference.

use crate::core::TokenCursor;
use crate::error::DomError;
use log::trace;
use parking_lot::RwLock;

struct BufferInner {
    text: String,
    version: u64,
}

/// An editable text buffer with an edit version counter.
pub struct TextBuffer {
    inner: RwLock<BufferInner>,
}

impl TextBuffer {
    /// Create a buffer holding `text`
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(BufferInner {
                text: text.into(),
                version: 0,
            }),
        }
    }

    /// Current edit version. Bumped once per effective atomic edit.
    pub fn version(&self) -> u64 {
        self.inner.read().version
    }

    /// Buffer length in bytes
    pub fn len(&self) -> usize {
        self.inner.read().text.len()
    }

    /// True when the buffer holds no text
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot copy of the buffer content
    pub fn snapshot(&self) -> String {
        self.inner.read().text.clone()
    }

    /// Run `f` with read access to the text and its version.
    ///
    /// The read lock is held only for the duration of `f`; no lock is ever
    /// held across separate navigation calls.
    pub(crate) fn with_read<T>(&self, f: impl FnOnce(&str, u64) -> T) -> T {
        let inner = self.inner.read();
        f(&inner.text, inner.version)
    }

    /// Run `f` with a token cursor positioned at the token covering
    /// `offset`. The token sequence is guaranteed consistent for the whole
    /// callback.
    ///
    /// Fails with [`DomError::PositionUnavailable`] when `offset` is outside
    /// the buffer.
    pub fn with_token_sequence<T>(
        &self,
        offset: usize,
        f: impl FnOnce(&mut TokenCursor<'_>) -> T,
    ) -> Result<T, DomError> {
        let inner = self.inner.read();
        if offset >= inner.text.len() {
            return Err(DomError::PositionUnavailable { offset });
        }
        let mut cursor = TokenCursor::new(&inner.text);
        if cursor.seek(offset).is_none() {
            return Err(DomError::PositionUnavailable { offset });
        }
        Ok(f(&mut cursor))
    }

    /// Run `f` inside one atomic edit scope.
    ///
    /// All removals and insertions performed through the [`EditScope`]
    /// become visible to readers at once, when the scope closes. The
    /// version is bumped exactly once if anything changed, on every exit
    /// path.
    pub fn run_atomic_edit<T>(&self, f: impl FnOnce(&mut EditScope<'_>) -> T) -> T {
        let mut inner = self.inner.write();
        let mut scope = EditScope {
            text: &mut inner.text,
            dirty: false,
        };
        let out = f(&mut scope);
        if scope.dirty {
            inner.version += 1;
            trace!("atomic edit closed, version now {}", inner.version);
        }
        out
    }
}

/// Buffer mutation primitives, only available inside
/// [`TextBuffer::run_atomic_edit`].
pub struct EditScope<'a> {
    text: &'a mut String,
    dirty: bool,
}

impl EditScope<'_> {
    /// Remove `len` bytes starting at `start`
    pub fn remove(&mut self, start: usize, len: usize) -> Result<(), DomError> {
        let end = start.checked_add(len).filter(|&e| e <= self.text.len());
        let end = end.ok_or(DomError::PositionUnavailable { offset: start })?;
        if !self.text.is_char_boundary(start) || !self.text.is_char_boundary(end) {
            return Err(DomError::PositionUnavailable { offset: start });
        }
        self.text.replace_range(start..end, "");
        self.dirty = true;
        Ok(())
    }

    /// Insert `content` at `start`
    pub fn insert(&mut self, start: usize, content: &str) -> Result<(), DomError> {
        if start > self.text.len() || !self.text.is_char_boundary(start) {
            return Err(DomError::PositionUnavailable { offset: start });
        }
        self.text.insert_str(start, content);
        self.dirty = true;
        Ok(())
    }

    /// The scope's current text, including edits already applied
    pub fn as_str(&self) -> &str {
        self.text
    }

    /// Current text length inside the scope
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// True when the scope's text is empty
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TokenKind;

    #[test]
    fn test_version_bumps_once_per_edit() {
        let buf = TextBuffer::new("<a b=\"c\"/>");
        assert_eq!(buf.version(), 0);
        buf.run_atomic_edit(|edit| {
            edit.remove(6, 1).unwrap();
            edit.insert(6, "xy").unwrap();
        });
        assert_eq!(buf.version(), 1);
        assert_eq!(buf.snapshot(), "<a b=\"xy\"/>");
    }

    #[test]
    fn test_no_bump_without_changes() {
        let buf = TextBuffer::new("<a/>");
        buf.run_atomic_edit(|_edit| {});
        assert_eq!(buf.version(), 0);
    }

    #[test]
    fn test_token_sequence_at_offset() {
        let buf = TextBuffer::new("<a>hi</a>");
        let kind = buf
            .with_token_sequence(4, |cursor| cursor.next_token().unwrap().kind)
            .unwrap();
        assert_eq!(kind, TokenKind::Text);
    }

    #[test]
    fn test_token_sequence_out_of_range() {
        let buf = TextBuffer::new("<a/>");
        let err = buf.with_token_sequence(40, |_| ()).unwrap_err();
        assert_eq!(err, DomError::PositionUnavailable { offset: 40 });
    }

    #[test]
    fn test_remove_out_of_range() {
        let buf = TextBuffer::new("abc");
        let err = buf.run_atomic_edit(|edit| edit.remove(1, 10));
        assert!(err.is_err());
        // A failed primitive leaves the buffer untouched
        assert_eq!(buf.snapshot(), "abc");
        assert_eq!(buf.version(), 0);
    }

    #[test]
    fn test_readers_never_observe_partial_edits() {
        use std::sync::Arc;
        use std::thread;

        let buf = Arc::new(TextBuffer::new("<a>one</a>"));
        let writer = {
            let buf = Arc::clone(&buf);
            thread::spawn(move || {
                for _ in 0..200 {
                    buf.run_atomic_edit(|edit| {
                        edit.remove(3, 3).unwrap();
                        edit.insert(3, "two").unwrap();
                    });
                    buf.run_atomic_edit(|edit| {
                        edit.remove(3, 3).unwrap();
                        edit.insert(3, "one").unwrap();
                    });
                }
            })
        };
        for _ in 0..400 {
            let seen = buf.with_read(|text, _| text.to_string());
            assert!(
                seen == "<a>one</a>" || seen == "<a>two</a>",
                "partial edit observed: {seen:?}"
            );
        }
        writer.join().unwrap();
    }

    #[test]
    fn test_char_boundary_guard() {
        let buf = TextBuffer::new("aé");
        let err = buf.run_atomic_edit(|edit| edit.remove(2, 1));
        assert_eq!(err, Err(DomError::PositionUnavailable { offset: 2 }));
    }
}
