use serde::{Deserialize, Serialize};

/// A half-open byte span `[start, end)` into the source being lexed.
///
/// Offsets are UTF-8 byte offsets and always fall on char boundaries, so a
/// span can slice its source directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "Span start must be <= end");
        Self { start, end }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// The text this span covers.
    #[inline]
    pub fn slice<'s>(&self, src: &'s str) -> &'s str {
        &src[self.start..self.end]
    }
}
