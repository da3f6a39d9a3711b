//! Page cursor — tracks the read position in a table.

use serde::{Deserialize, Serialize};

use crate::record::MAX_RECORDS;

/// An `(offset, limit)` pair over a table's records.
///
/// Not persisted: every driver run starts again at offset 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    pub offset: usize,
    pub limit: usize,
}

impl PageCursor {
    /// Create a cursor at offset 0. `limit` is clamped to `1..=MAX_RECORDS`.
    pub fn new(limit: usize) -> Self {
        Self {
            offset: 0,
            limit: limit.clamp(1, MAX_RECORDS),
        }
    }

    /// Move to the next page.
    pub fn advance(&mut self) {
        self.offset += self.limit;
    }

    /// Zero-based page number.
    pub fn page(&self) -> usize {
        self.offset / self.limit
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new(MAX_RECORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_advance() {
        let mut cursor = PageCursor::default();
        assert_eq!(cursor.offset, 0);
        cursor.advance();
        cursor.advance();
        assert_eq!(cursor.offset, 50);
        assert_eq!(cursor.page(), 2);
    }

    #[test]
    fn cursor_limit_clamped() {
        assert_eq!(PageCursor::new(100).limit, MAX_RECORDS);
        assert_eq!(PageCursor::new(0).limit, 1);
    }
}
