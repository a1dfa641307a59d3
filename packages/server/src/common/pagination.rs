//! Offset-based pagination for reverse-chronological lists.
//!
//! Pages are windows over a list ordered newest first: skip `offset` rows,
//! then take `limit`. Callers that render oldest first reverse each page.
//!
//! `has_more` is inferred from the page size alone: a short page means the
//! end was reached. When the remaining rows are an exact multiple of `limit`
//! the last full page still reports `has_more = true`, and the follow-up
//! request comes back empty.

use serde::{Deserialize, Serialize};

/// Page size used when the caller does not pass one.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Upper bound on the page size a caller may request.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Validated `limit`/`offset` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetPagination {
    pub limit: i64,
    pub offset: i64,
}

impl Default for OffsetPagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl OffsetPagination {
    /// Normalize raw query parameters.
    ///
    /// Missing or non-positive limits fall back to the default, oversized ones
    /// are clamped, negative offsets become zero.
    pub fn from_query(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => l.min(MAX_PAGE_LIMIT),
            _ => DEFAULT_PAGE_LIMIT,
        };
        let offset = offset.unwrap_or(0).max(0);
        Self { limit, offset }
    }

    /// The first page of a freshly opened list.
    pub fn is_initial(&self) -> bool {
        self.offset == 0
    }

    /// Whether older rows may exist beyond a page of `page_len` rows.
    pub fn has_more(&self, page_len: usize) -> bool {
        page_len as i64 >= self.limit
    }

    /// The request that fetches the page right after this one.
    pub fn next(&self, page_len: usize) -> Self {
        Self {
            limit: self.limit,
            offset: self.offset + page_len as i64,
        }
    }
}
