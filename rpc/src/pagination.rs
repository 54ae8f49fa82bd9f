//! Cursor-based pagination for list endpoints.
//!
//! The cursor is the id of the last proposal on the previous page; the next
//! page starts right after it.

use serde::Deserialize;

/// Default page size when `count` is not specified.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Maximum allowed page size.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Common pagination parameters accepted by list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    /// Id of the last item already seen.
    pub cursor: Option<u64>,
    /// Number of items per page (default 100, max 1000).
    pub count: Option<u32>,
}

impl PaginationParams {
    /// Resolve effective page size, clamped to [1, MAX_PAGE_SIZE].
    pub fn effective_count(&self) -> u32 {
        self.count
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

/// Compute the next-page cursor from the last id returned. Returns `None`
/// when fewer items than `page_size` were returned (the end was reached).
pub fn next_cursor(last_id: Option<u64>, returned: usize, page_size: u32) -> Option<u64> {
    if (returned as u64) < u64::from(page_size) {
        None
    } else {
        last_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_cursor_returns_none_at_end() {
        assert!(next_cursor(Some(49), 50, 100).is_none());
    }

    #[test]
    fn next_cursor_returns_last_id_when_full_page() {
        assert_eq!(next_cursor(Some(199), 100, 100), Some(199));
    }

    #[test]
    fn effective_count_defaults() {
        assert_eq!(PaginationParams::default().effective_count(), 100);
    }

    #[test]
    fn effective_count_clamps() {
        let p = PaginationParams {
            cursor: None,
            count: Some(5000),
        };
        assert_eq!(p.effective_count(), 1000);
        let p = PaginationParams {
            cursor: None,
            count: Some(0),
        };
        assert_eq!(p.effective_count(), 1);
    }
}
