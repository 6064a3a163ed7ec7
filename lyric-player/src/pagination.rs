//! Pagination utilities for song listings

use serde::Serialize;

/// Page size used when the client does not send one
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Upper bound on client supplied page sizes
pub const MAX_PAGE_SIZE: i64 = 100;

/// Pagination metadata returned alongside a page of results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    pub page_size: i64,
    pub total_count: i64,
    pub total_pages: i64,
    /// Offset for SQL LIMIT/OFFSET query
    #[serde(skip)]
    pub offset: i64,
}

/// Calculate pagination metadata from total results and requested page
///
/// The page size is clamped to `[1, MAX_PAGE_SIZE]` and the page to
/// `[1, total_pages]`.
///
/// # Examples
/// ```
/// use lyric_player::pagination::calculate_pagination;
///
/// // 25 results, 10 per page = 3 pages (10 + 10 + 5)
/// let p = calculate_pagination(25, 2, Some(10));
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 10);
///
/// // Requesting out-of-bounds page gets clamped
/// let p = calculate_pagination(25, 99, Some(10));
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 20);
/// ```
pub fn calculate_pagination(
    total_count: i64,
    requested_page: i64,
    requested_page_size: Option<i64>,
) -> Pagination {
    let page_size = requested_page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let total_pages = (total_count + page_size - 1) / page_size;
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * page_size;

    Pagination {
        page,
        page_size,
        total_count,
        total_pages,
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_normal() {
        let p = calculate_pagination(25, 2, None);
        assert_eq!(p.page, 2);
        assert_eq!(p.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset, 10);
    }

    #[test]
    fn test_pagination_out_of_bounds_low() {
        let p = calculate_pagination(15, 0, None);
        assert_eq!(p.page, 1);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_empty() {
        let p = calculate_pagination(0, 1, None);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_page_size_clamped() {
        let p = calculate_pagination(500, 1, Some(1000));
        assert_eq!(p.page_size, MAX_PAGE_SIZE);
        assert_eq!(p.total_pages, 5);

        let p = calculate_pagination(3, 1, Some(0));
        assert_eq!(p.page_size, 1);
        assert_eq!(p.total_pages, 3);
    }

    #[test]
    fn test_offset_skipped_in_json() {
        let value = serde_json::to_value(calculate_pagination(25, 3, Some(10))).unwrap();
        assert_eq!(value["page"], 3);
        assert_eq!(value["total_count"], 25);
        assert!(value.get("offset").is_none());
    }
}
