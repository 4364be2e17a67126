//! Pagination utilities
//!
//! Pages are 0-indexed; page size is clamped to [1, MAX_PAGE_SIZE].

use serde::{Deserialize, Serialize};

/// Page size used when the client does not ask for one
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest page size a client may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// `?page=&pageSize=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageQuery {
    pub fn pagination(&self) -> Pagination {
        calculate_pagination(self.page, self.page_size)
    }
}

/// Sanitized paging window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (0-indexed)
    pub page: i64,
    /// Rows per page
    pub page_size: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

/// One page of results together with the unpaged total
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Calculate the paging window from requested page and page size
///
/// # Examples
/// ```
/// use echonova_api::pagination::calculate_pagination;
///
/// let p = calculate_pagination(Some(2), Some(25));
/// assert_eq!(p.offset, 50);
///
/// // Oversized pages are clamped
/// let p = calculate_pagination(Some(0), Some(1000));
/// assert_eq!(p.page_size, 100);
/// ```
pub fn calculate_pagination(requested_page: Option<i64>, requested_size: Option<i64>) -> Pagination {
    let page = requested_page.unwrap_or(0).max(0);
    let page_size = requested_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    Pagination {
        page,
        page_size,
        offset: page.saturating_mul(page_size),
    }
}
