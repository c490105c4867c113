//! Pagination for admin submission review

use serde::{Deserialize, Serialize};

/// Sessions per page in the submission list
pub const PAGE_SIZE: i64 = 50;

/// `?page=N` query parameter (1-indexed)
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<i64>,
}

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    pub total_pages: i64,
    pub total_results: i64,
    /// Offset for SQL LIMIT/OFFSET query
    #[serde(skip)]
    pub offset: i64,
}

/// Clamp the requested page into [1, total_pages] and compute the offset
///
/// # Examples
/// ```
/// use portal_server::pagination::calculate_pagination;
///
/// let p = calculate_pagination(120, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 50);
///
/// let p = calculate_pagination(120, 99);
/// assert_eq!(p.page, 3);
/// ```
pub fn calculate_pagination(total_results: i64, requested_page: i64) -> Pagination {
    let total_pages = (total_results + PAGE_SIZE - 1) / PAGE_SIZE;
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * PAGE_SIZE;

    Pagination {
        page,
        total_pages,
        total_results,
        offset,
    }
}
