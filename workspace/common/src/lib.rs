//! Transport-layer types shared by the API and its clients.

mod period;

pub use period::{DateWindow, month_start};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Generic API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success flag
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// Page metadata for listings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_count: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    /// `page` is 1-based; `limit` must be non-zero.
    pub fn new(page: u64, limit: u64, total_count: u64) -> Self {
        let limit = limit.max(1);
        let total_pages = total_count.div_ceil(limit);
        Self {
            current_page: page,
            total_pages,
            total_count,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }

    /// Row offset of the first item on `page`.
    pub fn offset(page: u64, limit: u64) -> u64 {
        page.saturating_sub(1) * limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_is_ceiling_of_count_over_limit() {
        for (count, limit) in [(0, 50), (1, 50), (50, 50), (51, 50), (101, 10), (7, 1)] {
            let pagination = Pagination::new(1, limit, count);
            assert_eq!(pagination.total_pages, count.div_ceil(limit));
            assert_eq!(pagination.has_next_page, pagination.current_page < pagination.total_pages);
        }
    }

    #[test]
    fn flags_reflect_position() {
        let middle = Pagination::new(2, 10, 35);
        assert_eq!(middle.total_pages, 4);
        assert!(middle.has_next_page);
        assert!(middle.has_prev_page);

        let last = Pagination::new(4, 10, 35);
        assert!(!last.has_next_page);

        let empty = Pagination::new(1, 10, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page);
        assert!(!empty.has_prev_page);
    }

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(Pagination::offset(1, 50), 0);
        assert_eq!(Pagination::offset(3, 20), 40);
        assert_eq!(Pagination::offset(0, 20), 0);
    }

    #[test]
    fn api_response_serializes_flat() {
        let response = ApiResponse::ok(vec![1, 2], "Listed");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Listed");
        assert_eq!(json["data"][1], 2);
    }
}
