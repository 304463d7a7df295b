//! Paging for the browse queries the UI issues against the cache

use serde::{Deserialize, Serialize};

/// Rows per page when the caller does not ask for a size
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page a single query returns
pub const MAX_PAGE_SIZE: u32 = 500;

/// Zero-indexed page of a browse query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// `page_size` is clamped to `1..=MAX_PAGE_SIZE`.
    ///
    /// ```
    /// use core_library::repositories::PageRequest;
    ///
    /// let request = PageRequest::new(2, 20);
    /// assert_eq!(request.offset(), 40);
    /// assert_eq!(PageRequest::new(0, 10_000).limit(), 500);
    /// ```
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

/// One page of rows plus the size of the full result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let size = u64::from(request.page_size.max(1));
        let total_pages = u32::try_from(total.div_ceil(size)).unwrap_or(u32::MAX);

        Self {
            items,
            total,
            page: request.page,
            total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page.saturating_add(1) < self.total_pages
    }
}
