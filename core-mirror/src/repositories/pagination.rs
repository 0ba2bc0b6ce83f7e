//! Pagination helper types for repository queries

use serde::{Deserialize, Serialize};

/// Pagination request parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (0-indexed)
    pub page: u32,
    /// Number of items per page
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// SQL OFFSET value
    pub fn offset(&self) -> u32 {
        self.page * self.page_size
    }

    /// SQL LIMIT value
    pub fn limit(&self) -> u32 {
        self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: 50,
        }
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let total_pages = if request.page_size == 0 {
            0
        } else {
            total.div_ceil(request.page_size as u64) as u32
        };

        Self {
            items,
            total,
            page: request.page,
            total_pages,
            page_size: request.page_size,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages
    }

    /// Map the items to a different type, keeping the page metadata.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            total_pages: self.total_pages,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_and_limit() {
        let request = PageRequest::new(3, 25);
        assert_eq!(request.offset(), 75);
        assert_eq!(request.limit(), 25);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page = Page::new(vec![1, 2], 21, PageRequest::new(0, 10));
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next());

        let last = Page::new(vec![1], 21, PageRequest::new(2, 10));
        assert!(!last.has_next());
    }

    #[test]
    fn test_zero_page_size() {
        let page: Page<i32> = Page::new(vec![], 10, PageRequest::new(0, 0));
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = Page::new(vec![1, 2, 3], 3, PageRequest::default());
        let mapped = page.map(|x| x.to_string());
        assert_eq!(mapped.items, vec!["1", "2", "3"]);
        assert_eq!(mapped.total, 3);
    }
}
