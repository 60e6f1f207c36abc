//! Offset pagination with clamped page numbers

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u32 = 6;

/// One page of results plus the numbers needed to render navigation.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually served
    pub number: u64,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1) * u64::from(self.page_size)
    }
}

pub fn total_pages(total_items: u64, page_size: u32) -> u64 {
    let size = u64::from(page_size.max(1));
    total_items.div_ceil(size)
}

/// Clamp a requested page into `[1, total_pages]`. An empty table still
/// serves page 1.
pub fn clamp_page(requested: i64, total_items: u64, page_size: u32) -> u64 {
    let last = total_pages(total_items, page_size).max(1);
    match u64::try_from(requested) {
        Ok(0) | Err(_) => 1,
        Ok(n) => n.min(last),
    }
}

/// Read a `?page=` value. Missing or non-numeric input means page 1.
pub fn parse_page_param(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok()).unwrap_or(1)
}
