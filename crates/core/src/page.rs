//! Pagination state and query sanitization.

use serde::{Deserialize, Serialize};

/// Default page size applied when none (or an out-of-range one) is requested.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Maximum page size the server accepts.
pub const MAX_PER_PAGE: u32 = 100;

/// Pagination block returned by the server alongside every list response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Client-side page state driving list queries.
///
/// Invariants: `page >= 1` always; `page <= pages` once `pages > 0`; changing
/// the search term resets `page` to 1 before the next fetch is issued.
#[derive(Clone, Debug, PartialEq)]
pub struct PageState {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
    pub search_term: Option<String>,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            total: 0,
            pages: 0,
            has_next: false,
            has_prev: false,
            search_term: None,
        }
    }
}

impl PageState {
    /// Adopt the server's view after a committed fetch.
    pub fn apply(&mut self, pagination: &Pagination) {
        self.page = sanitize_page(pagination.page);
        self.per_page = sanitize_per_page(pagination.per_page);
        self.total = pagination.total;
        self.pages = pagination.pages;
        self.has_next = pagination.has_next;
        self.has_prev = pagination.has_prev;
    }

    /// Update the search term. Whitespace-only input means "no filter". Any
    /// change resets `page` to 1.
    pub fn set_search_term(&mut self, term: &str) {
        let normalized = match term.trim() {
            "" => None,
            t => Some(t.to_string()),
        };
        if normalized != self.search_term {
            self.search_term = normalized;
            self.page = 1;
        }
    }

    /// The page `delta` steps away, clamped to `[1, pages]`.
    pub fn page_after(&self, delta: i64) -> u32 {
        let upper = i64::from(self.pages.max(1));
        (i64::from(self.page) + delta).clamp(1, upper) as u32
    }
}

/// Pages are 1-based; zero falls back to the first page.
pub fn sanitize_page(page: u32) -> u32 {
    page.max(1)
}

/// Out-of-range page sizes silently fall back to the default rather than
/// erroring or clamping, so a bad caller value never produces a 422 and never
/// exceeds the server's maximum.
pub fn sanitize_per_page(per_page: u32) -> u32 {
    if (1..=MAX_PER_PAGE).contains(&per_page) {
        per_page
    } else {
        DEFAULT_PER_PAGE
    }
}
