//! Pagination math.

/// Page/limit/offset arithmetic for [`crate::Query::paginate`].
///
/// `page` is 1-based and clamped to >= 1, `per_page` is clamped to >= 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    page: u64,
    per_page: u64,
    total: Option<u64>,
}

impl Paginator {
    /// Create a paginator for a page.
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
            total: None,
        }
    }

    /// Current page (1-based).
    pub fn page(&self) -> u64 {
        self.page
    }

    /// Rows per page.
    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// LIMIT for the current page.
    pub fn limit(&self) -> u64 {
        self.per_page
    }

    /// OFFSET for the current page.
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.per_page
    }

    /// Record the total row count.
    pub fn set_total(&mut self, total: u64) {
        self.total = Some(total);
    }

    /// Total row count, when counted.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Number of pages, when the total is known.
    pub fn pages(&self) -> Option<u64> {
        self.total.map(|t| t.div_ceil(self.per_page).max(1))
    }

    /// Whether a page follows the current one.
    pub fn has_next(&self) -> bool {
        self.pages().is_some_and(|pages| self.page < pages)
    }
}
