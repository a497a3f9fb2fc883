//! Page state for list screens.
//!
//! In client mode the full list is already in memory and [`Pagination::slice`]
//! cuts the current page out of it. In server mode the page is fetched: the
//! pagination writes `startIndex`, `limit` and `totalCount` into the filter,
//! so every page is its own cache key.

use payloads::query::Filter;

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationMode {
    Client,
    Server,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    mode: PaginationMode,
    /// 1-based.
    current_page: usize,
    page_size: usize,
    /// Total row count. Unknown in server mode until the first page arrives.
    total: Option<usize>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::client(DEFAULT_PAGE_SIZE)
    }
}

impl Pagination {
    pub fn client(page_size: usize) -> Self {
        Self::with_mode(PaginationMode::Client, page_size)
    }

    pub fn server(page_size: usize) -> Self {
        Self::with_mode(PaginationMode::Server, page_size)
    }

    fn with_mode(mode: PaginationMode, page_size: usize) -> Self {
        Self {
            mode,
            current_page: 1,
            page_size: page_size.max(1),
            total: None,
        }
    }

    pub fn mode(&self) -> PaginationMode {
        self.mode
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total(&self) -> Option<usize> {
        self.total
    }

    /// Number of pages, at least 1. `None` while the total is unknown.
    pub fn page_count(&self) -> Option<usize> {
        self.total
            .map(|total| total.div_ceil(self.page_size).max(1))
    }

    /// Move to `page`, clamped into the valid range. Returns the new page.
    ///
    /// While the total is unknown the upper bound is the last page whose
    /// `startIndex` still fits the wire type.
    pub fn go_to(&mut self, page: usize) -> usize {
        let upper = self
            .page_count()
            .unwrap_or_else(|| self.last_addressable_page());
        self.current_page = page.clamp(1, upper);
        self.current_page
    }

    fn last_addressable_page(&self) -> usize {
        usize::try_from(u32::MAX).unwrap_or(usize::MAX) / self.page_size + 1
    }

    pub fn next(&mut self) -> usize {
        self.go_to(self.current_page.saturating_add(1))
    }

    pub fn previous(&mut self) -> usize {
        self.go_to(self.current_page.saturating_sub(1))
    }

    pub fn has_next(&self) -> bool {
        self.page_count()
            .is_none_or(|count| self.current_page < count)
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    /// Changing the page size returns to the first page.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.current_page = 1;
    }

    /// Record the total row count, pulling the current page back into range
    /// if rows disappeared.
    pub fn set_total(&mut self, total: usize) {
        self.total = Some(total);
        self.go_to(self.current_page);
    }

    /// Zero-based index of the first row on the current page.
    pub fn start_index(&self) -> usize {
        (self.current_page - 1).saturating_mul(self.page_size)
    }

    /// The rows of the current page. Updates the total from `items`.
    pub fn slice<'a, T>(&mut self, items: &'a [T]) -> &'a [T] {
        self.set_total(items.len());
        let start = self.start_index().min(items.len());
        let end = start.saturating_add(self.page_size).min(items.len());
        &items[start..end]
    }

    /// The filter for the current page: `filter` with paging criteria
    /// written in and the total count requested.
    pub fn paged_filter<F: Filter>(&self, filter: &F) -> F {
        let mut paged = filter.clone();
        let criteria = paged.criteria_mut();
        criteria.start_index = Some(to_u32(self.start_index()));
        criteria.limit = Some(to_u32(self.page_size));
        criteria.total_count = Some(true);
        paged
    }

    /// Record the `totalCount` of a server page.
    pub fn observe_total(&mut self, total_count: Option<u64>) {
        if let Some(total) = total_count {
            self.set_total(usize::try_from(total).unwrap_or(usize::MAX));
        }
    }
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use payloads::{CacheKey, FilterCriteria, filters::WorksheetFilter, paths};

    #[test]
    fn client_pages_never_exceed_page_size() {
        let rows: Vec<u32> = (0..23).collect();
        let mut pagination = Pagination::client(10);

        assert_eq!(pagination.slice(&rows), &rows[0..10]);
        pagination.go_to(3);
        assert_eq!(pagination.slice(&rows), &rows[20..23]);
        assert_eq!(pagination.page_count(), Some(3));
    }

    #[test]
    fn go_to_clamps_into_range() {
        let mut pagination = Pagination::client(10);
        pagination.set_total(25);
        assert_eq!(pagination.go_to(0), 1);
        assert_eq!(pagination.go_to(99), 3);
        assert!(!pagination.has_next());
        assert_eq!(pagination.previous(), 2);
    }

    #[test]
    fn empty_list_has_one_page() {
        let mut pagination = Pagination::client(10);
        let rows: Vec<u32> = Vec::new();
        assert!(pagination.slice(&rows).is_empty());
        assert_eq!(pagination.page_count(), Some(1));
        assert_eq!(pagination.go_to(5), 1);
    }

    #[test]
    fn page_size_change_resets_to_first_page() {
        let mut pagination = Pagination::client(10);
        pagination.set_total(100);
        pagination.go_to(4);
        pagination.set_page_size(25);
        assert_eq!(pagination.current_page(), 1);
        assert_eq!(pagination.page_count(), Some(4));
    }

    #[test]
    fn shrinking_total_pulls_page_back() {
        let mut pagination = Pagination::client(10);
        pagination.set_total(50);
        pagination.go_to(5);
        pagination.set_total(21);
        assert_eq!(pagination.current_page(), 3);
    }

    #[test]
    fn server_pages_are_distinct_cache_keys() {
        let mut pagination = Pagination::server(20);
        let filter = WorksheetFilter::default();

        let first = CacheKey::new(paths::WORKSHEET, &pagination.paged_filter(&filter));
        // Unknown total: moving forward is allowed.
        assert!(pagination.has_next());
        pagination.next();
        let second = CacheKey::new(paths::WORKSHEET, &pagination.paged_filter(&filter));

        assert_ne!(first, second);
        assert_eq!(
            second.as_str(),
            "labmanagement/worksheet?startIndex=20&limit=20&totalCount=true"
        );
    }

    #[test]
    fn far_pages_stay_within_the_wire_range() {
        let mut pagination = Pagination::server(10);
        let last = pagination.go_to(usize::MAX / 2);
        assert_eq!(last, 429_496_730);

        let paged = pagination.paged_filter(&FilterCriteria::default());
        assert_eq!(paged.start_index, Some(4_294_967_290));
        assert_eq!(pagination.next(), last);
    }

    #[test]
    fn server_total_comes_from_the_response() {
        let mut pagination = Pagination::server(10);
        assert_eq!(pagination.page_count(), None);
        pagination.observe_total(Some(31));
        assert_eq!(pagination.page_count(), Some(4));
        pagination.observe_total(None);
        assert_eq!(pagination.total(), Some(31));
    }

    #[test]
    fn paged_filter_keeps_other_criteria() {
        let pagination = Pagination::server(5);
        let filter = FilterCriteria::default().with_q("malaria");
        let paged = pagination.paged_filter(&filter);
        assert_eq!(paged.q.as_deref(), Some("malaria"));
        assert_eq!(paged.start_index, Some(0));
        assert_eq!(paged.limit, Some(5));
    }
}
