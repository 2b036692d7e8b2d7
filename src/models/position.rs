//! Session-scoped pager position.

/// Where the grid's pager currently stands. `0` means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapePosition {
    /// Page number the pager reports as active
    pub current_page: u32,

    /// Active page before the last navigation attempt
    pub previous_page: u32,

    /// Page count the pager reports
    pub total_pages: u32,
}

impl ScrapePosition {
    pub fn is_known(&self) -> bool {
        self.current_page > 0
    }
}
