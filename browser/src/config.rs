use triage_protocol::DEFAULT_PAGE_SIZE;

/// Hard bound on cumulative records fetched while seeking an open record.
pub const DEFAULT_SEEK_RECORD_CAP: usize = 500;

/// Page size for targeted facet-count fetches. One record is enough; only
/// the aggregation matters.
pub const DEFAULT_FACET_PROBE_PAGE_SIZE: usize = 1;

/// Tuning knobs for one browser controller instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrowserConfig {
    pub page_size: usize,
    /// Seeking stops once this many records have been fetched without
    /// finding the target, surfacing a not-found condition instead of
    /// paging indefinitely.
    pub seek_record_cap: usize,
    pub facet_probe_page_size: usize,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            seek_record_cap: DEFAULT_SEEK_RECORD_CAP,
            facet_probe_page_size: DEFAULT_FACET_PROBE_PAGE_SIZE,
        }
    }
}
