use serde::Serialize;

use triage_protocol::Paging;
use triage_protocol::Record;
use triage_protocol::RecordKey;

/// Ordered list of fetched records plus the server's paging cursor.
///
/// Pages are appended monotonically in fetch order. A filter change resets
/// the whole cache; nothing else ever removes or reorders records.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PageCache {
    records: Vec<Record>,
    paging: Paging,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.records.clear();
        self.paging = Paging::default();
    }

    /// Install the first fetched page, discarding anything held before.
    pub fn install_first(&mut self, records: Vec<Record>, paging: Paging) {
        self.records = records;
        self.paging = paging;
    }

    /// Append a later page. The caller sequences pages; the cache only
    /// records the new cursor.
    pub fn append(&mut self, records: Vec<Record>, paging: Paging) {
        self.records.extend(records);
        self.paging = paging;
    }

    /// Replace one record in place, keyed by identity. Returns false when
    /// the record is not loaded. Order is never disturbed.
    pub fn update_record(&mut self, record: Record) -> bool {
        match self.records.iter_mut().find(|held| held.key == record.key) {
            Some(held) => {
                *held = record;
                true
            }
            None => false,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record(&self, key: &str) -> Option<&Record> {
        self.records.iter().find(|record| record.key == key)
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.records.iter().position(|record| record.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &RecordKey> {
        self.records.iter().map(|record| &record.key)
    }

    pub fn paging(&self) -> Paging {
        self.paging
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether every record matching the query has been fetched.
    pub fn is_exhausted(&self) -> bool {
        self.records.len() >= self.paging.total
    }

    pub fn has_more(&self) -> bool {
        !self.is_exhausted()
    }

    /// The page index a "load more" should request next.
    pub fn next_page(&self) -> usize {
        self.paging.page_index + 1
    }
}
