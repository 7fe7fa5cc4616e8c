//! Wire shapes exchanged with the record search service.
//!
//! The browser controller in `triage-browser` consumes these types but never
//! interprets ranking or count computation; everything here is plain data
//! with serde round-tripping as the only behavior.

mod records;
mod search;

pub use records::Flow;
pub use records::Location;
pub use records::Record;
pub use records::RecordKey;
pub use search::DEFAULT_PAGE_SIZE;
pub use search::ErrorCode;
pub use search::ErrorPayload;
pub use search::FacetBucket;
pub use search::FacetPayload;
pub use search::PROTOCOL_VERSION;
pub use search::Paging;
pub use search::SearchRequest;
pub use search::SearchResponse;
