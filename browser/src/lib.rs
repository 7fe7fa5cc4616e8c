//! # Triage Browser
//!
//! The client-side state machine behind the triage record browsers: a
//! faceted, URL-driven list with lazy facet counts, load-more paging, a
//! keyboard-navigable selection cursor, and bulk check-all.
//!
//! The core is [`BrowserController`], a reducer with no I/O of its own.
//! Every input arrives as a [`BrowserEvent`]; every state change returns
//! the [`Effect`]s the embedder must run. Search requests carry a
//! monotonic token so responses that arrive out of order are dropped
//! instead of clobbering newer state. [`spawn_browser`] wraps the reducer
//! in a tokio loop that runs fetches against a [`SearchService`] and
//! publishes [`BrowserSnapshot`]s over a watch channel.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use triage_browser::BrowserConfig;
//! use triage_browser::IssueQuery;
//! use triage_browser::RawQuery;
//! use triage_browser::SearchError;
//! use triage_browser::SearchService;
//! use triage_browser::issue_composites;
//! use triage_browser::issue_facets;
//! use triage_browser::spawn_browser;
//! use triage_protocol::SearchRequest;
//! use triage_protocol::SearchResponse;
//!
//! struct Backend;
//!
//! #[async_trait]
//! impl SearchService for Backend {
//!     async fn search(&self, _request: SearchRequest) -> Result<SearchResponse, SearchError> {
//!         Ok(SearchResponse::default())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut spawned = spawn_browser::<IssueQuery>(
//!         BrowserConfig::default(),
//!         issue_facets(),
//!         issue_composites(),
//!         Arc::new(Backend),
//!     );
//!     spawned
//!         .handle
//!         .url_changed(RawQuery::from_query_string("severities=MAJOR"));
//!     // Apply every pushed URL to the address bar, then echo it back.
//!     while let Some(url) = spawned.url_pushes.recv().await {
//!         spawned.handle.url_changed(url);
//!     }
//! }
//! ```

pub mod bulk;
pub mod config;
pub mod controller;
pub mod driver;
pub mod facets;
pub mod hotspots;
pub mod issues;
pub mod pages;
pub mod query;
pub mod selection;
pub mod service;
pub mod tokens;

pub use bulk::BulkSelection;
pub use config::BrowserConfig;
pub use config::DEFAULT_FACET_PROBE_PAGE_SIZE;
pub use config::DEFAULT_SEEK_RECORD_CAP;
pub use controller::BrowserController;
pub use controller::BrowserEvent;
pub use controller::BrowserIntent;
pub use controller::BrowserSnapshot;
pub use controller::Effect;
pub use controller::LoadPhase;
pub use driver::BrowserHandle;
pub use driver::SpawnedBrowser;
pub use driver::spawn_browser;
pub use facets::CompositeFacet;
pub use facets::FacetSnapshot;
pub use facets::FacetStore;
pub use hotspots::HotspotQuery;
pub use hotspots::HotspotResolution;
pub use hotspots::HotspotStatus;
pub use hotspots::hotspot_composites;
pub use hotspots::hotspot_facets;
pub use issues::IssueQuery;
pub use issues::IssueSortField;
pub use issues::IssueType;
pub use issues::Severity;
pub use issues::issue_composites;
pub use issues::issue_facets;
pub use pages::PageCache;
pub use query::FilterQuery;
pub use query::RawQuery;
pub use query::SelectionParams;
pub use query::queries_equal;
pub use selection::KeyInput;
pub use selection::SelectionCursor;
pub use service::SearchError;
pub use service::SearchService;
pub use tokens::RequestToken;
pub use tokens::TokenSource;
