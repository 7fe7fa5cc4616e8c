use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_with::skip_serializing_none;

use crate::records::Record;

pub const PROTOCOL_VERSION: u32 = 1;

/// Default number of records per fetched page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// One page worth of search input: the filter map the server evaluates,
/// the facet names to aggregate, and the page window.
///
/// Facet counts are computed server-side against the filter map minus each
/// facet's own dimension, so an expanded facet always shows "what adding
/// this value would match".
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SearchRequest {
    pub filters: BTreeMap<String, String>,
    pub facets: Vec<String>,
    pub page: usize,
    pub page_size: usize,
    pub schema_version: u32,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            filters: BTreeMap::new(),
            facets: Vec::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            schema_version: PROTOCOL_VERSION,
        }
    }
}

/// Paging cursor echoed back by the server with every response.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Paging {
    pub page_index: usize,
    pub page_size: usize,
    pub total: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FacetBucket {
    pub value: String,
    pub count: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FacetPayload {
    pub name: String,
    #[serde(default)]
    pub buckets: Vec<FacetBucket>,
}

#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub facets: Vec<FacetPayload>,
    #[serde(default)]
    pub paging: Paging,
    pub error: Option<ErrorPayload>,
}

impl SearchResponse {
    /// Facet buckets for one facet name, if the server aggregated it.
    pub fn facet(&self, name: &str) -> Option<&FacetPayload> {
        self.facets.iter().find(|facet| facet.name == name)
    }
}

#[skip_serializing_none]
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Unknown,
    InvalidQuery,
    NotFound,
    Unavailable,
    VersionMismatch,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
