use async_trait::async_trait;
use thiserror::Error;

use triage_protocol::ErrorCode;
use triage_protocol::ErrorPayload;
use triage_protocol::SearchRequest;
use triage_protocol::SearchResponse;

/// Failures crossing the search boundary. The controller converts every
/// variant into a state flag; none of them escape it.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search endpoint returned HTTP {status}")]
    Http { status: u16 },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed search response: {0}")]
    Malformed(String),

    #[error("search endpoint rejected the request: {code}: {message}")]
    Rejected { code: ErrorCode, message: String },
}

impl From<ErrorPayload> for SearchError {
    fn from(payload: ErrorPayload) -> Self {
        Self::Rejected {
            code: payload.code,
            message: payload.message,
        }
    }
}

/// The external search endpoint as the controller sees it. Retry and
/// timeout policy live behind this boundary, not in the controller.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError>;
}
