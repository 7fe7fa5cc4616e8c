use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use triage_browser::BrowserHandle;
use triage_browser::BrowserSnapshot;
use triage_browser::IssueQuery;
use triage_browser::RawQuery;
use triage_browser::SearchError;
use triage_browser::SearchService;
use triage_protocol::Paging;
use triage_protocol::Record;
use triage_protocol::SearchRequest;
use triage_protocol::SearchResponse;

pub fn record(key: &str) -> Record {
    Record {
        key: key.to_string(),
        status: "OPEN".to_string(),
        resolution: None,
        message: None,
        locations: Vec::new(),
        flows: Vec::new(),
    }
}

pub fn page(keys: &[&str], page_index: usize, page_size: usize, total: usize) -> SearchResponse {
    SearchResponse {
        records: keys.iter().map(|key| record(key)).collect(),
        facets: Vec::new(),
        paging: Paging {
            page_index,
            page_size,
            total,
        },
        error: None,
    }
}

pub fn keys(snapshot: &BrowserSnapshot<IssueQuery>) -> Vec<&str> {
    snapshot
        .records
        .iter()
        .map(|record| record.key.as_str())
        .collect()
}

/// Serves scripted responses in order and records every request it saw.
/// Running off the end of the script yields a transport error, which a
/// test will notice as an unexpected failure flag or request count.
#[derive(Default)]
pub struct ScriptedService {
    script: Mutex<VecDeque<Result<SearchResponse, SearchError>>>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl ScriptedService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_page(&self, response: SearchResponse) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Ok(response));
    }

    pub fn push_error(&self, error: SearchError) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl SearchService for ScriptedService {
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| {
                Err(SearchError::Transport(
                    "script ran out of responses".to_string(),
                ))
            })
    }
}

/// Wait until a published snapshot matches, failing the test after a
/// generous timeout so a wedged loop cannot hang the suite.
pub async fn wait_for(
    rx: &mut watch::Receiver<BrowserSnapshot<IssueQuery>>,
    mut predicate: impl FnMut(&BrowserSnapshot<IssueQuery>) -> bool,
) -> BrowserSnapshot<IssueQuery> {
    let outcome = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if predicate(&snapshot) {
                    return snapshot.clone();
                }
            }
            if rx.changed().await.is_err() {
                panic!("browser loop stopped while waiting for a snapshot");
            }
        }
    })
    .await;
    match outcome {
        Ok(snapshot) => snapshot,
        Err(_) => panic!("timed out waiting for a matching snapshot"),
    }
}

/// Apply every pushed URL back to the loop, the way an address bar would.
pub fn auto_echo(
    handle: BrowserHandle<IssueQuery>,
    mut url_pushes: mpsc::UnboundedReceiver<RawQuery>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(url) = url_pushes.recv().await {
            handle.url_changed(url);
        }
    })
}
