use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::sync::Notify;
use triage_browser::BrowserConfig;
use triage_browser::BrowserHandle;
use triage_browser::BrowserIntent;
use triage_browser::BrowserSnapshot;
use triage_browser::IssueQuery;
use triage_browser::KeyInput;
use triage_browser::LoadPhase;
use triage_browser::RawQuery;
use triage_browser::SearchError;
use triage_browser::SearchService;
use triage_browser::SpawnedBrowser;
use triage_browser::issue_composites;
use triage_browser::issue_facets;
use triage_browser::spawn_browser;
use triage_protocol::FacetBucket;
use triage_protocol::FacetPayload;
use triage_protocol::SearchRequest;
use triage_protocol::SearchResponse;

use super::util::ScriptedService;
use super::util::auto_echo;
use super::util::keys;
use super::util::page;
use super::util::wait_for;

fn spawn_with(config: BrowserConfig, service: Arc<dyn SearchService>) -> SpawnedBrowser<IssueQuery> {
    spawn_browser(config, issue_facets(), issue_composites(), service)
}

// The loop task and its snapshot channel cross threads, so both sides of
// the handle must stay thread-shareable.
#[test]
fn handles_and_snapshots_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<BrowserHandle<IssueQuery>>();
    assert_send_sync::<BrowserSnapshot<IssueQuery>>();
}

#[tokio::test]
async fn first_page_load_publishes_records_and_paging() {
    let service = ScriptedService::new();
    service.push_page(page(&["a", "b"], 1, 100, 2));
    let SpawnedBrowser { handle, .. } = spawn_with(BrowserConfig::default(), service.clone());
    let mut snapshots = handle.snapshots();

    handle.url_changed(RawQuery::new());
    let snapshot = wait_for(&mut snapshots, |s| s.phase == LoadPhase::Ready).await;

    assert_eq!(keys(&snapshot), vec!["a", "b"]);
    assert_eq!(snapshot.paging.total, 2);
    assert_eq!(snapshot.cursor.selected, Some("a".to_string()));
    let requests = service.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].page, 1);
    assert_eq!(requests[0].page_size, 100);
}

#[tokio::test]
async fn seek_fetches_successive_pages_until_the_open_record() {
    let service = ScriptedService::new();
    service.push_page(page(&["a", "b"], 1, 2, 5));
    service.push_page(page(&["c", "d"], 2, 2, 5));
    service.push_page(page(&["x"], 3, 2, 5));
    let config = BrowserConfig {
        page_size: 2,
        ..Default::default()
    };
    let SpawnedBrowser { handle, .. } = spawn_with(config, service.clone());
    let mut snapshots = handle.snapshots();

    handle.url_changed(RawQuery::from_query_string("open=x"));
    let snapshot = wait_for(&mut snapshots, |s| s.phase == LoadPhase::Ready).await;

    assert_eq!(snapshot.cursor.selected, Some("x".to_string()));
    assert_eq!(snapshot.records.len(), 5);
    assert!(!snapshot.target_not_found);
    let pages: Vec<usize> = service.requests().iter().map(|r| r.page).collect();
    assert_eq!(pages, vec![1, 2, 3], "walk stops at the target page");
}

#[tokio::test]
async fn arrow_navigation_with_open_detail_round_trips_urls() {
    let service = ScriptedService::new();
    service.push_page(page(&["a", "b", "c"], 1, 100, 3));
    let SpawnedBrowser {
        handle, url_pushes, ..
    } = spawn_with(BrowserConfig::default(), service.clone());
    let mut snapshots = handle.snapshots();
    let _echo = auto_echo(handle.clone(), url_pushes);

    handle.url_changed(RawQuery::from_query_string("open=a"));
    wait_for(&mut snapshots, |s| s.phase == LoadPhase::Ready).await;

    handle.key(KeyInput::Down);
    let snapshot = wait_for(&mut snapshots, |s| s.open_record.as_deref() == Some("b")).await;

    assert_eq!(snapshot.cursor.selected, Some("b".to_string()));
    // Selection navigation reuses the loaded pages: still one fetch.
    assert_eq!(service.requests().len(), 1);
}

struct SlowMajorService {
    gate: Arc<Notify>,
}

#[async_trait]
impl SearchService for SlowMajorService {
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError> {
        if request.filters.get("severities").map(String::as_str) == Some("MAJOR") {
            self.gate.notified().await;
            return Ok(page(&["old"], 1, 100, 1));
        }
        Ok(page(&["new"], 1, 100, 1))
    }
}

#[tokio::test]
async fn slow_superseded_fetch_cannot_clobber_newer_results() {
    let gate = Arc::new(Notify::new());
    let service = Arc::new(SlowMajorService {
        gate: Arc::clone(&gate),
    });
    let SpawnedBrowser { handle, .. } = spawn_with(BrowserConfig::default(), service);
    let mut snapshots = handle.snapshots();

    handle.url_changed(RawQuery::from_query_string("severities=MAJOR"));
    handle.url_changed(RawQuery::from_query_string("severities=BLOCKER"));
    let snapshot = wait_for(&mut snapshots, |s| {
        s.phase == LoadPhase::Ready && !s.records.is_empty()
    })
    .await;
    assert_eq!(keys(&snapshot), vec!["new"]);

    // Release the superseded fetch and wait for its resolution to pass
    // through the loop.
    snapshots.borrow_and_update();
    gate.notify_one();
    tokio::time::timeout(Duration::from_secs(5), snapshots.changed())
        .await
        .expect("stale resolution should still trigger a publish")
        .expect("browser loop should stay alive");

    let snapshot = handle.snapshot();
    assert_eq!(keys(&snapshot), vec!["new"], "stale response is discarded");
    assert_eq!(snapshot.phase, LoadPhase::Ready);
}

#[tokio::test]
async fn facet_toggle_probes_and_installs_counts() {
    let service = ScriptedService::new();
    service.push_page(page(&["a"], 1, 100, 1));
    let probe = SearchResponse {
        facets: vec![FacetPayload {
            name: "severities".to_string(),
            buckets: vec![FacetBucket {
                value: "MAJOR".to_string(),
                count: 7,
            }],
        }],
        ..Default::default()
    };
    service.push_page(probe);
    let SpawnedBrowser { handle, .. } = spawn_with(BrowserConfig::default(), service.clone());
    let mut snapshots = handle.snapshots();

    handle.url_changed(RawQuery::new());
    wait_for(&mut snapshots, |s| s.phase == LoadPhase::Ready).await;

    handle.intent(BrowserIntent::ToggleFacet("severities".to_string()));
    let snapshot = wait_for(&mut snapshots, |s| s.facets["severities"].counts.is_some()).await;

    let counts = snapshot.facets["severities"].counts.clone().unwrap();
    assert_eq!(counts.get("MAJOR"), Some(&7));
    let requests = service.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].facets, vec!["severities".to_string()]);
    assert_eq!(requests[1].page_size, 1, "probe asks for counts only");
}

#[tokio::test]
async fn load_more_appends_through_the_loop() {
    let service = ScriptedService::new();
    service.push_page(page(&["a", "b"], 1, 2, 4));
    service.push_page(page(&["c", "d"], 2, 2, 4));
    let config = BrowserConfig {
        page_size: 2,
        ..Default::default()
    };
    let SpawnedBrowser { handle, .. } = spawn_with(config, service.clone());
    let mut snapshots = handle.snapshots();

    handle.url_changed(RawQuery::new());
    wait_for(&mut snapshots, |s| s.phase == LoadPhase::Ready).await;

    handle.intent(BrowserIntent::LoadMore);
    let snapshot = wait_for(&mut snapshots, |s| s.records.len() == 4).await;

    assert_eq!(keys(&snapshot), vec!["a", "b", "c", "d"]);
    let pages: Vec<usize> = service.requests().iter().map(|r| r.page).collect();
    assert_eq!(pages, vec![1, 2]);
}

#[tokio::test]
async fn first_page_failure_surfaces_flag() {
    let service = ScriptedService::new();
    service.push_error(SearchError::Http { status: 500 });
    let SpawnedBrowser { handle, .. } = spawn_with(BrowserConfig::default(), service.clone());
    let mut snapshots = handle.snapshots();

    handle.url_changed(RawQuery::new());
    let snapshot = wait_for(&mut snapshots, |s| s.fetch_failed).await;

    assert_eq!(snapshot.phase, LoadPhase::Ready);
    assert!(snapshot.records.is_empty());
}

struct NeverResolves;

#[async_trait]
impl SearchService for NeverResolves {
    async fn search(&self, _request: SearchRequest) -> Result<SearchResponse, SearchError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn dropping_the_handle_stops_the_loop() -> anyhow::Result<()> {
    let SpawnedBrowser {
        handle,
        url_pushes,
        task,
    } = spawn_with(BrowserConfig::default(), Arc::new(NeverResolves));

    handle.url_changed(RawQuery::new());
    drop(handle);
    drop(url_pushes);

    // The loop must stop even with a fetch still in flight.
    tokio::time::timeout(Duration::from_secs(5), task).await??;
    Ok(())
}
