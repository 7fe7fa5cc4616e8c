use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use triage_protocol::FacetPayload;
use triage_protocol::Paging;
use triage_protocol::Record;
use triage_protocol::RecordKey;
use triage_protocol::SearchRequest;
use triage_protocol::SearchResponse;

use crate::bulk::BulkSelection;
use crate::config::BrowserConfig;
use crate::facets::CompositeFacet;
use crate::facets::FacetSnapshot;
use crate::facets::FacetStore;
use crate::pages::PageCache;
use crate::query::FilterQuery;
use crate::query::RawQuery;
use crate::query::SelectionParams;
use crate::query::decode_url;
use crate::query::encode_url;
use crate::query::queries_equal;
use crate::selection::KeyInput;
use crate::selection::SelectionCursor;
use crate::selection::cycle_location;
use crate::selection::effective_location;
use crate::selection::step_flow;
use crate::selection::step_record;
use crate::service::SearchError;
use crate::tokens::RequestToken;
use crate::tokens::TokenSource;

/// Where the main record fetch currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    Idle,
    FirstPage,
    LoadingMore,
    Ready,
}

/// Everything that can happen to a browser controller.
#[derive(Debug)]
pub enum BrowserEvent<F> {
    /// The externally owned URL changed, by navigation or by an echoed
    /// [`Effect::PushUrl`].
    UrlChanged(RawQuery),
    Key(KeyInput),
    Intent(BrowserIntent<F>),
    MainResolved {
        token: RequestToken,
        result: Result<SearchResponse, SearchError>,
    },
    FacetResolved {
        facet: String,
        token: RequestToken,
        result: Result<SearchResponse, SearchError>,
    },
}

/// Imperative intents the rendering layer can raise.
#[derive(Debug)]
pub enum BrowserIntent<F> {
    /// Replace the filter query. Routed through the URL so the address bar
    /// stays the single source of truth.
    SetFilters(F),
    ToggleFacet(String),
    LoadMore,
    SelectRecord(RecordKey),
    SelectFlow(Option<usize>),
    SelectLocation(Option<usize>),
    OpenDetail(RecordKey),
    CloseDetail,
    ToggleChecked(RecordKey),
    ToggleCheckAll(bool),
    /// A record changed server-side (status transition, resolution); swap
    /// it in place without reordering the page.
    RecordUpdated(Record),
}

/// Work the embedder performs on the controller's behalf. Fetch effects
/// resolve back into [`BrowserEvent::MainResolved`] or
/// [`BrowserEvent::FacetResolved`] carrying the same token; `PushUrl` is
/// echoed back as [`BrowserEvent::UrlChanged`] once navigation lands.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    FetchMain {
        token: RequestToken,
        request: SearchRequest,
    },
    FetchFacet {
        facet: String,
        token: RequestToken,
        request: SearchRequest,
    },
    PushUrl(RawQuery),
}

/// Read-only view handed to the rendering layer after every event.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BrowserSnapshot<F> {
    pub query: F,
    /// The record whose detail view is open, straight from the URL.
    pub open_record: Option<RecordKey>,
    pub records: Vec<Record>,
    pub paging: Paging,
    pub facets: IndexMap<String, FacetSnapshot>,
    pub cursor: SelectionCursor,
    pub checked: BTreeSet<RecordKey>,
    pub check_all: bool,
    pub phase: LoadPhase,
    pub fetch_failed: bool,
    pub load_more_failed: bool,
    /// The URL named an open record the seek could not reach.
    pub target_not_found: bool,
}

/// The faceted record-browser state machine.
///
/// A reducer: [`BrowserController::handle`] applies one event and returns
/// the effects the embedder must run. The controller never performs I/O
/// itself and never touches the URL except through effects, so every
/// ordering case is testable without a runtime.
pub struct BrowserController<F: FilterQuery> {
    config: BrowserConfig,
    query: F,
    selection_params: SelectionParams,
    cache: PageCache,
    facets: FacetStore,
    cursor: SelectionCursor,
    bulk: BulkSelection,
    phase: LoadPhase,
    fetch_failed: bool,
    load_more_failed: bool,
    target_not_found: bool,
    tokens: TokenSource,
    main_token: Option<RequestToken>,
    started: bool,
}

impl<F: FilterQuery> BrowserController<F> {
    pub fn new(
        config: BrowserConfig,
        facet_names: impl IntoIterator<Item = String>,
        composites: Vec<CompositeFacet>,
    ) -> Self {
        Self {
            config,
            query: F::default(),
            selection_params: SelectionParams::default(),
            cache: PageCache::new(),
            facets: FacetStore::new(facet_names, composites),
            cursor: SelectionCursor::default(),
            bulk: BulkSelection::new(),
            phase: LoadPhase::Idle,
            fetch_failed: false,
            load_more_failed: false,
            target_not_found: false,
            tokens: TokenSource::new(),
            main_token: None,
            started: false,
        }
    }

    pub fn query(&self) -> &F {
        &self.query
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn records(&self) -> &[Record] {
        self.cache.records()
    }

    /// A detail view is open exactly when the URL names an open record.
    pub fn detail_open(&self) -> bool {
        self.selection_params.open.is_some()
    }

    pub fn snapshot(&self) -> BrowserSnapshot<F> {
        let mut cursor = self.cursor.clone();
        match cursor.selected.as_ref().and_then(|key| self.cache.record(key)) {
            Some(record) => {
                cursor.location = effective_location(record, cursor.flow, cursor.location);
            }
            None => {
                cursor.flow = None;
                cursor.location = None;
            }
        }
        BrowserSnapshot {
            query: self.query.clone(),
            open_record: self.selection_params.open.clone(),
            records: self.cache.records().to_vec(),
            paging: self.cache.paging(),
            facets: self.facets.snapshot(),
            cursor,
            checked: self.bulk.checked().clone(),
            check_all: self.bulk.check_all(),
            phase: self.phase,
            fetch_failed: self.fetch_failed,
            load_more_failed: self.load_more_failed,
            target_not_found: self.target_not_found,
        }
    }

    /// Apply one event, returning the effects to run. Stale fetch
    /// responses are swallowed here; they produce neither state changes
    /// nor effects.
    pub fn handle(&mut self, event: BrowserEvent<F>) -> Vec<Effect> {
        match event {
            BrowserEvent::UrlChanged(raw) => self.on_url_changed(&raw),
            BrowserEvent::Key(input) => self.on_key(input),
            BrowserEvent::Intent(intent) => self.on_intent(intent),
            BrowserEvent::MainResolved { token, result } => self.on_main_resolved(token, result),
            BrowserEvent::FacetResolved {
                facet,
                token,
                result,
            } => self.on_facet_resolved(&facet, token, result),
        }
    }

    fn on_url_changed(&mut self, raw: &RawQuery) -> Vec<Effect> {
        let (query, selection) = decode_url::<F>(raw);
        let filters_changed = !self.started || !queries_equal(&self.query, &query);
        self.query = query;
        self.selection_params = selection;
        self.started = true;

        if filters_changed {
            return self.start_first_fetch();
        }

        // Same filters: only the selection part moved. Recompute the
        // cursor, resuming the page walk when the open record is unknown.
        // A first-page fetch already in flight picks the new target up
        // when it resolves; an in-flight load-more is superseded here.
        if let Some(target) = self.selection_params.open.clone()
            && !self.cache.contains(&target)
            && self.phase != LoadPhase::FirstPage
        {
            return self.resume_seek(&target);
        }
        self.reconcile_cursor();
        Vec::new()
    }

    fn start_first_fetch(&mut self) -> Vec<Effect> {
        self.cache.reset();
        self.bulk.clear();
        self.facets.invalidate_counts();
        self.cursor.select(None);
        self.phase = LoadPhase::FirstPage;
        self.fetch_failed = false;
        self.load_more_failed = false;
        self.target_not_found = false;
        let facet_names = self.facets.open_facets();
        vec![self.fetch_main(1, facet_names)]
    }

    fn resume_seek(&mut self, target: &str) -> Vec<Effect> {
        if self.cache.is_exhausted() || self.cache.len() >= self.config.seek_record_cap {
            warn!(record = target, "requested record is not reachable");
            self.target_not_found = true;
            self.reconcile_cursor();
            return Vec::new();
        }
        self.phase = LoadPhase::FirstPage;
        self.target_not_found = false;
        vec![self.fetch_main(self.cache.next_page(), Vec::new())]
    }

    fn fetch_main(&mut self, page: usize, facet_names: Vec<String>) -> Effect {
        let token = self.tokens.issue();
        self.main_token = Some(token);
        debug!(token, page, "issuing main fetch");
        Effect::FetchMain {
            token,
            request: SearchRequest {
                filters: self.query.search_filters(),
                facets: facet_names,
                page,
                page_size: self.config.page_size,
                ..Default::default()
            },
        }
    }

    fn on_main_resolved(
        &mut self,
        token: RequestToken,
        result: Result<SearchResponse, SearchError>,
    ) -> Vec<Effect> {
        if self.main_token != Some(token) {
            debug!(token, "dropping stale main response");
            return Vec::new();
        }
        self.main_token = None;

        match (self.phase, result) {
            (LoadPhase::FirstPage, Ok(response)) => {
                let SearchResponse {
                    records,
                    facets,
                    paging,
                    ..
                } = response;
                let held_before = self.cache.len();
                if self.cache.is_empty() {
                    self.cache.install_first(records, paging);
                } else {
                    self.cache.append(records, paging);
                }
                self.install_facet_payloads(&facets);

                if let Some(target) = self.selection_params.open.clone()
                    && !self.cache.contains(&target)
                {
                    if self.cache.is_exhausted() {
                        debug!(record = target.as_str(), "open record not in result set");
                        self.target_not_found = true;
                    } else if self.cache.len() == held_before {
                        // A page that adds no records counts as exhaustion;
                        // a stale server total must not keep the walk alive.
                        warn!(
                            record = target.as_str(),
                            total = self.cache.paging().total,
                            "page walk stalled before the reported total"
                        );
                        self.target_not_found = true;
                    } else if self.cache.len() >= self.config.seek_record_cap {
                        warn!(
                            record = target.as_str(),
                            cap = self.config.seek_record_cap,
                            "seek cap reached before finding open record"
                        );
                        self.target_not_found = true;
                    } else {
                        return vec![self.fetch_main(self.cache.next_page(), Vec::new())];
                    }
                }
                self.phase = LoadPhase::Ready;
                self.reconcile_cursor();
                Vec::new()
            }
            (LoadPhase::FirstPage, Err(error)) => {
                warn!(%error, "first page fetch failed");
                self.cache.reset();
                self.phase = LoadPhase::Ready;
                self.fetch_failed = true;
                self.reconcile_cursor();
                Vec::new()
            }
            (LoadPhase::LoadingMore, Ok(response)) => {
                let SearchResponse {
                    records,
                    facets,
                    paging,
                    ..
                } = response;
                self.cache.append(records, paging);
                self.install_facet_payloads(&facets);
                self.phase = LoadPhase::Ready;
                self.reconcile_cursor();
                Vec::new()
            }
            (LoadPhase::LoadingMore, Err(error)) => {
                warn!(%error, "load more failed, keeping fetched pages");
                self.phase = LoadPhase::Ready;
                self.load_more_failed = true;
                Vec::new()
            }
            (phase, _) => {
                debug!(?phase, token, "ignoring main response outside a fetch");
                Vec::new()
            }
        }
    }

    fn on_facet_resolved(
        &mut self,
        facet: &str,
        token: RequestToken,
        result: Result<SearchResponse, SearchError>,
    ) -> Vec<Effect> {
        match result {
            Ok(response) => {
                let buckets = response
                    .facet(facet)
                    .map(|payload| payload.buckets.clone())
                    .unwrap_or_default();
                self.facets.apply_counts(facet, token, &buckets);
            }
            Err(error) => {
                warn!(facet, %error, "facet fetch failed");
                self.facets.fail(facet, token);
            }
        }
        Vec::new()
    }

    fn on_key(&mut self, input: KeyInput) -> Vec<Effect> {
        match input {
            KeyInput::Up => self.move_selection(false),
            KeyInput::Down => self.move_selection(true),
            KeyInput::Left => self.close_detail(),
            KeyInput::Right => self.open_selected_detail(),
            KeyInput::ModifierUp => self.step_location(false),
            KeyInput::ModifierDown => self.step_location(true),
            KeyInput::ModifierLeft => self.step_flow_selection(false),
            KeyInput::ModifierRight => self.step_flow_selection(true),
            KeyInput::ModifierReleased => {
                self.cursor.keyboard_active = false;
                Vec::new()
            }
        }
    }

    fn on_intent(&mut self, intent: BrowserIntent<F>) -> Vec<Effect> {
        match intent {
            BrowserIntent::SetFilters(query) => {
                let raw = encode_url(&query, &self.selection_params);
                vec![Effect::PushUrl(raw)]
            }
            BrowserIntent::ToggleFacet(name) => self.on_toggle_facet(&name),
            BrowserIntent::LoadMore => self.on_load_more(),
            BrowserIntent::SelectRecord(key) => {
                if !self.cache.contains(&key) {
                    return Vec::new();
                }
                if self.detail_open() && self.selection_params.open.as_deref() != Some(key.as_str())
                {
                    return vec![self.push_url_with_open(Some(key))];
                }
                self.cursor.select(Some(key));
                Vec::new()
            }
            BrowserIntent::SelectFlow(flow) => {
                self.cursor.flow = flow;
                Vec::new()
            }
            BrowserIntent::SelectLocation(location) => {
                self.cursor.location = location;
                Vec::new()
            }
            BrowserIntent::OpenDetail(key) => vec![self.push_url_with_open(Some(key))],
            BrowserIntent::CloseDetail => self.close_detail(),
            BrowserIntent::ToggleChecked(key) => {
                self.bulk.toggle_one(&key);
                Vec::new()
            }
            BrowserIntent::ToggleCheckAll(checked) => {
                self.bulk.toggle_all(checked, self.cache.keys());
                Vec::new()
            }
            BrowserIntent::RecordUpdated(record) => {
                self.cache.update_record(record);
                Vec::new()
            }
        }
    }

    fn on_toggle_facet(&mut self, name: &str) -> Vec<Effect> {
        let to_fetch = self.facets.toggle(name, &self.query);
        to_fetch
            .into_iter()
            .map(|facet| {
                let token = self.tokens.issue();
                self.facets.begin_fetch(&facet, token);
                debug!(facet = facet.as_str(), token, "issuing facet fetch");
                Effect::FetchFacet {
                    token,
                    request: SearchRequest {
                        filters: self.query.search_filters(),
                        facets: vec![facet.clone()],
                        page: 1,
                        page_size: self.config.facet_probe_page_size,
                        ..Default::default()
                    },
                    facet,
                }
            })
            .collect()
    }

    fn on_load_more(&mut self) -> Vec<Effect> {
        if self.phase != LoadPhase::Ready || !self.cache.has_more() {
            return Vec::new();
        }
        self.phase = LoadPhase::LoadingMore;
        self.load_more_failed = false;
        vec![self.fetch_main(self.cache.next_page(), Vec::new())]
    }

    /// Up/Down without modifier: clamped move over the loaded records.
    /// While a detail view is open the move is a navigation and produces
    /// exactly one URL push; otherwise it stays in memory.
    fn move_selection(&mut self, forward: bool) -> Vec<Effect> {
        let Some(next) = step_record(self.cache.records(), self.cursor.selected.as_deref(), forward)
        else {
            return Vec::new();
        };
        if self.detail_open() {
            if self.selection_params.open.as_ref() != Some(&next) {
                return vec![self.push_url_with_open(Some(next))];
            }
            return Vec::new();
        }
        self.cursor.select(Some(next));
        Vec::new()
    }

    fn close_detail(&mut self) -> Vec<Effect> {
        if !self.detail_open() {
            return Vec::new();
        }
        vec![self.push_url_with_open(None)]
    }

    fn open_selected_detail(&mut self) -> Vec<Effect> {
        if self.detail_open() {
            return Vec::new();
        }
        let Some(selected) = self.cursor.selected.clone() else {
            return Vec::new();
        };
        vec![self.push_url_with_open(Some(selected))]
    }

    fn step_location(&mut self, forward: bool) -> Vec<Effect> {
        self.cursor.keyboard_active = true;
        let Some(key) = self.cursor.selected.clone() else {
            return Vec::new();
        };
        let Some(record) = self.cache.record(&key) else {
            return Vec::new();
        };
        let len = record.flow_locations(self.cursor.flow).len();
        let current = effective_location(record, self.cursor.flow, self.cursor.location);
        self.cursor.location = cycle_location(len, current, forward);
        Vec::new()
    }

    fn step_flow_selection(&mut self, forward: bool) -> Vec<Effect> {
        self.cursor.keyboard_active = true;
        let Some(key) = self.cursor.selected.clone() else {
            return Vec::new();
        };
        let Some(record) = self.cache.record(&key) else {
            return Vec::new();
        };
        let count = record.flows.len();
        // The stored location index survives the flow change; reads treat
        // an out-of-range index as no selection.
        self.cursor.flow = step_flow(count, self.cursor.flow, forward);
        Vec::new()
    }

    fn push_url_with_open(&mut self, open: Option<RecordKey>) -> Effect {
        let selection = SelectionParams {
            open,
            flow: None,
            location: None,
        };
        Effect::PushUrl(encode_url(&self.query, &selection))
    }

    fn install_facet_payloads(&mut self, payloads: &[FacetPayload]) {
        for payload in payloads {
            self.facets.install_counts(&payload.name, &payload.buckets);
        }
    }

    /// Derive the cursor from the cache and the URL's open record: the
    /// open record when loaded, else the previous selection when still
    /// loaded, else the first record.
    fn reconcile_cursor(&mut self) {
        let open_target = self
            .selection_params
            .open
            .as_ref()
            .filter(|key| self.cache.contains(key))
            .cloned();
        let selected = match open_target {
            Some(key) => Some(key),
            None => self
                .cursor
                .selected
                .clone()
                .filter(|key| self.cache.contains(key))
                .or_else(|| self.cache.records().first().map(|record| record.key.clone())),
        };
        let changed = self.cursor.selected != selected;
        self.cursor.select(selected.clone());
        if changed && selected.is_some() && selected == self.selection_params.open {
            self.cursor.flow = self.selection_params.flow;
            self.cursor.location = self.selection_params.location;
        }
    }
}
