use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use triage_protocol::FacetBucket;

use crate::query::FilterQuery;
use crate::tokens::RequestToken;

/// A facet parent that expands into separately fetched child dimensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeFacet {
    pub parent: String,
    pub children: Vec<String>,
}

/// Read-only view of one facet as the rendering layer sees it.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FacetSnapshot {
    pub open: bool,
    pub loading: bool,
    pub fetch_failed: bool,
    /// `None` until the first targeted fetch resolves.
    pub counts: Option<IndexMap<String, u64>>,
}

#[derive(Clone, Debug, Default)]
struct FacetState {
    open: bool,
    loading: bool,
    fetch_failed: bool,
    counts: Option<IndexMap<String, u64>>,
    latest_token: Option<RequestToken>,
}

/// Per-facet open/loading flags plus cached value counts.
///
/// Counts are replaced wholesale, never merged, and only when the response
/// token is still the latest issued for that facet.
#[derive(Clone, Debug, Default)]
pub struct FacetStore {
    facets: IndexMap<String, FacetState>,
    composites: Vec<CompositeFacet>,
}

impl FacetStore {
    pub fn new(names: impl IntoIterator<Item = String>, composites: Vec<CompositeFacet>) -> Self {
        let facets = names
            .into_iter()
            .map(|name| (name, FacetState::default()))
            .collect();
        Self { facets, composites }
    }

    /// Flip one facet open or closed. Returns the facet names that now need
    /// a targeted count fetch: the toggled facet itself when it opens
    /// without cached counts, plus any composite children auto-opened
    /// because the query already filters on their dimension. Composite
    /// parents aggregate their children and are never fetched directly.
    pub fn toggle<F: FilterQuery>(&mut self, name: &str, query: &F) -> Vec<String> {
        let is_parent = self.is_composite_parent(name);
        let Some(state) = self.facets.get_mut(name) else {
            return Vec::new();
        };
        state.open = !state.open;
        if !state.open {
            return Vec::new();
        }

        let mut to_fetch = Vec::new();
        if !is_parent && state.counts.is_none() && !state.loading {
            to_fetch.push(name.to_string());
        }
        for child in self.composite_children(name) {
            if !query.filter_active(&child) {
                continue;
            }
            if let Some(child_state) = self.facets.get_mut(&child) {
                if !child_state.open {
                    child_state.open = true;
                    if child_state.counts.is_none() && !child_state.loading {
                        to_fetch.push(child);
                    }
                }
            }
        }
        to_fetch
    }

    /// Mark a targeted fetch as in flight. Supersedes any earlier token for
    /// the same facet.
    pub fn begin_fetch(&mut self, name: &str, token: RequestToken) {
        if let Some(state) = self.facets.get_mut(name) {
            state.loading = true;
            state.fetch_failed = false;
            state.latest_token = Some(token);
        }
    }

    /// Install counts from a targeted fetch. Returns false when the token
    /// is no longer current and the response was dropped.
    pub fn apply_counts(
        &mut self,
        name: &str,
        token: RequestToken,
        buckets: &[FacetBucket],
    ) -> bool {
        let Some(state) = self.facets.get_mut(name) else {
            return false;
        };
        if state.latest_token != Some(token) {
            debug!(facet = name, token, "dropping stale facet counts");
            return false;
        }
        state.loading = false;
        state.fetch_failed = false;
        state.counts = Some(bucket_counts(buckets));
        true
    }

    /// Record a targeted fetch failure. Token-gated like `apply_counts` so
    /// a superseded failure cannot clear a newer fetch's loading flag.
    pub fn fail(&mut self, name: &str, token: RequestToken) -> bool {
        let Some(state) = self.facets.get_mut(name) else {
            return false;
        };
        if state.latest_token != Some(token) {
            debug!(facet = name, token, "dropping stale facet failure");
            return false;
        }
        state.loading = false;
        state.fetch_failed = true;
        true
    }

    /// Install counts that arrived with the main record fetch. The main
    /// fetch has its own ordering guard, so no facet token is involved.
    pub fn install_counts(&mut self, name: &str, buckets: &[FacetBucket]) {
        if let Some(state) = self.facets.get_mut(name) {
            state.loading = false;
            state.fetch_failed = false;
            state.counts = Some(bucket_counts(buckets));
        }
    }

    /// Drop every cached count while keeping open/closed flags, so a filter
    /// change re-requests counts for whatever is expanded.
    pub fn invalidate_counts(&mut self) {
        for state in self.facets.values_mut() {
            state.counts = None;
            state.loading = false;
            state.fetch_failed = false;
            state.latest_token = None;
        }
    }

    /// Open facets that want counts from the next main fetch. Composite
    /// parents aggregate children and have no counts of their own.
    pub fn open_facets(&self) -> Vec<String> {
        self.facets
            .iter()
            .filter(|(name, state)| state.open && !self.is_composite_parent(name))
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.facets.get(name).is_some_and(|state| state.open)
    }

    pub fn counts(&self, name: &str) -> Option<&IndexMap<String, u64>> {
        self.facets.get(name).and_then(|state| state.counts.as_ref())
    }

    pub fn snapshot(&self) -> IndexMap<String, FacetSnapshot> {
        self.facets
            .iter()
            .map(|(name, state)| {
                (
                    name.clone(),
                    FacetSnapshot {
                        open: state.open,
                        loading: state.loading,
                        fetch_failed: state.fetch_failed,
                        counts: state.counts.clone(),
                    },
                )
            })
            .collect()
    }

    fn composite_children(&self, parent: &str) -> Vec<String> {
        self.composites
            .iter()
            .find(|composite| composite.parent == parent)
            .map(|composite| composite.children.clone())
            .unwrap_or_default()
    }

    fn is_composite_parent(&self, name: &str) -> bool {
        self.composites
            .iter()
            .any(|composite| composite.parent == name)
    }
}

fn bucket_counts(buckets: &[FacetBucket]) -> IndexMap<String, u64> {
    buckets
        .iter()
        .map(|bucket| (bucket.value.clone(), bucket.count))
        .collect()
}
