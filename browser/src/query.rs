use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use triage_protocol::RecordKey;

/// Raw query key holding the open record, kept out of every filter codec.
pub const OPEN_KEY: &str = "open";
/// Raw query key for the selected flow index.
pub const FLOW_KEY: &str = "flow";
/// Raw query key for the selected location index.
pub const LOCATION_KEY: &str = "location";

/// The flat string form of a browser URL query.
///
/// Keys are held in a `BTreeMap`, so two raw queries with the same contents
/// compare equal no matter the order the keys were inserted in. Values are
/// stored already percent-decoded; escaping for transport is the router's
/// concern.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RawQuery(BTreeMap<String, String>);

impl RawQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `k=v&k=v` query string. Empty pairs and empty values are
    /// dropped, matching the absent-filter convention.
    pub fn from_query_string(input: &str) -> Self {
        let mut raw = Self::new();
        for pair in input.split('&') {
            if pair.is_empty() {
                continue;
            }
            let mut parts = pair.splitn(2, '=');
            let key = parts.next().unwrap_or_default();
            let value = parts.next().unwrap_or_default();
            raw.set(key, value);
        }
        raw
    }

    /// Render back to a `k=v&k=v` string with keys in canonical order.
    pub fn to_query_string(&self) -> String {
        self.0
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Insert a key. An empty value means "absent" and is not stored.
    pub fn set(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        self.0.insert(key.to_string(), value.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for RawQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_query_string())
    }
}

/// A typed filter query, isomorphic to the raw URL form.
///
/// Laws every implementation upholds:
/// - `decode` is total: absent keys take their documented default, unknown
///   keys are discarded, malformed values fall back to the default.
/// - `encode` omits every field equal to its default; an empty collection
///   encodes as an absent key.
/// - `decode(&q.encode())` is equivalent to `q` under [`queries_equal`].
pub trait FilterQuery: Clone + Default + PartialEq + Send + Sync + 'static {
    fn decode(raw: &RawQuery) -> Self;

    fn encode(&self) -> RawQuery;

    /// The key/value map handed to the search endpoint. Unlike `encode`,
    /// this keeps defaults the server must see (e.g. `resolved=false`).
    fn search_filters(&self) -> BTreeMap<String, String>;

    /// Whether the query currently carries a non-empty value for the given
    /// facet dimension. Drives composite-facet child auto-opening.
    fn filter_active(&self, facet: &str) -> bool;
}

/// Query equality as the browser controller sees it: two queries are the
/// same exactly when their encoded forms are, independent of key order.
pub fn queries_equal<F: FilterQuery>(a: &F, b: &F) -> bool {
    a.encode() == b.encode()
}

/// The selection part of the URL, shared by every browser instantiation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SelectionParams {
    pub open: Option<RecordKey>,
    pub flow: Option<usize>,
    pub location: Option<usize>,
}

impl SelectionParams {
    pub fn decode(raw: &RawQuery) -> Self {
        Self {
            open: raw.get(OPEN_KEY).map(str::to_string),
            flow: parse_index(raw, FLOW_KEY),
            location: parse_index(raw, LOCATION_KEY),
        }
    }

    pub fn encode_into(&self, raw: &mut RawQuery) {
        if let Some(open) = &self.open {
            raw.set(OPEN_KEY, open);
        }
        if let Some(flow) = self.flow {
            raw.set(FLOW_KEY, &flow.to_string());
        }
        if let Some(location) = self.location {
            raw.set(LOCATION_KEY, &location.to_string());
        }
    }
}

/// Assemble the full URL form: encoded filters plus selection keys.
pub fn encode_url<F: FilterQuery>(filters: &F, selection: &SelectionParams) -> RawQuery {
    let mut raw = filters.encode();
    selection.encode_into(&mut raw);
    raw
}

/// Split a raw URL into its typed filter query and selection part.
pub fn decode_url<F: FilterQuery>(raw: &RawQuery) -> (F, SelectionParams) {
    (F::decode(raw), SelectionParams::decode(raw))
}

fn parse_index(raw: &RawQuery, key: &str) -> Option<usize> {
    raw.get(key).and_then(|value| value.parse().ok())
}

/// Parse a comma-joined list value into typed elements, dropping any
/// element that fails to parse.
pub fn parse_list<T: FromStr>(raw: &RawQuery, key: &str) -> Vec<T> {
    match raw.get(key) {
        Some(value) => value
            .split(',')
            .filter(|item| !item.is_empty())
            .filter_map(|item| item.parse().ok())
            .collect(),
        None => Vec::new(),
    }
}

/// Parse a boolean value, falling back to the default on absence or junk.
pub fn parse_bool(raw: &RawQuery, key: &str, default: bool) -> bool {
    match raw.get(key) {
        Some("true") => true,
        Some("false") => false,
        _ => default,
    }
}

/// Parse a single enum-like value, falling back to the default on junk.
pub fn parse_scalar<T: FromStr>(raw: &RawQuery, key: &str) -> Option<T> {
    raw.get(key).and_then(|value| value.parse().ok())
}

/// Comma-join list elements for the raw form. Empty lists yield an empty
/// string, which [`RawQuery::set`] treats as absent.
pub fn join_list<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Encode a boolean only when it differs from its default.
pub fn set_bool(raw: &mut RawQuery, key: &str, value: bool, default: bool) {
    if value != default {
        raw.set(key, if value { "true" } else { "false" });
    }
}
