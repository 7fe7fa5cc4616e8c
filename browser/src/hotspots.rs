use std::collections::BTreeMap;

use serde::Serialize;
use strum_macros::Display;
use strum_macros::EnumString;

use crate::facets::CompositeFacet;
use crate::query::FilterQuery;
use crate::query::RawQuery;
use crate::query::join_list;
use crate::query::parse_bool;
use crate::query::parse_list;
use crate::query::parse_scalar;
use crate::query::set_bool;

pub const SECURITY_CATEGORIES_FACET: &str = "security_categories";
pub const FILES_FACET: &str = "files";

const STATUS_KEY: &str = "status";
const RESOLUTION_KEY: &str = "resolution";
const ASSIGNED_TO_ME_KEY: &str = "assigned_to_me";
const IN_NEW_CODE_PERIOD_KEY: &str = "in_new_code_period";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HotspotStatus {
    #[default]
    ToReview,
    Reviewed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HotspotResolution {
    Fixed,
    Safe,
    Acknowledged,
}

/// Filter state of the security-hotspots browser.
///
/// The default query shows hotspots awaiting review, which encodes to an
/// empty URL.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HotspotQuery {
    pub status: HotspotStatus,
    /// Only meaningful for reviewed hotspots; ignored by the server while
    /// `status` is `TO_REVIEW`.
    pub resolution: Option<HotspotResolution>,
    pub security_categories: Vec<String>,
    pub files: Vec<String>,
    pub assigned_to_me: bool,
    pub in_new_code_period: bool,
}

impl FilterQuery for HotspotQuery {
    fn decode(raw: &RawQuery) -> Self {
        Self {
            status: parse_scalar(raw, STATUS_KEY).unwrap_or_default(),
            resolution: parse_scalar(raw, RESOLUTION_KEY),
            security_categories: parse_list(raw, SECURITY_CATEGORIES_FACET),
            files: parse_list(raw, FILES_FACET),
            assigned_to_me: parse_bool(raw, ASSIGNED_TO_ME_KEY, false),
            in_new_code_period: parse_bool(raw, IN_NEW_CODE_PERIOD_KEY, false),
        }
    }

    fn encode(&self) -> RawQuery {
        let mut raw = RawQuery::new();
        if self.status != HotspotStatus::default() {
            raw.set(STATUS_KEY, &self.status.to_string());
        }
        if let Some(resolution) = self.resolution {
            raw.set(RESOLUTION_KEY, &resolution.to_string());
        }
        raw.set(SECURITY_CATEGORIES_FACET, &join_list(&self.security_categories));
        raw.set(FILES_FACET, &join_list(&self.files));
        set_bool(&mut raw, ASSIGNED_TO_ME_KEY, self.assigned_to_me, false);
        set_bool(&mut raw, IN_NEW_CODE_PERIOD_KEY, self.in_new_code_period, false);
        raw
    }

    fn search_filters(&self) -> BTreeMap<String, String> {
        let mut filters = BTreeMap::new();
        filters.insert(STATUS_KEY.to_string(), self.status.to_string());
        if let Some(resolution) = self.resolution {
            filters.insert(RESOLUTION_KEY.to_string(), resolution.to_string());
        }
        if !self.security_categories.is_empty() {
            filters.insert(
                SECURITY_CATEGORIES_FACET.to_string(),
                join_list(&self.security_categories),
            );
        }
        if !self.files.is_empty() {
            filters.insert(FILES_FACET.to_string(), join_list(&self.files));
        }
        if self.assigned_to_me {
            filters.insert(ASSIGNED_TO_ME_KEY.to_string(), "true".to_string());
        }
        if self.in_new_code_period {
            filters.insert(IN_NEW_CODE_PERIOD_KEY.to_string(), "true".to_string());
        }
        filters
    }

    fn filter_active(&self, facet: &str) -> bool {
        match facet {
            SECURITY_CATEGORIES_FACET => !self.security_categories.is_empty(),
            FILES_FACET => !self.files.is_empty(),
            _ => false,
        }
    }
}

/// Facet names the hotspots browser displays, in sidebar order.
pub fn hotspot_facets() -> Vec<String> {
    vec![
        SECURITY_CATEGORIES_FACET.to_string(),
        FILES_FACET.to_string(),
    ]
}

/// The hotspots sidebar has no composite facets.
pub fn hotspot_composites() -> Vec<CompositeFacet> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::queries_equal;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_url_decodes_to_review_queue() {
        let query = HotspotQuery::decode(&RawQuery::new());
        assert_eq!(query.status, HotspotStatus::ToReview);
        assert!(query.encode().is_empty());
    }

    #[test]
    fn status_always_reaches_the_server() {
        let filters = HotspotQuery::default().search_filters();
        assert_eq!(filters.get("status").map(String::as_str), Some("TO_REVIEW"));
    }

    #[test]
    fn reviewed_with_resolution_round_trips() {
        let query = HotspotQuery {
            status: HotspotStatus::Reviewed,
            resolution: Some(HotspotResolution::Safe),
            security_categories: vec!["sql-injection".to_string()],
            ..Default::default()
        };
        let raw = query.encode();
        assert_eq!(raw.get("status"), Some("REVIEWED"));
        assert_eq!(raw.get("resolution"), Some("SAFE"));
        let decoded = HotspotQuery::decode(&raw);
        assert!(queries_equal(&query, &decoded));
    }

    #[test]
    fn junk_status_falls_back_to_default() {
        let raw = RawQuery::from_query_string("status=NONSENSE");
        let query = HotspotQuery::decode(&raw);
        assert_eq!(query.status, HotspotStatus::ToReview);
    }
}
