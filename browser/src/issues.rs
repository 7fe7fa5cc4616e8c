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

pub const SEVERITIES_FACET: &str = "severities";
pub const TYPES_FACET: &str = "types";
pub const RULES_FACET: &str = "rules";
pub const TAGS_FACET: &str = "tags";
pub const LANGUAGES_FACET: &str = "languages";
pub const ASSIGNEES_FACET: &str = "assignees";
pub const CWE_FACET: &str = "cwe";
pub const OWASP_FACET: &str = "owasp";
/// Composite parent grouping the security-standard dimensions.
pub const STANDARDS_FACET: &str = "standards";

const RESOLVED_KEY: &str = "resolved";
const ASSIGNED_TO_ME_KEY: &str = "assigned_to_me";
const CREATED_AFTER_KEY: &str = "created_after";
const SORT_KEY: &str = "sort";
const ASC_KEY: &str = "asc";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Minor,
    Major,
    Critical,
    Blocker,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    CodeSmell,
    Bug,
    Vulnerability,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueSortField {
    CreationDate,
    UpdateDate,
    Severity,
    Status,
}

/// Filter state of the issues browser.
///
/// The default query means "unresolved issues, server-side ordering", which
/// encodes to an empty URL.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IssueQuery {
    /// `false` restricts the result set to unresolved issues.
    pub resolved: bool,
    pub severities: Vec<Severity>,
    pub types: Vec<IssueType>,
    pub rules: Vec<String>,
    pub tags: Vec<String>,
    pub languages: Vec<String>,
    pub assignees: Vec<String>,
    pub assigned_to_me: bool,
    pub created_after: Option<String>,
    pub cwe: Vec<String>,
    pub owasp: Vec<String>,
    pub sort_field: Option<IssueSortField>,
    /// Only encoded while a sort field is set.
    pub asc: bool,
}

impl Default for IssueQuery {
    fn default() -> Self {
        Self {
            resolved: false,
            severities: Vec::new(),
            types: Vec::new(),
            rules: Vec::new(),
            tags: Vec::new(),
            languages: Vec::new(),
            assignees: Vec::new(),
            assigned_to_me: false,
            created_after: None,
            cwe: Vec::new(),
            owasp: Vec::new(),
            sort_field: None,
            asc: true,
        }
    }
}

impl FilterQuery for IssueQuery {
    fn decode(raw: &RawQuery) -> Self {
        Self {
            resolved: parse_bool(raw, RESOLVED_KEY, false),
            severities: parse_list(raw, SEVERITIES_FACET),
            types: parse_list(raw, TYPES_FACET),
            rules: parse_list(raw, RULES_FACET),
            tags: parse_list(raw, TAGS_FACET),
            languages: parse_list(raw, LANGUAGES_FACET),
            assignees: parse_list(raw, ASSIGNEES_FACET),
            assigned_to_me: parse_bool(raw, ASSIGNED_TO_ME_KEY, false),
            created_after: raw.get(CREATED_AFTER_KEY).map(str::to_string),
            cwe: parse_list(raw, CWE_FACET),
            owasp: parse_list(raw, OWASP_FACET),
            sort_field: parse_scalar(raw, SORT_KEY),
            asc: parse_bool(raw, ASC_KEY, true),
        }
    }

    fn encode(&self) -> RawQuery {
        let mut raw = RawQuery::new();
        set_bool(&mut raw, RESOLVED_KEY, self.resolved, false);
        raw.set(SEVERITIES_FACET, &join_list(&self.severities));
        raw.set(TYPES_FACET, &join_list(&self.types));
        raw.set(RULES_FACET, &join_list(&self.rules));
        raw.set(TAGS_FACET, &join_list(&self.tags));
        raw.set(LANGUAGES_FACET, &join_list(&self.languages));
        raw.set(ASSIGNEES_FACET, &join_list(&self.assignees));
        set_bool(&mut raw, ASSIGNED_TO_ME_KEY, self.assigned_to_me, false);
        if let Some(created_after) = &self.created_after {
            raw.set(CREATED_AFTER_KEY, created_after);
        }
        raw.set(CWE_FACET, &join_list(&self.cwe));
        raw.set(OWASP_FACET, &join_list(&self.owasp));
        if let Some(sort_field) = self.sort_field {
            raw.set(SORT_KEY, &sort_field.to_string());
            set_bool(&mut raw, ASC_KEY, self.asc, true);
        }
        raw
    }

    fn search_filters(&self) -> BTreeMap<String, String> {
        let mut filters = BTreeMap::new();
        // The server defaults to all issues, so the resolved restriction is
        // always sent even though the URL omits it.
        filters.insert(RESOLVED_KEY.to_string(), self.resolved.to_string());
        insert_list(&mut filters, SEVERITIES_FACET, &self.severities);
        insert_list(&mut filters, TYPES_FACET, &self.types);
        insert_list(&mut filters, RULES_FACET, &self.rules);
        insert_list(&mut filters, TAGS_FACET, &self.tags);
        insert_list(&mut filters, LANGUAGES_FACET, &self.languages);
        insert_list(&mut filters, ASSIGNEES_FACET, &self.assignees);
        if self.assigned_to_me {
            filters.insert(ASSIGNED_TO_ME_KEY.to_string(), "true".to_string());
        }
        if let Some(created_after) = &self.created_after {
            filters.insert(CREATED_AFTER_KEY.to_string(), created_after.clone());
        }
        insert_list(&mut filters, CWE_FACET, &self.cwe);
        insert_list(&mut filters, OWASP_FACET, &self.owasp);
        if let Some(sort_field) = self.sort_field {
            filters.insert(SORT_KEY.to_string(), sort_field.to_string());
            filters.insert(ASC_KEY.to_string(), self.asc.to_string());
        }
        filters
    }

    fn filter_active(&self, facet: &str) -> bool {
        match facet {
            SEVERITIES_FACET => !self.severities.is_empty(),
            TYPES_FACET => !self.types.is_empty(),
            RULES_FACET => !self.rules.is_empty(),
            TAGS_FACET => !self.tags.is_empty(),
            LANGUAGES_FACET => !self.languages.is_empty(),
            ASSIGNEES_FACET => !self.assignees.is_empty() || self.assigned_to_me,
            CWE_FACET => !self.cwe.is_empty(),
            OWASP_FACET => !self.owasp.is_empty(),
            STANDARDS_FACET => !self.cwe.is_empty() || !self.owasp.is_empty(),
            _ => false,
        }
    }
}

/// Facet names the issues browser displays, in sidebar order.
pub fn issue_facets() -> Vec<String> {
    [
        TYPES_FACET,
        SEVERITIES_FACET,
        RULES_FACET,
        TAGS_FACET,
        LANGUAGES_FACET,
        ASSIGNEES_FACET,
        STANDARDS_FACET,
        CWE_FACET,
        OWASP_FACET,
    ]
    .iter()
    .map(|name| (*name).to_string())
    .collect()
}

/// The standards facet expands into its child dimensions.
pub fn issue_composites() -> Vec<CompositeFacet> {
    vec![CompositeFacet {
        parent: STANDARDS_FACET.to_string(),
        children: vec![CWE_FACET.to_string(), OWASP_FACET.to_string()],
    }]
}

fn insert_list<T: std::fmt::Display>(
    filters: &mut BTreeMap<String, String>,
    key: &str,
    items: &[T],
) {
    if !items.is_empty() {
        filters.insert(key.to_string(), join_list(items));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::queries_equal;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_url_decodes_to_default() {
        let raw = RawQuery::new();
        assert_eq!(IssueQuery::decode(&raw), IssueQuery::default());
    }

    #[test]
    fn default_encodes_to_empty_url() {
        let raw = IssueQuery::default().encode();
        assert!(raw.is_empty(), "got {raw}");
    }

    #[test]
    fn default_still_sends_resolved_filter() {
        let filters = IssueQuery::default().search_filters();
        assert_eq!(filters.get("resolved").map(String::as_str), Some("false"));
    }

    #[test]
    fn encode_decode_round_trips() {
        let query = IssueQuery {
            severities: vec![Severity::Major, Severity::Blocker],
            types: vec![IssueType::Bug],
            tags: vec!["convention".to_string()],
            assigned_to_me: true,
            sort_field: Some(IssueSortField::CreationDate),
            asc: false,
            ..Default::default()
        };
        let decoded = IssueQuery::decode(&query.encode());
        assert!(queries_equal(&query, &decoded));
        assert_eq!(decoded, query);
    }

    #[test]
    fn unknown_keys_are_discarded() {
        let raw = RawQuery::from_query_string("severities=MAJOR&mystery=42");
        let query = IssueQuery::decode(&raw);
        assert_eq!(query.severities, vec![Severity::Major]);
        assert!(query.encode().get("mystery").is_none());
    }

    #[test]
    fn junk_list_elements_are_dropped() {
        let raw = RawQuery::from_query_string("severities=MAJOR,BOGUS,MINOR");
        let query = IssueQuery::decode(&raw);
        assert_eq!(query.severities, vec![Severity::Major, Severity::Minor]);
    }

    #[test]
    fn asc_only_encoded_with_sort_field() {
        let query = IssueQuery {
            asc: false,
            ..Default::default()
        };
        assert!(query.encode().is_empty());
        let sorted = IssueQuery {
            sort_field: Some(IssueSortField::Severity),
            asc: false,
            ..Default::default()
        };
        let raw = sorted.encode();
        assert_eq!(raw.get("sort"), Some("SEVERITY"));
        assert_eq!(raw.get("asc"), Some("false"));
    }

    #[test]
    fn standards_parent_tracks_child_dimensions() {
        let query = IssueQuery {
            cwe: vec!["89".to_string()],
            ..Default::default()
        };
        assert!(query.filter_active(STANDARDS_FACET));
        assert!(query.filter_active(CWE_FACET));
        assert!(!query.filter_active(OWASP_FACET));
    }
}
