//! Filter criteria and the query-string builder shared by every list endpoint.
//!
//! Serialization only knows about declared fields: each filter type writes its
//! parameters in a fixed order, so two filters with the same values always
//! produce the same query string and therefore the same cache key.

use jiff::{Timestamp, civil::Date};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A single page of a collection response.
///
/// `results` keeps the server's order. `total_count` is only present when it
/// was requested and covers the whole matching set, not just this page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    pub results: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

impl<T> PageResult<T> {
    pub fn new(results: Vec<T>, total_count: Option<u64>) -> Self {
        Self {
            results,
            total_count,
        }
    }
}

impl<T> Default for PageResult<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            total_count: None,
        }
    }
}

/// Response representation selector (the `v` parameter).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Representation {
    Default,
    Full,
    Ref,
    /// A custom field list, e.g. `Custom("uuid,display".into())` becomes
    /// `custom:(uuid,display)`.
    Custom(String),
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Full => f.write_str("full"),
            Self::Ref => f.write_str("ref"),
            Self::Custom(fields) => write!(f, "custom:({fields})"),
        }
    }
}

/// Sort order; descending fields are sent with a leading `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sort {
    pub field: String,
    pub descending: bool,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    /// Parse the wire form back into a sort order.
    pub fn parse(value: &str) -> Option<Self> {
        let (field, descending) = match value.strip_prefix('-') {
            Some(field) => (field, true),
            None => (value, false),
        };
        if field.is_empty() {
            return None;
        }
        Some(Self {
            field: field.to_string(),
            descending,
        })
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-{}", self.field)
        } else {
            f.write_str(&self.field)
        }
    }
}

/// Base criteria every list query carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterCriteria {
    /// Zero-based offset of the first row.
    pub start_index: Option<u32>,
    /// Page size.
    pub limit: Option<u32>,
    /// Free-text search token.
    pub q: Option<String>,
    pub v: Option<Representation>,
    /// Ask the server to compute the full matching row count.
    pub total_count: Option<bool>,
    pub sort: Option<Sort>,
}

impl FilterCriteria {
    pub fn page(start_index: u32, limit: u32) -> Self {
        Self {
            start_index: Some(start_index),
            limit: Some(limit),
            ..Default::default()
        }
    }

    pub fn with_q(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    pub fn with_v(mut self, v: Representation) -> Self {
        self.v = Some(v);
        self
    }

    pub fn with_total_count(mut self) -> Self {
        self.total_count = Some(true);
        self
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// Conversion of a scalar into its query parameter text.
pub trait QueryValue {
    fn to_query_value(&self) -> String;
}

impl QueryValue for str {
    fn to_query_value(&self) -> String {
        self.to_string()
    }
}

impl<T: QueryValue + ?Sized> QueryValue for &T {
    fn to_query_value(&self) -> String {
        (**self).to_query_value()
    }
}

impl QueryValue for String {
    fn to_query_value(&self) -> String {
        self.clone()
    }
}

impl QueryValue for bool {
    fn to_query_value(&self) -> String {
        if *self { "true" } else { "false" }.to_string()
    }
}

impl QueryValue for u32 {
    fn to_query_value(&self) -> String {
        self.to_string()
    }
}

impl QueryValue for u64 {
    fn to_query_value(&self) -> String {
        self.to_string()
    }
}

impl QueryValue for i64 {
    fn to_query_value(&self) -> String {
        self.to_string()
    }
}

/// Day granularity: `YYYY-MM-DD`.
impl QueryValue for Date {
    fn to_query_value(&self) -> String {
        self.to_string()
    }
}

/// Instant granularity: RFC 3339 in UTC.
impl QueryValue for Timestamp {
    fn to_query_value(&self) -> String {
        self.to_string()
    }
}

impl QueryValue for Uuid {
    fn to_query_value(&self) -> String {
        self.to_string()
    }
}

impl QueryValue for Representation {
    fn to_query_value(&self) -> String {
        self.to_string()
    }
}

impl QueryValue for Sort {
    fn to_query_value(&self) -> String {
        self.to_string()
    }
}

/// Ordered query parameters. Pairs come out in the order they were pushed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(&'static str, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a parameter unless it is unset or renders as an empty string.
    pub fn push<V: QueryValue + ?Sized>(
        &mut self,
        key: &'static str,
        value: Option<&V>,
    ) -> &mut Self {
        if let Some(value) = value {
            let value = value.to_query_value();
            if !value.is_empty() {
                self.pairs.push((key, value));
            }
        }
        self
    }

    /// Push a multi-value parameter as a single comma-joined value.
    pub fn push_list<V: QueryValue>(
        &mut self,
        key: &'static str,
        values: &[V],
    ) -> &mut Self {
        let joined = values
            .iter()
            .map(QueryValue::to_query_value)
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(",");
        if !joined.is_empty() {
            self.pairs.push((key, joined));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// `""` when empty, otherwise `?k=v&k=v` with values percent-encoded.
    pub fn to_query_string(&self) -> String {
        if self.pairs.is_empty() {
            return String::new();
        }
        let body = self
            .pairs
            .iter()
            .map(|(k, v)| format!("{k}={}", encode_component(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("?{body}")
    }
}

/// Filters that can be serialized to a query string.
pub trait ToQueryParams {
    /// Write the declared fields, base criteria first.
    fn write_query_params(&self, params: &mut QueryParams);

    fn query_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        self.write_query_params(&mut params);
        params
    }

    fn to_query_string(&self) -> String {
        self.query_params().to_query_string()
    }
}

impl ToQueryParams for FilterCriteria {
    fn write_query_params(&self, params: &mut QueryParams) {
        params
            .push("startIndex", self.start_index.as_ref())
            .push("limit", self.limit.as_ref())
            .push("q", self.q.as_deref())
            .push("v", self.v.as_ref())
            .push("totalCount", self.total_count.as_ref())
            .push("sort", self.sort.as_ref());
    }
}

/// A list filter built on the base criteria.
pub trait Filter: ToQueryParams + Clone + PartialEq + 'static {
    fn criteria(&self) -> &FilterCriteria;
    fn criteria_mut(&mut self) -> &mut FilterCriteria;
}

impl Filter for FilterCriteria {
    fn criteria(&self) -> &FilterCriteria {
        self
    }

    fn criteria_mut(&mut self) -> &mut FilterCriteria {
        self
    }
}

/// Everything `encodeURIComponent` escapes: all but ASCII alphanumerics and
/// `- _ . ! ~ * ' ( )`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a value the way `encodeURIComponent` does.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Identity of a cached request: resource path plus serialized query.
///
/// The key is also the request target relative to the REST root, so a
/// fetcher can issue `GET <root>/<key>` directly.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display,
)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(path: &str, filter: &impl ToQueryParams) -> Self {
        Self(format!("{path}{}", filter.to_query_string()))
    }

    /// Key for a path with no query.
    pub fn for_path(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path part, without the query string.
    pub fn path(&self) -> &str {
        self.0.split_once('?').map_or(&self.0, |(path, _)| path)
    }

    /// Whether this key belongs to the collection at `path`: the collection
    /// itself, any query over it, or any entity below it.
    pub fn is_under(&self, path: &str) -> bool {
        let path = path.trim_end_matches('/');
        match self.0.strip_prefix(path) {
            Some(rest) => {
                rest.is_empty() || rest.starts_with('?') || rest.starts_with('/')
            }
            None => false,
        }
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_fields_are_omitted() {
        let filter = FilterCriteria {
            start_index: Some(0),
            limit: Some(10),
            q: None,
            ..Default::default()
        };
        assert_eq!(filter.to_query_string(), "?startIndex=0&limit=10");
    }

    #[test]
    fn empty_filter_serializes_to_empty_string() {
        assert_eq!(FilterCriteria::default().to_query_string(), "");

        let blank_search = FilterCriteria {
            q: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(blank_search.to_query_string(), "");
    }

    #[test]
    fn base_fields_follow_declared_order() {
        let filter = FilterCriteria::default()
            .with_sort(Sort::desc("dateCreated"))
            .with_total_count()
            .with_v(Representation::Full)
            .with_q("cbc");
        let filter = FilterCriteria {
            start_index: Some(20),
            limit: Some(5),
            ..filter
        };
        assert_eq!(
            filter.to_query_string(),
            "?startIndex=20&limit=5&q=cbc&v=full&totalCount=true&sort=-dateCreated"
        );
    }

    #[test]
    fn values_are_percent_encoded() {
        let filter = FilterCriteria::default().with_q("full blood & count");
        assert_eq!(filter.to_query_string(), "?q=full%20blood%20%26%20count");

        let custom = FilterCriteria::default()
            .with_v(Representation::Custom("uuid,display".into()));
        assert_eq!(custom.to_query_string(), "?v=custom%3A(uuid%2Cdisplay)");
    }

    #[test]
    fn encoding_matches_encode_uri_component() {
        assert_eq!(encode_component("a-b_c.d!e~f*g'h(i)j"), "a-b_c.d!e~f*g'h(i)j");
        assert_eq!(encode_component("a/b?c=d"), "a%2Fb%3Fc%3Dd");
        assert_eq!(encode_component("é"), "%C3%A9");
        assert_eq!(encode_component("a b+c"), "a%20b%2Bc");
    }

    #[test]
    fn dates_use_their_declared_granularity() {
        let mut params = QueryParams::new();
        let date: Date = "2025-03-04".parse().unwrap();
        let ts: Timestamp = "2025-03-04T05:06:07Z".parse().unwrap();
        params.push("day", Some(&date)).push("at", Some(&ts));
        assert_eq!(params.get("day"), Some("2025-03-04"));
        assert_eq!(params.get("at"), Some("2025-03-04T05:06:07Z"));
    }

    #[test]
    fn lists_are_comma_joined_and_empty_lists_skipped() {
        let mut params = QueryParams::new();
        params
            .push_list("status", &["PENDING", "", "IN_PROGRESS"])
            .push_list::<String>("none", &[]);
        assert_eq!(params.to_query_string(), "?status=PENDING%2CIN_PROGRESS");
    }

    #[test]
    fn identical_filters_give_identical_keys() {
        let built = FilterCriteria::page(0, 10).with_q("hiv");
        let mut assigned = FilterCriteria::default();
        assigned.q = Some("hiv".into());
        assigned.limit = Some(10);
        assigned.start_index = Some(0);

        assert_eq!(
            CacheKey::new("labmanagement/testconfig", &built),
            CacheKey::new("labmanagement/testconfig", &assigned)
        );
    }

    #[test]
    fn cache_key_prefix_matching() {
        let key = CacheKey::new(
            "labmanagement/worksheet",
            &FilterCriteria::page(0, 10),
        );
        assert!(key.is_under("labmanagement/worksheet"));
        assert!(key.is_under("labmanagement/worksheet/"));
        assert!(!key.is_under("labmanagement/work"));
        assert_eq!(key.path(), "labmanagement/worksheet");

        let entity = CacheKey::for_path("labmanagement/worksheet/abc");
        assert!(entity.is_under("labmanagement/worksheet"));
        assert!(!entity.is_under("labmanagement/worksheetimport"));
    }

    #[test]
    fn sort_round_trips_through_wire_form() {
        assert_eq!(Sort::parse("-name"), Some(Sort::desc("name")));
        assert_eq!(Sort::parse("name"), Some(Sort::asc("name")));
        assert_eq!(Sort::parse("-"), None);
        assert_eq!(Sort::parse(""), None);
    }
}
