//! Canned responses for collection endpoints.
//!
//! Filtering and paging happen here, ahead of time, and the stub server
//! only replays the result for the matching query string. List reads are
//! idempotent, so these rules are told apart by query parameters rather
//! than by scenario state.

use serde_json::{json, Value};

use crate::{
    interchange::Method,
    stub::{StubResponse, StubRule},
};

pub const LIMIT_PARAM: &str = "limit";
pub const LABELS_PARAM: &str = "labels";
pub const SKIP_TOKEN_PARAM: &str = "skipToken";

/// A query a test will send to a list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub limit: Option<usize>,
    pub labels: Vec<(String, String)>,
}

impl ListFilter {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn limit(limit: usize) -> Self {
        Self::none().with_limit(limit)
    }

    pub fn label(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::none().with_label(key, value)
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self
    }

    /// Query pairs a client sends for this filter.
    pub fn query(&self) -> Vec<(String, String)> {
        let mut query = vec![];
        if let Some(limit) = self.limit {
            query.push((String::from(LIMIT_PARAM), limit.to_string()));
        }
        if !self.labels.is_empty() {
            let selector = self
                .labels
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect::<Vec<_>>()
                .join(",");
            query.push((String::from(LABELS_PARAM), selector));
        }
        query
    }

    pub fn matches(&self, item: &Value) -> bool {
        self.labels
            .iter()
            .all(|(key, value)| item["metadata"]["labels"][key].as_str() == Some(value.as_str()))
    }

    /// Items a compliant backend returns on the first page.
    pub fn apply(&self, items: &[Value]) -> Vec<Value> {
        self.pages(items)
            .into_iter()
            .next()
            .map(|page| page.items)
            .unwrap_or_default()
    }

    /// Every page the filter produces, first page first.
    pub fn pages(&self, items: &[Value]) -> Vec<Page> {
        let matching: Vec<Value> = items.iter().filter(|item| self.matches(item)).cloned().collect();
        let size = match self.limit {
            Some(limit) if limit > 0 => limit,
            _ => return vec![Page::last(0, matching)],
        };
        if matching.is_empty() {
            return vec![Page::last(0, matching)];
        }
        let total = matching.len();
        matching
            .chunks(size)
            .enumerate()
            .map(|(index, chunk)| {
                let offset = index * size;
                let next = offset + chunk.len();
                Page {
                    offset,
                    items: chunk.to_vec(),
                    skip_token: (next < total).then(|| next.to_string()),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub offset: usize,
    pub items: Vec<Value>,
    pub skip_token: Option<String>,
}

impl Page {
    fn last(offset: usize, items: Vec<Value>) -> Self {
        Self {
            offset,
            items,
            skip_token: None,
        }
    }

    pub fn body(&self) -> Value {
        let mut metadata = json!({});
        if let Some(token) = &self.skip_token {
            metadata[SKIP_TOKEN_PARAM] = json!(token);
        }
        json!({ "items": self.items, "metadata": metadata })
    }
}

/// A collection endpoint and the filters the test will query it with.
#[derive(Debug, Clone)]
pub struct Listing {
    pub path: String,
    pub items: Vec<Value>,
    pub filters: Vec<ListFilter>,
}

impl Listing {
    pub fn new(path: impl Into<String>, items: Vec<Value>) -> Self {
        Self {
            path: path.into(),
            items,
            filters: vec![],
        }
    }

    pub fn filter(mut self, filter: ListFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// No filter, `limit=1`, the label, and `limit=1` with the label.
    pub fn standard_filters(self, key: &str, value: &str) -> Self {
        self.filter(ListFilter::none())
            .filter(ListFilter::limit(1))
            .filter(ListFilter::label(key, value))
            .filter(ListFilter::limit(1).with_label(key, value))
    }

    /// One rule per filter and page, each matching its exact query string.
    pub fn compile(&self) -> Vec<StubRule> {
        self.filters
            .iter()
            .flat_map(|filter| {
                let query = filter.query();
                filter.pages(&self.items).into_iter().map(move |page| {
                    let mut query = query.clone();
                    if page.offset > 0 {
                        query.push((String::from(SKIP_TOKEN_PARAM), page.offset.to_string()));
                    }
                    StubRule::new(Method::GET, &self.path, StubResponse::json(200, page.body()))
                        .with_query(query)
                })
            })
            .collect()
    }
}
