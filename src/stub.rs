//! The stub rule: one expected call and the response it gets.

use serde_json::{json, Value};

use crate::{
    interchange::{Method, MockRule, DEFAULT_PRIORITY},
    params::BaseParams,
    shared_client::{ThenBuilder, WhenBuilder},
};

/// Priority of rules that only answer when nothing more specific does.
pub const FALLBACK_PRIORITY: u8 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct StubRule {
    pub method: Method,
    pub path: String,
    /// `None` for rules that ignore the query string.
    pub query: Option<Vec<(String, String)>>,
    /// `None` matches in any scenario state.
    pub required_state: Option<String>,
    pub new_state: Option<String>,
    pub response: StubResponse,
    pub priority: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StubResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl StubResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self { status, body: None }
    }

    /// Problem document served for a resource that does not exist.
    pub fn not_found(path: &str) -> Self {
        Self::json(
            404,
            json!({
                "type": "about:blank",
                "title": "Not Found",
                "status": 404,
                "detail": format!("resource {path} not found"),
                "instance": path,
            }),
        )
    }
}

/// Everything that decides whether two rules compete for the same request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct MatchKey {
    method: Method,
    path: String,
    query: Option<Vec<(String, String)>>,
    required_state: Option<String>,
    priority: u8,
}

impl StubRule {
    pub fn new(method: Method, path: impl Into<String>, response: StubResponse) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            required_state: None,
            new_state: None,
            response,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_transition(mut self, required: impl Into<String>, next: impl Into<String>) -> Self {
        self.required_state = Some(required.into());
        self.new_state = Some(next.into());
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub(crate) fn match_key(&self) -> MatchKey {
        let query = self.query.clone().map(|mut pairs| {
            pairs.sort();
            pairs
        });
        MatchKey {
            method: self.method,
            path: self.path.clone(),
            query,
            required_state: self.required_state.clone(),
            priority: self.priority,
        }
    }

    /// Encodes the rule for installation under `scenario`.
    pub fn to_mock_rule(&self, scenario: &str, params: &BaseParams) -> MockRule {
        let when = WhenBuilder::default()
            .method(self.method)
            .path(&self.path)
            .priority(self.priority)
            .in_scenario(scenario);
        let when = params
            .required_headers()
            .into_iter()
            .fold(when, |when, (name, value)| when.header(name, value));
        let when = match &self.query {
            Some(pairs) => pairs
                .iter()
                .fold(when.exact_query(), |when, (name, value)| {
                    when.query_param(name, value)
                }),
            None => when,
        };
        let when = match &self.required_state {
            Some(state) => when.when_state_is(state),
            None => when,
        };
        let when = match &self.new_state {
            Some(state) => when.will_set_state_to(state),
            None => when,
        };

        let then = ThenBuilder::new().status(self.response.status);
        let then = match &self.response.body {
            Some(body) => then.json(body),
            None => then,
        };
        then.build(when.build()).into_rule()
    }
}
