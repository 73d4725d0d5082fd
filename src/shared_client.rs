use std::future::Future;

use thiserror::Error;

pub use crate::interchange::Method;
use crate::interchange::{
    ControlPlaneError, InstanceId, MockRule, ScenarioGate, ThenState, WhenRules, DEFAULT_PRIORITY,
};

/// The narrow slice of the stub server's control plane that configurators use.
pub trait MockClient {
    /// Installs every rule or none of them; returns how many were installed.
    fn install(&self, mocks: Vec<MockRule>) -> impl Future<Output = Result<usize, ClientError>>;
    fn scenario_state(
        &self,
        scenario: &str,
    ) -> impl Future<Output = Result<Option<String>, ClientError>>;
    fn reset_scenario(&self, scenario: &str) -> impl Future<Output = Result<usize, ClientError>>;
    fn reset_all_scenarios(&self) -> impl Future<Output = Result<usize, ClientError>>;
    fn instance(&self) -> &InstanceId;
    /// Base URL of this client's instance on the mock listener.
    fn mock_url(&self) -> &str;
}

pub struct MockBuilder<'a, State, C: MockClient> {
    state: State,
    client: &'a C,
}

impl<'a, C: MockClient> MockBuilder<'a, WhenState, C> {
    pub fn new(client: &'a C, when_state: WhenState) -> MockBuilder<'a, WhenState, C> {
        MockBuilder {
            state: when_state,
            client,
        }
    }
}

impl<'a, C: MockClient> MockBuilder<'a, WhenState, C> {
    pub fn then<F>(self, then: F) -> MockBuilder<'a, WhenThenState, C>
    where
        F: FnOnce(ThenBuilder) -> ThenBuilder,
    {
        MockBuilder {
            state: then(ThenBuilder::new()).build(self.state),
            client: self.client,
        }
    }
}

impl<'a, C: MockClient> MockBuilder<'a, WhenThenState, C> {
    pub async fn send(self) -> Result<(), ClientError> {
        self.client
            .install(vec![self.state.into_rule()])
            .await
            .map(|_| ())
    }
}

pub struct WhenBuilder {
    method: Option<Method>,
    match_path: String,
    query: Option<Vec<(String, String)>>,
    headers: Vec<(String, String)>,
    priority: u8,
    scenario: Option<String>,
    required_state: Option<String>,
    new_state: Option<String>,
}

impl Default for WhenBuilder {
    fn default() -> Self {
        Self {
            method: None,
            match_path: String::new(),
            query: None,
            headers: vec![],
            priority: DEFAULT_PRIORITY,
            scenario: None,
            required_state: None,
            new_state: None,
        }
    }
}

impl WhenBuilder {
    pub fn path(mut self, path: &str) -> Self {
        self.match_path = String::from(path);
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Requires the query string to hold exactly the pairs given through
    /// [`WhenBuilder::query_param`]; with none given, it must be empty.
    pub fn exact_query(mut self) -> Self {
        self.query.get_or_insert_with(Vec::new);
        self
    }

    pub fn query_param(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.query
            .get_or_insert_with(Vec::new)
            .push((name.as_ref().to_string(), value.as_ref().to_string()));
        self
    }

    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.headers
            .push((name.as_ref().to_string(), value.as_ref().to_string()));
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn in_scenario(mut self, name: impl Into<String>) -> Self {
        self.scenario = Some(name.into());
        self
    }

    /// Only takes effect together with [`WhenBuilder::in_scenario`].
    pub fn when_state_is(mut self, state: impl Into<String>) -> Self {
        self.required_state = Some(state.into());
        self
    }

    /// Only takes effect together with [`WhenBuilder::in_scenario`].
    pub fn will_set_state_to(mut self, state: impl Into<String>) -> Self {
        self.new_state = Some(state.into());
        self
    }

    pub(crate) fn build(self) -> WhenState {
        let scenario = self.scenario.map(|name| ScenarioGate {
            name,
            required_state: self.required_state,
            new_state: self.new_state,
        });
        WhenState {
            when_rules: WhenRules {
                match_path: self.match_path,
                method: self.method,
                query: self.query,
                headers: self.headers,
                priority: self.priority,
            },
            scenario,
        }
    }
}

pub struct WhenState {
    when_rules: WhenRules,
    scenario: Option<ScenarioGate>,
}

pub struct ThenBuilder {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl ThenBuilder {
    pub(crate) fn new() -> Self {
        Self {
            status: 200,
            headers: vec![],
            body: vec![],
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((String::from(name), String::from(value)));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn json(self, body: &serde_json::Value) -> Self {
        self.header("content-type", "application/json")
            .body(body.to_string())
    }

    pub(crate) fn build(self, when_state: WhenState) -> WhenThenState {
        let then_state = ThenState {
            status: self.status,
            headers: self.headers,
            body: self.body,
        };
        WhenThenState {
            when_rules: when_state.when_rules,
            then_state,
            scenario: when_state.scenario,
        }
    }
}

pub struct WhenThenState {
    when_rules: WhenRules,
    then_state: ThenState,
    scenario: Option<ScenarioGate>,
}

impl WhenThenState {
    pub(crate) fn into_rule(self) -> MockRule {
        MockRule {
            when: self.when_rules,
            then: self.then_state,
            scenario: self.scenario,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ClientError {
    #[error("Failed to connect to mock server")]
    FailedToConnectToMockServer,
    #[error("Failed to create test instance")]
    FailedToCreateTestInstance,
    #[error("Mock instance is no longer known to the server")]
    InstanceNoLongerValid,
    #[error("Failed to install mock rules into server")]
    FailedToInstallMockRule,
    #[error("Failed to read scenario state")]
    FailedToReadScenarioState,
    #[error("Failed to reset scenario")]
    FailedToResetScenario,
    #[error("Mock server rejected command: {0}")]
    Rejected(ControlPlaneError),
}
