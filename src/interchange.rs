//! Wire types exchanged between a client and the stub server's control plane.

use std::fmt;

use serde_derive::{Deserialize, Serialize};

/// State every scenario is in before any of its rules fired.
pub const SCENARIO_STARTED: &str = "Started";

/// Priority given to rules that do not ask for one. Lower wins.
pub const DEFAULT_PRIORITY: u8 = 5;

/// Mock-side path segment selecting an instance: `/instances/{id}/...`.
pub const INSTANCE_SEGMENT: &str = "instances";

/// Mock-side path segment confining a request to one scenario's rules:
/// `/instances/{id}/scenarios/{name}/...`.
pub const SCENARIO_SEGMENT: &str = "scenarios";

/// Base URL under which only `scenario`'s rules answer. The name is used
/// verbatim as a path segment.
pub fn scenario_url(instance_url: &str, scenario: &str) -> String {
    format!(
        "{}/{SCENARIO_SEGMENT}/{scenario}",
        instance_url.trim_end_matches('/')
    )
}

#[derive(Deserialize, Serialize, Debug)]
pub enum Command {
    CreateInstance,
    InstallMocks {
        instance: InstanceId,
        mocks: Vec<MockRule>,
    },
    ScenarioState {
        instance: InstanceId,
        scenario: String,
    },
    ResetScenario {
        instance: InstanceId,
        scenario: String,
    },
    ResetAllScenarios {
        instance: InstanceId,
    },
}

#[derive(Serialize, Deserialize, Debug)]
pub struct InstanceResponse {
    pub instance: InstanceId,
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct InstallResponse {
    pub installed: usize,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ScenarioStateResponse {
    pub state: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ResetResponse {
    pub removed: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ControlPlaneError {
    InstanceNotFound,
    MalformedCommand(String),
}

impl ControlPlaneError {
    pub fn status(&self) -> u16 {
        match self {
            ControlPlaneError::InstanceNotFound => 404,
            ControlPlaneError::MalformedCommand(_) => 400,
        }
    }
}

impl fmt::Display for ControlPlaneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlPlaneError::InstanceNotFound => write!(f, "instance not found"),
            ControlPlaneError::MalformedCommand(reason) => write!(f, "malformed command: {reason}"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceId(pub(crate) String);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MockRule {
    pub when: WhenRules,
    pub then: ThenState,
    #[serde(default)]
    pub scenario: Option<ScenarioGate>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WhenRules {
    pub match_path: String,
    pub method: Option<Method>,
    /// `None` ignores the query string, `Some` requires exactly these pairs.
    #[serde(default)]
    pub query: Option<Vec<(String, String)>>,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ThenState {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Binds a rule to a named scenario's state machine.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScenarioGate {
    pub name: String,
    /// `None` matches whatever state the scenario is in.
    pub required_state: Option<String>,
    pub new_state: Option<String>,
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    GET,
    POST,
    DELETE,
    PUT,
    PATCH,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::DELETE => "DELETE",
            Method::PUT => "PUT",
            Method::PATCH => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&hyper::Method> for Method {
    type Error = ();

    fn try_from(method: &hyper::Method) -> Result<Self, Self::Error> {
        match *method {
            hyper::Method::GET => Ok(Method::GET),
            hyper::Method::POST => Ok(Method::POST),
            hyper::Method::DELETE => Ok(Method::DELETE),
            hyper::Method::PUT => Ok(Method::PUT),
            hyper::Method::PATCH => Ok(Method::PATCH),
            _ => Err(()),
        }
    }
}
