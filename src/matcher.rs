//! Rule selection and scenario state for one mock instance.

use std::collections::HashMap;

use tracing::debug;

use crate::interchange::{
    Method, MockRule, ThenState, INSTANCE_SEGMENT, SCENARIO_SEGMENT, SCENARIO_STARTED,
};

/// Where a mock request is headed, split out of
/// `/instances/{id}[/scenarios/{name}]/{path}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRoute<'a> {
    pub instance: &'a str,
    pub scenario: Option<&'a str>,
    pub path: &'a str,
}

impl<'a> MockRoute<'a> {
    pub fn parse(path: &'a str) -> Option<Self> {
        let rest = path
            .strip_prefix('/')?
            .strip_prefix(INSTANCE_SEGMENT)?
            .strip_prefix('/')?;
        let (instance, rest) = split_segment(rest);
        if instance.is_empty() {
            return None;
        }
        let scoped = rest
            .strip_prefix('/')
            .and_then(|rest| rest.strip_prefix(SCENARIO_SEGMENT))
            .and_then(|rest| rest.strip_prefix('/'));
        let (scenario, rest) = match scoped {
            Some(scoped) => match split_segment(scoped) {
                ("", _) => return None,
                (name, rest) => (Some(name), rest),
            },
            None => (None, rest),
        };
        Some(Self {
            instance,
            scenario,
            path: if rest.is_empty() { "/" } else { rest },
        })
    }
}

fn split_segment(path: &str) -> (&str, &str) {
    match path.find('/') {
        Some(index) => path.split_at(index),
        None => (path, ""),
    }
}

/// The parts of an incoming request that rules can match on.
#[derive(Debug, Clone, Default)]
pub struct RequestView {
    pub method: Option<Method>,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// When set, only rules bound to this scenario are considered.
    pub scenario: Option<String>,
}

impl RequestView {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method: Some(method),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_query_string(mut self, query: &str) -> Self {
        self.query = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn in_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Installed rules plus the current state of every scenario they mention.
#[derive(Debug, Default)]
pub struct RuleBook {
    rules: Vec<MockRule>,
    states: HashMap<String, String>,
}

impl RuleBook {
    pub fn install(&mut self, mocks: Vec<MockRule>) -> usize {
        let count = mocks.len();
        self.rules.extend(mocks);
        count
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// `None` for a scenario no rule or transition has mentioned.
    pub fn scenario_state(&self, scenario: &str) -> Option<String> {
        if let Some(state) = self.states.get(scenario) {
            return Some(state.clone());
        }
        self.rules
            .iter()
            .any(|rule| rule.scenario.as_ref().is_some_and(|gate| gate.name == scenario))
            .then(|| String::from(SCENARIO_STARTED))
    }

    /// Picks the rule answering `request` and applies its transition.
    pub fn respond(&mut self, request: &RequestView) -> Option<ThenState> {
        let index = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| self.matches(rule, request))
            .min_by_key(|(index, rule)| (rule.when.priority, *index))
            .map(|(index, _)| index)?;
        let rule = &self.rules[index];
        if let Some(gate) = &rule.scenario {
            if let Some(next) = &gate.new_state {
                debug!(scenario = %gate.name, state = %next, "scenario transition");
                self.states.insert(gate.name.clone(), next.clone());
            }
        }
        Some(rule.then.clone())
    }

    /// Drops the scenario's rules and state; returns how many rules went.
    pub fn reset_scenario(&mut self, scenario: &str) -> usize {
        let before = self.rules.len();
        self.rules
            .retain(|rule| rule.scenario.as_ref().map_or(true, |gate| gate.name != scenario));
        self.states.remove(scenario);
        before - self.rules.len()
    }

    pub fn reset_all_scenarios(&mut self) -> usize {
        let before = self.rules.len();
        self.rules.retain(|rule| rule.scenario.is_none());
        self.states.clear();
        before - self.rules.len()
    }

    fn current_state(&self, scenario: &str) -> &str {
        self.states
            .get(scenario)
            .map_or(SCENARIO_STARTED, String::as_str)
    }

    fn matches(&self, rule: &MockRule, request: &RequestView) -> bool {
        if let Some(scenario) = &request.scenario {
            if rule
                .scenario
                .as_ref()
                .map_or(true, |gate| gate.name != *scenario)
            {
                return false;
            }
        }
        let when = &rule.when;
        if when.match_path != request.path {
            return false;
        }
        if when.method.is_some() && when.method != request.method {
            return false;
        }
        if let Some(expected) = &when.query {
            let mut expected = expected.clone();
            let mut actual = request.query.clone();
            expected.sort();
            actual.sort();
            if expected != actual {
                return false;
            }
        }
        if !when
            .headers
            .iter()
            .all(|(name, value)| request.header(name) == Some(value.as_str()))
        {
            return false;
        }
        match &rule.scenario {
            Some(gate) => gate
                .required_state
                .as_deref()
                .map_or(true, |required| self.current_state(&gate.name) == required),
            None => true,
        }
    }
}
