//! Collects the rules of one test under one named scenario.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, info};

use crate::{
    compiler::{compile, ResourceDescriptor, StateChain},
    interchange::Method,
    lifecycle::{LifecycleError, Progress, Step},
    listing::Listing,
    params::BaseParams,
    scenario::ScenarioHandle,
    shared_client::{ClientError, MockClient},
    stub::StubRule,
};

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("lifecycle of {path} does not fit what was registered before: {source}")]
    Lifecycle {
        path: String,
        #[source]
        source: LifecycleError,
    },
    #[error("{method} {path} already has a rule for state {state:?} at the same priority")]
    AmbiguousRule {
        method: Method,
        path: String,
        state: Option<String>,
    },
    #[error("{path} is already tracked, it cannot be declared as existing")]
    AlreadyTracked { path: String },
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Accumulates stub rules for a scenario and uploads them in one go.
pub struct ScenarioConfigurator<'a, C: MockClient> {
    name: String,
    client: &'a C,
    params: &'a BaseParams,
    chain: StateChain,
    rules: Vec<StubRule>,
    resources: HashMap<String, Progress>,
}

impl<'a, C: MockClient> ScenarioConfigurator<'a, C> {
    pub fn new(name: impl Into<String>, client: &'a C, params: &'a BaseParams) -> Self {
        Self {
            name: name.into(),
            client,
            params,
            chain: StateChain::default(),
            rules: vec![],
            resources: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &BaseParams {
        self.params
    }

    pub fn rules(&self) -> &[StubRule] {
        &self.rules
    }

    /// Phase the resource at `path` will be in once every registered step ran.
    pub fn progress(&self, path: &str) -> Option<Progress> {
        self.resources.get(path).copied()
    }

    /// Declares a resource that exists before the test starts.
    pub fn register_existing(&mut self, resource: &ResourceDescriptor) -> Result<(), ConfigError> {
        if self.resources.contains_key(&resource.path) {
            return Err(ConfigError::AlreadyTracked {
                path: resource.path.clone(),
            });
        }
        self.resources
            .insert(resource.path.clone(), Progress::existing());
        Ok(())
    }

    /// Registers `steps` for `resource`, continuing wherever earlier
    /// registrations for the same path left it. Nothing changes on error.
    pub fn register_lifecycle(
        &mut self,
        resource: &ResourceDescriptor,
        steps: &[Step],
    ) -> Result<(), ConfigError> {
        let mut chain = self.chain.clone();
        let mut progress = self.progress(&resource.path).unwrap_or_default();
        let rules = compile(&mut chain, resource, &mut progress, steps).map_err(|source| {
            ConfigError::Lifecycle {
                path: resource.path.clone(),
                source,
            }
        })?;
        let count = rules.len();
        self.push_rules(rules)?;
        self.chain = chain;
        self.resources.insert(resource.path.clone(), progress);
        debug!(
            scenario = %self.name,
            path = %resource.path,
            rules = count,
            phase = %progress.phase,
            "registered lifecycle"
        );
        Ok(())
    }

    /// Registers a single step, for tests that interleave several resources.
    pub fn register_step(
        &mut self,
        resource: &ResourceDescriptor,
        step: Step,
    ) -> Result<(), ConfigError> {
        self.register_lifecycle(resource, &[step])
    }

    pub fn register_listing(&mut self, listing: &Listing) -> Result<(), ConfigError> {
        let rules = listing.compile();
        let count = rules.len();
        self.push_rules(rules)?;
        debug!(
            scenario = %self.name,
            path = %listing.path,
            rules = count,
            "registered listing"
        );
        Ok(())
    }

    /// Fails with [`ConfigError::AmbiguousRule`] if an already registered
    /// rule answers the same requests.
    pub fn register_rule(&mut self, rule: StubRule) -> Result<(), ConfigError> {
        self.push_rules(vec![rule])
    }

    /// Checks that no request can be answered by two rules at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unambiguous(&[], &self.rules)
    }

    fn push_rules(&mut self, rules: Vec<StubRule>) -> Result<(), ConfigError> {
        check_unambiguous(&self.rules, &rules)?;
        self.rules.extend(rules);
        Ok(())
    }

    /// Uploads every accumulated rule in a single round trip.
    pub async fn finish(self) -> Result<ScenarioHandle<'a, C>, ConfigError> {
        self.validate()?;
        let mocks = self
            .rules
            .iter()
            .map(|rule| rule.to_mock_rule(&self.name, self.params))
            .collect();
        let installed = self.client.install(mocks).await?;
        info!(
            scenario = %self.name,
            installed,
            states = self.chain.allocated(),
            "scenario configured"
        );
        Ok(ScenarioHandle::new(self.name, self.client))
    }
}

/// Fails on the first rule of `added` that competes with an earlier rule of
/// `registered` or `added`.
fn check_unambiguous(registered: &[StubRule], added: &[StubRule]) -> Result<(), ConfigError> {
    let mut seen: HashSet<_> = registered.iter().map(StubRule::match_key).collect();
    for rule in added {
        if !seen.insert(rule.match_key()) {
            return Err(ConfigError::AmbiguousRule {
                method: rule.method,
                path: rule.path.clone(),
                state: rule.required_state.clone(),
            });
        }
    }
    Ok(())
}
