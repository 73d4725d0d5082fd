//! Per-test binding of a scenario name to a mock server.
//!
//! The name is the server's isolation key: two tests running at the same
//! time against one server must use different names. [`Scenario::unique`]
//! derives one from a prefix when the test has no natural name.

use tracing::{debug, info};

use crate::{
    configurator::{ConfigError, ScenarioConfigurator},
    interchange::scenario_url,
    params::BaseParams,
    shared_client::{ClientError, MockClient},
};

pub struct Scenario<'a, C: MockClient> {
    name: String,
    client: &'a C,
    params: &'a BaseParams,
    uploaded: bool,
}

impl<'a, C: MockClient> Scenario<'a, C> {
    pub fn new(name: impl Into<String>, client: &'a C, params: &'a BaseParams) -> Self {
        Self {
            name: name.into(),
            client,
            params,
            uploaded: false,
        }
    }

    pub fn unique(prefix: &str, client: &'a C, params: &'a BaseParams) -> Self {
        Self::new(
            format!("{prefix}-{}", uuid7::uuid7()),
            client,
            params,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base URL the code under test should talk to. Only this scenario's
    /// rules answer requests sent under it.
    pub fn url(&self) -> String {
        scenario_url(self.client.mock_url(), &self.name)
    }

    pub fn start_configuration(&self) -> ScenarioConfigurator<'a, C> {
        ScenarioConfigurator::new(self.name.clone(), self.client, self.params)
    }

    pub async fn finish_configuration(
        &mut self,
        configurator: ScenarioConfigurator<'a, C>,
    ) -> Result<ScenarioHandle<'a, C>, ConfigError> {
        configurator.validate()?;
        // A failed upload may still have reached the server.
        self.uploaded = true;
        configurator.finish().await
    }

    /// Discards the server's state for this scenario. Safe to call from
    /// teardown whether or not configuration ever happened.
    pub async fn reset(&mut self) -> Result<(), ClientError> {
        if !self.uploaded {
            debug!(scenario = %self.name, "nothing uploaded, skipping reset");
            return Ok(());
        }
        let removed = self.client.reset_scenario(&self.name).await?;
        info!(scenario = %self.name, removed, "scenario reset");
        self.uploaded = false;
        Ok(())
    }
}

/// Returned once a scenario's rules are installed.
pub struct ScenarioHandle<'a, C: MockClient> {
    name: String,
    client: &'a C,
}

impl<'a, C: MockClient> ScenarioHandle<'a, C> {
    pub(crate) fn new(name: String, client: &'a C) -> Self {
        Self { name, client }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> String {
        scenario_url(self.client.mock_url(), &self.name)
    }

    pub async fn state(&self) -> Result<Option<String>, ClientError> {
        self.client.scenario_state(&self.name).await
    }

    pub async fn reset(&self) -> Result<usize, ClientError> {
        self.client.reset_scenario(&self.name).await
    }

    pub async fn reset_all_scenarios(&self) -> Result<usize, ClientError> {
        self.client.reset_all_scenarios().await
    }
}
