pub use crate::shared_client::*;

use serde::de::DeserializeOwned;

use crate::{
    interchange::{
        Command, ControlPlaneError, InstallResponse, InstanceId, InstanceResponse, MockRule,
        ResetResponse, ScenarioStateResponse,
    },
    network_client::{ClientNetworkError, NetworkClient},
    params::BaseParams,
    scenario::Scenario,
};

/// Network client for a stub server's control plane.
pub struct Client {
    control_plane_url: String,
    instance: InstanceId,
    mock_url: String,
}

impl Client {
    pub async fn new(control_plane_url: &str) -> Result<Self, ClientError> {
        let response = NetworkClient::send::<Command, InstanceResponse, ControlPlaneError>(
            control_plane_url,
            &Command::CreateInstance,
        )
        .await
        .map_err(|err| match err {
            ClientNetworkError::FailedToConnectToMockServer => {
                ClientError::FailedToConnectToMockServer
            }
            _ => ClientError::FailedToCreateTestInstance,
        })?;

        Ok(Self {
            control_plane_url: String::from(control_plane_url),
            instance: response.instance,
            mock_url: response.url,
        })
    }

    pub fn when<F>(&self, when: F) -> MockBuilder<WhenState, Client>
    where
        F: FnOnce(WhenBuilder) -> WhenBuilder,
    {
        MockBuilder::new(self, when(WhenBuilder::default()).build())
    }

    /// Base URL of this client's instance. Requests sent here may be answered
    /// by any installed rule; use [`Scenario::url`] to stay inside one scenario.
    pub fn url(&self) -> String {
        self.mock_url.clone()
    }

    pub fn scenario<'a>(
        &'a self,
        name: impl Into<String>,
        params: &'a BaseParams,
    ) -> Scenario<'a, Client> {
        Scenario::new(name, self, params)
    }

    async fn dispatch<U>(&self, command: &Command, failure: ClientError) -> Result<U, ClientError>
    where
        U: DeserializeOwned,
    {
        NetworkClient::send::<Command, U, ControlPlaneError>(&self.control_plane_url, command)
            .await
            .map_err(|err| match err {
                ClientNetworkError::Response(ControlPlaneError::InstanceNotFound) => {
                    ClientError::InstanceNoLongerValid
                }
                ClientNetworkError::Response(rejection) => ClientError::Rejected(rejection),
                ClientNetworkError::FailedToConnectToMockServer => {
                    ClientError::FailedToConnectToMockServer
                }
                _ => failure,
            })
    }
}

impl MockClient for Client {
    async fn install(&self, mocks: Vec<MockRule>) -> Result<usize, ClientError> {
        let command = Command::InstallMocks {
            instance: self.instance.clone(),
            mocks,
        };
        self.dispatch::<InstallResponse>(&command, ClientError::FailedToInstallMockRule)
            .await
            .map(|response| response.installed)
    }

    async fn scenario_state(&self, scenario: &str) -> Result<Option<String>, ClientError> {
        let command = Command::ScenarioState {
            instance: self.instance.clone(),
            scenario: scenario.to_string(),
        };
        self.dispatch::<ScenarioStateResponse>(&command, ClientError::FailedToReadScenarioState)
            .await
            .map(|response| response.state)
    }

    async fn reset_scenario(&self, scenario: &str) -> Result<usize, ClientError> {
        let command = Command::ResetScenario {
            instance: self.instance.clone(),
            scenario: scenario.to_string(),
        };
        self.dispatch::<ResetResponse>(&command, ClientError::FailedToResetScenario)
            .await
            .map(|response| response.removed)
    }

    async fn reset_all_scenarios(&self) -> Result<usize, ClientError> {
        let command = Command::ResetAllScenarios {
            instance: self.instance.clone(),
        };
        self.dispatch::<ResetResponse>(&command, ClientError::FailedToResetScenario)
            .await
            .map(|response| response.removed)
    }

    fn instance(&self) -> &InstanceId {
        &self.instance
    }

    fn mock_url(&self) -> &str {
        &self.mock_url
    }
}
