use serde_derive::{Deserialize, Serialize};

/// Connection and auth context shared by every rule of a scenario.
///
/// Passed by reference into configurators instead of living in a
/// process-wide registry, so tests can run side by side with their own
/// tenants and tokens.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BaseParams {
    pub tenant: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl BaseParams {
    pub fn new(tenant: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            region: None,
            auth_token: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Headers a request must carry to be served by this scenario's rules.
    pub fn required_headers(&self) -> Vec<(String, String)> {
        self.auth_token
            .iter()
            .map(|token| (String::from("authorization"), format!("Bearer {token}")))
            .collect()
    }
}
