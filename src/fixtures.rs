//! Resource payloads and the canonical paths they are served under.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::{compiler::ResourceDescriptor, params::BaseParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    Tenant,
    Workspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Region,
    Workspace,
    Role,
    Image,
    BlockStorage,
    Network,
    Instance,
}

impl ResourceKind {
    pub fn provider(self) -> &'static str {
        match self {
            ResourceKind::Region => "seca.region",
            ResourceKind::Workspace => "seca.workspace",
            ResourceKind::Role => "seca.authorization",
            ResourceKind::Image | ResourceKind::BlockStorage => "seca.storage",
            ResourceKind::Network => "seca.network",
            ResourceKind::Instance => "seca.compute",
        }
    }

    pub fn collection(self) -> &'static str {
        match self {
            ResourceKind::Region => "regions",
            ResourceKind::Workspace => "workspaces",
            ResourceKind::Role => "roles",
            ResourceKind::Image => "images",
            ResourceKind::BlockStorage => "block-storages",
            ResourceKind::Network => "networks",
            ResourceKind::Instance => "instances",
        }
    }

    pub fn kind(self) -> &'static str {
        match self {
            ResourceKind::Region => "region",
            ResourceKind::Workspace => "workspace",
            ResourceKind::Role => "role",
            ResourceKind::Image => "image",
            ResourceKind::BlockStorage => "block-storage",
            ResourceKind::Network => "network",
            ResourceKind::Instance => "instance",
        }
    }

    pub fn scope(self) -> Scope {
        match self {
            ResourceKind::Region => Scope::Global,
            ResourceKind::Workspace | ResourceKind::Role | ResourceKind::Image => Scope::Tenant,
            ResourceKind::BlockStorage | ResourceKind::Network | ResourceKind::Instance => {
                Scope::Workspace
            }
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FixtureError {
    #[error("{kind} {name} is workspace scoped but has no workspace")]
    MissingWorkspace { kind: &'static str, name: String },
    #[error("resource name must not be empty")]
    EmptyName,
}

/// Builder for a resource payload of `{metadata, spec}`.
#[derive(Debug, Clone)]
pub struct Fixture {
    kind: ResourceKind,
    tenant: String,
    region: Option<String>,
    workspace: Option<String>,
    name: String,
    labels: BTreeMap<String, String>,
    spec: Value,
    updates: Vec<Value>,
}

impl Fixture {
    pub fn new(kind: ResourceKind, params: &BaseParams, name: impl Into<String>) -> Self {
        Self {
            kind,
            tenant: params.tenant.clone(),
            region: params.region.clone(),
            workspace: None,
            name: name.into(),
            labels: BTreeMap::new(),
            spec: Value::Object(Map::new()),
            updates: vec![],
        }
    }

    pub fn in_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn spec(mut self, spec: Value) -> Self {
        self.spec = spec;
        self
    }

    /// Adds the spec the resource will carry after its next update.
    pub fn updated_spec(mut self, spec: Value) -> Self {
        self.updates.push(spec);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection_path(&self) -> Result<String, FixtureError> {
        let root = format!("/providers/{}/v1", self.kind.provider());
        let collection = self.kind.collection();
        match self.kind.scope() {
            Scope::Global => Ok(format!("{root}/{collection}")),
            Scope::Tenant => Ok(format!("{root}/tenants/{}/{collection}", self.tenant)),
            Scope::Workspace => {
                let workspace =
                    self.workspace
                        .as_ref()
                        .ok_or_else(|| FixtureError::MissingWorkspace {
                            kind: self.kind.kind(),
                            name: self.name.clone(),
                        })?;
                Ok(format!(
                    "{root}/tenants/{}/workspaces/{workspace}/{collection}",
                    self.tenant
                ))
            }
        }
    }

    pub fn path(&self) -> Result<String, FixtureError> {
        if self.name.is_empty() {
            return Err(FixtureError::EmptyName);
        }
        Ok(format!("{}/{}", self.collection_path()?, self.name))
    }

    pub fn payload(&self) -> Value {
        self.payload_with(&self.spec)
    }

    fn payload_with(&self, spec: &Value) -> Value {
        let mut metadata = json!({
            "name": self.name,
            "kind": self.kind.kind(),
            "provider": self.kind.provider(),
            "labels": self.labels,
        });
        if self.kind.scope() != Scope::Global {
            metadata["tenant"] = json!(self.tenant);
        }
        if let Some(workspace) = &self.workspace {
            metadata["workspace"] = json!(workspace);
        }
        if let Some(region) = &self.region {
            metadata["region"] = json!(region);
        }
        json!({ "metadata": metadata, "spec": spec })
    }

    pub fn descriptor(&self) -> Result<ResourceDescriptor, FixtureError> {
        let descriptor = ResourceDescriptor::new(&self.name, self.path()?, self.payload());
        Ok(self
            .updates
            .iter()
            .fold(descriptor, |descriptor, spec| {
                descriptor.with_update(self.payload_with(spec))
            }))
    }
}

/// A fresh resource name, `prefix-<suffix>`, unique across runs.
pub fn generate_name(prefix: &str) -> String {
    let id = uuid7::uuid7().to_string();
    let suffix: String = id.chars().rev().filter(|c| *c != '-').take(12).collect();
    format!("{prefix}-{suffix}")
}
