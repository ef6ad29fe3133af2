//! Legacy hierarchical resource store.
//!
//! Records live as resources addressed by slash-separated paths. Deleting a
//! path removes its whole subtree.

pub mod memory;

pub use memory::InMemoryResourceStore;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use warden_core::{EntitlementError, EntitlementResult, StatusAbout, TenantId};

/// Root of every entitlement resource.
pub const ENTITLEMENT_ROOT: &str = "/repository/identity/entitlement";
pub const PAP_POLICY_ROOT: &str = "/repository/identity/entitlement/policy/pap";
pub const POLICY_VERSION_ROOT: &str = "/repository/identity/entitlement/policy/version";
pub const PDP_POLICY_ROOT: &str = "/repository/identity/entitlement/policy/pdp";
pub const PUBLISHER_ROOT: &str = "/repository/identity/entitlement/publisher";
pub const POLICY_STATUS_ROOT: &str = "/repository/identity/entitlement/status/policy";
pub const PUBLISHER_STATUS_ROOT: &str = "/repository/identity/entitlement/status/publisher";
/// Property of the PDP root resource holding the tenant's combining algorithm.
pub const POLICY_COMBINING_ALGORITHM_PROPERTY: &str = "globalPolicyCombiningAlgorithm";

/// Join a parent path and a child name.
pub fn child_path(parent: &str, name: &str) -> String {
    format!("{}/{}", parent.trim_end_matches('/'), name.trim_start_matches('/'))
}

/// Last segment of a path.
pub fn leaf_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

pub fn status_root(about: StatusAbout) -> &'static str {
    match about {
        StatusAbout::Policy => POLICY_STATUS_ROOT,
        StatusAbout::Publisher => PUBLISHER_STATUS_ROOT,
    }
}

/// A node of the resource tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resource {
    pub content: Option<String>,
    pub properties: BTreeMap<String, Vec<String>>,
}

impl Resource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            properties: BTreeMap::new(),
        }
    }

    /// Serialize `value` as the resource's JSON content.
    pub fn from_json<T: Serialize>(value: &T) -> EntitlementResult<Self> {
        let content = serde_json::to_string(value)
            .map_err(|e| EntitlementError::serialization("resource content", e))?;
        Ok(Self::with_content(content))
    }

    /// Deserialize the resource's JSON content. A resource without content
    /// yields `None`.
    pub fn to_json<T: DeserializeOwned>(&self) -> EntitlementResult<Option<T>> {
        match &self.content {
            None => Ok(None),
            Some(content) => serde_json::from_str(content)
                .map(Some)
                .map_err(|e| EntitlementError::serialization("resource content", e)),
        }
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), vec![value.into()]);
    }

    pub fn remove_property(&mut self, name: &str) -> bool {
        self.properties.remove(name).is_some()
    }
}

/// The legacy hierarchical store.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get(&self, path: &str, tenant: TenantId) -> EntitlementResult<Option<Resource>>;

    /// Create or replace the resource at `path`.
    async fn put(&self, path: &str, resource: Resource, tenant: TenantId) -> EntitlementResult<()>;

    /// Remove `path` and everything below it. Absent paths are not an error.
    async fn delete(&self, path: &str, tenant: TenantId) -> EntitlementResult<()>;

    async fn exists(&self, path: &str, tenant: TenantId) -> EntitlementResult<bool>;

    /// Full paths of the direct children of `path`, sorted.
    async fn children(&self, path: &str, tenant: TenantId) -> EntitlementResult<Vec<String>>;
}
