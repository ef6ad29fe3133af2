//! Stores over the legacy hierarchical resource tree.
//!
//! Records are JSON resource content laid out under
//! `/repository/identity/entitlement`.

pub mod config;
pub mod policy;
pub mod status;
pub mod subscriber;

pub use config::LegacyConfigStore;
pub use policy::LegacyPolicyStore;
pub use status::LegacyStatusStore;
pub use subscriber::LegacySubscriberStore;

use serde::de::DeserializeOwned;
use warden_core::{EntitlementResult, TenantId};

use crate::resource::{leaf_name, ResourceStore};

/// Read and decode the JSON content at `path`.
pub(crate) async fn read_json<T: DeserializeOwned>(
    resources: &dyn ResourceStore,
    path: &str,
    tenant: TenantId,
) -> EntitlementResult<Option<T>> {
    match resources.get(path, tenant).await? {
        Some(resource) => resource.to_json(),
        None => Ok(None),
    }
}

/// Names of the direct children of `path`.
pub(crate) async fn child_names(
    resources: &dyn ResourceStore,
    path: &str,
    tenant: TenantId,
) -> EntitlementResult<Vec<String>> {
    let children = resources.children(path, tenant).await?;
    Ok(children.iter().map(|c| leaf_name(c).to_string()).collect())
}
