//! In-memory resource tree.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};
use warden_core::{EntitlementError, EntitlementResult, TenantId};

use super::{Resource, ResourceStore};

fn normalize(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Resource tree kept in an ordered map per tenant, so subtree operations are
/// range scans over the path prefix.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResourceStore {
    tree: Arc<RwLock<BTreeMap<(TenantId, String), Resource>>>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resources stored for a tenant.
    pub fn len(&self, tenant: TenantId) -> usize {
        self.tree
            .read()
            .map(|tree| tree.keys().filter(|(owner, _)| *owner == tenant).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, tenant: TenantId) -> bool {
        self.len(tenant) == 0
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn get(&self, path: &str, tenant: TenantId) -> EntitlementResult<Option<Resource>> {
        let tree = self
            .tree
            .read()
            .map_err(|_| EntitlementError::lock_poisoned("resource tree"))?;
        Ok(tree.get(&(tenant, normalize(path))).cloned())
    }

    async fn put(&self, path: &str, resource: Resource, tenant: TenantId) -> EntitlementResult<()> {
        let mut tree = self
            .tree
            .write()
            .map_err(|_| EntitlementError::lock_poisoned("resource tree"))?;
        tree.insert((tenant, normalize(path)), resource);
        Ok(())
    }

    async fn delete(&self, path: &str, tenant: TenantId) -> EntitlementResult<()> {
        let path = normalize(path);
        let subtree = format!("{path}/");
        let mut tree = self
            .tree
            .write()
            .map_err(|_| EntitlementError::lock_poisoned("resource tree"))?;
        tree.retain(|(owner, p), _| !(*owner == tenant && (*p == path || p.starts_with(&subtree))));
        Ok(())
    }

    async fn exists(&self, path: &str, tenant: TenantId) -> EntitlementResult<bool> {
        let tree = self
            .tree
            .read()
            .map_err(|_| EntitlementError::lock_poisoned("resource tree"))?;
        Ok(tree.contains_key(&(tenant, normalize(path))))
    }

    async fn children(&self, path: &str, tenant: TenantId) -> EntitlementResult<Vec<String>> {
        let prefix = format!("{}/", normalize(path));
        let tree = self
            .tree
            .read()
            .map_err(|_| EntitlementError::lock_poisoned("resource tree"))?;
        let children: BTreeSet<String> = tree
            .range((tenant, prefix.clone())..)
            .take_while(|((owner, p), _)| *owner == tenant && p.starts_with(&prefix))
            .filter_map(|((_, p), _)| {
                let rest = &p[prefix.len()..];
                let name = rest.split('/').next().filter(|n| !n.is_empty())?;
                Some(format!("{prefix}{name}"))
            })
            .collect();
        Ok(children.into_iter().collect())
    }
}
