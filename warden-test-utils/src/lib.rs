//! WARDEN Test Utilities
//!
//! Shared test infrastructure for the Warden workspace:
//! - Proptest generators for the entitlement types
//! - Fixtures for common scenarios
//! - Custom assertions
//! - Failure-injecting store wrappers

pub use warden_core::{
    EntitlementError, EntitlementResult, MergeKey, PolicyRecord, PublishedPolicy, StatusAbout,
    StatusEntry, StatusType, Subscriber, SubscriberProperty, TenantId,
};
pub use warden_storage::{PolicyStore, Resource, ResourceStore};

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};

// ============================================================================
// TRACING
// ============================================================================

static TRACING: Once = Once::new();

/// Install a test-writer subscriber filtered by `RUST_LOG`. Safe to call from
/// every test.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for the entitlement types.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_tenant_id() -> impl Strategy<Value = TenantId> {
        prop_oneof![Just(TenantId::SUPER), (0i32..10_000).prop_map(TenantId::new)]
    }

    pub fn arb_policy_id() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,15}"
    }

    pub fn arb_policy_record() -> impl Strategy<Value = PolicyRecord> {
        (arb_policy_id(), "[ -~]{0,64}", 1u64..20, -5i32..5, any::<bool>()).prop_map(
            |(id, body, version, order, active)| {
                PolicyRecord::new(id, body)
                    .with_version(version.to_string())
                    .with_order(order)
                    .with_active(active)
            },
        )
    }

    pub fn arb_published_policy() -> impl Strategy<Value = PublishedPolicy> {
        arb_policy_record().prop_map(|p| p.to_published())
    }

    pub fn arb_status_type() -> impl Strategy<Value = StatusType> {
        prop_oneof![
            Just(StatusType::AddPolicy),
            Just(StatusType::UpdatePolicy),
            Just(StatusType::GetPolicy),
            Just(StatusType::DeletePolicy),
            Just(StatusType::PublishPolicy),
            Just(StatusType::RollbackPolicy),
            Just(StatusType::EnablePolicy),
            Just(StatusType::DisablePolicy),
            Just(StatusType::OrderPolicy),
        ]
    }

    /// Status entries that never purge history.
    pub fn arb_status_entry(key: String) -> impl Strategy<Value = StatusEntry> {
        (
            arb_status_type().prop_filter("non-delete", |t| *t != StatusType::DeletePolicy),
            proptest::option::of("[a-z0-9-]{1,12}"),
            any::<bool>(),
        )
            .prop_map(move |(status_type, target, success)| {
                let mut entry = StatusEntry::new(status_type, key.clone());
                if let Some(target) = target {
                    entry = entry.with_target(target, "CREATE");
                }
                if success {
                    entry
                } else {
                    entry.failed("rejected")
                }
            })
    }

    pub fn arb_subscriber() -> impl Strategy<Value = Subscriber> {
        (
            "[a-z]{1,8}",
            "[a-z][a-z0-9-]{0,11}",
            proptest::collection::vec(("[a-z]{1,8}", "[ -~]{0,16}", any::<bool>()), 0..4),
        )
            .prop_map(|(module, id, props)| {
                props.into_iter().fold(
                    Subscriber::with_id(module, id),
                    |sub, (pid, value, secret)| {
                        let prop = SubscriberProperty::new(pid, value);
                        sub.with_property(if secret { prop.secret() } else { prop })
                    },
                )
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;

    pub const TENANT: TenantId = TenantId::new(1);
    pub const OTHER_TENANT: TenantId = TenantId::new(5);

    pub const ALLOW_ADMIN_LEGACY_BODY: &str =
        r#"<Policy PolicyId="allow-admin"><Rule Effect="Permit"/></Policy>"#;
    pub const ALLOW_ADMIN_BODY: &str =
        r#"<Policy PolicyId="allow-admin"><Target role="admin"/><Rule Effect="Permit"/></Policy>"#;

    pub fn allow_admin(body: &str) -> PolicyRecord {
        PolicyRecord::new("allow-admin", body).with_modified_by("admin")
    }

    pub fn policy(id: &str) -> PolicyRecord {
        PolicyRecord::new(id, format!("<Policy PolicyId=\"{id}\"/>"))
    }

    pub fn http_subscriber(id: &str) -> Subscriber {
        Subscriber::with_id("http", id)
            .with_property(SubscriberProperty::new("url", format!("https://{id}.example")))
            .with_property(SubscriberProperty::new("password", format!("enc:{id}")).secret())
    }

    pub fn publish_status(key: &str, target: &str) -> StatusEntry {
        StatusEntry::new(StatusType::PublishPolicy, key)
            .with_target(target, "CREATE")
            .with_user("admin")
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for store results.

    use super::*;
    use std::collections::HashSet;

    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &EntitlementResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    #[track_caller]
    pub fn assert_err<T: std::fmt::Debug>(result: &EntitlementResult<T>) {
        assert!(result.is_err(), "Expected Err, got Ok: {:?}", result);
    }

    /// Assert that every merge key occurs once.
    #[track_caller]
    pub fn assert_unique_keys<T: MergeKey + std::fmt::Debug>(items: &[T]) {
        let mut seen = HashSet::new();
        for item in items {
            assert!(seen.insert(item.merge_key()), "duplicate key in {:?}", items);
        }
    }

    /// Assert a listing contains exactly `expected`, ignoring order.
    #[track_caller]
    pub fn assert_same_ids(actual: &[String], expected: &[&str]) {
        let mut actual: Vec<&str> = actual.iter().map(String::as_str).collect();
        let mut expected = expected.to_vec();
        actual.sort_unstable();
        expected.sort_unstable();
        assert_eq!(actual, expected);
    }
}

// ============================================================================
// FAILURE INJECTION
// ============================================================================

fn injected(operation: &str) -> EntitlementError {
    EntitlementError::new(format!("injected failure: {operation}"))
}

/// Policy store wrapper whose reads or writes can be made to fail.
pub struct FailingPolicyStore {
    inner: Arc<dyn PolicyStore>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FailingPolicyStore {
    pub fn new(inner: Arc<dyn PolicyStore>) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_read(&self, operation: &str) -> EntitlementResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(injected(operation));
        }
        Ok(())
    }

    fn check_write(&self, operation: &str) -> EntitlementResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected(operation));
        }
        Ok(())
    }
}

#[async_trait]
impl PolicyStore for FailingPolicyStore {
    async fn add_or_update_policy(
        &self,
        policy: &PolicyRecord,
        enable_versioning: bool,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.check_write("add_or_update_policy")?;
        self.inner.add_or_update_policy(policy, enable_versioning, tenant).await
    }

    async fn get_pap_policy(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PolicyRecord>> {
        self.check_read("get_pap_policy")?;
        self.inner.get_pap_policy(policy_id, tenant).await
    }

    async fn get_pap_policies(
        &self,
        policy_ids: &[String],
        tenant: TenantId,
    ) -> EntitlementResult<Vec<PolicyRecord>> {
        self.check_read("get_pap_policies")?;
        self.inner.get_pap_policies(policy_ids, tenant).await
    }

    async fn get_policy(
        &self,
        policy_id: &str,
        version: Option<&str>,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PolicyRecord>> {
        self.check_read("get_policy")?;
        self.inner.get_policy(policy_id, version, tenant).await
    }

    async fn get_versions(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Vec<String>> {
        self.check_read("get_versions")?;
        self.inner.get_versions(policy_id, tenant).await
    }

    async fn list_policy_ids(&self, tenant: TenantId) -> EntitlementResult<Vec<String>> {
        self.check_read("list_policy_ids")?;
        self.inner.list_policy_ids(tenant).await
    }

    async fn remove_policy(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<()> {
        self.check_write("remove_policy")?;
        self.inner.remove_policy(policy_id, tenant).await
    }

    async fn publish_policy(
        &self,
        policy: &PublishedPolicy,
        tenant: TenantId,
    ) -> EntitlementResult<()> {
        self.check_write("publish_policy")?;
        self.inner.publish_policy(policy, tenant).await
    }

    async fn is_published(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<bool> {
        self.check_read("is_published")?;
        self.inner.is_published(policy_id, tenant).await
    }

    async fn get_published_policy(
        &self,
        policy_id: &str,
        tenant: TenantId,
    ) -> EntitlementResult<Option<PublishedPolicy>> {
        self.check_read("get_published_policy")?;
        self.inner.get_published_policy(policy_id, tenant).await
    }

    async fn list_published_policy_ids(&self, tenant: TenantId) -> EntitlementResult<Vec<String>> {
        self.check_read("list_published_policy_ids")?;
        self.inner.list_published_policy_ids(tenant).await
    }

    async fn unpublish_policy(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<()> {
        self.check_write("unpublish_policy")?;
        self.inner.unpublish_policy(policy_id, tenant).await
    }

    async fn exists(&self, policy_id: &str, tenant: TenantId) -> EntitlementResult<bool> {
        self.check_read("exists")?;
        self.inner.exists(policy_id, tenant).await
    }
}

/// Resource store wrapper with independently failing operations.
pub struct FailingResourceStore {
    inner: Arc<dyn ResourceStore>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
}

impl FailingResourceStore {
    pub fn new(inner: Arc<dyn ResourceStore>) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, operation: &str) -> EntitlementResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(injected(operation));
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceStore for FailingResourceStore {
    async fn get(&self, path: &str, tenant: TenantId) -> EntitlementResult<Option<Resource>> {
        Self::check(&self.fail_reads, "get")?;
        self.inner.get(path, tenant).await
    }

    async fn put(&self, path: &str, resource: Resource, tenant: TenantId) -> EntitlementResult<()> {
        Self::check(&self.fail_writes, "put")?;
        self.inner.put(path, resource, tenant).await
    }

    async fn delete(&self, path: &str, tenant: TenantId) -> EntitlementResult<()> {
        Self::check(&self.fail_deletes, "delete")?;
        self.inner.delete(path, tenant).await
    }

    async fn exists(&self, path: &str, tenant: TenantId) -> EntitlementResult<bool> {
        Self::check(&self.fail_reads, "exists")?;
        self.inner.exists(path, tenant).await
    }

    async fn children(&self, path: &str, tenant: TenantId) -> EntitlementResult<Vec<String>> {
        Self::check(&self.fail_reads, "children")?;
        self.inner.children(path, tenant).await
    }
}

// ============================================================================
// TESTS
// ============================================================================
