//! Tenant-scoped cache keys.
//!
//! A `TenantScopedKey` can only be built from a tenant, a region and an entry
//! key, so no cache operation can address an entry without naming its tenant.

use warden_core::TenantId;

/// Separator byte between the tenant id and the rest of the key.
const SEPARATOR: u8 = 0xFF;

/// Length of the encoded tenant prefix: 4 tenant bytes plus the separator.
const TENANT_PREFIX_LEN: usize = 5;

/// The cache regions kept per tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheRegion {
    /// Latest administration-time policy, keyed by policy id.
    PapPolicy,
    /// All administration-time policies of a tenant.
    PapPolicyList,
    /// Published policy, keyed by policy id.
    PdpPolicy,
    /// All published policies of a tenant.
    PdpPolicyList,
    /// Tenant configuration values, keyed by setting name.
    Config,
    /// Subscriber, keyed by subscriber id.
    Subscriber,
    /// Subscriber id listings.
    SubscriberList,
}

impl CacheRegion {
    pub const ALL: [CacheRegion; 7] = [
        CacheRegion::PapPolicy,
        CacheRegion::PapPolicyList,
        CacheRegion::PdpPolicy,
        CacheRegion::PdpPolicyList,
        CacheRegion::Config,
        CacheRegion::Subscriber,
        CacheRegion::SubscriberList,
    ];

    pub fn as_byte(&self) -> u8 {
        match self {
            CacheRegion::PapPolicy => 0,
            CacheRegion::PapPolicyList => 1,
            CacheRegion::PdpPolicy => 2,
            CacheRegion::PdpPolicyList => 3,
            CacheRegion::Config => 4,
            CacheRegion::Subscriber => 5,
            CacheRegion::SubscriberList => 6,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(CacheRegion::PapPolicy),
            1 => Some(CacheRegion::PapPolicyList),
            2 => Some(CacheRegion::PdpPolicy),
            3 => Some(CacheRegion::PdpPolicyList),
            4 => Some(CacheRegion::Config),
            5 => Some(CacheRegion::Subscriber),
            6 => Some(CacheRegion::SubscriberList),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CacheRegion::PapPolicy => "pap_policy",
            CacheRegion::PapPolicyList => "pap_policy_list",
            CacheRegion::PdpPolicy => "pdp_policy",
            CacheRegion::PdpPolicyList => "pdp_policy_list",
            CacheRegion::Config => "config",
            CacheRegion::Subscriber => "subscriber",
            CacheRegion::SubscriberList => "subscriber_list",
        }
    }
}

/// A cache key that is scoped to a specific tenant.
///
/// # Binary Format
///
/// - Bytes 0-3: tenant id (big-endian i32)
/// - Byte 4: separator (0xFF)
/// - Byte 5: region discriminant
/// - Bytes 6..: entry key (UTF-8)
///
/// The fixed-width tenant prefix sorts one tenant's entries together, so a
/// prefix scan can drop a whole tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantScopedKey {
    inner: TenantKeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TenantKeyInner {
    tenant: TenantId,
    region: CacheRegion,
    entry: String,
}

impl TenantScopedKey {
    pub fn new(tenant: TenantId, region: CacheRegion, entry: impl Into<String>) -> Self {
        Self {
            inner: TenantKeyInner {
                tenant,
                region,
                entry: entry.into(),
            },
        }
    }

    pub fn tenant(&self) -> TenantId {
        self.inner.tenant
    }

    pub fn region(&self) -> CacheRegion {
        self.inner.region
    }

    pub fn entry(&self) -> &str {
        &self.inner.entry
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(TENANT_PREFIX_LEN + 1 + self.inner.entry.len());
        bytes.extend_from_slice(&Self::tenant_prefix(self.inner.tenant));
        bytes.push(self.inner.region.as_byte());
        bytes.extend_from_slice(self.inner.entry.as_bytes());
        bytes
    }

    /// Decode a key from bytes. Returns `None` for truncated input, a missing
    /// separator, an unknown region or a non-UTF-8 entry key.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < TENANT_PREFIX_LEN + 1 {
            return None;
        }
        if bytes[4] != SEPARATOR {
            return None;
        }
        let tenant = TenantId::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let region = CacheRegion::from_byte(bytes[5])?;
        let entry = std::str::from_utf8(&bytes[6..]).ok()?.to_string();
        Some(Self::new(tenant, region, entry))
    }

    /// Prefix shared by every key of a tenant.
    pub fn tenant_prefix(tenant: TenantId) -> [u8; TENANT_PREFIX_LEN] {
        let mut prefix = [0u8; TENANT_PREFIX_LEN];
        prefix[0..4].copy_from_slice(&tenant.to_be_bytes());
        prefix[4] = SEPARATOR;
        prefix
    }

    /// Prefix shared by every key of one region of a tenant.
    pub fn tenant_region_prefix(tenant: TenantId, region: CacheRegion) -> [u8; 6] {
        let mut prefix = [0u8; 6];
        prefix[0..5].copy_from_slice(&Self::tenant_prefix(tenant));
        prefix[5] = region.as_byte();
        prefix
    }
}
