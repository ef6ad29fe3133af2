//! Identity types for Warden entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Tenant identifier. Every stored record and every cache entry lives
/// inside exactly one tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(i32);

impl TenantId {
    /// The super tenant that owns deployment-wide records.
    pub const SUPER: TenantId = TenantId(-1234);

    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    pub const fn as_i32(&self) -> i32 {
        self.0
    }

    /// Big-endian bytes, used as the leading component of encoded cache keys
    /// so that one tenant's entries sort together.
    pub fn to_be_bytes(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Self(i32::from_be_bytes(bytes))
    }
}

impl From<i32> for TenantId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generate a new UUIDv7 (timestamp-sortable) for status entries.
pub fn new_entry_id() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_id_bytes_roundtrip() {
        for raw in [0, 1, 5, -1234, i32::MAX, i32::MIN] {
            let tenant = TenantId::new(raw);
            assert_eq!(TenantId::from_be_bytes(tenant.to_be_bytes()), tenant);
        }
    }

    #[test]
    fn test_tenant_id_display() {
        assert_eq!(TenantId::new(5).to_string(), "5");
        assert_eq!(TenantId::SUPER.to_string(), "-1234");
    }

    #[test]
    fn test_tenant_id_serializes_as_number() {
        let json = serde_json::to_string(&TenantId::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
