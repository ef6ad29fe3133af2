//! Policy records and the combining-algorithm setting.

use crate::Timestamp;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// PAP POLICY RECORD
// ============================================================================

/// An administration-time policy record (one stored version).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    /// Unique within a tenant.
    pub policy_id: String,
    /// Decimal version string: "1", "2", ...
    pub version: String,
    /// Serialized policy text.
    pub body: String,
    pub order: i32,
    pub active: bool,
    pub published: bool,
    pub last_modified_at: Timestamp,
    pub last_modified_by: Option<String>,
}

impl PolicyRecord {
    /// Create an unpublished, active, first-version record.
    pub fn new(policy_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            policy_id: policy_id.into(),
            version: "1".to_string(),
            body: body.into(),
            order: 0,
            active: true,
            published: false,
            last_modified_at: Utc::now(),
            last_modified_by: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_modified_by(mut self, user: impl Into<String>) -> Self {
        self.last_modified_by = Some(user.into());
        self
    }

    /// Numeric value of the version string. Unparseable versions sort as 0.
    pub fn version_number(&self) -> u64 {
        parse_version(&self.version)
    }

    /// Decision-time projection of this record.
    pub fn to_published(&self) -> PublishedPolicy {
        PublishedPolicy {
            policy_id: self.policy_id.clone(),
            version: self.version.clone(),
            body: self.body.clone(),
            order: self.order,
            active: self.active,
        }
    }
}

/// Parse a decimal version string, treating garbage as 0.
pub fn parse_version(version: &str) -> u64 {
    version.trim().parse().unwrap_or(0)
}

// ============================================================================
// PDP (PUBLISHED) POLICY
// ============================================================================

/// The projection of a policy that the decision point evaluates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPolicy {
    pub policy_id: String,
    pub version: String,
    pub body: String,
    pub order: i32,
    pub active: bool,
}

// ============================================================================
// COMBINING ALGORITHM
// ============================================================================

/// Named policy-combining algorithm. Opaque to this layer; the evaluation
/// engine interprets the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombiningAlgorithm(String);

impl CombiningAlgorithm {
    /// Used when a tenant has no stored setting.
    pub const DEFAULT_URI: &'static str =
        "urn:oasis:names:tc:xacml:3.0:policy-combining-algorithm:deny-overrides";

    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Resolve a stored name, falling back to the default for absent or blank values.
    pub fn resolve(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some(n) if !n.is_empty() => Self(n.to_string()),
            _ => Self::default(),
        }
    }

    pub fn uri(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT_URI
    }
}

impl Default for CombiningAlgorithm {
    fn default() -> Self {
        Self(Self::DEFAULT_URI.to_string())
    }
}

impl fmt::Display for CombiningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
