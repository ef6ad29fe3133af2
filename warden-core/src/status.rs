//! Audit status entries recorded for policies and publishers.

use crate::{new_entry_id, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// STATUS ABOUT
// ============================================================================

/// What a status history is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusAbout {
    Policy,
    Publisher,
}

impl StatusAbout {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusAbout::Policy => "POLICY",
            StatusAbout::Publisher => "PUBLISHER",
        }
    }
}

impl fmt::Display for StatusAbout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// STATUS TYPE
// ============================================================================

/// Kind of action a status entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusType {
    AddPolicy,
    UpdatePolicy,
    GetPolicy,
    DeletePolicy,
    PublishPolicy,
    RollbackPolicy,
    EnablePolicy,
    DisablePolicy,
    OrderPolicy,
}

impl StatusType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusType::AddPolicy => "ADD_POLICY",
            StatusType::UpdatePolicy => "UPDATE_POLICY",
            StatusType::GetPolicy => "GET_POLICY",
            StatusType::DeletePolicy => "DELETE_POLICY",
            StatusType::PublishPolicy => "PUBLISH_POLICY",
            StatusType::RollbackPolicy => "ROLLBACK_POLICY",
            StatusType::EnablePolicy => "ENABLE_POLICY",
            StatusType::DisablePolicy => "DISABLE_POLICY",
            StatusType::OrderPolicy => "ORDER_POLICY",
        }
    }
}

impl fmt::Display for StatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusType {
    type Err = StatusTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADD_POLICY" => Ok(StatusType::AddPolicy),
            "UPDATE_POLICY" => Ok(StatusType::UpdatePolicy),
            "GET_POLICY" => Ok(StatusType::GetPolicy),
            "DELETE_POLICY" => Ok(StatusType::DeletePolicy),
            "PUBLISH_POLICY" => Ok(StatusType::PublishPolicy),
            "ROLLBACK_POLICY" => Ok(StatusType::RollbackPolicy),
            "ENABLE_POLICY" => Ok(StatusType::EnablePolicy),
            "DISABLE_POLICY" => Ok(StatusType::DisablePolicy),
            "ORDER_POLICY" => Ok(StatusType::OrderPolicy),
            _ => Err(StatusTypeParseError(s.to_string())),
        }
    }
}

/// Error when parsing an invalid status type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTypeParseError(pub String);

impl fmt::Display for StatusTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid status type: {}", self.0)
    }
}

impl std::error::Error for StatusTypeParseError {}

// ============================================================================
// STATUS ENTRY
// ============================================================================

/// One audit entry. `entry_id` survives migration between stores and is the
/// identity used when histories from two stores are merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub entry_id: Uuid,
    pub status_type: StatusType,
    pub key: String,
    pub target: Option<String>,
    pub target_action: Option<String>,
    pub user: Option<String>,
    pub version: Option<String>,
    pub success: bool,
    pub message: Option<String>,
    pub timestamp: Timestamp,
}

impl StatusEntry {
    /// A successful entry stamped with a fresh id and the current time.
    pub fn new(status_type: StatusType, key: impl Into<String>) -> Self {
        Self {
            entry_id: new_entry_id(),
            status_type,
            key: key.into(),
            target: None,
            target_action: None,
            user: None,
            version: None,
            success: true,
            message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>, action: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self.target_action = Some(action.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.success = false;
        self.message = Some(message.into());
        self
    }

    /// A delete entry purges the whole history of its key.
    pub fn is_delete(&self) -> bool {
        self.status_type == StatusType::DeletePolicy
    }
}
