//! Error type for Warden storage operations.
//!
//! The storage layer reports every backend failure through a single error
//! kind. Not-found is never an error: lookups return `Ok(None)` or an empty
//! collection instead.

use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Boxed cause attached to an [`EntitlementError`].
pub type ErrorSource = Arc<dyn StdError + Send + Sync + 'static>;

/// The single failure kind raised by stores, backends and caches.
#[derive(Debug, Clone, Error)]
#[error("Entitlement operation failed: {message}")]
pub struct EntitlementError {
    message: String,
    #[source]
    source: Option<ErrorSource>,
}

impl EntitlementError {
    /// Create an error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create an error wrapping an underlying cause.
    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Error for an in-memory lock that was poisoned by a panicking writer.
    pub fn lock_poisoned(what: &str) -> Self {
        Self::new(format!("{what} lock poisoned"))
    }

    /// Error for a value that could not be (de)serialized.
    pub fn serialization(what: &str, source: serde_json::Error) -> Self {
        Self::with_source(format!("failed to serialize {what}"), source)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn underlying(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }
}

/// Result type alias for Warden operations.
pub type EntitlementResult<T> = Result<T, EntitlementError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_message() {
        let err = EntitlementError::new("policy table unreachable");
        let msg = format!("{}", err);
        assert!(msg.contains("Entitlement operation failed"));
        assert!(msg.contains("policy table unreachable"));
        assert!(err.underlying().is_none());
    }

    #[test]
    fn test_with_source_exposes_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = EntitlementError::with_source("write failed", io);
        assert_eq!(err.message(), "write failed");
        let cause = StdError::source(&err).expect("source should be set");
        assert!(cause.to_string().contains("disk gone"));
    }

    #[test]
    fn test_clone_shares_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = EntitlementError::with_source("read failed", io);
        let cloned = err.clone();
        assert_eq!(cloned.message(), err.message());
        assert!(cloned.underlying().is_some());
    }

    #[test]
    fn test_lock_poisoned_message() {
        let err = EntitlementError::lock_poisoned("policy table");
        assert!(err.to_string().contains("policy table lock poisoned"));
    }
}
