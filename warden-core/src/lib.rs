//! WARDEN Core - Entitlement Data Model
//!
//! Policy, configuration, subscriber and status types shared by every store,
//! together with the error type, configuration and the merge utility used to
//! reconcile results from two backends.

pub mod config;
pub mod error;
pub mod filter;
pub mod identity;
pub mod merge;
pub mod policy;
pub mod status;
pub mod subscriber;

pub use config::{CacheConfig, StatusSettings, StorageMode, StoreConfig};
pub use error::{EntitlementError, EntitlementResult, ErrorSource};
pub use filter::WildcardFilter;
pub use identity::{new_entry_id, TenantId, Timestamp};
pub use merge::{merge_dedup, MergeKey};
pub use policy::{parse_version, CombiningAlgorithm, PolicyRecord, PublishedPolicy};
pub use status::{StatusAbout, StatusEntry, StatusType, StatusTypeParseError};
pub use subscriber::{
    CryptoError, SecretDecryptor, Subscriber, SubscriberProperty, SUBSCRIBER_ID_PROPERTY,
};
