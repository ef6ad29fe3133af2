//! Cache-backed backend adapters.
//!
//! Each adapter implements the same backend trait as the backend it wraps.
//! Reads check the matching cache region first and populate it on a miss,
//! negative results included. Writes go to the backend first; only after
//! they succeed is the single-entity entry written through (or invalidated)
//! and the tenant's list region invalidated.

pub mod config;
pub mod policy;
pub mod subscriber;

pub use config::CachedConfigBackend;
pub use policy::CachedPolicyBackend;
pub use subscriber::CachedSubscriberBackend;
