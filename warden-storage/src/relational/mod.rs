//! Stores over the relational backend traits.
//!
//! These hold the per-family business rules (versioning, partial subscriber
//! updates, status retention). Whether the backend they talk to is cached is
//! decided by whoever builds them.

pub mod config;
pub mod policy;
pub mod status;
pub mod subscriber;

pub use config::RelationalConfigStore;
pub use policy::RelationalPolicyStore;
pub use status::RelationalStatusStore;
pub use subscriber::RelationalSubscriberStore;
