//! Hybrid stores: a relational primary composed with a legacy secondary.
//!
//! New writes go to the primary. Reads prefer the primary and fall back to
//! the secondary; listings merge both with primary precedence.

pub mod config;
pub mod locks;
pub mod policy;
pub mod status;
pub mod subscriber;

pub use config::HybridConfigStore;
pub use locks::KeyedLocks;
pub use policy::HybridPolicyStore;
pub use status::HybridStatusStore;
pub use subscriber::HybridSubscriberStore;
