//! Route-specific response types.
//!
//! Each submodule owns the serializable payloads of one group of endpoints,
//! together with the path constants the router mounts them under.

pub mod countries;
pub mod facilities;
pub mod stats;
