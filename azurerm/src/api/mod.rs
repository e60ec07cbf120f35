//! Thin Azure Resource Manager REST client
//!
//! [`Client`] owns HTTP, auth, retries and long-running operation polling.
//! Each service area hangs off it as a borrowed sub-API, e.g.
//! `client.resource_groups().get(&ctx, &id)`.

pub mod client;
pub mod common;
pub mod deployments;
pub mod error;
pub mod features;
pub mod locks;
pub mod pool;
pub mod private_link_associations;
pub mod providers;
pub mod resource_groups;
pub mod resources;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use client::{Client, ClientConfig, RetryConfig};
pub use common::{normalize_location, Tags};
pub use error::ApiError;
