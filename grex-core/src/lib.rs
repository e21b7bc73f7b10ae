//! # Grex Core
//!
//! `grex-core` is the foundational library powering the Grex CLI. It asks a
//! running gRPC server for its exposed schema and converts it into a
//! self-contained, serializable tree, suitable for display or for building
//! a generic API explorer on top.
//!
//! ## Key Components
//!
//! * **[`get_info`]:** The main entry point. Connects to a server, resolves
//!   every exposed service and returns the schema tree.
//! * **[`schema`]:** The serializable records of the tree ([`Service`],
//!   [`schema::Method`], [`schema::TypeInfo`], ...).
//! * **[`resolver`]:** The descriptor graph resolver, usable against any
//!   [`DescriptorSource`] implementation.
//! * **[`source`]:** The descriptor source abstraction plus the production
//!   [`RemoteSource`] backed by the gRPC Server Reflection Protocol.
//!
//! ## Failure model
//!
//! Only reaching the server can fail. Once the service map is in hand,
//! resolution always produces a tree: a type reference the server cannot
//! satisfy is represented in-band as an error node, and self-referential
//! schemas are cut short with a cycle marker instead of recursing forever.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost_types` and `tonic` to ensure that consumers
//! use compatible versions of these underlying dependencies.
pub mod reflection;
pub mod resolver;
pub mod schema;
pub mod source;

// Re-exports
pub use prost_types;
pub use tonic;

pub use resolver::{resolve_services, resolve_type_info};
pub use schema::Service;
pub use source::{ClientConnectError, DescriptorSource, RemoteSource};

use reflection::client::ReflectionResolveError;

/// Type alias for the standard boxed error used in generic bounds.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while fetching a server's schema.
#[derive(Debug, thiserror::Error)]
pub enum GetInfoError {
    #[error(transparent)]
    Connect(#[from] ClientConnectError),
    #[error("Failed to enumerate services: '{0}'")]
    Reflection(#[from] ReflectionResolveError),
}

/// Connects to `addr`, resolves the schema of every exposed service and
/// returns the resulting tree.
///
/// The connection is scoped to this call and released on every exit path,
/// success or error. Dropping the returned future cancels any in-flight
/// reflection request.
///
/// # Returns
///
/// * `Ok(services)` - One entry per user-facing service; may be empty.
/// * `Err(GetInfoError)` - The server could not be reached, or the service
///   enumeration failed.
pub async fn get_info(addr: &str) -> Result<Vec<Service>, GetInfoError> {
    let mut source = RemoteSource::connect(addr).await?;
    let services = resolver::resolve_services(&mut source).await?;
    Ok(services)
}
