//! # Server Reflection
//!
//! The wire-level client for the gRPC Server Reflection Protocol, used by
//! [`RemoteSource`](crate::source::RemoteSource) to fetch descriptors from
//! a running server.
pub mod client;
