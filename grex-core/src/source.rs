//! # Descriptor Source
//!
//! The collaborator the resolver consumes: something that can enumerate the
//! services a server exposes and look up raw message/enum descriptors by
//! fully qualified name.
//!
//! The [`DescriptorSource`] trait keeps the resolver independent of where
//! descriptors come from, so tests can run it against an in-memory fake.
//! [`RemoteSource`] is the production implementation: it speaks the gRPC
//! Server Reflection Protocol and indexes every descriptor declared in the
//! fetched files.
use crate::BoxError;
use crate::reflection::client::{ReflectionClient, ReflectionResolveError};
use http_body::Body as HttpBody;
use prost_types::{
    DescriptorProto, EnumDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    ServiceDescriptorProto,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use tonic::Code;
use tonic::client::GrpcService;
use tonic::transport::{Channel, Endpoint};

/// Errors that can occur when connecting to a gRPC server.
#[derive(Debug, thiserror::Error)]
pub enum ClientConnectError {
    #[error("Invalid URL '{0}': {1}")]
    InvalidUrl(String, #[source] tonic::transport::Error),
    #[error("Failed to connect to '{0}': {1}")]
    ConnectionFailed(String, #[source] tonic::transport::Error),
}

/// A provider of raw service/message/enum descriptors.
///
/// [`list_services`](DescriptorSource::list_services) performs whatever I/O
/// is needed to enumerate the server's services and gather the descriptors
/// they reference. The two lookup operations are infallible: absence of a
/// name is a representable outcome, not an error. Implementations accept
/// fully qualified names with or without the leading dot that protobuf
/// descriptors use in type references (`.pkg.Type`).
#[allow(async_fn_in_trait)]
pub trait DescriptorSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Enumerates the server's services, keyed by fully qualified name.
    ///
    /// The returned map is ordered, so enumeration order (and with it the
    /// order of the resolver's output) is deterministic for a stable
    /// source.
    async fn list_services(
        &mut self,
    ) -> Result<BTreeMap<String, ServiceDescriptorProto>, Self::Error>;

    /// Looks up a message descriptor by fully qualified name.
    fn resolve_type(&self, full_name: &str) -> Option<&DescriptorProto>;

    /// Looks up an enum descriptor by fully qualified name.
    fn resolve_enum(&self, full_name: &str) -> Option<&EnumDescriptorProto>;
}

/// An index of every message, enum and service declared in a set of
/// `FileDescriptorProto`s, keyed by fully qualified name.
///
/// Nested declarations are indexed under their enclosing message scopes
/// (`pkg.Outer.Inner`). Files are deduplicated by file name: the first
/// registration wins.
#[derive(Debug, Clone, Default)]
pub struct DescriptorIndex {
    files: HashSet<String>,
    messages: HashMap<String, DescriptorProto>,
    enums: HashMap<String, EnumDescriptorProto>,
    services: HashMap<String, ServiceDescriptorProto>,
}

impl DescriptorIndex {
    pub fn add_file_descriptor_set(&mut self, set: FileDescriptorSet) {
        for file in set.file {
            self.add_file(file);
        }
    }

    pub fn add_file(&mut self, file: FileDescriptorProto) {
        if !self.files.insert(file.name().to_string()) {
            return;
        }

        let package = file.package().to_string();
        for message in &file.message_type {
            self.index_message(&package, message);
        }
        for enum_descriptor in &file.enum_type {
            self.enums
                .insert(qualify(&package, enum_descriptor.name()), enum_descriptor.clone());
        }
        for service in &file.service {
            self.services
                .insert(qualify(&package, service.name()), service.clone());
        }
    }

    fn index_message(&mut self, scope: &str, message: &DescriptorProto) {
        let full_name = qualify(scope, message.name());

        for nested in &message.nested_type {
            self.index_message(&full_name, nested);
        }
        for enum_descriptor in &message.enum_type {
            self.enums
                .insert(qualify(&full_name, enum_descriptor.name()), enum_descriptor.clone());
        }

        self.messages.insert(full_name, message.clone());
    }

    pub fn message(&self, full_name: &str) -> Option<&DescriptorProto> {
        self.messages.get(strip_leading_dot(full_name))
    }

    pub fn enumeration(&self, full_name: &str) -> Option<&EnumDescriptorProto> {
        self.enums.get(strip_leading_dot(full_name))
    }

    pub fn service(&self, full_name: &str) -> Option<&ServiceDescriptorProto> {
        self.services.get(strip_leading_dot(full_name))
    }
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

fn strip_leading_dot(name: &str) -> &str {
    name.strip_prefix('.').unwrap_or(name)
}

/// The production [`DescriptorSource`]: a reflection client plus the index
/// of every descriptor fetched through it.
pub struct RemoteSource<S = Channel> {
    reflection: ReflectionClient<S>,
    index: DescriptorIndex,
}

impl RemoteSource<Channel> {
    /// Connects to a gRPC server.
    ///
    /// The connection lives as long as the returned source and is released
    /// when it is dropped.
    ///
    /// # Arguments
    ///
    /// * `addr` - The server URI (e.g., `http://localhost:50051`).
    pub async fn connect(addr: &str) -> Result<Self, ClientConnectError> {
        let endpoint = Endpoint::new(addr.to_string())
            .map_err(|e| ClientConnectError::InvalidUrl(addr.to_string(), e))?;

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| ClientConnectError::ConnectionFailed(addr.to_string(), e))?;

        Ok(Self::from_service(channel))
    }
}

impl<S> RemoteSource<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    /// Creates a source from an existing Tonic service/channel.
    pub fn from_service(service: S) -> Self {
        Self {
            reflection: ReflectionClient::new(service),
            index: DescriptorIndex::default(),
        }
    }
}

impl<S> DescriptorSource for RemoteSource<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    type Error = ReflectionResolveError;

    async fn list_services(
        &mut self,
    ) -> Result<BTreeMap<String, ServiceDescriptorProto>, Self::Error> {
        let names = self.reflection.list_service_names().await?;

        for name in &names {
            // Several services usually live in the same file; skip the
            // round trip once a service is already indexed.
            if self.index.service(name).is_some() {
                continue;
            }
            let set = match self.reflection.file_descriptor_set_by_symbol(name).await {
                Ok(set) => set,
                // A listed service the server cannot describe is dropped
                // from the map rather than failing the whole enumeration.
                Err(ReflectionResolveError::ServerStreamFailure(status))
                    if status.code() == Code::NotFound =>
                {
                    continue;
                }
                Err(ReflectionResolveError::ServerError { code, .. })
                    if code == Code::NotFound as i32 =>
                {
                    continue;
                }
                Err(err) => return Err(err),
            };
            self.index.add_file_descriptor_set(set);
        }

        let mut services = BTreeMap::new();
        for name in names {
            if let Some(descriptor) = self.index.service(&name) {
                services.insert(name, descriptor.clone());
            }
        }

        Ok(services)
    }

    fn resolve_type(&self, full_name: &str) -> Option<&DescriptorProto> {
        self.index.message(full_name)
    }

    fn resolve_enum(&self, full_name: &str) -> Option<&EnumDescriptorProto> {
        self.index.enumeration(full_name)
    }
}
