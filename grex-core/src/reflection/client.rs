//! # Reflection Client
//!
//! A client for `grpc.reflection.v1`, built on the bindings shipped by
//! `tonic-reflection`.
//!
//! Fetching the schema of a symbol is not a single request: the server
//! returns one `FileDescriptorProto` at a time, and each file may import
//! others. [`ReflectionClient::file_descriptor_set_by_symbol`] drives the
//! bidirectional stream until every transitive dependency has been
//! collected into a complete `FileDescriptorSet`.
//!
//! ## References
//!
//! * [gRPC Server Reflection Protocol](https://github.com/grpc/grpc/blob/master/doc/server-reflection.md)
use crate::BoxError;
use futures_util::stream::once;
use http_body::Body as HttpBody;
use prost::Message;
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;
use tonic::{Streaming, client::GrpcService};
use tonic_reflection::pb::v1::{
    ServerReflectionRequest, ServerReflectionResponse,
    server_reflection_client::ServerReflectionClient, server_reflection_request::MessageRequest,
    server_reflection_response::MessageResponse,
};

#[derive(Debug, thiserror::Error)]
pub enum ReflectionResolveError {
    #[error(
        "Failed to start a stream request with the reflection server, reflection might not be supported: '{0}'"
    )]
    ServerStreamInitFailed(#[source] tonic::Status),

    #[error("The server stream returned an error status: '{0}'")]
    ServerStreamFailure(#[source] tonic::Status),

    #[error("Reflection stream closed unexpectedly")]
    StreamClosed,

    #[error("Internal error: Failed to send request to stream")]
    SendFailed,

    #[error("Server returned reflection error code {code}: {message}")]
    ServerError { code: i32, message: String },

    #[error("Protocol error: Received unexpected response type: {0}")]
    UnexpectedResponseType(String),

    #[error("Failed to decode FileDescriptorProto: {0}")]
    DecodeError(#[from] prost::DecodeError),
}

// The host field of a reflection request is undocumented and servers ignore
// it, so it is not surfaced to callers.
const EMPTY_HOST: &str = "";

/// A generic client for the gRPC Server Reflection Protocol.
pub struct ReflectionClient<S = Channel> {
    client: ServerReflectionClient<S>,
}

impl<S> ReflectionClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        Self {
            client: ServerReflectionClient::new(service),
        }
    }

    /// Lists the fully qualified names of all services the server exposes.
    pub async fn list_service_names(&mut self) -> Result<Vec<String>, ReflectionResolveError> {
        let request = ServerReflectionRequest {
            host: EMPTY_HOST.to_string(),
            message_request: Some(MessageRequest::ListServices(String::new())),
        };

        let mut responses = self
            .client
            .server_reflection_info(once(async move { request }))
            .await
            .map_err(ReflectionResolveError::ServerStreamInitFailed)?
            .into_inner();

        let response = next_message(&mut responses).await?;

        match response.message_response {
            Some(MessageResponse::ListServicesResponse(list)) => {
                Ok(list.service.into_iter().map(|s| s.name).collect())
            }
            other => Err(unexpected(other)),
        }
    }

    /// Fetches the complete `FileDescriptorSet` for the file containing the
    /// requested symbol (e.g. `my.package.MyService`), following imports
    /// until every transitive dependency is present.
    pub async fn file_descriptor_set_by_symbol(
        &mut self,
        symbol: &str,
    ) -> Result<FileDescriptorSet, ReflectionResolveError> {
        let (tx, rx) = mpsc::channel(16);

        let mut responses = self
            .client
            .server_reflection_info(ReceiverStream::new(rx))
            .await
            .map_err(ReflectionResolveError::ServerStreamInitFailed)?
            .into_inner();

        send_request(&tx, MessageRequest::FileContainingSymbol(symbol.to_string())).await?;

        let files = collect_transitive_files(&mut responses, tx).await?;

        Ok(FileDescriptorSet {
            file: files.into_values().collect(),
        })
    }
}

/// Drains the response stream, requesting any imported file that has not
/// been seen yet, until no request is in flight.
async fn collect_transitive_files(
    responses: &mut Streaming<ServerReflectionResponse>,
    tx: mpsc::Sender<ServerReflectionRequest>,
) -> Result<HashMap<String, FileDescriptorProto>, ReflectionResolveError> {
    let mut pending = 1usize;
    let mut files: HashMap<String, FileDescriptorProto> = HashMap::new();
    let mut requested: HashSet<String> = HashSet::new();

    while pending > 0 {
        let response = next_message(responses).await?;
        pending -= 1;

        let batch = match response.message_response {
            Some(MessageResponse::FileDescriptorResponse(batch)) => batch.file_descriptor_proto,
            Some(MessageResponse::ErrorResponse(error)) => {
                return Err(ReflectionResolveError::ServerError {
                    code: error.error_code,
                    message: error.error_message,
                });
            }
            other => return Err(unexpected(other)),
        };

        for encoded in batch {
            let file = FileDescriptorProto::decode(encoded.as_ref())?;

            let Some(name) = file.name.clone() else {
                continue;
            };
            if files.contains_key(&name) {
                continue;
            }

            for dependency in &file.dependency {
                if !files.contains_key(dependency) && requested.insert(dependency.clone()) {
                    send_request(&tx, MessageRequest::FileByFilename(dependency.clone())).await?;
                    pending += 1;
                }
            }

            files.insert(name, file);
        }
    }

    Ok(files)
}

async fn send_request(
    tx: &mpsc::Sender<ServerReflectionRequest>,
    request: MessageRequest,
) -> Result<(), ReflectionResolveError> {
    let request = ServerReflectionRequest {
        host: EMPTY_HOST.to_string(),
        message_request: Some(request),
    };

    tx.send(request)
        .await
        .map_err(|_| ReflectionResolveError::SendFailed)
}

async fn next_message(
    stream: &mut Streaming<ServerReflectionResponse>,
) -> Result<ServerReflectionResponse, ReflectionResolveError> {
    stream
        .message()
        .await
        .map_err(ReflectionResolveError::ServerStreamFailure)?
        .ok_or(ReflectionResolveError::StreamClosed)
}

fn unexpected(response: Option<MessageResponse>) -> ReflectionResolveError {
    match response {
        Some(other) => ReflectionResolveError::UnexpectedResponseType(format!("{other:?}")),
        None => ReflectionResolveError::UnexpectedResponseType("Empty Message".into()),
    }
}
