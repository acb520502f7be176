//! Media upload adapter boundary.
//!
//! The submission pipeline only ever sees this trait: a blob goes in, a
//! durable URL and an opaque deletion handle come out. Timeout and retry
//! budgets are owned by the pipeline, not the adapter.

pub mod cloudinary;

use futures::future::BoxFuture;
use thiserror::Error;

/// Result alias for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// A stored media asset as returned by the upload service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    /// Durable URL serving the asset.
    pub url: String,
    /// Opaque handle accepted by the deletion endpoint.
    pub delete_handle: String,
}

/// Failures raised by media upload backends.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The HTTP client could not be constructed.
    #[error("failed to build media service client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The request never reached the service (network, TLS, timeout).
    #[error("failed to send request to media service")]
    RequestSend {
        #[source]
        source: reqwest::Error,
    },
    /// The service answered with a non-success status.
    #[error("media service returned status {status}")]
    RequestStatus { status: reqwest::StatusCode },
    /// The response payload could not be decoded.
    #[error("failed to decode media service response")]
    DecodeResponse {
        #[source]
        source: reqwest::Error,
    },
    /// Required environment variables are missing.
    #[error("media service is not configured (missing `{var}`)")]
    MissingEnvVar { var: &'static str },
}

/// Abstraction over the external object-storage service for photo assets.
pub trait MediaStore: Send + Sync {
    /// Transfer a binary blob, returning its durable URL and deletion handle.
    fn upload(
        &self,
        bytes: Vec<u8>,
        filename: String,
    ) -> BoxFuture<'static, MediaResult<StoredMedia>>;

    /// Delete a previously stored asset. Callers treat failures as non-fatal.
    fn delete(&self, delete_handle: String) -> BoxFuture<'static, MediaResult<()>>;
}
