//! Error types for the blob client.

/// Errors that can occur when working with the blob client.
#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    /// Object storage error
    #[error("object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Blob not found
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The container has not been created (or registered) on this client
    #[error("container '{0}' does not exist")]
    ContainerNotFound(String),

    /// Container names are a single non-empty segment
    #[error("invalid container name: {0:?}")]
    InvalidContainerName(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The backend cannot perform the requested primitive
    #[error("operation not supported by this backend: {0}")]
    Unsupported(String),
}

/// Result type alias for blob client operations.
pub type Result<T> = std::result::Result<T, BlobStoreError>;
