//! Filesystem level errors.

use object_store_client::BlobStoreError;

use crate::acl::AclError;
use crate::config::ConfigError;
use crate::path::{CloudPath, FileSystemId, PathError};

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    #[error("no such file or directory: {0}")]
    NotFound(CloudPath),

    #[error("file already exists: {0}")]
    AlreadyExists(CloudPath),

    #[error("directory not empty: {0}")]
    NotEmpty(CloudPath),

    #[error("not a directory: {0}")]
    NotDirectory(CloudPath),

    #[error("access denied: {0}")]
    AccessDenied(CloudPath),

    #[error("acl error: {0}")]
    Acl(#[from] AclError),

    #[error("backend error: {0}")]
    Backend(#[from] BlobStoreError),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("no filesystem mounted as '{0}'")]
    FileSystemNotFound(FileSystemId),

    #[error("filesystem '{0}' is already mounted")]
    AlreadyMounted(FileSystemId),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{path} does not belong to filesystem '{expected}'")]
    ForeignPath {
        path: CloudPath,
        expected: FileSystemId,
    },

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    #[error("stored acl could not be decoded: {0}")]
    AclEncoding(#[from] serde_json::Error),

    #[error("moved {from} to {to} but could not delete the source: {cause}")]
    MoveIncomplete {
        from: CloudPath,
        to: CloudPath,
        cause: Box<FsError>,
    },
}

pub type Result<T> = std::result::Result<T, FsError>;
