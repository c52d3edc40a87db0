//! Blob client over object storage
//!
//! This crate exposes the flat primitives the filesystem layer is built on:
//! containers (one `object_store` store per container), blobs with
//! properties and user metadata, directory markers, listing by prefix with
//! pagination markers, blob copy and public/private access flags.
//!
//! # Backends
//!
//! - In-memory (tests, scratch mounts)
//! - Local filesystem (one sub-directory per container)
//! - S3-compatible storage (one bucket per container)
//!
//! # Example
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use object_store_client::{BlobClient, BlobProperties};
//!
//! # async fn example() -> Result<(), object_store_client::BlobStoreError> {
//! let client = BlobClient::memory();
//! client.create_container("photos").await?;
//! client
//!     .put("photos", "2024/beach.jpg", Bytes::from_static(b"..."), BlobProperties::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod storage;
mod types;

pub use client::BlobClient;
pub use error::{BlobStoreError, Result};
pub use storage::{ObjectStoreConfig, DIRECTORY_CONTENT_TYPE, DIRECTORY_MARKER};
pub use types::{BlobAccess, BlobProperties, ListEntry, ListOptions, ListPage, ObjectInfo, ObjectKind};
