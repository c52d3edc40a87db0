//! # Operation engine
//!
//! A [`CloudEngine`] carries out filesystem operations against the backend of
//! a [`CloudFileSystem`]: it reads attributes, asks the security manager, and
//! issues the backend calls. The engine is chosen when a filesystem is
//! mounted and stored on its handle; the [`Dispatcher`](crate::Dispatcher)
//! hands every engine call a homogeneous set of paths.
//!
//! Copies report which strategy moved the data as a [`CopyMethod`]: a
//! backend-native copy when both filesystems share a backend connection, and
//! otherwise (or when the native attempt fails in the backend) a copy relayed
//! through this process.

mod default;
mod options;

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use bytes::Bytes;

use crate::acl::{AclPermission, AclSet};
use crate::attributes::{AclAttributes, AttributeValue};
use crate::error::Result;
use crate::filesystem::CloudFileSystem;
use crate::path::CloudPath;

pub use default::DefaultCloudEngine;
pub use options::{CloudOption, CloudOptions, OpenIntent};

/// How a copy was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CopyMethod {
    /// The backend copied the data itself
    CloudOptimised,
    /// A backend specific primitive was used
    VendorSpecific,
    /// The data was streamed through this process
    LocalFallback,
}

/// Operations over the paths of mounted filesystems.
///
/// Every path passed in must belong to the filesystem given alongside it;
/// anything else fails with [`FsError::ForeignPath`](crate::FsError::ForeignPath).
#[async_trait]
pub trait CloudEngine: std::fmt::Debug + Send + Sync {
    async fn read_attributes(&self, fs: &CloudFileSystem, path: &CloudPath)
        -> Result<AclAttributes>;

    async fn read_attribute_map(
        &self,
        fs: &CloudFileSystem,
        path: &CloudPath,
        selection: &str,
    ) -> Result<BTreeMap<String, AttributeValue>>;

    /// Replace the ACL of `path`, on behalf of the current principal.
    async fn set_acl(&self, fs: &CloudFileSystem, path: &CloudPath, acl: &AclSet) -> Result<()>;

    async fn check_access(
        &self,
        fs: &CloudFileSystem,
        path: &CloudPath,
        permissions: &BTreeSet<AclPermission>,
    ) -> Result<()>;

    /// Create a directory, or a container for a one segment path.
    async fn create_directory(&self, fs: &CloudFileSystem, path: &CloudPath) -> Result<()>;

    async fn write_file(
        &self,
        fs: &CloudFileSystem,
        path: &CloudPath,
        data: Bytes,
        intents: &BTreeSet<OpenIntent>,
    ) -> Result<()>;

    async fn read_file(&self, fs: &CloudFileSystem, path: &CloudPath) -> Result<Bytes>;

    /// The direct children of a directory or container.
    async fn list(&self, fs: &CloudFileSystem, directory: &CloudPath) -> Result<Vec<CloudPath>>;

    async fn delete(
        &self,
        fs: &CloudFileSystem,
        paths: &[CloudPath],
        options: &CloudOptions,
    ) -> Result<()>;

    /// Copy each `(source, target)` pair, returning how each source was copied.
    async fn copy(
        &self,
        source_fs: &CloudFileSystem,
        target_fs: &CloudFileSystem,
        pairs: &[(CloudPath, CloudPath)],
        options: &CloudOptions,
    ) -> Result<BTreeMap<CloudPath, CopyMethod>>;

    /// Copy each pair, then delete the source.
    async fn move_paths(
        &self,
        source_fs: &CloudFileSystem,
        target_fs: &CloudFileSystem,
        pairs: &[(CloudPath, CloudPath)],
        options: &CloudOptions,
    ) -> Result<()>;
}
