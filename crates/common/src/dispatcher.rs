//! # Dispatcher
//!
//! The [`Dispatcher`] owns the mount table and routes every call to the
//! engine of the filesystem a path belongs to. Engines only accept paths of
//! one filesystem (one pair of filesystems for copy and move), so batch calls
//! are partitioned first, issued once per partition and the results merged.
//!
//! Partitions are processed in filesystem id order. With `FAIL_SILENTLY`
//! unset, the first failing partition aborts the rest of the batch.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bytes::Bytes;
use object_store_client::{BlobClient, ObjectStoreConfig};
use parking_lot::RwLock;

use crate::acl::{AclPermission, AclSet};
use crate::attributes::{AclAttributes, AttributeValue};
use crate::config::CloudFsConfig;
use crate::engine::{CloudOptions, CopyMethod, DefaultCloudEngine, OpenIntent};
use crate::error::{FsError, Result};
use crate::filesystem::CloudFileSystem;
use crate::path::{CloudPath, FileSystemId};

type Partition = (Arc<CloudFileSystem>, Vec<CloudPath>);
type PairPartition = (
    Arc<CloudFileSystem>,
    Arc<CloudFileSystem>,
    Vec<(CloudPath, CloudPath)>,
);

#[derive(Debug, Default)]
pub struct Dispatcher {
    mounts: RwLock<BTreeMap<FileSystemId, Arc<CloudFileSystem>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount every filesystem in `config`.
    ///
    /// Mounts with identical store configuration share one backend client,
    /// so copies between them can be done natively.
    pub fn from_config(config: &CloudFsConfig) -> Result<Self> {
        config.validate()?;

        let dispatcher = Self::new();
        let mut clients: Vec<(ObjectStoreConfig, Arc<BlobClient>)> = Vec::new();
        for mount in &config.mounts {
            let client = match clients.iter().find(|(store, _)| *store == mount.store) {
                Some((_, client)) => client.clone(),
                None => {
                    let client = Arc::new(BlobClient::new(mount.store.clone()));
                    clients.push((mount.store.clone(), client.clone()));
                    client
                }
            };
            let engine = match mount.page_size {
                Some(page_size) => DefaultCloudEngine::with_page_size(page_size),
                None => DefaultCloudEngine::new(),
            };
            let fs = CloudFileSystem::new(
                mount.id.as_str(),
                client,
                Arc::new(engine),
                mount.security.host_configuration(),
            );
            dispatcher.mount(fs)?;
        }
        tracing::debug!(
            mounts = config.mounts.len(),
            clients = clients.len(),
            "mounted from config"
        );
        Ok(dispatcher)
    }

    /* Mount table */

    /// Add a filesystem. Fails if its id is already mounted.
    pub fn mount(&self, fs: CloudFileSystem) -> Result<Arc<CloudFileSystem>> {
        let fs = Arc::new(fs);
        let mut mounts = self.mounts.write();
        if mounts.contains_key(fs.id()) {
            return Err(FsError::AlreadyMounted(fs.id().clone()));
        }
        mounts.insert(fs.id().clone(), fs.clone());
        tracing::debug!(fs = %fs.id(), "mounted filesystem");
        Ok(fs)
    }

    pub fn unmount(&self, id: &FileSystemId) -> Option<Arc<CloudFileSystem>> {
        self.mounts.write().remove(id)
    }

    pub fn file_systems(&self) -> Vec<FileSystemId> {
        self.mounts.read().keys().cloned().collect()
    }

    pub fn file_system(&self, id: &FileSystemId) -> Result<Arc<CloudFileSystem>> {
        self.mounts
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| FsError::FileSystemNotFound(id.clone()))
    }

    /// The filesystem owning `path`.
    pub fn resolve(&self, path: &CloudPath) -> Result<Arc<CloudFileSystem>> {
        self.file_system(path.file_system())
    }

    /// Containers present on a mounted filesystem.
    pub fn containers(&self, id: &FileSystemId) -> Result<Vec<CloudPath>> {
        let fs = self.file_system(id)?;
        fs.store()
            .containers()
            .into_iter()
            .map(|container| CloudPath::from_segments(id.clone(), true, [container]))
            .map(|path| path.map_err(FsError::from))
            .collect()
    }

    fn partition(&self, paths: &[CloudPath]) -> Result<BTreeMap<FileSystemId, Partition>> {
        let mut partitions: BTreeMap<FileSystemId, Partition> = BTreeMap::new();
        for path in paths {
            if let Some((_, group)) = partitions.get_mut(path.file_system()) {
                group.push(path.clone());
                continue;
            }
            let fs = self.resolve(path)?;
            partitions.insert(path.file_system().clone(), (fs, vec![path.clone()]));
        }
        Ok(partitions)
    }

    fn partition_pairs(
        &self,
        pairs: &[(CloudPath, CloudPath)],
    ) -> Result<BTreeMap<(FileSystemId, FileSystemId), PairPartition>> {
        let mut partitions: BTreeMap<(FileSystemId, FileSystemId), PairPartition> =
            BTreeMap::new();
        for (source, target) in pairs {
            let key = (source.file_system().clone(), target.file_system().clone());
            if !partitions.contains_key(&key) {
                let source_fs = self.resolve(source)?;
                let target_fs = self.resolve(target)?;
                partitions.insert(key.clone(), (source_fs, target_fs, Vec::new()));
            }
            if let Some((_, _, group)) = partitions.get_mut(&key) {
                group.push((source.clone(), target.clone()));
            }
        }
        Ok(partitions)
    }

    /* Single path operations */

    pub async fn read_attributes(&self, path: &CloudPath) -> Result<AclAttributes> {
        let fs = self.resolve(path)?;
        fs.engine().read_attributes(&fs, path).await
    }

    pub async fn read_attribute_map(
        &self,
        path: &CloudPath,
        selection: &str,
    ) -> Result<BTreeMap<String, AttributeValue>> {
        let fs = self.resolve(path)?;
        fs.engine().read_attribute_map(&fs, path, selection).await
    }

    pub async fn set_acl(&self, path: &CloudPath, acl: &AclSet) -> Result<()> {
        let fs = self.resolve(path)?;
        fs.engine().set_acl(&fs, path, acl).await
    }

    pub async fn check_access(
        &self,
        path: &CloudPath,
        permissions: &BTreeSet<AclPermission>,
    ) -> Result<()> {
        let fs = self.resolve(path)?;
        fs.engine().check_access(&fs, path, permissions).await
    }

    pub async fn create_directory(&self, path: &CloudPath) -> Result<()> {
        let fs = self.resolve(path)?;
        fs.engine().create_directory(&fs, path).await
    }

    pub async fn write_file(
        &self,
        path: &CloudPath,
        data: impl Into<Bytes>,
        intents: &BTreeSet<OpenIntent>,
    ) -> Result<()> {
        let fs = self.resolve(path)?;
        fs.engine().write_file(&fs, path, data.into(), intents).await
    }

    pub async fn read_file(&self, path: &CloudPath) -> Result<Bytes> {
        let fs = self.resolve(path)?;
        fs.engine().read_file(&fs, path).await
    }

    pub async fn list(&self, directory: &CloudPath) -> Result<Vec<CloudPath>> {
        let fs = self.resolve(directory)?;
        fs.engine().list(&fs, directory).await
    }

    /* Batch operations */

    /// Delete every path.
    ///
    /// Partitions run in filesystem id order, not input order. Without
    /// `FAIL_SILENTLY` the first failure stops the batch, so which items were
    /// already applied depends on the mount ids.
    pub async fn delete(&self, paths: &[CloudPath], options: &CloudOptions) -> Result<()> {
        for (_, (fs, group)) in self.partition(paths)? {
            fs.engine().delete(&fs, &group, options).await?;
        }
        Ok(())
    }

    /// Copy every pair. Returns the copy method per source unless
    /// `DONT_RETURN_COPY_METHOD` is set.
    ///
    /// Partitions run in filesystem id order, not input order. Without
    /// `FAIL_SILENTLY` the first failure stops the batch, so which items were
    /// already applied depends on the mount ids.
    pub async fn copy(
        &self,
        pairs: &[(CloudPath, CloudPath)],
        options: &CloudOptions,
    ) -> Result<Option<BTreeMap<CloudPath, CopyMethod>>> {
        let mut methods = BTreeMap::new();
        for (_, (source_fs, target_fs, group)) in self.partition_pairs(pairs)? {
            let copied = source_fs
                .engine()
                .copy(&source_fs, &target_fs, &group, options)
                .await?;
            methods.extend(copied);
        }
        Ok(options.returns_copy_method().then_some(methods))
    }

    /// Move every pair, partitioned like [`Dispatcher::copy`].
    pub async fn move_paths(
        &self,
        pairs: &[(CloudPath, CloudPath)],
        options: &CloudOptions,
    ) -> Result<()> {
        for (_, (source_fs, target_fs, group)) in self.partition_pairs(pairs)? {
            source_fs
                .engine()
                .move_paths(&source_fs, &target_fs, &group, options)
                .await?;
        }
        Ok(())
    }
}
