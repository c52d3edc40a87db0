//! Container-aware blob client.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{BlobStoreError, Result};
use crate::storage::{ObjectStoreConfig, Storage, DIRECTORY_CONTENT_TYPE};
use crate::types::{BlobAccess, BlobProperties, ListOptions, ListPage, ObjectInfo};

#[derive(Debug, Default)]
struct ContainerState {
    access: BlobAccess,
    metadata: BTreeMap<String, String>,
    blob_access: BTreeMap<String, BlobAccess>,
}

#[derive(Debug)]
struct Container {
    storage: Storage,
    state: RwLock<ContainerState>,
}

/// A connection to one object storage endpoint.
///
/// Containers are opened lazily through [`BlobClient::create_container`]; each
/// maps onto its own `object_store` store. Access flags and container level
/// metadata are kept in the client, since `object_store` has no notion of
/// either.
///
/// Locks are only ever held while touching the container table, never across
/// a call into the store.
#[derive(Debug)]
pub struct BlobClient {
    id: String,
    config: ObjectStoreConfig,
    containers: RwLock<BTreeMap<String, Arc<Container>>>,
}

impl BlobClient {
    pub fn new(config: ObjectStoreConfig) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            config,
            containers: RwLock::new(BTreeMap::new()),
        }
    }

    /// A client whose containers live in memory.
    pub fn memory() -> Self {
        Self::new(ObjectStoreConfig::Memory)
    }

    /// Identity of this connection. Two paths can be operated on together
    /// (native copy) only when their clients share an id.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &ObjectStoreConfig {
        &self.config
    }

    fn container(&self, name: &str) -> Result<Arc<Container>> {
        self.containers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BlobStoreError::ContainerNotFound(name.to_string()))
    }

    fn validate_container_name(name: &str) -> Result<()> {
        if name.trim().is_empty() || name.contains('/') {
            return Err(BlobStoreError::InvalidContainerName(name.to_string()));
        }
        Ok(())
    }

    /* Containers */

    /// Create (or, for S3, register an existing bucket as) a container.
    ///
    /// Returns `false` if the container already existed.
    pub async fn create_container(&self, name: &str) -> Result<bool> {
        Self::validate_container_name(name)?;
        if self.containers.read().contains_key(name) {
            return Ok(false);
        }

        let storage = Storage::open(&self.config, name).await?;

        let mut containers = self.containers.write();
        if containers.contains_key(name) {
            return Ok(false);
        }
        containers.insert(
            name.to_string(),
            Arc::new(Container {
                storage,
                state: RwLock::new(ContainerState::default()),
            }),
        );
        tracing::debug!(client = %self.id, container = name, "created container");
        Ok(true)
    }

    /// Remove every blob in the container, then forget it.
    pub async fn delete_container(&self, name: &str) -> Result<()> {
        let container = self.container(name)?;
        let keys = container.storage.list_keys().await?;
        tracing::debug!(container = name, blobs = keys.len(), "deleting container");
        for key in keys {
            container.storage.delete_key(&key).await?;
        }
        self.containers.write().remove(name);
        Ok(())
    }

    pub fn container_exists(&self, name: &str) -> bool {
        self.containers.read().contains_key(name)
    }

    pub fn containers(&self) -> Vec<String> {
        self.containers.read().keys().cloned().collect()
    }

    pub fn container_access(&self, name: &str) -> Result<BlobAccess> {
        Ok(self.container(name)?.state.read().access)
    }

    pub fn set_container_access(&self, name: &str, access: BlobAccess) -> Result<()> {
        self.container(name)?.state.write().access = access;
        Ok(())
    }

    pub fn container_metadata(&self, name: &str) -> Result<BTreeMap<String, String>> {
        Ok(self.container(name)?.state.read().metadata.clone())
    }

    pub fn set_container_metadata(
        &self,
        name: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<()> {
        self.container(name)?.state.write().metadata = metadata;
        Ok(())
    }

    /* Access flags */

    /// Access level of a blob; defaults to that of its container.
    pub fn blob_access(&self, container: &str, name: &str) -> Result<BlobAccess> {
        let container = self.container(container)?;
        let state = container.state.read();
        Ok(state.blob_access.get(name).copied().unwrap_or(state.access))
    }

    pub fn set_blob_access(&self, container: &str, name: &str, access: BlobAccess) -> Result<()> {
        self.container(container)?
            .state
            .write()
            .blob_access
            .insert(name.to_string(), access);
        Ok(())
    }

    /* Blobs */

    /// Metadata for `name`: a blob, an explicit directory marker, or a prefix
    /// with blobs beneath it, checked in that order.
    pub async fn stat(&self, container: &str, name: &str) -> Result<Option<ObjectInfo>> {
        let container = self.container(container)?;
        if let Some(info) = container.storage.head_object(name).await? {
            return Ok(Some(info));
        }
        if let Some(info) = container.storage.head_marker(name).await? {
            return Ok(Some(info));
        }
        if container.storage.has_descendants(name).await? {
            return Ok(Some(ObjectInfo::implicit_directory(name)));
        }
        Ok(None)
    }

    pub async fn get(&self, container: &str, name: &str) -> Result<Option<Bytes>> {
        let container = self.container(container)?;
        Ok(container
            .storage
            .get_object(name)
            .await?
            .map(|(bytes, _)| bytes))
    }

    /// Upload a blob, recording the MD5 of its content.
    pub async fn put(
        &self,
        container: &str,
        name: &str,
        data: Bytes,
        mut properties: BlobProperties,
    ) -> Result<()> {
        let container = self.container(container)?;
        properties.content_md5 = Some(format!("{:x}", md5::compute(&data)));
        tracing::debug!(name, size = data.len(), "put blob");
        container.storage.put_object(name, data, &properties).await
    }

    pub async fn remove(&self, container_name: &str, name: &str) -> Result<()> {
        let container = self.container(container_name)?;
        container.storage.delete_object(name).await?;
        container.state.write().blob_access.remove(name);
        Ok(())
    }

    pub async fn create_directory(
        &self,
        container: &str,
        name: &str,
        mut properties: BlobProperties,
    ) -> Result<()> {
        let container = self.container(container)?;
        properties.content_type = Some(DIRECTORY_CONTENT_TYPE.to_string());
        container.storage.put_marker(name, &properties).await
    }

    pub async fn remove_directory(&self, container_name: &str, name: &str) -> Result<()> {
        let container = self.container(container_name)?;
        container.storage.delete_marker(name).await?;
        container.state.write().blob_access.remove(name);
        Ok(())
    }

    /// Replace the user metadata of a blob or directory.
    ///
    /// `object_store` cannot patch attributes in place, so blobs are rewritten
    /// with their existing content. An implicit directory gains a marker.
    pub async fn set_user_metadata(
        &self,
        container_name: &str,
        name: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<()> {
        let container = self.container(container_name)?;

        if let Some((data, info)) = container.storage.get_object(name).await? {
            let mut properties = info.properties;
            properties.user_metadata = metadata;
            return container.storage.put_object(name, data, &properties).await;
        }

        let properties = match container.storage.head_marker(name).await? {
            Some(info) => info.properties,
            None => {
                if !container.storage.has_descendants(name).await? {
                    return Err(BlobStoreError::NotFound(format!(
                        "{}/{}",
                        container_name, name
                    )));
                }
                BlobProperties::default().with_content_type(DIRECTORY_CONTENT_TYPE)
            }
        };
        let properties = BlobProperties {
            user_metadata: metadata,
            ..properties
        };
        container.storage.put_marker(name, &properties).await
    }

    /// Copy a blob, content and properties.
    ///
    /// Within one container this is a server side copy; across containers of
    /// the same client the content is relayed through this process.
    pub async fn copy(
        &self,
        from_container: &str,
        from: &str,
        to_container: &str,
        to: &str,
    ) -> Result<()> {
        let source = self.container(from_container)?;
        if from_container == to_container {
            return source.storage.copy_object(from, to).await.map_err(|e| match e {
                BlobStoreError::ObjectStore(object_store::Error::NotFound { .. }) => {
                    BlobStoreError::NotFound(format!("{}/{}", from_container, from))
                }
                other => other,
            });
        }

        let target = self.container(to_container)?;
        let (data, info) = source
            .storage
            .get_object(from)
            .await?
            .ok_or_else(|| BlobStoreError::NotFound(format!("{}/{}", from_container, from)))?;
        target.storage.put_object(to, data, &info.properties).await
    }

    /// List a container, one page at a time.
    pub async fn list(&self, container: &str, options: &ListOptions) -> Result<ListPage> {
        let container = self.container(container)?;
        let prefix = options.prefix.as_deref().unwrap_or("");

        let entries = if options.recursive {
            container.storage.list_descendants(prefix).await?
        } else {
            container.storage.list_children(prefix).await?
        };

        let mut entries: Vec<_> = match &options.marker {
            Some(marker) => entries
                .into_iter()
                .filter(|entry| entry.name.as_str() > marker.as_str())
                .collect(),
            None => entries,
        };

        let next_marker = match options.max_results {
            Some(max) if entries.len() > max => {
                entries.truncate(max);
                entries.last().map(|entry| entry.name.clone())
            }
            _ => None,
        };

        Ok(ListPage {
            entries,
            next_marker,
        })
    }
}
