//! Object storage backend abstraction (S3/MinIO/local filesystem/memory).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, Attributes, GetOptions, ObjectMeta, ObjectStore, PutOptions, PutPayload,
};
use serde::{Deserialize, Serialize};

use crate::error::{BlobStoreError, Result};
use crate::types::{BlobProperties, ListEntry, ObjectInfo, ObjectKind};

/// Name of the empty blob that marks an explicit directory.
pub const DIRECTORY_MARKER: &str = ".cloudfs_directory";

/// Content type written on directory markers.
pub const DIRECTORY_CONTENT_TYPE: &str = "application/x-directory";

const CONTENT_MD5_KEY: &str = "content-md5";

/// Configuration for the object storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectStoreConfig {
    /// In-memory storage (for testing)
    #[default]
    Memory,

    /// Local filesystem storage, one sub-directory per container
    Local {
        /// Path to the storage directory
        path: PathBuf,
    },

    /// S3-compatible storage (AWS S3, MinIO, etc.), one bucket per container
    S3 {
        /// S3 endpoint URL (e.g., "http://localhost:9000" for MinIO)
        endpoint: String,
        /// Access key ID
        access_key: String,
        /// Secret access key
        secret_key: String,
        /// Optional region (defaults to "us-east-1")
        region: Option<String>,
    },
}

/// A single container's object store.
#[derive(Debug, Clone)]
pub(crate) struct Storage {
    inner: Arc<dyn ObjectStore>,
    // the local filesystem store rejects attributes on put
    attributes: bool,
}

impl Storage {
    /// Open the store backing `container`.
    pub async fn open(config: &ObjectStoreConfig, container: &str) -> Result<Self> {
        let (inner, attributes): (Arc<dyn ObjectStore>, bool) = match config {
            ObjectStoreConfig::Memory => (Arc::new(InMemory::new()), true),

            ObjectStoreConfig::Local { path } => {
                let root = path.join(container);
                tokio::fs::create_dir_all(&root).await?;
                let store = LocalFileSystem::new_with_prefix(&root)
                    .map_err(|e| BlobStoreError::InvalidConfig(e.to_string()))?;
                (Arc::new(store), false)
            }

            ObjectStoreConfig::S3 {
                endpoint,
                access_key,
                secret_key,
                region,
            } => {
                let builder = AmazonS3Builder::new()
                    .with_endpoint(endpoint)
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key)
                    .with_bucket_name(container)
                    .with_region(region.as_deref().unwrap_or("us-east-1"))
                    .with_allow_http(endpoint.starts_with("http://"));

                let store: Arc<dyn ObjectStore> = Arc::new(
                    builder
                        .build()
                        .map_err(|e| BlobStoreError::InvalidConfig(e.to_string()))?,
                );

                // Buckets are provisioned out of band; fail fast if this one is missing
                let mut stream = store.list(None);
                match stream.try_next().await {
                    Ok(_) => {}
                    Err(object_store::Error::NotFound { .. }) => {
                        return Err(BlobStoreError::ContainerNotFound(container.to_string()));
                    }
                    Err(e) => {
                        let msg = e.to_string();
                        if msg.contains("NoSuchBucket") {
                            return Err(BlobStoreError::ContainerNotFound(container.to_string()));
                        }
                        return Err(e.into());
                    }
                }
                drop(stream);

                (store, true)
            }
        };

        Ok(Self { inner, attributes })
    }

    fn object_path(name: &str) -> ObjectPath {
        ObjectPath::from(name)
    }

    fn marker_path(directory: &str) -> ObjectPath {
        if directory.is_empty() {
            ObjectPath::from(DIRECTORY_MARKER)
        } else {
            ObjectPath::from(format!("{}/{}", directory, DIRECTORY_MARKER))
        }
    }

    fn prefix_path(directory: &str) -> Option<ObjectPath> {
        if directory.is_empty() {
            None
        } else {
            Some(ObjectPath::from(directory))
        }
    }

    fn attributes_for(&self, properties: &BlobProperties) -> Attributes {
        let mut attributes = Attributes::new();
        if !self.attributes {
            tracing::debug!("backend does not persist attributes, dropping blob properties");
            return attributes;
        }
        if let Some(value) = &properties.content_type {
            attributes.insert(Attribute::ContentType, value.clone().into());
        }
        if let Some(value) = &properties.content_encoding {
            attributes.insert(Attribute::ContentEncoding, value.clone().into());
        }
        if let Some(value) = &properties.content_language {
            attributes.insert(Attribute::ContentLanguage, value.clone().into());
        }
        if let Some(value) = &properties.content_md5 {
            attributes.insert(
                Attribute::Metadata(CONTENT_MD5_KEY.into()),
                value.clone().into(),
            );
        }
        for (key, value) in &properties.user_metadata {
            attributes.insert(Attribute::Metadata(key.clone().into()), value.clone().into());
        }
        attributes
    }

    fn properties_from(attributes: &Attributes) -> BlobProperties {
        let mut properties = BlobProperties::default();
        for (key, value) in attributes.iter() {
            let value: &str = value.as_ref();
            match key {
                Attribute::ContentType => properties.content_type = Some(value.to_string()),
                Attribute::ContentEncoding => {
                    properties.content_encoding = Some(value.to_string())
                }
                Attribute::ContentLanguage => {
                    properties.content_language = Some(value.to_string())
                }
                Attribute::Metadata(name) if name.as_ref() == CONTENT_MD5_KEY => {
                    properties.content_md5 = Some(value.to_string())
                }
                Attribute::Metadata(name) => {
                    properties
                        .user_metadata
                        .insert(name.to_string(), value.to_string());
                }
                _ => {}
            }
        }
        properties
    }

    fn info(name: &str, kind: ObjectKind, meta: &ObjectMeta, attributes: &Attributes) -> ObjectInfo {
        ObjectInfo {
            name: name.to_string(),
            kind,
            size: meta.size as u64,
            last_modified: Some(meta.last_modified),
            e_tag: meta.e_tag.clone(),
            properties: Self::properties_from(attributes),
        }
    }

    async fn head(&self, path: &ObjectPath, name: &str, kind: ObjectKind) -> Result<Option<ObjectInfo>> {
        let options = GetOptions {
            head: true,
            ..Default::default()
        };
        match self.inner.get_opts(path, options).await {
            Ok(result) => Ok(Some(Self::info(name, kind, &result.meta, &result.attributes))),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Metadata of the blob stored under `name`.
    pub async fn head_object(&self, name: &str) -> Result<Option<ObjectInfo>> {
        self.head(&Self::object_path(name), name, ObjectKind::File)
            .await
    }

    /// Metadata of the marker of directory `name`, if one was written.
    pub async fn head_marker(&self, name: &str) -> Result<Option<ObjectInfo>> {
        self.head(&Self::marker_path(name), name, ObjectKind::Directory)
            .await
    }

    /// Put blob data into storage.
    pub async fn put_object(&self, name: &str, data: Bytes, properties: &BlobProperties) -> Result<()> {
        let options = PutOptions {
            attributes: self.attributes_for(properties),
            ..Default::default()
        };
        self.inner
            .put_opts(&Self::object_path(name), PutPayload::from(data), options)
            .await?;
        Ok(())
    }

    /// Write the marker for directory `name`.
    pub async fn put_marker(&self, name: &str, properties: &BlobProperties) -> Result<()> {
        let options = PutOptions {
            attributes: self.attributes_for(properties),
            ..Default::default()
        };
        self.inner
            .put_opts(&Self::marker_path(name), PutPayload::from(Bytes::new()), options)
            .await?;
        Ok(())
    }

    /// Get blob data and its metadata from storage.
    pub async fn get_object(&self, name: &str) -> Result<Option<(Bytes, ObjectInfo)>> {
        match self.inner.get(&Self::object_path(name)).await {
            Ok(result) => {
                let info = Self::info(name, ObjectKind::File, &result.meta, &result.attributes);
                let bytes = result.bytes().await?;
                Ok(Some((bytes, info)))
            }
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete blob data from storage.
    pub async fn delete_object(&self, name: &str) -> Result<()> {
        Self::ignore_missing(self.inner.delete(&Self::object_path(name)).await)
    }

    /// Delete the marker of directory `name`.
    pub async fn delete_marker(&self, name: &str) -> Result<()> {
        Self::ignore_missing(self.inner.delete(&Self::marker_path(name)).await)
    }

    fn ignore_missing(result: object_store::Result<()>) -> Result<()> {
        // Ignore NotFound errors - the blob may already be deleted
        match result {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Server side copy within this container.
    pub async fn copy_object(&self, from: &str, to: &str) -> Result<()> {
        self.inner
            .copy(&Self::object_path(from), &Self::object_path(to))
            .await?;
        Ok(())
    }

    /// Whether anything at all (marker or blob) lives beneath `directory`.
    pub async fn has_descendants(&self, directory: &str) -> Result<bool> {
        let prefix = Self::prefix_path(directory);
        let mut stream = self.inner.list(prefix.as_ref());
        Ok(stream.try_next().await?.is_some())
    }

    /// Every raw key in the container, markers included.
    pub async fn list_keys(&self) -> Result<Vec<String>> {
        let items: Vec<ObjectMeta> = self.inner.list(None).try_collect().await?;
        Ok(items
            .into_iter()
            .map(|meta| meta.location.as_ref().to_string())
            .collect())
    }

    /// Delete a raw key, as returned by [`Storage::list_keys`].
    pub async fn delete_key(&self, key: &str) -> Result<()> {
        Self::ignore_missing(self.inner.delete(&ObjectPath::from(key)).await)
    }

    /// Entries directly beneath `directory`, sorted by name.
    pub async fn list_children(&self, directory: &str) -> Result<Vec<ListEntry>> {
        let prefix = Self::prefix_path(directory);
        let listing = self.inner.list_with_delimiter(prefix.as_ref()).await?;

        let mut entries = BTreeMap::new();
        for dir in listing.common_prefixes {
            let name = dir.as_ref().to_string();
            entries.insert(
                name.clone(),
                ListEntry {
                    name,
                    kind: ObjectKind::Directory,
                    size: 0,
                    last_modified: None,
                },
            );
        }
        for meta in listing.objects {
            if meta.location.filename() == Some(DIRECTORY_MARKER) {
                continue;
            }
            let name = meta.location.as_ref().to_string();
            entries.insert(
                name.clone(),
                ListEntry {
                    name,
                    kind: ObjectKind::File,
                    size: meta.size as u64,
                    last_modified: Some(meta.last_modified),
                },
            );
        }
        Ok(entries.into_values().collect())
    }

    /// Every file and directory beneath `directory`, sorted by name.
    pub async fn list_descendants(&self, directory: &str) -> Result<Vec<ListEntry>> {
        let prefix = Self::prefix_path(directory);
        let items: Vec<ObjectMeta> = self.inner.list(prefix.as_ref()).try_collect().await?;

        let base_depth = prefix.as_ref().map(|p| p.parts().count()).unwrap_or(0);
        let mut entries = BTreeMap::new();
        for meta in items {
            let parts: Vec<String> = meta
                .location
                .parts()
                .map(|part| part.as_ref().to_string())
                .collect();
            let is_marker = parts.last().map(String::as_str) == Some(DIRECTORY_MARKER);
            let file_parts = if is_marker { parts.len() - 1 } else { parts.len() };

            // every intermediate prefix is a directory, marked or not
            for depth in (base_depth + 1)..file_parts {
                let name = parts[..depth].join("/");
                entries.entry(name.clone()).or_insert(ListEntry {
                    name,
                    kind: ObjectKind::Directory,
                    size: 0,
                    last_modified: None,
                });
            }
            if is_marker {
                if file_parts > base_depth {
                    let name = parts[..file_parts].join("/");
                    entries.entry(name.clone()).or_insert(ListEntry {
                        name,
                        kind: ObjectKind::Directory,
                        size: 0,
                        last_modified: Some(meta.last_modified),
                    });
                }
                continue;
            }
            let name = meta.location.as_ref().to_string();
            entries.insert(
                name.clone(),
                ListEntry {
                    name,
                    kind: ObjectKind::File,
                    size: meta.size as u64,
                    last_modified: Some(meta.last_modified),
                },
            );
        }
        Ok(entries.into_values().collect())
    }
}

#[cfg(test)]
impl Storage {
    /// Create an in-memory storage backend (test-only).
    pub fn memory() -> Self {
        Self {
            inner: Arc::new(InMemory::new()),
            attributes: true,
        }
    }
}
