//! The blob storage seam.
//!
//! [`BlobStore`] is everything the filesystem layer needs from a backend.
//! [`BlobClient`] implements it directly; tests wrap it to inject failures.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use object_store_client::{
    BlobAccess, BlobClient, BlobProperties, ListOptions, ListPage, ObjectInfo, Result,
};

#[async_trait]
pub trait BlobStore: std::fmt::Debug + Send + Sync {
    /// Identity of the backend connection. Filesystems sharing an id can use
    /// backend-native copies between them.
    fn id(&self) -> &str;

    /* Containers */

    async fn create_container(&self, container: &str) -> Result<bool>;
    async fn delete_container(&self, container: &str) -> Result<()>;
    fn container_exists(&self, container: &str) -> bool;
    fn containers(&self) -> Vec<String>;
    fn container_access(&self, container: &str) -> Result<BlobAccess>;
    fn set_container_access(&self, container: &str, access: BlobAccess) -> Result<()>;
    fn container_metadata(&self, container: &str) -> Result<BTreeMap<String, String>>;
    fn set_container_metadata(
        &self,
        container: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<()>;

    /* Blobs */

    fn blob_access(&self, container: &str, name: &str) -> Result<BlobAccess>;
    fn set_blob_access(&self, container: &str, name: &str, access: BlobAccess) -> Result<()>;
    async fn stat(&self, container: &str, name: &str) -> Result<Option<ObjectInfo>>;
    async fn get(&self, container: &str, name: &str) -> Result<Option<Bytes>>;
    async fn put(
        &self,
        container: &str,
        name: &str,
        data: Bytes,
        properties: BlobProperties,
    ) -> Result<()>;
    async fn remove(&self, container: &str, name: &str) -> Result<()>;
    async fn create_directory(
        &self,
        container: &str,
        name: &str,
        properties: BlobProperties,
    ) -> Result<()>;
    async fn remove_directory(&self, container: &str, name: &str) -> Result<()>;
    async fn set_user_metadata(
        &self,
        container: &str,
        name: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<()>;
    async fn copy_blob(
        &self,
        from_container: &str,
        from: &str,
        to_container: &str,
        to: &str,
    ) -> Result<()>;
    async fn list(&self, container: &str, options: &ListOptions) -> Result<ListPage>;
}

#[async_trait]
impl BlobStore for BlobClient {
    fn id(&self) -> &str {
        BlobClient::id(self)
    }

    async fn create_container(&self, container: &str) -> Result<bool> {
        BlobClient::create_container(self, container).await
    }

    async fn delete_container(&self, container: &str) -> Result<()> {
        BlobClient::delete_container(self, container).await
    }

    fn container_exists(&self, container: &str) -> bool {
        BlobClient::container_exists(self, container)
    }

    fn containers(&self) -> Vec<String> {
        BlobClient::containers(self)
    }

    fn container_access(&self, container: &str) -> Result<BlobAccess> {
        BlobClient::container_access(self, container)
    }

    fn set_container_access(&self, container: &str, access: BlobAccess) -> Result<()> {
        BlobClient::set_container_access(self, container, access)
    }

    fn container_metadata(&self, container: &str) -> Result<BTreeMap<String, String>> {
        BlobClient::container_metadata(self, container)
    }

    fn set_container_metadata(
        &self,
        container: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<()> {
        BlobClient::set_container_metadata(self, container, metadata)
    }

    fn blob_access(&self, container: &str, name: &str) -> Result<BlobAccess> {
        BlobClient::blob_access(self, container, name)
    }

    fn set_blob_access(&self, container: &str, name: &str, access: BlobAccess) -> Result<()> {
        BlobClient::set_blob_access(self, container, name, access)
    }

    async fn stat(&self, container: &str, name: &str) -> Result<Option<ObjectInfo>> {
        BlobClient::stat(self, container, name).await
    }

    async fn get(&self, container: &str, name: &str) -> Result<Option<Bytes>> {
        BlobClient::get(self, container, name).await
    }

    async fn put(
        &self,
        container: &str,
        name: &str,
        data: Bytes,
        properties: BlobProperties,
    ) -> Result<()> {
        BlobClient::put(self, container, name, data, properties).await
    }

    async fn remove(&self, container: &str, name: &str) -> Result<()> {
        BlobClient::remove(self, container, name).await
    }

    async fn create_directory(
        &self,
        container: &str,
        name: &str,
        properties: BlobProperties,
    ) -> Result<()> {
        BlobClient::create_directory(self, container, name, properties).await
    }

    async fn remove_directory(&self, container: &str, name: &str) -> Result<()> {
        BlobClient::remove_directory(self, container, name).await
    }

    async fn set_user_metadata(
        &self,
        container: &str,
        name: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<()> {
        BlobClient::set_user_metadata(self, container, name, metadata).await
    }

    async fn copy_blob(
        &self,
        from_container: &str,
        from: &str,
        to_container: &str,
        to: &str,
    ) -> Result<()> {
        BlobClient::copy(self, from_container, from, to_container, to).await
    }

    async fn list(&self, container: &str, options: &ListOptions) -> Result<ListPage> {
        BlobClient::list(self, container, options).await
    }
}
