//! Shared test utilities for filesystem integration tests
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use ::common::prelude::*;
use async_trait::async_trait;
use bytes::Bytes;
use object_store_client::{
    BlobAccess as StoreAccess, BlobClient, BlobProperties, BlobStoreError, ListOptions, ListPage,
    ObjectInfo,
};

pub const FS_ID: &str = "test";
pub const CONTAINER: &str = "c1";

/// A dispatcher with one mounted filesystem.
pub struct TestEnv {
    pub dispatcher: Dispatcher,
    pub fs: Arc<CloudFileSystem>,
    pub client: Arc<BlobClient>,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Set up an in-memory filesystem with container `c1` and no security manager
pub async fn setup_test_env() -> TestEnv {
    setup_with_host(HostConfiguration::new()).await
}

/// Set up an in-memory filesystem whose operations are checked against ACLs,
/// running as whoever `lookup` says is the current user
pub async fn setup_secured_env(lookup: Arc<StaticUserGroupLookup>) -> TestEnv {
    let host = HostConfiguration::new()
        .with_user_group_lookup(lookup.clone())
        .with_security_manager(Arc::new(DefaultSecurityManager::with_lookup(lookup)));
    setup_with_host(host).await
}

pub async fn setup_with_host(host: HostConfiguration) -> TestEnv {
    init_tracing();
    let client = Arc::new(BlobClient::memory());
    let fs = CloudFileSystem::new(
        FS_ID,
        client.clone(),
        Arc::new(DefaultCloudEngine::new()),
        host,
    );
    let dispatcher = Dispatcher::new();
    let fs = dispatcher.mount(fs).unwrap();
    dispatcher.create_directory(&path("/c1")).await.unwrap();
    TestEnv {
        dispatcher,
        fs,
        client,
    }
}

pub fn path(raw: &str) -> CloudPath {
    CloudPath::new(FS_ID, raw).unwrap()
}

pub fn path_on(fs: &str, raw: &str) -> CloudPath {
    CloudPath::new(fs, raw).unwrap()
}

pub fn create_intents() -> BTreeSet<OpenIntent> {
    BTreeSet::from([OpenIntent::Create, OpenIntent::Write])
}

/// Create (or overwrite) a file with `data`
pub async fn write(dispatcher: &Dispatcher, target: &CloudPath, data: &'static [u8]) {
    dispatcher
        .write_file(target, Bytes::from_static(data), &create_intents())
        .await
        .unwrap();
}

pub async fn exists(dispatcher: &Dispatcher, target: &CloudPath) -> bool {
    match dispatcher.read_attributes(target).await {
        Ok(_) => true,
        Err(FsError::NotFound(_)) => false,
        Err(e) => panic!("unexpected error reading {}: {}", target, e),
    }
}

/// An ACL owned by `owner` granting `principal` every permission
pub fn full_access(owner: Principal, principal: Principal) -> AclSet {
    AclSet::new(owner).with_entries([AclEntry::allow(principal).with_permissions(AclPermission::ALL)])
}

/// A backend whose native copy always fails, forcing the local fallback.
#[derive(Debug)]
pub struct NoCopyStore {
    inner: Arc<BlobClient>,
}

impl NoCopyStore {
    pub fn new(inner: Arc<BlobClient>) -> Self {
        Self { inner }
    }
}

type StoreResult<T> = object_store_client::Result<T>;

#[async_trait]
impl BlobStore for NoCopyStore {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn create_container(&self, container: &str) -> StoreResult<bool> {
        self.inner.create_container(container).await
    }

    async fn delete_container(&self, container: &str) -> StoreResult<()> {
        self.inner.delete_container(container).await
    }

    fn container_exists(&self, container: &str) -> bool {
        self.inner.container_exists(container)
    }

    fn containers(&self) -> Vec<String> {
        self.inner.containers()
    }

    fn container_access(&self, container: &str) -> StoreResult<StoreAccess> {
        self.inner.container_access(container)
    }

    fn set_container_access(&self, container: &str, access: StoreAccess) -> StoreResult<()> {
        self.inner.set_container_access(container, access)
    }

    fn container_metadata(&self, container: &str) -> StoreResult<BTreeMap<String, String>> {
        self.inner.container_metadata(container)
    }

    fn set_container_metadata(
        &self,
        container: &str,
        metadata: BTreeMap<String, String>,
    ) -> StoreResult<()> {
        self.inner.set_container_metadata(container, metadata)
    }

    fn blob_access(&self, container: &str, name: &str) -> StoreResult<StoreAccess> {
        self.inner.blob_access(container, name)
    }

    fn set_blob_access(&self, container: &str, name: &str, access: StoreAccess) -> StoreResult<()> {
        self.inner.set_blob_access(container, name, access)
    }

    async fn stat(&self, container: &str, name: &str) -> StoreResult<Option<ObjectInfo>> {
        self.inner.stat(container, name).await
    }

    async fn get(&self, container: &str, name: &str) -> StoreResult<Option<Bytes>> {
        self.inner.get(container, name).await
    }

    async fn put(
        &self,
        container: &str,
        name: &str,
        data: Bytes,
        properties: BlobProperties,
    ) -> StoreResult<()> {
        self.inner.put(container, name, data, properties).await
    }

    async fn remove(&self, container: &str, name: &str) -> StoreResult<()> {
        self.inner.remove(container, name).await
    }

    async fn create_directory(
        &self,
        container: &str,
        name: &str,
        properties: BlobProperties,
    ) -> StoreResult<()> {
        self.inner.create_directory(container, name, properties).await
    }

    async fn remove_directory(&self, container: &str, name: &str) -> StoreResult<()> {
        self.inner.remove_directory(container, name).await
    }

    async fn set_user_metadata(
        &self,
        container: &str,
        name: &str,
        metadata: BTreeMap<String, String>,
    ) -> StoreResult<()> {
        self.inner.set_user_metadata(container, name, metadata).await
    }

    async fn copy_blob(
        &self,
        _from_container: &str,
        _from: &str,
        _to_container: &str,
        _to: &str,
    ) -> StoreResult<()> {
        Err(BlobStoreError::Unsupported("copy".to_string()))
    }

    async fn list(&self, container: &str, options: &ListOptions) -> StoreResult<ListPage> {
        self.inner.list(container, options).await
    }
}
