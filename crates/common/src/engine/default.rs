use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::future::{BoxFuture, FutureExt};
use object_store_client::{BlobProperties, ListOptions};

use super::{CloudEngine, CloudOptions, CopyMethod, OpenIntent};
use crate::acl::{AclPermission, AclSet};
use crate::attributes::{AclAttributes, AttributeValue, AttributeView, StorageType};
use crate::error::{FsError, Result};
use crate::filesystem::CloudFileSystem;
use crate::path::CloudPath;

const DEFAULT_PAGE_SIZE: usize = 1000;

/// The standard engine: every operation is checked against the path's ACL
/// and carried out with the plain [`BlobStore`](crate::BlobStore) primitives.
#[derive(Debug, Clone)]
pub struct DefaultCloudEngine {
    page_size: usize,
}

impl Default for DefaultCloudEngine {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Check that `path` lives on `fs` and make it absolute.
fn owned(fs: &CloudFileSystem, path: &CloudPath) -> Result<CloudPath> {
    if path.file_system() != fs.id() {
        return Err(FsError::ForeignPath {
            path: path.clone(),
            expected: fs.id().clone(),
        });
    }
    Ok(path.to_absolute_path())
}

/// Container and blob name of an absolute path.
fn locate(path: &CloudPath) -> Result<(String, Option<String>)> {
    let container = path
        .container_name()
        .ok_or_else(|| FsError::NotFound(path.clone()))?;
    Ok((container.to_string(), path.path_name()))
}

async fn attributes_if_exists(
    fs: &CloudFileSystem,
    path: &CloudPath,
) -> Result<Option<AclAttributes>> {
    match AttributeView::new(fs, path).read_attributes().await {
        Ok(attributes) => Ok(Some(attributes)),
        Err(FsError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

async fn authorize(
    fs: &CloudFileSystem,
    path: &CloudPath,
    permissions: &[AclPermission],
) -> Result<()> {
    AttributeView::new(fs, path)
        .check_access(&AclPermission::set(permissions.iter().copied()))
        .await
}

/// Fail with an I/O error unless `parent` exists and is a directory.
async fn require_parent(fs: &CloudFileSystem, path: &CloudPath) -> Result<CloudPath> {
    let parent = path
        .parent()
        .ok_or_else(|| FsError::Io(format!("{} has no parent directory", path)))?;
    match attributes_if_exists(fs, &parent).await? {
        Some(attributes) if attributes.basic.is_directory() => Ok(parent),
        Some(_) => Err(FsError::NotDirectory(parent)),
        None => Err(FsError::Io(format!(
            "parent directory {} does not exist",
            parent
        ))),
    }
}

impl DefaultCloudEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries requested per backend listing call.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    /// Children of a directory, without any access check.
    async fn children(
        &self,
        fs: &CloudFileSystem,
        directory: &CloudPath,
    ) -> Result<Vec<CloudPath>> {
        let (container, prefix) = locate(directory)?;
        let mut children = Vec::new();
        let mut marker = None;
        loop {
            let options = ListOptions {
                prefix: prefix.clone(),
                recursive: false,
                marker: marker.take(),
                max_results: Some(self.page_size),
            };
            let page = fs.store().list(&container, &options).await?;
            for entry in page.entries {
                let segments = std::iter::once(container.as_str()).chain(entry.name.split('/'));
                children.push(CloudPath::from_segments(fs.id().clone(), true, segments)?);
            }
            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }
        Ok(children)
    }

    fn delete_one<'a>(
        &'a self,
        fs: &'a CloudFileSystem,
        path: CloudPath,
        options: &'a CloudOptions,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let attributes = AttributeView::new(fs, &path).read_attributes().await?;
            let (container, name) = locate(&path)?;
            let store = fs.store();

            match (attributes.basic.storage_type, name) {
                (StorageType::Container, _) | (_, None) => {
                    authorize(fs, &path, &[AclPermission::Delete, AclPermission::DeleteChild]).await?;
                    store.delete_container(&container).await?;
                }
                (StorageType::Directory, Some(name)) => {
                    authorize(fs, &path, &[AclPermission::Delete, AclPermission::DeleteChild]).await?;
                    let children = self.children(fs, &path).await?;
                    if !children.is_empty() {
                        if !options.is_recursive() {
                            return Err(FsError::NotEmpty(path));
                        }
                        for child in children {
                            self.delete_one(fs, child, options).await?;
                        }
                    }
                    store.remove_directory(&container, &name).await?;
                }
                (StorageType::File, Some(name)) => {
                    authorize(fs, &path, &[AclPermission::Delete]).await?;
                    store.remove(&container, &name).await?;
                }
            }
            tracing::debug!(path = %path, "deleted");
            Ok(())
        }
        .boxed()
    }

    /// Every permission check of a copy, run before anything is written or
    /// removed. A target of the other kind is checked for deletion and its
    /// parent for the matching add permission.
    #[allow(clippy::too_many_arguments)]
    async fn authorize_copy(
        &self,
        source_fs: &CloudFileSystem,
        source: &CloudPath,
        source_attributes: &AclAttributes,
        target_fs: &CloudFileSystem,
        target: &CloudPath,
        target_attributes: Option<&AclAttributes>,
        options: &CloudOptions,
    ) -> Result<()> {
        let source_is_directory = source_attributes.basic.is_directory();
        let mut source_permissions = vec![AclPermission::ReadData, AclPermission::ReadAcl];
        if source_is_directory {
            source_permissions.push(AclPermission::LIST_DIRECTORY);
        } else if options.is_copy_attributes() {
            source_permissions.push(AclPermission::ReadAttributes);
        }
        authorize(source_fs, source, &source_permissions).await?;

        match target_attributes {
            Some(existing) if existing.basic.is_directory() == source_is_directory => {
                if source_is_directory {
                    authorize(target_fs, target, &[AclPermission::WriteAcl]).await
                } else {
                    authorize(target_fs, target, &[AclPermission::WriteData, AclPermission::WriteAcl])
                        .await
                }
            }
            replaced => {
                if let Some(existing) = replaced {
                    let mut permissions = vec![AclPermission::Delete];
                    if existing.basic.is_directory() {
                        permissions.push(AclPermission::DeleteChild);
                    }
                    authorize(target_fs, target, &permissions).await?;
                }
                if target.path_name().is_none() {
                    return Ok(());
                }
                let parent = require_parent(target_fs, target).await?;
                let add = if source_is_directory {
                    AclPermission::ADD_SUBDIRECTORY
                } else {
                    AclPermission::ADD_FILE
                };
                authorize(target_fs, &parent, &[add]).await
            }
        }
    }

    fn copy_one<'a>(
        &'a self,
        source_fs: &'a CloudFileSystem,
        source: CloudPath,
        target_fs: &'a CloudFileSystem,
        target: CloudPath,
        options: &'a CloudOptions,
    ) -> BoxFuture<'a, Result<CopyMethod>> {
        async move {
            if source == target {
                return Err(FsError::AlreadyExists(target));
            }
            let source_attributes = AttributeView::new(source_fs, &source).read_attributes().await?;
            let source_is_directory = source_attributes.basic.is_directory();
            if source_is_directory
                && source_fs.can_operate_together(target_fs)
                && target.segments().starts_with(source.segments())
            {
                return Err(FsError::Io(format!(
                    "cannot copy {} into its own subtree at {}",
                    source, target
                )));
            }
            if !source_is_directory && (source.path_name().is_none() || target.path_name().is_none())
            {
                return Err(FsError::Unsupported(format!(
                    "cannot copy file {} onto container {}",
                    source, target
                )));
            }

            let mut target_attributes = attributes_if_exists(target_fs, &target).await?;
            if target_attributes.is_some() && !options.is_replace_existing() {
                return Err(FsError::AlreadyExists(target));
            }

            self.authorize_copy(
                source_fs,
                &source,
                &source_attributes,
                target_fs,
                &target,
                target_attributes.as_ref(),
                options,
            )
            .await?;

            let kind_differs = target_attributes
                .as_ref()
                .is_some_and(|existing| existing.basic.is_directory() != source_is_directory);
            if kind_differs {
                self.delete_one(target_fs, target.clone(), &CloudOptions::new())
                    .await?;
                target_attributes = None;
            }

            if source_fs.can_operate_together(target_fs) {
                let attempt = self
                    .copy_native(
                        source_fs,
                        &source,
                        &source_attributes,
                        target_fs,
                        &target,
                        target_attributes.as_ref(),
                        options,
                    )
                    .await;
                match attempt {
                    Ok(()) => return Ok(CopyMethod::CloudOptimised),
                    Err(FsError::Backend(e)) => {
                        tracing::warn!(
                            source = %source,
                            target = %target,
                            error = %e,
                            "native copy failed, falling back to a local copy"
                        );
                    }
                    Err(e) => return Err(e),
                }
            }

            self.copy_local(source_fs, &source, &source_attributes, target_fs, &target, options)
                .await?;
            Ok(CopyMethod::LocalFallback)
        }
        .boxed()
    }

    /// Backend side copy. Permissions were checked by the caller.
    #[allow(clippy::too_many_arguments)]
    async fn copy_native(
        &self,
        source_fs: &CloudFileSystem,
        source: &CloudPath,
        source_attributes: &AclAttributes,
        target_fs: &CloudFileSystem,
        target: &CloudPath,
        target_attributes: Option<&AclAttributes>,
        options: &CloudOptions,
    ) -> Result<()> {
        let (source_container, source_name) = locate(source)?;
        let (target_container, target_name) = locate(target)?;
        let store = target_fs.store();

        if !source_attributes.basic.is_directory() {
            let (Some(source_name), Some(target_name)) = (source_name, target_name) else {
                return Err(FsError::Unsupported(format!(
                    "cannot copy file {} onto container {}",
                    source, target
                )));
            };
            store
                .copy_blob(&source_container, &source_name, &target_container, &target_name)
                .await?;
            // ACLs do not travel with the blob copy on every backend
            AttributeView::new(target_fs, target)
                .store_acl(&source_attributes.acl)
                .await?;
            tracing::debug!(source = %source, target = %target, "copied file natively");
            return Ok(());
        }

        // listed before the target exists so the copy never sees its own output
        let children = if options.is_recursive() {
            self.children(source_fs, source).await?
        } else {
            Vec::new()
        };

        match target_attributes {
            Some(_) => {
                if !options.is_recursive() && !self.children(target_fs, target).await?.is_empty() {
                    return Err(FsError::NotEmpty(target.clone()));
                }
            }
            None => match &target_name {
                None => {
                    store.create_container(&target_container).await?;
                }
                Some(name) => {
                    store
                        .create_directory(&target_container, name, BlobProperties::default())
                        .await?;
                }
            },
        }
        AttributeView::new(target_fs, target)
            .store_acl(&source_attributes.acl)
            .await?;

        for child in children {
            let child_target = target.child(child.last_segment())?;
            self.copy_one(source_fs, child, target_fs, child_target, options)
                .await?;
        }
        tracing::debug!(source = %source, target = %target, "copied directory natively");
        Ok(())
    }

    /// Relay a single file through memory. Permissions were checked by the
    /// caller.
    async fn copy_local(
        &self,
        source_fs: &CloudFileSystem,
        source: &CloudPath,
        source_attributes: &AclAttributes,
        target_fs: &CloudFileSystem,
        target: &CloudPath,
        options: &CloudOptions,
    ) -> Result<()> {
        if source_attributes.basic.is_directory() {
            return Err(FsError::Unsupported(format!(
                "directory {} cannot be copied without a native copy",
                source
            )));
        }
        let (source_container, source_name) = locate(source)?;
        let (target_container, target_name) = locate(target)?;
        let (Some(source_name), Some(target_name)) = (source_name, target_name) else {
            return Err(FsError::Unsupported(format!(
                "cannot copy file {} onto container {}",
                source, target
            )));
        };

        let data = source_fs
            .store()
            .get(&source_container, &source_name)
            .await?
            .ok_or_else(|| FsError::NotFound(source.clone()))?;

        let basic = &source_attributes.basic;
        let mut properties = BlobProperties {
            content_type: basic.content_type.clone(),
            content_encoding: basic.content_encoding.clone(),
            content_language: basic.content_language.clone(),
            ..BlobProperties::default()
        };
        if options.is_copy_attributes() {
            properties.user_metadata = basic.user_metadata.clone();
        }
        target_fs
            .store()
            .put(&target_container, &target_name, data, properties)
            .await?;
        AttributeView::new(target_fs, target)
            .store_acl(&source_attributes.acl)
            .await?;
        tracing::debug!(source = %source, target = %target, "copied file through local memory");
        Ok(())
    }

    async fn move_one(
        &self,
        source_fs: &CloudFileSystem,
        source: CloudPath,
        target_fs: &CloudFileSystem,
        target: CloudPath,
        options: &CloudOptions,
    ) -> Result<()> {
        let copy_options = options.clone().recursive();
        self.copy_one(source_fs, source.clone(), target_fs, target.clone(), &copy_options)
            .await?;
        self.delete_one(source_fs, source.clone(), &copy_options)
            .await
            .map_err(|cause| FsError::MoveIncomplete {
                from: source,
                to: target,
                cause: Box::new(cause),
            })
    }
}

fn skip_or_abort(
    options: &CloudOptions,
    path: &CloudPath,
    operation: &str,
    error: FsError,
) -> Result<()> {
    if options.is_fail_silently() {
        tracing::warn!(path = %path, error = %error, "{} failed, skipping", operation);
        Ok(())
    } else {
        Err(error)
    }
}

#[async_trait]
impl CloudEngine for DefaultCloudEngine {
    async fn read_attributes(
        &self,
        fs: &CloudFileSystem,
        path: &CloudPath,
    ) -> Result<AclAttributes> {
        let path = owned(fs, path)?;
        authorize(fs, &path, &[AclPermission::ReadAttributes]).await?;
        AttributeView::new(fs, &path).read_attributes().await
    }

    async fn read_attribute_map(
        &self,
        fs: &CloudFileSystem,
        path: &CloudPath,
        selection: &str,
    ) -> Result<BTreeMap<String, AttributeValue>> {
        let path = owned(fs, path)?;
        authorize(fs, &path, &[AclPermission::ReadAttributes]).await?;
        AttributeView::new(fs, &path).read_attribute_map(selection).await
    }

    async fn set_acl(&self, fs: &CloudFileSystem, path: &CloudPath, acl: &AclSet) -> Result<()> {
        let path = owned(fs, path)?;
        let caller = fs.host().current_principal();
        AttributeView::new(fs, &path).set_acl(&caller, acl).await
    }

    async fn check_access(
        &self,
        fs: &CloudFileSystem,
        path: &CloudPath,
        permissions: &BTreeSet<AclPermission>,
    ) -> Result<()> {
        let path = owned(fs, path)?;
        AttributeView::new(fs, &path).check_access(permissions).await
    }

    async fn create_directory(&self, fs: &CloudFileSystem, path: &CloudPath) -> Result<()> {
        let path = owned(fs, path)?;
        if attributes_if_exists(fs, &path).await?.is_some() {
            return Err(FsError::AlreadyExists(path));
        }
        let (container, name) = locate(&path)?;
        match name {
            None => {
                fs.store().create_container(&container).await?;
            }
            Some(name) => {
                let parent = require_parent(fs, &path).await?;
                authorize(fs, &parent, &[AclPermission::ADD_SUBDIRECTORY]).await?;
                fs.store()
                    .create_directory(&container, &name, BlobProperties::default())
                    .await?;
            }
        }
        tracing::debug!(path = %path, "created directory");
        Ok(())
    }

    async fn write_file(
        &self,
        fs: &CloudFileSystem,
        path: &CloudPath,
        data: Bytes,
        intents: &BTreeSet<OpenIntent>,
    ) -> Result<()> {
        let path = owned(fs, path)?;
        let (container, name) = locate(&path)?;
        let Some(name) = name else {
            return Err(FsError::Io(format!("{} is a container", path)));
        };
        let store = fs.store();
        let append = intents.contains(&OpenIntent::Append);

        let mut properties = BlobProperties::default().with_content_type(
            mime_guess::from_path(&name)
                .first_or_octet_stream()
                .essence_str(),
        );

        let data = match attributes_if_exists(fs, &path).await? {
            Some(existing) => {
                if existing.basic.is_directory() {
                    return Err(FsError::Io(format!("{} is a directory", path)));
                }
                if intents.contains(&OpenIntent::CreateNew) {
                    return Err(FsError::AlreadyExists(path));
                }
                let mut permissions: Vec<AclPermission> =
                    intents.iter().filter_map(|intent| intent.permission()).collect();
                if !permissions.contains(&AclPermission::WriteData)
                    && !permissions.contains(&AclPermission::AppendData)
                {
                    permissions.push(AclPermission::WriteData);
                }
                authorize(fs, &path, &permissions).await?;

                // keep user metadata, and with it the stored acl
                if let Some(info) = store.stat(&container, &name).await? {
                    properties.user_metadata = info.properties.user_metadata;
                }
                if append {
                    let current = store.get(&container, &name).await?.unwrap_or_default();
                    let mut joined = BytesMut::with_capacity(current.len() + data.len());
                    joined.extend_from_slice(&current);
                    joined.extend_from_slice(&data);
                    joined.freeze()
                } else {
                    data
                }
            }
            None => {
                if !intents.iter().any(|intent| intent.is_create()) {
                    return Err(FsError::NotFound(path));
                }
                let parent = require_parent(fs, &path).await?;
                authorize(fs, &parent, &[AclPermission::ADD_FILE]).await?;
                data
            }
        };

        store.put(&container, &name, data, properties).await?;
        tracing::debug!(path = %path, "wrote file");
        Ok(())
    }

    async fn read_file(&self, fs: &CloudFileSystem, path: &CloudPath) -> Result<Bytes> {
        let path = owned(fs, path)?;
        authorize(fs, &path, &[AclPermission::ReadData]).await?;
        let (container, name) = locate(&path)?;
        let Some(name) = name else {
            return Err(FsError::Io(format!("{} is a container", path)));
        };
        fs.store()
            .get(&container, &name)
            .await?
            .ok_or_else(|| FsError::Io(format!("{} is a directory", path)))
    }

    async fn list(&self, fs: &CloudFileSystem, directory: &CloudPath) -> Result<Vec<CloudPath>> {
        let directory = owned(fs, directory)?;
        let attributes = AttributeView::new(fs, &directory).read_attributes().await?;
        if !attributes.basic.is_directory() {
            return Err(FsError::NotDirectory(directory));
        }
        authorize(fs, &directory, &[AclPermission::LIST_DIRECTORY]).await?;
        self.children(fs, &directory).await
    }

    async fn delete(
        &self,
        fs: &CloudFileSystem,
        paths: &[CloudPath],
        options: &CloudOptions,
    ) -> Result<()> {
        for path in paths {
            let result = match owned(fs, path) {
                Ok(path) => self.delete_one(fs, path, options).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                skip_or_abort(options, path, "delete", e)?;
            }
        }
        Ok(())
    }

    async fn copy(
        &self,
        source_fs: &CloudFileSystem,
        target_fs: &CloudFileSystem,
        pairs: &[(CloudPath, CloudPath)],
        options: &CloudOptions,
    ) -> Result<BTreeMap<CloudPath, CopyMethod>> {
        let mut methods = BTreeMap::new();
        for (source, target) in pairs {
            let result = match (owned(source_fs, source), owned(target_fs, target)) {
                (Ok(source), Ok(target)) => {
                    self.copy_one(source_fs, source, target_fs, target, options).await
                }
                (Err(e), _) | (_, Err(e)) => Err(e),
            };
            match result {
                Ok(method) => {
                    if options.returns_copy_method() {
                        methods.insert(source.clone(), method);
                    }
                }
                Err(e) => skip_or_abort(options, source, "copy", e)?,
            }
        }
        Ok(methods)
    }

    async fn move_paths(
        &self,
        source_fs: &CloudFileSystem,
        target_fs: &CloudFileSystem,
        pairs: &[(CloudPath, CloudPath)],
        options: &CloudOptions,
    ) -> Result<()> {
        for (source, target) in pairs {
            let result = match (owned(source_fs, source), owned(target_fs, target)) {
                (Ok(source), Ok(target)) => {
                    self.move_one(source_fs, source, target_fs, target, options).await
                }
                (Err(e), _) | (_, Err(e)) => Err(e),
            };
            if let Err(e) = result {
                skip_or_abort(options, source, "move", e)?;
            }
        }
        Ok(())
    }
}
