//! # Attributes
//!
//! [`AttributeView`] turns backend metadata for one path into
//! [`AclAttributes`], and is the only place an [`AclSet`] is read from or
//! written to the backend.
//!
//! ACLs are stored as an [`AclSnapshot`] encoded in JSON under the user
//! metadata key [`ACL_METADATA_KEY`]; for containers the container metadata
//! is used instead. Paths without a stored ACL get a placeholder owned by the
//! anonymous user, carrying the backend's public/private flag as an access
//! entry.
//!
//! ## Attribute maps
//!
//! [`AttributeView::read_attribute_map`] accepts `"view:name,name"`,
//! `"name,name"` (the `basic` view) or `"*"` / `"view:*"`.
//!
//! | view    | attributes |
//! |---------|------------|
//! | `basic` | size, isDirectory, isRegularFile, isOther, isSymbolicLink, fileKey, lastModifiedTime, lastAccessTime, creationTime |
//! | `cloud` | lastAccessTime, lastModifiedTime, creationTime, contentMD5, contentType, eTag, physicalLocation, uri, userMetadata, aclSet |

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use object_store_client::{BlobAccess, ObjectInfo};
use url::Url;

use crate::acl::{AclEntry, AclPermission, AclSet, AclSnapshot, Principal};
use crate::error::{FsError, Result};
use crate::filesystem::CloudFileSystem;
use crate::path::CloudPath;

/// User metadata key holding the encoded ACL.
pub const ACL_METADATA_KEY: &str = "cloudfs-acl";

const BASIC_VIEW: &str = "basic";
const CLOUD_VIEW: &str = "cloud";

const BASIC_ATTRIBUTES: &[&str] = &[
    "size",
    "isDirectory",
    "isRegularFile",
    "isOther",
    "isSymbolicLink",
    "fileKey",
    "lastModifiedTime",
    "lastAccessTime",
    "creationTime",
];

const CLOUD_ATTRIBUTES: &[&str] = &[
    "lastAccessTime",
    "lastModifiedTime",
    "creationTime",
    "contentMD5",
    "contentType",
    "eTag",
    "physicalLocation",
    "uri",
    "userMetadata",
    "aclSet",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    Container,
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAttributes {
    pub storage_type: StorageType,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub last_access: Option<DateTime<Utc>>,
    pub creation_time: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_md5: Option<String>,
    pub e_tag: Option<String>,
    /// User metadata, without the encoded ACL
    pub user_metadata: BTreeMap<String, String>,
    pub physical_location: Option<String>,
    pub uri: Option<Url>,
}

impl BasicAttributes {
    fn placeholder(storage_type: StorageType) -> Self {
        Self {
            storage_type,
            size: 0,
            last_modified: None,
            last_access: None,
            creation_time: None,
            content_type: None,
            content_encoding: None,
            content_language: None,
            content_md5: None,
            e_tag: None,
            user_metadata: BTreeMap::new(),
            physical_location: None,
            uri: None,
        }
    }

    pub fn is_container(&self) -> bool {
        self.storage_type == StorageType::Container
    }

    /// Containers count as directories.
    pub fn is_directory(&self) -> bool {
        matches!(
            self.storage_type,
            StorageType::Container | StorageType::Directory
        )
    }

    pub fn is_regular_file(&self) -> bool {
        self.storage_type == StorageType::File
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclAttributes {
    pub basic: BasicAttributes,
    pub acl: AclSet,
}

/// A single value of an attribute map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Bool(bool),
    Size(u64),
    Time(Option<DateTime<Utc>>),
    Text(Option<String>),
    Metadata(BTreeMap<String, String>),
    Acl(AclSnapshot),
}

/// The placeholder ACL for paths without a stored one.
pub fn default_acl(access: BlobAccess) -> AclSet {
    let access_entry = AclEntry::allow(Principal::Access(access));
    let access_entry = match access {
        BlobAccess::Public => access_entry.with_permissions([
            AclPermission::ReadData,
            AclPermission::ReadAttributes,
            AclPermission::ReadNamedAttrs,
            AclPermission::ReadAcl,
        ]),
        BlobAccess::Private => access_entry,
    };
    AclSet::new(Principal::AnonymousUser).with_entries([access_entry])
}

/// The attributes of one path on one filesystem.
#[derive(Debug, Clone, Copy)]
pub struct AttributeView<'a> {
    fs: &'a CloudFileSystem,
    path: &'a CloudPath,
}

impl<'a> AttributeView<'a> {
    pub fn new(fs: &'a CloudFileSystem, path: &'a CloudPath) -> Self {
        Self { fs, path }
    }

    pub fn path(&self) -> &CloudPath {
        self.path
    }

    fn with_host_checker(&self, acl: AclSet) -> AclSet {
        match &self.fs.host().conflict_checker {
            Some(checker) => acl.with_checker(checker.clone()),
            None => acl,
        }
    }

    fn uri(&self) -> Option<Url> {
        let raw = format!("cloudfs://{}{}", self.fs.id(), self.path.to_absolute_path());
        Url::parse(&raw).ok()
    }

    /// Read the attributes and ACL of the path.
    pub async fn read_attributes(&self) -> Result<AclAttributes> {
        let path = self.path.to_absolute_path();
        let container = path
            .container_name()
            .ok_or_else(|| FsError::NotFound(path.clone()))?;
        let store = self.fs.store();

        let Some(name) = path.path_name() else {
            if !store.container_exists(container) {
                return Err(FsError::NotFound(path.clone()));
            }
            let access = store.container_access(container)?;
            let mut metadata = store.container_metadata(container)?;
            let acl = decode_acl(metadata.remove(ACL_METADATA_KEY))?
                .unwrap_or_else(|| default_acl(access));
            let acl = self.with_host_checker(acl);
            let mut basic = BasicAttributes::placeholder(StorageType::Container);
            basic.user_metadata = metadata;
            basic.physical_location = Some(format!("{}/{}", store.id(), container));
            basic.uri = self.uri();
            return Ok(AclAttributes { basic, acl });
        };

        if !store.container_exists(container) {
            return Err(FsError::NotFound(path.clone()));
        }
        let info = store
            .stat(container, &name)
            .await?
            .ok_or_else(|| FsError::NotFound(path.clone()))?;
        let access = store.blob_access(container, &name)?;
        self.from_object(info, access, format!("{}/{}/{}", store.id(), container, name))
    }

    fn from_object(
        &self,
        info: ObjectInfo,
        access: BlobAccess,
        location: String,
    ) -> Result<AclAttributes> {
        let is_directory = info.is_directory();
        let mut properties = info.properties;
        let acl = decode_acl(properties.user_metadata.remove(ACL_METADATA_KEY))?
            .unwrap_or_else(|| default_acl(access));
        let acl = self.with_host_checker(acl);

        let mut basic = if is_directory {
            BasicAttributes::placeholder(StorageType::Directory)
        } else {
            BasicAttributes {
                storage_type: StorageType::File,
                size: info.size,
                last_modified: info.last_modified,
                last_access: info.last_modified,
                creation_time: info.last_modified,
                content_type: properties.content_type,
                content_encoding: properties.content_encoding,
                content_language: properties.content_language,
                content_md5: properties.content_md5,
                e_tag: info.e_tag,
                user_metadata: BTreeMap::new(),
                physical_location: None,
                uri: None,
            }
        };
        basic.user_metadata = properties.user_metadata;
        basic.physical_location = Some(location);
        basic.uri = self.uri();
        Ok(AclAttributes { basic, acl })
    }

    /// Check that the current principal holds `permissions` on the path.
    ///
    /// Fails with NotFound if the path does not exist; passes when the host
    /// has no security manager.
    pub async fn check_access(&self, permissions: &BTreeSet<AclPermission>) -> Result<()> {
        let attributes = self.read_attributes().await?;
        let Some(manager) = &self.fs.host().security_manager else {
            return Ok(());
        };
        let principal = self.fs.host().current_principal();
        if manager.check_access_allowed(&attributes.acl, &principal, permissions) {
            Ok(())
        } else {
            tracing::debug!(path = %self.path, %principal, ?permissions, "access denied");
            Err(FsError::AccessDenied(self.path.clone()))
        }
    }

    /// Replace the ACL of the path on behalf of `caller`.
    ///
    /// The caller must own the existing ACL or hold `WriteAcl` on it. That
    /// covers owner changes too.
    pub async fn set_acl(&self, caller: &Principal, acl: &AclSet) -> Result<()> {
        let existing = self.read_attributes().await?.acl;
        existing.check_write_access(caller)?;
        self.store_acl(acl).await
    }

    /// Write an ACL without checking the caller.
    pub(crate) async fn store_acl(&self, acl: &AclSet) -> Result<()> {
        let path = self.path.to_absolute_path();
        let container = path
            .container_name()
            .ok_or_else(|| FsError::NotFound(path.clone()))?;
        let store = self.fs.store();
        let encoded = serde_json::to_string(&acl.snapshot())?;
        let access = acl.entries().iter().find_map(|entry| match entry.principal() {
            Principal::Access(access) if entry.is_allow() => Some(*access),
            _ => None,
        });

        match path.path_name() {
            None => {
                let mut metadata = store.container_metadata(container)?;
                metadata.insert(ACL_METADATA_KEY.to_string(), encoded);
                store.set_container_metadata(container, metadata)?;
                if let Some(access) = access {
                    store.set_container_access(container, access)?;
                }
            }
            Some(name) => {
                let info = store
                    .stat(container, &name)
                    .await?
                    .ok_or_else(|| FsError::NotFound(path.clone()))?;
                let mut metadata = info.properties.user_metadata;
                metadata.insert(ACL_METADATA_KEY.to_string(), encoded);
                store.set_user_metadata(container, &name, metadata).await?;
                if let Some(access) = access {
                    store.set_blob_access(container, &name, access)?;
                }
            }
        }
        tracing::debug!(path = %path, entries = acl.len(), "stored acl");
        Ok(())
    }

    /// Read a selection of attributes by name.
    pub async fn read_attribute_map(
        &self,
        selection: &str,
    ) -> Result<BTreeMap<String, AttributeValue>> {
        let (view, names) = match selection.split_once(':') {
            Some((view, names)) => (view, names),
            None => (BASIC_VIEW, selection),
        };
        let known = match view {
            BASIC_VIEW => BASIC_ATTRIBUTES,
            CLOUD_VIEW => CLOUD_ATTRIBUTES,
            other => return Err(FsError::InvalidAttribute(format!("unknown view '{}'", other))),
        };
        let names: Vec<&str> = if names.trim() == "*" {
            known.to_vec()
        } else {
            names.split(',').map(str::trim).filter(|n| !n.is_empty()).collect()
        };
        if let Some(unknown) = names.iter().find(|name| !known.contains(*name)) {
            return Err(FsError::InvalidAttribute(format!("{}:{}", view, unknown)));
        }

        let attributes = self.read_attributes().await?;
        Ok(names
            .into_iter()
            .map(|name| (name.to_string(), attribute_value(&attributes, name)))
            .collect())
    }
}

fn attribute_value(attributes: &AclAttributes, name: &str) -> AttributeValue {
    let basic = &attributes.basic;
    match name {
        "size" => AttributeValue::Size(basic.size),
        "isDirectory" => AttributeValue::Bool(basic.is_directory()),
        "isRegularFile" => AttributeValue::Bool(basic.is_regular_file()),
        "isOther" | "isSymbolicLink" => AttributeValue::Bool(false),
        "fileKey" => AttributeValue::Text(basic.physical_location.clone()),
        "lastModifiedTime" => AttributeValue::Time(basic.last_modified),
        "lastAccessTime" => AttributeValue::Time(basic.last_access),
        "creationTime" => AttributeValue::Time(basic.creation_time),
        "contentMD5" => AttributeValue::Text(basic.content_md5.clone()),
        "contentType" => AttributeValue::Text(basic.content_type.clone()),
        "eTag" => AttributeValue::Text(basic.e_tag.clone()),
        "physicalLocation" => AttributeValue::Text(basic.physical_location.clone()),
        "uri" => AttributeValue::Text(basic.uri.as_ref().map(Url::to_string)),
        "userMetadata" => AttributeValue::Metadata(basic.user_metadata.clone()),
        _ => AttributeValue::Acl(attributes.acl.snapshot()),
    }
}

fn decode_acl(raw: Option<String>) -> Result<Option<AclSet>> {
    raw.map(|raw| -> Result<AclSet> {
        let snapshot: AclSnapshot = serde_json::from_str(&raw)?;
        Ok(AclSet::from_snapshot(snapshot)?)
    })
    .transpose()
}
