//! Value types exchanged with the blob client.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public/private access level of a container or blob.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BlobAccess {
    /// Only authenticated principals may read
    #[default]
    Private,
    /// Anyone may read
    Public,
}

impl std::fmt::Display for BlobAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlobAccess::Private => write!(f, "private"),
            BlobAccess::Public => write!(f, "public"),
        }
    }
}

/// What a listed or stat'ed name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A blob with content
    File,
    /// A directory marker, or a prefix that has blobs beneath it
    Directory,
}

/// Content properties and user metadata stored alongside a blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobProperties {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    /// Hex encoded MD5 of the content, computed by the client on upload
    pub content_md5: Option<String>,
    pub user_metadata: BTreeMap<String, String>,
}

impl BlobProperties {
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_user_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_metadata.insert(key.into(), value.into());
        self
    }
}

/// Metadata snapshot of a single blob or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Name relative to the container, without the marker suffix for directories
    pub name: String,
    pub kind: ObjectKind,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub e_tag: Option<String>,
    pub properties: BlobProperties,
}

impl ObjectInfo {
    /// A directory that only exists because blobs live beneath its prefix.
    pub(crate) fn implicit_directory(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ObjectKind::Directory,
            size: 0,
            last_modified: None,
            e_tag: None,
            properties: BlobProperties::default(),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == ObjectKind::Directory
    }
}

/// One row of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    /// Full name relative to the container
    pub name: String,
    pub kind: ObjectKind,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Only list beneath this directory name
    pub prefix: Option<String>,
    /// Descend below the first level
    pub recursive: bool,
    /// Resume after this name (exclusive)
    pub marker: Option<String>,
    /// Page size; unbounded when unset
    pub max_results: Option<usize>,
}

impl ListOptions {
    pub fn in_directory(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Default::default()
        }
    }

    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    pub fn after(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }
}

/// A page of listing results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub entries: Vec<ListEntry>,
    /// Pass back as [`ListOptions::marker`] to fetch the next page
    pub next_marker: Option<String>,
}
