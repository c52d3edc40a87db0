/**
 * Access control lists: principals, entries,
 *  conflict detection and owner-gated ACL sets.
 */
pub mod acl;
/**
 * Reading and writing the attributes (and the
 *  stored ACL) of a path.
 */
pub mod attributes;
/**
 * The blob storage seam the engine talks to,
 *  implemented by the object store client.
 */
pub mod backend;
/**
 * TOML mount configuration.
 */
pub mod config;
pub mod dispatcher;
/**
 * Filesystem operations: create, read, write,
 *  list, delete, copy and move, with copy
 *  strategy selection.
 */
pub mod engine;
pub mod error;
/**
 * Mounted filesystem handles and the host
 *  services attached to them.
 */
pub mod filesystem;
/**
 * Hierarchical paths over containers and
 *  blob names.
 */
pub mod path;
/**
 * Access decisions over ACL sets.
 */
pub mod security;

pub use dispatcher::Dispatcher;
pub use error::{FsError, Result};

pub use backend::BlobStore;

pub mod prelude {
    pub use crate::acl::{
        AclConflictChecker, AclEntry, AclEntryType, AclError, AclFlag, AclPermission, AclSet,
        AclSnapshot, AddEntryOutcome, BlobAccess, DefaultConflictChecker, Principal,
        StaticUserGroupLookup, UserGroupLookup,
    };
    pub use crate::attributes::{
        AclAttributes, AttributeValue, AttributeView, BasicAttributes, StorageType,
    };
    pub use crate::backend::BlobStore;
    pub use crate::config::{CloudFsConfig, MountConfig, SecurityConfig};
    pub use crate::dispatcher::Dispatcher;
    pub use crate::engine::{
        CloudEngine, CloudOption, CloudOptions, CopyMethod, DefaultCloudEngine, OpenIntent,
    };
    pub use crate::error::FsError;
    pub use crate::filesystem::{CloudFileSystem, HostConfiguration};
    pub use crate::path::{CloudPath, FileSystemId, PathError};
    pub use crate::security::{DefaultSecurityManager, SecurityManager};
}
