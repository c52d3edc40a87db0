//! Mounted filesystem handles.

use std::sync::Arc;

use crate::acl::{AclConflictChecker, Principal, UserGroupLookup};
use crate::backend::BlobStore;
use crate::engine::CloudEngine;
use crate::path::{CloudPath, FileSystemId, PathError};
use crate::security::SecurityManager;

/// Host-provided identity and security services for one mount.
#[derive(Debug, Clone, Default)]
pub struct HostConfiguration {
    pub user_group_lookup: Option<Arc<dyn UserGroupLookup>>,
    pub security_manager: Option<Arc<dyn SecurityManager>>,
    /// Conflict rules for ACLs read from this mount
    pub conflict_checker: Option<Arc<dyn AclConflictChecker>>,
}

impl HostConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_group_lookup(mut self, lookup: Arc<dyn UserGroupLookup>) -> Self {
        self.user_group_lookup = Some(lookup);
        self
    }

    pub fn with_security_manager(mut self, manager: Arc<dyn SecurityManager>) -> Self {
        self.security_manager = Some(manager);
        self
    }

    pub fn with_conflict_checker(mut self, checker: Arc<dyn AclConflictChecker>) -> Self {
        self.conflict_checker = Some(checker);
        self
    }

    /// The principal operations run as; anonymous when nothing is configured.
    pub fn current_principal(&self) -> Principal {
        self.user_group_lookup
            .as_ref()
            .and_then(|lookup| lookup.current_user())
            .unwrap_or(Principal::AnonymousUser)
    }
}

/// A mounted filesystem: a backend, the engine operating on it, and the host
/// services gating access.
#[derive(Debug, Clone)]
pub struct CloudFileSystem {
    id: FileSystemId,
    store: Arc<dyn BlobStore>,
    engine: Arc<dyn CloudEngine>,
    host: HostConfiguration,
}

impl CloudFileSystem {
    pub fn new(
        id: impl Into<FileSystemId>,
        store: Arc<dyn BlobStore>,
        engine: Arc<dyn CloudEngine>,
        host: HostConfiguration,
    ) -> Self {
        Self {
            id: id.into(),
            store,
            engine,
            host,
        }
    }

    /* Getters */

    pub fn id(&self) -> &FileSystemId {
        &self.id
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    pub fn engine(&self) -> &Arc<dyn CloudEngine> {
        &self.engine
    }

    pub fn host(&self) -> &HostConfiguration {
        &self.host
    }

    /// Build a path on this filesystem.
    pub fn path(&self, raw: &str) -> Result<CloudPath, PathError> {
        CloudPath::new(self.id.clone(), raw)
    }

    /// Whether blobs can be copied between the two filesystems by the
    /// backend itself.
    pub fn can_operate_together(&self, other: &CloudFileSystem) -> bool {
        self.store.id() == other.store.id()
    }
}
