//! Mount configuration, read from TOML.
//!
//! ```toml
//! [[mounts]]
//! id = "main"
//! page_size = 500
//!
//! [mounts.store]
//! type = "local"
//! path = "/var/lib/cloudfs"
//!
//! [mounts.security]
//! enabled = true
//! current_user = "alice"
//! group_membership_conflicts = true
//!
//! [mounts.security.groups]
//! staff = ["alice", "bob"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use object_store_client::ObjectStoreConfig;
use serde::{Deserialize, Serialize};

use crate::acl::{DefaultConflictChecker, StaticUserGroupLookup, UserGroupLookup};
use crate::filesystem::HostConfiguration;
use crate::security::DefaultSecurityManager;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudFsConfig {
    #[serde(default)]
    pub mounts: Vec<MountConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    /// Filesystem id paths on this mount are tagged with
    pub id: String,
    /// Entries requested per backend listing call
    #[serde(default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub store: ObjectStoreConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Check every operation against the path's ACL
    #[serde(default)]
    pub enabled: bool,
    /// User operations run as; anonymous when unset
    #[serde(default)]
    pub current_user: Option<String>,
    /// Group name to member user names
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,
    /// Treat user-vs-group entry overlaps as ACL conflicts
    #[serde(default)]
    pub group_membership_conflicts: bool,
}

impl SecurityConfig {
    /// Build the host services this configuration describes.
    pub fn host_configuration(&self) -> HostConfiguration {
        let mut directory = StaticUserGroupLookup::new();
        for (group, members) in &self.groups {
            directory = directory.with_group(group.clone(), members.iter().cloned());
        }
        if let Some(user) = &self.current_user {
            directory = directory.with_current_user(user.clone());
        }
        let lookup: Arc<dyn UserGroupLookup> = Arc::new(directory);

        let mut host = HostConfiguration::new().with_user_group_lookup(lookup.clone());
        if self.enabled {
            host = host.with_security_manager(Arc::new(DefaultSecurityManager::with_lookup(
                lookup.clone(),
            )));
        }
        if self.group_membership_conflicts {
            host = host.with_conflict_checker(Arc::new(
                DefaultConflictChecker::with_group_membership(lookup),
            ));
        }
        host
    }
}

impl CloudFsConfig {
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: CloudFsConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Mount ids must be non-empty and unique.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::BTreeSet::new();
        for mount in &self.mounts {
            if mount.id.trim().is_empty() {
                return Err(ConfigError::EmptyMountId);
            }
            if !seen.insert(mount.id.as_str()) {
                return Err(ConfigError::DuplicateMount(mount.id.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("mount id must not be empty")]
    EmptyMountId,

    #[error("mount '{0}' is configured more than once")]
    DuplicateMount(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
