use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::principal::Principal;

/// Whether an entry grants or withholds its permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AclEntryType {
    Allow,
    Deny,
}

/// Permissions an ACL entry can carry.
///
/// Directory operations reuse the data permissions, see the associated
/// constants [`AclPermission::LIST_DIRECTORY`], [`AclPermission::ADD_FILE`]
/// and [`AclPermission::ADD_SUBDIRECTORY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AclPermission {
    ReadData,
    WriteData,
    AppendData,
    ReadNamedAttrs,
    WriteNamedAttrs,
    Execute,
    DeleteChild,
    ReadAttributes,
    WriteAttributes,
    Delete,
    ReadAcl,
    WriteAcl,
    WriteOwner,
    Synchronize,
}

impl AclPermission {
    pub const LIST_DIRECTORY: AclPermission = AclPermission::ReadData;
    pub const ADD_FILE: AclPermission = AclPermission::WriteData;
    pub const ADD_SUBDIRECTORY: AclPermission = AclPermission::AppendData;

    pub const ALL: [AclPermission; 14] = [
        AclPermission::ReadData,
        AclPermission::WriteData,
        AclPermission::AppendData,
        AclPermission::ReadNamedAttrs,
        AclPermission::WriteNamedAttrs,
        AclPermission::Execute,
        AclPermission::DeleteChild,
        AclPermission::ReadAttributes,
        AclPermission::WriteAttributes,
        AclPermission::Delete,
        AclPermission::ReadAcl,
        AclPermission::WriteAcl,
        AclPermission::WriteOwner,
        AclPermission::Synchronize,
    ];

    /// Collect permissions into the ordered set entries and checks use.
    pub fn set(permissions: impl IntoIterator<Item = AclPermission>) -> BTreeSet<AclPermission> {
        permissions.into_iter().collect()
    }
}

/// Inheritance flags, carried but not interpreted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AclFlag {
    FileInherit,
    DirectoryInherit,
    NoPropagateInherit,
    InheritOnly,
}

/// A single allow/deny rule for one principal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AclEntry {
    principal: Principal,
    entry_type: AclEntryType,
    #[serde(default)]
    flags: BTreeSet<AclFlag>,
    #[serde(default)]
    permissions: BTreeSet<AclPermission>,
}

impl AclEntry {
    pub fn new(entry_type: AclEntryType, principal: Principal) -> Self {
        Self {
            principal,
            entry_type,
            flags: BTreeSet::new(),
            permissions: BTreeSet::new(),
        }
    }

    pub fn allow(principal: Principal) -> Self {
        Self::new(AclEntryType::Allow, principal)
    }

    pub fn deny(principal: Principal) -> Self {
        Self::new(AclEntryType::Deny, principal)
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = AclPermission>) -> Self {
        self.permissions.extend(permissions);
        self
    }

    pub fn with_flags(mut self, flags: impl IntoIterator<Item = AclFlag>) -> Self {
        self.flags.extend(flags);
        self
    }

    /* Getters */

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn entry_type(&self) -> AclEntryType {
        self.entry_type
    }

    pub fn is_allow(&self) -> bool {
        self.entry_type == AclEntryType::Allow
    }

    pub fn flags(&self) -> &BTreeSet<AclFlag> {
        &self.flags
    }

    pub fn permissions(&self) -> &BTreeSet<AclPermission> {
        &self.permissions
    }

    /// Whether this entry names at least one of `permissions`.
    pub fn grants_any(&self, permissions: &BTreeSet<AclPermission>) -> bool {
        !self.permissions.is_disjoint(permissions)
    }

    /// This entry with the permissions and flags of `other` added.
    pub fn union(&self, other: &AclEntry) -> AclEntry {
        let mut merged = self.clone();
        merged.permissions.extend(other.permissions.iter().copied());
        merged.flags.extend(other.flags.iter().copied());
        merged
    }
}

impl std::fmt::Display for AclEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.entry_type {
            AclEntryType::Allow => "ALLOW",
            AclEntryType::Deny => "DENY",
        };
        write!(f, "{} {} {:?}", kind, self.principal, self.permissions)
    }
}
