//! # Principals
//!
//! Principals are the identities ACL entries and owners refer to.
//!
//! Besides named users and groups there are two anonymous principals and a
//! blob access marker:
//!
//! - [`Principal::AnonymousUser`] / [`Principal::AnonymousGroup`] stand for
//!   "anyone". Owning a resource through either of them grants every caller
//!   owner rights over its ACL.
//! - [`Principal::Access`] mirrors the backend's public/private flag, so a
//!   set holds at most one access level at a time.
//!
//! ## Lookup
//!
//! Who the caller is, and which groups a user belongs to, comes from a
//! [`UserGroupLookup`] configured on the host. [`StaticUserGroupLookup`] is an
//! in-process directory suitable for tests and single-tenant mounts.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

pub use object_store_client::BlobAccess;

/// An identity that ACL entries and owners refer to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Principal {
    /// A named user
    User(String),
    /// A named group of users
    Group(String),
    /// Any user
    AnonymousUser,
    /// Any group
    AnonymousGroup,
    /// The backend's public/private access level
    Access(BlobAccess),
}

/// The class a principal belongs to. Conflicts and merges are only
/// considered between entries of the same class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrincipalClass {
    User,
    Group,
    Access,
}

impl Principal {
    pub fn user(name: impl Into<String>) -> Self {
        Principal::User(name.into())
    }

    pub fn group(name: impl Into<String>) -> Self {
        Principal::Group(name.into())
    }

    pub fn class(&self) -> PrincipalClass {
        match self {
            Principal::User(_) | Principal::AnonymousUser => PrincipalClass::User,
            Principal::Group(_) | Principal::AnonymousGroup => PrincipalClass::Group,
            Principal::Access(_) => PrincipalClass::Access,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::AnonymousUser | Principal::AnonymousGroup)
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Principal::User(name) => write!(f, "user:{}", name),
            Principal::Group(name) => write!(f, "group:{}", name),
            Principal::AnonymousUser => write!(f, "anonymous-user"),
            Principal::AnonymousGroup => write!(f, "anonymous-group"),
            Principal::Access(access) => write!(f, "access:{}", access),
        }
    }
}

/// Resolves the calling principal and group membership.
pub trait UserGroupLookup: std::fmt::Debug + Send + Sync {
    /// The principal operations are performed as, if one is known.
    fn current_user(&self) -> Option<Principal>;

    fn lookup_user(&self, name: &str) -> Option<Principal>;

    fn lookup_group(&self, name: &str) -> Option<Principal>;

    /// Whether `member` belongs to the named `group`.
    fn is_member(&self, group: &Principal, member: &Principal) -> bool;
}

/// An in-process user and group directory.
#[derive(Debug, Default)]
pub struct StaticUserGroupLookup {
    current: RwLock<Option<String>>,
    users: BTreeSet<String>,
    groups: BTreeMap<String, BTreeSet<String>>,
}

impl StaticUserGroupLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, name: impl Into<String>) -> Self {
        self.users.insert(name.into());
        self
    }

    /// Register a group; its members are registered as users too.
    pub fn with_group<I, S>(mut self, name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let members: BTreeSet<String> = members.into_iter().map(Into::into).collect();
        self.users.extend(members.iter().cloned());
        self.groups.entry(name.into()).or_default().extend(members);
        self
    }

    pub fn with_current_user(self, name: impl Into<String>) -> Self {
        let name = name.into();
        *self.current.write() = Some(name.clone());
        self.with_user(name)
    }

    /// Switch the calling user; `None` makes calls anonymous.
    pub fn set_current_user(&self, name: Option<&str>) {
        *self.current.write() = name.map(str::to_string);
    }
}

impl UserGroupLookup for StaticUserGroupLookup {
    fn current_user(&self) -> Option<Principal> {
        self.current.read().clone().map(Principal::User)
    }

    fn lookup_user(&self, name: &str) -> Option<Principal> {
        self.users.contains(name).then(|| Principal::user(name))
    }

    fn lookup_group(&self, name: &str) -> Option<Principal> {
        self.groups.contains_key(name).then(|| Principal::group(name))
    }

    fn is_member(&self, group: &Principal, member: &Principal) -> bool {
        match (group, member) {
            (Principal::Group(group), Principal::User(user)) => self
                .groups
                .get(group)
                .map(|members| members.contains(user))
                .unwrap_or(false),
            _ => false,
        }
    }
}
