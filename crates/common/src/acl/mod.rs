//! Access control lists
//!
//! - **[`Principal`]**: who an entry applies to (user, group, anonymous
//!   user/group, or a public/private access marker)
//! - **[`AclEntry`]**: an allow/deny rule over a set of [`AclPermission`]s
//! - **[`AclConflictChecker`]**: decides which entries contradict each other
//!   and which can be merged
//! - **[`AclSet`]**: the owners and entries attached to one resource, with
//!   owner-gated mutation
//!
//! ACL sets are read from, and written back to, blob user metadata by the
//! [`AttributeView`](crate::attributes::AttributeView); nothing else turns
//! raw backend data into an [`AclSet`].

mod conflict;
mod entry;
mod principal;
mod set;

pub use conflict::{AclConflictChecker, DefaultConflictChecker};
pub use entry::{AclEntry, AclEntryType, AclFlag, AclPermission};
pub use principal::{
    BlobAccess, Principal, PrincipalClass, StaticUserGroupLookup, UserGroupLookup,
};
pub use set::{AclError, AclSet, AclSnapshot, AddEntryOutcome};
