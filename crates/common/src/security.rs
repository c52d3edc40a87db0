//! # Security checks
//!
//! A [`SecurityManager`] decides whether a principal may perform an operation
//! given the [`AclSet`] of the resource. The engine asks it before every
//! backend call; a host without a security manager allows everything.
//!
//! [`DefaultSecurityManager`] sorts every entry that grants at least one of
//! the requested permissions into one bucket, highest precedence first:
//!
//! 1. explicit user (the entry names the caller)
//! 2. explicit group (the entry names the caller's group principal)
//! 3. group membership (the caller belongs to the entry's group)
//! 4. anonymous user
//! 5. anonymous group
//!
//! Each bucket keeps the first verdict recorded for it. The highest bucket
//! holding a verdict decides; no verdict at all means access is denied.
//! Access-level entries never contribute a verdict.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::acl::{AclEntryType, AclPermission, AclSet, Principal, UserGroupLookup};

/// Pluggable access decision.
pub trait SecurityManager: std::fmt::Debug + Send + Sync {
    fn check_access_allowed(
        &self,
        acl: &AclSet,
        principal: &Principal,
        permissions: &BTreeSet<AclPermission>,
    ) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Bucket {
    ExplicitUser,
    ExplicitGroup,
    GroupMembership,
    AnonymousUser,
    AnonymousGroup,
}

impl Bucket {
    const COUNT: usize = 5;

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Default)]
pub struct DefaultSecurityManager {
    lookup: Option<Arc<dyn UserGroupLookup>>,
}

impl DefaultSecurityManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve group-membership entries through `lookup`.
    pub fn with_lookup(lookup: Arc<dyn UserGroupLookup>) -> Self {
        Self {
            lookup: Some(lookup),
        }
    }

    fn classify(&self, entry_principal: &Principal, caller: &Principal) -> Option<Bucket> {
        match entry_principal {
            Principal::AnonymousUser => Some(Bucket::AnonymousUser),
            Principal::AnonymousGroup => Some(Bucket::AnonymousGroup),
            Principal::Access(_) => None,
            Principal::User(_) if entry_principal == caller => Some(Bucket::ExplicitUser),
            Principal::Group(_) if entry_principal == caller => Some(Bucket::ExplicitGroup),
            Principal::Group(_) => self
                .lookup
                .as_ref()
                .filter(|lookup| lookup.is_member(entry_principal, caller))
                .map(|_| Bucket::GroupMembership),
            Principal::User(_) => None,
        }
    }
}

impl SecurityManager for DefaultSecurityManager {
    fn check_access_allowed(
        &self,
        acl: &AclSet,
        principal: &Principal,
        permissions: &BTreeSet<AclPermission>,
    ) -> bool {
        let mut verdicts: [Option<AclEntryType>; Bucket::COUNT] = [None; Bucket::COUNT];

        for entry in acl.entries() {
            if !entry.grants_any(permissions) {
                continue;
            }
            let Some(bucket) = self.classify(entry.principal(), principal) else {
                continue;
            };
            match verdicts[bucket.index()] {
                None => verdicts[bucket.index()] = Some(entry.entry_type()),
                Some(recorded) if recorded != entry.entry_type() => {
                    tracing::warn!(
                        %principal,
                        %entry,
                        ?bucket,
                        "conflicting acl verdict ignored, first verdict wins"
                    );
                }
                Some(_) => {}
            }
        }

        let decision = verdicts.iter().flatten().next().copied();
        tracing::debug!(%principal, ?permissions, ?decision, "access check");
        decision == Some(AclEntryType::Allow)
    }
}
