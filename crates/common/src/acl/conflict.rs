//! Conflict detection and merging for ACL entries
//!
//! Two entries conflict when applying both would give a contradictory answer
//! for the same caller and permission. The checker is pluggable so hosts can
//! decide how far group membership is taken into account.
//!
//! # Built-in Checker
//!
//! - **[`DefaultConflictChecker`]**: same-principal allow/deny overlaps,
//!   differing access levels, and (when given a membership lookup)
//!   user-vs-group overlaps
//!
//! # Custom Checkers
//!
//! Implement [`AclConflictChecker::is_conflict`]; merging and optimisation
//! come for free from the provided methods.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::entry::AclEntry;
use super::principal::{Principal, UserGroupLookup};

/// Trait for ACL conflict strategies
pub trait AclConflictChecker: std::fmt::Debug + Send + Sync {
    /// Whether `a` and `b` contradict each other
    fn is_conflict(&self, a: &AclEntry, b: &AclEntry) -> bool;

    /// Merge two entries into one, if they describe the same rule
    ///
    /// The default merges entries with the same principal and type that do
    /// not conflict, taking the union of their permissions and flags.
    fn merge(&self, a: &AclEntry, b: &AclEntry) -> Option<AclEntry> {
        let mergeable = a.principal() == b.principal()
            && a.entry_type() == b.entry_type()
            && !self.is_conflict(a, b);
        mergeable.then(|| a.union(b))
    }

    /// Every entry of `entries` that conflicts with `entry`
    fn conflicts(&self, entry: &AclEntry, entries: &BTreeSet<AclEntry>) -> BTreeSet<AclEntry> {
        entries
            .iter()
            .filter(|existing| *existing != entry && self.is_conflict(entry, existing))
            .cloned()
            .collect()
    }

    /// Collapse mergeable entries
    ///
    /// Entries are only compared within the same principal class, and each
    /// unordered pair is considered at most once.
    fn optimise(&self, entries: &BTreeSet<AclEntry>) -> BTreeSet<AclEntry> {
        let mut merged: Vec<AclEntry> = entries.iter().cloned().collect();
        let mut i = 0;
        while i < merged.len() {
            let mut j = i + 1;
            while j < merged.len() {
                let same_class = merged[i].principal().class() == merged[j].principal().class();
                let combined = if same_class {
                    self.merge(&merged[i], &merged[j])
                } else {
                    None
                };
                match combined {
                    Some(entry) => {
                        merged[i] = entry;
                        merged.remove(j);
                    }
                    None => j += 1,
                }
            }
            i += 1;
        }
        merged.into_iter().collect()
    }
}

/// The standard conflict rules
///
/// 1. Two access-level entries conflict iff their levels differ.
/// 2. Entries for the same principal conflict when one allows and the other
///    denies at least one common permission.
/// 3. With a membership lookup configured, a user entry and a group entry
///    conflict under rule 2 when the user belongs to the group.
#[derive(Debug, Clone, Default)]
pub struct DefaultConflictChecker {
    membership: Option<Arc<dyn UserGroupLookup>>,
}

impl DefaultConflictChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also treat user-vs-group overlaps as conflicts.
    pub fn with_group_membership(lookup: Arc<dyn UserGroupLookup>) -> Self {
        Self {
            membership: Some(lookup),
        }
    }
}

fn opposed(a: &AclEntry, b: &AclEntry) -> bool {
    a.entry_type() != b.entry_type() && a.grants_any(b.permissions())
}

impl AclConflictChecker for DefaultConflictChecker {
    fn is_conflict(&self, a: &AclEntry, b: &AclEntry) -> bool {
        match (a.principal(), b.principal()) {
            (Principal::Access(x), Principal::Access(y)) => x != y,
            (x, y) if x == y => opposed(a, b),
            (user @ Principal::User(_), group @ Principal::Group(_))
            | (group @ Principal::Group(_), user @ Principal::User(_)) => match &self.membership {
                Some(lookup) if lookup.is_member(group, user) => opposed(a, b),
                _ => false,
            },
            _ => false,
        }
    }
}
