use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::conflict::{AclConflictChecker, DefaultConflictChecker};
use super::entry::{AclEntry, AclPermission};
use super::principal::Principal;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AclError {
    #[error("{principal} is not an owner and holds no {permission:?} grant")]
    NotPermitted {
        principal: Principal,
        permission: AclPermission,
    },
    #[error("cannot remove {0}: an acl set keeps at least one owner")]
    LastOwner(Principal),
    #[error("an acl set needs at least one owner")]
    NoOwners,
}

/// The serialised form of an [`AclSet`], as stored in blob metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclSnapshot {
    pub owners: BTreeSet<Principal>,
    #[serde(default)]
    pub entries: BTreeSet<AclEntry>,
}

/// What [`AclSet::add_entry`] did with the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddEntryOutcome {
    /// The entry was inserted
    Added,
    /// An identical entry was already present
    AlreadyPresent,
    /// Conflicting entries exist and `force` was not set; nothing changed
    Rejected(BTreeSet<AclEntry>),
    /// The conflicting entries were removed and the entry inserted
    Replaced(BTreeSet<AclEntry>),
}

impl AddEntryOutcome {
    pub fn is_applied(&self) -> bool {
        !matches!(self, AddEntryOutcome::Rejected(_))
    }
}

#[derive(Clone)]
struct AclState {
    owners: BTreeSet<Principal>,
    entries: BTreeSet<AclEntry>,
}

impl AclState {
    fn is_owner(&self, principal: &Principal) -> bool {
        self.owners.contains(principal) || self.owners.iter().any(Principal::is_anonymous)
    }

    fn check(&self, caller: &Principal, permission: AclPermission) -> Result<(), AclError> {
        if self.is_owner(caller) {
            return Ok(());
        }
        let granted = self.entries.iter().any(|entry| {
            entry.principal() == caller
                && entry.is_allow()
                && entry.permissions().contains(&permission)
        });
        if granted {
            Ok(())
        } else {
            Err(AclError::NotPermitted {
                principal: caller.clone(),
                permission,
            })
        }
    }
}

/// The owners and entries attached to one resource.
///
/// Reads and the ownership checks run against a shared lock; every mutation
/// checks the caller and applies its change under one exclusive lock, so a
/// conflict check and the insert it guards cannot interleave with another
/// writer.
///
/// A set always has at least one owner. Any owner may change the entries;
/// other callers need an allow entry carrying [`AclPermission::WriteAcl`]
/// (or [`AclPermission::ReadAcl`] for [`AclSet::check_read_access`]).
pub struct AclSet {
    state: RwLock<AclState>,
    checker: Arc<dyn AclConflictChecker>,
}

impl AclSet {
    pub fn new(owner: Principal) -> Self {
        Self {
            state: RwLock::new(AclState {
                owners: BTreeSet::from([owner]),
                entries: BTreeSet::new(),
            }),
            checker: Arc::new(DefaultConflictChecker::new()),
        }
    }

    pub fn with_owners(owners: impl IntoIterator<Item = Principal>) -> Result<Self, AclError> {
        Self::from_snapshot(AclSnapshot {
            owners: owners.into_iter().collect(),
            entries: BTreeSet::new(),
        })
    }

    pub fn from_snapshot(snapshot: AclSnapshot) -> Result<Self, AclError> {
        if snapshot.owners.is_empty() {
            return Err(AclError::NoOwners);
        }
        Ok(Self {
            state: RwLock::new(AclState {
                owners: snapshot.owners,
                entries: snapshot.entries,
            }),
            checker: Arc::new(DefaultConflictChecker::new()),
        })
    }

    /// Swap the conflict checker used by later mutations.
    pub fn with_checker(mut self, checker: Arc<dyn AclConflictChecker>) -> Self {
        self.checker = checker;
        self
    }

    /// Build a set without checking the caller, e.g. for defaults.
    pub fn with_entries(self, entries: impl IntoIterator<Item = AclEntry>) -> Self {
        self.state.write().entries.extend(entries);
        self
    }

    pub fn snapshot(&self) -> AclSnapshot {
        let state = self.state.read();
        AclSnapshot {
            owners: state.owners.clone(),
            entries: state.entries.clone(),
        }
    }

    /* Getters */

    pub fn checker(&self) -> &Arc<dyn AclConflictChecker> {
        &self.checker
    }

    pub fn owners(&self) -> BTreeSet<Principal> {
        self.state.read().owners.clone()
    }

    pub fn entries(&self) -> BTreeSet<AclEntry> {
        self.state.read().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    pub fn contains(&self, entry: &AclEntry) -> bool {
        self.state.read().entries.contains(entry)
    }

    pub fn find_entries(&self, principal: &Principal) -> Vec<AclEntry> {
        self.state
            .read()
            .entries
            .iter()
            .filter(|entry| entry.principal() == principal)
            .cloned()
            .collect()
    }

    /// Whether `principal` owns this set. An anonymous owner makes everyone
    /// an owner.
    pub fn is_owner(&self, principal: &Principal) -> bool {
        self.state.read().is_owner(principal)
    }

    pub fn check_read_access(&self, caller: &Principal) -> Result<(), AclError> {
        self.state.read().check(caller, AclPermission::ReadAcl)
    }

    pub fn check_write_access(&self, caller: &Principal) -> Result<(), AclError> {
        self.state.read().check(caller, AclPermission::WriteAcl)
    }

    pub fn conflicts_with(&self, entry: &AclEntry) -> BTreeSet<AclEntry> {
        let state = self.state.read();
        self.checker.conflicts(entry, &state.entries)
    }

    /* Mutations */

    /// Add an entry on behalf of `caller`.
    ///
    /// Conflicting entries reject the add unless `force` is set, in which case
    /// they are removed first.
    pub fn add_entry(
        &self,
        caller: &Principal,
        entry: AclEntry,
        force: bool,
    ) -> Result<AddEntryOutcome, AclError> {
        let mut state = self.state.write();
        state.check(caller, AclPermission::WriteAcl)?;

        if state.entries.contains(&entry) {
            return Ok(AddEntryOutcome::AlreadyPresent);
        }

        let conflicts = self.checker.conflicts(&entry, &state.entries);
        if conflicts.is_empty() {
            state.entries.insert(entry);
            return Ok(AddEntryOutcome::Added);
        }
        if !force {
            tracing::debug!(%entry, conflicts = conflicts.len(), "acl entry rejected");
            return Ok(AddEntryOutcome::Rejected(conflicts));
        }

        for conflict in &conflicts {
            state.entries.remove(conflict);
        }
        state.entries.insert(entry);
        Ok(AddEntryOutcome::Replaced(conflicts))
    }

    pub fn remove_entry(&self, caller: &Principal, entry: &AclEntry) -> Result<bool, AclError> {
        let mut state = self.state.write();
        state.check(caller, AclPermission::WriteAcl)?;
        Ok(state.entries.remove(entry))
    }

    /// Replace every entry at once, ignoring conflicts between the new ones.
    pub fn replace_entries(
        &self,
        caller: &Principal,
        entries: impl IntoIterator<Item = AclEntry>,
    ) -> Result<(), AclError> {
        let mut state = self.state.write();
        state.check(caller, AclPermission::WriteAcl)?;
        state.entries = entries.into_iter().collect();
        Ok(())
    }

    /// Owners are part of the ACL, so changing them needs the same
    /// [`AclPermission::WriteAcl`] grant as changing entries.
    pub fn add_owner(&self, caller: &Principal, owner: Principal) -> Result<bool, AclError> {
        let mut state = self.state.write();
        state.check(caller, AclPermission::WriteAcl)?;
        Ok(state.owners.insert(owner))
    }

    pub fn remove_owner(&self, caller: &Principal, owner: &Principal) -> Result<bool, AclError> {
        let mut state = self.state.write();
        state.check(caller, AclPermission::WriteAcl)?;
        if !state.owners.contains(owner) {
            return Ok(false);
        }
        if state.owners.len() == 1 {
            return Err(AclError::LastOwner(owner.clone()));
        }
        Ok(state.owners.remove(owner))
    }

    /// Merge redundant entries; returns how many entries were folded away.
    pub fn optimise(&self, caller: &Principal) -> Result<usize, AclError> {
        let mut state = self.state.write();
        state.check(caller, AclPermission::WriteAcl)?;
        let before = state.entries.len();
        state.entries = self.checker.optimise(&state.entries);
        Ok(before - state.entries.len())
    }
}

impl Clone for AclSet {
    fn clone(&self) -> Self {
        Self {
            state: RwLock::new(self.state.read().clone()),
            checker: self.checker.clone(),
        }
    }
}

impl PartialEq for AclSet {
    fn eq(&self, other: &Self) -> bool {
        self.snapshot() == other.snapshot()
    }
}

impl Eq for AclSet {}

impl std::fmt::Debug for AclSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("AclSet")
            .field("owners", &state.owners)
            .field("entries", &state.entries)
            .finish()
    }
}
