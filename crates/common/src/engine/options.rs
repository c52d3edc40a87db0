use std::collections::BTreeSet;

use crate::acl::AclPermission;

/// Options recognised by engine operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CloudOption {
    /// Descend into directories
    Recursive,
    /// Log and skip failing items of a batch instead of aborting it
    FailSilently,
    /// Allow overwriting an existing target
    ReplaceExisting,
    /// Carry metadata and ACL along on copy
    CopyAttributes,
    /// Skip building the source to copy method map
    DontReturnCopyMethod,
}

/// A set of [`CloudOption`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudOptions(BTreeSet<CloudOption>);

impl CloudOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, option: CloudOption) -> Self {
        self.0.insert(option);
        self
    }

    pub fn recursive(self) -> Self {
        self.with(CloudOption::Recursive)
    }

    pub fn fail_silently(self) -> Self {
        self.with(CloudOption::FailSilently)
    }

    pub fn replace_existing(self) -> Self {
        self.with(CloudOption::ReplaceExisting)
    }

    pub fn copy_attributes(self) -> Self {
        self.with(CloudOption::CopyAttributes)
    }

    pub fn dont_return_copy_method(self) -> Self {
        self.with(CloudOption::DontReturnCopyMethod)
    }

    pub fn contains(&self, option: CloudOption) -> bool {
        self.0.contains(&option)
    }

    pub fn is_recursive(&self) -> bool {
        self.contains(CloudOption::Recursive)
    }

    pub fn is_fail_silently(&self) -> bool {
        self.contains(CloudOption::FailSilently)
    }

    pub fn is_replace_existing(&self) -> bool {
        self.contains(CloudOption::ReplaceExisting)
    }

    pub fn is_copy_attributes(&self) -> bool {
        self.contains(CloudOption::CopyAttributes)
    }

    pub fn returns_copy_method(&self) -> bool {
        !self.contains(CloudOption::DontReturnCopyMethod)
    }
}

impl FromIterator<CloudOption> for CloudOptions {
    fn from_iter<I: IntoIterator<Item = CloudOption>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[CloudOption; N]> for CloudOptions {
    fn from(options: [CloudOption; N]) -> Self {
        options.into_iter().collect()
    }
}

/// Why a file is being opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpenIntent {
    Read,
    Write,
    Append,
    TruncateExisting,
    /// Create the file if it is missing
    Create,
    /// Create the file, failing if it exists
    CreateNew,
}

impl OpenIntent {
    pub fn is_create(self) -> bool {
        matches!(self, OpenIntent::Create | OpenIntent::CreateNew)
    }

    /// The permission needed on an existing file. Creation is checked on the
    /// parent instead, see [`AclPermission::ADD_FILE`].
    pub fn permission(self) -> Option<AclPermission> {
        match self {
            OpenIntent::Read => Some(AclPermission::ReadData),
            OpenIntent::Write | OpenIntent::TruncateExisting => Some(AclPermission::WriteData),
            OpenIntent::Append => Some(AclPermission::AppendData),
            OpenIntent::Create | OpenIntent::CreateNew => None,
        }
    }
}
