//! # Paths
//!
//! [`CloudPath`] is an immutable, hierarchical path into a mounted cloud
//! filesystem. For absolute paths the first segment names the *container*
//! (the backend's top level namespace, e.g. a bucket) and the remaining
//! segments form the blob name inside it:
//!
//! ```text
//! /photos/2024/beach.jpg
//!  ^^^^^^ ^^^^^^^^^^^^^^
//!  container   path name
//! ```
//!
//! Paths are normalised eagerly when they are built: repeated separators are
//! collapsed, `.` is dropped and `..` pops the previous segment (silently
//! doing nothing at the root). There is no later normalisation step, so
//! [`CloudPath::normalize`] is the identity.
//!
//! The [`Ord`] implementation compares segment lists lexicographically, a
//! strict prefix sorting first. ACL and tree code relies on this being a
//! total order.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Separator between path segments.
pub const SEPARATOR: char = '/';

/// Identifies the mounted filesystem a path belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileSystemId(Arc<str>);

impl FileSystemId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FileSystemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for FileSystemId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl fmt::Display for FileSystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("path {0:?} contains a blank segment")]
    BlankSegment(String),
    #[error("index {index} is out of range for a path of {len} segments")]
    IndexOutOfRange { index: isize, len: usize },
    #[error("invalid range {begin}..={end} for a path of {len} segments")]
    InvalidRange { begin: usize, end: usize, len: usize },
}

/// An absolute or relative path on a mounted cloud filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CloudPath {
    file_system: FileSystemId,
    absolute: bool,
    segments: Vec<String>,
}

impl CloudPath {
    /// Parse `raw`, absolute if it starts with `/`.
    pub fn new(file_system: impl Into<FileSystemId>, raw: &str) -> Result<Self, PathError> {
        let absolute = raw.starts_with(SEPARATOR);
        let pieces = raw.split(SEPARATOR).filter(|piece| !piece.is_empty());
        Self::build(file_system.into(), absolute, pieces, raw)
    }

    /// Build a path from already split segments.
    ///
    /// Unlike [`CloudPath::new`], empty segments are rejected here rather
    /// than collapsed.
    pub fn from_segments<I, S>(
        file_system: impl Into<FileSystemId>,
        absolute: bool,
        segments: I,
    ) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segments: Vec<String> = segments
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        let raw = segments.join("/");
        Self::build(file_system.into(), absolute, segments.iter(), &raw)
    }

    fn build<I, S>(
        file_system: FileSystemId,
        absolute: bool,
        pieces: I,
        raw: &str,
    ) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut segments: Vec<String> = Vec::new();
        for piece in pieces {
            match piece.as_ref() {
                "." => {}
                ".." => {
                    segments.pop();
                }
                blank if blank.trim().is_empty() => {
                    return Err(PathError::BlankSegment(raw.to_string()));
                }
                segment => segments.push(segment.to_string()),
            }
        }
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self {
            file_system,
            absolute,
            segments,
        })
    }

    fn with_segments(&self, absolute: bool, segments: Vec<String>) -> Self {
        Self {
            file_system: self.file_system.clone(),
            absolute,
            segments,
        }
    }

    /* Getters */

    pub fn file_system(&self) -> &FileSystemId {
        &self.file_system
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn name_count(&self) -> usize {
        self.segments.len()
    }

    /// True for an absolute, single segment path.
    pub fn is_container(&self) -> bool {
        self.absolute && self.segments.len() == 1
    }

    /// The container (first segment) of an absolute path.
    pub fn container_name(&self) -> Option<&str> {
        if self.absolute {
            self.segments.first().map(String::as_str)
        } else {
            None
        }
    }

    /// The blob name inside the container, or `None` for the container itself.
    ///
    /// Relative paths have no container, so their name is every segment.
    pub fn path_name(&self) -> Option<String> {
        let rest = if self.absolute {
            &self.segments[1..]
        } else {
            &self.segments[..]
        };
        if rest.is_empty() {
            None
        } else {
            Some(rest.join("/"))
        }
    }

    /// The last segment as a string.
    pub fn last_segment(&self) -> &str {
        // construction guarantees at least one segment
        self.segments
            .last()
            .map(String::as_str)
            .unwrap_or_default()
    }

    /* Algebra */

    /// The container path, or `None` if this path already is the container
    /// (or is relative).
    pub fn root(&self) -> Option<CloudPath> {
        if self.absolute && self.segments.len() > 1 {
            Some(self.with_segments(true, vec![self.segments[0].clone()]))
        } else {
            None
        }
    }

    /// All but the last segment, or `None` when only one remains.
    pub fn parent(&self) -> Option<CloudPath> {
        if self.segments.len() > 1 {
            let segments = self.segments[..self.segments.len() - 1].to_vec();
            Some(self.with_segments(self.absolute, segments))
        } else {
            None
        }
    }

    /// The last segment as a relative path.
    pub fn file_name(&self) -> CloudPath {
        self.with_segments(false, vec![self.last_segment().to_string()])
    }

    /// The segment at `index` as a relative path. Negative indices count
    /// from the end.
    pub fn name(&self, index: isize) -> Result<CloudPath, PathError> {
        let len = self.segments.len();
        let resolved = if index < 0 {
            len.checked_sub(index.unsigned_abs())
        } else {
            Some(index as usize)
        };
        match resolved {
            Some(i) if i < len => Ok(self.with_segments(false, vec![self.segments[i].clone()])),
            _ => Err(PathError::IndexOutOfRange { index, len }),
        }
    }

    /// Segments `begin..=end` as a relative path.
    pub fn subpath(&self, begin: usize, end: usize) -> Result<CloudPath, PathError> {
        let len = self.segments.len();
        if begin > end || end >= len {
            return Err(PathError::InvalidRange { begin, end, len });
        }
        Ok(self.with_segments(false, self.segments[begin..=end].to_vec()))
    }

    /// Element-wise prefix test. Paths on different filesystems never match.
    pub fn starts_with(&self, other: &CloudPath) -> bool {
        if self.file_system != other.file_system || self.absolute != other.absolute {
            return false;
        }
        self.segments.starts_with(&other.segments)
    }

    /// Element-wise suffix test. An absolute `other` must match the whole path.
    pub fn ends_with(&self, other: &CloudPath) -> bool {
        if self.file_system != other.file_system {
            return false;
        }
        if other.absolute {
            return self.absolute && self.segments == other.segments;
        }
        self.segments.ends_with(&other.segments)
    }

    /// Append a relative path; an absolute `other` is returned unchanged.
    pub fn resolve(&self, other: &CloudPath) -> CloudPath {
        if other.absolute {
            return other.clone();
        }
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        self.with_segments(self.absolute, segments)
    }

    /// Parse `other` on this path's filesystem and resolve it.
    pub fn resolve_str(&self, other: &str) -> Result<CloudPath, PathError> {
        if other.starts_with(SEPARATOR) {
            return CloudPath::new(self.file_system.clone(), other);
        }
        // `..` in `other` has to pop this path's segments
        let pieces = self
            .segments
            .iter()
            .map(String::as_str)
            .chain(other.split(SEPARATOR).filter(|piece| !piece.is_empty()));
        Self::build(self.file_system.clone(), self.absolute, pieces, other)
    }

    /// Resolve `other` against this path's parent.
    pub fn resolve_sibling(&self, other: &CloudPath) -> CloudPath {
        match self.parent() {
            Some(parent) => parent.resolve(other),
            None => other.clone(),
        }
    }

    /// A direct child of this path.
    pub fn child(&self, name: &str) -> Result<CloudPath, PathError> {
        let name = CloudPath::new(self.file_system.clone(), name)?;
        let mut segments = self.segments.clone();
        segments.extend(name.segments);
        Ok(self.with_segments(self.absolute, segments))
    }

    /// Relative paths are taken to start at the filesystem root.
    pub fn to_absolute_path(&self) -> CloudPath {
        self.with_segments(true, self.segments.clone())
    }

    /// Paths are normalised at construction; this returns a copy.
    pub fn normalize(&self) -> CloudPath {
        self.clone()
    }
}

impl PartialOrd for CloudPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CloudPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments
            .cmp(&other.segments)
            .then_with(|| self.absolute.cmp(&other.absolute))
            .then_with(|| self.file_system.cmp(&other.file_system))
    }
}

impl fmt::Display for CloudPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            f.write_str("/")?;
        }
        f.write_str(&self.segments.join("/"))
    }
}
