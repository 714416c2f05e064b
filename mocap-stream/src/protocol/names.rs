//! Joint name table packets

use super::reader::PayloadReader;
use crate::error::{Error, Result};
use crate::pose::fold_name;
use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Arc;

/// Ordered joint names indexing the rotations of later pose packets
///
/// Immutable snapshot; cloning shares the underlying names, so replacing
/// the current table is a pointer swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTable(Arc<[String]>);

impl NameTable {
    /// Table with no names (state before the first names packet)
    pub fn empty() -> Self {
        Self(Arc::from(Vec::new()))
    }

    /// Build a table from names in index order
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Root joint name (first entry by convention)
    pub fn root(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl Deref for NameTable {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

/// Decode a names payload (bytes after signature and kind)
pub fn decode_names(payload: &[u8]) -> Result<NameTable> {
    let mut r = PayloadReader::new(payload);
    let count = r.read_count()?;

    // Each string takes at least its one-byte length prefix, so a count
    // beyond the remaining bytes is truncated before any allocation.
    if count > r.remaining() {
        return Err(Error::Truncated {
            needed: count,
            available: r.remaining(),
        });
    }

    // Poses are looked up by name ignoring case, so names differing only by
    // case would be ambiguous
    let mut seen = HashSet::with_capacity(count);
    let mut names = Vec::with_capacity(count);
    for _ in 0..count {
        let name = r.read_string()?;
        if !seen.insert(fold_name(&name)) {
            return Err(Error::DuplicateJointName(name));
        }
        names.push(name);
    }
    Ok(NameTable(names.into()))
}
