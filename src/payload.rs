use std::fmt;
use std::ops::Deref;

use crate::error::{Result, TstError};

/// How [`TernaryTree::insert`](crate::TernaryTree::insert) keeps the key bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StoreMode {
    /// Duplicate the key; the tree owns the copy.
    Copy,
    /// Keep a reference to the caller's bytes.
    #[default]
    Reference,
}

/// Value stored at a terminal node.
///
/// `Owned` bytes belong to the tree and are released when the entry is
/// removed or the tree is cleared. `Borrowed` bytes belong to the caller, who
/// must keep them alive for `'a`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Payload<'a> {
    Owned(Box<[u8]>),
    Borrowed(&'a [u8]),
}

impl<'a> Payload<'a> {
    /// Build the payload for `key`, copying it when `mode` asks for it.
    pub(crate) fn try_new(key: &'a [u8], mode: StoreMode) -> Result<Self> {
        match mode {
            StoreMode::Copy => Self::try_copy(key),
            StoreMode::Reference => Ok(Payload::Borrowed(key)),
        }
    }

    pub(crate) fn try_copy(key: &[u8]) -> Result<Self> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(key.len())
            .map_err(|e| TstError::alloc("payload copy", e))?;
        buf.extend_from_slice(key);
        Ok(Payload::Owned(buf.into_boxed_slice()))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Owned(b) => b,
            Payload::Borrowed(b) => b,
        }
    }

    /// Whether the tree owns these bytes.
    #[inline]
    pub fn is_owned(&self) -> bool {
        matches!(self, Payload::Owned(_))
    }

    /// Heap bytes held by the tree for this payload.
    pub(crate) fn heap_size(&self) -> usize {
        match self {
            Payload::Owned(b) => b.len(),
            Payload::Borrowed(_) => 0,
        }
    }

    pub fn into_vec(self) -> Vec<u8> {
        match self {
            Payload::Owned(b) => b.into_vec(),
            Payload::Borrowed(b) => b.to_vec(),
        }
    }
}

impl Deref for Payload<'_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for Payload<'_> {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for Payload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = if self.is_owned() { "Owned" } else { "Borrowed" };
        write!(f, "{tag}({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}
