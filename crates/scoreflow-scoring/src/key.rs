//! Index keys extracted from facts by joiner and group-by mappings.
//!
//! Join indexes and group tables need keys that are hashable *and* ordered
//! (comparison joiners range-scan a sorted index), so mappings produce a
//! closed key union instead of an opaque boxed value.

use std::sync::Arc;

/// A key value produced by a key mapping.
///
/// Composite keys arise when several consecutive equality joiners are merged
/// into one index stage.
///
/// Ordering between different variants is the derived variant order; it only
/// matters that it is total and stable, because one index stage always holds
/// keys of a single variant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKey {
    /// The absent key (e.g. an unassigned planning variable).
    None,
    /// The unit key, used when a mapping intentionally ignores the fact.
    Unit,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Str(Arc<str>),
    /// A merged key from consecutive equality mappings.
    Composite(Arc<[IndexKey]>),
}

impl IndexKey {
    /// Builds a composite key from per-mapping parts.
    pub fn composite(parts: Vec<IndexKey>) -> Self {
        IndexKey::Composite(parts.into())
    }
}

impl From<()> for IndexKey {
    fn from(_: ()) -> Self {
        IndexKey::Unit
    }
}

impl From<bool> for IndexKey {
    fn from(v: bool) -> Self {
        IndexKey::Bool(v)
    }
}

impl From<i32> for IndexKey {
    fn from(v: i32) -> Self {
        IndexKey::Int(v as i64)
    }
}

impl From<i64> for IndexKey {
    fn from(v: i64) -> Self {
        IndexKey::Int(v)
    }
}

impl From<u32> for IndexKey {
    fn from(v: u32) -> Self {
        IndexKey::UInt(v as u64)
    }
}

impl From<u64> for IndexKey {
    fn from(v: u64) -> Self {
        IndexKey::UInt(v)
    }
}

impl From<usize> for IndexKey {
    fn from(v: usize) -> Self {
        IndexKey::UInt(v as u64)
    }
}

impl From<&str> for IndexKey {
    fn from(v: &str) -> Self {
        IndexKey::Str(v.into())
    }
}

impl From<String> for IndexKey {
    fn from(v: String) -> Self {
        IndexKey::Str(v.into())
    }
}

impl<T: Into<IndexKey>> From<Option<T>> for IndexKey {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => IndexKey::None,
        }
    }
}

impl<A: Into<IndexKey>, B: Into<IndexKey>> From<(A, B)> for IndexKey {
    fn from((a, b): (A, B)) -> Self {
        IndexKey::composite(vec![a.into(), b.into()])
    }
}

impl<A: Into<IndexKey>, B: Into<IndexKey>, C: Into<IndexKey>> From<(A, B, C)> for IndexKey {
    fn from((a, b, c): (A, B, C)) -> Self {
        IndexKey::composite(vec![a.into(), b.into(), c.into()])
    }
}
