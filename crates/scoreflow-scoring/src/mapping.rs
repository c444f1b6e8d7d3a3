//! Tuple-level mappings used by group-by keys, collectors and predicates.
//!
//! Like [`KeyMapping`](crate::joiner::KeyMapping), every mapping carries an
//! id assigned at construction; clones share the id, so descriptors built
//! from the same mapping compare equal without comparing closures.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::key::IndexKey;
use crate::tuple::Tuple;

static NEXT_MAPPING_ID: AtomicU64 = AtomicU64::new(1);

fn next_mapping_id() -> u64 {
    NEXT_MAPPING_ID.fetch_add(1, Ordering::Relaxed)
}

fn expect_fact<'t, A: 'static>(tuple: &'t Tuple, role: &str) -> &'t A {
    match tuple.fact(0).and_then(|fact| fact.downcast_ref::<A>()) {
        Some(value) => value,
        None => panic!(
            "Impossible state: {role} mapping for {} applied to tuple {:?}",
            std::any::type_name::<A>(),
            tuple
        ),
    }
}

/// Extracts an [`IndexKey`] from a tuple (group-by keys, multimap keys).
#[derive(Clone)]
pub struct TupleKeyMapping {
    id: u64,
    f: Arc<dyn Fn(&Tuple) -> IndexKey + Send + Sync>,
}

impl TupleKeyMapping {
    /// Wraps a typed key function over the first fact of the tuple.
    pub fn of<A, K, F>(f: F) -> Self
    where
        A: 'static,
        K: Into<IndexKey>,
        F: Fn(&A) -> K + Send + Sync + 'static,
    {
        Self {
            id: next_mapping_id(),
            f: Arc::new(move |tuple| f(expect_fact::<A>(tuple, "key")).into()),
        }
    }

    #[inline]
    pub fn extract(&self, tuple: &Tuple) -> IndexKey {
        (self.f)(tuple)
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for TupleKeyMapping {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TupleKeyMapping {}

impl fmt::Debug for TupleKeyMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TupleKeyMapping(#{})", self.id)
    }
}

/// Extracts an `i64` measure from a tuple (sum, average, min, max).
#[derive(Clone)]
pub struct TupleValueMapping {
    id: u64,
    f: Arc<dyn Fn(&Tuple) -> i64 + Send + Sync>,
}

impl TupleValueMapping {
    /// Wraps a typed value function over the first fact of the tuple.
    pub fn of<A, F>(f: F) -> Self
    where
        A: 'static,
        F: Fn(&A) -> i64 + Send + Sync + 'static,
    {
        Self {
            id: next_mapping_id(),
            f: Arc::new(move |tuple| f(expect_fact::<A>(tuple, "value"))),
        }
    }

    /// Wraps a typed value function over the first two facts of the tuple.
    pub fn of_pair<A, B, F>(f: F) -> Self
    where
        A: 'static,
        B: 'static,
        F: Fn(&A, &B) -> i64 + Send + Sync + 'static,
    {
        Self {
            id: next_mapping_id(),
            f: Arc::new(move |tuple| {
                match (
                    tuple.fact(0).and_then(|fact| fact.downcast_ref::<A>()),
                    tuple.fact(1).and_then(|fact| fact.downcast_ref::<B>()),
                ) {
                    (Some(a), Some(b)) => f(a, b),
                    _ => panic!(
                        "Impossible state: pair value mapping for ({}, {}) applied to tuple {:?}",
                        std::any::type_name::<A>(),
                        std::any::type_name::<B>(),
                        tuple
                    ),
                }
            }),
        }
    }

    /// Wraps a value function over an aggregate row emitted by a group node.
    pub fn of_group<F>(f: F) -> Self
    where
        F: Fn(&IndexKey, &crate::collector::GroupResult) -> i64 + Send + Sync + 'static,
    {
        Self {
            id: next_mapping_id(),
            f: Arc::new(move |tuple| match tuple.group() {
                Some(row) => f(&row.key, &row.result),
                None => panic!(
                    "Impossible state: group value mapping applied to non-group tuple {:?}",
                    tuple
                ),
            }),
        }
    }

    #[inline]
    pub fn extract(&self, tuple: &Tuple) -> i64 {
        (self.f)(tuple)
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for TupleValueMapping {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TupleValueMapping {}

impl fmt::Debug for TupleValueMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TupleValueMapping(#{})", self.id)
    }
}

/// A boolean predicate over a whole tuple, used by filter nodes.
#[derive(Clone)]
pub struct TuplePredicate {
    id: u64,
    f: Arc<dyn Fn(&Tuple) -> bool + Send + Sync>,
}

impl TuplePredicate {
    /// Wraps a typed predicate over the first fact of the tuple.
    pub fn of<A, F>(f: F) -> Self
    where
        A: 'static,
        F: Fn(&A) -> bool + Send + Sync + 'static,
    {
        Self {
            id: next_mapping_id(),
            f: Arc::new(move |tuple| f(expect_fact::<A>(tuple, "predicate"))),
        }
    }

    /// Wraps a typed predicate over the first two facts of the tuple.
    pub fn of_pair<A, B, F>(f: F) -> Self
    where
        A: 'static,
        B: 'static,
        F: Fn(&A, &B) -> bool + Send + Sync + 'static,
    {
        Self {
            id: next_mapping_id(),
            f: Arc::new(move |tuple| {
                let a = match tuple.fact(0).and_then(|fact| fact.downcast_ref::<A>()) {
                    Some(value) => value,
                    None => panic!(
                        "Impossible state: pair predicate for {} applied to tuple {:?}",
                        std::any::type_name::<A>(),
                        tuple
                    ),
                };
                let b = match tuple.fact(1).and_then(|fact| fact.downcast_ref::<B>()) {
                    Some(value) => value,
                    None => panic!(
                        "Impossible state: pair predicate for {} applied to tuple {:?}",
                        std::any::type_name::<B>(),
                        tuple
                    ),
                };
                f(a, b)
            }),
        }
    }

    #[inline]
    pub fn test(&self, tuple: &Tuple) -> bool {
        (self.f)(tuple)
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for TuplePredicate {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TuplePredicate {}

impl fmt::Debug for TuplePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TuplePredicate(#{})", self.id)
    }
}
