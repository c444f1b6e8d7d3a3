// Joiner conditions for constraint stream joins.
//
// A joiner is either *indexing* (an equality or ordering condition between a
// key extracted from each side, usable to build a lookup index) or
// *filtering* (an arbitrary predicate over a candidate pair, evaluated by
// brute force after index lookup).
//
// # Example
//
// ```
// use scoreflow_scoring::joiner::{equal, filtering};
// use scoreflow_scoring::Fact;
//
// #[derive(Debug)]
// struct Employee { id: u64 }
// #[derive(Debug)]
// struct Shift { employee_id: u64, day: u32 }
//
// let by_id = equal(|e: &Employee| e.id, |s: &Shift| s.employee_id);
// let weekday_only = filtering(|_e: &Employee, s: &Shift| s.day < 5);
// assert!(by_id.is_indexing());
// assert!(!weekday_only.is_indexing());
// ```

mod comber;

pub use comber::{comb, CombedJoiner, IndexSpec};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::fact::Fact;
use crate::key::IndexKey;

static NEXT_MAPPING_ID: AtomicU64 = AtomicU64::new(1);

fn next_mapping_id() -> u64 {
    NEXT_MAPPING_ID.fetch_add(1, Ordering::Relaxed)
}

/// Comparison applied between the left and right key of an indexing joiner.
///
/// `Equal` joiners build hash stages; the ordering kinds build sorted stages
/// probed with range scans.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JoinerKind {
    Equal,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl JoinerKind {
    /// Evaluates `left OP right` on extracted keys.
    pub fn test(self, left: &IndexKey, right: &IndexKey) -> bool {
        match self {
            JoinerKind::Equal => left == right,
            JoinerKind::LessThan => left < right,
            JoinerKind::LessThanOrEqual => left <= right,
            JoinerKind::GreaterThan => left > right,
            JoinerKind::GreaterThanOrEqual => left >= right,
        }
    }
}

impl fmt::Display for JoinerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JoinerKind::Equal => "equal",
            JoinerKind::LessThan => "lessThan",
            JoinerKind::LessThanOrEqual => "lessThanOrEqual",
            JoinerKind::GreaterThan => "greaterThan",
            JoinerKind::GreaterThanOrEqual => "greaterThanOrEqual",
        };
        write!(f, "{label}")
    }
}

/// A key-extraction mapping over one fact.
///
/// Mappings carry an id assigned at construction; two mappings are equal iff
/// they share that id (cloning preserves it). This gives joiner and
/// collector descriptors structural equality without comparing closures.
#[derive(Clone)]
pub struct KeyMapping {
    id: u64,
    f: Arc<dyn Fn(&Fact) -> IndexKey + Send + Sync>,
}

impl KeyMapping {
    /// Wraps a typed key function over facts of type `A`.
    pub fn of<A, K, F>(f: F) -> Self
    where
        A: 'static,
        K: Into<IndexKey>,
        F: Fn(&A) -> K + Send + Sync + 'static,
    {
        Self {
            id: next_mapping_id(),
            f: Arc::new(move |fact| match fact.downcast_ref::<A>() {
                Some(value) => f(value).into(),
                None => panic!(
                    "Impossible state: key mapping for {} applied to fact {:?}",
                    std::any::type_name::<A>(),
                    fact
                ),
            }),
        }
    }

    /// Extracts the key from a fact.
    #[inline]
    pub fn extract(&self, fact: &Fact) -> IndexKey {
        (self.f)(fact)
    }

    /// Returns the construction-time id.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for KeyMapping {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for KeyMapping {}

impl fmt::Debug for KeyMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMapping(#{})", self.id)
    }
}

/// A brute-force predicate over one candidate (left fact, right fact) pair.
#[derive(Clone)]
pub struct PairPredicate {
    id: u64,
    f: Arc<dyn Fn(&Fact, &Fact) -> bool + Send + Sync>,
}

impl PairPredicate {
    /// Wraps a typed pair predicate.
    pub fn of<A, B, F>(f: F) -> Self
    where
        A: 'static,
        B: 'static,
        F: Fn(&A, &B) -> bool + Send + Sync + 'static,
    {
        Self {
            id: next_mapping_id(),
            f: Arc::new(move |left, right| {
                match (left.downcast_ref::<A>(), right.downcast_ref::<B>()) {
                    (Some(a), Some(b)) => f(a, b),
                    _ => panic!(
                        "Impossible state: pair predicate for ({}, {}) applied to ({:?}, {:?})",
                        std::any::type_name::<A>(),
                        std::any::type_name::<B>(),
                        left,
                        right
                    ),
                }
            }),
        }
    }

    pub(crate) fn from_raw(f: Arc<dyn Fn(&Fact, &Fact) -> bool + Send + Sync>) -> Self {
        Self {
            id: next_mapping_id(),
            f,
        }
    }

    /// Evaluates the predicate on a candidate pair.
    #[inline]
    pub fn test(&self, left: &Fact, right: &Fact) -> bool {
        (self.f)(left, right)
    }

    /// Returns the construction-time id.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for PairPredicate {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PairPredicate {}

impl fmt::Debug for PairPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PairPredicate(#{})", self.id)
    }
}

/// One declared join condition, indexing or filtering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinerSpec {
    /// An indexable condition: `kind.test(left.extract(a), right.extract(b))`.
    Index {
        kind: JoinerKind,
        left: KeyMapping,
        right: KeyMapping,
    },
    /// A brute-force condition, evaluated per candidate pair after lookup.
    Filter(PairPredicate),
}

impl JoinerSpec {
    /// Returns true for indexing joiners.
    pub fn is_indexing(&self) -> bool {
        matches!(self, JoinerSpec::Index { .. })
    }

    /// Short description used in build-error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            JoinerSpec::Index { kind, left, right } => {
                format!("{kind}({left:?}, {right:?})")
            }
            JoinerSpec::Filter(p) => format!("filtering({p:?})"),
        }
    }
}

/// Creates an indexing joiner matching when both keys are equal.
pub fn equal<A, B, K, Fa, Fb>(left: Fa, right: Fb) -> JoinerSpec
where
    A: 'static,
    B: 'static,
    K: Into<IndexKey>,
    Fa: Fn(&A) -> K + Send + Sync + 'static,
    Fb: Fn(&B) -> K + Send + Sync + 'static,
{
    JoinerSpec::Index {
        kind: JoinerKind::Equal,
        left: KeyMapping::of(left),
        right: KeyMapping::of(right),
    }
}

/// Creates an indexing joiner matching when the left key is strictly less
/// than the right key.
pub fn less_than<A, B, K, Fa, Fb>(left: Fa, right: Fb) -> JoinerSpec
where
    A: 'static,
    B: 'static,
    K: Into<IndexKey>,
    Fa: Fn(&A) -> K + Send + Sync + 'static,
    Fb: Fn(&B) -> K + Send + Sync + 'static,
{
    comparison(JoinerKind::LessThan, left, right)
}

/// Creates an indexing joiner matching when the left key is less than or
/// equal to the right key.
pub fn less_than_or_equal<A, B, K, Fa, Fb>(left: Fa, right: Fb) -> JoinerSpec
where
    A: 'static,
    B: 'static,
    K: Into<IndexKey>,
    Fa: Fn(&A) -> K + Send + Sync + 'static,
    Fb: Fn(&B) -> K + Send + Sync + 'static,
{
    comparison(JoinerKind::LessThanOrEqual, left, right)
}

/// Creates an indexing joiner matching when the left key is strictly greater
/// than the right key.
pub fn greater_than<A, B, K, Fa, Fb>(left: Fa, right: Fb) -> JoinerSpec
where
    A: 'static,
    B: 'static,
    K: Into<IndexKey>,
    Fa: Fn(&A) -> K + Send + Sync + 'static,
    Fb: Fn(&B) -> K + Send + Sync + 'static,
{
    comparison(JoinerKind::GreaterThan, left, right)
}

/// Creates an indexing joiner matching when the left key is greater than or
/// equal to the right key.
pub fn greater_than_or_equal<A, B, K, Fa, Fb>(left: Fa, right: Fb) -> JoinerSpec
where
    A: 'static,
    B: 'static,
    K: Into<IndexKey>,
    Fa: Fn(&A) -> K + Send + Sync + 'static,
    Fb: Fn(&B) -> K + Send + Sync + 'static,
{
    comparison(JoinerKind::GreaterThanOrEqual, left, right)
}

fn comparison<A, B, K, Fa, Fb>(kind: JoinerKind, left: Fa, right: Fb) -> JoinerSpec
where
    A: 'static,
    B: 'static,
    K: Into<IndexKey>,
    Fa: Fn(&A) -> K + Send + Sync + 'static,
    Fb: Fn(&B) -> K + Send + Sync + 'static,
{
    JoinerSpec::Index {
        kind,
        left: KeyMapping::of(left),
        right: KeyMapping::of(right),
    }
}

/// Creates a filtering joiner from an arbitrary pair predicate.
///
/// Filtering joiners must come after every indexing joiner in one `join`
/// call; declaring an indexing joiner after a filtering one is a build-time
/// error (see [`comb`]).
pub fn filtering<A, B, F>(predicate: F) -> JoinerSpec
where
    A: 'static,
    B: 'static,
    F: Fn(&A, &B) -> bool + Send + Sync + 'static,
{
    JoinerSpec::Filter(PairPredicate::of(predicate))
}
