// Undo-capable aggregation primitives for group nodes.
//
// Every collector is stateless: all per-group state lives in the
// `CollectorState` it supplies. `accumulate` returns an explicit
// `AccumDelta` describing what was added; the group node stores the delta
// per input tuple and hands it back to `undo` when that tuple retracts.
// This replaces the undo-closure protocol of similar engines with a plain
// reversible value, so no captured mutable state crosses node boundaries.
//
// Collectors used by the engine only ever undo a delta that was produced by
// an earlier accumulate on the same state and not yet undone; deltas for
// different tuples are independent, so undo order does not matter.

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::key::IndexKey;
use crate::mapping::{TupleKeyMapping, TupleValueMapping};
use crate::tuple::Tuple;

static NEXT_COMBINE_ID: AtomicU64 = AtomicU64::new(1);

/// A finished aggregation result.
///
/// `Float` only ever appears at finish time (average and compositions that
/// divide); all incremental state is integral.
#[derive(Clone, Debug, PartialEq)]
pub enum GroupResult {
    /// No value (e.g. min of an empty group, observable only transiently).
    None,
    Int(i64),
    Float(f64),
    /// Multimap result: key to the distinct values grouped under it.
    Map(BTreeMap<IndexKey, Vec<IndexKey>>),
}

impl GroupResult {
    /// Returns the integral value, if this result is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            GroupResult::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float value, widening an integral result.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            GroupResult::Int(v) => Some(*v as f64),
            GroupResult::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the multimap result, if this result is one.
    pub fn as_map(&self) -> Option<&BTreeMap<IndexKey, Vec<IndexKey>>> {
        match self {
            GroupResult::Map(map) => Some(map),
            _ => None,
        }
    }
}

/// Combines the two finished results of a composed collector.
///
/// Carries a construction-time id so composed collector descriptors have
/// structural equality.
#[derive(Clone)]
pub struct CombineFn {
    id: u64,
    f: Arc<dyn Fn(&GroupResult, &GroupResult) -> GroupResult + Send + Sync>,
}

impl CombineFn {
    /// Wraps a combine function.
    pub fn of<F>(f: F) -> Self
    where
        F: Fn(&GroupResult, &GroupResult) -> GroupResult + Send + Sync + 'static,
    {
        Self {
            id: NEXT_COMBINE_ID.fetch_add(1, Ordering::Relaxed),
            f: Arc::new(f),
        }
    }

    #[inline]
    pub fn apply(&self, first: &GroupResult, second: &GroupResult) -> GroupResult {
        (self.f)(first, second)
    }
}

impl PartialEq for CombineFn {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CombineFn {}

impl fmt::Debug for CombineFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CombineFn(#{})", self.id)
    }
}

/// An undo-capable aggregation descriptor.
///
/// One variant per aggregation kind; `Compose` runs two child collectors in
/// lockstep inside one paired state and combines their finished results.
///
/// Two collectors are equal iff their captured mappings (by construction
/// id) and, for compositions, their sub-collectors are equal. Building the
/// same constraint twice from shared mappings therefore produces
/// structurally equal, de-duplicable descriptors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TupleCollector {
    /// Counts accumulated tuples.
    Count,
    /// Sums an `i64` measure.
    Sum(TupleValueMapping),
    /// Averages an `i64` measure. The division happens only at finish time;
    /// the state tracks sum and count exactly.
    Average(TupleValueMapping),
    /// Minimum of an `i64` measure, tracked in an ordered occurrence map so
    /// retracting the current minimum reveals the next one.
    Min(TupleValueMapping),
    /// Maximum of an `i64` measure.
    Max(TupleValueMapping),
    /// Groups values into `key -> set of values`. A key whose value set
    /// becomes empty is removed from the map entirely.
    ToMultiMap {
        key: TupleKeyMapping,
        value: TupleKeyMapping,
    },
    /// Runs both child collectors in lockstep and combines their results.
    Compose {
        first: Box<TupleCollector>,
        second: Box<TupleCollector>,
        combine: CombineFn,
    },
}

/// Per-group mutable state supplied by a collector.
#[derive(Clone, Debug)]
pub enum CollectorState {
    Count(u64),
    Sum(i64),
    Average { sum: i64, count: u64 },
    /// Value -> occurrence count, for min/max.
    Ordered(BTreeMap<i64, u64>),
    /// Key -> (value -> occurrence count).
    MultiMap(BTreeMap<IndexKey, BTreeMap<IndexKey, u64>>),
    Pair(Box<CollectorState>, Box<CollectorState>),
}

/// Reversible description of one accumulation, returned by
/// [`TupleCollector::accumulate`] and consumed by [`TupleCollector::undo`].
#[derive(Clone, Debug)]
pub enum AccumDelta {
    Counted,
    Added(i64),
    Mapped { key: IndexKey, value: IndexKey },
    Pair(Box<AccumDelta>, Box<AccumDelta>),
}

impl TupleCollector {
    /// Supplies a fresh empty state for one group.
    pub fn new_state(&self) -> CollectorState {
        match self {
            TupleCollector::Count => CollectorState::Count(0),
            TupleCollector::Sum(_) => CollectorState::Sum(0),
            TupleCollector::Average(_) => CollectorState::Average { sum: 0, count: 0 },
            TupleCollector::Min(_) | TupleCollector::Max(_) => {
                CollectorState::Ordered(BTreeMap::new())
            }
            TupleCollector::ToMultiMap { .. } => CollectorState::MultiMap(BTreeMap::new()),
            TupleCollector::Compose { first, second, .. } => CollectorState::Pair(
                Box::new(first.new_state()),
                Box::new(second.new_state()),
            ),
        }
    }

    /// Accumulates one tuple into `state`, returning the delta that undoes
    /// exactly this accumulation.
    pub fn accumulate(&self, state: &mut CollectorState, tuple: &Tuple) -> AccumDelta {
        match (self, state) {
            (TupleCollector::Count, CollectorState::Count(count)) => {
                *count += 1;
                AccumDelta::Counted
            }
            (TupleCollector::Sum(mapping), CollectorState::Sum(sum)) => {
                let value = mapping.extract(tuple);
                *sum += value;
                AccumDelta::Added(value)
            }
            (TupleCollector::Average(mapping), CollectorState::Average { sum, count }) => {
                let value = mapping.extract(tuple);
                *sum += value;
                *count += 1;
                AccumDelta::Added(value)
            }
            (
                TupleCollector::Min(mapping) | TupleCollector::Max(mapping),
                CollectorState::Ordered(occurrences),
            ) => {
                let value = mapping.extract(tuple);
                *occurrences.entry(value).or_insert(0) += 1;
                AccumDelta::Added(value)
            }
            (TupleCollector::ToMultiMap { key, value }, CollectorState::MultiMap(map)) => {
                let k = key.extract(tuple);
                let v = value.extract(tuple);
                *map.entry(k.clone()).or_default().entry(v.clone()).or_insert(0) += 1;
                AccumDelta::Mapped { key: k, value: v }
            }
            (
                TupleCollector::Compose { first, second, .. },
                CollectorState::Pair(first_state, second_state),
            ) => {
                let first_delta = first.accumulate(first_state, tuple);
                let second_delta = second.accumulate(second_state, tuple);
                AccumDelta::Pair(Box::new(first_delta), Box::new(second_delta))
            }
            (collector, state) => panic!(
                "Impossible state: collector {collector:?} accumulating into state {state:?}"
            ),
        }
    }

    /// Reverses one earlier accumulation, restoring `state` to exactly what
    /// it was before that accumulate call.
    pub fn undo(&self, state: &mut CollectorState, delta: &AccumDelta) {
        match (self, state, delta) {
            (TupleCollector::Count, CollectorState::Count(count), AccumDelta::Counted) => {
                *count -= 1;
            }
            (TupleCollector::Sum(_), CollectorState::Sum(sum), AccumDelta::Added(value)) => {
                *sum -= value;
            }
            (
                TupleCollector::Average(_),
                CollectorState::Average { sum, count },
                AccumDelta::Added(value),
            ) => {
                *sum -= value;
                *count -= 1;
            }
            (
                TupleCollector::Min(_) | TupleCollector::Max(_),
                CollectorState::Ordered(occurrences),
                AccumDelta::Added(value),
            ) => {
                remove_occurrence(occurrences, value);
            }
            (
                TupleCollector::ToMultiMap { .. },
                CollectorState::MultiMap(map),
                AccumDelta::Mapped { key, value },
            ) => {
                let remove_key = match map.get_mut(key) {
                    Some(values) => {
                        remove_occurrence(values, value);
                        values.is_empty()
                    }
                    None => panic!(
                        "Impossible state: undoing multimap delta for absent key {key:?}"
                    ),
                };
                if remove_key {
                    map.remove(key);
                }
            }
            (
                TupleCollector::Compose { first, second, .. },
                CollectorState::Pair(first_state, second_state),
                AccumDelta::Pair(first_delta, second_delta),
            ) => {
                first.undo(first_state, first_delta);
                second.undo(second_state, second_delta);
            }
            (collector, state, delta) => panic!(
                "Impossible state: collector {collector:?} undoing {delta:?} on state {state:?}"
            ),
        }
    }

    /// Computes the finished result from the current state.
    pub fn finish(&self, state: &CollectorState) -> GroupResult {
        match (self, state) {
            (TupleCollector::Count, CollectorState::Count(count)) => {
                GroupResult::Int(*count as i64)
            }
            (TupleCollector::Sum(_), CollectorState::Sum(sum)) => GroupResult::Int(*sum),
            (TupleCollector::Average(_), CollectorState::Average { sum, count }) => {
                if *count == 0 {
                    GroupResult::None
                } else {
                    GroupResult::Float(*sum as f64 / *count as f64)
                }
            }
            (TupleCollector::Min(_), CollectorState::Ordered(occurrences)) => occurrences
                .first_key_value()
                .map(|(value, _)| GroupResult::Int(*value))
                .unwrap_or(GroupResult::None),
            (TupleCollector::Max(_), CollectorState::Ordered(occurrences)) => occurrences
                .last_key_value()
                .map(|(value, _)| GroupResult::Int(*value))
                .unwrap_or(GroupResult::None),
            (TupleCollector::ToMultiMap { .. }, CollectorState::MultiMap(map)) => {
                let materialized = map
                    .iter()
                    .map(|(key, values)| (key.clone(), values.keys().cloned().collect()))
                    .collect();
                GroupResult::Map(materialized)
            }
            (
                TupleCollector::Compose { first, second, combine },
                CollectorState::Pair(first_state, second_state),
            ) => combine.apply(&first.finish(first_state), &second.finish(second_state)),
            (collector, state) => panic!(
                "Impossible state: collector {collector:?} finishing state {state:?}"
            ),
        }
    }
}

fn remove_occurrence<K: Ord + fmt::Debug>(occurrences: &mut BTreeMap<K, u64>, key: &K) {
    match occurrences.get_mut(key) {
        Some(count) if *count > 1 => *count -= 1,
        Some(_) => {
            occurrences.remove(key);
        }
        None => panic!("Impossible state: undoing absent occurrence {key:?}"),
    }
}

/// Creates a collector counting accumulated tuples.
pub fn count() -> TupleCollector {
    TupleCollector::Count
}

/// Creates a collector summing an `i64` measure.
pub fn sum<A, F>(mapping: F) -> TupleCollector
where
    A: 'static,
    F: Fn(&A) -> i64 + Send + Sync + 'static,
{
    TupleCollector::Sum(TupleValueMapping::of(mapping))
}

/// Creates a collector averaging an `i64` measure.
///
/// The division happens only in `finish`; incremental state is exact.
pub fn average<A, F>(mapping: F) -> TupleCollector
where
    A: 'static,
    F: Fn(&A) -> i64 + Send + Sync + 'static,
{
    TupleCollector::Average(TupleValueMapping::of(mapping))
}

/// Creates a collector tracking the minimum of an `i64` measure.
pub fn min<A, F>(mapping: F) -> TupleCollector
where
    A: 'static,
    F: Fn(&A) -> i64 + Send + Sync + 'static,
{
    TupleCollector::Min(TupleValueMapping::of(mapping))
}

/// Creates a collector tracking the maximum of an `i64` measure.
pub fn max<A, F>(mapping: F) -> TupleCollector
where
    A: 'static,
    F: Fn(&A) -> i64 + Send + Sync + 'static,
{
    TupleCollector::Max(TupleValueMapping::of(mapping))
}

/// Creates a collector grouping values into `key -> set of values`.
pub fn to_multimap<A, K, V, Fk, Fv>(key: Fk, value: Fv) -> TupleCollector
where
    A: 'static,
    K: Into<IndexKey>,
    V: Into<IndexKey>,
    Fk: Fn(&A) -> K + Send + Sync + 'static,
    Fv: Fn(&A) -> V + Send + Sync + 'static,
{
    TupleCollector::ToMultiMap {
        key: TupleKeyMapping::of(key),
        value: TupleKeyMapping::of(value),
    }
}

/// Composes two collectors, combining their finished results.
///
/// Both children accumulate and undo in lockstep inside one paired state,
/// so the composition behaves identically to running the children
/// independently over the same tuple stream.
pub fn compose<F>(first: TupleCollector, second: TupleCollector, combine: F) -> TupleCollector
where
    F: Fn(&GroupResult, &GroupResult) -> GroupResult + Send + Sync + 'static,
{
    TupleCollector::Compose {
        first: Box::new(first),
        second: Box::new(second),
        combine: CombineFn::of(combine),
    }
}
