//! Merging of declared joiners into one index spec plus one residual filter.
//!
//! The index must be computable before any data-dependent filter runs, so a
//! joiner list is valid only when every indexing joiner precedes every
//! filtering joiner. Violations fail at build time, naming both offending
//! positions, rather than silently degrading join performance.

use scoreflow_core::{Result, ScoreFlowError};

use crate::fact::Fact;
use crate::key::IndexKey;

use super::{JoinerKind, JoinerSpec, KeyMapping, PairPredicate};

/// The merged indexing conditions of one join: an ordered list of
/// `(left mapping, comparison, right mapping)` triples.
#[derive(Clone, Debug, Default)]
pub struct IndexSpec {
    triples: Vec<(KeyMapping, JoinerKind, KeyMapping)>,
}

impl IndexSpec {
    /// Returns the merged triples in declaration order.
    pub fn triples(&self) -> &[(KeyMapping, JoinerKind, KeyMapping)] {
        &self.triples
    }

    /// Returns true when no indexing condition was declared.
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Extracts the left-side key of every triple from a left fact.
    pub fn left_keys(&self, fact: &Fact) -> Vec<IndexKey> {
        self.triples
            .iter()
            .map(|(left, _, _)| left.extract(fact))
            .collect()
    }

    /// Extracts the right-side key of every triple from a right fact.
    pub fn right_keys(&self, fact: &Fact) -> Vec<IndexKey> {
        self.triples
            .iter()
            .map(|(_, _, right)| right.extract(fact))
            .collect()
    }
}

/// Result of combing a joiner list: what to index and what to brute-force.
///
/// The index spec alone is sufficient to build a join index; the filter, if
/// present, must additionally be evaluated per candidate pair after index
/// lookup.
#[derive(Clone, Debug)]
pub struct CombedJoiner {
    pub index: IndexSpec,
    pub filter: Option<PairPredicate>,
}

/// Merges an ordered joiner list into `(index spec, merged filter)`.
///
/// Scans left to right, appending indexing triples until the first filtering
/// joiner; from there only filtering joiners are accepted. Filter predicates
/// are conjoined with short-circuiting AND: a single predicate is kept
/// as-is, two become one binary AND, three or more are folded by an explicit
/// loop rather than nested composition, which keeps call depth flat and the
/// merged predicate debuggable.
///
/// # Errors
///
/// [`ScoreFlowError::Build`] when an indexing joiner appears after a
/// filtering joiner, naming both.
///
/// # Example
///
/// ```
/// use scoreflow_scoring::joiner::{comb, equal, filtering};
///
/// #[derive(Debug)]
/// struct A { k: i64 }
/// #[derive(Debug)]
/// struct B { k: i64 }
///
/// let combed = comb(vec![
///     equal(|a: &A| a.k, |b: &B| b.k),
///     filtering(|a: &A, b: &B| a.k + b.k > 0),
/// ])
/// .unwrap();
/// assert_eq!(combed.index.triples().len(), 1);
/// assert!(combed.filter.is_some());
///
/// // Indexing after filtering is rejected at build time.
/// assert!(comb(vec![
///     filtering(|a: &A, b: &B| a.k != b.k),
///     equal(|a: &A| a.k, |b: &B| b.k),
/// ])
/// .is_err());
/// ```
pub fn comb(joiners: Vec<JoinerSpec>) -> Result<CombedJoiner> {
    let mut index = IndexSpec::default();
    let mut filters: Vec<PairPredicate> = Vec::new();
    let mut first_filter: Option<(usize, String)> = None;

    for (position, joiner) in joiners.into_iter().enumerate() {
        match joiner {
            JoinerSpec::Index { kind, left, right } => {
                if let Some((filter_position, filter_description)) = &first_filter {
                    let offender = JoinerSpec::Index { kind, left, right };
                    return Err(ScoreFlowError::Build(format!(
                        "Indexing joiner {} at position {} cannot follow filtering joiner {} \
                         at position {}; the index must be computable before any \
                         data-dependent filter runs. Reorder the joiners.",
                        offender.describe(),
                        position,
                        filter_description,
                        filter_position
                    )));
                }
                index.triples.push((left, kind, right));
            }
            JoinerSpec::Filter(predicate) => {
                if first_filter.is_none() {
                    first_filter = Some((position, JoinerSpec::Filter(predicate.clone()).describe()));
                }
                filters.push(predicate);
            }
        }
    }

    let filter = merge_filters(filters);
    Ok(CombedJoiner { index, filter })
}

fn merge_filters(filters: Vec<PairPredicate>) -> Option<PairPredicate> {
    let mut remaining = filters.into_iter();
    let first = remaining.next()?;
    let Some(second) = remaining.next() else {
        return Some(first);
    };
    match remaining.next() {
        None => Some(PairPredicate::from_raw(std::sync::Arc::new(
            move |a: &Fact, b: &Fact| first.test(a, b) && second.test(a, b),
        ))),
        Some(third) => {
            let mut all = vec![first, second, third];
            all.extend(remaining);
            Some(PairPredicate::from_raw(std::sync::Arc::new(
                move |a: &Fact, b: &Fact| {
                    for predicate in &all {
                        if !predicate.test(a, b) {
                            return false;
                        }
                    }
                    true
                },
            )))
        }
    }
}
