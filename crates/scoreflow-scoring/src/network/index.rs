//! Join indexes.
//!
//! An index is a chain of stages derived from the merged index spec:
//! consecutive equality triples collapse into one hash stage with a
//! composite key, while every comparison triple gets its own sorted stage
//! probed with a range scan. The chain bottoms out in leaves holding tuple
//! ids in insertion order, which keeps probe results deterministic.
//!
//! Example: `equal + equal + lessThan` becomes one hash stage (composite
//! key of both equals) followed by one sorted stage.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use crate::joiner::{IndexSpec, JoinerKind};
use crate::key::IndexKey;
use crate::tuple::TupleId;

/// Which side of the join the probing tuple comes from.
///
/// The stored side is the opposite one; comparison ranges flip direction
/// accordingly, because an ordering joiner tests `left OP right`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ProbeSide {
    Left,
    Right,
}

/// One stage of the index chain.
#[derive(Clone, Debug, PartialEq, Eq)]
enum StageKind {
    /// Exact lookup; covers one or more merged equality triples.
    Hash,
    /// Range scan for one ordering triple.
    Sorted(JoinerKind),
}

/// Stage layout computed once per join node from its index spec.
#[derive(Clone, Debug)]
pub(crate) struct IndexStages {
    // (stage kind, range of triple positions covered by the stage)
    stages: Vec<(StageKind, std::ops::Range<usize>)>,
}

impl IndexStages {
    pub(crate) fn of(spec: &IndexSpec) -> Self {
        let mut stages = Vec::new();
        let mut equals_start: Option<usize> = None;
        for (position, (_, kind, _)) in spec.triples().iter().enumerate() {
            match kind {
                JoinerKind::Equal => {
                    if equals_start.is_none() {
                        equals_start = Some(position);
                    }
                }
                ordering => {
                    if let Some(start) = equals_start.take() {
                        stages.push((StageKind::Hash, start..position));
                    }
                    stages.push((StageKind::Sorted(*ordering), position..position + 1));
                }
            }
        }
        if let Some(start) = equals_start {
            stages.push((StageKind::Hash, start..spec.triples().len()));
        }
        Self { stages }
    }

    /// Folds per-triple keys into per-stage keys.
    pub(crate) fn stage_keys(&self, triple_keys: &[IndexKey]) -> Vec<IndexKey> {
        self.stages
            .iter()
            .map(|(_, range)| {
                if range.len() == 1 {
                    triple_keys[range.start].clone()
                } else {
                    IndexKey::composite(triple_keys[range.clone()].to_vec())
                }
            })
            .collect()
    }

    fn kinds(&self) -> impl Iterator<Item = &StageKind> {
        self.stages.iter().map(|(kind, _)| kind)
    }

    fn depth(&self) -> usize {
        self.stages.len()
    }
}

#[derive(Debug)]
enum IndexTree {
    Leaf(Vec<TupleId>),
    Hash(HashMap<IndexKey, IndexTree>),
    Sorted(BTreeMap<IndexKey, IndexTree>),
}

impl IndexTree {
    fn new_for(kind: Option<&StageKind>) -> Self {
        match kind {
            None => IndexTree::Leaf(Vec::new()),
            Some(StageKind::Hash) => IndexTree::Hash(HashMap::new()),
            Some(StageKind::Sorted(_)) => IndexTree::Sorted(BTreeMap::new()),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            IndexTree::Leaf(ids) => ids.is_empty(),
            IndexTree::Hash(children) => children.is_empty(),
            IndexTree::Sorted(children) => children.is_empty(),
        }
    }
}

/// One side's index of a join node.
#[derive(Debug)]
pub(crate) struct JoinIndex {
    stages: IndexStages,
    root: IndexTree,
    len: usize,
}

impl JoinIndex {
    pub(crate) fn new(stages: IndexStages) -> Self {
        let root = IndexTree::new_for(stages.kinds().next());
        Self { stages, root, len: 0 }
    }

    /// Number of indexed tuples.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Indexes one tuple under its stage keys.
    pub(crate) fn put(&mut self, keys: &[IndexKey], id: TupleId) {
        let mut node = &mut self.root;
        for depth in 0..self.stages.depth() {
            let next_kind = self.stages.kinds().nth(depth + 1);
            node = match node {
                IndexTree::Hash(children) => children
                    .entry(keys[depth].clone())
                    .or_insert_with(|| IndexTree::new_for(next_kind)),
                IndexTree::Sorted(children) => children
                    .entry(keys[depth].clone())
                    .or_insert_with(|| IndexTree::new_for(next_kind)),
                IndexTree::Leaf(_) => {
                    panic!("Impossible state: leaf reached before the last index stage")
                }
            };
        }
        match node {
            IndexTree::Leaf(ids) => ids.push(id),
            _ => panic!("Impossible state: index chain did not end in a leaf"),
        }
        self.len += 1;
    }

    /// Removes one previously indexed tuple, pruning emptied subtrees.
    pub(crate) fn remove(&mut self, keys: &[IndexKey], id: TupleId) {
        fn descend(node: &mut IndexTree, keys: &[IndexKey], id: TupleId) {
            match node {
                IndexTree::Leaf(ids) => match ids.iter().position(|t| *t == id) {
                    Some(position) => {
                        ids.remove(position);
                    }
                    None => panic!(
                        "Impossible state: tuple {id:?} not present in its index leaf"
                    ),
                },
                IndexTree::Hash(children) => {
                    let child = children.get_mut(&keys[0]).unwrap_or_else(|| {
                        panic!("Impossible state: index key {:?} not present", keys[0])
                    });
                    descend(child, &keys[1..], id);
                    if child.is_empty() {
                        children.remove(&keys[0]);
                    }
                }
                IndexTree::Sorted(children) => {
                    let child = children.get_mut(&keys[0]).unwrap_or_else(|| {
                        panic!("Impossible state: index key {:?} not present", keys[0])
                    });
                    descend(child, &keys[1..], id);
                    if child.is_empty() {
                        children.remove(&keys[0]);
                    }
                }
            }
        }
        descend(&mut self.root, keys, id);
        self.len -= 1;
    }

    /// Collects every indexed tuple matching a probe from the opposite side.
    ///
    /// `probe_side` is the side the probing tuple belongs to; stored keys
    /// are from the other side.
    pub(crate) fn probe(&self, probe_keys: &[IndexKey], probe_side: ProbeSide) -> Vec<TupleId> {
        let mut out = Vec::new();
        self.visit(&self.root, probe_keys, 0, probe_side, &mut out);
        out
    }

    fn visit(
        &self,
        node: &IndexTree,
        probe_keys: &[IndexKey],
        depth: usize,
        probe_side: ProbeSide,
        out: &mut Vec<TupleId>,
    ) {
        match node {
            IndexTree::Leaf(ids) => out.extend(ids.iter().copied()),
            IndexTree::Hash(children) => {
                if let Some(child) = children.get(&probe_keys[depth]) {
                    self.visit(child, probe_keys, depth + 1, probe_side, out);
                }
            }
            IndexTree::Sorted(children) => {
                let kind = match self.stages.kinds().nth(depth) {
                    Some(StageKind::Sorted(kind)) => *kind,
                    _ => panic!("Impossible state: sorted tree under a non-sorted stage"),
                };
                let probe = &probe_keys[depth];
                let (lower, upper) = comparison_range(kind, probe, probe_side);
                for (_, child) in children.range((lower, upper)) {
                    self.visit(child, probe_keys, depth + 1, probe_side, out);
                }
            }
        }
    }
}

/// Computes the stored-key range matched by an ordering joiner.
///
/// The joiner tests `left OP right`. When probing from the left, the stored
/// keys are right keys and the condition is `probe OP stored`; when probing
/// from the right it is `stored OP probe`.
fn comparison_range(
    kind: JoinerKind,
    probe: &IndexKey,
    probe_side: ProbeSide,
) -> (Bound<IndexKey>, Bound<IndexKey>) {
    use Bound::{Excluded, Included, Unbounded};
    let probe = probe.clone();
    match (kind, probe_side) {
        (JoinerKind::LessThan, ProbeSide::Left) => (Excluded(probe), Unbounded),
        (JoinerKind::LessThanOrEqual, ProbeSide::Left) => (Included(probe), Unbounded),
        (JoinerKind::GreaterThan, ProbeSide::Left) => (Unbounded, Excluded(probe)),
        (JoinerKind::GreaterThanOrEqual, ProbeSide::Left) => (Unbounded, Included(probe)),
        (JoinerKind::LessThan, ProbeSide::Right) => (Unbounded, Excluded(probe)),
        (JoinerKind::LessThanOrEqual, ProbeSide::Right) => (Unbounded, Included(probe)),
        (JoinerKind::GreaterThan, ProbeSide::Right) => (Excluded(probe), Unbounded),
        (JoinerKind::GreaterThanOrEqual, ProbeSide::Right) => (Included(probe), Unbounded),
        (JoinerKind::Equal, _) => {
            panic!("Impossible state: equality joiner in a sorted index stage")
        }
    }
}
