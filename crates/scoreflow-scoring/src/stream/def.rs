//! Built constraint-set definitions.
//!
//! The fluent builder produces a [`ConstraintSetDef`]: a flat list of
//! stream operations referencing their parents by position, plus the
//! declared constraints. A session is compiled from a definition; the
//! definition itself stays immutable and shareable, so a from-scratch
//! recomputation can always build a fresh session from the same
//! definition.

use std::any::TypeId;

use scoreflow_core::{ConstraintId, ImpactType, Score};

use crate::collector::TupleCollector;
use crate::joiner::JoinerSpec;
use crate::mapping::{TupleKeyMapping, TuplePredicate, TupleValueMapping};

pub(crate) type StreamId = usize;

/// One stream operation in a definition.
#[derive(Clone, Debug)]
pub(crate) enum StreamOp {
    Source {
        fact_type: TypeId,
        type_name: &'static str,
    },
    Filter {
        parent: StreamId,
        predicate: TuplePredicate,
    },
    Join {
        left: StreamId,
        right: StreamId,
        joiners: Vec<JoinerSpec>,
    },
    Group {
        parent: StreamId,
        key: TupleKeyMapping,
        collector: TupleCollector,
    },
}

/// One declared constraint: a terminal stream plus its weighting.
#[derive(Clone, Debug)]
pub(crate) struct ConstraintDef<Sc: Score> {
    pub id: ConstraintId,
    pub stream: StreamId,
    pub impact: ImpactType,
    pub weight: Sc,
    pub weigher: Option<TupleValueMapping>,
}

/// An immutable, buildable set of constraint declarations.
#[derive(Clone, Debug)]
pub struct ConstraintSetDef<Sc: Score> {
    pub(crate) streams: Vec<StreamOp>,
    pub(crate) constraints: Vec<ConstraintDef<Sc>>,
}

impl<Sc: Score> ConstraintSetDef<Sc> {
    /// Returns the declared constraint ids, in declaration order.
    pub fn constraint_ids(&self) -> Vec<ConstraintId> {
        self.constraints.iter().map(|c| c.id.clone()).collect()
    }

    /// Returns the number of stream operations.
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Returns a copy with one constraint's weight replaced.
    pub(crate) fn with_weight(&self, constraint: &ConstraintId, weight: Sc) -> Self {
        let mut copy = self.clone();
        for def in &mut copy.constraints {
            if &def.id == constraint {
                def.weight = weight;
            }
        }
        copy
    }
}
