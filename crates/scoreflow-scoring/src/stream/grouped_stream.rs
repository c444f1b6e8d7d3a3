// Streams of aggregate rows produced by a group-by.

use std::cell::RefCell;
use std::rc::Rc;

use scoreflow_core::{ConstraintId, ImpactType, Score};

use crate::collector::GroupResult;
use crate::key::IndexKey;
use crate::mapping::TupleValueMapping;

use super::def::{ConstraintDef, StreamId};
use super::factory::FactoryInner;

// A stream of `(key, aggregate result)` rows, created by
// [`UniConstraintStream::group_by`](super::UniConstraintStream::group_by).
pub struct GroupedConstraintStream<Sc: Score> {
    pub(crate) inner: Rc<RefCell<FactoryInner<Sc>>>,
    pub(crate) stream: StreamId,
}

impl<Sc: Score> GroupedConstraintStream<Sc> {
    // Penalizes each group by a fixed weight.
    pub fn penalize(&self, weight: Sc) -> GroupedConstraintBuilder<Sc> {
        self.impact(ImpactType::Penalty, weight, None)
    }

    // Penalizes each group by `weight * match_weight(key, result)`.
    //
    // The classic use is an overload penalty scaling with the aggregate:
    // `|_, result| result.as_int().unwrap_or(0) - capacity`.
    pub fn penalize_weighted<W>(&self, weight: Sc, match_weight: W) -> GroupedConstraintBuilder<Sc>
    where
        W: Fn(&IndexKey, &GroupResult) -> i64 + Send + Sync + 'static,
    {
        self.impact(
            ImpactType::Penalty,
            weight,
            Some(TupleValueMapping::of_group(match_weight)),
        )
    }

    // Rewards each group by a fixed weight.
    pub fn reward(&self, weight: Sc) -> GroupedConstraintBuilder<Sc> {
        self.impact(ImpactType::Reward, weight, None)
    }

    // Rewards each group by `weight * match_weight(key, result)`.
    pub fn reward_weighted<W>(&self, weight: Sc, match_weight: W) -> GroupedConstraintBuilder<Sc>
    where
        W: Fn(&IndexKey, &GroupResult) -> i64 + Send + Sync + 'static,
    {
        self.impact(
            ImpactType::Reward,
            weight,
            Some(TupleValueMapping::of_group(match_weight)),
        )
    }

    fn impact(
        &self,
        impact: ImpactType,
        weight: Sc,
        weigher: Option<TupleValueMapping>,
    ) -> GroupedConstraintBuilder<Sc> {
        GroupedConstraintBuilder {
            inner: Rc::clone(&self.inner),
            stream: self.stream,
            impact,
            weight,
            weigher,
        }
    }
}

impl<Sc: Score> Clone for GroupedConstraintStream<Sc> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            stream: self.stream,
        }
    }
}

// Finalizes a grouped constraint declaration.
pub struct GroupedConstraintBuilder<Sc: Score> {
    inner: Rc<RefCell<FactoryInner<Sc>>>,
    stream: StreamId,
    impact: ImpactType,
    weight: Sc,
    weigher: Option<TupleValueMapping>,
}

impl<Sc: Score> GroupedConstraintBuilder<Sc> {
    // Registers the constraint under an ungrouped id and returns it.
    pub fn as_constraint(self, name: impl Into<String>) -> ConstraintId {
        let id = ConstraintId::of(name);
        self.inner.borrow_mut().constraints.push(ConstraintDef {
            id: id.clone(),
            stream: self.stream,
            impact: self.impact,
            weight: self.weight,
            weigher: self.weigher,
        });
        id
    }
}
