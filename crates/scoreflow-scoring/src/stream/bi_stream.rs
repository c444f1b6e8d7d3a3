// Streams of fact pairs produced by a join.

use std::cell::RefCell;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::rc::Rc;

use scoreflow_core::{ConstraintId, ImpactType, Score};

use crate::mapping::{TuplePredicate, TupleValueMapping};

use super::def::{ConstraintDef, StreamId, StreamOp};
use super::factory::FactoryInner;

// A stream of `(A, B)` pairs, created by
// [`UniConstraintStream::join`](super::UniConstraintStream::join).
pub struct BiConstraintStream<A, B, Sc: Score> {
    pub(crate) inner: Rc<RefCell<FactoryInner<Sc>>>,
    pub(crate) stream: StreamId,
    pub(crate) _phantom: PhantomData<fn(&A, &B)>,
}

impl<A, B, Sc> BiConstraintStream<A, B, Sc>
where
    A: Debug + Send + Sync + 'static,
    B: Debug + Send + Sync + 'static,
    Sc: Score,
{
    // Keeps only pairs matching the predicate.
    pub fn filter<F>(&self, predicate: F) -> BiConstraintStream<A, B, Sc>
    where
        F: Fn(&A, &B) -> bool + Send + Sync + 'static,
    {
        let stream = self.inner.borrow_mut().push_stream(StreamOp::Filter {
            parent: self.stream,
            predicate: TuplePredicate::of_pair(predicate),
        });
        BiConstraintStream {
            inner: Rc::clone(&self.inner),
            stream,
            _phantom: PhantomData,
        }
    }

    // Penalizes each surviving pair by a fixed weight.
    pub fn penalize(&self, weight: Sc) -> BiConstraintBuilder<A, B, Sc> {
        self.impact(ImpactType::Penalty, weight, None)
    }

    // Penalizes each surviving pair by `weight * match_weight(a, b)`.
    pub fn penalize_weighted<W>(
        &self,
        weight: Sc,
        match_weight: W,
    ) -> BiConstraintBuilder<A, B, Sc>
    where
        W: Fn(&A, &B) -> i64 + Send + Sync + 'static,
    {
        self.impact(
            ImpactType::Penalty,
            weight,
            Some(TupleValueMapping::of_pair(match_weight)),
        )
    }

    // Rewards each surviving pair by a fixed weight.
    pub fn reward(&self, weight: Sc) -> BiConstraintBuilder<A, B, Sc> {
        self.impact(ImpactType::Reward, weight, None)
    }

    // Rewards each surviving pair by `weight * match_weight(a, b)`.
    pub fn reward_weighted<W>(
        &self,
        weight: Sc,
        match_weight: W,
    ) -> BiConstraintBuilder<A, B, Sc>
    where
        W: Fn(&A, &B) -> i64 + Send + Sync + 'static,
    {
        self.impact(
            ImpactType::Reward,
            weight,
            Some(TupleValueMapping::of_pair(match_weight)),
        )
    }

    fn impact(
        &self,
        impact: ImpactType,
        weight: Sc,
        weigher: Option<TupleValueMapping>,
    ) -> BiConstraintBuilder<A, B, Sc> {
        BiConstraintBuilder {
            inner: Rc::clone(&self.inner),
            stream: self.stream,
            impact,
            weight,
            weigher,
            _phantom: PhantomData,
        }
    }
}

impl<A, B, Sc: Score> Clone for BiConstraintStream<A, B, Sc> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            stream: self.stream,
            _phantom: PhantomData,
        }
    }
}

// Finalizes a bi-stream constraint declaration.
pub struct BiConstraintBuilder<A, B, Sc: Score> {
    inner: Rc<RefCell<FactoryInner<Sc>>>,
    stream: StreamId,
    impact: ImpactType,
    weight: Sc,
    weigher: Option<TupleValueMapping>,
    _phantom: PhantomData<fn(&A, &B)>,
}

impl<A, B, Sc: Score> BiConstraintBuilder<A, B, Sc> {
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
