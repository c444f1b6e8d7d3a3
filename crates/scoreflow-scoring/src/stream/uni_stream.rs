// Streams of single facts.

use std::cell::RefCell;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::rc::Rc;

use scoreflow_core::{ConstraintId, ImpactType, Score};

use crate::collector::TupleCollector;
use crate::joiner::JoinerSpec;
use crate::key::IndexKey;
use crate::mapping::{TupleKeyMapping, TuplePredicate, TupleValueMapping};

use super::bi_stream::BiConstraintStream;
use super::def::{ConstraintDef, StreamId, StreamOp};
use super::factory::FactoryInner;
use super::grouped_stream::GroupedConstraintStream;

// A stream of single facts of type `A`.
//
// Created by [`ConstraintFactory::for_each`](super::ConstraintFactory::for_each).
pub struct UniConstraintStream<A, Sc: Score> {
    pub(crate) inner: Rc<RefCell<FactoryInner<Sc>>>,
    pub(crate) stream: StreamId,
    pub(crate) _phantom: PhantomData<fn(&A)>,
}

impl<A, Sc> UniConstraintStream<A, Sc>
where
    A: Debug + Send + Sync + 'static,
    Sc: Score,
{
    // Keeps only facts matching the predicate.
    pub fn filter<F>(&self, predicate: F) -> UniConstraintStream<A, Sc>
    where
        F: Fn(&A) -> bool + Send + Sync + 'static,
    {
        let stream = self.inner.borrow_mut().push_stream(StreamOp::Filter {
            parent: self.stream,
            predicate: TuplePredicate::of(predicate),
        });
        UniConstraintStream {
            inner: Rc::clone(&self.inner),
            stream,
            _phantom: PhantomData,
        }
    }

    // Joins this stream with another one under the given joiners.
    //
    // Indexing joiners (`equal`, `less_than`, ...) must precede filtering
    // joiners; the order is checked when the session is built.
    pub fn join<B>(
        &self,
        other: &UniConstraintStream<B, Sc>,
        joiners: Vec<JoinerSpec>,
    ) -> BiConstraintStream<A, B, Sc>
    where
        B: Debug + Send + Sync + 'static,
    {
        let stream = self.inner.borrow_mut().push_stream(StreamOp::Join {
            left: self.stream,
            right: other.stream,
            joiners,
        });
        BiConstraintStream {
            inner: Rc::clone(&self.inner),
            stream,
            _phantom: PhantomData,
        }
    }

    // Groups facts by a key and aggregates each group with a collector.
    pub fn group_by<K, F>(&self, key: F, collector: TupleCollector) -> GroupedConstraintStream<Sc>
    where
        K: Into<IndexKey>,
        F: Fn(&A) -> K + Send + Sync + 'static,
    {
        let stream = self.inner.borrow_mut().push_stream(StreamOp::Group {
            parent: self.stream,
            key: TupleKeyMapping::of(key),
            collector,
        });
        GroupedConstraintStream {
            inner: Rc::clone(&self.inner),
            stream,
        }
    }

    // Penalizes each surviving fact by a fixed weight.
    pub fn penalize(&self, weight: Sc) -> UniConstraintBuilder<A, Sc> {
        self.impact(ImpactType::Penalty, weight, None)
    }

    // Penalizes each surviving fact by `weight * match_weight(fact)`.
    pub fn penalize_weighted<W>(&self, weight: Sc, match_weight: W) -> UniConstraintBuilder<A, Sc>
    where
        W: Fn(&A) -> i64 + Send + Sync + 'static,
    {
        self.impact(
            ImpactType::Penalty,
            weight,
            Some(TupleValueMapping::of(match_weight)),
        )
    }

    // Rewards each surviving fact by a fixed weight.
    pub fn reward(&self, weight: Sc) -> UniConstraintBuilder<A, Sc> {
        self.impact(ImpactType::Reward, weight, None)
    }

    // Rewards each surviving fact by `weight * match_weight(fact)`.
    pub fn reward_weighted<W>(&self, weight: Sc, match_weight: W) -> UniConstraintBuilder<A, Sc>
    where
        W: Fn(&A) -> i64 + Send + Sync + 'static,
    {
        self.impact(
            ImpactType::Reward,
            weight,
            Some(TupleValueMapping::of(match_weight)),
        )
    }

    fn impact(
        &self,
        impact: ImpactType,
        weight: Sc,
        weigher: Option<TupleValueMapping>,
    ) -> UniConstraintBuilder<A, Sc> {
        UniConstraintBuilder {
            inner: Rc::clone(&self.inner),
            stream: self.stream,
            impact,
            weight,
            weigher,
            _phantom: PhantomData,
        }
    }
}

impl<A, Sc: Score> Clone for UniConstraintStream<A, Sc> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            stream: self.stream,
            _phantom: PhantomData,
        }
    }
}

// Finalizes a uni-stream constraint declaration.
pub struct UniConstraintBuilder<A, Sc: Score> {
    inner: Rc<RefCell<FactoryInner<Sc>>>,
    stream: StreamId,
    impact: ImpactType,
    weight: Sc,
    weigher: Option<TupleValueMapping>,
    _phantom: PhantomData<fn(&A)>,
}

impl<A, Sc: Score> UniConstraintBuilder<A, Sc> {
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
