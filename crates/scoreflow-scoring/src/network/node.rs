//! Network nodes.
//!
//! A node owns the tuples it creates and tracks, per input tuple, exactly
//! which output tuples it produced, so a retract removes precisely what the
//! matching insert created - nothing is recomputed to find it. An update
//! rewrites tuples in place and forwards an update event when the node can
//! prove its key is unaffected; otherwise it degrades to retract-then-insert.

use std::any::TypeId;
use std::collections::HashMap;

use scoreflow_core::{ConstraintId, ImpactType, Result, Score, ScoreFlowError};

use crate::collector::TupleCollector;
use crate::fact::{Fact, FactKey};
use crate::joiner::CombedJoiner;
use crate::key::IndexKey;
use crate::mapping::{TupleKeyMapping, TuplePredicate, TupleValueMapping};
use crate::matches::{Justification, MatchRegistry};
use crate::tuple::{Tuple, TupleId, TupleIdGen};

use super::index::{IndexStages, JoinIndex, ProbeSide};

pub(crate) type NodeId = usize;

/// Which input of a node an edge feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InputSide {
    Single,
    Left,
    Right,
}

/// One edge from a parent node to a child input.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ChildEdge {
    pub node: NodeId,
    pub side: InputSide,
}

/// A tuple lifecycle event travelling along an edge.
#[derive(Clone, Debug)]
pub(crate) enum TupleEvent {
    Insert(Tuple),
    Update(Tuple),
    Retract(Tuple),
}

/// A processing unit of the network.
///
/// The closed set of node kinds is matched exhaustively everywhere; adding
/// a kind is a compile-time event, not a runtime dispatch concern.
pub(crate) enum Node<Sc: Score> {
    Source(SourceNode),
    Join(JoinNode),
    Filter(FilterNode),
    Group(GroupNode),
    Sink(SinkNode<Sc>),
}

impl<Sc: Score> Node<Sc> {
    pub(crate) fn kind_label(&self) -> &'static str {
        match self {
            Node::Source(_) => "source",
            Node::Join(_) => "join",
            Node::Filter(_) => "filter",
            Node::Group(_) => "group",
            Node::Sink(_) => "sink",
        }
    }

    pub(crate) fn detail(&self) -> String {
        match self {
            Node::Source(node) => node.type_name.rsplit("::").next().unwrap_or("").to_string(),
            Node::Join(node) => format!("{} indexed triple(s)", node.stage_triple_count()),
            Node::Filter(_) => String::new(),
            Node::Group(_) => String::new(),
            Node::Sink(node) => format!("{} @ {}", node.constraint, node.weight),
        }
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Introduces tuples for one fact type.
pub(crate) struct SourceNode {
    pub(crate) fact_type: TypeId,
    pub(crate) type_name: &'static str,
    by_fact: HashMap<FactKey, TupleId>,
    tuples: HashMap<TupleId, Tuple>,
}

impl SourceNode {
    pub(crate) fn new(fact_type: TypeId, type_name: &'static str) -> Self {
        Self {
            fact_type,
            type_name,
            by_fact: HashMap::new(),
            tuples: HashMap::new(),
        }
    }

    pub(crate) fn tuple_count(&self) -> usize {
        self.tuples.len()
    }

    fn check_type(&self, fact: &Fact) -> Result<()> {
        if fact.type_id() != self.fact_type {
            return Err(ScoreFlowError::Consistency(format!(
                "Fact {fact:?} routed to the source for ({}).",
                self.type_name
            )));
        }
        Ok(())
    }

    pub(crate) fn insert_fact(&mut self, fact: Fact, ids: &mut TupleIdGen) -> Result<TupleEvent> {
        self.check_type(&fact)?;
        if self.by_fact.contains_key(&fact.key()) {
            return Err(ScoreFlowError::Consistency(format!(
                "Fact {fact:?} was already inserted into source ({}).",
                self.type_name
            )));
        }
        let tuple = Tuple::of_fact(ids.next(), fact.clone());
        self.by_fact.insert(fact.key(), tuple.id());
        self.tuples.insert(tuple.id(), tuple.clone());
        Ok(TupleEvent::Insert(tuple))
    }

    pub(crate) fn update_fact(&mut self, fact: Fact) -> Result<TupleEvent> {
        self.check_type(&fact)?;
        let id = *self.by_fact.get(&fact.key()).ok_or_else(|| {
            ScoreFlowError::Consistency(format!(
                "Cannot update fact {fact:?}: it was never inserted into source ({}).",
                self.type_name
            ))
        })?;
        let tuple = self.tuples.get_mut(&id).ok_or_else(|| {
            ScoreFlowError::Consistency(format!("Source tuple {id:?} vanished."))
        })?;
        tuple.set_fact(0, fact);
        Ok(TupleEvent::Update(tuple.clone()))
    }

    pub(crate) fn retract_fact(&mut self, key: FactKey) -> Result<TupleEvent> {
        let id = self.by_fact.remove(&key).ok_or_else(|| {
            ScoreFlowError::Consistency(format!(
                "Cannot retract fact {key:?}: it was never inserted into source ({}).",
                self.type_name
            ))
        })?;
        let tuple = self.tuples.remove(&id).ok_or_else(|| {
            ScoreFlowError::Consistency(format!("Source tuple {id:?} vanished."))
        })?;
        Ok(TupleEvent::Retract(tuple))
    }
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

struct SideEntry {
    tuple: Tuple,
    keys: Vec<IndexKey>,
}

/// Combines tuples from two inputs using a combed joiner.
///
/// Each side keeps an index of its own tuples; an insert on one side probes
/// the opposite index and emits one downstream insert per surviving match.
pub(crate) struct JoinNode {
    combed: CombedJoiner,
    stages: IndexStages,
    left_index: JoinIndex,
    right_index: JoinIndex,
    left_tuples: HashMap<TupleId, SideEntry>,
    right_tuples: HashMap<TupleId, SideEntry>,
    out_tuples: HashMap<TupleId, Tuple>,
    out_by_left: HashMap<TupleId, Vec<TupleId>>,
    out_by_right: HashMap<TupleId, Vec<TupleId>>,
    pair_to_out: HashMap<(TupleId, TupleId), TupleId>,
    out_pair: HashMap<TupleId, (TupleId, TupleId)>,
}

impl JoinNode {
    pub(crate) fn new(combed: CombedJoiner) -> Self {
        let stages = IndexStages::of(&combed.index);
        Self {
            left_index: JoinIndex::new(stages.clone()),
            right_index: JoinIndex::new(stages.clone()),
            stages,
            combed,
            left_tuples: HashMap::new(),
            right_tuples: HashMap::new(),
            out_tuples: HashMap::new(),
            out_by_left: HashMap::new(),
            out_by_right: HashMap::new(),
            pair_to_out: HashMap::new(),
            out_pair: HashMap::new(),
        }
    }

    fn stage_triple_count(&self) -> usize {
        self.combed.index.triples().len()
    }

    fn side_keys(&self, side: InputSide, tuple: &Tuple) -> Result<Vec<IndexKey>> {
        let fact = tuple.fact(0).ok_or_else(|| {
            ScoreFlowError::Consistency(format!(
                "Join input tuple {:?} carries no fact.",
                tuple.id()
            ))
        })?;
        let triple_keys = match side {
            InputSide::Left => self.combed.index.left_keys(fact),
            InputSide::Right => self.combed.index.right_keys(fact),
            InputSide::Single => {
                return Err(ScoreFlowError::Consistency(
                    "Join node fed through a single-input edge.".to_string(),
                ))
            }
        };
        Ok(self.stages.stage_keys(&triple_keys))
    }

    fn passes_filter(&self, left: &Tuple, right: &Tuple) -> bool {
        match (&self.combed.filter, left.fact(0), right.fact(0)) {
            (Some(filter), Some(left_fact), Some(right_fact)) => {
                filter.test(left_fact, right_fact)
            }
            (Some(_), _, _) => false,
            (None, _, _) => true,
        }
    }

    fn insert_out(
        &mut self,
        left_id: TupleId,
        right_id: TupleId,
        ids: &mut TupleIdGen,
        out: &mut Vec<TupleEvent>,
    ) {
        let (left, right) = (&self.left_tuples[&left_id].tuple, &self.right_tuples[&right_id].tuple);
        let tuple = Tuple::of_pair(ids.next(), left, right);
        self.out_tuples.insert(tuple.id(), tuple.clone());
        self.out_by_left.entry(left_id).or_default().push(tuple.id());
        self.out_by_right.entry(right_id).or_default().push(tuple.id());
        self.pair_to_out.insert((left_id, right_id), tuple.id());
        self.out_pair.insert(tuple.id(), (left_id, right_id));
        out.push(TupleEvent::Insert(tuple));
    }

    fn retract_out(&mut self, out_id: TupleId, out: &mut Vec<TupleEvent>) -> Result<()> {
        let tuple = self.out_tuples.remove(&out_id).ok_or_else(|| {
            ScoreFlowError::Consistency(format!("Join out tuple {out_id:?} vanished."))
        })?;
        let (left_id, right_id) = self.out_pair.remove(&out_id).ok_or_else(|| {
            ScoreFlowError::Consistency(format!("Join out tuple {out_id:?} has no pair entry."))
        })?;
        self.pair_to_out.remove(&(left_id, right_id));
        if let Some(list) = self.out_by_left.get_mut(&left_id) {
            list.retain(|t| *t != out_id);
        }
        if let Some(list) = self.out_by_right.get_mut(&right_id) {
            list.retain(|t| *t != out_id);
        }
        out.push(TupleEvent::Retract(tuple));
        Ok(())
    }

    fn insert_side(
        &mut self,
        side: InputSide,
        tuple: Tuple,
        ids: &mut TupleIdGen,
        out: &mut Vec<TupleEvent>,
    ) -> Result<()> {
        let keys = self.side_keys(side, &tuple)?;
        let id = tuple.id();
        let candidates = match side {
            InputSide::Left => {
                self.left_index.put(&keys, id);
                self.left_tuples.insert(id, SideEntry { tuple, keys });
                self.right_index.probe(&self.left_tuples[&id].keys, ProbeSide::Left)
            }
            InputSide::Right => {
                self.right_index.put(&keys, id);
                self.right_tuples.insert(id, SideEntry { tuple, keys });
                self.left_index.probe(&self.right_tuples[&id].keys, ProbeSide::Right)
            }
            InputSide::Single => unreachable!("checked in side_keys"),
        };
        for candidate in candidates {
            let (left_id, right_id) = match side {
                InputSide::Left => (id, candidate),
                _ => (candidate, id),
            };
            let passes = {
                let left = &self.left_tuples[&left_id].tuple;
                let right = &self.right_tuples[&right_id].tuple;
                self.passes_filter(left, right)
            };
            if passes {
                self.insert_out(left_id, right_id, ids, out);
            }
        }
        Ok(())
    }

    fn retract_side(
        &mut self,
        side: InputSide,
        tuple_id: TupleId,
        out: &mut Vec<TupleEvent>,
    ) -> Result<()> {
        let entry = match side {
            InputSide::Left => self.left_tuples.remove(&tuple_id),
            _ => self.right_tuples.remove(&tuple_id),
        }
        .ok_or_else(|| {
            ScoreFlowError::Consistency(format!(
                "Cannot retract join input {tuple_id:?}: unknown tuple."
            ))
        })?;
        match side {
            InputSide::Left => self.left_index.remove(&entry.keys, tuple_id),
            _ => self.right_index.remove(&entry.keys, tuple_id),
        }
        let outs = match side {
            InputSide::Left => self.out_by_left.remove(&tuple_id),
            _ => self.out_by_right.remove(&tuple_id),
        }
        .unwrap_or_default();
        for out_id in outs {
            self.retract_out(out_id, out)?;
        }
        Ok(())
    }

    fn update_side(
        &mut self,
        side: InputSide,
        tuple: Tuple,
        ids: &mut TupleIdGen,
        out: &mut Vec<TupleEvent>,
    ) -> Result<()> {
        let id = tuple.id();
        let new_keys = self.side_keys(side, &tuple)?;
        let old_keys = {
            let entry = match side {
                InputSide::Left => self.left_tuples.get(&id),
                _ => self.right_tuples.get(&id),
            }
            .ok_or_else(|| {
                ScoreFlowError::Consistency(format!(
                    "Cannot update join input {tuple_id:?}: unknown tuple.",
                    tuple_id = id
                ))
            })?;
            entry.keys.clone()
        };

        if new_keys != old_keys {
            // The join key moved: the cheap in-place path is unsound, fall
            // back to retract-then-insert.
            self.retract_side(side, id, out)?;
            return self.insert_side(side, tuple, ids, out);
        }

        let entry = match side {
            InputSide::Left => self.left_tuples.get_mut(&id),
            _ => self.right_tuples.get_mut(&id),
        };
        if let Some(entry) = entry {
            entry.tuple = tuple.clone();
        }

        if self.combed.filter.is_none() {
            // Key unchanged, no filter: every existing out tuple survives,
            // rewrite the changed side's facts in place and forward updates.
            let outs = match side {
                InputSide::Left => self.out_by_left.get(&id),
                _ => self.out_by_right.get(&id),
            }
            .cloned()
            .unwrap_or_default();
            for out_id in outs {
                self.rewrite_out(out_id, out)?;
            }
            return Ok(());
        }

        // Key unchanged but a filter is present: the candidate set is the
        // same, yet each pair's filter verdict may flip either way.
        let candidates = match side {
            InputSide::Left => self.right_index.probe(&new_keys, ProbeSide::Left),
            _ => self.left_index.probe(&new_keys, ProbeSide::Right),
        };
        for candidate in candidates {
            let (left_id, right_id) = match side {
                InputSide::Left => (id, candidate),
                _ => (candidate, id),
            };
            let passes = {
                let left = &self.left_tuples[&left_id].tuple;
                let right = &self.right_tuples[&right_id].tuple;
                self.passes_filter(left, right)
            };
            let existing = self.pair_to_out.get(&(left_id, right_id)).copied();
            match (existing, passes) {
                (None, true) => self.insert_out(left_id, right_id, ids, out),
                (Some(out_id), true) => self.rewrite_out(out_id, out)?,
                (Some(out_id), false) => self.retract_out(out_id, out)?,
                (None, false) => {}
            }
        }
        Ok(())
    }

    fn rewrite_out(&mut self, out_id: TupleId, out: &mut Vec<TupleEvent>) -> Result<()> {
        let (left_id, right_id) = *self.out_pair.get(&out_id).ok_or_else(|| {
            ScoreFlowError::Consistency(format!("Join out tuple {out_id:?} has no pair entry."))
        })?;
        let left_facts: Vec<Fact> = self.left_tuples[&left_id].tuple.facts().to_vec();
        let right_facts: Vec<Fact> = self.right_tuples[&right_id].tuple.facts().to_vec();
        let tuple = self.out_tuples.get_mut(&out_id).ok_or_else(|| {
            ScoreFlowError::Consistency(format!("Join out tuple {out_id:?} vanished."))
        })?;
        for (position, fact) in left_facts.iter().chain(right_facts.iter()).enumerate() {
            tuple.set_fact(position, fact.clone());
        }
        out.push(TupleEvent::Update(tuple.clone()));
        Ok(())
    }

    fn process(
        &mut self,
        side: InputSide,
        event: TupleEvent,
        ids: &mut TupleIdGen,
        out: &mut Vec<TupleEvent>,
    ) -> Result<()> {
        match event {
            TupleEvent::Insert(tuple) => self.insert_side(side, tuple, ids, out),
            TupleEvent::Update(tuple) => self.update_side(side, tuple, ids, out),
            TupleEvent::Retract(tuple) => self.retract_side(side, tuple.id(), out),
        }
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Predicate-only admission.
pub(crate) struct FilterNode {
    predicate: TuplePredicate,
    outs: HashMap<TupleId, Tuple>,
}

impl FilterNode {
    pub(crate) fn new(predicate: TuplePredicate) -> Self {
        Self {
            predicate,
            outs: HashMap::new(),
        }
    }

    fn process(
        &mut self,
        event: TupleEvent,
        ids: &mut TupleIdGen,
        out: &mut Vec<TupleEvent>,
    ) -> Result<()> {
        match event {
            TupleEvent::Insert(tuple) => {
                if self.predicate.test(&tuple) {
                    let derived = tuple.derive(ids.next());
                    self.outs.insert(tuple.id(), derived.clone());
                    out.push(TupleEvent::Insert(derived));
                }
                Ok(())
            }
            TupleEvent::Update(tuple) => {
                let was_in = self.outs.contains_key(&tuple.id());
                let now_in = self.predicate.test(&tuple);
                match (was_in, now_in) {
                    (true, true) => {
                        // Rewrite under the existing out identity.
                        let out_id = self.outs[&tuple.id()].id();
                        let derived = tuple.derive(out_id);
                        self.outs.insert(tuple.id(), derived.clone());
                        out.push(TupleEvent::Update(derived));
                    }
                    (true, false) => {
                        if let Some(old) = self.outs.remove(&tuple.id()) {
                            out.push(TupleEvent::Retract(old));
                        }
                    }
                    (false, true) => {
                        let derived = tuple.derive(ids.next());
                        self.outs.insert(tuple.id(), derived.clone());
                        out.push(TupleEvent::Insert(derived));
                    }
                    (false, false) => {}
                }
                Ok(())
            }
            TupleEvent::Retract(tuple) => {
                // Absent means the tuple never passed the predicate.
                if let Some(old) = self.outs.remove(&tuple.id()) {
                    out.push(TupleEvent::Retract(old));
                }
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

struct GroupEntry {
    state: crate::collector::CollectorState,
    count: usize,
    out: Tuple,
}

struct Contribution {
    key: IndexKey,
    delta: crate::collector::AccumDelta,
}

/// Accumulates tuples per key using an undoable collector.
pub(crate) struct GroupNode {
    key_fn: TupleKeyMapping,
    collector: TupleCollector,
    groups: HashMap<IndexKey, GroupEntry>,
    contributions: HashMap<TupleId, Contribution>,
}

impl GroupNode {
    pub(crate) fn new(key_fn: TupleKeyMapping, collector: TupleCollector) -> Self {
        Self {
            key_fn,
            collector,
            groups: HashMap::new(),
            contributions: HashMap::new(),
        }
    }

    fn accumulate_into(
        &mut self,
        key: IndexKey,
        tuple: &Tuple,
        ids: &mut TupleIdGen,
        out: &mut Vec<TupleEvent>,
    ) {
        match self.groups.get_mut(&key) {
            Some(entry) => {
                let delta = self.collector.accumulate(&mut entry.state, tuple);
                entry.count += 1;
                entry.out.set_group_result(self.collector.finish(&entry.state));
                out.push(TupleEvent::Update(entry.out.clone()));
                self.contributions.insert(tuple.id(), Contribution { key, delta });
            }
            None => {
                let mut state = self.collector.new_state();
                let delta = self.collector.accumulate(&mut state, tuple);
                let result = self.collector.finish(&state);
                let group_tuple = Tuple::of_group(ids.next(), key.clone(), result);
                out.push(TupleEvent::Insert(group_tuple.clone()));
                self.groups.insert(
                    key.clone(),
                    GroupEntry {
                        state,
                        count: 1,
                        out: group_tuple,
                    },
                );
                self.contributions.insert(tuple.id(), Contribution { key, delta });
            }
        }
    }

    fn undo_contribution(
        &mut self,
        tuple_id: TupleId,
        out: &mut Vec<TupleEvent>,
    ) -> Result<()> {
        let contribution = self.contributions.remove(&tuple_id).ok_or_else(|| {
            ScoreFlowError::Consistency(format!(
                "Cannot retract group input {tuple_id:?}: it contributed to no group."
            ))
        })?;
        let remove_group = {
            let entry = self.groups.get_mut(&contribution.key).ok_or_else(|| {
                ScoreFlowError::Consistency(format!(
                    "Group for key {:?} vanished.",
                    contribution.key
                ))
            })?;
            self.collector.undo(&mut entry.state, &contribution.delta);
            entry.count -= 1;
            if entry.count == 0 {
                true
            } else {
                entry.out.set_group_result(self.collector.finish(&entry.state));
                out.push(TupleEvent::Update(entry.out.clone()));
                false
            }
        };
        if remove_group {
            if let Some(entry) = self.groups.remove(&contribution.key) {
                out.push(TupleEvent::Retract(entry.out));
            }
        }
        Ok(())
    }

    fn process(
        &mut self,
        event: TupleEvent,
        ids: &mut TupleIdGen,
        out: &mut Vec<TupleEvent>,
    ) -> Result<()> {
        match event {
            TupleEvent::Insert(tuple) => {
                let key = self.key_fn.extract(&tuple);
                self.accumulate_into(key, &tuple, ids, out);
                Ok(())
            }
            TupleEvent::Update(tuple) => {
                let new_key = self.key_fn.extract(&tuple);
                let same_group = self
                    .contributions
                    .get(&tuple.id())
                    .map(|c| c.key == new_key)
                    .ok_or_else(|| {
                        ScoreFlowError::Consistency(format!(
                            "Cannot update group input {:?}: it contributed to no group.",
                            tuple.id()
                        ))
                    })?;
                if same_group {
                    // Same group: swap this tuple's contribution in place.
                    let contribution = self.contributions.get_mut(&tuple.id()).ok_or_else(|| {
                        ScoreFlowError::Consistency(format!(
                            "Group contribution for {:?} vanished.",
                            tuple.id()
                        ))
                    })?;
                    let entry = self.groups.get_mut(&new_key).ok_or_else(|| {
                        ScoreFlowError::Consistency(format!(
                            "Group for key {new_key:?} vanished."
                        ))
                    })?;
                    self.collector.undo(&mut entry.state, &contribution.delta);
                    contribution.delta = self.collector.accumulate(&mut entry.state, &tuple);
                    entry.out.set_group_result(self.collector.finish(&entry.state));
                    out.push(TupleEvent::Update(entry.out.clone()));
                } else {
                    // The tuple moved between groups.
                    self.undo_contribution(tuple.id(), out)?;
                    self.accumulate_into(new_key, &tuple, ids, out);
                }
                Ok(())
            }
            TupleEvent::Retract(tuple) => self.undo_contribution(tuple.id(), out),
        }
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Terminal node: turns surviving tuples into weighted constraint matches.
pub(crate) struct SinkNode<Sc: Score> {
    pub(crate) constraint: ConstraintId,
    pub(crate) impact: ImpactType,
    pub(crate) weight: Sc,
    weigher: Option<TupleValueMapping>,
    matches: HashMap<TupleId, crate::matches::MatchId>,
}

impl<Sc: Score> SinkNode<Sc> {
    pub(crate) fn new(
        constraint: ConstraintId,
        impact: ImpactType,
        weight: Sc,
        weigher: Option<TupleValueMapping>,
    ) -> Self {
        Self {
            constraint,
            impact,
            weight,
            weigher,
            matches: HashMap::new(),
        }
    }

    fn match_score(&self, tuple: &Tuple) -> Sc {
        let multiplier = self
            .weigher
            .as_ref()
            .map(|weigher| weigher.extract(tuple))
            .unwrap_or(1);
        self.weight.scale(self.impact.sign() * multiplier)
    }

    fn register(&mut self, tuple: &Tuple, registry: &mut MatchRegistry<Sc>) -> Result<()> {
        let score = self.match_score(tuple);
        let id = registry.add_match(
            &self.constraint,
            Justification::of_tuple(tuple),
            tuple.facts().to_vec(),
            score,
        )?;
        self.matches.insert(tuple.id(), id);
        Ok(())
    }

    fn unregister(&mut self, tuple_id: TupleId, registry: &mut MatchRegistry<Sc>) -> Result<()> {
        let id = self.matches.remove(&tuple_id).ok_or_else(|| {
            ScoreFlowError::Consistency(format!(
                "Constraint ({}) holds no match for tuple {tuple_id:?}.",
                self.constraint
            ))
        })?;
        registry.remove_match(&self.constraint, id)
    }

    pub(crate) fn apply(
        &mut self,
        event: TupleEvent,
        registry: &mut MatchRegistry<Sc>,
    ) -> Result<()> {
        match event {
            TupleEvent::Insert(tuple) => self.register(&tuple, registry),
            TupleEvent::Update(tuple) => {
                // The weight function may read any part of the tuple, so an
                // update is re-weighed as remove + add.
                self.unregister(tuple.id(), registry)?;
                self.register(&tuple, registry)
            }
            TupleEvent::Retract(tuple) => self.unregister(tuple.id(), registry),
        }
    }
}

impl<Sc: Score> Node<Sc> {
    /// Routes one event through a non-sink node, collecting child events.
    ///
    /// Sinks are handled by the session, which owns the match registry.
    pub(crate) fn process(
        &mut self,
        side: InputSide,
        event: TupleEvent,
        ids: &mut TupleIdGen,
        out: &mut Vec<TupleEvent>,
    ) -> Result<()> {
        match self {
            Node::Source(_) => Err(ScoreFlowError::Consistency(
                "Source nodes receive facts, not tuple events.".to_string(),
            )),
            Node::Join(node) => node.process(side, event, ids, out),
            Node::Filter(node) => node.process(event, ids, out),
            Node::Group(node) => node.process(event, ids, out),
            Node::Sink(_) => Err(ScoreFlowError::Consistency(
                "Sink events must be applied with the match registry.".to_string(),
            )),
        }
    }
}
