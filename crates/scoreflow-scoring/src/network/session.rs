//! One live scoring session: a compiled node network plus its bookkeeping.

use std::any::TypeId;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use scoreflow_core::{ConstraintId, Result, Score, ScoreFlowError};
use tracing::{debug, trace};

use crate::fact::{Fact, FactKey};
use crate::joiner::comb;
use crate::matches::{ConstraintMatchTotal, Indictment, MatchRegistry};
use crate::stream::def::{ConstraintSetDef, StreamOp};
use crate::tuple::TupleIdGen;

use super::node::{
    ChildEdge, FilterNode, GroupNode, InputSide, JoinNode, Node, NodeId, SinkNode, SourceNode,
    TupleEvent,
};

/// A compiled constraint network evaluating one working solution.
///
/// A session belongs to exactly one logical caller; there is no internal
/// locking. Every `insert`/`update`/`retract` runs its entire downstream
/// cascade before returning - there is no suspension point and no batching.
/// Sibling nodes propagate in construction order, which makes event
/// processing deterministic for a given event sequence.
pub struct ConstraintSession<Sc: Score> {
    def: Arc<ConstraintSetDef<Sc>>,
    nodes: Vec<Node<Sc>>,
    children: Vec<Vec<ChildEdge>>,
    sources: HashMap<TypeId, NodeId>,
    registry: MatchRegistry<Sc>,
    ids: TupleIdGen,
}

impl<Sc: Score> std::fmt::Debug for ConstraintSession<Sc> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstraintSession")
            .field("nodes", &self.nodes.len())
            .finish_non_exhaustive()
    }
}

impl<Sc: Score> ConstraintSession<Sc> {
    /// Compiles a session from a constraint-set definition.
    ///
    /// # Errors
    ///
    /// [`ScoreFlowError::Build`] on duplicate constraint ids or invalid
    /// joiner order (see [`comb`]).
    pub fn build(def: Arc<ConstraintSetDef<Sc>>) -> Result<Self> {
        let mut nodes: Vec<Node<Sc>> = Vec::new();
        let mut children: Vec<Vec<ChildEdge>> = Vec::new();
        let mut sources: HashMap<TypeId, NodeId> = HashMap::new();
        let mut stream_nodes: Vec<NodeId> = Vec::with_capacity(def.streams.len());

        let push_node = |nodes: &mut Vec<Node<Sc>>,
                             children: &mut Vec<Vec<ChildEdge>>,
                             node: Node<Sc>|
         -> NodeId {
            let id = nodes.len();
            nodes.push(node);
            children.push(Vec::new());
            id
        };

        for op in &def.streams {
            let node_id = match op {
                StreamOp::Source {
                    fact_type,
                    type_name,
                } => match sources.get(fact_type) {
                    Some(existing) => *existing,
                    None => {
                        let id = push_node(
                            &mut nodes,
                            &mut children,
                            Node::Source(SourceNode::new(*fact_type, *type_name)),
                        );
                        sources.insert(*fact_type, id);
                        id
                    }
                },
                StreamOp::Filter { parent, predicate } => {
                    let id = push_node(
                        &mut nodes,
                        &mut children,
                        Node::Filter(FilterNode::new(predicate.clone())),
                    );
                    children[stream_nodes[*parent]].push(ChildEdge {
                        node: id,
                        side: InputSide::Single,
                    });
                    id
                }
                StreamOp::Join {
                    left,
                    right,
                    joiners,
                } => {
                    let combed = comb(joiners.clone())?;
                    let id = push_node(
                        &mut nodes,
                        &mut children,
                        Node::Join(JoinNode::new(combed)),
                    );
                    children[stream_nodes[*left]].push(ChildEdge {
                        node: id,
                        side: InputSide::Left,
                    });
                    children[stream_nodes[*right]].push(ChildEdge {
                        node: id,
                        side: InputSide::Right,
                    });
                    id
                }
                StreamOp::Group {
                    parent,
                    key,
                    collector,
                } => {
                    let id = push_node(
                        &mut nodes,
                        &mut children,
                        Node::Group(GroupNode::new(key.clone(), collector.clone())),
                    );
                    children[stream_nodes[*parent]].push(ChildEdge {
                        node: id,
                        side: InputSide::Single,
                    });
                    id
                }
            };
            stream_nodes.push(node_id);
        }

        let mut registry = MatchRegistry::new();
        let mut seen: HashMap<&ConstraintId, ()> = HashMap::new();
        for constraint in &def.constraints {
            if seen.insert(&constraint.id, ()).is_some() {
                return Err(ScoreFlowError::Build(format!(
                    "Two constraints share the id ({}).",
                    constraint.id
                )));
            }
            let id = push_node(
                &mut nodes,
                &mut children,
                Node::Sink(SinkNode::new(
                    constraint.id.clone(),
                    constraint.impact,
                    constraint.weight,
                    constraint.weigher.clone(),
                )),
            );
            children[stream_nodes[constraint.stream]].push(ChildEdge {
                node: id,
                side: InputSide::Single,
            });
            registry.register_constraint(constraint.id.clone(), constraint.weight);
        }

        debug!(
            nodes = nodes.len(),
            sources = sources.len(),
            constraints = def.constraints.len(),
            "built constraint network"
        );

        Ok(Self {
            def,
            nodes,
            children,
            sources,
            registry,
            ids: TupleIdGen::default(),
        })
    }

    /// Returns the definition this session was compiled from.
    pub fn definition(&self) -> &Arc<ConstraintSetDef<Sc>> {
        &self.def
    }

    /// Inserts a fact, running the full downstream cascade.
    ///
    /// A fact whose type has no `for_each` source is accepted and ignored.
    pub fn insert(&mut self, fact: Fact) -> Result<()> {
        let Some(&source) = self.sources.get(&fact.type_id()) else {
            trace!(fact = ?fact, "insert ignored: no source for fact type");
            return Ok(());
        };
        let event = match &mut self.nodes[source] {
            Node::Source(node) => node.insert_fact(fact, &mut self.ids)?,
            _ => unreachable!("sources map points at a non-source node"),
        };
        self.propagate(source, event)
    }

    /// Re-evaluates a fact after its payload changed in place.
    pub fn update(&mut self, fact: Fact) -> Result<()> {
        let Some(&source) = self.sources.get(&fact.type_id()) else {
            trace!(fact = ?fact, "update ignored: no source for fact type");
            return Ok(());
        };
        let event = match &mut self.nodes[source] {
            Node::Source(node) => node.update_fact(fact)?,
            _ => unreachable!("sources map points at a non-source node"),
        };
        self.propagate(source, event)
    }

    /// Retracts a fact, removing exactly the tuples its insert created.
    pub fn retract(&mut self, fact: &Fact) -> Result<()> {
        let Some(&source) = self.sources.get(&fact.type_id()) else {
            trace!(fact = ?fact, "retract ignored: no source for fact type");
            return Ok(());
        };
        let event = match &mut self.nodes[source] {
            Node::Source(node) => node.retract_fact(fact.key())?,
            _ => unreachable!("sources map points at a non-source node"),
        };
        self.propagate(source, event)
    }

    fn propagate(&mut self, origin: NodeId, event: TupleEvent) -> Result<()> {
        let mut queue: VecDeque<(NodeId, InputSide, TupleEvent)> = VecDeque::new();
        self.fan_out(origin, event, &mut queue);

        // One event at a time, FIFO; the cascade runs to completion before
        // this call returns. An error mid-cascade leaves the network
        // inconsistent and must be treated as fatal by the caller.
        let mut out = Vec::new();
        while let Some((target, side, event)) = queue.pop_front() {
            match &mut self.nodes[target] {
                Node::Sink(sink) => {
                    sink.apply(event, &mut self.registry)?;
                }
                node => {
                    out.clear();
                    node.process(side, event, &mut self.ids, &mut out)?;
                    for child_event in out.drain(..) {
                        self.fan_out(target, child_event, &mut queue);
                    }
                }
            }
        }
        Ok(())
    }

    fn fan_out(
        &self,
        origin: NodeId,
        event: TupleEvent,
        queue: &mut VecDeque<(NodeId, InputSide, TupleEvent)>,
    ) {
        // Tuples share their fact payloads, so the per-child clone is cheap.
        for edge in &self.children[origin] {
            queue.push_back((edge.node, edge.side, event.clone()));
        }
    }

    /// Returns the current aggregate score.
    pub fn calculate_score(&self) -> Sc {
        self.registry.score()
    }

    /// Returns the per-constraint match totals.
    pub fn constraint_match_totals(&self) -> &HashMap<ConstraintId, ConstraintMatchTotal<Sc>> {
        self.registry.totals()
    }

    /// Returns the per-fact indictments.
    pub fn indictments(&self) -> &HashMap<FactKey, Indictment<Sc>> {
        self.registry.indictments()
    }

    /// Returns the per-fact indictments mutably, so justification lists can
    /// be rebuilt on access.
    pub fn indictments_mut(&mut self) -> &mut HashMap<FactKey, Indictment<Sc>> {
        self.registry.indictments_mut()
    }

    /// Discards all tuples and matches, keeping the compiled structure's
    /// definition. The caller re-inserts the fact set afterwards.
    pub fn reset(&mut self) -> Result<()> {
        *self = Self::build(Arc::clone(&self.def))?;
        Ok(())
    }

    pub(crate) fn nodes(&self) -> &[Node<Sc>] {
        &self.nodes
    }

    pub(crate) fn child_edges(&self, id: NodeId) -> &[ChildEdge] {
        &self.children[id]
    }
}
