//! Read-only topology export for diagnostics.
//!
//! Describes the compiled network: every node with its kind, detail and
//! topological layer (nodes that could execute in the same logical wave),
//! plus the parent-child edges as index pairs. Purely observational; it
//! never mutates the network and sits off the scoring critical path.

use scoreflow_core::Score;

use crate::network::ConstraintSession;

/// One node of the exported topology.
#[derive(Debug, Clone)]
pub struct TopologyNode {
    /// Arena index of the node; edges refer to these.
    pub id: usize,
    /// Topological layer: 0 for sources, otherwise one past the deepest
    /// parent.
    pub layer: usize,
    /// Node kind label: "source", "join", "filter", "group" or "sink".
    pub kind: &'static str,
    /// Kind-specific detail: the fact type for sources, the constraint id
    /// and weight for sinks.
    pub detail: String,
}

/// A descriptive snapshot of one compiled network.
#[derive(Debug, Clone)]
pub struct NetworkTopology {
    /// Nodes in arena order.
    pub nodes: Vec<TopologyNode>,
    /// `(parent, child)` index pairs.
    pub edges: Vec<(usize, usize)>,
}

impl NetworkTopology {
    /// Captures the topology of a session's network.
    pub fn of<Sc: Score>(session: &ConstraintSession<Sc>) -> Self {
        let node_count = session.nodes().len();

        let mut edges = Vec::new();
        for parent in 0..node_count {
            for edge in session.child_edges(parent) {
                edges.push((parent, edge.node));
            }
        }

        // Nodes are arena-ordered parents-first, so a single forward pass
        // settles the layers.
        let mut layers = vec![0usize; node_count];
        for &(parent, child) in &edges {
            layers[child] = layers[child].max(layers[parent] + 1);
        }

        let nodes = session
            .nodes()
            .iter()
            .enumerate()
            .map(|(id, node)| TopologyNode {
                id,
                layer: layers[id],
                kind: node.kind_label(),
                detail: node.detail(),
            })
            .collect();

        Self { nodes, edges }
    }

    /// Returns the number of layers.
    pub fn layer_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| node.layer + 1)
            .max()
            .unwrap_or(0)
    }

    /// Groups nodes per layer, shallowest first.
    pub fn layers(&self) -> Vec<Vec<&TopologyNode>> {
        let mut grouped: Vec<Vec<&TopologyNode>> = vec![Vec::new(); self.layer_count()];
        for node in &self.nodes {
            grouped[node.layer].push(node);
        }
        grouped
    }
}

impl std::fmt::Display for NetworkTopology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (depth, layer) in self.layers().iter().enumerate() {
            writeln!(f, "layer {depth}:")?;
            for node in layer {
                if node.detail.is_empty() {
                    writeln!(f, "  [{}] {}", node.id, node.kind)?;
                } else {
                    writeln!(f, "  [{}] {} {}", node.id, node.kind, node.detail)?;
                }
            }
        }
        Ok(())
    }
}
