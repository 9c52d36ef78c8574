use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::try_join_all;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction as EdgeDirection;
use tracing::debug;

use crate::core::error::{Result, VsmError};
use crate::db::{Direction, EdgeType, GraphStore, NodeId};


/// Weighted affinity graph restricted to one candidate feature set.
///
/// Every candidate is a node, including those without qualifying neighbors.
/// Node indices are dense and follow insertion order.
#[derive(Debug, Clone, Default)]
pub struct AffinityAdjacency {
    graph: DiGraph<NodeId, u64>,
    index: HashMap<NodeId, NodeIndex>,
}

impl AffinityAdjacency {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: NodeId) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node) {
            return idx;
        }
        let idx = self.graph.add_node(node);
        self.index.insert(node, idx);
        idx
    }

    /// Adds `matches` to the `from -> to` weight. Both ends become nodes.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, matches: u64) {
        let (a, b) = (self.add_node(from), self.add_node(to));
        match self.graph.find_edge(a, b) {
            Some(edge) => self.graph[edge] += matches,
            None => {
                self.graph.add_edge(a, b, matches);
            }
        }
    }

    pub fn graph(&self) -> &DiGraph<NodeId, u64> {
        &self.graph
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_weights().copied()
    }

    /// Outgoing `(neighbor, weight)` pairs of `node`; empty for unknown nodes.
    pub fn neighbors(&self, node: NodeId) -> Vec<(NodeId, u64)> {
        let Some(&idx) = self.index.get(&node) else {
            return Vec::new();
        };
        let mut out: Vec<(NodeId, u64)> = self
            .graph
            .edges_directed(idx, EdgeDirection::Outgoing)
            .map(|e| (self.graph[e.target()], *e.weight()))
            .collect();
        out.sort_unstable();
        out
    }

    pub fn weight(&self, from: NodeId, to: NodeId) -> Option<u64> {
        let (a, b) = (self.index.get(&from)?, self.index.get(&to)?);
        self.graph.find_edge(*a, *b).map(|e| self.graph[e])
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.index.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}


pub struct AffinityGraphBuilder {
    store: Arc<dyn GraphStore>,
}

impl AffinityGraphBuilder {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Gathers HAS_AFFINITY edges in both directions for each candidate,
    /// keeping only neighbors that are candidates too. Parallel edges between
    /// the same pair add up; self-loops are dropped.
    pub async fn build(&self, candidates: &[NodeId]) -> Result<AffinityAdjacency> {
        let members: HashSet<NodeId> = candidates.iter().copied().collect();
        let mut unique: Vec<NodeId> = Vec::with_capacity(members.len());
        let mut seen = HashSet::with_capacity(members.len());
        for &candidate in candidates {
            if seen.insert(candidate) {
                unique.push(candidate);
            }
        }

        let neighborhoods = try_join_all(unique.iter().map(|&candidate| async move {
            let hops = self
                .store
                .traverse(candidate, EdgeType::HasAffinity, Direction::Both)
                .await?;
            Ok::<_, VsmError>((candidate, hops))
        }))
        .await?;

        let mut adjacency = AffinityAdjacency::new();
        for (candidate, hops) in neighborhoods {
            adjacency.add_node(candidate);
            for hop in hops {
                if hop.node != candidate && members.contains(&hop.node) {
                    adjacency.add_edge(candidate, hop.node, hop.matches);
                }
            }
        }

        debug!(
            "Affinity graph over {} candidates: {} weighted edges",
            adjacency.len(),
            adjacency.edge_count()
        );

        Ok(adjacency)
    }
}
