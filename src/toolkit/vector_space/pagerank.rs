//! Weighted PageRank over an [`AffinityAdjacency`].
//!
//! Power iteration from a uniform start:
//!
//! ```text
//! PR(v) = (1 - d) / N + d * Σ PR(u) * w(u, v) / W(u)  +  d * D / N
//! ```
//!
//! where `W(u)` is the total outbound weight of `u` and `D` is the rank held
//! by nodes with no outbound weight, spread uniformly. Ranks always sum to 1,
//! so every score lies in [0, 1]. Iteration stops when the L1 change drops
//! below the tolerance or the iteration cap is reached.

use std::collections::HashMap;

use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::affinity::AffinityAdjacency;
use crate::db::NodeId;


#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRankConfig {
    pub damping_factor: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping_factor: crate::DEFAULT_DAMPING_FACTOR,
            tolerance: crate::DEFAULT_CONVERGENCE_TOLERANCE,
            max_iterations: crate::DEFAULT_MAX_ITERATIONS,
        }
    }
}


#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRankScores {
    scores: HashMap<NodeId, f64>,
    pub iterations: usize,
    pub converged: bool,
}

impl PageRankScores {
    /// Score of `node`, or 0.0 when it was not part of the ranked graph.
    pub fn get(&self, node: NodeId) -> f64 {
        self.scores.get(&node).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.scores.iter().map(|(&k, &v)| (k, v))
    }
}


pub struct PageRankEngine {
    config: PageRankConfig,
}

impl PageRankEngine {
    pub fn new(config: PageRankConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PageRankConfig {
        &self.config
    }

    pub fn rank(&self, adjacency: &AffinityAdjacency) -> PageRankScores {
        let graph = adjacency.graph();
        let n = graph.node_count();
        if n == 0 {
            return PageRankScores {
                converged: true,
                ..Default::default()
            };
        }

        let out_weight: Vec<f64> = graph
            .node_indices()
            .map(|idx| {
                graph
                    .edges_directed(idx, Direction::Outgoing)
                    .map(|e| *e.weight() as f64)
                    .sum::<f64>()
            })
            .collect();

        let d = self.config.damping_factor;
        let size = n as f64;
        let mut ranks = vec![1.0 / size; n];
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.config.max_iterations {
            iterations += 1;

            let dangling: f64 = (0..n).filter(|&i| out_weight[i] == 0.0).map(|i| ranks[i]).sum();
            let base = (1.0 - d) / size + d * dangling / size;

            let next: Vec<f64> = graph
                .node_indices()
                .map(|idx| {
                    let incoming: f64 = graph
                        .edges_directed(idx, Direction::Incoming)
                        .filter(|e| out_weight[e.source().index()] > 0.0)
                        .map(|e| {
                            let source = e.source().index();
                            ranks[source] * *e.weight() as f64 / out_weight[source]
                        })
                        .sum();
                    base + d * incoming
                })
                .collect();

            let delta: f64 = next.iter().zip(&ranks).map(|(a, b)| (a - b).abs()).sum();
            ranks = next;

            if delta < self.config.tolerance {
                converged = true;
                break;
            }
        }

        if converged {
            debug!("PageRank over {} nodes converged after {} iterations", n, iterations);
        } else {
            warn!(
                "PageRank over {} nodes stopped at the {} iteration cap without converging",
                n, self.config.max_iterations
            );
        }

        PageRankScores {
            scores: graph
                .node_indices()
                .map(|idx| (graph[idx], ranks[idx.index()]))
                .collect(),
            iterations,
            converged,
        }
    }
}

impl Default for PageRankEngine {
    fn default() -> Self {
        Self::new(PageRankConfig::default())
    }
}
