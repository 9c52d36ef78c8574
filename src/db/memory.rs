use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::{debug, info};

use super::store::{Direction, EdgeType, GraphStore, Hop, Label, Node, NodeId, NodePropertyCache, Properties};
use crate::core::error::{Result, VsmError};
use crate::core::events::{EventBus, GraphMutation};


#[derive(Debug, Clone, Copy)]
struct Edge {
    from: NodeId,
    to: NodeId,
    edge_type: EdgeType,
    matches: u64,
}

#[derive(Debug, Default)]
struct GraphData {
    nodes: BTreeMap<NodeId, Node>,
    edges: Vec<Edge>,
}


/// In-process property graph.
///
/// Every read takes the lock for the duration of one call only. The loading
/// methods exist to build a corpus; when a bus is attached each change is
/// published as a [`GraphMutation`].
pub struct MemoryGraph {
    data: RwLock<GraphData>,
    next_id: AtomicU64,
    bus: Option<Arc<EventBus>>,
}


#[derive(Debug, Deserialize)]
struct CorpusFile {
    classes: Vec<String>,
    #[serde(default)]
    patterns: Vec<CorpusPattern>,
    #[serde(default)]
    affinities: Vec<CorpusAffinity>,
}

#[derive(Debug, Deserialize)]
struct CorpusPattern {
    phrase: String,
    #[serde(default)]
    threshold: i64,
    #[serde(default)]
    matches: BTreeMap<String, u64>,
}

#[derive(Debug, Deserialize)]
struct CorpusAffinity {
    from: String,
    to: String,
    matches: u64,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(GraphData::default()),
            next_id: AtomicU64::new(0),
            bus: None,
        }
    }

    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Builds a graph from a corpus document:
    ///
    /// ```json
    /// {"classes": ["Sports"],
    ///  "patterns": [{"phrase": "goal", "threshold": 3, "matches": {"Sports": 4}}],
    ///  "affinities": [{"from": "goal", "to": "match", "matches": 2}]}
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let corpus: CorpusFile = serde_json::from_str(json)?;
        let graph = Self::new();

        let mut classes = HashMap::new();
        for name in &corpus.classes {
            classes.insert(name.as_str(), graph.insert_class(name).0);
        }

        let mut phrases = HashMap::new();
        for pattern in &corpus.patterns {
            let (id, _) = graph.insert_pattern(&pattern.phrase, pattern.threshold);
            phrases.insert(pattern.phrase.as_str(), id);

            for (class_name, matches) in &pattern.matches {
                let class = classes
                    .get(class_name.as_str())
                    .copied()
                    .ok_or_else(|| VsmError::ClassNotFound(class_name.clone()))?;
                graph.upsert_edge(id, class, EdgeType::HasClass, *matches);
            }
        }

        for affinity in &corpus.affinities {
            let lookup = |phrase: &str| {
                phrases
                    .get(phrase)
                    .copied()
                    .ok_or_else(|| VsmError::Store(format!("unknown phrase in affinity: {}", phrase)))
            };
            let (from, to) = (lookup(&affinity.from)?, lookup(&affinity.to)?);
            graph.upsert_edge(from, to, EdgeType::HasAffinity, affinity.matches);
        }

        info!(
            "Loaded corpus: {} classes, {} patterns, {} affinities",
            corpus.classes.len(),
            corpus.patterns.len(),
            corpus.affinities.len()
        );

        Ok(graph)
    }

    pub fn node_count(&self) -> usize {
        self.data.read().nodes.len()
    }

    pub async fn add_class(&self, name: &str) -> NodeId {
        let (id, mutation) = self.insert_class(name);
        self.publish(mutation).await;
        id
    }

    pub async fn add_pattern(&self, phrase: &str, threshold: i64) -> NodeId {
        let (id, mutation) = self.insert_pattern(phrase, threshold);
        self.publish(mutation).await;
        id
    }

    /// Sets the `matches` on the feature's HAS_CLASS edge, creating it if needed.
    pub async fn set_class_matches(&self, feature: NodeId, class: NodeId, matches: u64) {
        self.upsert_edge(feature, class, EdgeType::HasClass, matches);
        self.publish(GraphMutation::ClassEdgeChanged { feature, class }).await;
    }

    pub async fn set_affinity(&self, from: NodeId, to: NodeId, matches: u64) {
        self.upsert_edge(from, to, EdgeType::HasAffinity, matches);
        self.publish(GraphMutation::AffinityEdgeChanged { from, to }).await;
    }

    fn insert_class(&self, name: &str) -> (NodeId, GraphMutation) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let node = Node::new(id, Label::Class).with_property("name", name);
        self.data.write().nodes.insert(id, node);
        (id, GraphMutation::ClassAdded { class: id })
    }

    fn insert_pattern(&self, phrase: &str, threshold: i64) -> (NodeId, GraphMutation) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let node = Node::new(id, Label::Pattern)
            .with_property("phrase", phrase)
            .with_property("threshold", threshold);
        self.data.write().nodes.insert(id, node);
        (id, GraphMutation::PatternAdded { feature: id })
    }

    fn upsert_edge(&self, from: NodeId, to: NodeId, edge_type: EdgeType, matches: u64) {
        let mut data = self.data.write();
        let existing = data
            .edges
            .iter()
            .position(|e| e.from == from && e.to == to && e.edge_type == edge_type);
        match existing {
            Some(index) => data.edges[index].matches = matches,
            None => data.edges.push(Edge {
                from,
                to,
                edge_type,
                matches,
            }),
        }
    }

    async fn publish(&self, mutation: GraphMutation) {
        if let Some(bus) = &self.bus {
            debug!("Publishing graph mutation: {:?}", mutation);
            bus.emit(mutation.to_event()).await;
        }
    }
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn nodes_with_label(&self, label: Label) -> Result<Vec<Node>> {
        let data = self.data.read();
        Ok(data.nodes.values().filter(|n| n.label == label).cloned().collect())
    }

    async fn count_label(&self, label: Label) -> Result<u64> {
        let data = self.data.read();
        Ok(data.nodes.values().filter(|n| n.label == label).count() as u64)
    }

    async fn traverse(&self, id: NodeId, edge: EdgeType, direction: Direction) -> Result<Vec<Hop>> {
        let data = self.data.read();
        if !data.nodes.contains_key(&id) {
            return Err(VsmError::NodeNotFound(id));
        }

        let typed: Vec<&Edge> = data.edges.iter().filter(|e| e.edge_type == edge).collect();
        let mut hops = Vec::new();

        if matches!(direction, Direction::Outgoing | Direction::Both) {
            hops.extend(typed.iter().filter(|e| e.from == id).map(|e| Hop {
                node: e.to,
                matches: e.matches,
            }));
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            hops.extend(typed.iter().filter(|e| e.to == id).map(|e| Hop {
                node: e.from,
                matches: e.matches,
            }));
        }

        Ok(hops)
    }
}

#[async_trait]
impl NodePropertyCache for MemoryGraph {
    async fn resolve(&self, id: NodeId) -> Result<Properties> {
        self.data
            .read()
            .nodes
            .get(&id)
            .map(|n| n.properties.clone())
            .ok_or(VsmError::NodeNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const CORPUS: &str = r#"{
        "classes": ["Sports", "Politics"],
        "patterns": [
            {"phrase": "goal", "threshold": 5, "matches": {"Sports": 4, "Politics": 1}},
            {"phrase": "vote", "threshold": 2, "matches": {"Politics": 6}}
        ],
        "affinities": [{"from": "goal", "to": "vote", "matches": 3}]
    }"#;

    #[tokio::test]
    async fn test_from_json() {
        let graph = MemoryGraph::from_json(CORPUS).unwrap();

        assert_eq!(graph.count_label(Label::Class).await.unwrap(), 2);
        assert_eq!(graph.count_label(Label::Pattern).await.unwrap(), 2);

        let sports = graph.find_node(Label::Class, "name", "Sports").await.unwrap().unwrap();
        let goal = graph.find_node(Label::Pattern, "phrase", "goal").await.unwrap().unwrap();

        let incoming = graph.traverse(sports.id, EdgeType::HasClass, Direction::Incoming).await.unwrap();
        assert_eq!(incoming, vec![Hop { node: goal.id, matches: 4 }]);

        let outgoing = graph.traverse(goal.id, EdgeType::HasClass, Direction::Outgoing).await.unwrap();
        assert_eq!(outgoing.len(), 2);
    }

    #[tokio::test]
    async fn test_traverse_both_directions() {
        let graph = MemoryGraph::from_json(CORPUS).unwrap();
        let vote = graph.find_node(Label::Pattern, "phrase", "vote").await.unwrap().unwrap();

        let hops = graph.traverse(vote.id, EdgeType::HasAffinity, Direction::Both).await.unwrap();
        assert_eq!(hops.len(), 1);
        assert_eq!(hops[0].matches, 3);

        let outgoing = graph.traverse(vote.id, EdgeType::HasAffinity, Direction::Outgoing).await.unwrap();
        assert!(outgoing.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_class_in_corpus() {
        let json = r#"{"classes": [], "patterns": [{"phrase": "x", "matches": {"Nope": 1}}]}"#;
        assert!(matches!(MemoryGraph::from_json(json), Err(VsmError::ClassNotFound(_))));
    }

    #[tokio::test]
    async fn test_mutations_are_published() {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        bus.register(
            crate::core::events::GRAPH_MUTATED,
            Arc::new(move |_event| {
                seen_clone.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .await;

        let graph = MemoryGraph::new().with_bus(bus);
        let class = graph.add_class("Sports").await;
        let feature = graph.add_pattern("goal", 1).await;
        graph.set_class_matches(feature, class, 2).await;
        graph.set_class_matches(feature, class, 5).await;

        assert_eq!(seen.load(Ordering::SeqCst), 4);
        let hops = graph.traverse(feature, EdgeType::HasClass, Direction::Outgoing).await.unwrap();
        assert_eq!(hops, vec![Hop { node: class, matches: 5 }]);
    }

    #[tokio::test]
    async fn test_resolve_properties() {
        let graph = MemoryGraph::from_json(CORPUS).unwrap();
        let goal = graph.find_node(Label::Pattern, "phrase", "goal").await.unwrap().unwrap();

        let props = graph.resolve(goal.id).await.unwrap();
        assert_eq!(props["phrase"], "goal");
        assert!(matches!(graph.resolve(999).await, Err(VsmError::NodeNotFound(999))));
    }
}
