use std::sync::Arc;

use tracing::debug;

use crate::core::cache::VsmCache;
use crate::core::error::Result;
use crate::db::{Direction, EdgeType, GraphStore, NodeId};


/// Sample standard deviation of `weights` after normalizing them by their sum.
///
/// Fewer than two weights give [`crate::DEFAULT_VARIANCE`]. All-zero weights give NaN.
pub fn normalized_std_dev(weights: &[f64]) -> f64 {
    if weights.len() < 2 {
        return crate::DEFAULT_VARIANCE;
    }

    let sum: f64 = weights.iter().sum();
    let n = weights.len() as f64;
    let normalized: Vec<f64> = weights.iter().map(|w| w / sum).collect();
    let mean = normalized.iter().sum::<f64>() / n;
    let squares: f64 = normalized.iter().map(|x| (x - mean).powi(2)).sum();

    (squares / (n - 1.0)).sqrt()
}


pub struct VarianceConfidenceFilter {
    store: Arc<dyn GraphStore>,
    cache: Arc<VsmCache>,
    confidence_interval: f64,
}

impl VarianceConfidenceFilter {
    pub fn new(store: Arc<dyn GraphStore>, cache: Arc<VsmCache>, confidence_interval: f64) -> Self {
        Self {
            store,
            cache,
            confidence_interval,
        }
    }

    pub fn confidence_interval(&self) -> f64 {
        self.confidence_interval
    }

    /// Spread of the feature's `matches` across the classes it was observed in.
    pub async fn match_distribution(&self, feature: NodeId) -> Result<f64> {
        self.cache
            .match_distribution(feature, || async {
                let hops = self
                    .store
                    .traverse(feature, EdgeType::HasClass, Direction::Outgoing)
                    .await?;
                let weights: Vec<f64> = hops.iter().map(|h| h.matches as f64).collect();
                let variance = normalized_std_dev(&weights);
                debug!("Match distribution for feature {}: {:.4} over {} classes", feature, variance, weights.len());
                Ok(variance)
            })
            .await
    }

    pub fn is_confident(&self, variance: f64) -> bool {
        variance > self.confidence_interval
    }

    /// Keeps the confident features in input order, paired with their variance.
    pub async fn retain_confident(&self, features: &[NodeId]) -> Result<Vec<(NodeId, f64)>> {
        let mut retained = Vec::with_capacity(features.len());
        for &feature in features {
            let variance = self.match_distribution(feature).await?;
            if self.is_confident(variance) {
                retained.push((feature, variance));
            }
        }
        Ok(retained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Label, MemoryGraph};

    #[test]
    fn test_default_for_sparse_features() {
        assert_eq!(normalized_std_dev(&[]), 1.0);
        assert_eq!(normalized_std_dev(&[42.0]), 1.0);
    }

    #[test]
    fn test_uniform_distribution_has_no_spread() {
        assert_eq!(normalized_std_dev(&[5.0, 5.0, 5.0]), 0.0);
    }

    #[test]
    fn test_skewed_distribution() {
        // normalized [0.9, 0.1]: mean 0.5, sample variance 0.32
        let spread = normalized_std_dev(&[9.0, 1.0]);
        assert!((spread - 0.32f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_zero_weights_are_nan() {
        assert!(normalized_std_dev(&[0.0, 0.0]).is_nan());
    }

    #[tokio::test]
    async fn test_retain_confident() {
        let graph = Arc::new(
            MemoryGraph::from_json(
                r#"{
                    "classes": ["A", "B", "C"],
                    "patterns": [
                        {"phrase": "rare", "matches": {"A": 2}},
                        {"phrase": "even", "matches": {"A": 3, "B": 3, "C": 3}},
                        {"phrase": "skewed", "matches": {"A": 9, "B": 1}},
                        {"phrase": "unseen"}
                    ]
                }"#,
            )
            .unwrap(),
        );
        let filter = VarianceConfidenceFilter::new(graph.clone(), Arc::new(VsmCache::new(64)), crate::CONFIDENCE_INTERVAL);

        let mut ids = Vec::new();
        for phrase in ["rare", "even", "skewed", "unseen"] {
            ids.push(graph.find_node(Label::Pattern, "phrase", phrase).await.unwrap().unwrap().id);
        }

        let retained = filter.retain_confident(&ids).await.unwrap();
        let kept: Vec<NodeId> = retained.iter().map(|(id, _)| *id).collect();
        assert_eq!(kept, vec![ids[0], ids[2], ids[3]]);
        assert_eq!(retained[0].1, 1.0);
        assert_eq!(retained[2].1, 1.0);
    }
}
