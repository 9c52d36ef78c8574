use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, info};

use super::affinity::AffinityGraphBuilder;
use super::confidence::VarianceConfidenceFilter;
use super::models::{ClassDocument, ClassFeatureIndex, FeatureCount, FeatureFrequency};
use super::pagerank::{PageRankEngine, PageRankScores};
use super::statistics::CorpusStatistics;
use crate::core::cache::VsmCache;
use crate::core::config::VsmConfig;
use crate::core::error::{Result, VsmError};
use crate::db::{Direction, EdgeType, GraphStore, Label, NodeId};


/// Builds weight vectors aligned with the global feature index.
pub struct VectorBuilder {
    store: Arc<dyn GraphStore>,
    cache: Arc<VsmCache>,
    statistics: CorpusStatistics,
    filter: VarianceConfidenceFilter,
    affinity: AffinityGraphBuilder,
    pagerank: PageRankEngine,
    affinity_scale: f64,
}

impl VectorBuilder {
    pub fn new(store: Arc<dyn GraphStore>, cache: Arc<VsmCache>, config: &VsmConfig) -> Self {
        Self {
            statistics: CorpusStatistics::new(Arc::clone(&store), Arc::clone(&cache)),
            filter: VarianceConfidenceFilter::new(
                Arc::clone(&store),
                Arc::clone(&cache),
                config.confidence_interval,
            ),
            affinity: AffinityGraphBuilder::new(Arc::clone(&store)),
            pagerank: PageRankEngine::new(config.pagerank()),
            affinity_scale: config.affinity_scale,
            store,
            cache,
        }
    }

    pub fn statistics(&self) -> &CorpusStatistics {
        &self.statistics
    }

    pub fn filter(&self) -> &VarianceConfidenceFilter {
        &self.filter
    }

    /// Confident Pattern ids ordered by descending `threshold`; ties keep store order.
    pub async fn feature_index(&self) -> Result<Arc<Vec<NodeId>>> {
        self.cache
            .global_feature_index(|| async {
                let patterns = self.store.nodes_with_label(Label::Pattern).await?;

                let mut ranked = Vec::with_capacity(patterns.len());
                for node in &patterns {
                    ranked.push((node.id, node.int_property("threshold")?));
                }
                ranked.sort_by(|a, b| b.1.cmp(&a.1));

                let ids: Vec<NodeId> = ranked.into_iter().map(|(id, _)| id).collect();
                let confident: Vec<NodeId> = self
                    .filter
                    .retain_confident(&ids)
                    .await?
                    .into_iter()
                    .map(|(id, _)| id)
                    .collect();

                info!("Global feature index: {} of {} patterns are confident", confident.len(), ids.len());
                Ok(Arc::new(confident))
            })
            .await
    }

    /// Every class with its confident features and their per-class frequency.
    pub async fn class_features(&self) -> Result<Arc<ClassFeatureIndex>> {
        self.cache
            .class_feature_index(|| async {
                let classes = self.store.nodes_with_label(Label::Class).await?;

                let documents = try_join_all(classes.iter().map(|class| async move {
                    let name = class.str_property("name")?;
                    let hops = self
                        .store
                        .traverse(class.id, EdgeType::HasClass, Direction::Incoming)
                        .await?;

                    let mut features = Vec::with_capacity(hops.len());
                    for hop in hops {
                        let variance = self.filter.match_distribution(hop.node).await?;
                        if self.filter.is_confident(variance) {
                            features.push(FeatureCount {
                                feature: hop.node,
                                frequency: hop.matches,
                            });
                        }
                    }

                    debug!("Class {:?}: {} confident features", name, features.len());
                    Ok::<_, VsmError>(ClassDocument::new(class.id, name, features))
                }))
                .await?;

                let index: ClassFeatureIndex = documents
                    .into_iter()
                    .map(|doc| (doc.name.clone(), doc))
                    .collect();
                Ok(Arc::new(index))
            })
            .await
    }


    pub fn frequency_vector(document: &ClassDocument, index: &[NodeId]) -> Vec<f64> {
        index
            .iter()
            .map(|&id| document.frequency_of(id).map_or(0.0, |f| f as f64))
            .collect()
    }


    pub fn binary_vector(document: &ClassDocument, index: &[NodeId]) -> Vec<f64> {
        index
            .iter()
            .map(|&id| if document.contains(id) { 1.0 } else { 0.0 })
            .collect()
    }


    pub async fn tfidf_vector(&self, document: &ClassDocument, index: &[NodeId]) -> Result<Vec<f64>> {
        let mut vector = Vec::with_capacity(index.len());
        for &id in index {
            if document.contains(id) {
                vector.push(self.statistics.tfidf(id, document.class_id).await?);
            } else {
                vector.push(0.0);
            }
        }
        Ok(vector)
    }

    /// Pairs raw matcher counts with each feature's match distribution,
    /// most frequent first; equal frequencies order by feature id.
    pub async fn feature_frequency_map(&self, matches: &HashMap<NodeId, u64>) -> Result<Vec<FeatureFrequency>> {
        let mut features: Vec<(NodeId, u64)> = matches.iter().map(|(&id, &count)| (id, count)).collect();
        features.sort_by_key(|(id, _)| *id);

        let mut results = Vec::with_capacity(features.len());
        for (feature, frequency) in features {
            results.push(FeatureFrequency {
                feature,
                frequency,
                variance: self.filter.match_distribution(feature).await?,
            });
        }

        results.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        Ok(results)
    }

    /// Affinity graph and PageRank over exactly `features`.
    pub async fn rank_features(&self, features: &[NodeId]) -> Result<PageRankScores> {
        let adjacency = self.affinity.build(features).await?;
        Ok(self.pagerank.rank(&adjacency))
    }

    /// Vector for ad hoc text: confident matched features get
    /// `((pagerank + variance) / 2) * affinity_scale`, everything else 0.
    pub async fn input_feature_vector(&self, features: &[FeatureFrequency], index: &[NodeId]) -> Result<Vec<f64>> {
        let retained: HashMap<NodeId, f64> = features
            .iter()
            .filter(|f| self.filter.is_confident(f.variance))
            .map(|f| (f.feature, f.variance))
            .collect();

        let candidates: Vec<NodeId> = features
            .iter()
            .map(|f| f.feature)
            .filter(|id| retained.contains_key(id))
            .collect();
        let scores = self.rank_features(&candidates).await?;

        debug!(
            "Input vector: {} of {} matched features retained, PageRank iterations {}",
            retained.len(),
            features.len(),
            scores.iterations
        );

        Ok(index
            .iter()
            .map(|&id| match retained.get(&id) {
                Some(&variance) => ((scores.get(id) + variance) / 2.0) * self.affinity_scale,
                None => 0.0,
            })
            .collect())
    }
}
