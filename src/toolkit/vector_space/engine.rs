use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;
use serde_json::Value;
use tracing::{info, warn};

use super::models::{
    ClassDocument, ClassSimilarity, FeatureFrequency, PhraseAffinity, PhraseReport, SimilarClasses,
    SimilarityMatrix,
};
use super::similarity::{cosine_similarity, rank_descending, Ranked, SortOutcome};
use super::vectors::VectorBuilder;
use crate::core::cache::{CacheStats, VsmCache};
use crate::core::config::VsmConfig;
use crate::core::error::{Result, VsmError};
use crate::db::{GraphStore, NodeId, NodePropertyCache, PatternMatcher};
use crate::utils::{round_to, sort_case_insensitive};


/// Read-only classification and similarity queries over the corpus graph.
pub struct VectorSpaceModel {
    matcher: Arc<dyn PatternMatcher>,
    properties: Arc<dyn NodePropertyCache>,
    cache: Arc<VsmCache>,
    vectors: VectorBuilder,
    config: VsmConfig,
}

impl VectorSpaceModel {
    pub fn new(
        store: Arc<dyn GraphStore>,
        matcher: Arc<dyn PatternMatcher>,
        properties: Arc<dyn NodePropertyCache>,
        cache: Arc<VsmCache>,
        config: VsmConfig,
    ) -> Self {
        info!(
            "VectorSpaceModel initialized (confidence interval {}, damping {})",
            config.confidence_interval, config.damping_factor
        );
        Self {
            vectors: VectorBuilder::new(store, Arc::clone(&cache), &config),
            matcher,
            properties,
            cache,
            config,
        }
    }

    pub fn vectors(&self) -> &VectorBuilder {
        &self.vectors
    }

    pub fn config(&self) -> &VsmConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Matched features of `text` with their counts and match distribution, most frequent first.
    pub async fn feature_frequency_map(&self, text: &str) -> Result<Vec<FeatureFrequency>> {
        let matches = self.matcher.match_features(text).await?;
        self.vectors.feature_frequency_map(&matches).await
    }

    /// Phrases of a class ranked by `(pagerank + variance) / 2`, compared to two decimals.
    pub async fn phrases_for_class(&self, class_name: &str) -> Result<Vec<PhraseAffinity>> {
        let documents = self.vectors.class_features().await?;
        let document = documents
            .get(class_name)
            .ok_or_else(|| VsmError::ClassNotFound(class_name.to_string()))?;

        let features = document.feature_ids();
        let scores = self.vectors.rank_features(&features).await?;

        let mut phrases = Vec::with_capacity(features.len());
        for id in features {
            let variance = self.vectors.filter().match_distribution(id).await?;
            phrases.push(PhraseAffinity {
                feature: self.phrase(id).await?,
                affinity: (scores.get(id) + variance) / 2.0,
            });
        }

        let ranked = rank_descending(phrases, |p| round_to(p.affinity, 2));
        Ok(self.unwrap_ranked("phrases_for_class", ranked))
    }

    /// Every matched phrase of `text` with frequency, match distribution and
    /// its PageRank within the matched set, most frequent first.
    pub async fn phrases(&self, text: &str) -> Result<Vec<PhraseReport>> {
        let features = self.feature_frequency_map(text).await?;
        let ids: Vec<NodeId> = features.iter().map(|f| f.feature).collect();
        let scores = self.vectors.rank_features(&ids).await?;

        let mut reports = Vec::with_capacity(features.len());
        for f in features {
            reports.push(PhraseReport {
                feature: self.phrase(f.feature).await?,
                frequency: f.frequency,
                variance: f.variance,
                affinity: scores.get(f.feature),
            });
        }
        Ok(reports)
    }

    /// Pairwise cosine similarity of every class's frequency vector.
    pub async fn similarity_matrix(&self) -> Result<SimilarityMatrix> {
        let start = Instant::now();
        let documents = self.vectors.class_features().await?;
        let index = self.vectors.feature_index().await?;

        let mut classes: Vec<String> = documents.keys().cloned().collect();
        sort_case_insensitive(&mut classes);

        let rows: Vec<Vec<f64>> = classes
            .iter()
            .map(|name| VectorBuilder::frequency_vector(&documents[name], &index))
            .collect();

        let mut vectors = Vec::with_capacity(rows.len());
        for a in &rows {
            let mut row = Vec::with_capacity(rows.len());
            for b in &rows {
                row.push(round_to(cosine_similarity(a, b)?, self.config.matrix_decimals));
            }
            vectors.push(row);
        }

        info!(
            "Similarity matrix over {} classes and {} features in {:.2}ms",
            classes.len(),
            index.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(SimilarityMatrix { classes, vectors })
    }

    /// Classes resembling `class_name`: its frequency vector against every
    /// other class's binary vector. The class itself and non-positive
    /// similarities are left out.
    pub async fn similar_document_map_for_class(&self, class_name: &str) -> Result<SimilarClasses> {
        let documents = self.vectors.class_features().await?;
        let index = self.vectors.feature_index().await?;
        let document = documents
            .get(class_name)
            .ok_or_else(|| VsmError::ClassNotFound(class_name.to_string()))?;

        let query = VectorBuilder::frequency_vector(document, &index);

        let mut similarities = Vec::new();
        for (name, other) in documents.iter().filter(|(name, _)| name.as_str() != class_name) {
            let candidate = VectorBuilder::binary_vector(other, &index);
            similarities.push((name.clone(), cosine_similarity(&query, &candidate)?));
        }

        Ok(Self::similar_classes("similar_document_map_for_class", similarities))
    }

    /// Classes resembling ad hoc `text`: its affinity-blended vector against
    /// every class's TF-IDF vector. Non-positive similarities are left out.
    pub async fn similar_document_map_for_vector(&self, text: &str) -> Result<SimilarClasses> {
        let documents = self.vectors.class_features().await?;
        let index = self.vectors.feature_index().await?;

        let features = self.feature_frequency_map(text).await?;
        let query = self.vectors.input_feature_vector(&features, &index).await?;

        let weights = try_join_all(documents.values().map(|doc: &ClassDocument| {
            let index = Arc::clone(&index);
            async move {
                let vector = self.vectors.tfidf_vector(doc, &index).await?;
                Ok::<_, VsmError>((doc.name.clone(), vector))
            }
        }))
        .await?;

        let mut similarities = Vec::with_capacity(weights.len());
        for (name, vector) in weights {
            similarities.push((name, cosine_similarity(&query, &vector)?));
        }

        Ok(Self::similar_classes("similar_document_map_for_vector", similarities))
    }

    /// Ranks every similarity, then keeps the positive ones. NaN entries are
    /// dropped from `classes` but still counted in `ordering`.
    fn similar_classes(query: &str, similarities: Vec<(String, f64)>) -> SimilarClasses {
        let all: Vec<ClassSimilarity> = similarities
            .into_iter()
            .map(|(class, similarity)| ClassSimilarity { class, similarity })
            .collect();

        let ranked = rank_descending(all, |c| c.similarity);
        if let SortOutcome::PartiallyUnsorted { incomparable } = ranked.outcome {
            warn!("{}: {} similarities could not be ordered", query, incomparable);
        }

        let classes: Vec<ClassSimilarity> = ranked
            .items
            .into_iter()
            .filter(|c| c.similarity > 0.0)
            .collect();
        info!("{}: {} similar classes", query, classes.len());

        SimilarClasses {
            classes,
            ordering: ranked.outcome,
        }
    }

    fn unwrap_ranked<T>(&self, query: &str, ranked: Ranked<T>) -> Vec<T> {
        if let SortOutcome::PartiallyUnsorted { incomparable } = ranked.outcome {
            warn!("{}: {} results could not be ordered", query, incomparable);
        }
        ranked.into_items()
    }

    async fn phrase(&self, feature: NodeId) -> Result<String> {
        self.properties
            .resolve(feature)
            .await?
            .get("phrase")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| VsmError::missing_property(feature, "phrase"))
    }
}
