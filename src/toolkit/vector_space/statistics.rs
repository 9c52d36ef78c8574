use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::core::cache::{TermFrequencyMap, VsmCache};
use crate::core::error::{Result, VsmError};
use crate::db::{Direction, EdgeType, GraphStore, Label, NodeId};


/// `ln(document_size / document_frequency)`.
///
/// A zero document frequency yields `+inf` and is left to propagate.
pub fn inverse_document_frequency(document_size: u64, document_frequency: u64) -> f64 {
    (document_size as f64 / document_frequency as f64).ln()
}


/// Term and document frequency counts over the class corpus.
pub struct CorpusStatistics {
    store: Arc<dyn GraphStore>,
    cache: Arc<VsmCache>,
}

impl CorpusStatistics {
    pub fn new(store: Arc<dyn GraphStore>, cache: Arc<VsmCache>) -> Self {
        Self { store, cache }
    }

    /// Every feature with a HAS_CLASS edge into `class`, with that edge's `matches`.
    pub async fn term_frequency_map(&self, class: NodeId) -> Result<Arc<TermFrequencyMap>> {
        self.cache
            .term_frequencies(class, || async {
                let hops = self
                    .store
                    .traverse(class, EdgeType::HasClass, Direction::Incoming)
                    .await?;
                debug!("Term frequency map for class {}: {} features", class, hops.len());

                let map: TermFrequencyMap = hops.into_iter().map(|h| (h.node, h.matches)).collect();
                Ok(Arc::new(map))
            })
            .await
    }

    /// Fails with [`VsmError::MissingTerm`] when the feature was never observed for the class.
    pub async fn term_frequency(&self, feature: NodeId, class: NodeId) -> Result<u64> {
        self.term_frequency_map(class)
            .await?
            .get(&feature)
            .copied()
            .ok_or(VsmError::MissingTerm { feature, class })
    }


    pub async fn document_size(&self) -> Result<u64> {
        self.cache
            .document_size(|| async { self.store.count_label(Label::Class).await })
            .await
    }

    /// Number of distinct classes the feature reaches over one HAS_CLASS hop.
    pub async fn document_frequency(&self, feature: NodeId) -> Result<u64> {
        self.cache
            .feature_document_size(feature, || async {
                let hops = self
                    .store
                    .traverse(feature, EdgeType::HasClass, Direction::Outgoing)
                    .await?;
                let classes: HashSet<NodeId> = hops.into_iter().map(|h| h.node).collect();
                Ok(classes.len() as u64)
            })
            .await
    }


    pub async fn idf(&self, feature: NodeId) -> Result<f64> {
        let document_size = self.document_size().await?;
        let document_frequency = self.document_frequency(feature).await?;
        Ok(inverse_document_frequency(document_size, document_frequency))
    }


    pub async fn tfidf(&self, feature: NodeId, class: NodeId) -> Result<f64> {
        let tf = self.term_frequency(feature, class).await? as f64;
        let idf = self.idf(feature).await?;
        Ok(tf * idf)
    }
}
