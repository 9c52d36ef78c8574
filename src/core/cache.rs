use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};
use tokio::sync::OnceCell;
use tracing::debug;

use super::error::Result;
use super::events::{EventBus, GraphMutation, GRAPH_MUTATED};
use crate::db::NodeId;
use crate::toolkit::vector_space::ClassFeatureIndex;


/// Frequency of each observed feature within one class.
pub type TermFrequencyMap = HashMap<NodeId, u64>;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheKind {
    GlobalDocumentSize,
    TermDocumentFrequency,
    DocumentSizeFeature,
    FeatureMatchDistribution,
    ClassFeatureIndex,
    GlobalFeatureIndex,
}


#[derive(Debug, Default, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub hit_rate: f64,
    pub entries: BTreeMap<String, usize>,
}


struct Slot<K, V> {
    kind: CacheKind,
    entries: Mutex<LruCache<K, Arc<OnceCell<V>>>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> Slot<K, V>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
{
    fn new(kind: CacheKind, capacity: usize) -> Self {
        Self {
            kind,
            entries: Mutex::new(LruCache::unbounded()),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Concurrent misses on the same key share one `init`; a failed `init`
    /// leaves the entry empty for the next caller.
    async fn get_or_try_init<F, Fut>(&self, key: K, init: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let cell = {
            let mut entries = self.entries.lock();
            match entries.get(&key) {
                Some(cell) => Arc::clone(cell),
                None => {
                    while entries.len() >= self.capacity {
                        if entries.pop_lru().is_none() {
                            break;
                        }
                    }
                    let cell = Arc::new(OnceCell::new());
                    entries.put(key.clone(), Arc::clone(&cell));
                    cell
                }
            }
        };

        if let Some(value) = cell.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Cache miss: {} {:?}", self.kind, key);

        cell.get_or_try_init(init).await.cloned()
    }

    fn invalidate(&self, key: &K) {
        if self.entries.lock().pop(key).is_some() {
            debug!("Invalidated {} {:?}", self.kind, key);
        }
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}


/// Memoization for every store-derived value the engine computes.
///
/// One strongly typed slot per [`CacheKind`]. Entries live until evicted by
/// the capacity bound or dropped by [`VsmCache::invalidate`].
pub struct VsmCache {
    document_size: Slot<(), u64>,
    term_frequencies: Slot<NodeId, Arc<TermFrequencyMap>>,
    feature_document_size: Slot<NodeId, u64>,
    match_distribution: Slot<NodeId, f64>,
    class_feature_index: Slot<(), Arc<ClassFeatureIndex>>,
    global_feature_index: Slot<(), Arc<Vec<NodeId>>>,
}

impl VsmCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            document_size: Slot::new(CacheKind::GlobalDocumentSize, capacity),
            term_frequencies: Slot::new(CacheKind::TermDocumentFrequency, capacity),
            feature_document_size: Slot::new(CacheKind::DocumentSizeFeature, capacity),
            match_distribution: Slot::new(CacheKind::FeatureMatchDistribution, capacity),
            class_feature_index: Slot::new(CacheKind::ClassFeatureIndex, capacity),
            global_feature_index: Slot::new(CacheKind::GlobalFeatureIndex, capacity),
        }
    }

    pub async fn document_size<F, Fut>(&self, init: F) -> Result<u64>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<u64>>,
    {
        self.document_size.get_or_try_init((), init).await
    }

    pub async fn term_frequencies<F, Fut>(&self, class: NodeId, init: F) -> Result<Arc<TermFrequencyMap>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<TermFrequencyMap>>>,
    {
        self.term_frequencies.get_or_try_init(class, init).await
    }

    pub async fn feature_document_size<F, Fut>(&self, feature: NodeId, init: F) -> Result<u64>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<u64>>,
    {
        self.feature_document_size.get_or_try_init(feature, init).await
    }

    pub async fn match_distribution<F, Fut>(&self, feature: NodeId, init: F) -> Result<f64>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<f64>>,
    {
        self.match_distribution.get_or_try_init(feature, init).await
    }

    pub async fn class_feature_index<F, Fut>(&self, init: F) -> Result<Arc<ClassFeatureIndex>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<ClassFeatureIndex>>>,
    {
        self.class_feature_index.get_or_try_init((), init).await
    }

    pub async fn global_feature_index<F, Fut>(&self, init: F) -> Result<Arc<Vec<NodeId>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<Vec<NodeId>>>>,
    {
        self.global_feature_index.get_or_try_init((), init).await
    }

    /// Drops every entry whose value depends on the mutated part of the graph.
    pub fn invalidate(&self, mutation: &GraphMutation) {
        match *mutation {
            GraphMutation::ClassAdded { class } => {
                self.document_size.clear();
                self.term_frequencies.invalidate(&class);
                self.class_feature_index.clear();
            }
            GraphMutation::PatternAdded { feature } => {
                self.feature_document_size.invalidate(&feature);
                self.match_distribution.invalidate(&feature);
                self.global_feature_index.clear();
            }
            GraphMutation::ClassEdgeChanged { feature, class } => {
                self.term_frequencies.invalidate(&class);
                self.feature_document_size.invalidate(&feature);
                self.match_distribution.invalidate(&feature);
                self.class_feature_index.clear();
                self.global_feature_index.clear();
            }
            // Affinity adjacency is rebuilt per query and never cached.
            GraphMutation::AffinityEdgeChanged { .. } => {}
        }
    }

    pub fn clear(&self) {
        self.document_size.clear();
        self.term_frequencies.clear();
        self.feature_document_size.clear();
        self.match_distribution.clear();
        self.class_feature_index.clear();
        self.global_feature_index.clear();
    }

    /// Invalidates on every `graph.mutated` event published on `bus`.
    pub async fn subscribe(self: &Arc<Self>, bus: &EventBus) {
        let cache = Arc::clone(self);
        bus.register(
            GRAPH_MUTATED,
            Arc::new(move |event| {
                if let Some(mutation) = GraphMutation::from_event(&event) {
                    cache.invalidate(&mutation);
                }
            }),
        )
        .await;
    }

    pub fn len(&self, kind: CacheKind) -> usize {
        match kind {
            CacheKind::GlobalDocumentSize => self.document_size.len(),
            CacheKind::TermDocumentFrequency => self.term_frequencies.len(),
            CacheKind::DocumentSizeFeature => self.feature_document_size.len(),
            CacheKind::FeatureMatchDistribution => self.match_distribution.len(),
            CacheKind::ClassFeatureIndex => self.class_feature_index.len(),
            CacheKind::GlobalFeatureIndex => self.global_feature_index.len(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let counters = [
            (&self.document_size.hits, &self.document_size.misses),
            (&self.term_frequencies.hits, &self.term_frequencies.misses),
            (&self.feature_document_size.hits, &self.feature_document_size.misses),
            (&self.match_distribution.hits, &self.match_distribution.misses),
            (&self.class_feature_index.hits, &self.class_feature_index.misses),
            (&self.global_feature_index.hits, &self.global_feature_index.misses),
        ];
        let hits: u64 = counters.iter().map(|(h, _)| h.load(Ordering::Relaxed)).sum();
        let misses: u64 = counters.iter().map(|(_, m)| m.load(Ordering::Relaxed)).sum();
        let total = hits + misses;

        let entries: BTreeMap<String, usize> = CacheKind::iter()
            .map(|kind| (kind.to_string(), self.len(kind)))
            .collect();

        CacheStats {
            hits,
            misses,
            size: entries.values().sum(),
            hit_rate: if total > 0 { hits as f64 / total as f64 } else { 0.0 },
            entries,
        }
    }
}

impl Default for VsmCache {
    fn default() -> Self {
        Self::new(crate::DEFAULT_CACHE_CAPACITY)
    }
}
