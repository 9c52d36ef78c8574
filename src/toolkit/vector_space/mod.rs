

pub mod affinity;
pub mod confidence;
pub mod engine;
pub mod models;
pub mod pagerank;
pub mod similarity;
pub mod statistics;
pub mod vectors;

pub use affinity::{AffinityAdjacency, AffinityGraphBuilder};
pub use confidence::{normalized_std_dev, VarianceConfidenceFilter};
pub use engine::VectorSpaceModel;
pub use models::{
    ClassDocument, ClassFeatureIndex, ClassSimilarity, FeatureCount, FeatureFrequency,
    PhraseAffinity, PhraseReport, SimilarClasses, SimilarityMatrix,
};
pub use pagerank::{PageRankConfig, PageRankEngine, PageRankScores};
pub use similarity::{cosine_similarity, dot_product, norm, rank_descending, Ranked, SortOutcome};
pub use statistics::{inverse_document_frequency, CorpusStatistics};
pub use vectors::VectorBuilder;
