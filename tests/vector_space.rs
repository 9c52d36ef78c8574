use std::sync::Arc;

use vsmgraph::db::{GraphStore, Label, NodePropertyCache, PatternMatcher};
use vsmgraph::toolkit::vector_space::SortOutcome;
use vsmgraph::{EventBus, MemoryGraph, PhraseMatcher, VectorSpaceModel, VsmCache, VsmConfig, VsmError};

// goal: skewed toward the two sports classes, confident
// match, even: spread evenly, filtered as noise
// stock, rain: seen in one class only, confident
const CORPUS: &str = r#"{
    "classes": ["Sports", "Football", "Finance", "Weather"],
    "patterns": [
        {"phrase": "goal", "threshold": 5, "matches": {"Sports": 4, "Football": 4, "Finance": 1}},
        {"phrase": "stock", "threshold": 4, "matches": {"Finance": 6}},
        {"phrase": "match", "threshold": 3, "matches": {"Sports": 2, "Football": 2}},
        {"phrase": "rain", "threshold": 1, "matches": {"Weather": 5}},
        {"phrase": "even", "threshold": 0, "matches": {"Sports": 3, "Football": 3, "Finance": 3, "Weather": 3}}
    ],
    "affinities": [
        {"from": "goal", "to": "stock", "matches": 3}
    ]
}"#;

async fn model_for(graph: Arc<MemoryGraph>, cache: Arc<VsmCache>) -> VectorSpaceModel {
    let matcher: Arc<dyn PatternMatcher> = Arc::new(PhraseMatcher::from_store(graph.as_ref()).await.unwrap());
    let store: Arc<dyn GraphStore> = graph.clone();
    let properties: Arc<dyn NodePropertyCache> = graph;
    VectorSpaceModel::new(store, matcher, properties, cache, VsmConfig::default())
}

async fn model() -> VectorSpaceModel {
    let graph = Arc::new(MemoryGraph::from_json(CORPUS).unwrap());
    model_for(graph, Arc::new(VsmCache::new(1024))).await
}

async fn id_of(graph: &MemoryGraph, label: Label, property: &str, value: &str) -> u64 {
    graph.find_node(label, property, value).await.unwrap().unwrap().id
}

#[tokio::test]
async fn test_feature_index_orders_confident_patterns_by_threshold() {
    let graph = Arc::new(MemoryGraph::from_json(CORPUS).unwrap());
    let model = model_for(graph.clone(), Arc::new(VsmCache::new(1024))).await;

    let index = model.vectors().feature_index().await.unwrap();

    let expected = vec![
        id_of(&graph, Label::Pattern, "phrase", "goal").await,
        id_of(&graph, Label::Pattern, "phrase", "stock").await,
        id_of(&graph, Label::Pattern, "phrase", "rain").await,
    ];
    assert_eq!(*index, expected);
}

#[tokio::test]
async fn test_similarity_matrix() {
    let matrix = model().await.similarity_matrix().await.unwrap();

    assert_eq!(matrix.classes, vec!["Finance", "Football", "Sports", "Weather"]);
    assert_eq!(matrix.get("Sports", "Football"), Some(1.0));
    assert_eq!(matrix.get("Sports", "Weather"), Some(0.0));
    // [4, 0, 0] against [1, 6, 0]
    assert_eq!(matrix.get("Sports", "Finance"), Some(0.1644));

    for (i, row) in matrix.vectors.iter().enumerate() {
        assert_eq!(row[i], 1.0);
        for (j, value) in row.iter().enumerate() {
            assert_eq!(*value, matrix.vectors[j][i]);
        }
    }
}

#[tokio::test]
async fn test_similar_document_map_for_class() {
    let similar = model().await.similar_document_map_for_class("Sports").await.unwrap();

    assert_eq!(similar.names(), vec!["Football", "Finance"]);
    assert!((similar.classes[0].similarity - 1.0).abs() < 1e-12);
    assert!((similar.classes[1].similarity - 0.5f64.sqrt()).abs() < 1e-12);
    assert_eq!(similar.ordering, SortOutcome::Sorted);
}

#[tokio::test]
async fn test_similar_document_map_for_unknown_class() {
    let err = model().await.similar_document_map_for_class("Cooking").await.unwrap_err();
    assert!(matches!(err, VsmError::ClassNotFound(name) if name == "Cooking"));
}

#[tokio::test]
async fn test_similar_document_map_for_vector() {
    let similar = model()
        .await
        .similar_document_map_for_vector("A late goal, then another goal and the stock fell.")
        .await
        .unwrap();

    assert_eq!(similar.names(), vec!["Finance", "Football", "Sports"]);
    assert!(similar.classes.iter().all(|c| c.similarity > 0.0));
    assert_eq!(similar.classes[1].similarity, similar.classes[2].similarity);
}

#[tokio::test]
async fn test_similar_document_map_for_unmatched_text() {
    let similar = model().await.similar_document_map_for_vector("nothing relevant here").await.unwrap();
    assert!(similar.classes.is_empty());
    // an all-zero query vector has no defined cosine against any class
    assert_eq!(similar.ordering, SortOutcome::PartiallyUnsorted { incomparable: 4 });
}

#[tokio::test]
async fn test_feature_frequency_map() {
    let graph = Arc::new(MemoryGraph::from_json(CORPUS).unwrap());
    let model = model_for(graph.clone(), Arc::new(VsmCache::new(1024))).await;

    let features = model.feature_frequency_map("Goal! rain, goal, stock and a goal").await.unwrap();

    let ids: Vec<u64> = features.iter().map(|f| f.feature).collect();
    assert_eq!(
        ids,
        vec![
            id_of(&graph, Label::Pattern, "phrase", "goal").await,
            id_of(&graph, Label::Pattern, "phrase", "stock").await,
            id_of(&graph, Label::Pattern, "phrase", "rain").await,
        ]
    );
    assert_eq!(features[0].frequency, 3);
    assert_eq!(features[1].variance, 1.0);
}

#[tokio::test]
async fn test_phrases_for_class() {
    let phrases = model().await.phrases_for_class("Finance").await.unwrap();

    let names: Vec<&str> = phrases.iter().map(|p| p.feature.as_str()).collect();
    assert_eq!(names, vec!["stock", "goal"]);
    // two mutually linked features split the rank evenly
    assert!((phrases[0].affinity - 0.75).abs() < 1e-6);
}

#[tokio::test]
async fn test_phrases_include_filtered_features() {
    let phrases = model().await.phrases("match point, match ball, goal").await.unwrap();

    let names: Vec<&str> = phrases.iter().map(|p| p.feature.as_str()).collect();
    assert_eq!(names, vec!["match", "goal"]);
    assert_eq!(phrases[0].frequency, 2);
    assert_eq!(phrases[0].variance, 0.0);
    assert!(phrases.iter().all(|p| (0.0..=1.0).contains(&p.affinity)));
}

#[tokio::test]
async fn test_concurrent_queries_share_cache() {
    let model = model().await;

    let results = futures::future::join_all((0..8).map(|_| model.similarity_matrix())).await;

    let first = results[0].as_ref().unwrap();
    assert!(results.iter().all(|r| r.as_ref().unwrap() == first));
    assert!(model.cache_stats().hits > 0);
}

#[tokio::test]
async fn test_graph_mutation_refreshes_results() {
    let bus = Arc::new(EventBus::new());
    let graph = Arc::new(MemoryGraph::from_json(CORPUS).unwrap().with_bus(Arc::clone(&bus)));
    let cache = Arc::new(VsmCache::new(1024));
    cache.subscribe(&bus).await;
    let model = model_for(graph.clone(), cache).await;

    let before = model.similarity_matrix().await.unwrap();
    assert_eq!(before.get("Sports", "Weather"), Some(0.0));

    let rain = id_of(&graph, Label::Pattern, "phrase", "rain").await;
    let sports = id_of(&graph, Label::Class, "name", "Sports").await;
    graph.set_class_matches(rain, sports, 1).await;

    // Sports [4, 0, 1] against Weather [0, 0, 5]
    let after = model.similarity_matrix().await.unwrap();
    assert_eq!(after.get("Sports", "Weather"), Some(0.24254));
}

#[tokio::test]
async fn test_added_class_appears_after_mutation() {
    let bus = Arc::new(EventBus::new());
    let graph = Arc::new(MemoryGraph::from_json(CORPUS).unwrap().with_bus(Arc::clone(&bus)));
    let cache = Arc::new(VsmCache::new(1024));
    cache.subscribe(&bus).await;
    let model = model_for(graph.clone(), cache).await;

    assert_eq!(model.similarity_matrix().await.unwrap().classes.len(), 4);

    let arts = graph.add_class("Arts").await;
    let stock = id_of(&graph, Label::Pattern, "phrase", "stock").await;
    graph.set_class_matches(stock, arts, 1).await;

    let matrix = model.similarity_matrix().await.unwrap();
    assert_eq!(matrix.classes, vec!["Arts", "Finance", "Football", "Sports", "Weather"]);
    assert!(matrix.get("Arts", "Finance").unwrap() > 0.0);
}
