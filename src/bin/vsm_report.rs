

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vsmgraph::db::{GraphStore, NodePropertyCache, PatternMatcher};
use vsmgraph::{EventBus, MemoryGraph, PhraseMatcher, VectorSpaceModel, VsmCache, VsmConfig};

const USAGE: &str = "usage: vsm-report <corpus.json> (matrix | class <name> | text <input> | phrases <class>)";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("vsmgraph=warn".parse()?))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (corpus, command) = match args.split_first() {
        Some((corpus, command)) if !command.is_empty() => (PathBuf::from(corpus), command),
        _ => bail!(USAGE),
    };

    let config_path = std::env::var_os("VSM_CONFIG").map(PathBuf::from);
    let config = VsmConfig::load(config_path.as_deref())?;

    let json = std::fs::read_to_string(&corpus)
        .with_context(|| format!("reading corpus {}", corpus.display()))?;
    let bus = Arc::new(EventBus::new());
    let graph = Arc::new(MemoryGraph::from_json(&json)?.with_bus(Arc::clone(&bus)));
    info!("Loaded {} nodes from {}", graph.node_count(), corpus.display());

    let cache = Arc::new(VsmCache::new(config.cache_capacity));
    cache.subscribe(&bus).await;

    let matcher = Arc::new(PhraseMatcher::from_store(graph.as_ref()).await?);
    let store: Arc<dyn GraphStore> = graph.clone();
    let properties: Arc<dyn NodePropertyCache> = graph;
    let matcher: Arc<dyn PatternMatcher> = matcher;
    let model = VectorSpaceModel::new(store, matcher, properties, cache, config);

    let output = match (command[0].as_str(), command.get(1)) {
        ("matrix", None) => serde_json::to_string_pretty(&model.similarity_matrix().await?)?,
        ("class", Some(name)) => {
            serde_json::to_string_pretty(&model.similar_document_map_for_class(name).await?)?
        }
        ("text", Some(input)) => {
            serde_json::to_string_pretty(&model.similar_document_map_for_vector(input).await?)?
        }
        ("phrases", Some(class)) => serde_json::to_string_pretty(&model.phrases_for_class(class).await?)?,
        _ => bail!(USAGE),
    };
    println!("{}", output);

    info!("Cache after query: {:?}", model.cache_stats());
    Ok(())
}
