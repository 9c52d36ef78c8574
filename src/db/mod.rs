

pub mod matcher;
pub mod memory;
pub mod store;

pub use matcher::PhraseMatcher;
pub use memory::MemoryGraph;
pub use store::{
    Direction, EdgeType, GraphStore, Hop, Label, Node, NodeId, NodePropertyCache, PatternMatcher,
    Properties,
};
