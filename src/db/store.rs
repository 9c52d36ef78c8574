use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString, IntoStaticStr};

use crate::core::error::{Result, VsmError};


pub type NodeId = u64;


pub type Properties = Map<String, Value>;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr)]
pub enum Label {
    Class,
    Pattern,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    /// Feature -> Class, carries the per-class occurrence count.
    HasClass,
    /// Feature <-> Feature, carries co-occurrence strength.
    HasAffinity,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub label: Label,
    pub properties: Properties,
}

impl Node {
    pub fn new(id: NodeId, label: Label) -> Self {
        Self {
            id,
            label,
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn str_property(&self, key: &str) -> Result<&str> {
        self.properties
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| VsmError::missing_property(self.id, key))
    }

    pub fn int_property(&self, key: &str) -> Result<i64> {
        self.properties
            .get(key)
            .and_then(Value::as_i64)
            .ok_or_else(|| VsmError::missing_property(self.id, key))
    }
}


/// One traversed relationship: the node at the far end and the edge's `matches`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hop {
    pub node: NodeId,
    pub matches: u64,
}


/// Read-only view of the corpus graph.
///
/// Each call is one short read scope on the store. Nothing in this crate
/// writes through this trait.
#[async_trait]
pub trait GraphStore: Send + Sync {

    async fn nodes_with_label(&self, label: Label) -> Result<Vec<Node>>;


    async fn count_label(&self, label: Label) -> Result<u64> {
        Ok(self.nodes_with_label(label).await?.len() as u64)
    }


    async fn find_node(&self, label: Label, property: &str, value: &str) -> Result<Option<Node>> {
        Ok(self
            .nodes_with_label(label)
            .await?
            .into_iter()
            .find(|n| n.properties.get(property).and_then(Value::as_str) == Some(value)))
    }

    /// One hop over `edge` from `id`. `Both` yields outgoing hops first.
    async fn traverse(&self, id: NodeId, edge: EdgeType, direction: Direction) -> Result<Vec<Hop>>;
}


#[async_trait]
pub trait PatternMatcher: Send + Sync {

    async fn match_features(&self, text: &str) -> Result<HashMap<NodeId, u64>>;
}


#[async_trait]
pub trait NodePropertyCache: Send + Sync {

    async fn resolve(&self, id: NodeId) -> Result<Properties>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_type_names() {
        assert_eq!(EdgeType::HasClass.to_string(), "HAS_CLASS");
        assert_eq!("HAS_AFFINITY".parse::<EdgeType>().unwrap(), EdgeType::HasAffinity);
        assert_eq!(Label::Pattern.to_string(), "Pattern");
    }

    #[test]
    fn test_node_properties() {
        let node = Node::new(3, Label::Pattern)
            .with_property("phrase", "world cup")
            .with_property("threshold", 7);

        assert_eq!(node.str_property("phrase").unwrap(), "world cup");
        assert_eq!(node.int_property("threshold").unwrap(), 7);
        assert!(matches!(
            node.str_property("name"),
            Err(VsmError::MissingProperty { node: 3, .. })
        ));
    }
}
