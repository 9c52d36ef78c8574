use thiserror::Error;

use crate::db::NodeId;


#[derive(Error, Debug)]
pub enum VsmError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Graph store error: {0}")]
    Store(String),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Class not found: {0}")]
    ClassNotFound(String),

    #[error("Feature {feature} was never observed for class {class}")]
    MissingTerm { feature: NodeId, class: NodeId },

    #[error("Vectors must be of equal length ({left} != {right})")]
    LengthMismatch { left: usize, right: usize },

    #[error("Node {node} has no usable '{property}' property")]
    MissingProperty { node: NodeId, property: String },

    #[error("Pattern matcher error: {0}")]
    Matcher(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VsmError {
    pub fn missing_property(node: NodeId, property: impl Into<String>) -> Self {
        Self::MissingProperty {
            node,
            property: property.into(),
        }
    }
}

impl From<config::ConfigError> for VsmError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}


pub type Result<T> = std::result::Result<T, VsmError>;
