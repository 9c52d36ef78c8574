use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::similarity::SortOutcome;
use crate::db::NodeId;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureCount {
    pub feature: NodeId,
    pub frequency: u64,
}


/// The confident features observed for one class, in traversal order.
#[derive(Debug, Clone)]
pub struct ClassDocument {
    pub class_id: NodeId,
    pub name: String,
    features: Vec<FeatureCount>,
    lookup: HashMap<NodeId, u64>,
}

impl ClassDocument {
    pub fn new(class_id: NodeId, name: impl Into<String>, features: Vec<FeatureCount>) -> Self {
        let lookup = features.iter().map(|f| (f.feature, f.frequency)).collect();
        Self {
            class_id,
            name: name.into(),
            features,
            lookup,
        }
    }

    pub fn features(&self) -> &[FeatureCount] {
        &self.features
    }

    pub fn feature_ids(&self) -> Vec<NodeId> {
        self.features.iter().map(|f| f.feature).collect()
    }

    pub fn frequency_of(&self, feature: NodeId) -> Option<u64> {
        self.lookup.get(&feature).copied()
    }

    pub fn contains(&self, feature: NodeId) -> bool {
        self.lookup.contains_key(&feature)
    }
}


/// Class name -> confident feature document.
pub type ClassFeatureIndex = BTreeMap<String, ClassDocument>;


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFrequency {
    pub feature: NodeId,
    pub frequency: u64,
    pub variance: f64,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseAffinity {
    pub feature: String,
    pub affinity: f64,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseReport {
    pub feature: String,
    pub frequency: u64,
    pub variance: f64,
    pub affinity: f64,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    pub classes: Vec<String>,
    pub vectors: Vec<Vec<f64>>,
}

impl SimilarityMatrix {
    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let i = self.classes.iter().position(|c| c == row)?;
        let j = self.classes.iter().position(|c| c == column)?;
        Some(self.vectors[i][j])
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSimilarity {
    pub class: String,
    pub similarity: f64,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarClasses {
    pub classes: Vec<ClassSimilarity>,
    /// Counts similarities that could not be ordered (NaN), including those
    /// left out of `classes`.
    #[serde(default, skip_serializing_if = "SortOutcome::is_sorted")]
    pub ordering: SortOutcome,
}

impl SimilarClasses {
    pub fn names(&self) -> Vec<&str> {
        self.classes.iter().map(|c| c.class.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_document_lookup() {
        let doc = ClassDocument::new(
            1,
            "Sports",
            vec![
                FeatureCount { feature: 10, frequency: 3 },
                FeatureCount { feature: 11, frequency: 1 },
            ],
        );

        assert_eq!(doc.frequency_of(10), Some(3));
        assert!(!doc.contains(12));
        assert_eq!(doc.feature_ids(), vec![10, 11]);
    }

    #[test]
    fn test_sorted_result_keeps_wire_shape() {
        let result = SimilarClasses {
            classes: vec![ClassSimilarity { class: "Arts".into(), similarity: 0.5 }],
            ordering: SortOutcome::Sorted,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({"classes": [{"class": "Arts", "similarity": 0.5}]}));
    }
}
