use std::collections::HashMap;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use super::store::{GraphStore, Label, NodeId, PatternMatcher};
use crate::core::error::Result;


/// Matches Pattern phrases as whole words, case-insensitively.
pub struct PhraseMatcher {
    patterns: Vec<(NodeId, Regex)>,
}

impl PhraseMatcher {
    pub fn new<'a>(phrases: impl IntoIterator<Item = (NodeId, &'a str)>) -> Self {
        let mut patterns = Vec::new();

        for (id, phrase) in phrases {
            let phrase = phrase.trim();
            if phrase.is_empty() {
                continue;
            }

            match Regex::new(&phrase_pattern(phrase)) {
                Ok(regex) => patterns.push((id, regex)),
                Err(e) => warn!("Skipping phrase {:?} for feature {}: {}", phrase, id, e),
            }
        }

        Self { patterns }
    }


    pub async fn from_store(store: &dyn GraphStore) -> Result<Self> {
        let nodes = store.nodes_with_label(Label::Pattern).await?;
        let phrases: Vec<(NodeId, &str)> = nodes
            .iter()
            .filter_map(|n| n.str_property("phrase").ok().map(|p| (n.id, p)))
            .collect();

        debug!("Compiled phrase matcher over {} patterns", phrases.len());
        Ok(Self::new(phrases))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Case-insensitive pattern for `phrase`, word-bounded on each side whose
/// edge character is a word character. `\b` next to `+` or `.` would demand
/// a word character beyond the phrase and never match.
fn phrase_pattern(phrase: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let start = if phrase.starts_with(is_word) { r"\b" } else { "" };
    let end = if phrase.ends_with(is_word) { r"\b" } else { "" };
    format!("(?i){}{}{}", start, regex::escape(phrase), end)
}

#[async_trait]
impl PatternMatcher for PhraseMatcher {
    async fn match_features(&self, text: &str) -> Result<HashMap<NodeId, u64>> {
        let mut counts = HashMap::new();

        for (id, regex) in &self.patterns {
            let hits = regex.find_iter(text).count() as u64;
            if hits > 0 {
                *counts.entry(*id).or_insert(0) += hits;
            }
        }

        Ok(counts)
    }
}
