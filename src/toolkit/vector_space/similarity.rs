use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, VsmError};


pub fn dot_product(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(VsmError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    Ok(a.iter().zip(b).map(|(x, y)| x * y).sum())
}


pub fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// `dot(a, b) / (|a| * |b|)`.
///
/// Unequal lengths are an error. An all-zero vector yields NaN; callers
/// that rank by similarity drop it with their `> 0` filter.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Result<f64> {
    let dot = dot_product(a, b)?;
    Ok(dot / (norm(a) * norm(b)))
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SortOutcome {
    #[default]
    Sorted,
    /// `incomparable` items had no ordering key and trail the sorted ones in input order.
    PartiallyUnsorted { incomparable: usize },
}

impl SortOutcome {
    pub fn is_sorted(&self) -> bool {
        matches!(self, Self::Sorted)
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<T> {
    pub items: Vec<T>,
    pub outcome: SortOutcome,
}

impl<T> Ranked<T> {
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Stable descending sort on `key`. Items whose key is NaN cannot be placed
/// and are reported through [`SortOutcome::PartiallyUnsorted`].
pub fn rank_descending<T, F>(items: Vec<T>, key: F) -> Ranked<T>
where
    F: Fn(&T) -> f64,
{
    let (mut comparable, incomparable): (Vec<T>, Vec<T>) =
        items.into_iter().partition(|item| !key(item).is_nan());

    comparable.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));

    let outcome = if incomparable.is_empty() {
        SortOutcome::Sorted
    } else {
        SortOutcome::PartiallyUnsorted {
            incomparable: incomparable.len(),
        }
    };

    comparable.extend(incomparable);
    Ranked {
        items: comparable,
        outcome,
    }
}
