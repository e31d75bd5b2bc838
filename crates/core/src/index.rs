//! Exact in-memory nearest-neighbour index over passage embeddings.
//!
//! Distance is cosine distance, `1 - cos(a, b)`, in `[0, 2]`. On unit
//! vectors it ranks the same as Euclidean distance. Search is a full scan,
//! so results are exact and ties keep insertion order.

use crate::error::{EmbeddingError, IngestError, SearchError};
use crate::models::{Passage, ScoredPassage};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug)]
struct IndexEntry {
    passage: Passage,
    /// Unit-length copy of the embedding, or all zeros for a zero vector.
    unit: Vec<f32>,
}

/// Immutable once built; replace it wholesale to change its contents.
#[derive(Debug)]
pub struct VectorIndex {
    id: Uuid,
    model_id: String,
    dimensions: usize,
    entries: Vec<IndexEntry>,
    built_at: DateTime<Utc>,
}

impl VectorIndex {
    pub fn build(
        pairs: Vec<(Passage, Vec<f32>)>,
        model_id: impl Into<String>,
    ) -> Result<Self, IngestError> {
        let dimensions = match pairs.first() {
            Some((_, embedding)) => embedding.len(),
            None => {
                return Err(IngestError::EmptyIndex(
                    "no extractable text to index".to_string(),
                ))
            }
        };

        if dimensions == 0 {
            return Err(EmbeddingError::Backend("embeddings have zero dimensions".to_string()).into());
        }

        let mut entries = Vec::with_capacity(pairs.len());
        for (position, (passage, embedding)) in pairs.into_iter().enumerate() {
            if embedding.len() != dimensions {
                return Err(IngestError::DimensionMismatch {
                    position,
                    expected: dimensions,
                    actual: embedding.len(),
                });
            }
            if embedding.iter().any(|value| !value.is_finite()) {
                return Err(EmbeddingError::Backend(format!(
                    "embedding for passage {position} contains non-finite values"
                ))
                .into());
            }
            entries.push(IndexEntry {
                passage,
                unit: unit_vector(&embedding),
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            model_id: model_id.into(),
            dimensions,
            entries,
            built_at: Utc::now(),
        })
    }

    /// Returns up to `k` passages, nearest first.
    pub fn query(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredPassage>, SearchError> {
        if k == 0 {
            return Err(SearchError::InvalidArgument(
                "k must be a positive integer".to_string(),
            ));
        }
        if query_vector.len() != self.dimensions {
            return Err(SearchError::InvalidArgument(format!(
                "query vector has dimension {}, index has {}",
                query_vector.len(),
                self.dimensions
            )));
        }
        if query_vector.iter().any(|value| !value.is_finite()) {
            return Err(SearchError::InvalidArgument(
                "query vector contains non-finite values".to_string(),
            ));
        }

        let query = unit_vector(query_vector);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, cosine_distance(&query, &entry.unit)))
            .collect();

        // Stable sort: equal distances stay in insertion order.
        scored.sort_by(|left, right| left.1.total_cmp(&right.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(position, distance)| ScoredPassage {
                passage: self.entries[position].passage.clone(),
                distance,
            })
            .collect())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn passages(&self) -> impl Iterator<Item = &Passage> {
        self.entries.iter().map(|entry| &entry.passage)
    }
}

fn unit_vector(vector: &[f32]) -> Vec<f32> {
    let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if magnitude < f32::EPSILON {
        return vec![0.0; vector.len()];
    }
    vector.iter().map(|value| value / magnitude).collect()
}

/// Both inputs must already be unit length (or zero). A zero vector is
/// treated as orthogonal to everything.
fn cosine_distance(left: &[f32], right: &[f32]) -> f32 {
    let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    (1.0 - dot).clamp(0.0, 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn passage(index: usize, text: &str) -> Passage {
        Passage {
            index,
            char_start: index * 10,
            text: text.to_string(),
        }
    }

    fn sample_index() -> VectorIndex {
        VectorIndex::build(
            vec![
                (passage(0, "east"), vec![1.0, 0.0, 0.0]),
                (passage(1, "north"), vec![0.0, 1.0, 0.0]),
                (passage(2, "north-east"), vec![1.0, 1.0, 0.0]),
                (passage(3, "up"), vec![0.0, 0.0, 2.0]),
            ],
            "test-model",
        )
        .expect("index should build")
    }

    #[test]
    fn empty_build_is_rejected() {
        let result = VectorIndex::build(Vec::new(), "test-model");
        assert!(matches!(result, Err(IngestError::EmptyIndex(_))));
    }

    #[test]
    fn mixed_dimensions_are_rejected() {
        let result = VectorIndex::build(
            vec![
                (passage(0, "a"), vec![1.0, 0.0]),
                (passage(1, "b"), vec![1.0, 0.0, 0.0]),
            ],
            "test-model",
        );
        assert!(matches!(
            result,
            Err(IngestError::DimensionMismatch { position: 1, expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn exact_embedding_is_nearest() {
        let index = sample_index();
        let hits = index.query(&[0.0, 1.0, 0.0], 4).unwrap();

        assert_eq!(hits[0].passage.text, "north");
        assert!(hits[0].distance < 1e-6);
    }

    #[test]
    fn results_are_sorted_and_bounded_by_k() {
        let index = sample_index();
        let query = [0.9, 0.2, 0.1];

        for k in 1..=6 {
            let hits = index.query(&query, k).unwrap();
            assert_eq!(hits.len(), k.min(index.len()));
            assert!(hits.windows(2).all(|pair| pair[0].distance <= pair[1].distance));
        }

        let hits = index.query(&query, 2).unwrap();
        assert_eq!(hits[0].passage.text, "east");
        assert_eq!(hits[1].passage.text, "north-east");
    }

    #[test]
    fn magnitude_does_not_affect_ranking() {
        let index = sample_index();
        let hits = index.query(&[0.0, 0.0, 0.001], 1).unwrap();
        assert_eq!(hits[0].passage.text, "up");
    }

    #[test]
    fn ties_keep_insertion_order() {
        let index = VectorIndex::build(
            vec![
                (passage(0, "first"), vec![1.0, 0.0]),
                (passage(1, "other"), vec![0.0, 1.0]),
                (passage(2, "second"), vec![2.0, 0.0]),
                (passage(3, "third"), vec![1.0, 0.0]),
            ],
            "test-model",
        )
        .unwrap();

        let hits = index.query(&[1.0, 0.0], 3).unwrap();
        let texts: Vec<_> = hits.iter().map(|hit| hit.passage.text.as_str()).collect();
        assert_eq!(texts, ["first", "second", "third"]);
    }

    #[test]
    fn zero_k_is_invalid() {
        let index = sample_index();
        assert!(matches!(
            index.query(&[1.0, 0.0, 0.0], 0),
            Err(SearchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn wrong_query_dimension_is_invalid() {
        let index = sample_index();
        assert!(matches!(
            index.query(&[1.0, 0.0], 1),
            Err(SearchError::InvalidArgument(_))
        ));
        assert!(matches!(
            index.query(&[f32::NAN, 0.0, 0.0], 1),
            Err(SearchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn zero_query_vector_returns_everything_in_order() {
        let index = sample_index();
        let hits = index.query(&[0.0, 0.0, 0.0], 10).unwrap();
        let order: Vec<_> = hits.iter().map(|hit| hit.passage.index).collect();
        assert_eq!(order, [0, 1, 2, 3]);
    }

    #[test]
    fn metadata_is_exposed() {
        let index = sample_index();
        assert_eq!(index.len(), 4);
        assert!(!index.is_empty());
        assert_eq!(index.dimensions(), 3);
        assert_eq!(index.model_id(), "test-model");
        assert_eq!(index.passages().count(), 4);
    }

    /// Embeddings of one shared dimension plus a query and `k`.
    fn index_and_query() -> impl Strategy<Value = (Vec<Vec<f32>>, Vec<f32>, usize)> {
        (1usize..8).prop_flat_map(|dimensions| {
            (
                prop::collection::vec(prop::collection::vec(-10.0f32..10.0, dimensions), 1..40),
                prop::collection::vec(-10.0f32..10.0, dimensions),
                1usize..60,
            )
        })
    }

    proptest! {
        #[test]
        fn query_is_bounded_by_k_and_sorted((embeddings, query, k) in index_and_query()) {
            let count = embeddings.len();
            let pairs = embeddings
                .into_iter()
                .enumerate()
                .map(|(position, embedding)| (passage(position, "text"), embedding))
                .collect();
            let index = VectorIndex::build(pairs, "test-model").unwrap();

            let hits = index.query(&query, k).unwrap();
            prop_assert_eq!(hits.len(), k.min(count));
            prop_assert!(hits.windows(2).all(|pair| pair[0].distance <= pair[1].distance));
            prop_assert!(hits.iter().all(|hit| (0.0..=2.0).contains(&hit.distance)));

            let mut seen: Vec<_> = hits.iter().map(|hit| hit.passage.index).collect();
            seen.sort_unstable();
            seen.dedup();
            prop_assert_eq!(seen.len(), hits.len());
        }
    }
}
