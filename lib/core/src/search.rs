use crate::index::{EmbeddingIndex, EmptyIndexPolicy};
use crate::record::ProductInfo;
use crate::vector::Vector;
use crate::{Error, Result};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

/// One ranked match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub product: ProductInfo,
    pub score: f32,
}

/// Heap entry ordered so that the *worst* candidate is the maximum.
/// Lower score is worse; on equal score the higher id is worse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Candidate {
    score: OrderedFloat<f32>,
    id: u64,
    pos: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Exhaustive cosine-similarity ranking over an [`EmbeddingIndex`].
///
/// Holds a shared snapshot, so cloning an engine is cheap and every clone
/// can serve queries concurrently.
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    index: Arc<EmbeddingIndex>,
}

impl SimilarityEngine {
    pub fn new(index: Arc<EmbeddingIndex>) -> Self {
        Self { index }
    }

    #[inline]
    pub fn index(&self) -> &EmbeddingIndex {
        &self.index
    }

    /// Rank every indexed product against `query` and return the best
    /// `top_k`, highest score first. Equal scores put the lower id first.
    ///
    /// `top_k` is clamped to `[1, index size]`.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let index = &*self.index;

        let dim = match index.dim() {
            Some(dim) => dim,
            None => {
                return match index.config().empty_policy {
                    EmptyIndexPolicy::EmptyResults => Ok(Vec::new()),
                    EmptyIndexPolicy::Reject | EmptyIndexPolicy::FailLoad => {
                        Err(Error::NoProductsIndexed)
                    }
                }
            }
        };

        if query.len() != dim {
            return Err(Error::DimensionMismatch {
                expected: dim,
                actual: query.len(),
            });
        }

        let query = Vector::from_slice(query);
        query.ensure_finite()?;
        let query = query.normalized();

        let scores = self.score_all(query.as_slice(), dim);
        let k = top_k.clamp(1, index.len());
        let products = index.products();

        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);
        for (pos, score) in scores.into_iter().enumerate() {
            let candidate = Candidate {
                score: OrderedFloat(score),
                id: products[pos].id,
                pos,
            };
            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(worst) = heap.peek() {
                if candidate < *worst {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }

        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| SearchHit {
                product: products[c.pos].clone(),
                score: c.score.into_inner(),
            })
            .collect())
    }

    fn score_all(&self, query: &[f32], dim: usize) -> Vec<f32> {
        let matrix = self.index.matrix();
        if self.index.len() >= self.index.config().parallel_threshold {
            matrix
                .par_chunks_exact(dim)
                .map(|row| crate::simd::dot(row, query))
                .collect()
        } else {
            matrix
                .chunks_exact(dim)
                .map(|row| crate::simd::dot(row, query))
                .collect()
        }
    }
}
