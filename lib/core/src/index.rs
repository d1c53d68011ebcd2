use crate::record::{ProductInfo, ProductRecord};
use crate::vector::normalize_in_place;
use crate::{Error, Result};
use ahash::AHashMap;
use tracing::{debug, info};

/// Row count above which the similarity scan fans out across rayon workers.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4096;

/// What to do when the store holds no records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyIndexPolicy {
    /// Load succeeds; every search reports `NoProductsIndexed`.
    #[default]
    Reject,
    /// Load itself fails with `EmptyIndex`.
    FailLoad,
    /// Searches against an empty index return no hits.
    EmptyResults,
}

/// Configuration for building an index
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub empty_policy: EmptyIndexPolicy,
    pub parallel_threshold: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            empty_policy: EmptyIndexPolicy::default(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

/// Anything that can hand over the full set of persisted records.
pub trait RecordSource {
    fn list_all(&self) -> Result<Vec<ProductRecord>>;
}

/// Dense, read-only snapshot of every indexed product.
///
/// Row `i` of the matrix is the unit-norm embedding of `products[i]`. The
/// index is never mutated after construction; reloading builds a new one.
#[derive(Debug)]
pub struct EmbeddingIndex {
    products: Vec<ProductInfo>,
    matrix: Vec<f32>,
    dim: usize,
    positions: AHashMap<u64, usize>,
    config: IndexConfig,
}

impl EmbeddingIndex {
    /// Read every record from `source` and stack them in list order.
    pub fn load<S: RecordSource + ?Sized>(source: &S, config: IndexConfig) -> Result<Self> {
        let records = source.list_all()?;
        let index = Self::from_records(records, config)?;
        info!(
            "Loaded {} products into embedding index (dim {})",
            index.len(),
            index.dim
        );
        Ok(index)
    }

    pub fn from_records(records: Vec<ProductRecord>, config: IndexConfig) -> Result<Self> {
        if records.is_empty() && config.empty_policy == EmptyIndexPolicy::FailLoad {
            return Err(Error::EmptyIndex);
        }

        let dim = records.first().map(|r| r.embedding.dim()).unwrap_or(0);
        let mut products = Vec::with_capacity(records.len());
        let mut matrix = Vec::with_capacity(records.len() * dim);
        let mut positions = AHashMap::with_capacity(records.len());

        for record in records {
            if record.embedding.is_empty() {
                return Err(Error::CorruptRecord {
                    id: record.id,
                    reason: "embedding has no components".to_string(),
                });
            }
            if record.embedding.dim() != dim {
                return Err(Error::CorruptRecord {
                    id: record.id,
                    reason: format!(
                        "embedding has {} components, index dimension is {}",
                        record.embedding.dim(),
                        dim
                    ),
                });
            }
            if !record.embedding.is_finite() {
                return Err(Error::CorruptRecord {
                    id: record.id,
                    reason: "embedding contains non-finite values".to_string(),
                });
            }
            if positions.insert(record.id, products.len()).is_some() {
                return Err(Error::CorruptRecord {
                    id: record.id,
                    reason: "duplicate id".to_string(),
                });
            }

            let (info, embedding) = record.into_parts();
            let start = matrix.len();
            matrix.extend_from_slice(embedding.as_slice());
            normalize_in_place(&mut matrix[start..]);
            products.push(info);
        }

        debug!("Built embedding matrix: {} rows x {} cols", products.len(), dim);

        Ok(Self {
            products,
            matrix,
            dim,
            positions,
            config,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Embedding dimension, or `None` for an empty index.
    #[inline]
    pub fn dim(&self) -> Option<usize> {
        if self.is_empty() {
            None
        } else {
            Some(self.dim)
        }
    }

    #[inline]
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    #[inline]
    pub fn products(&self) -> &[ProductInfo] {
        &self.products
    }

    /// Normalized embedding row at position `pos`.
    #[inline]
    pub fn row(&self, pos: usize) -> &[f32] {
        &self.matrix[pos * self.dim..(pos + 1) * self.dim]
    }

    #[inline]
    pub(crate) fn matrix(&self) -> &[f32] {
        &self.matrix
    }

    pub fn get(&self, id: u64) -> Option<(&ProductInfo, &[f32])> {
        self.positions
            .get(&id)
            .map(|&pos| (&self.products[pos], self.row(pos)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::Vector;

    struct Fixed(Vec<ProductRecord>);

    impl RecordSource for Fixed {
        fn list_all(&self) -> Result<Vec<ProductRecord>> {
            Ok(self.0.clone())
        }
    }

    fn record(id: u64, v: Vec<f32>) -> ProductRecord {
        ProductRecord::new(id, format!("p{id}"), "shoes", format!("img/{id}.jpg"), Vector::new(v))
    }

    #[test]
    fn test_load_preserves_order_and_normalizes() {
        let source = Fixed(vec![record(7, vec![3.0, 4.0]), record(2, vec![0.0, 2.0])]);
        let index = EmbeddingIndex::load(&source, IndexConfig::default()).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.dim(), Some(2));
        assert_eq!(index.products()[0].id, 7);
        assert_eq!(index.products()[1].id, 2);
        for pos in 0..index.len() {
            let n = crate::simd::norm(index.row(pos));
            assert!((n - 1.0).abs() < 1e-5);
        }
        let (info, row) = index.get(7).unwrap();
        assert_eq!(info.name, "p7");
        assert!((row[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_empty_policy() {
        let empty = Fixed(Vec::new());
        let index = EmbeddingIndex::load(&empty, IndexConfig::default()).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.dim(), None);

        let config = IndexConfig {
            empty_policy: EmptyIndexPolicy::FailLoad,
            ..IndexConfig::default()
        };
        assert!(matches!(
            EmbeddingIndex::load(&empty, config),
            Err(Error::EmptyIndex)
        ));
    }

    #[test]
    fn test_mixed_dimensions_are_corrupt() {
        let records = vec![record(1, vec![1.0, 0.0]), record(2, vec![1.0, 0.0, 0.0])];
        match EmbeddingIndex::from_records(records, IndexConfig::default()) {
            Err(Error::CorruptRecord { id, .. }) => assert_eq!(id, 2),
            other => panic!("expected CorruptRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let records = vec![record(1, vec![1.0, 0.0]), record(1, vec![0.0, 1.0])];
        assert!(matches!(
            EmbeddingIndex::from_records(records, IndexConfig::default()),
            Err(Error::CorruptRecord { id: 1, .. })
        ));
    }

    #[test]
    fn test_zero_dimension_rows_rejected() {
        let records = vec![record(3, Vec::new())];
        assert!(matches!(
            EmbeddingIndex::from_records(records, IndexConfig::default()),
            Err(Error::CorruptRecord { id: 3, .. })
        ));
    }

    #[test]
    fn test_non_finite_rows_rejected() {
        let records = vec![record(4, vec![f32::NAN, 0.0])];
        assert!(matches!(
            EmbeddingIndex::from_records(records, IndexConfig::default()),
            Err(Error::CorruptRecord { id: 4, .. })
        ));
    }
}
