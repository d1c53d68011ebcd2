use crate::index::{EmbeddingIndex, IndexConfig, RecordSource};
use crate::search::SimilarityEngine;
use crate::Result;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// Shared owner of the live index snapshot.
///
/// Readers take an `Arc` to the current snapshot and search without holding
/// the lock. A reload builds the replacement off to the side and swaps it in
/// once it is complete, so in-flight queries keep the snapshot they started
/// with and a failed reload leaves the old one serving.
#[derive(Debug)]
pub struct IndexHandle {
    current: RwLock<Arc<EmbeddingIndex>>,
}

impl IndexHandle {
    pub fn new(index: EmbeddingIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    pub fn load<S: RecordSource + ?Sized>(source: &S, config: IndexConfig) -> Result<Self> {
        Ok(Self::new(EmbeddingIndex::load(source, config)?))
    }

    #[inline]
    pub fn snapshot(&self) -> Arc<EmbeddingIndex> {
        self.current.read().clone()
    }

    #[inline]
    pub fn engine(&self) -> SimilarityEngine {
        SimilarityEngine::new(self.snapshot())
    }

    /// Replace the live snapshot, returning the previous one.
    pub fn swap(&self, index: EmbeddingIndex) -> Arc<EmbeddingIndex> {
        let next = Arc::new(index);
        std::mem::replace(&mut *self.current.write(), next)
    }

    /// Rebuild from `source` using the current snapshot's config.
    pub fn reload<S: RecordSource + ?Sized>(&self, source: &S) -> Result<usize> {
        let config = self.snapshot().config().clone();
        let fresh = EmbeddingIndex::load(source, config)?;
        let len = fresh.len();
        let previous = self.swap(fresh);
        info!("Index reloaded: {} -> {} products", previous.len(), len);
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ProductRecord;
    use crate::vector::Vector;
    use crate::Error;
    use parking_lot::Mutex;

    struct Swappable(Mutex<Result<Vec<ProductRecord>>>);

    impl RecordSource for Swappable {
        fn list_all(&self) -> Result<Vec<ProductRecord>> {
            match &*self.0.lock() {
                Ok(records) => Ok(records.clone()),
                Err(_) => Err(Error::Storage("offline".to_string())),
            }
        }
    }

    fn record(id: u64, v: Vec<f32>) -> ProductRecord {
        ProductRecord::new(id, "n", "c", "p.jpg", Vector::new(v))
    }

    #[test]
    fn test_reload_swaps_and_keeps_old_snapshot_alive() {
        let source = Swappable(Mutex::new(Ok(vec![record(1, vec![1.0, 0.0])])));
        let handle = IndexHandle::load(&source, IndexConfig::default()).unwrap();

        let old_engine = handle.engine();
        *source.0.lock() = Ok(vec![record(1, vec![1.0, 0.0]), record(2, vec![0.0, 1.0])]);
        assert_eq!(handle.reload(&source).unwrap(), 2);

        assert_eq!(old_engine.index().len(), 1);
        assert_eq!(handle.snapshot().len(), 2);
        assert_eq!(old_engine.search(&[0.0, 1.0], 5).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_reload_keeps_current_snapshot() {
        let source = Swappable(Mutex::new(Ok(vec![record(5, vec![1.0])])));
        let handle = IndexHandle::load(&source, IndexConfig::default()).unwrap();

        *source.0.lock() = Err(Error::Storage("offline".to_string()));
        assert!(handle.reload(&source).is_err());
        assert_eq!(handle.snapshot().len(), 1);
        assert_eq!(handle.engine().search(&[2.0], 1).unwrap()[0].product.id, 5);
    }

    #[test]
    fn test_concurrent_readers_during_reload() {
        let source = Swappable(Mutex::new(Ok(
            (0..64u64).map(|i| record(i, vec![1.0, i as f32])).collect()
        )));
        let handle = Arc::new(IndexHandle::load(&source, IndexConfig::default()).unwrap());

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let handle = handle.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let hits = handle.engine().search(&[1.0, 3.0], 5).unwrap();
                        assert_eq!(hits.len(), 5);
                    }
                })
            })
            .collect();

        for _ in 0..20 {
            handle.reload(&source).unwrap();
        }
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
