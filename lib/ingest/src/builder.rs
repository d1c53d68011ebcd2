use crate::embedder::{load_rgb, ImageEmbedder};
use crate::metadata::MetadataRow;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use visearch_core::{Error, ProductRecord, Result, Vector};
use visearch_storage::RecordStore;

/// Why a metadata row was left out of the store
#[derive(Error, Debug)]
pub enum SkipReason {
    #[error("no source image found (tried {})", .candidates.len())]
    MissingSourceImage { candidates: Vec<PathBuf> },

    #[error("could not decode {path:?}: {message}")]
    ImageDecodeFailure { path: PathBuf, message: String },

    #[error("embedder failed: {0}")]
    EmbeddingFailed(String),

    #[error("unusable embedding: {0}")]
    InvalidEmbedding(String),
}

impl SkipReason {
    pub fn kind(&self) -> &'static str {
        match self {
            SkipReason::MissingSourceImage { .. } => "missing_source_image",
            SkipReason::ImageDecodeFailure { .. } => "image_decode_failure",
            SkipReason::EmbeddingFailed(_) => "embedding_failed",
            SkipReason::InvalidEmbedding(_) => "invalid_embedding",
        }
    }
}

#[derive(Debug)]
pub struct RowFailure {
    pub id: u64,
    pub name: String,
    pub reason: SkipReason,
}

/// Outcome of one build run
#[derive(Debug, Default)]
pub struct BuildReport {
    pub indexed: usize,
    pub skipped: usize,
    pub failures: Vec<RowFailure>,
}

/// Populates a [`RecordStore`] from metadata rows.
///
/// Per-row problems (missing or undecodable images, embedder failures) are
/// recorded in the [`BuildReport`] and the batch carries on. Store errors
/// stop the run.
pub struct IndexBuilder {
    store: Arc<RecordStore>,
    embedder: Arc<dyn ImageEmbedder>,
}

impl IndexBuilder {
    pub fn new(store: Arc<RecordStore>, embedder: Arc<dyn ImageEmbedder>) -> Self {
        Self { store, embedder }
    }

    pub fn run<I>(&self, rows: I) -> Result<BuildReport>
    where
        I: IntoIterator<Item = MetadataRow>,
    {
        let expected = self.embedder.dimension();
        if expected == 0 {
            return Err(Error::InvalidConfig(format!(
                "embedder {} reports dimension 0",
                self.embedder.model_id()
            )));
        }
        if let Some(stored) = self.store.dimension()? {
            if stored != expected {
                return Err(Error::DimensionMismatch {
                    expected: stored,
                    actual: expected,
                });
            }
        }

        info!(
            "Building index with {} ({} dims)",
            self.embedder.model_id(),
            expected
        );

        let mut report = BuildReport::default();
        for row in rows {
            match self.prepare(&row) {
                Ok(record) => {
                    self.store.upsert(&record)?;
                    report.indexed += 1;
                    debug!("Indexed {} | {} | {}", record.id, record.name, record.category);
                }
                Err(reason) => {
                    warn!("Skipped {} ({}): {}", row.id, row.name, reason);
                    report.skipped += 1;
                    report.failures.push(RowFailure {
                        id: row.id,
                        name: row.name,
                        reason,
                    });
                }
            }
        }

        info!(
            "Build finished: indexed {}, skipped {}",
            report.indexed, report.skipped
        );
        Ok(report)
    }

    /// Locate, decode, embed and normalize a single row.
    pub fn prepare(&self, row: &MetadataRow) -> std::result::Result<ProductRecord, SkipReason> {
        let path = row
            .candidates
            .iter()
            .find(|p| p.is_file())
            .cloned()
            .ok_or_else(|| SkipReason::MissingSourceImage {
                candidates: row.candidates.clone(),
            })?;

        let image = load_rgb(&path).map_err(|e| SkipReason::ImageDecodeFailure {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let raw = self
            .embedder
            .embed(&image)
            .map_err(|e| SkipReason::EmbeddingFailed(e.to_string()))?;

        let expected = self.embedder.dimension();
        if raw.len() != expected {
            return Err(SkipReason::InvalidEmbedding(format!(
                "expected {} components, got {}",
                expected,
                raw.len()
            )));
        }

        let embedding = Vector::new(raw);
        embedding
            .ensure_finite()
            .map_err(|e| SkipReason::InvalidEmbedding(e.to_string()))?;

        Ok(ProductRecord::new(
            row.id,
            row.name.clone(),
            row.category.clone(),
            path,
            embedding.normalized(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::EmbedError;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::path::Path;

    /// Mean colour of the image as a 3-vector.
    struct MeanColor;

    impl ImageEmbedder for MeanColor {
        fn model_id(&self) -> &str {
            "mean-color"
        }

        fn dimension(&self) -> usize {
            3
        }

        fn embed(&self, image: &DynamicImage) -> std::result::Result<Vec<f32>, EmbedError> {
            let rgb = image.to_rgb8();
            let n = (rgb.width() * rgb.height()) as f32;
            let mut sum = [0f32; 3];
            for p in rgb.pixels() {
                for c in 0..3 {
                    sum[c] += f32::from(p.0[c]);
                }
            }
            Ok(sum.iter().map(|s| s / n).collect())
        }
    }

    struct Broken;

    impl ImageEmbedder for Broken {
        fn model_id(&self) -> &str {
            "broken"
        }

        fn dimension(&self) -> usize {
            3
        }

        fn embed(&self, _image: &DynamicImage) -> std::result::Result<Vec<f32>, EmbedError> {
            Ok(vec![f32::NAN, 0.0, 0.0])
        }
    }

    fn write_png(path: &Path, color: [u8; 3]) {
        RgbImage::from_pixel(4, 4, Rgb(color)).save(path).unwrap();
    }

    #[test]
    fn test_prepare_normalizes_and_uses_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordStore::open(dir.path().join("db")).unwrap());
        write_png(&dir.path().join("7.png"), [30, 40, 0]);

        let builder = IndexBuilder::new(store, Arc::new(MeanColor));
        let row = MetadataRow::with_conventional_candidates(7, "Cap", "Accessories", dir.path(), None);
        let record = builder.prepare(&row).unwrap();

        assert_eq!(record.image_path, dir.path().join("7.png"));
        assert!((record.embedding.norm() - 1.0).abs() < 1e-5);
        assert!((record.embedding.as_slice()[0] - 0.6).abs() < 1e-5);
    }

    #[test]
    fn test_row_failures_are_counted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordStore::open(dir.path().join("db")).unwrap());
        write_png(&dir.path().join("1.png"), [255, 0, 0]);
        std::fs::write(dir.path().join("2.jpg"), b"not an image").unwrap();

        let rows = vec![
            MetadataRow::with_conventional_candidates(1, "Red", "A", dir.path(), None),
            MetadataRow::with_conventional_candidates(2, "Corrupt", "A", dir.path(), None),
            MetadataRow::with_conventional_candidates(3, "Missing", "A", dir.path(), Some("nan")),
        ];
        let report = IndexBuilder::new(store.clone(), Arc::new(MeanColor))
            .run(rows)
            .unwrap();

        assert_eq!(report.indexed, 1);
        assert_eq!(report.skipped, 2);
        let kinds: Vec<&str> = report.failures.iter().map(|f| f.reason.kind()).collect();
        assert_eq!(kinds, vec!["image_decode_failure", "missing_source_image"]);
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.get(3).unwrap().is_none());
    }

    #[test]
    fn test_non_finite_embedding_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordStore::open(dir.path().join("db")).unwrap());
        write_png(&dir.path().join("1.png"), [1, 2, 3]);

        let rows = vec![MetadataRow::with_conventional_candidates(1, "x", "y", dir.path(), None)];
        let report = IndexBuilder::new(store.clone(), Arc::new(Broken)).run(rows).unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.failures[0].reason.kind(), "invalid_embedding");
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_embedder_dimension_must_match_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordStore::open(dir.path().join("db")).unwrap());
        store
            .upsert(&ProductRecord::new(1, "a", "b", "a.png", Vector::new(vec![1.0, 0.0])))
            .unwrap();

        let result = IndexBuilder::new(store, Arc::new(MeanColor)).run(Vec::new());
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    struct Hollow;

    impl ImageEmbedder for Hollow {
        fn model_id(&self) -> &str {
            "hollow"
        }

        fn dimension(&self) -> usize {
            0
        }

        fn embed(&self, _image: &DynamicImage) -> std::result::Result<Vec<f32>, EmbedError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_zero_dimension_embedder_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordStore::open(dir.path().join("db")).unwrap());
        write_png(&dir.path().join("1.png"), [1, 2, 3]);

        let rows = vec![MetadataRow::with_conventional_candidates(1, "x", "y", dir.path(), None)];
        let result = IndexBuilder::new(store.clone(), Arc::new(Hollow)).run(rows);

        assert!(matches!(result, Err(Error::InvalidConfig(_))));
        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(store.dimension().unwrap(), None);
    }
}
