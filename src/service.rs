//! Query-serving state: one embedder plus the live index snapshot.

use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use visearch_core::{EmbeddingIndex, Error, IndexConfig, IndexHandle, Result, SearchHit};
use visearch_ingest::{load_rgb, ImageEmbedder};
use visearch_storage::RecordStore;

pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub default_top_k: usize,
    pub embed_timeout: Duration,
    pub index: IndexConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_top_k: DEFAULT_TOP_K,
            embed_timeout: DEFAULT_EMBED_TIMEOUT,
            index: IndexConfig::default(),
        }
    }
}

/// Everything a query handler needs, built once at startup.
///
/// Share it behind an `Arc`; searches only read the current index snapshot
/// and the embedder, so any number of handlers can call in concurrently.
pub struct SearchService {
    embedder: Arc<dyn ImageEmbedder>,
    index: IndexHandle,
    config: ServiceConfig,
}

impl SearchService {
    /// Load the index from `store` and pair it with `embedder`.
    pub fn open(
        store: &RecordStore,
        embedder: Arc<dyn ImageEmbedder>,
        config: ServiceConfig,
    ) -> Result<Self> {
        let index = EmbeddingIndex::load(store, config.index.clone())?;
        Self::new(embedder, index, config)
    }

    /// Fails when the embedder and a non-empty index disagree on dimension.
    pub fn new(
        embedder: Arc<dyn ImageEmbedder>,
        index: EmbeddingIndex,
        config: ServiceConfig,
    ) -> Result<Self> {
        check_dimension(embedder.as_ref(), &index)?;
        info!(
            "Search service ready: {} products, model {}",
            index.len(),
            embedder.model_id()
        );
        Ok(Self {
            embedder,
            index: IndexHandle::new(index),
            config,
        })
    }

    #[inline]
    pub fn index(&self) -> &IndexHandle {
        &self.index
    }

    #[inline]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Rank against an already-computed query embedding.
    pub fn search_vector(&self, query: &[f32], top_k: Option<usize>) -> Result<Vec<SearchHit>> {
        let k = top_k.unwrap_or(self.config.default_top_k);
        self.index.engine().search(query, k)
    }

    /// Embed an image off the async runtime, bounded by the configured timeout.
    pub async fn embed_image(&self, image: DynamicImage) -> Result<Vec<f32>> {
        let embedder = self.embedder.clone();
        self.run_embedder(move || {
            embedder
                .embed(&image)
                .map_err(|e| Error::Embedding(e.to_string()))
        })
        .await
    }

    /// Decode and embed the image at `path`, then rank it.
    pub async fn search_image<P: AsRef<Path>>(
        &self,
        path: P,
        top_k: Option<usize>,
    ) -> Result<Vec<SearchHit>> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let embedder = self.embedder.clone();
        let query = self
            .run_embedder(move || {
                let image = load_rgb(&path).map_err(|e| {
                    Error::Embedding(format!("could not decode {}: {}", path.display(), e))
                })?;
                embedder
                    .embed(&image)
                    .map_err(|e| Error::Embedding(e.to_string()))
            })
            .await?;
        debug!("Query embedded ({} dims)", query.len());
        self.search_vector(&query, top_k)
    }

    /// Rebuild the index from `store` and swap it in.
    ///
    /// The replacement is checked against the embedder before it goes live;
    /// on any failure the current snapshot keeps serving.
    pub fn reload(&self, store: &RecordStore) -> Result<usize> {
        let fresh = EmbeddingIndex::load(store, self.config.index.clone())?;
        check_dimension(self.embedder.as_ref(), &fresh)?;
        let len = fresh.len();
        let previous = self.index.swap(fresh);
        info!("Index reloaded: {} -> {} products", previous.len(), len);
        Ok(len)
    }

    pub fn shutdown(self) {
        info!("Search service stopped");
    }

    async fn run_embedder<F>(&self, job: F) -> Result<Vec<f32>>
    where
        F: FnOnce() -> Result<Vec<f32>> + Send + 'static,
    {
        let timeout = self.config.embed_timeout;
        match tokio::time::timeout(timeout, tokio::task::spawn_blocking(job)).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(Error::Embedding(format!("embedding task failed: {join}"))),
            Err(_) => Err(Error::EmbeddingTimeout(timeout)),
        }
    }
}

fn check_dimension(embedder: &dyn ImageEmbedder, index: &EmbeddingIndex) -> Result<()> {
    match index.dim() {
        Some(dim) if dim != embedder.dimension() => Err(Error::DimensionMismatch {
            expected: dim,
            actual: embedder.dimension(),
        }),
        _ => Ok(()),
    }
}
