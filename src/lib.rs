//! # visearch
//!
//! Visual product search: index product images as embedding vectors and
//! find the most similar products to a query image by cosine similarity.
//!
//! ## Quick Start
//!
//! ### From the command line
//!
//! ```bash
//! visearch build --metadata data/products_metadata.csv --images data/product_images
//! visearch check
//! visearch query shoe.jpg --top-k 5
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use visearch::prelude::*;
//!
//! # async fn run() -> visearch::Result<()> {
//! let store = Arc::new(RecordStore::open("data/products.db")?);
//! let embedder: Arc<dyn ImageEmbedder> = Arc::new(ThumbnailEmbedder::default());
//!
//! // Offline: fill the store
//! let rows = read_metadata_csv("data/products_metadata.csv", Path::new("data/product_images"))?;
//! let report = IndexBuilder::new(store.clone(), embedder.clone()).run(rows)?;
//! println!("indexed {}, skipped {}", report.indexed, report.skipped);
//!
//! // Online: load once, query many times
//! let service = SearchService::open(&store, embedder, ServiceConfig::default())?;
//! for hit in service.search_image("query.jpg", Some(5)).await? {
//!     println!("{} {} {:.3}", hit.product.id, hit.product.name, hit.score);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Structure
//!
//! - `visearch-core` - Codec, embedding index, similarity engine
//! - `visearch-storage` - LMDB record store
//! - `visearch-ingest` - Embedder trait and index builder

pub mod service;

// Re-export core types
pub use visearch_core::{
    codec, EmbeddingIndex, EmptyIndexPolicy, Error, ErrorBody, IndexConfig, IndexHandle,
    ProductInfo, ProductRecord, Result, SearchHit, SimilarityEngine, Vector,
};

// Re-export storage
pub use visearch_storage::{RecordStore, StoreConfig};

// Re-export ingestion
pub use visearch_ingest::{
    read_metadata_csv, BuildReport, EmbedError, ImageEmbedder, IndexBuilder, MetadataRow,
    SkipReason, ThumbnailEmbedder,
};

pub use service::{SearchService, ServiceConfig};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        read_metadata_csv, BuildReport, EmbeddingIndex, Error, ImageEmbedder, IndexBuilder,
        IndexConfig, MetadataRow, ProductRecord, RecordStore, Result, SearchHit, SearchService,
        ServiceConfig, SimilarityEngine, ThumbnailEmbedder, Vector,
    };
}
