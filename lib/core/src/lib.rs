//! # visearch Core
//!
//! Core library for the visearch product image search engine.
//!
//! This crate provides the in-memory side of the system:
//!
//! - [`codec`] - Versioned binary encoding for embedding blobs
//! - [`Vector`] - Dense embedding with epsilon-guarded normalization
//! - [`ProductRecord`] - Product metadata plus its embedding
//! - [`EmbeddingIndex`] - Dense matrix of unit-norm embeddings
//! - [`SimilarityEngine`] - Exhaustive top-K cosine ranking
//! - [`IndexHandle`] - Swap-on-reload owner of the live index
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use visearch_core::{EmbeddingIndex, IndexConfig, ProductRecord, SimilarityEngine, Vector};
//!
//! let records = vec![
//!     ProductRecord::new(1, "Red shirt", "Apparel", "img/1.jpg", Vector::new(vec![1.0, 0.0])),
//!     ProductRecord::new(2, "Blue shirt", "Apparel", "img/2.jpg", Vector::new(vec![0.0, 1.0])),
//! ];
//! let index = EmbeddingIndex::from_records(records, IndexConfig::default()).unwrap();
//! let engine = SimilarityEngine::new(Arc::new(index));
//!
//! let hits = engine.search(&[0.9, 0.1], 1).unwrap();
//! assert_eq!(hits[0].product.id, 1);
//! ```

pub mod codec;
pub mod error;
pub mod handle;
pub mod index;
pub mod record;
pub mod search;
pub mod vector;

/// Dot product kernels
///
/// - AVX2/FMA on x86_64
/// - NEON on ARM64/Apple Silicon
/// - Scalar fallback elsewhere
pub mod simd;

pub use error::{Error, ErrorBody, Result};
pub use handle::IndexHandle;
pub use index::{EmbeddingIndex, EmptyIndexPolicy, IndexConfig, RecordSource};
pub use record::{ProductInfo, ProductRecord};
pub use search::{SearchHit, SimilarityEngine};
pub use vector::{Vector, NORM_EPSILON};
