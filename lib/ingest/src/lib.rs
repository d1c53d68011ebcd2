//! # visearch Ingest
//!
//! Offline pipeline that fills the record store:
//!
//! ```text
//! metadata rows -> locate image candidates -> decode -> embed -> normalize -> upsert
//! ```
//!
//! Rows that cannot be indexed are skipped and reported; they never abort
//! the batch.

pub mod builder;
pub mod embedder;
pub mod metadata;

pub use builder::{BuildReport, IndexBuilder, RowFailure, SkipReason};
pub use embedder::{load_rgb, EmbedError, ImageEmbedder, ThumbnailEmbedder};
pub use metadata::{is_missing_value, parse_metadata, read_metadata_csv, MetadataRow};
