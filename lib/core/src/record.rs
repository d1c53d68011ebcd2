use crate::vector::Vector;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Display metadata for an indexed product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub id: u64,
    pub name: String,
    pub category: String,
    /// Source image, stored verbatim as it was found at build time.
    pub image_path: PathBuf,
}

/// A product with its embedding, as persisted in the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: u64,
    pub name: String,
    pub category: String,
    pub image_path: PathBuf,
    pub embedding: Vector,
}

impl ProductRecord {
    #[inline]
    #[must_use]
    pub fn new(
        id: u64,
        name: impl Into<String>,
        category: impl Into<String>,
        image_path: impl Into<PathBuf>,
        embedding: Vector,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
            image_path: image_path.into(),
            embedding,
        }
    }

    /// Split metadata from the embedding.
    pub fn into_parts(self) -> (ProductInfo, Vector) {
        (
            ProductInfo {
                id: self.id,
                name: self.name,
                category: self.category,
                image_path: self.image_path,
            },
            self.embedding,
        )
    }
}
