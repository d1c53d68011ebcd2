//! Image embedding seam.
//!
//! The vision model is an external collaborator: anything that turns a
//! decoded image into a fixed-length vector can implement [`ImageEmbedder`]
//! and be handed to the builder and the search service.

use image::imageops::FilterType;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("model error: {0}")]
    Model(String),

    #[error("unsupported image: {0}")]
    Unsupported(String),
}

/// Turns an image into a vector of fixed dimension.
///
/// Implementations must be deterministic for a given model version, and the
/// same model must be used to build the store and to embed queries.
pub trait ImageEmbedder: Send + Sync {
    /// Identifier of the model and version, for logs.
    fn model_id(&self) -> &str;

    fn dimension(&self) -> usize;

    fn embed(&self, image: &DynamicImage) -> Result<Vec<f32>, EmbedError>;
}

/// Decode an image file and convert it to RGB.
pub fn load_rgb(path: &Path) -> image::ImageResult<DynamicImage> {
    let img = image::open(path)?;
    Ok(DynamicImage::ImageRgb8(img.into_rgb8()))
}

/// Model-free embedder: a square grayscale thumbnail flattened to
/// `side * side` intensities in `[0, 1]`.
///
/// Good enough to find near-duplicate product shots and to exercise the
/// pipeline without a neural encoder.
#[derive(Debug, Clone)]
pub struct ThumbnailEmbedder {
    side: u32,
    model_id: String,
}

impl ThumbnailEmbedder {
    pub const DEFAULT_SIDE: u32 = 16;

    pub fn new(side: u32) -> Self {
        let side = side.max(1);
        Self {
            side,
            model_id: format!("thumbnail-{side}x{side}"),
        }
    }
}

impl Default for ThumbnailEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIDE)
    }
}

impl ImageEmbedder for ThumbnailEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        (self.side * self.side) as usize
    }

    fn embed(&self, image: &DynamicImage) -> Result<Vec<f32>, EmbedError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(EmbedError::Unsupported("image has no pixels".to_string()));
        }
        let thumb = image
            .resize_exact(self.side, self.side, FilterType::Triangle)
            .into_luma8();
        Ok(thumb.pixels().map(|p| f32::from(p.0[0]) / 255.0).collect())
    }
}
