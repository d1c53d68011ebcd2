use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Floor for the normalization divisor, so a zero vector stays zero instead
/// of turning into NaN. Any non-zero finite f32 vector has an f64 norm above
/// it, so the floor never skews a real embedding.
pub const NORM_EPSILON: f64 = f64::MIN_POSITIVE;

/// A dense embedding vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vector {
    data: Vec<f32>,
}

impl Vector {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn from_slice(data: &[f32]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<f32> {
        self.data
    }

    #[inline]
    pub fn norm(&self) -> f32 {
        crate::simd::norm(&self.data)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Rejects vectors carrying NaN or infinity.
    pub fn ensure_finite(&self) -> Result<()> {
        if self.is_finite() {
            Ok(())
        } else {
            Err(Error::NonFiniteVector)
        }
    }

    /// Scale to unit L2 norm. The divisor is floored at [`NORM_EPSILON`].
    #[inline]
    pub fn normalize(&mut self) {
        normalize_in_place(&mut self.data);
    }

    #[inline]
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut v = self.clone();
        v.normalize();
        v
    }
}

impl From<Vec<f32>> for Vector {
    fn from(data: Vec<f32>) -> Self {
        Self::new(data)
    }
}

/// Normalize a raw slice in place. Shared by the index loader, which works on
/// rows of a flat matrix rather than owned vectors.
///
/// The norm and the division run in f64: squaring finite f32 components
/// overflows above ~1.8e19 and underflows below ~1e-23.
#[inline]
pub fn normalize_in_place(data: &mut [f32]) {
    let norm = crate::simd::norm_f64(data).max(NORM_EPSILON);
    for x in data.iter_mut() {
        *x = (f64::from(*x) / norm) as f32;
    }
}
