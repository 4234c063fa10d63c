//! Dense tensor storage for sequence data
//!
//! A deliberately small substrate: row-major contiguous `f32` arrays of
//! rank 1 to 3, which is exactly what the convolution passes consume.
//! Sequence tensors are `[frames, features]` or `[batch, frames, features]`;
//! parameters are rank 1 (bias) or rank 2 (weight).
//!
//! Storage is always packed, so the strided window arithmetic in the
//! passes can assume `frame * feature_size` element offsets directly.

use crate::error::{ConvError, ConvResult};

/// Dense row-major f32 tensor of rank 1 to 3
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: Vec<f32>,
    dims: Vec<usize>,
}

impl Tensor {
    /// Create a zero-filled tensor with the given dimensions
    ///
    /// # Panics
    ///
    /// Panics if `dims` is empty or longer than 3 entries.
    #[must_use]
    pub fn zeros(dims: &[usize]) -> Self {
        assert!(
            !dims.is_empty() && dims.len() <= 3,
            "tensor rank must be 1, 2 or 3"
        );
        let len = dims.iter().product();
        Self {
            data: vec![0.0; len],
            dims: dims.to_vec(),
        }
    }

    /// Create a tensor from existing data
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the data length does not match the
    /// product of the dimensions, or the rank is not 1, 2 or 3.
    pub fn from_vec(data: Vec<f32>, dims: &[usize]) -> ConvResult<Self> {
        if dims.is_empty() || dims.len() > 3 {
            return Err(ConvError::InvalidArgument(format!(
                "tensor rank must be 1, 2 or 3, got {}",
                dims.len()
            )));
        }
        let expected: usize = dims.iter().product();
        if data.len() != expected {
            return Err(ConvError::InvalidArgument(format!(
                "data length {} does not match dims {:?} (expected {})",
                data.len(),
                dims,
                expected
            )));
        }
        Ok(Self {
            data,
            dims: dims.to_vec(),
        })
    }

    /// Number of dimensions (1 to 3)
    #[must_use]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Dimension sizes
    #[must_use]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Size along dimension `d`
    ///
    /// # Panics
    ///
    /// Panics if `d` is out of range for this tensor's rank.
    #[must_use]
    pub fn size(&self, d: usize) -> usize {
        self.dims[d]
    }

    /// Total number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the tensor holds no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Backing storage as a flat slice
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Backing storage as a mutable flat slice
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Set every element to `value`
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Set every element to zero
    pub fn zero(&mut self) {
        self.fill(0.0);
    }

    /// Slice out sample `i` of a rank-3 tensor as a flat `[frames * features]` view
    ///
    /// # Panics
    ///
    /// Panics if the tensor is not rank 3 or `i` is out of range.
    #[must_use]
    pub fn sample(&self, i: usize) -> &[f32] {
        assert_eq!(self.rank(), 3, "sample() requires a batched tensor");
        let stride = self.dims[1] * self.dims[2];
        &self.data[i * stride..(i + 1) * stride]
    }

    /// Mutable variant of [`sample`](Self::sample)
    pub fn sample_mut(&mut self, i: usize) -> &mut [f32] {
        assert_eq!(self.rank(), 3, "sample_mut() requires a batched tensor");
        let stride = self.dims[1] * self.dims[2];
        &mut self.data[i * stride..(i + 1) * stride]
    }
}
