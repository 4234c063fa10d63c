//! # temporal-conv
//!
//! Strided 1-D ("temporal") convolution over sequence data, with analytic
//! forward and backward passes.
//!
//! ## Overview
//!
//! Given an input sequence of frames (fixed-size feature vectors), the
//! layer slides a window of `kw` consecutive frames with stride `dw` and
//! applies a learned affine transform (weight + bias) at each position.
//! Rather than one small matmul per output frame, output frames whose
//! windows sit at a constant stride from one another are grouped into
//! chunks, each computed by a single strided-view matrix multiply.
//!
//! Three passes form the differentiable layer:
//!
//! - [`TemporalConv::forward`] - output from input, weight and bias
//! - [`TemporalConv::backward_input`] - gradient w.r.t. the input
//! - [`TemporalConv::acc_grad_parameters`] - accumulates gradients w.r.t.
//!   weight and bias into [`TemporalConvGrads`]
//!
//! ## Quick Start
//!
//! ```rust
//! use temporal_conv::{TemporalConv, Tensor};
//!
//! let mut conv = TemporalConv::new(2, 1, 2, 1)?;
//! conv.weight_mut().copy_from_slice(&[1.0, 0.0, 0.0, 1.0]);
//!
//! let input = Tensor::from_vec(vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0], &[4, 2])?;
//! let output = conv.forward(&input)?;
//! assert_eq!(output.dims(), &[3, 1]);
//! # Ok::<(), temporal_conv::ConvError>(())
//! ```
//!
//! ## Features
//!
//! - `parallel`: batched inputs processed across threads via rayon
//! - `tracing`: span instrumentation of the passes via the `tracing` crate

#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

pub mod conv;
pub mod error;
pub mod matmul;
pub mod parallel;
pub mod tensor;
#[macro_use]
pub mod trace;
pub mod window;

pub use conv::{TemporalConv, TemporalConvGrads};
pub use error::{ConvError, ConvResult};
pub use tensor::Tensor;
