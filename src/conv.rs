//! Temporal (1-D) convolution layer
//!
//! Slides a window of `kw` consecutive input frames with stride `dw` over a
//! sequence and applies a learned affine transform at each position:
//!
//! ```text
//! output[t] = bias + weight^T . concat(input[t*dw .. t*dw + kw])
//! ```
//!
//! The three passes of the differentiable layer live here: [`forward`],
//! gradient w.r.t. input ([`backward_input`]) and accumulation of the
//! gradients w.r.t. weight and bias ([`acc_grad_parameters`]). All three
//! share the chunked windowing plan from [`crate::window`], expressing the
//! sliding window as one strided-view matmul per chunk instead of one per
//! output frame.
//!
//! [`forward`]: TemporalConv::forward
//! [`backward_input`]: TemporalConv::backward_input
//! [`acc_grad_parameters`]: TemporalConv::acc_grad_parameters

use crate::error::{ConvError, ConvResult};
use crate::matmul::{addmm, MatView, MatViewMut};
use crate::parallel::parallel_map;
use crate::tensor::Tensor;
use crate::window::{output_length, WindowPlan};
use crate::trace_enter;

/// Sequence geometry extracted from a validated input tensor
#[derive(Debug, Clone, Copy)]
struct Geometry {
    /// Batch size for rank-3 input, None for rank-2
    batch: Option<usize>,
    n_input_frame: usize,
    n_output_frame: usize,
}

/// Temporal convolution layer parameters
///
/// `weight` is row-major `[input_frame_size * kw, output_frame_size]`,
/// interpreted as `kw` stacked blocks of `input_frame_size` rows, one block
/// per frame position inside the window. `bias` is `[output_frame_size]`.
///
/// The layer is stateless across calls: every pass is a pure function of
/// its arguments plus these parameters.
#[derive(Debug, Clone)]
pub struct TemporalConv {
    input_frame_size: usize,
    output_frame_size: usize,
    kw: usize,
    dw: usize,
    /// Weight matrix, flattened row-major `[input_frame_size * kw, output_frame_size]`
    pub weight: Vec<f32>,
    /// Bias vector `[output_frame_size]`
    pub bias: Vec<f32>,
}

impl TemporalConv {
    /// Create a layer with zeroed parameters
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if any of the sizes is zero.
    pub fn new(
        input_frame_size: usize,
        output_frame_size: usize,
        kw: usize,
        dw: usize,
    ) -> ConvResult<Self> {
        if input_frame_size == 0 || output_frame_size == 0 {
            return Err(ConvError::InvalidArgument(
                "frame sizes must be non-zero".into(),
            ));
        }
        if kw == 0 || dw == 0 {
            return Err(ConvError::InvalidArgument(
                "kernel width and stride must be non-zero".into(),
            ));
        }
        Ok(Self {
            input_frame_size,
            output_frame_size,
            kw,
            dw,
            weight: vec![0.0; input_frame_size * kw * output_frame_size],
            bias: vec![0.0; output_frame_size],
        })
    }

    /// Input feature size
    #[must_use]
    pub fn input_frame_size(&self) -> usize {
        self.input_frame_size
    }

    /// Output feature size
    #[must_use]
    pub fn output_frame_size(&self) -> usize {
        self.output_frame_size
    }

    /// Kernel width in frames
    #[must_use]
    pub fn kw(&self) -> usize {
        self.kw
    }

    /// Window stride in frames
    #[must_use]
    pub fn dw(&self) -> usize {
        self.dw
    }

    /// Get mutable weight reference (for loading weights)
    pub fn weight_mut(&mut self) -> &mut [f32] {
        &mut self.weight
    }

    /// Get mutable bias reference (for loading weights)
    pub fn bias_mut(&mut self) -> &mut [f32] {
        &mut self.bias
    }

    /// Output sequence length for an input of `n_input_frame` frames
    #[must_use]
    pub fn output_length(&self, n_input_frame: usize) -> usize {
        output_length(n_input_frame, self.kw, self.dw)
    }

    /// Validate a forward input and extract its geometry
    fn check_input(&self, input: &Tensor) -> ConvResult<Geometry> {
        let (batch, dim_s, dim_f) = match input.rank() {
            2 => (None, 0, 1),
            3 => (Some(input.size(0)), 1, 2),
            r => {
                return Err(ConvError::InvalidArgument(format!(
                    "2D or 3D (batch mode) tensor expected, got rank {r}"
                )))
            }
        };
        if input.size(dim_f) != self.input_frame_size {
            return Err(ConvError::InvalidArgument(format!(
                "invalid input frame size {} (expected {})",
                input.size(dim_f),
                self.input_frame_size
            )));
        }
        let n_input_frame = input.size(dim_s);
        if n_input_frame < self.kw {
            return Err(ConvError::InvalidArgument(format!(
                "input sequence smaller than kernel size ({n_input_frame} < {})",
                self.kw
            )));
        }
        Ok(Geometry {
            batch,
            n_input_frame,
            n_output_frame: self.output_length(n_input_frame),
        })
    }

    /// Validate that `grad_output` matches the geometry the forward pass
    /// would have produced for `input`
    ///
    /// The window offsets in the gradient passes are recomputed from the
    /// layer configuration alone, so a grad_output of the wrong shape would
    /// otherwise silently index the wrong storage regions.
    fn check_grad_output(&self, geom: &Geometry, grad_output: &Tensor) -> ConvResult<()> {
        let expected: Vec<usize> = match geom.batch {
            None => vec![geom.n_output_frame, self.output_frame_size],
            Some(n) => vec![n, geom.n_output_frame, self.output_frame_size],
        };
        if grad_output.dims() != expected.as_slice() {
            return Err(ConvError::ShapeMismatch(format!(
                "grad_output dims {:?} do not match forward output dims {:?}",
                grad_output.dims(),
                expected
            )));
        }
        Ok(())
    }

    /// Forward pass
    ///
    /// `input` is `[frames, input_frame_size]` or
    /// `[batch, frames, input_frame_size]`; the result is
    /// `[output_frames, output_frame_size]` (rank preserved, batched inputs
    /// processed per sample).
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for wrong rank, wrong feature size, or a
    /// sequence shorter than the kernel, before any output is allocated.
    pub fn forward(&self, input: &Tensor) -> ConvResult<Tensor> {
        let _span = trace_enter!("conv_forward");
        let geom = self.check_input(input)?;

        match geom.batch {
            None => {
                let mut output = Tensor::zeros(&[geom.n_output_frame, self.output_frame_size]);
                self.forward_sample(input.as_slice(), output.as_mut_slice(), geom.n_input_frame);
                Ok(output)
            }
            Some(n_batch) => {
                let mut output =
                    Tensor::zeros(&[n_batch, geom.n_output_frame, self.output_frame_size]);
                let out_stride = geom.n_output_frame * self.output_frame_size;
                // Samples are independent; compute them in parallel and
                // stitch the results back in index order
                let samples = parallel_map(0..n_batch, |i| {
                    let mut buf = vec![0.0_f32; out_stride];
                    self.forward_sample(input.sample(i), &mut buf, geom.n_input_frame);
                    buf
                });
                for (i, buf) in samples.into_iter().enumerate() {
                    output.sample_mut(i).copy_from_slice(&buf);
                }
                Ok(output)
            }
        }
    }

    /// One sample's forward pass over packed slices
    fn forward_sample(&self, input: &[f32], output: &mut [f32], n_input_frame: usize) {
        let in_f = self.input_frame_size;
        let out_f = self.output_frame_size;

        // bias first
        for frame in output.chunks_exact_mut(out_f) {
            frame.copy_from_slice(&self.bias);
        }

        let weight = MatView::new(&self.weight, 0, in_f * self.kw, out_f, out_f);
        for chunk in WindowPlan::new(n_input_frame, self.kw, self.dw) {
            let in_win = MatView::new(
                input,
                chunk.input_frame_offset * in_f,
                chunk.n_frame,
                chunk.input_frame_stride * in_f,
                self.kw * in_f,
            );
            let mut out_win = MatViewMut::new(
                output,
                chunk.output_frame_offset * out_f,
                chunk.n_frame,
                chunk.output_frame_stride * out_f,
                out_f,
            );
            addmm(&mut out_win, 1.0, &in_win, false, &weight, false);
        }
    }

    /// Gradient with respect to the input
    ///
    /// `input` supplies the shape reference; `grad_output` must have the
    /// exact shape [`forward`](Self::forward) produced for that input. The
    /// result is zero-initialized and accumulated into, because input
    /// frames participate in multiple overlapping windows when `dw < kw`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an invalid `input` and `ShapeMismatch`
    /// if `grad_output` disagrees with the recomputed forward geometry.
    pub fn backward_input(&self, input: &Tensor, grad_output: &Tensor) -> ConvResult<Tensor> {
        let _span = trace_enter!("conv_backward_input");
        let geom = self.check_input(input)?;
        self.check_grad_output(&geom, grad_output)?;

        let mut grad_input = Tensor::zeros(input.dims());
        match geom.batch {
            None => {
                self.backward_input_sample(
                    grad_output.as_slice(),
                    grad_input.as_mut_slice(),
                    geom.n_input_frame,
                );
            }
            Some(n_batch) => {
                let in_stride = geom.n_input_frame * self.input_frame_size;
                let samples = parallel_map(0..n_batch, |i| {
                    let mut buf = vec![0.0_f32; in_stride];
                    self.backward_input_sample(grad_output.sample(i), &mut buf, geom.n_input_frame);
                    buf
                });
                for (i, buf) in samples.into_iter().enumerate() {
                    grad_input.sample_mut(i).copy_from_slice(&buf);
                }
            }
        }
        Ok(grad_input)
    }

    /// One sample's input-gradient pass over packed slices
    ///
    /// `grad_input` must already be zeroed; chunks overlap in it and every
    /// matmul accumulates.
    fn backward_input_sample(
        &self,
        grad_output: &[f32],
        grad_input: &mut [f32],
        n_input_frame: usize,
    ) {
        let in_f = self.input_frame_size;
        let out_f = self.output_frame_size;

        let weight = MatView::new(&self.weight, 0, in_f * self.kw, out_f, out_f);
        for chunk in WindowPlan::new(n_input_frame, self.kw, self.dw) {
            let go_win = MatView::new(
                grad_output,
                chunk.output_frame_offset * out_f,
                chunk.n_frame,
                chunk.output_frame_stride * out_f,
                out_f,
            );
            let mut gi_win = MatViewMut::new(
                grad_input,
                chunk.input_frame_offset * in_f,
                chunk.n_frame,
                chunk.input_frame_stride * in_f,
                self.kw * in_f,
            );
            addmm(&mut gi_win, 1.0, &go_win, false, &weight, true);
        }
    }

    /// Accumulate gradients with respect to weight and bias
    ///
    /// Adds `scale` times the parameter gradients into `grads` without
    /// zeroing them; resetting between optimization steps is the caller's
    /// job via [`TemporalConvGrads::zero`]. The batch loop is sequential:
    /// all samples accumulate into the same buffers.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an invalid `input` and `ShapeMismatch`
    /// if `grad_output` disagrees with the recomputed forward geometry, or
    /// if `grads` was sized for a different layer configuration.
    pub fn acc_grad_parameters(
        &self,
        input: &Tensor,
        grad_output: &Tensor,
        scale: f32,
        grads: &mut TemporalConvGrads,
    ) -> ConvResult<()> {
        let _span = trace_enter!("conv_acc_grad_parameters");
        let geom = self.check_input(input)?;
        self.check_grad_output(&geom, grad_output)?;
        if grads.grad_weight.len() != self.weight.len() || grads.grad_bias.len() != self.bias.len()
        {
            return Err(ConvError::ShapeMismatch(
                "gradient buffers sized for a different layer configuration".into(),
            ));
        }

        match geom.batch {
            None => self.acc_grad_sample(
                input.as_slice(),
                grad_output.as_slice(),
                scale,
                grads,
                geom.n_input_frame,
            ),
            Some(n_batch) => {
                for i in 0..n_batch {
                    self.acc_grad_sample(
                        input.sample(i),
                        grad_output.sample(i),
                        scale,
                        grads,
                        geom.n_input_frame,
                    );
                }
            }
        }
        Ok(())
    }

    /// One sample's parameter-gradient accumulation over packed slices
    fn acc_grad_sample(
        &self,
        input: &[f32],
        grad_output: &[f32],
        scale: f32,
        grads: &mut TemporalConvGrads,
        n_input_frame: usize,
    ) {
        let in_f = self.input_frame_size;
        let out_f = self.output_frame_size;

        // bias first
        for frame in grad_output.chunks_exact(out_f) {
            for (g, &v) in grads.grad_bias.iter_mut().zip(frame) {
                *g += scale * v;
            }
        }

        for chunk in WindowPlan::new(n_input_frame, self.kw, self.dw) {
            let in_win = MatView::new(
                input,
                chunk.input_frame_offset * in_f,
                chunk.n_frame,
                chunk.input_frame_stride * in_f,
                self.kw * in_f,
            );
            let go_win = MatView::new(
                grad_output,
                chunk.output_frame_offset * out_f,
                chunk.n_frame,
                chunk.output_frame_stride * out_f,
                out_f,
            );
            let mut gw = MatViewMut::new(&mut grads.grad_weight, 0, in_f * self.kw, out_f, out_f);
            addmm(&mut gw, scale, &in_win, true, &go_win, false);
        }
    }
}

/// Accumulation buffers for the parameter gradients of one layer
///
/// [`TemporalConv::acc_grad_parameters`] only ever adds into these; the
/// optimization-step contract is that the caller calls [`zero`](Self::zero)
/// once per step before accumulating fresh gradients.
#[derive(Debug, Clone)]
pub struct TemporalConvGrads {
    /// Gradient w.r.t. weight, same layout as [`TemporalConv::weight`]
    pub grad_weight: Vec<f32>,
    /// Gradient w.r.t. bias, same layout as [`TemporalConv::bias`]
    pub grad_bias: Vec<f32>,
}

impl TemporalConvGrads {
    /// Create zeroed gradient buffers matching `layer`'s parameters
    #[must_use]
    pub fn new(layer: &TemporalConv) -> Self {
        Self {
            grad_weight: vec![0.0; layer.weight.len()],
            grad_bias: vec![0.0; layer.bias.len()],
        }
    }

    /// Reset both buffers to zero
    pub fn zero(&mut self) {
        self.grad_weight.fill(0.0);
        self.grad_bias.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic small weights without pulling in an RNG
    fn ramp(n: usize, scale: f32) -> Vec<f32> {
        (0..n).map(|i| (i as f32 * 0.7).sin() * scale).collect()
    }

    fn layer(in_f: usize, out_f: usize, kw: usize, dw: usize) -> TemporalConv {
        let mut conv = TemporalConv::new(in_f, out_f, kw, dw).unwrap();
        let w = ramp(conv.weight.len(), 0.5);
        conv.weight_mut().copy_from_slice(&w);
        let b = ramp(conv.bias.len(), 0.1);
        conv.bias_mut().copy_from_slice(&b);
        conv
    }

    /// Reference forward: direct per-window affine map, no chunking
    fn forward_naive(conv: &TemporalConv, input: &[f32], n_input_frame: usize) -> Vec<f32> {
        let in_f = conv.input_frame_size();
        let out_f = conv.output_frame_size();
        let n_out = conv.output_length(n_input_frame);
        let mut output = vec![0.0_f32; n_out * out_f];
        for t in 0..n_out {
            for j in 0..out_f {
                let mut sum = conv.bias[j];
                for c in 0..conv.kw() {
                    for f in 0..in_f {
                        let w = conv.weight[(c * in_f + f) * out_f + j];
                        sum += w * input[(t * conv.dw() + c) * in_f + f];
                    }
                }
                output[t * out_f + j] = sum;
            }
        }
        output
    }

    fn assert_close(a: &[f32], b: &[f32]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-4, "{x} != {y}");
        }
    }

    #[test]
    fn test_new_rejects_zero_config() {
        assert!(TemporalConv::new(0, 1, 2, 1).is_err());
        assert!(TemporalConv::new(1, 0, 2, 1).is_err());
        assert!(TemporalConv::new(1, 1, 0, 1).is_err());
        assert!(TemporalConv::new(1, 1, 2, 0).is_err());
    }

    #[test]
    fn test_forward_matches_naive() {
        for (kw, dw) in [(1, 1), (2, 1), (3, 1), (3, 2), (2, 3), (4, 4)] {
            let conv = layer(3, 2, kw, dw);
            let n_frames = 11;
            let data = ramp(n_frames * 3, 1.0);
            let input = Tensor::from_vec(data.clone(), &[n_frames, 3]).unwrap();

            let output = conv.forward(&input).unwrap();
            let expected = forward_naive(&conv, &data, n_frames);

            assert_eq!(output.dims(), &[conv.output_length(n_frames), 2]);
            assert_close(output.as_slice(), &expected);
        }
    }

    #[test]
    fn test_forward_kw1_dw1_is_per_frame_affine() {
        let conv = layer(3, 2, 1, 1);
        let data = ramp(5 * 3, 1.0);
        let input = Tensor::from_vec(data.clone(), &[5, 3]).unwrap();
        let output = conv.forward(&input).unwrap();

        assert_eq!(output.dims(), &[5, 2]);
        for t in 0..5 {
            for j in 0..2 {
                let mut expected = conv.bias[j];
                for f in 0..3 {
                    expected += conv.weight[f * 2 + j] * data[t * 3 + f];
                }
                let got = output.as_slice()[t * 2 + j];
                assert!((got - expected).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_forward_hand_computed_case() {
        // in=2, out=1, kw=2, dw=1; weight picks frame0's first component
        // plus frame1's second component
        let mut conv = TemporalConv::new(2, 1, 2, 1).unwrap();
        conv.weight_mut().copy_from_slice(&[1.0, 0.0, 0.0, 1.0]);

        let input = Tensor::from_vec(
            vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0],
            &[4, 2],
        )
        .unwrap();
        let output = conv.forward(&input).unwrap();

        assert_eq!(output.dims(), &[3, 1]);
        assert_close(output.as_slice(), &[2.0, 1.0, 1.0]);
    }

    #[test]
    fn test_forward_batched_matches_per_sample() {
        let conv = layer(2, 3, 3, 2);
        let n_frames = 9;
        let n_batch = 4;
        let data = ramp(n_batch * n_frames * 2, 1.0);
        let batched = Tensor::from_vec(data.clone(), &[n_batch, n_frames, 2]).unwrap();

        let output = conv.forward(&batched).unwrap();
        assert_eq!(output.rank(), 3);
        assert_eq!(output.size(0), n_batch);

        for i in 0..n_batch {
            let sample = Tensor::from_vec(batched.sample(i).to_vec(), &[n_frames, 2]).unwrap();
            let expected = conv.forward(&sample).unwrap();
            assert_close(output.sample(i), expected.as_slice());
        }
    }

    #[test]
    fn test_forward_rejects_rank_1() {
        let conv = layer(2, 1, 2, 1);
        let input = Tensor::from_vec(vec![0.0; 8], &[8]).unwrap();
        assert!(matches!(
            conv.forward(&input),
            Err(ConvError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_forward_rejects_wrong_frame_size() {
        let conv = layer(2, 1, 2, 1);
        let input = Tensor::zeros(&[4, 3]);
        assert!(matches!(
            conv.forward(&input),
            Err(ConvError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_forward_rejects_short_sequence() {
        let conv = layer(2, 1, 4, 1);
        let input = Tensor::zeros(&[3, 2]);
        assert!(matches!(
            conv.forward(&input),
            Err(ConvError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_backward_input_rejects_mismatched_grad_output() {
        let conv = layer(2, 1, 2, 1);
        let input = Tensor::zeros(&[4, 2]);
        // Forward geometry would be [3, 1]
        let grad_output = Tensor::zeros(&[4, 1]);
        assert!(matches!(
            conv.backward_input(&input, &grad_output),
            Err(ConvError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_backward_input_overlap_accumulates() {
        // kw=2, dw=1, out=1, weight all ones, grad_output all ones:
        // interior input frames feed 2 windows, edges feed 1
        let mut conv = TemporalConv::new(1, 1, 2, 1).unwrap();
        conv.weight_mut().copy_from_slice(&[1.0, 1.0]);

        let input = Tensor::zeros(&[4, 1]);
        let mut grad_output = Tensor::zeros(&[3, 1]);
        grad_output.fill(1.0);

        let grad_input = conv.backward_input(&input, &grad_output).unwrap();
        assert_close(grad_input.as_slice(), &[1.0, 2.0, 2.0, 1.0]);
    }

    #[test]
    fn test_grads_zero_resets() {
        let conv = layer(2, 2, 2, 1);
        let input = Tensor::from_vec(ramp(10, 1.0), &[5, 2]).unwrap();
        let grad_output = Tensor::from_vec(ramp(8, 1.0), &[4, 2]).unwrap();

        let mut grads = TemporalConvGrads::new(&conv);
        conv.acc_grad_parameters(&input, &grad_output, 1.0, &mut grads)
            .unwrap();
        assert!(grads.grad_bias.iter().any(|&g| g != 0.0));

        grads.zero();
        assert!(grads.grad_weight.iter().all(|&g| g == 0.0));
        assert!(grads.grad_bias.iter().all(|&g| g == 0.0));
    }

    #[test]
    fn test_acc_grad_rejects_foreign_buffers() {
        let conv = layer(2, 2, 2, 1);
        let other = layer(3, 2, 2, 1);
        let input = Tensor::zeros(&[5, 2]);
        let grad_output = Tensor::zeros(&[4, 2]);

        let mut grads = TemporalConvGrads::new(&other);
        assert!(matches!(
            conv.acc_grad_parameters(&input, &grad_output, 1.0, &mut grads),
            Err(ConvError::ShapeMismatch(_))
        ));
    }
}
