//! Window planning for chunked strided convolution
//!
//! Computing each output frame independently would cost one small matmul
//! per frame. Instead, output frames whose input windows sit at a constant
//! stride from one another are grouped into a chunk and produced by a
//! single strided-view matmul. [`WindowPlan`] is the lazy sequence of those
//! chunks; the forward and both backward passes consume it identically.
//!
//! For kernel width `kw` and stride `dw`, a chunk emits every
//! `output_frame_stride = ceil(kw / dw)`-th output frame, so consecutive
//! rows of its input view are `input_frame_stride = output_frame_stride *
//! dw >= kw` frames apart and never overlap within the view. Successive
//! chunks start one output frame (`dw` input frames) later. With
//! `dw >= kw` the stride degenerates to 1 and each chunk covers one output
//! frame, which is slower but still correct.

/// Number of output frames for a sequence of `n_input_frame` frames
///
/// Caller guarantees `n_input_frame >= kw` and `dw >= 1`.
#[must_use]
pub fn output_length(n_input_frame: usize, kw: usize, dw: usize) -> usize {
    (n_input_frame - kw) / dw + 1
}

/// One chunk of the window plan: a run of constant-stride output frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// First output frame covered by this chunk
    pub output_frame_offset: usize,
    /// First input frame read by this chunk (`output_frame_offset * dw`)
    pub input_frame_offset: usize,
    /// Output frames produced by this chunk's single matmul
    pub n_frame: usize,
    /// Spacing, in input frames, between rows of the chunk's input view
    pub input_frame_stride: usize,
    /// Spacing, in output frames, between rows of the chunk's output view
    pub output_frame_stride: usize,
}

/// Lazy, finite iterator of [`Chunk`] descriptors covering every output frame
///
/// The chunk sizes sum to exactly [`output_length`]; each output frame is
/// covered by exactly one chunk.
#[derive(Debug, Clone)]
pub struct WindowPlan {
    n_input_frame: usize,
    kw: usize,
    dw: usize,
    k: usize,
    remaining: usize,
}

impl WindowPlan {
    /// Plan the chunks for a sequence of `n_input_frame` frames
    ///
    /// Caller guarantees `n_input_frame >= kw`, `kw >= 1` and `dw >= 1`.
    #[must_use]
    pub fn new(n_input_frame: usize, kw: usize, dw: usize) -> Self {
        debug_assert!(kw >= 1 && dw >= 1 && n_input_frame >= kw);
        Self {
            n_input_frame,
            kw,
            dw,
            k: 0,
            remaining: output_length(n_input_frame, kw, dw),
        }
    }
}

impl Iterator for WindowPlan {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.remaining == 0 {
            return None;
        }
        let output_frame_stride = (self.kw - 1) / self.dw + 1;
        let input_frame_stride = output_frame_stride * self.dw;
        // remaining > 0 guarantees output frame k exists, so the
        // subtraction cannot underflow
        let n_frame = (self.n_input_frame - self.k * self.dw - self.kw) / input_frame_stride + 1;
        debug_assert!(n_frame >= 1 && n_frame <= self.remaining);

        let chunk = Chunk {
            output_frame_offset: self.k,
            input_frame_offset: self.k * self.dw,
            n_frame,
            input_frame_stride,
            output_frame_stride,
        };
        self.remaining -= n_frame;
        self.k += 1;
        Some(chunk)
    }
}
