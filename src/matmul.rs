//! Strided matrix views and accumulating matrix multiply
//!
//! The windowing trick in the convolution passes reinterprets a packed
//! sequence tensor as a 2-D matrix whose rows are not adjacent in storage:
//! row `r` starts at `offset + r * row_stride`, and columns are unit-stride
//! within the row. [`MatView`] and [`MatViewMut`] capture that
//! reinterpretation as cheap, lifetime-bound borrows that never outlive
//! the matmul call consuming them.
//!
//! [`addmm`] is the single multiply primitive all three passes use:
//! `C += alpha * op(A) @ op(B)` with explicit per-call transpose flags, so
//! shared parameter matrices are never mutated to change orientation.

/// Read-only strided 2-D view over a flat slice
#[derive(Debug, Clone, Copy)]
pub struct MatView<'a> {
    data: &'a [f32],
    offset: usize,
    rows: usize,
    row_stride: usize,
    cols: usize,
}

impl<'a> MatView<'a> {
    /// Create a view of `rows x cols` with rows `row_stride` elements apart
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the view extends past the end of `data`.
    #[must_use]
    pub fn new(data: &'a [f32], offset: usize, rows: usize, row_stride: usize, cols: usize) -> Self {
        debug_assert!(
            rows == 0 || offset + (rows - 1) * row_stride + cols <= data.len(),
            "strided view out of bounds"
        );
        Self {
            data,
            offset,
            rows,
            row_stride,
            cols,
        }
    }

    /// Row count
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Column count
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn at(&self, r: usize, c: usize) -> f32 {
        self.data[self.offset + r * self.row_stride + c]
    }

    /// Contiguous row `r` as a slice
    #[inline]
    fn row(&self, r: usize) -> &[f32] {
        let start = self.offset + r * self.row_stride;
        &self.data[start..start + self.cols]
    }
}

/// Mutable strided 2-D view over a flat slice
#[derive(Debug)]
pub struct MatViewMut<'a> {
    data: &'a mut [f32],
    offset: usize,
    rows: usize,
    row_stride: usize,
    cols: usize,
}

impl<'a> MatViewMut<'a> {
    /// Create a mutable view, same layout rules as [`MatView::new`]
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the view extends past the end of `data`.
    #[must_use]
    pub fn new(
        data: &'a mut [f32],
        offset: usize,
        rows: usize,
        row_stride: usize,
        cols: usize,
    ) -> Self {
        debug_assert!(
            rows == 0 || offset + (rows - 1) * row_stride + cols <= data.len(),
            "strided view out of bounds"
        );
        Self {
            data,
            offset,
            rows,
            row_stride,
            cols,
        }
    }

    /// Row count
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Column count
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Contiguous row `r` as a mutable slice
    #[inline]
    fn row_mut(&mut self, r: usize) -> &mut [f32] {
        let start = self.offset + r * self.row_stride;
        &mut self.data[start..start + self.cols]
    }
}

/// Accumulating matrix multiply: `C += alpha * op(A) @ op(B)`
///
/// `trans_a`/`trans_b` treat the corresponding operand as transposed for
/// this call only; no operand storage is touched. Dimension agreement is a
/// programming contract, checked with debug assertions.
pub fn addmm(
    c: &mut MatViewMut<'_>,
    alpha: f32,
    a: &MatView<'_>,
    trans_a: bool,
    b: &MatView<'_>,
    trans_b: bool,
) {
    let (m, ka) = if trans_a {
        (a.cols, a.rows)
    } else {
        (a.rows, a.cols)
    };
    let (kb, n) = if trans_b {
        (b.cols, b.rows)
    } else {
        (b.rows, b.cols)
    };
    debug_assert_eq!(ka, kb, "addmm inner dimensions disagree");
    debug_assert_eq!(m, c.rows, "addmm row count disagrees");
    debug_assert_eq!(n, c.cols, "addmm column count disagrees");
    let k = ka;

    if !trans_a && !trans_b {
        // Hot path for the forward pass: A rows are contiguous, walk B by rows
        for i in 0..m {
            let a_row = a.row(i);
            let c_row = c.row_mut(i);
            for (l, &av) in a_row.iter().enumerate() {
                let b_row = b.row(l);
                let s = alpha * av;
                for (cv, &bv) in c_row.iter_mut().zip(b_row) {
                    *cv += s * bv;
                }
            }
        }
        return;
    }

    for i in 0..m {
        for j in 0..n {
            let mut acc = 0.0_f32;
            for l in 0..k {
                let av = if trans_a { a.at(l, i) } else { a.at(i, l) };
                let bv = if trans_b { b.at(j, l) } else { b.at(l, j) };
                acc += av * bv;
            }
            c.row_mut(i)[j] += alpha * acc;
        }
    }
}
