//! General matrix products on strided buffers.

use linexpr_traits::Scalar;

use crate::layout::{MatMut, MatRef, VecMut, VecRef};
use crate::threading::{par_rows, MIN_PARALLEL_WORK};
use crate::{backend, simd, KernelError, Result};

/// Depth of one pass over the shared dimension.
const KC: usize = 256;

/// Whether a routine may split its work across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parallelism {
    /// Single-threaded.
    #[default]
    None,
    /// Split when the work exceeds the threshold (in scalar multiply-adds).
    Rayon { threshold: usize },
}

impl Parallelism {
    /// Rayon splitting with the default threshold.
    pub fn rayon() -> Self {
        Parallelism::Rayon {
            threshold: MIN_PARALLEL_WORK,
        }
    }
}

/// `C = alpha * A * B + beta * C`.
///
/// `beta == 0` overwrites `C` without reading it. Accelerated backends are
/// tried first for BLAS element types; any layout they cannot take falls back
/// to the portable loop.
///
/// `C` must not overlap `A` or `B`.
pub fn gemm<T: Scalar>(
    c: MatMut<'_, T>,
    beta: T,
    a: MatRef<'_, T>,
    b: MatRef<'_, T>,
    alpha: T,
    par: Parallelism,
) -> Result<()> {
    gemm_impl(c, beta, a, b, alpha, par, true)
}

/// [`gemm`] that never delegates to BLAS or faer.
pub fn gemm_portable<T: Scalar>(
    c: MatMut<'_, T>,
    beta: T,
    a: MatRef<'_, T>,
    b: MatRef<'_, T>,
    alpha: T,
    par: Parallelism,
) -> Result<()> {
    gemm_impl(c, beta, a, b, alpha, par, false)
}

fn gemm_impl<T: Scalar>(
    mut c: MatMut<'_, T>,
    beta: T,
    a: MatRef<'_, T>,
    b: MatRef<'_, T>,
    alpha: T,
    par: Parallelism,
    use_backend: bool,
) -> Result<()> {
    let (m, k) = (a.rows(), a.cols());
    let n = b.cols();
    if b.rows() != k {
        return Err(KernelError::DimensionMismatch {
            routine: "gemm",
            lhs: (m, k),
            rhs: (b.rows(), n),
        });
    }
    if c.rows() != m || c.cols() != n {
        return Err(KernelError::DimensionMismatch {
            routine: "gemm",
            lhs: (m, n),
            rhs: (c.rows(), c.cols()),
        });
    }
    if m == 0 || n == 0 {
        return Ok(());
    }
    if k == 0 {
        scale_in_place(c.reborrow(), beta);
        return Ok(());
    }

    if use_backend && backend::try_gemm(c.reborrow(), beta, a, b, alpha) {
        return Ok(());
    }

    match par {
        Parallelism::Rayon { threshold } if m * n * k > threshold => {
            par_rows(c, n * k, threshold, &|row, block: MatMut<'_, T>| {
                let rows = block.rows();
                gemm_blocked(block, beta, a.submatrix(row, 0, rows, k), b, alpha);
            });
        }
        _ => gemm_blocked(c, beta, a, b, alpha),
    }
    Ok(())
}

/// `y = alpha * A * x + beta * y`.
pub fn gemv<T: Scalar>(
    y: VecMut<'_, T>,
    beta: T,
    a: MatRef<'_, T>,
    x: VecRef<'_, T>,
    alpha: T,
    par: Parallelism,
) -> Result<()> {
    gemv_impl(y, beta, a, x, alpha, par, true)
}

/// [`gemv`] that never delegates to BLAS or faer.
pub fn gemv_portable<T: Scalar>(
    y: VecMut<'_, T>,
    beta: T,
    a: MatRef<'_, T>,
    x: VecRef<'_, T>,
    alpha: T,
    par: Parallelism,
) -> Result<()> {
    gemv_impl(y, beta, a, x, alpha, par, false)
}

fn gemv_impl<T: Scalar>(
    mut y: VecMut<'_, T>,
    beta: T,
    a: MatRef<'_, T>,
    x: VecRef<'_, T>,
    alpha: T,
    par: Parallelism,
    use_backend: bool,
) -> Result<()> {
    if a.cols() != x.len() || a.rows() != y.len() {
        return Err(KernelError::DimensionMismatch {
            routine: "gemv",
            lhs: (a.rows(), a.cols()),
            rhs: (x.len(), y.len()),
        });
    }
    let (m, k) = (a.rows(), a.cols());
    // A vector is a one-column matrix whose column stride is never stepped.
    let c = unsafe { MatMut::from_raw_parts(y.as_mut_ptr(), m, 1, y.stride(), m.max(1) as isize) };
    let b = unsafe { MatRef::from_raw_parts(x.as_ptr(), k, 1, x.stride(), k.max(1) as isize) };
    gemm_impl(c, beta, a, b, alpha, par, use_backend)
}

fn scale_in_place<T: Scalar>(mut c: MatMut<'_, T>, beta: T) {
    if beta == T::one() {
        return;
    }
    for i in 0..c.rows() {
        for j in 0..c.cols() {
            let v = if beta == T::zero() {
                T::zero()
            } else {
                beta * c.get(i, j)
            };
            c.set(i, j, v);
        }
    }
}

/// Portable kernel: rank-1 row updates, blocked along the shared dimension.
fn gemm_blocked<T: Scalar>(c: MatMut<'_, T>, beta: T, a: MatRef<'_, T>, b: MatRef<'_, T>, alpha: T) {
    // Keep the inner loop on the contiguous direction of C.
    if c.col_stride().unsigned_abs() > c.row_stride().unsigned_abs() {
        return gemm_blocked(c.transpose(), beta, b.transpose(), a.transpose(), alpha);
    }

    let mut c = c;
    scale_in_place(c.reborrow(), beta);

    let (m, k) = (a.rows(), a.cols());
    let n = b.cols();
    let mut row_buf: Vec<T> = Vec::new();

    for p0 in (0..k).step_by(KC) {
        let p1 = (p0 + KC).min(k);
        for i in 0..m {
            let mut c_row = c.reborrow().submatrix(i, 0, 1, n);
            for p in p0..p1 {
                let aip = alpha * a.get(i, p);
                let b_row = b.row(p);
                let b_slice = match b_row.as_slice() {
                    Some(s) => s,
                    None => {
                        row_buf.clear();
                        row_buf.extend((0..n).map(|j| b_row.get(j)));
                        &row_buf
                    }
                };
                match c_row.as_packed_slice_mut() {
                    Some((dst, _)) => simd::axpy(aip, b_slice, dst),
                    None => {
                        for (j, &bv) in b_slice.iter().enumerate() {
                            let v = c_row.get(0, j) + aip * bv;
                            c_row.set(0, j, v);
                        }
                    }
                }
            }
        }
    }
}
