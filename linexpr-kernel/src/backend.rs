//! Delegation of `gemm` to optimized libraries.
//!
//! Selection happens per call: with `blas`, CBLAS takes every BLAS element
//! type whose operands each have a unit stride in one dimension. With `faer`
//! (and no `blas`), faer's matmul takes any strides. Anything else returns
//! `false` and the caller runs the portable kernel.

use linexpr_traits::Scalar;

use crate::layout::{MatMut, MatRef};

/// Try an accelerated backend; `true` if `c` now holds the result.
#[allow(unused_variables)]
pub(crate) fn try_gemm<T: Scalar>(
    c: MatMut<'_, T>,
    beta: T,
    a: MatRef<'_, T>,
    b: MatRef<'_, T>,
    alpha: T,
) -> bool {
    if T::BLAS_KIND.is_none() {
        return false;
    }
    #[cfg(feature = "blas")]
    {
        return cblas_backend::gemm(c, beta, a, b, alpha);
    }
    #[cfg(all(feature = "faer", not(feature = "blas")))]
    {
        return faer_backend::gemm(c, beta, a, b, alpha);
    }
    #[allow(unreachable_code)]
    false
}

#[cfg(feature = "blas")]
mod cblas_backend {
    use cblas::{Layout, Transpose};
    use linexpr_traits::Scalar;
    use num_complex::{Complex32, Complex64};

    use crate::layout::{BlasLayout, BlasMatrix, MatMut, MatRef};

    /// Number of elements a BLAS routine may address for this descriptor.
    fn span(info: &BlasMatrix) -> usize {
        let (outer, inner) = match info.layout {
            BlasLayout::RowMajor => (info.rows, info.cols),
            BlasLayout::ColMajor => (info.cols, info.rows),
        };
        if outer == 0 || inner == 0 {
            0
        } else {
            (outer - 1) * info.ld + inner
        }
    }

    fn trans_for(target: BlasLayout, operand: BlasLayout) -> Transpose {
        if target == operand {
            Transpose::None
        } else {
            Transpose::Ordinary
        }
    }

    macro_rules! call_gemm {
        ($t:ty, $routine:path, $c:expr, $beta:expr, $a:expr, $b:expr, $alpha:expr, $ci:expr, $ai:expr, $bi:expr) => {{
            let alpha: $t = match crate::cast($alpha) {
                Some(v) => v,
                None => return false,
            };
            let beta: $t = match crate::cast($beta) {
                Some(v) => v,
                None => return false,
            };
            let layout = match $ci.layout {
                BlasLayout::RowMajor => Layout::RowMajor,
                BlasLayout::ColMajor => Layout::ColumnMajor,
            };
            unsafe {
                $routine(
                    layout,
                    trans_for($ci.layout, $ai.layout),
                    trans_for($ci.layout, $bi.layout),
                    $ci.rows as i32,
                    $ci.cols as i32,
                    $ai.cols as i32,
                    alpha,
                    std::slice::from_raw_parts($a.as_ptr() as *const $t, span(&$ai)),
                    $ai.ld as i32,
                    std::slice::from_raw_parts($b.as_ptr() as *const $t, span(&$bi)),
                    $bi.ld as i32,
                    beta,
                    std::slice::from_raw_parts_mut($c.as_mut_ptr() as *mut $t, span(&$ci)),
                    $ci.ld as i32,
                );
            }
            true
        }};
    }

    pub(super) fn gemm<T: Scalar>(
        mut c: MatMut<'_, T>,
        beta: T,
        a: MatRef<'_, T>,
        b: MatRef<'_, T>,
        alpha: T,
    ) -> bool {
        let (Some(ci), Some(ai), Some(bi)) = (c.blas_matrix(), a.blas_matrix(), b.blas_matrix())
        else {
            log::debug!("operand strides are not BLAS-compatible, using the portable gemm");
            return false;
        };
        let max_dim = i32::MAX as usize;
        if [ci.rows, ci.cols, ai.cols, ci.ld, ai.ld, bi.ld]
            .iter()
            .any(|&d| d > max_dim)
        {
            return false;
        }
        log::trace!(
            "cblas gemm {}x{}x{} ({:?})",
            ci.rows,
            ai.cols,
            ci.cols,
            T::BLAS_KIND
        );
        match T::BLAS_KIND {
            Some(linexpr_traits::BlasKind::Double) => {
                call_gemm!(f64, cblas::dgemm, c, beta, a, b, alpha, ci, ai, bi)
            }
            Some(linexpr_traits::BlasKind::Single) => {
                call_gemm!(f32, cblas::sgemm, c, beta, a, b, alpha, ci, ai, bi)
            }
            Some(linexpr_traits::BlasKind::ComplexDouble) => {
                call_gemm!(Complex64, cblas::zgemm, c, beta, a, b, alpha, ci, ai, bi)
            }
            Some(linexpr_traits::BlasKind::ComplexSingle) => {
                call_gemm!(Complex32, cblas::cgemm, c, beta, a, b, alpha, ci, ai, bi)
            }
            None => false,
        }
    }
}

#[cfg(all(feature = "faer", not(feature = "blas")))]
mod faer_backend {
    use faer::linalg::matmul::matmul_with_conj;
    use faer::{Accum, Conj, Par};
    use linexpr_traits::Scalar;
    use num_complex::{Complex32, Complex64};

    use crate::layout::{MatMut, MatRef};

    macro_rules! faer_gemm {
        ($t:ty, $c:expr, $beta:expr, $a:expr, $b:expr, $alpha:expr) => {{
            let (Some(alpha), Some(beta)) = (crate::cast::<_, $t>($alpha), crate::cast::<_, $t>($beta))
            else {
                return false;
            };
            let zero: $t = num_traits::Zero::zero();
            let one: $t = num_traits::One::one();
            let accum = if beta == zero { Accum::Replace } else { Accum::Add };
            let mut c = $c;
            if beta != zero && beta != one {
                for i in 0..c.rows() {
                    for j in 0..c.cols() {
                        let v = c.get(i, j) * $beta;
                        c.set(i, j, v);
                    }
                }
            }
            unsafe {
                let a_mat = faer::MatRef::<$t>::from_raw_parts(
                    $a.as_ptr() as *const $t,
                    $a.rows(),
                    $a.cols(),
                    $a.row_stride(),
                    $a.col_stride(),
                );
                let b_mat = faer::MatRef::<$t>::from_raw_parts(
                    $b.as_ptr() as *const $t,
                    $b.rows(),
                    $b.cols(),
                    $b.row_stride(),
                    $b.col_stride(),
                );
                let c_mat = faer::MatMut::<$t>::from_raw_parts_mut(
                    c.as_mut_ptr() as *mut $t,
                    c.rows(),
                    c.cols(),
                    c.row_stride(),
                    c.col_stride(),
                );
                matmul_with_conj(c_mat, accum, a_mat, Conj::No, b_mat, Conj::No, alpha, Par::Seq);
            }
            true
        }};
    }

    pub(super) fn gemm<T: Scalar>(
        c: MatMut<'_, T>,
        beta: T,
        a: MatRef<'_, T>,
        b: MatRef<'_, T>,
        alpha: T,
    ) -> bool {
        log::trace!(
            "faer matmul {}x{}x{} ({:?})",
            c.rows(),
            a.cols(),
            c.cols(),
            T::BLAS_KIND
        );
        match T::BLAS_KIND {
            Some(linexpr_traits::BlasKind::Double) => faer_gemm!(f64, c, beta, a, b, alpha),
            Some(linexpr_traits::BlasKind::Single) => faer_gemm!(f32, c, beta, a, b, alpha),
            Some(linexpr_traits::BlasKind::ComplexDouble) => {
                faer_gemm!(Complex64, c, beta, a, b, alpha)
            }
            Some(linexpr_traits::BlasKind::ComplexSingle) => {
                faer_gemm!(Complex32, c, beta, a, b, alpha)
            }
            None => false,
        }
    }
}
