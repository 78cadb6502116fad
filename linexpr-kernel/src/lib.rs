//! Dense kernels on strided matrix and vector buffers.
//!
//! This crate holds the numeric work behind the `linexpr` expression engine.
//! Expression nodes never touch raw memory directly; once the engine has
//! chosen a strategy it hands buffers to the routines here.
//!
//! # Buffer references
//!
//! - [`MatRef`] / [`MatMut`]: strided matrix references (pointer, extents, strides)
//! - [`VecRef`] / [`VecMut`]: strided vector references
//!
//! # Routines
//!
//! - [`gemm`], [`gemv`]: `C = alpha * A * B + beta * C` with BLAS / faer delegation
//! - [`simd::sum`], [`simd::dot`], [`simd::axpy`], [`simd::scale`]: contiguous slice kernels
//! - [`lapack`]: LU, Cholesky, pivoted Cholesky and Householder QR on column-major buffers
//! - [`threading::par_rows`], [`threading::par_chunks`]: disjoint work partitioning
//!
//! # Backends
//!
//! | Feature  | Effect                                                   |
//! |----------|----------------------------------------------------------|
//! | `blas`   | `gemm` calls `cblas_?gemm` for `f32`, `f64` and complex   |
//! | `faer`   | `gemm` calls `faer::linalg::matmul` when BLAS is absent  |
//! | `simd`   | pulp-vectorized slice kernels for `f32` and `f64`        |
//! | `parallel` | rayon splitting in `par_rows` / `par_chunks`          |
//!
//! Without any feature, every routine runs a portable blocked loop.
//!
//! # Example
//!
//! ```rust
//! use linexpr_kernel::{gemm, MatMut, MatRef, Parallelism};
//!
//! let a = [1.0, 2.0, 3.0, 4.0];
//! let b = [5.0, 6.0, 7.0, 8.0];
//! let mut c = [0.0; 4];
//!
//! let a = MatRef::from_slice(&a, 2, 2, true);
//! let b = MatRef::from_slice(&b, 2, 2, true);
//! gemm(MatMut::from_slice(&mut c, 2, 2, true), 0.0, a, b, 1.0, Parallelism::None).unwrap();
//! assert_eq!(c, [19.0, 22.0, 43.0, 50.0]);
//! ```

mod backend;
mod gemm;
pub mod lapack;
mod layout;
pub mod maybe_sync;
pub mod simd;
pub mod threading;

pub use gemm::{gemm, gemm_portable, gemv, gemv_portable, Parallelism};
pub use layout::{BlasLayout, BlasMatrix, MatMut, MatRef, VecMut, VecRef};
pub use maybe_sync::{MaybeSend, MaybeSendSync, MaybeSync};

#[cfg(any(feature = "simd", feature = "blas", feature = "faer"))]
use std::any::TypeId;

/// Errors raised by the kernels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    /// Operand extents are incompatible for the requested routine.
    #[error("{routine}: incompatible extents {lhs:?} and {rhs:?}")]
    DimensionMismatch {
        routine: &'static str,
        lhs: (usize, usize),
        rhs: (usize, usize),
    },

    /// A square matrix was required.
    #[error("{routine}: matrix is {rows}x{cols}, expected square")]
    NotSquare {
        routine: &'static str,
        rows: usize,
        cols: usize,
    },
}

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;

/// Reinterpret a value of `T` as `U` when both are the same type.
#[cfg(any(feature = "simd", feature = "blas", feature = "faer"))]
#[inline(always)]
pub(crate) fn cast<T: 'static, U: 'static>(value: T) -> Option<U> {
    if TypeId::of::<T>() == TypeId::of::<U>() {
        // SAFETY: identical types.
        let out = unsafe { std::mem::transmute_copy::<T, U>(&value) };
        std::mem::forget(value);
        Some(out)
    } else {
        None
    }
}

/// Reinterpret a slice of `T` as a slice of `U` when both are the same type.
#[cfg(feature = "simd")]
#[inline(always)]
pub(crate) fn cast_slice<T: 'static, U: 'static>(values: &[T]) -> Option<&[U]> {
    if TypeId::of::<T>() == TypeId::of::<U>() {
        // SAFETY: identical types.
        Some(unsafe { std::slice::from_raw_parts(values.as_ptr() as *const U, values.len()) })
    } else {
        None
    }
}

/// Mutable counterpart of [`cast_slice`].
#[cfg(feature = "simd")]
#[inline(always)]
pub(crate) fn cast_slice_mut<T: 'static, U: 'static>(values: &mut [T]) -> Option<&mut [U]> {
    if TypeId::of::<T>() == TypeId::of::<U>() {
        // SAFETY: identical types.
        Some(unsafe {
            std::slice::from_raw_parts_mut(values.as_mut_ptr() as *mut U, values.len())
        })
    } else {
        None
    }
}
