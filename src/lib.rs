//! Expression-template linear algebra with aliasing-aware evaluation.
//!
//! Arithmetic on vectors and matrices does not compute anything. It builds a
//! lightweight expression node that records its operands and the operation.
//! Work happens only when an expression is assigned to a target, at which
//! point the evaluator picks a strategy based on properties that are known at
//! compile time (storage order, density, whether the expression is
//! elementwise) and, when needed, a run-time overlap check.
//!
//! # Core Types
//!
//! - [`DynamicVector`] / [`DynamicMatrix`]: heap-backed, resizable containers
//! - [`StaticVector`] / [`StaticMatrix`]: fixed-size containers with inline storage
//! - [`MatrixView`] / [`MatrixViewMut`], [`VectorView`] / [`VectorViewMut`]:
//!   submatrix, row, column and band views into existing storage
//! - [`CompressedVector`] / [`CompressedMatrix`]: sparse operands
//! - [`SymmetricMatrix`]: a square adaptor that keeps `a(i, j) == a(j, i)`
//!
//! # Expressions
//!
//! - [`VecExpr`] / [`MatExpr`]: the expression traits every operand implements
//! - Elementwise nodes: [`VecZip`], [`MatZip`], [`VecScale`], [`MatScale`],
//!   [`VecUnary`], [`MatUnary`], [`VecMap`], [`MatMap`]
//! - Products: [`MatMul`], [`MatVec`], [`Outer`], [`Kron`], [`Cross`]
//! - Structural: [`Trans`], [`RowReduce`], [`ColReduce`]
//!
//! # Evaluation
//!
//! - [`MatrixTarget`] / [`VectorTarget`]: `assign`, `add_assign`, `sub_assign`
//!   and the in-place `update` forms that may read the target itself
//! - [`EvalConfig`]: alias checking, parallel thresholds, backend selection
//! - [`decomp`]: LU, Cholesky, pivoted Cholesky and QR built on the kernel crate
//!
//! # Example
//!
//! ```rust
//! use linexpr::prelude::*;
//!
//! let a = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
//! let x = DynamicVector::from_vec(vec![1.0, 1.0]);
//!
//! let mut y = DynamicVector::<f64>::new(0);
//! y.assign(&a * &x * 2.0_f64).unwrap();
//! assert_eq!(y.as_slice(), &[6.0, 14.0]);
//!
//! // The right-hand side may read the target.
//! let mut m = a.clone();
//! m.update(|m| m * m).unwrap();
//! assert_eq!(m.as_slice(), &[7.0, 10.0, 15.0, 22.0]);
//! ```
//!
//! # Aliasing
//!
//! Owned containers can only appear on the right-hand side through a shared
//! borrow, so the borrow checker already rules out assigning a container to
//! an expression that reads it. The `update` family hands the closure an
//! [`Aliased`] view of the target instead; only expressions built from such
//! views ever go through the overlap check.

mod assign;
mod config;
pub mod decomp;
mod expr;
mod ops;
mod storage;
pub mod traits;

// ============================================================================
// Configuration and evaluation
// ============================================================================
pub use assign::{MatrixTarget, Strategy, VectorTarget};
pub use config::{AliasCheck, EvalConfig};

// ============================================================================
// Expressions
// ============================================================================
pub use expr::{
    cross, eval, eval_vector, inner, kron, outer, AssignOp, ColReduce, Cross, Kron, MatExpr,
    MatMap, MatMul, MatScale, MatUnary, MatVec, MatZip, MemSpan, Outer, Overlap, RowReduce,
    Trans, VecExpr, VecMap, VecScale, VecUnary, VecZip,
};
pub use ops::{
    MatKind, MatMulAssignDispatch, MatMulDispatch, Operand, ScalarKind, VecKind,
    VecMulAssignDispatch, VecMulDispatch,
};

// ============================================================================
// Storage
// ============================================================================
pub use storage::{
    Aliased, CompressedMatrix, CompressedVector, DynamicMatrix, DynamicVector, MatrixView,
    MatrixViewMut, StaticMatrix, StaticVector, SymmetricMatrix, SymmetricProxy, VectorView,
    VectorViewMut,
};

pub use linexpr_traits::{
    BinaryOp, ColumnMajor, Conjugate, Divide, Identity, Maximum, Minimum, Minus, Modulus, Negate,
    Plus, Product, ReduceOp, RowMajor, Scalar, SquareRoot, StorageOrder, Sum, Times, UnaryOp,
};

/// Everything needed to build and evaluate expressions.
pub mod prelude {
    pub use crate::{
        AliasCheck, ColumnMajor, CompressedMatrix, CompressedVector, DynamicMatrix,
        DynamicVector, EvalConfig, MatExpr, MatrixTarget, RowMajor, Scalar, StaticMatrix,
        StaticVector, SymmetricMatrix, VecExpr, VectorTarget,
    };
}

// ============================================================================
// Error types
// ============================================================================

/// Errors raised while building or evaluating expressions.
///
/// Vector extents are reported as `(len, 1)`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinexprError {
    /// Operand or target extents are incompatible.
    #[error("shape mismatch in {op}: {lhs:?} vs {rhs:?}")]
    ShapeMismatch {
        op: &'static str,
        lhs: (usize, usize),
        rhs: (usize, usize),
    },

    /// A fixed-size container was asked to change its extents.
    #[error("cannot resize a fixed {rows}x{cols} target")]
    NotResizable { rows: usize, cols: usize },

    /// A square matrix was required.
    #[error("{op} requires a square matrix, got {rows}x{cols}")]
    NonSquare {
        op: &'static str,
        rows: usize,
        cols: usize,
    },

    /// Element access outside the container.
    #[error("index {index:?} out of bounds for extents {shape:?}")]
    IndexOutOfBounds {
        index: (usize, usize),
        shape: (usize, usize),
    },

    /// A view request does not fit its parent.
    #[error("invalid view: {0}")]
    InvalidView(String),

    /// A symmetric target would lose its symmetry.
    #[error("not symmetric: element ({row}, {col}) differs from its mirror")]
    NotSymmetric { row: usize, col: usize },

    /// Factorization hit an exactly zero pivot (1-based).
    #[error("matrix is singular: zero pivot at {pivot}")]
    Singular { pivot: usize },

    /// Cholesky failed at the given leading minor (1-based).
    #[error("matrix is not positive definite: leading minor {minor}")]
    NotPositiveDefinite { minor: usize },

    /// A factorization routine returned a status it has no dedicated variant for.
    #[error("{routine} failed with info = {info}")]
    Lapack { routine: &'static str, info: i32 },

    #[error(transparent)]
    Kernel(#[from] linexpr_kernel::KernelError),
}

/// Result type for expression construction and evaluation.
pub type Result<T> = std::result::Result<T, LinexprError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LinexprError::ShapeMismatch {
            op: "assignment",
            lhs: (2, 2),
            rhs: (3, 3),
        };
        assert_eq!(err.to_string(), "shape mismatch in assignment: (2, 2) vs (3, 3)");
        let err = LinexprError::Lapack {
            routine: "getrf",
            info: -4,
        };
        assert_eq!(err.to_string(), "getrf failed with info = -4");
    }

    #[test]
    fn test_kernel_error_converts() {
        let inner = linexpr_kernel::KernelError::NotSquare {
            routine: "potrf",
            rows: 2,
            cols: 3,
        };
        let err: LinexprError = inner.clone().into();
        assert_eq!(err, LinexprError::Kernel(inner));
    }
}
