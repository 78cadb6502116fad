//! Shared type-level vocabulary for the linexpr workspace.
//!
//! This crate holds the element-type bounds, storage-order tags and
//! element-operation markers that `linexpr-kernel` and `linexpr` both
//! build on. It has no knowledge of containers or expressions.

pub mod element_op;
pub mod order;
pub mod scalar;

pub use element_op::{
    fold, BinaryKind, BinaryOp, Conjugate, Divide, Identity, Maximum, Minimum, Minus, Modulus, Negate, Plus,
    Product, ReduceOp, SquareRoot, Sum, Times, UnaryOp,
};
pub use order::{ColumnMajor, PromoteOrder, Promoted, RowMajor, StorageOrder};
pub use scalar::{is_blas_compatible, BlasKind, Scalar};
