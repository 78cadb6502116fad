//! Compile-time queries over operand types.
//!
//! Each predicate reads an associated constant, so it can be used in `const`
//! contexts and folds away in ordinary code.
//!
//! ```rust
//! use linexpr::prelude::*;
//! use linexpr::traits::*;
//! use linexpr::MatMul;
//!
//! type M = DynamicMatrix<f64>;
//! const BUFFERED: bool = requires_evaluation::<MatMul<&'static M, &'static M>>();
//! assert!(BUFFERED);
//! assert!(is_row_major_matrix::<M>());
//! assert!(!is_dense_matrix::<CompressedMatrix<f64>>());
//! assert!(is_resizable::<M>());
//! assert!(!is_resizable::<StaticMatrix<f64, 2, 2>>());
//! ```

use linexpr_traits::StorageOrder;

use crate::assign::{MatrixTarget, VectorTarget};
use crate::expr::{MatExpr, VecExpr};

pub const fn is_dense_matrix<E: MatExpr>() -> bool {
    E::IS_DENSE
}

pub const fn is_sparse_matrix<E: MatExpr>() -> bool {
    !E::IS_DENSE
}

pub const fn is_dense_vector<E: VecExpr>() -> bool {
    E::IS_DENSE
}

pub const fn is_sparse_vector<E: VecExpr>() -> bool {
    !E::IS_DENSE
}

pub const fn is_row_major_matrix<E: MatExpr>() -> bool {
    <E::Order as StorageOrder>::ROW_MAJOR
}

pub const fn is_column_major_matrix<E: MatExpr>() -> bool {
    !<E::Order as StorageOrder>::ROW_MAJOR
}

/// Whether element `(i, j)` depends only on element `(i, j)` of the leaves.
pub const fn is_elementwise<E: MatExpr>() -> bool {
    E::ELEMENTWISE
}

pub const fn is_elementwise_vector<E: VecExpr>() -> bool {
    E::ELEMENTWISE
}

/// Whether the expression holds a product or other subtree that is
/// evaluated into a temporary before use.
pub const fn requires_evaluation<E: MatExpr>() -> bool {
    E::REQUIRES_EVALUATION
}

pub const fn requires_evaluation_vector<E: VecExpr>() -> bool {
    E::REQUIRES_EVALUATION
}

/// Whether the expression may read the storage it is assigned to.
pub const fn can_alias<E: MatExpr>() -> bool {
    E::CAN_ALIAS
}

pub const fn can_alias_vector<E: VecExpr>() -> bool {
    E::CAN_ALIAS
}

pub const fn is_resizable<T: MatrixTarget>() -> bool {
    T::IS_RESIZABLE
}

pub const fn is_resizable_vector<T: VectorTarget>() -> bool {
    T::IS_RESIZABLE
}

/// Whether products of this expression may be delegated to BLAS.
pub const fn is_blas_compatible<E: MatExpr>() -> bool {
    linexpr_traits::is_blas_compatible::<E::Elem>()
}

pub const fn is_blas_compatible_vector<E: VecExpr>() -> bool {
    linexpr_traits::is_blas_compatible::<E::Elem>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CompressedVector, DynamicMatrix, DynamicVector, StaticVector, SymmetricMatrix};
    use crate::{Aliased, MatVec, MatrixView, Trans, VecZip};
    use linexpr_traits::{ColumnMajor, Plus, RowMajor};

    type Dm = DynamicMatrix<f64>;
    type Dv = DynamicVector<f64>;

    #[test]
    fn test_container_queries() {
        assert!(is_dense_matrix::<Dm>());
        assert!(is_column_major_matrix::<DynamicMatrix<f32, ColumnMajor>>());
        assert!(is_row_major_matrix::<Trans<DynamicMatrix<f32, ColumnMajor>>>());
        assert!(is_sparse_vector::<CompressedVector<f64>>());
        assert!(is_resizable::<SymmetricMatrix<f64>>());
        assert!(is_resizable_vector::<Dv>());
        assert!(!is_resizable_vector::<StaticVector<f64, 3>>());
        assert!(!is_blas_compatible::<DynamicMatrix<i32>>());
        assert!(is_blas_compatible_vector::<Dv>());
    }

    #[test]
    fn test_expression_queries() {
        type Sum<'a> = VecZip<&'a Dv, &'a Dv, Plus>;
        assert!(is_elementwise_vector::<Sum<'static>>());
        assert!(!can_alias_vector::<Sum<'static>>());
        assert!(requires_evaluation_vector::<MatVec<&'static Dm, &'static Dv>>());
        assert!(!is_elementwise::<Trans<&'static Dm>>());
        assert!(can_alias::<Aliased<MatrixView<'static, f64, RowMajor>>>());
    }
}
