//! Static storage-order tags for dense matrices.
//!
//! The storage order is part of a matrix type, so every expression node knows
//! the order of its result at compile time. Mixed-order combinations follow
//! fixed promotion rules:
//!
//! ```text
//!   elementwise | Row  | Col
//!  -------------|------|-----
//!   Row         | Row  | Row
//!   Col         | Row  | Col
//! ```
//!
//! Products take the order of their left operand, transposition flips it.

use std::fmt::Debug;

/// Storage order of a dense 2D container.
pub trait StorageOrder: Copy + Default + Debug + Send + Sync + 'static {
    /// `true` for row-major, `false` for column-major.
    const ROW_MAJOR: bool;

    /// The order of the transposed matrix.
    type Transposed: StorageOrder;

    /// Element strides `(row_stride, col_stride)` of a packed `rows x cols` buffer.
    #[inline]
    fn packed_strides(rows: usize, cols: usize) -> (isize, isize) {
        if Self::ROW_MAJOR {
            (cols as isize, 1)
        } else {
            (1, rows as isize)
        }
    }

    /// Linear index of `(i, j)` in a packed `rows x cols` buffer.
    #[inline(always)]
    fn packed_index(i: usize, j: usize, rows: usize, cols: usize) -> usize {
        if Self::ROW_MAJOR {
            i * cols + j
        } else {
            j * rows + i
        }
    }

    /// Human-readable name.
    fn name() -> &'static str {
        if Self::ROW_MAJOR {
            "row-major"
        } else {
            "column-major"
        }
    }
}

/// Row-major order: elements of a row are contiguous.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RowMajor;

/// Column-major order: elements of a column are contiguous.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ColumnMajor;

impl StorageOrder for RowMajor {
    const ROW_MAJOR: bool = true;
    type Transposed = ColumnMajor;
}

impl StorageOrder for ColumnMajor {
    const ROW_MAJOR: bool = false;
    type Transposed = RowMajor;
}

/// Result order of an elementwise combination of `Self` and `Rhs`.
pub trait PromoteOrder<Rhs: StorageOrder>: StorageOrder {
    /// Promoted order.
    type Output: StorageOrder;
}

impl PromoteOrder<RowMajor> for RowMajor {
    type Output = RowMajor;
}

impl PromoteOrder<ColumnMajor> for RowMajor {
    type Output = RowMajor;
}

impl PromoteOrder<RowMajor> for ColumnMajor {
    type Output = RowMajor;
}

impl PromoteOrder<ColumnMajor> for ColumnMajor {
    type Output = ColumnMajor;
}

/// Shorthand for the promoted order of two operands.
pub type Promoted<L, R> = <L as PromoteOrder<R>>::Output;

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::TypeId;

    fn same<A: 'static, B: 'static>() -> bool {
        TypeId::of::<A>() == TypeId::of::<B>()
    }

    #[test]
    fn test_packed_strides() {
        assert_eq!(RowMajor::packed_strides(3, 4), (4, 1));
        assert_eq!(ColumnMajor::packed_strides(3, 4), (1, 3));
        assert_eq!(RowMajor::packed_index(1, 2, 3, 4), 6);
        assert_eq!(ColumnMajor::packed_index(1, 2, 3, 4), 7);
    }

    #[test]
    fn test_promotion() {
        assert!(same::<Promoted<RowMajor, RowMajor>, RowMajor>());
        assert!(same::<Promoted<RowMajor, ColumnMajor>, RowMajor>());
        assert!(same::<Promoted<ColumnMajor, RowMajor>, RowMajor>());
        assert!(same::<Promoted<ColumnMajor, ColumnMajor>, ColumnMajor>());
    }

    #[test]
    fn test_transposed_flips() {
        assert!(same::<<RowMajor as StorageOrder>::Transposed, ColumnMajor>());
        assert!(same::<<ColumnMajor as StorageOrder>::Transposed, RowMajor>());
        assert_eq!(RowMajor::name(), "row-major");
    }
}
