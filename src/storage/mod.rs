//! Containers, views and sparse leaves.
//!
//! Every type here is an expression leaf: it implements [`VecExpr`] or
//! [`MatExpr`](crate::MatExpr) by reading its own buffer. Owned containers
//! and mutable views are also assignment targets.
//!
//! [`VecExpr`]: crate::VecExpr

mod dense;
mod fixed;
mod sparse;
mod symmetric;
mod view;

pub use dense::{DynamicMatrix, DynamicVector};
pub use fixed::{StaticMatrix, StaticVector};
pub use sparse::{CompressedMatrix, CompressedVector};
pub use symmetric::{SymmetricMatrix, SymmetricProxy};
pub use view::{Aliased, MatrixView, MatrixViewMut, VectorView, VectorViewMut};

use crate::{LinexprError, Result};

/// Bounds check for element `(i, j)` of a `shape` container.
#[inline]
pub(crate) fn check_index(i: usize, j: usize, shape: (usize, usize)) -> Result<()> {
    if i < shape.0 && j < shape.1 {
        Ok(())
    } else {
        Err(LinexprError::IndexOutOfBounds {
            index: (i, j),
            shape,
        })
    }
}

/// Validate a `rows x cols` block at `(row, col)` inside `shape`.
pub(crate) fn check_block(
    shape: (usize, usize),
    row: usize,
    col: usize,
    rows: usize,
    cols: usize,
) -> Result<()> {
    let fits = row.checked_add(rows).is_some_and(|end| end <= shape.0)
        && col.checked_add(cols).is_some_and(|end| end <= shape.1);
    if fits {
        Ok(())
    } else {
        Err(LinexprError::InvalidView(format!(
            "{rows}x{cols} block at ({row}, {col}) exceeds {}x{}",
            shape.0, shape.1
        )))
    }
}

/// Validate `len` elements from `start` inside a vector of `size`.
pub(crate) fn check_range(size: usize, start: usize, len: usize) -> Result<()> {
    if start.checked_add(len).is_some_and(|end| end <= size) {
        Ok(())
    } else {
        Err(LinexprError::InvalidView(format!(
            "range {start}..{} exceeds length {size}",
            start.saturating_add(len)
        )))
    }
}
