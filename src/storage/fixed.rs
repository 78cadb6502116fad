//! Fixed-size containers with inline storage.
//!
//! Extents are part of the type, so these are never resized: assigning an
//! expression of different extents fails with a shape mismatch and leaves
//! the container as it was.

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use linexpr_kernel::{MatMut, MatRef, VecMut, VecRef};
use linexpr_traits::{RowMajor, StorageOrder};

use super::check_index;
use super::view::{MatrixView, MatrixViewMut, VectorView, VectorViewMut};
use crate::assign::{MatrixTarget, VectorTarget};
use crate::expr::{MatExpr, VecExpr};
use crate::{Result, Scalar};

// ============================================================================
// StaticVector
// ============================================================================

/// Vector of exactly `N` elements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticVector<T, const N: usize> {
    data: [T; N],
}

impl<T: Scalar, const N: usize> Default for StaticVector<T, N> {
    fn default() -> Self {
        Self::zeros()
    }
}

impl<T: Scalar, const N: usize> StaticVector<T, N> {
    pub fn zeros() -> Self {
        Self {
            data: [T::zero(); N],
        }
    }

    pub fn from_array(data: [T; N]) -> Self {
        Self { data }
    }

    pub fn from_fn(f: impl FnMut(usize) -> T) -> Self {
        Self {
            data: std::array::from_fn(f),
        }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        N
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    pub fn fill(&mut self, value: T) {
        self.data = [value; N];
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_array(self) -> [T; N] {
        self.data
    }

    #[inline]
    pub fn raw(&self) -> VecRef<'_, T> {
        VecRef::from_slice(&self.data)
    }

    #[inline]
    pub fn raw_mut(&mut self) -> VecMut<'_, T> {
        let ptr = std::ptr::addr_of_mut!(self.data).cast::<T>();
        // SAFETY: `N` contiguous elements, exclusively borrowed.
        unsafe { VecMut::from_raw_parts(ptr, N, 1) }
    }

    pub fn at(&self, i: usize) -> Result<T> {
        check_index(i, 0, (N, 1))?;
        Ok(self.data[i])
    }

    pub fn set(&mut self, i: usize, value: T) -> Result<()> {
        check_index(i, 0, (N, 1))?;
        self.data[i] = value;
        Ok(())
    }

    pub fn view(&self) -> VectorView<'_, T> {
        VectorView::from_ref(self.raw())
    }

    pub fn view_mut(&mut self) -> VectorViewMut<'_, T> {
        VectorViewMut::from_mut(self.raw_mut())
    }
}

impl<T: Scalar, const N: usize> From<[T; N]> for StaticVector<T, N> {
    fn from(data: [T; N]) -> Self {
        Self { data }
    }
}

impl<T, const N: usize> Index<usize> for StaticVector<T, N> {
    type Output = T;

    #[inline]
    fn index(&self, i: usize) -> &T {
        &self.data[i]
    }
}

impl<T, const N: usize> IndexMut<usize> for StaticVector<T, N> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.data[i]
    }
}

impl<T: Scalar, const N: usize> VecExpr for StaticVector<T, N> {
    type Elem = T;

    #[inline]
    fn size(&self) -> usize {
        N
    }

    #[inline(always)]
    fn get(&self, i: usize) -> T {
        self.data[i]
    }

    fn as_vec_ref(&self) -> Option<VecRef<'_, T>> {
        Some(self.raw())
    }
}

impl<T: Scalar, const N: usize> VectorTarget for StaticVector<T, N> {
    type Elem = T;

    fn target_len(&self) -> usize {
        N
    }

    fn target_mut(&mut self) -> VecMut<'_, T> {
        self.raw_mut()
    }
}

// ============================================================================
// StaticMatrix
// ============================================================================

/// `M x N` matrix stored inline in order `SO`.
///
/// The `M * N` elements are kept as `[[T; N]; M]` and addressed as one flat
/// buffer, so for column-major storage the inner arrays are not columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticMatrix<T, const M: usize, const N: usize, SO = RowMajor> {
    data: [[T; N]; M],
    _order: PhantomData<SO>,
}

impl<T: Scalar, const M: usize, const N: usize, SO: StorageOrder> Default
    for StaticMatrix<T, M, N, SO>
{
    fn default() -> Self {
        Self::zeros()
    }
}

impl<T: Scalar, const M: usize, const N: usize, SO: StorageOrder> StaticMatrix<T, M, N, SO> {
    pub fn zeros() -> Self {
        Self {
            data: [[T::zero(); N]; M],
            _order: PhantomData,
        }
    }

    pub fn from_fn(mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut m = Self::zeros();
        let flat = m.data.as_flattened_mut();
        for i in 0..M {
            for j in 0..N {
                flat[SO::packed_index(i, j, M, N)] = f(i, j);
            }
        }
        m
    }

    /// Matrix from row literals, whatever the storage order.
    pub fn from_rows(rows: [[T; N]; M]) -> Self {
        Self::from_fn(|i, j| rows[i][j])
    }

    /// Ones on the main diagonal.
    pub fn identity() -> Self {
        Self::from_fn(|i, j| if i == j { T::one() } else { T::zero() })
    }

    #[inline]
    pub const fn rows(&self) -> usize {
        M
    }

    #[inline]
    pub const fn cols(&self) -> usize {
        N
    }

    pub fn fill(&mut self, value: T) {
        self.data = [[value; N]; M];
    }

    /// The buffer in storage order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.data.as_flattened()
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data.as_flattened_mut()
    }

    #[inline]
    pub fn raw(&self) -> MatRef<'_, T> {
        MatRef::from_slice(self.as_slice(), M, N, SO::ROW_MAJOR)
    }

    #[inline]
    pub fn raw_mut(&mut self) -> MatMut<'_, T> {
        let (rs, cs) = SO::packed_strides(M, N);
        let ptr = std::ptr::addr_of_mut!(self.data).cast::<T>();
        // SAFETY: `M * N` contiguous elements, exclusively borrowed.
        unsafe { MatMut::from_raw_parts(ptr, M, N, rs, cs) }
    }

    pub fn at(&self, i: usize, j: usize) -> Result<T> {
        check_index(i, j, (M, N))?;
        Ok(self.as_slice()[SO::packed_index(i, j, M, N)])
    }

    pub fn set(&mut self, i: usize, j: usize, value: T) -> Result<()> {
        check_index(i, j, (M, N))?;
        self.as_mut_slice()[SO::packed_index(i, j, M, N)] = value;
        Ok(())
    }

    pub fn view(&self) -> MatrixView<'_, T, SO> {
        MatrixView::from_ref(self.raw())
    }

    pub fn view_mut(&mut self) -> MatrixViewMut<'_, T, SO> {
        MatrixViewMut::from_mut(self.raw_mut())
    }

    pub fn submatrix(
        &self,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    ) -> Result<MatrixView<'_, T, SO>> {
        self.view().submatrix(row, col, rows, cols)
    }

    pub fn row(&self, i: usize) -> Result<VectorView<'_, T>> {
        self.view().row(i)
    }

    pub fn column(&self, j: usize) -> Result<VectorView<'_, T>> {
        self.view().column(j)
    }

    pub fn t(&self) -> MatrixView<'_, T, SO::Transposed> {
        self.view().t()
    }
}

impl<T: Scalar, const M: usize, const N: usize, SO: StorageOrder> Index<(usize, usize)>
    for StaticMatrix<T, M, N, SO>
{
    type Output = T;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &T {
        assert!(i < M && j < N, "index ({i}, {j}) out of bounds");
        &self.as_slice()[SO::packed_index(i, j, M, N)]
    }
}

impl<T: Scalar, const M: usize, const N: usize, SO: StorageOrder> IndexMut<(usize, usize)>
    for StaticMatrix<T, M, N, SO>
{
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        assert!(i < M && j < N, "index ({i}, {j}) out of bounds");
        &mut self.as_mut_slice()[SO::packed_index(i, j, M, N)]
    }
}

impl<T: Scalar, const M: usize, const N: usize, SO: StorageOrder> MatExpr
    for StaticMatrix<T, M, N, SO>
{
    type Elem = T;
    type Order = SO;

    #[inline]
    fn rows(&self) -> usize {
        M
    }

    #[inline]
    fn cols(&self) -> usize {
        N
    }

    #[inline(always)]
    fn get(&self, i: usize, j: usize) -> T {
        self.as_slice()[SO::packed_index(i, j, M, N)]
    }

    fn as_mat_ref(&self) -> Option<MatRef<'_, T>> {
        Some(self.raw())
    }
}

impl<T: Scalar, const M: usize, const N: usize, SO: StorageOrder> MatrixTarget
    for StaticMatrix<T, M, N, SO>
{
    type Elem = T;
    type Order = SO;

    fn target_shape(&self) -> (usize, usize) {
        (M, N)
    }

    fn target_mut(&mut self) -> MatMut<'_, T> {
        self.raw_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linexpr_traits::ColumnMajor;

    #[test]
    fn test_static_matrix_layout() {
        let m = StaticMatrix::<i32, 2, 3, ColumnMajor>::from_rows([[1, 2, 3], [4, 5, 6]]);
        assert_eq!(m.as_slice(), &[1, 4, 2, 5, 3, 6]);
        assert_eq!(m[(1, 0)], 4);
        assert_eq!(MatExpr::get(&m, 0, 2), 3);
        assert_eq!(m.t().at(2, 1).unwrap(), 6);
        assert!(m.at(2, 0).is_err());
    }

    #[test]
    fn test_static_vector_access() {
        let mut v = StaticVector::from([1.0, 2.0, 3.0]);
        v[0] = 4.0;
        v.set(2, 5.0).unwrap();
        assert_eq!(v.as_slice(), &[4.0, 2.0, 5.0]);
        assert!(v.at(3).is_err());
        assert_eq!(v.len(), 3);
    }
}
