//! Heap-backed, resizable vectors and matrices.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use linexpr_kernel::{MatMut, MatRef, VecMut, VecRef};
use linexpr_traits::{RowMajor, StorageOrder};
use rand::distributions::Distribution;
use rand::Rng;

use super::view::{MatrixView, MatrixViewMut, VectorView, VectorViewMut};
use super::check_index;
use crate::assign::{MatrixTarget, VectorTarget};
use crate::expr::{MatExpr, VecExpr};
use crate::{LinexprError, Result, Scalar};

// ============================================================================
// DynamicVector
// ============================================================================

/// Contiguous, resizable column vector.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DynamicVector<T> {
    data: Vec<T>,
}

impl<T: Scalar> DynamicVector<T> {
    /// Zero vector of length `len`.
    pub fn new(len: usize) -> Self {
        Self::zeros(len)
    }

    pub fn zeros(len: usize) -> Self {
        Self {
            data: vec![T::zero(); len],
        }
    }

    pub fn from_vec(data: Vec<T>) -> Self {
        Self { data }
    }

    pub fn from_slice(values: &[T]) -> Self {
        Self {
            data: values.to_vec(),
        }
    }

    pub fn from_fn(len: usize, f: impl FnMut(usize) -> T) -> Self {
        Self {
            data: (0..len).map(f).collect(),
        }
    }

    /// Vector with elements drawn from `dist`.
    pub fn random<R, D>(len: usize, rng: &mut R, dist: &D) -> Self
    where
        R: Rng + ?Sized,
        D: Distribution<T>,
    {
        Self::from_fn(len, |_| dist.sample(rng))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Change the length, keeping the leading elements; new elements are zero.
    pub fn resize(&mut self, len: usize) {
        self.data.resize(len, T::zero());
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Strided reference to the elements.
    #[inline]
    pub fn raw(&self) -> VecRef<'_, T> {
        VecRef::from_slice(&self.data)
    }

    #[inline]
    pub fn raw_mut(&mut self) -> VecMut<'_, T> {
        // Built from `as_mut_ptr` so earlier pointers into the buffer stay valid.
        // SAFETY: `len` contiguous elements, exclusively borrowed.
        unsafe { VecMut::from_raw_parts(self.data.as_mut_ptr(), self.data.len(), 1) }
    }

    /// Checked element read.
    pub fn at(&self, i: usize) -> Result<T> {
        check_index(i, 0, (self.len(), 1))?;
        Ok(self.data[i])
    }

    /// Checked element write.
    pub fn set(&mut self, i: usize, value: T) -> Result<()> {
        check_index(i, 0, (self.len(), 1))?;
        self.data[i] = value;
        Ok(())
    }

    pub fn view(&self) -> VectorView<'_, T> {
        VectorView::from_ref(self.raw())
    }

    pub fn view_mut(&mut self) -> VectorViewMut<'_, T> {
        VectorViewMut::from_mut(self.raw_mut())
    }

    /// Elements `[start, start + len)`.
    pub fn subvector(&self, start: usize, len: usize) -> Result<VectorView<'_, T>> {
        self.view().subvector(start, len)
    }

    pub fn subvector_mut(&mut self, start: usize, len: usize) -> Result<VectorViewMut<'_, T>> {
        self.view_mut().subvector(start, len)
    }
}

impl<T: Scalar> From<Vec<T>> for DynamicVector<T> {
    fn from(data: Vec<T>) -> Self {
        Self::from_vec(data)
    }
}

impl<T> Index<usize> for DynamicVector<T> {
    type Output = T;

    #[inline]
    fn index(&self, i: usize) -> &T {
        &self.data[i]
    }
}

impl<T> IndexMut<usize> for DynamicVector<T> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.data[i]
    }
}

impl<T: Scalar> VecExpr for DynamicVector<T> {
    type Elem = T;

    #[inline]
    fn size(&self) -> usize {
        self.data.len()
    }

    #[inline(always)]
    fn get(&self, i: usize) -> T {
        self.data[i]
    }

    fn as_vec_ref(&self) -> Option<VecRef<'_, T>> {
        Some(self.raw())
    }
}

impl<T: Scalar> VectorTarget for DynamicVector<T> {
    type Elem = T;

    const IS_RESIZABLE: bool = true;

    fn target_len(&self) -> usize {
        self.data.len()
    }

    fn resize_target(&mut self, len: usize) -> Result<()> {
        self.resize(len);
        Ok(())
    }

    fn target_mut(&mut self) -> VecMut<'_, T> {
        self.raw_mut()
    }
}

// ============================================================================
// DynamicMatrix
// ============================================================================

/// Contiguous, resizable matrix in storage order `SO`.
#[derive(Clone, PartialEq)]
pub struct DynamicMatrix<T, SO = RowMajor> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
    _order: PhantomData<SO>,
}

impl<T: fmt::Debug, SO: StorageOrder> fmt::Debug for DynamicMatrix<T, SO> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicMatrix")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("order", &SO::name())
            .field("data", &self.data)
            .finish()
    }
}

impl<T: Scalar, SO: StorageOrder> Default for DynamicMatrix<T, SO> {
    fn default() -> Self {
        Self::zeros(0, 0)
    }
}

impl<T: Scalar, SO: StorageOrder> DynamicMatrix<T, SO> {
    /// Zero matrix of `rows x cols`.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::zeros(rows, cols)
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![T::zero(); rows * cols],
            rows,
            cols,
            _order: PhantomData,
        }
    }

    /// Wrap a buffer already laid out in order `SO`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(LinexprError::ShapeMismatch {
                op: "matrix construction",
                lhs: (rows * cols, 1),
                rhs: (data.len(), 1),
            });
        }
        Ok(Self {
            data,
            rows,
            cols,
            _order: PhantomData,
        })
    }

    /// Matrix with element `(i, j) = f(i, j)`.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut m = Self::zeros(rows, cols);
        for i in 0..rows {
            for j in 0..cols {
                m.data[SO::packed_index(i, j, rows, cols)] = f(i, j);
            }
        }
        m
    }

    /// Matrix from row literals, whatever the storage order.
    pub fn from_rows<const N: usize>(rows: &[[T; N]]) -> Self {
        Self::from_fn(rows.len(), N, |i, j| rows[i][j])
    }

    /// `n x n` identity.
    pub fn identity(n: usize) -> Self {
        Self::from_fn(n, n, |i, j| if i == j { T::one() } else { T::zero() })
    }

    /// Matrix with elements drawn from `dist`.
    pub fn random<R, D>(rows: usize, cols: usize, rng: &mut R, dist: &D) -> Self
    where
        R: Rng + ?Sized,
        D: Distribution<T>,
    {
        Self::from_fn(rows, cols, |_, _| dist.sample(rng))
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Change the extents. Elements inside both the old and the new extents
    /// keep their values; the rest are zero.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        if (rows, cols) == (self.rows, self.cols) {
            return;
        }
        let mut data = vec![T::zero(); rows * cols];
        for i in 0..rows.min(self.rows) {
            for j in 0..cols.min(self.cols) {
                data[SO::packed_index(i, j, rows, cols)] =
                    self.data[SO::packed_index(i, j, self.rows, self.cols)];
            }
        }
        self.data = data;
        self.rows = rows;
        self.cols = cols;
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// The buffer in storage order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    #[inline]
    pub fn raw(&self) -> MatRef<'_, T> {
        MatRef::from_slice(&self.data, self.rows, self.cols, SO::ROW_MAJOR)
    }

    #[inline]
    pub fn raw_mut(&mut self) -> MatMut<'_, T> {
        let (rs, cs) = SO::packed_strides(self.rows, self.cols);
        // SAFETY: packed `rows x cols` buffer, exclusively borrowed.
        unsafe { MatMut::from_raw_parts(self.data.as_mut_ptr(), self.rows, self.cols, rs, cs) }
    }

    pub fn at(&self, i: usize, j: usize) -> Result<T> {
        check_index(i, j, (self.rows, self.cols))?;
        Ok(self.data[SO::packed_index(i, j, self.rows, self.cols)])
    }

    pub fn set(&mut self, i: usize, j: usize, value: T) -> Result<()> {
        check_index(i, j, (self.rows, self.cols))?;
        self.data[SO::packed_index(i, j, self.rows, self.cols)] = value;
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

    pub fn submatrix_mut(
        &mut self,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    ) -> Result<MatrixViewMut<'_, T, SO>> {
        self.view_mut().submatrix(row, col, rows, cols)
    }

    pub fn row(&self, i: usize) -> Result<VectorView<'_, T>> {
        self.view().row(i)
    }

    pub fn row_mut(&mut self, i: usize) -> Result<VectorViewMut<'_, T>> {
        self.view_mut().row(i)
    }

    pub fn column(&self, j: usize) -> Result<VectorView<'_, T>> {
        self.view().column(j)
    }

    pub fn column_mut(&mut self, j: usize) -> Result<VectorViewMut<'_, T>> {
        self.view_mut().column(j)
    }

    pub fn band(&self, k: isize) -> VectorView<'_, T> {
        self.view().band(k)
    }

    pub fn band_mut(&mut self, k: isize) -> VectorViewMut<'_, T> {
        self.view_mut().band(k)
    }

    /// Transposed view; no data moves.
    pub fn t(&self) -> MatrixView<'_, T, SO::Transposed> {
        self.view().t()
    }
}

impl<T: Scalar, SO: StorageOrder> Index<(usize, usize)> for DynamicMatrix<T, SO> {
    type Output = T;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &T {
        assert!(i < self.rows && j < self.cols, "index ({i}, {j}) out of bounds");
        &self.data[SO::packed_index(i, j, self.rows, self.cols)]
    }
}

impl<T: Scalar, SO: StorageOrder> IndexMut<(usize, usize)> for DynamicMatrix<T, SO> {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        assert!(i < self.rows && j < self.cols, "index ({i}, {j}) out of bounds");
        &mut self.data[SO::packed_index(i, j, self.rows, self.cols)]
    }
}

impl<T: Scalar, SO: StorageOrder> MatExpr for DynamicMatrix<T, SO> {
    type Elem = T;
    type Order = SO;

    #[inline]
    fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    fn get(&self, i: usize, j: usize) -> T {
        self.data[SO::packed_index(i, j, self.rows, self.cols)]
    }

    fn as_mat_ref(&self) -> Option<MatRef<'_, T>> {
        Some(self.raw())
    }
}

impl<T: Scalar, SO: StorageOrder> MatrixTarget for DynamicMatrix<T, SO> {
    type Elem = T;
    type Order = SO;

    const IS_RESIZABLE: bool = true;

    fn target_shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn resize_target(&mut self, rows: usize, cols: usize) -> Result<()> {
        self.resize(rows, cols);
        Ok(())
    }

    fn target_mut(&mut self) -> MatMut<'_, T> {
        self.raw_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linexpr_traits::ColumnMajor;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_from_rows_respects_order() {
        let r = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let c = DynamicMatrix::<f64, ColumnMajor>::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(r.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(c.as_slice(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(r[(1, 2)], c[(1, 2)]);
    }

    #[test]
    fn test_resize_keeps_overlap() {
        let mut m = DynamicMatrix::<i32, ColumnMajor>::from_fn(2, 3, |i, j| (10 * i + j) as i32);
        m.resize(3, 2);
        assert_eq!(m.at(0, 1).unwrap(), 1);
        assert_eq!(m.at(1, 1).unwrap(), 11);
        assert_eq!(m.at(2, 0).unwrap(), 0);
        assert!(m.at(0, 2).is_err());
    }

    #[test]
    fn test_checked_access() {
        let mut v = DynamicVector::<f64>::new(3);
        v.set(1, 4.0).unwrap();
        assert_eq!(v.at(1).unwrap(), 4.0);
        assert_eq!(
            v.set(3, 1.0),
            Err(LinexprError::IndexOutOfBounds {
                index: (3, 0),
                shape: (3, 1)
            })
        );
        assert!(DynamicMatrix::<f64>::from_vec(2, 2, vec![1.0; 3]).is_err());
    }

    #[test]
    fn test_views_write_through() {
        let mut m = DynamicMatrix::<f64>::zeros(3, 3);
        m.row_mut(1).unwrap().fill(2.0);
        m.column_mut(2).unwrap().set(0, 5.0).unwrap();
        m.band_mut(0).set(2, 7.0).unwrap();
        assert_eq!(m.as_slice(), &[0.0, 0.0, 5.0, 2.0, 2.0, 2.0, 0.0, 0.0, 7.0]);
        assert_eq!(m.t().at(2, 1).unwrap(), 2.0);
        assert_eq!(m.as_slice().iter().sum::<f64>(), 18.0);
    }

    #[test]
    fn test_random_is_seeded() {
        let dist = rand::distributions::Uniform::new(-1.0, 1.0);
        let a = DynamicMatrix::<f64>::random(4, 4, &mut StdRng::seed_from_u64(7), &dist);
        let b = DynamicMatrix::<f64>::random(4, 4, &mut StdRng::seed_from_u64(7), &dist);
        assert_eq!(a, b);
        assert!(a.as_slice().iter().all(|x| (-1.0..1.0).contains(x)));
    }
}
