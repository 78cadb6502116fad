//! Borrowed views into dense storage.
//!
//! Views never own memory and cannot be resized. A view's storage order
//! parameter is the order its evaluated copies take; the underlying strides
//! may be anything (a transposed or banded view is still a view).

use std::marker::PhantomData;

use linexpr_kernel::{MatMut, MatRef, VecMut, VecRef};
use linexpr_traits::{RowMajor, StorageOrder};

use super::{check_block, check_index, check_range};
use crate::assign::{MatrixTarget, VectorTarget};
use crate::expr::{MatExpr, MemSpan, Overlap, VecExpr};
use crate::{Result, Scalar};

fn band_extent(rows: usize, cols: usize, k: isize) -> (usize, usize, usize) {
    let (i0, j0) = if k >= 0 {
        (0, k.unsigned_abs())
    } else {
        (k.unsigned_abs(), 0)
    };
    let len = if i0 >= rows || j0 >= cols {
        0
    } else {
        (rows - i0).min(cols - j0)
    };
    (i0, j0, len)
}

// ============================================================================
// Matrix views
// ============================================================================

/// Read-only view of a dense matrix or a block of one.
#[derive(Debug, Clone, Copy)]
pub struct MatrixView<'a, T, SO = RowMajor> {
    inner: MatRef<'a, T>,
    _order: PhantomData<SO>,
}

impl<'a, T: Scalar, SO: StorageOrder> MatrixView<'a, T, SO> {
    /// Wrap a strided reference.
    pub fn from_ref(inner: MatRef<'a, T>) -> Self {
        Self {
            inner,
            _order: PhantomData,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.inner.rows()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.inner.cols()
    }

    /// The strided reference behind this view.
    #[inline]
    pub fn raw(&self) -> MatRef<'a, T> {
        self.inner
    }

    /// Checked element access.
    pub fn at(&self, i: usize, j: usize) -> Result<T> {
        check_index(i, j, (self.rows(), self.cols()))?;
        Ok(self.inner.get(i, j))
    }

    /// `rows x cols` block starting at `(row, col)`.
    pub fn submatrix(self, row: usize, col: usize, rows: usize, cols: usize) -> Result<Self> {
        check_block((self.rows(), self.cols()), row, col, rows, cols)?;
        Ok(Self::from_ref(self.inner.submatrix(row, col, rows, cols)))
    }

    /// Row `i`.
    pub fn row(self, i: usize) -> Result<VectorView<'a, T>> {
        check_index(i, 0, (self.rows(), self.cols().max(1)))?;
        Ok(VectorView::from_ref(self.inner.row(i)))
    }

    /// Column `j`.
    pub fn column(self, j: usize) -> Result<VectorView<'a, T>> {
        check_index(0, j, (self.rows().max(1), self.cols()))?;
        Ok(VectorView::from_ref(self.inner.col(j)))
    }

    /// Band `k`: the main diagonal for `k = 0`, super-diagonals above.
    /// Bands outside the matrix are empty.
    pub fn band(self, k: isize) -> VectorView<'a, T> {
        VectorView::from_ref(self.inner.band(k))
    }

    /// The main diagonal.
    pub fn diagonal(self) -> VectorView<'a, T> {
        self.band(0)
    }

    /// Transposed view (no copy).
    pub fn t(self) -> MatrixView<'a, T, SO::Transposed> {
        MatrixView::from_ref(self.inner.transpose())
    }
}

impl<T: Scalar, SO: StorageOrder> MatExpr for MatrixView<'_, T, SO> {
    type Elem = T;
    type Order = SO;

    #[inline]
    fn rows(&self) -> usize {
        self.inner.rows()
    }

    #[inline]
    fn cols(&self) -> usize {
        self.inner.cols()
    }

    #[inline(always)]
    fn get(&self, i: usize, j: usize) -> T {
        self.inner.get(i, j)
    }

    fn as_mat_ref(&self) -> Option<MatRef<'_, T>> {
        Some(self.inner)
    }
}

/// Mutable view of a dense matrix or a block of one.
#[derive(Debug)]
pub struct MatrixViewMut<'a, T, SO = RowMajor> {
    inner: MatMut<'a, T>,
    _order: PhantomData<SO>,
}

impl<'a, T: Scalar, SO: StorageOrder> MatrixViewMut<'a, T, SO> {
    /// Wrap a strided mutable reference.
    pub fn from_mut(inner: MatMut<'a, T>) -> Self {
        Self {
            inner,
            _order: PhantomData,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.inner.rows()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.inner.cols()
    }

    pub fn at(&self, i: usize, j: usize) -> Result<T> {
        check_index(i, j, (self.rows(), self.cols()))?;
        Ok(self.inner.get(i, j))
    }

    pub fn set(&mut self, i: usize, j: usize, value: T) -> Result<()> {
        check_index(i, j, (self.rows(), self.cols()))?;
        self.inner.set(i, j, value);
        Ok(())
    }

    pub fn fill(&mut self, value: T) {
        self.inner.fill(value);
    }

    /// Read-only view of the same elements.
    pub fn as_view(&self) -> MatrixView<'_, T, SO> {
        MatrixView::from_ref(self.inner.as_ref())
    }

    /// Shorter-lived mutable view of the same elements.
    pub fn reborrow(&mut self) -> MatrixViewMut<'_, T, SO> {
        MatrixViewMut::from_mut(self.inner.reborrow())
    }

    pub fn submatrix(self, row: usize, col: usize, rows: usize, cols: usize) -> Result<Self> {
        check_block((self.rows(), self.cols()), row, col, rows, cols)?;
        Ok(Self::from_mut(self.inner.submatrix(row, col, rows, cols)))
    }

    pub fn row(self, i: usize) -> Result<VectorViewMut<'a, T>> {
        check_index(i, 0, (self.rows(), self.cols().max(1)))?;
        Ok(VectorViewMut::from_mut(self.inner.transpose().col_mut(i)))
    }

    pub fn column(self, j: usize) -> Result<VectorViewMut<'a, T>> {
        check_index(0, j, (self.rows().max(1), self.cols()))?;
        Ok(VectorViewMut::from_mut(self.inner.col_mut(j)))
    }

    /// Mutable band `k`; see [`MatrixView::band`].
    pub fn band(self, k: isize) -> VectorViewMut<'a, T> {
        let (i0, j0, len) = band_extent(self.rows(), self.cols(), k);
        let stride = self.inner.row_stride() + self.inner.col_stride();
        let ptr = if len == 0 {
            self.inner.ptr_at(0, 0)
        } else {
            self.inner.ptr_at(i0, j0)
        };
        // SAFETY: the band elements are distinct elements of `inner`, which
        // is consumed, so no other path can reach them during 'a.
        VectorViewMut::from_mut(unsafe { VecMut::from_raw_parts(ptr, len, stride) })
    }

    pub fn diagonal(self) -> VectorViewMut<'a, T> {
        self.band(0)
    }

    pub fn t(self) -> MatrixViewMut<'a, T, SO::Transposed> {
        MatrixViewMut::from_mut(self.inner.transpose())
    }
}

impl<T: Scalar, SO: StorageOrder> MatExpr for MatrixViewMut<'_, T, SO> {
    type Elem = T;
    type Order = SO;

    #[inline]
    fn rows(&self) -> usize {
        self.inner.rows()
    }

    #[inline]
    fn cols(&self) -> usize {
        self.inner.cols()
    }

    #[inline(always)]
    fn get(&self, i: usize, j: usize) -> T {
        self.inner.get(i, j)
    }

    fn as_mat_ref(&self) -> Option<MatRef<'_, T>> {
        Some(self.inner.as_ref())
    }
}

impl<T: Scalar, SO: StorageOrder> MatrixTarget for MatrixViewMut<'_, T, SO> {
    type Elem = T;
    type Order = SO;

    fn target_shape(&self) -> (usize, usize) {
        (self.inner.rows(), self.inner.cols())
    }

    fn target_mut(&mut self) -> MatMut<'_, T> {
        self.inner.reborrow()
    }
}

// ============================================================================
// Vector views
// ============================================================================

/// Read-only view of a vector, a row, a column or a band.
#[derive(Debug, Clone, Copy)]
pub struct VectorView<'a, T> {
    inner: VecRef<'a, T>,
}

impl<'a, T: Scalar> VectorView<'a, T> {
    pub fn from_ref(inner: VecRef<'a, T>) -> Self {
        Self { inner }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn raw(&self) -> VecRef<'a, T> {
        self.inner
    }

    pub fn at(&self, i: usize) -> Result<T> {
        check_index(i, 0, (self.len(), 1))?;
        Ok(self.inner.get(i))
    }

    /// Elements `[start, start + len)`.
    pub fn subvector(self, start: usize, len: usize) -> Result<Self> {
        check_range(self.len(), start, len)?;
        Ok(Self::from_ref(self.inner.subvector(start, len)))
    }

    /// Copy the elements out, in order.
    pub fn to_vec(&self) -> Vec<T> {
        (0..self.len()).map(|i| self.inner.get(i)).collect()
    }
}

impl<T: Scalar> VecExpr for VectorView<'_, T> {
    type Elem = T;

    #[inline]
    fn size(&self) -> usize {
        self.inner.len()
    }

    #[inline(always)]
    fn get(&self, i: usize) -> T {
        self.inner.get(i)
    }

    fn as_vec_ref(&self) -> Option<VecRef<'_, T>> {
        Some(self.inner)
    }
}

/// Mutable view of a vector, a row, a column or a band.
#[derive(Debug)]
pub struct VectorViewMut<'a, T> {
    inner: VecMut<'a, T>,
}

impl<'a, T: Scalar> VectorViewMut<'a, T> {
    pub fn from_mut(inner: VecMut<'a, T>) -> Self {
        Self { inner }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn at(&self, i: usize) -> Result<T> {
        check_index(i, 0, (self.len(), 1))?;
        Ok(self.inner.get(i))
    }

    pub fn set(&mut self, i: usize, value: T) -> Result<()> {
        check_index(i, 0, (self.len(), 1))?;
        self.inner.set(i, value);
        Ok(())
    }

    pub fn fill(&mut self, value: T) {
        for i in 0..self.inner.len() {
            self.inner.set(i, value);
        }
    }

    pub fn as_view(&self) -> VectorView<'_, T> {
        VectorView::from_ref(self.inner.as_ref())
    }

    pub fn reborrow(&mut self) -> VectorViewMut<'_, T> {
        VectorViewMut::from_mut(self.inner.reborrow())
    }

    pub fn subvector(self, start: usize, len: usize) -> Result<Self> {
        check_range(self.len(), start, len)?;
        Ok(Self::from_mut(self.inner.subvector(start, len)))
    }
}

impl<T: Scalar> VecExpr for VectorViewMut<'_, T> {
    type Elem = T;

    #[inline]
    fn size(&self) -> usize {
        self.inner.len()
    }

    #[inline(always)]
    fn get(&self, i: usize) -> T {
        self.inner.get(i)
    }

    fn as_vec_ref(&self) -> Option<VecRef<'_, T>> {
        Some(self.inner.as_ref())
    }
}

impl<T: Scalar> VectorTarget for VectorViewMut<'_, T> {
    type Elem = T;

    fn target_len(&self) -> usize {
        self.inner.len()
    }

    fn target_mut(&mut self) -> VecMut<'_, T> {
        self.inner.reborrow()
    }
}

// ============================================================================
// Aliased views
// ============================================================================

/// A view of storage that is also the current assignment target.
///
/// Handed out by the `update` family of [`MatrixTarget`] and
/// [`VectorTarget`]. Expressions containing an `Aliased` leaf report
/// `CAN_ALIAS`, which makes the evaluator compare memory ranges before
/// writing.
#[derive(Debug, Clone, Copy)]
pub struct Aliased<V>(V);

impl<V> Aliased<V> {
    pub(crate) fn new(view: V) -> Self {
        Self(view)
    }
}

impl<'a, T: Scalar, SO: StorageOrder> Aliased<MatrixView<'a, T, SO>> {
    #[inline]
    pub fn rows(&self) -> usize {
        self.0.rows()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.0.cols()
    }

    pub fn submatrix(self, row: usize, col: usize, rows: usize, cols: usize) -> Result<Self> {
        Ok(Self(self.0.submatrix(row, col, rows, cols)?))
    }

    pub fn row(self, i: usize) -> Result<Aliased<VectorView<'a, T>>> {
        Ok(Aliased(self.0.row(i)?))
    }

    pub fn column(self, j: usize) -> Result<Aliased<VectorView<'a, T>>> {
        Ok(Aliased(self.0.column(j)?))
    }

    pub fn band(self, k: isize) -> Aliased<VectorView<'a, T>> {
        Aliased(self.0.band(k))
    }

    pub fn t(self) -> Aliased<MatrixView<'a, T, SO::Transposed>> {
        Aliased(self.0.t())
    }
}

impl<'a, T: Scalar> Aliased<VectorView<'a, T>> {
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn subvector(self, start: usize, len: usize) -> Result<Self> {
        Ok(Self(self.0.subvector(start, len)?))
    }
}

impl<T: Scalar, SO: StorageOrder> MatExpr for Aliased<MatrixView<'_, T, SO>> {
    type Elem = T;
    type Order = SO;

    const CAN_ALIAS: bool = true;

    #[inline]
    fn rows(&self) -> usize {
        self.0.rows()
    }

    #[inline]
    fn cols(&self) -> usize {
        self.0.cols()
    }

    #[inline(always)]
    fn get(&self, i: usize, j: usize) -> T {
        self.0.raw().get(i, j)
    }

    fn overlap(&self, target: &MemSpan) -> Overlap {
        MemSpan::of_matrix(&self.0.raw()).map_or(Overlap::None, |span| span.classify(target))
    }

    fn as_mat_ref(&self) -> Option<MatRef<'_, T>> {
        Some(self.0.raw())
    }
}

impl<T: Scalar> VecExpr for Aliased<VectorView<'_, T>> {
    type Elem = T;

    const CAN_ALIAS: bool = true;

    #[inline]
    fn size(&self) -> usize {
        self.0.len()
    }

    #[inline(always)]
    fn get(&self, i: usize) -> T {
        self.0.raw().get(i)
    }

    fn overlap(&self, target: &MemSpan) -> Overlap {
        MemSpan::of_vector(&self.0.raw()).map_or(Overlap::None, |span| span.classify(target))
    }

    fn as_vec_ref(&self) -> Option<VecRef<'_, T>> {
        Some(self.0.raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LinexprError;

    #[test]
    fn test_view_navigation() {
        let data: Vec<f64> = (0..12).map(|x| x as f64).collect();
        let m: MatrixView<'_, f64> = MatrixView::from_ref(MatRef::from_slice(&data, 3, 4, true));

        let block = m.submatrix(1, 1, 2, 2).unwrap();
        assert_eq!(block.at(1, 1).unwrap(), 10.0);
        assert_eq!(m.row(2).unwrap().to_vec(), vec![8.0, 9.0, 10.0, 11.0]);
        assert_eq!(m.column(1).unwrap().to_vec(), vec![1.0, 5.0, 9.0]);
        assert_eq!(m.band(1).to_vec(), vec![1.0, 6.0, 11.0]);
        assert_eq!(m.band(-2).to_vec(), vec![8.0]);
        assert!(m.band(7).is_empty());
        assert_eq!(m.t().at(3, 0).unwrap(), 3.0);
    }

    #[test]
    fn test_view_bounds() {
        let data = [0.0f64; 4];
        let m: MatrixView<'_, f64> = MatrixView::from_ref(MatRef::from_slice(&data, 2, 2, true));
        assert!(matches!(m.submatrix(1, 1, 2, 1), Err(LinexprError::InvalidView(_))));
        assert_eq!(
            m.row(2).unwrap_err(),
            LinexprError::IndexOutOfBounds {
                index: (2, 0),
                shape: (2, 2)
            }
        );
        assert!(m.at(0, 2).is_err());
    }

    #[test]
    fn test_mutable_band() {
        let mut data = [0.0f64; 9];
        {
            let m: MatrixViewMut<'_, f64> =
                MatrixViewMut::from_mut(MatMut::from_slice(&mut data, 3, 3, false));
            let mut d = m.band(-1);
            d.set(0, 1.0).unwrap();
            d.set(1, 2.0).unwrap();
            assert!(d.set(2, 3.0).is_err());
        }
        // column-major: (1, 0) is index 1, (2, 1) is index 5
        assert_eq!(data, [0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_aliased_overlap() {
        let data = [0.0f64; 16];
        let whole = MatRef::from_slice(&data, 4, 4, true);
        let target = MemSpan::of_matrix(&whole).unwrap();
        let aliased: Aliased<MatrixView<'_, f64>> = Aliased::new(MatrixView::from_ref(whole));

        assert_eq!(aliased.overlap(&target), Overlap::Exact);
        assert_eq!(aliased.t().overlap(&target), Overlap::Partial);
        let top = aliased.submatrix(0, 0, 2, 4).unwrap();
        let bottom = MemSpan::of_matrix(&whole.submatrix(2, 0, 2, 4)).unwrap();
        assert_eq!(top.overlap(&bottom), Overlap::None);
        assert_eq!(aliased.row(1).unwrap().len(), 4);
    }
}
