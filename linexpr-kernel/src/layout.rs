//! Raw strided matrix and vector references.
//!
//! These are the buffer descriptors every kernel in this crate operates on:
//! a base pointer, extents and element strides, tied to a borrow lifetime.
//! Strides may be any non-negative value; a stride of 1 in one dimension
//! makes the matrix BLAS-compatible.

use std::marker::PhantomData;

/// BLAS matrix layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlasLayout {
    /// Rows are contiguous: `col_stride == 1`.
    RowMajor,
    /// Columns are contiguous: `row_stride == 1`.
    ColMajor,
}

/// BLAS view of a matrix: layout plus leading dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlasMatrix {
    pub layout: BlasLayout,
    pub rows: usize,
    pub cols: usize,
    pub ld: usize,
}

fn blas_matrix(rows: usize, cols: usize, rs: isize, cs: isize) -> Option<BlasMatrix> {
    if rs < 0 || cs < 0 {
        return None;
    }
    // Column-major first: a 1 x n or n x 1 matrix satisfies both.
    if rs == 1 && (cs as usize) >= rows.max(1) {
        return Some(BlasMatrix {
            layout: BlasLayout::ColMajor,
            rows,
            cols,
            ld: (cs as usize).max(1),
        });
    }
    if cs == 1 && (rs as usize) >= cols.max(1) {
        return Some(BlasMatrix {
            layout: BlasLayout::RowMajor,
            rows,
            cols,
            ld: (rs as usize).max(1),
        });
    }
    None
}

/// Byte range `[start, end)` touched by a strided region, or `None` if empty.
fn byte_span<T>(ptr: *const T, extents: &[(usize, isize)]) -> Option<(usize, usize)> {
    if extents.iter().any(|&(n, _)| n == 0) {
        return None;
    }
    let size = std::mem::size_of::<T>().max(1) as isize;
    let mut lo = 0isize;
    let mut hi = 0isize;
    for &(n, s) in extents {
        let reach = (n as isize - 1) * s;
        if reach >= 0 {
            hi += reach;
        } else {
            lo += reach;
        }
    }
    let base = ptr as isize;
    Some(((base + lo * size) as usize, (base + (hi + 1) * size) as usize))
}

// ============================================================================
// MatRef / MatMut
// ============================================================================

/// Immutable strided matrix reference.
pub struct MatRef<'a, T> {
    ptr: *const T,
    rows: usize,
    cols: usize,
    rs: isize,
    cs: isize,
    _marker: PhantomData<&'a T>,
}

impl<T> Clone for MatRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for MatRef<'_, T> {}

unsafe impl<T: Sync> Send for MatRef<'_, T> {}
unsafe impl<T: Sync> Sync for MatRef<'_, T> {}

impl<T> std::fmt::Debug for MatRef<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatRef")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("strides", &(self.rs, self.cs))
            .finish()
    }
}

impl<'a, T> MatRef<'a, T> {
    /// Create a reference from raw parts.
    ///
    /// # Safety
    /// Every `ptr + i * rs + j * cs` for `i < rows`, `j < cols` must be a valid,
    /// initialized element for `'a`, and no mutable access may overlap it during `'a`
    /// unless the caller orders reads before writes.
    #[inline]
    pub unsafe fn from_raw_parts(
        ptr: *const T,
        rows: usize,
        cols: usize,
        rs: isize,
        cs: isize,
    ) -> Self {
        Self {
            ptr,
            rows,
            cols,
            rs,
            cs,
            _marker: PhantomData,
        }
    }

    /// View a packed slice.
    pub fn from_slice(data: &'a [T], rows: usize, cols: usize, row_major: bool) -> Self {
        assert!(data.len() >= rows * cols, "slice too short for {rows}x{cols}");
        let (rs, cs) = if row_major {
            (cols as isize, 1)
        } else {
            (1, rows as isize)
        };
        unsafe { Self::from_raw_parts(data.as_ptr(), rows, cols, rs, cs) }
    }

    #[inline(always)]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    pub fn row_stride(&self) -> isize {
        self.rs
    }

    #[inline(always)]
    pub fn col_stride(&self) -> isize {
        self.cs
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> *const T {
        self.ptr
    }

    /// Pointer to element `(i, j)`.
    #[inline(always)]
    pub fn ptr_at(&self, i: usize, j: usize) -> *const T {
        self.ptr
            .wrapping_offset(i as isize * self.rs + j as isize * self.cs)
    }

    /// Element `(i, j)`.
    ///
    /// # Panics
    /// Panics in debug builds if the index is out of range.
    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> T
    where
        T: Copy,
    {
        debug_assert!(i < self.rows && j < self.cols);
        unsafe { *self.ptr_at(i, j) }
    }

    /// Transposed reference (zero-copy).
    #[inline]
    pub fn transpose(self) -> MatRef<'a, T> {
        MatRef {
            ptr: self.ptr,
            rows: self.cols,
            cols: self.rows,
            rs: self.cs,
            cs: self.rs,
            _marker: PhantomData,
        }
    }

    /// Sub-block starting at `(row, col)` with extent `rows x cols`.
    pub fn submatrix(self, row: usize, col: usize, rows: usize, cols: usize) -> MatRef<'a, T> {
        assert!(row + rows <= self.rows && col + cols <= self.cols);
        MatRef {
            ptr: self.ptr_at(row, col),
            rows,
            cols,
            rs: self.rs,
            cs: self.cs,
            _marker: PhantomData,
        }
    }

    /// Row `i` as a vector.
    pub fn row(self, i: usize) -> VecRef<'a, T> {
        assert!(i < self.rows);
        unsafe { VecRef::from_raw_parts(self.ptr_at(i, 0), self.cols, self.cs) }
    }

    /// Column `j` as a vector.
    pub fn col(self, j: usize) -> VecRef<'a, T> {
        assert!(j < self.cols);
        unsafe { VecRef::from_raw_parts(self.ptr_at(0, j), self.rows, self.rs) }
    }

    /// Band `k` (`k = 0` main diagonal, `k > 0` super-diagonals, `k < 0` sub-diagonals).
    pub fn band(self, k: isize) -> VecRef<'a, T> {
        let (i0, j0) = if k >= 0 {
            (0, k as usize)
        } else {
            ((-k) as usize, 0)
        };
        let len = if i0 >= self.rows || j0 >= self.cols {
            0
        } else {
            (self.rows - i0).min(self.cols - j0)
        };
        unsafe { VecRef::from_raw_parts(self.ptr_at(i0, j0), len, self.rs + self.cs) }
    }

    /// BLAS descriptor if one dimension has unit stride.
    pub fn blas_matrix(&self) -> Option<BlasMatrix> {
        blas_matrix(self.rows, self.cols, self.rs, self.cs)
    }

    /// Contiguous slice if the matrix is packed in its natural order.
    ///
    /// Returns the slice and whether it is row-major.
    pub fn as_packed_slice(&self) -> Option<(&'a [T], bool)> {
        let len = self.rows * self.cols;
        if len == 0 {
            return None;
        }
        let row_major =
            (self.cs == 1 && self.rs == self.cols as isize) || (self.rows == 1 && self.cs == 1);
        let col_major =
            (self.rs == 1 && self.cs == self.rows as isize) || (self.cols == 1 && self.rs == 1);
        if row_major || col_major {
            Some((unsafe { std::slice::from_raw_parts(self.ptr, len) }, row_major))
        } else {
            None
        }
    }

    /// Byte range touched by this matrix.
    pub fn byte_span(&self) -> Option<(usize, usize)> {
        byte_span(self.ptr, &[(self.rows, self.rs), (self.cols, self.cs)])
    }
}

/// Mutable strided matrix reference.
pub struct MatMut<'a, T> {
    ptr: *mut T,
    rows: usize,
    cols: usize,
    rs: isize,
    cs: isize,
    _marker: PhantomData<&'a mut T>,
}

unsafe impl<T: Send> Send for MatMut<'_, T> {}
unsafe impl<T: Sync> Sync for MatMut<'_, T> {}

impl<T> std::fmt::Debug for MatMut<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatMut")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("strides", &(self.rs, self.cs))
            .finish()
    }
}

impl<'a, T> MatMut<'a, T> {
    /// Create a mutable reference from raw parts.
    ///
    /// # Safety
    /// Same as [`MatRef::from_raw_parts`], and in addition the addressed
    /// elements must not alias each other (no zero strides over extents > 1)
    /// and must not be accessed through any other path during `'a`.
    #[inline]
    pub unsafe fn from_raw_parts(
        ptr: *mut T,
        rows: usize,
        cols: usize,
        rs: isize,
        cs: isize,
    ) -> Self {
        Self {
            ptr,
            rows,
            cols,
            rs,
            cs,
            _marker: PhantomData,
        }
    }

    /// View a packed mutable slice.
    pub fn from_slice(data: &'a mut [T], rows: usize, cols: usize, row_major: bool) -> Self {
        assert!(data.len() >= rows * cols, "slice too short for {rows}x{cols}");
        let (rs, cs) = if row_major {
            (cols as isize, 1)
        } else {
            (1, rows as isize)
        };
        unsafe { Self::from_raw_parts(data.as_mut_ptr(), rows, cols, rs, cs) }
    }

    #[inline(always)]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    pub fn row_stride(&self) -> isize {
        self.rs
    }

    #[inline(always)]
    pub fn col_stride(&self) -> isize {
        self.cs
    }

    #[inline(always)]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr
    }

    /// Pointer to element `(i, j)`.
    #[inline(always)]
    pub fn ptr_at(&self, i: usize, j: usize) -> *mut T {
        self.ptr
            .wrapping_offset(i as isize * self.rs + j as isize * self.cs)
    }

    /// Shorter-lived mutable reference to the same elements.
    #[inline]
    pub fn reborrow(&mut self) -> MatMut<'_, T> {
        MatMut {
            ptr: self.ptr,
            rows: self.rows,
            cols: self.cols,
            rs: self.rs,
            cs: self.cs,
            _marker: PhantomData,
        }
    }

    /// Read-only reference to the same elements.
    #[inline]
    pub fn as_ref(&self) -> MatRef<'_, T> {
        unsafe { MatRef::from_raw_parts(self.ptr, self.rows, self.cols, self.rs, self.cs) }
    }

    /// Transposed mutable reference.
    #[inline]
    pub fn transpose(self) -> MatMut<'a, T> {
        MatMut {
            ptr: self.ptr,
            rows: self.cols,
            cols: self.rows,
            rs: self.cs,
            cs: self.rs,
            _marker: PhantomData,
        }
    }

    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> T
    where
        T: Copy,
    {
        debug_assert!(i < self.rows && j < self.cols);
        unsafe { *self.ptr_at(i, j) }
    }

    #[inline(always)]
    pub fn set(&mut self, i: usize, j: usize, value: T) {
        debug_assert!(i < self.rows && j < self.cols);
        unsafe { *self.ptr_at(i, j) = value }
    }

    /// Mutable sub-block.
    pub fn submatrix(self, row: usize, col: usize, rows: usize, cols: usize) -> MatMut<'a, T> {
        assert!(row + rows <= self.rows && col + cols <= self.cols);
        MatMut {
            ptr: self.ptr_at(row, col),
            rows,
            cols,
            rs: self.rs,
            cs: self.cs,
            _marker: PhantomData,
        }
    }

    /// Split into rows `[0, mid)` and `[mid, rows)`.
    pub fn split_at_row(self, mid: usize) -> (MatMut<'a, T>, MatMut<'a, T>) {
        assert!(mid <= self.rows);
        let top = MatMut {
            ptr: self.ptr,
            rows: mid,
            cols: self.cols,
            rs: self.rs,
            cs: self.cs,
            _marker: PhantomData,
        };
        let bottom = MatMut {
            ptr: self.ptr_at(mid, 0),
            rows: self.rows - mid,
            cols: self.cols,
            rs: self.rs,
            cs: self.cs,
            _marker: PhantomData,
        };
        (top, bottom)
    }

    /// Column `j` as a mutable vector.
    pub fn col_mut(self, j: usize) -> VecMut<'a, T> {
        assert!(j < self.cols);
        unsafe { VecMut::from_raw_parts(self.ptr_at(0, j), self.rows, self.rs) }
    }

    /// BLAS descriptor if one dimension has unit stride.
    pub fn blas_matrix(&self) -> Option<BlasMatrix> {
        blas_matrix(self.rows, self.cols, self.rs, self.cs)
    }

    /// Contiguous mutable slice if the matrix is packed; `bool` is row-major.
    pub fn as_packed_slice_mut(&mut self) -> Option<(&mut [T], bool)> {
        let (len, row_major) = {
            let view = self.as_ref();
            let (s, rm) = view.as_packed_slice()?;
            (s.len(), rm)
        };
        Some((
            unsafe { std::slice::from_raw_parts_mut(self.ptr, len) },
            row_major,
        ))
    }

    /// Byte range touched by this matrix.
    pub fn byte_span(&self) -> Option<(usize, usize)> {
        byte_span(self.ptr as *const T, &[(self.rows, self.rs), (self.cols, self.cs)])
    }

    /// Overwrite every element with `value`.
    pub fn fill(&mut self, value: T)
    where
        T: Copy,
    {
        for i in 0..self.rows {
            for j in 0..self.cols {
                self.set(i, j, value);
            }
        }
    }
}

// ============================================================================
// VecRef / VecMut
// ============================================================================

/// Immutable strided vector reference.
pub struct VecRef<'a, T> {
    ptr: *const T,
    len: usize,
    stride: isize,
    _marker: PhantomData<&'a T>,
}

impl<T> Clone for VecRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for VecRef<'_, T> {}

unsafe impl<T: Sync> Send for VecRef<'_, T> {}
unsafe impl<T: Sync> Sync for VecRef<'_, T> {}

impl<T> std::fmt::Debug for VecRef<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VecRef")
            .field("len", &self.len)
            .field("stride", &self.stride)
            .finish()
    }
}

impl<'a, T> VecRef<'a, T> {
    /// Create a reference from raw parts.
    ///
    /// # Safety
    /// `ptr + i * stride` must be valid for `i < len` during `'a`.
    #[inline]
    pub unsafe fn from_raw_parts(ptr: *const T, len: usize, stride: isize) -> Self {
        Self {
            ptr,
            len,
            stride,
            _marker: PhantomData,
        }
    }

    pub fn from_slice(data: &'a [T]) -> Self {
        unsafe { Self::from_raw_parts(data.as_ptr(), data.len(), 1) }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    pub fn stride(&self) -> isize {
        self.stride
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> *const T {
        self.ptr
    }

    #[inline(always)]
    pub fn get(&self, i: usize) -> T
    where
        T: Copy,
    {
        debug_assert!(i < self.len);
        unsafe { *self.ptr.wrapping_offset(i as isize * self.stride) }
    }

    /// Elements `[start, start + len)`.
    pub fn subvector(self, start: usize, len: usize) -> VecRef<'a, T> {
        assert!(start + len <= self.len);
        unsafe {
            VecRef::from_raw_parts(
                self.ptr.wrapping_offset(start as isize * self.stride),
                len,
                self.stride,
            )
        }
    }

    /// Contiguous slice if the stride is 1.
    pub fn as_slice(&self) -> Option<&'a [T]> {
        if self.stride == 1 || self.len <= 1 {
            Some(unsafe { std::slice::from_raw_parts(self.ptr, self.len) })
        } else {
            None
        }
    }

    /// Byte range touched by this vector.
    pub fn byte_span(&self) -> Option<(usize, usize)> {
        byte_span(self.ptr, &[(self.len, self.stride)])
    }
}

/// Mutable strided vector reference.
pub struct VecMut<'a, T> {
    ptr: *mut T,
    len: usize,
    stride: isize,
    _marker: PhantomData<&'a mut T>,
}

unsafe impl<T: Send> Send for VecMut<'_, T> {}
unsafe impl<T: Sync> Sync for VecMut<'_, T> {}

impl<T> std::fmt::Debug for VecMut<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VecMut")
            .field("len", &self.len)
            .field("stride", &self.stride)
            .finish()
    }
}

impl<'a, T> VecMut<'a, T> {
    /// Create a mutable reference from raw parts.
    ///
    /// # Safety
    /// As [`VecRef::from_raw_parts`], plus exclusive access for `'a` and a
    /// non-zero stride when `len > 1`.
    #[inline]
    pub unsafe fn from_raw_parts(ptr: *mut T, len: usize, stride: isize) -> Self {
        Self {
            ptr,
            len,
            stride,
            _marker: PhantomData,
        }
    }

    pub fn from_slice(data: &'a mut [T]) -> Self {
        unsafe { Self::from_raw_parts(data.as_mut_ptr(), data.len(), 1) }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    pub fn stride(&self) -> isize {
        self.stride
    }

    #[inline(always)]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr
    }

    #[inline]
    pub fn reborrow(&mut self) -> VecMut<'_, T> {
        VecMut {
            ptr: self.ptr,
            len: self.len,
            stride: self.stride,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn as_ref(&self) -> VecRef<'_, T> {
        unsafe { VecRef::from_raw_parts(self.ptr, self.len, self.stride) }
    }

    #[inline(always)]
    pub fn get(&self, i: usize) -> T
    where
        T: Copy,
    {
        debug_assert!(i < self.len);
        unsafe { *self.ptr.wrapping_offset(i as isize * self.stride) }
    }

    #[inline(always)]
    pub fn set(&mut self, i: usize, value: T) {
        debug_assert!(i < self.len);
        unsafe { *self.ptr.wrapping_offset(i as isize * self.stride) = value }
    }

    /// Mutable elements `[start, start + len)`.
    pub fn subvector(self, start: usize, len: usize) -> VecMut<'a, T> {
        assert!(start + len <= self.len);
        unsafe {
            VecMut::from_raw_parts(
                self.ptr.wrapping_offset(start as isize * self.stride),
                len,
                self.stride,
            )
        }
    }

    /// Split into `[0, mid)` and `[mid, len)`.
    pub fn split_at(self, mid: usize) -> (VecMut<'a, T>, VecMut<'a, T>) {
        assert!(mid <= self.len);
        let right = unsafe {
            VecMut::from_raw_parts(
                self.ptr.wrapping_offset(mid as isize * self.stride),
                self.len - mid,
                self.stride,
            )
        };
        let left = VecMut {
            ptr: self.ptr,
            len: mid,
            stride: self.stride,
            _marker: PhantomData,
        };
        (left, right)
    }

    /// Contiguous mutable slice if the stride is 1.
    pub fn as_slice_mut(&mut self) -> Option<&mut [T]> {
        if self.stride == 1 || self.len <= 1 {
            Some(unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) })
        } else {
            None
        }
    }

    /// Byte range touched by this vector.
    pub fn byte_span(&self) -> Option<(usize, usize)> {
        byte_span(self.ptr as *const T, &[(self.len, self.stride)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blas_matrix_row_major() {
        let data: Vec<f64> = (0..12).map(|x| x as f64).collect();
        let m = MatRef::from_slice(&data, 3, 4, true);
        let info = m.blas_matrix().unwrap();
        assert_eq!(info.layout, BlasLayout::RowMajor);
        assert_eq!(info.ld, 4);
        assert_eq!(m.get(2, 1), 9.0);
    }

    #[test]
    fn test_blas_matrix_col_major() {
        let data: Vec<f64> = (0..12).map(|x| x as f64).collect();
        let m = MatRef::from_slice(&data, 3, 4, false);
        let info = m.blas_matrix().unwrap();
        assert_eq!(info.layout, BlasLayout::ColMajor);
        assert_eq!(info.ld, 3);
        assert_eq!(m.get(2, 1), 5.0);
        assert_eq!(m.transpose().blas_matrix().unwrap().layout, BlasLayout::RowMajor);
    }

    #[test]
    fn test_blas_matrix_non_unit_stride() {
        let data: Vec<f64> = (0..24).map(|x| x as f64).collect();
        let m = unsafe { MatRef::from_raw_parts(data.as_ptr(), 3, 4, 8, 2) };
        assert!(m.blas_matrix().is_none());
        assert!(m.as_packed_slice().is_none());
    }

    #[test]
    fn test_submatrix_row_col_band() {
        let data: Vec<i32> = (0..16).collect();
        let m = MatRef::from_slice(&data, 4, 4, true);
        let s = m.submatrix(1, 1, 2, 2);
        assert_eq!(s.get(0, 0), 5);
        assert_eq!(s.get(1, 1), 10);
        assert_eq!(m.row(2).get(3), 11);
        assert_eq!(m.col(1).get(3), 13);
        let diag = m.band(0);
        assert_eq!(diag.len(), 4);
        assert_eq!(diag.get(3), 15);
        let upper = m.band(1);
        assert_eq!(upper.len(), 3);
        assert_eq!(upper.get(0), 1);
        let lower = m.band(-2);
        assert_eq!(lower.len(), 2);
        assert_eq!(lower.get(1), 13);
    }

    #[test]
    fn test_byte_span_overlap() {
        let data = vec![0.0f64; 16];
        let m = MatRef::from_slice(&data, 4, 4, true);
        let (lo, hi) = m.byte_span().unwrap();
        assert_eq!(hi - lo, 16 * 8);
        let s = m.submatrix(1, 1, 2, 2);
        let (slo, shi) = s.byte_span().unwrap();
        assert_eq!(slo, lo + 5 * 8);
        assert_eq!(shi, lo + 11 * 8);
    }

    #[test]
    fn test_split_at_row() {
        let mut data: Vec<i32> = (0..6).collect();
        let m = MatMut::from_slice(&mut data, 3, 2, true);
        let (mut top, mut bottom) = m.split_at_row(1);
        top.set(0, 1, 100);
        bottom.set(1, 0, 200);
        assert_eq!(data, vec![0, 100, 2, 3, 200, 5]);
    }
}
