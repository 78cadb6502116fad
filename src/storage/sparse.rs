//! Compressed sparse vector and row-compressed sparse matrix.
//!
//! Both are read-only expression leaves with `IS_DENSE = false`: consumers
//! that can skip structural zeros iterate the stored entries instead of
//! calling `get` for every position.

use linexpr_kernel::{MatMut, VecMut};
use linexpr_traits::RowMajor;

use super::check_index;
use crate::config::EvalConfig;
use crate::expr::{AssignOp, MatExpr, VecExpr};
use crate::{Result, Scalar};

// ============================================================================
// CompressedVector
// ============================================================================

/// Sparse vector holding `(index, value)` pairs sorted by index.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedVector<T> {
    size: usize,
    indices: Vec<usize>,
    values: Vec<T>,
}

impl<T: Scalar> CompressedVector<T> {
    /// Empty vector of length `size`.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build from pairs in any order; duplicate indices are summed.
    pub fn from_pairs(size: usize, pairs: impl IntoIterator<Item = (usize, T)>) -> Result<Self> {
        let mut pairs: Vec<(usize, T)> = pairs.into_iter().collect();
        for &(i, _) in &pairs {
            check_index(i, 0, (size, 1))?;
        }
        pairs.sort_by_key(|&(i, _)| i);
        let mut out = Self::new(size);
        for (i, v) in pairs {
            match out.indices.last() {
                Some(&last) if last == i => {
                    if let Some(slot) = out.values.last_mut() {
                        *slot += v;
                    }
                }
                _ => {
                    out.indices.push(i);
                    out.values.push(v);
                }
            }
        }
        Ok(out)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Store `value` at `i`, replacing an existing entry.
    pub fn insert(&mut self, i: usize, value: T) -> Result<()> {
        check_index(i, 0, (self.size, 1))?;
        match self.indices.binary_search(&i) {
            Ok(pos) => self.values[pos] = value,
            Err(pos) => {
                self.indices.insert(pos, i);
                self.values.insert(pos, value);
            }
        }
        Ok(())
    }

    pub fn at(&self, i: usize) -> Result<T> {
        check_index(i, 0, (self.size, 1))?;
        Ok(self.lookup(i))
    }

    /// Stored entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, T)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    #[inline]
    fn lookup(&self, i: usize) -> T {
        match self.indices.binary_search(&i) {
            Ok(pos) => self.values[pos],
            Err(_) => T::zero(),
        }
    }

    fn scatter(&self, mut dst: VecMut<'_, T>, scale: T, op: AssignOp) {
        if op == AssignOp::Assign {
            for i in 0..dst.len() {
                dst.set(i, T::zero());
            }
        }
        for (i, v) in self.iter() {
            let value = op.apply(dst.get(i), scale * v);
            dst.set(i, value);
        }
    }
}

impl<T: Scalar> VecExpr for CompressedVector<T> {
    type Elem = T;

    const IS_DENSE: bool = false;

    #[inline]
    fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn get(&self, i: usize) -> T {
        self.lookup(i)
    }

    fn for_each_nonzero(&self, f: &mut dyn FnMut(usize, T)) {
        for (i, v) in self.iter() {
            f(i, v);
        }
    }

    fn assign_to(&self, dst: VecMut<'_, T>, op: AssignOp, _cfg: &EvalConfig) -> Result<()> {
        self.scatter(dst, T::one(), op);
        Ok(())
    }

    fn assign_scaled_to(
        &self,
        dst: VecMut<'_, T>,
        scale: T,
        op: AssignOp,
        _cfg: &EvalConfig,
    ) -> Result<()> {
        self.scatter(dst, scale, op);
        Ok(())
    }
}

// ============================================================================
// CompressedMatrix
// ============================================================================

/// Sparse matrix in compressed sparse row form.
///
/// Row `i` owns entries `row_ptr[i]..row_ptr[i + 1]` of `col_idx` and
/// `values`, sorted by column.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedMatrix<T> {
    rows: usize,
    cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<T>,
}

impl<T: Scalar> CompressedMatrix<T> {
    /// Empty `rows x cols` matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            row_ptr: vec![0; rows + 1],
            col_idx: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build from `(row, col, value)` triplets in any order; duplicates are summed.
    pub fn from_triplets(
        rows: usize,
        cols: usize,
        triplets: impl IntoIterator<Item = (usize, usize, T)>,
    ) -> Result<Self> {
        let mut triplets: Vec<(usize, usize, T)> = triplets.into_iter().collect();
        for &(i, j, _) in &triplets {
            check_index(i, j, (rows, cols))?;
        }
        triplets.sort_by_key(|&(i, j, _)| (i, j));

        let mut out = Self::new(rows, cols);
        let mut last: Option<(usize, usize)> = None;
        for (i, j, v) in triplets {
            if last == Some((i, j)) {
                if let Some(slot) = out.values.last_mut() {
                    *slot += v;
                }
                continue;
            }
            out.col_idx.push(j);
            out.values.push(v);
            out.row_ptr[i + 1] += 1;
            last = Some((i, j));
        }
        for i in 0..rows {
            out.row_ptr[i + 1] += out.row_ptr[i];
        }
        Ok(out)
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
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Store `value` at `(i, j)`, replacing an existing entry.
    pub fn insert(&mut self, i: usize, j: usize, value: T) -> Result<()> {
        check_index(i, j, (self.rows, self.cols))?;
        let (start, end) = (self.row_ptr[i], self.row_ptr[i + 1]);
        match self.col_idx[start..end].binary_search(&j) {
            Ok(pos) => self.values[start + pos] = value,
            Err(pos) => {
                self.col_idx.insert(start + pos, j);
                self.values.insert(start + pos, value);
                for p in &mut self.row_ptr[i + 1..] {
                    *p += 1;
                }
            }
        }
        Ok(())
    }

    pub fn at(&self, i: usize, j: usize) -> Result<T> {
        check_index(i, j, (self.rows, self.cols))?;
        Ok(self.lookup(i, j))
    }

    /// Stored entries of row `i` as `(col, value)`.
    pub fn row_entries(&self, i: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let (start, end) = (self.row_ptr[i], self.row_ptr[i + 1]);
        self.col_idx[start..end]
            .iter()
            .copied()
            .zip(self.values[start..end].iter().copied())
    }

    #[inline]
    fn lookup(&self, i: usize, j: usize) -> T {
        let (start, end) = (self.row_ptr[i], self.row_ptr[i + 1]);
        match self.col_idx[start..end].binary_search(&j) {
            Ok(pos) => self.values[start + pos],
            Err(_) => T::zero(),
        }
    }

    fn scatter(&self, mut dst: MatMut<'_, T>, scale: T, op: AssignOp) {
        if op == AssignOp::Assign {
            dst.fill(T::zero());
        }
        for i in 0..self.rows {
            for (j, v) in self.row_entries(i) {
                let value = op.apply(dst.get(i, j), scale * v);
                dst.set(i, j, value);
            }
        }
    }
}

impl<T: Scalar> MatExpr for CompressedMatrix<T> {
    type Elem = T;
    type Order = RowMajor;

    const IS_DENSE: bool = false;

    #[inline]
    fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn get(&self, i: usize, j: usize) -> T {
        self.lookup(i, j)
    }

    fn for_each_in_row(&self, i: usize, f: &mut dyn FnMut(usize, T)) {
        for (j, v) in self.row_entries(i) {
            f(j, v);
        }
    }

    fn assign_to(&self, dst: MatMut<'_, T>, op: AssignOp, _cfg: &EvalConfig) -> Result<()> {
        self.scatter(dst, T::one(), op);
        Ok(())
    }

    fn assign_scaled_to(
        &self,
        dst: MatMut<'_, T>,
        scale: T,
        op: AssignOp,
        _cfg: &EvalConfig,
    ) -> Result<()> {
        self.scatter(dst, scale, op);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LinexprError;

    #[test]
    fn test_triplets_sorted_and_summed() {
        let m = CompressedMatrix::from_triplets(
            3,
            3,
            vec![(2, 0, 1.0), (0, 2, 2.0), (0, 1, 3.0), (0, 2, 4.0)],
        )
        .unwrap();
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.at(0, 2).unwrap(), 6.0);
        assert_eq!(m.at(1, 1).unwrap(), 0.0);
        assert_eq!(m.row_entries(0).collect::<Vec<_>>(), vec![(1, 3.0), (2, 6.0)]);
        assert_eq!(m.row_entries(1).count(), 0);
    }

    #[test]
    fn test_insert_keeps_rows_consistent() {
        let mut m = CompressedMatrix::new(2, 3);
        m.insert(1, 2, 5.0).unwrap();
        m.insert(0, 1, 1.0).unwrap();
        m.insert(1, 0, 2.0).unwrap();
        m.insert(1, 2, 7.0).unwrap();
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.row_entries(1).collect::<Vec<_>>(), vec![(0, 2.0), (2, 7.0)]);
        assert!(matches!(
            m.insert(2, 0, 1.0),
            Err(LinexprError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_vector_assign_zero_fills() {
        let v = CompressedVector::from_pairs(4, vec![(3, 2.0), (1, 1.0), (3, 1.0)]).unwrap();
        assert_eq!(v.nnz(), 2);
        let mut out = [9.0; 4];
        v.assign_to(VecMut::from_slice(&mut out), AssignOp::Assign, &EvalConfig::serial())
            .unwrap();
        assert_eq!(out, [0.0, 1.0, 0.0, 3.0]);
        v.assign_scaled_to(VecMut::from_slice(&mut out), 2.0, AssignOp::Sub, &EvalConfig::serial())
            .unwrap();
        assert_eq!(out, [0.0, -1.0, 0.0, -3.0]);
    }
}
