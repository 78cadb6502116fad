//! Symmetric matrix adaptor.

use linexpr_kernel::{MatMut, MatRef};
use linexpr_traits::RowMajor;

use super::check_index;
use super::dense::DynamicMatrix;
use super::view::{Aliased, MatrixView};
use crate::assign::{alias_matrix, MatrixTarget, Strategy};
use crate::config::EvalConfig;
use crate::expr::{same_shape, AssignOp, MatExpr};
use crate::{LinexprError, Result, Scalar};

/// Square matrix that keeps `a(i, j) == a(j, i)`.
///
/// Element writes go through [`set`](SymmetricMatrix::set) or a
/// [`SymmetricProxy`], which mirror every off-diagonal write. Expression
/// assignment evaluates into a temporary, rejects non-symmetric values with
/// [`LinexprError::NotSymmetric`] and only then touches the matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetricMatrix<T> {
    inner: DynamicMatrix<T, RowMajor>,
}

impl<T: Scalar> Default for SymmetricMatrix<T> {
    fn default() -> Self {
        Self {
            inner: DynamicMatrix::default(),
        }
    }
}

/// Exact equality, with NaN matching NaN.
#[inline]
fn mirrors<T: PartialEq>(a: T, b: T) -> bool {
    #[allow(clippy::eq_op)]
    let both_nan = a != a && b != b;
    a == b || both_nan
}

/// First `(i, j)` with `i < j` whose mirror differs. A NaN mirrored by a
/// NaN counts as symmetric.
fn find_asymmetry<M: MatExpr>(m: &M) -> Option<(usize, usize)> {
    let n = m.rows();
    (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .find(|&(i, j)| !mirrors(m.get(i, j), m.get(j, i)))
}

fn require_symmetric<M: MatExpr>(m: &M) -> Result<()> {
    match find_asymmetry(m) {
        Some((row, col)) => Err(LinexprError::NotSymmetric { row, col }),
        None => Ok(()),
    }
}

impl<T: Scalar> SymmetricMatrix<T> {
    /// `n x n` zero matrix.
    pub fn new(n: usize) -> Self {
        Self {
            inner: DynamicMatrix::zeros(n, n),
        }
    }

    /// Evaluate `expr` and adopt it if it is square and symmetric.
    pub fn from_expr<E: MatExpr<Elem = T>>(expr: E) -> Result<Self> {
        expr.check()?;
        let (rows, cols) = (expr.rows(), expr.cols());
        if rows != cols {
            return Err(LinexprError::NonSquare {
                op: "symmetric matrix",
                rows,
                cols,
            });
        }
        let mut inner = DynamicMatrix::<T, RowMajor>::zeros(rows, cols);
        expr.assign_to(inner.raw_mut(), AssignOp::Assign, &EvalConfig::default())?;
        require_symmetric(&inner)?;
        Ok(Self { inner })
    }

    /// Number of rows (and columns).
    #[inline]
    pub fn size(&self) -> usize {
        self.inner.rows()
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
        self.inner.at(i, j)
    }

    /// Write `value` at `(i, j)` and `(j, i)`.
    pub fn set(&mut self, i: usize, j: usize, value: T) -> Result<()> {
        check_index(i, j, (self.size(), self.size()))?;
        self.inner.set(i, j, value)?;
        self.inner.set(j, i, value)
    }

    /// Handle to element `(i, j)` whose writes are mirrored.
    pub fn proxy(&mut self, i: usize, j: usize) -> Result<SymmetricProxy<'_, T>> {
        check_index(i, j, (self.size(), self.size()))?;
        Ok(SymmetricProxy { mat: self, i, j })
    }

    /// Change the order to `n x n`, keeping the leading block.
    pub fn resize(&mut self, n: usize) {
        self.inner.resize(n, n);
    }

    /// The full (mirrored) storage.
    pub fn as_matrix(&self) -> &DynamicMatrix<T, RowMajor> {
        &self.inner
    }

    pub fn into_inner(self) -> DynamicMatrix<T, RowMajor> {
        self.inner
    }

    #[inline]
    pub fn raw(&self) -> MatRef<'_, T> {
        self.inner.raw()
    }

    pub fn view(&self) -> MatrixView<'_, T, RowMajor> {
        self.inner.view()
    }
}

/// Reference-like handle to one element of a [`SymmetricMatrix`].
#[derive(Debug)]
pub struct SymmetricProxy<'a, T> {
    mat: &'a mut SymmetricMatrix<T>,
    i: usize,
    j: usize,
}

impl<T: Scalar> SymmetricProxy<'_, T> {
    pub fn get(&self) -> T {
        MatExpr::get(&self.mat.inner, self.i, self.j)
    }

    /// Write the element and its mirror.
    pub fn set(&mut self, value: T) {
        let (i, j, n) = (self.i, self.j, self.mat.size());
        let data = self.mat.inner.as_mut_slice();
        data[i * n + j] = value;
        data[j * n + i] = value;
    }

    /// `element += value`, mirrored.
    pub fn add(&mut self, value: T) {
        let v = self.get() + value;
        self.set(v);
    }
}

impl<T: Scalar> MatExpr for SymmetricMatrix<T> {
    type Elem = T;
    type Order = RowMajor;

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
        MatExpr::get(&self.inner, i, j)
    }

    fn as_mat_ref(&self) -> Option<MatRef<'_, T>> {
        Some(self.inner.raw())
    }
}

impl<T: Scalar> MatrixTarget for SymmetricMatrix<T> {
    type Elem = T;
    type Order = RowMajor;

    const IS_RESIZABLE: bool = true;

    fn target_shape(&self) -> (usize, usize) {
        (self.inner.rows(), self.inner.cols())
    }

    fn resize_target(&mut self, rows: usize, cols: usize) -> Result<()> {
        if rows != cols {
            return Err(LinexprError::NonSquare {
                op: "symmetric resize",
                rows,
                cols,
            });
        }
        self.resize(rows);
        Ok(())
    }

    /// Raw access to the storage. Writes through it bypass the mirroring.
    fn target_mut(&mut self) -> MatMut<'_, T> {
        self.inner.raw_mut()
    }

    fn apply_with<E>(&mut self, expr: E, op: AssignOp, cfg: &EvalConfig) -> Result<Strategy>
    where
        E: MatExpr<Elem = T>,
    {
        expr.check()?;
        let (rows, cols) = (expr.rows(), expr.cols());
        if rows != cols {
            return Err(LinexprError::NonSquare {
                op: "symmetric assignment",
                rows,
                cols,
            });
        }
        if op != AssignOp::Assign {
            same_shape("symmetric assignment", self.target_shape(), (rows, cols))?;
        }
        let value = expr.eval_with(cfg)?;
        require_symmetric(&value)?;
        self.resize(rows);
        value.assign_to(self.inner.raw_mut(), op, cfg)?;
        log::trace!("symmetric {:?} of {}x{} through a temporary", op, rows, cols);
        Ok(Strategy::Buffered)
    }

    fn update_submatrix<'s, F, E>(
        &'s mut self,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
        f: F,
    ) -> Result<()>
    where
        F: FnOnce(Aliased<MatrixView<'s, T, RowMajor>>) -> E,
        E: MatExpr<Elem = T>,
    {
        super::check_block(self.target_shape(), row, col, rows, cols)?;
        // SAFETY: the view is only read while `block` is computed, before any
        // write to `self`.
        let view = unsafe { alias_matrix(self.inner.raw_mut()) };
        let expr = f(view);
        expr.check()?;
        same_shape("submatrix update", (rows, cols), (expr.rows(), expr.cols()))?;
        let cfg = EvalConfig::default();
        let block = expr.eval_with(&cfg)?;

        let mut next = self.inner.clone();
        block.assign_to(
            next.raw_mut().submatrix(row, col, rows, cols),
            AssignOp::Assign,
            &cfg,
        )?;
        require_symmetric(&next)?;
        self.inner = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_mirrors() {
        let mut s = SymmetricMatrix::<f64>::new(3);
        s.set(0, 1, 5.0).unwrap();
        assert_eq!(s.at(1, 0).unwrap(), 5.0);
        s.proxy(2, 1).unwrap().set(4.0);
        assert_eq!(s.at(1, 2).unwrap(), 4.0);
        s.proxy(1, 2).unwrap().add(1.0);
        assert_eq!(s.at(2, 1).unwrap(), 5.0);
        assert!(s.set(3, 0, 1.0).is_err());
    }

    #[test]
    fn test_from_expr_rejects_asymmetric() {
        let a = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(
            SymmetricMatrix::from_expr(&a).unwrap_err(),
            LinexprError::NotSymmetric { row: 0, col: 1 }
        );
        let r = DynamicMatrix::<f64>::zeros(2, 3);
        assert!(matches!(
            SymmetricMatrix::from_expr(&r),
            Err(LinexprError::NonSquare { .. })
        ));
        let s = SymmetricMatrix::from_expr(DynamicMatrix::<f64>::identity(2)).unwrap();
        assert_eq!(s.size(), 2);
    }

    #[test]
    fn test_nan_mirrored_by_nan_is_symmetric() {
        let a = DynamicMatrix::<f64>::from_rows(&[[1.0, f64::NAN], [f64::NAN, 2.0]]);
        let s = SymmetricMatrix::from_expr(&a).unwrap();
        assert!(s.at(1, 0).unwrap().is_nan());

        let mut t = SymmetricMatrix::<f64>::default();
        let b = DynamicMatrix::<f64>::from_rows(&[[1.0, f64::NAN], [0.0, 2.0]]);
        assert_eq!(
            t.assign(&b).unwrap_err(),
            LinexprError::NotSymmetric { row: 0, col: 1 }
        );
        assert_eq!(t.size(), 0);
    }
}
