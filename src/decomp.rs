//! Dense factorizations and solves.
//!
//! Thin wrappers over the kernel's LAPACK-style routines. Operands are
//! evaluated into column-major buffers first; a non-zero `info` from the
//! routine becomes [`LinexprError::Singular`] or
//! [`LinexprError::NotPositiveDefinite`]. Results are returned as row-major
//! [`DynamicMatrix`] values.
//!
//! These need a floating-point real type (`T::Real: Float`), so integer
//! matrices cannot be factorized.
//!
//! # Example
//!
//! ```rust
//! use linexpr::decomp;
//! use linexpr::prelude::*;
//!
//! let a = DynamicMatrix::<f64>::from_rows(&[[4.0, 2.0], [2.0, 3.0]]);
//! let b = DynamicVector::from_vec(vec![2.0, 1.0]);
//! let x = decomp::solve(&a, &b).unwrap();
//! assert!((x.as_slice()[0] - 0.5).abs() < 1e-12);
//! assert!(x.as_slice()[1].abs() < 1e-12);
//! ```

use linexpr_kernel::lapack;
use linexpr_traits::ColumnMajor;
use num_traits::{Float, Zero};

use crate::assign::MatrixTarget;
use crate::expr::{same_shape, MatExpr, VecExpr};
use crate::storage::{DynamicMatrix, DynamicVector};
use crate::{LinexprError, Result, Scalar};

fn square<E: MatExpr>(a: &E, op: &'static str) -> Result<usize> {
    a.check()?;
    let (rows, cols) = (a.rows(), a.cols());
    if rows != cols {
        return Err(LinexprError::NonSquare { op, rows, cols });
    }
    Ok(rows)
}

fn column_major<E: MatExpr>(a: &E) -> Result<DynamicMatrix<E::Elem, ColumnMajor>> {
    let mut out = DynamicMatrix::new(0, 0);
    out.assign(a)?;
    Ok(out)
}

fn row_major<T: Scalar>(m: &DynamicMatrix<T, ColumnMajor>) -> DynamicMatrix<T> {
    DynamicMatrix::from_fn(m.rows(), m.cols(), |i, j| MatExpr::get(m, i, j))
}

/// Lower triangle of a column-major `n x n` buffer.
fn lower<T: Scalar>(buf: &[T], n: usize, unit_diagonal: bool) -> DynamicMatrix<T> {
    DynamicMatrix::from_fn(n, n, |i, j| match i.cmp(&j) {
        std::cmp::Ordering::Greater => buf[i + j * n],
        std::cmp::Ordering::Equal if unit_diagonal => T::one(),
        std::cmp::Ordering::Equal => buf[i + j * n],
        std::cmp::Ordering::Less => T::zero(),
    })
}

// ============================================================================
// LU
// ============================================================================

/// `P * A = L * U` with partial pivoting.
#[derive(Debug, Clone)]
pub struct Lu<T> {
    factors: DynamicMatrix<T, ColumnMajor>,
    ipiv: Vec<usize>,
    info: i32,
}

/// LU factorization of a square matrix.
///
/// A singular matrix still factorizes; [`Lu::solve`] and friends then fail
/// with [`LinexprError::Singular`] and [`Lu::det`] is zero.
pub fn lu<E>(a: E) -> Result<Lu<E::Elem>>
where
    E: MatExpr,
    <E::Elem as Scalar>::Real: Float,
{
    let n = square(&a, "lu")?;
    let mut factors = column_major(&a)?;
    let mut ipiv = vec![0; n];
    let info = lapack::getrf(n, n, factors.as_mut_slice(), n.max(1), &mut ipiv);
    log::trace!("getrf on {n}x{n}: info = {info}");
    if info < 0 {
        return Err(LinexprError::Lapack {
            routine: "getrf",
            info,
        });
    }
    Ok(Lu {
        factors,
        ipiv,
        info,
    })
}

impl<T: Scalar> Lu<T>
where
    T::Real: Float,
{
    #[inline]
    pub fn size(&self) -> usize {
        self.factors.rows()
    }

    /// Whether `U` has an exactly zero pivot.
    pub fn is_singular(&self) -> bool {
        self.info > 0
    }

    /// Unit lower triangular factor.
    pub fn l(&self) -> DynamicMatrix<T> {
        lower(self.factors.as_slice(), self.size(), true)
    }

    /// Upper triangular factor.
    pub fn u(&self) -> DynamicMatrix<T> {
        let n = self.size();
        let buf = self.factors.as_slice();
        DynamicMatrix::from_fn(n, n, |i, j| if i <= j { buf[i + j * n] } else { T::zero() })
    }

    /// Row `i` of `P * A` is row `permutation()[i]` of `A`.
    pub fn permutation(&self) -> Vec<usize> {
        let mut perm: Vec<usize> = (0..self.size()).collect();
        for (j, &p) in self.ipiv.iter().enumerate() {
            perm.swap(j, p);
        }
        perm
    }

    /// The permutation as a matrix.
    pub fn p(&self) -> DynamicMatrix<T> {
        let perm = self.permutation();
        DynamicMatrix::from_fn(self.size(), self.size(), |i, j| {
            if perm[i] == j {
                T::one()
            } else {
                T::zero()
            }
        })
    }

    /// Determinant of `A`.
    pub fn det(&self) -> T {
        let n = self.size();
        let buf = self.factors.as_slice();
        let mut det = T::one();
        for (j, &p) in self.ipiv.iter().enumerate() {
            det *= buf[j + j * n];
            if p != j {
                det = -det;
            }
        }
        det
    }

    fn require_regular(&self) -> Result<()> {
        if self.info > 0 {
            return Err(LinexprError::Singular {
                pivot: self.info as usize,
            });
        }
        Ok(())
    }

    /// Solve `A * x = b`.
    pub fn solve<V: VecExpr<Elem = T>>(&self, b: V) -> Result<DynamicVector<T>> {
        self.require_regular()?;
        b.check()?;
        let n = self.size();
        same_shape("lu solve", (n, 1), (b.size(), 1))?;
        let mut x = b.eval()?.into_vec();
        lapack::getrs(n, 1, self.factors.as_slice(), n.max(1), &self.ipiv, &mut x, n.max(1));
        Ok(DynamicVector::from_vec(x))
    }

    /// Solve `A * X = B` for every column of `B`.
    pub fn solve_matrix<B: MatExpr<Elem = T>>(&self, b: B) -> Result<DynamicMatrix<T>> {
        self.require_regular()?;
        b.check()?;
        let n = self.size();
        same_shape("lu solve", (n, b.cols()), (b.rows(), b.cols()))?;
        let mut x = column_major(&b)?;
        let nrhs = x.cols();
        lapack::getrs(
            n,
            nrhs,
            self.factors.as_slice(),
            n.max(1),
            &self.ipiv,
            x.as_mut_slice(),
            n.max(1),
        );
        Ok(row_major(&x))
    }

    /// `A^-1`.
    pub fn inverse(&self) -> Result<DynamicMatrix<T>> {
        self.solve_matrix(DynamicMatrix::<T>::identity(self.size()))
    }
}

/// Solve `A * x = b` through an LU factorization.
pub fn solve<E, V>(a: E, b: V) -> Result<DynamicVector<E::Elem>>
where
    E: MatExpr,
    V: VecExpr<Elem = E::Elem>,
    <E::Elem as Scalar>::Real: Float,
{
    lu(a)?.solve(b)
}

/// Inverse of a square matrix.
pub fn inv<E>(a: E) -> Result<DynamicMatrix<E::Elem>>
where
    E: MatExpr,
    <E::Elem as Scalar>::Real: Float,
{
    lu(a)?.inverse()
}

/// Determinant of a square matrix.
pub fn det<E>(a: E) -> Result<E::Elem>
where
    E: MatExpr,
    <E::Elem as Scalar>::Real: Float,
{
    Ok(lu(a)?.det())
}

// ============================================================================
// Cholesky
// ============================================================================

/// `A = L * L^H` for Hermitian positive definite `A`.
#[derive(Debug, Clone)]
pub struct Cholesky<T> {
    factor: DynamicMatrix<T, ColumnMajor>,
}

/// Cholesky factorization. Only the lower triangle of `a` is read.
pub fn cholesky<E>(a: E) -> Result<Cholesky<E::Elem>>
where
    E: MatExpr,
    <E::Elem as Scalar>::Real: Float,
{
    let n = square(&a, "cholesky")?;
    let mut factor = column_major(&a)?;
    let info = lapack::potrf(n, factor.as_mut_slice(), n.max(1));
    log::trace!("potrf on {n}x{n}: info = {info}");
    if info > 0 {
        return Err(LinexprError::NotPositiveDefinite {
            minor: info as usize,
        });
    }
    Ok(Cholesky { factor })
}

impl<T: Scalar> Cholesky<T> {
    #[inline]
    pub fn size(&self) -> usize {
        self.factor.rows()
    }

    /// Lower triangular factor.
    pub fn l(&self) -> DynamicMatrix<T> {
        lower(self.factor.as_slice(), self.size(), false)
    }

    pub fn solve<V: VecExpr<Elem = T>>(&self, b: V) -> Result<DynamicVector<T>> {
        b.check()?;
        let n = self.size();
        same_shape("cholesky solve", (n, 1), (b.size(), 1))?;
        let mut x = b.eval()?.into_vec();
        lapack::potrs(n, 1, self.factor.as_slice(), n.max(1), &mut x, n.max(1));
        Ok(DynamicVector::from_vec(x))
    }

    pub fn solve_matrix<B: MatExpr<Elem = T>>(&self, b: B) -> Result<DynamicMatrix<T>> {
        b.check()?;
        let n = self.size();
        same_shape("cholesky solve", (n, b.cols()), (b.rows(), b.cols()))?;
        let mut x = column_major(&b)?;
        let nrhs = x.cols();
        lapack::potrs(n, nrhs, self.factor.as_slice(), n.max(1), x.as_mut_slice(), n.max(1));
        Ok(row_major(&x))
    }
}

// ============================================================================
// Pivoted Cholesky
// ============================================================================

/// `P^T * A * P = L * L^H` with complete pivoting.
#[derive(Debug, Clone)]
pub struct PivotedCholesky<T> {
    factor: DynamicMatrix<T, ColumnMajor>,
    piv: Vec<usize>,
    rank: usize,
}

fn factor_pivoted<E>(a: E, tol: <E::Elem as Scalar>::Real) -> Result<(PivotedCholesky<E::Elem>, i32)>
where
    E: MatExpr,
    <E::Elem as Scalar>::Real: Float,
{
    let n = square(&a, "pivoted cholesky")?;
    let mut factor = column_major(&a)?;
    let mut piv = vec![0; n];
    let (rank, info) = lapack::pstrf(n, factor.as_mut_slice(), n.max(1), &mut piv, tol);
    log::trace!("pstrf on {n}x{n}: rank = {rank}, info = {info}");
    Ok((PivotedCholesky { factor, piv, rank }, info))
}

/// Pivoted Cholesky factorization of a positive definite matrix.
///
/// Factorization stops once the largest remaining diagonal entry is at most
/// `tol` (a negative `tol` picks `n * eps * max(diag(A))`). Stopping before
/// the last column means `A` is not positive definite and is reported as
/// [`LinexprError::NotPositiveDefinite`] at the first rejected minor.
pub fn pivoted_cholesky<E>(a: E, tol: <E::Elem as Scalar>::Real) -> Result<PivotedCholesky<E::Elem>>
where
    E: MatExpr,
    <E::Elem as Scalar>::Real: Float,
{
    let (f, info) = factor_pivoted(a, tol)?;
    if info != 0 {
        return Err(LinexprError::NotPositiveDefinite { minor: f.rank + 1 });
    }
    Ok(f)
}

/// Like [`pivoted_cholesky`], but accepts rank-deficient (semidefinite)
/// matrices; see [`PivotedCholesky::rank`].
pub fn semidefinite_cholesky<E>(
    a: E,
    tol: <E::Elem as Scalar>::Real,
) -> Result<PivotedCholesky<E::Elem>>
where
    E: MatExpr,
    <E::Elem as Scalar>::Real: Float,
{
    let (f, info) = factor_pivoted(a, tol)?;
    if info != 0 {
        log::debug!("pivoted cholesky stopped at rank {} of {}", f.rank, f.size());
    }
    Ok(f)
}

impl<T: Scalar> PivotedCholesky<T> {
    #[inline]
    pub fn size(&self) -> usize {
        self.factor.rows()
    }

    /// Number of columns factorized.
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// `pivots()[i]` is the row and column of `A` placed at position `i`.
    pub fn pivots(&self) -> &[usize] {
        &self.piv
    }

    /// Lower triangular factor; columns past the rank are zero.
    pub fn l(&self) -> DynamicMatrix<T> {
        lower(self.factor.as_slice(), self.size(), false)
    }

    /// The permutation `P` as a matrix.
    pub fn p(&self) -> DynamicMatrix<T> {
        let n = self.size();
        DynamicMatrix::from_fn(n, n, |i, j| {
            if self.piv[j] == i {
                T::one()
            } else {
                T::zero()
            }
        })
    }
}

// ============================================================================
// QR
// ============================================================================

/// Thin QR factorization `A = Q * R` of an `m x n` matrix, `k = min(m, n)`.
#[derive(Debug, Clone)]
pub struct Qr<T> {
    q: DynamicMatrix<T>,
    r: DynamicMatrix<T>,
}

/// Householder QR factorization.
pub fn qr<E>(a: E) -> Result<Qr<E::Elem>>
where
    E: MatExpr,
    <E::Elem as Scalar>::Real: Float,
{
    a.check()?;
    let (m, n) = (a.rows(), a.cols());
    let k = m.min(n);
    let mut buf = column_major(&a)?;
    let data = buf.as_mut_slice();
    let mut tau = vec![E::Elem::zero(); k];
    lapack::geqrf(m, n, data, m.max(1), &mut tau);
    let r = DynamicMatrix::from_fn(k, n, |i, j| if i <= j { data[i + j * m] } else { E::Elem::zero() });
    lapack::orgqr(m, k, k, data, m.max(1), &tau);
    let q = DynamicMatrix::from_fn(m, k, |i, j| data[i + j * m]);
    log::trace!("geqrf/orgqr on {m}x{n}");
    Ok(Qr { q, r })
}

impl<T: Scalar> Qr<T> {
    /// `m x k` factor with orthonormal columns.
    pub fn q(&self) -> &DynamicMatrix<T> {
        &self.q
    }

    /// `k x n` upper triangular factor.
    pub fn r(&self) -> &DynamicMatrix<T> {
        &self.r
    }

    pub fn into_parts(self) -> (DynamicMatrix<T>, DynamicMatrix<T>) {
        (self.q, self.r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::distributions::Uniform;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn assert_matrix_eq<A, B>(a: &A, b: &B)
    where
        A: MatExpr<Elem = f64>,
        B: MatExpr<Elem = f64>,
    {
        assert_eq!((a.rows(), a.cols()), (b.rows(), b.cols()));
        for i in 0..a.rows() {
            for j in 0..a.cols() {
                assert_relative_eq!(a.get(i, j), b.get(i, j), epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_lu_reconstructs() {
        let a = DynamicMatrix::<f64>::from_rows(&[[2.0, 1.0, 1.0], [4.0, -6.0, 0.0], [-2.0, 7.0, 2.0]]);
        let f = lu(&a).unwrap();
        assert!(!f.is_singular());
        let pa = (&f.p() * &a).eval().unwrap();
        let lu_prod = (&f.l() * &f.u()).eval().unwrap();
        assert_matrix_eq(&pa, &lu_prod);
        assert_relative_eq!(f.det(), -16.0, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_and_inverse() {
        let a = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
        assert_relative_eq!(det(&a).unwrap(), -2.0, epsilon = 1e-12);
        let x = solve(&a, DynamicVector::from_vec(vec![5.0, 11.0])).unwrap();
        assert_relative_eq!(x.as_slice()[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x.as_slice()[1], 2.0, epsilon = 1e-12);

        let a_inv = inv(&a).unwrap();
        let expected = DynamicMatrix::<f64>::from_rows(&[[-2.0, 1.0], [1.5, -0.5]]);
        assert_matrix_eq(&a_inv, &expected);
    }

    #[test]
    fn test_singular_is_reported() {
        let a = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0], [2.0, 4.0]]);
        let f = lu(&a).unwrap();
        assert!(f.is_singular());
        assert_eq!(f.det(), 0.0);
        assert_eq!(
            f.solve(DynamicVector::from_vec(vec![1.0, 1.0])).unwrap_err(),
            LinexprError::Singular { pivot: 2 }
        );
        assert!(matches!(
            lu(DynamicMatrix::<f64>::zeros(2, 3)),
            Err(LinexprError::NonSquare { op: "lu", .. })
        ));
    }

    #[test]
    fn test_cholesky() {
        let a = DynamicMatrix::<f64>::from_rows(&[[4.0, 2.0], [2.0, 3.0]]);
        let f = cholesky(&a).unwrap();
        let expected = DynamicMatrix::<f64>::from_rows(&[[2.0, 0.0], [1.0, 2.0_f64.sqrt()]]);
        assert_matrix_eq(&f.l(), &expected);
        let x = f.solve(DynamicVector::from_vec(vec![2.0, 1.0])).unwrap();
        assert_relative_eq!(x.as_slice()[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(x.as_slice()[1], 0.0, epsilon = 1e-12);

        let indefinite = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0], [2.0, 1.0]]);
        assert_eq!(
            cholesky(&indefinite).unwrap_err(),
            LinexprError::NotPositiveDefinite { minor: 2 }
        );
    }

    #[test]
    fn test_pivoted_cholesky() {
        let a = DynamicMatrix::<f64>::from_rows(&[[4.0, 2.0, 2.0], [2.0, 5.0, 1.0], [2.0, 1.0, 6.0]]);
        let f = pivoted_cholesky(&a, -1.0).unwrap();
        assert_eq!(f.rank(), 3);
        // Largest diagonal first.
        assert_eq!(f.pivots()[0], 2);
        let l = f.l();
        let llt = (&l * l.t()).eval().unwrap();
        let piv = f.pivots();
        let pap = DynamicMatrix::<f64>::from_fn(3, 3, |i, j| a.at(piv[i], piv[j]).unwrap());
        assert_matrix_eq(&llt, &pap);
    }

    #[test]
    fn test_semidefinite_cholesky() {
        let a = DynamicMatrix::<f64>::from_rows(&[[1.0, 1.0], [1.0, 1.0]]);
        assert_eq!(
            pivoted_cholesky(&a, -1.0).unwrap_err(),
            LinexprError::NotPositiveDefinite { minor: 2 }
        );
        let f = semidefinite_cholesky(&a, -1.0).unwrap();
        assert_eq!(f.rank(), 1);
        assert_eq!(f.l().at(1, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_qr_random() {
        let dist = Uniform::new(-1.0, 1.0);
        let a = DynamicMatrix::<f64>::random(5, 3, &mut StdRng::seed_from_u64(42), &dist);
        let f = qr(&a).unwrap();
        let (q, r) = (f.q(), f.r());
        assert_eq!((q.rows(), q.cols()), (5, 3));
        assert_eq!((r.rows(), r.cols()), (3, 3));
        assert_eq!(r.at(2, 0).unwrap(), 0.0);

        let qr_prod = (q * r).eval().unwrap();
        assert_matrix_eq(&qr_prod, &a);
        let qtq = (q.t() * q).eval().unwrap();
        assert_matrix_eq(&qtq, &DynamicMatrix::<f64>::identity(3));
    }
}
