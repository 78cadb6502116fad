//! Dense factorizations on column-major buffers.
//!
//! Every routine works in place on a column-major buffer `a` with leading
//! dimension `lda` (element `(i, j)` at `a[i + j * lda]`) and follows the LAPACK
//! status convention: the returned `info` is `0` on success and `k > 0` when
//! the factorization broke down at (1-based) step `k`.
//!
//! Complex matrices are handled as Hermitian where the routine requires
//! symmetry (`potrf`, `pstrf`).

use linexpr_traits::Scalar;
use num_traits::Float;

#[inline(always)]
fn at(i: usize, j: usize, lda: usize) -> usize {
    i + j * lda
}

/// LU factorization with partial pivoting, `P * A = L * U`.
///
/// On exit the strict lower part of `a` holds `L` (unit diagonal implied) and
/// the upper part holds `U`. `ipiv[j]` is the row swapped with row `j` at step
/// `j` (0-based). Returns `k > 0` if `U[k-1, k-1]` is exactly zero; the
/// factorization is still completed.
pub fn getrf<T>(m: usize, n: usize, a: &mut [T], lda: usize, ipiv: &mut [usize]) -> i32
where
    T: Scalar,
    T::Real: Float,
{
    let mut info = 0;
    for j in 0..m.min(n) {
        let mut p = j;
        let mut best = a[at(j, j, lda)].modulus();
        for i in j + 1..m {
            let v = a[at(i, j, lda)].modulus();
            if v > best {
                best = v;
                p = i;
            }
        }
        ipiv[j] = p;
        if best == <T::Real as num_traits::Zero>::zero() {
            if info == 0 {
                info = (j + 1) as i32;
            }
            continue;
        }
        if p != j {
            for col in 0..n {
                a.swap(at(j, col, lda), at(p, col, lda));
            }
        }
        let pivot = a[at(j, j, lda)];
        for i in j + 1..m {
            a[at(i, j, lda)] = a[at(i, j, lda)] / pivot;
        }
        for col in j + 1..n {
            let u = a[at(j, col, lda)];
            if u == T::zero() {
                continue;
            }
            for i in j + 1..m {
                let l = a[at(i, j, lda)];
                a[at(i, col, lda)] -= l * u;
            }
        }
    }
    info
}

/// Solve `A * X = B` with the factors from [`getrf`] (`n x n`, `nrhs` columns).
pub fn getrs<T: Scalar>(
    n: usize,
    nrhs: usize,
    a: &[T],
    lda: usize,
    ipiv: &[usize],
    b: &mut [T],
    ldb: usize,
) {
    for col in 0..nrhs {
        for (j, &p) in ipiv.iter().enumerate().take(n) {
            if p != j {
                b.swap(at(j, col, ldb), at(p, col, ldb));
            }
        }
        // L y = P b
        for j in 0..n {
            let y = b[at(j, col, ldb)];
            for i in j + 1..n {
                b[at(i, col, ldb)] -= a[at(i, j, lda)] * y;
            }
        }
        // U x = y
        for j in (0..n).rev() {
            let x = b[at(j, col, ldb)] / a[at(j, j, lda)];
            b[at(j, col, ldb)] = x;
            for i in 0..j {
                b[at(i, col, ldb)] -= a[at(i, j, lda)] * x;
            }
        }
    }
}

/// Cholesky factorization `A = L * L^H` of a Hermitian positive definite matrix.
///
/// Only the lower triangle of `a` is read; on exit it holds `L`. Returns `k > 0`
/// if the leading minor of order `k` is not positive definite.
pub fn potrf<T>(n: usize, a: &mut [T], lda: usize) -> i32
where
    T: Scalar,
    T::Real: Float,
{
    for j in 0..n {
        let mut d = a[at(j, j, lda)].re();
        for k in 0..j {
            d = d - a[at(j, k, lda)].modulus_sqr();
        }
        if !(d > <T::Real as num_traits::Zero>::zero()) {
            return (j + 1) as i32;
        }
        let ljj = d.sqrt();
        a[at(j, j, lda)] = T::from_real(ljj);
        let inv = T::from_real(ljj.recip());
        for i in j + 1..n {
            let mut s = a[at(i, j, lda)];
            for k in 0..j {
                s -= a[at(i, k, lda)] * a[at(j, k, lda)].conj();
            }
            a[at(i, j, lda)] = s * inv;
        }
    }
    0
}

/// Solve `A * X = B` with the lower Cholesky factor from [`potrf`].
pub fn potrs<T: Scalar>(n: usize, nrhs: usize, a: &[T], lda: usize, b: &mut [T], ldb: usize) {
    for col in 0..nrhs {
        for j in 0..n {
            let y = b[at(j, col, ldb)] / a[at(j, j, lda)];
            b[at(j, col, ldb)] = y;
            for i in j + 1..n {
                b[at(i, col, ldb)] -= a[at(i, j, lda)] * y;
            }
        }
        for j in (0..n).rev() {
            let mut s = b[at(j, col, ldb)];
            for i in j + 1..n {
                s -= a[at(i, j, lda)].conj() * b[at(i, col, ldb)];
            }
            b[at(j, col, ldb)] = s / a[at(j, j, lda)].conj();
        }
    }
}

/// Cholesky factorization with complete pivoting of a Hermitian positive
/// semidefinite matrix, `P^T * A * P = L * L^H`.
///
/// Unlike [`potrf`], the full matrix `a` must be populated. On exit the lower
/// triangle holds `L` with columns past the rank set to zero, and
/// `piv[i]` is the original index placed at position `i`. Factorization stops
/// once the largest remaining diagonal entry is `<= tol`; a negative `tol`
/// selects `n * eps * max(diag(A))`.
///
/// Returns `(rank, info)` where `info == 1` flags a rank-deficient matrix.
pub fn pstrf<T>(n: usize, a: &mut [T], lda: usize, piv: &mut [usize], tol: T::Real) -> (usize, i32)
where
    T: Scalar,
    T::Real: Float,
{
    let zero = <T::Real as num_traits::Zero>::zero();
    for (i, p) in piv.iter_mut().enumerate().take(n) {
        *p = i;
    }
    if n == 0 {
        return (0, 0);
    }
    let mut diag: Vec<T::Real> = (0..n).map(|i| a[at(i, i, lda)].re()).collect();
    let tol = if tol < zero {
        let max = diag.iter().copied().fold(zero, Float::max);
        <T::Real as num_traits::NumCast>::from(n).unwrap_or_else(<T::Real as num_traits::One>::one) * T::Real::epsilon() * max
    } else {
        tol
    };

    let mut rank = n;
    for j in 0..n {
        let mut p = j;
        for i in j + 1..n {
            if diag[i] > diag[p] {
                p = i;
            }
        }
        if !(diag[p] > tol) {
            rank = j;
            break;
        }
        if p != j {
            for col in 0..n {
                a.swap(at(j, col, lda), at(p, col, lda));
            }
            for row in 0..n {
                a.swap(at(row, j, lda), at(row, p, lda));
            }
            diag.swap(j, p);
            piv.swap(j, p);
        }
        let ljj = diag[j].sqrt();
        a[at(j, j, lda)] = T::from_real(ljj);
        let inv = T::from_real(ljj.recip());
        for i in j + 1..n {
            let mut s = a[at(i, j, lda)];
            for k in 0..j {
                s -= a[at(i, k, lda)] * a[at(j, k, lda)].conj();
            }
            let lij = s * inv;
            a[at(i, j, lda)] = lij;
            diag[i] = diag[i] - lij.modulus_sqr();
        }
    }
    for j in rank..n {
        for i in j..n {
            a[at(i, j, lda)] = T::zero();
        }
    }
    (rank, if rank < n { 1 } else { 0 })
}

/// Householder QR factorization `A = Q * R`.
///
/// On exit the upper triangle holds `R`; below the diagonal, column `j` holds
/// the reflector `v_j` (with implied `v_j[j] = 1`) and `tau[j]` its scale, so that
/// `Q = H_0 * H_1 * ... * H_{k-1}` with `H_j = I - tau[j] * v_j * v_j^H`.
pub fn geqrf<T>(m: usize, n: usize, a: &mut [T], lda: usize, tau: &mut [T])
where
    T: Scalar,
    T::Real: Float,
{
    let zero = <T::Real as num_traits::Zero>::zero();
    for j in 0..m.min(n) {
        let alpha = a[at(j, j, lda)];
        let mut xnorm_sqr = zero;
        for i in j + 1..m {
            xnorm_sqr = xnorm_sqr + a[at(i, j, lda)].modulus_sqr();
        }
        if xnorm_sqr == zero && alpha == T::from_real(alpha.re()) {
            tau[j] = T::zero();
            continue;
        }
        let norm = (alpha.modulus_sqr() + xnorm_sqr).sqrt();
        let beta = if alpha.re() >= zero { -norm } else { norm };
        let beta_t = T::from_real(beta);
        tau[j] = (beta_t - alpha) / beta_t;
        let scal = T::one() / (alpha - beta_t);
        for i in j + 1..m {
            a[at(i, j, lda)] = a[at(i, j, lda)] * scal;
        }
        a[at(j, j, lda)] = beta_t;

        // Apply H_j^H to the trailing columns.
        let tau_h = tau[j].conj();
        for col in j + 1..n {
            let mut w = a[at(j, col, lda)];
            for i in j + 1..m {
                w += a[at(i, j, lda)].conj() * a[at(i, col, lda)];
            }
            let tw = tau_h * w;
            a[at(j, col, lda)] -= tw;
            for i in j + 1..m {
                let v = a[at(i, j, lda)];
                a[at(i, col, lda)] -= v * tw;
            }
        }
    }
}

/// Overwrite the reflectors from [`geqrf`] with the first `n` columns of `Q`
/// (`m x n`, `k` reflectors, `k <= n <= m`).
pub fn orgqr<T: Scalar>(m: usize, n: usize, k: usize, a: &mut [T], lda: usize, tau: &[T]) {
    for j in k..n {
        for l in 0..m {
            a[at(l, j, lda)] = T::zero();
        }
        a[at(j, j, lda)] = T::one();
    }
    for i in (0..k).rev() {
        if i + 1 < n {
            a[at(i, i, lda)] = T::one();
            for col in i + 1..n {
                let mut w = T::zero();
                for l in i..m {
                    w += a[at(l, i, lda)].conj() * a[at(l, col, lda)];
                }
                let tw = tau[i] * w;
                for l in i..m {
                    let v = a[at(l, i, lda)];
                    a[at(l, col, lda)] -= v * tw;
                }
            }
        }
        for l in i + 1..m {
            a[at(l, i, lda)] = -tau[i] * a[at(l, i, lda)];
        }
        a[at(i, i, lda)] = T::one() - tau[i];
        for l in 0..i {
            a[at(l, i, lda)] = T::zero();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use num_complex::Complex64;

    fn col_major(rows: &[&[f64]]) -> Vec<f64> {
        let m = rows.len();
        let n = rows[0].len();
        let mut out = vec![0.0; m * n];
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                out[i + j * m] = v;
            }
        }
        out
    }

    #[test]
    fn test_getrf_getrs() {
        let a0 = col_major(&[&[2.0, 1.0, 1.0], &[4.0, -6.0, 0.0], &[-2.0, 7.0, 2.0]]);
        let mut a = a0.clone();
        let mut ipiv = [0usize; 3];
        assert_eq!(getrf(3, 3, &mut a, 3, &mut ipiv), 0);
        // Row 1 has the largest leading entry.
        assert_eq!(ipiv[0], 1);
        let mut b = vec![5.0, -2.0, 9.0];
        getrs(3, 1, &a, 3, &ipiv, &mut b, 3);
        assert_relative_eq!(b[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(b[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(b[2], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_getrf_singular() {
        let mut a = col_major(&[&[1.0, 2.0], &[2.0, 4.0]]);
        let mut ipiv = [0usize; 2];
        assert_eq!(getrf(2, 2, &mut a, 2, &mut ipiv), 2);
    }

    #[test]
    fn test_potrf_potrs() {
        let a0 = col_major(&[&[4.0, 12.0, -16.0], &[12.0, 37.0, -43.0], &[-16.0, -43.0, 98.0]]);
        let mut a = a0.clone();
        assert_eq!(potrf(3, &mut a, 3), 0);
        // Known factor: [[2,0,0],[6,1,0],[-8,5,3]].
        assert_relative_eq!(a[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(a[1], 6.0, epsilon = 1e-12);
        assert_relative_eq!(a[2], -8.0, epsilon = 1e-12);
        assert_relative_eq!(a[4], 1.0, epsilon = 1e-12);
        assert_relative_eq!(a[5], 5.0, epsilon = 1e-12);
        assert_relative_eq!(a[8], 3.0, epsilon = 1e-12);

        let mut b = vec![4.0, 12.0, -16.0];
        potrs(3, 1, &a, 3, &mut b, 3);
        assert_relative_eq!(b[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(b[1], 0.0, epsilon = 1e-10);
        assert_relative_eq!(b[2], 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_potrf_not_positive_definite() {
        let mut a = col_major(&[&[1.0, 2.0], &[2.0, 1.0]]);
        assert_eq!(potrf(2, &mut a, 2), 2);
        let mut b = col_major(&[&[-1.0, 0.0], &[0.0, 1.0]]);
        assert_eq!(potrf(2, &mut b, 2), 1);
    }

    #[test]
    fn test_potrf_hermitian() {
        // [[2, i], [-i, 2]]
        let mut a = vec![
            Complex64::new(2.0, 0.0),
            Complex64::new(0.0, -1.0),
            Complex64::new(0.0, 1.0),
            Complex64::new(2.0, 0.0),
        ];
        assert_eq!(potrf(2, &mut a, 2), 0);
        let l00 = a[0];
        let l10 = a[1];
        let l11 = a[3];
        // Reconstruct A[1][1] = |l10|^2 + |l11|^2 and A[1][0] = l10 * conj(l00).
        assert_relative_eq!(l10.norm_sqr() + l11.norm_sqr(), 2.0, epsilon = 1e-12);
        let a10 = l10 * l00.conj();
        assert_relative_eq!(a10.re, 0.0, epsilon = 1e-12);
        assert_relative_eq!(a10.im, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pstrf_rank_deficient() {
        // Rank-2 Gram matrix of vectors (1,0,1), (0,1,1), (1,1,2).
        let a0 = col_major(&[&[2.0, 1.0, 3.0], &[1.0, 2.0, 3.0], &[3.0, 3.0, 6.0]]);
        let mut a = a0.clone();
        let mut piv = [0usize; 3];
        let (rank, info) = pstrf(3, &mut a, 3, &mut piv, -1.0);
        assert_eq!(rank, 2);
        assert_eq!(info, 1);
        assert_eq!(piv[0], 2);
        // P^T A P == L L^T
        for i in 0..3 {
            for j in 0..3 {
                let mut s = 0.0;
                for k in 0..=i.min(j) {
                    s += a[i + k * 3] * a[j + k * 3];
                }
                assert_relative_eq!(s, a0[piv[i] + piv[j] * 3], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_geqrf_orgqr() {
        let (m, n) = (4, 3);
        let a0 = col_major(&[
            &[12.0, -51.0, 4.0],
            &[6.0, 167.0, -68.0],
            &[-4.0, 24.0, -41.0],
            &[1.0, 2.0, 3.0],
        ]);
        let mut a = a0.clone();
        let mut tau = vec![0.0; n];
        geqrf(m, n, &mut a, m, &mut tau);
        let mut r = vec![0.0; n * n];
        for j in 0..n {
            for i in 0..=j {
                r[i + j * n] = a[i + j * m];
            }
        }
        let mut q = a.clone();
        orgqr(m, n, n, &mut q, m, &tau);
        // Q R == A
        for i in 0..m {
            for j in 0..n {
                let mut s = 0.0;
                for k in 0..n {
                    s += q[i + k * m] * r[k + j * n];
                }
                assert_relative_eq!(s, a0[i + j * m], epsilon = 1e-9);
            }
        }
        // Q^T Q == I
        for c1 in 0..n {
            for c2 in 0..n {
                let mut s = 0.0;
                for l in 0..m {
                    s += q[l + c1 * m] * q[l + c2 * m];
                }
                assert_relative_eq!(s, if c1 == c2 { 1.0 } else { 0.0 }, epsilon = 1e-12);
            }
        }
    }
}
