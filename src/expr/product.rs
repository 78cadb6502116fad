//! Product nodes: matrix-matrix, matrix-vector, outer, Kronecker and cross.

use linexpr_kernel::{gemm, gemm_portable, gemv, gemv_portable, MatMut, VecMut};
use linexpr_traits::RowMajor;
use num_traits::{One, Zero};

use super::{
    fill_matrix, fill_vector, same_shape, AssignOp, DenseMat, DenseVec, MatExpr, MemSpan,
    Overlap, PreparedMat, PreparedVec, VecExpr,
};
use crate::config::EvalConfig;
use crate::{LinexprError, Result};

// ============================================================================
// Matrix-matrix product
// ============================================================================

/// `lhs * rhs`; the result takes the left operand's storage order.
///
/// Always evaluated through the product kernel when assigned. Element access
/// computes one dot product per call.
#[derive(Debug, Clone, Copy)]
pub struct MatMul<L, R> {
    lhs: L,
    rhs: R,
}

impl<L, R> MatMul<L, R> {
    pub fn new(lhs: L, rhs: R) -> Self {
        Self { lhs, rhs }
    }

    /// Build the product, reporting an inner-dimension mismatch immediately.
    pub fn try_new(lhs: L, rhs: R) -> Result<Self>
    where
        Self: MatExpr,
    {
        let node = Self::new(lhs, rhs);
        node.check()?;
        Ok(node)
    }

    pub fn lhs(&self) -> &L {
        &self.lhs
    }

    pub fn rhs(&self) -> &R {
        &self.rhs
    }
}

impl<L, R> MatMul<L, R>
where
    L: MatExpr,
    R: MatExpr<Elem = L::Elem>,
{
    fn assign_product(
        &self,
        mut dst: MatMut<'_, L::Elem>,
        scale: L::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        if !L::IS_DENSE {
            // Row-wise accumulation over the stored entries of the left operand.
            let b = DenseMat::new(&self.rhs, cfg)?;
            let b = b.view();
            let n = dst.cols();
            if op == AssignOp::Assign {
                dst.fill(L::Elem::zero());
            }
            let factor = if op == AssignOp::Sub { -scale } else { scale };
            for i in 0..dst.rows() {
                self.lhs.for_each_in_row(i, &mut |k, a| {
                    let f = factor * a;
                    for j in 0..n {
                        let v = dst.get(i, j) + f * b.get(k, j);
                        dst.set(i, j, v);
                    }
                });
            }
            return Ok(());
        }

        let a = DenseMat::new(&self.lhs, cfg)?;
        let b = DenseMat::new(&self.rhs, cfg)?;
        let (alpha, beta) = op.gemm_factors(scale);
        log::trace!(
            "matrix product {}x{}x{} ({:?}, blas={})",
            self.lhs.rows(),
            self.lhs.cols(),
            self.rhs.cols(),
            op,
            cfg.use_blas
        );
        let par = cfg.kernel_parallelism();
        if cfg.use_blas {
            gemm(dst, beta, a.view(), b.view(), alpha, par)?;
        } else {
            gemm_portable(dst, beta, a.view(), b.view(), alpha, par)?;
        }
        Ok(())
    }
}

impl<L, R> MatExpr for MatMul<L, R>
where
    L: MatExpr,
    R: MatExpr<Elem = L::Elem>,
{
    type Elem = L::Elem;
    type Order = L::Order;

    const ELEMENTWISE: bool = false;
    const CAN_ALIAS: bool = L::CAN_ALIAS || R::CAN_ALIAS;
    const REQUIRES_EVALUATION: bool = true;

    #[inline]
    fn rows(&self) -> usize {
        self.lhs.rows()
    }

    #[inline]
    fn cols(&self) -> usize {
        self.rhs.cols()
    }

    fn get(&self, i: usize, j: usize) -> L::Elem {
        let mut acc = L::Elem::zero();
        for k in 0..self.lhs.cols() {
            acc += self.lhs.get(i, k) * self.rhs.get(k, j);
        }
        acc
    }

    fn check(&self) -> Result<()> {
        self.lhs.check()?;
        self.rhs.check()?;
        if self.lhs.cols() == self.rhs.rows() {
            Ok(())
        } else {
            Err(LinexprError::ShapeMismatch {
                op: "matrix product",
                lhs: (self.lhs.rows(), self.lhs.cols()),
                rhs: (self.rhs.rows(), self.rhs.cols()),
            })
        }
    }

    fn overlap(&self, target: &MemSpan) -> Overlap {
        self.lhs.overlap(target).merge(self.rhs.overlap(target))
    }

    fn assign_to(&self, dst: MatMut<'_, L::Elem>, op: AssignOp, cfg: &EvalConfig) -> Result<()> {
        self.assign_product(dst, L::Elem::one(), op, cfg)
    }

    fn assign_scaled_to(
        &self,
        dst: MatMut<'_, L::Elem>,
        scale: L::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        self.assign_product(dst, scale, op, cfg)
    }
}

// ============================================================================
// Matrix-vector product
// ============================================================================

/// `mat * vec`: element `i` is the dot product of row `i` with `vec`.
#[derive(Debug, Clone, Copy)]
pub struct MatVec<M, V> {
    mat: M,
    vec: V,
}

impl<M, V> MatVec<M, V> {
    pub fn new(mat: M, vec: V) -> Self {
        Self { mat, vec }
    }

    pub fn try_new(mat: M, vec: V) -> Result<Self>
    where
        Self: VecExpr,
    {
        let node = Self::new(mat, vec);
        node.check()?;
        Ok(node)
    }
}

impl<M, V> MatVec<M, V>
where
    M: MatExpr,
    V: VecExpr<Elem = M::Elem>,
{
    fn assign_product(
        &self,
        dst: VecMut<'_, M::Elem>,
        scale: M::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        let x = DenseVec::new(&self.vec, cfg)?;
        let x = x.view();
        if !M::IS_DENSE {
            fill_vector(dst, op, cfg, &|i| {
                let mut acc = M::Elem::zero();
                self.mat.for_each_in_row(i, &mut |j, a| acc += a * x.get(j));
                scale * acc
            });
            return Ok(());
        }

        let a = DenseMat::new(&self.mat, cfg)?;
        let (alpha, beta) = op.gemm_factors(scale);
        log::trace!(
            "matrix-vector product {}x{} ({:?})",
            self.mat.rows(),
            self.mat.cols(),
            op
        );
        let par = cfg.kernel_parallelism();
        if cfg.use_blas {
            gemv(dst, beta, a.view(), x, alpha, par)?;
        } else {
            gemv_portable(dst, beta, a.view(), x, alpha, par)?;
        }
        Ok(())
    }
}

impl<M, V> VecExpr for MatVec<M, V>
where
    M: MatExpr,
    V: VecExpr<Elem = M::Elem>,
{
    type Elem = M::Elem;

    const ELEMENTWISE: bool = false;
    const CAN_ALIAS: bool = M::CAN_ALIAS || V::CAN_ALIAS;
    const REQUIRES_EVALUATION: bool = true;

    #[inline]
    fn size(&self) -> usize {
        self.mat.rows()
    }

    fn get(&self, i: usize) -> M::Elem {
        let mut acc = M::Elem::zero();
        for j in 0..self.mat.cols() {
            acc += self.mat.get(i, j) * self.vec.get(j);
        }
        acc
    }

    fn check(&self) -> Result<()> {
        self.mat.check()?;
        self.vec.check()?;
        if self.mat.cols() == self.vec.size() {
            Ok(())
        } else {
            Err(LinexprError::ShapeMismatch {
                op: "matrix-vector product",
                lhs: (self.mat.rows(), self.mat.cols()),
                rhs: (self.vec.size(), 1),
            })
        }
    }

    fn overlap(&self, target: &MemSpan) -> Overlap {
        self.mat.overlap(target).merge(self.vec.overlap(target))
    }

    fn assign_to(&self, dst: VecMut<'_, M::Elem>, op: AssignOp, cfg: &EvalConfig) -> Result<()> {
        self.assign_product(dst, M::Elem::one(), op, cfg)
    }

    fn assign_scaled_to(
        &self,
        dst: VecMut<'_, M::Elem>,
        scale: M::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        self.assign_product(dst, scale, op, cfg)
    }
}

// ============================================================================
// Outer and Kronecker products
// ============================================================================

/// Outer product `lhs * rhs^T` of two column vectors.
#[derive(Debug, Clone, Copy)]
pub struct Outer<L, R> {
    lhs: L,
    rhs: R,
}

/// Lazy outer product `lhs * rhs^T`.
pub fn outer<L, R>(lhs: L, rhs: R) -> Outer<L, R>
where
    L: VecExpr,
    R: VecExpr<Elem = L::Elem>,
{
    Outer { lhs, rhs }
}

impl<L, R> MatExpr for Outer<L, R>
where
    L: VecExpr,
    R: VecExpr<Elem = L::Elem>,
{
    type Elem = L::Elem;
    type Order = RowMajor;

    const IS_DENSE: bool = L::IS_DENSE && R::IS_DENSE;
    const ELEMENTWISE: bool = false;
    const CAN_ALIAS: bool = L::CAN_ALIAS || R::CAN_ALIAS;

    #[inline]
    fn rows(&self) -> usize {
        self.lhs.size()
    }

    #[inline]
    fn cols(&self) -> usize {
        self.rhs.size()
    }

    #[inline(always)]
    fn get(&self, i: usize, j: usize) -> L::Elem {
        self.lhs.get(i) * self.rhs.get(j)
    }

    fn check(&self) -> Result<()> {
        self.lhs.check()?;
        self.rhs.check()
    }

    fn overlap(&self, target: &MemSpan) -> Overlap {
        self.lhs.overlap(target).merge(self.rhs.overlap(target))
    }

    fn assign_to(&self, dst: MatMut<'_, L::Elem>, op: AssignOp, cfg: &EvalConfig) -> Result<()> {
        let l = PreparedVec::new(&self.lhs, cfg)?;
        let r = PreparedVec::new(&self.rhs, cfg)?;
        fill_matrix(dst, op, cfg, &|i, j| l.get(i) * r.get(j));
        Ok(())
    }

    fn assign_scaled_to(
        &self,
        dst: MatMut<'_, L::Elem>,
        scale: L::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        let l = PreparedVec::new(&self.lhs, cfg)?;
        let r = PreparedVec::new(&self.rhs, cfg)?;
        fill_matrix(dst, op, cfg, &|i, j| scale * l.get(i) * r.get(j));
        Ok(())
    }
}

/// Kronecker product: block `(p, q)` of the result is `lhs(p, q) * rhs`.
#[derive(Debug, Clone, Copy)]
pub struct Kron<L, R> {
    lhs: L,
    rhs: R,
}

/// Lazy Kronecker product.
pub fn kron<L, R>(lhs: L, rhs: R) -> Kron<L, R>
where
    L: MatExpr,
    R: MatExpr<Elem = L::Elem>,
{
    Kron { lhs, rhs }
}

impl<L, R> MatExpr for Kron<L, R>
where
    L: MatExpr,
    R: MatExpr<Elem = L::Elem>,
{
    type Elem = L::Elem;
    type Order = L::Order;

    const IS_DENSE: bool = L::IS_DENSE && R::IS_DENSE;
    const ELEMENTWISE: bool = false;
    const CAN_ALIAS: bool = L::CAN_ALIAS || R::CAN_ALIAS;

    #[inline]
    fn rows(&self) -> usize {
        self.lhs.rows() * self.rhs.rows()
    }

    #[inline]
    fn cols(&self) -> usize {
        self.lhs.cols() * self.rhs.cols()
    }

    #[inline]
    fn get(&self, i: usize, j: usize) -> L::Elem {
        let (br, bc) = (self.rhs.rows(), self.rhs.cols());
        self.lhs.get(i / br, j / bc) * self.rhs.get(i % br, j % bc)
    }

    fn check(&self) -> Result<()> {
        self.lhs.check()?;
        self.rhs.check()
    }

    fn overlap(&self, target: &MemSpan) -> Overlap {
        self.lhs.overlap(target).merge(self.rhs.overlap(target))
    }

    fn assign_to(&self, dst: MatMut<'_, L::Elem>, op: AssignOp, cfg: &EvalConfig) -> Result<()> {
        self.assign_scaled_to(dst, L::Elem::one(), op, cfg)
    }

    fn assign_scaled_to(
        &self,
        dst: MatMut<'_, L::Elem>,
        scale: L::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        let l = PreparedMat::new(&self.lhs, cfg)?;
        let r = PreparedMat::new(&self.rhs, cfg)?;
        let (br, bc) = (self.rhs.rows(), self.rhs.cols());
        fill_matrix(dst, op, cfg, &|i, j| {
            scale * l.get(i / br, j / bc) * r.get(i % br, j % bc)
        });
        Ok(())
    }
}

// ============================================================================
// Cross product
// ============================================================================

/// Cross product of two 3-vectors.
#[derive(Debug, Clone, Copy)]
pub struct Cross<L, R> {
    lhs: L,
    rhs: R,
}

/// Lazy cross product; both operands must have three elements.
pub fn cross<L, R>(lhs: L, rhs: R) -> Cross<L, R>
where
    L: VecExpr,
    R: VecExpr<Elem = L::Elem>,
{
    Cross { lhs, rhs }
}

#[inline(always)]
fn cross_component<T: crate::Scalar>(i: usize, a: impl Fn(usize) -> T, b: impl Fn(usize) -> T) -> T {
    let (p, q) = ((i + 1) % 3, (i + 2) % 3);
    a(p) * b(q) - a(q) * b(p)
}

impl<L, R> VecExpr for Cross<L, R>
where
    L: VecExpr,
    R: VecExpr<Elem = L::Elem>,
{
    type Elem = L::Elem;

    const ELEMENTWISE: bool = false;
    const CAN_ALIAS: bool = L::CAN_ALIAS || R::CAN_ALIAS;

    #[inline]
    fn size(&self) -> usize {
        3
    }

    #[inline]
    fn get(&self, i: usize) -> L::Elem {
        cross_component(i, |k| self.lhs.get(k), |k| self.rhs.get(k))
    }

    fn check(&self) -> Result<()> {
        self.lhs.check()?;
        self.rhs.check()?;
        same_shape("cross product", (self.lhs.size(), 1), (3, 1))?;
        same_shape("cross product", (3, 1), (self.rhs.size(), 1))
    }

    fn overlap(&self, target: &MemSpan) -> Overlap {
        self.lhs.overlap(target).merge(self.rhs.overlap(target))
    }

    fn assign_to(&self, dst: VecMut<'_, L::Elem>, op: AssignOp, cfg: &EvalConfig) -> Result<()> {
        self.assign_scaled_to(dst, L::Elem::one(), op, cfg)
    }

    fn assign_scaled_to(
        &self,
        dst: VecMut<'_, L::Elem>,
        scale: L::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        let l = PreparedVec::new(&self.lhs, cfg)?;
        let r = PreparedVec::new(&self.rhs, cfg)?;
        fill_vector(dst, op, cfg, &|i| {
            scale * cross_component(i, |k| l.get(k), |k| r.get(k))
        });
        Ok(())
    }
}
