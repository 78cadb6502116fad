//! Expression traits and node types.
//!
//! Every operand of an arithmetic expression implements [`VecExpr`] or
//! [`MatExpr`]. Nodes are plain structs generic over their operands, so the
//! whole expression tree is one concrete type and its properties are
//! associated constants:
//!
//! | Constant              | Meaning                                                    |
//! |-----------------------|------------------------------------------------------------|
//! | `IS_DENSE`            | every element may be nonzero                               |
//! | `ELEMENTWISE`         | element `(i, j)` reads only element `(i, j)` of each leaf  |
//! | `CAN_ALIAS`           | some leaf may refer to the assignment target               |
//! | `REQUIRES_EVALUATION` | a subtree is cheaper to compute into a buffer than lazily  |
//!
//! The assignment engine combines these with a run-time overlap check to pick
//! between direct writing and evaluation through a temporary.

mod elementwise;
mod product;
mod reduce;
mod structural;

pub use elementwise::{MatMap, MatScale, MatUnary, MatZip, VecMap, VecScale, VecUnary, VecZip};
pub use product::{cross, kron, outer, Cross, Kron, MatMul, MatVec, Outer};
pub use structural::{ColReduce, RowReduce, Trans};

use linexpr_kernel::threading::{par_chunks, par_rows};
use linexpr_kernel::{simd, MatMut, MatRef, MaybeSync, VecMut, VecRef};
use linexpr_traits::{
    Conjugate, Maximum, Minimum, Modulus, Product, ReduceOp, SquareRoot, StorageOrder, Sum,
    UnaryOp,
};
use num_traits::Float;

use crate::config::EvalConfig;
use crate::storage::{DynamicMatrix, DynamicVector};
use crate::{LinexprError, Result, Scalar};

// ============================================================================
// Assignment operators and memory overlap
// ============================================================================

/// How an evaluated value is combined with the target element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `dst = value`
    Assign,
    /// `dst += value`
    Add,
    /// `dst -= value`
    Sub,
}

impl AssignOp {
    #[inline(always)]
    pub fn apply<T: Scalar>(self, dst: T, value: T) -> T {
        match self {
            AssignOp::Assign => value,
            AssignOp::Add => dst + value,
            AssignOp::Sub => dst - value,
        }
    }

    /// Operator for the right operand once the left one of `l + r` is written.
    pub(crate) fn then_add(self) -> Self {
        match self {
            AssignOp::Assign | AssignOp::Add => AssignOp::Add,
            AssignOp::Sub => AssignOp::Sub,
        }
    }

    /// Operator for the right operand once the left one of `l - r` is written.
    pub(crate) fn then_sub(self) -> Self {
        match self {
            AssignOp::Assign | AssignOp::Add => AssignOp::Sub,
            AssignOp::Sub => AssignOp::Add,
        }
    }

    /// `(alpha, beta)` for a `C = alpha * A * B + beta * C` kernel.
    pub(crate) fn gemm_factors<T: Scalar>(self, scale: T) -> (T, T) {
        match self {
            AssignOp::Assign => (scale, T::zero()),
            AssignOp::Add => (scale, T::one()),
            AssignOp::Sub => (-scale, T::one()),
        }
    }
}

/// Relation between an operand's memory and the assignment target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Overlap {
    /// Disjoint byte ranges.
    None,
    /// Same base, extents and strides: element `(i, j)` is the same address.
    Exact,
    /// Any other intersection.
    Partial,
}

impl Overlap {
    /// Worst of two findings.
    #[inline]
    pub fn merge(self, other: Overlap) -> Overlap {
        self.max(other)
    }
}

/// Memory footprint of a strided matrix or vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemSpan {
    lo: usize,
    hi: usize,
    base: usize,
    extents: (usize, usize),
    strides: (isize, isize),
}

impl MemSpan {
    /// Footprint of a matrix reference; `None` if it has no elements.
    pub fn of_matrix<T>(m: &MatRef<'_, T>) -> Option<Self> {
        let (lo, hi) = m.byte_span()?;
        Some(Self {
            lo,
            hi,
            base: m.as_ptr() as usize,
            extents: (m.rows(), m.cols()),
            strides: (m.row_stride(), m.col_stride()),
        })
    }

    /// Footprint of a vector reference, seen as a single column.
    pub fn of_vector<T>(v: &VecRef<'_, T>) -> Option<Self> {
        let (lo, hi) = v.byte_span()?;
        Some(Self {
            lo,
            hi,
            base: v.as_ptr() as usize,
            extents: (v.len(), 1),
            strides: (v.stride(), 0),
        })
    }

    /// Classify how `self` (an operand) overlaps `target`.
    pub fn classify(&self, target: &MemSpan) -> Overlap {
        if self.hi <= target.lo || target.hi <= self.lo {
            Overlap::None
        } else if self.base == target.base
            && self.extents == target.extents
            && self.strides == target.strides
        {
            Overlap::Exact
        } else {
            Overlap::Partial
        }
    }
}

// ============================================================================
// Expression traits
// ============================================================================

/// A vector-valued expression.
///
/// Only [`size`](VecExpr::size) and [`get`](VecExpr::get) are required; the
/// remaining methods have elementwise defaults that nodes override when they
/// know better (buffer-backed leaves copy, products call the kernels).
pub trait VecExpr: MaybeSync {
    type Elem: Scalar;

    const IS_DENSE: bool = true;
    const ELEMENTWISE: bool = true;
    const CAN_ALIAS: bool = false;
    const REQUIRES_EVALUATION: bool = false;

    /// Number of elements.
    fn size(&self) -> usize;

    /// Element `i`, computed lazily. `i` must be below `size()`.
    fn get(&self, i: usize) -> Self::Elem;

    /// Validate the extents of every node in the tree.
    fn check(&self) -> Result<()> {
        Ok(())
    }

    /// Overlap of aliasable leaves with `target`.
    fn overlap(&self, _target: &MemSpan) -> Overlap {
        Overlap::None
    }

    /// Strided buffer holding the values, for leaves backed by memory.
    fn as_vec_ref(&self) -> Option<VecRef<'_, Self::Elem>> {
        None
    }

    /// Call `f(i, value)` for every element that may be nonzero.
    fn for_each_nonzero(&self, f: &mut dyn FnMut(usize, Self::Elem)) {
        for i in 0..self.size() {
            f(i, self.get(i));
        }
    }

    /// Combine the value of this expression into `dst` (same length).
    fn assign_to(&self, dst: VecMut<'_, Self::Elem>, op: AssignOp, cfg: &EvalConfig) -> Result<()> {
        match self.as_vec_ref() {
            Some(src) if !Self::CAN_ALIAS => copy_vector(src, dst, None, op),
            _ => fill_vector(dst, op, cfg, &|i| self.get(i)),
        }
        Ok(())
    }

    /// [`assign_to`](VecExpr::assign_to) of `scale * self`.
    fn assign_scaled_to(
        &self,
        dst: VecMut<'_, Self::Elem>,
        scale: Self::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        match self.as_vec_ref() {
            Some(src) if !Self::CAN_ALIAS => copy_vector(src, dst, Some(scale), op),
            _ => fill_vector(dst, op, cfg, &|i| scale * self.get(i)),
        }
        Ok(())
    }

    /// Materialize into an owned vector.
    fn eval(&self) -> Result<DynamicVector<Self::Elem>> {
        self.eval_with(&EvalConfig::default())
    }

    /// [`eval`](VecExpr::eval) with an explicit configuration.
    fn eval_with(&self, cfg: &EvalConfig) -> Result<DynamicVector<Self::Elem>> {
        self.check()?;
        let mut out = DynamicVector::zeros(self.size());
        self.assign_to(out.raw_mut(), AssignOp::Assign, cfg)?;
        Ok(out)
    }

    // ------------------------------------------------------------------------
    // Reductions
    // ------------------------------------------------------------------------

    fn sum(&self) -> Result<Self::Elem>
    where
        Self: Sized,
    {
        reduce::reduce_vec::<Self, Sum>(self)
    }

    fn prod(&self) -> Result<Self::Elem>
    where
        Self: Sized,
    {
        reduce::reduce_vec::<Self, Product>(self)
    }

    /// Smallest element; zero for an empty vector.
    fn min(&self) -> Result<Self::Elem>
    where
        Self: Sized,
        Self::Elem: PartialOrd,
    {
        reduce::reduce_vec::<Self, Minimum>(self)
    }

    /// Largest element; zero for an empty vector.
    fn max(&self) -> Result<Self::Elem>
    where
        Self: Sized,
        Self::Elem: PartialOrd,
    {
        reduce::reduce_vec::<Self, Maximum>(self)
    }

    /// Unconjugated inner product `sum(a[i] * b[i])`.
    fn dot<R>(&self, other: &R) -> Result<Self::Elem>
    where
        Self: Sized,
        R: VecExpr<Elem = Self::Elem>,
    {
        reduce::dot(self, other)
    }

    /// Squared Euclidean norm.
    fn sqr_norm(&self) -> Result<<Self::Elem as Scalar>::Real>
    where
        Self: Sized,
    {
        reduce::fold_vec_real(self, |acc, x| acc + x.modulus_sqr())
    }

    /// Euclidean norm.
    fn norm(&self) -> Result<<Self::Elem as Scalar>::Real>
    where
        Self: Sized,
        <Self::Elem as Scalar>::Real: Float,
    {
        Ok(self.sqr_norm()?.sqrt())
    }

    /// Sum of moduli.
    fn norm_l1(&self) -> Result<<Self::Elem as Scalar>::Real>
    where
        Self: Sized,
    {
        reduce::fold_vec_real(self, |acc, x| acc + x.modulus())
    }

    /// Largest modulus.
    fn norm_inf(&self) -> Result<<Self::Elem as Scalar>::Real>
    where
        Self: Sized,
    {
        reduce::fold_vec_real(self, reduce::max_modulus)
    }

    // ------------------------------------------------------------------------
    // Node builders
    // ------------------------------------------------------------------------

    /// Lazy `f(x)` for every element.
    fn map<F>(self, f: F) -> VecMap<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Elem) -> Self::Elem + MaybeSync,
    {
        VecMap::new(self, f)
    }

    /// Lazy elementwise modulus.
    fn abs(self) -> VecUnary<Self, Modulus>
    where
        Self: Sized,
    {
        VecUnary::new(self)
    }

    /// Lazy elementwise complex conjugate.
    fn conj(self) -> VecUnary<Self, Conjugate>
    where
        Self: Sized,
    {
        VecUnary::new(self)
    }

    /// Lazy elementwise square root.
    fn sqrt(self) -> VecUnary<Self, SquareRoot>
    where
        Self: Sized,
        SquareRoot: UnaryOp<Self::Elem>,
    {
        VecUnary::new(self)
    }
}

/// A matrix-valued expression.
pub trait MatExpr: MaybeSync {
    type Elem: Scalar;
    /// Storage order an evaluated result of this expression takes.
    type Order: StorageOrder;

    const IS_DENSE: bool = true;
    const ELEMENTWISE: bool = true;
    const CAN_ALIAS: bool = false;
    const REQUIRES_EVALUATION: bool = false;

    fn rows(&self) -> usize;

    fn cols(&self) -> usize;

    /// Element `(i, j)`, computed lazily.
    fn get(&self, i: usize, j: usize) -> Self::Elem;

    /// Validate the extents of every node in the tree.
    fn check(&self) -> Result<()> {
        Ok(())
    }

    /// Overlap of aliasable leaves with `target`.
    fn overlap(&self, _target: &MemSpan) -> Overlap {
        Overlap::None
    }

    /// Strided buffer holding the values, for leaves backed by memory.
    fn as_mat_ref(&self) -> Option<MatRef<'_, Self::Elem>> {
        None
    }

    /// Call `f(j, value)` for every element of row `i` that may be nonzero.
    fn for_each_in_row(&self, i: usize, f: &mut dyn FnMut(usize, Self::Elem)) {
        for j in 0..self.cols() {
            f(j, self.get(i, j));
        }
    }

    /// Combine the value of this expression into `dst` (same extents).
    fn assign_to(&self, dst: MatMut<'_, Self::Elem>, op: AssignOp, cfg: &EvalConfig) -> Result<()> {
        match self.as_mat_ref() {
            Some(src) if !Self::CAN_ALIAS => copy_matrix(src, dst, None, op, cfg),
            _ => fill_matrix(dst, op, cfg, &|i, j| self.get(i, j)),
        }
        Ok(())
    }

    /// [`assign_to`](MatExpr::assign_to) of `scale * self`.
    fn assign_scaled_to(
        &self,
        dst: MatMut<'_, Self::Elem>,
        scale: Self::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        match self.as_mat_ref() {
            Some(src) if !Self::CAN_ALIAS => copy_matrix(src, dst, Some(scale), op, cfg),
            _ => fill_matrix(dst, op, cfg, &|i, j| scale * self.get(i, j)),
        }
        Ok(())
    }

    /// Materialize into an owned matrix of the expression's storage order.
    fn eval(&self) -> Result<DynamicMatrix<Self::Elem, Self::Order>> {
        self.eval_with(&EvalConfig::default())
    }

    /// [`eval`](MatExpr::eval) with an explicit configuration.
    fn eval_with(&self, cfg: &EvalConfig) -> Result<DynamicMatrix<Self::Elem, Self::Order>> {
        self.check()?;
        let mut out = DynamicMatrix::zeros(self.rows(), self.cols());
        self.assign_to(out.raw_mut(), AssignOp::Assign, cfg)?;
        Ok(out)
    }

    // ------------------------------------------------------------------------
    // Reductions
    // ------------------------------------------------------------------------

    fn sum(&self) -> Result<Self::Elem>
    where
        Self: Sized,
    {
        reduce::reduce_mat::<Self, Sum>(self)
    }

    fn prod(&self) -> Result<Self::Elem>
    where
        Self: Sized,
    {
        reduce::reduce_mat::<Self, Product>(self)
    }

    fn min(&self) -> Result<Self::Elem>
    where
        Self: Sized,
        Self::Elem: PartialOrd,
    {
        reduce::reduce_mat::<Self, Minimum>(self)
    }

    fn max(&self) -> Result<Self::Elem>
    where
        Self: Sized,
        Self::Elem: PartialOrd,
    {
        reduce::reduce_mat::<Self, Maximum>(self)
    }

    /// Sum of the main diagonal.
    fn trace(&self) -> Result<Self::Elem>
    where
        Self: Sized,
    {
        reduce::trace(self)
    }

    /// Squared Frobenius norm.
    fn sqr_norm(&self) -> Result<<Self::Elem as Scalar>::Real>
    where
        Self: Sized,
    {
        reduce::fold_mat_real(self, |acc, x| acc + x.modulus_sqr())
    }

    /// Frobenius norm.
    fn norm(&self) -> Result<<Self::Elem as Scalar>::Real>
    where
        Self: Sized,
        <Self::Elem as Scalar>::Real: Float,
    {
        Ok(self.sqr_norm()?.sqrt())
    }

    /// Sum of element moduli.
    fn norm_l1(&self) -> Result<<Self::Elem as Scalar>::Real>
    where
        Self: Sized,
    {
        reduce::fold_mat_real(self, |acc, x| acc + x.modulus())
    }

    /// Largest element modulus.
    fn norm_inf(&self) -> Result<<Self::Elem as Scalar>::Real>
    where
        Self: Sized,
    {
        reduce::fold_mat_real(self, reduce::max_modulus)
    }

    // ------------------------------------------------------------------------
    // Node builders
    // ------------------------------------------------------------------------

    fn map<F>(self, f: F) -> MatMap<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Elem) -> Self::Elem + MaybeSync,
    {
        MatMap::new(self, f)
    }

    fn abs(self) -> MatUnary<Self, Modulus>
    where
        Self: Sized,
    {
        MatUnary::new(self)
    }

    fn conj(self) -> MatUnary<Self, Conjugate>
    where
        Self: Sized,
    {
        MatUnary::new(self)
    }

    fn sqrt(self) -> MatUnary<Self, SquareRoot>
    where
        Self: Sized,
        SquareRoot: UnaryOp<Self::Elem>,
    {
        MatUnary::new(self)
    }

    /// Lazy transpose.
    fn trans(self) -> Trans<Self>
    where
        Self: Sized,
    {
        Trans::new(self)
    }

    /// Lazy per-row fold: a vector with one entry per row.
    fn reduce_rows<Op>(self) -> RowReduce<Self, Op>
    where
        Self: Sized,
        Op: ReduceOp<Self::Elem>,
    {
        RowReduce::new(self)
    }

    /// Lazy per-column fold: a vector with one entry per column.
    fn reduce_cols<Op>(self) -> ColReduce<Self, Op>
    where
        Self: Sized,
        Op: ReduceOp<Self::Elem>,
    {
        ColReduce::new(self)
    }

    fn row_sums(self) -> RowReduce<Self, Sum>
    where
        Self: Sized,
    {
        RowReduce::new(self)
    }

    fn col_sums(self) -> ColReduce<Self, Sum>
    where
        Self: Sized,
    {
        ColReduce::new(self)
    }
}

// Shared borrows of an expression are expressions with the same properties.

impl<E: VecExpr> VecExpr for &E {
    type Elem = E::Elem;

    const IS_DENSE: bool = E::IS_DENSE;
    const ELEMENTWISE: bool = E::ELEMENTWISE;
    const CAN_ALIAS: bool = E::CAN_ALIAS;
    const REQUIRES_EVALUATION: bool = E::REQUIRES_EVALUATION;

    #[inline]
    fn size(&self) -> usize {
        (**self).size()
    }

    #[inline(always)]
    fn get(&self, i: usize) -> E::Elem {
        (**self).get(i)
    }

    fn check(&self) -> Result<()> {
        (**self).check()
    }

    fn overlap(&self, target: &MemSpan) -> Overlap {
        (**self).overlap(target)
    }

    fn as_vec_ref(&self) -> Option<VecRef<'_, E::Elem>> {
        (**self).as_vec_ref()
    }

    fn for_each_nonzero(&self, f: &mut dyn FnMut(usize, E::Elem)) {
        (**self).for_each_nonzero(f)
    }

    fn assign_to(&self, dst: VecMut<'_, E::Elem>, op: AssignOp, cfg: &EvalConfig) -> Result<()> {
        (**self).assign_to(dst, op, cfg)
    }

    fn assign_scaled_to(
        &self,
        dst: VecMut<'_, E::Elem>,
        scale: E::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        (**self).assign_scaled_to(dst, scale, op, cfg)
    }
}

impl<E: MatExpr> MatExpr for &E {
    type Elem = E::Elem;
    type Order = E::Order;

    const IS_DENSE: bool = E::IS_DENSE;
    const ELEMENTWISE: bool = E::ELEMENTWISE;
    const CAN_ALIAS: bool = E::CAN_ALIAS;
    const REQUIRES_EVALUATION: bool = E::REQUIRES_EVALUATION;

    #[inline]
    fn rows(&self) -> usize {
        (**self).rows()
    }

    #[inline]
    fn cols(&self) -> usize {
        (**self).cols()
    }

    #[inline(always)]
    fn get(&self, i: usize, j: usize) -> E::Elem {
        (**self).get(i, j)
    }

    fn check(&self) -> Result<()> {
        (**self).check()
    }

    fn overlap(&self, target: &MemSpan) -> Overlap {
        (**self).overlap(target)
    }

    fn as_mat_ref(&self) -> Option<MatRef<'_, E::Elem>> {
        (**self).as_mat_ref()
    }

    fn for_each_in_row(&self, i: usize, f: &mut dyn FnMut(usize, E::Elem)) {
        (**self).for_each_in_row(i, f)
    }

    fn assign_to(&self, dst: MatMut<'_, E::Elem>, op: AssignOp, cfg: &EvalConfig) -> Result<()> {
        (**self).assign_to(dst, op, cfg)
    }

    fn assign_scaled_to(
        &self,
        dst: MatMut<'_, E::Elem>,
        scale: E::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        (**self).assign_scaled_to(dst, scale, op, cfg)
    }
}

// ============================================================================
// Shape checks
// ============================================================================

pub(crate) fn same_shape(
    op: &'static str,
    lhs: (usize, usize),
    rhs: (usize, usize),
) -> Result<()> {
    if lhs == rhs {
        Ok(())
    } else {
        Err(LinexprError::ShapeMismatch { op, lhs, rhs })
    }
}

// ============================================================================
// Operand preparation
// ============================================================================

/// A matrix operand read elementwise: the expression itself, or its value
/// when the subtree is cheaper to compute up front.
pub(crate) enum PreparedMat<'a, E: MatExpr> {
    Lazy(&'a E),
    Eager(DynamicMatrix<E::Elem, E::Order>),
}

impl<'a, E: MatExpr> PreparedMat<'a, E> {
    pub(crate) fn new(expr: &'a E, cfg: &EvalConfig) -> Result<Self> {
        if E::REQUIRES_EVALUATION {
            Ok(PreparedMat::Eager(expr.eval_with(cfg)?))
        } else {
            Ok(PreparedMat::Lazy(expr))
        }
    }

    #[inline(always)]
    pub(crate) fn get(&self, i: usize, j: usize) -> E::Elem {
        match self {
            PreparedMat::Lazy(e) => e.get(i, j),
            PreparedMat::Eager(m) => MatExpr::get(m, i, j),
        }
    }
}

/// Vector counterpart of [`PreparedMat`].
pub(crate) enum PreparedVec<'a, E: VecExpr> {
    Lazy(&'a E),
    Eager(DynamicVector<E::Elem>),
}

impl<'a, E: VecExpr> PreparedVec<'a, E> {
    pub(crate) fn new(expr: &'a E, cfg: &EvalConfig) -> Result<Self> {
        if E::REQUIRES_EVALUATION {
            Ok(PreparedVec::Eager(expr.eval_with(cfg)?))
        } else {
            Ok(PreparedVec::Lazy(expr))
        }
    }

    #[inline(always)]
    pub(crate) fn get(&self, i: usize) -> E::Elem {
        match self {
            PreparedVec::Lazy(e) => e.get(i),
            PreparedVec::Eager(v) => VecExpr::get(v, i),
        }
    }

    /// Contiguous values, when available without copying.
    pub(crate) fn as_slice(&self) -> Option<&[E::Elem]> {
        match self {
            PreparedVec::Lazy(e) if !E::CAN_ALIAS => e.as_vec_ref().and_then(|r| r.as_slice()),
            PreparedVec::Lazy(_) => None,
            PreparedVec::Eager(v) => Some(v.as_slice()),
        }
    }
}

/// A matrix operand handed to a kernel: borrowed when it already lives in a
/// strided buffer, evaluated into a temporary otherwise.
pub(crate) enum DenseMat<'a, T: Scalar, SO: StorageOrder> {
    Borrowed(MatRef<'a, T>),
    Owned(DynamicMatrix<T, SO>),
}

impl<'a, T: Scalar, SO: StorageOrder> DenseMat<'a, T, SO> {
    pub(crate) fn new<E>(expr: &'a E, cfg: &EvalConfig) -> Result<Self>
    where
        E: MatExpr<Elem = T, Order = SO>,
    {
        if E::IS_DENSE {
            if let Some(r) = expr.as_mat_ref() {
                return Ok(DenseMat::Borrowed(r));
            }
        }
        Ok(DenseMat::Owned(expr.eval_with(cfg)?))
    }

    pub(crate) fn view(&self) -> MatRef<'_, T> {
        match self {
            DenseMat::Borrowed(r) => *r,
            DenseMat::Owned(m) => m.raw(),
        }
    }
}

/// Vector counterpart of [`DenseMat`].
pub(crate) enum DenseVec<'a, T: Scalar> {
    Borrowed(VecRef<'a, T>),
    Owned(DynamicVector<T>),
}

impl<'a, T: Scalar> DenseVec<'a, T> {
    pub(crate) fn new<E>(expr: &'a E, cfg: &EvalConfig) -> Result<Self>
    where
        E: VecExpr<Elem = T>,
    {
        if E::IS_DENSE {
            if let Some(r) = expr.as_vec_ref() {
                return Ok(DenseVec::Borrowed(r));
            }
        }
        Ok(DenseVec::Owned(expr.eval_with(cfg)?))
    }

    pub(crate) fn view(&self) -> VecRef<'_, T> {
        match self {
            DenseVec::Borrowed(r) => *r,
            DenseVec::Owned(v) => v.raw(),
        }
    }
}

// ============================================================================
// Elementwise writers
// ============================================================================

/// `dst(i, j) = op(dst(i, j), f(i, j))` over every element.
///
/// The inner loop runs along the contiguous direction of `dst`; large targets
/// are split into row (or column) blocks when `cfg` allows it.
pub(crate) fn fill_matrix<T, F>(dst: MatMut<'_, T>, op: AssignOp, cfg: &EvalConfig, f: &F)
where
    T: Scalar,
    F: Fn(usize, usize) -> T + MaybeSync,
{
    let (rows, cols) = (dst.rows(), dst.cols());
    if rows == 0 || cols == 0 {
        return;
    }
    let transposed = dst.row_stride().unsigned_abs() < dst.col_stride().unsigned_abs();
    let (dst, inner) = if transposed {
        (dst.transpose(), rows)
    } else {
        (dst, cols)
    };
    if cfg.splits(rows * cols) {
        par_rows(dst, inner, cfg.parallel_threshold, &|offset, block: MatMut<'_, T>| {
            fill_block(block, offset, transposed, op, f)
        });
    } else {
        fill_block(dst, 0, transposed, op, f);
    }
}

fn fill_block<T, F>(mut block: MatMut<'_, T>, offset: usize, transposed: bool, op: AssignOp, f: &F)
where
    T: Scalar,
    F: Fn(usize, usize) -> T,
{
    for a in 0..block.rows() {
        for b in 0..block.cols() {
            let (i, j) = if transposed {
                (b, offset + a)
            } else {
                (offset + a, b)
            };
            let value = f(i, j);
            let v = match op {
                AssignOp::Assign => value,
                _ => op.apply(block.get(a, b), value),
            };
            block.set(a, b, v);
        }
    }
}

/// `dst[i] = op(dst[i], f(i))` over every element.
pub(crate) fn fill_vector<T, F>(dst: VecMut<'_, T>, op: AssignOp, cfg: &EvalConfig, f: &F)
where
    T: Scalar,
    F: Fn(usize) -> T + MaybeSync,
{
    let len = dst.len();
    if len == 0 {
        return;
    }
    let write = |offset: usize, mut chunk: VecMut<'_, T>| {
        for k in 0..chunk.len() {
            let value = f(offset + k);
            let v = match op {
                AssignOp::Assign => value,
                _ => op.apply(chunk.get(k), value),
            };
            chunk.set(k, v);
        }
    };
    if cfg.splits(len) {
        par_chunks(dst, 1, cfg.parallel_threshold, &write);
    } else {
        write(0, dst);
    }
}

/// Copy (or accumulate) a strided source into `dst` of the same extents.
///
/// Packed buffers in the same element order go through the slice kernels.
pub(crate) fn copy_matrix<T: Scalar>(
    src: MatRef<'_, T>,
    mut dst: MatMut<'_, T>,
    scale: Option<T>,
    op: AssignOp,
    cfg: &EvalConfig,
) {
    let linear = src.rows() <= 1 || src.cols() <= 1;
    if let (Some((s, s_rm)), Some((d, d_rm))) = (src.as_packed_slice(), dst.as_packed_slice_mut()) {
        if s_rm == d_rm || linear {
            copy_slice(s, d, scale, op);
            return;
        }
    }
    match scale {
        Some(alpha) => fill_matrix(dst, op, cfg, &|i, j| alpha * src.get(i, j)),
        None => fill_matrix(dst, op, cfg, &|i, j| src.get(i, j)),
    }
}

/// Vector counterpart of [`copy_matrix`].
pub(crate) fn copy_vector<T: Scalar>(
    src: VecRef<'_, T>,
    mut dst: VecMut<'_, T>,
    scale: Option<T>,
    op: AssignOp,
) {
    if let (Some(s), Some(d)) = (src.as_slice(), dst.as_slice_mut()) {
        copy_slice(s, d, scale, op);
        return;
    }
    for i in 0..src.len() {
        let value = match scale {
            Some(alpha) => alpha * src.get(i),
            None => src.get(i),
        };
        let v = op.apply(dst.get(i), value);
        dst.set(i, v);
    }
}

fn copy_slice<T: Scalar>(src: &[T], dst: &mut [T], scale: Option<T>, op: AssignOp) {
    let alpha = scale.unwrap_or_else(T::one);
    match op {
        AssignOp::Assign => {
            dst.copy_from_slice(src);
            if scale.is_some() {
                simd::scale(alpha, dst);
            }
        }
        AssignOp::Add => simd::axpy(alpha, src, dst),
        AssignOp::Sub => simd::axpy(-alpha, src, dst),
    }
}

// ============================================================================
// Free functions
// ============================================================================

/// Materialize a matrix expression into an owned matrix of the same order.
pub fn eval<E: MatExpr>(expr: E) -> Result<DynamicMatrix<E::Elem, E::Order>> {
    expr.eval()
}

/// Materialize a vector expression.
pub fn eval_vector<E: VecExpr>(expr: E) -> Result<DynamicVector<E::Elem>> {
    expr.eval()
}

/// Inner product of two vector expressions; same as [`VecExpr::dot`].
pub fn inner<L, R>(lhs: L, rhs: R) -> Result<L::Elem>
where
    L: VecExpr,
    R: VecExpr<Elem = L::Elem>,
{
    reduce::dot(&lhs, &rhs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_op_factors() {
        assert_eq!(AssignOp::Assign.gemm_factors(2.0), (2.0, 0.0));
        assert_eq!(AssignOp::Add.gemm_factors(2.0), (2.0, 1.0));
        assert_eq!(AssignOp::Sub.gemm_factors(2.0), (-2.0, 1.0));
        assert_eq!(AssignOp::Sub.then_sub(), AssignOp::Add);
        assert_eq!(AssignOp::Assign.then_add(), AssignOp::Add);
        assert_eq!(AssignOp::Sub.apply(5, 2), 3);
    }

    #[test]
    fn test_overlap_classification() {
        let data = [0.0f64; 12];
        let whole = MatRef::from_slice(&data, 3, 4, true);
        let target = MemSpan::of_matrix(&whole).unwrap();

        assert_eq!(MemSpan::of_matrix(&whole).unwrap().classify(&target), Overlap::Exact);
        let sub = whole.submatrix(1, 1, 2, 2);
        assert_eq!(MemSpan::of_matrix(&sub).unwrap().classify(&target), Overlap::Partial);
        let t = whole.transpose();
        assert_eq!(MemSpan::of_matrix(&t).unwrap().classify(&target), Overlap::Partial);

        let top = MemSpan::of_matrix(&whole.submatrix(0, 0, 1, 4)).unwrap();
        let bottom = MemSpan::of_matrix(&whole.submatrix(2, 0, 1, 4)).unwrap();
        assert_eq!(top.classify(&bottom), Overlap::None);
        assert_eq!(Overlap::Exact.merge(Overlap::None), Overlap::Exact);
        assert_eq!(Overlap::Exact.merge(Overlap::Partial), Overlap::Partial);
    }

    #[test]
    fn test_fill_matrix_column_major_target() {
        let mut data = [0i32; 6];
        let dst = MatMut::from_slice(&mut data, 2, 3, false);
        fill_matrix(dst, AssignOp::Assign, &EvalConfig::serial(), &|i, j| (10 * i + j) as i32);
        assert_eq!(data, [0, 10, 1, 11, 2, 12]);
    }

    #[test]
    fn test_copy_matrix_mixed_orders() {
        let src = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut dst = [1.0; 6];
        copy_matrix(
            MatRef::from_slice(&src, 2, 3, true),
            MatMut::from_slice(&mut dst, 2, 3, false),
            Some(2.0),
            AssignOp::Add,
            &EvalConfig::serial(),
        );
        assert_eq!(dst, [3.0, 9.0, 5.0, 11.0, 7.0, 13.0]);
    }
}
