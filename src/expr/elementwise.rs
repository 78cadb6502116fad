//! Elementwise expression nodes.
//!
//! Element `i` (or `(i, j)`) of every node here depends only on element `i`
//! of its operands, so these nodes keep their operands' `ELEMENTWISE` flag.
//! When an operand requires evaluation, sums and differences distribute the
//! assignment over both sides and scalings fold into the product kernels'
//! `alpha`; every other combination evaluates the operand into a temporary
//! first.

use std::marker::PhantomData;

use linexpr_kernel::{MatMut, MaybeSync, VecMut};
use linexpr_traits::{BinaryKind, BinaryOp, PromoteOrder, Promoted, UnaryOp};

use super::{
    fill_matrix, fill_vector, same_shape, AssignOp, MatExpr, MemSpan, Overlap, PreparedMat,
    PreparedVec, VecExpr,
};
use crate::config::EvalConfig;
use crate::Result;

fn assign_vec_part<E: VecExpr>(
    expr: &E,
    dst: VecMut<'_, E::Elem>,
    scale: Option<E::Elem>,
    op: AssignOp,
    cfg: &EvalConfig,
) -> Result<()> {
    match scale {
        Some(s) => expr.assign_scaled_to(dst, s, op, cfg),
        None => expr.assign_to(dst, op, cfg),
    }
}

fn assign_mat_part<E: MatExpr>(
    expr: &E,
    dst: MatMut<'_, E::Elem>,
    scale: Option<E::Elem>,
    op: AssignOp,
    cfg: &EvalConfig,
) -> Result<()> {
    match scale {
        Some(s) => expr.assign_scaled_to(dst, s, op, cfg),
        None => expr.assign_to(dst, op, cfg),
    }
}

fn vector_op_name(kind: BinaryKind) -> &'static str {
    match kind {
        BinaryKind::Plus => "vector addition",
        BinaryKind::Minus => "vector subtraction",
        BinaryKind::Times => "componentwise vector product",
        BinaryKind::Divide => "componentwise vector division",
    }
}

fn matrix_op_name(kind: BinaryKind) -> &'static str {
    match kind {
        BinaryKind::Plus => "matrix addition",
        BinaryKind::Minus => "matrix subtraction",
        BinaryKind::Times => "Schur product",
        BinaryKind::Divide => "componentwise matrix division",
    }
}

// ============================================================================
// Binary combinations
// ============================================================================

/// `op(lhs[i], rhs[i])`.
#[derive(Debug, Clone, Copy)]
pub struct VecZip<L, R, Op> {
    lhs: L,
    rhs: R,
    _op: PhantomData<Op>,
}

impl<L, R, Op> VecZip<L, R, Op> {
    /// Combine without checking lengths; mismatches surface on assignment.
    pub fn new(lhs: L, rhs: R) -> Self {
        Self {
            lhs,
            rhs,
            _op: PhantomData,
        }
    }

    /// Combine, reporting a length mismatch immediately.
    pub fn try_new(lhs: L, rhs: R) -> Result<Self>
    where
        Self: VecExpr,
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

impl<L, R, Op> VecZip<L, R, Op>
where
    L: VecExpr,
    R: VecExpr<Elem = L::Elem>,
    Op: BinaryOp<L::Elem>,
{
    fn assign_impl(
        &self,
        mut dst: VecMut<'_, L::Elem>,
        scale: Option<L::Elem>,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        if L::REQUIRES_EVALUATION || R::REQUIRES_EVALUATION {
            let second = match Op::KIND {
                BinaryKind::Plus => Some(op.then_add()),
                BinaryKind::Minus => Some(op.then_sub()),
                _ => None,
            };
            if let Some(second) = second {
                assign_vec_part(&self.lhs, dst.reborrow(), scale, op, cfg)?;
                return assign_vec_part(&self.rhs, dst, scale, second, cfg);
            }
        }
        let l = PreparedVec::new(&self.lhs, cfg)?;
        let r = PreparedVec::new(&self.rhs, cfg)?;
        match scale {
            Some(s) => fill_vector(dst, op, cfg, &|i| s * Op::apply(l.get(i), r.get(i))),
            None => fill_vector(dst, op, cfg, &|i| Op::apply(l.get(i), r.get(i))),
        }
        Ok(())
    }
}

impl<L, R, Op> VecExpr for VecZip<L, R, Op>
where
    L: VecExpr,
    R: VecExpr<Elem = L::Elem>,
    Op: BinaryOp<L::Elem>,
{
    type Elem = L::Elem;

    const IS_DENSE: bool = L::IS_DENSE || R::IS_DENSE;
    const ELEMENTWISE: bool = L::ELEMENTWISE && R::ELEMENTWISE;
    const CAN_ALIAS: bool = L::CAN_ALIAS || R::CAN_ALIAS;
    const REQUIRES_EVALUATION: bool = L::REQUIRES_EVALUATION || R::REQUIRES_EVALUATION;

    #[inline]
    fn size(&self) -> usize {
        self.lhs.size()
    }

    #[inline(always)]
    fn get(&self, i: usize) -> L::Elem {
        Op::apply(self.lhs.get(i), self.rhs.get(i))
    }

    fn check(&self) -> Result<()> {
        self.lhs.check()?;
        self.rhs.check()?;
        same_shape(
            vector_op_name(Op::KIND),
            (self.lhs.size(), 1),
            (self.rhs.size(), 1),
        )
    }

    fn overlap(&self, target: &MemSpan) -> Overlap {
        self.lhs.overlap(target).merge(self.rhs.overlap(target))
    }

    fn assign_to(&self, dst: VecMut<'_, L::Elem>, op: AssignOp, cfg: &EvalConfig) -> Result<()> {
        self.assign_impl(dst, None, op, cfg)
    }

    fn assign_scaled_to(
        &self,
        dst: VecMut<'_, L::Elem>,
        scale: L::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        self.assign_impl(dst, Some(scale), op, cfg)
    }
}

/// `op(lhs(i, j), rhs(i, j))`; the result takes the promoted storage order.
#[derive(Debug, Clone, Copy)]
pub struct MatZip<L, R, Op> {
    lhs: L,
    rhs: R,
    _op: PhantomData<Op>,
}

impl<L, R, Op> MatZip<L, R, Op> {
    /// Combine without checking extents; mismatches surface on assignment.
    pub fn new(lhs: L, rhs: R) -> Self {
        Self {
            lhs,
            rhs,
            _op: PhantomData,
        }
    }

    /// Combine, reporting an extent mismatch immediately.
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

impl<L, R, Op> MatZip<L, R, Op>
where
    L: MatExpr,
    R: MatExpr<Elem = L::Elem>,
    L::Order: PromoteOrder<R::Order>,
    Op: BinaryOp<L::Elem>,
{
    fn assign_impl(
        &self,
        mut dst: MatMut<'_, L::Elem>,
        scale: Option<L::Elem>,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        if L::REQUIRES_EVALUATION || R::REQUIRES_EVALUATION {
            let second = match Op::KIND {
                BinaryKind::Plus => Some(op.then_add()),
                BinaryKind::Minus => Some(op.then_sub()),
                _ => None,
            };
            if let Some(second) = second {
                assign_mat_part(&self.lhs, dst.reborrow(), scale, op, cfg)?;
                return assign_mat_part(&self.rhs, dst, scale, second, cfg);
            }
        }
        let l = PreparedMat::new(&self.lhs, cfg)?;
        let r = PreparedMat::new(&self.rhs, cfg)?;
        match scale {
            Some(s) => fill_matrix(dst, op, cfg, &|i, j| s * Op::apply(l.get(i, j), r.get(i, j))),
            None => fill_matrix(dst, op, cfg, &|i, j| Op::apply(l.get(i, j), r.get(i, j))),
        }
        Ok(())
    }
}

impl<L, R, Op> MatExpr for MatZip<L, R, Op>
where
    L: MatExpr,
    R: MatExpr<Elem = L::Elem>,
    L::Order: PromoteOrder<R::Order>,
    Op: BinaryOp<L::Elem>,
{
    type Elem = L::Elem;
    type Order = Promoted<L::Order, R::Order>;

    const IS_DENSE: bool = L::IS_DENSE || R::IS_DENSE;
    const ELEMENTWISE: bool = L::ELEMENTWISE && R::ELEMENTWISE;
    const CAN_ALIAS: bool = L::CAN_ALIAS || R::CAN_ALIAS;
    const REQUIRES_EVALUATION: bool = L::REQUIRES_EVALUATION || R::REQUIRES_EVALUATION;

    #[inline]
    fn rows(&self) -> usize {
        self.lhs.rows()
    }

    #[inline]
    fn cols(&self) -> usize {
        self.lhs.cols()
    }

    #[inline(always)]
    fn get(&self, i: usize, j: usize) -> L::Elem {
        Op::apply(self.lhs.get(i, j), self.rhs.get(i, j))
    }

    fn check(&self) -> Result<()> {
        self.lhs.check()?;
        self.rhs.check()?;
        same_shape(
            matrix_op_name(Op::KIND),
            (self.lhs.rows(), self.lhs.cols()),
            (self.rhs.rows(), self.rhs.cols()),
        )
    }

    fn overlap(&self, target: &MemSpan) -> Overlap {
        self.lhs.overlap(target).merge(self.rhs.overlap(target))
    }

    fn assign_to(&self, dst: MatMut<'_, L::Elem>, op: AssignOp, cfg: &EvalConfig) -> Result<()> {
        self.assign_impl(dst, None, op, cfg)
    }

    fn assign_scaled_to(
        &self,
        dst: MatMut<'_, L::Elem>,
        scale: L::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        self.assign_impl(dst, Some(scale), op, cfg)
    }
}

// ============================================================================
// Scalar combinations
// ============================================================================

/// `op(expr[i], scalar)`, with `op` one of `Times` or `Divide`.
#[derive(Debug, Clone, Copy)]
pub struct VecScale<E: VecExpr, Op> {
    expr: E,
    scalar: E::Elem,
    _op: PhantomData<Op>,
}

impl<E: VecExpr, Op> VecScale<E, Op> {
    pub fn new(expr: E, scalar: E::Elem) -> Self {
        Self {
            expr,
            scalar,
            _op: PhantomData,
        }
    }

    pub fn scalar(&self) -> E::Elem {
        self.scalar
    }

    fn assign_impl(
        &self,
        dst: VecMut<'_, E::Elem>,
        scale: Option<E::Elem>,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()>
    where
        Op: BinaryOp<E::Elem>,
    {
        if Op::KIND == BinaryKind::Times {
            let total = scale.map_or(self.scalar, |s| s * self.scalar);
            return self.expr.assign_scaled_to(dst, total, op, cfg);
        }
        let e = PreparedVec::new(&self.expr, cfg)?;
        let scalar = self.scalar;
        match scale {
            Some(s) => fill_vector(dst, op, cfg, &|i| s * Op::apply(e.get(i), scalar)),
            None => fill_vector(dst, op, cfg, &|i| Op::apply(e.get(i), scalar)),
        }
        Ok(())
    }
}

impl<E, Op> VecExpr for VecScale<E, Op>
where
    E: VecExpr,
    Op: BinaryOp<E::Elem>,
{
    type Elem = E::Elem;

    const IS_DENSE: bool = E::IS_DENSE;
    const ELEMENTWISE: bool = E::ELEMENTWISE;
    const CAN_ALIAS: bool = E::CAN_ALIAS;
    const REQUIRES_EVALUATION: bool = E::REQUIRES_EVALUATION;

    #[inline]
    fn size(&self) -> usize {
        self.expr.size()
    }

    #[inline(always)]
    fn get(&self, i: usize) -> E::Elem {
        Op::apply(self.expr.get(i), self.scalar)
    }

    fn check(&self) -> Result<()> {
        self.expr.check()
    }

    fn overlap(&self, target: &MemSpan) -> Overlap {
        self.expr.overlap(target)
    }

    fn for_each_nonzero(&self, f: &mut dyn FnMut(usize, E::Elem)) {
        let scalar = self.scalar;
        self.expr.for_each_nonzero(&mut |i, v| f(i, Op::apply(v, scalar)));
    }

    fn assign_to(&self, dst: VecMut<'_, E::Elem>, op: AssignOp, cfg: &EvalConfig) -> Result<()> {
        self.assign_impl(dst, None, op, cfg)
    }

    fn assign_scaled_to(
        &self,
        dst: VecMut<'_, E::Elem>,
        scale: E::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        self.assign_impl(dst, Some(scale), op, cfg)
    }
}

/// `op(expr(i, j), scalar)`, with `op` one of `Times` or `Divide`.
#[derive(Debug, Clone, Copy)]
pub struct MatScale<E: MatExpr, Op> {
    expr: E,
    scalar: E::Elem,
    _op: PhantomData<Op>,
}

impl<E: MatExpr, Op> MatScale<E, Op> {
    pub fn new(expr: E, scalar: E::Elem) -> Self {
        Self {
            expr,
            scalar,
            _op: PhantomData,
        }
    }

    pub fn scalar(&self) -> E::Elem {
        self.scalar
    }

    fn assign_impl(
        &self,
        dst: MatMut<'_, E::Elem>,
        scale: Option<E::Elem>,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()>
    where
        Op: BinaryOp<E::Elem>,
    {
        if Op::KIND == BinaryKind::Times {
            let total = scale.map_or(self.scalar, |s| s * self.scalar);
            return self.expr.assign_scaled_to(dst, total, op, cfg);
        }
        let e = PreparedMat::new(&self.expr, cfg)?;
        let scalar = self.scalar;
        match scale {
            Some(s) => fill_matrix(dst, op, cfg, &|i, j| s * Op::apply(e.get(i, j), scalar)),
            None => fill_matrix(dst, op, cfg, &|i, j| Op::apply(e.get(i, j), scalar)),
        }
        Ok(())
    }
}

impl<E, Op> MatExpr for MatScale<E, Op>
where
    E: MatExpr,
    Op: BinaryOp<E::Elem>,
{
    type Elem = E::Elem;
    type Order = E::Order;

    const IS_DENSE: bool = E::IS_DENSE;
    const ELEMENTWISE: bool = E::ELEMENTWISE;
    const CAN_ALIAS: bool = E::CAN_ALIAS;
    const REQUIRES_EVALUATION: bool = E::REQUIRES_EVALUATION;

    #[inline]
    fn rows(&self) -> usize {
        self.expr.rows()
    }

    #[inline]
    fn cols(&self) -> usize {
        self.expr.cols()
    }

    #[inline(always)]
    fn get(&self, i: usize, j: usize) -> E::Elem {
        Op::apply(self.expr.get(i, j), self.scalar)
    }

    fn check(&self) -> Result<()> {
        self.expr.check()
    }

    fn overlap(&self, target: &MemSpan) -> Overlap {
        self.expr.overlap(target)
    }

    fn for_each_in_row(&self, i: usize, f: &mut dyn FnMut(usize, E::Elem)) {
        let scalar = self.scalar;
        self.expr.for_each_in_row(i, &mut |j, v| f(j, Op::apply(v, scalar)));
    }

    fn assign_to(&self, dst: MatMut<'_, E::Elem>, op: AssignOp, cfg: &EvalConfig) -> Result<()> {
        self.assign_impl(dst, None, op, cfg)
    }

    fn assign_scaled_to(
        &self,
        dst: MatMut<'_, E::Elem>,
        scale: E::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        self.assign_impl(dst, Some(scale), op, cfg)
    }
}

// ============================================================================
// Unary maps
// ============================================================================

/// `op(expr[i])` for a type-level operation such as `Negate` or `Modulus`.
#[derive(Debug, Clone, Copy)]
pub struct VecUnary<E, Op> {
    expr: E,
    _op: PhantomData<Op>,
}

impl<E, Op> VecUnary<E, Op> {
    pub fn new(expr: E) -> Self {
        Self {
            expr,
            _op: PhantomData,
        }
    }
}

impl<E, Op> VecUnary<E, Op>
where
    E: VecExpr,
    Op: UnaryOp<E::Elem>,
{
    fn assign_impl(
        &self,
        dst: VecMut<'_, E::Elem>,
        scale: Option<E::Elem>,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        if Op::IS_IDENTITY {
            return assign_vec_part(&self.expr, dst, scale, op, cfg);
        }
        if Op::IS_NEGATION && E::REQUIRES_EVALUATION {
            let s = scale.unwrap_or_else(num_traits::One::one);
            return self.expr.assign_scaled_to(dst, -s, op, cfg);
        }
        let e = PreparedVec::new(&self.expr, cfg)?;
        match scale {
            Some(s) => fill_vector(dst, op, cfg, &|i| s * Op::apply(e.get(i))),
            None => fill_vector(dst, op, cfg, &|i| Op::apply(e.get(i))),
        }
        Ok(())
    }
}

impl<E, Op> VecExpr for VecUnary<E, Op>
where
    E: VecExpr,
    Op: UnaryOp<E::Elem>,
{
    type Elem = E::Elem;

    const IS_DENSE: bool = E::IS_DENSE;
    const ELEMENTWISE: bool = E::ELEMENTWISE;
    const CAN_ALIAS: bool = E::CAN_ALIAS;
    const REQUIRES_EVALUATION: bool = E::REQUIRES_EVALUATION;

    #[inline]
    fn size(&self) -> usize {
        self.expr.size()
    }

    #[inline(always)]
    fn get(&self, i: usize) -> E::Elem {
        Op::apply(self.expr.get(i))
    }

    fn check(&self) -> Result<()> {
        self.expr.check()
    }

    fn overlap(&self, target: &MemSpan) -> Overlap {
        self.expr.overlap(target)
    }

    fn for_each_nonzero(&self, f: &mut dyn FnMut(usize, E::Elem)) {
        self.expr.for_each_nonzero(&mut |i, v| f(i, Op::apply(v)));
    }

    fn assign_to(&self, dst: VecMut<'_, E::Elem>, op: AssignOp, cfg: &EvalConfig) -> Result<()> {
        self.assign_impl(dst, None, op, cfg)
    }

    fn assign_scaled_to(
        &self,
        dst: VecMut<'_, E::Elem>,
        scale: E::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        self.assign_impl(dst, Some(scale), op, cfg)
    }
}

/// `op(expr(i, j))` for a type-level operation.
#[derive(Debug, Clone, Copy)]
pub struct MatUnary<E, Op> {
    expr: E,
    _op: PhantomData<Op>,
}

impl<E, Op> MatUnary<E, Op> {
    pub fn new(expr: E) -> Self {
        Self {
            expr,
            _op: PhantomData,
        }
    }
}

impl<E, Op> MatUnary<E, Op>
where
    E: MatExpr,
    Op: UnaryOp<E::Elem>,
{
    fn assign_impl(
        &self,
        dst: MatMut<'_, E::Elem>,
        scale: Option<E::Elem>,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        if Op::IS_IDENTITY {
            return assign_mat_part(&self.expr, dst, scale, op, cfg);
        }
        if Op::IS_NEGATION && E::REQUIRES_EVALUATION {
            let s = scale.unwrap_or_else(num_traits::One::one);
            return self.expr.assign_scaled_to(dst, -s, op, cfg);
        }
        let e = PreparedMat::new(&self.expr, cfg)?;
        match scale {
            Some(s) => fill_matrix(dst, op, cfg, &|i, j| s * Op::apply(e.get(i, j))),
            None => fill_matrix(dst, op, cfg, &|i, j| Op::apply(e.get(i, j))),
        }
        Ok(())
    }
}

impl<E, Op> MatExpr for MatUnary<E, Op>
where
    E: MatExpr,
    Op: UnaryOp<E::Elem>,
{
    type Elem = E::Elem;
    type Order = E::Order;

    const IS_DENSE: bool = E::IS_DENSE;
    const ELEMENTWISE: bool = E::ELEMENTWISE;
    const CAN_ALIAS: bool = E::CAN_ALIAS;
    const REQUIRES_EVALUATION: bool = E::REQUIRES_EVALUATION;

    #[inline]
    fn rows(&self) -> usize {
        self.expr.rows()
    }

    #[inline]
    fn cols(&self) -> usize {
        self.expr.cols()
    }

    #[inline(always)]
    fn get(&self, i: usize, j: usize) -> E::Elem {
        Op::apply(self.expr.get(i, j))
    }

    fn check(&self) -> Result<()> {
        self.expr.check()
    }

    fn overlap(&self, target: &MemSpan) -> Overlap {
        self.expr.overlap(target)
    }

    fn for_each_in_row(&self, i: usize, f: &mut dyn FnMut(usize, E::Elem)) {
        self.expr.for_each_in_row(i, &mut |j, v| f(j, Op::apply(v)));
    }

    fn assign_to(&self, dst: MatMut<'_, E::Elem>, op: AssignOp, cfg: &EvalConfig) -> Result<()> {
        self.assign_impl(dst, None, op, cfg)
    }

    fn assign_scaled_to(
        &self,
        dst: MatMut<'_, E::Elem>,
        scale: E::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        self.assign_impl(dst, Some(scale), op, cfg)
    }
}

// ============================================================================
// Closure maps
// ============================================================================

/// `f(expr[i])` for an arbitrary closure.
///
/// `f(0)` need not be zero, so the result is always dense.
#[derive(Clone, Copy)]
pub struct VecMap<E, F> {
    expr: E,
    f: F,
}

impl<E, F> VecMap<E, F> {
    pub fn new(expr: E, f: F) -> Self {
        Self { expr, f }
    }
}

impl<E: std::fmt::Debug, F> std::fmt::Debug for VecMap<E, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VecMap").field("expr", &self.expr).finish_non_exhaustive()
    }
}

impl<E, F> VecExpr for VecMap<E, F>
where
    E: VecExpr,
    F: Fn(E::Elem) -> E::Elem + MaybeSync,
{
    type Elem = E::Elem;

    const ELEMENTWISE: bool = E::ELEMENTWISE;
    const CAN_ALIAS: bool = E::CAN_ALIAS;
    const REQUIRES_EVALUATION: bool = E::REQUIRES_EVALUATION;

    #[inline]
    fn size(&self) -> usize {
        self.expr.size()
    }

    #[inline(always)]
    fn get(&self, i: usize) -> E::Elem {
        (self.f)(self.expr.get(i))
    }

    fn check(&self) -> Result<()> {
        self.expr.check()
    }

    fn overlap(&self, target: &MemSpan) -> Overlap {
        self.expr.overlap(target)
    }

    fn assign_to(&self, dst: VecMut<'_, E::Elem>, op: AssignOp, cfg: &EvalConfig) -> Result<()> {
        let e = PreparedVec::new(&self.expr, cfg)?;
        fill_vector(dst, op, cfg, &|i| (self.f)(e.get(i)));
        Ok(())
    }

    fn assign_scaled_to(
        &self,
        dst: VecMut<'_, E::Elem>,
        scale: E::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        let e = PreparedVec::new(&self.expr, cfg)?;
        fill_vector(dst, op, cfg, &|i| scale * (self.f)(e.get(i)));
        Ok(())
    }
}

/// `f(expr(i, j))` for an arbitrary closure.
#[derive(Clone, Copy)]
pub struct MatMap<E, F> {
    expr: E,
    f: F,
}

impl<E, F> MatMap<E, F> {
    pub fn new(expr: E, f: F) -> Self {
        Self { expr, f }
    }
}

impl<E: std::fmt::Debug, F> std::fmt::Debug for MatMap<E, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatMap").field("expr", &self.expr).finish_non_exhaustive()
    }
}

impl<E, F> MatExpr for MatMap<E, F>
where
    E: MatExpr,
    F: Fn(E::Elem) -> E::Elem + MaybeSync,
{
    type Elem = E::Elem;
    type Order = E::Order;

    const ELEMENTWISE: bool = E::ELEMENTWISE;
    const CAN_ALIAS: bool = E::CAN_ALIAS;
    const REQUIRES_EVALUATION: bool = E::REQUIRES_EVALUATION;

    #[inline]
    fn rows(&self) -> usize {
        self.expr.rows()
    }

    #[inline]
    fn cols(&self) -> usize {
        self.expr.cols()
    }

    #[inline(always)]
    fn get(&self, i: usize, j: usize) -> E::Elem {
        (self.f)(self.expr.get(i, j))
    }

    fn check(&self) -> Result<()> {
        self.expr.check()
    }

    fn overlap(&self, target: &MemSpan) -> Overlap {
        self.expr.overlap(target)
    }

    fn assign_to(&self, dst: MatMut<'_, E::Elem>, op: AssignOp, cfg: &EvalConfig) -> Result<()> {
        let e = PreparedMat::new(&self.expr, cfg)?;
        fill_matrix(dst, op, cfg, &|i, j| (self.f)(e.get(i, j)));
        Ok(())
    }

    fn assign_scaled_to(
        &self,
        dst: MatMut<'_, E::Elem>,
        scale: E::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        let e = PreparedMat::new(&self.expr, cfg)?;
        fill_matrix(dst, op, cfg, &|i, j| scale * (self.f)(e.get(i, j)));
        Ok(())
    }
}
