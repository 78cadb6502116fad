//! Transposition and per-row / per-column reductions.

use std::marker::PhantomData;

use linexpr_kernel::{MatMut, MatRef, VecMut};
use linexpr_traits::{fold, ReduceOp, StorageOrder};

use super::{fill_vector, AssignOp, MatExpr, MemSpan, Overlap, PreparedMat, VecExpr};
use crate::config::EvalConfig;
use crate::Result;

/// Lazy transpose. Evaluation writes the operand into the transposed target,
/// so a transposed product still reaches the product kernel.
#[derive(Debug, Clone, Copy)]
pub struct Trans<E> {
    expr: E,
}

impl<E> Trans<E> {
    pub fn new(expr: E) -> Self {
        Self { expr }
    }

    /// The operand being transposed.
    pub fn inner(&self) -> &E {
        &self.expr
    }
}

impl<E: MatExpr> MatExpr for Trans<E> {
    type Elem = E::Elem;
    type Order = <E::Order as StorageOrder>::Transposed;

    const IS_DENSE: bool = E::IS_DENSE;
    // Element (i, j) reads (j, i) of the operand.
    const ELEMENTWISE: bool = false;
    const CAN_ALIAS: bool = E::CAN_ALIAS;
    const REQUIRES_EVALUATION: bool = E::REQUIRES_EVALUATION;

    #[inline]
    fn rows(&self) -> usize {
        self.expr.cols()
    }

    #[inline]
    fn cols(&self) -> usize {
        self.expr.rows()
    }

    #[inline(always)]
    fn get(&self, i: usize, j: usize) -> E::Elem {
        self.expr.get(j, i)
    }

    fn check(&self) -> Result<()> {
        self.expr.check()
    }

    fn overlap(&self, target: &MemSpan) -> Overlap {
        self.expr.overlap(target)
    }

    fn as_mat_ref(&self) -> Option<MatRef<'_, E::Elem>> {
        self.expr.as_mat_ref().map(MatRef::transpose)
    }

    fn assign_to(&self, dst: MatMut<'_, E::Elem>, op: AssignOp, cfg: &EvalConfig) -> Result<()> {
        self.expr.assign_to(dst.transpose(), op, cfg)
    }

    fn assign_scaled_to(
        &self,
        dst: MatMut<'_, E::Elem>,
        scale: E::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        self.expr.assign_scaled_to(dst.transpose(), scale, op, cfg)
    }
}

/// Fold of every row with `Op`: one element per row.
#[derive(Debug, Clone, Copy)]
pub struct RowReduce<M, Op> {
    mat: M,
    _op: PhantomData<Op>,
}

impl<M, Op> RowReduce<M, Op> {
    pub fn new(mat: M) -> Self {
        Self {
            mat,
            _op: PhantomData,
        }
    }
}

impl<M, Op> VecExpr for RowReduce<M, Op>
where
    M: MatExpr,
    Op: ReduceOp<M::Elem>,
{
    type Elem = M::Elem;

    const ELEMENTWISE: bool = false;
    const CAN_ALIAS: bool = M::CAN_ALIAS;

    #[inline]
    fn size(&self) -> usize {
        self.mat.rows()
    }

    fn get(&self, i: usize) -> M::Elem {
        fold::<M::Elem, Op>((0..self.mat.cols()).map(|j| self.mat.get(i, j)))
    }

    fn check(&self) -> Result<()> {
        self.mat.check()
    }

    fn overlap(&self, target: &MemSpan) -> Overlap {
        self.mat.overlap(target)
    }

    fn assign_to(&self, dst: VecMut<'_, M::Elem>, op: AssignOp, cfg: &EvalConfig) -> Result<()> {
        let m = PreparedMat::new(&self.mat, cfg)?;
        let cols = self.mat.cols();
        fill_vector(dst, op, cfg, &|i| {
            fold::<M::Elem, Op>((0..cols).map(|j| m.get(i, j)))
        });
        Ok(())
    }

    fn assign_scaled_to(
        &self,
        dst: VecMut<'_, M::Elem>,
        scale: M::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        let m = PreparedMat::new(&self.mat, cfg)?;
        let cols = self.mat.cols();
        fill_vector(dst, op, cfg, &|i| {
            scale * fold::<M::Elem, Op>((0..cols).map(|j| m.get(i, j)))
        });
        Ok(())
    }
}

/// Fold of every column with `Op`: one element per column.
#[derive(Debug, Clone, Copy)]
pub struct ColReduce<M, Op> {
    mat: M,
    _op: PhantomData<Op>,
}

impl<M, Op> ColReduce<M, Op> {
    pub fn new(mat: M) -> Self {
        Self {
            mat,
            _op: PhantomData,
        }
    }
}

impl<M, Op> VecExpr for ColReduce<M, Op>
where
    M: MatExpr,
    Op: ReduceOp<M::Elem>,
{
    type Elem = M::Elem;

    const ELEMENTWISE: bool = false;
    const CAN_ALIAS: bool = M::CAN_ALIAS;

    #[inline]
    fn size(&self) -> usize {
        self.mat.cols()
    }

    fn get(&self, j: usize) -> M::Elem {
        fold::<M::Elem, Op>((0..self.mat.rows()).map(|i| self.mat.get(i, j)))
    }

    fn check(&self) -> Result<()> {
        self.mat.check()
    }

    fn overlap(&self, target: &MemSpan) -> Overlap {
        self.mat.overlap(target)
    }

    fn assign_to(&self, dst: VecMut<'_, M::Elem>, op: AssignOp, cfg: &EvalConfig) -> Result<()> {
        let m = PreparedMat::new(&self.mat, cfg)?;
        let rows = self.mat.rows();
        fill_vector(dst, op, cfg, &|j| {
            fold::<M::Elem, Op>((0..rows).map(|i| m.get(i, j)))
        });
        Ok(())
    }

    fn assign_scaled_to(
        &self,
        dst: VecMut<'_, M::Elem>,
        scale: M::Elem,
        op: AssignOp,
        cfg: &EvalConfig,
    ) -> Result<()> {
        let m = PreparedMat::new(&self.mat, cfg)?;
        let rows = self.mat.rows();
        fill_vector(dst, op, cfg, &|j| {
            scale * fold::<M::Elem, Op>((0..rows).map(|i| m.get(i, j)))
        });
        Ok(())
    }
}
