//! Assignment targets and the evaluation engine.
//!
//! Every assignment runs the same plan:
//!
//! 1. validate the expression tree (`check`)
//! 2. reconcile extents: resizable targets follow a plain assignment,
//!    everything else must already match
//! 3. pick a [`Strategy`]
//! 4. write, either directly or through a temporary
//!
//! Strategy selection is static first: expressions without an [`Aliased`]
//! leaf are written directly, and aliased expressions that read more than
//! element `(i, j)` to produce element `(i, j)` are always buffered. Only
//! aliased elementwise expressions reach the run-time overlap check.

use linexpr_kernel::{MatMut, MatRef, VecMut, VecRef};
use linexpr_traits::StorageOrder;

use crate::config::{AliasCheck, EvalConfig};
use crate::expr::{same_shape, AssignOp, MatExpr, MemSpan, Overlap, VecExpr};
use crate::storage::{check_block, check_range, Aliased, MatrixView, MatrixViewMut, VectorView, VectorViewMut};
use crate::{LinexprError, Result, Scalar};

/// How an assignment was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Elements were written straight into the target.
    Direct,
    /// The expression was evaluated into a temporary that was then copied.
    Buffered,
}

fn op_name(op: AssignOp) -> &'static str {
    match op {
        AssignOp::Assign => "assignment",
        AssignOp::Add => "addition assignment",
        AssignOp::Sub => "subtraction assignment",
    }
}

fn select(can_alias: bool, elementwise: bool, cfg: &EvalConfig, overlap: impl FnOnce() -> Overlap) -> Strategy {
    if !can_alias {
        return Strategy::Direct;
    }
    if !elementwise {
        log::debug!("aliased operand in a non-elementwise expression, buffering");
        return Strategy::Buffered;
    }
    match cfg.alias_check {
        AliasCheck::Off => Strategy::Direct,
        AliasCheck::Dynamic => match overlap() {
            Overlap::Partial => {
                log::debug!("operand partially overlaps the target, buffering");
                Strategy::Buffered
            }
            Overlap::None | Overlap::Exact => Strategy::Direct,
        },
    }
}

// ============================================================================
// Aliased views of targets
// ============================================================================

/// Read-only aliased view of the elements behind `m`.
///
/// # Safety
/// The view carries lifetime `'s` without a borrow. The caller must keep the
/// storage alive and unmoved for `'s` and must only write to it through the
/// evaluation engine, which buffers whenever a read could observe a write.
pub(crate) unsafe fn alias_matrix<'s, T: Scalar, SO: StorageOrder>(
    mut m: MatMut<'_, T>,
) -> Aliased<MatrixView<'s, T, SO>> {
    let r = MatRef::from_raw_parts(
        m.as_mut_ptr(),
        m.rows(),
        m.cols(),
        m.row_stride(),
        m.col_stride(),
    );
    Aliased::new(MatrixView::from_ref(r))
}

/// Vector counterpart of [`alias_matrix`].
///
/// # Safety
/// As for [`alias_matrix`].
pub(crate) unsafe fn alias_vector<'s, T: Scalar>(mut v: VecMut<'_, T>) -> Aliased<VectorView<'s, T>> {
    let r = VecRef::from_raw_parts(v.as_mut_ptr(), v.len(), v.stride());
    Aliased::new(VectorView::from_ref(r))
}

// ============================================================================
// Matrix targets
// ============================================================================

/// A matrix that expressions can be assigned to.
///
/// Implementors provide extents and a strided mutable reference; the
/// assignment methods are provided. Methods without `_with` use
/// [`EvalConfig::default`]; the `_with` forms report the [`Strategy`] taken.
pub trait MatrixTarget {
    type Elem: Scalar;
    /// Storage order of the target (and of its aliased views).
    type Order: StorageOrder;

    /// Whether a plain assignment may change the extents.
    const IS_RESIZABLE: bool = false;

    fn target_shape(&self) -> (usize, usize);

    /// Change the extents, discarding values as needed.
    fn resize_target(&mut self, rows: usize, cols: usize) -> Result<()> {
        let _ = (rows, cols);
        let (rows, cols) = self.target_shape();
        Err(LinexprError::NotResizable { rows, cols })
    }

    /// Strided reference to the target's elements.
    fn target_mut(&mut self) -> MatMut<'_, Self::Elem>;

    /// Combine `expr` into the target with `op`. Every other assignment
    /// method ends here.
    fn apply_with<E>(&mut self, expr: E, op: AssignOp, cfg: &EvalConfig) -> Result<Strategy>
    where
        E: MatExpr<Elem = Self::Elem>,
    {
        evaluate_matrix(self, &expr, op, cfg)
    }

    /// `self = expr`.
    fn assign<E>(&mut self, expr: E) -> Result<()>
    where
        E: MatExpr<Elem = Self::Elem>,
    {
        self.apply_with(expr, AssignOp::Assign, &EvalConfig::default())
            .map(drop)
    }

    fn assign_with<E>(&mut self, expr: E, cfg: &EvalConfig) -> Result<Strategy>
    where
        E: MatExpr<Elem = Self::Elem>,
    {
        self.apply_with(expr, AssignOp::Assign, cfg)
    }

    /// `self += expr`. Extents must match.
    fn add_assign<E>(&mut self, expr: E) -> Result<()>
    where
        E: MatExpr<Elem = Self::Elem>,
    {
        self.apply_with(expr, AssignOp::Add, &EvalConfig::default())
            .map(drop)
    }

    fn add_assign_with<E>(&mut self, expr: E, cfg: &EvalConfig) -> Result<Strategy>
    where
        E: MatExpr<Elem = Self::Elem>,
    {
        self.apply_with(expr, AssignOp::Add, cfg)
    }

    /// `self -= expr`. Extents must match.
    fn sub_assign<E>(&mut self, expr: E) -> Result<()>
    where
        E: MatExpr<Elem = Self::Elem>,
    {
        self.apply_with(expr, AssignOp::Sub, &EvalConfig::default())
            .map(drop)
    }

    fn sub_assign_with<E>(&mut self, expr: E, cfg: &EvalConfig) -> Result<Strategy>
    where
        E: MatExpr<Elem = Self::Elem>,
    {
        self.apply_with(expr, AssignOp::Sub, cfg)
    }

    /// `self = f(self)`, where the expression returned by `f` may read the
    /// target through the [`Aliased`] view it is given.
    ///
    /// The extents never change: an expression of other extents is a
    /// [`LinexprError::ShapeMismatch`], even for resizable targets.
    fn update<'s, F, E>(&'s mut self, f: F) -> Result<()>
    where
        F: FnOnce(Aliased<MatrixView<'s, Self::Elem, Self::Order>>) -> E,
        E: MatExpr<Elem = Self::Elem>,
    {
        self.update_with(&EvalConfig::default(), f).map(drop)
    }

    fn update_with<'s, F, E>(&'s mut self, cfg: &EvalConfig, f: F) -> Result<Strategy>
    where
        F: FnOnce(Aliased<MatrixView<'s, Self::Elem, Self::Order>>) -> E,
        E: MatExpr<Elem = Self::Elem>,
    {
        // SAFETY: the storage stays borrowed for 's and is only written by
        // `apply_with` below.
        let view = unsafe { alias_matrix(self.target_mut()) };
        let expr = f(view);
        expr.check()?;
        same_shape("update", self.target_shape(), (expr.rows(), expr.cols()))?;
        self.apply_with(expr, AssignOp::Assign, cfg)
    }

    /// Assign to the `rows x cols` block at `(row, col)`; `f` receives an
    /// aliased view of the whole target.
    fn update_submatrix<'s, F, E>(
        &'s mut self,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
        f: F,
    ) -> Result<()>
    where
        F: FnOnce(Aliased<MatrixView<'s, Self::Elem, Self::Order>>) -> E,
        E: MatExpr<Elem = Self::Elem>,
    {
        check_block(self.target_shape(), row, col, rows, cols)?;
        // SAFETY: as in `update_with`.
        let view = unsafe { alias_matrix(self.target_mut()) };
        let expr = f(view);
        expr.check()?;
        same_shape("submatrix update", (rows, cols), (expr.rows(), expr.cols()))?;
        let block = self.target_mut().submatrix(row, col, rows, cols);
        let mut block: MatrixViewMut<'_, Self::Elem, Self::Order> = MatrixViewMut::from_mut(block);
        evaluate_matrix(&mut block, &expr, AssignOp::Assign, &EvalConfig::default()).map(drop)
    }
}

/// Run one matrix assignment.
pub(crate) fn evaluate_matrix<Tg, E>(
    target: &mut Tg,
    expr: &E,
    op: AssignOp,
    cfg: &EvalConfig,
) -> Result<Strategy>
where
    Tg: MatrixTarget + ?Sized,
    E: MatExpr<Elem = Tg::Elem>,
{
    expr.check()?;
    let current = target.target_shape();
    let shape = (expr.rows(), expr.cols());
    let resize = shape != current;
    if resize && (op != AssignOp::Assign || !Tg::IS_RESIZABLE) {
        return Err(LinexprError::ShapeMismatch {
            op: op_name(op),
            lhs: current,
            rhs: shape,
        });
    }

    let strategy = if resize {
        if E::CAN_ALIAS {
            Strategy::Buffered
        } else {
            Strategy::Direct
        }
    } else {
        let dst = target.target_mut();
        let span = MemSpan::of_matrix(&dst.as_ref());
        select(E::CAN_ALIAS, E::ELEMENTWISE, cfg, || {
            span.map_or(Overlap::None, |s| expr.overlap(&s))
        })
    };
    log::trace!(
        "{} of {}x{}: {:?}, requires evaluation: {}",
        op_name(op),
        shape.0,
        shape.1,
        strategy,
        E::REQUIRES_EVALUATION
    );

    match strategy {
        Strategy::Direct => {
            if resize {
                target.resize_target(shape.0, shape.1)?;
            }
            expr.assign_to(target.target_mut(), op, cfg)?;
        }
        Strategy::Buffered => {
            let tmp = expr.eval_with(cfg)?;
            if resize {
                target.resize_target(shape.0, shape.1)?;
            }
            tmp.assign_to(target.target_mut(), op, cfg)?;
        }
    }
    Ok(strategy)
}

// ============================================================================
// Vector targets
// ============================================================================

/// A vector that expressions can be assigned to. See [`MatrixTarget`].
pub trait VectorTarget {
    type Elem: Scalar;

    const IS_RESIZABLE: bool = false;

    fn target_len(&self) -> usize;

    fn resize_target(&mut self, len: usize) -> Result<()> {
        let _ = len;
        Err(LinexprError::NotResizable {
            rows: self.target_len(),
            cols: 1,
        })
    }

    fn target_mut(&mut self) -> VecMut<'_, Self::Elem>;

    fn apply_with<E>(&mut self, expr: E, op: AssignOp, cfg: &EvalConfig) -> Result<Strategy>
    where
        E: VecExpr<Elem = Self::Elem>,
    {
        evaluate_vector(self, &expr, op, cfg)
    }

    fn assign<E>(&mut self, expr: E) -> Result<()>
    where
        E: VecExpr<Elem = Self::Elem>,
    {
        self.apply_with(expr, AssignOp::Assign, &EvalConfig::default())
            .map(drop)
    }

    fn assign_with<E>(&mut self, expr: E, cfg: &EvalConfig) -> Result<Strategy>
    where
        E: VecExpr<Elem = Self::Elem>,
    {
        self.apply_with(expr, AssignOp::Assign, cfg)
    }

    fn add_assign<E>(&mut self, expr: E) -> Result<()>
    where
        E: VecExpr<Elem = Self::Elem>,
    {
        self.apply_with(expr, AssignOp::Add, &EvalConfig::default())
            .map(drop)
    }

    fn add_assign_with<E>(&mut self, expr: E, cfg: &EvalConfig) -> Result<Strategy>
    where
        E: VecExpr<Elem = Self::Elem>,
    {
        self.apply_with(expr, AssignOp::Add, cfg)
    }

    fn sub_assign<E>(&mut self, expr: E) -> Result<()>
    where
        E: VecExpr<Elem = Self::Elem>,
    {
        self.apply_with(expr, AssignOp::Sub, &EvalConfig::default())
            .map(drop)
    }

    fn sub_assign_with<E>(&mut self, expr: E, cfg: &EvalConfig) -> Result<Strategy>
    where
        E: VecExpr<Elem = Self::Elem>,
    {
        self.apply_with(expr, AssignOp::Sub, cfg)
    }

    /// `self = f(self)`; see [`MatrixTarget::update`].
    fn update<'s, F, E>(&'s mut self, f: F) -> Result<()>
    where
        F: FnOnce(Aliased<VectorView<'s, Self::Elem>>) -> E,
        E: VecExpr<Elem = Self::Elem>,
    {
        self.update_with(&EvalConfig::default(), f).map(drop)
    }

    fn update_with<'s, F, E>(&'s mut self, cfg: &EvalConfig, f: F) -> Result<Strategy>
    where
        F: FnOnce(Aliased<VectorView<'s, Self::Elem>>) -> E,
        E: VecExpr<Elem = Self::Elem>,
    {
        // SAFETY: the storage stays borrowed for 's and is only written by
        // `apply_with` below.
        let view = unsafe { alias_vector(self.target_mut()) };
        let expr = f(view);
        expr.check()?;
        same_shape("update", (self.target_len(), 1), (expr.size(), 1))?;
        self.apply_with(expr, AssignOp::Assign, cfg)
    }

    /// Assign to elements `[start, start + len)`; `f` receives an aliased
    /// view of the whole target.
    fn update_subvector<'s, F, E>(&'s mut self, start: usize, len: usize, f: F) -> Result<()>
    where
        F: FnOnce(Aliased<VectorView<'s, Self::Elem>>) -> E,
        E: VecExpr<Elem = Self::Elem>,
    {
        check_range(self.target_len(), start, len)?;
        // SAFETY: as in `update_with`.
        let view = unsafe { alias_vector(self.target_mut()) };
        let expr = f(view);
        expr.check()?;
        same_shape("subvector update", (len, 1), (expr.size(), 1))?;
        let mut part = VectorViewMut::from_mut(self.target_mut().subvector(start, len));
        evaluate_vector(&mut part, &expr, AssignOp::Assign, &EvalConfig::default()).map(drop)
    }
}

/// Run one vector assignment.
pub(crate) fn evaluate_vector<Tg, E>(
    target: &mut Tg,
    expr: &E,
    op: AssignOp,
    cfg: &EvalConfig,
) -> Result<Strategy>
where
    Tg: VectorTarget + ?Sized,
    E: VecExpr<Elem = Tg::Elem>,
{
    expr.check()?;
    let current = target.target_len();
    let len = expr.size();
    let resize = len != current;
    if resize && (op != AssignOp::Assign || !Tg::IS_RESIZABLE) {
        return Err(LinexprError::ShapeMismatch {
            op: op_name(op),
            lhs: (current, 1),
            rhs: (len, 1),
        });
    }

    let strategy = if resize {
        if E::CAN_ALIAS {
            Strategy::Buffered
        } else {
            Strategy::Direct
        }
    } else {
        let dst = target.target_mut();
        let span = MemSpan::of_vector(&dst.as_ref());
        select(E::CAN_ALIAS, E::ELEMENTWISE, cfg, || {
            span.map_or(Overlap::None, |s| expr.overlap(&s))
        })
    };
    log::trace!(
        "vector {} of length {}: {:?}, requires evaluation: {}",
        op_name(op),
        len,
        strategy,
        E::REQUIRES_EVALUATION
    );

    match strategy {
        Strategy::Direct => {
            if resize {
                target.resize_target(len)?;
            }
            expr.assign_to(target.target_mut(), op, cfg)?;
        }
        Strategy::Buffered => {
            let tmp = expr.eval_with(cfg)?;
            if resize {
                target.resize_target(len)?;
            }
            tmp.assign_to(target.target_mut(), op, cfg)?;
        }
    }
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DynamicMatrix, DynamicVector, StaticMatrix};
    use crate::{MatMul, MatZip};
    use linexpr_traits::Plus;

    #[test]
    fn test_select_static_then_dynamic() {
        let cfg = EvalConfig::default();
        assert_eq!(select(false, false, &cfg, || Overlap::Partial), Strategy::Direct);
        assert_eq!(select(true, false, &cfg, || Overlap::None), Strategy::Buffered);
        assert_eq!(select(true, true, &cfg, || Overlap::Exact), Strategy::Direct);
        assert_eq!(select(true, true, &cfg, || Overlap::Partial), Strategy::Buffered);
        let off = EvalConfig::default().with_alias_check(AliasCheck::Off);
        assert_eq!(select(true, true, &off, || Overlap::Partial), Strategy::Direct);
    }

    #[test]
    fn test_resizable_target_follows_expression() {
        let a = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0, 3.0]]);
        let mut out = DynamicMatrix::<f64>::zeros(0, 0);
        let strategy = out.assign_with(&a, &EvalConfig::serial()).unwrap();
        assert_eq!(strategy, Strategy::Direct);
        assert_eq!(out.as_slice(), &[1.0, 2.0, 3.0]);

        let err = out.add_assign(DynamicMatrix::<f64>::zeros(2, 2)).unwrap_err();
        assert_eq!(
            err,
            LinexprError::ShapeMismatch {
                op: "addition assignment",
                lhs: (1, 3),
                rhs: (2, 2)
            }
        );
    }

    #[test]
    fn test_fixed_target_rejects_and_keeps_values() {
        let mut fixed = StaticMatrix::<f64, 2, 2>::from_rows([[1.0, 2.0], [3.0, 4.0]]);
        let big = DynamicMatrix::<f64>::identity(3);
        assert!(matches!(
            fixed.assign(&big),
            Err(LinexprError::ShapeMismatch { .. })
        ));
        assert_eq!(fixed.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_update_product_is_buffered() {
        let mut m = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
        let strategy = m
            .update_with(&EvalConfig::serial(), |v| MatMul::new(v, v))
            .unwrap();
        assert_eq!(strategy, Strategy::Buffered);
        assert_eq!(m.as_slice(), &[7.0, 10.0, 15.0, 22.0]);
    }

    #[test]
    fn test_update_elementwise_is_direct() {
        let mut m = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
        let strategy = m
            .update_with(&EvalConfig::serial(), |v| MatZip::<_, _, Plus>::new(v, v))
            .unwrap();
        assert_eq!(strategy, Strategy::Direct);
        assert_eq!(m.as_slice(), &[2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn test_update_rejects_new_extents() {
        let mut m = DynamicMatrix::<f64>::identity(2);
        let err = m.update(|v| v.t().submatrix(0, 0, 1, 2).unwrap()).unwrap_err();
        assert!(matches!(err, LinexprError::ShapeMismatch { op: "update", .. }));
        assert_eq!(m, DynamicMatrix::identity(2));
    }

    #[test]
    fn test_update_subvector_shift() {
        let mut v = DynamicVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        v.update_subvector(1, 3, |whole| whole.subvector(0, 3).unwrap())
            .unwrap();
        assert_eq!(v.as_slice(), &[1.0, 1.0, 2.0, 3.0]);
    }
}
