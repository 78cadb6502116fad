//! Scalar reductions over vector and matrix expressions.
//!
//! Operands that require evaluation are materialized once; packed dense
//! buffers are summed with the slice kernels.

use std::any::TypeId;

use linexpr_kernel::simd;
use linexpr_traits::{fold, ReduceOp, Sum};
use num_traits::Zero;

use super::{same_shape, MatExpr, PreparedMat, PreparedVec, VecExpr};
use crate::config::EvalConfig;
use crate::{LinexprError, Result, Scalar};

pub(crate) fn reduce_vec<E, Op>(expr: &E) -> Result<E::Elem>
where
    E: VecExpr,
    Op: ReduceOp<E::Elem>,
{
    expr.check()?;
    let prepared = PreparedVec::new(expr, &EvalConfig::default())?;
    if TypeId::of::<Op>() == TypeId::of::<Sum>() {
        if let Some(values) = prepared.as_slice() {
            return Ok(simd::sum(values));
        }
    }
    Ok(fold::<E::Elem, Op>((0..expr.size()).map(|i| prepared.get(i))))
}

pub(crate) fn reduce_mat<E, Op>(expr: &E) -> Result<E::Elem>
where
    E: MatExpr,
    Op: ReduceOp<E::Elem>,
{
    expr.check()?;
    let cfg = EvalConfig::default();
    let prepared = PreparedMat::new(expr, &cfg)?;
    let (rows, cols) = (expr.rows(), expr.cols());

    if TypeId::of::<Op>() == TypeId::of::<Sum>() {
        if let PreparedMat::Eager(m) = &prepared {
            return Ok(simd::sum(m.as_slice()));
        }
        if !E::CAN_ALIAS {
            if let Some((values, _)) = expr.as_mat_ref().and_then(|r| r.as_packed_slice()) {
                return Ok(simd::sum(values));
            }
        }
    }

    #[cfg(feature = "parallel")]
    if cfg.splits(rows * cols) {
        use rayon::prelude::*;
        let partial: Vec<E::Elem> = (0..rows)
            .into_par_iter()
            .map(|i| fold::<E::Elem, Op>((0..cols).map(|j| prepared.get(i, j))))
            .collect();
        return Ok(fold::<E::Elem, Op>(partial.into_iter()));
    }

    Ok(fold::<E::Elem, Op>(
        (0..rows).flat_map(|i| (0..cols).map(move |j| (i, j))).map(|(i, j)| prepared.get(i, j)),
    ))
}

pub(crate) fn dot<L, R>(lhs: &L, rhs: &R) -> Result<L::Elem>
where
    L: VecExpr,
    R: VecExpr<Elem = L::Elem>,
{
    lhs.check()?;
    rhs.check()?;
    same_shape("dot product", (lhs.size(), 1), (rhs.size(), 1))?;
    let cfg = EvalConfig::default();
    let l = PreparedVec::new(lhs, &cfg)?;
    let r = PreparedVec::new(rhs, &cfg)?;
    if let (Some(a), Some(b)) = (l.as_slice(), r.as_slice()) {
        return Ok(simd::dot(a, b));
    }
    if !L::IS_DENSE {
        let mut acc = L::Elem::zero();
        lhs.for_each_nonzero(&mut |i, v| acc += v * r.get(i));
        return Ok(acc);
    }
    if !R::IS_DENSE {
        let mut acc = L::Elem::zero();
        rhs.for_each_nonzero(&mut |i, v| acc += l.get(i) * v);
        return Ok(acc);
    }
    Ok(fold::<L::Elem, Sum>((0..lhs.size()).map(|i| l.get(i) * r.get(i))))
}

pub(crate) fn trace<E: MatExpr>(expr: &E) -> Result<E::Elem> {
    expr.check()?;
    let (rows, cols) = (expr.rows(), expr.cols());
    if rows != cols {
        return Err(LinexprError::NonSquare {
            op: "trace",
            rows,
            cols,
        });
    }
    let prepared = PreparedMat::new(expr, &EvalConfig::default())?;
    Ok(fold::<E::Elem, Sum>((0..rows).map(|i| prepared.get(i, i))))
}

pub(crate) fn max_modulus<T: Scalar>(acc: T::Real, x: T) -> T::Real {
    let m = x.modulus();
    if m > acc {
        m
    } else {
        acc
    }
}

pub(crate) fn fold_vec_real<E, F>(expr: &E, f: F) -> Result<<E::Elem as Scalar>::Real>
where
    E: VecExpr,
    F: Fn(<E::Elem as Scalar>::Real, E::Elem) -> <E::Elem as Scalar>::Real,
{
    expr.check()?;
    let prepared = PreparedVec::new(expr, &EvalConfig::default())?;
    let mut acc = <E::Elem as Scalar>::Real::zero();
    if E::IS_DENSE {
        for i in 0..expr.size() {
            acc = f(acc, prepared.get(i));
        }
    } else {
        expr.for_each_nonzero(&mut |_, v| acc = f(acc, v));
    }
    Ok(acc)
}

pub(crate) fn fold_mat_real<E, F>(expr: &E, f: F) -> Result<<E::Elem as Scalar>::Real>
where
    E: MatExpr,
    F: Fn(<E::Elem as Scalar>::Real, E::Elem) -> <E::Elem as Scalar>::Real,
{
    expr.check()?;
    let prepared = PreparedMat::new(expr, &EvalConfig::default())?;
    let mut acc = <E::Elem as Scalar>::Real::zero();
    for i in 0..expr.rows() {
        if E::IS_DENSE {
            for j in 0..expr.cols() {
                acc = f(acc, prepared.get(i, j));
            }
        } else {
            expr.for_each_in_row(i, &mut |_, v| acc = f(acc, v));
        }
    }
    Ok(acc)
}
