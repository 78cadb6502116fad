//! Operator overloads.
//!
//! `+`, `-`, `*`, `/` and unary `-` on any operand build expression nodes;
//! nothing is evaluated here. Containers take part by reference (`&a + &b`)
//! or by value; views and expression nodes are cheap to move.
//!
//! `*` is overloaded on the kind of its right operand: a matrix times a
//! matrix is a [`MatMul`], times a vector a [`MatVec`], times a scalar a
//! [`MatScale`]. Vector times vector is componentwise. Scalars go on the
//! right (`&a * 2.0`).
//!
//! The compound operators (`+=`, `-=`, `*=`) on owned containers and mutable
//! views evaluate immediately and panic on error; the fallible forms are the
//! [`MatrixTarget`] and [`VectorTarget`] methods.

use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use linexpr_traits::{Divide, Minus, Negate, Plus, StorageOrder, Times};
use num_complex::Complex;

use crate::assign::{MatrixTarget, VectorTarget};
use crate::expr::{
    ColReduce, Cross, Kron, MatExpr, MatMap, MatMul, MatScale, MatUnary, MatVec, MatZip, Outer,
    RowReduce, Trans, VecExpr, VecMap, VecScale, VecUnary, VecZip,
};
use crate::storage::{
    Aliased, CompressedMatrix, CompressedVector, DynamicMatrix, DynamicVector, MatrixView,
    MatrixViewMut, StaticMatrix, StaticVector, SymmetricMatrix, VectorView, VectorViewMut,
};
use crate::{Result, Scalar};

// ============================================================================
// Operand kinds
// ============================================================================

/// Right operands that are matrices.
#[derive(Debug, Clone, Copy)]
pub struct MatKind;

/// Right operands that are vectors.
#[derive(Debug, Clone, Copy)]
pub struct VecKind;

/// Right operands that are scalars.
#[derive(Debug, Clone, Copy)]
pub struct ScalarKind;

/// Classifies a right operand of `*`.
pub trait Operand {
    type Kind;
}

macro_rules! scalar_operand {
    ($($t:ty),*) => {
        $(impl Operand for $t {
            type Kind = ScalarKind;
        })*
    };
}

scalar_operand!(f32, f64, i8, i16, i32, i64, i128, isize);

impl<T> Operand for Complex<T> {
    type Kind = ScalarKind;
}

/// `Self * R` for a matrix `Self`, selected by the kind `K` of `R`.
pub trait MatMulDispatch<R, K> {
    type Output;

    fn mul_dispatch(self, rhs: R) -> Self::Output;
}

impl<L, R> MatMulDispatch<R, MatKind> for L
where
    L: MatExpr,
    R: MatExpr<Elem = L::Elem>,
{
    type Output = MatMul<L, R>;

    fn mul_dispatch(self, rhs: R) -> MatMul<L, R> {
        MatMul::new(self, rhs)
    }
}

impl<L, R> MatMulDispatch<R, VecKind> for L
where
    L: MatExpr,
    R: VecExpr<Elem = L::Elem>,
{
    type Output = MatVec<L, R>;

    fn mul_dispatch(self, rhs: R) -> MatVec<L, R> {
        MatVec::new(self, rhs)
    }
}

impl<L, S> MatMulDispatch<S, ScalarKind> for L
where
    L: MatExpr<Elem = S>,
{
    type Output = MatScale<L, Times>;

    fn mul_dispatch(self, rhs: S) -> MatScale<L, Times> {
        MatScale::new(self, rhs)
    }
}

/// `Self * R` for a vector `Self`, selected by the kind `K` of `R`.
pub trait VecMulDispatch<R, K> {
    type Output;

    fn mul_dispatch(self, rhs: R) -> Self::Output;
}

impl<L, R> VecMulDispatch<R, VecKind> for L
where
    L: VecExpr,
    R: VecExpr<Elem = L::Elem>,
{
    type Output = VecZip<L, R, Times>;

    fn mul_dispatch(self, rhs: R) -> VecZip<L, R, Times> {
        VecZip::new(self, rhs)
    }
}

impl<L, S> VecMulDispatch<S, ScalarKind> for L
where
    L: VecExpr<Elem = S>,
{
    type Output = VecScale<L, Times>;

    fn mul_dispatch(self, rhs: S) -> VecScale<L, Times> {
        VecScale::new(self, rhs)
    }
}

// ============================================================================
// Binary and unary operators
// ============================================================================

macro_rules! impl_mat_ops {
    ([$($g:tt)*] $ty:ty) => {
        impl<$($g)*> Operand for $ty
        where
            $ty: MatExpr,
        {
            type Kind = MatKind;
        }

        impl<$($g)*, Rhs> Add<Rhs> for $ty
        where
            $ty: MatExpr,
            Rhs: MatExpr<Elem = <$ty as MatExpr>::Elem>,
        {
            type Output = MatZip<$ty, Rhs, Plus>;

            #[inline]
            fn add(self, rhs: Rhs) -> Self::Output {
                MatZip::new(self, rhs)
            }
        }

        impl<$($g)*, Rhs> Sub<Rhs> for $ty
        where
            $ty: MatExpr,
            Rhs: MatExpr<Elem = <$ty as MatExpr>::Elem>,
        {
            type Output = MatZip<$ty, Rhs, Minus>;

            #[inline]
            fn sub(self, rhs: Rhs) -> Self::Output {
                MatZip::new(self, rhs)
            }
        }

        impl<$($g)*, Rhs> Mul<Rhs> for $ty
        where
            Rhs: Operand,
            $ty: MatExpr + MatMulDispatch<Rhs, <Rhs as Operand>::Kind>,
        {
            type Output = <$ty as MatMulDispatch<Rhs, <Rhs as Operand>::Kind>>::Output;

            #[inline]
            fn mul(self, rhs: Rhs) -> Self::Output {
                self.mul_dispatch(rhs)
            }
        }

        impl<$($g)*, S> Div<S> for $ty
        where
            $ty: MatExpr<Elem = S>,
        {
            type Output = MatScale<$ty, Divide>;

            #[inline]
            fn div(self, rhs: S) -> Self::Output {
                MatScale::new(self, rhs)
            }
        }

        impl<$($g)*> Neg for $ty
        where
            $ty: MatExpr,
        {
            type Output = MatUnary<$ty, Negate>;

            #[inline]
            fn neg(self) -> Self::Output {
                MatUnary::new(self)
            }
        }
    };
}

macro_rules! impl_vec_ops {
    ([$($g:tt)*] $ty:ty) => {
        impl<$($g)*> Operand for $ty
        where
            $ty: VecExpr,
        {
            type Kind = VecKind;
        }

        impl<$($g)*, Rhs> Add<Rhs> for $ty
        where
            $ty: VecExpr,
            Rhs: VecExpr<Elem = <$ty as VecExpr>::Elem>,
        {
            type Output = VecZip<$ty, Rhs, Plus>;

            #[inline]
            fn add(self, rhs: Rhs) -> Self::Output {
                VecZip::new(self, rhs)
            }
        }

        impl<$($g)*, Rhs> Sub<Rhs> for $ty
        where
            $ty: VecExpr,
            Rhs: VecExpr<Elem = <$ty as VecExpr>::Elem>,
        {
            type Output = VecZip<$ty, Rhs, Minus>;

            #[inline]
            fn sub(self, rhs: Rhs) -> Self::Output {
                VecZip::new(self, rhs)
            }
        }

        impl<$($g)*, Rhs> Mul<Rhs> for $ty
        where
            Rhs: Operand,
            $ty: VecExpr + VecMulDispatch<Rhs, <Rhs as Operand>::Kind>,
        {
            type Output = <$ty as VecMulDispatch<Rhs, <Rhs as Operand>::Kind>>::Output;

            #[inline]
            fn mul(self, rhs: Rhs) -> Self::Output {
                self.mul_dispatch(rhs)
            }
        }

        impl<$($g)*, S> Div<S> for $ty
        where
            $ty: VecExpr<Elem = S>,
        {
            type Output = VecScale<$ty, Divide>;

            #[inline]
            fn div(self, rhs: S) -> Self::Output {
                VecScale::new(self, rhs)
            }
        }

        impl<$($g)*> Neg for $ty
        where
            $ty: VecExpr,
        {
            type Output = VecUnary<$ty, Negate>;

            #[inline]
            fn neg(self) -> Self::Output {
                VecUnary::new(self)
            }
        }
    };
}

// Containers and views.
impl_mat_ops!([T: Scalar, SO: StorageOrder] DynamicMatrix<T, SO>);
impl_mat_ops!(['a, T: Scalar, SO: StorageOrder] &'a DynamicMatrix<T, SO>);
impl_mat_ops!([T: Scalar, const M: usize, const N: usize, SO: StorageOrder] StaticMatrix<T, M, N, SO>);
impl_mat_ops!(['a, T: Scalar, const M: usize, const N: usize, SO: StorageOrder] &'a StaticMatrix<T, M, N, SO>);
impl_mat_ops!([T: Scalar] CompressedMatrix<T>);
impl_mat_ops!(['a, T: Scalar] &'a CompressedMatrix<T>);
impl_mat_ops!([T: Scalar] SymmetricMatrix<T>);
impl_mat_ops!(['a, T: Scalar] &'a SymmetricMatrix<T>);
impl_mat_ops!(['a, T: Scalar, SO: StorageOrder] MatrixView<'a, T, SO>);
impl_mat_ops!(['a, 'b, T: Scalar, SO: StorageOrder] &'b MatrixViewMut<'a, T, SO>);
impl_mat_ops!(['a, T: Scalar, SO: StorageOrder] Aliased<MatrixView<'a, T, SO>>);

impl_vec_ops!([T: Scalar] DynamicVector<T>);
impl_vec_ops!(['a, T: Scalar] &'a DynamicVector<T>);
impl_vec_ops!([T: Scalar, const N: usize] StaticVector<T, N>);
impl_vec_ops!(['a, T: Scalar, const N: usize] &'a StaticVector<T, N>);
impl_vec_ops!([T: Scalar] CompressedVector<T>);
impl_vec_ops!(['a, T: Scalar] &'a CompressedVector<T>);
impl_vec_ops!(['a, T: Scalar] VectorView<'a, T>);
impl_vec_ops!(['a, 'b, T: Scalar] &'b VectorViewMut<'a, T>);
impl_vec_ops!(['a, T: Scalar] Aliased<VectorView<'a, T>>);

// Expression nodes.
impl_mat_ops!([L, R, Op] MatZip<L, R, Op>);
impl_mat_ops!([E: MatExpr, Op] MatScale<E, Op>);
impl_mat_ops!([E, Op] MatUnary<E, Op>);
impl_mat_ops!([E, F] MatMap<E, F>);
impl_mat_ops!([L, R] MatMul<L, R>);
impl_mat_ops!([E] Trans<E>);
impl_mat_ops!([L, R] Outer<L, R>);
impl_mat_ops!([L, R] Kron<L, R>);

impl_vec_ops!([L, R, Op] VecZip<L, R, Op>);
impl_vec_ops!([E: VecExpr, Op] VecScale<E, Op>);
impl_vec_ops!([E, Op] VecUnary<E, Op>);
impl_vec_ops!([E, F] VecMap<E, F>);
impl_vec_ops!([M, V] MatVec<M, V>);
impl_vec_ops!([L, R] Cross<L, R>);
impl_vec_ops!([M, Op] RowReduce<M, Op>);
impl_vec_ops!([M, Op] ColReduce<M, Op>);

// ============================================================================
// Compound assignment
// ============================================================================

/// `Self *= R` for a matrix target, selected by the kind `K` of `R`.
pub trait MatMulAssignDispatch<R, K> {
    fn mul_assign_dispatch(&mut self, rhs: R) -> Result<()>;
}

impl<Tg, S> MatMulAssignDispatch<S, ScalarKind> for Tg
where
    Tg: MatrixTarget<Elem = S>,
    S: Scalar,
{
    fn mul_assign_dispatch(&mut self, rhs: S) -> Result<()> {
        self.update(|m| MatScale::<_, Times>::new(m, rhs))
    }
}

impl<Tg, R> MatMulAssignDispatch<R, MatKind> for Tg
where
    Tg: MatrixTarget,
    R: MatExpr<Elem = Tg::Elem>,
{
    fn mul_assign_dispatch(&mut self, rhs: R) -> Result<()> {
        self.update(|m| MatMul::new(m, rhs))
    }
}

/// `Self *= R` for a vector target: scaling or componentwise product.
pub trait VecMulAssignDispatch<R, K> {
    fn mul_assign_dispatch(&mut self, rhs: R) -> Result<()>;
}

impl<Tg, S> VecMulAssignDispatch<S, ScalarKind> for Tg
where
    Tg: VectorTarget<Elem = S>,
    S: Scalar,
{
    fn mul_assign_dispatch(&mut self, rhs: S) -> Result<()> {
        self.update(|v| VecScale::<_, Times>::new(v, rhs))
    }
}

impl<Tg, R> VecMulAssignDispatch<R, VecKind> for Tg
where
    Tg: VectorTarget,
    R: VecExpr<Elem = Tg::Elem>,
{
    fn mul_assign_dispatch(&mut self, rhs: R) -> Result<()> {
        self.update(|v| VecZip::<_, _, Times>::new(v, rhs))
    }
}

macro_rules! impl_mat_assign_ops {
    ([$($g:tt)*] $ty:ty) => {
        /// # Panics
        /// If the extents differ; see [`MatrixTarget::add_assign`].
        impl<$($g)*, Rhs> AddAssign<Rhs> for $ty
        where
            $ty: MatrixTarget,
            Rhs: MatExpr<Elem = <$ty as MatrixTarget>::Elem>,
        {
            fn add_assign(&mut self, rhs: Rhs) {
                if let Err(err) = MatrixTarget::add_assign(self, rhs) {
                    panic!("{err}");
                }
            }
        }

        /// # Panics
        /// If the extents differ; see [`MatrixTarget::sub_assign`].
        impl<$($g)*, Rhs> SubAssign<Rhs> for $ty
        where
            $ty: MatrixTarget,
            Rhs: MatExpr<Elem = <$ty as MatrixTarget>::Elem>,
        {
            fn sub_assign(&mut self, rhs: Rhs) {
                if let Err(err) = MatrixTarget::sub_assign(self, rhs) {
                    panic!("{err}");
                }
            }
        }

        /// # Panics
        /// If a matrix right operand is not square with the target's columns.
        impl<$($g)*, Rhs> MulAssign<Rhs> for $ty
        where
            Rhs: Operand,
            $ty: MatMulAssignDispatch<Rhs, <Rhs as Operand>::Kind>,
        {
            fn mul_assign(&mut self, rhs: Rhs) {
                if let Err(err) = self.mul_assign_dispatch(rhs) {
                    panic!("{err}");
                }
            }
        }
    };
}

macro_rules! impl_vec_assign_ops {
    ([$($g:tt)*] $ty:ty) => {
        /// # Panics
        /// If the lengths differ; see [`VectorTarget::add_assign`].
        impl<$($g)*, Rhs> AddAssign<Rhs> for $ty
        where
            $ty: VectorTarget,
            Rhs: VecExpr<Elem = <$ty as VectorTarget>::Elem>,
        {
            fn add_assign(&mut self, rhs: Rhs) {
                if let Err(err) = VectorTarget::add_assign(self, rhs) {
                    panic!("{err}");
                }
            }
        }

        /// # Panics
        /// If the lengths differ; see [`VectorTarget::sub_assign`].
        impl<$($g)*, Rhs> SubAssign<Rhs> for $ty
        where
            $ty: VectorTarget,
            Rhs: VecExpr<Elem = <$ty as VectorTarget>::Elem>,
        {
            fn sub_assign(&mut self, rhs: Rhs) {
                if let Err(err) = VectorTarget::sub_assign(self, rhs) {
                    panic!("{err}");
                }
            }
        }

        /// # Panics
        /// If a vector right operand has a different length.
        impl<$($g)*, Rhs> MulAssign<Rhs> for $ty
        where
            Rhs: Operand,
            $ty: VecMulAssignDispatch<Rhs, <Rhs as Operand>::Kind>,
        {
            fn mul_assign(&mut self, rhs: Rhs) {
                if let Err(err) = self.mul_assign_dispatch(rhs) {
                    panic!("{err}");
                }
            }
        }
    };
}

impl_mat_assign_ops!([T: Scalar, SO: StorageOrder] DynamicMatrix<T, SO>);
impl_mat_assign_ops!([T: Scalar, const M: usize, const N: usize, SO: StorageOrder] StaticMatrix<T, M, N, SO>);
impl_mat_assign_ops!([T: Scalar] SymmetricMatrix<T>);
impl_mat_assign_ops!(['a, T: Scalar, SO: StorageOrder] MatrixViewMut<'a, T, SO>);

impl_vec_assign_ops!([T: Scalar] DynamicVector<T>);
impl_vec_assign_ops!([T: Scalar, const N: usize] StaticVector<T, N>);
impl_vec_assign_ops!(['a, T: Scalar] VectorViewMut<'a, T>);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use linexpr_traits::ColumnMajor;

    #[test]
    fn test_mul_dispatch_by_kind() {
        let a = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
        let x = DynamicVector::from_vec(vec![1.0, -1.0]);

        let p: MatMul<_, _> = &a * &a;
        assert_eq!(p.eval().unwrap().as_slice(), &[7.0, 10.0, 15.0, 22.0]);
        let y: MatVec<_, _> = &a * &x;
        assert_eq!(y.eval().unwrap().as_slice(), &[-1.0, -1.0]);
        let s: MatScale<_, Times> = &a * 0.5_f64;
        assert_eq!(s.eval().unwrap().as_slice(), &[0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn test_vector_operators() {
        let u = DynamicVector::from_vec(vec![1.0, 2.0, 3.0]);
        let v = DynamicVector::from_vec(vec![4.0, 5.0, 6.0]);
        assert_eq!((&u + &v).eval().unwrap().as_slice(), &[5.0, 7.0, 9.0]);
        assert_eq!((&u * &v).eval().unwrap().as_slice(), &[4.0, 10.0, 18.0]);
        assert_eq!((-&u).eval().unwrap().as_slice(), &[-1.0, -2.0, -3.0]);
        assert_eq!((&v / 2.0).eval().unwrap().as_slice(), &[2.0, 2.5, 3.0]);
        assert_eq!((&v - &u * 2.0_f64).eval().unwrap().as_slice(), &[2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_mixed_order_sum() {
        let a = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
        let b = DynamicMatrix::<f64, ColumnMajor>::from_rows(&[[1.0, 1.0], [1.0, 1.0]]);
        let c = (&a - &b).eval().unwrap();
        assert_eq!(c.at(1, 0).unwrap(), 2.0);
    }

    #[test]
    fn test_compound_assignment() {
        let mut m = DynamicMatrix::<f64>::identity(2);
        let b = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
        m += &b;
        m -= DynamicMatrix::<f64>::identity(2);
        assert_eq!(m, b);
        m *= 2.0_f64;
        assert_eq!(m.as_slice(), &[2.0, 4.0, 6.0, 8.0]);
        m *= &b;
        assert_relative_eq!(m.as_slice()[0], 14.0);

        let mut v = StaticVector::from([1.0, 2.0]);
        v *= StaticVector::from([3.0, 4.0]);
        v += StaticVector::from([1.0, 1.0]);
        assert_eq!(v.as_slice(), &[4.0, 9.0]);
        v *= 0.5_f64;
        assert_eq!(v.as_slice(), &[2.0, 4.5]);
    }

    #[test]
    #[should_panic(expected = "shape mismatch")]
    fn test_compound_assignment_panics_on_mismatch() {
        let mut m = DynamicMatrix::<f64>::zeros(2, 2);
        m += DynamicMatrix::<f64>::zeros(3, 3);
    }
}
