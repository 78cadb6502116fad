//! Type-level element operations carried by expression nodes.
//!
//! Every elementwise node is generic over a zero-sized marker type that
//! performs the actual arithmetic, so the operation is resolved at compile
//! time and no closure or enum is stored in the node:
//!
//! - [`UnaryOp`]: `f(x)` (`Identity`, `Negate`, `Conjugate`, `Modulus`, `SquareRoot`)
//! - [`BinaryOp`]: `f(x, y)` (`Plus`, `Minus`, `Times`, `Divide`)
//! - [`ReduceOp`]: associative folds (`Sum`, `Product`, `Minimum`, `Maximum`)
//!
//! `Identity` works for any `Copy` type; the other operations require
//! [`Scalar`].

use crate::scalar::Scalar;

// ---------------------------------------------------------------------------
// Unary operations
// ---------------------------------------------------------------------------

/// A unary elementwise operation `f(x)`.
pub trait UnaryOp<T>: Copy + Default + Send + Sync + 'static {
    /// Whether this operation is the identity (no-op).
    const IS_IDENTITY: bool = false;

    /// Whether this operation is `-x`, so it can fold into a scale factor.
    const IS_NEGATION: bool = false;

    /// Apply the operation to a value.
    fn apply(value: T) -> T;
}

/// f(x) = x
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity;

/// f(x) = -x
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Negate;

/// f(x) = conj(x); identity for real types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Conjugate;

/// f(x) = |x|, embedded back into the element type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modulus;

/// f(x) = sqrt(x) for floating-point element types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SquareRoot;

impl<T: Copy> UnaryOp<T> for Identity {
    const IS_IDENTITY: bool = true;

    #[inline(always)]
    fn apply(value: T) -> T {
        value
    }
}

impl<T: Scalar> UnaryOp<T> for Negate {
    const IS_NEGATION: bool = true;

    #[inline(always)]
    fn apply(value: T) -> T {
        -value
    }
}

impl<T: Scalar> UnaryOp<T> for Conjugate {
    #[inline(always)]
    fn apply(value: T) -> T {
        value.conj()
    }
}

impl<T: Scalar> UnaryOp<T> for Modulus {
    #[inline(always)]
    fn apply(value: T) -> T {
        T::from_real(value.modulus())
    }
}

impl<T: Scalar + num_traits::Float> UnaryOp<T> for SquareRoot {
    #[inline(always)]
    fn apply(value: T) -> T {
        value.sqrt()
    }
}

// ---------------------------------------------------------------------------
// Binary operations
// ---------------------------------------------------------------------------

/// Arithmetic class of a [`BinaryOp`].
///
/// Sums and differences distribute over their operands, so an evaluator may
/// assign each side separately; the other kinds need both values at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryKind {
    Plus,
    Minus,
    Times,
    Divide,
}

/// A binary elementwise operation `f(x, y)`.
pub trait BinaryOp<T>: Copy + Default + Send + Sync + 'static {
    /// Operator symbol, used in error messages and logs.
    const SYMBOL: &'static str;

    /// Arithmetic class of the operation.
    const KIND: BinaryKind;

    /// Apply the operation.
    fn apply(lhs: T, rhs: T) -> T;
}

/// f(x, y) = x + y
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Plus;

/// f(x, y) = x - y
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Minus;

/// f(x, y) = x * y (componentwise / Schur product)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Times;

/// f(x, y) = x / y
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Divide;

impl<T: Scalar> BinaryOp<T> for Plus {
    const SYMBOL: &'static str = "+";
    const KIND: BinaryKind = BinaryKind::Plus;

    #[inline(always)]
    fn apply(lhs: T, rhs: T) -> T {
        lhs + rhs
    }
}

impl<T: Scalar> BinaryOp<T> for Minus {
    const SYMBOL: &'static str = "-";
    const KIND: BinaryKind = BinaryKind::Minus;

    #[inline(always)]
    fn apply(lhs: T, rhs: T) -> T {
        lhs - rhs
    }
}

impl<T: Scalar> BinaryOp<T> for Times {
    const SYMBOL: &'static str = "*";
    const KIND: BinaryKind = BinaryKind::Times;

    #[inline(always)]
    fn apply(lhs: T, rhs: T) -> T {
        lhs * rhs
    }
}

impl<T: Scalar> BinaryOp<T> for Divide {
    const SYMBOL: &'static str = "/";
    const KIND: BinaryKind = BinaryKind::Divide;

    #[inline(always)]
    fn apply(lhs: T, rhs: T) -> T {
        lhs / rhs
    }
}

// ---------------------------------------------------------------------------
// Reductions
// ---------------------------------------------------------------------------

/// An associative fold over elements.
///
/// `empty()` is returned for reductions over zero elements.
pub trait ReduceOp<T>: Copy + Default + Send + Sync + 'static {
    /// Combine two partial results.
    fn combine(acc: T, value: T) -> T;

    /// Result of reducing an empty range.
    fn empty() -> T;
}

/// Sum of elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sum;

/// Product of elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Product;

/// Smallest element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Minimum;

/// Largest element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Maximum;

impl<T: Scalar> ReduceOp<T> for Sum {
    #[inline(always)]
    fn combine(acc: T, value: T) -> T {
        acc + value
    }

    fn empty() -> T {
        T::zero()
    }
}

impl<T: Scalar> ReduceOp<T> for Product {
    #[inline(always)]
    fn combine(acc: T, value: T) -> T {
        acc * value
    }

    fn empty() -> T {
        T::one()
    }
}

impl<T: Scalar + PartialOrd> ReduceOp<T> for Minimum {
    #[inline(always)]
    fn combine(acc: T, value: T) -> T {
        if value < acc {
            value
        } else {
            acc
        }
    }

    fn empty() -> T {
        T::zero()
    }
}

impl<T: Scalar + PartialOrd> ReduceOp<T> for Maximum {
    #[inline(always)]
    fn combine(acc: T, value: T) -> T {
        if value > acc {
            value
        } else {
            acc
        }
    }

    fn empty() -> T {
        T::zero()
    }
}

/// Fold an iterator with a reduction operation.
pub fn fold<T: Copy, Op: ReduceOp<T>>(mut values: impl Iterator<Item = T>) -> T {
    match values.next() {
        Some(first) => values.fold(first, Op::combine),
        None => Op::empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn test_identity_custom_type() {
        #[derive(Debug, Clone, Copy, PartialEq)]
        struct Opaque(u8);

        let x = Opaque(7);
        assert_eq!(<Identity as UnaryOp<Opaque>>::apply(x), x);
        assert!(<Identity as UnaryOp<Opaque>>::IS_IDENTITY);
    }

    #[test]
    fn test_unary_ops() {
        assert_eq!(<Negate as UnaryOp<f64>>::apply(2.0), -2.0);
        assert_eq!(<Modulus as UnaryOp<i32>>::apply(-4), 4);
        assert_eq!(<SquareRoot as UnaryOp<f64>>::apply(9.0), 3.0);
        assert_eq!(
            <Conjugate as UnaryOp<Complex64>>::apply(Complex64::new(3.0, 4.0)),
            Complex64::new(3.0, -4.0)
        );
        assert_eq!(
            <Modulus as UnaryOp<Complex64>>::apply(Complex64::new(3.0, 4.0)),
            Complex64::new(5.0, 0.0)
        );
        assert!(!<Negate as UnaryOp<f64>>::IS_IDENTITY);
    }

    #[test]
    fn test_binary_ops() {
        assert_eq!(<Plus as BinaryOp<i64>>::apply(2, 3), 5);
        assert_eq!(<Minus as BinaryOp<i64>>::apply(2, 3), -1);
        assert_eq!(<Times as BinaryOp<i64>>::apply(2, 3), 6);
        assert_eq!(<Divide as BinaryOp<f64>>::apply(3.0, 2.0), 1.5);
        assert_eq!(<Minus as BinaryOp<f64>>::SYMBOL, "-");
        assert_eq!(<Times as BinaryOp<f64>>::KIND, BinaryKind::Times);
        assert!(<Negate as UnaryOp<f64>>::IS_NEGATION);
        assert!(!<Conjugate as UnaryOp<f64>>::IS_NEGATION);
    }

    #[test]
    fn test_fold() {
        let v = [3.0, -1.0, 4.0, 1.5];
        assert_eq!(fold::<f64, Sum>(v.iter().copied()), 7.5);
        assert_eq!(fold::<f64, Product>(v.iter().copied()), -18.0);
        assert_eq!(fold::<f64, Minimum>(v.iter().copied()), -1.0);
        assert_eq!(fold::<f64, Maximum>(v.iter().copied()), 4.0);
        assert_eq!(fold::<f64, Sum>(std::iter::empty()), 0.0);
        assert_eq!(fold::<f64, Product>(std::iter::empty()), 1.0);
    }
}
