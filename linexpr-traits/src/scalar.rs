//! Element type bounds for vectors, matrices and expression nodes.

use num_complex::Complex;
use num_traits::{One, Zero};
use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

/// Precision class of a BLAS-compatible element type.
///
/// Only the four types the reference BLAS routines are defined for carry a
/// kind; every other element type takes the generic kernel path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlasKind {
    /// `f32` (`s` routines)
    Single,
    /// `f64` (`d` routines)
    Double,
    /// `Complex<f32>` (`c` routines)
    ComplexSingle,
    /// `Complex<f64>` (`z` routines)
    ComplexDouble,
}

impl BlasKind {
    /// BLAS routine prefix character for this precision.
    pub fn prefix(self) -> char {
        match self {
            BlasKind::Single => 's',
            BlasKind::Double => 'd',
            BlasKind::ComplexSingle => 'c',
            BlasKind::ComplexDouble => 'z',
        }
    }

    /// Whether the kind is a complex type.
    pub fn is_complex(self) -> bool {
        matches!(self, BlasKind::ComplexSingle | BlasKind::ComplexDouble)
    }
}

/// Element type of every container and expression.
///
/// Reductions accumulate in `Self`, so no narrowing happens while summing.
/// `Real` is the type of moduli and norms: `f64` for `Complex<f64>`, the
/// type itself for real and integer types.
pub trait Scalar:
    Copy
    + Send
    + Sync
    + Debug
    + PartialEq
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + Zero
    + One
{
    /// Real counterpart used for moduli and norms.
    type Real: Scalar<Real = Self::Real> + PartialOrd;

    /// `Some` when BLAS routines can be called for this element type.
    const BLAS_KIND: Option<BlasKind> = None;

    /// Complex conjugate; identity for real types.
    #[inline(always)]
    fn conj(self) -> Self {
        self
    }

    /// Absolute value (modulus for complex types).
    fn modulus(self) -> Self::Real;

    /// Squared modulus, `x * conj(x)` projected onto the reals.
    fn modulus_sqr(self) -> Self::Real;

    /// Real part; the value itself for real types.
    fn re(self) -> Self::Real;

    /// Embed a real value.
    fn from_real(re: Self::Real) -> Self;
}

macro_rules! impl_scalar_signed_int {
    ($($t:ty),*) => {
        $(
            impl Scalar for $t {
                type Real = $t;

                #[inline(always)]
                fn modulus(self) -> $t {
                    self.abs()
                }

                #[inline(always)]
                fn modulus_sqr(self) -> $t {
                    self * self
                }

                #[inline(always)]
                fn re(self) -> $t {
                    self
                }

                #[inline(always)]
                fn from_real(re: $t) -> $t {
                    re
                }
            }
        )*
    };
}

impl_scalar_signed_int!(i8, i16, i32, i64, i128, isize);

macro_rules! impl_scalar_float {
    ($t:ty, $kind:expr, $ckind:expr) => {
        impl Scalar for $t {
            type Real = $t;
            const BLAS_KIND: Option<BlasKind> = Some($kind);

            #[inline(always)]
            fn modulus(self) -> $t {
                self.abs()
            }

            #[inline(always)]
            fn modulus_sqr(self) -> $t {
                self * self
            }

            #[inline(always)]
            fn re(self) -> $t {
                self
            }

            #[inline(always)]
            fn from_real(re: $t) -> $t {
                re
            }
        }

        impl Scalar for Complex<$t> {
            type Real = $t;
            const BLAS_KIND: Option<BlasKind> = Some($ckind);

            #[inline(always)]
            fn conj(self) -> Self {
                Complex::conj(&self)
            }

            #[inline(always)]
            fn modulus(self) -> $t {
                self.norm()
            }

            #[inline(always)]
            fn modulus_sqr(self) -> $t {
                self.norm_sqr()
            }

            #[inline(always)]
            fn re(self) -> $t {
                self.re
            }

            #[inline(always)]
            fn from_real(re: $t) -> Self {
                Complex::new(re, 0.0)
            }
        }
    };
}

impl_scalar_float!(f32, BlasKind::Single, BlasKind::ComplexSingle);
impl_scalar_float!(f64, BlasKind::Double, BlasKind::ComplexDouble);

/// Whether `T` can be handed to BLAS routines.
pub const fn is_blas_compatible<T: Scalar>() -> bool {
    T::BLAS_KIND.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::{Complex32, Complex64};

    fn assert_scalar<T: Scalar>() {}

    #[test]
    fn test_standard_types() {
        assert_scalar::<f32>();
        assert_scalar::<f64>();
        assert_scalar::<i32>();
        assert_scalar::<i64>();
        assert_scalar::<Complex32>();
        assert_scalar::<Complex64>();
    }

    #[test]
    fn test_blas_kind() {
        assert_eq!(f32::BLAS_KIND, Some(BlasKind::Single));
        assert_eq!(f64::BLAS_KIND, Some(BlasKind::Double));
        assert_eq!(Complex32::BLAS_KIND, Some(BlasKind::ComplexSingle));
        assert_eq!(Complex64::BLAS_KIND, Some(BlasKind::ComplexDouble));
        assert_eq!(i32::BLAS_KIND, None);
        assert!(is_blas_compatible::<f64>());
        assert!(!is_blas_compatible::<i64>());
        assert_eq!(BlasKind::ComplexDouble.prefix(), 'z');
        assert!(BlasKind::ComplexSingle.is_complex());
        assert!(!BlasKind::Double.is_complex());
    }

    #[test]
    fn test_modulus() {
        assert_eq!((-3i32).modulus(), 3);
        assert_eq!((-2.5f64).modulus(), 2.5);
        assert_eq!(Complex64::new(3.0, 4.0).modulus(), 5.0);
        assert_eq!(Complex64::new(3.0, 4.0).modulus_sqr(), 25.0);
        assert_eq!(Complex64::from_real(2.0), Complex64::new(2.0, 0.0));
        assert_eq!(Complex64::new(1.5, -2.0).re(), 1.5);
        assert_eq!((-7i64).re(), -7);
    }

    #[test]
    fn test_conj() {
        assert_eq!(2.0f64.conj(), 2.0);
        assert_eq!(
            Scalar::conj(Complex64::new(1.0, 2.0)),
            Complex64::new(1.0, -2.0)
        );
    }
}
