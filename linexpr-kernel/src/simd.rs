//! Contiguous slice kernels with optional pulp vectorization.
//!
//! Every routine accepts any [`Scalar`]; `f32` and `f64` slices are routed to
//! explicit SIMD loops when the `simd` feature is on. Other element types run
//! a plain loop, dispatched through [`dispatch_if_large`] so the compiler can
//! still vectorize it under the detected target features.

use linexpr_traits::Scalar;

/// Run `f` under runtime-detected target features.
#[inline(always)]
pub fn dispatch<R>(f: impl FnOnce() -> R) -> R {
    #[cfg(feature = "simd")]
    {
        pulp::Arch::new().dispatch(f)
    }
    #[cfg(not(feature = "simd"))]
    {
        f()
    }
}

/// [`dispatch`] for loops of at least 64 elements, a direct call otherwise.
#[inline(always)]
pub fn dispatch_if_large<R>(len: usize, f: impl FnOnce() -> R) -> R {
    if len >= 64 {
        dispatch(f)
    } else {
        f()
    }
}

/// Sum of all elements.
pub fn sum<T: Scalar>(xs: &[T]) -> T {
    #[cfg(feature = "simd")]
    {
        if let Some(v) = crate::cast_slice::<T, f64>(xs) {
            return crate::cast(vec_f64::sum(v)).unwrap_or_else(T::zero);
        }
        if let Some(v) = crate::cast_slice::<T, f32>(xs) {
            return crate::cast(vec_f32::sum(v)).unwrap_or_else(T::zero);
        }
    }
    dispatch_if_large(xs.len(), || {
        let mut acc = T::zero();
        for &x in xs {
            acc += x;
        }
        acc
    })
}

/// Unconjugated dot product `sum(x[i] * y[i])`.
///
/// # Panics
/// Panics if the slices differ in length.
pub fn dot<T: Scalar>(xs: &[T], ys: &[T]) -> T {
    assert_eq!(xs.len(), ys.len(), "dot: length mismatch");
    #[cfg(feature = "simd")]
    {
        if let (Some(a), Some(b)) = (
            crate::cast_slice::<T, f64>(xs),
            crate::cast_slice::<T, f64>(ys),
        ) {
            return crate::cast(vec_f64::dot(a, b)).unwrap_or_else(T::zero);
        }
        if let (Some(a), Some(b)) = (
            crate::cast_slice::<T, f32>(xs),
            crate::cast_slice::<T, f32>(ys),
        ) {
            return crate::cast(vec_f32::dot(a, b)).unwrap_or_else(T::zero);
        }
    }
    dispatch_if_large(xs.len(), || {
        let mut acc = T::zero();
        for (&x, &y) in xs.iter().zip(ys) {
            acc += x * y;
        }
        acc
    })
}

/// `ys += alpha * xs`.
///
/// # Panics
/// Panics if the slices differ in length.
pub fn axpy<T: Scalar>(alpha: T, xs: &[T], ys: &mut [T]) {
    assert_eq!(xs.len(), ys.len(), "axpy: length mismatch");
    #[cfg(feature = "simd")]
    {
        if let Some(a) = crate::cast::<T, f64>(alpha) {
            if let (Some(x), Some(y)) = (
                crate::cast_slice::<T, f64>(xs),
                crate::cast_slice_mut::<T, f64>(ys),
            ) {
                vec_f64::axpy(a, x, y);
                return;
            }
        }
        if let Some(a) = crate::cast::<T, f32>(alpha) {
            if let (Some(x), Some(y)) = (
                crate::cast_slice::<T, f32>(xs),
                crate::cast_slice_mut::<T, f32>(ys),
            ) {
                vec_f32::axpy(a, x, y);
                return;
            }
        }
    }
    let len = xs.len();
    dispatch_if_large(len, || {
        for (y, &x) in ys.iter_mut().zip(xs) {
            *y += alpha * x;
        }
    })
}

/// `ys *= alpha`.
pub fn scale<T: Scalar>(alpha: T, ys: &mut [T]) {
    #[cfg(feature = "simd")]
    {
        if let Some(a) = crate::cast::<T, f64>(alpha) {
            if let Some(y) = crate::cast_slice_mut::<T, f64>(ys) {
                vec_f64::scale(a, y);
                return;
            }
        }
        if let Some(a) = crate::cast::<T, f32>(alpha) {
            if let Some(y) = crate::cast_slice_mut::<T, f32>(ys) {
                vec_f32::scale(a, y);
                return;
            }
        }
    }
    let len = ys.len();
    dispatch_if_large(len, || {
        for y in ys.iter_mut() {
            *y *= alpha;
        }
    })
}

#[cfg(feature = "simd")]
macro_rules! pulp_kernels {
    (
        $module:ident, $t:ty,
        $as_simd:ident, $as_mut_simd:ident, $splat:ident,
        $add:ident, $mul:ident, $mul_add:ident, $reduce:ident
    ) => {
        mod $module {
            use pulp::{Simd, WithSimd};

            struct SumKernel<'a>(&'a [$t]);

            impl WithSimd for SumKernel<'_> {
                type Output = $t;

                #[inline(always)]
                fn with_simd<S: Simd>(self, simd: S) -> $t {
                    let (head, tail) = S::$as_simd(self.0);
                    let mut lanes = [simd.$splat(0.0); 4];
                    let mut chunks = head.chunks_exact(4);
                    for chunk in &mut chunks {
                        for (acc, &v) in lanes.iter_mut().zip(chunk) {
                            *acc = simd.$add(*acc, v);
                        }
                    }
                    for &v in chunks.remainder() {
                        lanes[0] = simd.$add(lanes[0], v);
                    }
                    let folded = simd.$add(simd.$add(lanes[0], lanes[1]), simd.$add(lanes[2], lanes[3]));
                    tail.iter().fold(simd.$reduce(folded), |acc, &x| acc + x)
                }
            }

            struct DotKernel<'a>(&'a [$t], &'a [$t]);

            impl WithSimd for DotKernel<'_> {
                type Output = $t;

                #[inline(always)]
                fn with_simd<S: Simd>(self, simd: S) -> $t {
                    let (a_head, a_tail) = S::$as_simd(self.0);
                    let (b_head, b_tail) = S::$as_simd(self.1);
                    let mut lanes = [simd.$splat(0.0); 4];
                    let mut a_chunks = a_head.chunks_exact(4);
                    let mut b_chunks = b_head.chunks_exact(4);
                    for (ca, cb) in (&mut a_chunks).zip(&mut b_chunks) {
                        for k in 0..4 {
                            lanes[k] = simd.$mul_add(ca[k], cb[k], lanes[k]);
                        }
                    }
                    for (&x, &y) in a_chunks.remainder().iter().zip(b_chunks.remainder()) {
                        lanes[0] = simd.$mul_add(x, y, lanes[0]);
                    }
                    let folded = simd.$add(simd.$add(lanes[0], lanes[1]), simd.$add(lanes[2], lanes[3]));
                    a_tail
                        .iter()
                        .zip(b_tail)
                        .fold(simd.$reduce(folded), |acc, (&x, &y)| acc + x * y)
                }
            }

            struct AxpyKernel<'a> {
                alpha: $t,
                x: &'a [$t],
                y: &'a mut [$t],
            }

            impl WithSimd for AxpyKernel<'_> {
                type Output = ();

                #[inline(always)]
                fn with_simd<S: Simd>(self, simd: S) {
                    let (x_head, x_tail) = S::$as_simd(self.x);
                    let (y_head, y_tail) = S::$as_mut_simd(self.y);
                    let alpha = simd.$splat(self.alpha);
                    for (y, &x) in y_head.iter_mut().zip(x_head) {
                        *y = simd.$mul_add(alpha, x, *y);
                    }
                    for (y, &x) in y_tail.iter_mut().zip(x_tail) {
                        *y += self.alpha * x;
                    }
                }
            }

            struct ScaleKernel<'a> {
                alpha: $t,
                y: &'a mut [$t],
            }

            impl WithSimd for ScaleKernel<'_> {
                type Output = ();

                #[inline(always)]
                fn with_simd<S: Simd>(self, simd: S) {
                    let (head, tail) = S::$as_mut_simd(self.y);
                    let alpha = simd.$splat(self.alpha);
                    for y in head.iter_mut() {
                        *y = simd.$mul(alpha, *y);
                    }
                    for y in tail.iter_mut() {
                        *y *= self.alpha;
                    }
                }
            }

            pub(super) fn sum(xs: &[$t]) -> $t {
                pulp::Arch::new().dispatch(SumKernel(xs))
            }

            pub(super) fn dot(xs: &[$t], ys: &[$t]) -> $t {
                pulp::Arch::new().dispatch(DotKernel(xs, ys))
            }

            pub(super) fn axpy(alpha: $t, x: &[$t], y: &mut [$t]) {
                pulp::Arch::new().dispatch(AxpyKernel { alpha, x, y })
            }

            pub(super) fn scale(alpha: $t, y: &mut [$t]) {
                pulp::Arch::new().dispatch(ScaleKernel { alpha, y })
            }
        }
    };
}

#[cfg(feature = "simd")]
pulp_kernels!(
    vec_f64, f64, as_simd_f64s, as_mut_simd_f64s, splat_f64s, add_f64s, mul_f64s, mul_add_f64s,
    reduce_sum_f64s
);

#[cfg(feature = "simd")]
pulp_kernels!(
    vec_f32, f32, as_simd_f32s, as_mut_simd_f32s, splat_f32s, add_f32s, mul_f32s, mul_add_f32s,
    reduce_sum_f32s
);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use num_complex::Complex64;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| (i as f64) * 0.25 - 3.0).collect()
    }

    #[test]
    fn test_sum_and_dot_f64() {
        for n in [0, 1, 7, 64, 131] {
            let x = ramp(n);
            let y: Vec<f64> = x.iter().map(|v| v * 2.0 + 1.0).collect();
            let expected_sum: f64 = x.iter().sum();
            let expected_dot: f64 = x.iter().zip(&y).map(|(a, b)| a * b).sum();
            assert_relative_eq!(sum(&x), expected_sum, epsilon = 1e-10);
            assert_relative_eq!(dot(&x, &y), expected_dot, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_axpy_and_scale_f32() {
        let x: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let mut y = vec![1.0f32; 100];
        axpy(2.0, &x, &mut y);
        assert!(y.iter().enumerate().all(|(i, &v)| v == 2.0 * i as f32 + 1.0));
        scale(0.5, &mut y);
        assert_eq!(y[10], 10.5);
    }

    #[test]
    fn test_generic_paths() {
        let x = vec![3i64; 70];
        assert_eq!(sum(&x), 210);
        assert_eq!(dot(&x, &x), 630);

        let z = vec![Complex64::new(1.0, 1.0); 3];
        let mut w = vec![Complex64::new(0.0, 0.0); 3];
        axpy(Complex64::new(0.0, 1.0), &z, &mut w);
        assert_eq!(w[2], Complex64::new(-1.0, 1.0));
        assert_eq!(dot(&z, &z), Complex64::new(0.0, 6.0));
    }
}
