use approx::assert_relative_eq;
use linexpr::prelude::*;
use linexpr::{LinexprError, MatMul, MatZip, Plus, Strategy, Trans};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::StandardNormal;

fn random_square(n: usize, seed: u64) -> DynamicMatrix<f64> {
    DynamicMatrix::random(n, n, &mut StdRng::seed_from_u64(seed), &StandardNormal)
}

#[test]
fn test_self_product_matches_explicit_temporary() {
    let original = random_square(7, 21);
    let reference = (&original * &original).eval().unwrap();

    let mut a = original.clone();
    let strategy = a
        .update_with(&EvalConfig::serial(), |m| MatMul::new(m, m))
        .unwrap();
    assert_eq!(strategy, Strategy::Buffered);
    for (x, y) in a.as_slice().iter().zip(reference.as_slice()) {
        assert_relative_eq!(*x, *y, epsilon = 1e-12);
    }

    let mut fixed = StaticMatrix::<f64, 2, 2>::from_rows([[1.0, 1.0], [0.0, 1.0]]);
    fixed.update(|m| m * m * m).unwrap();
    assert_eq!(fixed.as_slice(), &[1.0, 3.0, 0.0, 1.0]);
}

#[test]
fn test_in_place_transpose() {
    let mut a = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
    let strategy = a
        .update_with(&EvalConfig::serial(), |m| Trans::new(m))
        .unwrap();
    assert_eq!(strategy, Strategy::Buffered);
    assert_eq!(a.as_slice(), &[1.0, 4.0, 7.0, 2.0, 5.0, 8.0, 3.0, 6.0, 9.0]);
}

#[test]
fn test_elementwise_self_update_writes_directly() {
    let mut v = DynamicVector::from_vec(vec![1.0, 2.0, 3.0]);
    let strategy = v
        .update_with(&EvalConfig::serial(), |x| x * 2.0_f64 + x)
        .unwrap();
    assert_eq!(strategy, Strategy::Direct);
    assert_eq!(v.as_slice(), &[3.0, 6.0, 9.0]);

    let mut m = DynamicMatrix::<f64>::identity(3);
    m.update(|x| MatZip::<_, _, Plus>::new(x, x)).unwrap();
    assert_eq!(m.trace().unwrap(), 6.0);
}

#[test]
fn test_partial_overlap_is_buffered() {
    // Shift rows down by one: the source block overlaps the target block.
    let mut m = DynamicMatrix::<i32>::from_fn(4, 3, |i, j| (10 * i + j) as i32);
    m.update_submatrix(1, 0, 3, 3, |whole| whole.submatrix(0, 0, 3, 3).unwrap())
        .unwrap();
    let expected = DynamicMatrix::<i32>::from_rows(&[[0, 1, 2], [0, 1, 2], [10, 11, 12], [20, 21, 22]]);
    assert_eq!(m, expected);

    let mut v = DynamicVector::from_vec(vec![1, 2, 3, 4, 5]);
    v.update_subvector(0, 4, |whole| whole.subvector(1, 4).unwrap() * 10_i32)
        .unwrap();
    assert_eq!(v.as_slice(), &[20, 30, 40, 50, 5]);
}

#[test]
fn test_disjoint_blocks_write_directly() {
    let mut m = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
    m.update_submatrix(1, 0, 1, 2, |whole| whole.submatrix(0, 0, 1, 2).unwrap())
        .unwrap();
    assert_eq!(m.as_slice(), &[1.0, 2.0, 1.0, 2.0]);
}

#[test]
fn test_alias_check_off_trusts_the_caller() {
    let mut m = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
    let off = EvalConfig::serial().with_alias_check(AliasCheck::Off);
    let strategy = m.update_with(&off, |x| x + x).unwrap();
    assert_eq!(strategy, Strategy::Direct);
    assert_eq!(m.as_slice(), &[2.0, 4.0, 6.0, 8.0]);

    // Products are buffered regardless of the run-time check.
    let strategy = m.update_with(&off, |x| x * x).unwrap();
    assert_eq!(strategy, Strategy::Buffered);
    assert_eq!(m.as_slice(), &[28.0, 40.0, 60.0, 88.0]);
}

#[test]
fn test_update_keeps_extents() {
    let mut m = DynamicMatrix::<f64>::zeros(2, 3);
    let err = m.update(|x| x * x.t()).unwrap_err();
    assert_eq!(
        err,
        LinexprError::ShapeMismatch {
            op: "update",
            lhs: (2, 3),
            rhs: (2, 2)
        }
    );
    assert_eq!((m.rows(), m.cols()), (2, 3));
}

#[test]
fn test_compound_multiply_uses_buffer() {
    let mut a = DynamicMatrix::<f64>::from_rows(&[[0.0, 1.0], [1.0, 0.0]]);
    let b = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
    a *= &b;
    assert_eq!(a.as_slice(), &[3.0, 4.0, 1.0, 2.0]);
}

#[test]
fn test_symmetric_target() {
    let mut s = SymmetricMatrix::<f64>::new(3);
    s.proxy(0, 1).unwrap().set(5.0);
    assert_eq!(s.at(1, 0).unwrap(), 5.0);

    // A^T A is symmetric.
    let a = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0], [0.0, 1.0], [1.0, 1.0]]);
    s.assign(a.t() * &a).unwrap();
    assert_eq!(s.size(), 2);
    assert_eq!(s.at(0, 1).unwrap(), s.at(1, 0).unwrap());

    let before = s.clone();
    let asym = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
    assert_eq!(
        s.assign(&asym).unwrap_err(),
        LinexprError::NotSymmetric { row: 0, col: 1 }
    );
    assert_eq!(s, before);

    s.update(|x| x * x).unwrap();
    assert_eq!(s.at(0, 1).unwrap(), s.at(1, 0).unwrap());

    assert!(s
        .update_submatrix(0, 1, 1, 1, |_| DynamicMatrix::<f64>::from_rows(&[[-1.0]]))
        .is_err());
    assert_eq!(s.at(1, 0).unwrap(), s.at(0, 1).unwrap());
}

#[test]
fn test_views_derived_from_aliased_stay_checked() {
    let serial = EvalConfig::serial();
    let mut a = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
    let strategy = a
        .update_with(&serial, |m| {
            let block = m.submatrix(0, 0, 2, 2).unwrap();
            MatMul::new(block, m.t().t())
        })
        .unwrap();
    assert_eq!(strategy, Strategy::Buffered);
    assert_eq!(a.as_slice(), &[7.0, 10.0, 15.0, 22.0]);

    let mut v = DynamicVector::from_vec(vec![1.0, 2.0, 3.0]);
    let mut m = DynamicMatrix::<f64>::from_rows(&[[1.0, 1.0], [0.0, 1.0]]);
    let strategy = m
        .update_with(&serial, |x| {
            let first = x.row(0).unwrap();
            linexpr::outer(first, x.column(1).unwrap())
        })
        .unwrap();
    assert_eq!(strategy, Strategy::Buffered);
    assert_eq!(m.as_slice(), &[1.0, 1.0, 1.0, 1.0]);
    v.update(|x| x.subvector(0, 3).unwrap() * 2.0_f64).unwrap();
    assert_eq!(v.as_slice(), &[2.0, 4.0, 6.0]);
}
