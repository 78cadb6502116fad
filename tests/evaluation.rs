use approx::assert_relative_eq;
use linexpr::prelude::*;
use linexpr::{cross, eval, inner, kron, outer, LinexprError, MatMul, MatVec, Strategy};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::StandardNormal;

fn random_matrix(rows: usize, cols: usize, seed: u64) -> DynamicMatrix<f64> {
    DynamicMatrix::random(rows, cols, &mut StdRng::seed_from_u64(seed), &StandardNormal)
}

fn random_vector(len: usize, seed: u64) -> DynamicVector<f64> {
    DynamicVector::random(len, &mut StdRng::seed_from_u64(seed), &StandardNormal)
}

fn assert_close<A, B>(a: &A, b: &B)
where
    A: MatExpr<Elem = f64>,
    B: MatExpr<Elem = f64>,
{
    assert_eq!((a.rows(), a.cols()), (b.rows(), b.cols()));
    for i in 0..a.rows() {
        for j in 0..a.cols() {
            assert_relative_eq!(a.get(i, j), b.get(i, j), epsilon = 1e-10, max_relative = 1e-10);
        }
    }
}

#[test]
fn test_identity_product_is_exact() {
    let a = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
    let b = DynamicMatrix::<f64, ColumnMajor>::identity(3);

    let product = eval(&a * &b).unwrap();
    assert_eq!(product, a);

    let mut portable = DynamicMatrix::<f64>::new(0, 0);
    portable
        .assign_with(&a * &b, &EvalConfig::serial().with_blas(false))
        .unwrap();
    assert_eq!(portable, a);
}

#[test]
fn test_scaled_sum() {
    let v = DynamicVector::from_vec(vec![1.0, 2.0, 3.0]);
    let s = 2.0_f64;
    let mut out = DynamicVector::<f64>::new(0);
    out.assign(&v * s + &v).unwrap();
    assert_eq!(out.as_slice(), &[3.0, 6.0, 9.0]);
}

#[test]
fn test_fixed_target_rejects_other_extents() {
    let big = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
    let mut small = StaticMatrix::<f64, 2, 2>::from_rows([[1.0, 0.0], [0.0, 1.0]]);
    let err = small.assign(&big).unwrap_err();
    assert_eq!(
        err,
        LinexprError::ShapeMismatch {
            op: "assignment",
            lhs: (2, 2),
            rhs: (3, 3)
        }
    );
    assert_eq!(small, StaticMatrix::identity());
}

#[test]
fn test_resizable_target_adopts_extents() {
    let a = random_matrix(4, 3, 1);
    let mut out = DynamicMatrix::<f64>::zeros(1, 1);
    out.assign(&a * 3.0_f64).unwrap();
    assert_eq!((out.rows(), out.cols()), (4, 3));
    assert_relative_eq!(out.at(3, 2).unwrap(), 3.0 * a.at(3, 2).unwrap());
}

#[test]
fn test_eval_is_idempotent() {
    let a = random_matrix(5, 4, 2);
    let b = random_matrix(5, 4, 3);
    let once = eval(&a + &b).unwrap();
    let twice = eval(eval(&a + &b).unwrap()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_addition_is_associative_for_integers() {
    let a = DynamicMatrix::<i64>::from_fn(3, 4, |i, j| (i * 7 + j) as i64);
    let b = DynamicMatrix::<i64>::from_fn(3, 4, |i, j| (i as i64) - (j as i64));
    let c = DynamicMatrix::<i64>::from_fn(3, 4, |i, j| (i * j) as i64 * 3);
    let left = eval((&a + &b) + &c).unwrap();
    let right = eval(&a + (&b + &c)).unwrap();
    assert_eq!(left, right);
    assert_eq!(left.at(2, 3).unwrap(), 14 + 3 + 2 - 3 + 18);
}

#[test]
fn test_product_distributes_over_sum() {
    let a = random_matrix(6, 5, 4);
    let b = random_matrix(6, 5, 5);
    let x = random_vector(5, 6);

    let lhs = ((&a + &b) * &x).eval().unwrap();
    let rhs = (&a * &x + &b * &x).eval().unwrap();
    for i in 0..6 {
        assert_relative_eq!(lhs[i], rhs[i], epsilon = 1e-10);
    }
}

#[test]
fn test_nested_products_match_explicit_temporaries() {
    let a = random_matrix(4, 6, 7);
    let b = random_matrix(6, 3, 8);
    let c = random_matrix(4, 3, 9);

    let ab = eval(&a * &b).unwrap();
    let expected = DynamicMatrix::<f64>::from_fn(4, 3, |i, j| {
        2.0 * ab.at(i, j).unwrap() - c.at(i, j).unwrap()
    });

    let mut out = DynamicMatrix::<f64>::new(0, 0);
    out.assign((&a * &b) * 2.0_f64 - &c).unwrap();
    assert_close(&out, &expected);

    // Sums distribute the assignment over their operands.
    let mut acc = c.clone();
    acc.add_assign((&a * &b) + (&a * &b)).unwrap();
    let doubled = DynamicMatrix::<f64>::from_fn(4, 3, |i, j| {
        c.at(i, j).unwrap() + 2.0 * ab.at(i, j).unwrap()
    });
    assert_close(&acc, &doubled);
}

#[test]
fn test_mixed_storage_orders() {
    let a = random_matrix(3, 4, 10);
    let mut a_cm = DynamicMatrix::<f64, ColumnMajor>::new(0, 0);
    a_cm.assign(&a).unwrap();
    assert_eq!(a_cm.at(2, 1).unwrap(), a.at(2, 1).unwrap());

    let diff = eval(&a - &a_cm).unwrap();
    assert_eq!(diff.norm().unwrap(), 0.0);

    let gram = eval(a_cm.t() * &a).unwrap();
    let expected = DynamicMatrix::<f64>::from_fn(4, 4, |i, j| {
        (0..3).map(|k| a.at(k, i).unwrap() * a.at(k, j).unwrap()).sum()
    });
    assert_close(&gram, &expected);
}

#[test]
fn test_views_as_targets() {
    let mut m = DynamicMatrix::<f64>::zeros(4, 4);
    let block = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
    m.submatrix_mut(1, 1, 2, 2).unwrap().assign(&block).unwrap();
    m.row_mut(0).unwrap().assign(DynamicVector::from_vec(vec![9.0; 4])).unwrap();
    m.band_mut(0).add_assign(StaticVector::from([1.0; 4])).unwrap();

    assert_eq!(m.at(0, 0).unwrap(), 10.0);
    assert_eq!(m.at(1, 1).unwrap(), 2.0);
    assert_eq!(m.at(2, 1).unwrap(), 3.0);
    assert_eq!(m.at(3, 3).unwrap(), 1.0);

    let mut view = m.submatrix_mut(0, 0, 2, 2).unwrap();
    assert!(view.assign(DynamicMatrix::<f64>::zeros(3, 3)).is_err());
}

#[test]
fn test_sparse_operands() {
    let s = CompressedMatrix::from_triplets(3, 4, vec![(0, 1, 2.0), (2, 3, -1.0), (1, 0, 4.0)])
        .unwrap();
    let dense = DynamicMatrix::<f64>::from_fn(3, 4, |i, j| s.at(i, j).unwrap());
    let x = DynamicVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);

    let y = (&s * &x).eval().unwrap();
    assert_eq!(y.as_slice(), &[4.0, 4.0, -4.0]);
    assert_eq!(y, (&dense * &x).eval().unwrap());

    let b = random_matrix(4, 2, 11);
    assert_close(&eval(&s * &b).unwrap(), &eval(&dense * &b).unwrap());
    assert_close(&eval(&s + &dense).unwrap(), &eval(&dense * 2.0_f64).unwrap());

    let sv = CompressedVector::from_pairs(4, vec![(3, 2.0), (0, 1.0)]).unwrap();
    assert_eq!(inner(&sv, &x).unwrap(), 9.0);
    let mut out = DynamicVector::from_vec(vec![5.0; 4]);
    out.assign(&sv).unwrap();
    assert_eq!(out.as_slice(), &[1.0, 0.0, 0.0, 2.0]);
}

#[test]
fn test_reductions() {
    let a = DynamicMatrix::<f64>::from_rows(&[[1.0, -2.0], [3.0, 4.0]]);
    assert_eq!(a.sum().unwrap(), 6.0);
    assert_eq!(a.trace().unwrap(), 5.0);
    assert_eq!(a.min().unwrap(), -2.0);
    assert_eq!(a.norm_l1().unwrap(), 10.0);
    assert_eq!(a.norm_inf().unwrap(), 4.0);
    assert_relative_eq!(a.norm().unwrap(), 30.0_f64.sqrt());

    assert_eq!((&a).row_sums().eval().unwrap().as_slice(), &[-1.0, 7.0]);
    assert_eq!((&a).col_sums().eval().unwrap().as_slice(), &[4.0, 2.0]);

    let v = DynamicVector::from_vec(vec![3.0, 4.0]);
    assert_eq!(v.norm().unwrap(), 5.0);
    assert_eq!(v.dot(&v).unwrap(), 25.0);
    assert_eq!((&a * &v).sum().unwrap(), -5.0 + 25.0);
}

#[test]
fn test_outer_kron_cross() {
    let u = DynamicVector::from_vec(vec![1.0, 2.0]);
    let v = DynamicVector::from_vec(vec![3.0, 4.0, 5.0]);
    let o = eval(outer(&u, &v)).unwrap();
    assert_eq!(o.as_slice(), &[3.0, 4.0, 5.0, 6.0, 8.0, 10.0]);

    let i2 = DynamicMatrix::<f64>::identity(2);
    let b = DynamicMatrix::<f64>::from_rows(&[[1.0, 2.0], [3.0, 4.0]]);
    let k = eval(kron(&i2, &b)).unwrap();
    assert_eq!((k.rows(), k.cols()), (4, 4));
    assert_eq!(k.at(3, 2).unwrap(), 3.0);
    assert_eq!(k.at(0, 3).unwrap(), 0.0);

    let x = StaticVector::from([1.0, 0.0, 0.0]);
    let y = StaticVector::from([0.0, 1.0, 0.0]);
    assert_eq!(cross(&x, &y).eval().unwrap().as_slice(), &[0.0, 0.0, 1.0]);
    assert!(matches!(
        cross(&u, &v).eval(),
        Err(LinexprError::ShapeMismatch { op: "cross product", .. })
    ));
}

#[test]
fn test_construction_mismatch_surfaces_on_assignment() {
    let a = DynamicMatrix::<f64>::zeros(2, 3);
    let b = DynamicMatrix::<f64>::zeros(3, 2);
    let sum = &a + &b;
    let mut out = DynamicMatrix::<f64>::new(0, 0);
    let err = out.assign(sum).unwrap_err();
    assert!(matches!(err, LinexprError::ShapeMismatch { op: "matrix addition", .. }));
    assert!(out.is_empty());

    assert!(MatMul::try_new(&a, &a).is_err());
    assert!(MatMul::try_new(&a, &b).is_ok());
}

#[test]
fn test_inner_dimension_mismatch_with_equal_shapes() {
    // Equal full shapes must not hide an inner-dimension mismatch.
    let a = DynamicMatrix::<f64>::zeros(2, 3);
    let mismatch = LinexprError::ShapeMismatch {
        op: "matrix product",
        lhs: (2, 3),
        rhs: (2, 3),
    };
    assert_eq!(MatMul::try_new(&a, &a).err(), Some(mismatch.clone()));
    assert_eq!(MatMul::new(&a, &a).eval().unwrap_err(), mismatch);

    let mut out = DynamicMatrix::<f64>::new(0, 0);
    assert_eq!(out.assign(&a * &a).unwrap_err(), mismatch);

    let column = DynamicMatrix::<f64>::zeros(3, 1);
    let x = DynamicVector::from_vec(vec![1.0, 2.0, 3.0]);
    assert_eq!(
        MatVec::try_new(&column, &x).err(),
        Some(LinexprError::ShapeMismatch {
            op: "matrix-vector product",
            lhs: (3, 1),
            rhs: (3, 1),
        })
    );
}

#[test]
fn test_sparse_product_mismatch_is_reported() {
    let sparse = CompressedMatrix::from_triplets(2, 3, [(0, 0, 1.0), (1, 2, 2.0)]).unwrap();
    let dense = DynamicMatrix::<f64>::zeros(2, 3);
    let err = MatMul::new(&sparse, &dense).eval().unwrap_err();
    assert_eq!(
        err,
        LinexprError::ShapeMismatch {
            op: "matrix product",
            lhs: (2, 3),
            rhs: (2, 3),
        }
    );

    let x = DynamicVector::from_vec(vec![1.0, 2.0]);
    let mut y = DynamicVector::<f64>::new(0);
    assert!(matches!(
        y.assign(&sparse * &x),
        Err(LinexprError::ShapeMismatch { op: "matrix-vector product", .. })
    ));
}

#[test]
fn test_complex_elements() {
    let v = DynamicVector::from_vec(vec![Complex64::new(1.0, 1.0), Complex64::new(0.0, 2.0)]);
    let c = (&v).conj().eval().unwrap();
    assert_eq!(c[0], Complex64::new(1.0, -1.0));
    assert_relative_eq!(v.sqr_norm().unwrap(), 6.0);
    assert_eq!(v.dot(&c).unwrap(), Complex64::new(6.0, 0.0));
}

#[test]
fn test_parallel_config_matches_serial() {
    let a = random_matrix(64, 48, 12);
    let b = random_matrix(64, 48, 13);
    let parallel = EvalConfig::default()
        .with_parallel(true)
        .with_parallel_threshold(1);

    let mut serial_out = DynamicMatrix::<f64>::new(0, 0);
    serial_out
        .assign_with(&a * 0.5_f64 + &b, &EvalConfig::serial())
        .unwrap();
    let mut parallel_out = DynamicMatrix::<f64>::new(0, 0);
    let strategy = parallel_out
        .assign_with(&a * 0.5_f64 + &b, &parallel)
        .unwrap();
    assert_eq!(strategy, Strategy::Direct);
    assert_eq!(serial_out, parallel_out);
}
