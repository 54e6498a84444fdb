//! Base-case kernel: unblocked Householder QR of a plain dense tile, and application of
//! the resulting implicit `Q`.
//!
//! This is the leaf operation of the reduction tree. The tile is factored column by
//! column with rank-1 trailing updates, the classical unblocked sweep.

use crate::ApplyType;
use assert2::assert as fancy_assert;
use dyn_stack::{DynStack, SizeOverflow, StackReq};
use reborrow::*;
use tsqr_core::{
    householder::make_householder_in_place,
    mul::{gemv, ger},
    ColMut, ColRef, MatMut, MatRef, RealField,
};

/// Returns the stack requirements of [`factor_first`] for a tile with `ncols` columns.
pub fn factor_first_req<T>(ncols: usize) -> Result<StackReq, SizeOverflow> {
    StackReq::try_new::<T>(ncols)
}

/// Returns the stack requirements of [`apply_first`] when `C` has `ncols_c` columns.
pub fn apply_first_req<T>(ncols_c: usize) -> Result<StackReq, SizeOverflow> {
    StackReq::try_new::<T>(ncols_c)
}

/// Computes the QR factorization of the dense column-major `nrows * ncols` tile stored
/// in `a` with leading dimension `lda`.
///
/// On output, the upper triangle of `a` holds the `R` factor, the strict lower triangle
/// holds the essential parts of the `min(nrows, ncols)` Householder vectors, and `tau`
/// holds their scaling coefficients. Elements of `a` outside the first `ncols` columns'
/// `lda`-strided footprint are never read or written.
///
/// # Panics
///
/// Panics if `lda < nrows`, if `a` is too short for the tile, if `tau` is shorter than
/// `min(nrows, ncols)`, or if the stack is too small.
pub fn factor_first<T: RealField>(
    nrows: usize,
    ncols: usize,
    a: &mut [T],
    lda: usize,
    tau: &mut [T],
    stack: DynStack<'_>,
) {
    fancy_assert!(tau.len() >= nrows.min(ncols));
    let a = MatMut::from_slice(a, nrows, ncols, lda);
    factor_first_impl(a, tau, stack);
}

fn factor_first_impl<T: RealField>(mut a: MatMut<'_, T>, tau: &mut [T], stack: DynStack<'_>) {
    let m = a.nrows();
    let n = a.ncols();
    let size = m.min(n);
    if size == 0 {
        return;
    }

    let (mut work, _) = stack.make_with(n, |_| T::zero());

    for k in 0..size {
        let (col_left, rest) = a.rb_mut().split_at_col(k + 1);
        let (mut head, mut tail) = col_left.col(k).subrows(k, m - k).split_at(1);

        let (tau_k, beta) = make_householder_in_place(tail.rb_mut(), head[0]);
        head[0] = beta;
        tau[k] = tau_k;

        if k + 1 < n {
            let rest = rest.submatrix(k, 0, m - k, n - k - 1);
            let (mut rest_top, mut rest_bot) = rest.split_at_row(1);

            let work = &mut work[..n - k - 1];
            gemv(
                b'T',
                T::one(),
                rest_bot.rb(),
                tail.rb(),
                T::zero(),
                ColMut::from_slice(work),
            );
            for j in 0..n - k - 1 {
                work[j] = work[j] + rest_top[(0, j)];
                rest_top[(0, j)] = rest_top[(0, j)] - tau_k * work[j];
            }
            ger(-tau_k, tail.rb(), ColRef::from_slice(work), rest_bot.rb_mut());
        }
    }
}

/// Multiplies the `nrows * ncols_c` matrix `C` in place by the implicit `Q` (or `Q^T`,
/// per `apply_type`) produced by [`factor_first`] on a tile with `ncols_q` columns.
///
/// `a` and `tau` are the outputs of [`factor_first`]; only the strict lower triangle of
/// `a` and the first `ncols_q` entries of `tau` are read.
///
/// # Panics
///
/// Panics if the buffers are too short for their stated dimensions, if
/// `ncols_q > nrows`, or if the stack is too small.
pub fn apply_first<T: RealField>(
    apply_type: ApplyType,
    nrows: usize,
    ncols_c: usize,
    ncols_q: usize,
    a: &[T],
    lda: usize,
    tau: &[T],
    c: &mut [T],
    ldc: usize,
    stack: DynStack<'_>,
) {
    fancy_assert!(ncols_q <= nrows);
    fancy_assert!(tau.len() >= ncols_q);
    let a = MatRef::from_slice(a, nrows, ncols_q, lda);
    let c = MatMut::from_slice(c, nrows, ncols_c, ldc);
    apply_first_impl(apply_type, a, tau, c, stack);
}

fn apply_first_impl<T: RealField>(
    apply_type: ApplyType,
    a: MatRef<'_, T>,
    tau: &[T],
    mut c: MatMut<'_, T>,
    stack: DynStack<'_>,
) {
    let ncols_q = a.ncols();
    let ncols_c = c.ncols();
    let (mut work, _) = stack.make_with(ncols_c, |_| T::zero());

    match apply_type {
        // Q = H_0 H_1 ... H_{k-1}, so Q * C applies the last reflector first.
        ApplyType::NoTranspose => {
            for j in (0..ncols_q).rev() {
                apply_step(a, tau[j], j, c.rb_mut(), &mut work);
            }
        }
        ApplyType::Transpose => {
            for j in 0..ncols_q {
                apply_step(a, tau[j], j, c.rb_mut(), &mut work);
            }
        }
    }
}

// Applies H_j = I - tau_j v_j v_j^T to rows j.. of C, with v_j = (1, A[j+1.., j]).
fn apply_step<T: RealField>(
    a: MatRef<'_, T>,
    tau_j: T,
    j: usize,
    c: MatMut<'_, T>,
    work: &mut [T],
) {
    let m = a.nrows();
    let ncols_c = c.ncols();
    let v_tail = a.col(j).subrows(j + 1, m - j - 1);
    let (mut c_head, mut c_tail) = c.split_at_row(j + 1);

    let work = &mut work[..ncols_c];
    gemv(
        b'T',
        T::one(),
        c_tail.rb(),
        v_tail,
        T::zero(),
        ColMut::from_slice(work),
    );
    for i in 0..ncols_c {
        work[i] = work[i] + c_head[(j, i)];
        c_head[(j, i)] = c_head[(j, i)] - tau_j * work[i];
    }
    ger(-tau_j, v_tail, ColRef::from_slice(work), c_tail.rb_mut());
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use assert_approx_eq::assert_approx_eq;
    use dyn_stack::GlobalMemBuffer;
    use tsqr_core::Mat;

    use super::*;

    macro_rules! placeholder_stack {
        () => {
            DynStack::new(&mut GlobalMemBuffer::new(StackReq::new::<f64>(1024 * 1024)))
        };
    }

    use rand::prelude::*;
    thread_local! {
        static RNG: RefCell<StdRng> = RefCell::new(StdRng::seed_from_u64(0));
    }

    fn random_value() -> f64 {
        RNG.with(|rng| rng.borrow_mut().gen::<f64>())
    }

    fn frobenius(m: &Mat<f64>) -> f64 {
        let mut acc = 0.0;
        for j in 0..m.ncols() {
            for i in 0..m.nrows() {
                acc += m[(i, j)] * m[(i, j)];
            }
        }
        acc.sqrt()
    }

    // Builds the dense Q by applying the implicit factors to the identity.
    fn dense_q(nrows: usize, ncols_q: usize, factored: &Mat<f64>, tau: &[f64]) -> Mat<f64> {
        let mut q = Mat::with_dims(|i, j| if i == j { 1.0 } else { 0.0 }, nrows, nrows);
        apply_first(
            ApplyType::NoTranspose,
            nrows,
            nrows,
            ncols_q,
            factored.as_slice(),
            nrows,
            tau,
            q.as_mut_slice(),
            nrows,
            placeholder_stack!(),
        );
        q
    }

    #[test]
    fn factor_four_by_two() {
        // Columns (1, 1, 1, 1) and (1, 2, 3, 4).
        let mut a = Mat::with_dims(|i, j| if j == 0 { 1.0 } else { (i + 1) as f64 }, 4, 2);
        let mut tau = [0.0f64; 2];

        factor_first(4, 2, a.as_mut_slice(), 4, &mut tau, placeholder_stack!());

        assert_approx_eq!(tau[0], 1.5);
        assert_approx_eq!(tau[1], 1.0);
        assert_approx_eq!(a[(0, 0)], -2.0);
        assert_approx_eq!(a[(0, 1)], -5.0);
        assert_approx_eq!(a[(1, 1)], -5.0f64.sqrt());

        // Essential parts of the two Householder vectors.
        for i in 1..4 {
            assert_approx_eq!(a[(i, 0)], 1.0 / 3.0);
        }
        assert_approx_eq!(a[(2, 1)], 1.0 / 5.0f64.sqrt());
        assert_approx_eq!(a[(3, 1)], 2.0 / 5.0f64.sqrt());
    }

    #[test]
    fn reconstruct_random_tile() {
        for (m, n) in [(4, 4), (6, 3), (8, 2), (5, 1)] {
            let orig = Mat::with_dims(|_, _| random_value() - 0.5, m, n);
            let mut a = orig.clone();
            let mut tau = vec![0.0f64; n];

            factor_first(m, n, a.as_mut_slice(), m, &mut tau, placeholder_stack!());

            let q = dense_q(m, n, &a, &tau);

            // Q^T Q == I.
            let mut qtq_err = Mat::zeros(m, m);
            for i in 0..m {
                for j in 0..m {
                    let mut acc = 0.0;
                    for k in 0..m {
                        acc += q[(k, i)] * q[(k, j)];
                    }
                    qtq_err[(i, j)] = acc - if i == j { 1.0 } else { 0.0 };
                }
            }
            assert!(frobenius(&qtq_err) < 1e-13);

            // Q R == A.
            let mut resid = Mat::zeros(m, n);
            for i in 0..m {
                for j in 0..n {
                    let mut acc = 0.0;
                    for k in 0..=j.min(m - 1) {
                        acc += q[(i, k)] * a[(k, j)];
                    }
                    resid[(i, j)] = acc - orig[(i, j)];
                }
            }
            assert!(frobenius(&resid) < 1e-13);
        }
    }

    #[test]
    fn transpose_apply_yields_r() {
        let (m, n) = (7, 3);
        let orig = Mat::with_dims(|_, _| random_value() - 0.5, m, n);
        let mut a = orig.clone();
        let mut tau = vec![0.0f64; n];

        factor_first(m, n, a.as_mut_slice(), m, &mut tau, placeholder_stack!());

        // Q^T A leaves R on top and zeros below.
        let mut c = orig.clone();
        apply_first(
            ApplyType::Transpose,
            m,
            n,
            n,
            a.as_slice(),
            m,
            &tau,
            c.as_mut_slice(),
            m,
            placeholder_stack!(),
        );

        for j in 0..n {
            for i in 0..m {
                if i <= j {
                    assert_approx_eq!(c[(i, j)], a[(i, j)], 1e-13);
                } else {
                    assert_approx_eq!(c[(i, j)], 0.0, 1e-13);
                }
            }
        }
    }

    #[test]
    fn apply_roundtrip() {
        let (m, n, nc) = (6, 4, 3);
        let mut a = Mat::with_dims(|_, _| random_value() - 0.5, m, n);
        let mut tau = vec![0.0f64; n];
        factor_first(m, n, a.as_mut_slice(), m, &mut tau, placeholder_stack!());

        let orig_c = Mat::with_dims(|_, _| random_value() - 0.5, m, nc);
        let mut c = orig_c.clone();

        for order in [
            [ApplyType::NoTranspose, ApplyType::Transpose],
            [ApplyType::Transpose, ApplyType::NoTranspose],
        ] {
            for apply_type in order {
                apply_first(
                    apply_type,
                    m,
                    nc,
                    n,
                    a.as_slice(),
                    m,
                    &tau,
                    c.as_mut_slice(),
                    m,
                    placeholder_stack!(),
                );
            }
            for j in 0..nc {
                for i in 0..m {
                    assert_approx_eq!(c[(i, j)], orig_c[(i, j)], 1e-14);
                }
            }
        }
    }

    #[test]
    fn loose_leading_dimension_matches_tight() {
        let (m, n) = (5, 3);
        let lda = 8;
        let orig = Mat::with_dims(|_, _| random_value() - 0.5, m, n);

        let mut tight = orig.clone();
        let mut tau_tight = vec![0.0f64; n];
        factor_first(
            m,
            n,
            tight.as_mut_slice(),
            m,
            &mut tau_tight,
            placeholder_stack!(),
        );

        let mut loose = vec![f64::NAN; lda * n];
        for j in 0..n {
            for i in 0..m {
                loose[i + j * lda] = orig[(i, j)];
            }
        }
        let mut tau_loose = vec![0.0f64; n];
        factor_first(m, n, &mut loose, lda, &mut tau_loose, placeholder_stack!());

        for j in 0..n {
            assert_eq!(tau_tight[j].to_bits(), tau_loose[j].to_bits());
            for i in 0..m {
                assert_eq!(tight[(i, j)].to_bits(), loose[i + j * lda].to_bits());
            }
            // Padding rows between columns are never touched.
            for i in m..lda {
                assert!(loose[i + j * lda].is_nan());
            }
        }
    }

    #[test]
    fn empty_dimensions_are_no_ops() {
        let mut a: [f64; 0] = [];
        let mut tau: [f64; 0] = [];
        factor_first(0, 0, &mut a, 0, &mut tau, placeholder_stack!());

        let mut c = [1.0f64, 2.0];
        apply_first(
            ApplyType::Transpose,
            2,
            1,
            0,
            &[],
            2,
            &[],
            &mut c,
            2,
            placeholder_stack!(),
        );
        assert_eq!(c, [1.0, 2.0]);
    }
}
