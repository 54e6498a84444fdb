//! Restricted BLAS-2 micro-kernels.
//!
//! These are the only two dense products the factorization kernels are allowed to use.
//! They follow the reference BLAS loop order exactly, so that results are bit-wise
//! reproducible across platforms for a given scalar type.

use crate::{ColMut, ColRef, MatMut, MatRef, RealField};
use assert2::{assert as fancy_assert, debug_assert as fancy_debug_assert};
use reborrow::*;

/// Rank-1 update `A += alpha * x * y^T`.
///
/// Vector strides are carried by the views and may be negative. Columns of `A` whose
/// corresponding element of `y` is exactly zero are skipped entirely, matching the
/// reference BLAS `GER`: they are not touched, not even by a multiplication by zero.
pub fn ger<T: RealField>(alpha: T, x: ColRef<'_, T>, y: ColRef<'_, T>, mut a: MatMut<'_, T>) {
    fancy_debug_assert!(x.nrows() == a.nrows());
    fancy_debug_assert!(y.nrows() == a.ncols());

    let m = a.nrows();
    let n = a.ncols();
    if m == 0 || n == 0 || alpha == T::zero() {
        return;
    }

    for j in 0..n {
        let yj = unsafe { *y.get_unchecked(j) };
        if yj == T::zero() {
            continue;
        }
        let temp = alpha * yj;
        for i in 0..m {
            unsafe {
                let aij = a.rb_mut().get_unchecked(i, j);
                *aij = *aij + *x.get_unchecked(i) * temp;
            }
        }
    }
}

/// Matrix-vector product `y = alpha * op(A) * x + beta * y`, with `op` selected by
/// `trans`: `b'N'`/`b'n'` for `A`, `b'T'`/`b't'` for `A^T`.
///
/// When `beta` is zero, `y` is overwritten rather than scaled, so stale NaN or infinity
/// payloads in `y` do not propagate into the result.
///
/// # Panics
///
/// Panics if `x` or `y` does not have unit stride, or if `trans` is not one of the four
/// accepted bytes.
pub fn gemv<T: RealField>(
    trans: u8,
    alpha: T,
    a: MatRef<'_, T>,
    x: ColRef<'_, T>,
    beta: T,
    mut y: ColMut<'_, T>,
) {
    fancy_assert!(
        x.row_stride() == 1 && y.row_stride() == 1,
        "gemv: only unit stride vectors are supported"
    );
    let no_trans = trans == b'N' || trans == b'n';
    fancy_assert!(no_trans || trans == b'T' || trans == b't');

    let m = a.nrows();
    let n = a.ncols();
    if no_trans {
        fancy_debug_assert!(x.nrows() == n);
        fancy_debug_assert!(y.nrows() == m);
    } else {
        fancy_debug_assert!(x.nrows() == m);
        fancy_debug_assert!(y.nrows() == n);
    }

    if beta == T::zero() {
        for i in 0..y.nrows() {
            y[i] = T::zero();
        }
    } else if beta != T::one() {
        for i in 0..y.nrows() {
            y[i] = beta * y[i];
        }
    }
    if alpha == T::zero() || m == 0 || n == 0 {
        return;
    }

    if no_trans {
        for j in 0..n {
            let xj = unsafe { *x.get_unchecked(j) };
            if xj == T::zero() {
                continue;
            }
            let temp = alpha * xj;
            for i in 0..m {
                unsafe {
                    let yi = y.rb_mut().get_unchecked(i);
                    *yi = *yi + temp * *a.get_unchecked(i, j);
                }
            }
        }
    } else {
        for j in 0..n {
            let mut temp = T::zero();
            for i in 0..m {
                unsafe {
                    temp = temp + *a.get_unchecked(i, j) * *x.get_unchecked(i);
                }
            }
            y[j] = y[j] + alpha * temp;
        }
    }
}
