//! Reduction-step kernels: QR factorizations of stacked tiles whose top block is a
//! known upper triangle, and application of the resulting implicit `Q`.
//!
//! Two structures arise in a TSQR reduction tree:
//!
//! - `[R; A]` with `R` upper triangular and `A` dense, the sequential step
//!   ([`factor_inner`]),
//! - `[R_top; R_bot]` with both blocks upper triangular, the parallel step
//!   ([`factor_pair`]).
//!
//! In both cases the reflector for column `k` keeps its head on the diagonal of the top
//! block and stores its essential part in column `k` of the bottom buffer, so the top
//! triangle stays triangular throughout and the known zero blocks are never read or
//! written. For the pair case the essential part has only `k + 1` active rows, since
//! rows of `R_bot` below its diagonal are zero and stay zero under the sweep.
//!
//! The arithmetic is restricted to the two micro-kernels of [`tsqr_core::mul`] plus
//! scalar loops, in a fixed order, so results are bit-wise reproducible for a given
//! scalar type.

use crate::ApplyType;
use assert2::assert as fancy_assert;
use dyn_stack::{DynStack, SizeOverflow, StackReq};
use reborrow::*;
use tsqr_core::{
    householder::make_householder_in_place,
    mul::{gemv, ger},
    ColMut, ColRef, MatMut, MatRef, RealField,
};

/// Returns the stack requirements of [`factor_inner`] for `ncols` columns.
pub fn factor_inner_req<T>(ncols: usize) -> Result<StackReq, SizeOverflow> {
    StackReq::try_new::<T>(ncols)
}

/// Returns the stack requirements of [`apply_inner`] when `C` has `ncols_c` columns.
pub fn apply_inner_req<T>(ncols_c: usize) -> Result<StackReq, SizeOverflow> {
    StackReq::try_new::<T>(ncols_c)
}

/// Returns the stack requirements of [`factor_pair`] for `ncols` columns.
pub fn factor_pair_req<T>(ncols: usize) -> Result<StackReq, SizeOverflow> {
    StackReq::try_new::<T>(ncols)
}

/// Returns the stack requirements of [`apply_pair`] when `C` has `ncols_c` columns.
pub fn apply_pair_req<T>(ncols_c: usize) -> Result<StackReq, SizeOverflow> {
    StackReq::try_new::<T>(ncols_c)
}

/// Computes the QR factorization of the stacked matrix `[R; A]`, where `R` is the upper
/// triangular `ncols * ncols` factor stored in `r` with leading dimension `ldr`, and
/// `A` is the dense `nrows * ncols` tile stored in `a` with leading dimension `lda`.
///
/// On output, the upper triangle of `r` holds the combined `R` factor, each column of
/// `a` holds the essential part of one Householder vector (all `nrows` rows are
/// active), and `tau` holds the scaling coefficients. The strict lower triangle of `r`
/// is never read or written.
///
/// # Panics
///
/// Panics if a buffer is too short for its stated dimensions, if `tau` is shorter than
/// `ncols`, or if the stack is too small.
pub fn factor_inner<T: RealField>(
    nrows: usize,
    ncols: usize,
    r: &mut [T],
    ldr: usize,
    a: &mut [T],
    lda: usize,
    tau: &mut [T],
    stack: DynStack<'_>,
) {
    fancy_assert!(tau.len() >= ncols);
    let r = MatMut::from_slice(r, ncols, ncols, ldr);
    let a = MatMut::from_slice(a, nrows, ncols, lda);
    factor_inner_impl(r, a, tau, stack);
}

fn factor_inner_impl<T: RealField>(
    mut r: MatMut<'_, T>,
    mut a: MatMut<'_, T>,
    tau: &mut [T],
    stack: DynStack<'_>,
) {
    let n = r.ncols();
    if n == 0 {
        return;
    }

    let (mut work, _) = stack.make_with(n, |_| T::zero());

    for k in 0..n {
        let (left, mut trailing) = a.rb_mut().split_at_col(k + 1);
        let mut v = left.col(k);

        let (tau_k, beta) = make_householder_in_place(v.rb_mut(), r[(k, k)]);
        r[(k, k)] = beta;
        tau[k] = tau_k;

        if k + 1 < n {
            let work = &mut work[..n - k - 1];
            gemv(
                b'T',
                T::one(),
                trailing.rb(),
                v.rb(),
                T::zero(),
                ColMut::from_slice(work),
            );
            for j in k + 1..n {
                work[j - k - 1] = work[j - k - 1] + r[(k, j)];
                r[(k, j)] = r[(k, j)] - tau_k * work[j - k - 1];
            }
            ger(-tau_k, v.rb(), ColRef::from_slice(work), trailing.rb_mut());
        }
    }
}

/// Multiplies the stacked `(ncols_q + nrows) * ncols_c` matrix `[C_top; C_bot]` in
/// place by the implicit `Q` (or `Q^T`, per `apply_type`) produced by [`factor_inner`].
///
/// `a` and `tau` are the outputs of [`factor_inner`]: `a` holds the Householder vectors
/// in its columns, `C_top` is `ncols_q * ncols_c`, and `C_bot` is `nrows * ncols_c`.
///
/// # Panics
///
/// Panics if a buffer is too short for its stated dimensions, if `tau` is shorter than
/// `ncols_q`, or if the stack is too small.
pub fn apply_inner<T: RealField>(
    apply_type: ApplyType,
    nrows: usize,
    ncols_c: usize,
    ncols_q: usize,
    a: &[T],
    lda: usize,
    tau: &[T],
    c_top: &mut [T],
    ldc_top: usize,
    c_bot: &mut [T],
    ldc_bot: usize,
    stack: DynStack<'_>,
) {
    fancy_assert!(tau.len() >= ncols_q);
    let a = MatRef::from_slice(a, nrows, ncols_q, lda);
    let c_top = MatMut::from_slice(c_top, ncols_q, ncols_c, ldc_top);
    let c_bot = MatMut::from_slice(c_bot, nrows, ncols_c, ldc_bot);
    apply_inner_impl(apply_type, a, tau, c_top, c_bot, stack);
}

fn apply_inner_impl<T: RealField>(
    apply_type: ApplyType,
    a: MatRef<'_, T>,
    tau: &[T],
    mut c_top: MatMut<'_, T>,
    mut c_bot: MatMut<'_, T>,
    stack: DynStack<'_>,
) {
    let ncols_q = a.ncols();
    let ncols_c = c_top.ncols();
    let (mut work, _) = stack.make_with(ncols_c, |_| T::zero());

    match apply_type {
        ApplyType::NoTranspose => {
            for j in (0..ncols_q).rev() {
                apply_inner_step(a, tau[j], j, c_top.rb_mut(), c_bot.rb_mut(), &mut work);
            }
        }
        ApplyType::Transpose => {
            for j in 0..ncols_q {
                apply_inner_step(a, tau[j], j, c_top.rb_mut(), c_bot.rb_mut(), &mut work);
            }
        }
    }
}

// Applies H_j = I - tau_j v_j v_j^T, with the head of v_j at row j of C_top and its
// essential part (column j of A) acting on all of C_bot.
fn apply_inner_step<T: RealField>(
    a: MatRef<'_, T>,
    tau_j: T,
    j: usize,
    mut c_top: MatMut<'_, T>,
    mut c_bot: MatMut<'_, T>,
    work: &mut [T],
) {
    let ncols_c = c_top.ncols();
    let v = a.col(j);

    let work = &mut work[..ncols_c];
    gemv(
        b'T',
        T::one(),
        c_bot.rb(),
        v,
        T::zero(),
        ColMut::from_slice(work),
    );
    for i in 0..ncols_c {
        work[i] = work[i] + c_top[(j, i)];
        c_top[(j, i)] = c_top[(j, i)] - tau_j * work[i];
    }
    ger(-tau_j, v, ColRef::from_slice(work), c_bot.rb_mut());
}

/// Computes the QR factorization of the stacked matrix `[R_top; R_bot]`, where both
/// blocks are upper triangular `ncols * ncols` factors stored in `r_top` and `r_bot`
/// with leading dimensions `ldr_top` and `ldr_bot`.
///
/// On output, the upper triangle of `r_top` holds the combined `R` factor, rows
/// `0..=k` of column `k` of `r_bot` hold the essential part of the `k`-th Householder
/// vector, and `tau` holds the scaling coefficients. The strict lower triangles of both
/// buffers are never read or written.
///
/// # Panics
///
/// Panics if a buffer is too short for its stated dimensions, if `tau` is shorter than
/// `ncols`, or if the stack is too small.
pub fn factor_pair<T: RealField>(
    ncols: usize,
    r_top: &mut [T],
    ldr_top: usize,
    r_bot: &mut [T],
    ldr_bot: usize,
    tau: &mut [T],
    stack: DynStack<'_>,
) {
    fancy_assert!(tau.len() >= ncols);
    let r_top = MatMut::from_slice(r_top, ncols, ncols, ldr_top);
    let r_bot = MatMut::from_slice(r_bot, ncols, ncols, ldr_bot);
    factor_pair_impl(r_top, r_bot, tau, stack);
}

fn factor_pair_impl<T: RealField>(
    mut r_top: MatMut<'_, T>,
    mut r_bot: MatMut<'_, T>,
    tau: &mut [T],
    stack: DynStack<'_>,
) {
    let n = r_top.ncols();
    if n == 0 {
        return;
    }

    let (mut work, _) = stack.make_with(n, |_| T::zero());

    for k in 0..n {
        let (left, trailing) = r_bot.rb_mut().split_at_col(k + 1);
        let mut v = left.col(k).subrows(0, k + 1);

        let (tau_k, beta) = make_householder_in_place(v.rb_mut(), r_top[(k, k)]);
        r_top[(k, k)] = beta;
        tau[k] = tau_k;

        if k + 1 < n {
            // Rows below k of the trailing columns of R_bot are zero and stay zero, so
            // the update only touches their top k + 1 rows.
            let mut trailing = trailing.submatrix(0, 0, k + 1, n - k - 1);

            let work = &mut work[..n - k - 1];
            gemv(
                b'T',
                T::one(),
                trailing.rb(),
                v.rb(),
                T::zero(),
                ColMut::from_slice(work),
            );
            for j in k + 1..n {
                work[j - k - 1] = work[j - k - 1] + r_top[(k, j)];
                r_top[(k, j)] = r_top[(k, j)] - tau_k * work[j - k - 1];
            }
            ger(-tau_k, v.rb(), ColRef::from_slice(work), trailing.rb_mut());
        }
    }
}

/// Multiplies the stacked `(2 * ncols_q) * ncols_c` matrix `[C_top; C_bot]` in place by
/// the implicit `Q` (or `Q^T`, per `apply_type`) produced by [`factor_pair`].
///
/// `r_bot` and `tau` are the outputs of [`factor_pair`]; both `C_top` and `C_bot` are
/// `ncols_q * ncols_c`. Only rows `0..=j` of column `j` of `r_bot` are read, so the
/// `j`-th reflection touches row `j` of `C_top` and rows `0..=j` of `C_bot` only.
///
/// # Panics
///
/// Panics if a buffer is too short for its stated dimensions, if `tau` is shorter than
/// `ncols_q`, or if the stack is too small.
pub fn apply_pair<T: RealField>(
    apply_type: ApplyType,
    ncols_c: usize,
    ncols_q: usize,
    r_bot: &[T],
    ldr_bot: usize,
    tau: &[T],
    c_top: &mut [T],
    ldc_top: usize,
    c_bot: &mut [T],
    ldc_bot: usize,
    stack: DynStack<'_>,
) {
    fancy_assert!(tau.len() >= ncols_q);
    let r_bot = MatRef::from_slice(r_bot, ncols_q, ncols_q, ldr_bot);
    let c_top = MatMut::from_slice(c_top, ncols_q, ncols_c, ldc_top);
    let c_bot = MatMut::from_slice(c_bot, ncols_q, ncols_c, ldc_bot);
    apply_pair_impl(apply_type, r_bot, tau, c_top, c_bot, stack);
}

fn apply_pair_impl<T: RealField>(
    apply_type: ApplyType,
    r_bot: MatRef<'_, T>,
    tau: &[T],
    mut c_top: MatMut<'_, T>,
    mut c_bot: MatMut<'_, T>,
    stack: DynStack<'_>,
) {
    let ncols_q = r_bot.ncols();
    let ncols_c = c_top.ncols();
    let (mut work, _) = stack.make_with(ncols_c, |_| T::zero());

    match apply_type {
        ApplyType::NoTranspose => {
            for j in (0..ncols_q).rev() {
                apply_pair_step(r_bot, tau[j], j, c_top.rb_mut(), c_bot.rb_mut(), &mut work);
            }
        }
        ApplyType::Transpose => {
            for j in 0..ncols_q {
                apply_pair_step(r_bot, tau[j], j, c_top.rb_mut(), c_bot.rb_mut(), &mut work);
            }
        }
    }
}

fn apply_pair_step<T: RealField>(
    r_bot: MatRef<'_, T>,
    tau_j: T,
    j: usize,
    mut c_top: MatMut<'_, T>,
    c_bot: MatMut<'_, T>,
    work: &mut [T],
) {
    let ncols_c = c_top.ncols();
    let v = r_bot.col(j).subrows(0, j + 1);
    let mut c_bot = c_bot.submatrix(0, 0, j + 1, ncols_c);

    let work = &mut work[..ncols_c];
    gemv(
        b'T',
        T::one(),
        c_bot.rb(),
        v,
        T::zero(),
        ColMut::from_slice(work),
    );
    for i in 0..ncols_c {
        work[i] = work[i] + c_top[(j, i)];
        c_top[(j, i)] = c_top[(j, i)] - tau_j * work[i];
    }
    ger(-tau_j, v, ColRef::from_slice(work), c_bot.rb_mut());
}
