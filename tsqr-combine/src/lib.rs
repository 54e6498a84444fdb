//! Combine kernel for tall-skinny QR factorizations.
//!
//! A tall-skinny QR (TSQR) factorization splits a matrix with many more rows than
//! columns into a stack of tiles, factors each tile, then repeatedly combines pairs of
//! small triangular factors up a reduction tree. This crate implements the sequential
//! kernel at the heart of that scheme, in three variants:
//!
//! - [`base::factor_first`] / [`base::apply_first`]: QR of a plain dense tile, the leaf
//!   of the tree,
//! - [`combine::factor_inner`] / [`combine::apply_inner`]: QR of an upper triangular
//!   factor stacked on top of a dense tile, the sequential reduction step,
//! - [`combine::factor_pair`] / [`combine::apply_pair`]: QR of two stacked upper
//!   triangular factors, the parallel reduction step.
//!
//! All operations work in place on caller-provided column-major buffers and take their
//! scratch space from a caller-provided [`dyn_stack::DynStack`]; nothing here allocates.
//! The factorizations store `Q` implicitly, as Householder vectors packed below the
//! diagonal of the factored buffers plus a vector of scaling coefficients, and the
//! `apply_*` operations multiply by that implicit `Q` or its transpose.
//!
//! The `factor_*` / `apply_*` pairs are structure-aware: the structured variants skip
//! the known zero blocks of their inputs entirely, costing a fraction of a dense
//! refactorization of the stacked tiles, while producing bit-wise identical results on
//! every platform for a given scalar type.

#![warn(rust_2018_idioms)]
#![allow(clippy::too_many_arguments)]

pub mod base;
pub mod combine;

/// Selects which operator an `apply_*` operation multiplies by.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ApplyType {
    /// Multiply by `Q` itself.
    NoTranspose,
    /// Multiply by `Q^T`.
    Transpose,
}

/// Returns whether the `factor_*` operations promise a nonnegative diagonal for their
/// `R` factor.
///
/// They do not: the reflector construction pins the sign of each diagonal entry to the
/// opposite of the corresponding input head (with the sign of zero taken positive), so
/// diagonal entries of `R` are usually negative. Callers that need a nonnegative
/// diagonal must post-process by flipping the signs of the offending rows of `R` and
/// the corresponding columns of `Q`.
#[inline]
pub fn qr_produces_r_factor_with_nonnegative_diagonal() -> bool {
    false
}
