//! `tsqr` core module.
//!
//! This module contains:
//! - definitions of matrix view structures ([`MatRef`], [`MatMut`], [`ColRef`], [`ColMut`]),
//! - the [`RealField`] scalar trait,
//! - the Householder reflector primitive ([`householder`]),
//! - the restricted BLAS-2 micro-kernels ([`mul`]).
//!
//! All matrix storage follows the column-major convention: for a matrix with leading
//! dimension `lda`, element `(i, j)` lives at offset `i + j * lda`. Views never own
//! their storage, and none of the routines in this crate allocate.

#![warn(rust_2018_idioms)]
#![allow(clippy::too_many_arguments)]

use assert2::{assert as fancy_assert, debug_assert as fancy_debug_assert};
use core::{
    fmt::Debug,
    marker::PhantomData,
    ops::{Add, Div, Index, IndexMut, Mul, Neg, Sub},
    ptr::NonNull,
};
use reborrow::*;

pub mod householder;
pub mod mul;

/// Trait that describes a real number field.
///
/// This is the scalar domain of the whole library: the kernels are real-only, so the
/// magnitude type of a scalar is the scalar itself.
///
/// # Note
///
/// The implementation currently implies [`Copy`], but this may be replaced by [`Clone`]
/// in a future version of this library.
pub trait RealField:
    Copy
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + PartialOrd
    + Send
    + Sync
    + Debug
    + 'static
{
    /// Returns the value representing `0.0`.
    fn zero() -> Self;
    /// Returns the value representing `1.0`.
    fn one() -> Self;

    /// Returns the inverse of the number.
    fn inv(self) -> Self;
    /// Returns the square root of the number.
    fn sqrt(self) -> Self;
    /// Returns the absolute value of the number.
    fn abs(self) -> Self;

    /// Returns the machine epsilon of the type.
    fn epsilon() -> Self;
    /// Returns the smallest positive normal value of the type.
    fn min_positive() -> Self;
}

impl RealField for f32 {
    #[inline(always)]
    fn zero() -> Self {
        0.0
    }

    #[inline(always)]
    fn one() -> Self {
        1.0
    }

    #[inline(always)]
    fn inv(self) -> Self {
        1.0 / self
    }

    #[inline(always)]
    fn sqrt(self) -> Self {
        self.sqrt()
    }

    #[inline(always)]
    fn abs(self) -> Self {
        self.abs()
    }

    #[inline(always)]
    fn epsilon() -> Self {
        f32::EPSILON
    }

    #[inline(always)]
    fn min_positive() -> Self {
        f32::MIN_POSITIVE
    }
}

impl RealField for f64 {
    #[inline(always)]
    fn zero() -> Self {
        0.0
    }

    #[inline(always)]
    fn one() -> Self {
        1.0
    }

    #[inline(always)]
    fn inv(self) -> Self {
        1.0 / self
    }

    #[inline(always)]
    fn sqrt(self) -> Self {
        self.sqrt()
    }

    #[inline(always)]
    fn abs(self) -> Self {
        self.abs()
    }

    #[inline(always)]
    fn epsilon() -> Self {
        f64::EPSILON
    }

    #[inline(always)]
    fn min_positive() -> Self {
        f64::MIN_POSITIVE
    }
}

struct MatrixSliceBase<T> {
    ptr: NonNull<T>,
    nrows: usize,
    ncols: usize,
    row_stride: isize,
    col_stride: isize,
}
struct VecSliceBase<T> {
    ptr: NonNull<T>,
    len: usize,
    stride: isize,
}
impl<T> Copy for MatrixSliceBase<T> {}
impl<T> Clone for MatrixSliceBase<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for VecSliceBase<T> {}
impl<T> Clone for VecSliceBase<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

/// Matrix view with general row and column strides.
pub struct MatRef<'a, T> {
    base: MatrixSliceBase<T>,
    _marker: PhantomData<&'a T>,
}

/// Mutable matrix view with general row and column strides.
///
/// For usage examples, see [`MatRef`].
pub struct MatMut<'a, T> {
    base: MatrixSliceBase<T>,
    _marker: PhantomData<&'a mut T>,
}

/// Column vector view with general row stride.
///
/// For usage examples, see [`MatRef`].
pub struct ColRef<'a, T> {
    base: VecSliceBase<T>,
    _marker: PhantomData<&'a T>,
}

/// Mutable column vector view with general row stride.
///
/// For usage examples, see [`MatRef`].
pub struct ColMut<'a, T> {
    base: VecSliceBase<T>,
    _marker: PhantomData<&'a mut T>,
}

unsafe impl<'a, T: Sync> Sync for MatRef<'a, T> {}
unsafe impl<'a, T: Sync> Send for MatRef<'a, T> {}
unsafe impl<'a, T: Sync> Sync for MatMut<'a, T> {}
unsafe impl<'a, T: Send> Send for MatMut<'a, T> {}

unsafe impl<'a, T: Sync> Sync for ColRef<'a, T> {}
unsafe impl<'a, T: Sync> Send for ColRef<'a, T> {}
unsafe impl<'a, T: Sync> Sync for ColMut<'a, T> {}
unsafe impl<'a, T: Send> Send for ColMut<'a, T> {}

impl<'a, T> Copy for MatRef<'a, T> {}
impl<'a, T> Copy for ColRef<'a, T> {}

impl<'a, T> Clone for MatRef<'a, T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}
impl<'a, T> Clone for ColRef<'a, T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<'b, 'a, T> Reborrow<'b> for MatRef<'a, T> {
    type Target = MatRef<'b, T>;
    #[inline]
    fn rb(&'b self) -> Self::Target {
        *self
    }
}
impl<'b, 'a, T> ReborrowMut<'b> for MatRef<'a, T> {
    type Target = MatRef<'b, T>;
    #[inline]
    fn rb_mut(&'b mut self) -> Self::Target {
        *self
    }
}

impl<'b, 'a, T> Reborrow<'b> for MatMut<'a, T> {
    type Target = MatRef<'b, T>;
    #[inline]
    fn rb(&'b self) -> Self::Target {
        Self::Target {
            base: self.base,
            _marker: PhantomData,
        }
    }
}
impl<'b, 'a, T> ReborrowMut<'b> for MatMut<'a, T> {
    type Target = MatMut<'b, T>;
    #[inline]
    fn rb_mut(&'b mut self) -> Self::Target {
        Self::Target {
            base: self.base,
            _marker: PhantomData,
        }
    }
}

impl<'b, 'a, T> Reborrow<'b> for ColRef<'a, T> {
    type Target = ColRef<'b, T>;
    #[inline]
    fn rb(&'b self) -> Self::Target {
        *self
    }
}
impl<'b, 'a, T> ReborrowMut<'b> for ColRef<'a, T> {
    type Target = ColRef<'b, T>;
    #[inline]
    fn rb_mut(&'b mut self) -> Self::Target {
        *self
    }
}

impl<'b, 'a, T> Reborrow<'b> for ColMut<'a, T> {
    type Target = ColRef<'b, T>;
    #[inline]
    fn rb(&'b self) -> Self::Target {
        Self::Target {
            base: self.base,
            _marker: PhantomData,
        }
    }
}
impl<'b, 'a, T> ReborrowMut<'b> for ColMut<'a, T> {
    type Target = ColMut<'b, T>;
    #[inline]
    fn rb_mut(&'b mut self) -> Self::Target {
        Self::Target {
            base: self.base,
            _marker: PhantomData,
        }
    }
}

impl<'a, T> IntoConst for MatRef<'a, T> {
    type Target = MatRef<'a, T>;

    #[inline]
    fn into_const(self) -> Self::Target {
        self
    }
}
impl<'a, T> IntoConst for MatMut<'a, T> {
    type Target = MatRef<'a, T>;

    #[inline]
    fn into_const(self) -> Self::Target {
        Self::Target {
            base: self.base,
            _marker: PhantomData,
        }
    }
}

impl<'a, T> IntoConst for ColRef<'a, T> {
    type Target = ColRef<'a, T>;

    #[inline]
    fn into_const(self) -> Self::Target {
        self
    }
}
impl<'a, T> IntoConst for ColMut<'a, T> {
    type Target = ColRef<'a, T>;

    #[inline]
    fn into_const(self) -> Self::Target {
        Self::Target {
            base: self.base,
            _marker: PhantomData,
        }
    }
}

impl<'a, T> MatRef<'a, T> {
    /// Returns a matrix slice from the given arguments.
    /// `ptr`: pointer to the first element of the matrix.
    /// `nrows`: number of rows of the matrix.
    /// `ncols`: number of columns of the matrix.
    /// `row_stride`: offset between the first elements of two successive rows in the matrix.
    /// `col_stride`: offset between the first elements of two successive columns in the matrix.
    ///
    /// # Safety
    ///
    /// `ptr` must be non null and properly aligned for type `T`.
    /// For each `i < nrows` and `j < ncols`,
    /// `ptr.offset(i as isize * row_stride + j as isize * col_stride)` must point to a valid
    /// initialized object of type `T`, unless memory pointing to that address is never accessed.
    /// The referenced memory must not be mutated during the lifetime `'a`.
    #[inline]
    pub unsafe fn from_raw_parts(
        ptr: *const T,
        nrows: usize,
        ncols: usize,
        row_stride: isize,
        col_stride: isize,
    ) -> Self {
        Self {
            base: MatrixSliceBase::<T> {
                ptr: NonNull::new_unchecked(ptr as *mut T),
                nrows,
                ncols,
                row_stride,
                col_stride,
            },
            _marker: PhantomData,
        }
    }

    /// Returns a view over a column-major matrix stored in `slice`, with the given
    /// dimensions and leading dimension.
    ///
    /// # Panics
    ///
    /// Panics if `col_stride < nrows`, or if `slice` is too short to hold the matrix.
    ///
    /// # Example
    ///
    /// ```
    /// use tsqr_core::MatRef;
    ///
    /// let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    /// let m = MatRef::from_slice(&data, 2, 2, 3);
    ///
    /// assert_eq!(m[(0, 0)], 1.0);
    /// assert_eq!(m[(1, 0)], 2.0);
    /// assert_eq!(m[(0, 1)], 4.0);
    /// assert_eq!(m[(1, 1)], 5.0);
    /// ```
    #[track_caller]
    #[inline]
    pub fn from_slice(slice: &'a [T], nrows: usize, ncols: usize, col_stride: usize) -> Self {
        fancy_assert!(col_stride >= nrows);
        let required = if nrows == 0 || ncols == 0 {
            0
        } else {
            (ncols - 1) * col_stride + nrows
        };
        fancy_assert!(slice.len() >= required);
        unsafe { Self::from_raw_parts(slice.as_ptr(), nrows, ncols, 1, col_stride as isize) }
    }

    /// Returns a pointer to the first (top left) element of the matrix.
    #[inline]
    pub fn as_ptr(self) -> *const T {
        self.base.ptr.as_ptr()
    }

    /// Returns the number of rows of the matrix.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.base.nrows
    }

    /// Returns the number of columns of the matrix.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.base.ncols
    }

    /// Returns the offset between the first elements of two successive rows in the matrix.
    #[inline]
    pub fn row_stride(&self) -> isize {
        self.base.row_stride
    }

    /// Returns the offset between the first elements of two successive columns in the matrix.
    #[inline]
    pub fn col_stride(&self) -> isize {
        self.base.col_stride
    }

    /// Returns a pointer to the element at position (i, j) in the matrix.
    #[inline]
    pub fn ptr_at(self, i: usize, j: usize) -> *const T {
        self.base
            .ptr
            .as_ptr()
            .wrapping_offset(i as isize * self.row_stride() + j as isize * self.col_stride())
    }

    /// Returns a reference to the element at position (i, j), with no bound checks.
    ///
    /// # Safety
    ///
    /// `i` must be in `0..self.nrows()` and `j` must be in `0..self.ncols()`.
    #[track_caller]
    #[inline]
    pub unsafe fn get_unchecked(self, i: usize, j: usize) -> &'a T {
        fancy_debug_assert!(i < self.nrows());
        fancy_debug_assert!(j < self.ncols());
        &*self
            .base
            .ptr
            .as_ptr()
            .offset(i as isize * self.row_stride() + j as isize * self.col_stride())
    }

    /// Returns a reference to the element at position (i, j).
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.nrows()` or `j >= self.ncols()`.
    #[track_caller]
    #[inline]
    pub fn get(self, i: usize, j: usize) -> &'a T {
        fancy_assert!(i < self.nrows());
        fancy_assert!(j < self.ncols());
        unsafe { self.get_unchecked(i, j) }
    }

    /// Splits the matrix into two parts in the column direction: left columns `0..j`, and
    /// right columns `j..self.ncols()`.
    ///
    /// # Panics
    ///
    /// Panics if `j > self.ncols()`.
    #[track_caller]
    #[inline]
    pub fn split_at_col(self, j: usize) -> (Self, Self) {
        fancy_assert!(j <= self.ncols());
        let rs = self.row_stride();
        let cs = self.col_stride();
        unsafe {
            (
                Self::from_raw_parts(self.as_ptr(), self.nrows(), j, rs, cs),
                Self::from_raw_parts(self.ptr_at(0, j), self.nrows(), self.ncols() - j, rs, cs),
            )
        }
    }

    /// Splits the matrix into two parts in the row direction: top rows `0..i`, and bottom
    /// rows `i..self.nrows()`.
    ///
    /// # Panics
    ///
    /// Panics if `i > self.nrows()`.
    #[track_caller]
    #[inline]
    pub fn split_at_row(self, i: usize) -> (Self, Self) {
        fancy_assert!(i <= self.nrows());
        let rs = self.row_stride();
        let cs = self.col_stride();
        unsafe {
            (
                Self::from_raw_parts(self.as_ptr(), i, self.ncols(), rs, cs),
                Self::from_raw_parts(self.ptr_at(i, 0), self.nrows() - i, self.ncols(), rs, cs),
            )
        }
    }

    /// Returns the `j`-th column of the matrix.
    ///
    /// # Panics
    ///
    /// Panics if `j >= self.ncols()`.
    #[track_caller]
    #[inline]
    pub fn col(self, j: usize) -> ColRef<'a, T> {
        fancy_assert!(j < self.ncols());
        unsafe { ColRef::from_raw_parts(self.ptr_at(0, j), self.nrows(), self.row_stride()) }
    }

    /// Returns a view over the submatrix starting at position `(i, j)` with dimensions
    /// `(nrows, ncols)`.
    ///
    /// # Panics
    ///
    /// Panics if the submatrix does not fit in the matrix.
    #[track_caller]
    #[inline]
    pub fn submatrix(self, i: usize, j: usize, nrows: usize, ncols: usize) -> Self {
        fancy_assert!(i <= self.nrows());
        fancy_assert!(j <= self.ncols());
        fancy_assert!(nrows <= self.nrows() - i);
        fancy_assert!(ncols <= self.ncols() - j);
        unsafe {
            Self::from_raw_parts(
                self.ptr_at(i, j),
                nrows,
                ncols,
                self.row_stride(),
                self.col_stride(),
            )
        }
    }
}

impl<'a, T> MatMut<'a, T> {
    /// Returns a mutable matrix slice from the given arguments.
    /// `ptr`: pointer to the first element of the matrix.
    /// `nrows`: number of rows of the matrix.
    /// `ncols`: number of columns of the matrix.
    /// `row_stride`: offset between the first elements of two successive rows in the matrix.
    /// `col_stride`: offset between the first elements of two successive columns in the matrix.
    ///
    /// # Safety
    ///
    /// `ptr` must be non null and properly aligned for type `T`.
    /// For each `i < nrows` and `j < ncols`,
    /// `ptr.offset(i as isize * row_stride + j as isize * col_stride)` must point to a valid
    /// initialized object of type `T`, unless memory pointing to that address is never accessed.
    /// No aliasing is allowed: the referenced memory must not be accessed through any other
    /// pointer during the lifetime `'a`.
    #[inline]
    pub unsafe fn from_raw_parts(
        ptr: *mut T,
        nrows: usize,
        ncols: usize,
        row_stride: isize,
        col_stride: isize,
    ) -> Self {
        Self {
            base: MatrixSliceBase::<T> {
                ptr: NonNull::new_unchecked(ptr),
                nrows,
                ncols,
                row_stride,
                col_stride,
            },
            _marker: PhantomData,
        }
    }

    /// Returns a mutable view over a column-major matrix stored in `slice`, with the given
    /// dimensions and leading dimension.
    ///
    /// # Panics
    ///
    /// Panics if `col_stride < nrows`, or if `slice` is too short to hold the matrix.
    #[track_caller]
    #[inline]
    pub fn from_slice(slice: &'a mut [T], nrows: usize, ncols: usize, col_stride: usize) -> Self {
        fancy_assert!(col_stride >= nrows);
        let required = if nrows == 0 || ncols == 0 {
            0
        } else {
            (ncols - 1) * col_stride + nrows
        };
        fancy_assert!(slice.len() >= required);
        unsafe { Self::from_raw_parts(slice.as_mut_ptr(), nrows, ncols, 1, col_stride as isize) }
    }

    /// Returns a mutable pointer to the first (top left) element of the matrix.
    #[inline]
    pub fn as_ptr(&mut self) -> *mut T {
        self.base.ptr.as_ptr()
    }

    /// Returns the number of rows of the matrix.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.base.nrows
    }

    /// Returns the number of columns of the matrix.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.base.ncols
    }

    /// Returns the offset between the first elements of two successive rows in the matrix.
    #[inline]
    pub fn row_stride(&self) -> isize {
        self.base.row_stride
    }

    /// Returns the offset between the first elements of two successive columns in the matrix.
    #[inline]
    pub fn col_stride(&self) -> isize {
        self.base.col_stride
    }

    /// Returns a mutable pointer to the element at position (i, j) in the matrix.
    #[inline]
    pub fn ptr_at(&mut self, i: usize, j: usize) -> *mut T {
        self.base
            .ptr
            .as_ptr()
            .wrapping_offset(i as isize * self.row_stride() + j as isize * self.col_stride())
    }

    /// Returns a mutable reference to the element at position (i, j), with no bound checks.
    ///
    /// # Safety
    ///
    /// `i` must be in `0..self.nrows()` and `j` must be in `0..self.ncols()`.
    #[track_caller]
    #[inline]
    pub unsafe fn get_unchecked(self, i: usize, j: usize) -> &'a mut T {
        fancy_debug_assert!(i < self.nrows());
        fancy_debug_assert!(j < self.ncols());
        &mut *self
            .base
            .ptr
            .as_ptr()
            .offset(i as isize * self.row_stride() + j as isize * self.col_stride())
    }

    /// Returns a mutable reference to the element at position (i, j).
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.nrows()` or `j >= self.ncols()`.
    #[track_caller]
    #[inline]
    pub fn get(self, i: usize, j: usize) -> &'a mut T {
        fancy_assert!(i < self.nrows());
        fancy_assert!(j < self.ncols());
        unsafe { self.get_unchecked(i, j) }
    }

    /// Splits the matrix into two parts in the column direction: left columns `0..j`, and
    /// right columns `j..self.ncols()`.
    ///
    /// # Panics
    ///
    /// Panics if `j > self.ncols()`.
    #[track_caller]
    #[inline]
    pub fn split_at_col(mut self, j: usize) -> (Self, Self) {
        fancy_assert!(j <= self.ncols());
        let rs = self.row_stride();
        let cs = self.col_stride();
        let nrows = self.nrows();
        let ncols = self.ncols();
        let ptr = self.as_ptr();
        let ptr_right = self.ptr_at(0, j);
        unsafe {
            (
                Self::from_raw_parts(ptr, nrows, j, rs, cs),
                Self::from_raw_parts(ptr_right, nrows, ncols - j, rs, cs),
            )
        }
    }

    /// Splits the matrix into two parts in the row direction: top rows `0..i`, and bottom
    /// rows `i..self.nrows()`.
    ///
    /// # Panics
    ///
    /// Panics if `i > self.nrows()`.
    #[track_caller]
    #[inline]
    pub fn split_at_row(mut self, i: usize) -> (Self, Self) {
        fancy_assert!(i <= self.nrows());
        let rs = self.row_stride();
        let cs = self.col_stride();
        let nrows = self.nrows();
        let ncols = self.ncols();
        let ptr = self.as_ptr();
        let ptr_bot = self.ptr_at(i, 0);
        unsafe {
            (
                Self::from_raw_parts(ptr, i, ncols, rs, cs),
                Self::from_raw_parts(ptr_bot, nrows - i, ncols, rs, cs),
            )
        }
    }

    /// Returns the `j`-th column of the matrix.
    ///
    /// # Panics
    ///
    /// Panics if `j >= self.ncols()`.
    #[track_caller]
    #[inline]
    pub fn col(mut self, j: usize) -> ColMut<'a, T> {
        fancy_assert!(j < self.ncols());
        let nrows = self.nrows();
        let rs = self.row_stride();
        unsafe { ColMut::from_raw_parts(self.ptr_at(0, j), nrows, rs) }
    }

    /// Returns a mutable view over the submatrix starting at position `(i, j)` with
    /// dimensions `(nrows, ncols)`.
    ///
    /// # Panics
    ///
    /// Panics if the submatrix does not fit in the matrix.
    #[track_caller]
    #[inline]
    pub fn submatrix(mut self, i: usize, j: usize, nrows: usize, ncols: usize) -> Self {
        fancy_assert!(i <= self.nrows());
        fancy_assert!(j <= self.ncols());
        fancy_assert!(nrows <= self.nrows() - i);
        fancy_assert!(ncols <= self.ncols() - j);
        let rs = self.row_stride();
        let cs = self.col_stride();
        unsafe { Self::from_raw_parts(self.ptr_at(i, j), nrows, ncols, rs, cs) }
    }
}

impl<'a, T> ColRef<'a, T> {
    /// Returns a column vector slice from the given arguments.
    /// `ptr`: pointer to the first element of the vector.
    /// `nrows`: number of rows of the vector.
    /// `row_stride`: offset between two successive elements of the vector.
    ///
    /// # Safety
    ///
    /// `ptr` must be non null and properly aligned for type `T`.
    /// For each `i < nrows`, `ptr.offset(i as isize * row_stride)` must point to a valid
    /// initialized object of type `T`, unless memory pointing to that address is never
    /// accessed.
    /// The referenced memory must not be mutated during the lifetime `'a`.
    #[inline]
    pub unsafe fn from_raw_parts(ptr: *const T, nrows: usize, row_stride: isize) -> Self {
        Self {
            base: VecSliceBase::<T> {
                ptr: NonNull::new_unchecked(ptr as *mut T),
                len: nrows,
                stride: row_stride,
            },
            _marker: PhantomData,
        }
    }

    /// Returns a unit-stride view over the elements of `slice`.
    #[inline]
    pub fn from_slice(slice: &'a [T]) -> Self {
        unsafe { Self::from_raw_parts(slice.as_ptr(), slice.len(), 1) }
    }

    /// Returns a pointer to the first element of the vector.
    #[inline]
    pub fn as_ptr(self) -> *const T {
        self.base.ptr.as_ptr()
    }

    /// Returns the number of rows of the vector.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.base.len
    }

    /// Returns the offset between two successive elements of the vector.
    #[inline]
    pub fn row_stride(&self) -> isize {
        self.base.stride
    }

    /// Returns a reference to the element at position `i`, with no bound checks.
    ///
    /// # Safety
    ///
    /// `i` must be in `0..self.nrows()`.
    #[track_caller]
    #[inline]
    pub unsafe fn get_unchecked(self, i: usize) -> &'a T {
        fancy_debug_assert!(i < self.nrows());
        &*self
            .base
            .ptr
            .as_ptr()
            .offset(i as isize * self.row_stride())
    }

    /// Returns a reference to the element at position `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.nrows()`.
    #[track_caller]
    #[inline]
    pub fn get(self, i: usize) -> &'a T {
        fancy_assert!(i < self.nrows());
        unsafe { self.get_unchecked(i) }
    }

    /// Splits the vector into two parts: top rows `0..i`, and bottom rows
    /// `i..self.nrows()`.
    ///
    /// # Panics
    ///
    /// Panics if `i > self.nrows()`.
    #[track_caller]
    #[inline]
    pub fn split_at(self, i: usize) -> (Self, Self) {
        fancy_assert!(i <= self.nrows());
        let stride = self.row_stride();
        unsafe {
            (
                Self::from_raw_parts(self.as_ptr(), i, stride),
                Self::from_raw_parts(
                    self.as_ptr().wrapping_offset(i as isize * stride),
                    self.nrows() - i,
                    stride,
                ),
            )
        }
    }

    /// Returns a view over the subvector starting at row `i` with `nrows` rows.
    ///
    /// # Panics
    ///
    /// Panics if the subvector does not fit in the vector.
    #[track_caller]
    #[inline]
    pub fn subrows(self, i: usize, nrows: usize) -> Self {
        fancy_assert!(i <= self.nrows());
        fancy_assert!(nrows <= self.nrows() - i);
        let stride = self.row_stride();
        unsafe {
            Self::from_raw_parts(
                self.as_ptr().wrapping_offset(i as isize * stride),
                nrows,
                stride,
            )
        }
    }
}

impl<'a, T> ColMut<'a, T> {
    /// Returns a mutable column vector slice from the given arguments.
    /// `ptr`: pointer to the first element of the vector.
    /// `nrows`: number of rows of the vector.
    /// `row_stride`: offset between two successive elements of the vector.
    ///
    /// # Safety
    ///
    /// `ptr` must be non null and properly aligned for type `T`.
    /// For each `i < nrows`, `ptr.offset(i as isize * row_stride)` must point to a valid
    /// initialized object of type `T`, unless memory pointing to that address is never
    /// accessed.
    /// No aliasing is allowed: the referenced memory must not be accessed through any other
    /// pointer during the lifetime `'a`.
    #[inline]
    pub unsafe fn from_raw_parts(ptr: *mut T, nrows: usize, row_stride: isize) -> Self {
        Self {
            base: VecSliceBase::<T> {
                ptr: NonNull::new_unchecked(ptr),
                len: nrows,
                stride: row_stride,
            },
            _marker: PhantomData,
        }
    }

    /// Returns a unit-stride mutable view over the elements of `slice`.
    #[inline]
    pub fn from_slice(slice: &'a mut [T]) -> Self {
        unsafe { Self::from_raw_parts(slice.as_mut_ptr(), slice.len(), 1) }
    }

    /// Returns a mutable pointer to the first element of the vector.
    #[inline]
    pub fn as_ptr(&mut self) -> *mut T {
        self.base.ptr.as_ptr()
    }

    /// Returns the number of rows of the vector.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.base.len
    }

    /// Returns the offset between two successive elements of the vector.
    #[inline]
    pub fn row_stride(&self) -> isize {
        self.base.stride
    }

    /// Returns a mutable reference to the element at position `i`, with no bound checks.
    ///
    /// # Safety
    ///
    /// `i` must be in `0..self.nrows()`.
    #[track_caller]
    #[inline]
    pub unsafe fn get_unchecked(self, i: usize) -> &'a mut T {
        fancy_debug_assert!(i < self.nrows());
        &mut *self
            .base
            .ptr
            .as_ptr()
            .offset(i as isize * self.row_stride())
    }

    /// Returns a mutable reference to the element at position `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.nrows()`.
    #[track_caller]
    #[inline]
    pub fn get(self, i: usize) -> &'a mut T {
        fancy_assert!(i < self.nrows());
        unsafe { self.get_unchecked(i) }
    }

    /// Splits the vector into two parts: top rows `0..i`, and bottom rows
    /// `i..self.nrows()`.
    ///
    /// # Panics
    ///
    /// Panics if `i > self.nrows()`.
    #[track_caller]
    #[inline]
    pub fn split_at(mut self, i: usize) -> (Self, Self) {
        fancy_assert!(i <= self.nrows());
        let stride = self.row_stride();
        let nrows = self.nrows();
        let ptr = self.as_ptr();
        unsafe {
            (
                Self::from_raw_parts(ptr, i, stride),
                Self::from_raw_parts(
                    ptr.wrapping_offset(i as isize * stride),
                    nrows - i,
                    stride,
                ),
            )
        }
    }

    /// Returns a mutable view over the subvector starting at row `i` with `nrows` rows.
    ///
    /// # Panics
    ///
    /// Panics if the subvector does not fit in the vector.
    #[track_caller]
    #[inline]
    pub fn subrows(mut self, i: usize, nrows: usize) -> Self {
        fancy_assert!(i <= self.nrows());
        fancy_assert!(nrows <= self.nrows() - i);
        let stride = self.row_stride();
        let ptr = self.as_ptr();
        unsafe { Self::from_raw_parts(ptr.wrapping_offset(i as isize * stride), nrows, stride) }
    }
}

impl<'a, T> Index<(usize, usize)> for MatRef<'a, T> {
    type Output = T;

    #[track_caller]
    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &Self::Output {
        self.get(i, j)
    }
}
impl<'a, T> Index<(usize, usize)> for MatMut<'a, T> {
    type Output = T;

    #[track_caller]
    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &Self::Output {
        self.rb().get(i, j)
    }
}
impl<'a, T> IndexMut<(usize, usize)> for MatMut<'a, T> {
    #[track_caller]
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Self::Output {
        self.rb_mut().get(i, j)
    }
}

impl<'a, T> Index<usize> for ColRef<'a, T> {
    type Output = T;

    #[track_caller]
    #[inline]
    fn index(&self, i: usize) -> &Self::Output {
        self.get(i)
    }
}
impl<'a, T> Index<usize> for ColMut<'a, T> {
    type Output = T;

    #[track_caller]
    #[inline]
    fn index(&self, i: usize) -> &Self::Output {
        self.rb().get(i)
    }
}
impl<'a, T> IndexMut<usize> for ColMut<'a, T> {
    #[track_caller]
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut Self::Output {
        self.rb_mut().get(i)
    }
}

/// Heap allocated, column-major matrix with tightly packed columns.
///
/// This type exists for tests, benches, and callers that want owned storage; the kernels
/// themselves only ever see views.
#[derive(Clone, Debug)]
pub struct Mat<T> {
    data: Vec<T>,
    nrows: usize,
    ncols: usize,
}

impl<T: RealField> Mat<T> {
    /// Returns a new matrix with dimensions `(nrows, ncols)`, filled with the provided
    /// function.
    pub fn with_dims(mut f: impl FnMut(usize, usize) -> T, nrows: usize, ncols: usize) -> Self {
        let mut data = Vec::with_capacity(nrows * ncols);
        for j in 0..ncols {
            for i in 0..nrows {
                data.push(f(i, j));
            }
        }
        Self { data, nrows, ncols }
    }

    /// Returns a new matrix with dimensions `(nrows, ncols)`, filled with zeros.
    #[inline]
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self::with_dims(|_, _| T::zero(), nrows, ncols)
    }

    /// Returns the number of rows of the matrix.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Returns the number of columns of the matrix.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Returns the column stride of the matrix. The columns are tightly packed, so this is
    /// the number of rows.
    #[inline]
    pub fn col_stride(&self) -> isize {
        self.nrows as isize
    }

    /// Returns the underlying column-major storage of the matrix.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Returns the underlying column-major storage of the matrix.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Returns a view over the matrix.
    #[inline]
    pub fn as_ref(&self) -> MatRef<'_, T> {
        MatRef::from_slice(&self.data, self.nrows, self.ncols, self.nrows)
    }

    /// Returns a mutable view over the matrix.
    #[inline]
    pub fn as_mut(&mut self) -> MatMut<'_, T> {
        MatMut::from_slice(&mut self.data, self.nrows, self.ncols, self.nrows)
    }
}

impl<T: RealField> Index<(usize, usize)> for Mat<T> {
    type Output = T;

    #[track_caller]
    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &Self::Output {
        fancy_assert!(i < self.nrows);
        fancy_assert!(j < self.ncols);
        &self.data[i + j * self.nrows]
    }
}
impl<T: RealField> IndexMut<(usize, usize)> for Mat<T> {
    #[track_caller]
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Self::Output {
        fancy_assert!(i < self.nrows);
        fancy_assert!(j < self.ncols);
        &mut self.data[i + j * self.nrows]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mat_views_are_column_major() {
        let data = vec![0.0, 1.0, f64::NAN, 2.0, 3.0, f64::NAN, 4.0, 5.0];
        let m = MatRef::from_slice(&data, 2, 3, 3);

        assert_eq!(m.nrows(), 2);
        assert_eq!(m.ncols(), 3);
        assert_eq!(m[(0, 0)], 0.0);
        assert_eq!(m[(1, 0)], 1.0);
        assert_eq!(m[(0, 1)], 2.0);
        assert_eq!(m[(1, 1)], 3.0);
        assert_eq!(m[(0, 2)], 4.0);
        assert_eq!(m[(1, 2)], 5.0);
    }

    #[test]
    fn submatrix_and_col() {
        let mut m = Mat::with_dims(|i, j| (i + 10 * j) as f64, 4, 3);

        let sub = m.as_ref().submatrix(1, 1, 2, 2);
        assert_eq!(sub[(0, 0)], 11.0);
        assert_eq!(sub[(1, 1)], 22.0);

        let col = m.as_ref().col(2);
        assert_eq!(col.nrows(), 4);
        assert_eq!(col[3], 23.0);

        let (left, right) = m.as_mut().split_at_col(1);
        assert_eq!(left.ncols(), 1);
        assert_eq!(right.ncols(), 2);
        assert_eq!(right[(0, 0)], 10.0);
    }

    #[test]
    fn col_split_and_subrows() {
        let data = vec![0.0, 1.0, 2.0, 3.0];
        let col = ColRef::from_slice(&data);
        let (top, bot) = col.split_at(1);
        assert_eq!(top.nrows(), 1);
        assert_eq!(bot.nrows(), 3);
        assert_eq!(bot[0], 1.0);
        assert_eq!(bot.subrows(1, 2)[1], 3.0);
    }

    #[test]
    #[should_panic]
    fn out_of_bounds_index() {
        let m = Mat::<f64>::zeros(2, 2);
        let _ = m.as_ref()[(2, 0)];
    }
}
