//! Allocation-free numeric kernels used by the per-step filter update.
//!
//! Every kernel writes into caller-owned storage, so a filter run allocates
//! its working buffers once and the step loop never touches the heap. All
//! matrices are column-major [`DynMatrix`] values; vectors are plain slices.
//! Shapes are checked with `debug_assert!` only: callers validate dimensions
//! once before entering the loop.
//!
//! Zero entries are not skipped: a NaN or infinity anywhere in an operand
//! reaches the result under IEEE rules.

use crate::traits::{FloatScalar, Scalar};

use super::DynMatrix;

/// Dot product of two equal-length slices.
#[inline]
pub fn dot<T: Scalar>(a: &[T], b: &[T]) -> T {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = T::zero();
    for (&x, &y) in a.iter().zip(b) {
        sum = sum + x * y;
    }
    sum
}

/// `out = a · x`.
pub fn mat_vec_into<T: Scalar>(a: &DynMatrix<T>, x: &[T], out: &mut [T]) {
    debug_assert_eq!(a.ncols(), x.len());
    debug_assert_eq!(a.nrows(), out.len());
    out.iter_mut().for_each(|v| *v = T::zero());
    let n = a.nrows();
    let data = a.as_slice();
    // Column sweep keeps the inner loop on contiguous storage.
    for (j, &xj) in x.iter().enumerate() {
        let col = &data[j * n..(j + 1) * n];
        for (o, &aij) in out.iter_mut().zip(col) {
            *o = *o + aij * xj;
        }
    }
}

/// `out = a · b`.
pub fn mat_mul_into<T: Scalar>(a: &DynMatrix<T>, b: &DynMatrix<T>, out: &mut DynMatrix<T>) {
    debug_assert_eq!(a.ncols(), b.nrows());
    debug_assert_eq!((out.nrows(), out.ncols()), (a.nrows(), b.ncols()));
    let n = a.nrows();
    let inner = a.ncols();
    out.set_zero();
    for j in 0..b.ncols() {
        for k in 0..inner {
            let bkj = b[(k, j)];
            for i in 0..n {
                out[(i, j)] = out[(i, j)] + a[(i, k)] * bkj;
            }
        }
    }
}

/// `out = a · p · aᵀ`, using `scratch` for the intermediate `a · p`.
pub fn sandwich_into<T: Scalar>(
    a: &DynMatrix<T>,
    p: &DynMatrix<T>,
    scratch: &mut DynMatrix<T>,
    out: &mut DynMatrix<T>,
) {
    mat_mul_into(a, p, scratch);
    let n = a.nrows();
    let inner = a.ncols();
    for j in 0..n {
        for i in 0..n {
            let mut sum = T::zero();
            for k in 0..inner {
                sum = sum + scratch[(i, k)] * a[(j, k)];
            }
            out[(i, j)] = sum;
        }
    }
}

/// `out = u · vᵀ`.
pub fn outer_into<T: Scalar>(u: &[T], v: &[T], out: &mut DynMatrix<T>) {
    debug_assert_eq!((out.nrows(), out.ncols()), (u.len(), v.len()));
    for (j, &vj) in v.iter().enumerate() {
        for (i, &ui) in u.iter().enumerate() {
            out[(i, j)] = ui * vj;
        }
    }
}

/// `out += alpha · w · wᵀ`.
pub fn add_scaled_outer<T: Scalar>(out: &mut DynMatrix<T>, alpha: T, w: &[T]) {
    debug_assert_eq!((out.nrows(), out.ncols()), (w.len(), w.len()));
    for (j, &wj) in w.iter().enumerate() {
        let s = alpha * wj;
        for (i, &wi) in w.iter().enumerate() {
            out[(i, j)] = out[(i, j)] + wi * s;
        }
    }
}

/// `out = p · hᵀ` for a row vector `h`.
pub fn mat_row_t_into<T: Scalar>(p: &DynMatrix<T>, h: &[T], out: &mut [T]) {
    mat_vec_into(p, h, out);
}

/// Quadratic form `h · p · hᵀ` for a row vector `h`.
pub fn quad_form<T: Scalar>(h: &[T], p: &DynMatrix<T>) -> T {
    debug_assert_eq!((p.nrows(), p.ncols()), (h.len(), h.len()));
    let mut sum = T::zero();
    for (j, &hj) in h.iter().enumerate() {
        let mut col = T::zero();
        for (i, &hi) in h.iter().enumerate() {
            col = col + hi * p[(i, j)];
        }
        sum = sum + col * hj;
    }
    sum
}

/// Largest absolute difference `|p_ij − p_ji|`.
pub fn symmetry_defect<T: FloatScalar>(p: &DynMatrix<T>) -> T {
    debug_assert!(p.is_square());
    let n = p.nrows();
    let mut worst = T::zero();
    for i in 0..n {
        for j in (i + 1)..n {
            worst = worst.max((p[(i, j)] - p[(j, i)]).abs());
        }
    }
    worst
}
