pub mod kernels;
mod vector;

pub use vector::DynVector;

use core::ops::{Index, IndexMut};

use crate::traits::{FloatScalar, Scalar};

/// Dynamically-sized heap-allocated matrix.
///
/// Column-major `Vec<T>` storage. Dimensions are set at runtime, which is
/// what the filter needs: the state dimension `2·numf` is only known once the
/// basis frequencies are.
///
/// # Examples
///
/// ```
/// use lkffb::DynMatrix;
///
/// let a = DynMatrix::from_rows(2, 2, &[1.0_f64, 2.0, 3.0, 4.0]);
/// assert_eq!(a[(0, 1)], 2.0);
/// assert_eq!(a.nrows(), 2);
/// assert_eq!(a.ncols(), 2);
///
/// let b = DynMatrix::scaled_eye(3, 1.0_f64);
/// assert_eq!(b[(0, 0)], 1.0);
/// assert_eq!(b[(0, 1)], 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DynMatrix<T> {
    data: Vec<T>,
    nrows: usize,
    ncols: usize,
}

// ── Constructors ────────────────────────────────────────────────────

impl<T: Scalar> DynMatrix<T> {
    /// Create an `nrows x ncols` matrix of zeros.
    ///
    /// The `_zero` parameter is only used for type inference.
    pub fn zeros(nrows: usize, ncols: usize, _zero: T) -> Self {
        Self {
            data: vec![T::zero(); nrows * ncols],
            nrows,
            ncols,
        }
    }

    /// Create a matrix filled with a given value.
    pub fn fill(nrows: usize, ncols: usize, value: T) -> Self {
        Self {
            data: vec![value; nrows * ncols],
            nrows,
            ncols,
        }
    }

    /// Create an `n x n` diagonal matrix with `value` on every diagonal entry.
    ///
    /// ```
    /// use lkffb::DynMatrix;
    /// let p0 = DynMatrix::scaled_eye(4, 2.5_f64);
    /// assert_eq!(p0[(3, 3)], 2.5);
    /// assert_eq!(p0[(3, 2)], 0.0);
    /// ```
    pub fn scaled_eye(n: usize, value: T) -> Self {
        let mut m = Self::zeros(n, n, T::zero());
        for i in 0..n {
            m[(i, i)] = value;
        }
        m
    }

    /// Create a matrix from a flat slice in row-major order.
    ///
    /// Panics if `row_major.len() != nrows * ncols`.
    pub fn from_rows(nrows: usize, ncols: usize, row_major: &[T]) -> Self {
        assert_eq!(
            row_major.len(),
            nrows * ncols,
            "slice length {} does not match {}x{} matrix",
            row_major.len(),
            nrows,
            ncols,
        );
        let mut data = vec![T::zero(); nrows * ncols];
        for i in 0..nrows {
            for j in 0..ncols {
                data[j * nrows + i] = row_major[i * ncols + j];
            }
        }
        Self { data, nrows, ncols }
    }

    /// Set every element to zero, keeping the allocation.
    #[inline]
    pub fn set_zero(&mut self) {
        self.data.iter_mut().for_each(|v| *v = T::zero());
    }

    /// Overwrite `self` with the contents of `other`.
    ///
    /// Panics on a shape mismatch.
    pub fn copy_from(&mut self, other: &Self) {
        assert_eq!(
            (self.nrows, self.ncols),
            (other.nrows, other.ncols),
            "dimension mismatch: {}x{} <- {}x{}",
            self.nrows,
            self.ncols,
            other.nrows,
            other.ncols,
        );
        self.data.copy_from_slice(&other.data);
    }

    /// Exact symmetry check (`A == Aᵀ`).
    pub fn is_symmetric(&self) -> bool {
        if !self.is_square() {
            return false;
        }
        let n = self.nrows;
        for i in 0..n {
            for j in (i + 1)..n {
                if self[(i, j)] != self[(j, i)] {
                    return false;
                }
            }
        }
        true
    }
}

impl<T: FloatScalar> DynMatrix<T> {
    /// Symmetry check within an absolute tolerance.
    ///
    /// ```
    /// use lkffb::DynMatrix;
    /// let p = DynMatrix::from_rows(2, 2, &[1.0_f64, 0.5, 0.5 + 1e-14, 1.0]);
    /// assert!(!p.is_symmetric());
    /// assert!(p.is_symmetric_within(1e-12));
    /// ```
    pub fn is_symmetric_within(&self, tol: T) -> bool {
        self.is_square() && kernels::symmetry_defect(self) <= tol
    }

    /// Whether every element is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

impl<T> DynMatrix<T> {
    /// Number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Whether the matrix is square.
    #[inline]
    pub fn is_square(&self) -> bool {
        self.nrows == self.ncols
    }

    /// Column-major view of the storage.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutable column-major view of the storage.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Create a matrix by calling `f(row, col)` for each element.
    ///
    /// ```
    /// use lkffb::DynMatrix;
    /// let m = DynMatrix::from_fn(3, 3, |i, j| if i == j { 1.0_f64 } else { 0.0 });
    /// assert_eq!(m[(0, 0)], 1.0);
    /// assert_eq!(m[(0, 1)], 0.0);
    /// ```
    pub fn from_fn(nrows: usize, ncols: usize, f: impl Fn(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(nrows * ncols);
        for j in 0..ncols {
            for i in 0..nrows {
                data.push(f(i, j));
            }
        }
        Self { data, nrows, ncols }
    }
}

// ── Index ───────────────────────────────────────────────────────────

impl<T> Index<(usize, usize)> for DynMatrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &T {
        &self.data[col * self.nrows + row]
    }
}

impl<T> IndexMut<(usize, usize)> for DynMatrix<T> {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        &mut self.data[col * self.nrows + row]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros() {
        let m = DynMatrix::zeros(3, 4, 0.0_f64);
        assert_eq!(m.nrows(), 3);
        assert_eq!(m.ncols(), 4);
        assert!(m.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn scaled_eye() {
        let m = DynMatrix::scaled_eye(3, 7.0_f64);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 7.0 } else { 0.0 };
                assert_eq!(m[(i, j)], expected);
            }
        }
    }

    #[test]
    fn from_rows_is_column_major() {
        let m = DynMatrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(m[(0, 2)], 3.0);
        assert_eq!(m[(1, 0)], 4.0);
        assert_eq!(m.as_slice(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    #[should_panic(expected = "slice length")]
    fn from_rows_wrong_length() {
        let _ = DynMatrix::from_rows(2, 2, &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn copy_and_zero() {
        let src = DynMatrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let mut dst = DynMatrix::zeros(2, 2, 0.0_f64);
        dst.copy_from(&src);
        assert_eq!(dst, src);
        dst.set_zero();
        assert_eq!(dst, DynMatrix::zeros(2, 2, 0.0));
    }

    #[test]
    fn symmetry() {
        let sym = DynMatrix::from_rows(2, 2, &[1.0, 2.0, 2.0, 3.0]);
        assert!(sym.is_symmetric());
        let asym = DynMatrix::from_rows(2, 2, &[1.0, 2.0, 2.5, 3.0]);
        assert!(!asym.is_symmetric());
        assert!(!asym.is_symmetric_within(0.1));
        assert!(asym.is_symmetric_within(0.5));
        let rect = DynMatrix::zeros(2, 3, 0.0_f64);
        assert!(!rect.is_symmetric());
    }

    #[test]
    fn finiteness() {
        let mut m = DynMatrix::scaled_eye(2, 1.0_f64);
        assert!(m.is_finite());
        m[(1, 0)] = f64::NAN;
        assert!(!m.is_finite());
    }
}
