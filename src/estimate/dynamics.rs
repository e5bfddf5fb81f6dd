use num_complex::Complex;

use crate::dynmatrix::{kernels, DynMatrix, DynVector};
use crate::traits::FloatScalar;

use super::EstimateError;

/// Sign of the sine terms in each rotation block.
pub const COSWAVE: f64 = -1.0;

/// 2×2 rotation block for one basis frequency, row-major.
///
/// With `θ = 2π·f·Δt`:
///
/// ```text
/// [ cos θ            COSWAVE·sin θ ]
/// [ −COSWAVE·sin θ   cos θ         ]
/// ```
///
/// which, for `COSWAVE = −1`, advances the pair `(re, im)` counter-clockwise
/// so that `atan2(im, re)` grows by `θ` per step.
pub fn rotation_block<T: FloatScalar>(freq: T, dt: T) -> [[T; 2]; 2] {
    let theta = T::lit(2.0) * T::PI() * freq * dt;
    let (s, c) = theta.sin_cos();
    let off = T::lit(COSWAVE) * s;
    [[c, off], [-off, c]]
}

/// Block-diagonal `2·numf × 2·numf` dynamic model, one rotation block per
/// frequency. Cross-frequency entries are exactly zero.
pub fn dynamic_matrix<T: FloatScalar>(freqs: &[T], dt: T) -> DynMatrix<T> {
    let dim = 2 * freqs.len();
    let mut a = DynMatrix::zeros(dim, dim, T::zero());
    for (n, &f) in freqs.iter().enumerate() {
        let block = rotation_block(f, dt);
        let c = 2 * n;
        a[(c, c)] = block[0][0];
        a[(c, c + 1)] = block[0][1];
        a[(c + 1, c)] = block[1][0];
        a[(c + 1, c + 1)] = block[1][1];
    }
    a
}

/// Measurement row `h`: ones at the real slot of every pair, zeros elsewhere.
pub fn measurement_row<T: FloatScalar>(numf: usize) -> DynVector<T> {
    let mut h = DynVector::zeros(2 * numf, T::zero());
    for n in 0..numf {
        h[2 * n] = T::one();
    }
    h
}

/// Known, time-invariant filter design for one basis: frequencies, sampling
/// interval, dynamic model `a` and measurement row `h`.
#[derive(Debug, Clone)]
pub struct FourierModel<T> {
    freqs: Vec<T>,
    dt: T,
    a: DynMatrix<T>,
    h: DynVector<T>,
}

impl<T: FloatScalar> FourierModel<T> {
    /// Build the model for `freqs` sampled every `dt`.
    ///
    /// Fails if the basis is empty, a frequency is not finite, or `dt` is not
    /// a positive finite number.
    ///
    /// ```
    /// use lkffb::estimate::FourierModel;
    ///
    /// let model = FourierModel::new(&[0.0_f64, 0.25], 1.0).unwrap();
    /// assert_eq!(model.dim(), 4);
    /// // DC pair is the identity
    /// assert_eq!(model.dynamics()[(0, 0)], 1.0);
    /// assert_eq!(model.dynamics()[(0, 1)], 0.0);
    /// // Quarter-turn for the second pair
    /// assert!(model.dynamics()[(2, 2)].abs() < 1e-15);
    /// assert_eq!(model.dynamics()[(3, 2)], 1.0);
    /// ```
    pub fn new(freqs: &[T], dt: T) -> Result<Self, EstimateError> {
        if freqs.is_empty() {
            return Err(EstimateError::InvalidParameter {
                name: "freq_basis",
                reason: "at least one basis frequency is required",
            });
        }
        if freqs.iter().any(|f| !f.is_finite()) {
            return Err(EstimateError::InvalidParameter {
                name: "freq_basis",
                reason: "basis frequencies must be finite",
            });
        }
        if !(dt.is_finite() && dt > T::zero()) {
            return Err(EstimateError::InvalidParameter {
                name: "dt",
                reason: "sampling interval must be positive and finite",
            });
        }
        Ok(Self {
            freqs: freqs.to_vec(),
            dt,
            a: dynamic_matrix(freqs, dt),
            h: measurement_row(freqs.len()),
        })
    }

    /// Number of basis frequencies.
    #[inline]
    pub fn numf(&self) -> usize {
        self.freqs.len()
    }

    /// State dimension, `2·numf`.
    #[inline]
    pub fn dim(&self) -> usize {
        2 * self.freqs.len()
    }

    #[inline]
    pub fn freqs(&self) -> &[T] {
        &self.freqs
    }

    #[inline]
    pub fn dt(&self) -> T {
        self.dt
    }

    /// Dynamic model `a`.
    #[inline]
    pub fn dynamics(&self) -> &DynMatrix<T> {
        &self.a
    }

    /// Measurement row `h`.
    #[inline]
    pub fn measurement(&self) -> &DynVector<T> {
        &self.h
    }

    /// Predicted scalar measurement `h·x`: the sum of the real components.
    #[inline]
    pub fn reconstruct(&self, x: &[T]) -> T {
        kernels::dot(self.h.as_slice(), x)
    }

    /// Complex reconstruction `Σ (x_re + i·x_im)` over all pairs.
    ///
    /// Its real part equals [`reconstruct`](Self::reconstruct).
    pub fn reconstruct_complex(&self, x: &[T]) -> Complex<T> {
        x.chunks_exact(2)
            .fold(Complex::new(T::zero(), T::zero()), |acc, pair| {
                acc + Complex::new(pair[0], pair[1])
            })
    }
}
