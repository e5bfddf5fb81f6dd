use crate::dynmatrix::{kernels, DynMatrix, DynVector};
use crate::traits::FloatScalar;

use super::noise::{noise_features_into, process_noise_into, ZeroStatePolicy};
use super::{EstimateError, FourierModel};

/// A state estimate and its covariance at one step, either apriori or
/// posterior depending on where it sits in the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate<T> {
    /// State, `2·numf` values ordered `(re, im)` per frequency.
    pub x: DynVector<T>,
    /// State covariance, `2·numf × 2·numf`.
    pub p: DynMatrix<T>,
}

impl<T: FloatScalar> Estimate<T> {
    /// Uniform initial condition: every state component equals `x0` and the
    /// covariance is `p0·I`.
    pub fn initial(dim: usize, x0: T, p0: T) -> Self {
        Self {
            x: DynVector::fill(dim, x0),
            p: DynMatrix::scaled_eye(dim, p0),
        }
    }

    /// All-zero estimate of dimension `dim`.
    pub fn zeros(dim: usize) -> Self {
        Self {
            x: DynVector::zeros(dim, T::zero()),
            p: DynMatrix::zeros(dim, dim, T::zero()),
        }
    }

    /// State dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.x.len()
    }

    /// Overwrite with another estimate of the same dimension.
    pub fn copy_from(&mut self, other: &Self) {
        self.x.copy_from(&other.x);
        self.p.copy_from(&other.p);
    }
}

/// Time update.
///
/// Holds the per-step buffers (noise features, `Γ`, `Q` and the `a·P`
/// scratch) so that [`predict`](Self::predict) never allocates.
#[derive(Debug, Clone)]
pub struct Predictor<T> {
    features: Vec<T>,
    gamma: Vec<T>,
    q: DynMatrix<T>,
    scratch: DynMatrix<T>,
    substituted: usize,
}

impl<T: FloatScalar> Predictor<T> {
    /// Buffers for a state of dimension `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            features: vec![T::zero(); dim],
            gamma: vec![T::zero(); dim],
            q: DynMatrix::zeros(dim, dim, T::zero()),
            scratch: DynMatrix::zeros(dim, dim, T::zero()),
            substituted: 0,
        }
    }

    /// Propagate `posterior` one step into `prior`.
    ///
    /// `x⁻ = a·x`, `P⁻ = a·P·aᵀ + Q`, with `Q` built by the adaptive noise
    /// model from the previous posterior state. Fails only when `policy` is
    /// [`ZeroStatePolicy::Reject`] and a pair of `posterior.x` is zero.
    pub fn predict(
        &mut self,
        model: &FourierModel<T>,
        posterior: &Estimate<T>,
        oe: T,
        policy: ZeroStatePolicy,
        step: usize,
        prior: &mut Estimate<T>,
    ) -> Result<(), EstimateError> {
        let a = model.dynamics();
        self.substituted =
            noise_features_into(posterior.x.as_slice(), oe, policy, step, &mut self.features)?;
        process_noise_into(a, &self.features, &mut self.gamma, &mut self.q);

        kernels::mat_vec_into(a, posterior.x.as_slice(), prior.x.as_mut_slice());
        kernels::sandwich_into(a, &posterior.p, &mut self.scratch, &mut prior.p);
        for (p, &q) in prior.p.as_mut_slice().iter_mut().zip(self.q.as_slice()) {
            *p = *p + q;
        }
        Ok(())
    }

    /// Process noise `Q` used by the last [`predict`](Self::predict).
    #[inline]
    pub fn process_noise(&self) -> &DynMatrix<T> {
        &self.q
    }

    /// Number of pairs resolved by the zero-state policy in the last step.
    #[inline]
    pub fn substituted_pairs(&self) -> usize {
        self.substituted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_noise_is_pure_rotation() {
        let model = FourierModel::new(&[0.125_f64], 1.0).unwrap();
        let post = Estimate {
            x: DynVector::from_slice(&[1.0, 0.0]),
            p: DynMatrix::scaled_eye(2, 2.0),
        };
        let mut prior = Estimate::zeros(2);
        let mut pred = Predictor::new(2);
        pred.predict(&model, &post, 0.0, ZeroStatePolicy::Reject, 1, &mut prior)
            .unwrap();

        let h = core::f64::consts::FRAC_1_SQRT_2;
        assert!((prior.x[0] - h).abs() < 1e-15);
        assert!((prior.x[1] - h).abs() < 1e-15);
        // Isotropic covariance is invariant under rotation
        assert!((prior.p[(0, 0)] - 2.0).abs() < 1e-14);
        assert!(prior.p[(0, 1)].abs() < 1e-14);
        assert!(pred.process_noise().as_slice().iter().all(|&q| q == 0.0));
    }

    #[test]
    fn covariance_grows_by_q() {
        let model = FourierModel::new(&[0.0_f64, 0.2], 1.0).unwrap();
        let post = Estimate::initial(4, 1.0, 0.5);
        let mut prior = Estimate::zeros(4);
        let mut pred = Predictor::new(4);
        pred.predict(&model, &post, 0.3, ZeroStatePolicy::Isotropic, 1, &mut prior)
            .unwrap();

        let q = pred.process_noise();
        for i in 0..4 {
            assert!((prior.p[(i, i)] - (0.5 + q[(i, i)])).abs() < 1e-14);
        }
        assert!(prior.p.is_symmetric_within(1e-14));
        assert_eq!(pred.substituted_pairs(), 0);
    }

    #[test]
    fn zero_initial_state_uses_policy() {
        let model = FourierModel::new(&[0.1_f64], 1.0).unwrap();
        let post = Estimate::initial(2, 0.0, 1.0);
        let mut prior = Estimate::zeros(2);
        let mut pred = Predictor::new(2);

        pred.predict(&model, &post, 0.1, ZeroStatePolicy::Isotropic, 1, &mut prior)
            .unwrap();
        assert_eq!(pred.substituted_pairs(), 1);
        assert!(prior.p.is_finite());

        let err = pred
            .predict(&model, &post, 0.1, ZeroStatePolicy::Reject, 1, &mut prior)
            .unwrap_err();
        assert!(matches!(err, EstimateError::DegenerateNoiseFeature { .. }));
    }
}
