use crate::dynmatrix::kernels;
use crate::traits::FloatScalar;

use super::predict::Estimate;
use super::{EstimateError, FourierModel};

/// Scalar outcome of one measurement update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correction<T> {
    /// Apriori predicted measurement `ẑ = h·x⁻`.
    pub z_proj: T,
    /// Innovation `e_z = z − ẑ`.
    pub residual: T,
    /// Innovation covariance `S = h·P⁻·hᵀ + R`.
    pub s: T,
    /// Whether the gain was applied (`false` on a skipped measurement).
    pub applied: bool,
}

/// Measurement update for the single scalar channel.
///
/// Owns the gain vector `W` so that [`correct`](Self::correct) never
/// allocates; the gain of the last update stays readable through
/// [`gain`](Self::gain).
#[derive(Debug, Clone)]
pub struct Corrector<T> {
    gain: Vec<T>,
}

impl<T: FloatScalar> Corrector<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            gain: vec![T::zero(); dim],
        }
    }

    /// Correct `prior` with measurement `z` at step `k`, writing `posterior`.
    ///
    /// `W = P⁻·hᵀ / S`, `x = x⁻ + W·e_z`, `P = P⁻ − S·W·Wᵀ` (the scalar-`S`
    /// form of the covariance update). When `k % skip_msmts != 0` the gain is
    /// forced to zero and the posterior equals the prior.
    ///
    /// Fails with [`EstimateError::SingularInnovation`] if `1/S` is not
    /// finite, on skipped steps too. The posterior is left untouched then.
    #[allow(clippy::too_many_arguments)]
    pub fn correct(
        &mut self,
        model: &FourierModel<T>,
        prior: &Estimate<T>,
        z: T,
        rk: T,
        k: usize,
        skip_msmts: usize,
        posterior: &mut Estimate<T>,
    ) -> Result<Correction<T>, EstimateError> {
        debug_assert!(skip_msmts >= 1);
        let h = model.measurement().as_slice();
        let z_proj = kernels::dot(h, prior.x.as_slice());
        let s = kernels::quad_form(h, &prior.p) + rk;
        let s_inv = T::one() / s;
        if !s_inv.is_finite() {
            return Err(EstimateError::SingularInnovation { step: k });
        }

        let applied = k % skip_msmts == 0;
        if applied {
            kernels::mat_row_t_into(&prior.p, h, &mut self.gain);
            self.gain.iter_mut().for_each(|w| *w = *w * s_inv);
        } else {
            self.gain.iter_mut().for_each(|w| *w = T::zero());
        }

        let residual = z - z_proj;
        posterior.copy_from(prior);
        if applied {
            for (x, &w) in posterior.x.as_mut_slice().iter_mut().zip(&self.gain) {
                *x = *x + w * residual;
            }
            kernels::add_scaled_outer(&mut posterior.p, -s, &self.gain);
        }

        Ok(Correction {
            z_proj,
            residual,
            s,
            applied,
        })
    }

    /// Kalman gain `W` of the last update (all zeros after a skipped one).
    #[inline]
    pub fn gain(&self) -> &[T] {
        &self.gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynmatrix::{DynMatrix, DynVector};

    fn prior() -> Estimate<f64> {
        Estimate {
            x: DynVector::from_slice(&[0.5, -0.2, 0.1, 0.3]),
            p: DynMatrix::from_rows(
                4,
                4,
                &[
                    1.0, 0.1, 0.2, 0.0, //
                    0.1, 2.0, 0.0, 0.1, //
                    0.2, 0.0, 1.5, 0.3, //
                    0.0, 0.1, 0.3, 1.0,
                ],
            ),
        }
    }

    #[test]
    fn update_matches_textbook_form() {
        let model = FourierModel::new(&[0.1_f64, 0.2], 1.0).unwrap();
        let prior = prior();
        let mut post = Estimate::zeros(4);
        let mut c = Corrector::new(4);
        let out = c.correct(&model, &prior, 1.0, 0.1, 1, 1, &mut post).unwrap();

        // h = [1, 0, 1, 0]
        assert!((out.z_proj - 0.6).abs() < 1e-15);
        assert!((out.residual - 0.4).abs() < 1e-15);
        // S = P00 + P02 + P20 + P22 + R
        assert!((out.s - (1.0 + 0.2 + 0.2 + 1.5 + 0.1)).abs() < 1e-14);
        assert!(out.applied);

        // W = P hᵀ / S; P = (I − W h) P⁻ for scalar S
        let s = out.s;
        let ph = [1.2, 0.1, 1.7, 0.3];
        for i in 0..4 {
            assert!((c.gain()[i] - ph[i] / s).abs() < 1e-15);
            assert!((post.x[i] - (prior.x[i] + ph[i] / s * 0.4)).abs() < 1e-15);
            for j in 0..4 {
                let expected = prior.p[(i, j)] - ph[i] * ph[j] / s;
                assert!((post.p[(i, j)] - expected).abs() < 1e-14);
            }
        }
        assert!(post.p.is_symmetric_within(1e-15));
    }

    #[test]
    fn skipped_step_keeps_prior() {
        let model = FourierModel::new(&[0.1_f64, 0.2], 1.0).unwrap();
        let prior = prior();
        let mut post = Estimate::zeros(4);
        let mut c = Corrector::new(4);

        let out = c.correct(&model, &prior, 1.0, 0.1, 3, 2, &mut post).unwrap();
        assert!(!out.applied);
        assert!(c.gain().iter().all(|&w| w == 0.0));
        assert_eq!(post, prior);
        // Residual is still reported
        assert!((out.residual - 0.4).abs() < 1e-15);

        let out = c.correct(&model, &prior, 1.0, 0.1, 4, 2, &mut post).unwrap();
        assert!(out.applied);
        assert_ne!(post, prior);
    }

    #[test]
    fn singular_innovation_is_fatal() {
        let model = FourierModel::new(&[0.1_f64], 1.0).unwrap();
        let prior = Estimate {
            x: DynVector::from_slice(&[0.0, 0.0]),
            p: DynMatrix::zeros(2, 2, 0.0),
        };
        let mut post = Estimate::initial(2, 9.0, 9.0);
        let mut c = Corrector::new(2);
        let err = c.correct(&model, &prior, 1.0, 0.0, 7, 1, &mut post).unwrap_err();
        assert!(matches!(err, EstimateError::SingularInnovation { step: 7 }));
        // Untouched
        assert_eq!(post.x[0], 9.0);
    }
}
