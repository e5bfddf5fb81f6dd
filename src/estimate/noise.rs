use serde::{Deserialize, Serialize};

use crate::dynmatrix::{kernels, DynMatrix};
use crate::traits::FloatScalar;

use super::EstimateError;

/// What the adaptive noise model does when a frequency pair's state is zero.
///
/// The feature for a pair is `x · sqrt(oe² / (x_re² + x_im²))`, which is
/// undefined when both components are zero (the usual initial state).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ZeroStatePolicy {
    /// Spread `oe` evenly over the pair: `(oe/√2, oe/√2)`. Keeps the
    /// per-pair norm at `oe`.
    #[default]
    Isotropic,
    /// Inject no process noise into that pair for this step.
    Suppress,
    /// Fail with [`EstimateError::DegenerateNoiseFeature`].
    Reject,
}

/// Adaptive noise features for every frequency pair of `x`.
///
/// Each pair of `out` is the corresponding pair of `x` rescaled to norm `oe`,
/// so the noise follows the current phase of the oscillation but never its
/// amplitude. Pairs whose squared norm is zero (or so small that the scale
/// overflows) are resolved by `policy`.
///
/// Returns the number of pairs that needed the policy.
pub fn noise_features_into<T: FloatScalar>(
    x: &[T],
    oe: T,
    policy: ZeroStatePolicy,
    step: usize,
    out: &mut [T],
) -> Result<usize, EstimateError> {
    debug_assert_eq!(x.len(), out.len());
    let oe_sq = oe * oe;
    let mut substituted = 0;
    for (pair, (xs, fs)) in x.chunks_exact(2).zip(out.chunks_exact_mut(2)).enumerate() {
        let norm_sq = xs[0] * xs[0] + xs[1] * xs[1];
        let scale = (oe_sq / norm_sq).sqrt();
        if norm_sq > T::zero() && scale.is_finite() {
            fs[0] = xs[0] * scale;
            fs[1] = xs[1] * scale;
            continue;
        }
        substituted += 1;
        match policy {
            ZeroStatePolicy::Isotropic => {
                let v = oe.abs() * T::FRAC_1_SQRT_2();
                fs[0] = v;
                fs[1] = v;
            }
            ZeroStatePolicy::Suppress => {
                fs[0] = T::zero();
                fs[1] = T::zero();
            }
            ZeroStatePolicy::Reject => {
                return Err(EstimateError::DegenerateNoiseFeature { step, pair });
            }
        }
    }
    Ok(substituted)
}

/// Process noise `Q = Γ·Γᵀ` with `Γ = a · features`.
///
/// `gamma` receives `Γ`; `q` is overwritten.
pub fn process_noise_into<T: FloatScalar>(
    a: &DynMatrix<T>,
    features: &[T],
    gamma: &mut [T],
    q: &mut DynMatrix<T>,
) {
    kernels::mat_vec_into(a, features, gamma);
    kernels::outer_into(gamma, gamma, q);
}
