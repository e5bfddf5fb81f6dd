use core::fmt;
use core::str::FromStr;

use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::traits::FloatScalar;

use super::EstimateError;

/// How the filter produces values beyond the training window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PredictionMethod {
    /// Keep predicting with zero gain: open-loop propagation under `a`.
    #[default]
    ZeroGain,
    /// Freeze amplitude and phase at `n_train` and evaluate a harmonic sum.
    PropForward,
}

impl PredictionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionMethod::ZeroGain => "ZeroGain",
            PredictionMethod::PropForward => "PropForward",
        }
    }
}

impl fmt::Display for PredictionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredictionMethod {
    type Err = EstimateError;

    /// Exact, case-sensitive match; there is no fallback mode.
    ///
    /// ```
    /// use lkffb::estimate::PredictionMethod;
    ///
    /// assert_eq!("PropForward".parse::<PredictionMethod>().unwrap(), PredictionMethod::PropForward);
    /// assert!("zerogain".parse::<PredictionMethod>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ZeroGain" => Ok(PredictionMethod::ZeroGain),
            "PropForward" => Ok(PredictionMethod::PropForward),
            other => Err(EstimateError::UnknownPredictionMethod(other.to_string())),
        }
    }
}

/// Instantaneous amplitude and phase per basis frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstantParams<T> {
    pub amplitude: Vec<T>,
    pub phase: Vec<T>,
}

impl<T: FloatScalar> InstantParams<T> {
    /// Read `A_f = |x_re + i·x_im|` and `φ_f = atan2(x_im, x_re)` off each
    /// pair of a state vector.
    ///
    /// ```
    /// use lkffb::estimate::InstantParams;
    ///
    /// let p = InstantParams::from_state(&[0.0_f64, 2.0]);
    /// assert_eq!(p.amplitude, vec![2.0]);
    /// assert!((p.phase[0] - core::f64::consts::FRAC_PI_2).abs() < 1e-15);
    /// ```
    pub fn from_state(x: &[T]) -> Self {
        let numf = x.len() / 2;
        let mut params = Self {
            amplitude: vec![T::zero(); numf],
            phase: vec![T::zero(); numf],
        };
        extract_into(x, &mut params.amplitude, &mut params.phase);
        params
    }

    /// Number of frequencies.
    #[inline]
    pub fn len(&self) -> usize {
        self.amplitude.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.amplitude.is_empty()
    }
}

/// Amplitude and phase of each pair of `x`, written into the output slices.
pub(crate) fn extract_into<T: FloatScalar>(x: &[T], amplitude: &mut [T], phase: &mut [T]) {
    for ((pair, a), p) in x.chunks_exact(2).zip(amplitude).zip(phase) {
        let c = Complex::new(pair[0], pair[1]);
        *a = c.norm();
        *p = c.arg();
    }
}

/// Harmonic sum at absolute step `tn`:
/// `Σ_f A_f·cos(2π·f·Δt·tn + φ_f + c_f)`, where `c_f = phase_correction`
/// for non-zero frequencies and `0` for the DC component.
pub fn harmonic_value<T: FloatScalar>(
    freqs: &[T],
    dt: T,
    params: &InstantParams<T>,
    phase_correction: T,
    tn: usize,
) -> T {
    let omega_t = T::lit(2.0) * T::PI() * dt * T::from_index(tn);
    freqs
        .iter()
        .zip(&params.amplitude)
        .zip(&params.phase)
        .fold(T::zero(), |acc, ((&f, &a), &p)| {
            let correction = if f == T::zero() {
                T::zero()
            } else {
                phase_correction
            };
            acc + a * (omega_t * f + p + correction).cos()
        })
}

/// Closed-form forecast over a run of `num` steps.
///
/// Returns `num` values; entries before `n_train` are zero, entries
/// `n_train..num` hold [`harmonic_value`] at that step.
pub fn propagate_forward<T: FloatScalar>(
    freqs: &[T],
    dt: T,
    params: &InstantParams<T>,
    phase_correction: T,
    n_train: usize,
    num: usize,
) -> Vec<T> {
    let mut out = vec![T::zero(); num];
    for (tn, v) in out.iter_mut().enumerate().skip(n_train) {
        *v = harmonic_value(freqs, dt, params, phase_correction, tn);
    }
    out
}

/// Phase offset for Ramsey noise-trace measurements, else zero.
///
/// `(bdelta − delta_s)·2π/bdelta` when `enabled`.
pub fn phase_correction_for_noise_traces<T: FloatScalar>(bdelta: T, delta_s: T, enabled: bool) -> T {
    if !enabled {
        return T::zero();
    }
    (bdelta - delta_s) * (T::lit(2.0) * T::PI() / bdelta)
}

/// Training length implied by a basis: `⌊multiplier·bandwidth/bdelta⌋`.
///
/// Returns `0` when the ratio is not a finite non-negative number.
pub fn training_steps<T: FloatScalar>(multiplier: T, bandwidth: T, bdelta: T) -> usize {
    (multiplier * bandwidth / bdelta)
        .floor()
        .to_usize()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::PI;

    #[test]
    fn method_round_trip_through_strings() {
        for m in [PredictionMethod::ZeroGain, PredictionMethod::PropForward] {
            assert_eq!(m.to_string().parse::<PredictionMethod>().unwrap(), m);
        }
        let err = "Kalman".parse::<PredictionMethod>().unwrap_err();
        assert!(matches!(err, EstimateError::UnknownPredictionMethod(ref s) if s == "Kalman"));
    }

    #[test]
    fn method_serde_uses_exact_names() {
        let json = serde_json::to_string(&PredictionMethod::PropForward).unwrap();
        assert_eq!(json, "\"PropForward\"");
        assert!(serde_json::from_str::<PredictionMethod>("\"Zero\"").is_err());
    }

    #[test]
    fn params_from_state() {
        let p = InstantParams::from_state(&[3.0_f64, 4.0, -1.0, 0.0, 0.0, 0.0]);
        assert_eq!(p.len(), 3);
        assert!((p.amplitude[0] - 5.0).abs() < 1e-15);
        assert!((p.phase[0] - (4.0_f64).atan2(3.0)).abs() < 1e-15);
        assert!((p.phase[1] - PI).abs() < 1e-15);
        assert_eq!(p.amplitude[2], 0.0);
        assert_eq!(p.phase[2], 0.0);
    }

    #[test]
    fn harmonic_sum_skips_correction_for_dc() {
        let freqs = [0.0_f64, 0.25];
        let params = InstantParams {
            amplitude: vec![2.0, 1.0],
            phase: vec![0.0, 0.0],
        };
        // tn = 0: DC contributes 2, the f = 0.25 term contributes cos(π/2) = 0
        let v = harmonic_value(&freqs, 1.0, &params, PI / 2.0, 0);
        assert!((v - 2.0).abs() < 1e-15);
        // tn = 1: 2 + cos(π/2 + π/2) = 1
        let v = harmonic_value(&freqs, 1.0, &params, PI / 2.0, 1);
        assert!((v - 1.0).abs() < 1e-15);
    }

    #[test]
    fn propagate_forward_zero_before_training_boundary() {
        let params = InstantParams {
            amplitude: vec![1.0_f64],
            phase: vec![0.0],
        };
        let out = propagate_forward(&[0.1], 1.0, &params, 0.0, 3, 6);
        assert_eq!(out.len(), 6);
        assert_eq!(&out[..3], &[0.0, 0.0, 0.0]);
        for tn in 3..6 {
            assert!((out[tn] - (2.0 * PI * 0.1 * tn as f64).cos()).abs() < 1e-14);
        }
    }

    #[test]
    fn noise_trace_correction() {
        assert_eq!(phase_correction_for_noise_traces(2.0_f64, 1.0, false), 0.0);
        let c = phase_correction_for_noise_traces(2.0_f64, 1.0, true);
        assert!((c - PI).abs() < 1e-15);
    }

    #[test]
    fn training_length() {
        assert_eq!(training_steps(5.0_f64, 50.0, 0.5), 500);
        assert_eq!(training_steps(1.0_f64, 1.0, 3.0), 0);
        assert_eq!(training_steps(1.0_f64, 1.0, 0.0), 0);
    }
}
