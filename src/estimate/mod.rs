//! LKFFB: a linear Kalman filter in a fixed Fourier (sum-of-sinusoids) basis.
//!
//! The state holds one `(real, imaginary)` pair per basis frequency. Each pair
//! rotates independently under the block-diagonal dynamic model, process noise
//! is scaled adaptively to the current phase of each pair, and a single scalar
//! measurement observes the sum of the real components.
//!
//! A run has two phases. During training (steps `1..=n_train`) the filter
//! predicts and corrects every step, withholding the gain on steps skipped by
//! the measurement-skip policy. Beyond `n_train` it forecasts either by
//! open-loop propagation ([`PredictionMethod::ZeroGain`]) or by a closed-form
//! harmonic sum over the amplitude and phase learned at `n_train`
//! ([`PredictionMethod::PropForward`]).
//!
//! The orchestrator [`Lkffb`] runs under a [`Retention`] policy: `Minimal`
//! keeps only the trailing window needed for the output, `Full` keeps every
//! per-step quantity and can be persisted as a [`RunArchive`].
//!
//! ```
//! use lkffb::estimate::{Lkffb, PredictionMethod, Retention};
//! use lkffb::FilterConfig;
//!
//! let signal: Vec<f64> = (0..60)
//!     .map(|t| (2.0 * core::f64::consts::PI * 0.1 * t as f64).cos())
//!     .collect();
//! let config = FilterConfig {
//!     n_train: 50,
//!     n_testbefore: 5,
//!     n_predict: 10,
//!     dt: 1.0,
//!     x0: 0.0,
//!     p0: 1.0,
//!     oe: 0.001,
//!     rk: 1e-4,
//!     freq_basis: vec![0.1],
//!     method: PredictionMethod::ZeroGain,
//!     ..Default::default()
//! };
//!
//! let filter = Lkffb::new(config).unwrap();
//! let out = filter.run(&signal, Retention::Minimal).unwrap();
//! assert_eq!(out.predictions.len(), 15);
//! ```

mod archive;
mod correct;
mod dynamics;
mod filter;
mod forecast;
mod history;
mod noise;
mod predict;


pub use archive::{ArchiveError, NdArray, RunArchive};
pub use correct::{Correction, Corrector};
pub use dynamics::{dynamic_matrix, measurement_row, rotation_block, FourierModel, COSWAVE};
pub use filter::{FilterOutput, Lkffb};
pub use forecast::{
    harmonic_value, phase_correction_for_noise_traces, propagate_forward, training_steps,
    InstantParams, PredictionMethod,
};
pub use history::{FullHistory, Retention};
pub use noise::{noise_features_into, process_noise_into, ZeroStatePolicy};
pub use predict::{Estimate, Predictor};

/// Errors from the LKFFB estimator.
#[derive(Debug, thiserror::Error)]
pub enum EstimateError {
    /// An input's length does not match the dimension implied by the run.
    #[error("dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    /// A scalar parameter is outside its valid range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
    /// Forecasting mode string is neither `"ZeroGain"` nor `"PropForward"`.
    #[error("unknown prediction method {0:?}, expected \"ZeroGain\" or \"PropForward\"")]
    UnknownPredictionMethod(String),
    /// `1/S` is not finite: the innovation covariance is zero or degenerate.
    #[error("innovation covariance is singular at step {step}")]
    SingularInnovation { step: usize },
    /// A frequency pair's state is exactly zero under [`ZeroStatePolicy::Reject`].
    #[error("noise feature undefined for frequency pair {pair} at step {step}: pair state is zero")]
    DegenerateNoiseFeature { step: usize, pair: usize },
    /// The full-retention bundle could not be written.
    #[error("failed to persist run archive: {0}")]
    Archive(#[from] ArchiveError),
}

/// Failure of a complete filter run.
///
/// `Failed` carries an error with no usable output: an input rejected before
/// the step loop starts, or a failed archive write. `Aborted` means the loop
/// stopped on an unrecoverable numerical condition; `partial` holds the
/// truncated prediction sequence produced up to that point and must not be
/// used as a result.
#[derive(Debug, thiserror::Error)]
pub enum RunError<T: core::fmt::Debug> {
    #[error(transparent)]
    Failed(#[from] EstimateError),
    #[error("filter aborted after producing {} output values", .partial.len())]
    Aborted {
        #[source]
        source: EstimateError,
        partial: Vec<T>,
    },
}

impl<T: core::fmt::Debug> RunError<T> {
    /// The underlying estimator error.
    pub fn error(&self) -> &EstimateError {
        match self {
            RunError::Failed(e) => e,
            RunError::Aborted { source, .. } => source,
        }
    }

    /// Truncated predictions of an aborted run, if any.
    pub fn partial(&self) -> Option<&[T]> {
        match self {
            RunError::Failed(_) => None,
            RunError::Aborted { partial, .. } => Some(partial),
        }
    }
}
