//! Per-run filter configuration.
//!
//! [`FilterConfig`] is the complete input contract of one LKFFB run apart from
//! the measurement sequence itself. It (de)serialises with serde, so scenario
//! sweeps can keep their hyperparameters in JSON files.
//!
//! ```
//! use lkffb::FilterConfig;
//! use lkffb::estimate::PredictionMethod;
//!
//! let cfg: FilterConfig<f64> = FilterConfig::parse(r#"{
//!     "n_train": 50, "n_testbefore": 5, "n_predict": 10,
//!     "dt": 1.0, "x0": 0.0, "p0": 1.0, "oe": 0.0, "rk": 1e-6,
//!     "freq_basis": [1.0], "phase_correction": 0.0,
//!     "method": "PropForward"
//! }"#).unwrap();
//! assert_eq!(cfg.method, PredictionMethod::PropForward);
//! assert_eq!(cfg.skip_msmts, 1);
//! assert_eq!(cfg.num(), 60);
//! ```

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::estimate::{EstimateError, PredictionMethod, ZeroStatePolicy};
use crate::traits::FloatScalar;

/// Errors from loading or saving a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] EstimateError),
}

fn default_skip_msmts() -> usize {
    1
}

/// Parameters of one filter run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig<T> {
    /// Step at which learning ends; the last corrected step.
    pub n_train: usize,
    /// Number of in-sample one-step-ahead values reported before `n_train`.
    pub n_testbefore: usize,
    /// Number of forecast values from `n_train` on.
    pub n_predict: usize,
    /// Sampling interval between measurements.
    pub dt: T,
    /// Initial value of every state component.
    pub x0: T,
    /// Initial value of every covariance diagonal entry.
    pub p0: T,
    /// Process-noise strength.
    pub oe: T,
    /// Measurement-noise variance.
    pub rk: T,
    /// Basis frequencies.
    pub freq_basis: Vec<T>,
    /// Phase offset added to every non-zero frequency in `PropForward`.
    pub phase_correction: T,
    #[serde(default)]
    pub method: PredictionMethod,
    /// Apply a non-zero gain only at steps `k` with `k % skip_msmts == 0`.
    #[serde(default = "default_skip_msmts")]
    pub skip_msmts: usize,
    #[serde(default)]
    pub zero_state: ZeroStatePolicy,
}

impl<T: FloatScalar> Default for FilterConfig<T> {
    fn default() -> Self {
        Self {
            n_train: 1,
            n_testbefore: 0,
            n_predict: 0,
            dt: T::one(),
            x0: T::zero(),
            p0: T::one(),
            oe: T::zero(),
            rk: T::one(),
            freq_basis: Vec::new(),
            phase_correction: T::zero(),
            method: PredictionMethod::default(),
            skip_msmts: default_skip_msmts(),
            zero_state: ZeroStatePolicy::default(),
        }
    }
}

impl<T: FloatScalar> FilterConfig<T> {
    /// Total number of steps, `n_train + n_predict`; also the required
    /// measurement sequence length.
    #[inline]
    pub fn num(&self) -> usize {
        self.n_train + self.n_predict
    }

    /// Length of the prediction sequence, `n_testbefore + n_predict`.
    #[inline]
    pub fn output_len(&self) -> usize {
        self.n_testbefore + self.n_predict
    }

    /// Select the forecasting mode by name (`"ZeroGain"` or `"PropForward"`).
    pub fn set_method(&mut self, name: &str) -> Result<(), EstimateError> {
        self.method = name.parse()?;
        Ok(())
    }

    /// Check every parameter, including the basis and the sampling interval.
    pub fn validate(&self) -> Result<(), EstimateError> {
        let invalid = |name, reason| Err(EstimateError::InvalidParameter { name, reason });
        if self.freq_basis.is_empty() {
            return invalid("freq_basis", "at least one basis frequency is required");
        }
        if self.freq_basis.iter().any(|f| !f.is_finite()) {
            return invalid("freq_basis", "basis frequencies must be finite");
        }
        if !(self.dt.is_finite() && self.dt > T::zero()) {
            return invalid("dt", "must be finite and positive");
        }
        if self.n_train == 0 {
            return invalid("n_train", "at least one training step is required");
        }
        if self.n_testbefore > self.n_train {
            return invalid("n_testbefore", "cannot exceed n_train");
        }
        if self.skip_msmts == 0 {
            return invalid("skip_msmts", "must be at least 1");
        }
        if !self.x0.is_finite() {
            return invalid("x0", "must be finite");
        }
        if !(self.p0.is_finite() && self.p0 >= T::zero()) {
            return invalid("p0", "must be finite and non-negative");
        }
        if !self.oe.is_finite() {
            return invalid("oe", "must be finite");
        }
        if !(self.rk.is_finite() && self.rk >= T::zero()) {
            return invalid("rk", "must be finite and non-negative");
        }
        if !self.phase_correction.is_finite() {
            return invalid("phase_correction", "must be finite");
        }
        Ok(())
    }
}

impl<T: FloatScalar + Serialize + DeserializeOwned> FilterConfig<T> {
    /// Parse and validate a JSON configuration.
    pub fn parse(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load and validate a JSON configuration file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
