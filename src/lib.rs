//! # lkffb
//!
//! Linear Kalman filtering in a Fourier basis: tracks the amplitude and phase
//! of a fixed set of sinusoids in a scalar time series and forecasts the
//! series beyond its training window.
//!
//! ## Quick start
//!
//! ```
//! use lkffb::{FilterConfig, Lkffb, PredictionMethod, Retention};
//!
//! let signal: Vec<f64> = (0..60)
//!     .map(|t| (2.0 * core::f64::consts::PI * 0.05 * t as f64).cos())
//!     .collect();
//! let config = FilterConfig {
//!     n_train: 50,
//!     n_testbefore: 5,
//!     n_predict: 10,
//!     p0: 1.0,
//!     oe: 0.001,
//!     rk: 1e-3,
//!     freq_basis: vec![0.0, 0.05, 0.1],
//!     method: PredictionMethod::PropForward,
//!     ..Default::default()
//! };
//!
//! let filter = Lkffb::new(config).unwrap();
//! let out = filter.run(&signal, Retention::Minimal).unwrap();
//! assert_eq!(out.predictions.len(), 15);
//! assert_eq!(out.instant_amplitude().unwrap().len(), 3);
//! ```
//!
//! ## Modules
//!
//! - [`estimate`]: the filter itself. Dynamic model, adaptive process noise,
//!   predictor, corrector, forecasting, and the [`Lkffb`] orchestrator with
//!   minimal or full retention. Full runs can be persisted as a
//!   [`estimate::RunArchive`].
//!
//! - [`config`]: [`FilterConfig`], the serde-backed per-run parameter set.
//!
//! - [`scenario`]: [`ScenarioSet`], independent runs keyed by
//!   `(test_case, variation)`; run in parallel with the `parallel` feature.
//!
//! - [`dynmatrix`]: Heap-allocated `DynMatrix<T>` with runtime dimensions and
//!   the allocation-free per-step [`dynmatrix::kernels`].
//!
//! - [`traits`]: Element trait hierarchy:
//!   - [`Scalar`]: all matrix elements (`Copy + PartialEq + Debug + Zero + One + Num`)
//!   - [`FloatScalar`]: real floats the filter runs on (`f32`, `f64`)
//!
//! ## Cargo features
//!
//! | Feature    | Default | Description |
//! |------------|---------|-------------|
//! | `parallel` | no      | `ScenarioSet::run_all_par` on the rayon thread pool |
//!
//! ## Logging
//!
//! The crate emits `tracing` events (run start, skipped measurements, aborts,
//! archive writes) and never installs a subscriber.

pub mod config;
pub mod dynmatrix;
pub mod estimate;
pub mod scenario;
pub mod traits;

pub use config::{ConfigError, FilterConfig};
pub use dynmatrix::{DynMatrix, DynVector};
pub use estimate::{
    EstimateError, FilterOutput, Lkffb, PredictionMethod, Retention, RunError, ZeroStatePolicy,
};
pub use scenario::{Scenario, ScenarioKey, ScenarioResults, ScenarioSet};
pub use traits::{FloatScalar, Scalar};
