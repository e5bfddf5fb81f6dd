use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::config::FilterConfig;
use crate::traits::FloatScalar;

use super::archive::RunArchive;
use super::correct::Corrector;
use super::forecast::{harmonic_value, InstantParams, PredictionMethod};
use super::history::{FullHistory, OutputWindow, Recorder, Retention, StepRecord};
use super::predict::{Estimate, Predictor};
use super::{EstimateError, FourierModel, RunError};

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutput<T> {
    /// `n_testbefore` in-sample values followed by `n_predict` forecasts.
    pub predictions: Vec<T>,
    /// Amplitude and phase of the posterior at `n_train`; `None` when the
    /// run has no forecast window.
    pub boundary: Option<InstantParams<T>>,
    /// Per-step record, present under [`Retention::Full`].
    pub history: Option<FullHistory<T>>,
}

impl<T> FilterOutput<T> {
    /// Instantaneous amplitude per frequency at the training boundary.
    pub fn instant_amplitude(&self) -> Option<&[T]> {
        self.boundary.as_ref().map(|b| b.amplitude.as_slice())
    }
}

/// Linear Kalman filter in a Fourier basis.
///
/// Construction validates the configuration and builds the dynamic model
/// once; [`run`](Self::run) may then be called on any number of measurement
/// sequences. Each run owns all of its buffers, so one `Lkffb` can be shared
/// across threads.
#[derive(Debug, Clone)]
pub struct Lkffb<T> {
    config: FilterConfig<T>,
    model: FourierModel<T>,
}

impl<T: FloatScalar> Lkffb<T> {
    pub fn new(config: FilterConfig<T>) -> Result<Self, EstimateError> {
        config.validate()?;
        let model = FourierModel::new(&config.freq_basis, config.dt)?;
        Ok(Self { config, model })
    }

    #[inline]
    pub fn config(&self) -> &FilterConfig<T> {
        &self.config
    }

    #[inline]
    pub fn model(&self) -> &FourierModel<T> {
        &self.model
    }

    /// Filter `signal` and assemble the prediction sequence.
    ///
    /// `signal` must hold `n_train + n_predict` measurements; entry 0 pairs
    /// with the initial condition and is never used for a correction.
    /// Measurements beyond `n_train` are ignored by the filter.
    pub fn run(&self, signal: &[T], retention: Retention) -> Result<FilterOutput<T>, RunError<T>> {
        let cfg = &self.config;
        let num = cfg.num();
        if signal.len() != num {
            return Err(EstimateError::DimensionMismatch {
                what: "measurements",
                expected: num,
                got: signal.len(),
            }
            .into());
        }
        debug!(
            numf = self.model.numf(),
            num,
            method = %cfg.method,
            ?retention,
            "starting LKFFB run"
        );

        let start = cfg.n_train - cfg.n_testbefore;
        match retention {
            Retention::Minimal => {
                let mut window = OutputWindow::new(start, cfg.output_len());
                match self.drive(signal, &mut window) {
                    Ok(boundary) => {
                        let predictions = self.assemble(window.values(), boundary.as_ref());
                        Ok(FilterOutput {
                            predictions,
                            boundary,
                            history: None,
                        })
                    }
                    Err(source) => Err(self.abort(source, window.values().to_vec())),
                }
            }
            Retention::Full => {
                let mut history = FullHistory::new(self.model.numf(), num);
                let outcome = self.drive(signal, &mut history);
                let trajectory = history.reconstructions(&self.model);
                match outcome {
                    Ok(boundary) => {
                        history.finish();
                        let predictions = self.assemble(&trajectory[start..], boundary.as_ref());
                        Ok(FilterOutput {
                            predictions,
                            boundary,
                            history: Some(history),
                        })
                    }
                    Err(source) => {
                        let partial = trajectory
                            .get(start..=history.last_step)
                            .map(<[T]>::to_vec)
                            .unwrap_or_default();
                        Err(self.abort(source, partial))
                    }
                }
            }
        }
    }

    /// Closed-form forecast for steps `n_train..n_train + n_predict` from a
    /// set of frozen amplitudes and phases, one per basis frequency.
    pub fn synthesize_forecast(&self, params: &InstantParams<T>) -> Result<Vec<T>, EstimateError> {
        let numf = self.model.numf();
        for (what, got) in [
            ("instant amplitudes", params.amplitude.len()),
            ("instant phases", params.phase.len()),
        ] {
            if got != numf {
                return Err(EstimateError::DimensionMismatch {
                    what,
                    expected: numf,
                    got,
                });
            }
        }
        Ok(self.forecast_from(params))
    }

    fn forecast_from(&self, params: &InstantParams<T>) -> Vec<T> {
        let cfg = &self.config;
        (cfg.n_train..cfg.num())
            .map(|tn| {
                harmonic_value(
                    self.model.freqs(),
                    self.model.dt(),
                    params,
                    cfg.phase_correction,
                    tn,
                )
            })
            .collect()
    }

    /// Run with full retention and write the result to
    /// `<dir>/<descriptor>.json`, returning the output and the file path.
    pub fn run_and_persist(
        &self,
        descriptor: &str,
        signal: &[T],
        dir: &Path,
    ) -> Result<(FilterOutput<T>, PathBuf), RunError<T>>
    where
        T: Serialize,
    {
        let output = self.run(signal, Retention::Full)?;
        let archive =
            RunArchive::from_run(descriptor, self, signal, &output).map_err(EstimateError::from)?;
        let path = archive.save(dir).map_err(EstimateError::from)?;
        info!(path = %path.display(), "wrote run archive");
        Ok((output, path))
    }

    /// Last step the loop visits. `PropForward` needs nothing past the
    /// boundary; `ZeroGain` propagates open-loop to the end of the run.
    fn last_step(&self) -> usize {
        let last = self.config.num() - 1;
        match self.config.method {
            PredictionMethod::ZeroGain => last,
            PredictionMethod::PropForward => last.min(self.config.n_train),
        }
    }

    /// The step loop shared by both retention policies.
    fn drive<R: Recorder<T>>(
        &self,
        z: &[T],
        rec: &mut R,
    ) -> Result<Option<InstantParams<T>>, EstimateError> {
        let cfg = &self.config;
        let model = &self.model;
        let dim = model.dim();

        let mut posterior = Estimate::initial(dim, cfg.x0, cfg.p0);
        let mut prior = Estimate::zeros(dim);
        let mut predictor = Predictor::new(dim);
        let mut corrector = Corrector::new(dim);
        let mut boundary = None;

        rec.record_initial(model, &posterior);
        for k in 1..=self.last_step() {
            predictor.predict(model, &posterior, cfg.oe, cfg.zero_state, k, &mut prior)?;
            if predictor.substituted_pairs() > 0 {
                trace!(
                    step = k,
                    pairs = predictor.substituted_pairs(),
                    policy = ?cfg.zero_state,
                    "zero-state noise feature substituted"
                );
            }

            if k > cfg.n_train {
                core::mem::swap(&mut posterior, &mut prior);
                rec.record(
                    model,
                    StepRecord {
                        step: k,
                        posterior: &posterior,
                        process_noise: predictor.process_noise(),
                        update: None,
                    },
                );
                continue;
            }

            let correction =
                corrector.correct(model, &prior, z[k], cfg.rk, k, cfg.skip_msmts, &mut posterior)?;
            if !correction.applied {
                trace!(step = k, "measurement skipped");
            }
            rec.record(
                model,
                StepRecord {
                    step: k,
                    posterior: &posterior,
                    process_noise: predictor.process_noise(),
                    update: Some((&correction, corrector.gain())),
                },
            );
            if k == cfg.n_train {
                boundary = Some(InstantParams::from_state(posterior.x.as_slice()));
            }
        }
        Ok(boundary)
    }

    /// In-sample values followed by the forecast. `trajectory` starts at step
    /// `n_train − n_testbefore`.
    fn assemble(&self, trajectory: &[T], boundary: Option<&InstantParams<T>>) -> Vec<T> {
        let cfg = &self.config;
        let mut out = Vec::with_capacity(cfg.output_len());
        out.extend_from_slice(&trajectory[..cfg.n_testbefore]);
        if cfg.n_predict > 0 {
            match (cfg.method, boundary) {
                (PredictionMethod::ZeroGain, _) => {
                    out.extend_from_slice(&trajectory[cfg.n_testbefore..cfg.output_len()])
                }
                (PredictionMethod::PropForward, Some(params)) => {
                    out.extend(self.forecast_from(params))
                }
                (PredictionMethod::PropForward, None) => {}
            }
        }
        out
    }

    fn abort(&self, source: EstimateError, mut partial: Vec<T>) -> RunError<T> {
        partial.truncate(self.config.output_len());
        warn!(error = %source, produced = partial.len(), "LKFFB run aborted");
        RunError::Aborted { source, partial }
    }
}
