use serde::{Deserialize, Serialize};

use crate::dynmatrix::{kernels, DynMatrix, DynVector};
use crate::traits::FloatScalar;

use super::correct::Correction;
use super::forecast::extract_into;
use super::predict::Estimate;
use super::FourierModel;

/// How much of the run the orchestrator keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Retention {
    /// Keep only the reconstructed values needed for the output.
    #[default]
    Minimal,
    /// Keep every per-step quantity for offline diagnostics.
    Full,
}

/// Everything the step loop hands to a recorder after one step.
pub(crate) struct StepRecord<'a, T> {
    pub step: usize,
    pub posterior: &'a Estimate<T>,
    pub process_noise: &'a DynMatrix<T>,
    /// `None` for open-loop forecasting steps, which skip the corrector.
    pub update: Option<(&'a Correction<T>, &'a [T])>,
}

/// Sink for the per-step output of the filter loop.
pub(crate) trait Recorder<T> {
    fn record_initial(&mut self, model: &FourierModel<T>, initial: &Estimate<T>);
    fn record(&mut self, model: &FourierModel<T>, rec: StepRecord<'_, T>);
}

/// Reconstructed measurements `h·x` for steps `start..`, nothing else.
#[derive(Debug, Clone)]
pub(crate) struct OutputWindow<T> {
    start: usize,
    values: Vec<T>,
}

impl<T: FloatScalar> OutputWindow<T> {
    pub fn new(start: usize, capacity: usize) -> Self {
        Self {
            start,
            values: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, model: &FourierModel<T>, step: usize, x: &DynVector<T>) {
        if step >= self.start {
            self.values.push(model.reconstruct(x.as_slice()));
        }
    }

    /// Values for steps `start, start + 1, ...` in order.
    pub fn values(&self) -> &[T] {
        &self.values
    }
}

impl<T: FloatScalar> Recorder<T> for OutputWindow<T> {
    fn record_initial(&mut self, model: &FourierModel<T>, initial: &Estimate<T>) {
        self.push(model, 0, &initial.x);
    }

    fn record(&mut self, model: &FourierModel<T>, rec: StepRecord<'_, T>) {
        self.push(model, rec.step, &rec.posterior.x);
    }
}

/// Complete per-step record of a run, indexed by step `0..num`.
///
/// Step 0 holds the initial condition. Steps the loop never reached (beyond
/// `n_train` under `PropForward`, or after an abort) stay zero.
#[derive(Debug, Clone, PartialEq)]
pub struct FullHistory<T> {
    /// Posterior state per step.
    pub x_hat: Vec<DynVector<T>>,
    /// Posterior covariance per step.
    pub p_hat: Vec<DynMatrix<T>>,
    /// Kalman gain per step.
    pub gain: Vec<DynVector<T>>,
    /// Process noise used to reach each step.
    pub q: Vec<DynMatrix<T>>,
    /// Covariance reduction `S·W·Wᵀ` per step.
    pub s_outer_w: Vec<DynMatrix<T>>,
    /// Innovation per step.
    pub residual: Vec<T>,
    /// Innovation covariance per step.
    pub s: Vec<T>,
    /// Instantaneous amplitude, `[step][frequency]`.
    pub instant_amplitude: Vec<Vec<T>>,
    /// Instantaneous phase, `[step][frequency]`.
    pub instant_phase: Vec<Vec<T>>,
    /// Last step the loop completed.
    pub last_step: usize,
}

impl<T: FloatScalar> FullHistory<T> {
    /// Zeroed history for `num` steps of a `numf`-frequency basis.
    pub fn new(numf: usize, num: usize) -> Self {
        let dim = 2 * numf;
        Self {
            x_hat: vec![DynVector::zeros(dim, T::zero()); num],
            p_hat: vec![DynMatrix::zeros(dim, dim, T::zero()); num],
            gain: vec![DynVector::zeros(dim, T::zero()); num],
            q: vec![DynMatrix::zeros(dim, dim, T::zero()); num],
            s_outer_w: vec![DynMatrix::zeros(dim, dim, T::zero()); num],
            residual: vec![T::zero(); num],
            s: vec![T::zero(); num],
            instant_amplitude: vec![vec![T::zero(); numf]; num],
            instant_phase: vec![vec![T::zero(); numf]; num],
            last_step: 0,
        }
    }

    /// Number of steps covered, `n_train + n_predict`.
    #[inline]
    pub fn num(&self) -> usize {
        self.x_hat.len()
    }

    /// Reconstructed measurement `h·x` at every step.
    pub fn reconstructions(&self, model: &FourierModel<T>) -> Vec<T> {
        self.x_hat
            .iter()
            .map(|x| model.reconstruct(x.as_slice()))
            .collect()
    }

    /// Fill the instantaneous amplitude/phase tables for steps `1..num`.
    pub(crate) fn finish(&mut self) {
        for k in 1..self.num() {
            extract_into(
                self.x_hat[k].as_slice(),
                &mut self.instant_amplitude[k],
                &mut self.instant_phase[k],
            );
        }
    }
}

impl<T: FloatScalar> Recorder<T> for FullHistory<T> {
    fn record_initial(&mut self, _model: &FourierModel<T>, initial: &Estimate<T>) {
        if self.num() == 0 {
            return;
        }
        self.x_hat[0].copy_from(&initial.x);
        self.p_hat[0].copy_from(&initial.p);
    }

    fn record(&mut self, _model: &FourierModel<T>, rec: StepRecord<'_, T>) {
        let k = rec.step;
        self.x_hat[k].copy_from(&rec.posterior.x);
        self.p_hat[k].copy_from(&rec.posterior.p);
        self.q[k].copy_from(rec.process_noise);
        if let Some((correction, gain)) = rec.update {
            self.gain[k].as_mut_slice().copy_from_slice(gain);
            self.residual[k] = correction.residual;
            self.s[k] = correction.s;
            kernels::outer_into(gain, gain, &mut self.s_outer_w[k]);
            self.s_outer_w[k]
                .as_mut_slice()
                .iter_mut()
                .for_each(|v| *v = *v * correction.s);
        }
        self.last_step = k;
    }
}
