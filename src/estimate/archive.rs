use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::traits::FloatScalar;

use super::filter::{FilterOutput, Lkffb};
use super::forecast::{propagate_forward, PredictionMethod};

/// Errors from writing or reading a [`RunArchive`].
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid archive descriptor {0:?}: must be non-empty and free of path separators")]
    InvalidDescriptor(String),
    #[error("run has no full history to archive")]
    MissingHistory,
}

/// Dense n-dimensional array: a shape plus row-major (C-order) data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdArray<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
}

impl<T: Copy> NdArray<T> {
    /// Build an array by evaluating `f` at every multi-index in C order.
    pub fn from_fn(shape: &[usize], mut f: impl FnMut(&[usize]) -> T) -> Self {
        let len = shape.iter().product();
        let mut data = Vec::with_capacity(len);
        let mut idx = vec![0usize; shape.len()];
        for _ in 0..len {
            data.push(f(&idx));
            for axis in (0..shape.len()).rev() {
                idx[axis] += 1;
                if idx[axis] < shape[axis] {
                    break;
                }
                idx[axis] = 0;
            }
        }
        Self {
            shape: shape.to_vec(),
            data,
        }
    }

    /// One-dimensional array over a slice.
    pub fn vector(values: &[T]) -> Self {
        Self {
            shape: vec![values.len()],
            data: values.to_vec(),
        }
    }

    /// Element at a multi-index.
    pub fn get(&self, idx: &[usize]) -> T {
        debug_assert_eq!(idx.len(), self.shape.len());
        let flat = idx
            .iter()
            .zip(&self.shape)
            .fold(0, |acc, (&i, &n)| acc * n + i);
        self.data[flat]
    }
}

/// The full-retention bundle of one run.
///
/// Field names serialise to the key set downstream analysis tooling reads;
/// arrays keep the `(rows, cols, step)` layout of that tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunArchive<T> {
    pub descriptor: String,
    pub predictions: NdArray<T>,
    pub y_signal: NdArray<T>,
    pub freq_basis_array: NdArray<T>,
    /// `(2·numf, 1, num)`
    pub x_hat: NdArray<T>,
    /// `(2·numf, 2·numf, num)`
    #[serde(rename = "P_hat")]
    pub p_hat: NdArray<T>,
    /// `(2·numf, 2·numf)`
    pub a: NdArray<T>,
    /// `(1, 2·numf, num)`
    pub h: NdArray<T>,
    /// `(1, 1, num)`
    pub z: NdArray<T>,
    /// `(1, 1, num)`
    pub e_z: NdArray<T>,
    /// `(2·numf, 1, num)`
    #[serde(rename = "W")]
    pub w: NdArray<T>,
    /// `(2·numf, 2·numf, num)`
    #[serde(rename = "Q")]
    pub q: NdArray<T>,
    /// `(2·numf, 2·numf, num)`
    #[serde(rename = "store_S_Outer_W")]
    pub store_s_outer_w: NdArray<T>,
    /// `(1, 1, num)`
    #[serde(rename = "S")]
    pub s: NdArray<T>,
    /// `(numf, num)`
    #[serde(rename = "instantA")]
    pub instant_a: NdArray<T>,
    /// `(numf, num)`
    #[serde(rename = "instantP")]
    pub instant_p: NdArray<T>,
    pub oe: T,
    pub rk: T,
    pub n_train: usize,
    pub n_predict: usize,
    pub n_testbefore: usize,
    pub skip_msmts: usize,
    /// `(num)`: zero before `n_train`, forecast from `n_train` on.
    #[serde(rename = "Propagate_Foward")]
    pub propagate_forward: NdArray<T>,
    pub phase_correction: T,
}

impl<T: FloatScalar> RunArchive<T> {
    /// Assemble the bundle for a full-retention run of `filter` on `signal`.
    pub fn from_run(
        descriptor: &str,
        filter: &Lkffb<T>,
        signal: &[T],
        output: &FilterOutput<T>,
    ) -> Result<Self, ArchiveError> {
        let history = output.history.as_ref().ok_or(ArchiveError::MissingHistory)?;
        let cfg = filter.config();
        let model = filter.model();
        let num = history.num();
        let dim = model.dim();
        let numf = model.numf();

        let forecast = match (cfg.method, output.boundary.as_ref()) {
            (PredictionMethod::PropForward, Some(params)) => propagate_forward(
                model.freqs(),
                model.dt(),
                params,
                cfg.phase_correction,
                cfg.n_train,
                num,
            ),
            (PredictionMethod::PropForward, None) => vec![T::zero(); num],
            (PredictionMethod::ZeroGain, _) => {
                let mut v = history.reconstructions(model);
                v.iter_mut().take(cfg.n_train).for_each(|x| *x = T::zero());
                v
            }
        };

        let per_step_scalar = |values: &[T]| NdArray::from_fn(&[1, 1, num], |i| values[i[2]]);
        let h = model.measurement();

        Ok(Self {
            descriptor: descriptor.to_string(),
            predictions: NdArray::vector(&output.predictions),
            y_signal: NdArray::vector(signal),
            freq_basis_array: NdArray::vector(model.freqs()),
            x_hat: NdArray::from_fn(&[dim, 1, num], |i| history.x_hat[i[2]][i[0]]),
            p_hat: NdArray::from_fn(&[dim, dim, num], |i| history.p_hat[i[2]][(i[0], i[1])]),
            a: NdArray::from_fn(&[dim, dim], |i| model.dynamics()[(i[0], i[1])]),
            h: NdArray::from_fn(&[1, dim, num], |i| h[i[1]]),
            z: per_step_scalar(signal),
            e_z: per_step_scalar(&history.residual),
            w: NdArray::from_fn(&[dim, 1, num], |i| history.gain[i[2]][i[0]]),
            q: NdArray::from_fn(&[dim, dim, num], |i| history.q[i[2]][(i[0], i[1])]),
            store_s_outer_w: NdArray::from_fn(&[dim, dim, num], |i| {
                history.s_outer_w[i[2]][(i[0], i[1])]
            }),
            s: per_step_scalar(&history.s),
            instant_a: NdArray::from_fn(&[numf, num], |i| history.instant_amplitude[i[1]][i[0]]),
            instant_p: NdArray::from_fn(&[numf, num], |i| history.instant_phase[i[1]][i[0]]),
            oe: cfg.oe,
            rk: cfg.rk,
            n_train: cfg.n_train,
            n_predict: cfg.n_predict,
            n_testbefore: cfg.n_testbefore,
            skip_msmts: cfg.skip_msmts,
            propagate_forward: NdArray::vector(&forecast),
            phase_correction: cfg.phase_correction,
        })
    }
}

impl<T: Serialize> RunArchive<T> {
    /// File the archive is written to inside `dir`.
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.json", self.descriptor))
    }

    /// Write the archive to `<dir>/<descriptor>.json`.
    ///
    /// The data goes to a hidden temporary sibling first and is renamed into
    /// place, so readers never observe a partially written archive. On any
    /// failure the temporary file is removed before the error is returned.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, ArchiveError> {
        if self.descriptor.is_empty()
            || self.descriptor.contains(['/', '\\'])
            || self.descriptor == "."
            || self.descriptor == ".."
        {
            return Err(ArchiveError::InvalidDescriptor(self.descriptor.clone()));
        }
        let path = self.path_in(dir);
        let tmp = dir.join(format!(".{}.json.tmp", self.descriptor));
        if let Err(e) = self.write_then_rename(&tmp, &path) {
            // Best effort: nothing exists if `File::create` was what failed.
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(path)
    }

    fn write_then_rename(&self, tmp: &Path, path: &Path) -> Result<(), ArchiveError> {
        let mut writer = BufWriter::new(File::create(tmp)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);
        fs::rename(tmp, path)?;
        Ok(())
    }
}

impl<T: DeserializeOwned> RunArchive<T> {
    /// Read an archive written by [`save`](RunArchive::save).
    pub fn load(path: &Path) -> Result<Self, ArchiveError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
