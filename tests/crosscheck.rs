//! Step-by-step comparison of the predictor/corrector kernels against a
//! textbook Kalman filter written with nalgebra.

use approx::assert_abs_diff_eq;
use nalgebra::{DMatrix, DVector};

use lkffb::estimate::{Corrector, Estimate, FourierModel, Predictor};
use lkffb::{DynMatrix, DynVector, ZeroStatePolicy};

fn to_na(m: &DynMatrix<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(m.nrows(), m.ncols(), |i, j| m[(i, j)])
}

fn noise_features(x: &DVector<f64>, oe: f64) -> DVector<f64> {
    let mut f = DVector::zeros(x.len());
    for p in 0..x.len() / 2 {
        let norm = (x[2 * p].powi(2) + x[2 * p + 1].powi(2)).sqrt();
        f[2 * p] = oe * x[2 * p] / norm;
        f[2 * p + 1] = oe * x[2 * p + 1] / norm;
    }
    f
}

#[test]
fn matches_textbook_filter_over_many_steps() {
    let freqs = [0.02, 0.07, 0.13];
    let dt = 0.8;
    let (oe, rk) = (0.03, 0.05);
    let model = FourierModel::new(&freqs, dt).unwrap();
    let dim = model.dim();

    let a = to_na(model.dynamics());
    let h = DVector::from_row_slice(model.measurement().as_slice());

    let x0 = [0.4, -0.1, 0.2, 0.3, -0.5, 0.1];
    let mut x_ref = DVector::from_row_slice(&x0);
    let mut p_ref = DMatrix::identity(dim, dim) * 0.7;

    let mut post = Estimate {
        x: DynVector::from_slice(&x0),
        p: DynMatrix::scaled_eye(dim, 0.7),
    };
    let mut prior = Estimate::zeros(dim);
    let mut predictor = Predictor::new(dim);
    let mut corrector = Corrector::new(dim);

    for k in 1..=25 {
        let z = (0.3 * k as f64).cos() + 0.5 * (0.9 * k as f64).sin();

        // Reference
        let gamma = &a * noise_features(&x_ref, oe);
        let q = &gamma * gamma.transpose();
        let x_pri = &a * &x_ref;
        let p_pri = &a * &p_ref * a.transpose() + &q;
        let s = h.dot(&(&p_pri * &h)) + rk;
        let w = &p_pri * &h / s;
        let e = z - h.dot(&x_pri);
        x_ref = &x_pri + &w * e;
        p_ref = &p_pri - &w * w.transpose() * s;

        // Library
        predictor
            .predict(&model, &post, oe, ZeroStatePolicy::Isotropic, k, &mut prior)
            .unwrap();
        let c = corrector
            .correct(&model, &prior, z, rk, k, 1, &mut post)
            .unwrap();

        assert_abs_diff_eq!(c.s, s, epsilon = 1e-12);
        assert_abs_diff_eq!(c.residual, e, epsilon = 1e-12);
        for i in 0..dim {
            assert_abs_diff_eq!(corrector.gain()[i], w[i], epsilon = 1e-12);
            assert_abs_diff_eq!(post.x[i], x_ref[i], epsilon = 1e-12);
            for j in 0..dim {
                assert_abs_diff_eq!(predictor.process_noise()[(i, j)], q[(i, j)], epsilon = 1e-12);
                assert_abs_diff_eq!(post.p[(i, j)], p_ref[(i, j)], epsilon = 1e-12);
            }
        }
    }
}

#[test]
fn dynamics_rotate_each_pair() {
    let model = FourierModel::new(&[0.1_f64, 0.25], 1.0).unwrap();
    let a = to_na(model.dynamics());
    // Orthogonal, block diagonal
    let ata = a.transpose() * &a;
    assert_abs_diff_eq!(ata, DMatrix::identity(4, 4), epsilon = 1e-14);
    assert_eq!(a[(0, 2)], 0.0);
    assert_eq!(a[(3, 1)], 0.0);
    // Quarter turn for f·Δt = 0.25
    assert_abs_diff_eq!(a[(2, 2)], 0.0, epsilon = 1e-15);
    assert_abs_diff_eq!(a[(3, 2)].abs(), 1.0, epsilon = 1e-15);
}
