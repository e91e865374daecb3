//! Single-object Kalman filter: the predict / correct cycle shared by every
//! motion-model variant.
//!
//! # Design choices
//! - All math is done in `f64` via `nalgebra` dynamic matrices; the state
//!   dimensionality is fixed by the [`MotionModel`] at construction.
//! - The observation model is a selection matrix: position rows are always
//!   observed, size rows only with `use_dim`, velocity rows only with
//!   `use_vel`. H and R are rebuilt whenever those flags would change which
//!   rows participate.
//! - The covariance update uses the Joseph form, which preserves symmetry
//!   and positive semi-definiteness better than `(I − K·H)·P`.
//! - Numerical degeneration (singular innovation covariance, non-finite
//!   state) is reported as an error so the owning tracker can terminate the
//!   track; corrupted numbers are never left in place.

use crate::models::MotionModel;
use crate::types::{DMat, DVec, Measurement};
use crate::{Result, TrackingError};

/// Construction-time filter configuration. Immutable after construction.
#[derive(Clone, Debug)]
pub struct FilterConfig {
    /// Default prediction interval (seconds).
    pub dt: f64,
    /// Observe the box extent during correction.
    pub use_dim: bool,
    /// Observe velocity during correction.
    pub use_vel: bool,
    /// Process noise diagonal, one entry per state component.
    pub process_noise: Vec<f64>,
    /// Measurement noise diagonal, one entry per state component; the rows
    /// matching observed components are selected when R is built.
    pub measurement_noise: Vec<f64>,
    /// Initial covariance diagonal value.
    pub initial_covariance: f64,
}

/// Recursive state estimator for one tracked object.
#[derive(Clone, Debug)]
pub struct ObjectFilter {
    model: MotionModel,
    dt: f64,
    x: DVec,
    p: DMat,
    q: DMat,
    h: DMat,
    r: DMat,
    initial_covariance: f64,
}

impl ObjectFilter {
    /// Validate the configuration and build the filter. The state starts at
    /// zero; call [`ObjectFilter::initialize`] with the first measurement
    /// before predicting or correcting.
    pub fn new(model: MotionModel, config: &FilterConfig) -> Result<Self> {
        let n = model.state_dim();
        if config.dt <= 0.0 {
            return Err(TrackingError::InvalidTimeStep(config.dt));
        }
        if config.process_noise.len() != n {
            return Err(TrackingError::NoiseDimension {
                expected: n,
                got: config.process_noise.len(),
            });
        }
        if config.measurement_noise.len() != n {
            return Err(TrackingError::NoiseDimension {
                expected: n,
                got: config.measurement_noise.len(),
            });
        }

        let q = DMat::from_diagonal(&DVec::from_vec(config.process_noise.clone()));
        let rows = observed_rows(model, config.use_dim, config.use_vel);
        let (h, r) = build_observation(model, &rows, &config.measurement_noise);

        Ok(Self {
            model,
            dt: config.dt,
            x: DVec::zeros(n),
            p: DMat::identity(n, n) * config.initial_covariance,
            q,
            h,
            r,
            initial_covariance: config.initial_covariance,
        })
    }

    /// Seed state and covariance from the first observation. Velocity and
    /// heading components start at zero and are derived by later corrections.
    pub fn initialize(&mut self, m: &Measurement) {
        let n = self.model.state_dim();
        self.x = self.model.initial_state(m);
        self.p = DMat::identity(n, n) * self.initial_covariance;
    }

    /// Re-seed state and covariance in place, e.g. after a long
    /// prediction-only gap. The owning track keeps its identity.
    pub fn reset(&mut self, m: &Measurement) {
        self.initialize(m);
    }

    /// Propagate state and covariance forward by `dt` seconds.
    pub fn predict(&mut self, dt: f64) -> Result<()> {
        if dt <= 0.0 {
            return Err(TrackingError::InvalidTimeStep(dt));
        }
        let (pred, f) = self.model.transition(&self.x, dt);
        self.x = pred;
        self.p = &f * &self.p * f.transpose() + &self.q;
        self.check_finite()
    }

    /// Propagate by the configured default interval.
    pub fn predict_default(&mut self) -> Result<()> {
        self.predict(self.dt)
    }

    /// Project a cast measurement onto the observed components, producing the
    /// vector `correct` expects. Unobservable slots (velocity) contribute
    /// zeros, matching how detections are cast.
    pub fn measurement_vector(&self, m: &Measurement) -> DVec {
        &self.h * self.model.initial_state(m)
    }

    /// Fold one measurement into the estimate. `z` must have exactly
    /// [`ObjectFilter::observed_dim`] entries.
    pub fn correct(&mut self, z: &DVec) -> Result<()> {
        if z.len() != self.h.nrows() {
            return Err(TrackingError::MeasurementDimension {
                expected: self.h.nrows(),
                got: z.len(),
            });
        }

        // Innovation: ν = z − H·x
        let innovation = z - &self.h * &self.x;

        // Innovation covariance: S = H·P·Hᵀ + R (LU for numerical safety)
        let s = &self.h * &self.p * self.h.transpose() + &self.r;
        let s_inv = s.lu().try_inverse().ok_or(TrackingError::SingularInnovation)?;

        // Kalman gain: K = P·Hᵀ·S⁻¹
        let k = &self.p * self.h.transpose() * s_inv;

        // Updated state: x' = x + K·ν
        self.x += &k * innovation;

        // Joseph form: P' = (I−KH)·P·(I−KH)ᵀ + K·R·Kᵀ
        let n = self.model.state_dim();
        let i_kh = DMat::identity(n, n) - &k * &self.h;
        self.p = &i_kh * &self.p * i_kh.transpose() + &k * &self.r * k.transpose();

        self.check_finite()
    }

    /// Read-only state snapshot.
    pub fn state(&self) -> &DVec {
        &self.x
    }

    /// Covariance diagonal: the per-component estimate uncertainty.
    pub fn uncertainty(&self) -> DVec {
        self.p.diagonal()
    }

    /// Number of observed components under the current flags.
    pub fn observed_dim(&self) -> usize {
        self.h.nrows()
    }

    pub fn model(&self) -> MotionModel {
        self.model
    }

    /// The configured default prediction interval.
    pub fn default_dt(&self) -> f64 {
        self.dt
    }

    fn check_finite(&self) -> Result<()> {
        let state_ok = self.x.iter().all(|v| v.is_finite());
        // A negative diagonal means P lost positive semi-definiteness.
        let cov_ok = self.p.iter().all(|v| v.is_finite())
            && self.p.diagonal().iter().all(|v| *v >= 0.0);
        if state_ok && cov_ok {
            Ok(())
        } else {
            Err(TrackingError::NumericalInstability)
        }
    }
}

/// State rows that participate in correction: position always, velocity and
/// size only when enabled.
fn observed_rows(model: MotionModel, use_dim: bool, use_vel: bool) -> Vec<usize> {
    let mut rows: Vec<usize> = model.position_range().collect();
    if use_vel {
        if let Some(vel) = model.velocity_range() {
            rows.extend(vel);
        }
    }
    if use_dim {
        rows.extend(model.size_range());
    }
    rows
}

/// Build the selection matrix H and the matching noise matrix R from the
/// observed rows and the state-length noise diagonal.
fn build_observation(model: MotionModel, rows: &[usize], noise: &[f64]) -> (DMat, DMat) {
    let n = model.state_dim();
    let m = rows.len();
    let mut h = DMat::zeros(m, n);
    let mut r = DMat::zeros(m, m);
    for (i, &row) in rows.iter().enumerate() {
        h[(i, row)] = 1.0;
        r[(i, i)] = noise[row];
    }
    (h, r)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn planar_config() -> FilterConfig {
        FilterConfig {
            dt: 0.02,
            use_dim: true,
            use_vel: false,
            process_noise: vec![9.0, 9.0, 200.0, 200.0, 5.0, 5.0],
            measurement_noise: vec![2.0, 2.0, 200.0, 200.0, 2.0, 2.0],
            initial_covariance: 10.0,
        }
    }

    fn planar_filter() -> ObjectFilter {
        ObjectFilter::new(MotionModel::Planar, &planar_config()).unwrap()
    }

    #[test]
    fn rejects_bad_configuration() {
        let mut cfg = planar_config();
        cfg.dt = 0.0;
        assert_eq!(
            ObjectFilter::new(MotionModel::Planar, &cfg).err(),
            Some(TrackingError::InvalidTimeStep(0.0))
        );

        let mut cfg = planar_config();
        cfg.process_noise.pop();
        assert!(matches!(
            ObjectFilter::new(MotionModel::Planar, &cfg),
            Err(TrackingError::NoiseDimension { expected: 6, got: 5 })
        ));
    }

    #[test]
    fn observation_selects_position_and_size() {
        let filter = planar_filter();
        // x, y, w, h observed; vx, vy not.
        assert_eq!(filter.observed_dim(), 4);

        let mut cfg = planar_config();
        cfg.use_vel = true;
        let filter = ObjectFilter::new(MotionModel::Planar, &cfg).unwrap();
        assert_eq!(filter.observed_dim(), 6);

        let mut cfg = planar_config();
        cfg.use_dim = false;
        let filter = ObjectFilter::new(MotionModel::Planar, &cfg).unwrap();
        assert_eq!(filter.observed_dim(), 2);
    }

    #[test]
    fn predict_moves_with_velocity() {
        let mut filter = planar_filter();
        filter.initialize(&Measurement::planar(100.0, 100.0, 40.0, 80.0));
        filter.x[2] = 10.0; // vx
        filter.predict(1.0).unwrap();
        assert_abs_diff_eq!(filter.state()[0], 110.0, epsilon = 1e-9);
        assert_abs_diff_eq!(filter.state()[2], 10.0, epsilon = 1e-9);
    }

    #[test]
    fn coasting_covariance_is_non_decreasing() {
        let mut filter = planar_filter();
        filter.initialize(&Measurement::planar(100.0, 100.0, 40.0, 80.0));
        let mut prev = filter.uncertainty();
        for _ in 0..10 {
            filter.predict_default().unwrap();
            let cur = filter.uncertainty();
            for i in 0..6 {
                assert!(cur[i] >= prev[i] - 1e-12);
            }
            prev = cur;
        }
    }

    #[test]
    fn correct_with_predicted_observation_is_identity() {
        let mut filter = planar_filter();
        filter.initialize(&Measurement::planar(100.0, 100.0, 40.0, 80.0));
        filter.predict_default().unwrap();

        // A measurement exactly equal to the predicted observation has zero
        // innovation and must leave the state untouched.
        let z = &filter.h * &filter.x;
        let before = filter.state().clone();
        filter.correct(&z).unwrap();
        for i in 0..6 {
            assert_abs_diff_eq!(filter.state()[i], before[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn correct_reduces_uncertainty() {
        let mut filter = planar_filter();
        filter.initialize(&Measurement::planar(100.0, 100.0, 40.0, 80.0));
        filter.predict_default().unwrap();
        let prior: f64 = filter.uncertainty().iter().sum();

        let z = filter.measurement_vector(&Measurement::planar(101.0, 99.0, 40.0, 80.0));
        filter.correct(&z).unwrap();
        let posterior: f64 = filter.uncertainty().iter().sum();
        assert!(posterior < prior, "correction should reduce uncertainty");
    }

    #[test]
    fn correct_rejects_wrong_measurement_length() {
        let mut filter = planar_filter();
        filter.initialize(&Measurement::planar(100.0, 100.0, 40.0, 80.0));
        let z = DVec::from_vec(vec![1.0, 2.0]);
        assert_eq!(
            filter.correct(&z),
            Err(TrackingError::MeasurementDimension { expected: 4, got: 2 })
        );
    }

    #[test]
    fn velocity_is_derived_from_successive_corrections() {
        let mut filter = planar_filter();
        filter.initialize(&Measurement::planar(0.0, 0.0, 40.0, 80.0));
        // Object moving +50 px/s in x, observed every 0.02 s.
        for k in 1..=50 {
            filter.predict_default().unwrap();
            let x = 50.0 * 0.02 * k as f64;
            let z = filter.measurement_vector(&Measurement::planar(x, 0.0, 40.0, 80.0));
            filter.correct(&z).unwrap();
        }
        assert!(
            filter.state()[2] > 20.0,
            "vx should converge toward 50, got {}",
            filter.state()[2]
        );
    }

    #[test]
    fn reset_reseeds_state_and_covariance() {
        let mut filter = planar_filter();
        filter.initialize(&Measurement::planar(100.0, 100.0, 40.0, 80.0));
        for _ in 0..20 {
            filter.predict_default().unwrap();
        }
        filter.reset(&Measurement::planar(300.0, 300.0, 40.0, 80.0));
        assert_abs_diff_eq!(filter.state()[0], 300.0, epsilon = 1e-12);
        assert_abs_diff_eq!(filter.uncertainty()[0], 10.0, epsilon = 1e-12);
    }

    #[test]
    fn volumetric_fixed_observes_full_state() {
        let cfg = FilterConfig {
            dt: 0.02,
            use_dim: true,
            use_vel: false,
            process_noise: vec![9.0; 5],
            measurement_noise: vec![2.0; 5],
            initial_covariance: 10.0,
        };
        let mut filter = ObjectFilter::new(MotionModel::VolumetricFixed, &cfg).unwrap();
        assert_eq!(filter.observed_dim(), 5);
        filter.initialize(&Measurement {
            position: vec![1.0, 2.0, 3.0],
            size: vec![40.0, 80.0],
        });
        filter.predict_default().unwrap();
        // Static model: prediction does not move the state.
        assert_abs_diff_eq!(filter.state()[0], 1.0, epsilon = 1e-12);
    }
}
