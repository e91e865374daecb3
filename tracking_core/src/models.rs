//! Motion-model variants: state layout and transition structure.
//!
//! # Design choices
//! - The filter variants form a closed set, so they are a tagged enum rather
//!   than a trait hierarchy. One predict/correct contract in
//!   [`crate::filter::ObjectFilter`] covers all of them.
//! - Linear variants have a constant-structure transition matrix parameterized
//!   by `dt`. [`MotionModel::PlanarHeading`] is nonlinear: the velocity vector
//!   is rotated by the current heading before integration, and the Jacobian is
//!   recomputed from the current state on every predict.
//!
//! ## State vectors
//! - `Planar`:          x = [x, y, vx, vy, w, h]
//! - `PlanarHeading`:   x = [x, y, θ, vx, vy, vθ, w, h]
//! - `Volumetric`:      x = [x, y, z, vx, vy, vz, w, h, d]
//! - `VolumetricFixed`: x = [x, y, z, w, h]

use crate::types::{DMat, DVec, Measurement};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// The motion-model variant backing one filter instance. Fixes the state
/// dimensionality and the transition/observation structure at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionModel {
    /// Planar position + velocity + size; linear constant velocity.
    Planar,
    /// Planar position + heading + velocities + size; nonlinear transition.
    PlanarHeading,
    /// Volumetric position + velocity + size; linear constant velocity.
    Volumetric,
    /// Volumetric position + size with no velocity; static objects.
    VolumetricFixed,
}

impl MotionModel {
    /// Total state dimensionality.
    pub fn state_dim(self) -> usize {
        match self {
            Self::Planar => 6,
            Self::PlanarHeading => 8,
            Self::Volumetric => 9,
            Self::VolumetricFixed => 5,
        }
    }

    /// State rows holding the box-center position (always observed).
    pub fn position_range(self) -> Range<usize> {
        match self {
            Self::Planar | Self::PlanarHeading => 0..2,
            Self::Volumetric | Self::VolumetricFixed => 0..3,
        }
    }

    /// State rows holding velocities, `None` for the static model.
    /// Includes the angular velocity for `PlanarHeading`.
    pub fn velocity_range(self) -> Option<Range<usize>> {
        match self {
            Self::Planar => Some(2..4),
            Self::PlanarHeading => Some(3..6),
            Self::Volumetric => Some(3..6),
            Self::VolumetricFixed => None,
        }
    }

    /// State rows holding the box extent.
    pub fn size_range(self) -> Range<usize> {
        match self {
            Self::Planar => 4..6,
            Self::PlanarHeading => 6..8,
            Self::Volumetric => 6..9,
            Self::VolumetricFixed => 3..5,
        }
    }

    /// Build the initial state from a first measurement: position and size
    /// copied in, heading and all velocities zeroed.
    pub fn initial_state(self, m: &Measurement) -> DVec {
        let mut x = DVec::zeros(self.state_dim());
        for (row, value) in self.position_range().zip(m.position.iter()) {
            x[row] = *value;
        }
        for (row, value) in self.size_range().zip(m.size.iter()) {
            x[row] = *value;
        }
        x
    }

    /// Propagate `x` forward by `dt` seconds. Returns the predicted state and
    /// the transition matrix: for `PlanarHeading` that matrix is the Jacobian
    /// evaluated at `x`, for the linear variants it is the constant-structure
    /// F(dt).
    pub fn transition(self, x: &DVec, dt: f64) -> (DVec, DMat) {
        let n = self.state_dim();
        match self {
            Self::Planar => {
                let mut f = DMat::identity(n, n);
                f[(0, 2)] = dt;
                f[(1, 3)] = dt;
                (&f * x, f)
            }
            Self::Volumetric => {
                let mut f = DMat::identity(n, n);
                for i in 0..3 {
                    f[(i, i + 3)] = dt;
                }
                (&f * x, f)
            }
            Self::VolumetricFixed => {
                // Static object: state is carried through unchanged.
                (x.clone(), DMat::identity(n, n))
            }
            Self::PlanarHeading => {
                let (sin_t, cos_t) = x[2].sin_cos();
                let (vx, vy, vt) = (x[3], x[4], x[5]);

                let mut pred = x.clone();
                pred[0] = x[0] + (cos_t * vx - sin_t * vy) * dt;
                pred[1] = x[1] + (sin_t * vx + cos_t * vy) * dt;
                pred[2] = x[2] + vt * dt;

                // First-order linearization of the rotated integration.
                let mut f = DMat::identity(n, n);
                f[(0, 2)] = (-sin_t * vx - cos_t * vy) * dt;
                f[(0, 3)] = cos_t * dt;
                f[(0, 4)] = -sin_t * dt;
                f[(1, 2)] = (cos_t * vx - sin_t * vy) * dt;
                f[(1, 3)] = sin_t * dt;
                f[(1, 4)] = cos_t * dt;
                f[(2, 5)] = dt;
                (pred, f)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
