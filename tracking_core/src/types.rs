//! Fundamental types used across the entire workspace.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Scalar type: use f64 throughout for numerical precision in the Kalman filter.
// ---------------------------------------------------------------------------

/// Generic dynamic-size vector (state, measurement, innovation)
pub type DVec = DVector<f64>;

/// Generic dynamic-size matrix (P, F, Q, H, R, S)
pub type DMat = DMatrix<f64>;

// ---------------------------------------------------------------------------
// Identifier type: newtype wrapper so IDs are never confused at compile time
// ---------------------------------------------------------------------------

/// Track identifier. Unique and monotonically allocated within one tracker;
/// never reused after deletion.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// A single bounding-box detection, as supplied by an external detector.
///
/// `z` and `depth` come from an external locator (depth back-projection) and
/// are only present when a depth map was available for the frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Detection {
    /// False for slots the detector has already discarded.
    pub valid: bool,
    /// Box center x (pixels or meters, depending on the deployment).
    pub x: f64,
    /// Box center y.
    pub y: f64,
    /// Depth coordinate of the box center, when available.
    pub z: Option<f64>,
    /// Box width.
    pub w: f64,
    /// Box height.
    pub h: f64,
    /// Box extent along the depth axis, when available.
    pub depth: Option<f64>,
    /// Detector confidence in [0, 1].
    pub confidence: f64,
    /// Object class index.
    pub class_id: usize,
}

impl Detection {
    /// A valid planar detection; z/depth absent.
    pub fn planar(x: f64, y: f64, w: f64, h: f64, confidence: f64, class_id: usize) -> Self {
        Self {
            valid: true,
            x,
            y,
            z: None,
            w,
            h,
            depth: None,
            confidence,
            class_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Measurement
// ---------------------------------------------------------------------------

/// The observable part of one detection, after the admission filter.
///
/// This is what trackers associate and filters correct against. Lengths are
/// fixed by the motion-model variant the owning pipeline was built with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Box center: `[x, y]` planar, `[x, y, z]` volumetric.
    pub position: Vec<f64>,
    /// Box extent: `[w, h]` planar, `[w, h, d]` volumetric.
    pub size: Vec<f64>,
}

impl Measurement {
    pub fn planar(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            position: vec![x, y],
            size: vec![w, h],
        }
    }

    pub fn volumetric(x: f64, y: f64, z: f64, w: f64, h: f64, d: f64) -> Self {
        Self {
            position: vec![x, y, z],
            size: vec![w, h, d],
        }
    }

    /// Frontal box area (width × height).
    pub fn area(&self) -> f64 {
        self.size[0] * self.size[1]
    }

    /// Width / height aspect ratio.
    pub fn aspect(&self) -> f64 {
        self.size[0] / self.size[1]
    }
}
