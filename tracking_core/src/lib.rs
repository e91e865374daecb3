//! `tracking_core` — per-class multi-object tracking for visual detections.
//!
//! # Module layout
//! - [`types`]       — Fundamental types (track IDs, detections, measurements)
//! - [`models`]      — Motion-model variants (planar, heading, volumetric)
//! - [`filter`]      — Single-object Kalman filter (predict / correct)
//! - [`association`] — Gated nearest-neighbor data association
//! - [`tracker`]     — Per-class track pool and lifecycle
//! - [`pipeline`]    — Multi-class facade: admission filter + aggregation

pub mod association;
pub mod filter;
pub mod models;
pub mod pipeline;
pub mod tracker;
pub mod types;

pub use filter::{FilterConfig, ObjectFilter};
pub use models::MotionModel;
pub use pipeline::{PipelineConfig, TrackingPipeline};
pub use tracker::{Track, Tracker, TrackerConfig};
pub use types::{Detection, Measurement, TrackId};

use thiserror::Error;

/// Errors produced by the tracking core.
///
/// Configuration errors surface at construction; the numerical variants are
/// per-track and recoverable (the owning tracker terminates the track).
/// Admission rejections and failed association gates are normal branches,
/// not errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackingError {
    /// A configured noise vector does not match the state dimensionality.
    #[error("noise vector has {got} entries, state dimension is {expected}")]
    NoiseDimension { expected: usize, got: usize },
    /// The prediction interval must be strictly positive.
    #[error("time step must be strictly positive, got {0}")]
    InvalidTimeStep(f64),
    /// The measurement passed to `correct` has the wrong length.
    #[error("measurement has {got} entries, observed dimension is {expected}")]
    MeasurementDimension { expected: usize, got: usize },
    #[error("at least one object class is required")]
    NoClasses,
    #[error("detections supplied for {got} classes, pipeline has {expected}")]
    ClassCount { expected: usize, got: usize },
    /// The innovation covariance could not be inverted.
    #[error("innovation covariance is singular")]
    SingularInnovation,
    /// The state or covariance stopped being finite.
    #[error("filter state is no longer finite")]
    NumericalInstability,
}

pub type Result<T> = std::result::Result<T, TrackingError>;
