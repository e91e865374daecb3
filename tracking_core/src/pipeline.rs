//! Multi-class facade: admission filter, measurement casting, per-class
//! tracker updates, output aggregation.
//!
//! # Processing steps per frame
//! 1. Cast each class's detection list to measurements, dropping invalid
//!    detections and those failing the size admission bounds.
//! 2. Update every class's tracker (predict → associate → correct →
//!    lifecycle); classes are independent, so they run through rayon.
//! 3. Collect the per-class identity → state maps.

use crate::models::MotionModel;
use crate::tracker::{Tracker, TrackerConfig};
use crate::types::{Detection, Measurement};
use crate::{Result, TrackingError};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Pipeline configuration: class set, motion model, per-tracker settings and
/// the bounding-box admission bounds. Immutable after construction.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Class labels; one tracker per entry, index = class id.
    pub classes: Vec<String>,
    /// Motion-model variant used for every class.
    pub model: MotionModel,
    pub tracker: TrackerConfig,
    pub min_bbox_width: f64,
    pub max_bbox_width: f64,
    pub min_bbox_height: f64,
    pub max_bbox_height: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classes: vec!["object".to_string()],
            model: MotionModel::Planar,
            tracker: TrackerConfig::default(),
            min_bbox_width: 60.0,
            max_bbox_width: 400.0,
            min_bbox_height: 60.0,
            max_bbox_height: 300.0,
        }
    }
}

/// Per-class track-state output: identity → state vector.
pub type ClassStates = BTreeMap<u64, Vec<f64>>;

/// Orchestrates one [`Tracker`] per object class.
pub struct TrackingPipeline {
    config: PipelineConfig,
    trackers: Vec<Tracker>,
}

impl TrackingPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        if config.classes.is_empty() {
            return Err(TrackingError::NoClasses);
        }
        let trackers = config
            .classes
            .iter()
            .map(|_| Tracker::new(config.model, config.tracker.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { config, trackers })
    }

    /// Run one frame with the configured default interval.
    pub fn track(&mut self, detections: &[Vec<Detection>]) -> Result<Vec<ClassStates>> {
        self.track_with_dt(detections, self.config.tracker.dt)
    }

    /// Run one frame with a caller-measured interval (e.g. a wall-clock
    /// delta). `detections` must hold one list per configured class.
    pub fn track_with_dt(
        &mut self,
        detections: &[Vec<Detection>],
        dt: f64,
    ) -> Result<Vec<ClassStates>> {
        if detections.len() != self.trackers.len() {
            return Err(TrackingError::ClassCount {
                expected: self.trackers.len(),
                got: detections.len(),
            });
        }
        if dt <= 0.0 {
            return Err(TrackingError::InvalidTimeStep(dt));
        }

        let cast: Vec<Vec<Measurement>> = detections
            .iter()
            .map(|class_dets| self.cast_to_measurements(class_dets))
            .collect();

        self.trackers
            .par_iter_mut()
            .zip(cast.into_par_iter())
            .map(|(tracker, measurements)| {
                tracker.update(dt, &measurements)?;
                Ok(tracker.states())
            })
            .collect()
    }

    /// Admission filter + cast for one class's detection list. Invalid
    /// detections, detections with non-finite fields, out-of-bounds boxes,
    /// and (for volumetric models) detections without a depth position are
    /// silently dropped.
    pub fn cast_to_measurements(&self, detections: &[Detection]) -> Vec<Measurement> {
        detections.iter().filter_map(|d| self.cast_one(d)).collect()
    }

    fn cast_one(&self, d: &Detection) -> Option<Measurement> {
        if !d.valid {
            return None;
        }
        // Non-finite fields must never reach a filter; NaN also defeats the
        // bounds comparisons below, so it is screened first.
        let finite = d.x.is_finite()
            && d.y.is_finite()
            && d.w.is_finite()
            && d.h.is_finite()
            && d.z.map_or(true, f64::is_finite)
            && d.depth.map_or(true, f64::is_finite);
        if !finite {
            debug!(x = d.x, y = d.y, w = d.w, h = d.h, "detection rejected: non-finite field");
            return None;
        }
        let c = &self.config;
        if !(d.w >= c.min_bbox_width
            && d.w <= c.max_bbox_width
            && d.h >= c.min_bbox_height
            && d.h <= c.max_bbox_height)
        {
            debug!(w = d.w, h = d.h, "detection rejected: size out of bounds");
            return None;
        }
        match c.model {
            MotionModel::Planar | MotionModel::PlanarHeading => {
                Some(Measurement::planar(d.x, d.y, d.w, d.h))
            }
            MotionModel::Volumetric => {
                let Some(z) = d.z else {
                    debug!(x = d.x, y = d.y, "detection rejected: no depth position");
                    return None;
                };
                // The locator reports no depth extent for flat boxes; fall
                // back to the width, as the 3D box builder does.
                Some(Measurement::volumetric(
                    d.x,
                    d.y,
                    z,
                    d.w,
                    d.h,
                    d.depth.unwrap_or(d.w),
                ))
            }
            MotionModel::VolumetricFixed => {
                let Some(z) = d.z else {
                    debug!(x = d.x, y = d.y, "detection rejected: no depth position");
                    return None;
                };
                Some(Measurement {
                    position: vec![d.x, d.y, z],
                    size: vec![d.w, d.h],
                })
            }
        }
    }

    /// Current identity → state maps without advancing the trackers.
    pub fn states(&self) -> Vec<ClassStates> {
        self.trackers.iter().map(|t| t.states()).collect()
    }

    pub fn classes(&self) -> &[String] {
        &self.config.classes
    }

    pub fn class_label(&self, class_id: usize) -> Option<&str> {
        self.config.classes.get(class_id).map(String::as_str)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Drop every track in every class.
    pub fn reset(&mut self) {
        for tracker in &mut self.trackers {
            tracker.clear();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
