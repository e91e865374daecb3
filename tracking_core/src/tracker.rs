//! Per-class track pool: prediction, association, correction, lifecycle.
//!
//! # Track lifecycle
//! - **Birth**: each unmatched measurement spawns a track with the next
//!   monotonic identity; identities are never reused.
//! - **Active**: a just-created or just-corrected track, `skipped_frames = 0`.
//! - **Coasting**: an unmatched track advances by prediction only and its
//!   miss counter grows by one per frame.
//! - **Deletion**: the first frame the miss counter exceeds
//!   `max_frames_to_skip`, or immediately on numerical failure.
//!
//! The tracker is the only writer to its tracks; callers read state
//! snapshots through [`Tracker::states`].

use crate::association::{gated_cost, greedy_assign, Assignment, CandidatePair, GateConfig};
use crate::filter::{FilterConfig, ObjectFilter};
use crate::models::MotionModel;
use crate::types::{Measurement, TrackId};
use crate::{Result, TrackingError};
use std::collections::BTreeMap;
use tracing::debug;

/// Configuration for one per-class tracker. Immutable after construction.
///
/// The defaults are the original deployment's parameter block for the planar
/// model; the noise vectors must be resized when a different motion model is
/// used.
#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// Consecutive misses a track survives; it is deleted when the counter
    /// exceeds this value.
    pub max_frames_to_skip: u32,
    /// Association gate: maximum center distance (also the cost).
    pub dist_threshold: f64,
    /// Association gate: maximum planar box-center distance.
    pub center_threshold: f64,
    /// Association gate: maximum area ratio.
    pub area_threshold: f64,
    /// Association gate: minimum aspect-ratio agreement.
    pub body_ratio: f64,
    /// Default frame interval (seconds).
    pub dt: f64,
    /// Observe the box extent during correction.
    pub use_dim: bool,
    /// Observe velocity during correction.
    pub use_vel: bool,
    /// Process noise diagonal (state-length).
    pub process_noise: Vec<f64>,
    /// Measurement noise diagonal (state-length).
    pub measurement_noise: Vec<f64>,
    /// Initial covariance diagonal value for new tracks.
    pub initial_covariance: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_frames_to_skip: 15,
            dist_threshold: 150.0,
            center_threshold: 80.0,
            area_threshold: 3.0,
            body_ratio: 0.5,
            dt: 0.02,
            use_dim: true,
            use_vel: false,
            process_noise: vec![9.0, 9.0, 200.0, 200.0, 5.0, 5.0],
            measurement_noise: vec![2.0, 2.0, 200.0, 200.0, 2.0, 2.0],
            initial_covariance: 10.0,
        }
    }
}

/// One tracked object: a stable identity, its filter, and the miss counter.
#[derive(Clone, Debug)]
pub struct Track {
    pub id: TrackId,
    pub filter: ObjectFilter,
    /// Consecutive frames without a matched detection.
    pub skipped_frames: u32,
}

/// Multi-object tracker for a single object class.
pub struct Tracker {
    model: MotionModel,
    config: TrackerConfig,
    gates: GateConfig,
    filter_config: FilterConfig,
    tracks: BTreeMap<TrackId, Track>,
    next_id: u64,
}

impl Tracker {
    /// Validate the configuration against the model and build an empty
    /// tracker.
    pub fn new(model: MotionModel, config: TrackerConfig) -> Result<Self> {
        let filter_config = FilterConfig {
            dt: config.dt,
            use_dim: config.use_dim,
            use_vel: config.use_vel,
            process_noise: config.process_noise.clone(),
            measurement_noise: config.measurement_noise.clone(),
            initial_covariance: config.initial_covariance,
        };
        // Probe construction surfaces dimension/dt errors now, not at birth.
        ObjectFilter::new(model, &filter_config)?;

        let gates = GateConfig {
            dist_threshold: config.dist_threshold,
            center_threshold: config.center_threshold,
            area_threshold: config.area_threshold,
            body_ratio: config.body_ratio,
        };
        Ok(Self {
            model,
            config,
            gates,
            filter_config,
            tracks: BTreeMap::new(),
            next_id: 0,
        })
    }

    /// Run one full frame: predict, associate, correct, lifecycle.
    pub fn update(&mut self, dt: f64, measurements: &[Measurement]) -> Result<()> {
        if dt <= 0.0 {
            return Err(TrackingError::InvalidTimeStep(dt));
        }

        self.predict_all(dt);
        let ids: Vec<TrackId> = self.tracks.keys().copied().collect();
        let assignment = self.associate(&ids, measurements);

        // Correct matched tracks; a failed correction terminates the track.
        for &(ti, mi) in &assignment.pairs {
            let id = ids[ti];
            let healthy = match self.tracks.get_mut(&id) {
                Some(track) => {
                    let z = track.filter.measurement_vector(&measurements[mi]);
                    match track.filter.correct(&z) {
                        Ok(()) => {
                            track.skipped_frames = 0;
                            true
                        }
                        Err(err) => {
                            debug!(%id, %err, "track terminated during correction");
                            false
                        }
                    }
                }
                None => true,
            };
            if !healthy {
                self.tracks.remove(&id);
            }
        }

        // Miss bookkeeping for unmatched tracks.
        for &ti in &assignment.unmatched_tracks {
            let id = ids[ti];
            let drop = match self.tracks.get_mut(&id) {
                Some(track) => {
                    track.skipped_frames += 1;
                    track.skipped_frames > self.config.max_frames_to_skip
                }
                None => false,
            };
            if drop {
                debug!(%id, "track dropped after exceeding miss limit");
                self.tracks.remove(&id);
            }
        }

        // Birth one track per unmatched measurement.
        for &mi in &assignment.unmatched_meas {
            self.spawn(&measurements[mi])?;
        }
        Ok(())
    }

    /// Run one frame with the configured default interval.
    pub fn update_default(&mut self, measurements: &[Measurement]) -> Result<()> {
        self.update(self.config.dt, measurements)
    }

    /// Identity → state-vector snapshot of all live tracks, coasting tracks
    /// included at their last predicted state.
    pub fn states(&self) -> BTreeMap<u64, Vec<f64>> {
        self.tracks
            .iter()
            .map(|(id, t)| (id.0, t.filter.state().iter().copied().collect()))
            .collect()
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Drop all tracks. The identity counter keeps running.
    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    fn predict_all(&mut self, dt: f64) {
        let mut dead = Vec::new();
        for (id, track) in self.tracks.iter_mut() {
            if let Err(err) = track.filter.predict(dt) {
                debug!(id = %id, %err, "track terminated during prediction");
                dead.push(*id);
            }
        }
        for id in dead {
            self.tracks.remove(&id);
        }
    }

    fn associate(&self, ids: &[TrackId], measurements: &[Measurement]) -> Assignment {
        let pos_range = self.model.position_range();
        let size_range = self.model.size_range();

        let mut pairs = Vec::new();
        for (ti, id) in ids.iter().enumerate() {
            let Some(track) = self.tracks.get(id) else {
                continue;
            };
            let state = track.filter.state().as_slice();
            let position = &state[pos_range.clone()];
            let size = &state[size_range.clone()];
            for (mi, m) in measurements.iter().enumerate() {
                if let Some(cost) = gated_cost(position, size, m, &self.gates) {
                    pairs.push(CandidatePair {
                        track_idx: ti,
                        meas_idx: mi,
                        cost,
                    });
                }
            }
        }
        greedy_assign(&pairs, ids.len(), measurements.len())
    }

    fn spawn(&mut self, m: &Measurement) -> Result<()> {
        // A non-finite measurement would seed a filter that can never
        // recover; skip the birth instead.
        let finite = m
            .position
            .iter()
            .chain(m.size.iter())
            .all(|v| v.is_finite());
        if !finite {
            debug!("birth rejected: non-finite measurement");
            return Ok(());
        }
        let id = TrackId(self.next_id);
        self.next_id += 1;
        let mut filter = ObjectFilter::new(self.model, &self.filter_config)?;
        filter.initialize(m);
        debug!(%id, x = m.position[0], y = m.position[1], "track born");
        self.tracks.insert(
            id,
            Track {
                id,
                filter,
                skipped_frames: 0,
            },
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn tracker() -> Tracker {
        Tracker::new(MotionModel::Planar, TrackerConfig::default()).unwrap()
    }

    fn m(x: f64, y: f64) -> Measurement {
        Measurement::planar(x, y, 20.0, 20.0)
    }

    #[test]
    fn single_detection_creates_track_zero() {
        // Scenario A: one detection at (100, 100), frame 0.
        let mut tracker = tracker();
        tracker.update(0.02, &[m(100.0, 100.0)]).unwrap();

        let states = tracker.states();
        assert_eq!(states.len(), 1);
        let state = &states[&0];
        assert_abs_diff_eq!(state[0], 100.0, epsilon = 1e-6);
        assert_abs_diff_eq!(state[1], 100.0, epsilon = 1e-6);
    }

    #[test]
    fn track_survives_max_misses_then_dies() {
        // Scenario B: alive through miss 15 (max = 15), deleted on miss 16.
        let mut tracker = tracker();
        tracker.update(0.02, &[m(100.0, 100.0)]).unwrap();

        for _ in 0..15 {
            tracker.update(0.02, &[]).unwrap();
        }
        assert_eq!(tracker.len(), 1, "still alive at miss 15");
        let track = tracker.tracks().next().unwrap();
        assert_eq!(track.skipped_frames, 15);

        tracker.update(0.02, &[]).unwrap();
        assert_eq!(tracker.len(), 0, "deleted on the 16th miss");
    }

    #[test]
    fn miss_counter_resets_on_correction() {
        let mut tracker = tracker();
        tracker.update(0.02, &[m(100.0, 100.0)]).unwrap();
        for _ in 0..5 {
            tracker.update(0.02, &[]).unwrap();
        }
        assert_eq!(tracker.tracks().next().unwrap().skipped_frames, 5);

        tracker.update(0.02, &[m(100.0, 100.0)]).unwrap();
        assert_eq!(tracker.tracks().next().unwrap().skipped_frames, 0);
    }

    #[test]
    fn distant_detections_never_merge() {
        // Scenario C: (100,100) and (500,500) are far beyond every gate.
        let mut tracker = tracker();
        for _ in 0..10 {
            tracker
                .update(0.02, &[m(100.0, 100.0), m(500.0, 500.0)])
                .unwrap();
        }
        assert_eq!(tracker.len(), 2);
        let states = tracker.states();
        assert!(states.contains_key(&0) && states.contains_key(&1));
    }

    #[test]
    fn identities_are_never_reused() {
        let cfg = TrackerConfig {
            max_frames_to_skip: 0,
            ..TrackerConfig::default()
        };
        let mut tracker = Tracker::new(MotionModel::Planar, cfg).unwrap();
        tracker.update(0.02, &[m(100.0, 100.0)]).unwrap();
        tracker.update(0.02, &[]).unwrap(); // miss 1 > 0 → deleted
        assert!(tracker.is_empty());

        tracker.update(0.02, &[m(100.0, 100.0)]).unwrap();
        let states = tracker.states();
        assert!(states.contains_key(&1), "fresh identity after deletion");
        assert!(!states.contains_key(&0));
    }

    #[test]
    fn moving_object_keeps_one_identity() {
        let mut tracker = tracker();
        for k in 0..50 {
            let x = 100.0 + k as f64 * 2.0;
            tracker.update(0.02, &[m(x, 100.0)]).unwrap();
        }
        assert_eq!(tracker.len(), 1);
        assert!(tracker.states().contains_key(&0));
    }

    #[test]
    fn coasting_track_keeps_predicted_state_in_output() {
        let mut tracker = tracker();
        tracker.update(0.02, &[m(100.0, 100.0)]).unwrap();
        tracker.update(0.02, &[]).unwrap();
        let states = tracker.states();
        let state = &states[&0];
        assert!(state.iter().all(|v| v.is_finite()));
        assert_abs_diff_eq!(state[0], 100.0, epsilon = 1.0);
    }

    #[test]
    fn rejects_non_positive_dt() {
        let mut tracker = tracker();
        assert_eq!(
            tracker.update(0.0, &[]),
            Err(TrackingError::InvalidTimeStep(0.0))
        );
    }

    #[test]
    fn rejects_mismatched_noise_vectors() {
        let cfg = TrackerConfig {
            process_noise: vec![1.0; 4],
            ..TrackerConfig::default()
        };
        assert!(matches!(
            Tracker::new(MotionModel::Planar, cfg),
            Err(TrackingError::NoiseDimension { expected: 6, got: 4 })
        ));
    }

    #[test]
    fn non_finite_measurement_never_births_a_track() {
        let mut tracker = tracker();
        tracker
            .update(0.02, &[Measurement::planar(f64::NAN, 100.0, 20.0, 20.0)])
            .unwrap();
        assert!(tracker.is_empty());
    }

    #[test]
    fn corrupted_filter_terminates_the_track() {
        use crate::types::DVec;

        let mut tracker = tracker();
        tracker.update(0.02, &[m(100.0, 100.0)]).unwrap();

        // Corrupt the filter through a non-finite correction.
        let track = tracker.tracks.get_mut(&TrackId(0)).unwrap();
        let bad = DVec::from_vec(vec![f64::NAN, 100.0, 20.0, 20.0]);
        assert_eq!(
            track.filter.correct(&bad),
            Err(TrackingError::NumericalInstability)
        );

        // The next cycle's prediction detects the damage and drops the track.
        tracker.update(0.02, &[]).unwrap();
        assert!(tracker.is_empty());
        assert!(tracker.states().is_empty());
    }

    #[test]
    fn swap_is_resolved_by_nearest_neighbor() {
        let mut tracker = tracker();
        tracker
            .update(0.02, &[m(100.0, 100.0), m(160.0, 100.0)])
            .unwrap();
        // Both measurements moved slightly; each must stay with its track.
        tracker
            .update(0.02, &[m(162.0, 100.0), m(102.0, 100.0)])
            .unwrap();
        let states = tracker.states();
        assert_eq!(states.len(), 2);
        assert_abs_diff_eq!(states[&0][0], 102.0, epsilon = 2.0);
        assert_abs_diff_eq!(states[&1][0], 162.0, epsilon = 2.0);
    }
}
