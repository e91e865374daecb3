//! Ground-truth box targets stepped along straight-line trajectories.

use serde::{Deserialize, Serialize};

/// A simulated object with ground-truth box state, moving at constant
/// velocity in image coordinates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Target {
    /// Ground-truth identity (used for reporting, not visible to trackers).
    pub id: u64,
    pub class_id: usize,
    /// Box center.
    pub x: f64,
    pub y: f64,
    /// Center velocity (units/s).
    pub vx: f64,
    pub vy: f64,
    pub w: f64,
    pub h: f64,
    /// First frame the target is visible.
    pub appear_at: Option<u64>,
    /// Frame the target disappears (occlusion or leaving the frame).
    pub vanish_at: Option<u64>,
}

impl Target {
    pub fn new(id: u64, class_id: usize, pos: [f64; 2], vel: [f64; 2], size: [f64; 2]) -> Self {
        Self {
            id,
            class_id,
            x: pos[0],
            y: pos[1],
            vx: vel[0],
            vy: vel[1],
            w: size[0],
            h: size[1],
            appear_at: None,
            vanish_at: None,
        }
    }

    /// Propagate the true state by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        self.x += self.vx * dt;
        self.y += self.vy * dt;
    }

    /// Whether the target produces detections at `frame`.
    pub fn is_visible(&self, frame: u64) -> bool {
        self.appear_at.map_or(true, |a| frame >= a)
            && self.vanish_at.map_or(true, |v| frame < v)
    }
}
