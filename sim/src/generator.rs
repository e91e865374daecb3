//! Noisy detection generation from ground-truth targets.
//!
//! Noise is uniform in ±std (good enough for exercising the tracker), with a
//! per-target miss probability and uniform clutter boxes. Deterministic for
//! a given seed.

use crate::target::Target;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracking_core::types::Detection;

/// Detection-noise parameters for one simulated detector.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratorParams {
    /// Position noise bound (± units).
    pub pos_noise_std: f64,
    /// Size noise bound (± units).
    pub size_noise_std: f64,
    /// Probability a visible target produces no detection this frame.
    pub miss_prob: f64,
    /// Expected clutter boxes per frame (spawned uniformly in the frame).
    pub clutter_per_frame: f64,
    /// Frame extent for clutter placement: [width, height].
    pub frame_size: [f64; 2],
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self {
            pos_noise_std: 2.0,
            size_noise_std: 2.0,
            miss_prob: 0.05,
            clutter_per_frame: 0.0,
            frame_size: [1920.0, 1080.0],
        }
    }
}

/// Turns ground-truth targets into per-class detection lists.
pub struct DetectionGenerator {
    params: GeneratorParams,
    rng: ChaCha8Rng,
}

impl DetectionGenerator {
    pub fn new(params: GeneratorParams, seed: u64) -> Self {
        Self {
            params,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Generate one frame of detections, one list per class.
    pub fn generate(
        &mut self,
        targets: &[Target],
        frame: u64,
        num_classes: usize,
    ) -> Vec<Vec<Detection>> {
        let mut out: Vec<Vec<Detection>> = vec![Vec::new(); num_classes];

        for target in targets {
            if !target.is_visible(frame) || target.class_id >= num_classes {
                continue;
            }
            // Miss detection?
            if self.rng.gen::<f64>() < self.params.miss_prob {
                continue;
            }
            let p = self.params.pos_noise_std;
            let s = self.params.size_noise_std;
            out[target.class_id].push(Detection::planar(
                target.x + self.noise(p),
                target.y + self.noise(p),
                (target.w + self.noise(s)).max(1.0),
                (target.h + self.noise(s)).max(1.0),
                0.9,
                target.class_id,
            ));
        }

        // Clutter: spurious boxes uniform over the frame, random class.
        let mut budget = self.params.clutter_per_frame;
        while budget > 0.0 && self.rng.gen::<f64>() < budget {
            let class_id = self.rng.gen_range(0..num_classes);
            let x = self.rng.gen::<f64>() * self.params.frame_size[0];
            let y = self.rng.gen::<f64>() * self.params.frame_size[1];
            out[class_id].push(Detection::planar(x, y, 80.0, 120.0, 0.3, class_id));
            budget -= 1.0;
        }

        out
    }

    /// Uniform noise in ±std.
    fn noise(&mut self, std: f64) -> f64 {
        self.rng.gen::<f64>() * std * 2.0 - std
    }
}
