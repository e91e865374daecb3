//! Scenario definitions.
//!
//! Each scenario is a named configuration of targets and noise parameters.
//! All scenarios are deterministic given the same seed.

use crate::generator::GeneratorParams;
use crate::target::Target;
use serde::{Deserialize, Serialize};

/// Which pre-defined scenario to load.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenarioKind {
    /// 2 objects crossing paths in one class
    Crossing,
    /// 1 object that disappears for a stretch of frames, then returns
    Occlusion,
    /// 12 objects across 3 classes with clutter
    Crowd,
}

/// A fully configured simulation scenario.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub seed: u64,
    /// Number of frames to run.
    pub frames: u64,
    /// Frame interval (seconds).
    pub dt: f64,
    pub num_classes: usize,
    pub class_labels: Vec<String>,
    pub targets: Vec<Target>,
    pub generator: GeneratorParams,
}

impl Scenario {
    /// Build the named scenario. Uses `seed` for repeatability.
    pub fn build(kind: ScenarioKind, seed: u64) -> Self {
        match kind {
            ScenarioKind::Crossing => Self::crossing(seed),
            ScenarioKind::Occlusion => Self::occlusion(seed),
            ScenarioKind::Crowd => Self::crowd(seed),
        }
    }

    fn crossing(seed: u64) -> Self {
        let targets = vec![
            Target::new(0, 0, [200.0, 500.0], [60.0, 0.0], [80.0, 120.0]),
            Target::new(1, 0, [1700.0, 500.0], [-60.0, 0.0], [80.0, 120.0]),
        ];
        Self {
            name: "crossing".into(),
            seed,
            frames: 500,
            dt: 0.02,
            num_classes: 1,
            class_labels: vec!["object".into()],
            targets,
            generator: GeneratorParams::default(),
        }
    }

    fn occlusion(seed: u64) -> Self {
        let mut target = Target::new(0, 0, [400.0, 400.0], [40.0, 10.0], [100.0, 150.0]);
        // Hidden for 10 frames mid-run; the track must coast through.
        target.vanish_at = Some(200);
        let mut reappearing = target.clone();
        reappearing.appear_at = Some(210);
        reappearing.vanish_at = None;
        Self {
            name: "occlusion".into(),
            seed,
            frames: 400,
            dt: 0.02,
            num_classes: 1,
            class_labels: vec!["object".into()],
            targets: vec![target, reappearing],
            generator: GeneratorParams {
                miss_prob: 0.0,
                ..GeneratorParams::default()
            },
        }
    }

    fn crowd(seed: u64) -> Self {
        let mut targets = Vec::new();
        for i in 0..12u64 {
            let class_id = (i % 3) as usize;
            let col = (i % 4) as f64;
            let row = (i / 4) as f64;
            targets.push(Target::new(
                i,
                class_id,
                [300.0 + col * 400.0, 250.0 + row * 300.0],
                [20.0 - col * 10.0, 10.0 * (row - 1.0)],
                [80.0, 120.0],
            ));
        }
        Self {
            name: "crowd".into(),
            seed,
            frames: 600,
            dt: 0.02,
            num_classes: 3,
            class_labels: vec!["person".into(), "vehicle".into(), "animal".into()],
            targets,
            generator: GeneratorParams {
                miss_prob: 0.1,
                clutter_per_frame: 0.5,
                ..GeneratorParams::default()
            },
        }
    }
}
