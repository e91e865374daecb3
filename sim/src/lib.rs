//! `sim` — Scenario simulator: ground-truth box targets, noisy detection
//! generation, replay logs.

pub mod generator;
pub mod replay;
pub mod scenarios;
pub mod target;

pub use generator::DetectionGenerator;
pub use replay::{load_replay, save_replay, ReplayLog};
pub use scenarios::{Scenario, ScenarioKind};
pub use target::Target;
