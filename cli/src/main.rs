//! `boxtrack` CLI: batch scenario runs, replay import/export.

use anyhow::Result;
use clap::{Parser, Subcommand};
use sim::generator::DetectionGenerator;
use sim::replay::{load_replay, save_replay, ReplayLog};
use sim::scenarios::{Scenario, ScenarioKind};
use std::path::PathBuf;
use tracking_core::pipeline::{PipelineConfig, TrackingPipeline};
use tracking_core::types::Detection;

#[derive(Parser)]
#[command(name = "boxtrack", about = "Multi-object tracking batch runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a named scenario in batch mode and output metrics.
    RunScenario {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also save the full detection log
        #[arg(long)]
        save_replay: Option<PathBuf>,
    },
    /// Load and replay a previously recorded detection log.
    Replay {
        /// Path to replay JSON file
        input: PathBuf,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::RunScenario {
            scenario,
            seed,
            output,
            save_replay: save_path,
        } => {
            run_scenario(scenario, seed, output.as_deref(), save_path.as_deref())?;
        }
        Commands::Replay { input, output } => {
            run_replay(&input, output.as_deref())?;
        }
    }

    Ok(())
}

fn pipeline_for(class_labels: &[String]) -> Result<TrackingPipeline> {
    let config = PipelineConfig {
        classes: class_labels.to_vec(),
        ..PipelineConfig::default()
    };
    Ok(TrackingPipeline::new(config)?)
}

fn run_scenario(
    kind: ScenarioKind,
    seed: u64,
    output_path: Option<&std::path::Path>,
    replay_path: Option<&std::path::Path>,
) -> Result<()> {
    let mut scenario = Scenario::build(kind, seed);
    let mut generator = DetectionGenerator::new(scenario.generator.clone(), seed);
    let mut pipeline = pipeline_for(&scenario.class_labels)?;

    println!(
        "Running scenario '{}' (seed={}, {} frames at dt={:.3}s)...",
        scenario.name, seed, scenario.frames, scenario.dt
    );

    let start = std::time::Instant::now();
    let mut logged_frames: Vec<Vec<Vec<Detection>>> = Vec::new();
    let mut peak_tracks = 0usize;

    for frame in 0..scenario.frames {
        for target in &mut scenario.targets {
            target.step(scenario.dt);
        }
        let detections = generator.generate(&scenario.targets, frame, scenario.num_classes);
        if replay_path.is_some() {
            logged_frames.push(detections.clone());
        }
        let states = pipeline.track_with_dt(&detections, scenario.dt)?;
        let live: usize = states.iter().map(|c| c.len()).sum();
        peak_tracks = peak_tracks.max(live);
    }

    let elapsed = start.elapsed();
    let final_states = pipeline.states();
    let final_tracks: usize = final_states.iter().map(|c| c.len()).sum();
    println!(
        "Done: {} frames, {} tracks alive (peak {}), elapsed={:.2}s",
        scenario.frames,
        final_tracks,
        peak_tracks,
        elapsed.as_secs_f64(),
    );
    for (class_id, states) in final_states.iter().enumerate() {
        println!(
            "  {}: {} tracks",
            pipeline.class_label(class_id).unwrap_or("?"),
            states.len()
        );
    }

    if let Some(rpath) = replay_path {
        let log = ReplayLog {
            scenario_name: scenario.name.clone(),
            seed,
            dt: scenario.dt,
            class_labels: scenario.class_labels.clone(),
            frames: logged_frames,
        };
        save_replay(&log, rpath)?;
        println!("Replay saved to {}", rpath.display());
    }

    if let Some(opath) = output_path {
        let json = serde_json::json!({
            "scenario": scenario.name,
            "seed": seed,
            "elapsed_s": elapsed.as_secs_f64(),
            "frames": scenario.frames,
            "final_tracks": final_tracks,
            "peak_tracks": peak_tracks,
        });
        std::fs::write(opath, serde_json::to_string_pretty(&json)?)?;
        println!("Metrics saved to {}", opath.display());
    }

    Ok(())
}

fn run_replay(input: &std::path::Path, output_path: Option<&std::path::Path>) -> Result<()> {
    let log = load_replay(input)?;
    println!(
        "Replaying '{}' ({} frames)...",
        log.scenario_name,
        log.frames.len()
    );

    let mut pipeline = pipeline_for(&log.class_labels)?;
    let start = std::time::Instant::now();

    for detections in &log.frames {
        pipeline.track_with_dt(detections, log.dt)?;
    }

    let elapsed = start.elapsed();
    let final_tracks: usize = pipeline.states().iter().map(|c| c.len()).sum();
    println!(
        "Replay done: {} tracks alive, elapsed={:.2}s",
        final_tracks,
        elapsed.as_secs_f64()
    );

    if let Some(opath) = output_path {
        let json = serde_json::json!({
            "scenario": log.scenario_name,
            "seed": log.seed,
            "elapsed_s": elapsed.as_secs_f64(),
            "final_tracks": final_tracks,
        });
        std::fs::write(opath, serde_json::to_string_pretty(&json)?)?;
    }

    Ok(())
}
