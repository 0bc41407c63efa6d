//! SkyView replay harness CLI
//!
//! Replays synthetic scenarios or recorded logs through a headless viewer
//! and checks the viewer's invariants.

use clap::Parser;
use skyview_core::ViewerConfig;
use skyview_sim::scenarios::ScenarioId;
use skyview_sim::{load_log, ReplayResult, ReplayRunner, SceneExport};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// SkyView deterministic replay CLI
#[derive(Parser, Debug)]
#[command(name = "skyview-sim")]
#[command(about = "Replay drone-flight logs through the SkyView viewer", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (hover, orbit, crossing, dropout, mismatched_ids, obstacle_course, empty, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Replay a recorded log file instead of a scenario
    #[arg(long)]
    log: Option<PathBuf>,

    /// Number of random seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Frames per generated scenario
    #[arg(short, long, default_value = "200")]
    frames: usize,

    /// Trail window in frames
    #[arg(long, default_value = "100")]
    trail_window: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export per-frame scene primitives to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Export every n-th frame
    #[arg(long, default_value = "1")]
    export_stride: usize,

    /// Record the replay to a Rerun .rrd file
    #[cfg(feature = "visualization")]
    #[arg(long)]
    rerun: Option<PathBuf>,
}

/// Drives a full viewer actor over the log, scrubbing every frame into Rerun.
///
/// Returns the number of frames actually presented.
#[cfg(feature = "visualization")]
async fn record_rerun(
    path: PathBuf,
    log: Arc<skyview_core::SimulationLog>,
    config: ViewerConfig,
) -> Result<u64, skyview_core::RenderError> {
    use skyview_core::{spawn_viewer, RenderError, RerunLoader, RerunSink, ViewerStatus};
    use skyview_env::TokioContext;

    let loader = RerunLoader::new("skyview-sim", RerunSink::File(path));
    let handle = spawn_viewer(TokioContext::shared(), loader, config);
    handle.load(log.clone())?;

    // Frame 0 is presented when the renderer attaches
    handle.wait_ready().await?;
    for frame in 1..log.frame_count() {
        handle.scrub(frame)?;
    }
    let snapshot = handle.snapshot().await?;
    handle.shutdown();

    if let ViewerStatus::Error(message) = snapshot.status {
        return Err(RenderError::Viewer(message));
    }
    Ok(snapshot.stats.creates + snapshot.stats.updates)
}

fn report(result: &ReplayResult, json: bool) {
    if json {
        return;
    }
    if result.passed {
        info!("✓ {} (seed={}) PASSED - {} frames, {} ticks", result.name, result.seed, result.frame_count, result.ticks);
    } else {
        error!(
            "✗ {} (seed={}) FAILED: {}",
            result.name,
            result.seed,
            result.failure_reason().unwrap_or("unknown")
        );
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }

    if !args.json {
        info!("SkyView replay harness v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let config = ViewerConfig::default().with_trail_window(args.trail_window);

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    // Collect logs to replay: a recorded file, or scenarios x seeds
    let mut logs: Vec<(String, u64, Arc<skyview_core::SimulationLog>)> = Vec::new();
    if let Some(path) = &args.log {
        match load_log(path) {
            Ok(log) => logs.push((path.display().to_string(), base_seed, Arc::new(log))),
            Err(e) => {
                error!("Failed to load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    } else {
        let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
            ScenarioId::all()
        } else {
            match args.scenario.parse() {
                Ok(scenario) => vec![scenario],
                Err(e) => {
                    eprintln!("Error: {}", e);
                    eprintln!("Available scenarios: hover, orbit, crossing, dropout, mismatched_ids, obstacle_course, empty, all");
                    std::process::exit(1);
                }
            }
        };
        for seed_offset in 0..args.seeds {
            let seed = base_seed.wrapping_add(seed_offset as u64);
            for scenario in &scenarios {
                logs.push((scenario.name().to_string(), seed, Arc::new(scenario.generate(seed, args.frames))));
            }
        }
    }

    // Handle --export mode
    if let Some(export_path) = &args.export {
        if logs.len() > 1 {
            eprintln!("Error: --export only supports a single log, not 'all'");
            std::process::exit(1);
        }
        if let Some((name, seed, log)) = logs.first() {
            let export = SceneExport::build(name, *seed, log.clone(), &config, args.export_stride);
            match export.write_to_file(export_path) {
                Ok(()) => info!("Exported {} frames to {}", export.frames.len(), export_path),
                Err(e) => {
                    error!("Failed to write export: {:?}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    #[cfg(feature = "visualization")]
    if let Some(rrd_path) = &args.rerun {
        if let Some((_, _, log)) = logs.first() {
            match record_rerun(rrd_path.clone(), log.clone(), config.clone()).await {
                Ok(presented) => info!("Recorded {} of {} frames to {}", presented, log.frame_count(), rrd_path.display()),
                Err(e) => error!("Rerun recording failed: {}", e),
            }
        }
    }

    // Run replays
    let mut all_results: Vec<ReplayResult> = Vec::new();
    for (name, seed, log) in logs {
        let runner = ReplayRunner::new(seed).with_config(config.clone());
        let result = runner.run(&name, log).await;
        report(&result, args.json);
        all_results.push(result);
    }

    // Summary
    let total = all_results.len();
    let failed_count = all_results.iter().filter(|r| !r.passed).count();
    let passed = total - failed_count;

    if args.json {
        // JSON output for CI parsing
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} replays passed!", total);
        } else {
            error!("❌ {}/{} replays failed!", failed_count, total);

            for result in all_results.iter().filter(|r| !r.passed) {
                for violation in &result.violations {
                    error!("  - {} seed={}: {}", result.name, result.seed, violation);
                }
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
