//! Swarm simulator CLI
//!
//! Steps a swarm loaded from a file, or one of the named scenarios, and
//! reports how it ended up.

use clap::Parser;
use std::path::PathBuf;
use swarm_core::swarm::clock_seed;
use swarm_core::SwarmState;
use swarm_sim::persist;
use swarm_sim::scenarios::ScenarioId;
use swarm_sim::{RunResult, SimExport, SwarmRunner};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Perimeter-aware swarm simulator
#[derive(Parser, Debug)]
#[command(name = "swarm-sim")]
#[command(about = "Step perimeter-aware swarms and report the outcome", long_about = None)]
struct Args {
    /// Swarm file to load (.json for JSON, anything else for text)
    #[arg(short, long, conflicts_with = "scenario")]
    config: Option<PathBuf>,

    /// Scenario to run (triangle, square, lattice, random_cloud, goal_seek,
    /// adversarial, perimeter_directed, all)
    #[arg(short = 'S', long, default_value = "goal_seek")]
    scenario: String,

    /// Placement seed (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Step limit (defaults to the scenario's suggestion, or 1000)
    #[arg(short = 'n', long)]
    steps: Option<u64>,

    /// Override the step speed
    #[arg(long)]
    speed: Option<f64>,

    /// Stop once every resultant is at or below this magnitude
    #[arg(long, default_value = "0")]
    settle: f64,

    /// Export a frame every this many steps
    #[arg(long, default_value = "10")]
    export_interval: u64,

    /// Export frames to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Save the final swarm as a text swarm file
    #[arg(long)]
    save: Option<PathBuf>,

    /// Dump the final per-agent state
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for scripting
    #[arg(long)]
    json: bool,
}

/// One swarm to run.
struct Job {
    label: String,
    state: SwarmState,
    steps: u64,
}

fn load_jobs(args: &Args, seed: u64) -> Result<Vec<Job>, String> {
    if let Some(path) = &args.config {
        let state = persist::load_any(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        return Ok(vec![Job {
            label: path.display().to_string(),
            state,
            steps: args.steps.unwrap_or(1000),
        }]);
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse()?]
    };

    scenarios
        .into_iter()
        .map(|id| {
            let state = id.build(seed).map_err(|e| format!("{}: {}", id, e))?;
            Ok(Job {
                label: id.name().to_string(),
                state,
                steps: args.steps.unwrap_or_else(|| id.default_steps()),
            })
        })
        .collect()
}

/// Runs a single job, writing whichever outputs were requested.
fn run_job(args: &Args, job: Job, single: bool) -> Result<RunResult, String> {
    let mut runner = SwarmRunner::new(&job.label, job.state)
        .with_max_steps(job.steps)
        .with_export_interval(args.export_interval)
        .with_settle_threshold(args.settle);
    if let Some(speed) = args.speed {
        runner = runner.with_step_speed(speed).map_err(|e| e.to_string())?;
    }

    let result = match (&args.export, single) {
        (Some(path), true) => {
            let mut export = SimExport::new(&job.label, runner.state().seed(), runner.state().goal());
            let result = runner.run_with_export(&mut export);
            export
                .write_to_file(path)
                .map_err(|e| format!("Failed to write export: {}", e))?;
            info!("Exported {} frames to {}", export.frames.len(), path);
            result
        }
        _ => runner.run(),
    };

    if single {
        if let Some(path) = &args.save {
            persist::save_swarm(runner.state(), path).map_err(|e| e.to_string())?;
        }
        if let Some(path) = &args.dump {
            persist::dump_state(runner.state(), path).map_err(|e| e.to_string())?;
        }
    }
    Ok(result)
}

fn main() {
    let args = Args::parse();

    // Initialize logging; RUST_LOG takes precedence over --verbose
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json {
        info!("Swarm simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let seed = if args.seed == 0 { clock_seed() } else { args.seed };

    let jobs = load_jobs(&args, seed).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        let names: Vec<&str> = ScenarioId::all().iter().map(|s| s.name()).collect();
        eprintln!("Available scenarios: {}, all", names.join(", "));
        std::process::exit(1);
    });

    let single = jobs.len() == 1;
    if !single && (args.export.is_some() || args.save.is_some() || args.dump.is_some()) {
        eprintln!("Error: --export, --save and --dump need a single swarm, not 'all'");
        std::process::exit(1);
    }

    let mut results: Vec<RunResult> = Vec::new();
    let mut failed = 0;
    for job in jobs {
        let label = job.label.clone();
        match run_job(&args, job, single) {
            Ok(result) => results.push(result),
            Err(e) => {
                error!("✗ {} failed: {}", label, e);
                failed += 1;
            }
        }
    }

    if args.json {
        let summary = serde_json::json!({
            "total": results.len() + failed,
            "failed": failed,
            "results": results.iter().map(|r| {
                serde_json::json!({
                    "label": r.label,
                    "seed": r.seed,
                    "steps": r.steps,
                    "settled": r.settled,
                    "perimeter": r.final_perimeter_count,
                    "centroid": [r.centroid.x, r.centroid.y],
                    "mean_goal_distance": r.mean_goal_distance,
                    "max_step_displacement": r.metrics.max_step_displacement,
                    "total_path_length": r.metrics.total_path_length,
                    "perimeter_range": [r.metrics.perimeter_count_min, r.metrics.perimeter_count_max],
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        for r in &results {
            info!(
                "{:<20} steps={:<5} settled={:<5} perimeter={:<3} ({}..{}) centroid=({:.3}, {:.3})",
                r.label,
                r.steps,
                r.settled,
                r.final_perimeter_count,
                r.metrics.perimeter_count_min,
                r.metrics.perimeter_count_max,
                r.centroid.x,
                r.centroid.y
            );
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}
