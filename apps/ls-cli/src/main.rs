use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use ls_results::{Historian, RunManifest};
use ls_sim::{
    CHANNEL_ERROR, CHANNEL_GENERATOR, CHANNEL_PLANT, CHANNEL_REGULATOR, KERNEL_VERSION, LoopState,
    SimResult, TickProgress, compile_loop, run_batch,
};

#[derive(Parser)]
#[command(name = "ls-cli")]
#[command(about = "Loopsim CLI - SISO control loop simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a loop definition
    Validate {
        /// Path to the loop YAML (or .json) file
        loop_path: PathBuf,
    },
    /// Run one loop and print a summary
    Run {
        /// Path to the loop YAML (or .json) file
        loop_path: PathBuf,
        /// Override the step count from the file
        #[arg(long)]
        steps: Option<usize>,
        /// Print the samples of this channel as CSV
        #[arg(long)]
        channel: Option<String>,
        /// Window start in seconds (with --channel)
        #[arg(long, requires = "channel")]
        from: Option<f64>,
        /// Window end in seconds (with --channel)
        #[arg(long, requires = "channel")]
        to: Option<f64>,
    },
    /// Run several loops in parallel
    Batch {
        /// Loop definition files
        #[arg(required = true)]
        loop_paths: Vec<PathBuf>,
    },
}

fn main() -> SimResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { loop_path } => cmd_validate(&loop_path),
        Commands::Run {
            loop_path,
            steps,
            channel,
            from,
            to,
        } => cmd_run(&loop_path, steps, channel.as_deref(), from, to),
        Commands::Batch { loop_paths } => cmd_batch(&loop_paths),
    }
}

fn cmd_validate(loop_path: &Path) -> SimResult<()> {
    println!("Validating loop: {}", loop_path.display());
    let def = ls_project::load(loop_path)?;
    println!(
        "✓ Loop is valid: '{}' ({} generator(s), {} regulator, {} plant)",
        def.name,
        def.generators.len(),
        def.regulator.spec.kind(),
        def.plant.model.kind()
    );
    Ok(())
}

fn cmd_run(
    loop_path: &Path,
    steps: Option<usize>,
    channel: Option<&str>,
    from: Option<f64>,
    to: Option<f64>,
) -> SimResult<()> {
    let mut def = ls_project::load(loop_path)?;
    if let Some(steps) = steps {
        def.steps = steps;
    }
    println!(
        "Running loop '{}': {} steps at {} s",
        def.name, def.steps, def.period_s
    );

    let manifest = RunManifest::new(&def, KERNEL_VERSION);
    tracing::debug!("run id {} for {}", manifest.run_id, loop_path.display());
    let mut sim = compile_loop(&def)?;

    let started = Instant::now();
    let mut last_emit = Instant::now();
    let mut last_fraction = -1.0f64;
    let state = sim.run_with_progress(|p| {
        let emit_now = (p.fraction_complete - last_fraction).abs() >= 0.005
            || last_emit.elapsed().as_millis() >= 100;
        if emit_now {
            render_cli_progress(p, started.elapsed().as_secs_f64());
            last_fraction = p.fraction_complete;
            last_emit = Instant::now();
        }
    })?;
    clear_progress_line();

    print_outcome(&manifest, &state, sim.historian());

    if let Some(channel) = channel {
        let window = sim.historian().query(
            channel,
            from.unwrap_or(f64::NEG_INFINITY),
            to.unwrap_or(f64::INFINITY),
        )?;
        println!("time_s,{channel}");
        for sample in window {
            println!("{},{}", sample.time_s, sample.value);
        }
    }

    if !matches!(state, LoopState::Completed) {
        std::process::exit(2);
    }
    Ok(())
}

fn cmd_batch(loop_paths: &[PathBuf]) -> SimResult<()> {
    let defs = loop_paths
        .iter()
        .map(|p| ls_project::load(p))
        .collect::<Result<Vec<_>, _>>()?;
    println!("Running {} loop(s) in parallel", defs.len());

    let started = Instant::now();
    let outcomes = run_batch(&defs);
    let mut failures = 0usize;
    for (path, outcome) in loop_paths.iter().zip(outcomes) {
        println!("{}", path.display());
        match outcome {
            Ok(outcome) => {
                if outcome.state != LoopState::Completed {
                    failures += 1;
                }
                print_outcome(&outcome.manifest, &outcome.state, &outcome.historian);
            }
            Err(e) => {
                failures += 1;
                println!("✗ {}", e);
            }
        }
    }
    println!(
        "Batch finished in {:.2}s: {} ok, {} failed",
        started.elapsed().as_secs_f64(),
        loop_paths.len() - failures,
        failures
    );

    if failures > 0 {
        std::process::exit(2);
    }
    Ok(())
}

fn print_outcome(manifest: &RunManifest, state: &LoopState, historian: &Historian) {
    match state {
        LoopState::Completed => println!("✓ Simulation completed: {}", manifest.run_id),
        other => println!("✗ Simulation {}: {}", other, manifest.run_id),
    }
    println!("  Ticks recorded: {}", historian.len(CHANNEL_PLANT));
    for channel in [CHANNEL_GENERATOR, CHANNEL_REGULATOR, CHANNEL_PLANT, CHANNEL_ERROR] {
        if let Some(last) = historian.samples(channel).ok().and_then(|s| s.last()) {
            println!("  {:<10} last = {:.6}", channel, last.value);
        }
    }
    let warnings = historian.warnings();
    if !warnings.is_empty() {
        println!("  Warnings: {}", warnings.len());
        for w in warnings.iter().take(5) {
            println!("    t={:.3}s  {}  {}", w.time_s, w.source, w.condition);
        }
        if warnings.len() > 5 {
            println!("    ... {} more", warnings.len() - 5);
        }
    }
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(p: &TickProgress, elapsed_wall_s: f64) {
    let width = 28usize;
    let filled = ((p.fraction_complete * width as f64).round() as usize).min(width);
    let bar = format!(
        "{}{}",
        "#".repeat(filled),
        "-".repeat(width.saturating_sub(filled))
    );
    print!(
        "\r[{}] {:>6.2}%  t={:.3}/{:.3}s  step={}/{}  warnings={}  elapsed={:.1}s",
        bar,
        p.fraction_complete * 100.0,
        p.sim_time_s,
        p.t_end_s,
        p.step,
        p.steps,
        p.warnings,
        elapsed_wall_s
    );
    let _ = io::stdout().flush();
}
