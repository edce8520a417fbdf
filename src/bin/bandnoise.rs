//! `bandnoise` CLI - generate noisy variants of multispectral images.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use bandnoise::pipeline::{spawn_pipeline, NoisePipeline, PipelineConfig, PipelineState};
use bandnoise::project::{ProcessingRecord, ProjectLayout};
use bandnoise::NoiseType;

/// Generate noisy variants of multispectral images at increasing severity.
#[derive(Parser, Debug)]
#[command(name = "bandnoise")]
#[command(version, about, long_about = None)]
struct Args {
    /// Project name, resolved under --projects-dir.
    #[arg(long, value_name = "NAME", conflicts_with = "input")]
    project: Option<String>,

    /// Folder holding the projects.
    #[arg(long, default_value = "projects", value_name = "DIR")]
    projects_dir: PathBuf,

    /// Folder of original images.
    #[arg(short, long, default_value = "data/original", value_name = "DIR")]
    input: PathBuf,

    /// Output folder (ignored with --project).
    #[arg(short, long, default_value = "data/noisy/noisy_images", value_name = "DIR")]
    output: PathBuf,

    /// Number of severity levels per noise type.
    #[arg(short, long, default_value = "10", value_name = "INT")]
    levels: u32,

    /// Comma-separated noise types (default: all).
    #[arg(short, long, value_delimiter = ',', value_name = "TYPES")]
    types: Vec<NoiseType>,

    /// Use the realistic preset (gaussian, poisson, motion_blur, atmospheric, compression).
    #[arg(long, conflicts_with = "types")]
    realistic: bool,

    /// Print the available noise types and exit.
    #[arg(long)]
    list_types: bool,

    /// Random seed for reproducibility.
    #[arg(long, value_name = "INT")]
    seed: Option<u64>,

    /// Quality of JPEG outputs (1-100).
    #[arg(long, default_value = "95", value_name = "INT")]
    jpeg_quality: u8,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    if let Err(err) = run(&args) {
        log::error!("{:#}", err);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<()> {
    if args.list_types {
        for noise_type in NoiseType::ALL {
            println!(
                "{:<12} {} ({})",
                noise_type.name(),
                noise_type.description(),
                noise_type.parameter_range()
            );
        }
        return Ok(());
    }

    let project = args
        .project
        .as_deref()
        .map(|name| ProjectLayout::resolve(&args.projects_dir, name))
        .transpose()
        .context("Failed to open project")?;

    let (input_dir, output_dir) = match &project {
        Some(layout) => (layout.input_dir(), layout.output_dir()),
        None => (args.input.clone(), args.output.clone()),
    };

    let noise_types = if args.realistic {
        NoiseType::REALISTIC.to_vec()
    } else if args.types.is_empty() {
        NoiseType::ALL.to_vec()
    } else {
        args.types.clone()
    };

    let config = PipelineConfig {
        output_dir,
        noise_types,
        levels: args.levels,
        seed: args.seed,
        jpeg_quality: args.jpeg_quality,
    };

    let pipeline = NoisePipeline::from_input_dir(&input_dir, config)
        .with_context(|| format!("Cannot start processing {}", input_dir.display()))?;
    let noise_types = pipeline.config().noise_types.clone();
    let levels = pipeline.config().levels;

    log::info!("Input folder: {}", input_dir.display());
    log::info!("Output folder: {}", pipeline.config().output_dir.display());
    log::info!(
        "Noise types: {}",
        noise_types.iter().map(|t| t.name()).collect::<Vec<_>>().join(", ")
    );

    let bar = ProgressBar::new(pipeline.total_units() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .context("Invalid progress bar template")?
            .progress_chars("█▉▊▋▌▍▎▏ "),
    );

    let handle = spawn_pipeline(pipeline).context("Failed to start pipeline worker")?;
    let outcome = handle
        .wait_with_progress(|progress| {
            bar.set_position(progress.units_done as u64);
            bar.set_message(progress.status.clone());
        })
        .context("Noise generation failed")?;
    bar.finish_with_message(progress_message(outcome.state));

    println!(
        "Generated {} images ({} failures, success rate {})",
        outcome.stats.total_processed,
        outcome.stats.total_failed,
        outcome.stats.success_rate()
    );
    println!("Report: {}", outcome.report_paths.json.display());

    if let Some(layout) = &project {
        let record = ProcessingRecord::noise_generation(&outcome.stats, levels, &noise_types);
        layout
            .append_record(&record)
            .context("Failed to update project history")?;
    }

    Ok(())
}

fn progress_message(state: PipelineState) -> &'static str {
    match state {
        PipelineState::Cancelled => "Cancelled",
        _ => "Done",
    }
}
