use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use img_batch::{
    write_json_report, write_log, ConversionJob, ImageCrateBackend, JobSettings, Orchestrator,
    ProgressEvent, Reporter, TargetFormat,
};
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::{create_progress_bar, print_summary_report, set_quiet_mode, summary_line};
use std::path::PathBuf;
use std::time::Instant;
use tracing::Level;

#[derive(Parser)]
#[command(name = "img-batch")]
#[command(version, about = "Batch image converter with collision-safe output names", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every matching image in a folder
    Convert {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,

        /// Input extensions to pick up (default: all supported)
        #[arg(short, long, value_delimiter = ',')]
        extensions: Vec<String>,

        /// Output formats, in processing order
        #[arg(short, long = "format", value_delimiter = ',', default_value = "jpg")]
        formats: Vec<String>,

        /// Scale in percent; 100 keeps the original size
        #[arg(short, long)]
        scale: Option<f64>,

        #[arg(short, long)]
        recursive: bool,

        /// Replace files already in the output folder
        #[arg(long)]
        overwrite: bool,

        #[arg(short, long, default_value_t = 1)]
        jobs: usize,

        /// JPEG quality, 1-100
        #[arg(long, default_value_t = 90, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: u8,

        /// Process inputs in file name order
        #[arg(long)]
        sorted: bool,

        #[arg(short, long)]
        quiet: bool,

        #[arg(short, long)]
        verbose: bool,

        /// Also write image_conversion_log.json
        #[arg(long)]
        json_report: bool,
    },

    /// List supported output formats
    Formats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            extensions,
            formats,
            scale,
            recursive,
            overwrite,
            jobs,
            quality,
            sorted,
            quiet,
            verbose,
            json_report,
        } => {
            set_quiet_mode(quiet);
            let level = if verbose { Level::DEBUG } else { Level::INFO };
            if let Err(e) = init_logging(
                "img_batch",
                LogConfig::default().with_level(level).with_stderr(verbose),
            ) {
                eprintln!("⚠️  Logging disabled: {:#}", e);
            }

            let settings = JobSettings {
                input_dir: input,
                input_extensions: extensions,
                output_dir: output,
                formats,
                scale,
                recursive,
                sorted,
                overwrite_existing: overwrite,
                jobs,
            };
            let backend = ImageCrateBackend::new().with_jpeg_quality(quality);
            let failed = convert(settings, backend, json_report)?;
            if failed {
                std::process::exit(1);
            }
        }

        Commands::Formats => {
            println!("{}", style("Supported output formats:").bold());
            for format in TargetFormat::ALL {
                println!(
                    "  {:<6} {}",
                    style(format.as_str()).cyan(),
                    format.aliases().join(", ")
                );
            }
        }
    }

    Ok(())
}

/// Runs one batch. Returns true when any unit failed or the run was cancelled.
fn convert(settings: JobSettings, backend: ImageCrateBackend, json_report: bool) -> Result<bool> {
    let job = ConversionJob::new(settings).context("Invalid conversion job")?;

    let orchestrator = Orchestrator::new(backend);
    let token = orchestrator.cancel_token();
    ctrlc::set_handler(move || token.cancel()).context("Failed to install Ctrl-C handler")?;

    let bar = create_progress_bar(0, "Converting");
    let mut reporter = Reporter::new();
    {
        let bar = bar.clone();
        reporter.register_observer(move |event: &ProgressEvent| {
            bar.set_length(event.total as u64);
            bar.set_position(event.processed as u64);
            bar.set_message(format!("✅ {} ❌ {}", event.succeeded, event.failed));
        });
    }

    let start = Instant::now();
    let summary = orchestrator.run(&job, &mut reporter);
    bar.finish_and_clear();

    let log_path = write_log(&summary, job.output_dir()).context("Failed to write conversion log")?;
    tracing::info!(path = %log_path.display(), "Conversion log written");
    if json_report {
        let json_path = write_json_report(&summary, job.output_dir())
            .context("Failed to write JSON report")?;
        tracing::info!(path = %json_path.display(), "JSON report written");
    }

    tracing::info!("{}", summary_line(&summary.counts, summary.cancelled));
    print_summary_report(&summary.counts, start.elapsed(), "Image Conversion", summary.cancelled);

    for outcome in summary.outcomes.iter().filter(|o| !o.is_success()) {
        if let Some(error) = outcome.error() {
            eprintln!(
                "{} {} → {}: {}",
                style("✗").red(),
                outcome.input.display(),
                outcome.format,
                error
            );
        }
    }

    Ok(summary.counts.has_failures() || summary.cancelled)
}
