use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use layered_pdf::config::load_settings_for_instructions;
use layered_pdf::config::merged::{Overrides, RunConfig};
use layered_pdf::config::settings::Mode;
use layered_pdf::pipeline::job_runner::JobConfig;
use layered_pdf::pipeline::orchestrator::run_all_jobs;

const USAGE: &str = "Usage: layered_pdf [--mode <plain|background_only|foreground_only|compound>] <instructions.json>...";

fn print_usage() {
    eprintln!("{USAGE}");
    eprintln!("  Segment scanned page images into background/foreground layers");
    eprintln!("  and write them as a PDF next to each instruction file.");
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "layered_pdf=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("layered_pdf {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    // Split flags from instruction file paths.
    let mut overrides = Overrides::default();
    let mut paths: Vec<PathBuf> = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--mode" {
            let Some(value) = iter.next() else {
                eprintln!("ERROR: --mode requires a value");
                print_usage();
                return ExitCode::FAILURE;
            };
            match Mode::parse(value) {
                Ok(mode) => overrides.mode = Some(mode),
                Err(e) => {
                    eprintln!("ERROR: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            paths.push(PathBuf::from(arg));
        }
    }

    if paths.is_empty() {
        print_usage();
        return ExitCode::FAILURE;
    }

    // Load settings from the same directory as each instruction file.
    let mut jobs: Vec<JobConfig> = Vec::new();
    let mut workers = 0;
    for path in paths {
        let settings = match load_settings_for_instructions(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("ERROR: Failed to load settings for {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        };
        workers = workers.max(settings.parallel_workers);
        jobs.push(JobConfig::for_instructions(
            path,
            RunConfig::new(&settings, &overrides),
        ));
    }

    let results = run_all_jobs(&jobs, workers);

    let mut has_error = false;
    for (job, result) in jobs.iter().zip(&results) {
        match result {
            Ok(job_result) => {
                eprintln!(
                    "OK: {} -> {} ({} pages)",
                    job_result.input_path.display(),
                    job_result.output_path.display(),
                    job_result.pages_written
                );
                for skipped in &job_result.skipped {
                    eprintln!("  SKIPPED: {}", skipped.reason);
                }
            }
            Err(e) => {
                eprintln!(
                    "ERROR: {} -> {}: {e}",
                    job.instructions_path.display(),
                    job.output_path.display()
                );
                has_error = true;
            }
        }
    }

    if has_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
