use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use ceylon_lower::config::LoweringOptions;
use ceylon_lower::diagnostics::{LowerError, render_diagnostic, render_error};
use ceylon_lower::{LoweringUnit, lower_unit};

#[derive(Parser)]
#[command(name = "lowerc", version, about = "Lower typed Ceylon expressions to the JVM target tree")]
struct Cli {
    /// Lowering options file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "ceylon_lower::lower=trace"; overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lower every expression of a JSON lowering unit and print the result
    Lower {
        /// Lowering unit (JSON)
        unit: PathBuf,
    },
    /// Print the effective lowering options
    Options,
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn load_options(path: Option<&Path>) -> Result<LoweringOptions, LowerError> {
    match path {
        Some(path) => LoweringOptions::load(path),
        None => Ok(LoweringOptions::default()),
    }
}

/// Returns the number of diagnostics produced.
fn run_lower(unit_path: &Path, options: &LoweringOptions) -> Result<usize, LowerError> {
    let json = std::fs::read_to_string(unit_path)
        .map_err(|e| LowerError::input(format!("could not read {}: {e}", unit_path.display())))?;
    let unit = LoweringUnit::from_json(&json)?;
    let filename = unit_path.to_string_lossy();
    let mut count = 0;
    for lowered in lower_unit(&unit, options)? {
        println!("{} = {}", lowered.name, lowered.output.render());
        for diag in &lowered.diagnostics {
            render_diagnostic(unit.source.as_deref(), &filename, diag);
        }
        count += lowered.diagnostics.len();
    }
    Ok(count)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let options = match load_options(cli.config.as_deref()) {
        Ok(options) => options,
        Err(err) => {
            render_error(None, "lowerc", &err);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Lower { unit } => match run_lower(&unit, &options) {
            Ok(0) => {}
            Ok(n) => {
                eprintln!("{n} expression(s) could not be lowered");
                std::process::exit(1);
            }
            Err(err) => {
                render_error(None, &unit.to_string_lossy(), &err);
                std::process::exit(1);
            }
        },
        Commands::Options => match options.to_toml_string() {
            Ok(text) => print!("{text}"),
            Err(err) => {
                render_error(None, "lowerc", &err);
                std::process::exit(1);
            }
        },
    }
}
