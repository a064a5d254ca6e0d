//! SmartCat CLI - copy one file to standard output
//!
//! Exit code 0 when the whole file was copied and released cleanly, 1 on any
//! usage, open, allocate, read, write or close failure.

use clap::error::ErrorKind;
use clap::Parser;
use smartcat::config::{CatConfig, CliArgs, StatsFormat};
use smartcat::core::CatEngine;
use smartcat::error::{CatError, Result};
use tracing_subscriber::EnvFilter;

fn main() {
    // Parse CLI arguments; every usage error exits with 1
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            std::process::exit(code);
        }
    };

    // Initialize logging; stdout carries the file, so diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(args.log_filter()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Handle result
    if let Err(e) = run(&args) {
        eprintln!("smartcat: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(args: &CliArgs) -> Result<()> {
    let config = CatConfig::from_cli(args).map_err(CatError::Usage)?;

    tracing::debug!(
        "Preset {}: scale {}, block alignment {}, {} allocation, advise {}",
        args.preset.name(),
        config.sizing.scale_factor,
        config.sizing.use_block_size_alignment,
        config.alloc.name(),
        config.advise
    );

    let engine = CatEngine::new(&config);
    let stats = engine.execute(&config.path)?;

    match config.stats {
        Some(StatsFormat::Text) => stats.print_summary(),
        Some(StatsFormat::Json) => eprintln!("{}", stats.to_json()),
        None => {}
    }

    Ok(())
}
