use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

use sales_consolidation::config::ConsolidationConfig;
use sales_consolidation::logging;
use sales_consolidation::observability::{init_prometheus, write_textfile};
use sales_consolidation::{Consolidation, ConsolidationReport};

#[derive(Parser)]
#[command(name = "sales_consolidation")]
#[command(about = "Consolidates yearly sales files into a category and year summary workbook")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the consolidation once
    Run {
        /// TOML configuration file; built-in defaults when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the effective configuration as TOML
    ShowConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<ConsolidationConfig> {
    let config = ConsolidationConfig::load_or_default(path.map(PathBuf::as_path))
        .with_context(|| match path {
            Some(p) => format!("Failed to load configuration from {}", p.display()),
            None => "Invalid default configuration".to_string(),
        })?;
    Ok(config)
}

fn print_report(report: &ConsolidationReport) {
    println!("\n📊 Consolidation Results (run {}):", report.run_id);
    for source in &report.sources {
        println!(
            "   {}: {} rows read, {} dropped, {} sales filled",
            source.source, source.rows_read, source.rows_dropped, source.sales_filled
        );
    }
    println!("   Products loaded: {}", report.products_loaded);
    println!(
        "   Consolidated rows: {} ({} without a product)",
        report.join.rows, report.join.unmatched_rows
    );
    println!("   Categories: {}", report.categories.len());
    println!("   Years: {}", report.yearly.len());
    println!(
        "   Output file: {} ({} bytes)",
        report.output_file.display(),
        report.bytes_written
    );
    println!("   Duration: {:.2}s", report.duration_secs);
}

fn run(config: ConsolidationConfig) -> Result<()> {
    let prometheus = match &config.metrics.prometheus_textfile {
        Some(_) => Some(init_prometheus().context("Failed to start metrics")?),
        None => None,
    };

    info!("▶️ start");
    let consolidation = Consolidation::new(config);
    let outcome = consolidation.run();
    info!("⏹️ end");

    if let (Some(handle), Some(path)) = (
        &prometheus,
        &consolidation.config().metrics.prometheus_textfile,
    ) {
        if let Err(e) = write_textfile(handle, path) {
            warn!("Failed to write metrics textfile: {}", e);
        }
    }

    let report = outcome.context("Sales consolidation failed")?;
    print_report(&report);
    println!("\n✅ Consolidation complete");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = logging::init_logging();

    let result = match cli.command {
        Commands::Run { config } => load_config(config.as_ref()).and_then(run),
        Commands::ShowConfig { config } => load_config(config.as_ref()).and_then(|c| {
            print!("{}", c.to_toml_string()?);
            Ok(())
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}
