use anyhow::Result;
use census_pipeline::views::{service_summary, ServiceFilter};
use census_pipeline::{snapshot, CensusPipeline, DistributionMode, PipelineConfig, TableCatalog};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "census-pipeline")]
#[command(about = "Census occupation pipeline: clean, distribute across provinces, snapshot")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build every table from the raw inputs and save the snapshot
    Process {
        /// Occupation census CSV (or set CENSUS_INPUT)
        #[arg(long)]
        census: Option<PathBuf>,

        /// Province population CSV (or set CENSUS_PROVINCES)
        #[arg(long)]
        provinces: Option<PathBuf>,

        /// Snapshot output path (or set CENSUS_OUTPUT)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seed the jitter RNG for a reproducible distribution
        #[arg(long)]
        seed: Option<u64>,

        /// Keep the national table as a single pseudo-province
        #[arg(long)]
        national: bool,
    },
    /// Load a snapshot and print its tables
    Inspect {
        /// Snapshot path (default: configured output path)
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        /// Also write every table as CSV into this directory
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("census_pipeline=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = PipelineConfig::from_env()?;

    match cli.command {
        Command::Process {
            census,
            provinces,
            output,
            seed,
            national,
        } => {
            if let Some(path) = census {
                config.census_path = path;
            }
            if let Some(path) = provinces {
                config.provinces_path = path;
            }
            if let Some(path) = output {
                config.output_path = path;
            }
            if seed.is_some() {
                config.seed = seed;
            }
            if national {
                config.mode = DistributionMode::National;
            }

            info!(
                census = %config.census_path.display(),
                provinces = %config.provinces_path.display(),
                mode = config.mode.as_str(),
                "Processing census data"
            );
            let pipeline = CensusPipeline::new(config);
            let (output, header) = pipeline.process()?;

            println!("\n=== Snapshot {} ===", header.run_id);
            println!("Saved to {}", pipeline.config().output_path.display());
            print_catalog(&output.catalog)?;
        }
        Command::Inspect {
            snapshot: path,
            export_dir,
        } => {
            let path = path.unwrap_or(config.output_path);
            let (header, catalog) = snapshot::load_with_header(&path)?;

            println!("\n=== Snapshot {} ({}) ===", header.run_id, header.created_at);
            print_catalog(&catalog)?;

            if let Some(dir) = export_dir {
                for written in catalog.export_csv(&dir)? {
                    println!("Wrote {}", written.display());
                }
            }
        }
    }

    Ok(())
}

fn print_catalog(catalog: &TableCatalog) -> Result<()> {
    println!("{:<20} {:>8} {:>8} {:>16}", "table", "rows", "columns", "total workers");
    for summary in catalog.summaries() {
        let total = summary
            .total_workers
            .map(|t| format!("{:.0}", t))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<20} {:>8} {:>8} {:>16}",
            summary.name, summary.rows, summary.columns, total
        );
    }

    let services = service_summary(catalog, &ServiceFilter::All)?;
    if !services.is_empty() {
        println!("\n{:<20} {:>12} {:>8} {:>8}", "service", "workers", "men %", "women %");
        for row in services {
            let pct = |p: Option<f64>| p.map(|p| format!("{:.1}", p)).unwrap_or_else(|| "-".to_string());
            println!(
                "{:<20} {:>12.0} {:>8} {:>8}",
                row.service_type,
                row.total,
                pct(row.men_pct),
                pct(row.women_pct)
            );
        }
    }
    Ok(())
}
