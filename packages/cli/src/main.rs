#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `outlet_map`: analyze a retail location network and write reports.
//!
//! Uses `indicatif-log-bridge` (via [`outlet_map_cli_utils::init_logger`])
//! so log output and progress bars share the terminal cleanly.

mod run_all;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use outlet_map_analytics::clustering::cluster_locations;
use outlet_map_analytics::coverage::analyze_coverage;
use outlet_map_analytics::efficiency::analyze_efficiency;
use outlet_map_analytics::gaps::analyze_gaps;
use outlet_map_analytics::pipeline::{PipelineOptions, run_pipeline};
use outlet_map_cli_utils::{IndicatifProgress, MultiProgress};
use outlet_map_config::AnalysisConfig;
use outlet_map_location_models::{LocationTable, OrgType};
use outlet_map_report::structured::read_json_report;
use outlet_map_report::text::executive_summary;
use outlet_map_report::{ReportPaths, write_reports};
use outlet_map_source::combine::{collect_table, write_table_csv};
use outlet_map_source::file_source::FileSource;
use outlet_map_source::ingest::load_table;
use outlet_map_source::operator::{classify_operator, classify_table};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "outlet_map", about = "Retail location network analysis")]
struct Cli {
    /// TOML config file merged over the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory reports are written to (overrides `output_dir`)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
    /// Restrict the analysis to one city
    #[arg(long, global = true)]
    city: Option<String>,
    /// Retrain the efficiency model instead of loading the cached one
    #[arg(long, global = true)]
    no_cache: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every analysis on a location table and write all reports
    Analyze {
        /// CSV or JSON location table
        input: PathBuf,
    },
    /// Collect and analyze each configured city separately
    RunAll {
        /// Directory holding scraper exports (overrides `data_dir`)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Combine scraper exports into one location table CSV
    Collect {
        /// Directory holding scraper exports (overrides `data_dir`)
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Comma-separated organization types (default: operator storefronts)
        #[arg(long, value_delimiter = ',')]
        org_types: Vec<OrgType>,
        /// Output CSV path
        #[arg(long)]
        output: PathBuf,
    },
    /// Print the operator a storefront name belongs to
    Classify { name: String },
    /// Print coverage metrics as JSON
    Coverage { input: PathBuf },
    /// Print gap analysis as JSON
    Gaps { input: PathBuf },
    /// Print clustering results as JSON
    Cluster { input: PathBuf },
    /// Print efficiency scores as JSON
    Efficiency { input: PathBuf },
    /// Re-render every report from a saved JSON report
    Report {
        #[arg(long)]
        from: PathBuf,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = outlet_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = AnalysisConfig::load_or_default(cli.config.as_deref())?;
    if let Some(dir) = &cli.output_dir {
        config.output_dir.clone_from(dir);
    }
    let options = PipelineOptions::new(&config, cli.no_cache).with_city(cli.city.clone());

    match cli.command {
        Commands::Analyze { input } => {
            let start = Instant::now();
            let table = load(&input, &multi)?;

            let progress = IndicatifProgress::steps_bar(&multi, "Analyzing", 0);
            let result = run_pipeline(&table, &config, &options, progress.as_ref())?;
            let paths = write_reports(&result, &config.map, &config.output_dir)?;

            println!("{}", executive_summary(&result));
            print_paths(&paths);
            log::info!("Analysis finished in {:.1}s", start.elapsed().as_secs_f64());
        }
        Commands::RunAll { data_dir } => {
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            let summary = run_all::run(&config, &options, &multi);
            summary.print();
            if summary.all_failed() {
                return Err("every city failed".into());
            }
        }
        Commands::Collect {
            data_dir,
            org_types,
            output,
        } => {
            let source = FileSource::new(
                data_dir.unwrap_or_else(|| config.data_dir.clone()),
                config.city_codes.clone(),
            );
            let org_types = if org_types.is_empty() {
                OrgType::operators().to_vec()
            } else {
                org_types
            };
            let cities = cli.city.map_or_else(|| config.cities.clone(), |c| vec![c]);

            let progress = IndicatifProgress::steps_bar(&multi, "Collecting", 0);
            let table = collect_table(&source, &cities, &org_types, progress.as_ref())?;
            write_table_csv(&table, &output)?;
            println!("Wrote {} records to {}", table.len(), output.display());
        }
        Commands::Classify { name } => {
            println!("{}", classify_operator(&name));
        }
        Commands::Coverage { input } => {
            let table = scoped(load(&input, &multi)?, cli.city.as_deref());
            print_json(&analyze_coverage(&table, &config))?;
        }
        Commands::Gaps { input } => {
            let table = scoped(load(&input, &multi)?, cli.city.as_deref());
            print_json(&analyze_gaps(&table, &config, cli.city.as_deref())?)?;
        }
        Commands::Cluster { input } => {
            let table = scoped(load(&input, &multi)?, cli.city.as_deref());
            print_json(&cluster_locations(&table, &config.clustering)?)?;
        }
        Commands::Efficiency { input } => {
            let table = scoped(load(&input, &multi)?, cli.city.as_deref());
            print_json(&analyze_efficiency(
                &table,
                &config.efficiency,
                &options.cache,
            )?)?;
        }
        Commands::Report { from } => {
            let result = read_json_report(&from)?;
            let paths = write_reports(&result, &config.map, &config.output_dir)?;
            println!("{}", executive_summary(&result));
            print_paths(&paths);
        }
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}

fn load(input: &Path, multi: &MultiProgress) -> Result<LocationTable, Box<dyn std::error::Error>> {
    let progress = IndicatifProgress::records_bar(multi, &format!("Reading {}", input.display()));
    let mut table = load_table(input, progress.as_ref())?;
    classify_table(&mut table);
    Ok(table)
}

fn scoped(table: LocationTable, city: Option<&str>) -> LocationTable {
    match city {
        Some(city) => table.filter_city(city),
        None => table,
    }
}

fn print_json(value: &impl Serialize) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_paths(paths: &ReportPaths) {
    println!("Reports:");
    for path in paths.written() {
        println!("  {}", path.display());
    }
}
