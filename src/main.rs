use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde_json::json;

use drainsurvey::export::{ExportFormat, ExportFormatter};
use drainsurvey::extraction::InspectionExport;
use drainsurvey::validation::{
    PricingConfiguration, TravelInfo, ValidationContext, VehicleTravelRate, WorkCategory,
};
use drainsurvey::{ClassifiedSection, Pipeline, RuleEngine, SurveyConfig};

#[derive(Parser)]
#[command(name = "drainsurvey")]
#[command(about = "Classify drain inspection exports against MSCC5 and validate them for reporting")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, env = "DRAINSURVEY_CONFIG")]
    config: Option<PathBuf>,
    /// Rule-set JSON, overrides the config file
    #[arg(long, global = true)]
    rules: Option<PathBuf>,
    /// Sector profile, overrides the config file
    #[arg(long, global = true)]
    sector: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one line per classified section
    Classify {
        /// Inspection export (SQLite)
        export: PathBuf,
    },
    /// Write the compliance export
    Export {
        export: PathBuf,
        #[arg(long)]
        format: Option<ExportFormat>,
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Check pricing readiness; exits non-zero when export is blocked
    Validate {
        export: PathBuf,
        /// JSON array of pricing configurations
        #[arg(long)]
        pricing: PathBuf,
        #[arg(long, requires = "travel_cost")]
        travel_minutes: Option<f64>,
        #[arg(long, requires = "travel_minutes")]
        travel_cost: Option<f64>,
        /// JSON array of work categories
        #[arg(long, requires = "vehicle_rates")]
        work_categories: Option<PathBuf>,
        /// JSON array of vehicle travel rates
        #[arg(long, requires = "work_categories")]
        vehicle_rates: Option<PathBuf>,
    },
}

fn main() -> Result<ExitCode> {
    drainsurvey::init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SurveyConfig::load(path)?,
        None => SurveyConfig::default(),
    };
    if let Some(rules) = cli.rules {
        config.rules_path = Some(rules);
    }
    if let Some(sector) = cli.sector {
        config.sector = sector;
    }

    let pipeline = Pipeline::new(
        RuleEngine::new(config.rule_cache()?),
        config.sector_profile()?,
    );

    match cli.command {
        Commands::Classify { export } => {
            let sections = classify(&pipeline, &export)?;
            for classified in &sections {
                print_section(classified);
            }
        }
        Commands::Export {
            export,
            format,
            output,
        } => {
            let sections = classify(&pipeline, &export)?;
            let format = format.unwrap_or(config.export_format);
            let rendered = ExportFormatter::new(pipeline.profile()).format(&sections, format)?;
            match output {
                Some(path) => std::fs::write(&path, rendered)
                    .with_context(|| format!("failed to write export to {:?}", path))?,
                None => print!("{}", rendered),
            }
        }
        Commands::Validate {
            export,
            pricing,
            travel_minutes,
            travel_cost,
            work_categories,
            vehicle_rates,
        } => {
            let sections = classify(&pipeline, &export)?;
            let configurations: Vec<PricingConfiguration> = read_json(&pricing)?;
            let travel = match (travel_minutes, travel_cost) {
                (Some(travel_minutes), Some(additional_cost)) => Some(TravelInfo {
                    travel_minutes,
                    additional_cost,
                }),
                _ => None,
            };
            let work_categories: Option<Vec<WorkCategory>> =
                work_categories.as_deref().map(read_json::<Vec<WorkCategory>>).transpose()?;
            let vehicle_rates: Option<Vec<VehicleTravelRate>> =
                vehicle_rates.as_deref().map(read_json::<Vec<VehicleTravelRate>>).transpose()?;

            let report = config.validation_engine().validate_sections(
                &sections,
                &configurations,
                ValidationContext {
                    travel: travel.as_ref(),
                    work_categories: work_categories.as_deref(),
                    vehicle_rates: vehicle_rates.as_deref(),
                },
            );
            let output = json!({
                "report": &report,
                "rateAdjustments": report.rate_adjustments(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            if !report.is_ready {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn classify(pipeline: &Pipeline, path: &Path) -> Result<Vec<ClassifiedSection>> {
    let export = InspectionExport::open(path)?;
    pipeline
        .run(&export)
        .with_context(|| format!("failed to classify {:?}", path))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {:?}", path))
}

fn print_section(classified: &ClassifiedSection) {
    let section = &classified.section;
    let flags = &classified.classification.flags;
    println!(
        "{:>4}  {}-{}  S{} Sv{}  PLR {}  {:<7}  {}{}",
        section.item_no,
        section.upstream_node,
        section.downstream_node,
        section.grades.structural_or_zero(),
        section.grades.service_or_zero(),
        classified.classification.plr,
        flags.priority.label(),
        classified.recommendation.summary,
        if flags.adoptable { "" } else { "  (not adoptable)" },
    );
}
