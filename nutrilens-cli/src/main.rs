// Nutrilens Command Line Interface
// Meal photo analysis, on-device or through the hosted service

mod settings;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use nutrilens_cloud::CloudAnalyzer;
use nutrilens_core::AnalysisResult;
use nutrilens_eye::labels::{ClassTable, FoodAllowList};
use nutrilens_eye::processing::resolve_name;
use nutrilens_eye::{FoodAnalyzer, NameTranslations, NutritionTable};
use settings::AppConfig;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nutrilens")]
#[command(about = "Recognise food in a photo and estimate its nutrition", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML or JSON)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a meal photo
    Analyze {
        /// Photo to analyze
        image: PathBuf,

        /// Use the hosted service instead of the on-device model
        #[arg(long)]
        remote: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Check whether the hosted service answers
    CheckRemote,

    /// List detector classes
    Classes {
        /// Only the food classes
        #[arg(long)]
        food_only: bool,
    },

    /// Nutrition for a food name at a given portion
    Lookup {
        name: String,

        #[arg(long, default_value = "100")]
        grams: u32,
    },

    /// Print the effective configuration
    ShowConfig,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.validate()?;

    let level = if cli.verbose { "debug" } else { config.logging.level.as_str() };
    init_logging(level, cli.log_json || config.logging.json);
    debug!("Configuration loaded");

    match cli.command {
        Commands::Analyze {
            image,
            remote,
            format,
        } => {
            let result = if remote {
                let analyzer = CloudAnalyzer::new(config.cloud.clone())?;
                info!(endpoint = %config.cloud.endpoint, "Analyzing remotely");
                analyzer
                    .analyze_food_image(&image)
                    .await
                    .with_context(|| format!("Remote analysis of {} failed", image.display()))?
            } else {
                let analyzer = FoodAnalyzer::new(config.detection.clone())?;
                analyzer.analyze_food(&image).await
            };
            print_result(&result, format)?;
        }
        Commands::CheckRemote => {
            let analyzer = CloudAnalyzer::new(config.cloud.clone())?;
            if analyzer.check_service_availability().await {
                println!("✅ {} is available", config.cloud.endpoint);
            } else {
                bail!("{} is unavailable", config.cloud.endpoint);
            }
        }
        Commands::Classes { food_only } => {
            let detection = &config.detection;
            let classes =
                ClassTable::load(detection.class_names_path.as_deref(), detection.num_classes)?;
            if food_only {
                let allow_list = FoodAllowList::builtin(classes.len())?;
                for id in allow_list.sorted_ids() {
                    println!("{:>4}  {}", id, classes.name(id).unwrap_or("?"));
                }
            } else {
                for (id, name) in classes.iter() {
                    println!("{:>4}  {}", id, name);
                }
            }
        }
        Commands::Lookup { name, grams } => {
            let nutrition = NutritionTable::load(config.detection.nutrition_table_path.as_deref())?;
            let translations = NameTranslations::builtin()?;
            let item = resolve_name(&name, 1.0, grams, &nutrition, &translations);
            println!("{} ({}), {} g", item.name, item.localized_name, item.grams);
            println!(
                "  {} kcal | protein {} g | fat {} g | carbs {} g",
                item.calories, item.protein, item.fat, item.carbs
            );
        }
        Commands::ShowConfig => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn init_logging(level: &str, json: bool) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_result(result: &AnalysisResult, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    if let Some(error) = &result.error {
        println!("⚠️  Analysis failed, showing an estimate: {}", error);
    }

    if result.items.is_empty() {
        println!("No food recognised");
    }

    for item in &result.items {
        println!(
            "{:<24} {:>5} g {:>5} kcal  P {:>5.1}  F {:>5.1}  C {:>5.1}  ({:.0}%)",
            item.localized_name,
            item.grams,
            item.calories,
            item.protein,
            item.fat,
            item.carbs,
            item.confidence * 100.0
        );
    }

    let total = &result.total;
    println!(
        "{:<24} {:>7} {:>5} kcal  P {:>5.1}  F {:>5.1}  C {:>5.1}",
        "Total", "", total.calories, total.protein, total.fat, total.carbs
    );

    Ok(())
}
