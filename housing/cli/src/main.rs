use std::{
    io::{self, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use housing_pricing::{
    evaluate::load_artifact, format_currency, EvaluationReport, Evaluator, FurnishingStatus,
    HouseFeatures, PricingConfig, PricingTelemetry, TrainingPipeline, TrainingSummary, YesNo,
};
use serde_json::json;
use shared_event_bus::FileEventPublisher;
use shared_logging::LogLevel;

#[derive(Parser, Debug)]
#[command(name = "housing", version, about = "Housing price model trainer and evaluator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fits the pipeline by cross-validated grid search and saves the artifact.
    Train {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long)]
        dataset: Option<PathBuf>,
        #[arg(long)]
        artifact: Option<PathBuf>,
    },
    /// Scores a saved artifact against the dataset.
    Evaluate {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long)]
        dataset: Option<PathBuf>,
        #[arg(long)]
        artifact: Option<PathBuf>,
    },
    /// Predicts the price of one house.
    Predict {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long)]
        artifact: Option<PathBuf>,
        #[command(flatten)]
        house: HouseArgs,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// TOML config; defaults to $HOUSING_CONFIG or ./housing.toml.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Append pipeline events to this JSON-lines file.
    #[arg(long)]
    event_log: Option<PathBuf>,
    /// Overrides `[logging] level`.
    #[arg(long)]
    log_level: Option<LogLevel>,
}

#[derive(Args, Debug)]
struct HouseArgs {
    #[arg(long, default_value_t = 3000)]
    area: u32,
    #[arg(long, default_value_t = 3)]
    bedrooms: u32,
    #[arg(long, default_value_t = 2)]
    bathrooms: u32,
    #[arg(long, default_value_t = 2)]
    stories: u32,
    #[arg(long, default_value_t = 1)]
    parking: u32,
    #[arg(long, default_value = "yes")]
    mainroad: YesNo,
    #[arg(long, default_value = "yes")]
    guestroom: YesNo,
    #[arg(long, default_value = "yes")]
    basement: YesNo,
    #[arg(long, default_value = "yes")]
    hotwaterheating: YesNo,
    #[arg(long, default_value = "yes")]
    airconditioning: YesNo,
    #[arg(long, default_value = "yes")]
    prefarea: YesNo,
    #[arg(long, default_value = "furnished")]
    furnishingstatus: FurnishingStatus,
}

impl From<HouseArgs> for HouseFeatures {
    fn from(args: HouseArgs) -> Self {
        Self {
            area: args.area,
            bedrooms: args.bedrooms,
            bathrooms: args.bathrooms,
            stories: args.stories,
            mainroad: args.mainroad,
            guestroom: args.guestroom,
            basement: args.basement,
            hotwaterheating: args.hotwaterheating,
            airconditioning: args.airconditioning,
            parking: args.parking,
            prefarea: args.prefarea,
            furnishingstatus: args.furnishingstatus,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Train {
            common,
            dataset,
            artifact,
        } => {
            let (config, telemetry) = setup(&common, "train")?;
            let mut job = TrainingPipeline::new(&config);
            if let Some(path) = dataset {
                job = job.with_dataset(path);
            }
            if let Some(path) = artifact {
                job = job.with_artifact(path);
            }
            let summary = job.run_with_telemetry(Some(&telemetry))?;
            report_training(&mut io::stdout().lock(), &summary)?;
            Ok(())
        }
        Commands::Evaluate {
            common,
            dataset,
            artifact,
        } => {
            let (config, telemetry) = setup(&common, "evaluate")?;
            let mut job = Evaluator::new(&config);
            if let Some(path) = dataset {
                job = job.with_dataset(path);
            }
            if let Some(path) = artifact {
                job = job.with_artifact(path);
            }
            let report = job.run_with_telemetry(Some(&telemetry))?;
            report_evaluation(&mut io::stdout().lock(), &report)?;
            if report.in_sample {
                eprintln!(
                    "note: scored on the training data; cross-validated RMSE was {}",
                    report.cv_rmse
                );
            }
            Ok(())
        }
        Commands::Predict {
            common,
            artifact,
            house,
        } => {
            let (config, telemetry) = setup(&common, "predict")?;
            let house = HouseFeatures::from(house);
            house.validate()?;
            let path = artifact.unwrap_or_else(|| config.paths.artifact.clone());
            let model = load_artifact(&path, Some(&telemetry))?;
            let price = model
                .pipeline
                .predict_one(&house)
                .context("predicting house price")?;
            telemetry.log(
                LogLevel::Info,
                "predict.completed",
                json!({ "house": house, "price": price }),
            )?;
            println!(
                "Predicted price: {}",
                format_currency(&config.dashboard.currency_symbol, price)
            );
            Ok(())
        }
    }
}

fn report_training(out: &mut impl Write, summary: &TrainingSummary) -> io::Result<()> {
    writeln!(out, "Best alpha: {}", summary.best_alpha)?;
    writeln!(out, "Model saved successfully.")
}

fn report_evaluation(out: &mut impl Write, report: &EvaluationReport) -> io::Result<()> {
    writeln!(out, "RMSE: {}", report.rmse())?;
    writeln!(out, "R2: {}", report.r2())
}

fn setup(common: &CommonArgs, component: &str) -> Result<(PricingConfig, PricingTelemetry)> {
    let config = PricingConfig::load_or_discover(common.config.as_deref())
        .context("loading configuration")?;
    let level = common.log_level.unwrap_or(config.logging.level);
    let mut builder = PricingTelemetry::builder(component)
        .log_path(config.log_path(component))
        .min_level(level);
    if let Some(path) = &common.event_log {
        builder = builder.event_publisher(Arc::new(FileEventPublisher::new(path)?));
    }
    let telemetry = builder.build()?;
    Ok((config, telemetry))
}
