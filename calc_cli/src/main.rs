//! # Materiaalcalculator CLI
//!
//! Terminal front end for the estimate engine: run a single estimate,
//! list the material catalog, or print a session's logged history.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use calc_core::calculations::estimate::estimate;
use calc_core::calculations::{EstimateForm, EstimateResult};
use calc_core::errors::CalcError;
use calc_core::materials::MaterialCatalog;
use calc_core::session::{parse_date_stamp, LogKey, SessionId};
use calc_core::session_log::{FileLogStore, LogRecord, LogStore};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Material estimate calculator", long_about = None)]
struct Cli {
    /// JSON file with a material catalog; built-in catalog when absent
    #[arg(long, global = true, env = "MATERIALS_FILE")]
    materials: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate area, quantity and price for one component
    Estimate(EstimateArgs),
    /// List the material catalog
    Materials,
    /// Print the logged estimates of a session
    History(HistoryArgs),
}

#[derive(Args, Debug)]
struct EstimateArgs {
    #[arg(long)]
    material: String,
    #[arg(long)]
    length: String,
    #[arg(long)]
    width: String,
    #[arg(long)]
    height: Option<String>,
    /// Slope in degrees
    #[arg(long)]
    slope: Option<String>,
    /// Waste margin in percent
    #[arg(long, default_value = "0")]
    margin: String,
    /// mm, cm or m
    #[arg(long, default_value = "m")]
    unit: String,
    #[arg(long)]
    label: Option<String>,

    /// Append the result to this log directory
    #[arg(long, requires = "session")]
    log_dir: Option<PathBuf>,
    /// Session id to log under (32 hex characters)
    #[arg(long, requires = "log_dir")]
    session: Option<String>,
}

#[derive(Args, Debug)]
struct HistoryArgs {
    #[arg(long, env = "LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,
    #[arg(long)]
    session: String,
    /// Day to read, YYYYMMDD; today when absent
    #[arg(long)]
    date: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<CalcError>() {
                Some(calc) => report_error(calc),
                None => eprintln!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let catalog = match &cli.materials {
        Some(path) => MaterialCatalog::load(path)
            .with_context(|| format!("failed to load material catalog {}", path.display()))?,
        None => MaterialCatalog::default(),
    };

    match cli.command {
        Command::Estimate(args) => run_estimate(args, &catalog),
        Command::Materials => {
            println!("Materials:");
            for entry in catalog.entries() {
                println!("  {:<12} {}", entry.name, entry.unit_cost);
            }
            Ok(())
        }
        Command::History(args) => run_history(args),
    }
}

fn run_estimate(args: EstimateArgs, catalog: &MaterialCatalog) -> anyhow::Result<()> {
    let form = EstimateForm {
        label: args.label,
        material: Some(args.material),
        length: Some(args.length),
        width: Some(args.width),
        height: args.height,
        slope: args.slope,
        margin_percent: Some(args.margin),
        unit: Some(args.unit),
    };

    let result = estimate(&form, catalog)?;

    print_result(&result);

    if let (Some(dir), Some(session)) = (args.log_dir, args.session) {
        let session = SessionId::parse(&session)?;
        let record = LogRecord::now(result);
        let key = LogKey::new(session, record.timestamp.date_naive());
        let store = FileLogStore::new(dir);
        store.append(&key, &record)?;
        println!();
        println!("Logged to {}", store.jsonl_path(&key).display());
    }
    Ok(())
}

fn run_history(args: HistoryArgs) -> anyhow::Result<()> {
    let session = SessionId::parse(&args.session)?;
    let date = match args.date.as_deref() {
        Some(raw) => parse_date_stamp(raw)?,
        None => Utc::now().date_naive(),
    };
    let key = LogKey::new(session, date);
    let records = FileLogStore::new(args.log_dir).history(&key)?;

    if records.is_empty() {
        println!("No estimates logged for {} on {}", key.session, date);
        return Ok(());
    }
    for record in &records {
        let r = &record.result;
        println!(
            "{}  {:<12} {:<10} {:>8.2} {}  qty {:>8.2}  price {:>8.2}",
            record.timestamp.format("%H:%M:%S"),
            r.label.as_deref().unwrap_or("-"),
            r.material,
            r.area,
            r.area_unit,
            r.quantity,
            r.price
        );
    }
    Ok(())
}

fn print_result(result: &EstimateResult) {
    println!("═══════════════════════════════════════");
    println!("  MATERIAL ESTIMATE");
    println!("═══════════════════════════════════════");
    println!();
    println!("Input:");
    if let Some(label) = &result.label {
        println!("  Component: {}", label);
    }
    println!("  Material:  {}", result.material);
    println!("  Length:    {} m", result.length);
    println!("  Width:     {} m", result.width);
    if let Some(height) = result.height {
        println!("  Height:    {} m", height);
    }
    if let Some(slope) = result.slope {
        println!("  Slope:     {}°", slope);
    }
    println!("  Margin:    {}%", result.margin_percent);
    println!("  Unit:      {}", result.unit);
    println!();
    println!("Result:");
    println!("  Area:      {:.2} {}", result.area, result.area_unit);
    println!("  Quantity:  {:.2}", result.quantity);
    println!("  Price:     {:.2}", result.price);
    println!("═══════════════════════════════════════");

    println!();
    println!("JSON Output:");
    if let Ok(json) = serde_json::to_string_pretty(result) {
        println!("{}", json);
    }
}

fn report_error(e: &CalcError) {
    eprintln!("Error: {}", e);
    if let Ok(json) = serde_json::to_string_pretty(e) {
        eprintln!();
        eprintln!("Error JSON:");
        eprintln!("{}", json);
    }
}
