use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use upbench::common::RunConfig;
use upbench::history::{HistoryEntry, HistoryStore};
use upbench::run::{RunReport, Runner, StrategySummary};
use upbench::utils::format::{format_bytes, format_elapsed, format_speed};

#[derive(Parser)]
#[command(name = "upbench")]
#[command(about = "Benchmark single-shot vs. parallel chunked uploads")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the benchmark against the configured service
    Run {
        #[arg(help = "File to upload")]
        path: PathBuf,
        #[arg(long, help = "Different file for the chunked path (defaults to PATH)")]
        chunk_file: Option<PathBuf>,
    },
    /// Show the most recent benchmark runs
    History,
    /// Delete all recorded runs
    ClearHistory,
    /// Show the active configuration and where it is loaded from
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("upbench=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = RunConfig::load()?;

    match cli.command {
        Commands::Run { path, chunk_file } => {
            let chunk_path = chunk_file.unwrap_or_else(|| path.clone());
            for p in [&path, &chunk_path] {
                if !p.exists() {
                    eprintln!("Error: file not found: {}", p.display());
                    std::process::exit(1);
                }
            }

            let report = Runner::new(config).run(&path, &chunk_path).await?;
            print_report(&report);

            match HistoryStore::default_location() {
                Some(store) => store.record(HistoryEntry::from(&report))?,
                None => tracing::warn!("no data directory available, run not recorded"),
            }

            if report.inconclusive() {
                eprintln!("Error: every repetition of every strategy failed");
                std::process::exit(1);
            }
        }
        Commands::History => {
            show_history();
        }
        Commands::ClearHistory => {
            if let Some(store) = HistoryStore::default_location() {
                store.clear()?;
                println!("History cleared.");
            }
        }
        Commands::Config => {
            if let Some(path) = RunConfig::config_path() {
                println!("# config file: {}", path.display());
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    println!("{}", style("Benchmark results").bold().green());
    println!(
        "file: {} ({}), chunk size {}, {} repetition(s)",
        report.chunk_file.name,
        format_bytes(report.chunk_file.size),
        format_bytes(report.chunk_size),
        report.repetitions,
    );
    print_strategy("single ", &report.single);
    print_strategy("chunked", &report.chunked);
}

fn print_strategy(label: &str, summary: &StrategySummary) {
    let status = if summary.failed() == 0 {
        style(format!("{}/{} ok", summary.succeeded, summary.attempted)).green()
    } else {
        style(format!("{}/{} ok", summary.succeeded, summary.attempted)).red()
    };
    println!(
        "  {label}: {status}, avg {}, {}",
        format_elapsed(summary.mean_elapsed),
        format_speed(summary.mean_speed_bps),
    );
    for failure in &summary.failures {
        println!("    {}", style(failure).red());
    }
}

fn show_history() {
    let Some(store) = HistoryStore::default_location() else {
        println!("No history available.");
        return;
    };
    let entries = store.load();
    if entries.is_empty() {
        println!("No recorded runs.");
        return;
    }

    println!("{}", style("Recent runs (newest first)").bold());
    for entry in entries.iter().take(10) {
        let avg_chunk = entry
            .avg_chunk_ms
            .map(|ms| format!("{:.2}s", ms as f64 / 1000.0))
            .unwrap_or_else(|| "-".to_string());
        let ids: Vec<&str> = entry
            .correlation_ids
            .iter()
            .filter_map(|id| id.as_deref())
            .collect();
        println!(
            "{}  {:>9}  chunked avg {:>8}  x{}  {}",
            entry.date.format("%Y-%m-%d %H:%M:%S"),
            format_bytes(entry.chunk_file_size),
            avg_chunk,
            entry.repetitions,
            if ids.is_empty() {
                "-".to_string()
            } else {
                ids.join(", ")
            },
        );
    }
}
