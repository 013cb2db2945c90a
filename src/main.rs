use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::error;

use mse_stocks::api::{MseClient, StaticSymbols, SymbolSource};
use mse_stocks::data_collector::DataCollector;
use mse_stocks::database::{DatabaseManager, RecordStore};
use mse_stocks::date_range::DateRangeResolver;
use mse_stocks::exporter::Exporter;
use mse_stocks::models::{Config, FetchMode, RunSummary, SymbolStatus};
use mse_stocks::utils::{format_elapsed, init_tracing};

/// Historical trading data collector for the Macedonian Stock Exchange
#[derive(Parser)]
#[command(name = "mse-stocks")]
#[command(version = "0.1.0")]
#[command(about = "Collect daily trading history for MSE symbols into SQLite and a combined CSV")]
#[command(long_about = "
Discovers the listed symbols (or takes them from --symbols), requests one page of
history per symbol and calendar year, validates every row, appends the rows to the
SQLite store and writes all of them to data/processed/all_symbols_YYYYMMDD.csv.

Settings come from the environment (or a .env file) and can be overridden here.

Examples:
  mse-stocks                                  # all symbols, 10 year lookback
  mse-stocks --symbols ALK,KMB -l 2           # two symbols, 2 year lookback
  mse-stocks --mode incremental               # start from the last stored year
")]
struct Args {
    /// Window policy: full-refetch or incremental
    #[arg(long, short = 'm')]
    mode: Option<FetchMode>,

    /// Years to look back from the current year
    #[arg(long, short = 'l')]
    lookback_years: Option<i32>,

    /// Rows per insert batch
    #[arg(long, short = 'b')]
    batch_size: Option<usize>,

    /// Comma separated symbols; skips discovery
    #[arg(long, short = 's', value_delimiter = ',')]
    symbols: Vec<String>,

    /// Process at most this many symbols
    #[arg(long)]
    max_symbols: Option<usize>,

    /// Symbols processed at the same time
    #[arg(long, short = 'c')]
    concurrency: Option<usize>,

    /// Directory for the combined CSV
    #[arg(long)]
    export_dir: Option<String>,

    /// SQLite database file
    #[arg(long)]
    database: Option<String>,

    /// Print the run summary as JSON
    #[arg(long)]
    summary_json: bool,

    /// Debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.fetch_mode = mode;
        }
        if let Some(years) = self.lookback_years {
            config.lookback_years = years;
        }
        if let Some(size) = self.batch_size {
            config.batch_size = size;
        }
        if let Some(concurrency) = self.concurrency {
            config.max_concurrent_symbols = concurrency.max(1);
        }
        if let Some(dir) = &self.export_dir {
            config.export_dir = dir.clone();
        }
        if let Some(path) = &self.database {
            config.database_path = path.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    println!("🚀 Starting stock market data collection...");

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("❌ Configuration Error: {}", e);
            std::process::exit(1);
        }
    };
    args.apply(&mut config);

    let database = match DatabaseManager::new(&config.database_path).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            eprintln!("❌ Database Error: {}", e);
            std::process::exit(1);
        }
    };

    let client = Arc::new(MseClient::new(&config)?);
    let store: Arc<dyn RecordStore> = database;
    let resolver = DateRangeResolver::new(config.fetch_mode, config.lookback_years, store.clone());
    let collector = DataCollector::new(client.clone(), store, Exporter::new(&config.export_dir), &config);

    let source: Arc<dyn SymbolSource> = if args.symbols.is_empty() {
        client as Arc<dyn SymbolSource>
    } else {
        Arc::new(StaticSymbols::new(&args.symbols))
    };

    let summary = match collector
        .run_pipeline(source.as_ref(), &resolver, args.max_symbols)
        .await
    {
        Ok(summary) => summary,
        Err(e) => {
            error!("Error in main execution: {:#}", e);
            eprintln!("❌ {:#}", e);
            std::process::exit(1);
        }
    };

    if args.summary_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("\nExecution Summary:");
    println!("Time taken: {}", format_elapsed(summary.elapsed));
    println!("Total symbols processed: {}", summary.total_symbols);
    println!("Total records collected: {}", summary.total_records);
    println!(
        "Symbols: {} ok, {} empty, {} partial, {} failed",
        summary.ok_symbols, summary.empty_symbols, summary.partial_symbols, summary.failed_symbols
    );
    match &summary.export_path {
        Some(path) => println!("Export: {}", path),
        None => println!("Export: nothing written"),
    }

    for outcome in &summary.outcomes {
        match &outcome.status {
            SymbolStatus::Partial { reason } => println!("  ⚠️ {}: {}", outcome.symbol, reason),
            SymbolStatus::Failed { error } => println!("  ❌ {}: {}", outcome.symbol, error),
            _ => {}
        }
    }
}
