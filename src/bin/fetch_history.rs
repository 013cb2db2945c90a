use anyhow::{anyhow, Result};
use chrono::{Datelike, Local, NaiveDate};
use tracing::info;

use mse_stocks::api::{HistoryProvider, MseClient};
use mse_stocks::data_collector::assemble_rows;
use mse_stocks::models::Config;
use mse_stocks::normalizer::clean_symbol;
use mse_stocks::utils::init_tracing;
use mse_stocks::validator::validate;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(false);

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        println!("Usage: cargo run --bin fetch_history -- <symbol> [year]");
        println!("Example: cargo run --bin fetch_history -- ALK 2023");
        return Ok(());
    }

    let symbol = clean_symbol(&args[1]);
    let year: i32 = match args.get(2) {
        Some(value) => value.parse().map_err(|_| anyhow!("invalid year: {}", value))?,
        None => Local::now().year(),
    };

    let from = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| anyhow!("invalid year: {}", year))?;
    let to = NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(|| anyhow!("invalid year: {}", year))?;

    info!("📈 Fetching {} history from {} to {}", symbol, from, to);

    let config = Config::from_env()?;
    let client = MseClient::new(&config)?;

    let table = client.fetch_history_table(&symbol, from, to).await?;
    if table.len() < 2 {
        println!("No data for {} in {}", symbol, year);
        return Ok(());
    }

    let validation = validate(assemble_rows(&table, &symbol));
    let records = validation.valid_records().unwrap_or(&[]);

    println!("\n📊 {} daily closes for {}:", symbol, year);
    println!("Date       | Last trade price | Volume");
    println!("-----------|------------------|-------");
    for record in records.iter().take(10) {
        println!(
            "{} | {:>16.2} | {}",
            record.trade_date, record.last_trade_price, record.volume
        );
    }
    if records.len() > 10 {
        println!("...        | ...              | ...");
    }

    println!("\nTable rows:     {}", table.len() - 1);
    println!("Valid records:  {}", validation.valid_count());
    println!("Invalid rows:   {}", validation.invalid_count());

    Ok(())
}
