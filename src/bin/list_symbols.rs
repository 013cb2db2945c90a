use anyhow::Result;
use tracing::info;

use mse_stocks::api::{MseClient, SymbolSource};
use mse_stocks::models::Config;
use mse_stocks::utils::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(false);

    info!("🧪 Checking symbol discovery against the exchange site");

    let config = Config::from_env()?;
    let client = MseClient::new(&config)?;

    let symbols = client.list_symbols().await?;
    println!("Found {} symbols:", symbols.len());
    for chunk in symbols.chunks(10) {
        println!("  {}", chunk.join(", "));
    }

    Ok(())
}
