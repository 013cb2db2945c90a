use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber; `RUST_LOG` wins over the default filter
pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "debug,sqlx=warn,hyper=warn,reqwest=warn"
    } else {
        "info,sqlx=warn,hyper=warn,reqwest=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber was already set");
    }
}

/// Seconds with two decimals, as shown in the run summary
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.2} seconds", elapsed.as_secs_f64())
}
