//! Aqualog Suez Node - CLI for the water-consumption adapter
//!
//! Fetches daily readings from the toutsurmoneau portal and logs them as a
//! stand-in device sink.
//!
//! # Usage
//!
//! ```bash
//! # Backfill a year of history, then keep catching up daily
//! aqualog-suez-node --username user@example.com --password secret \
//!     --counter 123456
//!
//! # Shorter backlog, earlier catch-up slot
//! aqualog-suez-node --username user@example.com --password secret \
//!     --counter 123456 --days 90 --catchup-hour 4
//! ```

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use aqualog_adapter_suez::{Adapter, AdapterConfig, HttpsTransport, LogSink};

/// Suez toutsurmoneau water-consumption adapter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Portal account login (email address)
    #[arg(short, long)]
    username: String,

    /// Portal account password
    #[arg(short, long)]
    password: String,

    /// Water counter identifier
    #[arg(short, long)]
    counter: String,

    /// Days of history to backfill (clamped to 30-1000)
    #[arg(short, long, default_value = "365")]
    days: u32,

    /// Local hour of the daily catch-up pass
    #[arg(long, default_value = "5")]
    catchup_hour: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Setup logging
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Print banner
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║          Aqualog Suez Node - Water Consumption Log           ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Account:  {:<50} ║", truncate(&args.username, 50));
    println!("║  Counter:  {:<50} ║", truncate(&args.counter, 50));
    println!("║  Backlog:  {:<50} ║", format!("{} days", args.days));
    println!("║  Catch-up: {:<50} ║", format!("{:02}:00 local", args.catchup_hour));
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    info!(
        username = %args.username,
        counter = %args.counter,
        days = args.days,
        password_set = !args.password.is_empty(),
        "starting Suez adapter"
    );

    let config = AdapterConfig::new(&args.username, &args.password, &args.counter)
        .with_history_days(args.days)
        .with_catchup_hour(args.catchup_hour);

    let transport = HttpsTransport::new(config.portal.clone())?;
    let adapter = Adapter::new(config, transport, LogSink::default());
    adapter.run().await;

    Ok(())
}

/// Truncate string with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}
