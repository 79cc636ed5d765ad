use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use starnav::config::{Config, VisitorConfig};
use starnav::storage::{self, KvTable};
use starnav::visitors::{Clock, StatsAggregator, SystemClock};
use std::collections::BTreeMap;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "starnav-admin")]
#[command(about = "StarNav maintenance CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current visitor counters
    Stats,
    /// Print the most recently active visit records
    Recent {
        #[arg(long, default_value_t = VisitorConfig::DEFAULT_RECENT_LIMIT)]
        limit: i64,
    },
    /// Inspect or change site settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// List every stored setting
    List,
    /// Store a single setting
    Set { key: String, value: String },
}

fn format_time(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("starnav=warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let (storage, visits) = storage::connect(&config.database)
        .await
        .context("failed to open the database")?;

    // Ensure database is initialized
    storage.init().await?;

    let stats = StatsAggregator::new(visits, config.visitors.session_window_secs);

    match cli.command {
        Commands::Stats => {
            let snapshot = stats.snapshot(SystemClock.now()).await?;
            println!("Total visits:    {}", snapshot.total);
            println!("Today:           {}", snapshot.today);
            println!("Online:          {}", snapshot.online);
            println!("Unique sessions: {}", snapshot.unique);
        }
        Commands::Recent { limit } => {
            let records = stats
                .recent(limit.clamp(1, VisitorConfig::MAX_RECENT_LIMIT))
                .await?;
            if records.is_empty() {
                println!("No visits recorded yet.");
            } else {
                println!(
                    "{:<20} {:<16} {:<24} {:>5}  {}",
                    "Last active", "IP", "Location", "Views", "Session"
                );
                println!("{}", "-".repeat(100));
                for r in records {
                    println!(
                        "{:<20} {:<16} {:<24} {:>5}  {}",
                        format_time(r.last_active),
                        r.ip_address,
                        format!("{}, {}", r.city, r.country),
                        r.page_views,
                        r.session_id
                    );
                }
            }
        }
        Commands::Settings { command } => match command {
            SettingsCommands::List => {
                let entries = storage.get_entries(KvTable::Settings).await?;
                if entries.is_empty() {
                    println!("No settings stored.");
                }
                for (key, value) in entries {
                    println!("{key} = {value}");
                }
            }
            SettingsCommands::Set { key, value } => {
                if key.trim().is_empty() {
                    anyhow::bail!("setting key must not be empty");
                }
                let entries = BTreeMap::from([(key.clone(), value)]);
                storage.upsert_entries(KvTable::Settings, &entries).await?;
                println!("✓ Stored setting '{key}'");
            }
        },
    }

    Ok(())
}
