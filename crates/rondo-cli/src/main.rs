use anyhow::Context;
use clap::{Parser, Subcommand};

use rondo_backend::{BackendConfig, NewSchedule, ScheduleUpdate, SqlBackend};

#[derive(Parser)]
#[command(name = "rondo", about = "Schedule store administration CLI")]
struct Cli {
    /// Path to the SQLite database file
    #[arg(long, default_value = "rondo.db")]
    db: String,

    /// Schedule table name
    #[arg(long, default_value = "schedules")]
    table: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all schedules ordered by claim deadline
    List,
    /// Show one schedule by key
    Show {
        /// Schedule key
        key: String,
    },
    /// Create a new schedule
    Submit {
        /// Schedule key
        key: String,

        /// Job kind tag
        #[arg(short, long)]
        kind: String,

        /// Cron expression (omit for a one-shot schedule)
        #[arg(short, long)]
        cron: Option<String>,

        /// Seconds added after each computed occurrence
        #[arg(short, long, default_value_t = 0)]
        delay: i64,

        /// Timezone for cron evaluation
        #[arg(short, long, default_value = "UTC")]
        timezone: String,

        /// JSON object payload
        #[arg(long, default_value = "{}")]
        data: String,

        /// First occurrence time, epoch seconds (defaults to now)
        #[arg(long)]
        next_time: Option<i64>,
    },
    /// Delete a schedule by key
    Delete {
        /// Schedule key
        key: String,
    },
    /// Update cron/delay/timezone of a schedule
    Modify {
        /// Schedule key
        key: String,

        /// New cron expression
        #[arg(short, long)]
        cron: Option<String>,

        /// New delay in seconds
        #[arg(short, long)]
        delay: Option<i64>,

        /// New timezone
        #[arg(short, long)]
        timezone: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let backend = SqlBackend::open(&BackendConfig::new(&cli.db, &cli.table))?;

    match cli.command {
        Commands::List => {
            backend.list(|sched| {
                let a = &sched.attributes;
                println!(
                    "{:<24} kind={} cron={} next_time={} next_run_time={}",
                    sched.key,
                    a.kind,
                    a.cron.as_deref().unwrap_or("-"),
                    a.next_time,
                    a.next_run_time,
                );
            })?;
        }
        Commands::Show { key } => {
            let meta = backend.get_metadata(&key)?;
            println!("{}", serde_json::to_string_pretty(&meta)?);
        }
        Commands::Submit {
            key,
            kind,
            cron,
            delay,
            timezone,
            data,
            next_time,
        } => {
            let data = serde_json::from_str(&data).context("--data must be a JSON object")?;
            let next_time = next_time.unwrap_or_else(|| chrono::Utc::now().timestamp());
            let sched = backend.submit(&NewSchedule {
                key,
                kind,
                cron,
                delay,
                timezone,
                data,
                next_time,
                next_run_time: next_time,
            })?;
            println!("submitted schedule key={}", sched.key);
        }
        Commands::Delete { key } => {
            backend.delete(&key)?;
            println!("deleted schedule key={key}");
        }
        Commands::Modify {
            key,
            cron,
            delay,
            timezone,
        } => {
            backend.modify(
                &key,
                &ScheduleUpdate {
                    cron,
                    delay,
                    timezone,
                },
            )?;
            println!("modified schedule key={key}");
        }
    }

    Ok(())
}
