use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod utils;

#[derive(Parser)]
#[command(name = "fanrun-cmd")]
#[command(about = "Command-line driver for the fanrun task runner")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Notify every person concurrently and wait until all notifications are sent
    Notify {
        /// JSON file with an array of {"name": ..., "age": ...} entries
        #[arg(long)]
        people: Option<String>,

        /// JSON file with runner options
        #[arg(long)]
        options: Option<String>,

        /// Simulated latency of one notification, in milliseconds
        #[arg(long, default_value_t = 500)]
        delay_ms: u64,

        /// Cap on concurrently running notifications (overrides the options file)
        #[arg(long)]
        max_workers: Option<usize>,
    },

    /// Drain a worker that emits a fixed number of messages and then closes
    Stream {
        /// Number of messages the worker emits
        #[arg(long, default_value_t = 3)]
        count: usize,

        /// Pause before each message, in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new("error"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Notify {
            people,
            options,
            delay_ms,
            max_workers,
        } => commands::notify::run(people, options, delay_ms, max_workers),
        Commands::Stream { count, interval_ms } => commands::stream::run(count, interval_ms),
    }
}
