//! `printbridge` command-line tool.
//!
//! Sends print jobs to a local hardware bridge and applies batch state
//! transitions to invoices.
//!
//!   printbridge print invoice.pdf
//!   printbridge labels ACC-SINV-2025-00042 --packages 3
//!   printbridge batch deliver ACC-SINV-2025-00042 ACC-SINV-2025-00043 --print
//!   printbridge watch

mod commands;
mod render;
mod settings;

use clap::{Parser, Subcommand};
use printbridge_core::Action;
use settings::Settings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "printbridge", version, about)]
struct Cli {
    /// Settings file (defaults to ./printbridge.toml when present).
    #[arg(long, global = true, env = "PRINTBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Bridge address, overriding the settings file.
    #[arg(long, global = true, env = "PRINTBRIDGE_ENDPOINT")]
    endpoint: Option<String>,

    /// Seconds to wait for the bridge before giving up on a print.
    #[arg(long, global = true, default_value_t = 10)]
    wait: u64,

    /// Log debug output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a rendered PDF.
    Print {
        file: PathBuf,
        /// Bridge printer queue (defaults to the invoice printer).
        #[arg(long)]
        kind: Option<String>,
    },
    /// Print one ZPL package label per parcel.
    Labels {
        invoice: String,
        #[arg(long, default_value_t = 1)]
        packages: u32,
        /// Bridge printer queue (defaults to the label printer).
        #[arg(long)]
        kind: Option<String>,
    },
    /// Apply one action to each listed invoice, in order.
    Batch {
        action: Action,
        invoices: Vec<String>,
        /// After a delivery batch, print every delivered invoice.
        #[arg(long)]
        print: bool,
    },
    /// Stay connected and log what the bridge sends.
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(format!("printbridge={default_level}").parse()?),
        )
        .init();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(endpoint) = cli.endpoint {
        settings.bridge.endpoint = endpoint;
    }
    let ctx = commands::Context::new(settings, cli.wait);

    match cli.command {
        Command::Print { file, kind } => commands::print(&ctx, &file, kind).await,
        Command::Labels {
            invoice,
            packages,
            kind,
        } => commands::labels(&ctx, &invoice, packages, kind).await,
        Command::Batch {
            action,
            invoices,
            print,
        } => commands::batch(&ctx, action, invoices, print).await,
        Command::Watch => commands::watch(&ctx).await,
    }
}
