//! Stand-in hardware bridge.
//!
//! Accepts print-bridge connections, logs every job frame it receives and
//! answers each with a status frame. Useful for trying the client without a
//! printer attached.
//!
//!   cargo run -p printbridge-mock-bridge -- --port 12212
//!   cargo run -p printbridge-cli -- labels INV-1 --packages 2

mod server;

use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mock-bridge", about = "Stand-in print bridge that logs jobs")]
struct Args {
    /// Port to listen on (loopback only).
    #[arg(long, default_value_t = 12212)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mock_bridge=info".parse()?))
        .init();

    let addr: SocketAddr = ([127, 0, 0, 1], args.port).into();

    tracing::info!("Mock print bridge on ws://{}/printer", addr);
    server::run(addr).await
}
