use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use peerhop_relay_server::{build_router, run_expiry_sweep, RelayState};

#[derive(Parser, Debug)]
#[command(name = "peerhop-relay-server", version, about = "peerhop relay/rendezvous arbiter")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Set log level: error,warn,info,debug,trace
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    fmt().with_env_filter(EnvFilter::new(&cli.log_level)).init();

    let state = Arc::new(RelayState::new());
    tokio::spawn(run_expiry_sweep(state.clone()));

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cli.port)).await?;
    info!("peerhop relay listening on port {}", cli.port);
    axum::serve(listener, app).await?;

    Ok(())
}
