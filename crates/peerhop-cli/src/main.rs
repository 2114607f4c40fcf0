use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;
mod receive;
mod secret;
mod send;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    fmt().with_env_filter(EnvFilter::new(&cli.log_level)).init();

    let transfer = async move {
        match cli.cmd {
            Command::Send(args) => send::run(args).await,
            Command::Receive(args) => receive::run(args).await,
        }
    };

    tokio::select! {
        result = transfer => result,
        _ = tokio::signal::ctrl_c() => {
            println!("Cancelled.");
            Ok(())
        }
    }
}
