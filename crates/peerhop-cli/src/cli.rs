use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "peerhop", version, about = "Encrypted peer-to-peer file and message transfer")]
pub struct Cli {
    /// Set log level: error,warn,info,debug,trace
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a file or message to a receiver
    #[command(alias = "s")]
    Send(SendArgs),

    /// Receive a file or message from a sender
    #[command(alias = "r")]
    Receive(ReceiveArgs),
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Port to use for LAN discovery and transfer
    #[arg(short, long, default_value_t = 65432)]
    pub port: u16,

    /// Relay server base address (host:port); enables relay mode instead of LAN discovery
    #[arg(short, long)]
    pub web: Option<String>,

    /// Use ws:// instead of wss:// when dialing the relay server
    #[arg(long)]
    pub insecure_ws: bool,

    /// File to send
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Message to send
    #[arg(short, long)]
    pub message: Option<String>,

    /// Enter the share code manually instead of generating one
    #[arg(short, long)]
    pub code: bool,
}

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    /// Port to use for LAN discovery and transfer
    #[arg(short, long, default_value_t = 65432)]
    pub port: u16,

    /// Relay server base address (host:port); enables relay mode instead of LAN discovery
    #[arg(short, long)]
    pub web: Option<String>,

    /// Use ws:// instead of wss:// when dialing the relay server
    #[arg(long)]
    pub insecure_ws: bool,

    /// File to write the received data to; prints to stdout if omitted
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Share code provided by the sender. Prompted for if omitted
    #[arg(short, long)]
    pub code: Option<String>,
}
