//! CLI definitions for botwire.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// botwire CLI.
#[derive(Parser)]
#[command(name = "botwire")]
#[command(about = "WebSocket driver for JSON bot protocols")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "config/botwire.toml",
        env = "BOTWIRE_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Server URL, overriding the config file
    #[arg(long, global = true)]
    pub url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Connect and serve until interrupted (default)
    Run,

    /// Load and validate the configuration
    Check,

    /// Print the ws+unix:// address of a Unix socket
    SocketUrl {
        /// Socket path
        path: PathBuf,

        /// WebSocket path requested on the socket
        #[arg(long, default_value = "/")]
        ws_path: String,
    },
}
