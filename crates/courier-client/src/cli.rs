//! Command-line interface definition.

use std::path::PathBuf;

use clap::Parser;

/// courier - Interactive chat client
#[derive(Debug, Parser)]
#[command(name = "courier")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "COURIER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Address of the command service
    #[arg(long, env = "COURIER_SERVER")]
    pub server: Option<String>,

    /// Address of the notification broker
    #[arg(long, env = "COURIER_BROKER")]
    pub broker: Option<String>,
}
