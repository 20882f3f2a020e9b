mod monitor;

pub use monitor::MonitorCommands;

use clap::{Parser, Subcommand};

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the current battery status
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Stream battery change events as JSON lines
    #[command(alias = "listen")]
    Watch {
        /// Stop after this many events (0 = until interrupted)
        #[arg(short = 'n', long, default_value_t = 0)]
        count: u32,

        #[arg(short, long)]
        compact: bool,
    },

    Monitor {
        #[command(subcommand)]
        command: MonitorCommands,
    },

    Config {
        #[arg(long)]
        path: bool,

        #[arg(long)]
        reset: bool,
    },

    Logs {
        #[arg(short, long, default_value_t = 50)]
        lines: usize,

        #[arg(short, long)]
        follow: bool,
    },
}

#[derive(Debug, Parser)]
#[command(name = "battery-bridge", version, verbatim_doc_comment)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Backend to use: auto, native or in_process
    #[arg(long, global = true)]
    pub backend: Option<String>,
}
