use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum MonitorCommands {
    /// Start the battery monitor
    Start {
        /// Stay attached to the terminal instead of daemonizing
        #[arg(short, long)]
        foreground: bool,
    },

    Stop,

    Status,
}
