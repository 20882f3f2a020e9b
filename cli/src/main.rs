mod cli;
mod commands;
mod config;
mod logging;
mod monitor;

use clap::Parser;
use color_eyre::eyre::Result;

use cli::{Cli, Commands};
use config::{LogLevel, UserConfig};
use logging::LogMode;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let mut config = UserConfig::load();
    config.merge_with_args(cli.backend.as_deref());
    let log_level_override = cli.log_level.as_deref().and_then(LogLevel::parse);

    match cli.command {
        Commands::Status { json } => {
            let _guard = logging::init(config.log_level, LogMode::Stderr, log_level_override);
            commands::status::run(&config, json)
        }
        Commands::Watch { count, compact } => {
            let _guard = logging::init(config.log_level, LogMode::Stderr, log_level_override);
            commands::watch::run(&config, count, compact)
        }
        Commands::Monitor { command } => {
            commands::monitor::run(command, &config, log_level_override)
        }
        Commands::Config { path, reset } => {
            let _guard = logging::init(config.log_level, LogMode::Stderr, log_level_override);
            commands::config::run(path, reset)
        }
        Commands::Logs { lines, follow } => commands::logs::run(lines, follow),
    }
}
