use std::time::Duration;

use battery_bridge::{check_version_compatibility, MonitorClient};
use battery_bridge_protocol::MonitorStatus;
use color_eyre::eyre::{eyre, Result};

use super::block_on_local;
use crate::cli::MonitorCommands;
use crate::config::{socket_path, LogLevel, UserConfig};
use crate::logging::{self, LogMode};
use crate::monitor::{is_running, run_monitor};

pub fn run(
    command: MonitorCommands,
    config: &UserConfig,
    log_level_override: Option<LogLevel>,
) -> Result<()> {
    match command {
        MonitorCommands::Start { foreground } => start(foreground, config, log_level_override),
        MonitorCommands::Stop => stop(),
        MonitorCommands::Status => status(),
    }
}

fn start(foreground: bool, config: &UserConfig, log_level_override: Option<LogLevel>) -> Result<()> {
    if is_running() {
        println!("Monitor is already running.");
        return Ok(());
    }

    if foreground {
        let _guard = logging::init(config.log_level, LogMode::Both, log_level_override);
        println!("Starting monitor in foreground...");
        println!("Press Ctrl+C to stop.");
        return run_monitor(
            true,
            config.poll_interval(),
            config.log_level,
            log_level_override,
        )
        .map_err(|e| eyre!("{}", e));
    }

    println!("Starting monitor...");
    run_monitor(
        false,
        config.poll_interval(),
        config.log_level,
        log_level_override,
    )
    .map_err(|e| eyre!("{}", e))?;
    std::thread::sleep(Duration::from_millis(500));

    let mut started = false;
    for _ in 0..3 {
        if is_running() {
            started = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(200));
    }

    if started {
        println!("Monitor started.");
        println!("Socket: {:?}", socket_path());
    } else {
        println!("Monitor may have failed to start. Check logs:");
        println!("  battery-bridge logs");
    }
    Ok(())
}

fn stop() -> Result<()> {
    if !is_running() {
        println!("Monitor is not running.");
        return Ok(());
    }

    block_on_local(request_shutdown())?
    .map_err(|e| eyre!("Failed to stop monitor: {}", e))?;

    println!("Monitor stopped.");
    Ok(())
}

fn status() -> Result<()> {
    println!("Monitor Status");
    println!("{}", "-".repeat(40));

    if !is_running() {
        println!("Running:      no");
        return Ok(());
    }

    let status = block_on_local(query_status())?
    .map_err(|e| eyre!("Failed to query monitor: {}", e))?;

    println!("Running:      yes");
    println!("Version:      {}", status.version);
    println!("Protocol:     v{}", status.protocol_version);
    println!("Uptime:       {} seconds", status.uptime_secs);
    println!("Poll every:   {} ms", status.poll_interval_ms);
    println!("Listeners:    {}", status.listener_count);
    println!("Connections:  {}", status.connection_count);
    println!("Socket:       {:?}", socket_path());

    if let Err(e) = check_version_compatibility(&status) {
        println!();
        println!("Incompatible: {}", e);
    }

    Ok(())
}

/// Plain connect: an incompatible monitor must still be stoppable.
async fn request_shutdown() -> battery_bridge::Result<()> {
    let mut client = MonitorClient::connect(&socket_path()).await?;
    client.shutdown().await
}

async fn query_status() -> battery_bridge::Result<MonitorStatus> {
    let mut client = MonitorClient::connect(&socket_path()).await?;
    client.get_status().await
}
