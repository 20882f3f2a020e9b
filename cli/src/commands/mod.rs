pub mod config;
pub mod logs;
pub mod monitor;
pub mod status;
pub mod watch;

use std::future::Future;

use battery_bridge::{default_source, BatteryPlugin};
use color_eyre::eyre::Result;
use tokio::task::LocalSet;

use crate::config::{socket_path, UserConfig};

/// Runs `fut` on a single-threaded runtime; listeners and pumps are `!Send`.
pub fn block_on_local<F: Future>(fut: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(LocalSet::new().block_on(&runtime, fut))
}

pub fn plugin_for(config: &UserConfig) -> BatteryPlugin {
    BatteryPlugin::detect(
        config.backend,
        default_source,
        config.poll_interval(),
        &socket_path(),
    )
}
