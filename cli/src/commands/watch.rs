use battery_bridge::BatteryStatus;
use color_eyre::eyre::Result;
use tokio::sync::mpsc;
use tracing::debug;

use super::{block_on_local, plugin_for};
use crate::config::UserConfig;

pub fn run(config: &UserConfig, count: u32, compact: bool) -> Result<()> {
    let mut plugin = plugin_for(config);
    eprintln!(
        "Watching battery changes ({} backend). Press Ctrl+C to stop.",
        plugin.platform()
    );

    block_on_local(async move {
        let (tx, mut rx) = mpsc::unbounded_channel::<BatteryStatus>();
        let handle = plugin
            .add_battery_listener(move |status| {
                let _ = tx.send(status);
            })
            .await;
        debug!(id = %handle.id(), "Watching");

        let mut seen = 0u32;
        let result = loop {
            tokio::select! {
                received = rx.recv() => {
                    let Some(status) = received else {
                        break Ok(());
                    };
                    if let Err(e) = print_event(&status, compact) {
                        break Err(e);
                    }
                    seen += 1;
                    if count > 0 && seen >= count {
                        break Ok(());
                    }
                }
                _ = tokio::signal::ctrl_c() => break Ok(()),
            }
        };

        plugin.remove_battery_listener(handle.id()).await;
        result
    })?
}

fn print_event(status: &BatteryStatus, compact: bool) -> Result<()> {
    let doc = serde_json::json!({
        "event": battery_bridge::BATTERY_CHANGED,
        "data": status,
    });

    if compact {
        println!("{}", serde_json::to_string(&doc)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&doc)?);
    }
    Ok(())
}
