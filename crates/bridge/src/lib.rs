//! Battery status for host applications.
//!
//! [`BatteryPlugin`] answers `get_battery_info` and manages battery change
//! listeners. It routes to one of two backends, chosen once when the plugin
//! is built:
//!
//! - **in-process**: reads the OS battery through a [`BatterySource`] and
//!   turns periodic reads into change events.
//! - **native**: talks to an out-of-process battery monitor over a Unix
//!   socket and relays its `batteryChanged` events.
//!
//! Either way, many listeners share a single underlying subscription, kept
//! by a [`ListenerRegistry`].
//!
//! Everything here is single-threaded. Listener registration spawns its
//! event pump with `tokio::task::spawn_local`, so the plugin must be driven
//! from inside a [`tokio::task::LocalSet`].
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use battery_bridge::{BatteryPlugin, default_source};
//!
//! let local = tokio::task::LocalSet::new();
//! local.run_until(async {
//!     let mut plugin = BatteryPlugin::in_process(default_source(), Duration::from_secs(1));
//!     println!("{:?}", plugin.get_battery_info().await?);
//!
//!     let handle = plugin
//!         .add_battery_listener(|status| println!("changed: {}%", status.level))
//!         .await;
//!     plugin.remove_battery_listener(handle.id()).await;
//!     Ok::<_, battery_bridge::BridgeError>(())
//! }).await?;
//! ```

mod error;
mod events;
#[cfg(unix)]
mod native;
mod normalizer;
mod plugin;
mod poller;
mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use battery_bridge_platform::{BatteryReading, BatterySource, ChargeState, NoBattery};
pub use battery_bridge_protocol::{
    BatteryStatus, ListenerHandle, ListenerId, StatusKind, BATTERY_CHANGED,
};
pub use error::{BridgeError, Result, VersionMismatchError, VersionMismatchKind};
pub use events::{EventSource, StatusStream};
#[cfg(unix)]
pub use native::{check_version_compatibility, is_monitor_running, MonitorClient, NativeEvents};
pub use normalizer::{default_source, normalize, SharedSource, StatusNormalizer};
pub use plugin::{BackendPreference, BatteryPlugin, Platform};
pub use poller::{PollingEvents, MIN_POLL_INTERVAL};
pub use registry::ListenerRegistry;
