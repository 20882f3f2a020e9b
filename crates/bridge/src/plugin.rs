use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use battery_bridge_protocol::{BatteryStatus, ListenerHandle, ListenerId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
#[cfg(unix)]
use crate::native::{MonitorClient, NativeEvents};
use crate::normalizer::{SharedSource, StatusNormalizer};
use crate::poller::PollingEvents;
use crate::registry::ListenerRegistry;

/// Which backend the host asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendPreference {
    /// Native monitor if one is running, in-process otherwise.
    #[default]
    Auto,
    Native,
    InProcess,
}

impl BackendPreference {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "auto" => Some(BackendPreference::Auto),
            "native" => Some(BackendPreference::Native),
            "in_process" | "inprocess" | "local" => Some(BackendPreference::InProcess),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BackendPreference::Auto => "auto",
            BackendPreference::Native => "native",
            BackendPreference::InProcess => "in_process",
        }
    }
}

/// The backend a plugin actually routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    InProcess,
    Native,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::InProcess => f.write_str("in-process"),
            Platform::Native => f.write_str("native"),
        }
    }
}

enum Backend {
    InProcess {
        normalizer: StatusNormalizer,
        registry: ListenerRegistry<PollingEvents>,
    },
    #[cfg(unix)]
    Native {
        socket: PathBuf,
        registry: ListenerRegistry<NativeEvents>,
    },
}

#[cfg(unix)]
fn monitor_answers(socket: &Path) -> bool {
    crate::native::is_monitor_running(socket)
}

#[cfg(not(unix))]
fn monitor_answers(_socket: &Path) -> bool {
    false
}

/// Host-facing battery API.
///
/// Build one at startup and pass it to whatever needs battery status.
pub struct BatteryPlugin {
    backend: Backend,
}

impl BatteryPlugin {
    /// Reads the battery in this process, polling for changes every `poll_interval`.
    pub fn in_process(source: SharedSource, poll_interval: Duration) -> Self {
        let normalizer = StatusNormalizer::new(source);
        let events = PollingEvents::new(normalizer.clone(), poll_interval);
        Self {
            backend: Backend::InProcess {
                normalizer,
                registry: ListenerRegistry::new(events),
            },
        }
    }

    /// Routes everything to the battery monitor listening on `socket`.
    #[cfg(unix)]
    pub fn native(socket: impl Into<PathBuf>) -> Self {
        let socket = socket.into();
        Self {
            backend: Backend::Native {
                registry: ListenerRegistry::new(NativeEvents::new(socket.clone())),
                socket,
            },
        }
    }

    /// Picks the backend once, from the preference and what is running.
    pub fn detect(
        preference: BackendPreference,
        source: impl FnOnce() -> SharedSource,
        poll_interval: Duration,
        socket: &Path,
    ) -> Self {
        let platform = match preference {
            BackendPreference::Native => Platform::Native,
            BackendPreference::InProcess => Platform::InProcess,
            BackendPreference::Auto if monitor_answers(socket) => Platform::Native,
            BackendPreference::Auto => Platform::InProcess,
        };

        let plugin = match platform {
            #[cfg(unix)]
            Platform::Native => Self::native(socket),
            #[cfg(not(unix))]
            Platform::Native => {
                tracing::warn!("Native monitor requires Unix sockets, using in-process backend");
                Self::in_process(source(), poll_interval)
            }
            Platform::InProcess => Self::in_process(source(), poll_interval),
        };

        info!(
            preference = preference.label(),
            platform = %plugin.platform(),
            "Battery backend selected"
        );
        plugin
    }

    pub fn platform(&self) -> Platform {
        match &self.backend {
            Backend::InProcess { .. } => Platform::InProcess,
            #[cfg(unix)]
            Backend::Native { .. } => Platform::Native,
        }
    }

    /// Current battery status.
    ///
    /// In-process this never fails. Native reports transport failures and an
    /// incompatible monitor protocol.
    pub async fn get_battery_info(&self) -> Result<BatteryStatus> {
        match &self.backend {
            Backend::InProcess { normalizer, .. } => Ok(normalizer.query()),
            #[cfg(unix)]
            Backend::Native { socket, .. } => {
                MonitorClient::connect_with_version_check(socket)
                    .await?
                    .get_battery_info()
                    .await
            }
        }
    }

    /// Registers `callback` for every battery change.
    pub async fn add_battery_listener<F>(&mut self, callback: F) -> ListenerHandle
    where
        F: Fn(BatteryStatus) + 'static,
    {
        let id = match &mut self.backend {
            Backend::InProcess { registry, .. } => registry.subscribe(callback).await,
            #[cfg(unix)]
            Backend::Native { registry, .. } => registry.subscribe(callback).await,
        };
        ListenerHandle::new(id)
    }

    /// Removes a listener. Unknown ids are ignored.
    pub async fn remove_battery_listener(&mut self, id: &ListenerId) {
        debug!(id = %id, "Removing battery listener");
        match &mut self.backend {
            Backend::InProcess { registry, .. } => registry.unsubscribe(id).await,
            #[cfg(unix)]
            Backend::Native { registry, .. } => registry.unsubscribe(id).await,
        }
    }

    pub fn listener_count(&self) -> usize {
        match &self.backend {
            Backend::InProcess { registry, .. } => registry.listener_count(),
            #[cfg(unix)]
            Backend::Native { registry, .. } => registry.listener_count(),
        }
    }

    /// Whether the underlying platform subscription is currently open.
    pub fn is_listening(&self) -> bool {
        match &self.backend {
            Backend::InProcess { registry, .. } => registry.is_listening(),
            #[cfg(unix)]
            Backend::Native { registry, .. } => registry.is_listening(),
        }
    }
}
