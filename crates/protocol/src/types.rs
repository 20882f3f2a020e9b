use std::fmt;

use serde::{Deserialize, Serialize};

use crate::version::{MIN_SUPPORTED_VERSION, PROTOCOL_VERSION};

/// Levels strictly below this are reported as low battery.
pub const LOW_BATTERY_THRESHOLD: u8 = 20;

/// A charging battery at or above this level is reported as full.
pub const FULL_LEVEL: u8 = 100;

/// Upper bound on listener registrations a single monitor accepts.
pub const MAX_LISTENERS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Charging,
    Discharging,
    Full,
    NotCharging,
    #[default]
    Unknown,
}

impl StatusKind {
    /// The wire name, as used in the `status` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Charging => "charging",
            StatusKind::Discharging => "discharging",
            StatusKind::Full => "full",
            StatusKind::NotCharging => "not_charging",
            StatusKind::Unknown => "unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusKind::Charging => "Charging",
            StatusKind::Discharging => "On Battery",
            StatusKind::Full => "Full",
            StatusKind::NotCharging => "Not Charging",
            StatusKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable battery status snapshot.
///
/// Built fresh for every query and every change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryStatus {
    pub level: u8,
    pub is_charging: bool,
    pub is_low_battery: bool,
    pub status: StatusKind,
}

impl BatteryStatus {
    /// Derives a status from a level and a charging flag.
    ///
    /// Charging reports `full` at [`FULL_LEVEL`] and `charging` below it;
    /// anything not charging is `discharging`. Levels above 100 are clamped.
    pub fn derive(level: u8, is_charging: bool) -> Self {
        let level = level.min(FULL_LEVEL);
        let status = if is_charging {
            if level >= FULL_LEVEL {
                StatusKind::Full
            } else {
                StatusKind::Charging
            }
        } else {
            StatusKind::Discharging
        };

        Self {
            level,
            is_charging,
            is_low_battery: level < LOW_BATTERY_THRESHOLD,
            status,
        }
    }

    /// Builds a status from an OS-reported state, as the native monitor does.
    ///
    /// Unlike [`BatteryStatus::derive`], this keeps `full`, `not_charging`
    /// and `unknown` when the OS reports them.
    pub fn from_kind(level: u8, kind: StatusKind) -> Self {
        let level = level.min(FULL_LEVEL);
        let status = match kind {
            StatusKind::Charging if level >= FULL_LEVEL => StatusKind::Full,
            other => other,
        };

        Self {
            level,
            is_charging: matches!(kind, StatusKind::Charging | StatusKind::Full),
            is_low_battery: level < LOW_BATTERY_THRESHOLD,
            status,
        }
    }

    /// The record reported when no battery API is available at all.
    pub fn unavailable() -> Self {
        Self {
            level: FULL_LEVEL,
            is_charging: false,
            is_low_battery: false,
            status: StatusKind::Unknown,
        }
    }
}

impl Default for BatteryStatus {
    fn default() -> Self {
        Self::unavailable()
    }
}

/// Opaque handle identifying one registered listener.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(String);

impl ListenerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ListenerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ListenerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Registration response, shaped `{ "value": "<id>" }` on every backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerHandle {
    pub value: ListenerId,
}

impl ListenerHandle {
    pub fn new(value: ListenerId) -> Self {
        Self { value }
    }

    pub fn id(&self) -> &ListenerId {
        &self.value
    }

    pub fn into_id(self) -> ListenerId {
        self.value
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub running: bool,
    pub version: String,
    pub uptime_secs: u64,
    pub listener_count: usize,
    pub connection_count: usize,
    pub poll_interval_ms: u64,
    pub protocol_version: u32,
    pub min_supported_version: u32,
}

impl Default for MonitorStatus {
    fn default() -> Self {
        Self {
            running: false,
            version: String::new(),
            uptime_secs: 0,
            listener_count: 0,
            connection_count: 0,
            poll_interval_ms: 0,
            protocol_version: PROTOCOL_VERSION,
            min_supported_version: MIN_SUPPORTED_VERSION,
        }
    }
}
