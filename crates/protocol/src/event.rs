use serde::{Deserialize, Serialize};

use crate::types::BatteryStatus;

/// Name of the event raised whenever the OS reports a level or charging change.
pub const BATTERY_CHANGED: &str = "batteryChanged";

/// Events pushed by the monitor to registered connections.
///
/// Serialized as `{"event":"batteryChanged","data":{...}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum BridgeEvent {
    BatteryChanged(BatteryStatus),
}

impl BridgeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BridgeEvent::BatteryChanged(_) => BATTERY_CHANGED,
        }
    }

    pub fn status(&self) -> BatteryStatus {
        match self {
            BridgeEvent::BatteryChanged(status) => *status,
        }
    }
}
