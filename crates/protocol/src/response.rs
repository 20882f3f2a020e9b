use serde::{Deserialize, Serialize};

use crate::event::BridgeEvent;
use crate::types::{BatteryStatus, ListenerHandle, MonitorStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BridgeResponse {
    BatteryInfo(BatteryStatus),
    ListenerAdded(ListenerHandle),
    ListenerRemoved,
    Status(MonitorStatus),
    Ok,
    Error(String),
    Event(BridgeEvent),
}

impl BridgeResponse {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Returns the event payload if this line is an unsolicited event.
    pub fn as_event(&self) -> Option<&BridgeEvent> {
        match self {
            BridgeResponse::Event(event) => Some(event),
            _ => None,
        }
    }
}
