use serde::{Deserialize, Serialize};

use crate::types::ListenerId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeRequest {
    GetBatteryInfo,
    AddBatteryListener,
    RemoveBatteryListener { id: ListenerId },
    GetStatus,
    Shutdown,
}

impl BridgeRequest {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
