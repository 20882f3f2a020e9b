//! Wire types shared by the battery-bridge facade and the native monitor.

mod event;
mod request;
mod response;
mod types;
mod version;

pub use event::{BridgeEvent, BATTERY_CHANGED};
pub use request::BridgeRequest;
pub use response::BridgeResponse;
pub use types::{
    BatteryStatus, ListenerHandle, ListenerId, MonitorStatus, StatusKind, FULL_LEVEL,
    LOW_BATTERY_THRESHOLD, MAX_LISTENERS,
};
pub use version::{MIN_SUPPORTED_VERSION, PROTOCOL_VERSION};
