use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMismatchError {
    pub host_protocol_version: u32,
    pub host_min_supported: u32,
    pub monitor_protocol_version: u32,
    pub monitor_min_supported: u32,
    pub monitor_binary_version: String,
    pub kind: VersionMismatchKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionMismatchKind {
    HostTooOld,
    MonitorTooOld,
}

impl fmt::Display for VersionMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            VersionMismatchKind::HostTooOld => write!(
                f,
                "Protocol version mismatch: host uses protocol v{}, but monitor (v{}) requires v{}+",
                self.host_protocol_version, self.monitor_binary_version, self.monitor_min_supported
            ),
            VersionMismatchKind::MonitorTooOld => write!(
                f,
                "Protocol version mismatch: monitor (v{}) uses protocol v{}, but this host requires v{}+. \
                Restart it with `battery-bridge monitor stop` and `battery-bridge monitor start`",
                self.monitor_binary_version, self.monitor_protocol_version, self.host_min_supported
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Monitor error: {0}")]
    Monitor(String),

    #[error("Battery API unavailable ({0} source)")]
    Unavailable(&'static str),

    #[error("{0}")]
    VersionMismatch(VersionMismatchError),
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::Protocol(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
