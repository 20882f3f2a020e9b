use std::path::{Path, PathBuf};

use battery_bridge_protocol::{
    BatteryStatus, BridgeRequest, BridgeResponse, ListenerHandle, ListenerId, MonitorStatus,
    MIN_SUPPORTED_VERSION, PROTOCOL_VERSION,
};
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tracing::{debug, info, trace, warn};

use crate::error::{BridgeError, Result, VersionMismatchError, VersionMismatchKind};
use crate::events::{EventSource, StatusStream};

/// Checks that this host and the monitor speak compatible protocol versions.
pub fn check_version_compatibility(status: &MonitorStatus) -> Result<()> {
    let mismatch = |kind| {
        BridgeError::VersionMismatch(VersionMismatchError {
            host_protocol_version: PROTOCOL_VERSION,
            host_min_supported: MIN_SUPPORTED_VERSION,
            monitor_protocol_version: status.protocol_version,
            monitor_min_supported: status.min_supported_version,
            monitor_binary_version: status.version.clone(),
            kind,
        })
    };

    if PROTOCOL_VERSION < status.min_supported_version {
        return Err(mismatch(VersionMismatchKind::HostTooOld));
    }
    if status.protocol_version < MIN_SUPPORTED_VERSION {
        return Err(mismatch(VersionMismatchKind::MonitorTooOld));
    }
    Ok(())
}

/// True if something accepts connections on the monitor socket.
pub fn is_monitor_running(socket: &Path) -> bool {
    std::os::unix::net::UnixStream::connect(socket).is_ok()
}

/// One connection to the battery monitor.
///
/// Requests and responses are JSON lines. Event lines arriving while a
/// request is outstanding are skipped.
pub struct MonitorClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl MonitorClient {
    pub async fn connect(socket: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
        })
    }

    /// Connects and validates protocol compatibility before returning.
    pub async fn connect_with_version_check(socket: &Path) -> Result<Self> {
        let mut client = Self::connect(socket).await?;
        let status = client.get_status().await?;
        check_version_compatibility(&status)?;
        Ok(client)
    }

    async fn send(&mut self, request: &BridgeRequest) -> Result<()> {
        let json = request.to_json()?;
        self.writer.write_all(format!("{}\n", json).as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn read_response(&mut self) -> Result<BridgeResponse> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Err(BridgeError::Protocol("Connection closed".into()));
            }
            match BridgeResponse::from_json(line.trim())? {
                BridgeResponse::Event(event) => {
                    trace!(event = event.name(), "Skipping event while awaiting response");
                }
                response => return Ok(response),
            }
        }
    }

    async fn request(&mut self, request: BridgeRequest) -> Result<BridgeResponse> {
        self.send(&request).await?;
        let response = self.read_response().await?;
        debug!(request = ?request, "Monitor responded");
        Ok(response)
    }

    pub async fn get_battery_info(&mut self) -> Result<BatteryStatus> {
        match self.request(BridgeRequest::GetBatteryInfo).await? {
            BridgeResponse::BatteryInfo(status) => Ok(status),
            BridgeResponse::Error(e) => Err(BridgeError::Monitor(e)),
            _ => Err(BridgeError::Protocol("Unexpected response".into())),
        }
    }

    pub async fn add_battery_listener(&mut self) -> Result<ListenerHandle> {
        match self.request(BridgeRequest::AddBatteryListener).await? {
            BridgeResponse::ListenerAdded(handle) => Ok(handle),
            BridgeResponse::Error(e) => Err(BridgeError::Monitor(e)),
            _ => Err(BridgeError::Protocol("Unexpected response".into())),
        }
    }

    pub async fn remove_battery_listener(&mut self, id: &ListenerId) -> Result<()> {
        match self
            .request(BridgeRequest::RemoveBatteryListener { id: id.clone() })
            .await?
        {
            BridgeResponse::ListenerRemoved => Ok(()),
            BridgeResponse::Error(e) => Err(BridgeError::Monitor(e)),
            _ => Err(BridgeError::Protocol("Unexpected response".into())),
        }
    }

    pub async fn get_status(&mut self) -> Result<MonitorStatus> {
        match self.request(BridgeRequest::GetStatus).await? {
            BridgeResponse::Status(status) => Ok(status),
            BridgeResponse::Error(e) => Err(BridgeError::Monitor(e)),
            _ => Err(BridgeError::Protocol("Unexpected response".into())),
        }
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        match self.request(BridgeRequest::Shutdown).await? {
            BridgeResponse::Ok => Ok(()),
            BridgeResponse::Error(e) => Err(BridgeError::Monitor(e)),
            _ => Err(BridgeError::Protocol("Unexpected response".into())),
        }
    }

    /// Turns the read side into a stream of `batteryChanged` payloads.
    ///
    /// The write side is handed back so the registration can be removed later.
    fn into_events(self) -> (StatusStream, OwnedWriteHalf) {
        let stream = futures::stream::unfold(self.reader, |mut reader| async move {
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => return None,
                    Ok(_) => match BridgeResponse::from_json(line.trim()) {
                        Ok(BridgeResponse::Event(event)) => return Some((event.status(), reader)),
                        Ok(other) => {
                            trace!(response = ?other, "Ignoring response on event connection");
                        }
                        Err(e) => {
                            warn!(error = %e, "Invalid line from battery monitor");
                        }
                    },
                    Err(e) => {
                        debug!(error = %e, "Battery monitor event connection failed");
                        return None;
                    }
                }
            }
        });

        (stream.boxed_local(), self.writer)
    }
}

/// Platform subscription backed by the monitor's `batteryChanged` events.
///
/// Each open subscription holds its own connection and a single
/// registration on the monitor.
pub struct NativeEvents {
    socket: PathBuf,
    registration: Option<(ListenerId, OwnedWriteHalf)>,
}

impl NativeEvents {
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: socket.into(),
            registration: None,
        }
    }
}

impl EventSource for NativeEvents {
    async fn open(&mut self) -> Result<StatusStream> {
        let mut client = MonitorClient::connect_with_version_check(&self.socket).await?;
        let handle = client.add_battery_listener().await?;
        info!(remote_id = %handle.value, "Registered with battery monitor");

        let (stream, writer) = client.into_events();
        self.registration = Some((handle.into_id(), writer));
        Ok(stream)
    }

    async fn close(&mut self) -> Result<()> {
        let Some((id, mut writer)) = self.registration.take() else {
            return Ok(());
        };

        let json = BridgeRequest::RemoveBatteryListener { id }.to_json()?;
        writer.write_all(format!("{}\n", json).as_bytes()).await?;
        writer.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use battery_bridge_protocol::{BridgeEvent, StatusKind};
    use tokio::net::UnixListener;
    use tokio::task::LocalSet;

    static SOCKET_SEQ: AtomicU32 = AtomicU32::new(0);

    pub(crate) fn temp_socket(name: &str) -> PathBuf {
        let seq = SOCKET_SEQ.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "bb-{}-{}-{}.sock",
            name,
            std::process::id(),
            seq
        ));
        let _ = std::fs::remove_file(&path);
        path
    }

    /// A minimal monitor: answers with a fixed status and pushes it as an
    /// event right after acknowledging a registration.
    pub(crate) struct FakeMonitor {
        pub requests: Rc<RefCell<Vec<BridgeRequest>>>,
    }

    impl FakeMonitor {
        pub(crate) fn spawn(socket: &Path, status: BatteryStatus) -> Self {
            let reports = MonitorStatus {
                running: true,
                version: "test".into(),
                ..MonitorStatus::default()
            };
            Self::spawn_reporting(socket, status, reports)
        }

        /// Like [`FakeMonitor::spawn`], answering `GetStatus` with `reports`.
        pub(crate) fn spawn_reporting(
            socket: &Path,
            status: BatteryStatus,
            reports: MonitorStatus,
        ) -> Self {
            let listener = UnixListener::bind(socket).unwrap();
            let requests = Rc::new(RefCell::new(Vec::new()));
            let seen = Rc::clone(&requests);

            tokio::task::spawn_local(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let seen = Rc::clone(&seen);
                    tokio::task::spawn_local(serve(stream, status, reports.clone(), seen));
                }
            });

            Self { requests }
        }
    }

    async fn serve(
        stream: UnixStream,
        status: BatteryStatus,
        reports: MonitorStatus,
        seen: Rc<RefCell<Vec<BridgeRequest>>>,
    ) {
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            let request = BridgeRequest::from_json(&line).unwrap();
            seen.borrow_mut().push(request.clone());

            let mut replies = vec![];
            match request {
                BridgeRequest::GetBatteryInfo => replies.push(BridgeResponse::BatteryInfo(status)),
                BridgeRequest::AddBatteryListener => {
                    replies.push(BridgeResponse::ListenerAdded(ListenerHandle::new(
                        ListenerId::new("battery_listener_1"),
                    )));
                    replies.push(BridgeResponse::Event(BridgeEvent::BatteryChanged(status)));
                }
                BridgeRequest::RemoveBatteryListener { .. } => {
                    replies.push(BridgeResponse::ListenerRemoved)
                }
                BridgeRequest::GetStatus => replies.push(BridgeResponse::Status(reports.clone())),
                BridgeRequest::Shutdown => replies.push(BridgeResponse::Ok),
            }

            for reply in replies {
                let line = format!("{}\n", reply.to_json().unwrap());
                if writer.write_all(line.as_bytes()).await.is_err() {
                    return;
                }
            }
        }
    }

    fn status(level: u8, max: u32, min: u32) -> MonitorStatus {
        MonitorStatus {
            running: true,
            version: format!("0.{}.0", level),
            protocol_version: max,
            min_supported_version: min,
            ..MonitorStatus::default()
        }
    }

    #[test]
    fn test_version_compatible_same_version() {
        assert!(
            check_version_compatibility(&status(1, PROTOCOL_VERSION, MIN_SUPPORTED_VERSION))
                .is_ok()
        );
    }

    #[test]
    fn test_version_host_too_old() {
        let result = check_version_compatibility(&status(9, 9, PROTOCOL_VERSION + 1));
        match result {
            Err(BridgeError::VersionMismatch(e)) => {
                assert_eq!(e.kind, VersionMismatchKind::HostTooOld);
                assert!(e.to_string().contains("requires v2+"));
            }
            other => panic!("Expected VersionMismatch error, got {:?}", other),
        }
    }

    #[test]
    fn test_version_monitor_too_old() {
        let result = check_version_compatibility(&status(0, 0, 0));
        match result {
            Err(BridgeError::VersionMismatch(e)) => {
                assert_eq!(e.kind, VersionMismatchKind::MonitorTooOld);
                assert!(e.to_string().contains("monitor stop"));
            }
            other => panic!("Expected VersionMismatch error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_socket_is_not_running() {
        assert!(!is_monitor_running(&temp_socket("absent")));
    }

    #[tokio::test]
    async fn test_client_requests() {
        LocalSet::new()
            .run_until(async {
                let socket = temp_socket("client");
                let reported = BatteryStatus::from_kind(64, StatusKind::NotCharging);
                let monitor = FakeMonitor::spawn(&socket, reported);

                let mut client = MonitorClient::connect_with_version_check(&socket)
                    .await
                    .unwrap();
                assert_eq!(client.get_battery_info().await.unwrap(), reported);

                // The event that follows the ack is skipped by the next request.
                let handle = client.add_battery_listener().await.unwrap();
                client.remove_battery_listener(handle.id()).await.unwrap();

                assert_eq!(monitor.requests.borrow().len(), 4);
                let _ = std::fs::remove_file(&socket);
            })
            .await;
    }

    #[tokio::test]
    async fn test_native_events_round_trip() {
        LocalSet::new()
            .run_until(async {
                let socket = temp_socket("events");
                let reported = BatteryStatus::derive(15, false);
                let monitor = FakeMonitor::spawn(&socket, reported);

                let mut events = NativeEvents::new(&socket);
                let mut stream = events.open().await.unwrap();
                let first = tokio::time::timeout(std::time::Duration::from_secs(2), stream.next())
                    .await
                    .unwrap();
                assert_eq!(first, Some(reported));

                drop(stream);
                events.close().await.unwrap();
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;

                let requests = monitor.requests.borrow();
                assert_eq!(requests[0], BridgeRequest::GetStatus);
                assert_eq!(requests[1], BridgeRequest::AddBatteryListener);
                assert_eq!(
                    requests[2],
                    BridgeRequest::RemoveBatteryListener {
                        id: ListenerId::new("battery_listener_1")
                    }
                );
                drop(requests);
                let _ = std::fs::remove_file(&socket);
            })
            .await;
    }

    #[tokio::test]
    async fn test_open_rejects_incompatible_monitor() {
        LocalSet::new()
            .run_until(async {
                let socket = temp_socket("newer");
                let monitor = FakeMonitor::spawn_reporting(
                    &socket,
                    BatteryStatus::derive(50, false),
                    status(9, PROTOCOL_VERSION + 1, PROTOCOL_VERSION + 1),
                );

                let mut events = NativeEvents::new(&socket);
                match events.open().await {
                    Err(BridgeError::VersionMismatch(e)) => {
                        assert_eq!(e.kind, VersionMismatchKind::HostTooOld);
                    }
                    Err(other) => panic!("Expected VersionMismatch error, got {:?}", other),
                    Ok(_) => panic!("Expected VersionMismatch error, got a stream"),
                }
                assert_eq!(*monitor.requests.borrow(), vec![BridgeRequest::GetStatus]);
                let _ = std::fs::remove_file(&socket);
            })
            .await;
    }

    #[tokio::test]
    async fn test_open_fails_without_monitor() {
        let mut events = NativeEvents::new(temp_socket("nobody"));
        assert!(matches!(events.open().await, Err(BridgeError::Io(_))));
    }
}
