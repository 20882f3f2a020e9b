use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use battery_bridge::MIN_POLL_INTERVAL;
use battery_bridge_platform::{
    BatteryReading, BatterySource, ChargeState, NoBattery, SystemBattery,
};
use battery_bridge_protocol::{
    BatteryStatus, BridgeEvent, BridgeRequest, BridgeResponse, ListenerHandle, ListenerId,
    MonitorStatus, StatusKind, MAX_LISTENERS, MIN_SUPPORTED_VERSION, PROTOCOL_VERSION,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::{JoinHandle, LocalSet};
use tracing::{debug, error, info, warn};

use crate::config::{runtime_dir, socket_path, LogLevel};

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Already running")]
    AlreadyRunning,

    #[error("Failed to daemonize: {0}")]
    Daemonize(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;

type ClientId = u64;

enum ClientMessage {
    Request { request: BridgeRequest },
    Disconnect,
}

/// How long shutdown waits for queued replies to reach their sockets.
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(1);

struct ClientHandle {
    response_tx: mpsc::Sender<BridgeResponse>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl ClientHandle {
    /// Stops reading requests. The writer exits once its queue is flushed.
    fn close(self) -> JoinHandle<()> {
        let ClientHandle { reader, writer, .. } = self;
        reader.abort();
        writer
    }
}

fn status_kind(state: ChargeState) -> StatusKind {
    match state {
        ChargeState::Charging => StatusKind::Charging,
        ChargeState::Discharging => StatusKind::Discharging,
        ChargeState::Full => StatusKind::Full,
        ChargeState::NotCharging => StatusKind::NotCharging,
        ChargeState::Unknown => StatusKind::Unknown,
    }
}

/// Status as a native platform reports it, keeping `full` and `not_charging`.
fn native_status(reading: Option<BatteryReading>) -> BatteryStatus {
    match reading {
        Some(reading) => BatteryStatus::from_kind(reading.level(), status_kind(reading.state)),
        None => BatteryStatus::unavailable(),
    }
}

fn system_source() -> Box<dyn BatterySource> {
    match SystemBattery::new() {
        Ok(battery) => Box::new(battery),
        Err(e) => {
            warn!(error = %e, "System battery API unavailable, serving fallback status");
            Box::new(NoBattery)
        }
    }
}

struct MonitorState {
    source: Box<dyn BatterySource>,
    last_status: BatteryStatus,
    poll_interval: Duration,
    start_time: Instant,
    next_listener_id: u64,
    registrations: HashMap<ClientId, Vec<ListenerId>>,
}

impl MonitorState {
    fn new(mut source: Box<dyn BatterySource>, poll_interval: Duration) -> Self {
        let last_status = read_native(source.as_mut());
        Self {
            source,
            last_status,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            start_time: Instant::now(),
            next_listener_id: 0,
            registrations: HashMap::new(),
        }
    }

    /// Re-reads the battery. Returns the new status if it changed.
    fn refresh(&mut self) -> Option<BatteryStatus> {
        let status = read_native(self.source.as_mut());
        if status == self.last_status {
            return None;
        }
        debug!(
            level = status.level,
            status = %status.status,
            previous = %self.last_status.status,
            "Battery changed"
        );
        self.last_status = status;
        Some(status)
    }

    fn listener_count(&self) -> usize {
        self.registrations.values().map(Vec::len).sum()
    }

    fn has_listeners(&self, client_id: ClientId) -> bool {
        self.registrations
            .get(&client_id)
            .is_some_and(|ids| !ids.is_empty())
    }

    fn drop_client(&mut self, client_id: ClientId) {
        if let Some(ids) = self.registrations.remove(&client_id) {
            if !ids.is_empty() {
                info!(
                    client_id,
                    dropped = ids.len(),
                    count = self.listener_count(),
                    "Listeners dropped with connection"
                );
            }
        }
    }

    fn get_status(&self, connection_count: usize) -> MonitorStatus {
        MonitorStatus {
            running: true,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            listener_count: self.listener_count(),
            connection_count,
            poll_interval_ms: self.poll_interval.as_millis() as u64,
            protocol_version: PROTOCOL_VERSION,
            min_supported_version: MIN_SUPPORTED_VERSION,
        }
    }

    fn handle_request(
        &mut self,
        client_id: ClientId,
        request: &BridgeRequest,
        connection_count: usize,
    ) -> BridgeResponse {
        match request {
            BridgeRequest::GetBatteryInfo => {
                let status = read_native(self.source.as_mut());
                BridgeResponse::BatteryInfo(status)
            }
            BridgeRequest::AddBatteryListener => {
                if self.listener_count() >= MAX_LISTENERS {
                    return BridgeResponse::Error(format!(
                        "Maximum listeners ({}) reached",
                        MAX_LISTENERS
                    ));
                }
                self.next_listener_id += 1;
                let id = ListenerId::new(format!("battery_listener_{}", self.next_listener_id));
                self.registrations
                    .entry(client_id)
                    .or_default()
                    .push(id.clone());
                info!(client_id, id = %id, count = self.listener_count(), "Listener added");
                BridgeResponse::ListenerAdded(ListenerHandle::new(id))
            }
            BridgeRequest::RemoveBatteryListener { id } => {
                if let Some(ids) = self.registrations.get_mut(&client_id) {
                    let before = ids.len();
                    ids.retain(|existing| existing != id);
                    if ids.len() != before {
                        info!(client_id, id = %id, count = self.listener_count(), "Listener removed");
                    }
                }
                BridgeResponse::ListenerRemoved
            }
            BridgeRequest::GetStatus => BridgeResponse::Status(self.get_status(connection_count)),
            BridgeRequest::Shutdown => BridgeResponse::Ok,
        }
    }
}

fn read_native(source: &mut dyn BatterySource) -> BatteryStatus {
    let reading = match source.read() {
        Ok(reading) => reading,
        Err(e) => {
            debug!(source = source.name(), error = %e, "Battery read failed");
            None
        }
    };
    native_status(reading)
}

async fn client_reader_task(
    mut reader: BufReader<tokio::net::unix::OwnedReadHalf>,
    msg_tx: mpsc::Sender<(ClientId, ClientMessage)>,
    client_id: ClientId,
) {
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                let _ = msg_tx.send((client_id, ClientMessage::Disconnect)).await;
                break;
            }
            Ok(_) => match BridgeRequest::from_json(line.trim()) {
                Ok(request) => {
                    if msg_tx
                        .send((client_id, ClientMessage::Request { request }))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    warn!(client_id, error = %e, "Invalid request from client");
                }
            },
            Err(e) => {
                debug!(client_id, error = %e, "Client read error");
                let _ = msg_tx.send((client_id, ClientMessage::Disconnect)).await;
                break;
            }
        }
    }
}

async fn client_writer_task(
    mut writer: tokio::net::unix::OwnedWriteHalf,
    mut response_rx: mpsc::Receiver<BridgeResponse>,
) {
    while let Some(response) = response_rx.recv().await {
        let json = match response.to_json() {
            Ok(j) => j,
            Err(_) => continue,
        };
        if writer
            .write_all(format!("{}\n", json).as_bytes())
            .await
            .is_err()
        {
            break;
        }
    }
}

pub fn run_monitor(
    foreground: bool,
    poll_interval: Duration,
    log_level: LogLevel,
    log_level_override: Option<LogLevel>,
) -> Result<()> {
    let socket = socket_path();

    if socket.exists() {
        if super::is_running() {
            return Err(MonitorError::AlreadyRunning);
        }
        fs::remove_file(&socket)?;
    }

    fs::create_dir_all(runtime_dir())?;

    if !foreground {
        daemonize::Daemonize::new()
            .working_directory(runtime_dir())
            .start()
            .map_err(|e| MonitorError::Daemonize(e.to_string()))?;
        let guard =
            crate::logging::init(log_level, crate::logging::LogMode::File, log_level_override);
        std::mem::forget(guard);
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Battery monitor starting");

    let state = MonitorState::new(system_source(), poll_interval);
    let result = serve_on(&socket, state);

    info!("Battery monitor shutting down");
    fs::remove_file(&socket).ok();
    result
}

/// Binds `socket` and serves until a client asks for shutdown, on a
/// current-thread runtime owned by the calling thread.
fn serve_on(socket: &Path, state: MonitorState) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    LocalSet::new().block_on(&runtime, async {
        let listener = UnixListener::bind(socket)?;
        info!(socket = ?socket, "Listening for connections");
        serve(listener, state).await
    })
}

/// Queues `response` without waiting. A client whose queue is full or gone
/// is dropped along with its registrations.
fn deliver(
    clients: &mut HashMap<ClientId, ClientHandle>,
    state: &mut MonitorState,
    client_id: ClientId,
    response: BridgeResponse,
) {
    let Some(client) = clients.get(&client_id) else {
        return;
    };

    match client.response_tx.try_send(response) {
        Ok(()) => return,
        Err(TrySendError::Full(_)) => {
            warn!(client_id, "Client is not reading, dropping connection");
        }
        Err(TrySendError::Closed(_)) => {
            debug!(client_id, "Removed disconnected client");
        }
    }

    if let Some(client) = clients.remove(&client_id) {
        client.close();
    }
    state.drop_client(client_id);
}

fn broadcast(
    clients: &mut HashMap<ClientId, ClientHandle>,
    state: &mut MonitorState,
    status: BatteryStatus,
) {
    let event = BridgeResponse::Event(BridgeEvent::BatteryChanged(status));
    let targets: Vec<ClientId> = clients
        .keys()
        .copied()
        .filter(|id| state.has_listeners(*id))
        .collect();

    for client_id in targets {
        deliver(clients, state, client_id, event.clone());
    }
}

async fn serve(listener: UnixListener, mut state: MonitorState) -> Result<()> {
    let mut poll_tick = tokio::time::interval(state.poll_interval);
    poll_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let (msg_tx, mut msg_rx) = mpsc::channel::<(ClientId, ClientMessage)>(256);
    let mut clients: HashMap<ClientId, ClientHandle> = HashMap::new();
    let mut next_client_id: ClientId = 1;

    loop {
        tokio::select! {
            _ = poll_tick.tick() => {
                if let Some(status) = state.refresh() {
                    broadcast(&mut clients, &mut state, status);
                }
            }
            result = listener.accept() => {
                match result {
                    Ok((stream, _)) => {
                        let client_id = next_client_id;
                        next_client_id += 1;
                        debug!(client_id, "Client connected");

                        let (reader, writer) = stream.into_split();
                        let (response_tx, response_rx) = mpsc::channel::<BridgeResponse>(64);

                        let reader = tokio::task::spawn_local(client_reader_task(
                            BufReader::new(reader),
                            msg_tx.clone(),
                            client_id,
                        ));
                        let writer = tokio::task::spawn_local(client_writer_task(writer, response_rx));
                        clients.insert(client_id, ClientHandle { response_tx, reader, writer });
                    }
                    Err(e) => {
                        error!(error = %e, "Socket accept error");
                    }
                }
            }
            Some((client_id, msg)) = msg_rx.recv() => {
                match msg {
                    ClientMessage::Disconnect => {
                        if let Some(client) = clients.remove(&client_id) {
                            client.close();
                            state.drop_client(client_id);
                            debug!(client_id, count = clients.len(), "Client disconnected");
                        }
                    }
                    ClientMessage::Request { request } => {
                        if !clients.contains_key(&client_id) {
                            continue;
                        }
                        debug!(client_id, request = ?request, "Handling request");
                        let response = state.handle_request(client_id, &request, clients.len());
                        deliver(&mut clients, &mut state, client_id, response);

                        if request == BridgeRequest::Shutdown {
                            info!("Shutdown requested by client");
                            break;
                        }
                    }
                }
            }
        }
    }

    for (client_id, client) in clients.drain() {
        if tokio::time::timeout(SHUTDOWN_DRAIN, client.close()).await.is_err() {
            debug!(client_id, "Replies not flushed before shutdown");
        }
    }

    Ok(())
}
