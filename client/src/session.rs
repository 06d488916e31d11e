//! Connection to the arena server
//!
//! The window runs on macroquad's main thread, so networking lives on a
//! dedicated thread with its own tokio runtime. The two sides talk through
//! channels: [`SessionCommand`]s go out, [`SessionUpdate`]s come back.
//!
//! Setup (bind, handshake) is attempted exactly once. Any failure is reported
//! as a [`SessionStatus::Failed`] and the session ends. The background task
//! checks a shared [`Liveness`] flag after every await and stops without
//! reporting anything once the window has let go of the session.

use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{
    ClientId, EnemySnapshot, EntityId, GameEvent, InputState, Packet, PlayerSnapshot,
    MAX_PACKET_SIZE, PROTOCOL_VERSION,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::timeout;

pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// How often a pending handshake looks at the liveness flag.
const LIVENESS_POLL: Duration = Duration::from_millis(25);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Could not open socket: {0}")]
    Bind(#[source] std::io::Error),

    #[error("Invalid server address: {0}")]
    InvalidAddress(String),

    #[error("Network error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not encode packet: {0}")]
    Encode(#[from] bincode::Error),

    #[error("No response from server after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Rejected(String),

    #[error("Could not start network runtime: {0}")]
    Runtime(String),

    /// The window went away while setup was in flight.
    #[error("Session cancelled")]
    Cancelled,
}

/// Where the session is, as shown to the player.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    Idle,
    Connecting,
    Connected {
        client_id: ClientId,
        entity_id: EntityId,
        join_code: String,
    },
    Failed(String),
    Disconnected(String),
}

impl SessionStatus {
    pub fn text(&self) -> String {
        match self {
            SessionStatus::Idle => "Not connected".to_string(),
            SessionStatus::Connecting => "Joining...".to_string(),
            SessionStatus::Connected { join_code, .. } if join_code.is_empty() => {
                "Joined".to_string()
            }
            SessionStatus::Connected { join_code, .. } => format!("Joined: {}", join_code),
            SessionStatus::Failed(reason) => format!("Join Failed: {}", reason),
            SessionStatus::Disconnected(reason) => format!("Disconnected: {}", reason),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, SessionStatus::Connected { .. })
    }
}

/// Requests from the window to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Input(InputState),
    Attack { sequence: u32 },
    Respawn,
    Disconnect,
}

impl SessionCommand {
    fn into_packet(self) -> Packet {
        match self {
            SessionCommand::Input(input) => Packet::Input {
                sequence: input.sequence,
                move_x: input.move_x,
                move_z: input.move_z,
                aim_yaw: input.aim_yaw,
            },
            SessionCommand::Attack { sequence } => Packet::Attack { sequence },
            SessionCommand::Respawn => Packet::Respawn,
            SessionCommand::Disconnect => Packet::Disconnect,
        }
    }
}

/// What the server told us, forwarded to the window.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Status(SessionStatus),
    Snapshot {
        tick: u32,
        players: Vec<PlayerSnapshot>,
        enemies: Vec<EnemySnapshot>,
    },
    Events {
        tick: u32,
        events: Vec<GameEvent>,
    },
}

/// Shared flag telling the background task whether anyone still listens.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn revoke(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), SessionError> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(SessionError::Cancelled)
        }
    }

    /// Resolves once the flag has been revoked.
    async fn revoked(&self) {
        while self.is_alive() {
            tokio::time::sleep(LIVENESS_POLL).await;
        }
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub server_addr: String,
    pub join_code: String,
    pub handshake_timeout: Duration,
}

impl SessionConfig {
    pub fn new(server_addr: impl Into<String>, join_code: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            join_code: join_code.into(),
            handshake_timeout: HANDSHAKE_TIMEOUT,
        }
    }
}

/// Result of a successful handshake.
#[derive(Debug, Clone, PartialEq)]
pub struct Joined {
    pub client_id: ClientId,
    pub entity_id: EntityId,
    pub join_code: String,
}

impl From<Joined> for SessionStatus {
    fn from(joined: Joined) -> Self {
        SessionStatus::Connected {
            client_id: joined.client_id,
            entity_id: joined.entity_id,
            join_code: joined.join_code,
        }
    }
}

/// Window-side end of a running session.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    updates: std_mpsc::Receiver<SessionUpdate>,
    liveness: Liveness,
    thread: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Starts the session thread. Progress arrives through [`poll`](Self::poll).
    pub fn spawn(config: SessionConfig) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (update_tx, update_rx) = std_mpsc::channel();
        let liveness = Liveness::new();

        let task_liveness = liveness.clone();
        let thread = std::thread::Builder::new()
            .name("session".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let error = SessionError::Runtime(e.to_string());
                        error!("{}", error);
                        let _ = update_tx.send(SessionUpdate::Status(SessionStatus::Failed(
                            error.to_string(),
                        )));
                        return;
                    }
                };
                runtime.block_on(run_session(config, task_liveness, update_tx, command_rx));
            });

        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Failed to start session thread: {}", e);
                None
            }
        };

        Self {
            commands: command_tx,
            updates: update_rx,
            liveness,
            thread,
        }
    }

    pub fn send(&self, command: SessionCommand) {
        if self.commands.send(command).is_err() {
            debug!("Session closed, dropping command");
        }
    }

    /// Everything received since the last call, oldest first.
    pub fn poll(&self) -> Vec<SessionUpdate> {
        self.updates.try_iter().collect()
    }

    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    /// Tells the server we're leaving and stops the background task.
    ///
    /// A session still joining gives up at once instead of waiting out the
    /// handshake timeout.
    pub fn shutdown(mut self) {
        self.send(SessionCommand::Disconnect);
        self.liveness.revoke();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Session thread panicked");
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.liveness.revoke();
    }
}

async fn send_packet(
    socket: &UdpSocket,
    packet: &Packet,
    addr: SocketAddr,
) -> Result<(), SessionError> {
    let data = serialize(packet)?;
    socket.send_to(&data, addr).await?;
    Ok(())
}

async fn resolve(server_addr: &str) -> Result<SocketAddr, SessionError> {
    if let Ok(addr) = server_addr.parse() {
        return Ok(addr);
    }
    tokio::net::lookup_host(server_addr)
        .await
        .map_err(|_| SessionError::InvalidAddress(server_addr.to_string()))?
        .next()
        .ok_or_else(|| SessionError::InvalidAddress(server_addr.to_string()))
}

async fn await_reply(socket: &UdpSocket, server_addr: SocketAddr) -> Result<Joined, SessionError> {
    let mut buffer = vec![0u8; MAX_PACKET_SIZE];
    loop {
        let (len, from) = socket.recv_from(&mut buffer).await?;
        if from != server_addr {
            continue;
        }
        match deserialize::<Packet>(&buffer[..len]) {
            Ok(Packet::Connected {
                client_id,
                entity_id,
                join_code,
            }) => {
                return Ok(Joined {
                    client_id,
                    entity_id,
                    join_code,
                })
            }
            Ok(Packet::Disconnected { reason }) => return Err(SessionError::Rejected(reason)),
            // Snapshots may race ahead of the reply on a reconnect.
            Ok(_) => continue,
            Err(e) => warn!("Malformed packet from server: {}", e),
        }
    }
}

/// Sends `Connect` and waits for the server's answer.
pub async fn handshake(
    socket: &UdpSocket,
    server_addr: SocketAddr,
    join_code: &str,
    wait: Duration,
    liveness: &Liveness,
) -> Result<Joined, SessionError> {
    let connect = Packet::Connect {
        client_version: PROTOCOL_VERSION,
        join_code: join_code.to_string(),
    };
    send_packet(socket, &connect, server_addr).await?;
    liveness.check()?;

    let reply = tokio::select! {
        reply = timeout(wait, await_reply(socket, server_addr)) => reply,
        _ = liveness.revoked() => return Err(SessionError::Cancelled),
    };
    liveness.check()?;

    reply.map_err(|_| SessionError::Timeout(wait))?
}

async fn connect(
    config: &SessionConfig,
    liveness: &Liveness,
) -> Result<(UdpSocket, SocketAddr, Joined), SessionError> {
    let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(SessionError::Bind)?;
    liveness.check()?;

    let server_addr = resolve(&config.server_addr).await?;
    liveness.check()?;

    info!("Joining {} ...", server_addr);
    let joined = handshake(
        &socket,
        server_addr,
        &config.join_code,
        config.handshake_timeout,
        liveness,
    )
    .await?;
    Ok((socket, server_addr, joined))
}

async fn run_session(
    config: SessionConfig,
    liveness: Liveness,
    updates: std_mpsc::Sender<SessionUpdate>,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
) {
    if updates
        .send(SessionUpdate::Status(SessionStatus::Connecting))
        .is_err()
    {
        return;
    }

    let (socket, server_addr, joined) = match connect(&config, &liveness).await {
        Ok(connected) => connected,
        Err(SessionError::Cancelled) => {
            debug!("Session setup cancelled");
            return;
        }
        Err(e) => {
            error!("Join failed: {}", e);
            if liveness.is_alive() {
                let _ = updates.send(SessionUpdate::Status(SessionStatus::Failed(e.to_string())));
            }
            return;
        }
    };

    info!(
        "Connected! Client ID: {}, entity {}",
        joined.client_id, joined.entity_id
    );
    if updates.send(SessionUpdate::Status(joined.into())).is_err() {
        return;
    }

    let mut buffer = vec![0u8; MAX_PACKET_SIZE];
    loop {
        tokio::select! {
            result = socket.recv_from(&mut buffer) => {
                let update = match result {
                    Ok((len, from)) if from == server_addr => {
                        match deserialize::<Packet>(&buffer[..len]) {
                            Ok(packet) => packet_update(packet),
                            Err(e) => {
                                warn!("Malformed packet from server: {}", e);
                                None
                            }
                        }
                    }
                    Ok(_) => None,
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        None
                    }
                };

                if let Some(update) = update {
                    let closing = matches!(update, SessionUpdate::Status(SessionStatus::Disconnected(_)));
                    if !liveness.is_alive() || updates.send(update).is_err() || closing {
                        break;
                    }
                }
            },

            command = commands.recv() => {
                let command = command.unwrap_or(SessionCommand::Disconnect);
                let leaving = command == SessionCommand::Disconnect;
                if let Err(e) = send_packet(&socket, &command.into_packet(), server_addr).await {
                    error!("Error sending packet: {}", e);
                }
                if leaving {
                    info!("Left the session");
                    break;
                }
            },
        }

        if !liveness.is_alive() {
            let _ = send_packet(&socket, &Packet::Disconnect, server_addr).await;
            break;
        }
    }
}

fn packet_update(packet: Packet) -> Option<SessionUpdate> {
    match packet {
        Packet::Snapshot {
            tick,
            players,
            enemies,
            ..
        } => Some(SessionUpdate::Snapshot {
            tick,
            players,
            enemies,
        }),
        Packet::Events { tick, events } => Some(SessionUpdate::Events { tick, events }),
        Packet::Disconnected { reason } => {
            warn!("Disconnected: {}", reason);
            Some(SessionUpdate::Status(SessionStatus::Disconnected(reason)))
        }
        Packet::Connected { .. } => None,
        _ => {
            warn!("Unexpected packet type");
            None
        }
    }
}
