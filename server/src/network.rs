//! Server network layer handling UDP communications and game loop coordination

use crate::client_manager::{ClientManager, DEFAULT_CLIENT_TIMEOUT};
use crate::game::GameState;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use rand::Rng;
use shared::{ClientId, InputState, Packet, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};

pub type NetResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const JOIN_CODE_LENGTH: usize = 6;

/// Largest simulation step a single tick may take, in seconds.
pub const MAX_DELTA: f32 = 0.05;

/// Produces a random uppercase alphanumeric session key.
pub fn generate_join_code<R: Rng>(rng: &mut R) -> String {
    (0..JOIN_CODE_LENGTH)
        .map(|_| JOIN_CODE_ALPHABET[rng.gen_range(0..JOIN_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { client_id: ClientId },
    Shutdown,
}

/// Messages sent from game loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
    BroadcastPacket { packet: Packet },
}

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub tick_duration: Duration,
    pub max_clients: usize,
    pub client_timeout: Duration,
    /// Empty accepts any client.
    pub join_code: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            tick_duration: Duration::from_secs_f64(1.0 / 60.0),
            max_clients: 4,
            client_timeout: DEFAULT_CLIENT_TIMEOUT,
            join_code: String::new(),
        }
    }
}

/// Stops a running [`Server`] from another task.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        if self.server_tx.send(ServerMessage::Shutdown).is_err() {
            debug!("Server already stopped");
        }
    }
}

/// Main server coordinating networking and game simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    game_state: GameState,
    options: ServerOptions,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(addr: &str, options: ServerOptions, game_state: GameState) -> NetResult<Self> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::with_timeout(
                options.max_clients,
                options.client_timeout,
            ))),
            game_state,
            options,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn join_code(&self) -> &str {
        &self.options.join_code
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            server_tx: self.server_tx.clone(),
        }
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_PACKET_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if server_tx.send(ServerMessage::ClientTimeout { client_id }).is_err() {
                        return;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(socket: &UdpSocket, packet: &Packet, addr: SocketAddr) -> NetResult<()> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket { packet }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    fn reject(&self, addr: SocketAddr, reason: &str) {
        info!("Rejecting {}: {}", addr, reason);
        self.send_packet(
            Packet::Disconnected {
                reason: reason.to_string(),
            },
            addr,
        );
    }

    async fn client_for(&self, addr: SocketAddr) -> Option<ClientId> {
        let clients = self.clients.read().await;
        clients.find_client_by_addr(addr)
    }

    async fn drop_client(&mut self, client_id: ClientId) {
        {
            let mut clients = self.clients.write().await;
            clients.remove_client(&client_id);
        }
        self.game_state.remove_player(&client_id);
    }

    /// Processes one incoming packet against the client roster and game state
    pub async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect {
                client_version,
                join_code,
            } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                if client_version != PROTOCOL_VERSION {
                    self.reject(addr, "Protocol version mismatch");
                    return;
                }
                if !self.options.join_code.is_empty() && join_code != self.options.join_code {
                    self.reject(addr, "Invalid join code");
                    return;
                }

                if let Some(existing_id) = self.client_for(addr).await {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    self.drop_client(existing_id).await;
                }

                let client_id = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr)
                };

                match client_id {
                    Some(client_id) => {
                        let entity_id = self.game_state.add_player(client_id);
                        self.send_packet(
                            Packet::Connected {
                                client_id,
                                entity_id,
                                join_code: self.options.join_code.clone(),
                            },
                            addr,
                        );
                    }
                    None => self.reject(addr, "Server full"),
                }
            }

            Packet::Input {
                sequence,
                move_x,
                move_z,
                aim_yaw,
            } => {
                let Some(client_id) = self.client_for(addr).await else {
                    return;
                };
                let input = InputState {
                    sequence,
                    move_x,
                    move_z,
                    aim_yaw,
                };

                let accepted = {
                    let mut clients = self.clients.write().await;
                    clients.accept_input(client_id, &input)
                };
                if accepted {
                    self.game_state.apply_input(client_id, &input);
                }
            }

            Packet::Attack { sequence } => {
                let Some(client_id) = self.client_for(addr).await else {
                    return;
                };
                let accepted = {
                    let mut clients = self.clients.write().await;
                    clients.accept_attack(client_id, sequence)
                };
                if accepted {
                    self.game_state.request_attack(client_id);
                }
            }

            Packet::Respawn => {
                let Some(client_id) = self.client_for(addr).await else {
                    return;
                };
                {
                    let mut clients = self.clients.write().await;
                    clients.touch(&client_id);
                }
                self.game_state.request_respawn(client_id);
            }

            Packet::Disconnect => {
                if let Some(client_id) = self.client_for(addr).await {
                    self.drop_client(client_id).await;
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Advances the simulation one step and broadcasts the results.
    pub async fn tick(&mut self, dt: f32) {
        self.game_state.tick(dt.min(MAX_DELTA));
        self.broadcast_game_state().await;
    }

    /// Sends the event batch collected since the last broadcast, then a full snapshot.
    async fn broadcast_game_state(&mut self) {
        let events = self.game_state.observer_mut().drain();

        let client_count = {
            let clients = self.clients.read().await;
            clients.len()
        };
        if client_count == 0 {
            return;
        }

        let tick = self.game_state.tick;
        if !events.is_empty() {
            self.broadcast_packet(Packet::Events { tick, events });
        }

        let packet = Packet::Snapshot {
            tick,
            players: self.game_state.player_snapshots(),
            enemies: self.game_state.enemy_snapshots(),
        };
        self.broadcast_packet(packet);
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> NetResult<()> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        let mut tick_interval = interval(self.options.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            self.game_state.remove_player(&client_id);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;

                    if dt > MAX_DELTA {
                        debug!("Large delta time {:.3}s, capping to {:.3}s", dt, MAX_DELTA);
                    }
                    self.tick(dt).await;

                    if self.game_state.tick % 60 == 0 {
                        let client_count = {
                            let clients = self.clients.read().await;
                            clients.len()
                        };

                        if client_count > 0 {
                            let registry = self.game_state.registry();
                            debug!("Tick {}: {} clients, {} enemies, {:.1}Hz",
                                   self.game_state.tick, client_count,
                                   registry.enemy_count(), 1.0 / dt.max(f32::EPSILON));
                        }
                    }
                },
            }
        }

        Ok(())
    }
}
