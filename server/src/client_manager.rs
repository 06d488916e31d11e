//! Client connection management for the arena server
//!
//! This module tracks every connected client:
//! - Connection lifecycle (connect, disconnect, timeout)
//! - Sequence bookkeeping so stale or duplicated requests are dropped
//! - Connection health monitoring and capacity limits
//!
//! Gameplay state is not stored here. A client only maps a network address to
//! the `ClientId` that owns a player entity in the game state.

use log::{debug, info};
use shared::{ClientId, InputState};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Default silence after which a client is considered gone.
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected client and its request bookkeeping
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the server
    pub id: ClientId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Highest input sequence number we've applied
    pub last_processed_input: u32,
    /// Highest attack sequence number we've handled
    pub last_attack_sequence: u32,
}

impl Client {
    pub fn new(id: ClientId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            last_processed_input: 0,
            last_attack_sequence: 0,
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Returns true if no packets arrived within `timeout`.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected clients
///
/// Enforces the server's capacity limit and hands out client ids, which start
/// at 1 and are never reused while the server runs.
pub struct ClientManager {
    clients: HashMap<ClientId, Client>,
    next_client_id: ClientId,
    max_clients: usize,
    timeout: Duration,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self::with_timeout(max_clients, DEFAULT_CLIENT_TIMEOUT)
    }

    pub fn with_timeout(max_clients: usize, timeout: Duration) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
            timeout,
        }
    }

    /// Attempts to add a new client connection
    ///
    /// Returns `None` when the server is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<ClientId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients.insert(client_id, Client::new(client_id, addr));

        Some(client_id)
    }

    pub fn remove_client(&mut self, client_id: &ClientId) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} disconnected", client.id);
            true
        } else {
            false
        }
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<ClientId> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn client(&self, client_id: &ClientId) -> Option<&Client> {
        self.clients.get(client_id)
    }

    /// Marks a client as alive without any other bookkeeping.
    pub fn touch(&mut self, client_id: &ClientId) -> bool {
        match self.clients.get_mut(client_id) {
            Some(client) => {
                client.touch();
                true
            }
            None => false,
        }
    }

    /// Records an input and reports whether it should be applied
    ///
    /// Any input refreshes the client's liveness. Only inputs newer than the
    /// last processed sequence are accepted, so reordered UDP datagrams never
    /// roll a player's intent back.
    pub fn accept_input(&mut self, client_id: ClientId, input: &InputState) -> bool {
        let Some(client) = self.clients.get_mut(&client_id) else {
            return false;
        };
        client.touch();

        if input.sequence <= client.last_processed_input {
            debug!(
                "Dropping stale input {} from client {} (last {})",
                input.sequence, client_id, client.last_processed_input
            );
            return false;
        }
        client.last_processed_input = input.sequence;
        true
    }

    /// Same sequencing rule as [`accept_input`](Self::accept_input), for attack triggers.
    pub fn accept_attack(&mut self, client_id: ClientId, sequence: u32) -> bool {
        let Some(client) = self.clients.get_mut(&client_id) else {
            return false;
        };
        client.touch();

        if sequence <= client.last_attack_sequence {
            debug!("Dropping duplicate attack {} from client {}", sequence, client_id);
            return false;
        }
        client.last_attack_sequence = sequence;
        true
    }

    /// Removes clients that have been silent longer than the timeout.
    /// Returns the removed ids so their players can be despawned.
    pub fn check_timeouts(&mut self) -> Vec<ClientId> {
        let timeout = self.timeout;
        let timed_out: Vec<ClientId> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            info!("Client {} timed out", client_id);
            self.remove_client(client_id);
        }

        timed_out
    }

    pub fn get_client_addrs(&self) -> Vec<(ClientId, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
