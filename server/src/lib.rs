//! # Horde Arena Server Library
//!
//! The authoritative side of the co-op arena. The server owns every entity,
//! runs the simulation on a fixed tick and tells clients what happened.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Positions and health are only ever mutated here. Players send movement
//! axes, attack triggers and respawn requests; the server validates each one
//! against its own state and silently drops anything invalid or late.
//!
//! ### Hostile Waves
//! Hostiles spawn on a timer in a ring around the player group, chase the
//! nearest living player and deal contact damage. Both their speed and their
//! contact damage scale with remaining health.
//!
//! ### State Broadcasting
//! After every tick the server sends the batch of [`shared::GameEvent`]s
//! produced since the previous broadcast, followed by a full snapshot.
//!
//! ## Module Organization
//!
//! - `config`: combat stats and server tuning, loaded from RON files
//! - `registry`: every live entity, keyed by a never-reused id
//! - `spawner`: timed hostile spawning around the player centroid
//! - `movement`: player input movement and hostile pursuit
//! - `combat`: cone attacks, contact damage and death transitions
//! - `game`: [`game::GameState`], the orchestrator driven by `tick(dt)`
//! - `events`: the observer interface state changes are reported through
//! - `client_manager` and `network`: connections and the UDP server loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use server::config::{CombatStats, ServerConfig};
//! use server::events::EventQueue;
//! use server::game::GameState;
//! use server::network::{Server, ServerOptions};
//!
//! #[tokio::main]
//! async fn main() -> server::network::NetResult<()> {
//!     let game_state = GameState::new(
//!         ServerConfig::default(),
//!         Box::new(CombatStats::default()),
//!         StdRng::seed_from_u64(7),
//!         EventQueue::new(),
//!     );
//!
//!     let options = ServerOptions {
//!         join_code: "ARENA1".to_string(),
//!         ..ServerOptions::default()
//!     };
//!     let mut server = Server::new("127.0.0.1:8080", options, game_state).await?;
//!     server.run().await
//! }
//! ```
//!
//! The simulation can also be driven without any networking:
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use server::config::{CombatStats, ServerConfig};
//! use server::events::EventQueue;
//! use server::game::GameState;
//!
//! let mut game: GameState = GameState::new(
//!     ServerConfig::default(),
//!     Box::new(CombatStats::default()),
//!     StdRng::seed_from_u64(7),
//!     EventQueue::new(),
//! );
//! game.add_player(1);
//! for _ in 0..150 {
//!     game.tick(1.0 / 60.0);
//! }
//! assert_eq!(game.registry().enemy_count(), 1);
//! ```

pub mod client_manager;
pub mod combat;
pub mod config;
pub mod entity;
pub mod error;
pub mod events;
pub mod game;
pub mod movement;
pub mod network;
pub mod registry;
pub mod spawner;
