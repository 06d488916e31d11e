//! # Horde Arena Client Library
//!
//! The client is an observer with a controller attached. It never decides
//! anything about the world: it shows what the server reports and forwards
//! the player's requests.
//!
//! ## Data Flow
//!
//! ```text
//!  keyboard ──> input ──> session ──UDP──> server
//!                            │
//!         snapshots, events  v
//!                         mirror ──> presentation ──> rendering
//! ```
//!
//! ## Module Organization
//!
//! ### Session (`session`)
//! Runs the connection on its own thread and tokio runtime. Joining is tried
//! once; failures surface as status text such as `Join Failed: Server full`.
//!
//! ### Mirror (`mirror`)
//! Read-only replica of players and hostiles. Snapshots replace it, event
//! batches patch it in between, older snapshots are ignored.
//!
//! ### Presentation (`presentation`)
//! Purely visual reactions to events: white hit flashes, debris bursts when
//! a hostile dies and the death screen for the local player.
//!
//! ### Input (`input`) and Rendering (`rendering`)
//! macroquad keyboard sampling with edge detection, and a top-down renderer
//! with a follow camera, health bars and HUD.
//!
//! ### App (`app`)
//! The frame loop tying the pieces together.
//!
//! ## Example
//!
//! ```rust
//! use client::mirror::Mirror;
//! use client::presentation::Effects;
//! use shared::GameEvent;
//!
//! let mut mirror = Mirror::new();
//! let mut effects = Effects::new();
//! mirror.set_local(1, 4);
//!
//! let died = GameEvent::Died { entity: 4 };
//! effects.handle_event(&died, &mirror);
//! mirror.apply_events(1, &[died]);
//! assert!(effects.death_screen_visible());
//! ```

pub mod app;
pub mod input;
pub mod mirror;
pub mod presentation;
pub mod rendering;
pub mod session;
