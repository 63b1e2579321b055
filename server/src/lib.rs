//! # Tower Defense Server Library
//!
//! Authoritative server for the cooperative tower-defense game. Browser
//! clients send intents (join, ready, place tower, start wave) as JSON text
//! frames over a WebSocket; the server owns every session's state, advances
//! the simulation on a fixed tick and pushes snapshots back to everyone in
//! the session.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Enemy movement along the shared path, tower targeting and the gold and
//! base-health economy are computed here only. Clients render whatever the
//! latest snapshot says.
//!
//! ### Session Lifecycle
//! A session is created on first join, moves from lobby to started once
//! every player is ready, and is destroyed when its last player leaves.
//!
//! ### State Broadcasting
//! After most mutations, and after every tick of a started session, the
//! full snapshot is fanned out to all connections bound to that session.
//!
//! ## Architecture Design
//!
//! ### Single Event Loop
//! Connection tasks only move frames. All session mutation happens on one
//! task that handles connection events and scheduler ticks in turn, so no
//! locking is needed around sessions or registries.
//!
//! ### Injectable Registries
//! The session and connection registries are plain values owned by the
//! [`router::Router`]. Tests build a fresh router per case.
//!
//! ## Module Organization
//!
//! - `game`: a single session's state and simulation step
//! - `session_manager`: sessions by id
//! - `client_manager`: connections, their outbound queues and bindings
//! - `broadcast`: fan-out to a session's connections
//! - `router`: message decoding and intent handlers
//! - `scheduler`: the fixed-interval tick
//! - `network`: WebSocket accept loop and the event loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), server::network::BoxError> {
//!     let config = ServerConfig {
//!         addr: "0.0.0.0:3000".to_string(),
//!         ..ServerConfig::default()
//!     };
//!     Server::bind(&config).await?.run().await
//! }
//! ```

pub mod broadcast;
pub mod client_manager;
pub mod game;
pub mod network;
pub mod router;
pub mod scheduler;
pub mod session_manager;
pub mod utils;
