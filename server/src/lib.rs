//! # Paddle Game Server
//!
//! Authoritative side of a two-player paddle game. The server owns the ball:
//! it integrates its motion, resolves paddle and wall collisions, keeps the
//! score and decides the winner. Players own their paddles; the server only
//! relays their position datagrams and estimates where each paddle is
//! between datagrams.
//!
//! ## Channels
//!
//! - **Control** (TCP, length-prefixed frames): paddle assignment, the ready
//!   handshake, score updates, the winner and disconnect notices.
//! - **Datagrams** (UDP, one position sample each): paddle positions from
//!   players, relayed to the opponent, and ball positions sent to both
//!   players on a fixed send interval.
//!
//! ## Module Organization
//!
//! - `config`: runtime settings, filled from the command line by `main`
//! - `game`: the authoritative [`game::World`] and collision response
//! - `session`: connected players, paddle assignment and heartbeats
//! - `state`: the I/O-free session state machine ([`state::Match`])
//! - `network`: tokio tasks for the sockets and the single game loop
//!
//! ## Concurrency
//!
//! All game state lives on one task. Socket reads happen in spawned tasks
//! that forward raw frames and datagrams over a channel, so the game loop
//! never blocks on the network and a tick is never delayed by a slow peer.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::bind(ServerConfig::default()).await?;
//!     server.run().await
//! }
//! ```

pub mod config;
pub mod game;
pub mod network;
pub mod session;
pub mod state;
