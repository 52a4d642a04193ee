//! # Game Client Library
//!
//! Client side of the two-player paddle game. The client owns its own
//! paddle; the ball and the opponent's paddle are owned by the server and
//! only ever seen through position datagrams that arrive late, out of
//! order or not at all.
//!
//! ## Module Organization
//!
//! ### Sync Module (`sync`)
//! Reconstructs remote motion without trusting any velocity:
//! - Dead reckoning from received positions and from earlier predictions
//! - Tunneling correction of predicted ball positions
//! - Frame-rate independent smoothing towards the estimates
//! - Detection of the ball being re-served after a point
//!
//! ### Game Module (`game`)
//! Per-session state: own paddle, remote trackers, score, display-only
//! collision response and the snapshot handed to the frontend.
//!
//! ### Input Module (`input`)
//! Turns raw key states into per-frame paddle direction and toggles.
//!
//! ### Frontend Module (`frontend`)
//! The [`frontend::Frontend`] trait separates presentation from sync, plus
//! a headless [`frontend::Autopilot`].
//!
//! ### Network Module (`network`)
//! Control-connection handshake, paddle and ball datagram sockets, the
//! frame loop and reconnecting after a game ends.
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::config::ClientConfig;
//! use client::frontend::Autopilot;
//! use client::network::Client;
//!
//! # async fn play() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = Client::new(ClientConfig::default(), Autopilot::new().with_max_games(1));
//! client.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod frontend;
pub mod game;
pub mod input;
pub mod network;
pub mod sync;
