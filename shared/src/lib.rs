//! Types, constants and algorithms shared between the paddle game server and client.
//!
//! The server owns the authoritative simulation; clients only see sparse
//! position samples and rebuild smooth motion from them with the
//! [`history`], [`prediction`], [`validation`] and [`interpolation`] modules.

pub mod collision;
pub mod entity;
pub mod framing;
pub mod history;
pub mod interpolation;
pub mod math;
pub mod prediction;
pub mod protocol;
pub mod score;
pub mod timing;
pub mod tracking;
pub mod validation;

pub use collision::{check_paddle_collision, check_wall_collision, CollisionType, Contact};
pub use entity::{clamp_paddle_y, Ball, Bounds, Paddle, PaddleId};
pub use history::{EntityHistories, HistoryKind, TemporalHistory, Timestamped};
pub use interpolation::{average, interpolate, smoothing_fraction, Smoother};
pub use math::Vec2;
pub use prediction::{predict_linear, Blend, Predict, Prediction, Tracked};
pub use protocol::{ControlMessage, Handshake, PositionSample, ProtocolError, ScoreMessage};
pub use score::Score;
pub use timing::{Cooldown, SessionClock};
pub use tracking::RemotePaddle;
pub use validation::validate_ball_prediction;

pub const COURT_WIDTH: f32 = 1280.0;
pub const COURT_HEIGHT: f32 = 720.0;
pub const PADDLE_WIDTH: f32 = 15.0;
pub const PADDLE_HEIGHT: f32 = 90.0;
pub const BALL_WIDTH: f32 = 15.0;
pub const BALL_HEIGHT: f32 = 15.0;
/// Horizontal distance from a court edge to the paddle's left side.
pub const PADDLE_INSET: f32 = 50.0;

/// Pixels per second.
pub const BALL_SPEED: f32 = 500.0;
/// Pixels per second.
pub const PADDLE_SPEED: f32 = 750.0;
/// Share of `BALL_SPEED` given to the vertical velocity after an edge hit.
pub const DEFLECTION_FACTOR: f32 = 0.75;

pub const WINNING_SCORE: u32 = 7;
/// A winner must lead by more than this many points.
pub const WIN_MARGIN: u32 = 2;

pub const DEFAULT_DATAGRAM_PORT: u16 = 4444;
pub const DEFAULT_CONTROL_PORT: u16 = 4445;

/// Interval between position datagrams, in seconds.
pub const SEND_INTERVAL: f64 = 0.1;
/// Interval between verbose per-tick log lines, in seconds.
pub const LOG_INTERVAL: f64 = 1.5;
/// Minimum spacing between reported display collisions, in seconds.
pub const COLLISION_COOLDOWN: f64 = 0.175;
/// A playing session that stays silent this long is dropped, in seconds.
pub const HEARTBEAT_TIMEOUT: f64 = 5.0;
