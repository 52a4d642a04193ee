//! Wire protocol shared by client and server.
//!
//! Two channels are used:
//! - **Datagram channel** (unreliable): one [`PositionSample`] per datagram,
//!   no type tag. Ball and paddle samples are told apart by `is_ball`.
//! - **Control channel** (reliable, framed by [`crate::framing`]): an untagged
//!   handshake sequence followed by header-prefixed [`ControlMessage`]s.
//!
//! All payloads use bincode's default layout: little-endian fixed-width
//! integers, `bool` as one byte, strings as a `u64` length plus UTF-8 bytes.

use crate::entity::PaddleId;
use crate::math::Vec2;
use crate::score::Score;
use bincode::{deserialize, serialize, serialize_into};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const GAME_STARTED: &str = "game started";
pub const OPPONENT_DISCONNECTED: &str = "opponent disconnected";

/// Encoded size of a [`PositionSample`]: f64 + f32 + f32 + bool + u16.
pub const POSITION_SAMPLE_LEN: usize = 23;

const HEADER_OPPONENT_DISCONNECTED: u8 = 0;
const HEADER_SCORE_UPDATE: u8 = 1;
const HEADER_WINNER: u8 = 2;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty payload")]
    Empty,
    #[error("unknown control header {0}")]
    UnknownHeader(u8),
    #[error("unexpected text {0:?}")]
    UnexpectedText(String),
    #[error("invalid paddle id {0}")]
    InvalidPaddleId(i32),
    #[error("frame of {0} bytes exceeds limit")]
    FrameTooLarge(usize),
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A timestamped position of one moving entity, as sent over the datagram channel.
///
/// `timestamp` is seconds since the sender's session start. Receivers restamp
/// samples with their own clock before storing them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub timestamp: f64,
    pub x: f32,
    pub y: f32,
    pub is_ball: bool,
    pub origin_port: u16,
}

impl PositionSample {
    pub fn new(timestamp: f64, position: Vec2, is_ball: bool, origin_port: u16) -> Self {
        Self {
            timestamp,
            x: position.x,
            y: position.y,
            is_ball,
            origin_port,
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Copy of this sample carrying the receiver's timestamp.
    pub fn restamped(self, timestamp: f64) -> Self {
        Self { timestamp, ..self }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.is_empty() {
            return Err(ProtocolError::Empty);
        }
        Ok(deserialize(bytes)?)
    }
}

/// Payload of a score update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreMessage {
    pub timestamp: f64,
    pub player_one: i32,
    pub player_two: i32,
}

impl ScoreMessage {
    pub fn new(timestamp: f64, score: Score) -> Self {
        Self {
            timestamp,
            player_one: score.player_one as i32,
            player_two: score.player_two as i32,
        }
    }

    pub fn score(&self) -> Score {
        Score {
            player_one: self.player_one.max(0) as u32,
            player_two: self.player_two.max(0) as u32,
        }
    }
}

/// Header-prefixed messages sent by the server once a game is running.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    OpponentDisconnected,
    ScoreUpdate(ScoreMessage),
    Winner(PaddleId),
}

impl ControlMessage {
    pub fn header(&self) -> u8 {
        match self {
            ControlMessage::OpponentDisconnected => HEADER_OPPONENT_DISCONNECTED,
            ControlMessage::ScoreUpdate(_) => HEADER_SCORE_UPDATE,
            ControlMessage::Winner(_) => HEADER_WINNER,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut payload = vec![self.header()];
        match self {
            ControlMessage::OpponentDisconnected => {
                serialize_into(&mut payload, OPPONENT_DISCONNECTED)?
            }
            ControlMessage::ScoreUpdate(scores) => serialize_into(&mut payload, scores)?,
            ControlMessage::Winner(paddle) => serialize_into(&mut payload, &paddle.as_i32())?,
        }
        Ok(payload)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (&header, body) = bytes.split_first().ok_or(ProtocolError::Empty)?;
        match header {
            HEADER_OPPONENT_DISCONNECTED => {
                let text: String = deserialize(body)?;
                if text == OPPONENT_DISCONNECTED {
                    Ok(ControlMessage::OpponentDisconnected)
                } else {
                    Err(ProtocolError::UnexpectedText(text))
                }
            }
            HEADER_SCORE_UPDATE => Ok(ControlMessage::ScoreUpdate(deserialize(body)?)),
            HEADER_WINNER => {
                let paddle: i32 = deserialize(body)?;
                Ok(ControlMessage::Winner(PaddleId::try_from(paddle)?))
            }
            other => Err(ProtocolError::UnknownHeader(other)),
        }
    }
}

/// Untagged messages exchanged before a game starts, in this order:
/// server sends `Assignment`, client answers `ReadyPort`, server sends
/// `GameStarted` once both players are ready.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Handshake {
    Assignment(PaddleId),
    /// Port of the client's ball-position datagram socket.
    ReadyPort(u16),
    GameStarted,
}

impl Handshake {
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let payload = match self {
            Handshake::Assignment(paddle) => serialize(&paddle.as_i32())?,
            Handshake::ReadyPort(port) => serialize(port)?,
            Handshake::GameStarted => serialize(GAME_STARTED)?,
        };
        Ok(payload)
    }

    pub fn decode_assignment(bytes: &[u8]) -> Result<PaddleId, ProtocolError> {
        if bytes.is_empty() {
            return Err(ProtocolError::Empty);
        }
        let paddle: i32 = deserialize(bytes)?;
        PaddleId::try_from(paddle)
    }

    pub fn decode_ready_port(bytes: &[u8]) -> Result<u16, ProtocolError> {
        if bytes.is_empty() {
            return Err(ProtocolError::Empty);
        }
        Ok(deserialize(bytes)?)
    }

    pub fn decode_game_started(bytes: &[u8]) -> Result<(), ProtocolError> {
        if bytes.is_empty() {
            return Err(ProtocolError::Empty);
        }
        let text: String = deserialize(bytes)?;
        if text == GAME_STARTED {
            Ok(())
        } else {
            Err(ProtocolError::UnexpectedText(text))
        }
    }
}
