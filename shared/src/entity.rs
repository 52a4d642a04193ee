use crate::math::Vec2;
use crate::protocol::ProtocolError;
use crate::{
    BALL_HEIGHT, BALL_SPEED, BALL_WIDTH, COURT_HEIGHT, COURT_WIDTH, PADDLE_HEIGHT, PADDLE_INSET,
    PADDLE_WIDTH,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one of the two paddles; paddle one defends the left side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaddleId {
    One,
    Two,
}

impl PaddleId {
    pub const ALL: [PaddleId; 2] = [PaddleId::One, PaddleId::Two];

    pub fn as_i32(self) -> i32 {
        match self {
            PaddleId::One => 1,
            PaddleId::Two => 2,
        }
    }

    pub fn opponent(self) -> PaddleId {
        match self {
            PaddleId::One => PaddleId::Two,
            PaddleId::Two => PaddleId::One,
        }
    }

    /// Resting position at the start of a game.
    pub fn home_position(self) -> Vec2 {
        let y = COURT_HEIGHT / 2.0 - PADDLE_HEIGHT / 2.0;
        match self {
            PaddleId::One => Vec2::new(PADDLE_INSET, y),
            PaddleId::Two => Vec2::new(COURT_WIDTH - PADDLE_INSET, y),
        }
    }
}

impl TryFrom<i32> for PaddleId {
    type Error = ProtocolError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(PaddleId::One),
            2 => Ok(PaddleId::Two),
            other => Err(ProtocolError::InvalidPaddleId(other)),
        }
    }
}

impl fmt::Display for PaddleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

/// Axis-aligned rectangle in court coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Bounds {
    pub fn from_origin(origin: Vec2, width: f32, height: f32) -> Self {
        Self {
            left: origin.x,
            top: origin.y,
            right: origin.x + width,
            bottom: origin.y + height,
        }
    }

    /// Strict overlap: rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Bounds) -> bool {
        !(self.left >= other.right
            || self.right <= other.left
            || self.top >= other.bottom
            || self.bottom <= other.top)
    }
}

/// Keeps a paddle's top edge inside `[0, COURT_HEIGHT - PADDLE_HEIGHT]`.
pub fn clamp_paddle_y(y: f32) -> f32 {
    y.clamp(0.0, COURT_HEIGHT - PADDLE_HEIGHT)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paddle {
    pub id: PaddleId,
    /// Top-left corner.
    pub position: Vec2,
    /// Only meaningful for a locally controlled paddle.
    pub velocity: Vec2,
}

impl Paddle {
    pub fn new(id: PaddleId) -> Self {
        Self {
            id,
            position: id.home_position(),
            velocity: Vec2::ZERO,
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.position += self.velocity * dt;
        self.position.y = clamp_paddle_y(self.position.y);
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_origin(self.position, PADDLE_WIDTH, PADDLE_HEIGHT)
    }

    pub fn reset(&mut self) {
        self.position = self.id.home_position();
        self.velocity = Vec2::ZERO;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    /// Top-left corner.
    pub position: Vec2,
    /// Authoritative side only; clients derive motion from position history.
    pub velocity: Vec2,
}

impl Ball {
    /// Centre of the court, matching the position the ball is served from.
    pub fn serve_position() -> Vec2 {
        Vec2::new(
            COURT_WIDTH / 2.0 - BALL_WIDTH / 2.0,
            COURT_HEIGHT / 2.0 - BALL_HEIGHT / 2.0,
        )
    }

    pub fn new() -> Self {
        Self {
            position: Self::serve_position(),
            velocity: Vec2::new(BALL_SPEED, 0.0),
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.position += self.velocity * dt;
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_origin(self.position, BALL_WIDTH, BALL_HEIGHT)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Ball {
    fn default() -> Self {
        Self::new()
    }
}
