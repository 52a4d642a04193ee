//! Position estimation for a paddle driven by another process.
//!
//! Used by the server for both paddles and by each client for the
//! opponent's paddle.

use crate::entity::{clamp_paddle_y, Paddle, PaddleId};
use crate::history::EntityHistories;
use crate::math::Vec2;
use crate::prediction::{Blend, Predict, Tracked};
use crate::protocol::PositionSample;

#[derive(Debug, Clone)]
pub struct RemotePaddle {
    pub paddle: Paddle,
    pub histories: EntityHistories,
    /// Sender timestamp of the newest accepted sample.
    newest_remote: Option<f64>,
}

impl RemotePaddle {
    pub fn new(id: PaddleId) -> Self {
        Self {
            paddle: Paddle::new(id),
            histories: EntityHistories::new(),
            newest_remote: None,
        }
    }

    pub fn id(&self) -> PaddleId {
        self.paddle.id
    }

    /// Stores `sample` restamped with local time `now`, provided its sender
    /// timestamp is newer than every sample accepted so far.
    pub fn accept(&mut self, sample: PositionSample, now: f64) -> bool {
        if self
            .newest_remote
            .is_some_and(|newest| sample.timestamp <= newest)
        {
            return false;
        }
        self.newest_remote = Some(sample.timestamp);
        self.histories.received.insert(sample.restamped(now));
        true
    }

    /// Both estimates of where the paddle is at `now`, see [`Predict::blend`].
    ///
    /// Returns `None` while neither history can extrapolate.
    pub fn estimate(&mut self, now: f64) -> Option<Blend> {
        self.blend(now, &())
    }

    /// Moves the paddle straight to the newest received position.
    pub fn snap_to_latest(&mut self) {
        if let Some(latest) = self.histories.received.newest() {
            self.paddle.position = self.constrain(latest.position(), &());
        }
    }

    pub fn reset(&mut self) {
        self.paddle.reset();
        self.histories.clear();
        self.newest_remote = None;
    }
}

impl Tracked for RemotePaddle {
    type Context = ();

    fn position(&self) -> Vec2 {
        self.paddle.position
    }

    fn histories(&self) -> &EntityHistories {
        &self.histories
    }

    fn histories_mut(&mut self) -> &mut EntityHistories {
        &mut self.histories
    }

    /// Paddles only move vertically and stay on the court.
    fn constrain(&self, predicted: Vec2, _: &()) -> Vec2 {
        Vec2::new(self.paddle.position.x, clamp_paddle_y(predicted.y))
    }
}
