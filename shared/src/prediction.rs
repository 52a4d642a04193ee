//! Linear dead reckoning over a [`TemporalHistory`].
//!
//! Remote entities carry no trusted velocity: motion is always derived
//! from the two most recent samples of one of the entity's histories.
//! [`Tracked`] is implemented once per entity kind and supplies the
//! entity-specific constraint (screen clamp for paddles, tunneling check
//! for the ball); [`Predict`] is the shared algorithm on top.

use crate::history::{EntityHistories, HistoryKind, TemporalHistory, Timestamped};
use crate::interpolation::average;
use crate::math::Vec2;
use crate::protocol::PositionSample;

/// Result of a prediction request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prediction {
    /// Not enough usable samples; carries the current position untouched.
    Unchanged(Vec2),
    Extrapolated(Vec2),
}

impl Prediction {
    pub fn position(&self) -> Vec2 {
        match *self {
            Prediction::Unchanged(position) | Prediction::Extrapolated(position) => position,
        }
    }

    pub fn is_extrapolated(&self) -> bool {
        matches!(self, Prediction::Extrapolated(_))
    }
}

/// Extrapolates the two most recent samples of `history` to `target`.
///
/// With fewer than two samples, a non-positive time delta between them,
/// or a non-finite result, returns `Prediction::Unchanged(current)`.
pub fn predict_linear<T: Timestamped>(
    history: &TemporalHistory<T>,
    current: Vec2,
    target: f64,
) -> Prediction {
    let Some((previous, latest)) = history.pair() else {
        return Prediction::Unchanged(current);
    };

    let dt = latest.timestamp() - previous.timestamp();
    if !(dt > 0.0) {
        return Prediction::Unchanged(current);
    }

    let from = latest.position();
    let delta = from - previous.position();
    let ahead = target - latest.timestamp();

    // f64 keeps small deltas over long sessions accurate
    let x = from.x as f64 + delta.x as f64 / dt * ahead;
    let y = from.y as f64 + delta.y as f64 / dt * ahead;
    let predicted = Vec2::new(x as f32, y as f32);

    if predicted.is_finite() {
        Prediction::Extrapolated(predicted)
    } else {
        Prediction::Unchanged(current)
    }
}

/// An entity whose motion is reconstructed from position history.
pub trait Tracked {
    /// Extra state needed by [`Tracked::constrain`], such as paddle geometry.
    type Context: ?Sized;

    fn position(&self) -> Vec2;

    fn histories(&self) -> &EntityHistories;

    fn histories_mut(&mut self) -> &mut EntityHistories;

    /// Applies the entity's physical limits to an extrapolated position.
    fn constrain(&self, predicted: Vec2, context: &Self::Context) -> Vec2;
}

/// The two estimates of an entity for one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blend {
    pub from_messages: Prediction,
    pub from_predictions: Prediction,
    /// Per-axis average of both estimates.
    pub target: Vec2,
    /// Displacement the prediction history expects between its newest entry
    /// and the requested instant. Zero while it cannot extrapolate.
    pub carry: Vec2,
}

pub trait Predict: Tracked {
    fn predict(&self, kind: HistoryKind, target: f64, context: &Self::Context) -> Prediction {
        match predict_linear(self.histories().get(kind), self.position(), target) {
            Prediction::Extrapolated(raw) => {
                Prediction::Extrapolated(self.constrain(raw, context))
            }
            unchanged => unchanged,
        }
    }

    /// Estimates the entity at `now` from received samples and from its own
    /// earlier predictions, then records the message-based estimate.
    ///
    /// The prediction history is read before this call writes to it, so the
    /// prediction-based estimate only reflects earlier instants. At most one
    /// estimate is recorded per instant. Returns `None` while neither history
    /// can extrapolate.
    fn blend(&mut self, now: f64, context: &Self::Context) -> Option<Blend> {
        let from_predictions = self.predict(HistoryKind::Predicted, now, context);
        let carry = match (from_predictions, self.histories().predicted.newest()) {
            (Prediction::Extrapolated(position), Some(newest)) => position - newest.position(),
            _ => Vec2::ZERO,
        };

        let from_messages = self.predict(HistoryKind::Received, now, context);
        if let Prediction::Extrapolated(position) = from_messages {
            let histories = self.histories_mut();
            let fresh = histories
                .predicted
                .newest()
                .map_or(true, |newest| newest.timestamp < now);
            if fresh {
                let is_ball = histories.received.newest().is_some_and(|s| s.is_ball);
                histories
                    .predicted
                    .insert(PositionSample::new(now, position, is_ball, 0));
            }
        }

        if !from_messages.is_extrapolated() && !from_predictions.is_extrapolated() {
            return None;
        }

        Some(Blend {
            from_messages,
            from_predictions,
            target: average(from_messages.position(), from_predictions.position()),
            carry,
        })
    }
}

impl<T: Tracked + ?Sized> Predict for T {}
