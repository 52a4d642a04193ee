//! Tunneling correction for predicted ball positions.
//!
//! A single prediction step can move the ball further than a paddle is
//! thick, so a per-frame overlap test may never see the contact. The ball's
//! swept path between its last confirmed and its predicted position is
//! approximated by two segments (its top and bottom edge) and checked
//! against the paddle face it would have crossed.

use crate::math::Vec2;
use crate::{BALL_HEIGHT, BALL_WIDTH, COURT_WIDTH, PADDLE_HEIGHT, PADDLE_WIDTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Collinear,
    Clockwise,
    CounterClockwise,
}

/// Orientation of the ordered triplet `(p, q, r)`.
pub fn orientation(p: Vec2, q: Vec2, r: Vec2) -> Orientation {
    let cross = (q.y - p.y) * (r.x - q.x) - (q.x - p.x) * (r.y - q.y);
    if cross == 0.0 {
        Orientation::Collinear
    } else if cross > 0.0 {
        Orientation::Clockwise
    } else {
        Orientation::CounterClockwise
    }
}

/// For collinear `p`, `q`, `r`: whether `q` lies on segment `pr`.
pub fn on_segment(p: Vec2, q: Vec2, r: Vec2) -> bool {
    q.x <= p.x.max(r.x) && q.x >= p.x.min(r.x) && q.y <= p.y.max(r.y) && q.y >= p.y.min(r.y)
}

/// Whether segment `p1q1` intersects segment `p2q2`, touching included.
pub fn segments_intersect(p1: Vec2, q1: Vec2, p2: Vec2, q2: Vec2) -> bool {
    let o1 = orientation(p1, q1, p2);
    let o2 = orientation(p1, q1, q2);
    let o3 = orientation(p2, q2, p1);
    let o4 = orientation(p2, q2, q1);

    if o1 != o2 && o3 != o4 {
        return true;
    }

    (o1 == Orientation::Collinear && on_segment(p1, p2, q1))
        || (o2 == Orientation::Collinear && on_segment(p1, q2, q1))
        || (o3 == Orientation::Collinear && on_segment(p2, p1, q2))
        || (o4 == Orientation::Collinear && on_segment(p2, q1, q2))
}

/// Clamps `predicted` against every paddle in `paddles` (top-left corners).
///
/// For a paddle in the left half the swept path runs from the ball's last
/// left edge to its predicted right edge and is tested against the paddle's
/// left face; on a hit the ball is placed one unit inside the paddle's right
/// face. The right half mirrors this. Only the x coordinate is changed.
pub fn validate_ball_prediction(last: Vec2, predicted: Vec2, paddles: &[Vec2]) -> Vec2 {
    let mut validated = predicted;

    for paddle in paddles {
        if paddle.x < COURT_WIDTH / 2.0 {
            let face_top = Vec2::new(paddle.x, paddle.y);
            let face_bottom = Vec2::new(paddle.x, paddle.y + PADDLE_HEIGHT);
            let from_x = last.x;
            let to_x = validated.x + BALL_WIDTH;

            if swept_edges_cross(last, validated, from_x, to_x, face_top, face_bottom) {
                validated.x = paddle.x + PADDLE_WIDTH - 1.0;
            }
        } else {
            let face_x = paddle.x + PADDLE_WIDTH;
            let face_top = Vec2::new(face_x, paddle.y);
            let face_bottom = Vec2::new(face_x, paddle.y + PADDLE_HEIGHT);
            let from_x = last.x + BALL_WIDTH;
            let to_x = validated.x;

            if swept_edges_cross(last, validated, from_x, to_x, face_top, face_bottom) {
                validated.x = paddle.x - BALL_WIDTH + 1.0;
            }
        }
    }

    validated
}

fn swept_edges_cross(
    last: Vec2,
    predicted: Vec2,
    from_x: f32,
    to_x: f32,
    face_top: Vec2,
    face_bottom: Vec2,
) -> bool {
    let top_from = Vec2::new(from_x, last.y);
    let top_to = Vec2::new(to_x, predicted.y);
    let bottom_from = Vec2::new(from_x, last.y + BALL_HEIGHT);
    let bottom_to = Vec2::new(to_x, predicted.y + BALL_HEIGHT);

    segments_intersect(top_from, top_to, face_top, face_bottom)
        || segments_intersect(bottom_from, bottom_to, face_top, face_bottom)
}
