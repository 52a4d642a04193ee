use crate::entity::Bounds;
use crate::{COURT_HEIGHT, COURT_WIDTH, PADDLE_HEIGHT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionType {
    #[default]
    None,
    Top,
    Middle,
    Bottom,
    Left,
    Right,
}

/// Result of a single collision check.
///
/// `penetration` is the signed distance that separates the ball from what it
/// hit: horizontal for paddle contacts, vertical for top and bottom walls.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Contact {
    pub kind: CollisionType,
    pub penetration: f32,
}

impl Contact {
    pub fn is_hit(&self) -> bool {
        self.kind != CollisionType::None
    }
}

/// Classifies a ball/paddle overlap.
///
/// The penetration sign follows the half of the court the ball is in: in the
/// left half the ball is pushed right out of the paddle's right face, in the
/// right half it is pushed left out of the paddle's left face. The contact
/// zone is the third of the paddle height holding the ball's bottom edge.
pub fn check_paddle_collision(ball: Bounds, paddle: Bounds) -> Contact {
    if !ball.overlaps(&paddle) {
        return Contact::default();
    }

    let penetration = if ball.left + (ball.right - ball.left) / 2.0 < COURT_WIDTH / 2.0 {
        paddle.right - ball.left
    } else {
        paddle.left - ball.right
    };

    let range_upper = paddle.bottom - 2.0 * PADDLE_HEIGHT / 3.0;
    let range_middle = paddle.bottom - PADDLE_HEIGHT / 3.0;

    let kind = if ball.bottom > paddle.top && ball.bottom < range_upper {
        CollisionType::Top
    } else if ball.bottom > range_upper && ball.bottom < range_middle {
        CollisionType::Middle
    } else {
        CollisionType::Bottom
    };

    Contact { kind, penetration }
}

/// Checks the ball against the court edges. Side walls take priority.
pub fn check_wall_collision(ball: Bounds) -> Contact {
    if ball.left < 0.0 {
        Contact {
            kind: CollisionType::Left,
            penetration: 0.0,
        }
    } else if ball.right > COURT_WIDTH {
        Contact {
            kind: CollisionType::Right,
            penetration: 0.0,
        }
    } else if ball.top < 0.0 {
        Contact {
            kind: CollisionType::Top,
            penetration: -ball.top,
        }
    } else if ball.bottom > COURT_HEIGHT {
        Contact {
            kind: CollisionType::Bottom,
            penetration: COURT_HEIGHT - ball.bottom,
        }
    } else {
        Contact::default()
    }
}
