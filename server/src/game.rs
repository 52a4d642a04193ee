//! Authoritative game world: ball integration, collision response and scoring.

use log::{debug, info};
use shared::{
    check_paddle_collision, check_wall_collision, Ball, CollisionType, Contact, PaddleId,
    PositionSample, RemotePaddle, Score, Vec2, BALL_SPEED, DEFLECTION_FACTOR,
};

/// What a single simulation step changed beyond positions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickOutcome {
    pub paddle_hit: Option<(PaddleId, CollisionType)>,
    pub wall_hit: Option<CollisionType>,
    /// Set when a point was scored during this tick.
    pub scored: Option<PaddleId>,
    /// Set when that point decided the game.
    pub winner: Option<PaddleId>,
}

/// Reverses horizontal motion and pushes the ball out of the paddle.
/// Top and bottom thirds deflect the ball; the middle third keeps its angle.
pub fn collide_with_paddle(ball: &mut Ball, contact: Contact) {
    ball.position.x += contact.penetration;
    ball.velocity.x = -ball.velocity.x;

    match contact.kind {
        CollisionType::Top => ball.velocity.y = -DEFLECTION_FACTOR * BALL_SPEED,
        CollisionType::Bottom => ball.velocity.y = DEFLECTION_FACTOR * BALL_SPEED,
        _ => {}
    }
}

/// Bounces off top and bottom walls. Side walls re-serve the ball towards
/// the player who just conceded.
pub fn collide_with_wall(ball: &mut Ball, contact: Contact) {
    match contact.kind {
        CollisionType::Top | CollisionType::Bottom => {
            ball.position.y += contact.penetration;
            ball.velocity.y = -ball.velocity.y;
        }
        CollisionType::Left => {
            ball.position = Ball::serve_position();
            ball.velocity = Vec2::new(BALL_SPEED, DEFLECTION_FACTOR * BALL_SPEED);
        }
        CollisionType::Right => {
            ball.position = Ball::serve_position();
            ball.velocity = Vec2::new(-BALL_SPEED, DEFLECTION_FACTOR * BALL_SPEED);
        }
        _ => {}
    }
}

#[derive(Debug, Clone)]
pub struct World {
    pub ball: Ball,
    pub paddles: [RemotePaddle; 2],
    pub score: Score,
    winning_score: u32,
}

impl World {
    pub fn new(winning_score: u32) -> Self {
        Self {
            ball: Ball::new(),
            paddles: PaddleId::ALL.map(RemotePaddle::new),
            score: Score::default(),
            winning_score,
        }
    }

    pub fn paddle(&self, id: PaddleId) -> &RemotePaddle {
        &self.paddles[Self::index(id)]
    }

    pub fn paddle_mut(&mut self, id: PaddleId) -> &mut RemotePaddle {
        &mut self.paddles[Self::index(id)]
    }

    fn index(id: PaddleId) -> usize {
        match id {
            PaddleId::One => 0,
            PaddleId::Two => 1,
        }
    }

    /// Feeds a paddle position datagram into that paddle's history.
    pub fn accept_paddle_sample(&mut self, id: PaddleId, sample: PositionSample, now: f64) -> bool {
        self.paddle_mut(id).accept(sample, now)
    }

    /// Advances the world by `dt` seconds; `now` is the session time used
    /// to estimate paddle positions.
    pub fn tick(&mut self, dt: f32, now: f64) -> TickOutcome {
        for remote in &mut self.paddles {
            if let Some(estimate) = remote.estimate(now) {
                remote.paddle.position = estimate.target;
            }
        }

        self.ball.update(dt);

        let mut outcome = TickOutcome::default();

        for remote in &self.paddles {
            let contact = check_paddle_collision(self.ball.bounds(), remote.paddle.bounds());
            if contact.is_hit() {
                debug!("Paddle {} collision ({:?})", remote.id(), contact.kind);
                collide_with_paddle(&mut self.ball, contact);
                outcome.paddle_hit = Some((remote.id(), contact.kind));
                return outcome;
            }
        }

        let contact = check_wall_collision(self.ball.bounds());
        if !contact.is_hit() {
            return outcome;
        }

        collide_with_wall(&mut self.ball, contact);
        let scorer = match contact.kind {
            CollisionType::Left => PaddleId::Two,
            CollisionType::Right => PaddleId::One,
            other => {
                outcome.wall_hit = Some(other);
                return outcome;
            }
        };

        self.score.award(scorer);
        info!(
            "Player {} scored ({} - {})",
            scorer, self.score.player_one, self.score.player_two
        );
        outcome.scored = Some(scorer);
        outcome.winner = self.score.winner(self.winning_score);
        outcome
    }

    /// Restores the state of a fresh game.
    pub fn reset(&mut self) {
        self.ball.reset();
        for remote in &mut self.paddles {
            remote.reset();
        }
        self.score.reset();
    }
}
