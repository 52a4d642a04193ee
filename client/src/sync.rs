//! Client-side estimation of entities owned by someone else.
//!
//! The displayed ball and opponent paddle never use a velocity. Each frame
//! they are carried along by the motion their own earlier predictions
//! describe and moved towards the average of two dead-reckoning estimates
//! (one from received datagrams, one from those earlier predictions).
//! Received datagrams pull them towards the authoritative position.

use log::{debug, info};
use shared::{
    predict_linear, validate_ball_prediction, Ball, Blend, Bounds, CollisionType, Contact,
    EntityHistories, Paddle, PaddleId, PositionSample, Predict, RemotePaddle, Smoother, Tracked,
    Vec2, BALL_HEIGHT, BALL_SPEED, BALL_WIDTH, COURT_WIDTH, DEFLECTION_FACTOR, PADDLE_SPEED,
};

/// Horizontal jump between the displayed ball and a datagram that can only
/// mean the server re-served the ball after a point.
pub const TELEPORT_DISTANCE: f32 = COURT_WIDTH / 2.0 - BALL_WIDTH * 2.0;

/// How a received ball datagram was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallUpdate {
    /// Older than a datagram already applied.
    Stale,
    Accepted,
    /// The ball was re-centred; histories were dropped and the ball snapped.
    Teleported,
}

/// The ball as displayed by a client.
#[derive(Debug, Clone)]
pub struct BallTracker {
    pub position: Vec2,
    pub histories: EntityHistories,
    newest_remote: Option<f64>,
}

impl BallTracker {
    pub fn new() -> Self {
        Self {
            position: Ball::serve_position(),
            histories: EntityHistories::new(),
            newest_remote: None,
        }
    }

    /// Applies a ball datagram received at local time `now`.
    ///
    /// With a smoother the ball moves part of the way to the received
    /// position; without one it snaps there.
    pub fn receive(
        &mut self,
        sample: PositionSample,
        now: f64,
        smoother: Option<&Smoother>,
    ) -> BallUpdate {
        if self
            .newest_remote
            .is_some_and(|newest| sample.timestamp <= newest)
        {
            return BallUpdate::Stale;
        }
        self.newest_remote = Some(sample.timestamp);

        let sample = sample.restamped(now);
        self.histories.received.insert(sample);

        let Some(smoother) = smoother else {
            self.position = sample.position();
            return BallUpdate::Accepted;
        };

        if (sample.x - self.position.x).abs() >= TELEPORT_DISTANCE {
            info!("Ball re-served at ({:.1}, {:.1})", sample.x, sample.y);
            self.position = sample.position();
            self.histories.clear();
            self.histories.received.insert(sample);
            return BallUpdate::Teleported;
        }

        self.position = smoother.step(self.position, sample.position());
        BallUpdate::Accepted
    }

    /// Moves the ball for a frame of `frame_dt` seconds ending at `now`.
    ///
    /// The ball is carried by the motion of its earlier predictions, at most
    /// one frame of ball travel per axis, then moved towards the averaged
    /// message and prediction estimates. `paddles` are the top-left corners
    /// used for tunneling checks.
    pub fn extrapolate(
        &mut self,
        now: f64,
        frame_dt: f64,
        paddles: &[Vec2],
        smoother: &Smoother,
    ) -> Option<Blend> {
        let blend = self.blend(now, paddles)?;

        let step = ball_step(frame_dt);
        let carry = blend
            .carry
            .clamp_each(Vec2::new(step, DEFLECTION_FACTOR * step));
        let carried = validate_ball_prediction(self.position, self.position + carry, paddles);
        self.position = smoother.step(carried, blend.target);
        Some(blend)
    }

    /// Continues the ball along its own displayed path.
    ///
    /// The current position is recorded, extrapolated to the end of the next
    /// frame, smoothed and checked for tunneling.
    pub fn observe(&mut self, now: f64, frame_dt: f64, paddles: &[Vec2], smoother: &Smoother) {
        self.histories
            .observed
            .insert(PositionSample::new(now, self.position, true, 0));

        let ahead = predict_linear(&self.histories.observed, self.position, now + frame_dt);
        let stepped = smoother.step(self.position, ahead.position());
        self.position = validate_ball_prediction(self.position, stepped, paddles);
    }

    /// Pushes the ball out of a paddle it overlaps.
    ///
    /// `step` is the distance the ball would travel in one frame; the ball
    /// moves that far towards the court centre and, for the outer thirds,
    /// a proportional amount up or down.
    pub fn bounce_off_paddle(&mut self, contact: Contact, step: f32) {
        self.position.x += contact.penetration;
        if self.position.x < COURT_WIDTH / 2.0 {
            self.position.x += step;
        } else {
            self.position.x -= step;
        }

        match contact.kind {
            CollisionType::Top => self.position.y -= DEFLECTION_FACTOR * step,
            CollisionType::Bottom => self.position.y += DEFLECTION_FACTOR * step,
            _ => {}
        }
    }

    /// Pushes the ball back inside after touching the top or bottom wall.
    pub fn bounce_off_wall(&mut self, contact: Contact, step: f32) {
        match contact.kind {
            CollisionType::Top => self.position.y += contact.penetration + step,
            CollisionType::Bottom => self.position.y += contact.penetration - step,
            _ => {}
        }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_origin(self.position, BALL_WIDTH, BALL_HEIGHT)
    }
}

impl Default for BallTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracked for BallTracker {
    type Context = [Vec2];

    fn position(&self) -> Vec2 {
        self.position
    }

    fn histories(&self) -> &EntityHistories {
        &self.histories
    }

    fn histories_mut(&mut self) -> &mut EntityHistories {
        &mut self.histories
    }

    fn constrain(&self, predicted: Vec2, paddles: &[Vec2]) -> Vec2 {
        validate_ball_prediction(self.position, predicted, paddles)
    }
}

/// Distance the ball covers in `dt` seconds, used for display bounces.
pub fn ball_step(dt: f64) -> f32 {
    BALL_SPEED * dt as f32
}

/// The opponent's paddle as displayed by a client.
#[derive(Debug, Clone)]
pub struct OpponentTracker {
    remote: RemotePaddle,
}

impl OpponentTracker {
    pub fn new(id: PaddleId) -> Self {
        Self {
            remote: RemotePaddle::new(id),
        }
    }

    pub fn id(&self) -> PaddleId {
        self.remote.id()
    }

    pub fn position(&self) -> Vec2 {
        self.remote.paddle.position
    }

    pub fn paddle(&self) -> &Paddle {
        &self.remote.paddle
    }

    pub fn histories(&self) -> &EntityHistories {
        &self.remote.histories
    }

    /// Applies a relayed paddle datagram received at local time `now`.
    /// Returns false for stale samples.
    pub fn receive(&mut self, sample: PositionSample, now: f64, smoother: Option<&Smoother>) -> bool {
        if !self.remote.accept(sample, now) {
            return false;
        }

        match smoother {
            Some(smoother) => {
                let target = Vec2::new(self.remote.paddle.position.x, sample.y);
                let stepped = smoother.step(self.remote.paddle.position, target);
                self.remote.paddle.position = self.remote.constrain(stepped, &());
            }
            None => self.remote.snap_to_latest(),
        }
        true
    }

    /// Moves the paddle for a frame of `frame_dt` seconds ending at `now`,
    /// the same way [`BallTracker::extrapolate`] moves the ball.
    pub fn extrapolate(&mut self, now: f64, frame_dt: f64, smoother: &Smoother) {
        let Some(estimate) = self.remote.estimate(now) else {
            return;
        };
        debug!("Opponent estimate y={:.1}", estimate.target.y);

        let travel = PADDLE_SPEED * frame_dt as f32;
        let carry = estimate.carry.clamp_each(Vec2::new(0.0, travel));
        let stepped = smoother.step(self.remote.paddle.position + carry, estimate.target);
        self.remote.paddle.position = self.remote.constrain(stepped, &());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::{check_paddle_collision, check_wall_collision, PADDLE_WIDTH};

    fn ball_sample(t: f64, x: f32, y: f32) -> PositionSample {
        PositionSample::new(t, Vec2::new(x, y), true, 4444)
    }

    fn full_smoothing() -> Smoother {
        let mut smoother = Smoother::new();
        smoother.update(1.0);
        smoother
    }

    fn paddles() -> Vec<Vec2> {
        PaddleId::ALL.iter().map(|id| id.home_position()).collect()
    }

    #[test]
    fn test_receive_snaps_without_smoothing() {
        let mut ball = BallTracker::new();
        let update = ball.receive(ball_sample(1.0, 600.0, 200.0), 5.0, None);

        assert_eq!(update, BallUpdate::Accepted);
        assert_eq!(ball.position, Vec2::new(600.0, 200.0));
        // restamped with local time
        assert_eq!(ball.histories.received.newest().unwrap().timestamp, 5.0);
    }

    #[test]
    fn test_receive_ignores_stale_datagrams() {
        let mut ball = BallTracker::new();
        ball.receive(ball_sample(2.0, 600.0, 200.0), 5.0, None);
        let update = ball.receive(ball_sample(1.5, 10.0, 10.0), 5.1, None);

        assert_eq!(update, BallUpdate::Stale);
        assert_eq!(ball.position, Vec2::new(600.0, 200.0));
        assert_eq!(ball.histories.received.len(), 1);
    }

    #[test]
    fn test_receive_interpolates_towards_message() {
        let mut smoother = Smoother::new();
        smoother.update(0.004);
        let mut ball = BallTracker::new();
        let start = ball.position;

        ball.receive(ball_sample(1.0, start.x + 100.0, start.y), 1.0, Some(&smoother));

        assert!(ball.position.x > start.x);
        assert!(ball.position.x < start.x + 100.0);
    }

    #[test]
    fn test_teleport_clears_histories() {
        let smoother = Smoother::new();
        let mut ball = BallTracker::new();
        ball.position = Vec2::new(1260.0, 300.0);
        ball.histories
            .predicted
            .insert(ball_sample(0.5, 1250.0, 300.0));
        ball.histories
            .observed
            .insert(ball_sample(0.5, 1258.0, 300.0));
        ball.receive(ball_sample(1.0, 1255.0, 300.0), 1.0, Some(&smoother));

        let update = ball.receive(ball_sample(1.1, 632.5, 352.5), 1.1, Some(&smoother));

        assert_eq!(update, BallUpdate::Teleported);
        assert_eq!(ball.position, Vec2::new(632.5, 352.5));
        assert_eq!(ball.histories.received.len(), 1);
        assert!(ball.histories.predicted.is_empty());
        assert!(ball.histories.observed.is_empty());
    }

    #[test]
    fn test_reserved_ball_stays_centred() {
        let mut smoother = Smoother::new();
        smoother.update(0.004);
        let paddles = paddles();
        let mut ball = BallTracker::new();
        ball.position = Vec2::new(1250.0, 100.0);

        let mut now = 1.0;
        for _ in 0..5 {
            ball.position.x += 2.0;
            ball.observe(now, 0.004, &paddles, &smoother);
            now += 0.004;
        }

        let update = ball.receive(ball_sample(now, 632.5, 352.5), now, Some(&smoother));
        assert_eq!(update, BallUpdate::Teleported);

        for _ in 0..30 {
            now += 0.004;
            ball.observe(now, 0.004, &paddles, &smoother);
        }
        assert_eq!(ball.position, Ball::serve_position());
    }

    #[test]
    fn test_extrapolate_needs_history() {
        let smoother = full_smoothing();
        let mut ball = BallTracker::new();
        let start = ball.position;

        ball.extrapolate(1.0, 0.1, &paddles(), &smoother);

        assert_eq!(ball.position, start);
        assert!(ball.histories.predicted.is_empty());
    }

    #[test]
    fn test_extrapolate_records_message_estimate() {
        let smoother = full_smoothing();
        let mut ball = BallTracker::new();
        ball.receive(ball_sample(0.0, 400.0, 300.0), 1.0, None);
        ball.receive(ball_sample(0.1, 450.0, 300.0), 1.1, None);

        ball.extrapolate(1.2, 0.1, &paddles(), &smoother);

        // message estimate is x=500; there were no earlier predictions,
        // so the average is taken with the current x=450
        let recorded = ball.histories.predicted.newest().unwrap();
        assert_approx_eq!(recorded.x, 500.0, 1e-3);
        assert_approx_eq!(ball.position.x, 475.0, 1e-2);

        // an unchanged estimate is not recorded twice
        ball.extrapolate(1.2, 0.1, &paddles(), &smoother);
        assert_eq!(ball.histories.predicted.len(), 1);
    }

    #[test]
    fn test_extrapolate_does_not_tunnel_through_paddle() {
        let smoother = full_smoothing();
        let paddles = paddles();
        let left = paddles[0];
        let mut ball = BallTracker::new();
        let y = left.y + 30.0;
        ball.receive(ball_sample(0.0, 200.0, y), 1.0, None);
        ball.receive(ball_sample(0.1, 100.0, y), 1.1, None);

        ball.extrapolate(1.3, 0.1, &paddles, &smoother);

        let recorded = ball.histories.predicted.newest().unwrap();
        assert_approx_eq!(recorded.x, left.x + PADDLE_WIDTH - 1.0, 1e-3);
        assert!(ball.position.x >= left.x);
    }

    #[test]
    fn test_estimates_differ_after_bounce() {
        let mut smoother = Smoother::new();
        smoother.update(0.004);
        let paddles = paddles();
        let mut ball = BallTracker::new();
        ball.receive(ball_sample(0.0, 400.0, 300.0), 1.0, None);
        ball.receive(ball_sample(0.1, 450.0, 300.0), 1.1, None);

        for i in 0..25 {
            let now = 1.1 + i as f64 * 0.004;
            let blend = ball.extrapolate(now, 0.004, &paddles, &smoother).unwrap();
            if blend.from_predictions.is_extrapolated() {
                // steady motion: both estimates agree
                assert_approx_eq!(
                    blend.from_predictions.position().x,
                    blend.from_messages.position().x,
                    1e-2
                );
            }
        }

        // the server bounced the ball; earlier predictions still head right
        ball.receive(ball_sample(0.2, 430.0, 300.0), 1.2, Some(&smoother));
        let blend = ball.extrapolate(1.2, 0.004, &paddles, &smoother).unwrap();

        assert_approx_eq!(blend.from_messages.position().x, 430.0, 1e-2);
        assert_approx_eq!(blend.from_predictions.position().x, 500.0, 1e-2);
        assert_approx_eq!(blend.target.x, 465.0, 1e-2);
    }

    #[test]
    fn test_carry_limited_to_one_frame_of_travel() {
        let smoother = Smoother::new();
        let mut ball = BallTracker::new();
        ball.position = Vec2::new(600.0, 300.0);
        ball.histories.predicted.insert(ball_sample(1.0, 600.0, 300.0));
        ball.histories.predicted.insert(ball_sample(1.004, 640.0, 280.0));

        let blend = ball.extrapolate(1.008, 0.004, &paddles(), &smoother).unwrap();

        assert_approx_eq!(blend.carry.x, 40.0, 1e-2);
        // 2 px right, 1.5 px up, plus a small pull towards the target
        assert!(ball.position.x > 602.0 && ball.position.x < 603.0);
        assert!(ball.position.y < 298.5 && ball.position.y > 297.0);
    }

    #[test]
    fn test_observe_continues_motion() {
        let smoother = full_smoothing();
        let mut ball = BallTracker::new();
        ball.position = Vec2::new(600.0, 300.0);
        ball.observe(1.0, 0.1, &paddles(), &smoother);
        assert_eq!(ball.position, Vec2::new(600.0, 300.0));

        ball.position = Vec2::new(610.0, 300.0);
        ball.observe(1.1, 0.1, &paddles(), &smoother);

        assert_approx_eq!(ball.position.x, 620.0, 1e-3);
        assert_eq!(ball.histories.observed.newest().unwrap().timestamp, 1.1);
        // the displayed path never feeds the prediction history
        assert!(ball.histories.predicted.is_empty());
    }

    #[test]
    fn test_bounce_off_paddle_moves_towards_centre() {
        let paddle = Paddle::new(PaddleId::One);
        let mut ball = BallTracker::new();
        ball.position = Vec2::new(paddle.position.x + PADDLE_WIDTH - 2.0, paddle.position.y);

        let contact = check_paddle_collision(ball.bounds(), paddle.bounds());
        assert_eq!(contact.kind, CollisionType::Top);
        ball.bounce_off_paddle(contact, 2.0);

        assert_approx_eq!(ball.position.x, paddle.position.x + PADDLE_WIDTH + 2.0, 1e-4);
        assert_approx_eq!(ball.position.y, paddle.position.y - 1.5, 1e-4);
    }

    #[test]
    fn test_bounce_off_wall_stays_inside() {
        let mut ball = BallTracker::new();
        ball.position = Vec2::new(400.0, -3.0);
        let contact = check_wall_collision(ball.bounds());

        ball.bounce_off_wall(contact, 2.0);

        assert_approx_eq!(ball.position.y, 2.0, 1e-4);
        assert_approx_eq!(ball_step(0.004), 2.0, 1e-4);
    }

    #[test]
    fn test_opponent_receive_and_extrapolate() {
        let smoother = full_smoothing();
        let mut opponent = OpponentTracker::new(PaddleId::Two);
        let x = opponent.position().x;

        assert!(opponent.receive(PositionSample::new(0.0, Vec2::new(x, 100.0), false, 1), 1.0, None));
        assert_eq!(opponent.position().y, 100.0);
        assert!(!opponent.receive(PositionSample::new(0.0, Vec2::new(x, 120.0), false, 1), 1.1, None));

        opponent.receive(
            PositionSample::new(0.1, Vec2::new(x, 110.0), false, 1),
            1.1,
            Some(&smoother),
        );
        assert_approx_eq!(opponent.position().y, 110.0, 1e-3);

        opponent.extrapolate(1.2, 0.1, &smoother);
        assert!(opponent.position().y > 110.0);
        assert_eq!(opponent.position().x, x);
    }
}
