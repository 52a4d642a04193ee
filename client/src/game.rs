use crate::input::FrameInput;
use crate::sync::{ball_step, BallTracker, BallUpdate, OpponentTracker};
use log::{debug, info};
use shared::{
    check_paddle_collision, check_wall_collision, ControlMessage, Cooldown, Paddle, PaddleId,
    PositionSample, Score, Smoother, Vec2, COLLISION_COOLDOWN, LOG_INTERVAL, PADDLE_SPEED,
};

/// Something the frontend may want to react to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClientEvent {
    Assigned(PaddleId),
    GameStarted,
    PaddleHit(PaddleId),
    WallHit,
    BallReserved,
    ScoreChanged(Score),
    PredictionToggled(bool),
    Won,
    Lost,
    OpponentLeft,
    /// The server dropped the control connection without a game result.
    Disconnected,
}

/// Read-only snapshot handed to the frontend every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayState {
    pub own_id: PaddleId,
    pub paddle_one: Vec2,
    pub paddle_two: Vec2,
    pub ball: Vec2,
    pub score: Score,
    pub prediction_enabled: bool,
}

/// Everything one client knows about the game in progress.
#[derive(Debug, Clone)]
pub struct ClientGameState {
    pub own: Paddle,
    pub opponent: OpponentTracker,
    pub ball: BallTracker,
    pub score: Score,
    smoother: Smoother,
    prediction_enabled: bool,
    collision_cooldown: Cooldown,
    log_cooldown: Cooldown,
}

impl ClientGameState {
    pub fn new(own_id: PaddleId, prediction_enabled: bool) -> Self {
        Self {
            own: Paddle::new(own_id),
            opponent: OpponentTracker::new(own_id.opponent()),
            ball: BallTracker::new(),
            score: Score::default(),
            smoother: Smoother::new(),
            prediction_enabled,
            collision_cooldown: Cooldown::new(COLLISION_COOLDOWN),
            log_cooldown: Cooldown::new(LOG_INTERVAL),
        }
    }

    pub fn own_id(&self) -> PaddleId {
        self.own.id
    }

    pub fn prediction_enabled(&self) -> bool {
        self.prediction_enabled
    }

    pub fn set_prediction(&mut self, enabled: bool) {
        self.prediction_enabled = enabled;
        info!(
            "Prediction and interpolation {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    /// Top-left corners of both paddles, paddle one first.
    pub fn paddle_positions(&self) -> [Vec2; 2] {
        match self.own.id {
            PaddleId::One => [self.own.position, self.opponent.position()],
            PaddleId::Two => [self.opponent.position(), self.own.position],
        }
    }

    /// Applies local input to the own paddle.
    pub fn apply_input(&mut self, input: &FrameInput, dt: f32) -> Option<ClientEvent> {
        self.own.velocity = Vec2::new(0.0, input.direction.sign() * PADDLE_SPEED);
        self.own.update(dt);

        if input.toggle_prediction {
            self.set_prediction(!self.prediction_enabled);
            return Some(ClientEvent::PredictionToggled(self.prediction_enabled));
        }
        None
    }

    /// Routes a datagram received at local time `now` to the ball or the
    /// opponent paddle.
    pub fn receive_sample(&mut self, sample: PositionSample, now: f64) -> Option<ClientEvent> {
        let smoother = self.prediction_enabled.then_some(&self.smoother);

        if sample.is_ball {
            match self.ball.receive(sample, now, smoother) {
                BallUpdate::Teleported => Some(ClientEvent::BallReserved),
                BallUpdate::Stale => {
                    debug!("Dropped stale ball position {:.3}", sample.timestamp);
                    None
                }
                BallUpdate::Accepted => None,
            }
        } else {
            if !self.opponent.receive(sample, now, smoother) {
                debug!("Dropped stale paddle position {:.3}", sample.timestamp);
            }
            None
        }
    }

    /// Applies a control message; returns the resulting event.
    pub fn apply_control(&mut self, message: ControlMessage) -> ClientEvent {
        match message {
            ControlMessage::ScoreUpdate(update) => {
                self.score = update.score();
                info!(
                    "Score: {} - {}",
                    self.score.player_one, self.score.player_two
                );
                ClientEvent::ScoreChanged(self.score)
            }
            ControlMessage::Winner(winner) if winner == self.own.id => {
                info!("Paddle {} won", winner);
                ClientEvent::Won
            }
            ControlMessage::Winner(winner) => {
                info!("Paddle {} won", winner);
                ClientEvent::Lost
            }
            ControlMessage::OpponentDisconnected => {
                info!("Opponent disconnected");
                ClientEvent::OpponentLeft
            }
        }
    }

    /// Advances the remote entities by one frame that lasted `dt` seconds
    /// and ended at local time `now`.
    pub fn frame(&mut self, now: f64, dt: f64) -> Vec<ClientEvent> {
        self.smoother.update(dt);
        let mut events = Vec::new();

        if self.prediction_enabled {
            self.opponent.extrapolate(now, dt, &self.smoother);
            let paddles = self.paddle_positions();
            self.ball.extrapolate(now, dt, &paddles, &self.smoother);
        }

        if let Some(event) = self.check_collisions(now, dt) {
            events.push(event);
        }

        if self.prediction_enabled {
            let paddles = self.paddle_positions();
            self.ball.observe(now, dt, &paddles, &self.smoother);
        }

        if self.log_cooldown.ready(now) {
            debug!(
                "Ball ({:.1}, {:.1}), opponent y={:.1}, fraction {:.4}",
                self.ball.position.x,
                self.ball.position.y,
                self.opponent.position().y,
                self.smoother.fraction()
            );
        }

        events
    }

    /// Position-only collision response for the displayed ball.
    fn check_collisions(&mut self, now: f64, dt: f64) -> Option<ClientEvent> {
        if !self.collision_cooldown.is_ready(now) {
            return None;
        }

        let step = ball_step(dt);
        let paddles = [self.own, *self.opponent.paddle()];

        for paddle in &paddles {
            let contact = check_paddle_collision(self.ball.bounds(), paddle.bounds());
            if contact.is_hit() {
                debug!("Paddle {} collision ({:?})", paddle.id, contact.kind);
                self.ball.bounce_off_paddle(contact, step);
                self.collision_cooldown.ready(now);
                return Some(ClientEvent::PaddleHit(paddle.id));
            }
        }

        let contact = check_wall_collision(self.ball.bounds());
        if contact.is_hit() {
            self.ball.bounce_off_wall(contact, step);
            self.collision_cooldown.ready(now);
            return Some(ClientEvent::WallHit);
        }
        None
    }

    /// Own paddle position as a datagram stamped at `now`.
    pub fn own_sample(&self, now: f64, origin_port: u16) -> PositionSample {
        PositionSample::new(now, self.own.position, false, origin_port)
    }

    pub fn display(&self) -> DisplayState {
        let [paddle_one, paddle_two] = self.paddle_positions();
        DisplayState {
            own_id: self.own.id,
            paddle_one,
            paddle_two,
            ball: self.ball.position,
            score: self.score,
            prediction_enabled: self.prediction_enabled,
        }
    }
}
