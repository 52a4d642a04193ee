//! Seam between the sync engine and whatever presents the game.
//!
//! Windowing, drawing and audio live behind [`Frontend`]. The client only
//! hands out read-only [`DisplayState`] snapshots and [`ClientEvent`]s and
//! asks for raw key states once per frame. [`Autopilot`] is a headless
//! implementation that plays on its own.

use crate::game::{ClientEvent, DisplayState};
use crate::input::KeyState;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Cooldown, PaddleId, SessionClock, BALL_HEIGHT, LOG_INTERVAL, PADDLE_HEIGHT};

pub trait Frontend {
    /// Called once the paddle is assigned; returning false abandons the
    /// session before the ready port is sent.
    fn confirm_ready(&mut self, paddle: PaddleId) -> bool;

    /// Raw key states for the current frame.
    fn poll_keys(&mut self) -> KeyState;

    fn present(&mut self, state: &DisplayState);

    fn notify(&mut self, event: &ClientEvent);
}

/// Smallest and largest distance between paddle and ball centres the
/// autopilot tolerates before moving.
const DEAD_ZONE: (f32, f32) = (4.0, 30.0);

/// Headless frontend that follows the ball.
#[derive(Debug)]
pub struct Autopilot {
    rng: StdRng,
    dead_zone: f32,
    last_state: Option<DisplayState>,
    games_played: u32,
    max_games: Option<u32>,
    clock: SessionClock,
    log_cooldown: Cooldown,
}

impl Autopilot {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic reactions for tests.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(mut rng: StdRng) -> Self {
        let dead_zone = rng.gen_range(DEAD_ZONE.0..DEAD_ZONE.1);
        Self {
            rng,
            dead_zone,
            last_state: None,
            games_played: 0,
            max_games: None,
            clock: SessionClock::start(),
            log_cooldown: Cooldown::new(LOG_INTERVAL),
        }
    }

    /// Quit after `games` finished games.
    pub fn with_max_games(mut self, games: u32) -> Self {
        self.max_games = Some(games);
        self
    }

    pub fn games_played(&self) -> u32 {
        self.games_played
    }

    fn done(&self) -> bool {
        self.max_games
            .is_some_and(|max| self.games_played >= max)
    }
}

impl Default for Autopilot {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontend for Autopilot {
    fn confirm_ready(&mut self, paddle: PaddleId) -> bool {
        info!("Autopilot ready as paddle {}", paddle);
        !self.done()
    }

    fn poll_keys(&mut self) -> KeyState {
        let mut keys = KeyState {
            quit: self.done(),
            ..KeyState::default()
        };

        let Some(state) = self.last_state else {
            return keys;
        };

        let own = match state.own_id {
            PaddleId::One => state.paddle_one,
            PaddleId::Two => state.paddle_two,
        };
        let offset = (state.ball.y + BALL_HEIGHT / 2.0) - (own.y + PADDLE_HEIGHT / 2.0);

        if offset < -self.dead_zone {
            keys.up = true;
        } else if offset > self.dead_zone {
            keys.down = true;
        }
        keys
    }

    fn present(&mut self, state: &DisplayState) {
        self.last_state = Some(*state);

        if self.log_cooldown.ready(self.clock.now()) {
            debug!(
                "Display: paddles {:.0}/{:.0}, ball ({:.0}, {:.0}), score {}-{}",
                state.paddle_one.y,
                state.paddle_two.y,
                state.ball.x,
                state.ball.y,
                state.score.player_one,
                state.score.player_two
            );
        }
    }

    fn notify(&mut self, event: &ClientEvent) {
        match event {
            ClientEvent::PaddleHit(_) => {
                self.dead_zone = self.rng.gen_range(DEAD_ZONE.0..DEAD_ZONE.1);
            }
            ClientEvent::Won | ClientEvent::Lost => {
                self.games_played += 1;
                info!("Game {} finished: {:?}", self.games_played, event);
            }
            ClientEvent::WallHit | ClientEvent::BallReserved => {}
            other => info!("{:?}", other),
        }
    }
}
