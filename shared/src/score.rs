use crate::entity::PaddleId;
use crate::WIN_MARGIN;
use serde::{Deserialize, Serialize};

/// Points per player for the current game. Only ever grows until `reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    pub player_one: u32,
    pub player_two: u32,
}

impl Score {
    pub fn new(player_one: u32, player_two: u32) -> Self {
        Self {
            player_one,
            player_two,
        }
    }

    pub fn get(&self, paddle: PaddleId) -> u32 {
        match paddle {
            PaddleId::One => self.player_one,
            PaddleId::Two => self.player_two,
        }
    }

    pub fn award(&mut self, paddle: PaddleId) {
        match paddle {
            PaddleId::One => self.player_one += 1,
            PaddleId::Two => self.player_two += 1,
        }
    }

    /// The player that reached `winning_score` while more than
    /// [`WIN_MARGIN`] points ahead, if any. `(7, 5)` does not end a game.
    pub fn winner(&self, winning_score: u32) -> Option<PaddleId> {
        PaddleId::ALL.into_iter().find(|&paddle| {
            let own = self.get(paddle);
            let other = self.get(paddle.opponent());
            own >= winning_score && own.saturating_sub(other) > WIN_MARGIN
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
