//! Client input management with edge detection

/// Raw key states sampled by the frontend once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyState {
    pub up: bool,
    pub down: bool,
    pub toggle_prediction: bool,
    pub quit: bool,
}

/// Paddle movement requested for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Up,
    Down,
    #[default]
    Still,
}

impl Direction {
    /// Sign of the vertical velocity (screen y grows downwards).
    pub fn sign(self) -> f32 {
        match self {
            Direction::Up => -1.0,
            Direction::Down => 1.0,
            Direction::Still => 0.0,
        }
    }
}

/// What the game should do this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameInput {
    pub direction: Direction,
    /// Set only on the frame the toggle key goes down.
    pub toggle_prediction: bool,
    pub quit: bool,
}

/// Turns raw key states into per-frame game input
#[derive(Debug, Default)]
pub struct InputManager {
    // Previous frame key states for edge detection
    prev_toggle: bool,
    prev_quit: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, keys: KeyState) -> FrameInput {
        let direction = match (keys.up, keys.down) {
            (true, false) => Direction::Up,
            (false, true) => Direction::Down,
            _ => Direction::Still,
        };

        // Detect key press events (current && !previous)
        let input = FrameInput {
            direction,
            toggle_prediction: keys.toggle_prediction && !self.prev_toggle,
            quit: keys.quit && !self.prev_quit,
        };

        self.prev_toggle = keys.toggle_prediction;
        self.prev_quit = keys.quit;

        input
    }
}
