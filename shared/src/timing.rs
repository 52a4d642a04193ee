use std::time::{Duration, Instant};

/// Seconds elapsed since the process's session started.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn at(&self, instant: Instant) -> f64 {
        instant.saturating_duration_since(self.start).as_secs_f64()
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::start()
    }
}

/// Elapsed-time gate: fires at most once per `interval`.
///
/// Times are session seconds from a [`SessionClock`], which keeps the gate
/// deterministic under test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cooldown {
    interval: f64,
    last: Option<f64>,
}

impl Cooldown {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn from_duration(interval: Duration) -> Self {
        Self::new(interval.as_secs_f64())
    }

    /// Whether [`Cooldown::ready`] would fire at `now`, without restarting.
    pub fn is_ready(&self, now: f64) -> bool {
        match self.last {
            Some(last) => now - last >= self.interval,
            None => true,
        }
    }

    /// Returns true and restarts the gate if the interval has passed.
    pub fn ready(&mut self, now: f64) -> bool {
        let elapsed = self.is_ready(now);
        if elapsed {
            self.last = Some(now);
        }
        elapsed
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
