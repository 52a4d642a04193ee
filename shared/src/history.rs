use crate::math::Vec2;
use crate::protocol::PositionSample;

/// Anything that can be stored in a [`TemporalHistory`].
pub trait Timestamped: Copy {
    fn timestamp(&self) -> f64;
    fn position(&self) -> Vec2;
}

impl Timestamped for PositionSample {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }

    fn position(&self) -> Vec2 {
        PositionSample::position(self)
    }
}

/// Two-slot sample store kept in ascending timestamp order.
///
/// Inserting into a full history evicts the older slot first, then places
/// the new sample before or after the survivor depending on its timestamp.
/// A late sample therefore lands in the older slot instead of being treated
/// as the newest one. Equal timestamps keep the survivor first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalHistory<T> {
    older: Option<T>,
    newer: Option<T>,
}

impl<T: Timestamped> TemporalHistory<T> {
    pub const CAPACITY: usize = 2;

    pub fn new() -> Self {
        Self {
            older: None,
            newer: None,
        }
    }

    pub fn insert(&mut self, sample: T) {
        // With a single entry it lives in `newer`, so the survivor is always there.
        match self.newer.take() {
            None => self.newer = Some(sample),
            Some(kept) => {
                if sample.timestamp() < kept.timestamp() {
                    self.older = Some(sample);
                    self.newer = Some(kept);
                } else {
                    self.older = Some(kept);
                    self.newer = Some(sample);
                }
            }
        }
    }

    /// Up to `n` most recent samples, oldest first.
    pub fn latest(&self, n: usize) -> Vec<T> {
        let all: Vec<T> = self.iter().collect();
        let skip = all.len().saturating_sub(n);
        all[skip..].to_vec()
    }

    pub fn newest(&self) -> Option<T> {
        self.newer
    }

    /// `(older, newer)` once two samples are held.
    pub fn pair(&self) -> Option<(T, T)> {
        Some((self.older?, self.newer?))
    }

    pub fn clear(&mut self) {
        self.older = None;
        self.newer = None;
    }

    pub fn len(&self) -> usize {
        self.older.is_some() as usize + self.newer.is_some() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.newer.is_none()
    }

    pub fn is_full(&self) -> bool {
        self.len() == Self::CAPACITY
    }

    /// Samples in ascending timestamp order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.older.iter().chain(self.newer.iter()).copied()
    }
}

impl<T: Timestamped> Default for TemporalHistory<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Selects one of an entity's three histories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    Received,
    Predicted,
    Observed,
}

/// The three histories kept for every moving entity.
#[derive(Debug, Clone, Default)]
pub struct EntityHistories {
    /// Samples that arrived over the network, restamped with local time.
    pub received: TemporalHistory<PositionSample>,
    /// Positions this process predicted for the entity.
    pub predicted: TemporalHistory<PositionSample>,
    /// Positions actually displayed (or simulated) each frame.
    pub observed: TemporalHistory<PositionSample>,
}

impl EntityHistories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: HistoryKind) -> &TemporalHistory<PositionSample> {
        match kind {
            HistoryKind::Received => &self.received,
            HistoryKind::Predicted => &self.predicted,
            HistoryKind::Observed => &self.observed,
        }
    }

    pub fn get_mut(&mut self, kind: HistoryKind) -> &mut TemporalHistory<PositionSample> {
        match kind {
            HistoryKind::Received => &mut self.received,
            HistoryKind::Predicted => &mut self.predicted,
            HistoryKind::Observed => &mut self.observed,
        }
    }

    pub fn clear(&mut self) {
        self.received.clear();
        self.predicted.clear();
        self.observed.clear();
    }
}
