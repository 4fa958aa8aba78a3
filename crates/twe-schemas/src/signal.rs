use serde::{Deserialize, Serialize};

/// A strategy's requested action on a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
    Neutral,
    ExitLong,
    ExitShort,
}

impl Direction {
    pub fn is_entry(&self) -> bool {
        matches!(self, Direction::Long | Direction::Short)
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, Direction::ExitLong | Direction::ExitShort)
    }
}

/// Default confidence below which an entry is not actionable.
pub const DEFAULT_ENTRY_THRESHOLD: f64 = 0.60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub direction: Direction,
    /// `[0, 1]`.
    pub confidence: f64,
    pub reason: String,
}

impl TradeSignal {
    pub fn neutral(reason: impl Into<String>) -> Self {
        Self {
            direction: Direction::Neutral,
            confidence: 0.0,
            reason: reason.into(),
        }
    }

    pub fn warming_up() -> Self {
        Self::neutral("Warming up …")
    }

    pub fn new(direction: Direction, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            direction,
            confidence: confidence.clamp(0.0, 1.0),
            reason: reason.into(),
        }
    }

    /// Whether this is an actionable entry request at the given threshold.
    pub fn is_actionable_entry(&self, entry_threshold: f64) -> bool {
        self.direction.is_entry() && self.confidence >= entry_threshold
    }
}
