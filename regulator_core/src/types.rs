use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A decoded gauge reading in pascals. Never negative, never NaN.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct PressureReading(f64);

impl PressureReading {
    /// Accepts any finite, non-negative value.
    pub fn new(pascals: f64) -> Option<Self> {
        (pascals.is_finite() && pascals >= 0.0).then_some(Self(pascals))
    }

    #[inline]
    pub fn pascals(self) -> f64 {
        self.0
    }
}

/// One row of the session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub pressure: f64,
    pub valve_position: f64,
}

impl Sample {
    pub fn now(pressure: f64, valve_position: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            pressure,
            valve_position,
        }
    }
}

/// What the valve said back after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    /// A short response line (trimmed).
    Line(String),
    /// Nothing arrived before the ack timeout; the valve often stays quiet.
    Silent,
}
