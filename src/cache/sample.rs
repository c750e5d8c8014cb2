use chrono::{DateTime, Duration, Utc};

use crate::sensor::{RawReading, SensorStatus};

/// Default age after which a good sample may be overwritten by a failed read.
pub const DEFAULT_STALENESS_SECS: u64 = 60;

pub fn default_staleness() -> Duration {
    Duration::seconds(DEFAULT_STALENESS_SECS as i64)
}

/// One sensor read attempt, committed to the cache as a whole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub humidity: f32,
    pub temperature: f32,
    pub status: SensorStatus,
}

impl Sample {
    pub fn new(reading: RawReading, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            humidity: reading.humidity,
            temperature: reading.temperature,
            status: reading.status,
        }
    }

    /// State before the first read: a GPIO error with zero values.
    pub fn sentinel() -> Self {
        Self {
            timestamp: DateTime::<Utc>::default(),
            humidity: 0.0,
            temperature: 0.0,
            status: SensorStatus::GpioError,
        }
    }

    /// Whether `candidate` should replace `self`.
    ///
    /// A successful read always wins. A failed read only wins if there is no
    /// good value to protect, or the good value has outlived `staleness`.
    pub fn superseded_by(&self, candidate: &Sample, staleness: Duration) -> bool {
        candidate.status.is_success()
            || !self.status.is_success()
            || candidate.timestamp - self.timestamp > staleness
    }
}

impl Default for Sample {
    fn default() -> Self {
        Self::sentinel()
    }
}
