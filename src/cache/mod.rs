//! Single-slot cache holding the best known sensor sample.
//!
//! The poll task is the only writer. OPC UA value getters read a copy of the
//! whole sample under the lock, so a reader never sees fields from two
//! different polls.

pub mod poller;
pub mod sample;

pub use poller::{spawn_poller, Poller};
pub use sample::{default_staleness, Sample, DEFAULT_STALENESS_SECS};

use chrono::{DateTime, Duration, Utc};
use opcua::sync::RwLock;

use crate::sensor::SensorStatus;

/// Which quantity of the sample a reader is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measurand {
    Temperature,
    Humidity,
}

/// A single value taken from the current sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readout {
    pub value: f32,
    pub source_timestamp: DateTime<Utc>,
    pub status: SensorStatus,
}

pub struct SampleCache {
    current: RwLock<Sample>,
    staleness: Duration,
}

impl SampleCache {
    pub fn new(staleness: Duration) -> Self {
        Self {
            current: RwLock::new(Sample::sentinel()),
            staleness,
        }
    }

    pub fn staleness(&self) -> Duration {
        self.staleness
    }

    /// Copy of the stored sample.
    pub fn snapshot(&self) -> Sample {
        *self.current.read()
    }

    /// Applies the update policy to `candidate`. Returns true if it was stored.
    pub fn offer(&self, candidate: Sample) -> bool {
        let mut current = self.current.write();
        if !current.superseded_by(&candidate, self.staleness) {
            return false;
        }
        if current.status != candidate.status {
            tracing::info!(
                from = ?current.status,
                to = ?candidate.status,
                "Sensor status changed"
            );
        }
        *current = candidate;
        true
    }

    pub fn read(&self, measurand: Measurand) -> Readout {
        let sample = self.snapshot();
        let value = match measurand {
            Measurand::Temperature => sample.temperature,
            Measurand::Humidity => sample.humidity,
        };
        Readout {
            value,
            source_timestamp: sample.timestamp,
            status: sample.status,
        }
    }

    pub fn read_temperature(&self) -> Readout {
        self.read(Measurand::Temperature)
    }

    pub fn read_humidity(&self) -> Readout {
        self.read(Measurand::Humidity)
    }
}

impl Default for SampleCache {
    fn default() -> Self {
        Self::new(default_staleness())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::RawReading;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn starts_with_sentinel() {
        let cache = SampleCache::default();
        assert_eq!(cache.snapshot(), Sample::sentinel());
        assert_eq!(cache.read_temperature().status, SensorStatus::GpioError);
    }

    #[test]
    fn first_good_read_is_served() {
        let cache = SampleCache::default();
        assert!(cache.offer(Sample::new(RawReading::success(45.2, 21.7), at(0))));

        let t = cache.read_temperature();
        assert_eq!(t.value, 21.7);
        assert_eq!(t.status, SensorStatus::Success);
        assert_eq!(t.source_timestamp, at(0));

        let h = cache.read_humidity();
        assert_eq!(h.value, 45.2);
        assert_eq!(h.source_timestamp, at(0));
    }

    #[test]
    fn holds_fresh_value_then_surfaces_stale_error() {
        let cache = SampleCache::default();
        cache.offer(Sample::new(RawReading::success(50.0, 20.0), at(0)));

        assert!(!cache.offer(Sample::new(RawReading::failed(SensorStatus::GpioError), at(10))));
        let held = cache.snapshot();
        assert_eq!(held.status, SensorStatus::Success);
        assert_eq!(held.timestamp, at(0));
        assert_eq!((held.humidity, held.temperature), (50.0, 20.0));

        assert!(cache.offer(Sample::new(RawReading::failed(SensorStatus::GpioError), at(61))));
        let stale = cache.read_humidity();
        assert_eq!(stale.status, SensorStatus::GpioError);
        assert_eq!(stale.source_timestamp, at(61));
    }
}
