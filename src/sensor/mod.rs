pub mod dht;
pub mod frame;
pub mod simulated;

pub use dht::DhtSensor;
pub use frame::{decode_frame, FrameError};
pub use simulated::SimulatedSensor;

use serde::{Deserialize, Serialize};

/// Outcome of one attempt to read the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SensorStatus {
    Success,
    TimeoutError,
    GpioError,
    Unknown,
}

impl SensorStatus {
    pub fn is_success(self) -> bool {
        matches!(self, SensorStatus::Success)
    }
}

/// Supported single-wire sensor families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SensorKind {
    Dht11,
    Dht22,
    Am2302,
}

impl SensorKind {
    pub fn name(self) -> &'static str {
        match self {
            SensorKind::Dht11 => "DHT11",
            SensorKind::Dht22 => "DHT22",
            SensorKind::Am2302 => "AM2302",
        }
    }
}

/// Raw result of the sensor-read primitive. Values are meaningless unless
/// `status` is `Success`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawReading {
    pub status: SensorStatus,
    pub humidity: f32,
    pub temperature: f32,
}

impl RawReading {
    pub fn success(humidity: f32, temperature: f32) -> Self {
        Self {
            status: SensorStatus::Success,
            humidity,
            temperature,
        }
    }

    pub fn failed(status: SensorStatus) -> Self {
        Self {
            status,
            humidity: 0.0,
            temperature: 0.0,
        }
    }
}

/// Blocking sensor-read primitive. Implementations may block up to their own
/// timeout; failures are reported through `RawReading::status`.
pub trait SensorReader: Send {
    fn read(&mut self) -> RawReading;

    fn kind(&self) -> SensorKind;
}

impl SensorReader for Box<dyn SensorReader> {
    fn read(&mut self) -> RawReading {
        (**self).read()
    }

    fn kind(&self) -> SensorKind {
        (**self).kind()
    }
}
