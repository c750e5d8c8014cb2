use rand::Rng;

use super::{RawReading, SensorKind, SensorReader, SensorStatus};

fn add_noise(value: f32, noise_percent: f32) -> f32 {
    if noise_percent <= 0.0 {
        return value;
    }
    let mut rng = rand::thread_rng();
    let noise = rng.gen_range(-noise_percent..noise_percent);
    value * (1.0 + noise / 100.0)
}

/// Software stand-in for the DHT sensor, for hosts without the hardware.
pub struct SimulatedSensor {
    kind: SensorKind,
    temperature: f32,
    humidity: f32,
    target_temperature: f32,
    target_humidity: f32,
    failure_rate: f64,
}

impl SimulatedSensor {
    pub fn new(kind: SensorKind) -> Self {
        Self {
            kind,
            temperature: 20.0,
            humidity: 50.0,
            target_temperature: 21.5,
            target_humidity: 45.0,
            failure_rate: 0.1,
        }
    }

    /// Share of reads (0.0..=1.0) that fail with a timeout or GPIO error.
    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = failure_rate.clamp(0.0, 1.0);
        self
    }

    fn tick(&mut self) {
        // Ramp toward the set point, 0.1 per read
        let ramp = |value: f32, target: f32| {
            let diff = target - value;
            if diff.abs() > 0.1 {
                value + diff.signum() * 0.1
            } else {
                target
            }
        };
        self.temperature = ramp(self.temperature, self.target_temperature);
        self.humidity = ramp(self.humidity, self.target_humidity);
    }
}

impl SensorReader for SimulatedSensor {
    fn read(&mut self) -> RawReading {
        self.tick();

        let mut rng = rand::thread_rng();
        if rng.gen_bool(self.failure_rate) {
            let status = if rng.gen_bool(0.5) {
                SensorStatus::TimeoutError
            } else {
                SensorStatus::GpioError
            };
            return RawReading::failed(status);
        }

        let humidity = add_noise(self.humidity, 1.0).clamp(0.0, 100.0);
        let temperature = add_noise(self.temperature, 1.0);
        match self.kind {
            // DHT11 only reports whole units
            SensorKind::Dht11 => RawReading::success(humidity.round(), temperature.round()),
            SensorKind::Dht22 | SensorKind::Am2302 => RawReading::success(
                (humidity * 10.0).round() / 10.0,
                (temperature * 10.0).round() / 10.0,
            ),
        }
    }

    fn kind(&self) -> SensorKind {
        self.kind
    }
}
