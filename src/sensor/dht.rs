//! Single-wire DHT11 / DHT22 / AM2302 reader on the Raspberry Pi GPIO header.
//!
//! The sensor is driven by bit-banging one pin through `rppal`: the host pulls
//! the line low to request a frame, the sensor answers with an 80 us low / 80 us
//! high handshake and then sends 40 bits where the width of each high pulse
//! encodes the bit value (~27 us for 0, ~70 us for 1).
//!
//! User-space timing on Linux is best effort. A scheduler hiccup shows up as a
//! timeout or a checksum failure and is left to the caller's update policy.

use std::thread;
use std::time::{Duration, Instant};

use rppal::gpio::{Gpio, IoPin, Level, Mode};

use super::frame::{decode_frame, pack_bits, FRAME_BITS};
use super::{RawReading, SensorKind, SensorReader, SensorStatus};

/// Line held high before the start signal so the sensor sees a clean edge.
const IDLE_HIGH: Duration = Duration::from_millis(500);
/// Start signal length. DHT11 needs at least 18 ms, DHT22 at least 1 ms.
const START_LOW: Duration = Duration::from_millis(20);
/// Longest any single level is expected to last during a transfer.
const LEVEL_TIMEOUT: Duration = Duration::from_micros(500);
/// High pulses longer than this are a 1 bit.
const ONE_THRESHOLD: Duration = Duration::from_micros(48);

struct Timeout;

pub struct DhtSensor {
    kind: SensorKind,
    gpio_pin: u8,
    pin: Option<IoPin>,
}

impl DhtSensor {
    /// `gpio_pin` uses BCM numbering. The pin is acquired on the first read.
    pub fn new(kind: SensorKind, gpio_pin: u8) -> Self {
        Self {
            kind,
            gpio_pin,
            pin: None,
        }
    }

    fn open(&self) -> Result<IoPin, rppal::gpio::Error> {
        Ok(Gpio::new()?.get(self.gpio_pin)?.into_io(Mode::Output))
    }

    fn capture(pin: &mut IoPin) -> Result<[bool; FRAME_BITS], Timeout> {
        pin.set_mode(Mode::Output);
        pin.set_high();
        thread::sleep(IDLE_HIGH);
        pin.set_low();
        thread::sleep(START_LOW);
        pin.set_mode(Mode::Input);

        // Sensor response: pulls low, then high, then low again before data.
        wait_for(pin, Level::Low)?;
        wait_for(pin, Level::High)?;
        wait_for(pin, Level::Low)?;

        let mut bits = [false; FRAME_BITS];
        for bit in bits.iter_mut() {
            wait_for(pin, Level::High)?;
            let width = wait_for(pin, Level::Low)?;
            *bit = width > ONE_THRESHOLD;
        }
        Ok(bits)
    }
}

/// Spins until the line reaches `level`, returning how long that took.
fn wait_for(pin: &IoPin, level: Level) -> Result<Duration, Timeout> {
    let start = Instant::now();
    while pin.read() != level {
        if start.elapsed() > LEVEL_TIMEOUT {
            return Err(Timeout);
        }
        std::hint::spin_loop();
    }
    Ok(start.elapsed())
}

impl SensorReader for DhtSensor {
    fn read(&mut self) -> RawReading {
        let mut pin = match self.pin.take() {
            Some(pin) => pin,
            None => match self.open() {
                Ok(pin) => pin,
                Err(e) => {
                    tracing::warn!(gpio = self.gpio_pin, "Cannot access sensor pin: {}", e);
                    return RawReading::failed(SensorStatus::GpioError);
                }
            },
        };

        let captured = Self::capture(&mut pin);
        // Leave the line pulled high between reads.
        pin.set_mode(Mode::Output);
        pin.set_high();
        self.pin = Some(pin);

        let bits = match captured {
            Ok(bits) => bits,
            Err(Timeout) => return RawReading::failed(SensorStatus::TimeoutError),
        };

        match decode_frame(self.kind, pack_bits(&bits)) {
            Ok((humidity, temperature)) => RawReading::success(humidity, temperature),
            Err(e) => {
                tracing::debug!("Discarding sensor frame: {}", e);
                RawReading::failed(SensorStatus::Unknown)
            }
        }
    }

    fn kind(&self) -> SensorKind {
        self.kind
    }
}
