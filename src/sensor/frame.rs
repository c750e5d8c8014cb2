use std::fmt;

use super::SensorKind;

/// Number of data bits the sensor sends after its response handshake.
pub const FRAME_BITS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    Checksum { expected: u8, actual: u8 },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checksum { expected, actual } => {
                write!(f, "checksum mismatch: expected {expected:#04x}, got {actual:#04x}")
            }
        }
    }
}

impl std::error::Error for FrameError {}

/// Packs 40 received bits (MSB first) into the five frame bytes.
pub fn pack_bits(bits: &[bool; FRAME_BITS]) -> [u8; 5] {
    let mut bytes = [0u8; 5];
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            bytes[i / 8] |= 0x80 >> (i % 8);
        }
    }
    bytes
}

/// Decodes a frame into `(humidity, temperature)`.
pub fn decode_frame(kind: SensorKind, bytes: [u8; 5]) -> Result<(f32, f32), FrameError> {
    let expected = bytes[..4]
        .iter()
        .fold(0u8, |acc, b| acc.wrapping_add(*b));
    if expected != bytes[4] {
        return Err(FrameError::Checksum {
            expected,
            actual: bytes[4],
        });
    }

    match kind {
        SensorKind::Dht11 => Ok((bytes[0] as f32, bytes[2] as f32)),
        SensorKind::Dht22 | SensorKind::Am2302 => {
            let humidity = u16::from_be_bytes([bytes[0], bytes[1]]) as f32 / 10.0;
            let magnitude = u16::from_be_bytes([bytes[2] & 0x7F, bytes[3]]) as f32 / 10.0;
            let temperature = if bytes[2] & 0x80 != 0 {
                -magnitude
            } else {
                magnitude
            };
            Ok((humidity, temperature))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_checksum(b: [u8; 4]) -> [u8; 5] {
        let sum = b.iter().fold(0u8, |acc, x| acc.wrapping_add(*x));
        [b[0], b[1], b[2], b[3], sum]
    }

    #[test]
    fn dht22_positive_temperature() {
        // 65.2 %RH, 35.1 C
        let frame = with_checksum([0x02, 0x8C, 0x01, 0x5F]);
        let (h, t) = decode_frame(SensorKind::Dht22, frame).unwrap();
        assert!((h - 65.2).abs() < 1e-4);
        assert!((t - 35.1).abs() < 1e-4);
    }

    #[test]
    fn dht22_negative_temperature() {
        // -10.1 C
        let frame = with_checksum([0x01, 0x90, 0x80, 0x65]);
        let (h, t) = decode_frame(SensorKind::Am2302, frame).unwrap();
        assert!((h - 40.0).abs() < 1e-4);
        assert!((t + 10.1).abs() < 1e-4);
    }

    #[test]
    fn dht11_uses_integral_bytes() {
        let frame = with_checksum([45, 0, 22, 0]);
        assert_eq!(decode_frame(SensorKind::Dht11, frame), Ok((45.0, 22.0)));
    }

    #[test]
    fn checksum_wraps_and_is_checked() {
        let frame = with_checksum([0xFF, 0xFF, 0x00, 0x02]);
        assert_eq!(frame[4], 0x00);
        assert!(decode_frame(SensorKind::Dht22, frame).is_ok());

        let mut bad = frame;
        bad[4] = 0x01;
        assert_eq!(
            decode_frame(SensorKind::Dht22, bad),
            Err(FrameError::Checksum {
                expected: 0x00,
                actual: 0x01
            })
        );
    }

    #[test]
    fn bits_are_packed_msb_first() {
        let mut bits = [false; FRAME_BITS];
        bits[0] = true;
        bits[15] = true;
        bits[39] = true;
        assert_eq!(pack_bits(&bits), [0x80, 0x01, 0x00, 0x00, 0x01]);
    }
}
