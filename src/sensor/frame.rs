// src/sensor/frame.rs

use core::time::Duration;

use crate::common::{timing::BIT_ONE_THRESHOLD, WxError};

/// Number of bits in one sensor transmission.
pub const FRAME_BITS: usize = 40;
/// Number of bytes in one sensor transmission.
pub const FRAME_BYTES: usize = FRAME_BITS / 8;

/// A validated humidity/temperature reading.
///
/// The sensor only resolves whole units, so the fractional frame bytes are
/// not carried over.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SensorReading {
    /// Relative humidity in percent.
    pub humidity: u8,
    /// Temperature in degrees Celsius.
    pub temperature: u8,
}

/// Classifies one high-phase duration: `true` (bit 1) iff strictly longer
/// than the threshold.
#[inline]
pub fn classify_pulse(high: Duration) -> bool {
    high > BIT_ONE_THRESHOLD
}

/// The five raw bytes of one transmission:
/// `[humidity_int, humidity_frac, temp_int, temp_frac, checksum]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RawFrame([u8; FRAME_BYTES]);

impl RawFrame {
    pub const fn from_bytes(bytes: [u8; FRAME_BYTES]) -> Self {
        RawFrame(bytes)
    }

    /// Packs 40 high-phase widths (microseconds), most significant bit first.
    pub fn from_pulse_widths(widths: &[u32; FRAME_BITS]) -> Self {
        let mut bytes = [0u8; FRAME_BYTES];
        for (i, width) in widths.iter().enumerate() {
            let bit = classify_pulse(Duration::from_micros(u64::from(*width)));
            bytes[i / 8] = (bytes[i / 8] << 1) | u8::from(bit);
        }
        RawFrame(bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; FRAME_BYTES] {
        &self.0
    }

    /// Low byte of the sum of the four data bytes.
    pub fn calculated_checksum(&self) -> u8 {
        self.0[..4].iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
    }

    #[inline]
    pub fn checksum(&self) -> u8 {
        self.0[4]
    }

    pub fn checksum_ok(&self) -> bool {
        self.calculated_checksum() == self.checksum()
    }

    /// The reading carried by this frame, if its checksum holds.
    pub fn reading<E: core::fmt::Debug>(&self) -> Result<SensorReading, WxError<E>> {
        if !self.checksum_ok() {
            return Err(WxError::ChecksumMismatch {
                expected: self.checksum(),
                calculated: self.calculated_checksum(),
            });
        }
        Ok(SensorReading {
            humidity: self.0[0],
            temperature: self.0[2],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO_US: u32 = 26;
    const ONE_US: u32 = 70;

    fn widths_for(bytes: [u8; FRAME_BYTES]) -> [u32; FRAME_BITS] {
        let mut widths = [0u32; FRAME_BITS];
        for (i, w) in widths.iter_mut().enumerate() {
            let bit = (bytes[i / 8] >> (7 - i % 8)) & 1;
            *w = if bit == 1 { ONE_US } else { ZERO_US };
        }
        widths
    }

    #[test]
    fn test_classify_threshold_boundary() {
        assert!(!classify_pulse(Duration::from_micros(0)));
        assert!(!classify_pulse(Duration::from_micros(29)));
        // Exactly at the threshold is a zero
        assert!(!classify_pulse(Duration::from_micros(30)));
        assert!(classify_pulse(Duration::from_micros(31)));
        assert!(classify_pulse(Duration::from_micros(70)));
        // Deterministic on repeat
        assert_eq!(classify_pulse(Duration::from_micros(30)), classify_pulse(Duration::from_micros(30)));
    }

    #[test]
    fn test_pack_msb_first() {
        let frame = RawFrame::from_pulse_widths(&widths_for([0x80, 0x01, 0xA5, 0x00, 0x26]));
        assert_eq!(frame.as_bytes(), &[0x80, 0x01, 0xA5, 0x00, 0x26]);
    }

    #[test]
    fn test_valid_frame_yields_integer_parts() {
        // 45.0 %RH, 23.4 C
        let bytes = [45, 0, 23, 4, 72];
        let frame = RawFrame::from_pulse_widths(&widths_for(bytes));
        assert!(frame.checksum_ok());
        let reading = frame.reading::<()>().unwrap();
        assert_eq!(reading, SensorReading { humidity: 45, temperature: 23 });
    }

    #[test]
    fn test_checksum_wraps_mod_256() {
        let frame = RawFrame::from_bytes([200, 100, 50, 10, 104]);
        assert_eq!(frame.calculated_checksum(), 104);
        assert!(frame.reading::<()>().is_ok());
    }

    #[test]
    fn test_checksum_mismatch_is_rejected() {
        let frame = RawFrame::from_bytes([45, 0, 23, 4, 73]);
        assert_eq!(
            frame.reading::<()>(),
            Err(WxError::ChecksumMismatch { expected: 73, calculated: 72 })
        );
    }

    #[test]
    fn test_sweep_valid_frames_decode_and_corrupt_ones_fail() {
        let mut checked = 0;
        for humidity in (0..=255u8).step_by(5) {
            for temperature in (0..=255u8).step_by(7) {
                let hum_frac = humidity.wrapping_mul(3);
                let temp_frac = temperature ^ 0x5a;
                let sum = humidity
                    .wrapping_add(hum_frac)
                    .wrapping_add(temperature)
                    .wrapping_add(temp_frac);

                let good = [humidity, hum_frac, temperature, temp_frac, sum];
                let frame = RawFrame::from_pulse_widths(&widths_for(good));
                assert_eq!(frame.as_bytes(), &good);
                assert_eq!(
                    frame.reading::<()>(),
                    Ok(SensorReading { humidity, temperature })
                );

                let bad = [humidity, hum_frac, temperature, temp_frac, sum.wrapping_add(1)];
                let frame = RawFrame::from_pulse_widths(&widths_for(bad));
                assert!(frame.reading::<()>().is_err());
                checked += 1;
            }
        }
        assert_eq!(checked, 52 * 37);
    }

    #[test]
    fn test_every_checksum_value_only_one_accepted() {
        let data = [61u8, 0, 19, 0];
        let accepted = (0..=255u8)
            .filter(|c| RawFrame::from_bytes([data[0], data[1], data[2], data[3], *c]).checksum_ok())
            .count();
        assert_eq!(accepted, 1);
    }
}
