//! Mantissa/exponent time codec for Vtime/Htime fields (RFC 3626 Section 18.3).
//!
//! `Value = C * (1 + a/16) * 2^b`, with `a` in the high nibble and `b` in the
//! low nibble of the encoded byte.

use crate::consts::OLSR_C;

/// Encode a duration in seconds into the 8-bit mantissa/exponent form.
///
/// Non-positive input encodes to 0. The result is always within one
/// mantissa step (`value/16`) of the input, rounding up.
pub fn encode_time(seconds: f64) -> u8 {
    if seconds <= 0.0 {
        return 0;
    }
    if seconds < OLSR_C {
        return 0;
    }

    let mut b = (seconds / OLSR_C).log2().floor() as i32;
    b = b.clamp(0, 15);

    let a_float = 16.0 * (seconds / (OLSR_C * 2f64.powi(b)) - 1.0);
    let mut a = a_float.ceil() as i32;
    if a >= 16 {
        b += 1;
        a = 0;
    }
    if b > 15 {
        b = 15;
        a = 15;
    }

    ((a as u8) << 4) | (b as u8)
}

/// Decode an 8-bit mantissa/exponent byte back into seconds.
pub fn decode_time(encoded: u8) -> f64 {
    if encoded == 0 {
        return 0.0;
    }
    let a = (encoded >> 4) & 0x0F;
    let b = encoded & 0x0F;
    OLSR_C * (1.0 + f64::from(a) / 16.0) * 2f64.powi(i32::from(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_round_trips_to_zero() {
        assert_eq!(encode_time(0.0), 0);
        assert_eq!(decode_time(0), 0.0);
    }

    #[test]
    fn negative_encodes_to_zero() {
        assert_eq!(encode_time(-5.0), 0);
    }

    #[test]
    fn byte_round_trip_is_exact_for_every_byte() {
        for raw in 0u8..=255 {
            let seconds = decode_time(raw);
            assert_eq!(encode_time(seconds), raw, "byte {raw} did not round-trip");
        }
    }

    #[test]
    fn decode_encode_stays_within_one_step() {
        let samples = [1.0, 2.0, 5.0, 6.0, 15.0, 30.0, 100.0, 1000.0];
        for &t in &samples {
            let byte = encode_time(t);
            let back = decode_time(byte);
            assert!(
                (back - t).abs() <= t / 16.0 + 1e-9,
                "t={t} back={back} exceeds one mantissa step"
            );
        }
    }

    #[test]
    fn t_equals_c_collides_with_the_zero_byte() {
        // `encode_time(C)` lands on byte 0 (a=0, b=0), and byte 0 is also the
        // dedicated "zero" encoding, which decodes to 0.0 rather than C. This
        // is the one input where the one-step round-trip bound doesn't hold.
        assert_eq!(encode_time(OLSR_C), 0);
        assert_eq!(decode_time(0), 0.0);
    }
}
