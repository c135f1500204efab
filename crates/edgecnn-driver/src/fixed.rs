//! Q8.8 fixed-point codec
//!
//! Every buffer the accelerator touches holds signed 16-bit Q8.8 values:
//! 8 integer bits, 8 fractional bits, scale factor 256. The representable
//! range is `[-128.0, 127.99609375]` in steps of `1/256`.

/// Scale between a Q8.8 word and its real value.
pub const Q8_8_SCALE: f32 = 256.0;

/// Number of fractional bits.
pub const Q8_8_FRAC_BITS: u32 = 8;

/// Decode a Q8.8 word.
#[must_use]
pub fn to_float(value: i16) -> f32 {
    f32::from(value) / Q8_8_SCALE
}

/// Encode a real value as Q8.8.
///
/// The scaled value saturates to `[-32768, 32767]` before truncating toward
/// zero, so out-of-range inputs clamp instead of wrapping. NaN encodes as 0.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn to_fixed(value: f32) -> i16 {
    let scaled = (value * Q8_8_SCALE).clamp(f32::from(i16::MIN), f32::from(i16::MAX));
    if scaled.is_nan() {
        return 0;
    }
    scaled as i16
}

/// Decode a slice of Q8.8 words.
#[must_use]
pub fn decode_slice(values: &[i16]) -> Vec<f32> {
    values.iter().copied().map(to_float).collect()
}

/// Encode a slice of real values as Q8.8.
#[must_use]
pub fn encode_slice(values: &[f32]) -> Vec<i16> {
    values.iter().copied().map(to_fixed).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_q8_8_word_round_trips() {
        for v in i16::MIN..=i16::MAX {
            assert_eq!(to_fixed(to_float(v)), v, "word {v}");
        }
    }

    #[test]
    fn saturates_instead_of_wrapping() {
        assert_eq!(to_fixed(1000.0), 32767);
        assert_eq!(to_fixed(-1000.0), -32768);
        assert_eq!(to_fixed(f32::INFINITY), 32767);
        assert_eq!(to_fixed(f32::NEG_INFINITY), -32768);
        assert_eq!(to_fixed(f32::NAN), 0);
    }

    #[test]
    fn truncates_toward_zero() {
        assert_eq!(to_fixed(1.0), 256);
        assert_eq!(to_fixed(0.5), 128);
        // 0.00390625 is exactly one LSB; anything smaller truncates to 0.
        assert_eq!(to_fixed(0.003), 0);
        assert_eq!(to_fixed(-0.003), 0);
        assert_eq!(to_fixed(-1.5), -384);
    }

    #[test]
    fn slices() {
        assert_eq!(decode_slice(&[256, -128, 0]), vec![1.0, -0.5, 0.0]);
        assert_eq!(encode_slice(&[1.0, -0.5, 200.0]), vec![256, -128, 32767]);
    }
}
