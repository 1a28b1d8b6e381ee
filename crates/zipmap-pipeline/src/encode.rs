//! Fixed-point polyline encoding.
//!
//! Implements the delta polyline format used by static map renderers:
//!
//! 1. Scale degrees by 1e5 and round half away from zero.
//! 2. Take the 32-bit two's-complement pattern and shift it left by one.
//! 3. Invert the shifted pattern when the value is negative.
//! 4. Emit 5-bit groups least-significant first, setting `0x20` on
//!    every group that is followed by another, and add 63 to each.
//!
//! All bit manipulation is done on `u32`, so wrap-around is explicit
//! and identical on every platform.
//!
//! Values are limited to a 30-bit window after step 2: scaled values
//! must lie in [`MIN_SCALED`]`..=`[`MAX_SCALED`] (about ±5368.7
//! degrees). Values outside it are rejected rather than truncated.
//!
//! [`decode`] reverses the process. Nothing in the pipeline needs it;
//! it exists as an oracle for the encoder.

use serde::{Deserialize, Serialize};

use crate::types::{Coordinate, DeltaSequence};

/// Fixed-point scale: one unit is 1e-5 degrees.
pub const SCALE: f64 = 1e5;

/// Smallest scaled value that fits the six-group window.
pub const MIN_SCALED: i32 = -(1 << 29);

/// Largest scaled value that fits the six-group window.
pub const MAX_SCALED: i32 = (1 << 29) - 1;

/// Maximum number of 5-bit groups per value.
const MAX_GROUPS: u32 = 6;
const GROUP_BITS: u32 = 5;
const GROUP_MASK: u32 = 0x1F;
const CONTINUATION: u32 = 0x20;
const ASCII_OFFSET: u32 = 63;

/// How many 5-bit groups an encoded value occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChunkLayout {
    /// Emit groups only up to the most significant non-zero one.
    ///
    /// This is the standard polyline form understood by every decoder.
    #[default]
    Compact,

    /// Always emit all six groups, padding with continuation-flagged zeros.
    ///
    /// Decodes to the same values as [`Compact`](Self::Compact) but
    /// every value costs six characters.
    FixedWidth,
}

/// Errors raised while turning degrees into encoded characters.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum EncodingError {
    /// The value is NaN or infinite.
    #[error("cannot encode non-finite value {value}")]
    NonFinite {
        /// The rejected value.
        value: f64,
    },

    /// The scaled value does not fit the 30-bit encoding window.
    #[error("scaled value {scaled} is outside the encodable range -536870912..=536870911")]
    OutOfRange {
        /// The scaled value (saturated to `i64`).
        scaled: i64,
    },
}

/// Errors raised while decoding an encoded polyline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The input ended in the middle of a value or coordinate pair.
    #[error("encoded polyline ends mid-value at byte {offset}")]
    Truncated {
        /// Byte offset where the input ended.
        offset: usize,
    },

    /// A byte outside the encoding alphabet (`?`..=`~`).
    #[error("invalid byte {byte:#04x} at offset {offset}")]
    InvalidCharacter {
        /// Byte offset of the bad byte.
        offset: usize,
        /// The bad byte.
        byte: u8,
    },

    /// A value used more than six groups.
    #[error("value at byte {offset} exceeds six 5-bit groups")]
    Overflow {
        /// Byte offset where the value started.
        offset: usize,
    },
}

/// Scale degrees to fixed-point units, rounding half away from zero.
///
/// # Errors
///
/// Returns [`EncodingError::NonFinite`] for NaN or infinite input and
/// [`EncodingError::OutOfRange`] if the scaled value leaves the window.
pub fn scale(value: f64) -> Result<i32, EncodingError> {
    if !value.is_finite() {
        return Err(EncodingError::NonFinite { value });
    }
    let rounded = (value * SCALE).round();
    // Float-to-int `as` saturates, so the range check happens on the i64.
    #[allow(clippy::cast_possible_truncation)]
    let scaled = rounded as i64;
    i32::try_from(scaled)
        .ok()
        .filter(|s| (MIN_SCALED..=MAX_SCALED).contains(s))
        .ok_or(EncodingError::OutOfRange { scaled })
}

/// Encode one value given in degrees.
///
/// # Errors
///
/// See [`scale`].
///
/// # Examples
///
/// ```
/// use zipmap_pipeline::encode::{ChunkLayout, encode_value};
///
/// assert_eq!(encode_value(-179.9832104, ChunkLayout::Compact).unwrap(), "`~oia@");
/// ```
pub fn encode_value(value: f64, layout: ChunkLayout) -> Result<String, EncodingError> {
    encode_scaled(scale(value)?, layout)
}

/// Encode one value already in fixed-point units.
///
/// # Errors
///
/// Returns [`EncodingError::OutOfRange`] if `scaled` leaves the window.
pub fn encode_scaled(scaled: i32, layout: ChunkLayout) -> Result<String, EncodingError> {
    let mut out = String::with_capacity(MAX_GROUPS as usize);
    write_scaled(&mut out, scaled, layout)?;
    Ok(out)
}

/// Append the encoding of one fixed-point value to `out`.
///
/// Nothing is written when the value is rejected.
///
/// # Errors
///
/// Returns [`EncodingError::OutOfRange`] if `scaled` leaves the window.
pub fn write_scaled(
    out: &mut String,
    scaled: i32,
    layout: ChunkLayout,
) -> Result<(), EncodingError> {
    if !(MIN_SCALED..=MAX_SCALED).contains(&scaled) {
        return Err(EncodingError::OutOfRange {
            scaled: i64::from(scaled),
        });
    }

    let mut bits = fold_sign(scaled);
    let groups = match layout {
        ChunkLayout::Compact => significant_groups(bits),
        ChunkLayout::FixedWidth => MAX_GROUPS,
    };

    for index in 0..groups {
        let mut group = bits & GROUP_MASK;
        bits >>= GROUP_BITS;
        if index + 1 < groups {
            group |= CONTINUATION;
        }
        // group <= 0x3F, so the sum stays within printable ASCII.
        #[allow(clippy::cast_possible_truncation)]
        let byte = (group + ASCII_OFFSET) as u8;
        out.push(char::from(byte));
    }
    Ok(())
}

/// Encode every entry of a delta sequence, latitude before longitude.
///
/// # Errors
///
/// Returns [`EncodingError::OutOfRange`] if any component leaves the window.
pub fn encode_deltas(deltas: &DeltaSequence, layout: ChunkLayout) -> Result<String, EncodingError> {
    let mut out = String::with_capacity(deltas.len() * 2 * MAX_GROUPS as usize);
    for entry in deltas.entries() {
        write_scaled(&mut out, entry.lat, layout)?;
        write_scaled(&mut out, entry.lng, layout)?;
    }
    Ok(out)
}

/// Shift the two's-complement pattern left by one and invert negatives,
/// so the sign ends up in the lowest bit.
#[allow(clippy::cast_sign_loss)]
const fn fold_sign(scaled: i32) -> u32 {
    let shifted = (scaled as u32) << 1;
    if scaled < 0 { !shifted } else { shifted }
}

/// Inverse of [`fold_sign`].
#[allow(clippy::cast_possible_wrap)]
const fn unfold_sign(bits: u32) -> i32 {
    if bits & 1 == 0 {
        (bits >> 1) as i32
    } else {
        !(bits >> 1) as i32
    }
}

/// Number of groups needed to carry every set bit (at least one).
const fn significant_groups(bits: u32) -> u32 {
    let mut groups = 1;
    while groups < MAX_GROUPS && bits >> (GROUP_BITS * groups) != 0 {
        groups += 1;
    }
    groups
}

/// Decode an encoded polyline into its raw fixed-point values.
///
/// Accepts both [`ChunkLayout`]s.
///
/// # Errors
///
/// Returns a [`DecodeError`] for bytes outside the alphabet, values
/// longer than six groups, or input that ends mid-value.
pub fn decode(encoded: &str) -> Result<Vec<i32>, DecodeError> {
    let bytes = encoded.as_bytes();
    let mut values = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let start = offset;
        let mut bits: u32 = 0;
        let mut groups = 0;
        loop {
            let Some(&byte) = bytes.get(offset) else {
                return Err(DecodeError::Truncated { offset });
            };
            let group = u32::from(byte)
                .checked_sub(ASCII_OFFSET)
                .filter(|g| *g <= (GROUP_MASK | CONTINUATION))
                .ok_or(DecodeError::InvalidCharacter { offset, byte })?;
            if groups == MAX_GROUPS {
                return Err(DecodeError::Overflow { offset: start });
            }
            bits |= (group & GROUP_MASK) << (GROUP_BITS * groups);
            groups += 1;
            offset += 1;
            if group & CONTINUATION == 0 {
                break;
            }
        }
        values.push(unfold_sign(bits));
    }

    Ok(values)
}

/// Decode an encoded polyline into absolute coordinates.
///
/// Values are read as `(lat, lng)` pairs; the first pair is absolute
/// and each later pair is added to the running position.
///
/// # Errors
///
/// As [`decode`], plus [`DecodeError::Truncated`] when the number of
/// values is odd.
pub fn decode_coordinates(encoded: &str) -> Result<Vec<Coordinate>, DecodeError> {
    let values = decode(encoded)?;
    if !values.len().is_multiple_of(2) {
        return Err(DecodeError::Truncated {
            offset: encoded.len(),
        });
    }

    let mut lat = 0_i64;
    let mut lng = 0_i64;
    let mut coordinates = Vec::with_capacity(values.len() / 2);
    for pair in values.chunks_exact(2) {
        lat += i64::from(pair[0]);
        lng += i64::from(pair[1]);
        #[allow(clippy::cast_precision_loss)]
        let coordinate = Coordinate::new(lat as f64 / SCALE, lng as f64 / SCALE);
        coordinates.push(coordinate);
    }
    Ok(coordinates)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::types::ScaledDelta;

    #[test]
    fn reference_value() {
        assert_eq!(
            encode_value(-179.983_210_4, ChunkLayout::Compact).unwrap(),
            "`~oia@"
        );
    }

    #[test]
    fn reference_route() {
        // (38.5, -120.2), (40.7, -120.95), (43.252, -126.453)
        let deltas = DeltaSequence::new(vec![
            ScaledDelta::new(3_850_000, -12_020_000),
            ScaledDelta::new(220_000, -75_000),
            ScaledDelta::new(255_200, -550_300),
        ]);
        assert_eq!(
            encode_deltas(&deltas, ChunkLayout::Compact).unwrap(),
            "_p~iF~ps|U_ulLnnqC_mqNvxq`@",
        );
    }

    #[test]
    fn reference_route_from_degrees() {
        let parts: Vec<String> = [38.5, -120.2, 2.2, -0.75, 2.552, -5.503]
            .iter()
            .map(|v| encode_value(*v, ChunkLayout::Compact).unwrap())
            .collect();
        assert_eq!(parts.concat(), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
    }

    #[test]
    fn zero_is_single_question_mark() {
        assert_eq!(encode_scaled(0, ChunkLayout::Compact).unwrap(), "?");
    }

    #[test]
    fn small_values() {
        assert_eq!(encode_scaled(1, ChunkLayout::Compact).unwrap(), "A");
        assert_eq!(encode_scaled(-1, ChunkLayout::Compact).unwrap(), "@");
        assert_eq!(encode_scaled(16, ChunkLayout::Compact).unwrap(), "_@");
    }

    #[test]
    fn fixed_width_always_six_characters() {
        for value in [0, 1, -1, 3_850_000, -17_998_321, MIN_SCALED, MAX_SCALED] {
            let encoded = encode_scaled(value, ChunkLayout::FixedWidth).unwrap();
            assert_eq!(encoded.len(), 6, "value {value} -> {encoded}");
            assert_eq!(decode(&encoded).unwrap(), vec![value]);
        }
    }

    #[test]
    fn fixed_width_pads_with_continuation_zeros() {
        // 38.5 needs five groups; the padded form flags the fifth and adds '?'.
        assert_eq!(
            encode_value(38.5, ChunkLayout::FixedWidth).unwrap(),
            "_p~if?"
        );
    }

    #[test]
    fn window_bounds_encode() {
        assert!(encode_scaled(MIN_SCALED, ChunkLayout::Compact).is_ok());
        assert!(encode_scaled(MAX_SCALED, ChunkLayout::Compact).is_ok());
        assert_eq!(
            encode_scaled(MAX_SCALED, ChunkLayout::Compact)
                .unwrap()
                .len(),
            6
        );
    }

    #[test]
    fn out_of_window_is_rejected() {
        assert_eq!(
            encode_scaled(MAX_SCALED + 1, ChunkLayout::Compact),
            Err(EncodingError::OutOfRange {
                scaled: i64::from(MAX_SCALED) + 1
            }),
        );
        assert!(matches!(
            encode_scaled(i32::MIN, ChunkLayout::Compact),
            Err(EncodingError::OutOfRange { .. })
        ));
        assert!(matches!(
            encode_value(6000.0, ChunkLayout::Compact),
            Err(EncodingError::OutOfRange { .. })
        ));
    }

    #[test]
    fn non_finite_is_rejected() {
        assert!(matches!(
            encode_value(f64::NAN, ChunkLayout::Compact),
            Err(EncodingError::NonFinite { .. })
        ));
        assert!(matches!(
            scale(f64::INFINITY),
            Err(EncodingError::NonFinite { .. })
        ));
    }

    #[test]
    fn rejected_value_writes_nothing() {
        let mut out = String::from("abc");
        assert!(write_scaled(&mut out, MIN_SCALED - 1, ChunkLayout::Compact).is_err());
        assert_eq!(out, "abc");
    }

    #[test]
    fn scale_rounds_to_nearest() {
        assert_eq!(scale(0.000_014).unwrap(), 1);
        assert_eq!(scale(0.000_016).unwrap(), 2);
        assert_eq!(scale(-179.983_210_4).unwrap(), -17_998_321);
        assert_eq!(scale(38.5).unwrap(), 3_850_000);
    }

    #[test]
    fn scale_is_sign_symmetric() {
        for value in [0.000_014, 0.000_016, 12.345_675, 179.999_995] {
            assert_eq!(scale(-value).unwrap(), -scale(value).unwrap(), "{value}");
        }
    }

    #[test]
    fn decode_reference_route() {
        let coords = decode_coordinates("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
        let expected = [(38.5, -120.2), (40.7, -120.95), (43.252, -126.453)];
        assert_eq!(coords.len(), expected.len());
        for (c, (lat, lng)) in coords.iter().zip(expected) {
            assert!((c.lat - lat).abs() < 1e-9, "{c:?}");
            assert!((c.lng - lng).abs() < 1e-9, "{c:?}");
        }
    }

    #[test]
    fn decode_truncated_value() {
        // '_' carries the continuation bit but nothing follows.
        assert_eq!(decode("_"), Err(DecodeError::Truncated { offset: 1 }));
    }

    #[test]
    fn decode_odd_value_count() {
        assert!(matches!(
            decode_coordinates("?"),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn decode_invalid_character() {
        assert_eq!(
            decode("?\n"),
            Err(DecodeError::InvalidCharacter {
                offset: 1,
                byte: b'\n'
            }),
        );
        assert!(matches!(
            decode("\u{7f}"),
            Err(DecodeError::InvalidCharacter { .. })
        ));
    }

    #[test]
    fn decode_overflow() {
        assert_eq!(decode("_______?"), Err(DecodeError::Overflow { offset: 0 }));
    }

    #[test]
    fn decode_empty() {
        assert!(decode("").unwrap().is_empty());
        assert!(decode_coordinates("").unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn decode_recovers_value_within_precision(x in -5000.0_f64..5000.0) {
            let encoded = encode_value(x, ChunkLayout::Compact).unwrap();
            let decoded = decode(&encoded).unwrap();
            prop_assert_eq!(decoded.len(), 1);
            let recovered = f64::from(decoded[0]) / SCALE;
            prop_assert!((recovered - x).abs() <= 1e-5, "{} -> {} -> {}", x, encoded, recovered);
        }

        #[test]
        fn layouts_decode_identically(v in MIN_SCALED..=MAX_SCALED) {
            let compact = encode_scaled(v, ChunkLayout::Compact).unwrap();
            let fixed = encode_scaled(v, ChunkLayout::FixedWidth).unwrap();
            prop_assert!(compact.len() <= fixed.len());
            prop_assert_eq!(decode(&compact).unwrap(), vec![v]);
            prop_assert_eq!(decode(&fixed).unwrap(), vec![v]);
        }
    }
}
