//! Order-preserving tagged encoding of scalar values.
//!
//! Every indexed value is encoded as a single tag byte followed by a
//! kind-dependent payload. Tags ascend in collation order, so comparing
//! encoded values as raw bytes reproduces the cross-type ordering
//! `null < false < true < number < string`. Within a kind, the payload
//! preserves the natural ordering: numbers use a sign-adjusted big-endian
//! transform of the IEEE-754 bits, strings are raw UTF-8.

use jotdb_types::Scalar;

/// Tag for JSON `null`. Tags are printable ASCII to ease debugging.
pub const TAG_NULL: u8 = 0x28; // char: (
/// Tag for JSON `false`.
pub const TAG_FALSE: u8 = 0x29; // char: )
/// Tag for JSON `true`.
pub const TAG_TRUE: u8 = 0x2a; // char: *
/// Tag for JSON numbers.
pub const TAG_NUMBER: u8 = 0x2b; // char: +
/// Tag for JSON strings.
pub const TAG_STRING: u8 = 0x2c; // char: ,

/// Payload length of an encoded number, excluding the tag byte.
pub const NUMBER_PAYLOAD_LEN: usize = 8;

/// Encodes a double so that the byte ordering of the result matches the
/// numeric ordering of the input.
///
/// For non-negative values the sign bit is flipped, which makes the
/// big-endian representation monotone in magnitude; for negative values
/// every bit is flipped, which reverses the magnitude ordering and places
/// them below zero. NaN payloads produce deterministic but meaningless
/// positions.
pub fn encode_number(value: f64) -> [u8; NUMBER_PAYLOAD_LEN] {
    let mut bits = value.to_bits();
    if value >= 0.0 {
        bits ^= 0x8000_0000_0000_0000;
    } else {
        bits ^= 0xffff_ffff_ffff_ffff;
    }
    bits.to_be_bytes()
}

/// Inverse of [`encode_number`].
pub fn decode_number(payload: [u8; NUMBER_PAYLOAD_LEN]) -> f64 {
    let bits = u64::from_be_bytes(payload);
    // A set high bit means the original value was non-negative.
    let bits = if bits & 0x8000_0000_0000_0000 != 0 {
        bits ^ 0x8000_0000_0000_0000
    } else {
        bits ^ 0xffff_ffff_ffff_ffff
    };
    f64::from_bits(bits)
}

/// Encodes a scalar as its tagged byte representation.
///
/// Null and booleans are a lone tag byte; numbers are the tag followed by
/// the 8-byte [`encode_number`] payload; strings are the tag followed by
/// the raw UTF-8 bytes.
pub fn encode_tagged(value: &Scalar) -> Vec<u8> {
    match value {
        Scalar::Null => vec![TAG_NULL],
        Scalar::Bool(false) => vec![TAG_FALSE],
        Scalar::Bool(true) => vec![TAG_TRUE],
        Scalar::Number(n) => {
            let mut out = Vec::with_capacity(1 + NUMBER_PAYLOAD_LEN);
            out.push(TAG_NUMBER);
            out.extend_from_slice(&encode_number(*n));
            out
        }
        Scalar::Str(s) => {
            let mut out = Vec::with_capacity(1 + s.len());
            out.push(TAG_STRING);
            out.extend_from_slice(s.as_bytes());
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tags_ascend_in_collation_order() {
        assert!(TAG_NULL < TAG_FALSE);
        assert!(TAG_FALSE < TAG_TRUE);
        assert!(TAG_TRUE < TAG_NUMBER);
        assert!(TAG_NUMBER < TAG_STRING);
    }

    #[test]
    fn test_number_ordering_fixed_cases() {
        let cases = [
            (-f64::MAX, -1.0e10),
            (-1.0e10, -2.5),
            (-2.5, -1.0),
            (-1.0, 0.0),
            (0.0, 1.0e-300),
            (1.0e-300, 1.0),
            (1.0, 2.5),
            (2.5, 1.0e10),
            (1.0e10, f64::MAX),
        ];
        for (lo, hi) in cases {
            assert!(
                encode_number(lo) < encode_number(hi),
                "expected encode({lo}) < encode({hi})"
            );
        }
    }

    #[test]
    fn test_number_roundtrip_fixed_cases() {
        for value in [-1.0e300, -42.5, -0.0, 0.0, 0.125, 40.0, 1.0e300] {
            let decoded = decode_number(encode_number(value));
            assert_eq!(value.to_bits(), decoded.to_bits());
        }
    }

    #[test]
    fn test_tagged_shapes() {
        assert_eq!(encode_tagged(&Scalar::Null), vec![TAG_NULL]);
        assert_eq!(encode_tagged(&Scalar::Bool(false)), vec![TAG_FALSE]);
        assert_eq!(encode_tagged(&Scalar::Bool(true)), vec![TAG_TRUE]);
        assert_eq!(encode_tagged(&Scalar::Number(40.0)).len(), 9);
        assert_eq!(
            encode_tagged(&Scalar::Str("hello".to_string())),
            b",hello".to_vec()
        );
    }

    #[test]
    fn test_cross_type_collation() {
        let ordered = [
            Scalar::Null,
            Scalar::Bool(false),
            Scalar::Bool(true),
            Scalar::Number(-1.0e10),
            Scalar::Number(12.0),
            Scalar::Str(String::new()),
            Scalar::Str("mike".to_string()),
        ];
        for pair in ordered.windows(2) {
            assert!(
                encode_tagged(&pair[0]) < encode_tagged(&pair[1]),
                "expected {:?} < {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    /// Finite doubles with -0.0 normalized to 0.0 (the two zeros compare
    /// equal numerically but encode differently).
    fn arb_finite_f64() -> impl Strategy<Value = f64> {
        any::<f64>()
            .prop_filter("finite", |v| v.is_finite())
            .prop_map(|v| if v == 0.0 { 0.0 } else { v })
    }

    proptest! {
        #[test]
        fn number_encoding_preserves_order(a in arb_finite_f64(), b in arb_finite_f64()) {
            let (ea, eb) = (encode_number(a), encode_number(b));
            if a < b {
                prop_assert!(ea < eb);
            } else if a > b {
                prop_assert!(ea > eb);
            } else {
                prop_assert_eq!(ea, eb);
            }
        }

        #[test]
        fn number_encoding_roundtrips(a in arb_finite_f64()) {
            prop_assert_eq!(decode_number(encode_number(a)).to_bits(), a.to_bits());
        }

        #[test]
        fn string_encoding_preserves_order(a in "[ -~]{0,24}", b in "[ -~]{0,24}") {
            let (ea, eb) = (
                encode_tagged(&Scalar::Str(a.clone())),
                encode_tagged(&Scalar::Str(b.clone())),
            );
            prop_assert_eq!(a.as_bytes().cmp(b.as_bytes()), ea.cmp(&eb));
        }

        #[test]
        fn numbers_sort_between_booleans_and_strings(
            n in arb_finite_f64(),
            s in "[ -~]{0,24}",
        ) {
            let num = encode_tagged(&Scalar::Number(n));
            prop_assert!(encode_tagged(&Scalar::Bool(true)) < num);
            prop_assert!(num < encode_tagged(&Scalar::Str(s)));
        }
    }
}
