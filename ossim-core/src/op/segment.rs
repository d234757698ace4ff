//! Memory operand decoding.
//!
//! Memory operations pack three fields into one decimal value, `SSBBBAAA`:
//! - `SS`: segment number (one or two digits)
//! - `BBB`: base, in KB
//! - `AAA`: offset within the segment
//!
//! The segment field is two digits wide only when the value has eight
//! digits. Values are walked digit by digit from the left, so a value with
//! fewer than seven digits leaves the trailing fields short: `34056` decodes
//! to segment 3, base 405, offset 0.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Smallest value whose segment field is two digits wide.
const TWO_DIGIT_SEGMENT: u32 = 10_000_000;

/// Decoded `SSBBBAAA` operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentAddress {
    pub segment: u32,
    pub base: u32,
    pub offset: u32,
}

impl SegmentAddress {
    pub fn decode(value: u32) -> Self {
        let segment_digits = if value < TWO_DIGIT_SEGMENT { 1 } else { 2 };

        let mut fields = [0u32; 3];
        let mut acc = 0u32;
        for (index, digit) in value.to_string().bytes().enumerate() {
            acc = acc * 10 + u32::from(digit - b'0');

            let consumed = index + 1;
            let field = if consumed == segment_digits {
                Some(0)
            } else if consumed == segment_digits + 3 {
                Some(1)
            } else if consumed == segment_digits + 6 {
                Some(2)
            } else {
                None
            };

            if let Some(field) = field {
                fields[field] = acc;
                acc = 0;
            }
        }

        Self {
            segment: fields[0],
            base: fields[1],
            offset: fields[2],
        }
    }

    /// Span this address reaches, `base * 1024 + offset`.
    pub fn extent(&self) -> u64 {
        u64::from(self.base) * 1024 + u64::from(self.offset)
    }
}

impl fmt::Display for SegmentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.segment, self.base, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_digit_segment() {
        let addr = SegmentAddress::decode(12_034_056);
        assert_eq!(addr.segment, 12);
        assert_eq!(addr.base, 34);
        assert_eq!(addr.offset, 56);
    }

    #[test]
    fn test_one_digit_segment() {
        let addr = SegmentAddress::decode(2_034_056);
        assert_eq!(addr.segment, 2);
        assert_eq!(addr.base, 34);
        assert_eq!(addr.offset, 56);
    }

    #[test]
    fn test_short_value_leaves_offset_empty() {
        let addr = SegmentAddress::decode(34_056);
        assert_eq!(
            addr,
            SegmentAddress {
                segment: 3,
                base: 405,
                offset: 0
            }
        );
    }

    #[test]
    fn test_zero() {
        let addr = SegmentAddress::decode(0);
        assert_eq!(addr.segment, 0);
        assert_eq!(addr.base, 0);
        assert_eq!(addr.offset, 0);
    }

    #[test]
    fn test_display_and_extent() {
        let addr = SegmentAddress::decode(1_001_100);
        assert_eq!(addr.to_string(), "1/1/100");
        assert_eq!(addr.extent(), 1124);
    }
}
