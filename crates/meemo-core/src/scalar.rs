//! Scalar types a session can search for.
//!
//! A session fixes one [`ScalarType`]; every search and write value must be a
//! [`ScalarValue`] of that type. Scanning compares raw little-endian byte images
//! through a [`Comparator`], so supporting another type only means teaching
//! [`ScalarValue`] its byte image.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{Error, Result};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    I32,
    I64,
    #[default]
    U32,
    U64,
    Char,
}

impl ScalarType {
    /// Width in bytes of one value of this type.
    pub const fn width(self) -> usize {
        match self {
            Self::I32 | Self::U32 => 4,
            Self::I64 | Self::U64 => 8,
            Self::Char => 1,
        }
    }

    /// Parse user text into a value of this type.
    ///
    /// Integers accept decimal or `0x`-prefixed hex. `Char` accepts exactly one
    /// ASCII character.
    pub fn parse_value(self, text: &str) -> Result<ScalarValue> {
        let text = text.trim();
        let invalid = || Error::InvalidValue(format!("'{}' is not a valid {}", text, self));

        let value = match self {
            Self::I32 => ScalarValue::I32(parse_int(text).ok_or_else(invalid)?),
            Self::I64 => ScalarValue::I64(parse_int(text).ok_or_else(invalid)?),
            Self::U32 => ScalarValue::U32(parse_int(text).ok_or_else(invalid)?),
            Self::U64 => ScalarValue::U64(parse_int(text).ok_or_else(invalid)?),
            Self::Char => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii() => ScalarValue::Char(c as u8),
                    _ => return Err(invalid()),
                }
            }
        };
        Ok(value)
    }
}

fn parse_int<T>(text: &str) -> Option<T>
where
    T: FromStr + TryFrom<i128>,
{
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let magnitude = i128::from_str_radix(hex, 16).ok()?;
        let value = if negative {
            magnitude.checked_neg()?
        } else {
            magnitude
        };
        return T::try_from(value).ok();
    }
    text.parse().ok()
}

/// A typed value to search for or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ScalarValue {
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    Char(u8),
}

impl ScalarValue {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Self::I32(_) => ScalarType::I32,
            Self::I64(_) => ScalarType::I64,
            Self::U32(_) => ScalarType::U32,
            Self::U64(_) => ScalarType::U64,
            Self::Char(_) => ScalarType::Char,
        }
    }

    pub fn width(&self) -> usize {
        self.scalar_type().width()
    }

    /// Little-endian byte image, exactly `width()` bytes long.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match *self {
            Self::I32(v) => v.to_le_bytes().to_vec(),
            Self::I64(v) => v.to_le_bytes().to_vec(),
            Self::U32(v) => v.to_le_bytes().to_vec(),
            Self::U64(v) => v.to_le_bytes().to_vec(),
            Self::Char(v) => vec![v],
        }
    }
}

impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::I32(v) => write!(f, "{}", v),
            Self::I64(v) => write!(f, "{}", v),
            Self::U32(v) => write!(f, "{}", v),
            Self::U64(v) => write!(f, "{}", v),
            Self::Char(v) => write!(f, "'{}'", *v as char),
        }
    }
}

/// Matches fixed-width byte windows against a value.
///
/// Windows are compared as byte slices, so any offset into a buffer is valid
/// regardless of alignment.
#[derive(Debug, Clone)]
pub struct Comparator {
    needle: Vec<u8>,
}

impl Comparator {
    pub fn new(value: &ScalarValue) -> Self {
        Self {
            needle: value.to_le_bytes(),
        }
    }

    pub fn width(&self) -> usize {
        self.needle.len()
    }

    pub fn matches(&self, window: &[u8]) -> bool {
        window == self.needle.as_slice()
    }

    /// Offsets of every match in `buffer`.
    ///
    /// A buffer shorter than the value width yields nothing.
    pub fn scan<'a>(&'a self, buffer: &'a [u8]) -> impl Iterator<Item = usize> + 'a {
        buffer
            .windows(self.width())
            .enumerate()
            .filter_map(|(offset, window)| self.matches(window).then_some(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_widths() {
        let widths: Vec<_> = ScalarType::iter().map(|t| t.width()).collect();
        assert_eq!(widths, vec![4, 8, 4, 8, 1]);
    }

    #[test]
    fn test_type_from_str() {
        assert_eq!("u32".parse::<ScalarType>().unwrap(), ScalarType::U32);
        assert_eq!("I64".parse::<ScalarType>().unwrap(), ScalarType::I64);
        assert_eq!("char".parse::<ScalarType>().unwrap(), ScalarType::Char);
        assert!("f32".parse::<ScalarType>().is_err());
        assert_eq!(ScalarType::U64.to_string(), "u64");
    }

    #[test]
    fn test_parse_decimal_and_hex() {
        assert_eq!(
            ScalarType::U32.parse_value("42").unwrap(),
            ScalarValue::U32(42)
        );
        assert_eq!(
            ScalarType::U32.parse_value("0x2A").unwrap(),
            ScalarValue::U32(42)
        );
        assert_eq!(
            ScalarType::I32.parse_value("-7").unwrap(),
            ScalarValue::I32(-7)
        );
        assert_eq!(
            ScalarType::I64.parse_value("-0x10").unwrap(),
            ScalarValue::I64(-16)
        );
        assert_eq!(
            ScalarType::U64.parse_value(" 18446744073709551615 ").unwrap(),
            ScalarValue::U64(u64::MAX)
        );
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert!(ScalarType::U32.parse_value("-1").is_err());
        assert!(ScalarType::U32.parse_value("4294967296").is_err());
        assert!(ScalarType::I32.parse_value("0x80000000").is_err());
        assert!(ScalarType::U32.parse_value("abc").is_err());
        assert!(ScalarType::U32.parse_value("").is_err());
    }

    #[test]
    fn test_parse_rejects_signed_hex_digits() {
        assert!(ScalarType::I32.parse_value("0x-5").is_err());
        assert!(ScalarType::I64.parse_value("0x+5").is_err());
        assert!(ScalarType::U64.parse_value("0x").is_err());
        assert!(
            ScalarType::I64
                .parse_value("-0x-80000000000000000000000000000000")
                .is_err()
        );
        assert_eq!(
            ScalarType::I64.parse_value("-0x8000000000000000").unwrap(),
            ScalarValue::I64(i64::MIN)
        );
    }

    #[test]
    fn test_parse_char() {
        assert_eq!(
            ScalarType::Char.parse_value("A").unwrap(),
            ScalarValue::Char(b'A')
        );
        assert!(ScalarType::Char.parse_value("AB").is_err());
        assert!(ScalarType::Char.parse_value("é").is_err());
    }

    #[test]
    fn test_value_bytes() {
        assert_eq!(ScalarValue::U32(42).to_le_bytes(), vec![42, 0, 0, 0]);
        assert_eq!(ScalarValue::I32(-1).to_le_bytes(), vec![0xFF; 4]);
        assert_eq!(ScalarValue::U64(1).to_le_bytes().len(), 8);
        assert_eq!(ScalarValue::Char(b'z').to_le_bytes(), vec![b'z']);
    }

    #[test]
    fn test_scan_unaligned() {
        let mut buffer = vec![0u8; 11];
        buffer[3..7].copy_from_slice(&0xDEADBEEFu32.to_le_bytes());
        let comparator = Comparator::new(&ScalarValue::U32(0xDEADBEEF));

        let hits: Vec<_> = comparator.scan(&buffer).collect();
        assert_eq!(hits, vec![3]);
    }

    #[test]
    fn test_scan_overlapping_matches() {
        let buffer = [0u8; 6];
        let comparator = Comparator::new(&ScalarValue::U32(0));

        let hits: Vec<_> = comparator.scan(&buffer).collect();
        assert_eq!(hits, vec![0, 1, 2]);
    }

    #[test]
    fn test_scan_buffer_shorter_than_width() {
        let comparator = Comparator::new(&ScalarValue::U64(0));
        assert_eq!(comparator.scan(&[0, 0, 0]).count(), 0);
        assert_eq!(comparator.scan(&[]).count(), 0);
    }
}
