use crate::{
    Result,
    constants::{ADDRESS_CRC_SPAN, ADDRESS_LEN},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Dallas/Maxim CRC-8 (polynomial x^8 + x^5 + x^4 + 1, reflected form 0x8C).
///
/// This is the checksum carried in the last byte of every token address.
#[must_use]
pub fn dallas_crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
    }
    crc
}

/// Unique 8-byte address of a hardware token, in bus scan order.
///
/// # Security
/// Comparison is constant-time so that lookups do not leak how many
/// leading bytes of a presented address matched a stored one.
#[derive(Debug, Clone, Copy, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenAddress([u8; ADDRESS_LEN]);

impl TokenAddress {
    /// Wrap raw address bytes without checksum validation.
    ///
    /// Used for addresses read back from the store, which were validated
    /// when they were first scanned.
    #[must_use]
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        TokenAddress(bytes)
    }

    /// Validate a freshly scanned address.
    ///
    /// # Errors
    /// Returns `Error::ChecksumInvalid` if the 8th byte is not the CRC-8 of
    /// the first seven.
    pub fn from_scan(bytes: [u8; ADDRESS_LEN]) -> Result<Self> {
        let expected = dallas_crc8(&bytes[..ADDRESS_CRC_SPAN]);
        let actual = bytes[ADDRESS_CRC_SPAN];
        if expected != actual {
            return Err(Error::ChecksumInvalid { expected, actual });
        }
        Ok(TokenAddress(bytes))
    }

    /// Build a valid address from its first seven bytes, appending the CRC.
    #[must_use]
    pub fn with_checksum(prefix: [u8; ADDRESS_CRC_SPAN]) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[..ADDRESS_CRC_SPAN].copy_from_slice(&prefix);
        bytes[ADDRESS_CRC_SPAN] = dallas_crc8(&prefix);
        TokenAddress(bytes)
    }

    /// Get the raw address bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Returns `true` if the checksum byte matches the rest of the address.
    #[must_use]
    pub fn has_valid_checksum(&self) -> bool {
        dallas_crc8(&self.0[..ADDRESS_CRC_SPAN]) == self.0[ADDRESS_CRC_SPAN]
    }
}

impl fmt::Display for TokenAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Parses 16 hex digits, optionally separated by `:`, `-` or spaces.
impl std::str::FromStr for TokenAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits: String = s
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | ' '))
            .collect();

        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(&digits, &mut bytes).map_err(|e| {
            Error::InvalidAddress(format!("'{s}' is not {ADDRESS_LEN} hex bytes: {e}"))
        })?;
        Ok(TokenAddress(bytes))
    }
}

impl TryFrom<String> for TokenAddress {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TokenAddress> for String {
    fn from(address: TokenAddress) -> Self {
        address.to_string()
    }
}

impl PartialEq for TokenAddress {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl std::hash::Hash for TokenAddress {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// Colour of the tri-colour status indicator.
///
/// The discriminant is the 3-bit field driven onto the LED:
/// bit 0 enables blue, bit 1 green and bit 2 red.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum IndicatorColor {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Purple = 5,
    Yellow = 6,
    White = 7,
}

impl IndicatorColor {
    /// Create a colour from its 3-bit field.
    ///
    /// # Errors
    /// Returns `Error::InvalidColor` if any bit above bit 2 is set.
    pub fn from_bits(bits: u8) -> Result<Self> {
        Ok(match bits {
            0 => IndicatorColor::Black,
            1 => IndicatorColor::Blue,
            2 => IndicatorColor::Green,
            3 => IndicatorColor::Cyan,
            4 => IndicatorColor::Red,
            5 => IndicatorColor::Purple,
            6 => IndicatorColor::Yellow,
            7 => IndicatorColor::White,
            _ => return Err(Error::InvalidColor(bits)),
        })
    }

    #[inline]
    #[must_use]
    pub fn bits(self) -> u8 {
        self as u8
    }

    #[inline]
    #[must_use]
    pub fn blue(self) -> bool {
        self.bits() & 0b001 != 0
    }

    #[inline]
    #[must_use]
    pub fn green(self) -> bool {
        self.bits() & 0b010 != 0
    }

    #[inline]
    #[must_use]
    pub fn red(self) -> bool {
        self.bits() & 0b100 != 0
    }
}

impl fmt::Display for IndicatorColor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            IndicatorColor::Black => "black",
            IndicatorColor::Blue => "blue",
            IndicatorColor::Green => "green",
            IndicatorColor::Cyan => "cyan",
            IndicatorColor::Red => "red",
            IndicatorColor::Purple => "purple",
            IndicatorColor::Yellow => "yellow",
            IndicatorColor::White => "white",
        };
        write!(f, "{name}")
    }
}
