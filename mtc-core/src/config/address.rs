//! BLE device addresses

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors from parsing a textual address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressError {
    /// Not six colon-separated octets
    InvalidLength,
    /// An octet is not two hex digits
    InvalidOctet,
}

/// 48-bit BLE device address
///
/// Stored most significant octet first, the same order it is written in
/// text (`00:07:80:d0:47:43`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BleAddress(pub [u8; 6]);

impl BleAddress {
    /// Create an address from its octets
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Get the octets
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Parse `aa:bb:cc:dd:ee:ff` (case-insensitive)
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        let mut octets = [0u8; 6];
        let mut parts = text.trim().split(':');

        for octet in octets.iter_mut() {
            let part = parts.next().ok_or(AddressError::InvalidLength)?;
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(AddressError::InvalidOctet);
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| AddressError::InvalidOctet)?;
        }

        if parts.next().is_some() {
            return Err(AddressError::InvalidLength);
        }

        Ok(Self(octets))
    }
}

impl FromStr for BleAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BleAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}
