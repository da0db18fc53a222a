use crate::error::TypesError;
use bech32::{Bech32m, Hrp};
use std::fmt;
use std::str::FromStr;

/// Human-readable part of every encoded address.
const HRP: &str = "atmos";

/// Account identity of a lock owner, delegate, bettor, resolver, agent owner
/// or parameter admin. Rendered as bech32m (`atmos1...`) in logs and config.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// Unset admin in default parameters.
    pub const ZERO: Self = Self([0u8; 20]);

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    fn from_decoded(bytes: &[u8]) -> Result<Self, TypesError> {
        <[u8; 20]>::try_from(bytes)
            .map(Self)
            .map_err(|_| TypesError::InvalidAddressLength(bytes.len()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = bech32::encode::<Bech32m>(Hrp::parse_unchecked(HRP), &self.0).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = TypesError;

    /// Accepts `atmos1...` or a `0x`-prefixed hex string (handy in TOML).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(hex_part) = s.strip_prefix("0x") {
            return Self::from_decoded(&hex::decode(hex_part)?);
        }

        let (hrp, data) = bech32::decode(s).map_err(|e| TypesError::Bech32Error(e.to_string()))?;
        if hrp.as_str() != HRP {
            return Err(TypesError::InvalidAddressFormat(format!("unexpected prefix '{}'", hrp)));
        }
        Self::from_decoded(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_bech32m() {
        let addr = Address::from_bytes([7u8; 20]);
        let encoded = addr.to_string();
        assert!(encoded.starts_with("atmos1"));
        assert_eq!(encoded.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_hex_form_accepted() {
        let parsed: Address = format!("0x{}", "ab".repeat(20)).parse().unwrap();
        assert_eq!(parsed, Address::from_bytes([0xab; 20]));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!("invalid".parse::<Address>().is_err());
        assert_eq!("0x1234".parse::<Address>(), Err(TypesError::InvalidAddressLength(2)));

        // Valid bech32m under another prefix
        let foreign = bech32::encode::<Bech32m>(Hrp::parse_unchecked("merk"), &[1u8; 20]).unwrap();
        assert!(matches!(foreign.parse::<Address>(), Err(TypesError::InvalidAddressFormat(_))));
    }
}
