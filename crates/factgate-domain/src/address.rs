//! Address module - the identity a submitter controls

use std::fmt;
use std::str::FromStr;

/// Length of an address in bytes
pub const ADDRESS_LEN: usize = 20;

/// An externally-controlled, address-like public identifier
///
/// Addresses are 20 bytes, written as 40 hex digits with an optional `0x`
/// prefix. Parsing is case-insensitive, so two textual forms that differ
/// only in letter case (including EIP-55 checksummed forms) compare equal.
///
/// # Examples
///
/// ```
/// use factgate_domain::Address;
///
/// let lower = Address::parse("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
/// let mixed = Address::parse("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
/// assert_eq!(lower, mixed);
/// assert_eq!(lower.to_string(), "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Create an address from raw bytes
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse an address from hex text
    ///
    /// Surrounding whitespace is ignored. The `0x`/`0X` prefix is optional.
    pub fn parse(s: &str) -> Result<Self, String> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.len() != ADDRESS_LEN * 2 {
            return Err(format!(
                "Invalid address length: expected {} hex digits, got {}",
                ADDRESS_LEN * 2,
                digits.len()
            ));
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| format!("Invalid address hex: {}", e))?;
        Ok(Self(bytes))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_and_without_prefix() {
        let a = Address::parse("0x00000000000000000000000000000000000000ff").unwrap();
        let b = Address::parse("00000000000000000000000000000000000000ff").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_bytes()[19], 0xff);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let upper = Address::parse("0XABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD").unwrap();
        let lower = Address::parse("0xabcdefabcdefabcdefabcdefabcdefabcdefabcd").unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Address::parse("").is_err());
        assert!(Address::parse("0x").is_err());
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse("0xzz00000000000000000000000000000000000000").is_err());
        assert!(Address::parse("0x00000000000000000000000000000000000000000").is_err());
    }

    #[test]
    fn test_display_is_lowercase_prefixed() {
        let addr = Address::from_bytes([0xAB; ADDRESS_LEN]);
        let s = addr.to_string();
        assert!(s.starts_with("0x"));
        assert_eq!(s.len(), 42);
        assert_eq!(s, s.to_lowercase());
    }
}
