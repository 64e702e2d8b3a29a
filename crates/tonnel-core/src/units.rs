//! amount formatting
//!
//! amounts are integers in nano units (10^-9 of a whole coin), the unit both
//! the native asset and the pool token use on chain.

use crate::error::{Result, TonnelError};

/// fractional digits of one whole unit
pub const DECIMALS: u32 = 9;

/// nano units per whole unit
pub const NANO: u128 = 1_000_000_000;

/// render nano units as whole units, trailing zeros trimmed ("5", "5.15")
pub fn format_amount(nano: u128) -> String {
    let whole = nano / NANO;
    let frac = nano % NANO;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac, width = DECIMALS as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// parse whole units ("5", "0.05") into nano units
pub fn parse_amount(s: &str) -> Result<u128> {
    let s = s.trim();
    let invalid = || TonnelError::InvalidAmount(s.to_string());

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if frac.len() > DECIMALS as usize {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid())? };
    let frac: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = DECIMALS as usize);
        padded.parse().map_err(|_| invalid())?
    };

    whole
        .checked_mul(NANO)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(invalid)
}

/// per-mille fee as a percent string with one decimal (30 -> "3.0%")
pub fn percent_string(per_mille: u32) -> String {
    format!("{}.{}%", per_mille / 10, per_mille % 10)
}

/// serde helper: nano amounts written as whole-unit strings
pub mod serde_amount {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_amount(*v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_amount(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        assert_eq!(format_amount(5 * NANO), "5");
        assert_eq!(format_amount(5_150_000_000), "5.15");
        assert_eq!(format_amount(50_000_000), "0.05");
        assert_eq!(format_amount(1), "0.000000001");
        assert_eq!(format_amount(0), "0");
    }

    #[test]
    fn test_parse() {
        assert_eq!(parse_amount("5").unwrap(), 5 * NANO);
        assert_eq!(parse_amount("0.05").unwrap(), 50_000_000);
        assert_eq!(parse_amount("1000").unwrap(), 1000 * NANO);
        assert_eq!(parse_amount(".5").unwrap(), NANO / 2);
        assert!(parse_amount("").is_err());
        assert!(parse_amount("1.0000000001").is_err());
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("1e9").is_err());
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent_string(30), "3.0%");
        assert_eq!(percent_string(7), "0.7%");
        assert_eq!(percent_string(100), "10.0%");
    }
}
