//! bn254 scalar field elements
//!
//! every leaf, root, commitment and key half lives in this field. at the api
//! edge they are 256-bit integers rendered as decimal strings, which is the
//! format the cache document, the prover and the relay all speak.

use crate::error::{Result, TonnelError};
use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use once_cell::sync::Lazy;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroize;

static MODULUS: Lazy<BigUint> =
    Lazy::new(|| BigUint::from_bytes_le(&<Fr as PrimeField>::MODULUS.to_bytes_le()));

/// field modulus p as an integer
pub fn modulus() -> &'static BigUint {
    &MODULUS
}

/// element of the bn254 scalar field
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FieldElement(pub(crate) Fr);

impl FieldElement {
    pub fn zero() -> Self {
        Self(Fr::from(0u64))
    }

    pub fn from_u64(v: u64) -> Self {
        Self(Fr::from(v))
    }

    /// canonical conversion, fails for values >= p
    pub fn from_biguint(v: &BigUint) -> Result<Self> {
        if v >= modulus() {
            return Err(TonnelError::InvalidData(format!(
                "{} is not below the field modulus",
                v
            )));
        }
        Ok(Self::reduce(v))
    }

    /// conversion reducing mod p
    pub fn reduce(v: &BigUint) -> Self {
        Self(Fr::from_le_bytes_mod_order(&v.to_bytes_le()))
    }

    /// read a 32-byte big-endian integer (rejects values >= p)
    pub fn from_be_bytes(bytes: &[u8; 32]) -> Result<Self> {
        Self::from_biguint(&BigUint::from_bytes_be(bytes))
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_le(&self.0.into_bigint().to_bytes_le())
    }

    /// 32-byte big-endian encoding
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let bytes = self.0.into_bigint().to_bytes_be();
        let mut out = [0u8; 32];
        out[32 - bytes.len()..].copy_from_slice(&bytes);
        out
    }

    pub fn inner(&self) -> Fr {
        self.0
    }
}

impl Zeroize for FieldElement {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl From<Fr> for FieldElement {
    fn from(f: Fr) -> Self {
        Self(f)
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_biguint())
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.to_biguint())
    }
}

impl FromStr for FieldElement {
    type Err = TonnelError;

    fn from_str(s: &str) -> Result<Self> {
        let v = BigUint::parse_bytes(s.trim().as_bytes(), 10)
            .ok_or_else(|| TonnelError::InvalidData(format!("not a decimal integer: {:?}", s)))?;
        Self::from_biguint(&v)
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// serde helper for 256-bit integers that may exceed the field (recipient)
pub mod decimal {
    use num_bigint::BigUint;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&v.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(deserializer)?;
        BigUint::parse_bytes(s.as_bytes(), 10)
            .ok_or_else(|| de::Error::custom(format!("not a decimal integer: {:?}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_roundtrip() {
        let s = "21663839004416932945382355908790599225266501822907911457504978515578255421292";
        let fe: FieldElement = s.parse().unwrap();
        assert_eq!(fe.to_string(), s);
    }

    #[test]
    fn test_rejects_modulus() {
        let p = modulus().to_str_radix(10);
        assert!(p.parse::<FieldElement>().is_err());

        let below = (modulus() - 1u32).to_str_radix(10);
        assert!(below.parse::<FieldElement>().is_ok());
    }

    #[test]
    fn test_be_bytes() {
        let fe = FieldElement::from_u64(0x0102);
        let bytes = fe.to_be_bytes();
        assert_eq!(bytes[30], 0x01);
        assert_eq!(bytes[31], 0x02);
        assert_eq!(FieldElement::from_be_bytes(&bytes).unwrap(), fe);
    }

    #[test]
    fn test_serde_as_string() {
        let fe = FieldElement::from_u64(42);
        let json = serde_json::to_string(&fe).unwrap();
        assert_eq!(json, "\"42\"");
        let back: FieldElement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fe);
    }
}
