//! TON account addresses
//!
//! accepts the raw form (`0:<64 hex>`) and the 48-character user-friendly
//! form (base64 or base64url of tag, workchain, hash and a crc16 checksum).

use crate::error::{Result, TonnelError};
use base64::Engine;
use num_bigint::BigUint;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TESTNET: u8 = 0x80;

/// friendly form length in bytes before base64
const FRIENDLY_LEN: usize = 36;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub workchain: i8,
    pub hash: [u8; 32],
}

impl Address {
    pub fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self { workchain, hash }
    }

    /// parse `<workchain>:<hex hash>`
    pub fn from_raw(s: &str) -> Result<Self> {
        let invalid = || TonnelError::InvalidAddress(s.to_string());
        let (wc, hash_hex) = s.split_once(':').ok_or_else(invalid)?;
        let workchain: i8 = wc.parse().map_err(|_| invalid())?;
        let bytes = hex::decode(hash_hex).map_err(|_| invalid())?;
        let hash: [u8; 32] = bytes.try_into().map_err(|_| invalid())?;
        Ok(Self { workchain, hash })
    }

    /// parse the base64 friendly form, checksum verified
    pub fn from_friendly(s: &str) -> Result<Self> {
        let invalid = |why: &str| TonnelError::InvalidAddress(format!("{}: {}", s, why));

        // base64url and standard alphabets both occur in the wild
        let normalized: String = s
            .chars()
            .map(|c| match c {
                '-' => '+',
                '_' => '/',
                c => c,
            })
            .collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(normalized)
            .map_err(|_| invalid("not base64"))?;
        if bytes.len() != FRIENDLY_LEN {
            return Err(invalid("wrong length"));
        }

        let tag = bytes[0] & !TAG_TESTNET;
        if tag != TAG_BOUNCEABLE && tag != TAG_NON_BOUNCEABLE {
            return Err(invalid("unknown tag"));
        }
        let expected = u16::from_be_bytes([bytes[34], bytes[35]]);
        if crc16(&bytes[..34]) != expected {
            return Err(invalid("checksum mismatch"));
        }

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[2..34]);
        Ok(Self {
            workchain: bytes[1] as i8,
            hash,
        })
    }

    /// `<workchain>:<hex>`
    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }

    /// bounceable url-safe friendly form
    pub fn to_friendly(&self) -> String {
        let mut bytes = Vec::with_capacity(FRIENDLY_LEN);
        bytes.push(TAG_BOUNCEABLE);
        bytes.push(self.workchain as u8);
        bytes.extend_from_slice(&self.hash);
        let crc = crc16(&bytes);
        bytes.extend_from_slice(&crc.to_be_bytes());
        base64::engine::general_purpose::URL_SAFE.encode(bytes)
    }

    /// first 256 bits of the serialized address (`10`, anycast `0`,
    /// 8-bit workchain, 256-bit hash); the recipient input of the
    /// withdraw circuit
    pub fn to_uint256(&self) -> BigUint {
        let mut v = BigUint::from(0b100u32);
        v <<= 8;
        v += BigUint::from(self.workchain as u8);
        v <<= 256;
        v += BigUint::from_bytes_be(&self.hash);
        v >> 11
    }
}

impl FromStr for Address {
    type Err = TonnelError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.contains(':') {
            Self::from_raw(s)
        } else {
            Self::from_friendly(s)
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_friendly())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_raw())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_friendly())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// crc-16/xmodem
fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}
