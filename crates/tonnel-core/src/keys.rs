//! deposit secrets
//!
//! a deposit is controlled by two random field elements. the user keeps them
//! as `<ASSET>_<DENOMINATION>_<secret>_<nullifier>`, which also pins the pool.

use crate::error::{Result, TonnelError};
use crate::field::FieldElement;
use crate::mimc;
use crate::pools::{AssetKind, PoolConfig, PoolRegistry};
use crate::units;
use num_bigint::BigUint;
use rand::RngCore;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// random bytes per key half; 248 bits always fit the field
const KEY_BYTES: usize = 31;

/// file name prefixes recognised by `find_key_file`
const KEY_FILE_PREFIXES: [&str; 2] = ["PrivateKey", "privatekeydocument"];

/// deposit secret, wiped on drop
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    pub secret: FieldElement,
    pub nullifier: FieldElement,
}

impl PrivateKey {
    pub fn new(secret: FieldElement, nullifier: FieldElement) -> Self {
        Self { secret, nullifier }
    }

    /// fresh key from the os rng
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::rngs::OsRng)
    }

    pub fn generate_with<R: RngCore>(rng: &mut R) -> Self {
        let mut secret = [0u8; KEY_BYTES];
        let mut nullifier = [0u8; KEY_BYTES];
        rng.fill_bytes(&mut secret);
        rng.fill_bytes(&mut nullifier);
        let key = Self {
            secret: FieldElement::reduce(&BigUint::from_bytes_le(&secret)),
            nullifier: FieldElement::reduce(&BigUint::from_bytes_le(&nullifier)),
        };
        secret.zeroize();
        nullifier.zeroize();
        key
    }

    /// Hash2(secret, nullifier), the tree leaf
    pub fn commitment(&self) -> FieldElement {
        mimc::hash2(&self.secret, &self.nullifier)
    }

    /// Hash2(nullifier, nullifier), revealed on withdraw
    pub fn nullifier_hash(&self) -> FieldElement {
        mimc::hash2(&self.nullifier, &self.nullifier)
    }

    /// `<ASSET>_<DENOMINATION>_<secret>_<nullifier>`
    pub fn encode(&self, pool: &PoolConfig) -> String {
        format!(
            "{}_{}_{}_{}",
            pool.kind,
            units::format_amount(pool.denomination),
            self.secret,
            self.nullifier
        )
    }

    /// parse a key string and resolve its pool in `registry`
    pub fn decode(s: &str, registry: &PoolRegistry) -> Result<(PrivateKey, PoolConfig)> {
        let s = s.trim();
        let parts: Vec<&str> = s.split('_').collect();
        if parts.len() != 4 {
            return Err(TonnelError::InvalidKey(format!(
                "expected 4 '_'-separated parts, got {}",
                parts.len()
            )));
        }

        let kind: AssetKind = parts[0].parse()?;
        let denomination = units::parse_amount(parts[1])?;
        let pool = registry.find(kind, denomination)?.clone();

        let secret = parse_half(parts[2], "secret")?;
        let nullifier = parse_half(parts[3], "nullifier")?;
        Ok((PrivateKey { secret, nullifier }, pool))
    }
}

fn parse_half(s: &str, what: &str) -> Result<FieldElement> {
    s.parse()
        .map_err(|_| TonnelError::InvalidKey(format!("{} is not a field element", what)))
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("commitment", &self.commitment())
            .finish_non_exhaustive()
    }
}

/// first `PrivateKey*.txt` / `privatekeydocument*.txt` in `dir`, by name
pub fn find_key_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| {
            name.ends_with(".txt") && KEY_FILE_PREFIXES.iter().any(|p| name.starts_with(p))
        })
        .collect();
    names.sort();
    Ok(names.into_iter().next().map(|name| dir.join(name)))
}

/// trimmed secret string stored in a key file
pub fn read_key_file(path: &Path) -> Result<String> {
    let contents = fs::read_to_string(path)?;
    let secret = contents.trim();
    if secret.is_empty() {
        return Err(TonnelError::InvalidKey(format!("{} is empty", path.display())));
    }
    Ok(secret.to_string())
}
