//! pool registry
//!
//! every pool is one contract accepting one fixed denomination of one asset.
//! the registry is a plain value so callers (and tests) can swap in their own.

use crate::address::Address;
use crate::error::{Result, TonnelError};
use crate::units::{self, NANO};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// asset a pool shields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    /// native TON, deposited by a direct contract call
    #[serde(rename = "TON")]
    Native,
    /// TONNEL jetton, deposited by a token transfer with a forwarded payload
    #[serde(rename = "TONNEL")]
    Token,
}

impl AssetKind {
    /// ticker used in secret key strings
    pub fn ticker(&self) -> &'static str {
        match self {
            AssetKind::Native => "TON",
            AssetKind::Token => "TONNEL",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ticker())
    }
}

impl FromStr for AssetKind {
    type Err = TonnelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "TON" => Ok(AssetKind::Native),
            "TONNEL" => Ok(AssetKind::Token),
            other => Err(TonnelError::UnknownPool {
                asset: other.to_string(),
                denomination: String::new(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub kind: AssetKind,
    /// fixed deposit size in nano units
    #[serde(with = "units::serde_amount")]
    pub denomination: u128,
    /// pool fee per mille, charged on top of the denomination
    pub fee: u32,
    /// pool contract
    pub address: Address,
    /// jetton master, present iff `kind` is `Token`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_root: Option<Address>,
}

impl PoolConfig {
    pub fn native(denomination: u128, fee: u32, address: Address) -> Self {
        Self {
            kind: AssetKind::Native,
            denomination,
            fee,
            address,
            token_root: None,
        }
    }

    pub fn token(denomination: u128, fee: u32, address: Address, token_root: Address) -> Self {
        Self {
            kind: AssetKind::Token,
            denomination,
            fee,
            address,
            token_root: Some(token_root),
        }
    }

    /// denomination plus pool fee: denomination * (1000 + fee) / 1000,
    /// saturating for pools that never went through validation
    pub fn amount_with_fee(&self) -> u128 {
        self.scaled_amount().unwrap_or(u128::MAX)
    }

    fn scaled_amount(&self) -> Option<u128> {
        self.denomination
            .checked_mul(1000 + self.fee as u128)
            .map(|scaled| scaled / 1000)
    }

    /// human label, e.g. "5 TON (fee 3.0%)"
    pub fn label(&self) -> String {
        format!(
            "{} {} (fee {})",
            units::format_amount(self.denomination),
            self.kind,
            units::percent_string(self.fee)
        )
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let invalid = |why: &str| {
            TonnelError::InvalidData(format!("pool {}: {}", self.address, why))
        };
        match (self.kind, &self.token_root) {
            (AssetKind::Native, Some(_)) => return Err(invalid("native pool with a token root")),
            (AssetKind::Token, None) => return Err(invalid("token pool without a token root")),
            _ => {}
        }
        if self.denomination == 0 {
            return Err(invalid("zero denomination"));
        }
        if self.scaled_amount().is_none() {
            return Err(invalid("denomination with fee overflows"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PoolRegistry {
    pools: Vec<PoolConfig>,
}

const TONNEL_JETTON: &str = "EQDNDv54v_TEU5t26rFykylsdPQsv5nsSZaH_v7JSJPtMitv";

const MAINNET_NATIVE: [(u128, u32, &str); 3] = [
    (5, 30, "EQBemaU1eAM-fJP7tSniJGEmltPjitgGnlrP6UaXI7nzmEuV"),
    (50, 7, "EQBZ0-2-isPEN_lIyg9eqXO_RFWrl_PWIJq5K6SVcUwne23W"),
    (1000, 3, "EQB-s4WzIgGP9U6DNlFH_kSn0JuxhBCBXr_rKz2ztEiozTto"),
];

const MAINNET_TOKEN: [(u128, u32, &str); 3] = [
    (66, 4, "EQCNoApBzMacKKdTwcvi1iOx78e98bTSaN1Gx_nnmd3Ek5Yn"),
    (200, 4, "EQDzAhS3Ev8cxEBJ96MIqPjxyD_k0L3enzDWnQ3Z-4tUK1h5"),
    (1000, 5, "EQAgoyECSzCIFTFkMIvDLgdUE3D9RxGfYQQGfxy3lBBc_Ke_"),
];

impl PoolRegistry {
    /// validated registry; token root present iff token pool, unique
    /// (asset, denomination) keys
    pub fn new(pools: Vec<PoolConfig>) -> Result<Self> {
        let mut seen = HashSet::new();
        for pool in &pools {
            pool.validate()?;
            if !seen.insert((pool.kind, pool.denomination)) {
                return Err(TonnelError::InvalidData(format!(
                    "duplicate pool {} {}",
                    pool.kind,
                    units::format_amount(pool.denomination)
                )));
            }
        }
        Ok(Self { pools })
    }

    /// production pools
    pub fn mainnet() -> Result<Self> {
        let jetton: Address = TONNEL_JETTON.parse()?;
        let mut pools = Vec::with_capacity(MAINNET_NATIVE.len() + MAINNET_TOKEN.len());
        for (whole, fee, addr) in MAINNET_NATIVE {
            pools.push(PoolConfig::native(whole * NANO, fee, addr.parse()?));
        }
        for (whole, fee, addr) in MAINNET_TOKEN {
            pools.push(PoolConfig::token(whole * NANO, fee, addr.parse()?, jetton));
        }
        Self::new(pools)
    }

    /// exact (asset, denomination) lookup
    pub fn find(&self, kind: AssetKind, denomination: u128) -> Result<&PoolConfig> {
        self.pools
            .iter()
            .find(|p| p.kind == kind && p.denomination == denomination)
            .ok_or_else(|| TonnelError::UnknownPool {
                asset: kind.to_string(),
                denomination: units::format_amount(denomination),
            })
    }

    pub fn by_address(&self, address: &Address) -> Option<&PoolConfig> {
        self.pools.iter().find(|p| &p.address == address)
    }

    pub fn by_kind(&self, kind: AssetKind) -> impl Iterator<Item = &PoolConfig> {
        self.pools.iter().filter(move |p| p.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PoolConfig> {
        self.pools.iter()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_registry() {
        let registry = PoolRegistry::mainnet().unwrap();
        assert_eq!(registry.len(), 6);
        assert_eq!(registry.by_kind(AssetKind::Native).count(), 3);
        assert_eq!(registry.by_kind(AssetKind::Token).count(), 3);

        let five = registry.find(AssetKind::Native, 5 * NANO).unwrap();
        assert_eq!(five.fee, 30);
        assert_eq!(
            five.address.to_string(),
            "EQBemaU1eAM-fJP7tSniJGEmltPjitgGnlrP6UaXI7nzmEuV"
        );
        assert!(five.token_root.is_none());

        let tonnel = registry.find(AssetKind::Token, 1000 * NANO).unwrap();
        assert_eq!(tonnel.fee, 5);
        assert_eq!(tonnel.token_root.unwrap().to_string(), TONNEL_JETTON);
    }

    #[test]
    fn test_unknown_denomination() {
        let registry = PoolRegistry::mainnet().unwrap();
        let err = registry.find(AssetKind::Native, 7 * NANO).unwrap_err();
        assert!(matches!(err, TonnelError::UnknownPool { .. }));
        // same denomination, other asset
        assert!(registry.find(AssetKind::Token, 5 * NANO).is_err());
    }

    #[test]
    fn test_amount_with_fee() {
        let registry = PoolRegistry::mainnet().unwrap();
        let five = registry.find(AssetKind::Native, 5 * NANO).unwrap();
        assert_eq!(five.amount_with_fee(), 5_150_000_000);
        assert_eq!(five.label(), "5 TON (fee 3.0%)");
    }

    #[test]
    fn test_validation() {
        let addr = Address::new(0, [1u8; 32]);
        let root = Address::new(0, [2u8; 32]);

        let mut bad = PoolConfig::native(NANO, 1, addr);
        bad.token_root = Some(root);
        assert!(PoolRegistry::new(vec![bad]).is_err());

        let mut bad = PoolConfig::token(NANO, 1, addr, root);
        bad.token_root = None;
        assert!(PoolRegistry::new(vec![bad]).is_err());

        let dup = vec![
            PoolConfig::native(NANO, 1, addr),
            PoolConfig::native(NANO, 2, Address::new(0, [3u8; 32])),
        ];
        assert!(PoolRegistry::new(dup).is_err());

        // same denomination on different assets is fine
        let ok = vec![
            PoolConfig::native(NANO, 1, addr),
            PoolConfig::token(NANO, 1, Address::new(0, [3u8; 32]), root),
        ];
        assert_eq!(PoolRegistry::new(ok).unwrap().len(), 2);
    }

    #[test]
    fn test_oversized_denomination_rejected() {
        let addr = Address::new(0, [1u8; 32]);
        let huge = PoolConfig::native(300_000_000_000_000_000_000_000_000_000 * NANO, 30, addr);
        let err = PoolRegistry::new(vec![huge.clone()]).unwrap_err();
        assert!(matches!(err, TonnelError::InvalidData(_)));
        // unvalidated configs saturate instead of wrapping
        assert_eq!(huge.amount_with_fee(), u128::MAX);

        let largest = PoolConfig::native(u128::MAX / 2000, 1000, addr);
        assert!(PoolRegistry::new(vec![largest]).is_ok());
    }

    #[test]
    fn test_asset_kind_strings() {
        assert_eq!("TON".parse::<AssetKind>().unwrap(), AssetKind::Native);
        assert_eq!("TONNEL".parse::<AssetKind>().unwrap(), AssetKind::Token);
        assert!("DFC".parse::<AssetKind>().is_err());
        assert_eq!(AssetKind::Token.to_string(), "TONNEL");
    }
}
