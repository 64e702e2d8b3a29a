//! client configuration

use crate::error::Result;
use crate::pools::{PoolConfig, PoolRegistry};
use crate::units;
use crate::DEFAULT_RELAY_URL;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// attached ton amounts for contract calls, nano units
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasSchedule {
    /// attached to every deposit, forwarded to the pool on token deposits
    #[serde(with = "units::serde_amount")]
    pub deposit: u128,
    /// attached to a direct withdraw
    #[serde(with = "units::serde_amount")]
    pub withdraw: u128,
    /// jetton wallet transfer cost on top of the forwarded amount
    #[serde(with = "units::serde_amount")]
    pub token_transfer: u128,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            deposit: 200_000_000,
            withdraw: 300_000_000,
            token_transfer: 50_000_000,
        }
    }
}

/// client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// per-pool leaf cache documents
    pub cache_dir: PathBuf,
    /// relay submitProof endpoint
    pub relay_url: String,
    pub gas: GasSchedule,
    /// replaces the built-in mainnet registry when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pools: Option<Vec<PoolConfig>>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("temp").join("cache"),
            relay_url: DEFAULT_RELAY_URL.to_string(),
            gas: GasSchedule::default(),
            pools: None,
        }
    }
}

impl ClientConfig {
    /// load from a toml file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// configured pools, or the mainnet registry
    pub fn registry(&self) -> Result<PoolRegistry> {
        match &self.pools {
            Some(pools) => PoolRegistry::new(pools.clone()),
            None => PoolRegistry::mainnet(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pools::AssetKind;
    use crate::units::NANO;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.cache_dir, Path::new("temp/cache"));
        assert_eq!(config.relay_url, DEFAULT_RELAY_URL);
        assert_eq!(config.gas.deposit, NANO / 5);
        assert_eq!(config.registry().unwrap().len(), 6);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = ClientConfig::from_toml("").unwrap();
        assert_eq!(config.gas, GasSchedule::default());
        assert!(config.pools.is_none());
    }

    #[test]
    fn test_partial_toml() {
        let config = ClientConfig::from_toml(
            r#"
            cache_dir = "/var/lib/tonnel"

            [gas]
            withdraw = "0.5"
            "#,
        )
        .unwrap();
        assert_eq!(config.cache_dir, Path::new("/var/lib/tonnel"));
        assert_eq!(config.gas.withdraw, NANO / 2);
        assert_eq!(config.gas.deposit, 200_000_000);
        assert_eq!(config.relay_url, DEFAULT_RELAY_URL);
    }

    #[test]
    fn test_pool_override() {
        let config = ClientConfig::from_toml(
            r#"
            [[pools]]
            kind = "TON"
            denomination = "1"
            fee = 10
            address = "EQBemaU1eAM-fJP7tSniJGEmltPjitgGnlrP6UaXI7nzmEuV"
            "#,
        )
        .unwrap();
        let registry = config.registry().unwrap();
        assert_eq!(registry.len(), 1);
        let pool = registry.find(AssetKind::Native, NANO).unwrap();
        assert_eq!(pool.fee, 10);
    }

    #[test]
    fn test_invalid_pool_override() {
        let config = ClientConfig::from_toml(
            r#"
            [[pools]]
            kind = "TONNEL"
            denomination = "1"
            fee = 10
            address = "EQBemaU1eAM-fJP7tSniJGEmltPjitgGnlrP6UaXI7nzmEuV"
            "#,
        )
        .unwrap();
        assert!(config.registry().is_err());
    }

    #[test]
    fn test_overflowing_pool_override() {
        let config = ClientConfig::from_toml(
            r#"
            [[pools]]
            kind = "TON"
            denomination = "300000000000000000000000000000"
            fee = 30
            address = "EQBemaU1eAM-fJP7tSniJGEmltPjitgGnlrP6UaXI7nzmEuV"
            "#,
        )
        .unwrap();
        assert!(config.registry().is_err());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tonnel.toml");
        fs::write(&path, "relay_url = \"http://127.0.0.1:9000/submitProof\"\n").unwrap();
        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.relay_url, "http://127.0.0.1:9000/submitProof");
        assert!(ClientConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
