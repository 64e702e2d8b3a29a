//! error types for tonnel

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TonnelError {
    /// ledger rpc or relay network failure
    #[error("transport error: {0}")]
    Transport(String),

    /// rebuilt root disagrees with the root the pool contract reports
    #[error("cache corruption for pool {pool}: local root {local}, chain root {chain}")]
    CacheCorruption {
        pool: String,
        local: String,
        chain: String,
    },

    #[error("prover error: {0}")]
    Prover(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("withdraw rejected by pre-flight verification on pool {0}")]
    VerificationRejected(String),

    #[error("unknown pool: {asset} {denomination}")]
    UnknownPool { asset: String, denomination: String },

    #[error("invalid secret key: {0}")]
    InvalidKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid fee: {0}")]
    InvalidFee(String),

    #[error("commitment not found in pool tree")]
    CommitmentNotFound,

    #[error("merkle tree is full ({0} leaves)")]
    TreeFull(usize),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for TonnelError {
    fn from(e: reqwest::Error) -> Self {
        TonnelError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for TonnelError {
    fn from(e: serde_json::Error) -> Self {
        TonnelError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for TonnelError {
    fn from(e: toml::de::Error) -> Self {
        TonnelError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TonnelError>;
