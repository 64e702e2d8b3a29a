//! relayed withdrawals
//!
//! a relay broadcasts the withdraw message from its own wallet and keeps the
//! fee encoded in the proof, so the recipient never needs prior funds. the
//! relay's reply is not interpreted; a 2xx status is all we check.

use crate::error::{Result, TonnelError};
use crate::pools::PoolConfig;
use crate::proof::WithdrawProof;
use crate::units::{self, NANO};
use base64::Engine;
use serde::Serialize;
use tracing::info;

/// relay fee tier, per mille of the denomination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayFee {
    pub name: &'static str,
    pub fee: u16,
}

impl RelayFee {
    /// "Normal - 5.0%"
    pub fn label(&self) -> String {
        format!("{} - {}", self.name, units::percent_string(self.fee as u32))
    }
}

pub const RELAYER_FEES: [RelayFee; 3] = [
    RelayFee { name: "Slow", fee: 20 },
    RelayFee { name: "Normal", fee: 50 },
    RelayFee { name: "Fast", fee: 100 },
];

/// relay fee in whole units: denomination * fee / 1000
pub fn relay_fee_amount(denomination: u128, fee: u16) -> f64 {
    let whole = denomination as f64 / NANO as f64;
    whole * fee as f64 / 1000.0
}

/// `submitProof` request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelaySubmission {
    pub fee: f64,
    pub nullifier_hash: String,
    /// encoded withdraw message, base64
    pub transaction: String,
    pub pool: String,
}

impl RelaySubmission {
    pub fn new(pool: &PoolConfig, proof: &WithdrawProof, encoded: &[u8]) -> Self {
        Self {
            fee: relay_fee_amount(pool.denomination, proof.fee),
            nullifier_hash: proof.nullifier_hash.to_string(),
            transaction: base64::engine::general_purpose::STANDARD.encode(encoded),
            pool: pool.address.to_string(),
        }
    }
}

pub struct RelaySubmitter {
    http: reqwest::Client,
    endpoint: String,
}

impl RelaySubmitter {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// post a withdraw to the relay
    pub async fn submit(&self, submission: &RelaySubmission) -> Result<()> {
        info!(
            "posting withdraw for {} to relay (fee {})",
            submission.pool, submission.fee
        );
        self.http
            .post(&self.endpoint)
            .json(submission)
            .send()
            .await
            .map_err(|e| TonnelError::Transport(format!("relay: {}", e)))?
            .error_for_status()
            .map_err(|e| TonnelError::Transport(format!("relay: {}", e)))?;
        Ok(())
    }
}
