//! pool client
//!
//! drives one pool end to end: funds check, tree sync against the contract
//! root, proof, then submission. native and token pools share the flow and
//! differ only in how balances are read and how the deposit is shipped.

use crate::address::Address;
use crate::cache::LeafCache;
use crate::config::{ClientConfig, GasSchedule};
use crate::error::{Result, TonnelError};
use crate::field::FieldElement;
use crate::keys::PrivateKey;
use crate::ledger::{Ledger, MessageBody, OutgoingMessage, WithdrawMessage};
use crate::pools::{AssetKind, PoolConfig};
use crate::proof::{ProofOrchestrator, Prover};
use crate::relay::{RelaySubmission, RelaySubmitter};
use crate::scanner::LedgerScanner;
use crate::tree::MerkleTree;
use crate::units::format_amount;
use crate::MAX_FEE;
use std::fmt;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// deposit progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositStage {
    Idle,
    BalanceChecked,
    TreeSynced,
    ProofComputed,
    Submitted,
}

/// withdraw progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawStage {
    Idle,
    KeyResolved,
    TreeSynced,
    ProofComputed,
    Submitted,
    RelayPosted,
}

/// where a withdraw goes once verified
#[derive(Clone, Copy)]
pub enum WithdrawRoute<'r> {
    /// broadcast from the connected wallet, no relay fee
    Direct,
    /// post to a relay which keeps `fee` per mille
    Relay { relay: &'r RelaySubmitter, fee: u16 },
}

impl WithdrawRoute<'_> {
    fn fee(&self) -> u16 {
        match self {
            WithdrawRoute::Direct => 0,
            WithdrawRoute::Relay { fee, .. } => *fee,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositReceipt {
    pub pool: Address,
    pub commitment: FieldElement,
    pub old_root: FieldElement,
    pub new_root: FieldElement,
    /// position the commitment takes once the deposit lands
    pub leaf_index: usize,
    pub stage: DepositStage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawReceipt {
    pub pool: Address,
    pub root: FieldElement,
    pub nullifier_hash: FieldElement,
    pub recipient: Address,
    pub fee: u16,
    pub stage: WithdrawStage,
}

/// balances relevant to a deposit, nano units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceInfo {
    pub native: u128,
    /// jetton balance on token pools
    pub token: Option<u128>,
}

impl fmt::Display for BalanceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", format_amount(self.native), AssetKind::Native)?;
        if let Some(token) = self.token {
            write!(f, "    {} {}", format_amount(token), AssetKind::Token)?;
        }
        Ok(())
    }
}

/// transfer mechanics of a pool
#[derive(Debug, Clone, Copy)]
enum Asset {
    Native,
    Token { root: Address },
}

pub struct PoolClient<'a, L: Ledger, P: Prover> {
    ledger: &'a L,
    orchestrator: ProofOrchestrator<P>,
    cache: LeafCache,
    gas: GasSchedule,
    pool: PoolConfig,
    asset: Asset,
}

impl<'a, L: Ledger, P: Prover> PoolClient<'a, L, P> {
    pub fn new(ledger: &'a L, prover: P, pool: PoolConfig, config: &ClientConfig) -> Result<Self> {
        pool.validate()?;
        let asset = match (pool.kind, pool.token_root) {
            (AssetKind::Native, _) => Asset::Native,
            (AssetKind::Token, Some(root)) => Asset::Token { root },
            (AssetKind::Token, None) => {
                return Err(TonnelError::InvalidData(format!(
                    "token pool {} has no token root",
                    pool.address
                )))
            }
        };
        Ok(Self {
            ledger,
            orchestrator: ProofOrchestrator::new(prover),
            cache: LeafCache::new(config.cache_dir.clone()),
            gas: config.gas,
            pool,
            asset,
        })
    }

    pub fn pool(&self) -> &PoolConfig {
        &self.pool
    }

    pub fn cache(&self) -> &LeafCache {
        &self.cache
    }

    /// denomination plus pool fee
    pub fn required_amount(&self) -> u128 {
        self.pool.amount_with_fee()
    }

    pub async fn balance_info(&self, owner: &Address) -> Result<BalanceInfo> {
        let native = self.ledger.balance(owner).await?;
        let token = match self.asset {
            Asset::Native => None,
            Asset::Token { root } => {
                let wallet = self.ledger.token_wallet(&root, owner).await?;
                Some(self.ledger.token_balance(&wallet).await?)
            }
        };
        Ok(BalanceInfo { native, token })
    }

    /// strictly more than the deposit needs, gas included
    pub async fn is_enough_funds(&self, sender: &Address) -> Result<bool> {
        let balances = self.balance_info(sender).await?;
        Ok(self.covers(&balances))
    }

    fn covers(&self, balances: &BalanceInfo) -> bool {
        let required = self.required_amount();
        match (self.asset, balances.token) {
            (Asset::Native, _) => exceeds(balances.native, self.gas.deposit, required),
            (Asset::Token { .. }, Some(token)) => {
                token > required
                    && exceeds(balances.native, self.gas.deposit, self.gas.token_transfer)
            }
            (Asset::Token { .. }, None) => false,
        }
    }

    /// cached leaves plus fresh history, checked against the contract root.
    /// a mismatch drops the cache so the next run rescans from scratch
    pub async fn sync_tree(&self) -> Result<MerkleTree> {
        let address = self.pool.address;
        info!("building tree for {}", self.pool.label());
        let start = Instant::now();

        let mut cache = self.cache.load(&address);
        let scan = LedgerScanner::new(self.ledger)
            .scan(&address, self.pool.kind, cache.cursor)
            .await?;
        if scan.transactions > 0 {
            cache.leaves.extend(scan.leaves);
            cache.cursor = scan.cursor;
            self.cache.save(&address, cache.cursor, &cache.leaves)?;
        }

        let tree = MerkleTree::build(&cache.leaves)?;
        info!(
            "tree built, {} leaves ({:.3} seconds)",
            tree.len(),
            start.elapsed().as_secs_f64()
        );

        let chain_root = self.ledger.last_root(&address).await?;
        if tree.root() != chain_root {
            warn!(
                "tree root mismatch for {}: local {}, chain {}; dropping cache",
                address,
                tree.root(),
                chain_root
            );
            self.cache.remove(&address)?;
            return Err(TonnelError::CacheCorruption {
                pool: address.to_string(),
                local: tree.root().to_string(),
                chain: chain_root.to_string(),
            });
        }
        info!("tree roots match");
        Ok(tree)
    }

    /// deposit `key`'s commitment from `sender`
    pub async fn deposit(&self, sender: &Address, key: &PrivateKey) -> Result<DepositReceipt> {
        let mut stage = DepositStage::Idle;
        debug!("deposit {:?}", stage);

        let balances = self.balance_info(sender).await?;
        info!("balance: {}", balances);
        if !self.covers(&balances) {
            return Err(TonnelError::InsufficientFunds(format!(
                "{} needs more than {} plus gas, have {}",
                self.pool.label(),
                format_amount(self.required_amount()),
                balances
            )));
        }
        stage = advance(stage, DepositStage::BalanceChecked);

        let tree = self.sync_tree().await?;
        stage = advance(stage, DepositStage::TreeSynced);

        let proof = self.orchestrator.prove_deposit(&tree, key)?;
        stage = advance(stage, DepositStage::ProofComputed);

        let receipt_base = (proof.commitment, proof.old_root, proof.new_root);
        let message = match self.asset {
            Asset::Native => OutgoingMessage {
                destination: self.pool.address,
                value: self.gas.deposit.saturating_add(self.required_amount()),
                body: MessageBody::Deposit(proof),
            },
            Asset::Token { root } => {
                let wallet = self.ledger.token_wallet(&root, sender).await?;
                OutgoingMessage {
                    destination: wallet,
                    value: self.gas.deposit.saturating_add(self.gas.token_transfer),
                    body: MessageBody::TokenTransfer {
                        query_id: query_id(),
                        amount: self.required_amount(),
                        destination: self.pool.address,
                        response_destination: *sender,
                        forward_amount: self.gas.deposit,
                        deposit: proof,
                    },
                }
            }
        };
        self.ledger.send(message).await?;
        stage = advance(stage, DepositStage::Submitted);

        let (commitment, old_root, new_root) = receipt_base;
        Ok(DepositReceipt {
            pool: self.pool.address,
            commitment,
            old_root,
            new_root,
            leaf_index: tree.len(),
            stage,
        })
    }

    /// withdraw `key`'s deposit to `recipient`; nothing is sent unless the
    /// contract's `check_verify` accepts the message first
    pub async fn withdraw(
        &self,
        key: &PrivateKey,
        recipient: &Address,
        route: WithdrawRoute<'_>,
    ) -> Result<WithdrawReceipt> {
        let mut stage = WithdrawStage::Idle;
        debug!("withdraw {:?}", stage);

        let fee = route.fee();
        if fee > MAX_FEE {
            return Err(TonnelError::InvalidFee(format!("{} exceeds {}", fee, MAX_FEE)));
        }
        stage = advance(stage, WithdrawStage::KeyResolved);

        let tree = self.sync_tree().await?;
        stage = advance(stage, WithdrawStage::TreeSynced);

        let proof = self.orchestrator.prove_withdraw(&tree, key, recipient, fee)?;
        stage = advance(stage, WithdrawStage::ProofComputed);

        let encoded = self.ledger.encode_withdraw(&WithdrawMessage {
            root: proof.root,
            nullifier_hash: proof.nullifier_hash,
            recipient: proof.recipient,
            fee: proof.fee,
            proof: proof.proof.clone(),
        })?;
        if !self.ledger.check_verify(&self.pool.address, &encoded).await? {
            warn!("check_verify rejected withdraw on {}", self.pool.address);
            return Err(TonnelError::VerificationRejected(self.pool.address.to_string()));
        }
        info!("pre-flight verification passed");

        match route {
            WithdrawRoute::Direct => {
                self.ledger
                    .send(OutgoingMessage {
                        destination: self.pool.address,
                        value: self.gas.withdraw,
                        body: MessageBody::Encoded(encoded),
                    })
                    .await?;
                stage = advance(stage, WithdrawStage::Submitted);
            }
            WithdrawRoute::Relay { relay, .. } => {
                let submission = RelaySubmission::new(&self.pool, &proof, &encoded);
                relay.submit(&submission).await?;
                stage = advance(stage, WithdrawStage::RelayPosted);
            }
        }

        Ok(WithdrawReceipt {
            pool: self.pool.address,
            root: proof.root,
            nullifier_hash: proof.nullifier_hash,
            recipient: proof.recipient,
            fee: proof.fee,
            stage,
        })
    }
}

/// `balance > a + b`; a sum past u128 is never covered
fn exceeds(balance: u128, a: u128, b: u128) -> bool {
    a.checked_add(b).map_or(false, |need| balance > need)
}

fn advance<S: fmt::Debug>(from: S, to: S) -> S {
    debug!("{:?} -> {:?}", from, to);
    to
}

/// jetton transfer query id, unix millis
fn query_id() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::NANO;

    #[test]
    fn test_balance_display() {
        let native = BalanceInfo {
            native: 5_150_000_000,
            token: None,
        };
        assert_eq!(native.to_string(), "5.15 TON");
        let token = BalanceInfo {
            native: NANO,
            token: Some(66 * NANO),
        };
        assert_eq!(token.to_string(), "1 TON    66 TONNEL");
    }

    #[test]
    fn test_exceeds_never_wraps() {
        assert!(exceeds(11, 5, 5));
        assert!(!exceeds(10, 5, 5));
        assert!(!exceeds(u128::MAX, u128::MAX, 1));
        assert!(!exceeds(u128::MAX, u128::MAX / 2 + 1, u128::MAX / 2 + 1));
    }

    #[test]
    fn test_route_fee() {
        let relay = RelaySubmitter::new("http://127.0.0.1:1/submitProof");
        assert_eq!(WithdrawRoute::Direct.fee(), 0);
        assert_eq!(WithdrawRoute::Relay { relay: &relay, fee: 50 }.fee(), 50);
    }

    #[test]
    fn test_query_id_is_recent_millis() {
        // after 2020-01-01
        assert!(query_id() > 1_577_836_800_000);
    }
}
