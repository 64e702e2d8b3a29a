//! ledger access
//!
//! everything the engine needs from the chain, behind one trait. cell/boc
//! encoding belongs to the implementation: the engine hands over semantic
//! fields and gets opaque bytes back where it needs to ship them elsewhere.

use crate::address::Address;
use crate::error::Result;
use crate::field::FieldElement;
use crate::proof::{DepositProof, Groth16Proof};
use async_trait::async_trait;
use num_bigint::BigUint;

/// message direction as recorded on a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Internal,
    ExternalIn,
    ExternalOut,
}

/// message with its root cell data, bits packed big-endian
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub body: Vec<u8>,
}

impl Message {
    pub fn new(kind: MessageKind, body: Vec<u8>) -> Self {
        Self { kind, body }
    }

    /// leading 32-bit operation code
    pub fn opcode(&self) -> Option<u32> {
        let bytes: [u8; 4] = self.body.get(..4)?.try_into().ok()?;
        Some(u32::from_be_bytes(bytes))
    }

    /// 256-bit value after an 8-bit header, how pools log new leaves
    pub fn logged_leaf(&self) -> Option<BigUint> {
        self.body.get(1..33).map(BigUint::from_bytes_be)
    }
}

/// one account transaction, as much of it as leaf extraction needs
#[derive(Debug, Clone)]
pub struct Transaction {
    /// logical time
    pub lt: u64,
    /// transaction hash, base64
    pub hash: String,
    pub in_msg: Option<Message>,
    /// exit code of a vm compute phase, `None` when the phase was skipped
    pub compute_exit_code: Option<i32>,
    pub out_msgs: Vec<Message>,
}

impl Transaction {
    pub fn cursor(&self) -> TxCursor {
        TxCursor {
            lt: self.lt,
            hash: self.hash.clone(),
        }
    }

    pub fn external_out(&self) -> Option<&Message> {
        self.out_msgs.iter().find(|m| m.kind == MessageKind::ExternalOut)
    }
}

/// position in an account's history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxCursor {
    pub lt: u64,
    pub hash: String,
}

/// one page of history, newest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub limit: usize,
    /// start at (and exclude) this transaction, `None` for the newest
    pub from: Option<TxCursor>,
    /// stop before reaching this logical time (exclusive)
    pub to_lt: Option<u64>,
}

/// payload of an outgoing internal message
#[derive(Debug, Clone)]
pub enum MessageBody {
    /// native pool deposit: commitment, both roots, proof
    Deposit(DepositProof),
    /// jetton transfer forwarding a deposit to the pool
    TokenTransfer {
        query_id: u64,
        /// jetton amount, nano units
        amount: u128,
        destination: Address,
        response_destination: Address,
        /// ton forwarded to `destination` with the notification
        forward_amount: u128,
        deposit: DepositProof,
    },
    /// body already encoded by `Ledger::encode_withdraw`
    Encoded(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub destination: Address,
    /// attached ton, nano units
    pub value: u128,
    pub body: MessageBody,
}

/// fields of a pool withdraw message
#[derive(Debug, Clone)]
pub struct WithdrawMessage {
    pub root: FieldElement,
    pub nullifier_hash: FieldElement,
    pub recipient: Address,
    /// per mille, 10 bits on chain
    pub fee: u16,
    pub proof: Groth16Proof,
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// `get_last_root` of a pool contract
    async fn last_root(&self, pool: &Address) -> Result<FieldElement>;

    /// `check_verify` getter on an encoded withdraw message, true when it returns 1
    async fn check_verify(&self, pool: &Address, message: &[u8]) -> Result<bool>;

    /// one page of account history
    async fn transactions(&self, account: &Address, request: &HistoryRequest)
        -> Result<Vec<Transaction>>;

    /// sign and broadcast from the connected wallet
    async fn send(&self, message: OutgoingMessage) -> Result<()>;

    /// ton balance, nano units
    async fn balance(&self, account: &Address) -> Result<u128>;

    /// jetton wallet of `owner` under `token_root`
    async fn token_wallet(&self, token_root: &Address, owner: &Address) -> Result<Address>;

    /// jetton balance of a jetton wallet, nano units
    async fn token_balance(&self, wallet: &Address) -> Result<u128>;

    /// serialize a withdraw message (boc bytes)
    fn encode_withdraw(&self, message: &WithdrawMessage) -> Result<Vec<u8>>;
}
