//! tonnel core - client engine for the tonnel shielded pools on TON
//!
//! keeps a local copy of a pool's commitment tree in lock-step with the
//! root the pool contract reports, and drives deposits and withdrawals:
//! - secret key codec (`TON_5_<secret>_<nullifier>`)
//! - per-pool leaf cache with resumable history scanning
//! - depth-20 MiMC merkle tree (batch build, insert, inclusion paths)
//! - groth16 proof inputs for the insert and withdraw circuits
//! - native and jetton pool clients, direct or relayed withdrawals

pub mod error;
pub mod field;
pub mod mimc;
pub mod units;
pub mod address;
pub mod pools;
pub mod keys;
pub mod config;
pub mod cache;
pub mod ledger;
pub mod scanner;
pub mod tree;
pub mod proof;
pub mod snarkjs;
pub mod pool;
pub mod relay;

pub use error::{Result, TonnelError};
pub use field::FieldElement;
pub use address::Address;
pub use pools::{AssetKind, PoolConfig, PoolRegistry};
pub use keys::PrivateKey;
pub use config::{ClientConfig, GasSchedule};
pub use cache::{Cache, LeafCache};
pub use ledger::{
    HistoryRequest, Ledger, Message, MessageBody, MessageKind, OutgoingMessage, Transaction,
    TxCursor, WithdrawMessage,
};
pub use scanner::{LedgerScanner, ScanResult};
pub use tree::{MerklePath, MerkleTree};
pub use proof::{
    Circuit, DepositProof, Groth16Proof, ProofOrchestrator, ProofOutput, Prover, WithdrawProof,
};
pub use snarkjs::SnarkjsProver;
pub use pool::{
    BalanceInfo, DepositReceipt, DepositStage, PoolClient, WithdrawReceipt, WithdrawRoute,
    WithdrawStage,
};
pub use relay::{RelayFee, RelaySubmission, RelaySubmitter, RELAYER_FEES};

/// merkle tree depth (capacity 2^20 leaves)
pub const TREE_DEPTH: usize = 20;

/// filler for empty tree positions, keccak256("tornado") mod p
pub const ZERO_ELEMENT: &str =
    "21663839004416932945382355908790599225266501822907911457504978515578255421292";

/// transactions per history page
pub const PAGE_SIZE: usize = 100;

/// native deposit operation code
pub const OP_DEPOSIT: u32 = 0x888;

/// jetton transfer_notification operation code (token deposits)
pub const OP_TRANSFER_NOTIFICATION: u32 = 0x7362d09c;

/// stuck deposit removal, also appends a leaf
pub const OP_STUCK_REMOVE: u32 = 0x111;

/// withdraw fee is a 10-bit field on chain
pub const MAX_FEE: u16 = 1023;

/// default relay endpoint
pub const DEFAULT_RELAY_URL: &str = "https://api.tonnel.network/tree/submitProof";
