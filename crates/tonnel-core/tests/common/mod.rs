//! shared fixtures: in-memory ledger and an echoing prover

#![allow(dead_code)]

use async_trait::async_trait;
use num_bigint::BigUint;
use std::collections::HashMap;
use std::sync::Mutex;
use tonnel_core::{
    Address, Circuit, FieldElement, Groth16Proof, HistoryRequest, Ledger, MerkleTree, Message,
    MessageKind, OutgoingMessage, PoolConfig, ProofOutput, Prover, Result, Transaction,
    TonnelError, WithdrawMessage, OP_DEPOSIT, OP_TRANSFER_NOTIFICATION,
};

pub const SENDER: [u8; 32] = [0xaa; 32];
pub const RECIPIENT: [u8; 32] = [0xbb; 32];

pub fn sender() -> Address {
    Address::new(0, SENDER)
}

pub fn recipient() -> Address {
    Address::new(0, RECIPIENT)
}

/// jetton wallet the fake ledger derives for `owner`
pub fn token_wallet_of(owner: &Address) -> Address {
    let mut hash = owner.hash;
    hash[0] ^= 0xff;
    Address::new(0, hash)
}

#[derive(Default)]
struct PoolHistory {
    /// oldest first
    txs: Vec<Transaction>,
    tree: MerkleTree,
}

#[derive(Default)]
struct State {
    pools: HashMap<Address, PoolHistory>,
    root_override: HashMap<Address, FieldElement>,
    balances: HashMap<Address, u128>,
    token_balances: HashMap<Address, u128>,
    verify: bool,
    next_lt: u64,
    requests: Vec<HistoryRequest>,
    sent: Vec<OutgoingMessage>,
}

pub struct FakeLedger {
    state: Mutex<State>,
}

impl Default for FakeLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLedger {
    pub fn new() -> Self {
        let state = State {
            verify: true,
            next_lt: 1_000,
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// record a successful deposit of `leaf` on `pool`
    pub fn deposit(&self, pool: &PoolConfig, leaf: FieldElement) {
        let op = match pool.token_root {
            Some(_) => OP_TRANSFER_NOTIFICATION,
            None => OP_DEPOSIT,
        };
        self.append(pool, op, leaf);
    }

    /// record a successful leaf-appending operation `op`
    pub fn append(&self, pool: &PoolConfig, op: u32, leaf: FieldElement) {
        self.push(pool, op, 0, leaf);
        let mut state = self.state.lock().unwrap();
        let history = state.pools.entry(pool.address).or_default();
        history.tree.insert(leaf).unwrap();
    }

    /// record a transaction that does not append a leaf
    pub fn noise(&self, pool: &PoolConfig, op: u32, exit_code: i32) {
        self.push(pool, op, exit_code, FieldElement::from_u64(0xdead));
    }

    fn push(&self, pool: &PoolConfig, op: u32, exit_code: i32, leaf: FieldElement) {
        let mut state = self.state.lock().unwrap();
        state.next_lt += 10;
        let lt = state.next_lt;

        let mut out = vec![0u8];
        out.extend_from_slice(&leaf.to_be_bytes());
        let mut body = op.to_be_bytes().to_vec();
        body.extend_from_slice(&[0u8; 8]);
        let tx = Transaction {
            lt,
            hash: format!("tx{}", lt),
            in_msg: Some(Message::new(MessageKind::Internal, body)),
            compute_exit_code: Some(exit_code),
            out_msgs: vec![Message::new(MessageKind::ExternalOut, out)],
        };
        state.pools.entry(pool.address).or_default().txs.push(tx);
    }

    pub fn set_root(&self, pool: &Address, root: FieldElement) {
        self.state.lock().unwrap().root_override.insert(*pool, root);
    }

    pub fn clear_root(&self, pool: &Address) {
        self.state.lock().unwrap().root_override.remove(pool);
    }

    pub fn set_balance(&self, owner: &Address, amount: u128) {
        self.state.lock().unwrap().balances.insert(*owner, amount);
    }

    pub fn set_token_balance(&self, owner: &Address, amount: u128) {
        let wallet = token_wallet_of(owner);
        self.state.lock().unwrap().token_balances.insert(wallet, amount);
    }

    pub fn set_verify(&self, ok: bool) {
        self.state.lock().unwrap().verify = ok;
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn requests(&self) -> Vec<HistoryRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn chain_root(&self, pool: &Address) -> FieldElement {
        let state = self.state.lock().unwrap();
        state
            .pools
            .get(pool)
            .map(|h| h.tree.root())
            .unwrap_or_else(|| MerkleTree::new().root())
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn last_root(&self, pool: &Address) -> Result<FieldElement> {
        let overridden = self.state.lock().unwrap().root_override.get(pool).copied();
        Ok(overridden.unwrap_or_else(|| self.chain_root(pool)))
    }

    async fn check_verify(&self, _pool: &Address, message: &[u8]) -> Result<bool> {
        if message.is_empty() {
            return Err(TonnelError::InvalidData("empty message".into()));
        }
        Ok(self.state.lock().unwrap().verify)
    }

    async fn transactions(&self, account: &Address, request: &HistoryRequest) -> Result<Vec<Transaction>> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());
        let below = request.from.as_ref().map(|c| c.lt).unwrap_or(u64::MAX);
        let above = request.to_lt.unwrap_or(0);
        let page = state
            .pools
            .get(account)
            .map(|h| {
                h.txs
                    .iter()
                    .rev()
                    .filter(|tx| tx.lt < below && tx.lt > above)
                    .take(request.limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(page)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<()> {
        self.state.lock().unwrap().sent.push(message);
        Ok(())
    }

    async fn balance(&self, account: &Address) -> Result<u128> {
        Ok(self.state.lock().unwrap().balances.get(account).copied().unwrap_or(0))
    }

    async fn token_wallet(&self, _token_root: &Address, owner: &Address) -> Result<Address> {
        Ok(token_wallet_of(owner))
    }

    async fn token_balance(&self, wallet: &Address) -> Result<u128> {
        Ok(self.state.lock().unwrap().token_balances.get(wallet).copied().unwrap_or(0))
    }

    fn encode_withdraw(&self, message: &WithdrawMessage) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(98);
        out.extend_from_slice(&message.root.to_be_bytes());
        out.extend_from_slice(&message.nullifier_hash.to_be_bytes());
        out.extend_from_slice(&message.fee.to_be_bytes());
        out.extend_from_slice(&message.recipient.hash);
        Ok(out)
    }
}

/// returns the public inputs a real circuit would expose
pub struct EchoProver;

fn signal(v: &serde_json::Value) -> BigUint {
    let s = match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    BigUint::parse_bytes(s.as_bytes(), 10).unwrap()
}

impl Prover for EchoProver {
    fn prove(&self, circuit: Circuit, inputs: &serde_json::Value) -> Result<ProofOutput> {
        let keys: &[&str] = match circuit {
            Circuit::Insert => &["oldRoot", "newRoot"],
            Circuit::Withdraw => &["root", "nullifierHash", "recipient", "fee"],
        };
        Ok(ProofOutput {
            proof: Groth16Proof {
                pi_a: vec!["1".into(), "2".into(), "1".into()],
                pi_b: vec![
                    vec!["1".into(), "2".into()],
                    vec!["3".into(), "4".into()],
                    vec!["1".into(), "0".into()],
                ],
                pi_c: vec!["5".into(), "6".into(), "1".into()],
                protocol: "groth16".into(),
                curve: "bn128".into(),
            },
            public_signals: keys.iter().map(|k| signal(&inputs[*k])).collect(),
        })
    }
}

/// prover that always fails
pub struct BrokenProver;

impl Prover for BrokenProver {
    fn prove(&self, circuit: Circuit, _inputs: &serde_json::Value) -> Result<ProofOutput> {
        Err(TonnelError::Prover(format!("{} backend unavailable", circuit)))
    }
}
