//! proof orchestration
//!
//! builds the witness inputs of the insert (deposit) and withdraw circuits
//! from a synced tree, hands them to a prover, and checks the public signals
//! that come back against the values the chain will check them against.

use crate::address::Address;
use crate::error::{Result, TonnelError};
use crate::field::{self, FieldElement};
use crate::keys::PrivateKey;
use crate::tree::MerkleTree;
use crate::MAX_FEE;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

/// circuit to prove
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Circuit {
    /// leaf insertion, proves oldRoot -> newRoot
    Insert,
    /// membership + nullifier
    Withdraw,
}

impl Circuit {
    pub fn id(&self) -> &'static str {
        match self {
            Circuit::Insert => "insert",
            Circuit::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// groth16 proof in snarkjs json layout (decimal coordinates)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Groth16Proof {
    pub pi_a: Vec<String>,
    pub pi_b: Vec<Vec<String>>,
    pub pi_c: Vec<String>,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub curve: String,
}

#[derive(Debug, Clone)]
pub struct ProofOutput {
    pub proof: Groth16Proof,
    pub public_signals: Vec<BigUint>,
}

/// proving backend; one blocking call per proof
pub trait Prover {
    fn prove(&self, circuit: Circuit, inputs: &serde_json::Value) -> Result<ProofOutput>;
}

impl<P: Prover + ?Sized> Prover for &P {
    fn prove(&self, circuit: Circuit, inputs: &serde_json::Value) -> Result<ProofOutput> {
        (**self).prove(circuit, inputs)
    }
}

#[derive(Debug, Clone)]
pub struct DepositProof {
    pub commitment: FieldElement,
    pub old_root: FieldElement,
    pub new_root: FieldElement,
    pub proof: Groth16Proof,
}

#[derive(Debug, Clone)]
pub struct WithdrawProof {
    pub root: FieldElement,
    pub nullifier_hash: FieldElement,
    pub recipient: Address,
    pub fee: u16,
    pub proof: Groth16Proof,
}

/// insert circuit witness
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositInputs {
    pub old_root: FieldElement,
    pub new_root: FieldElement,
    pub leaf: FieldElement,
    /// position of the new leaf as an integer
    pub path_indices: usize,
    pub path_elements: Vec<FieldElement>,
}

/// withdraw circuit witness
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawInputs {
    pub root: FieldElement,
    pub secret: FieldElement,
    pub nullifier: FieldElement,
    pub nullifier_hash: FieldElement,
    pub fee: u16,
    #[serde(with = "field::decimal")]
    pub recipient: BigUint,
    pub path_elements: Vec<FieldElement>,
    pub path_indices: Vec<u8>,
}

/// insert inputs for `key` on a scratch copy of `tree`
pub fn build_deposit_inputs(tree: &MerkleTree, key: &PrivateKey) -> Result<DepositInputs> {
    let leaf = key.commitment();
    let mut scratch = tree.clone();
    let old_root = scratch.root();
    let new_root = scratch.insert(leaf)?;
    let index = scratch.len() - 1;
    let path = scratch.path(index)?;
    Ok(DepositInputs {
        old_root,
        new_root,
        leaf,
        path_indices: index,
        path_elements: path.elements,
    })
}

/// withdraw inputs against the current root of `tree`
pub fn build_withdraw_inputs(
    tree: &MerkleTree,
    key: &PrivateKey,
    recipient: &Address,
    fee: u16,
) -> Result<WithdrawInputs> {
    if fee > MAX_FEE {
        return Err(TonnelError::InvalidFee(format!("{} exceeds {}", fee, MAX_FEE)));
    }
    let path = tree.proof(&key.commitment())?;
    Ok(WithdrawInputs {
        root: tree.root(),
        secret: key.secret,
        nullifier: key.nullifier,
        nullifier_hash: key.nullifier_hash(),
        fee,
        recipient: recipient.to_uint256(),
        path_elements: path.elements,
        path_indices: path.indices,
    })
}

pub struct ProofOrchestrator<P: Prover> {
    prover: P,
}

impl<P: Prover> ProofOrchestrator<P> {
    pub fn new(prover: P) -> Self {
        Self { prover }
    }

    /// insert proof for `key`; the tree itself is left untouched
    pub fn prove_deposit(&self, tree: &MerkleTree, key: &PrivateKey) -> Result<DepositProof> {
        let inputs = build_deposit_inputs(tree, key)?;
        let output = self.run(Circuit::Insert, &inputs)?;

        expect_signal(&output, 0, &inputs.old_root, "oldRoot")?;
        expect_signal(&output, 1, &inputs.new_root, "newRoot")?;

        Ok(DepositProof {
            commitment: inputs.leaf,
            old_root: inputs.old_root,
            new_root: inputs.new_root,
            proof: output.proof,
        })
    }

    /// withdraw proof for the deposit of `key`
    pub fn prove_withdraw(
        &self,
        tree: &MerkleTree,
        key: &PrivateKey,
        recipient: &Address,
        fee: u16,
    ) -> Result<WithdrawProof> {
        let inputs = build_withdraw_inputs(tree, key, recipient, fee)?;
        let output = self.run(Circuit::Withdraw, &inputs)?;

        expect_signal(&output, 0, &inputs.root, "root")?;
        expect_signal(&output, 1, &inputs.nullifier_hash, "nullifierHash")?;
        expect_signal(&output, 3, &FieldElement::from_u64(fee as u64), "fee")?;

        Ok(WithdrawProof {
            root: inputs.root,
            nullifier_hash: inputs.nullifier_hash,
            recipient: *recipient,
            fee,
            proof: output.proof,
        })
    }

    fn run<T: Serialize>(&self, circuit: Circuit, inputs: &T) -> Result<ProofOutput> {
        let inputs = serde_json::to_value(inputs)?;
        info!("starting {} proof computation", circuit);
        let start = Instant::now();
        let output = self.prover.prove(circuit, &inputs)?;
        info!(
            "{} proof completed ({:.3} seconds)",
            circuit,
            start.elapsed().as_secs_f64()
        );
        debug!("{} public signals: {}", circuit, output.public_signals.len());
        Ok(output)
    }
}

fn expect_signal(output: &ProofOutput, index: usize, expected: &FieldElement, name: &str) -> Result<()> {
    let got = output.public_signals.get(index).ok_or_else(|| {
        TonnelError::Prover(format!(
            "missing public signal {} ({}), got {} signals",
            index,
            name,
            output.public_signals.len()
        ))
    })?;
    if *got != expected.to_biguint() {
        return Err(TonnelError::Prover(format!(
            "public signal {} mismatch: prover {}, expected {}",
            name, got, expected
        )));
    }
    Ok(())
}
