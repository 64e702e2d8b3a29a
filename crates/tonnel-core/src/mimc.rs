//! MiMC sponge over the bn254 scalar field
//!
//! 2-to-1 hash used for commitments, nullifier hashes and every internal node
//! of the pool tree. feistel construction, 220 rounds, x^5 s-box, key 0.
//! round constants come from iterated keccak-256 over the seed "mimcsponge",
//! with the first and last constants forced to zero.

use crate::field::FieldElement;
use ark_bn254::Fr;
use ark_ff::{Field, PrimeField};
use once_cell::sync::Lazy;
use sha3::{Digest, Keccak256};

/// number of feistel rounds
pub const ROUNDS: usize = 220;

/// constant derivation seed
pub const SEED: &[u8] = b"mimcsponge";

static CONSTANTS: Lazy<Vec<Fr>> = Lazy::new(|| round_constants(SEED, ROUNDS));

fn round_constants(seed: &[u8], rounds: usize) -> Vec<Fr> {
    let mut constants = vec![Fr::from(0u64); rounds];
    let mut c: [u8; 32] = Keccak256::digest(seed).into();
    for slot in constants.iter_mut().take(rounds - 1).skip(1) {
        c = Keccak256::digest(c).into();
        *slot = Fr::from_be_bytes_mod_order(&c);
    }
    constants
}

/// one keyed feistel permutation of (xl, xr)
fn permute(mut xl: Fr, mut xr: Fr, k: Fr) -> (Fr, Fr) {
    let constants = &*CONSTANTS;
    for (i, c) in constants.iter().enumerate() {
        let t = if i == 0 { xl + k } else { xl + k + c };
        let t5 = t.square().square() * t;
        if i < ROUNDS - 1 {
            let tmp = xr;
            xr = xl;
            xl = tmp + t5;
        } else {
            xr += t5;
        }
    }
    (xl, xr)
}

/// sponge over an arbitrary number of inputs, single output
pub fn multi_hash(inputs: &[FieldElement]) -> FieldElement {
    let k = Fr::from(0u64);
    let mut r = Fr::from(0u64);
    let mut c = Fr::from(0u64);
    for input in inputs {
        r += input.inner();
        (r, c) = permute(r, c, k);
    }
    FieldElement::from(r)
}

/// Hash2(left, right)
pub fn hash2(left: &FieldElement, right: &FieldElement) -> FieldElement {
    multi_hash(&[*left, *right])
}

/// keccak-256 of a byte string reduced into the field
pub fn keccak_to_field(data: &[u8]) -> FieldElement {
    let digest: [u8; 32] = Keccak256::digest(data).into();
    FieldElement::from(Fr::from_be_bytes_mod_order(&digest))
}
