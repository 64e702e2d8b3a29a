//! snarkjs prover adapter
//!
//! runs `snarkjs groth16 fullprove` against the circuit artifacts laid out
//! as `<build_dir>/<circuit>/circuit.wasm` and
//! `<build_dir>/<circuit>/circuit_final.zkey`, exchanging json through a
//! scratch directory.

use crate::error::{Result, TonnelError};
use crate::proof::{Circuit, Groth16Proof, ProofOutput, Prover};
use num_bigint::BigUint;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

pub const WASM_FILE: &str = "circuit.wasm";
pub const ZKEY_FILE: &str = "circuit_final.zkey";

pub struct SnarkjsProver {
    build_dir: PathBuf,
    /// program and leading arguments, `["snarkjs"]` by default
    command: Vec<String>,
}

impl SnarkjsProver {
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
            command: vec!["snarkjs".to_string()],
        }
    }

    /// e.g. `["npx", "snarkjs"]`
    pub fn with_command(mut self, command: Vec<String>) -> Self {
        if !command.is_empty() {
            self.command = command;
        }
        self
    }

    pub fn wasm_path(&self, circuit: Circuit) -> PathBuf {
        self.build_dir.join(circuit.id()).join(WASM_FILE)
    }

    pub fn zkey_path(&self, circuit: Circuit) -> PathBuf {
        self.build_dir.join(circuit.id()).join(ZKEY_FILE)
    }

    fn fullprove(&self, circuit: Circuit, work: &Path) -> Result<()> {
        let (program, leading) = match self.command.split_first() {
            Some(split) => split,
            None => return Err(TonnelError::Prover("empty prover command".into())),
        };

        let output = Command::new(program)
            .args(leading)
            .args(["groth16", "fullprove"])
            .arg(work.join("input.json"))
            .arg(self.wasm_path(circuit))
            .arg(self.zkey_path(circuit))
            .arg(work.join("proof.json"))
            .arg(work.join("public.json"))
            .output()
            .map_err(|e| TonnelError::Prover(format!("failed to run {}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TonnelError::Prover(format!(
                "{} fullprove exited with {}: {}",
                circuit,
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl Prover for SnarkjsProver {
    fn prove(&self, circuit: Circuit, inputs: &serde_json::Value) -> Result<ProofOutput> {
        for artifact in [self.wasm_path(circuit), self.zkey_path(circuit)] {
            if !artifact.exists() {
                return Err(TonnelError::Prover(format!(
                    "missing circuit artifact {}",
                    artifact.display()
                )));
            }
        }

        let work = tempfile::tempdir()?;
        fs::write(work.path().join("input.json"), serde_json::to_vec(inputs)?)?;
        debug!("running snarkjs {} in {}", circuit, work.path().display());

        self.fullprove(circuit, work.path())?;

        let proof: Groth16Proof = read_json(&work.path().join("proof.json"))?;
        let signals: Vec<String> = read_json(&work.path().join("public.json"))?;
        let public_signals = signals
            .iter()
            .map(|s| {
                BigUint::parse_bytes(s.as_bytes(), 10)
                    .ok_or_else(|| TonnelError::Prover(format!("bad public signal {:?}", s)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ProofOutput {
            proof,
            public_signals,
        })
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)
        .map_err(|e| TonnelError::Prover(format!("reading {}: {}", path.display(), e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| TonnelError::Prover(format!("parsing {}: {}", path.display(), e)))
}
