//! CLI wrapper for the verify functionality

use clap::Args;
use std::path::PathBuf;
use tracing::info;

use crate::fetch::load_proof;
use crate::format::format_verdict;
use crate::{Proof, CONFIRMATIONS};
use xspv_verify::{verify_deposit, ExpectedOutput, Target, VerifierConfig, MAX_TX_INPUTS};

/// CLI arguments for the `verify` subcommand
#[derive(Clone, Debug, Args)]
pub struct VerifyArgs {
    /// Path to read the proof from
    #[arg(long)]
    proof: PathBuf,
    /// Amount in satoshis the first output must pay
    #[arg(long)]
    amount: u64,
    /// Locking script (hex) the first output must carry
    #[arg(long)]
    script: String,
    /// Easiest target any header may use (big-endian hex), difficulty 1 by default
    #[arg(long, env = "MAX_TARGET")]
    max_target: Option<String>,
    /// Largest number of transaction inputs to accept
    #[arg(long, default_value_t = MAX_TX_INPUTS)]
    max_inputs: u64,
}

impl VerifyArgs {
    fn config(&self) -> Result<VerifierConfig, anyhow::Error> {
        let mut config = VerifierConfig {
            max_inputs: self.max_inputs,
            ..Default::default()
        };
        if let Some(max_target) = &self.max_target {
            config.max_target = Target::from_hex(max_target)?;
        }
        Ok(config)
    }

    fn expected(&self) -> Result<ExpectedOutput, anyhow::Error> {
        Ok(ExpectedOutput {
            amount: self.amount,
            script: hex::decode(self.script.trim_start_matches("0x"))?,
        })
    }
}

/// Run the `verify` subcommand: read a proof from disk and verify it
pub async fn run(args: VerifyArgs) -> Result<(), anyhow::Error> {
    let proof: Proof = load_proof(&args.proof)?;
    let config = args.config()?;
    let expected = args.expected()?;
    info!("Verifying against max target {}", config.max_target);

    let verdict = verify_deposit(&proof, &expected, &config)?;
    println!(
        "{}",
        format_verdict(&verdict, &expected, &config, CONFIRMATIONS)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::save_proof;
    use xspv_verify::script::p2wpkh;
    use xspv_verify::test_utils::{deposit_proof, legacy_tx, regtest_target};
    use xspv_verify::SpvError;

    fn args(proof: PathBuf, expected: &ExpectedOutput) -> VerifyArgs {
        VerifyArgs {
            proof,
            amount: expected.amount,
            script: hex::encode(&expected.script),
            max_target: Some(regtest_target().to_hex()),
            max_inputs: MAX_TX_INPUTS,
        }
    }

    fn write_proof(dir: &tempfile::TempDir, expected: &ExpectedOutput) -> PathBuf {
        let raw = bitcoin::consensus::serialize(&legacy_tx(1, expected));
        let proof: Proof = deposit_proof(raw, 0, 2);
        let path = dir.path().join("proof.json");
        save_proof(&proof, &path).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let expected = ExpectedOutput {
            amount: 1,
            script: vec![0x51],
        };
        let mut args = args(PathBuf::new(), &expected);
        args.max_target = None;
        assert_eq!(args.config().unwrap(), VerifierConfig::default());
    }

    #[test]
    fn test_script_accepts_prefix() {
        let expected = ExpectedOutput {
            amount: 1,
            script: p2wpkh(&[0x10; 20]),
        };
        let mut args = args(PathBuf::new(), &expected);
        args.script = format!("0x{}", args.script);
        assert_eq!(args.expected().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_verify_proof_file() {
        let dir = tempfile::tempdir().unwrap();
        let expected = ExpectedOutput {
            amount: 20_000,
            script: p2wpkh(&[0x10; 20]),
        };
        let path = write_proof(&dir, &expected);
        run(args(path, &expected)).await.unwrap();
    }

    #[tokio::test]
    async fn test_verify_reports_wrong_amount() {
        let dir = tempfile::tempdir().unwrap();
        let expected = ExpectedOutput {
            amount: 20_000,
            script: p2wpkh(&[0x10; 20]),
        };
        let path = write_proof(&dir, &expected);
        let mut args = args(path, &expected);
        args.amount += 1;

        let err = run(args).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SpvError>(),
            Some(SpvError::InvalidOutputAmount { .. })
        ));
    }

    #[tokio::test]
    async fn test_mainnet_target_rejects_regtest_proof() {
        let dir = tempfile::tempdir().unwrap();
        let expected = ExpectedOutput {
            amount: 20_000,
            script: p2wpkh(&[0x10; 20]),
        };
        let path = write_proof(&dir, &expected);
        let mut args = args(path, &expected);
        args.max_target = None;

        let err = run(args).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "0-th BH doesn't meet target difficulty: BH does not meet min target"
        );
    }
}
