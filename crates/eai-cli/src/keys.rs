//! # Keygen Subcommand
//!
//! Writes `{prefix}.key` (hex seed) and `{prefix}.pub` (hex public key).
//! The seed file is the value expected in `ISSUER_SIGNING_KEY_HEX`; the
//! public key goes into `idp_root_key` when generating a development
//! identity provider.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use eai_crypto::Ed25519KeyPair;

/// Arguments for `eai keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Output directory for the key files.
    #[arg(long, short, default_value = ".")]
    pub output: PathBuf,
    /// Prefix for the key filenames.
    #[arg(long, default_value = "issuer")]
    pub prefix: String,
}

/// Execute `eai keygen`.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let (key_path, pub_path, pub_hex) = write_keypair(&args.output, &args.prefix)?;
    println!("OK: generated Ed25519 keypair");
    println!("  Private key: {}", key_path.display());
    println!("  Public key:  {}", pub_path.display());
    println!("  Public key (hex): {pub_hex}");
    Ok(0)
}

fn write_keypair(output_dir: &Path, prefix: &str) -> Result<(PathBuf, PathBuf, String)> {
    std::fs::create_dir_all(output_dir).with_context(|| {
        format!(
            "failed to create output directory: {}",
            output_dir.display()
        )
    })?;

    let pair = Ed25519KeyPair::generate();
    let pub_hex = pair.public_key().to_hex();
    let key_path = output_dir.join(format!("{prefix}.key"));
    let pub_path = output_dir.join(format!("{prefix}.pub"));

    std::fs::write(&key_path, pair.seed_hex().as_str())
        .with_context(|| format!("failed to write private key: {}", key_path.display()))?;
    std::fs::write(&pub_path, &pub_hex)
        .with_context(|| format!("failed to write public key: {}", pub_path.display()))?;
    tracing::info!(key = %key_path.display(), "wrote signing seed");

    Ok((key_path, pub_path, pub_hex))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_seed_reproduces_public_key() {
        let dir = tempfile::tempdir().unwrap();
        let (key_path, pub_path, pub_hex) = write_keypair(dir.path(), "idp").unwrap();
        let seed = std::fs::read_to_string(key_path).unwrap();
        let pair = Ed25519KeyPair::from_seed_hex(&seed).unwrap();
        assert_eq!(pair.public_key().to_hex(), pub_hex);
        assert_eq!(std::fs::read_to_string(pub_path).unwrap(), pub_hex);
    }
}
