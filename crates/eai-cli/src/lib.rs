//! # eai-cli: Operator Tool for the Early Adopter Issuer
//!
//! ## Subcommands
//!
//! - `eai keygen`: Generate an Ed25519 key pair (issuer or development
//!   identity provider).
//! - `eai mint-alias`: Sign an id alias with a development identity
//!   provider key, for exercising the API locally.
//! - `eai verify`: Verify an issued credential JWS against the issuer key
//!   and, optionally, a credential spec.
//!
//! ```bash
//! eai keygen --prefix issuer
//! export ISSUER_SIGNING_KEY_HEX=$(cat issuer.key)
//! eai mint-alias --idp-key idp.key --id-dapp alice --id-alias a1 \
//!     --audience https://issuer.example
//! eai verify --issuer-pubkey issuer.pub credential.jws
//! ```

pub mod alias;
pub mod keys;
pub mod verify;

use std::path::Path;

use anyhow::{Context, Result};

/// Read a hex value that is either given inline or stored in a file.
pub fn read_hex_arg(value: &str) -> Result<String> {
    let path = Path::new(value);
    if path.is_file() {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(raw.trim().to_string())
    } else {
        Ok(value.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_hex_is_trimmed() {
        assert_eq!(read_hex_arg(" abcd \n").unwrap(), "abcd");
    }

    #[test]
    fn hex_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k.pub");
        std::fs::write(&path, "beef\n").unwrap();
        assert_eq!(read_hex_arg(path.to_str().unwrap()).unwrap(), "beef");
    }
}
