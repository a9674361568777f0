//! # Verify Subcommand
//!
//! Checks an issued credential JWS: issuer key and `kid`, `iss`, validity
//! window at the current time, and, with `--spec`, that the credential
//! attests that spec. Prints the decoded claims on success.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use eai_core::Timestamp;
use eai_crypto::Ed25519PublicKey;
use eai_vc::{verify_credential_jws, CredentialClaims, CredentialSpec, DEFAULT_ISSUER_URL};

/// Arguments for `eai verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Issuer public key, hex or a file containing it.
    #[arg(long)]
    pub issuer_pubkey: String,
    /// Expected `iss` claim.
    #[arg(long, default_value = DEFAULT_ISSUER_URL)]
    pub issuer_url: String,
    /// Credential spec the credential must attest, as JSON.
    #[arg(long)]
    pub spec: Option<String>,
    /// File containing the compact JWS.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Execute `eai verify`. Exit code 2 when the credential is invalid.
pub fn run_verify(args: &VerifyArgs) -> Result<u8> {
    let jws = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read credential: {}", args.file.display()))?;
    match check(args, jws.trim(), Timestamp::now())? {
        Ok(claims) => {
            println!("OK: credential is valid");
            println!("{}", serde_json::to_string_pretty(&claims)?);
            Ok(0)
        }
        Err(reason) => {
            println!("FAIL: {reason}");
            Ok(2)
        }
    }
}

/// Outer error: bad arguments. Inner error: the credential failed a check.
fn check(args: &VerifyArgs, jws: &str, now: Timestamp) -> Result<Result<CredentialClaims, String>> {
    let key_hex = crate::read_hex_arg(&args.issuer_pubkey)?;
    let issuer_key = Ed25519PublicKey::from_hex(&key_hex).context("invalid issuer public key")?;
    let spec: Option<CredentialSpec> = args
        .spec
        .as_deref()
        .map(serde_json::from_str::<CredentialSpec>)
        .transpose()
        .context("--spec is not a credential spec")?;
    Ok(
        verify_credential_jws(jws, &issuer_key, &args.issuer_url, spec.as_ref(), now)
            .map_err(|e| e.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(spec: Option<&str>) -> VerifyArgs {
        VerifyArgs {
            issuer_pubkey: "00".repeat(32),
            issuer_url: DEFAULT_ISSUER_URL.into(),
            spec: spec.map(str::to_string),
            file: PathBuf::from("unused"),
        }
    }

    #[test]
    fn malformed_jws_fails_check_not_arguments() {
        let outcome = check(&args(None), "not-a-jws", Timestamp::now()).unwrap();
        assert!(outcome.is_err());
    }

    #[test]
    fn invalid_spec_json_is_an_argument_error() {
        assert!(check(&args(Some("{")), "a.b.c", Timestamp::now()).is_err());
    }

    #[test]
    fn invalid_pubkey_is_an_argument_error() {
        let mut a = args(None);
        a.issuer_pubkey = "xyz".into();
        assert!(check(&a, "a.b.c", Timestamp::now()).is_err());
    }
}
