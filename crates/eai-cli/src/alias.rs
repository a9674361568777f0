//! # Mint-Alias Subcommand
//!
//! Development identity provider: signs an id alias that the issuer will
//! accept when its configuration lists `--idp-id` and the matching root key.

use anyhow::{Context, Result};
use clap::Args;

use eai_core::Timestamp;
use eai_crypto::{Ed25519KeyPair, LocalKeyProvider};
use eai_vc::{mint_id_alias, AliasGrant};

/// Arguments for `eai mint-alias`.
#[derive(Args, Debug)]
pub struct MintAliasArgs {
    /// Identity-provider seed, hex or a file containing it.
    #[arg(long)]
    pub idp_key: String,
    /// Identity-provider id; must appear in the issuer's `idp_ids`.
    #[arg(long, default_value = "dev-idp")]
    pub idp_id: String,
    /// Dapp-scoped principal (the registration subject).
    #[arg(long)]
    pub id_dapp: String,
    /// Pseudonymous alias placed in issued credentials.
    #[arg(long)]
    pub id_alias: String,
    /// Derivation origin the alias is scoped to.
    #[arg(long)]
    pub audience: String,
    /// Lifetime in seconds.
    #[arg(long, default_value_t = 900)]
    pub ttl_secs: i64,
}

/// Execute `eai mint-alias`, printing the compact JWS.
pub fn run_mint_alias(args: &MintAliasArgs) -> Result<u8> {
    let jws = mint(args, Timestamp::now())?;
    println!("{jws}");
    Ok(0)
}

fn mint(args: &MintAliasArgs, now: Timestamp) -> Result<String> {
    let seed = crate::read_hex_arg(&args.idp_key)?;
    let pair = Ed25519KeyPair::from_seed_hex(&seed).context("invalid identity-provider seed")?;
    let provider = LocalKeyProvider::new(pair);
    let not_before = now.epoch_secs();
    let grant = AliasGrant {
        idp_id: args.idp_id.clone(),
        id_dapp: args.id_dapp.clone(),
        id_alias: args.id_alias.clone(),
        audience: args.audience.clone(),
        not_before,
        expires_at: not_before + args.ttl_secs,
    };
    mint_id_alias(&grant, &provider).context("failed to sign id alias")
}
