//! Validated runtime configuration, built from the raw CLI arguments.

use alloy_primitives::{Address, B256};
use alloy_signer_local::PrivateKeySigner;
use anyhow::{anyhow, Context, Result};

use crate::commands::cli::StartArgs;

/// Everything the start command needs, with every chain-facing field parsed
/// into its on-chain type. Construction fails on the first invalid field so
/// misconfiguration surfaces before any connection is opened.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub source_rpc: String,
    pub source_contract: Address,
    pub target_rpc: String,
    pub target_contract: Address,
    pub target_gateway: Address,
    pub signer: PrivateKeySigner,
    pub header_range_function_id: B256,
    pub next_header_function_id: B256,
    pub filter_range: u64,
    pub gas_limit: u64,
    /// celestia-core endpoint; commitments are verified before replaying
    /// whenever this is set.
    pub core_rpc: Option<String>,
}

pub fn parse_address(raw: &str, what: &str) -> Result<Address> {
    raw.parse::<Address>()
        .with_context(|| format!("invalid {what} address {raw}"))
}

pub fn parse_function_id(raw: &str, what: &str) -> Result<B256> {
    raw.parse::<B256>()
        .with_context(|| format!("invalid {what} function ID {raw}"))
}

/// The raw key never appears in the error: config failures end up in logs.
pub fn parse_private_key(raw: &str) -> Result<PrivateKeySigner> {
    raw.parse::<PrivateKeySigner>()
        .map_err(|_| anyhow!("invalid private key, expected 32 hex-encoded bytes"))
}

impl TryFrom<&StartArgs> for ReplayConfig {
    type Error = anyhow::Error;

    fn try_from(args: &StartArgs) -> Result<Self> {
        let core_rpc = if args.verify {
            if args.core_rpc.is_empty() {
                anyhow::bail!("verification is enabled but no core rpc endpoint is configured");
            }
            Some(args.core_rpc.clone())
        } else {
            None
        };

        Ok(Self {
            source_rpc: args.source_rpc.clone(),
            source_contract: parse_address(&args.source_contract, "source contract")?,
            target_rpc: args.target_rpc.clone(),
            target_contract: parse_address(&args.target_contract, "target contract")?,
            target_gateway: parse_address(&args.target_gateway, "target gateway")?,
            signer: parse_private_key(&args.private_key)?,
            header_range_function_id: parse_function_id(
                &args.header_range_function_id,
                "header range",
            )?,
            next_header_function_id: parse_function_id(&args.next_header_function_id, "next header")?,
            filter_range: args.filter_range,
            gas_limit: args.gas_limit,
            core_rpc,
        })
    }
}
