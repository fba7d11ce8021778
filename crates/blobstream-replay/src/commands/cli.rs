use clap::{Args, Parser, Subcommand};

use crate::replayer::submit::FULFILL_CALL_GAS_LIMIT;

pub const VERSION: &str = "v0.1.0";

#[derive(Parser)]
#[command(name = "blobstream-replay", version = VERSION, about = "Blobstream proof replay service", long_about = None)]
pub struct Cli {
    /// Log level: trace, debug, info, warn or error
    #[arg(long = "log.level", env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Log format: plain or json
    #[arg(long = "log.format", env = "LOG_FORMAT", default_value = "plain", global = true)]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Keep a target BlobstreamX deployment in sync with a source deployment
    Start(StartArgs),

    /// Audit a BlobstreamX deployment against a celestia-core node
    Verify(VerifyArgs),

    /// Show the service version
    Version {},
}

#[derive(Debug, Clone, Args)]
pub struct StartArgs {
    /// Source EVM rpc endpoint, must support log subscriptions
    #[arg(long = "evm.source.rpc", env = "EVM_SOURCE_RPC", default_value = "http://localhost:8545")]
    pub source_rpc: String,

    /// Address of the source BlobstreamX contract
    #[arg(long = "evm.source.contract-address", env = "EVM_SOURCE_CONTRACT_ADDRESS")]
    pub source_contract: String,

    /// Target EVM rpc endpoint
    #[arg(long = "evm.target.rpc", env = "EVM_TARGET_RPC", default_value = "http://localhost:8545")]
    pub target_rpc: String,

    /// Address of the target BlobstreamX contract
    #[arg(long = "evm.target.contract-address", env = "EVM_TARGET_CONTRACT_ADDRESS")]
    pub target_contract: String,

    /// Address of the SuccinctGateway serving the target contract
    #[arg(long = "evm.target.gateway", env = "EVM_TARGET_GATEWAY")]
    pub target_gateway: String,

    /// Hex private key of the account funding the replayed transactions
    #[arg(long = "evm.private-key", env = "EVM_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,

    /// Function ID of the header-range circuit on the target gateway
    #[arg(long = "circuits.header-range.function-id", env = "CIRCUITS_HEADER_RANGE_FUNCTION_ID")]
    pub header_range_function_id: String,

    /// Function ID of the next-header circuit on the target gateway
    #[arg(long = "circuits.next-header.function-id", env = "CIRCUITS_NEXT_HEADER_FUNCTION_ID")]
    pub next_header_function_id: String,

    /// eth_getLogs window used when scanning the source history
    #[arg(long = "evm.filter-range", env = "EVM_FILTER_RANGE", default_value_t = 5_000)]
    pub filter_range: u64,

    /// Gas limit set on replayed transactions
    #[arg(long = "evm.gas-limit", env = "EVM_GAS_LIMIT", default_value_t = FULFILL_CALL_GAS_LIMIT)]
    pub gas_limit: u64,

    /// Verify data commitments against celestia-core before replaying them
    #[arg(long, env = "VERIFY", default_value_t = false)]
    pub verify: bool,

    /// celestia-core rpc endpoint used for verification
    #[arg(long = "core.rpc", env = "CORE_RPC", default_value = "tcp://localhost:26657")]
    pub core_rpc: String,
}

#[derive(Debug, Clone, Args)]
pub struct VerifyArgs {
    /// EVM rpc endpoint hosting the contract
    #[arg(long = "evm.rpc", env = "EVM_RPC", default_value = "http://localhost:8545")]
    pub evm_rpc: String,

    /// Address of the BlobstreamX contract to audit
    #[arg(long = "evm.contract-address", env = "EVM_CONTRACT_ADDRESS")]
    pub contract: String,

    /// celestia-core rpc endpoint
    #[arg(long = "core.rpc", env = "CORE_RPC", default_value = "tcp://localhost:26657")]
    pub core_rpc: String,

    /// eth_getLogs window used when scanning the contract history
    #[arg(long = "evm.filter-range", env = "EVM_FILTER_RANGE", default_value_t = 5_000)]
    pub filter_range: u64,
}
