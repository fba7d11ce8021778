use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{error, info};

use crate::client::{
    CommitmentOracle, CoreClient, EvmSourceChain, EvmTargetChain, SourceChain, TargetChain,
};
use crate::commands::cli::{StartArgs, VerifyArgs, VERSION};
use crate::config::config::{parse_address, ReplayConfig};
use crate::replayer::{submit, verify, ReplayOptions, Replayer};

/// Runs the replay service: connects to both deployments, closes any gap
/// between them, then follows the source contract until shutdown.
pub async fn start(args: StartArgs) -> Result<()> {
    info!(version = VERSION, "starting the blobstream replay service");
    let config = ReplayConfig::try_from(&args)?;

    let source = EvmSourceChain::connect(&config.source_rpc, config.source_contract).await?;
    let target = EvmTargetChain::connect(
        &config.target_rpc,
        config.target_contract,
        config.target_gateway,
        config.signer.clone(),
        config.gas_limit,
    )
    .await?;
    let oracle: Option<Arc<dyn CommitmentOracle>> = match &config.core_rpc {
        Some(core_rpc) => Some(Arc::new(CoreClient::new(core_rpc)?)),
        None => None,
    };

    let source_nonce = source.proof_nonce().await?;
    let target_nonce = target.proof_nonce().await?;
    info!(
        source_nonce,
        target_nonce, "connected to both BlobstreamX deployments"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(trap_signals(shutdown_tx));

    let opts = ReplayOptions {
        target_contract: config.target_contract,
        header_range_function_id: config.header_range_function_id,
        next_header_function_id: config.next_header_function_id,
        filter_range: config.filter_range,
        wait_timeout: submit::DEFAULT_WAIT_TIMEOUT,
    };
    let replayer = Replayer::new(Arc::new(source), Arc::new(target), oracle, opts, shutdown_rx);

    if source_nonce > target_nonce {
        replayer.catchup().await?;
    } else {
        info!("target contract is already up to date");
    }
    replayer.follow().await
}

/// Audits the full commitment history of a deployment against celestia-core.
pub async fn verify(args: VerifyArgs) -> Result<()> {
    let contract = parse_address(&args.contract, "contract")?;
    let source = EvmSourceChain::connect(&args.evm_rpc, contract).await?;
    let oracle = CoreClient::new(&args.core_rpc)?;
    verify::verify_deployment(&source, &oracle, args.filter_range).await
}

pub fn version() {
    println!("version: {VERSION}");
}

/// Flips the shutdown signal on SIGINT or SIGTERM so both engines stop at
/// their next safe point instead of mid-submission.
async fn trap_signals(shutdown: watch::Sender<bool>) {
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(%err, "failed to install the SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result.context("failed to listen for interrupts") {
                error!(%err, "signal handling disabled");
                return;
            }
            info!("received an interrupt, shutting down");
        }
        _ = sigterm => info!("received a termination signal, shutting down"),
    }
    let _ = shutdown.send(true);
}
