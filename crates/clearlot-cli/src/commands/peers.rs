use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use clearlot_core::{PeerList, ProviderChain, Ticker};

use crate::cli::PeersArgs;
use crate::error::CliError;

use super::{failure_errors, CommandResult};

#[derive(Debug, Serialize)]
struct PeersResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    peers: Option<PeerList>,
}

pub async fn run(args: &PeersArgs, chain: &ProviderChain) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let ticker = Ticker::parse(&args.ticker)?;

    let (peers, errors) = match chain.fetch_peers(&ticker).await {
        Ok(peers) => (Some(peers), Vec::new()),
        Err(failure) => (None, failure_errors(&failure)),
    };

    let data: Value = serde_json::to_value(PeersResponseData { peers })?;
    let source_chain = chain
        .provider_ids()
        .into_iter()
        .map(|id| id.as_str().to_owned())
        .collect();

    Ok(CommandResult::ok(data, source_chain)
        .with_errors(errors)
        .with_latency(started.elapsed().as_millis() as u64))
}
