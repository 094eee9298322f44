use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use clearlot_core::{ProviderChain, RealtimeQuote, Ticker};

use crate::cli::QuoteArgs;
use crate::error::CliError;

use super::{failure_errors, CommandResult};

#[derive(Debug, Serialize)]
struct QuoteResponseData {
    quotes: Vec<RealtimeQuote>,
}

pub async fn run(args: &QuoteArgs, chain: &ProviderChain) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let tickers = args
        .tickers
        .iter()
        .map(|raw| Ticker::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let mut quotes = Vec::with_capacity(tickers.len());
    let mut errors = Vec::new();

    for ticker in &tickers {
        match chain.fetch_quote(ticker).await {
            Ok(quote) => quotes.push(quote),
            Err(failure) => errors.extend(failure_errors(&failure)),
        }
    }

    let data: Value = serde_json::to_value(QuoteResponseData { quotes })?;
    let source_chain = chain
        .provider_ids()
        .into_iter()
        .map(|id| id.as_str().to_owned())
        .collect();

    Ok(CommandResult::ok(data, source_chain)
        .with_errors(errors)
        .with_latency(started.elapsed().as_millis() as u64))
}
