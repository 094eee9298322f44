use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use clearlot_core::{NewsArticle, ProviderChain, Ticker};

use crate::cli::NewsArgs;
use crate::error::CliError;

use super::{failure_errors, CommandResult};

#[derive(Debug, Serialize)]
struct NewsResponseData {
    articles: Vec<NewsArticle>,
}

pub async fn run(args: &NewsArgs, chain: &ProviderChain) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let ticker = Ticker::parse(&args.ticker)?;

    let (articles, errors) = match chain.fetch_news(&ticker, args.days_back).await {
        Ok(articles) => (articles, Vec::new()),
        Err(failure) => (Vec::new(), failure_errors(&failure)),
    };

    let data: Value = serde_json::to_value(NewsResponseData { articles })?;
    let source_chain = chain
        .provider_ids()
        .into_iter()
        .map(|id| id.as_str().to_owned())
        .collect();

    Ok(CommandResult::ok(data, source_chain)
        .with_errors(errors)
        .with_latency(started.elapsed().as_millis() as u64))
}
