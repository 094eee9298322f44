mod import;
mod news;
mod peers;
mod quote;
mod sources;

use clearlot_core::{Envelope, EnvelopeError, ProviderChain, ProviderChainBuilder};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::Metadata;

const SCHEMA_VERSION: &str = "v1.0.0";

#[derive(Debug)]
pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
    pub cache_hit: bool,
    pub source_chain: Vec<String>,
}

impl CommandResult {
    pub fn ok(data: Value, source_chain: Vec<String>) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
            cache_hit: false,
            source_chain,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let chain = build_chain(cli.mock);

    let command_result = match &cli.command {
        Command::Import(args) => import::run(args)?,
        Command::Quote(args) => quote::run(args, &chain).await?,
        Command::News(args) => news::run(args, &chain).await?,
        Command::Peers(args) => peers::run(args, &chain).await?,
        Command::Sources(args) => sources::run(args, &chain)?,
    };

    let CommandResult {
        data,
        warnings,
        errors,
        latency_ms,
        cache_hit,
        source_chain,
    } = command_result;

    let mut metadata = Metadata::new(source_chain, latency_ms, cache_hit)?;
    for warning in warnings {
        metadata.push_warning(warning);
    }

    let meta = metadata.into_envelope_meta(SCHEMA_VERSION)?;
    Envelope::with_errors(meta, data, errors).map_err(CliError::from)
}

fn build_chain(mock: bool) -> ProviderChain {
    if mock {
        ProviderChainBuilder::new().with_mock_mode().build()
    } else {
        ProviderChainBuilder::new().with_real_clients().build()
    }
}

/// Convert a chain failure into envelope errors, one per attempt.
pub fn failure_errors(failure: &clearlot_core::ProviderFailure) -> Vec<EnvelopeError> {
    let mut errors: Vec<EnvelopeError> = failure
        .attempts
        .iter()
        .filter_map(|attempt| {
            EnvelopeError::new("source.failed", attempt.detail.clone())
                .ok()
                .map(|error| {
                    error
                        .with_source(attempt.source.as_str())
                        .with_retryable(attempt.retryable)
                })
        })
        .collect();

    if errors.is_empty() {
        if let Ok(error) = EnvelopeError::new("chain.exhausted", failure.to_string()) {
            errors.push(error.with_retryable(failure.retryable));
        }
    }

    errors
}
