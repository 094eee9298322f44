use serde::Serialize;
use serde_json::Value;

use clearlot_core::ProviderChain;

use crate::cli::SourcesArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct SourceRow {
    id: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kinds: Option<Vec<&'static str>>,
}

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    sources: Vec<SourceRow>,
}

pub fn run(args: &SourcesArgs, chain: &ProviderChain) -> Result<CommandResult, CliError> {
    let sources = chain
        .snapshots()
        .into_iter()
        .map(|snapshot| SourceRow {
            id: snapshot.id.as_str().to_owned(),
            status: snapshot.status_label(),
            kinds: args.verbose.then(|| snapshot.supported_kinds.clone()),
        })
        .collect();

    let data: Value = serde_json::to_value(SourcesResponseData { sources })?;
    let source_chain = chain
        .provider_ids()
        .into_iter()
        .map(|id| id.as_str().to_owned())
        .collect();

    Ok(CommandResult::ok(data, source_chain))
}
