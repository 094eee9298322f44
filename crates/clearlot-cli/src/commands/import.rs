use std::fs;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use clearlot_core::{
    ingest_rows_with_diagnostics, rows_from_csv, rows_from_llm_text, rows_from_pdf_text,
    AggregatedHolding, QualityReport,
};

use crate::cli::{ImportArgs, StatementFormat};
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct ImportResponseData {
    holdings: Vec<AggregatedHolding>,
    quality_report: QualityReport,
}

pub fn run(args: &ImportArgs) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let text = fs::read_to_string(&args.path)?;

    let (rows, diagnostics, source) = match args.statement_format {
        StatementFormat::Csv => (rows_from_csv(&text)?, None, "csv"),
        StatementFormat::LlmJson => {
            let (rows, diagnostics) = rows_from_llm_text(&text)?;
            (rows, Some(diagnostics), "llm_json")
        }
        StatementFormat::PdfText => (rows_from_pdf_text(&text), None, "pdf_text"),
    };

    let outcome = ingest_rows_with_diagnostics(&rows, diagnostics.as_ref());

    let mut warnings = Vec::new();
    if outcome.report.mismatch_detected > 0 {
        warnings.push(format!(
            "{} row(s) had values corrected from market value during reconciliation",
            outcome.report.mismatch_detected
        ));
    }
    if outcome.report.dropped > 0 {
        warnings.push(format!(
            "{} row(s) dropped; see quality_report.dropped_reasons",
            outcome.report.dropped
        ));
    }

    let data: Value = serde_json::to_value(ImportResponseData {
        holdings: outcome.holdings,
        quality_report: outcome.report,
    })?;

    Ok(
        CommandResult::ok(data, vec![source.to_owned()])
            .with_warnings(warnings)
            .with_latency(started.elapsed().as_millis() as u64),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn imports_a_csv_statement_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            "symbol,quantity,market_value\nTSLA,2,400.00\nTSLA,3,660.00\n"
        )
        .expect("write csv");

        let args = ImportArgs {
            path: file.path().to_string_lossy().into_owned(),
            statement_format: StatementFormat::Csv,
        };

        let result = run(&args).expect("import succeeds");

        assert_eq!(result.source_chain, vec![String::from("csv")]);
        let report = result
            .data
            .get("quality_report")
            .expect("report present");
        assert_eq!(report.get("raw").and_then(Value::as_u64), Some(2));
        assert_eq!(report.get("aggregated").and_then(Value::as_u64), Some(1));
    }

    #[test]
    fn missing_file_maps_to_io_error() {
        let args = ImportArgs {
            path: String::from("/nonexistent/statement.csv"),
            statement_format: StatementFormat::Csv,
        };

        let err = run(&args).expect_err("must fail");
        assert!(matches!(err, CliError::Io(_)));
    }
}
