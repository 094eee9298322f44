//! CLI argument definitions for Clearlot.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `import` | Ingest a statement file into holdings + quality report |
//! | `quote` | Fetch latest quotes via the provider chain |
//! | `news` | Fetch recent company news |
//! | `peers` | Fetch peer tickers |
//! | `sources` | List configured providers and health |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, ndjson, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings as errors |
//! | `--mock` | `false` | Use offline deterministic providers |

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Clearlot - brokerage statement ingestion and market context CLI
///
/// Turns CSV/PDF/LLM statement extracts into reconciled holdings with an
/// auditable quality report, and fetches quotes, news, and peers through a
/// fail-closed provider fallback chain (Finnhub, FMP, Yahoo).
#[derive(Debug, Parser)]
#[command(
    name = "clearlot",
    author,
    version,
    about = "Statement ingestion and market-data CLI"
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Use offline mock providers with deterministic data.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format for terminal display.
    Table,
    /// Single JSON object output.
    Json,
    /// Newline-delimited JSON (one object per line).
    Ndjson,
}

/// Statement input formats accepted by `import`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatementFormat {
    /// Comma-separated export with a header row.
    Csv,
    /// Raw LLM output expected to contain a JSON object with `holdings`.
    LlmJson,
    /// Plain text extracted from a PDF statement (regex fallback).
    PdfText,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest a statement file and emit holdings plus the quality report.
    ///
    /// # Examples
    ///
    ///   clearlot import positions.csv
    ///   clearlot import extract.txt --statement-format llm-json --pretty
    Import(ImportArgs),

    /// Fetch latest quote(s) through the provider fallback chain.
    ///
    /// # Examples
    ///
    ///   clearlot quote AAPL
    ///   clearlot quote AAPL MSFT --pretty
    Quote(QuoteArgs),

    /// Fetch recent company news for a ticker.
    ///
    /// # Examples
    ///
    ///   clearlot news TSLA --days-back 14
    News(NewsArgs),

    /// Fetch peer tickers for a symbol.
    ///
    /// # Examples
    ///
    ///   clearlot peers NVDA
    Peers(PeersArgs),

    /// List configured providers, capabilities, and health.
    Sources(SourcesArgs),
}

/// Arguments for the `import` command.
#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Path to the statement file.
    pub path: String,

    /// Input format of the statement file.
    #[arg(long, value_enum, default_value_t = StatementFormat::Csv)]
    pub statement_format: StatementFormat,
}

/// Arguments for the `quote` command.
#[derive(Debug, Args)]
pub struct QuoteArgs {
    /// One or more market tickers (e.g., AAPL, MSFT).
    #[arg(required = true, num_args = 1..)]
    pub tickers: Vec<String>,
}

/// Arguments for the `news` command.
#[derive(Debug, Args)]
pub struct NewsArgs {
    /// Market ticker to fetch news for.
    pub ticker: String,

    /// How many days of history to request.
    #[arg(long, default_value_t = 7)]
    pub days_back: u32,
}

/// Arguments for the `peers` command.
#[derive(Debug, Args)]
pub struct PeersArgs {
    /// Market ticker to fetch peers for.
    pub ticker: String,
}

/// Arguments for the `sources` command.
#[derive(Debug, Args)]
pub struct SourcesArgs {
    /// Include supported data kinds per provider.
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}
