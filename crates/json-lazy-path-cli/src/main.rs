//! `json-lazy-path` — evaluate a lazy JSON path expression against a document.
//!
//! Usage:
//!   json-lazy-path [OPTIONS] <DOCUMENT> <EXPRESSION>
//!
//! `DOCUMENT` is a file path, or `-` to read the document from stdin. The
//! result is printed on stdout; errors go to stderr with exit code 1.
#![allow(clippy::print_stderr)]

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

mod cli;

use cli::{load_config, run, FileConfig, OutputFormat, Overrides, Settings};

/// Evaluate a lazy JSON path expression against a JSON document
#[derive(Parser, Debug)]
#[command(name = "json-lazy-path")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Document file, or `-` for stdin
    #[arg(value_name = "DOCUMENT")]
    document: String,

    /// Expression to evaluate, `$` being the document
    #[arg(value_name = "EXPRESSION")]
    expression: String,

    /// Path to configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Allow `index[array]` as well as `array[index]`
    #[arg(long = "symmetric-indexing", env = "JSON_LAZY_PATH_SYMMETRIC")]
    symmetric_indexing: bool,

    /// Count negative array indices from the end
    #[arg(long = "negative-indexing", env = "JSON_LAZY_PATH_NEGATIVE")]
    negative_indexing: bool,

    /// Maximum nesting depth accepted by the parser (overrides config file)
    #[arg(long = "max-depth", value_name = "N")]
    max_depth: Option<usize>,

    /// Output format (overrides config file)
    #[arg(short = 'f', long = "format", value_enum, value_name = "FORMAT")]
    format: Option<OutputFormat>,

    /// Log level or filter: trace, debug, info, warn, error (overrides config file)
    #[arg(
        short = 'l',
        long = "log-level",
        value_name = "LEVEL",
        env = "JSON_LAZY_PATH_LOG"
    )]
    log_level: Option<String>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            symmetric_indexing: self.symmetric_indexing,
            negative_indexing: self.negative_indexing,
            max_depth: self.max_depth,
            format: self.format,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let file = match cli.config.as_deref().map(load_config).transpose() {
        Ok(file) => file.unwrap_or_default(),
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let level = cli
        .log_level
        .as_deref()
        .or(file.log_level.as_deref())
        .unwrap_or("warn");
    init_logging(level);

    let settings = settings(cli, file);
    match run(&settings, io::stdin().lock(), io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(expression = %settings.expression, "evaluation failed");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn settings(cli: Cli, file: FileConfig) -> Settings {
    let overrides = cli.overrides();
    Settings::new(cli.document, cli.expression, file, overrides)
}

fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "json-lazy-path",
            "--negative-indexing",
            "--max-depth",
            "12",
            "-f",
            "pretty",
            "-",
            "$.a[-1]",
        ])
        .unwrap();
        assert_eq!(cli.document, "-");
        let settings = settings(cli, FileConfig::default());
        assert!(settings.config.negative_indexing);
        assert!(!settings.config.symmetric_indexing);
        assert_eq!(settings.config.max_depth, 12);
        assert_eq!(settings.format, OutputFormat::Pretty);
        assert_eq!(settings.expression, "$.a[-1]");
    }

    #[test]
    fn test_missing_expression() {
        assert!(Cli::try_parse_from(["json-lazy-path", "doc.json"]).is_err());
    }
}
