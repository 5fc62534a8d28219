//! Settings and the evaluation run behind the `json-lazy-path` binary.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use json_lazy_path::{Config, Evaluator, NodeId};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    Evaluate(#[from] json_lazy_path::Error),
    #[error("cannot encode result: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("cannot write result: {0}")]
    Output(#[from] io::Error),
}

// ── Settings ──────────────────────────────────────────────────────────────

/// How the result is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Single line, deferred parts printed as expressions.
    #[default]
    Compact,
    /// Tab-indented, deferred parts printed as expressions.
    Pretty,
    /// Plain JSON through serde_json; fails on unresolved results.
    Json,
}

/// Contents of a TOML config file.
///
/// ```toml
/// symmetric-indexing = true
/// max-depth = 64
/// format = "pretty"
/// log-level = "debug"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FileConfig {
    #[serde(flatten)]
    pub evaluation: Config,
    pub format: Option<OutputFormat>,
    pub log_level: Option<String>,
}

pub fn load_config(path: &Path) -> Result<FileConfig, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| CliError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub symmetric_indexing: bool,
    pub negative_indexing: bool,
    pub max_depth: Option<usize>,
    pub format: Option<OutputFormat>,
}

/// Everything a run needs.
#[derive(Debug, Clone)]
pub struct Settings {
    pub document: String,
    pub expression: String,
    pub config: Config,
    pub format: OutputFormat,
}

impl Settings {
    pub fn new(document: String, expression: String, file: FileConfig, flags: Overrides) -> Self {
        let mut config = file.evaluation;
        config.symmetric_indexing |= flags.symmetric_indexing;
        config.negative_indexing |= flags.negative_indexing;
        if let Some(depth) = flags.max_depth {
            config.max_depth = depth;
        }
        Self {
            document,
            expression,
            config,
            format: flags.format.or(file.format).unwrap_or_default(),
        }
    }

    fn reads_stdin(&self) -> bool {
        self.document == "-"
    }
}

// ── Run ───────────────────────────────────────────────────────────────────

/// Load the document, evaluate the expression and write the result.
///
/// `stdin` is only read when the document is `-`.
pub fn run(settings: &Settings, stdin: impl BufRead, mut out: impl Write) -> Result<(), CliError> {
    let mut evaluator = Evaluator::new(settings.config);
    if settings.reads_stdin() {
        evaluator.load_reader(stdin)?;
    } else {
        evaluator.load_file(&settings.document)?;
    }
    let id = evaluator.evaluate(&settings.expression)?;
    debug!(expression = %settings.expression, kind = %evaluator.arena().kind(id), "evaluated");

    let text = render(&evaluator, id, settings.format)?;
    writeln!(out, "{text}")?;
    out.flush()?;
    Ok(())
}

pub fn render(evaluator: &Evaluator, id: NodeId, format: OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Compact => evaluator.stringify(id)?,
        OutputFormat::Pretty => evaluator.stringify_pretty(id)?,
        OutputFormat::Json => serde_json::to_string_pretty(&evaluator.to_json(id)?)?,
    })
}
