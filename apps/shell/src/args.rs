//! # CLI Argument Definitions

use arbor_logger::{ConsoleFormat, LevelFilter};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::PathBuf;

/// The main CLI structure parsing command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "arbor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Build, edit and inspect nested attribute trees")]
pub(crate) struct Cli {
    /// Minimum level of diagnostics written to stderr
    #[arg(long, global = true, default_value = "warn")]
    pub(crate) log_level: LevelFilter,

    /// Diagnostics line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    pub(crate) log_format: LogFormat,

    /// Also write diagnostics as JSON lines to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub(crate) log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormat {
    Compact,
    Json,
}

impl From<LogFormat> for ConsoleFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Compact => Self::Compact,
            LogFormat::Json => Self::Json,
        }
    }
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// List the types of a registry file as JSON
    Types {
        /// Registry description (TOML, JSON or YAML)
        #[arg(short, long)]
        registry: PathBuf,
    },
    /// Create an entity, apply writes and print the result
    Eval(EvalArgs),
}

#[derive(Debug, Args)]
pub(crate) struct EvalArgs {
    /// Registry description (TOML, JSON or YAML)
    #[arg(short, long)]
    pub(crate) registry: PathBuf,

    /// Type of the entity to create
    #[arg(short = 't', long = "type")]
    pub(crate) type_name: String,

    /// Initial attributes as a JSON object, or `@file` to read them from a file
    #[arg(short, long)]
    pub(crate) input: Option<String>,

    /// Write `PATH=VALUE`; VALUE is parsed as JSON and falls back to a string
    #[arg(short, long = "set", value_name = "PATH=VALUE", value_parser = parse_assignment)]
    pub(crate) sets: Vec<(String, Value)>,

    /// Remove the attribute at PATH
    #[arg(short, long = "unset", value_name = "PATH")]
    pub(crate) unsets: Vec<String>,

    /// Print the value at PATH (one JSON document per line) instead of the whole entity
    #[arg(short, long = "get", value_name = "PATH")]
    pub(crate) gets: Vec<String>,

    /// Log every event the entity emits
    #[arg(short, long)]
    pub(crate) watch: bool,

    /// Pretty-print JSON output
    #[arg(short, long)]
    pub(crate) pretty: bool,
}

fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (path, value) =
        raw.split_once('=').ok_or_else(|| format!("expected PATH=VALUE, got '{raw}'"))?;
    if path.is_empty() {
        return Err(format!("empty path in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned()));
    Ok((path.to_owned(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn assignments_parse_json_or_fall_back_to_strings() {
        assert_eq!(parse_assignment("a.b=3").unwrap(), ("a.b".to_owned(), json!(3)));
        assert_eq!(parse_assignment("list=[1,2]").unwrap(), ("list".to_owned(), json!([1, 2])));
        assert_eq!(parse_assignment("name=Olena").unwrap(), ("name".to_owned(), json!("Olena")));
        assert_eq!(parse_assignment("eq=a=b").unwrap(), ("eq".to_owned(), json!("a=b")));
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=1").is_err());
    }
}
