//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for council results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Only the final answer
    Answer,
    /// The whole coordinator transcript followed by the final answer
    Full,
    /// JSON output
    Json,
}

/// CLI arguments for feature-council
#[derive(Parser, Debug)]
#[command(name = "feature-council")]
#[command(author, version, about = "Feature council - a manager agent consults worker agents")]
#[command(long_about = r#"
Feature Council turns a feature description into a reviewed answer.

A coordinator agent decides, one step at a time, whether to ask a single
worker, ask every worker at once, or give the final answer. Workers keep
their own history and always see the original feature description.

Configuration files are loaded from (in priority order):
1. COUNCIL_* environment variables
2. --config <path>     Explicit config file
3. ./council.toml      Project-level config
4. ~/.config/feature-council/config.toml   Global config

Example:
  feature-council "Add a dark mode toggle to the settings page"
  feature-council --workers 3 --model qwen2.5
  echo "Export reports as CSV" | feature-council --output json
"#)]
pub struct Cli {
    /// Feature description (prompted for on stdin when omitted)
    pub task: Option<String>,

    /// Number of worker agents
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Oracle server URL (overrides config)
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Oracle model name (overrides config)
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "answer")]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and the effective configuration, then exit
    #[arg(long)]
    pub show_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["feature-council"]);
        assert!(cli.task.is_none());
        assert!(cli.workers.is_none());
        assert_eq!(cli.output, OutputFormat::Answer);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_overrides_and_task() {
        let cli = Cli::parse_from([
            "feature-council",
            "-vv",
            "--workers",
            "3",
            "--model",
            "qwen2.5",
            "--output",
            "json",
            "Add dark mode",
        ]);
        assert_eq!(cli.task.as_deref(), Some("Add dark mode"));
        assert_eq!(cli.workers, Some(3));
        assert_eq!(cli.model.as_deref(), Some("qwen2.5"));
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.verbose, 2);
    }
}
