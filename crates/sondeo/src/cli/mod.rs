//! Command-line interface for sondeo.
//!
//! This module provides the CLI structure for the `sondeo` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::Verbosity;

pub use commands::{
    AnalyzeCommand, CategoriesCommand, ConfigCommand, FilterArgs, QuestionsCommand,
    ResponsesCommand, ServeCommand, SubsetCommand,
};

/// sondeo - Survey dataset service
///
/// Serves the questions and answers of an SPSS survey file over HTTP,
/// tallies responses by demographic group, and analyzes the file.
#[derive(Debug, Parser)]
#[command(name = "sondeo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeCommand),

    /// List survey questions
    Questions(QuestionsCommand),

    /// Tally the responses to a question
    Responses(ResponsesCommand),

    /// List question categories
    Categories(CategoriesCommand),

    /// Analyze the survey data file
    Analyze(AnalyzeCommand),

    /// Write the cases matching filters to a new file
    Subset(SubsetCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "sondeo");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["sondeo", "serve", "--port", "9000"]).unwrap();
        let Command::Serve(serve) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(serve.port, Some(9000));
        assert!(serve.host.is_none());
    }

    #[test]
    fn test_parse_responses_with_filters() {
        let cli = Cli::try_parse_from([
            "sondeo",
            "responses",
            "Q_1",
            "--percent",
            "--sexo",
            "2",
            "--edad-min",
            "18",
        ])
        .unwrap();
        let Command::Responses(cmd) = cli.command else {
            panic!("expected responses");
        };
        assert_eq!(cmd.id, "Q_1");
        assert!(cmd.percent);
        assert_eq!(cmd.filters.sexo, Some(2));
        assert_eq!(cmd.filters.edad_min, Some(18));
    }

    #[test]
    fn test_parse_subset() {
        let cli =
            Cli::try_parse_from(["sondeo", "subset", "out.zsav", "--municipio", "3", "--compress"])
                .unwrap();
        let Command::Subset(cmd) = cli.command else {
            panic!("expected subset");
        };
        assert_eq!(cmd.output, PathBuf::from("out.zsav"));
        assert!(cmd.compress);
        assert_eq!(cmd.filters.municipio, Some(3));
    }

    #[test]
    fn test_parse_analyze_defaults() {
        let cli = Cli::try_parse_from(["sondeo", "analyze"]).unwrap();
        let Command::Analyze(cmd) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(cmd.output, PathBuf::from("data_info.json"));
        assert!(!cmd.text);
    }

    #[test]
    fn test_parse_config_show() {
        let cli = Cli::try_parse_from(["sondeo", "config", "show", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Show { json: true })
        ));
    }

    #[test]
    fn test_parse_global_flags() {
        let cli =
            Cli::try_parse_from(["sondeo", "-c", "/custom/config.toml", "-vv", "categories"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert_eq!(cli.verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_quiet_wins() {
        let cli = Cli::try_parse_from(["sondeo", "-q", "-v", "categories"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::Quiet);
    }
}
