//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Editor time diary.
///
/// Classifies editor activity into writing, thinking, debugging and rest,
/// and reports where the time went.
#[derive(Debug, Parser)]
#[command(name = "diary", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Track a session from host signals read as JSON lines on stdin.
    ///
    /// Runs until stdin closes or the process is interrupted, then closes
    /// the open interval.
    Track,

    /// Show analytics over the recorded intervals and errors.
    Report {
        /// Output as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,

        /// Compute the report as of this time (ISO 8601 or relative, e.g. '2 days ago').
        #[arg(long)]
        at: Option<String>,
    },

    /// Show today's coding time and database status.
    Status,

    /// Print recorded intervals as JSON lines.
    Entries,

    /// Print recorded debugger errors as JSON lines.
    Errors,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn report_accepts_json_and_at() {
        let cli = Cli::try_parse_from(["diary", "report", "--json", "--at", "1 day ago"]).unwrap();
        match cli.command {
            Some(Commands::Report { json, at }) => {
                assert!(json);
                assert_eq!(at.as_deref(), Some("1 day ago"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from(["diary", "status", "-v", "--config", "x.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Some(Commands::Status)));
    }
}
