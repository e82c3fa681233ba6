//! CLI argument definitions for fabrica.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fabrica")]
#[command(version)]
#[command(about = "Declarative feature engineering", long_about = None)]
#[command(
    after_help = "GETTING STARTED:\n    fabrica validate -p features -n prices     Check a definition file\n    fabrica compute -n prices --data in.json   Compute every feature\n    fabrica graph -n prices --format ascii     Show the dependency graph"
)]
pub struct Cli {
    /// Suppress all non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log debug messages
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which definition file to load. Unset values come from the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct DefinitionArgs {
    /// Directory holding feature definition files
    #[arg(short = 'p', long, value_name = "DIR")]
    pub config_path: Option<PathBuf>,
    /// Definition file name without extension
    #[arg(short = 'n', long, value_name = "NAME")]
    pub config_name: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute every feature of a definition file
    Compute {
        #[command(flatten)]
        definitions: DefinitionArgs,
        /// JSON file mapping feature names to input values
        #[arg(short, long, value_name = "FILE")]
        data: Option<PathBuf>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
        /// Compute independent features of a level concurrently
        #[arg(long)]
        parallel: bool,
        /// Worker limit for --parallel (0 = available cores)
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
        /// Also print the transformation trace of each feature
        #[arg(long)]
        trace: bool,
        /// Only print these features (can be specified multiple times)
        #[arg(long = "feature", value_name = "NAME")]
        features: Vec<String>,
    },
    /// Show or save the feature dependency graph
    Graph {
        #[command(flatten)]
        definitions: DefinitionArgs,
        /// Output format
        #[arg(long, value_enum, default_value_t = GraphFormat::Ascii)]
        format: GraphFormat,
        /// Level of detail for ascii output
        #[arg(long, value_enum, default_value_t = GraphDetailArg::Minimal)]
        detail: GraphDetailArg,
        /// Write DOT source to this file instead of printing
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Check a definition file and report every problem found
    Validate {
        #[command(flatten)]
        definitions: DefinitionArgs,
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
    /// List features and their data types
    List {
        #[command(flatten)]
        definitions: DefinitionArgs,
        /// Only show features of this group
        #[arg(long)]
        group: Option<String>,
        /// List definition files in the features directory instead
        #[arg(long)]
        files: bool,
    },
    /// List available transformations
    Transforms,
    /// Show version information (with --verbose, build information too)
    Version,
    /// Generate shell completion script
    Completion {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    /// Graphviz DOT source
    Dot,
    /// Box drawing for the terminal
    Ascii,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphDetailArg {
    Minimal,
    Types,
}

impl From<GraphDetailArg> for crate::graph::GraphDetail {
    fn from(detail: GraphDetailArg) -> Self {
        match detail {
            GraphDetailArg::Minimal => crate::graph::GraphDetail::Minimal,
            GraphDetailArg::Types => crate::graph::GraphDetail::Types,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_compute_args() {
        let cli = Cli::try_parse_from([
            "fabrica", "compute", "-p", "defs", "-n", "prices", "--data", "in.json", "--parallel", "--workers", "2",
            "--feature", "a", "--feature", "b",
        ])
        .unwrap();
        match cli.command {
            Commands::Compute {
                definitions,
                data,
                parallel,
                workers,
                features,
                json,
                ..
            } => {
                assert_eq!(definitions.config_path, Some(PathBuf::from("defs")));
                assert_eq!(definitions.config_name.as_deref(), Some("prices"));
                assert_eq!(data, Some(PathBuf::from("in.json")));
                assert!(parallel);
                assert!(!json);
                assert_eq!(workers, Some(2));
                assert_eq!(features, vec!["a", "b"]);
            }
            _ => panic!("expected compute"),
        }
    }

    #[test]
    fn test_version_uses_global_verbose() {
        let cli = Cli::try_parse_from(["fabrica", "version", "--verbose"]).unwrap();
        assert!(matches!(cli.command, Commands::Version));
        assert!(cli.verbose);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["fabrica", "transforms", "--quiet"]).unwrap();
        assert!(cli.quiet);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_graph_defaults() {
        let cli = Cli::try_parse_from(["fabrica", "graph"]).unwrap();
        match cli.command {
            Commands::Graph { format, detail, output, .. } => {
                assert_eq!(format, GraphFormat::Ascii);
                assert_eq!(detail, GraphDetailArg::Minimal);
                assert!(output.is_none());
            }
            _ => panic!("expected graph"),
        }
    }
}
