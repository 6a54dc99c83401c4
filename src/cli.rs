//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use crate::merge::MergeEngine;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Email template inliner
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root; every other path is relative to it
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Config file name (default: inliner.toml)
    #[arg(short = 'C', long, default_value = "inliner.toml")]
    pub config: PathBuf,

    /// Source directory with the top-level templates
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Data directory with `<name>.html.json` merge data
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Merge engine
    #[arg(short, long, value_enum)]
    pub merge: Option<MergeEngine>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Inline and minify every template once, without merging data
    Build {
        /// Only these files instead of every `*.html` in the source directory
        files: Vec<PathBuf>,
    },

    /// Build everything, then rebuild affected templates on every change
    Watch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_with_files() {
        let cli = Cli::parse_from(["inliner", "-o", "dist", "build", "a.html", "b.html"]);
        assert_eq!(cli.root, PathBuf::from("."));
        assert_eq!(cli.config, PathBuf::from("inliner.toml"));
        assert_eq!(cli.output, Some(PathBuf::from("dist")));
        match cli.command {
            Commands::Build { files } => assert_eq!(files.len(), 2),
            Commands::Watch => panic!("expected build"),
        }
    }

    #[test]
    fn test_parse_merge_engine() {
        let cli = Cli::parse_from(["inliner", "--merge", "passthrough", "watch"]);
        assert_eq!(cli.merge, Some(MergeEngine::Passthrough));
        assert!(matches!(cli.command, Commands::Watch));
    }
}
