//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Build a content tree from a spreadsheet: one node per row, nesting from a level column
#[derive(Parser, Debug)]
#[command(name = "iacreate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Config file (default: ./iacreate.toml)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import a spreadsheet into the content store
    Import {
        /// Spreadsheet (default: <app_data_dir>/<source_file>)
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
        /// Node to create level-0 rows under
        #[arg(short, long)]
        parent: Option<u64>,
        /// Store file (default: <app_data_dir>/<store_file>)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        store: Option<PathBuf>,
        /// Print the content tree after importing
        #[arg(short, long)]
        tree: bool,
    },

    /// Import into a scratch store and print the resulting tree
    Preview {
        /// Spreadsheet (default: <app_data_dir>/<source_file>)
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
        /// Node to create level-0 rows under
        #[arg(short, long)]
        parent: Option<u64>,
    },

    /// Show the stored content tree
    Tree {
        /// Store file (default: <app_data_dir>/<store_file>)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        store: Option<PathBuf>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}
