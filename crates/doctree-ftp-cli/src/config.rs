use std::path::PathBuf;

use clap::{Parser, Subcommand};
use doctree_local::default_grants_file;

/// Configuration for the doctree-ftp host.
#[derive(Parser, Debug, Clone)]
#[command(name = "doctree-ftp")]
#[command(about = "Grant directories and run file-protocol sessions over them")]
pub struct Config {
    /// JSON file holding granted root directories
    #[arg(long, env = "DOCTREE_GRANTS_FILE")]
    pub grants_file: Option<PathBuf>,

    /// Root capability to open a session on (local:<token>)
    #[arg(long, env = "DOCTREE_ROOT")]
    pub root: Option<String>,

    /// Session user, reported as owner and group of every file
    #[arg(long, default_value = "anonymous", env = "DOCTREE_USER")]
    pub user: String,

    /// Working directory applied before the command runs
    #[arg(long, default_value = "/", env = "DOCTREE_CWD")]
    pub cwd: String,

    #[command(subcommand)]
    pub command: Command,
}

impl Config {
    pub fn grants_file(&self) -> PathBuf {
        self.grants_file.clone().unwrap_or_else(default_grants_file)
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Grant access to a directory and print its capability
    Grant { dir: PathBuf },

    /// Withdraw a previously granted capability
    Revoke { capability: String },

    /// List granted capabilities
    Grants,

    /// List a directory (defaults to the working directory)
    Ls { path: Option<String> },

    /// Show metadata of a path
    Stat { path: String },

    /// Download a file
    Get {
        path: String,

        /// Byte offset to start reading from
        #[arg(long, default_value_t = 0)]
        offset: u64,

        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Upload a local file, creating the target if needed
    Put {
        file: PathBuf,
        path: String,

        /// Append instead of truncating when greater than zero
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },

    /// Create a directory
    Mkdir { path: String },

    /// Delete a file or directory
    Rm { path: String },

    /// Rename an entry (within its current directory)
    Mv { from: String, to: String },
}

impl Command {
    /// Commands that manage grants rather than run inside a session.
    pub fn is_grant_management(&self) -> bool {
        matches!(
            self,
            Command::Grant { .. } | Command::Revoke { .. } | Command::Grants
        )
    }
}
