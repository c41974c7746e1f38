//! Host process for the document tree file-protocol adapter.
//!
//! Manages persistent root grants and runs one adapter session per
//! invocation, the way a protocol server would drive it for one client
//! connection: apply the working directory, then perform a single command.

mod commands;
mod config;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use doctree_core::RootCapability;
use doctree_ftp::{FileSystemFactory, SessionUser};
use doctree_local::LocalProvider;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Command, Config};

fn main() -> anyhow::Result<()> {
    // Initialize logging (stderr, so downloads to stdout stay clean)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let config = Config::parse();
    let grants_file = config.grants_file();
    let provider = Arc::new(
        LocalProvider::open(&grants_file)
            .with_context(|| format!("Failed to load grants from {}", grants_file.display()))?,
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if config.command.is_grant_management() {
        manage_grants(&provider, &config.command, &mut out)?;
        return Ok(());
    }

    let root: RootCapability = config
        .root
        .as_deref()
        .context("No root capability given (use --root or DOCTREE_ROOT)")?
        .parse()?;

    let factory = FileSystemFactory::new(provider, root);
    let root_node = factory
        .check_root()
        .with_context(|| format!("Cannot open root {}", factory.root_capability()))?;
    info!("Opened root {} ({})", factory.root_capability(), root_node.uri);

    let mut view = factory.create_view(SessionUser::new(config.user.clone()));
    if !view.change_working_directory(&config.cwd) {
        anyhow::bail!("{}: not a directory", config.cwd);
    }

    let result = commands::run(&view, &config.command, &mut out);
    view.dispose();
    out.flush()?;
    result
}

fn manage_grants(
    provider: &LocalProvider,
    command: &Command,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Command::Grant { dir } => {
            let capability = provider
                .grant(dir)
                .with_context(|| format!("Failed to grant {}", dir.display()))?;
            writeln!(out, "{}", capability)?;
        }
        Command::Revoke { capability } => {
            let capability: RootCapability = capability.parse()?;
            if !provider.revoke(&capability)? {
                anyhow::bail!("{} was not granted", capability);
            }
        }
        Command::Grants => {
            for (capability, dir) in provider.grants()? {
                writeln!(out, "{}\t{}", capability, dir.display())?;
            }
        }
        _ => anyhow::bail!("not a grant management command"),
    }
    Ok(())
}
