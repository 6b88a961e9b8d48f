//! CLI for gdfetch.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gdfetch_core::config;
use gdfetch_core::ArchiveFormat;
use std::path::PathBuf;

use commands::{run_extract, run_fetch, run_remove};

/// Top-level CLI for gdfetch.
#[derive(Debug, Parser)]
#[command(name = "gdfetch")]
#[command(
    about = "gdfetch: download files behind a confirmation page and unpack archives safely",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a file by its resource identifier; skipped if DEST exists.
    Fetch {
        /// Resource identifier sent as the `id` query parameter.
        id: String,
        /// Path of the downloaded file.
        dest: PathBuf,
        /// Extract the downloaded archive into this directory.
        #[arg(long, value_name = "DIR")]
        extract_to: Option<PathBuf>,
        /// Archive format (tar, tar.gz, tar.xz, zip). Guessed from the file when omitted.
        #[arg(long)]
        format: Option<ArchiveFormat>,
    },

    /// Extract an archive into a directory; skipped if DEST exists.
    Extract {
        /// Archive to read.
        archive: PathBuf,
        /// Directory to create.
        dest: PathBuf,
        /// Archive format (tar, tar.gz, tar.xz, zip). Guessed from the file when omitted.
        #[arg(long)]
        format: Option<ArchiveFormat>,
    },

    /// Remove a file or directory tree without following symlinks.
    Rm {
        /// Path to remove.
        path: PathBuf,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Fetch {
                id,
                dest,
                extract_to,
                format,
            } => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_fetch(&cfg, &id, &dest, extract_to.as_deref(), format).await?;
            }
            CliCommand::Extract {
                archive,
                dest,
                format,
            } => run_extract(&archive, &dest, format).await?,
            CliCommand::Rm { path } => run_remove(&path).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
