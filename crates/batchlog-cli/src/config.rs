use std::path::{Path, PathBuf};

use anyhow::Context;
use batchlog::BatchIndexConfig;
use batchlog_logging::LogConfig;
use batchlog_storage::FileLogConfig;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

/// Settings loaded from the optional TOML config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub log: FileLogConfig,
    pub index: BatchIndexConfig,
    pub logging: LogConfig,
}

impl CliConfig {
    /// Load from `path`
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Apply command-line overrides
    pub fn apply(&mut self, cli: &Cli) {
        if let Some(data) = &cli.data {
            self.log.path = data.clone();
        }
        if cli.no_sync {
            self.log.sync_on_write = false;
        }
        if cli.verbose {
            self.logging.default_level = "debug".to_string();
        }
    }
}

#[derive(Parser)]
#[command(
    name = "batchlog",
    about = "Append batches of blocks to a log file and look them up by index",
    version
)]
pub struct Cli {
    /// TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log file to operate on (overrides the config file)
    #[arg(short, long, global = true)]
    pub data: Option<PathBuf>,

    /// Skip fsync after each append
    #[arg(long, global = true)]
    pub no_sync: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Append one batch; each argument is one block
    Append {
        /// Block contents
        #[arg(required = true)]
        blocks: Vec<String>,
    },
    /// Print the blocks of a batch
    Get {
        /// Batch index
        batch: u64,
        /// Print only the block at this position
        #[arg(short, long)]
        position: Option<u64>,
        /// Print blocks as hex instead of UTF-8
        #[arg(long)]
        hex: bool,
    },
    /// Show batch count, byte length, and head position
    Info,
    /// Look up every batch and check indices and byte lengths line up
    Verify,
}
