//! batchlog - append batches of blocks to a log file and read them back

mod commands;
mod config;

use std::sync::Arc;

use anyhow::Context;
use batchlog::{BatchIndex, LogError};
use batchlog_logging::SubscriberBuilder;
use batchlog_storage::FileLog;
use clap::Parser;

use crate::config::{Cli, CliConfig, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    config.apply(&cli);

    let _log_guard = SubscriberBuilder::new()
        .with_config(config.logging.clone())
        .init();

    let log = Arc::new(FileLog::open(config.log.clone()).await?);
    let index = BatchIndex::with_config(Arc::clone(&log), config.index.clone());

    let result = match cli.command {
        Command::Append { blocks } => commands::append(&index, blocks).await,
        Command::Get {
            batch,
            position,
            hex,
        } => commands::get(&index, batch, position, hex).await,
        Command::Info => commands::info(&index).await,
        Command::Verify => commands::verify(&index).await,
    };

    finish(result, log.close().await)
}

/// The command's own error wins over a failure to close the log
fn finish(result: anyhow::Result<()>, closed: Result<(), LogError>) -> anyhow::Result<()> {
    result?;
    closed.context("closing log file")
}
