// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use std::env;
use textbook_rag::cli::{self, Cli};
use textbook_rag::config::RagConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Honor a local .env before reading configuration
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = RagConfig::from_env()?;
    cli::execute(cli, config).await
}
