// ABOUTME: Server binary wiring configuration, database, provider, and HTTP serving
// ABOUTME: Production entry point for the Switchboard chat relay backend
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

//! # Switchboard Server Binary
//!
//! Starts the chat relay: loads configuration from the environment, opens
//! the SQLite transcript store, builds the OpenAI-compatible provider
//! client, and serves the HTTP API until ctrl-c.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use switchboard::{
    config::environment::ServerConfig,
    database::Database,
    llm::{LlmProvider, OpenAiProvider},
    logging,
    relay::Relay,
    server::{self, ServerResources},
    sse::ThreadNotificationBus,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "switchboard-server")]
#[command(about = "Switchboard - streaming chat relay between browser clients and LLM APIs")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle container environments where clap may not work properly
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Argument parsing failed: {e}");
            eprintln!("Using configuration from environment");
            Args { http_port: None }
        }
    };

    // Load configuration from environment
    let mut config = ServerConfig::from_env()?;

    // Override port if specified
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    // Initialize production logging
    logging::init_from_env()?;

    info!("Starting Switchboard chat relay");
    info!("{}", config.summary());

    // Open the transcript database and run migrations
    let database = Database::new(&config.database.url).await?;
    info!("Database initialized: {}", config.database.url);

    let transcripts = database.transcripts();
    let bus = ThreadNotificationBus::new();

    // Build the upstream provider client
    let provider = Arc::new(OpenAiProvider::new(config.openai.clone())?);
    info!("Upstream provider ready: {}", provider.name());

    let config = Arc::new(config);
    let relay = Relay::new(
        provider,
        transcripts.clone(),
        bus.clone(),
        config.chat.clone(),
    );

    let resources = Arc::new(ServerResources::new(config, relay, transcripts, bus));
    server::serve(resources).await
}
