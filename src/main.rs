use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use lotto_lib::config;
use lotto_lib::connection::conn;
use lotto_lib::mcp_handler::{MCPHandler, stdio};
use lotto_lib::notify::Notifier;
use lotto_lib::use_cases::{DrawUseCase, TicketUseCase};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()?;

    // stdout carries the JSON-RPC stream
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("🎟️ Lotto collection starting, database at {}", config.database_url);

    let db = conn(&config)?;
    let notifier = Notifier::new(&config);
    if !notifier.is_enabled() {
        tracing::info!("Telegram notifications disabled");
    }

    let draw_use_case = DrawUseCase::new(Arc::clone(&db), notifier);
    let ticket_use_case = TicketUseCase::new(Arc::clone(&db));

    let handler = MCPHandler::new(Arc::new(draw_use_case), Arc::new(ticket_use_case));

    let (reader, writer) = stdio();

    handler.serve(reader, writer).await.inspect_err(|e| {
        tracing::error!("serving error: {:?}", e);
    })?;

    Ok(())
}
