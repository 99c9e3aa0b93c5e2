//! Stream Timer - A stream-schedule countdown with shareable display links
//!
//! This is the main entry point for the stream-timer application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use stream_timer::{
    api::create_router,
    config::{Command, Config},
    display::{DisplayFrame, DisplayRenderer},
    schedule::{FileSlot, SectionListStore},
    state::AppState,
    token::TokenCodec,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("stream_timer={},tower_http=info", config.log_level()))
        .init();

    let codec = TokenCodec::new(config.secret());
    if !codec.has_secret() {
        warn!("JWT_SECRET is not set: share links cannot be created and every token will be rejected");
    }

    match config.command.clone() {
        Some(Command::Display { token }) => run_display(&token, &codec).await,
        Some(Command::Serve) | None => serve(&config, codec).await,
    }
}

/// Run the editor HTTP server until a shutdown signal arrives
async fn serve(config: &Config, codec: TokenCodec) -> anyhow::Result<()> {
    info!("Starting stream-timer server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, sections_file={}",
          config.host, config.port, config.sections_file.display());

    let store = SectionListStore::persisted(FileSlot::new(&config.sections_file));
    let state = Arc::new(AppState::new(
        config.port,
        config.host.clone(),
        config.public_url(),
        store,
        codec,
    ));

    let app = create_router(state);

    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET    /sections             - List sections");
    info!("  POST   /sections             - Add a section");
    info!("  PUT    /sections/:index      - Edit a section");
    info!("  DELETE /sections/:index      - Delete a section");
    info!("  POST   /sections/:index/move - Move a section up or down");
    info!("  POST   /sections/reorder     - Move a section to a new position");
    info!("  GET    /timer                - Countdown state");
    info!("  POST   /timer/start|pause|reset");
    info!("  POST   /api/create-token     - Sign a section list");
    info!("  POST   /share                - Sign the current section list");
    info!("  GET    /display?token=       - Display frame for a share token");
    info!("  GET    /display/stream?token= - Live display (server-sent events)");
    info!("  GET    /status               - Editor status");
    info!("  GET    /health               - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Play a shared schedule in the terminal, one line per tick
async fn run_display(token: &str, codec: &TokenCodec) -> anyhow::Result<()> {
    let renderer = DisplayRenderer::open(Some(token), codec);
    println!("{}", renderer.frame().to_text());

    let Some(mut updates) = renderer.subscribe() else {
        return Ok(());
    };

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let frame = DisplayFrame::from_snapshot(&updates.borrow_and_update());
                println!("{}", frame.to_text());
                if frame.is_finished() {
                    info!("Schedule finished");
                    break;
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}
