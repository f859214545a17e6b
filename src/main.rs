//! MsgHub Server: session/message hub over WebSocket
//!
//! Main entry point that loads configuration, wires the hub to its token
//! decoder and principal resolver, and serves the WebSocket endpoint.

mod listener;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::routing::get;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use msghub_auth::{ClaimsPrincipalResolver, InMemoryPrincipalDirectory, JwtDecoder, JwtEncoder};
use msghub_core::config::{AppConfig, LoggingConfig};
use msghub_core::traits::{PrincipalResolver, TokenDecoder};
use msghub_realtime::MessageHub;

use crate::listener::TracingListener;
use crate::ws::AppState;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "msghub-server", version, about = "Session/message hub over WebSocket")]
struct Cli {
    /// Directory holding `default.toml` and `{env}.toml`
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Environment overlay to load
    #[arg(long, default_value = "development")]
    env: String,

    /// Override the bind address (`host:port`)
    #[arg(long)]
    bind: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the WebSocket server (default)
    Serve,
    /// Print a signed bearer token for testing clients
    IssueToken {
        /// Token subject
        #[arg(long)]
        subject: String,
        /// Role to grant (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config_dir, &cli.env)
        .with_context(|| format!("Failed to load configuration from '{}'", cli.config_dir))?;

    init_logging(&config.logging);
    tracing::info!(
        config_dir = %cli.config_dir,
        env = %cli.env,
        "Configuration loaded"
    );

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run(config, cli.bind).await,
        Command::IssueToken { subject, roles } => {
            let encoder = JwtEncoder::new(&config.auth);
            let (token, expires_at) = encoder
                .generate_token(&subject, &roles)
                .context("Failed to issue token")?;
            println!("{token}");
            tracing::info!(subject = %subject, expires_at = %expires_at, "Token issued");
            Ok(())
        }
    }
}

/// Initialize tracing/logging
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig, bind: Option<String>) -> anyhow::Result<()> {
    tracing::info!("Starting MsgHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Authentication collaborators ─────────────────────
    let decoder: Arc<dyn TokenDecoder> = Arc::new(JwtDecoder::new(&config.auth));
    let principals: Arc<dyn PrincipalResolver> = if config.auth.principals.is_empty() {
        tracing::info!("Resolving principals from token claims");
        Arc::new(ClaimsPrincipalResolver::new())
    } else {
        let directory = InMemoryPrincipalDirectory::new();
        for principal in &config.auth.principals {
            directory.upsert(principal.clone());
        }
        tracing::info!(
            principals = directory.len(),
            "Resolving principals from configured directory"
        );
        Arc::new(directory)
    };

    // ── Step 2: Hub ──────────────────────────────────────────────
    let hub = Arc::new(MessageHub::new(config.hub.clone(), decoder, principals));
    hub.add_listener(Arc::new(TracingListener));
    hub.start();

    // ── Step 3: HTTP server ──────────────────────────────────────
    let state = AppState {
        hub: Arc::clone(&hub),
        outbound_buffer: config.server.outbound_buffer,
    };
    let app = Router::new()
        .route(&config.server.ws_path, get(ws::ws_handler))
        .route("/health", get(ws::health))
        .route("/metrics", get(ws::metrics))
        .route("/connections", get(ws::connections))
        .with_state(state);

    let addr = bind.unwrap_or_else(|| config.server.bind_address());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(
        addr = %addr,
        ws_path = %config.server.ws_path,
        "MsgHub server listening"
    );

    // ── Step 4: Graceful shutdown ────────────────────────────────
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
    })
    .await
    .context("Server error")?;

    hub.shutdown().await;
    tracing::info!("MsgHub server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
