//! Evalu8 · Assessment Authoring Backend
//!
//! - Axum HTTP + WebSocket API
//! - SQLite-backed persistence for users and assessments
//! - Optional Mistral integration (via environment variables)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   EVALU8_DB_PATH      : SQLite file path (default "evalu8.db")
//!   MISTRAL_API_KEY     : enables AI generation if present
//!   MISTRAL_BASE_URL    : default "https://api.mistral.ai/v1"
//!   MISTRAL_MODEL       : default "mistral-small-2506"
//!   EVALU8_CONFIG_PATH  : path to TOML config (prompts + optional assessment bank)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod grading;
mod config;
mod seeds;
mod store;
mod state;
mod protocol;
mod logic;
mod mistral;
mod extract;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
  telemetry::init_tracing();

  // Build shared application state (store, Mistral client, prompts).
  let state = Arc::new(AppState::new().await?);

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "evalu8_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
