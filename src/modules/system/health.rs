//! Liveness endpoints for hosting platforms.

use axum::{extract::State, routing::get, Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub status: &'static str,
    pub bot: String,
    pub servers: usize,
    /// Seconds since start-up.
    pub uptime: f64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: String,
}

/// What the bot knows about itself, shared with the HTTP server.
#[derive(Debug, Clone)]
pub struct HealthState {
    started: Instant,
    bot_tag: Arc<RwLock<Option<String>>>,
    guilds: Arc<AtomicUsize>,
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            bot_tag: Arc::new(RwLock::new(None)),
            guilds: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn set_bot_tag(&self, tag: String) {
        *self.bot_tag.write().await = Some(tag);
    }

    pub fn set_guild_count(&self, count: usize) {
        self.guilds.store(count, Ordering::Relaxed);
    }

    pub fn guild_joined(&self) {
        self.guilds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn guild_left(&self) {
        // Never wraps below zero.
        let _ = self
            .guilds
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn guild_count(&self) -> usize {
        self.guilds.load(Ordering::Relaxed)
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

async fn status_handler(State(state): State<HealthState>) -> Json<StatusReport> {
    let bot = state
        .bot_tag
        .read()
        .await
        .clone()
        .unwrap_or_else(|| "Not logged in".to_string());

    Json(StatusReport {
        status: "online",
        bot,
        servers: state.guild_count(),
        uptime: state.started.elapsed().as_secs_f64(),
        timestamp: now(),
    })
}

async fn health_handler() -> Json<HealthReport> {
    Json(HealthReport {
        status: "healthy",
        timestamp: now(),
    })
}

pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/", get(status_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

pub async fn start_health_server(state: HealthState, port: u16) -> std::io::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Health check server listening on {}", addr);
    axum::serve(listener, health_router(state)).await
}
