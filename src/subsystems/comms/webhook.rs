//! Telegram webhook server — an axum HTTP endpoint Telegram pushes updates to.
//!
//! ```text
//! POST /webhook   — Telegram update JSON; always answered 200
//! GET  /          — liveness text
//! GET  /health    — {"status":"ok"}
//! ```
//!
//! The public URL (`comms.telegram.webhook_url` or `NUTRI_WEBHOOK_URL`) plus
//! `/webhook` is registered with Telegram at startup.  Each update is handled
//! in its own task so Telegram gets its 200 immediately.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use teloxide::prelude::*;
use teloxide::types::UpdateKind;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::TelegramConfig;
use crate::error::AppError;
use super::state::{CommsEvent, CommsState};
use super::telegram::handle_message;

pub(super) const WEBHOOK_PATH: &str = "/webhook";

/// Router state, cheap to clone.
#[derive(Clone)]
struct WebhookState {
    channel_id: Arc<str>,
    bot: Bot,
    comms: Arc<CommsState>,
}

pub(super) async fn serve(
    bot: Bot,
    channel_id: String,
    config: TelegramConfig,
    comms: Arc<CommsState>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let base = config.webhook_url.ok_or_else(|| {
        AppError::Comms("telegram webhook mode needs comms.telegram.webhook_url or NUTRI_WEBHOOK_URL".into())
    })?;
    let url = webhook_url(&base)?;

    let listener = TcpListener::bind(&config.webhook_bind)
        .await
        .map_err(|e| AppError::Comms(format!("webhook bind failed on {}: {e}", config.webhook_bind)))?;

    bot.set_webhook(url.clone())
        .await
        .map_err(|e| AppError::Comms(format!("setWebhook failed: {e}")))?;
    info!(%channel_id, bind = %config.webhook_bind, %url, "telegram webhook listening");
    comms.report_event(CommsEvent::ChannelReady { channel_id: channel_id.clone() });

    let router = build_router(WebhookState {
        channel_id: Arc::from(channel_id.as_str()),
        bot,
        comms: comms.clone(),
    });

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Comms(format!("webhook server error: {e}")))?;

    info!(%channel_id, "telegram webhook shut down");
    comms.report_event(CommsEvent::ChannelShutdown { channel_id });
    Ok(())
}

/// `base` with [`WEBHOOK_PATH`] appended, tolerating a trailing slash.
fn webhook_url(base: &str) -> Result<reqwest::Url, AppError> {
    let full = format!("{}{WEBHOOK_PATH}", base.trim_end_matches('/'));
    reqwest::Url::parse(&full).map_err(|e| AppError::Comms(format!("invalid webhook url '{full}': {e}")))
}

fn build_router(state: WebhookState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route(WEBHOOK_PATH, post(receive_update))
        .with_state(state)
}

async fn root() -> &'static str {
    "nutri-bot is running"
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn receive_update(State(state): State<WebhookState>, body: Bytes) -> StatusCode {
    // Telegram retries anything but 2xx, so malformed updates are logged and acknowledged.
    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(channel_id = %state.channel_id, "unparseable webhook update: {e}");
            return StatusCode::OK;
        }
    };

    match update.kind {
        UpdateKind::Message(msg) => {
            tokio::spawn(async move {
                handle_message(&state.bot, &msg, &state.channel_id, &state.comms).await;
            });
        }
        _ => debug!(channel_id = %state.channel_id, "ignoring non-message update"),
    }
    StatusCode::OK
}
