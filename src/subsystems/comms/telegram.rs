//! Telegram comms channel — receives messages via the Telegram Bot API, sends
//! them to the agents as the sending user, and replies in the same chat.
//!
//! Updates arrive by long polling, or through the webhook HTTP server when
//! `comms.telegram.mode = "webhook"` (see [`super::webhook`]).

use std::env;
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{ChatAction, ChatId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{TelegramConfig, TelegramMode};
use crate::error::AppError;
use crate::subsystems::runtime::{Component, ComponentFuture};
use super::state::{CommsEvent, CommsState};

// ── Constants ────────────────────────────────────────────────────────────────

/// Telegram has a 4096 character limit per message.
/// We chunk at 4000 to be safe.
const MAX_MESSAGE_LENGTH: usize = 4000;

const VOICE_NOT_SUPPORTED: &str =
    "Voice messages are not supported yet. Please type what you ate and I'll log it.";
const INTERNAL_ERROR_REPLY: &str = "Internal error processing message.";

// ── Inbound classification ───────────────────────────────────────────────────

/// What to do with an incoming Telegram message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Inbound {
    /// Forward this text to the agents.
    Forward(String),
    /// Answer directly without involving the agents.
    Reply(&'static str),
    Ignore,
}

impl Inbound {
    fn classify(msg: &Message) -> Self {
        Self::from_parts(msg.text(), msg.photo().is_some(), msg.caption(), msg.voice().is_some())
    }

    fn from_parts(text: Option<&str>, has_photo: bool, caption: Option<&str>, has_voice: bool) -> Self {
        if let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) {
            return Inbound::Forward(text.to_string());
        }
        if has_photo {
            return Inbound::Forward(match caption.map(str::trim).filter(|c| !c.is_empty()) {
                Some(caption) => format!("User sent a food photo with caption: {caption}"),
                None => "User sent a food photo without a caption.".to_string(),
            });
        }
        if has_voice {
            return Inbound::Reply(VOICE_NOT_SUPPORTED);
        }
        Inbound::Ignore
    }
}

/// Split `text` into pieces of at most [`MAX_MESSAGE_LENGTH`] characters.
pub(super) fn chunk_message(text: &str) -> Vec<String> {
    if text.is_empty() {
        return vec!["(empty response)".to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(MAX_MESSAGE_LENGTH)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Handle one message end to end: classify, ask the agents, reply.
/// Shared by the polling dispatcher and the webhook server.
pub(super) async fn handle_message(bot: &Bot, msg: &Message, channel_id: &str, state: &CommsState) {
    let user_id = msg
        .from
        .as_ref()
        .map(|u| u.id.0.to_string())
        .unwrap_or_else(|| msg.chat.id.0.to_string());

    let content = match Inbound::classify(msg) {
        Inbound::Forward(content) => content,
        Inbound::Reply(text) => {
            send_chunks(bot, msg.chat.id, text).await;
            return;
        }
        Inbound::Ignore => {
            debug!(%channel_id, %user_id, "telegram: ignoring unsupported message kind");
            return;
        }
    };

    debug!(%channel_id, %user_id, from = ?msg.from.as_ref().and_then(|u| u.username.as_ref()), "telegram received message");
    let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;

    match state.send_message(channel_id, &user_id, content).await {
        Ok(reply) => send_chunks(bot, msg.chat.id, &reply).await,
        Err(e) => {
            warn!("send_message error: {e}");
            send_chunks(bot, msg.chat.id, INTERNAL_ERROR_REPLY).await;
        }
    }
}

async fn send_chunks(bot: &Bot, chat_id: ChatId, text: &str) {
    for chunk in chunk_message(text) {
        if let Err(e) = bot.send_message(chat_id, chunk).await {
            warn!("failed to send telegram reply: {e}");
        }
    }
}

// ── TelegramChannel ──────────────────────────────────────────────────────────

pub struct TelegramChannel {
    channel_id: String,
    config: TelegramConfig,
    state: Arc<CommsState>,
}

impl TelegramChannel {
    pub fn new(channel_id: impl Into<String>, config: TelegramConfig, state: Arc<CommsState>) -> Self {
        Self { channel_id: channel_id.into(), config, state }
    }
}

impl Component for TelegramChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_telegram(self.channel_id, self.config, self.state, shutdown))
    }
}

// ── run_telegram ─────────────────────────────────────────────────────────────

async fn run_telegram(
    channel_id: String,
    config: TelegramConfig,
    state: Arc<CommsState>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let token = match env::var("TELEGRAM_BOT_TOKEN") {
        Ok(t) => t,
        Err(_) => {
            warn!(%channel_id, "TELEGRAM_BOT_TOKEN not set, telegram channel exiting");
            return Ok(());
        }
    };

    let bot = Bot::new(token);

    match config.mode {
        TelegramMode::Webhook => {
            #[cfg(feature = "channel-webhook")]
            {
                return super::webhook::serve(bot, channel_id, config, state, shutdown).await;
            }
            #[cfg(not(feature = "channel-webhook"))]
            {
                warn!(%channel_id, "built without channel-webhook — falling back to polling");
            }
        }
        TelegramMode::Polling => {}
    }

    run_polling(bot, channel_id, state, shutdown).await
}

async fn run_polling(
    bot: Bot,
    channel_id: String,
    state: Arc<CommsState>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    info!(%channel_id, "telegram channel starting (long polling)");

    // A webhook left over from an earlier run blocks getUpdates.
    if let Err(e) = bot.delete_webhook().await {
        warn!(%channel_id, "failed to clear webhook: {e}");
    }

    let state_clone = state.clone();
    let channel_id_clone = channel_id.clone();

    let handler = Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let state = state_clone.clone();
        let channel_id = channel_id_clone.clone();
        async move {
            handle_message(&bot, &msg, &channel_id, &state).await;
            respond(())
        }
    });

    let mut dispatcher = Dispatcher::builder(bot, handler).build();
    state.report_event(CommsEvent::ChannelReady { channel_id: channel_id.clone() });

    tokio::select! {
        biased;

        _ = shutdown.cancelled() => {
            info!(%channel_id, "shutdown signal received — closing telegram channel");
        }
        _ = dispatcher.dispatch() => {
            warn!(%channel_id, "telegram dispatcher exited unexpectedly");
        }
    }

    state.report_event(CommsEvent::ChannelShutdown { channel_id });
    Ok(())
}
