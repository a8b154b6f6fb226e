//! Nutrition coordinator agent.
//!
//! Slash commands go straight to the tools.  Everything else runs the
//! model/tool loop: the model sees the layered system prompt, the user's
//! recent history and the tool catalogue, and each tool call it makes is
//! executed for the sending user.  The user id attached to a tool call is
//! always the sender's; any `user_id` the model puts in the arguments is
//! ignored by the tools.

mod commands;
mod history;

use std::sync::Arc;

use serde_json::json;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use super::prompt::coordinator_prompt;
use super::{Agent, AgentsState};
use crate::llm::ChatMessage;
use crate::supervisor::bus::{BusPayload, BusResult};

use history::Histories;

const LLM_ERROR_REPLY: &str = "Sorry, I couldn't reach my brain just now. Please try again in a moment.";
const ROUNDS_EXHAUSTED_REPLY: &str =
    "Sorry, I got lost working on that. Could you rephrase or split it into smaller requests?";
const EMPTY_REPLY: &str = "Done.";

pub(super) struct NutritionAgent {
    histories: Histories,
}

impl NutritionAgent {
    pub fn new() -> Self {
        Self { histories: Histories::default() }
    }
}

impl Agent for NutritionAgent {
    fn id(&self) -> &str {
        "nutrition"
    }

    fn handle(
        &self,
        _action: String,
        channel_id: String,
        user_id: String,
        content: String,
        reply_tx: oneshot::Sender<BusResult>,
        state: Arc<AgentsState>,
    ) {
        let history = self.histories.for_user(&user_id);
        tokio::spawn(async move {
            let reply = match commands::parse(&content) {
                Some(command) => {
                    debug!(%user_id, ?command, "nutrition: command");
                    commands::run(command, &user_id, &state).await
                }
                None => {
                    let mut history = history.lock().await;
                    converse(&state, &user_id, &mut history, content).await
                }
            };
            let _ = reply_tx.send(Ok(BusPayload::CommsMessage { channel_id, user_id, content: reply }));
        });
    }
}

/// Run one user message through the model/tool loop and return the reply.
///
/// On an LLM failure the history is rolled back to before the message so
/// the transcript never holds an unanswered turn.
async fn converse(state: &AgentsState, user_id: &str, history: &mut Vec<ChatMessage>, text: String) -> String {
    let checkpoint = history.len();
    history.push(ChatMessage::User(text));

    let system = coordinator_prompt(
        &state.prompts_dir,
        &state.tools,
        &state.bot_name,
        user_id,
        &state.clock.today(),
    );

    for round in 0..state.max_tool_rounds {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::System(system.clone()));
        messages.extend(history.iter().cloned());

        let turn = match state.chat(messages).await {
            Ok(turn) => turn,
            Err(e) => {
                error!(user_id, round, error = %e.message, "nutrition: llm call failed");
                history.truncate(checkpoint);
                return LLM_ERROR_REPLY.to_string();
            }
        };

        if turn.tool_calls.is_empty() {
            let reply = turn
                .text
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| EMPTY_REPLY.to_string());
            history.push(ChatMessage::Assistant { content: Some(reply.clone()), tool_calls: vec![] });
            history::trim(history, state.history_cap);
            return reply;
        }

        history.push(ChatMessage::Assistant { content: turn.text.clone(), tool_calls: turn.tool_calls.clone() });
        for call in &turn.tool_calls {
            debug!(user_id, round, tool = %call.name, "nutrition: tool call");
            let content = match state.execute_tool(&call.name, call.arguments.clone(), user_id).await {
                Ok(reply) => reply.data_json,
                Err(e) => {
                    warn!(user_id, tool = %call.name, error = %e.message, "nutrition: tool dispatch failed");
                    json!({ "status": "error", "kind": "storage", "message": e.message }).to_string()
                }
            };
            history.push(ChatMessage::Tool { call_id: call.id.clone(), content });
        }
    }

    warn!(user_id, rounds = state.max_tool_rounds, "nutrition: tool rounds exhausted");
    history.push(ChatMessage::Assistant { content: Some(ROUNDS_EXHAUSTED_REPLY.to_string()), tool_calls: vec![] });
    history::trim(history, state.history_cap);
    ROUNDS_EXHAUSTED_REPLY.to_string()
}
