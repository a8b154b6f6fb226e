//! Agents subsystem — receives agent-targeted requests and routes to agents.
//!
//! [`Agent`] is the extension trait: each agent is a `Send + Sync` struct
//! registered in the subsystem by name.  Built-in agents are `echo` (returns
//! the input unchanged) and `nutrition` (the LLM coordinator that drives the
//! nutrition tools).
//!
//! [`AgentsSubsystem`] implements [`BusHandler`] with prefix `"agents"` and
//! is never blocked: sync agents resolve immediately, async ones spawn tasks.

mod nutrition;
pub mod prompt;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;

use crate::config::AgentsConfig;
use crate::llm::{ChatMessage, LlmTurn, ToolSpec};
use crate::subsystems::storage::Clock;
use crate::supervisor::bus::{
    BusError, BusHandle, BusPayload, BusResult, ERR_INTERNAL, ERR_INVALID_PARAMS, ERR_METHOD_NOT_FOUND,
};
use crate::supervisor::dispatch::BusHandler;

// ── AgentsState ───────────────────────────────────────────────────────────────

/// Shared capability surface passed to agents.
///
/// The raw [`BusHandle`] is private — agents call typed methods and cannot
/// address arbitrary bus targets.
pub struct AgentsState {
    /// Supervisor bus — private to this module.
    bus: BusHandle,
    /// Tool schemas offered to the model.
    pub tools: Vec<ToolSpec>,
    /// Directory holding the layered prompt templates.
    pub prompts_dir: PathBuf,
    pub bot_name: String,
    pub max_tool_rounds: usize,
    /// Messages kept per user between turns.
    pub history_cap: usize,
    pub clock: Arc<dyn Clock>,
}

/// What `tools/execute` answered.
#[derive(Debug, Clone)]
pub struct ToolReply {
    pub ok: bool,
    /// Serialised tool outcome (`status`, `message`, `data`).
    pub data_json: String,
}

impl ToolReply {
    /// The human-readable `message` of the outcome.
    pub fn message(&self) -> String {
        serde_json::from_str::<Value>(&self.data_json)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| self.data_json.clone())
    }
}

impl AgentsState {
    /// One chat-completion round through the LLM subsystem.
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LlmTurn, BusError> {
        let payload = BusPayload::LlmChat { messages, tools: self.tools.clone() };
        match self.bus.request("llm/chat", payload).await {
            Err(e) => Err(BusError::new(ERR_INTERNAL, e.to_string())),
            Ok(Err(e)) => Err(e),
            Ok(Ok(BusPayload::LlmTurn(turn))) => Ok(turn),
            Ok(Ok(_)) => Err(BusError::new(ERR_INTERNAL, "unexpected reply payload from llm/chat")),
        }
    }

    /// Execute a tool through the tools subsystem on behalf of `user_id`.
    pub async fn execute_tool(&self, tool: &str, args_json: String, user_id: &str) -> Result<ToolReply, BusError> {
        let payload = BusPayload::ToolRequest {
            tool: tool.to_string(),
            args_json,
            user_id: user_id.to_string(),
        };
        match self.bus.request("tools/execute", payload).await {
            Err(e) => Err(BusError::new(ERR_INTERNAL, e.to_string())),
            Ok(Err(e)) => Err(e),
            Ok(Ok(BusPayload::ToolResponse { ok, data_json, .. })) => Ok(ToolReply { ok, data_json }),
            Ok(Ok(_)) => Err(BusError::new(ERR_INTERNAL, "unexpected reply payload from tools/execute")),
        }
    }
}

// ── Agent trait ───────────────────────────────────────────────────────────────

/// An agent loaded by the agents subsystem.
///
/// Implementations must be `Send + Sync` and must not block the caller:
/// synchronous work resolves `reply_tx` immediately; async work spawns a task
/// and resolves it when done.
pub trait Agent: Send + Sync {
    /// Unique agent identifier (matches config name, e.g. `"echo"`).
    fn id(&self) -> &str;

    /// Handle a message from `user_id` arriving on `channel_id`.
    fn handle(
        &self,
        action: String,
        channel_id: String,
        user_id: String,
        content: String,
        reply_tx: oneshot::Sender<BusResult>,
        state: Arc<AgentsState>,
    );
}

// ── Built-in agents ───────────────────────────────────────────────────────────

struct EchoAgent;

impl Agent for EchoAgent {
    fn id(&self) -> &str { "echo" }
    fn handle(&self, _action: String, channel_id: String, user_id: String, content: String, reply_tx: oneshot::Sender<BusResult>, _state: Arc<AgentsState>) {
        let _ = reply_tx.send(Ok(BusPayload::CommsMessage { channel_id, user_id, content }));
    }
}

// ── AgentsSubsystem ───────────────────────────────────────────────────────────

/// Agents subsystem.
///
/// Method grammar:
/// - `agents`                         -> default agent, default action
/// - `agents/list`                    -> JSON list of enabled agents
/// - `agents/{agent_id}`              -> explicit agent, default action
/// - `agents/{agent_id}/{action}`     -> explicit agent + action
pub struct AgentsSubsystem {
    state: Arc<AgentsState>,
    agents: HashMap<String, Box<dyn Agent>>,
    default_agent: String,
    channel_map: HashMap<String, String>,
    enabled_agents: HashSet<String>,
}

impl AgentsSubsystem {
    pub fn new(
        config: AgentsConfig,
        bot_name: impl Into<String>,
        tools: Vec<ToolSpec>,
        bus: BusHandle,
        clock: Arc<dyn Clock>,
    ) -> Self {
        // Default falls back to "echo" if config omits the default entirely.
        let default_agent = if config.default_agent.is_empty() {
            "echo".to_string()
        } else {
            config.default_agent
        };

        // Uses agent.id() as the HashMap key so the trait method is the
        // single source of truth for each agent's identity.
        let mut agents: HashMap<String, Box<dyn Agent>> = HashMap::new();
        for agent in [
            Box::new(EchoAgent) as Box<dyn Agent>,
            Box::new(nutrition::NutritionAgent::new()),
        ] {
            agents.insert(agent.id().to_string(), agent);
        }

        Self {
            state: Arc::new(AgentsState {
                bus,
                tools,
                prompts_dir: config.prompts_dir,
                bot_name: bot_name.into(),
                max_tool_rounds: config.max_tool_rounds,
                history_cap: config.history_cap,
                clock,
            }),
            agents,
            default_agent,
            channel_map: config.channel_map,
            enabled_agents: config.enabled,
        }
    }

    fn effective_enabled_agent_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = if self.enabled_agents.is_empty() {
            self.agents.keys().cloned().collect()
        } else {
            self.enabled_agents
                .iter()
                .filter(|id| self.agents.contains_key(id.as_str()))
                .cloned()
                .collect()
        };
        ids.sort();
        ids
    }

    fn is_enabled(&self, agent_id: &str) -> bool {
        self.agents.contains_key(agent_id)
            && (self.enabled_agents.is_empty() || self.enabled_agents.contains(agent_id))
    }

    fn resolve_agent<'a>(&'a self, method_agent_id: Option<&'a str>, channel_id: &str) -> Result<&'a str, BusError> {
        if let Some(agent_id) = method_agent_id {
            return if self.is_enabled(agent_id) {
                Ok(agent_id)
            } else {
                Err(BusError::new(
                    ERR_METHOD_NOT_FOUND,
                    format!("agent not found: {agent_id}"),
                ))
            };
        }

        if let Some(mapped) = self.channel_map.get(channel_id) {
            if self.is_enabled(mapped) {
                return Ok(mapped.as_str());
            }
        }

        if self.is_enabled(&self.default_agent) {
            return Ok(self.default_agent.as_str());
        }

        Err(BusError::new(
            ERR_METHOD_NOT_FOUND,
            format!("default agent '{}' is not enabled", self.default_agent),
        ))
    }
}

impl BusHandler for AgentsSubsystem {
    fn prefix(&self) -> &str {
        "agents"
    }

    fn handle_request(&self, method: &str, payload: BusPayload, reply_tx: oneshot::Sender<BusResult>) {
        if method == "agents/list" {
            let body = serde_json::json!({
                "agents": self.effective_enabled_agent_ids(),
                "default": self.default_agent,
            });
            let _ = reply_tx.send(Ok(BusPayload::JsonResponse { data: body.to_string() }));
            return;
        }

        let (method_agent_id, action) = match parse_method(method) {
            Ok(parsed) => parsed,
            Err(e) => {
                let _ = reply_tx.send(Err(e));
                return;
            }
        };

        let BusPayload::CommsMessage { channel_id, user_id, content } = payload else {
            let _ = reply_tx.send(Err(BusError::new(
                ERR_INVALID_PARAMS,
                format!("unsupported payload for method: {method}"),
            )));
            return;
        };

        let agent_id = match self.resolve_agent(method_agent_id, &channel_id) {
            Ok(id) => id,
            Err(e) => {
                let _ = reply_tx.send(Err(e));
                return;
            }
        };

        match self.agents.get(agent_id) {
            Some(agent) => {
                debug!(agent_id, %channel_id, %user_id, %action, "dispatching to agent");
                agent.handle(action.to_string(), channel_id, user_id, content, reply_tx, self.state.clone());
            }
            None => {
                let _ = reply_tx.send(Err(BusError::new(
                    ERR_METHOD_NOT_FOUND,
                    format!("agent not found: {agent_id}"),
                )));
            }
        }
    }
}

fn parse_method(method: &str) -> Result<(Option<&str>, &str), BusError> {
    let parts: Vec<&str> = method.split('/').collect();

    if parts.is_empty() || parts[0] != "agents" {
        return Err(BusError::new(
            ERR_METHOD_NOT_FOUND,
            format!("method not found: {method}"),
        ));
    }

    match parts.len() {
        1 => Ok((None, "handle")),
        2 => Ok((Some(parts[1]), "handle")),
        3 => Ok((Some(parts[1]), parts[2])),
        _ => Err(BusError::new(
            ERR_METHOD_NOT_FOUND,
            format!("method not found: {method}"),
        )),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::harness;
    use super::*;

    #[tokio::test]
    async fn echo_agent_returns_input() {
        let h = harness("echo");
        assert_eq!(h.send("u1", "hello").await, "hello");
    }

    #[tokio::test]
    async fn explicit_unknown_agent_errors() {
        let h = harness("echo");
        let res = h
            .bus
            .request(
                "agents/unknown",
                BusPayload::CommsMessage { channel_id: "c".into(), user_id: "u".into(), content: "hi".into() },
            )
            .await
            .unwrap();
        assert_eq!(res.unwrap_err().code, ERR_METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn list_reports_enabled_agents() {
        let h = harness("echo");
        let res = h.bus.request("agents/list", BusPayload::JsonResponse { data: String::new() }).await.unwrap();
        let Ok(BusPayload::JsonResponse { data }) = res else {
            panic!("expected JsonResponse");
        };
        let v: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(v["agents"], serde_json::json!(["echo", "nutrition"]));
    }

    #[tokio::test]
    async fn non_message_payload_rejected() {
        let h = harness("echo");
        let res = h.bus.request("agents", BusPayload::JsonResponse { data: String::new() }).await.unwrap();
        assert_eq!(res.unwrap_err().code, ERR_INVALID_PARAMS);
    }

    #[test]
    fn parse_method_grammar() {
        assert_eq!(parse_method("agents").unwrap(), (None, "handle"));
        assert_eq!(parse_method("agents/nutrition").unwrap(), (Some("nutrition"), "handle"));
        assert_eq!(parse_method("agents/nutrition/reset").unwrap(), (Some("nutrition"), "reset"));
        assert!(parse_method("agents/a/b/c").is_err());
        assert!(parse_method("tools").is_err());
    }

    #[test]
    fn tool_reply_message_falls_back_to_raw() {
        let reply = ToolReply { ok: true, data_json: r#"{"status":"success","message":"Saved."}"#.into() };
        assert_eq!(reply.message(), "Saved.");
        let raw = ToolReply { ok: false, data_json: "oops".into() };
        assert_eq!(raw.message(), "oops");
    }
}
