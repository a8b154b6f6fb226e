//! LLM subsystem — routes `llm/*` bus requests to the configured provider.
//!
//! Implements [`BusHandler`] with prefix `"llm"` so the supervisor can
//! register it generically.  Each request is resolved in a spawned task;
//! the supervisor loop is never blocked on I/O.

use tokio::sync::oneshot;
use tracing::debug;

use crate::config::LlmConfig;
use crate::llm::providers;
use crate::llm::{LlmProvider, ProviderError};
use crate::supervisor::bus::{
    BusError, BusPayload, BusResult, ERR_INTERNAL, ERR_INVALID_PARAMS, ERR_METHOD_NOT_FOUND,
};
use crate::supervisor::dispatch::BusHandler;

pub struct LlmSubsystem {
    provider: LlmProvider,
}

impl LlmSubsystem {
    /// Construct the subsystem. `api_key` comes from `LLM_API_KEY` env — never TOML.
    pub fn new(config: &LlmConfig, api_key: Option<String>) -> Result<Self, ProviderError> {
        Ok(Self { provider: providers::build(config, api_key)? })
    }
}

impl BusHandler for LlmSubsystem {
    fn prefix(&self) -> &str {
        "llm"
    }

    /// Route an `llm/*` request. Ownership of `reply_tx` is moved into a
    /// spawned task — the supervisor loop returns immediately.
    fn handle_request(&self, method: &str, payload: BusPayload, reply_tx: oneshot::Sender<BusResult>) {
        if method != "llm/chat" {
            let _ = reply_tx.send(Err(BusError::new(
                ERR_METHOD_NOT_FOUND,
                format!("method not found: {method}"),
            )));
            return;
        }
        let BusPayload::LlmChat { messages, tools } = payload else {
            let _ = reply_tx.send(Err(BusError::new(ERR_INVALID_PARAMS, "expected LlmChat payload")));
            return;
        };

        let provider = self.provider.clone();
        debug!(provider = provider.name(), messages = messages.len(), tools = tools.len(), "dispatching to llm provider");
        tokio::spawn(async move {
            let result = provider
                .chat(&messages, &tools)
                .await
                .map(|turn| {
                    if let Some(u) = &turn.usage {
                        debug!(
                            input_tokens = u.input_tokens,
                            output_tokens = u.output_tokens,
                            tool_calls = turn.tool_calls.len(),
                            "llm usage"
                        );
                    }
                    BusPayload::LlmTurn(turn)
                })
                .map_err(|e| BusError::new(ERR_INTERNAL, e.to_string()));
            let _ = reply_tx.send(result);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    fn dummy() -> LlmSubsystem {
        let dir = tempfile::tempdir().unwrap();
        let config = crate::config::Config::test_default(dir.path());
        LlmSubsystem::new(&config.llm, None).unwrap()
    }

    async fn call(sub: &LlmSubsystem, method: &str, payload: BusPayload) -> BusResult {
        let (tx, rx) = oneshot::channel();
        sub.handle_request(method, payload, tx);
        rx.await.unwrap()
    }

    #[tokio::test]
    async fn chat_returns_turn() {
        let sub = dummy();
        let reply = call(
            &sub,
            "llm/chat",
            BusPayload::LlmChat { messages: vec![ChatMessage::User("hello".into())], tools: vec![] },
        )
        .await
        .unwrap();
        let BusPayload::LlmTurn(turn) = reply else {
            panic!("expected LlmTurn");
        };
        assert_eq!(turn.text.as_deref(), Some("[echo] hello"));
    }

    #[tokio::test]
    async fn unknown_method_and_payload_rejected() {
        let sub = dummy();
        let err = call(&sub, "llm/complete", BusPayload::JsonResponse { data: String::new() })
            .await
            .unwrap_err();
        assert_eq!(err.code, ERR_METHOD_NOT_FOUND);
        let err = call(&sub, "llm/chat", BusPayload::JsonResponse { data: String::new() })
            .await
            .unwrap_err();
        assert_eq!(err.code, ERR_INVALID_PARAMS);
    }
}
