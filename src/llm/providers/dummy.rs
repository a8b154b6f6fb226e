//! Dummy LLM provider — echoes the last user message back prefixed with `[echo]`.
//! Never requests tools.  Used to exercise the full bus round-trip without an
//! API key.

use crate::llm::{ChatMessage, LlmTurn, ProviderError, ToolSpec};

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn chat(&self, messages: &[ChatMessage], _tools: &[ToolSpec]) -> Result<LlmTurn, ProviderError> {
        let last_user = messages
            .iter()
            .rev()
            .find_map(|m| match m {
                ChatMessage::User(text) => Some(text.as_str()),
                _ => None,
            })
            .unwrap_or_default();
        Ok(LlmTurn {
            text: Some(format!("[echo] {last_user}")),
            tool_calls: Vec::new(),
            usage: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_last_user_message() {
        let messages = vec![
            ChatMessage::System("be brief".into()),
            ChatMessage::User("first".into()),
            ChatMessage::Assistant { content: Some("ok".into()), tool_calls: vec![] },
            ChatMessage::User("second".into()),
        ];
        let turn = DummyProvider.chat(&messages, &[]).await.unwrap();
        assert_eq!(turn.text.as_deref(), Some("[echo] second"));
        assert!(turn.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn empty_transcript_echoes_nothing() {
        let turn = DummyProvider.chat(&[], &[]).await.unwrap();
        assert_eq!(turn.text.as_deref(), Some("[echo] "));
        assert!(turn.usage.is_none());
    }
}
