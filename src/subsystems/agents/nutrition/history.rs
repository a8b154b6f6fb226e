//! Per-user conversation history.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::llm::ChatMessage;

pub(super) type History = Arc<tokio::sync::Mutex<Vec<ChatMessage>>>;

/// One transcript per user.  The async mutex around each transcript
/// serialises turns of the same user while different users run concurrently.
#[derive(Default)]
pub(super) struct Histories {
    inner: Mutex<HashMap<String, History>>,
}

impl Histories {
    pub fn for_user(&self, user_id: &str) -> History {
        let mut map = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.entry(user_id.to_string()).or_default().clone()
    }
}

/// Keep about `cap` messages, dropping from the front until the kept
/// transcript starts at a user message so no tool result loses its call.
/// A single turn longer than `cap` is kept whole from its user message.
pub(super) fn trim(history: &mut Vec<ChatMessage>, cap: usize) {
    if history.len() <= cap {
        return;
    }
    if cap == 0 {
        history.clear();
        return;
    }
    let is_user = |m: &ChatMessage| matches!(m, ChatMessage::User(_));
    let from = history.len() - cap;
    let start = history[from..]
        .iter()
        .position(is_user)
        .map(|i| from + i)
        .or_else(|| history[..from].iter().rposition(is_user))
        .unwrap_or(history.len());
    history.drain(..start);
}
