//! Supervisor dispatch — the trait every bus-facing subsystem implements.
//!
//! Method strings have the form `"prefix/rest..."`.  The supervisor looks up
//! the first `/`-delimited segment and passes the whole method to the
//! matching handler, which does its own secondary routing (`tools/execute`,
//! `tools/list`, `agents/{id}`, `llm/chat`).

use tokio::sync::oneshot;

use crate::supervisor::bus::{BusPayload, BusResult};

/// A subsystem that answers bus requests under one method prefix.
pub trait BusHandler: Send + Sync {
    /// The method prefix this handler owns (e.g. `"agents"`, `"tools"`).
    ///
    /// Must be unique across registered handlers.
    fn prefix(&self) -> &str;

    /// Handle an incoming request, taking ownership of `reply_tx`.
    ///
    /// Implementations **must not block** the supervisor loop: either resolve
    /// `reply_tx` immediately or move it into a spawned task.
    fn handle_request(&self, method: &str, payload: BusPayload, reply_tx: oneshot::Sender<BusResult>);
}
