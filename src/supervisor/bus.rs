//! Supervisor event bus — one request channel shared by every subsystem.
//!
//! Callers hold a cloneable [`BusHandle`] and issue JSON-RPC-flavoured
//! requests (`method` + typed [`BusPayload`]).  The supervisor owns the
//! receiving end and routes each request by its method prefix.  Replies come
//! back on a per-request `oneshot` channel.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;
use uuid::Uuid;

use crate::llm::{ChatMessage, LlmTurn, ToolSpec};

// ── Error codes ───────────────────────────────────────────────────────────────

/// No handler (or no sub-route) for the requested method.
pub const ERR_METHOD_NOT_FOUND: i32 = -32601;
/// The payload variant or its contents do not fit the method.
pub const ERR_INVALID_PARAMS: i32 = -32602;
/// A handler failed while serving the request.
pub const ERR_INTERNAL: i32 = -32000;

/// Error half of a bus reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bus error {code}: {message}")]
pub struct BusError {
    pub code: i32,
    pub message: String,
}

impl BusError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// Transport failure — the request never reached a handler or the handler
/// dropped its reply slot.
#[derive(Debug, Error)]
pub enum BusCallError {
    #[error("supervisor bus is closed")]
    Send,
    #[error("reply channel dropped before a response was sent")]
    Recv,
}

pub type BusResult = Result<BusPayload, BusError>;

// ── Payloads ──────────────────────────────────────────────────────────────────

/// Typed request and reply bodies carried on the bus.
#[derive(Debug, Clone)]
pub enum BusPayload {
    /// A chat message from (or reply to) a comms channel.
    CommsMessage {
        channel_id: String,
        user_id: String,
        content: String,
    },
    /// One chat-completion round for the LLM subsystem.
    LlmChat {
        messages: Vec<ChatMessage>,
        tools: Vec<ToolSpec>,
    },
    /// The LLM's answer to an [`BusPayload::LlmChat`] request.
    LlmTurn(LlmTurn),
    /// Run a named tool with JSON arguments on behalf of `user_id`.
    ToolRequest {
        tool: String,
        args_json: String,
        user_id: String,
    },
    /// Structured tool result.  `data_json` is the serialised outcome.
    ToolResponse {
        tool: String,
        ok: bool,
        data_json: String,
    },
    /// Free-form JSON body (listings, status).
    JsonResponse { data: String },
}

/// A request travelling to the supervisor.
pub enum BusMessage {
    Request {
        id: Uuid,
        method: String,
        payload: BusPayload,
        reply_tx: oneshot::Sender<BusResult>,
    },
}

// ── Handles ───────────────────────────────────────────────────────────────────

/// Cloneable sender side of the bus.
#[derive(Clone)]
pub struct BusHandle {
    tx: mpsc::Sender<BusMessage>,
}

impl BusHandle {
    /// Send a request and wait for its reply.
    ///
    /// The outer `Result` reports transport failure; the inner [`BusResult`]
    /// is whatever the handler answered.
    pub async fn request(
        &self,
        method: impl Into<String>,
        payload: BusPayload,
    ) -> Result<BusResult, BusCallError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let id = Uuid::now_v7();
        let method = method.into();
        trace!(%id, %method, "bus request");
        self.tx
            .send(BusMessage::Request { id, method, payload, reply_tx })
            .await
            .map_err(|_| BusCallError::Send)?;
        reply_rx.await.map_err(|_| BusCallError::Recv)
    }
}

/// Owns the supervisor-side receiver plus a template handle for cloning.
pub struct SupervisorBus {
    pub rx: mpsc::Receiver<BusMessage>,
    pub handle: BusHandle,
}

impl SupervisorBus {
    pub fn new(buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer);
        Self { rx, handle: BusHandle { tx } }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_roundtrip_through_receiver() {
        let mut bus = SupervisorBus::new(4);
        let handle = bus.handle.clone();

        tokio::spawn(async move {
            if let Some(BusMessage::Request { method, reply_tx, .. }) = bus.rx.recv().await {
                assert_eq!(method, "tools/execute");
                let _ = reply_tx.send(Ok(BusPayload::JsonResponse { data: "{}".into() }));
            }
        });

        let reply = handle
            .request("tools/execute", BusPayload::JsonResponse { data: String::new() })
            .await
            .unwrap();
        assert!(matches!(reply, Ok(BusPayload::JsonResponse { .. })));
    }

    #[tokio::test]
    async fn closed_bus_reports_send_error() {
        let bus = SupervisorBus::new(1);
        let handle = bus.handle.clone();
        drop(bus);
        let err = handle
            .request("llm/chat", BusPayload::JsonResponse { data: String::new() })
            .await
            .unwrap_err();
        assert!(matches!(err, BusCallError::Send));
    }

    #[tokio::test]
    async fn dropped_reply_reports_recv_error() {
        let mut bus = SupervisorBus::new(1);
        let handle = bus.handle.clone();
        tokio::spawn(async move {
            // Receive and drop the reply sender without answering.
            let _ = bus.rx.recv().await;
        });
        let err = handle
            .request("agents", BusPayload::JsonResponse { data: String::new() })
            .await
            .unwrap_err();
        assert!(matches!(err, BusCallError::Recv));
    }

    #[test]
    fn bus_error_display_has_code() {
        let e = BusError::new(ERR_METHOD_NOT_FOUND, "method not found: x");
        assert_eq!(e.to_string(), "bus error -32601: method not found: x");
    }
}
