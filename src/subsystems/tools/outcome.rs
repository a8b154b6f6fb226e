//! Structured tool results and the tool error taxonomy.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::subsystems::storage::StoreError;

/// Outcome category reported back to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Updated,
    /// The duplicate-meal guard refused to save.
    DuplicatePrevented,
    /// The memory item was already stored.
    Exists,
    Error,
}

/// Why a tool failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Validation,
    Storage,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::NotFound(_) => ErrorKind::NotFound,
            ToolError::Validation(_) => ErrorKind::Validation,
            ToolError::Storage(_) => ErrorKind::Storage,
        }
    }
}

/// What every tool returns: status, a human-readable message and a payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutcome {
    pub status: ToolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    pub message: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl ToolOutcome {
    pub fn new(status: ToolStatus, message: impl Into<String>, data: Value) -> Self {
        Self { status, kind: None, message: message.into(), data }
    }

    pub fn success(message: impl Into<String>, data: Value) -> Self {
        Self::new(ToolStatus::Success, message, data)
    }

    pub fn updated(message: impl Into<String>, data: Value) -> Self {
        Self::new(ToolStatus::Updated, message, data)
    }

    pub fn is_ok(&self) -> bool {
        self.status != ToolStatus::Error
    }

    /// Serialised form sent over the bus and fed back to the model.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"status":"error","kind":"storage","message":"serialize: {e}"}}"#))
    }
}

impl From<ToolError> for ToolOutcome {
    fn from(e: ToolError) -> Self {
        Self {
            status: ToolStatus::Error,
            kind: Some(e.kind()),
            message: e.to_string(),
            data: Value::Null,
        }
    }
}
