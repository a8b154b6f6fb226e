//! Tools subsystem: the nutrition CRUD tools behind the `tools/` bus prefix.
//!
//! Methods:
//! - `tools/execute`: `ToolRequest { tool, args_json, user_id }` → `ToolResponse`
//! - `tools/list`: → `JsonResponse` with the tool schemas
//!
//! Each tool call runs on the blocking pool; store I/O never touches the
//! supervisor loop.

mod args;
pub mod duplicate;
mod goals;
mod meals;
mod memory;
pub mod outcome;
pub mod registry;
mod weight;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::config::NutritionConfig;
use crate::subsystems::storage::{Clock, NutritionStore};
use crate::supervisor::bus::{
    BusError, BusPayload, BusResult, ERR_INTERNAL, ERR_INVALID_PARAMS, ERR_METHOD_NOT_FOUND,
};
use crate::supervisor::dispatch::BusHandler;

pub use goals::{Progress, ProgressStatus, progress};
pub use outcome::{ErrorKind, ToolError, ToolOutcome, ToolStatus};
pub use weight::{Insight, WeightStats};

use args::Args;

/// The tool implementations over one store.
pub struct NutritionTools {
    store: Arc<dyn NutritionStore>,
    clock: Arc<dyn Clock>,
    settings: NutritionConfig,
}

impl NutritionTools {
    pub fn new(store: Arc<dyn NutritionStore>, clock: Arc<dyn Clock>, settings: NutritionConfig) -> Self {
        Self { store, clock, settings }
    }

    /// Run `tool` for `user_id`. Never panics; failures become error outcomes.
    pub fn execute(&self, tool: &str, user_id: &str, args: &Value) -> ToolOutcome {
        let result = Args::new(args).and_then(|args| self.dispatch(tool, user_id, &args));
        match result {
            Ok(outcome) => {
                debug!(tool, user_id, status = ?outcome.status, "tools: executed");
                outcome
            }
            Err(e) => {
                warn!(tool, user_id, kind = ?e.kind(), error = %e, "tools: failed");
                e.into()
            }
        }
    }

    fn dispatch(&self, tool: &str, user_id: &str, args: &Args) -> Result<ToolOutcome, ToolError> {
        match tool {
            "save_meal" => self.save_meal(user_id, args),
            "get_today_meals" => self.get_today_meals(user_id),
            "get_meals_by_date" => self.get_meals_by_date(user_id, args),
            "get_week_meals" => self.get_week_meals(user_id),
            "edit_meal" => self.edit_meal(user_id, args),
            "delete_meal" => self.delete_meal(user_id, args),
            "delete_last_meal" => self.delete_meal(user_id, &Args::new(&Value::Null)?),
            "get_user_goals" => self.get_user_goals(user_id),
            "update_user_goals" => self.update_user_goals(user_id, args),
            "get_daily_progress" => self.get_daily_progress(user_id, args),
            "calculate_daily_totals" => self.calculate_daily_totals(args),
            "save_weight" => self.save_weight(user_id, args),
            "get_weight_history" => self.get_weight_history(user_id, args),
            "delete_weight" => self.delete_weight(user_id, args),
            "get_weight_nutrition_analysis" => self.get_weight_nutrition_analysis(user_id, args),
            "store_memory" => self.store_memory(user_id, args),
            "recall_memories" => self.recall_memories(user_id, args),
            "forget_memory" => self.forget_memory(user_id, args),
            other => Err(ToolError::Validation(format!("unknown tool '{other}'"))),
        }
    }
}

// ── Bus handler ───────────────────────────────────────────────────────────────

pub struct ToolsSubsystem {
    tools: Arc<NutritionTools>,
}

impl ToolsSubsystem {
    pub fn new(tools: NutritionTools) -> Self {
        Self { tools: Arc::new(tools) }
    }
}

impl BusHandler for ToolsSubsystem {
    fn prefix(&self) -> &str {
        "tools"
    }

    fn handle_request(&self, method: &str, payload: BusPayload, reply_tx: oneshot::Sender<BusResult>) {
        match method {
            "tools/list" => {
                let reply = serde_json::to_string(&registry::specs())
                    .map(|data| BusPayload::JsonResponse { data })
                    .map_err(|e| BusError::new(ERR_INTERNAL, format!("serialize tool list: {e}")));
                let _ = reply_tx.send(reply);
            }
            "tools/execute" => {
                let BusPayload::ToolRequest { tool, args_json, user_id } = payload else {
                    let _ = reply_tx.send(Err(BusError::new(ERR_INVALID_PARAMS, "expected ToolRequest payload")));
                    return;
                };
                let args: Value = if args_json.trim().is_empty() {
                    Value::Null
                } else {
                    match serde_json::from_str(&args_json) {
                        Ok(v) => v,
                        Err(e) => {
                            // Reported to the model as a failed tool call, not a bus error.
                            let outcome: ToolOutcome =
                                ToolError::Validation(format!("arguments are not valid JSON: {e}")).into();
                            let _ = reply_tx.send(Ok(BusPayload::ToolResponse {
                                tool,
                                ok: false,
                                data_json: outcome.to_json(),
                            }));
                            return;
                        }
                    }
                };

                let tools = self.tools.clone();
                tokio::spawn(async move {
                    let name = tool.clone();
                    let result = tokio::task::spawn_blocking(move || tools.execute(&name, &user_id, &args)).await;
                    let reply = match result {
                        Ok(outcome) => Ok(BusPayload::ToolResponse {
                            tool,
                            ok: outcome.is_ok(),
                            data_json: outcome.to_json(),
                        }),
                        Err(e) => Err(BusError::new(ERR_INTERNAL, format!("tool '{tool}' panicked: {e}"))),
                    };
                    let _ = reply_tx.send(reply);
                });
            }
            _ => {
                let _ = reply_tx.send(Err(BusError::new(
                    ERR_METHOD_NOT_FOUND,
                    format!("method not found: {method}"),
                )));
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::testing::tools_at;
    use super::*;

    fn subsystem() -> (tempfile::TempDir, ToolsSubsystem) {
        let (dir, tools, _clock) = tools_at("2026-10-16 12:00:00");
        (dir, ToolsSubsystem::new(tools))
    }

    async fn call(sub: &ToolsSubsystem, method: &str, payload: BusPayload) -> BusResult {
        let (tx, rx) = oneshot::channel();
        sub.handle_request(method, payload, tx);
        rx.await.unwrap()
    }

    #[test]
    fn unknown_tool_is_validation_error() {
        let (_dir, tools, _clock) = tools_at("2026-10-16 12:00:00");
        let out = tools.execute("order_pizza", "u1", &json!({}));
        assert_eq!(out.kind, Some(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn execute_runs_tool_and_reports_outcome() {
        let (_dir, sub) = subsystem();
        let reply = call(
            &sub,
            "tools/execute",
            BusPayload::ToolRequest {
                tool: "save_meal".into(),
                args_json: json!({ "description": "apple", "calories": 95, "protein": 0.5, "fat": 0.3, "carbs": 25 }).to_string(),
                user_id: "u1".into(),
            },
        )
        .await
        .unwrap();
        let BusPayload::ToolResponse { tool, ok, data_json } = reply else {
            panic!("expected ToolResponse");
        };
        assert_eq!(tool, "save_meal");
        assert!(ok);
        let v: Value = serde_json::from_str(&data_json).unwrap();
        assert_eq!(v["status"], "success");
        assert_eq!(v["data"]["meal"]["user_id"], "u1");
    }

    #[tokio::test]
    async fn malformed_arguments_become_failed_response() {
        let (_dir, sub) = subsystem();
        let reply = call(
            &sub,
            "tools/execute",
            BusPayload::ToolRequest { tool: "save_meal".into(), args_json: "{oops".into(), user_id: "u1".into() },
        )
        .await
        .unwrap();
        assert!(matches!(reply, BusPayload::ToolResponse { ok: false, .. }));
    }

    #[tokio::test]
    async fn list_returns_all_schemas() {
        let (_dir, sub) = subsystem();
        let reply = call(&sub, "tools/list", BusPayload::JsonResponse { data: String::new() }).await.unwrap();
        let BusPayload::JsonResponse { data } = reply else {
            panic!("expected JsonResponse");
        };
        let v: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(v.as_array().unwrap().len(), registry::TOOL_NAMES.len());
    }

    #[tokio::test]
    async fn wrong_payload_and_method_rejected() {
        let (_dir, sub) = subsystem();
        let err = call(&sub, "tools/execute", BusPayload::JsonResponse { data: String::new() }).await.unwrap_err();
        assert_eq!(err.code, ERR_INVALID_PARAMS);
        let err = call(&sub, "tools/explode", BusPayload::JsonResponse { data: String::new() }).await.unwrap_err();
        assert_eq!(err.code, ERR_METHOD_NOT_FOUND);
    }
}
