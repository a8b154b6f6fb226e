//! Memory bank tools: durable facts about the user (allergies, preferences).

use std::collections::BTreeMap;

use serde_json::{Value, json};
use tracing::info;

use super::args::Args;
use super::duplicate::normalize;
use super::outcome::{ToolError, ToolOutcome, ToolStatus};
use super::NutritionTools;
use crate::subsystems::storage::types::{MemoryItem, MemoryType, NewMemory};

impl NutritionTools {
    pub(super) fn store_memory(&self, user_id: &str, args: &Args) -> Result<ToolOutcome, ToolError> {
        let memory_type = args
            .opt_enum::<MemoryType>("memory_type")?
            .ok_or_else(|| ToolError::Validation("missing required argument 'memory_type'".into()))?;
        let content = args.str("content")?;
        let metadata = metadata_text(args);

        let key = normalize(&content);
        if let Some(existing) = self
            .store
            .memories(user_id, None)?
            .into_iter()
            .find(|m| normalize(&m.content) == key)
        {
            return Ok(ToolOutcome::new(
                ToolStatus::Exists,
                format!("Already remembered: {} ({}).", existing.content, existing.memory_type),
                json!({ "memory": existing }),
            ));
        }

        let item = self.store.insert_memory(NewMemory {
            user_id: user_id.to_string(),
            memory_type,
            content,
            metadata,
            created_at: self.clock.timestamp(),
        })?;
        info!(user_id, memory_id = item.id, memory_type = %item.memory_type, "tools: memory stored");
        Ok(ToolOutcome::success(
            format!("Remembered {}: {}.", item.memory_type, item.content),
            json!({ "memory": item }),
        ))
    }

    pub(super) fn recall_memories(&self, user_id: &str, args: &Args) -> Result<ToolOutcome, ToolError> {
        let memory_type = args.opt_enum::<MemoryType>("memory_type")?;
        let items = self.store.memories(user_id, memory_type)?;
        if items.is_empty() {
            return Ok(ToolOutcome::success(
                "Nothing remembered yet.",
                json!({ "count": 0, "memories": {} }),
            ));
        }

        let mut grouped: BTreeMap<&str, Vec<&MemoryItem>> = BTreeMap::new();
        for item in &items {
            grouped.entry(item.memory_type.as_str()).or_default().push(item);
        }
        let summary = grouped
            .iter()
            .map(|(kind, items)| {
                let contents: Vec<&str> = items.iter().map(|m| m.content.as_str()).collect();
                format!("{kind}: {}", contents.join("; "))
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(ToolOutcome::success(
            summary,
            json!({ "count": items.len(), "memories": grouped }),
        ))
    }

    pub(super) fn forget_memory(&self, user_id: &str, args: &Args) -> Result<ToolOutcome, ToolError> {
        let needle = args.str("content_substring")?;
        let removed = self.store.delete_memories_containing(user_id, &needle)?;
        if removed == 0 {
            return Err(ToolError::NotFound(format!("no memory mentions '{needle}'")));
        }
        info!(user_id, removed, "tools: memories forgotten");
        Ok(ToolOutcome::success(
            format!("Forgot {removed} item(s) mentioning '{needle}'."),
            json!({ "removed": removed }),
        ))
    }
}

/// `metadata` may be free text or a JSON object; stored as text.
fn metadata_text(args: &Args) -> Option<String> {
    match args.raw("metadata")? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::super::outcome::{ErrorKind, ToolStatus};
    use super::super::testing::tools_at;
    use super::*;

    #[test]
    fn same_content_reports_exists() {
        let (_dir, tools, _clock) = tools_at("2026-10-16 12:00:00");
        let args = json!({ "memory_type": "allergy", "content": "Peanuts" });
        assert_eq!(tools.execute("store_memory", "u1", &args).status, ToolStatus::Success);
        let again = tools.execute("store_memory", "u1", &json!({ "memory_type": "allergy", "content": " peanuts " }));
        assert_eq!(again.status, ToolStatus::Exists);
        assert_eq!(tools.store.memories("u1", None).unwrap().len(), 1);
    }

    #[test]
    fn recall_groups_by_type() {
        let (_dir, tools, _clock) = tools_at("2026-10-16 12:00:00");
        tools.execute("store_memory", "u1", &json!({ "memory_type": "allergy", "content": "shellfish" }));
        tools.execute("store_memory", "u1", &json!({ "memory_type": "preference", "content": "no cilantro", "metadata": { "strength": "strong" } }));
        tools.execute("store_memory", "u2", &json!({ "memory_type": "fact", "content": "vegan" }));

        let all = tools.execute("recall_memories", "u1", &json!({}));
        assert_eq!(all.data["count"], 2);
        assert_eq!(all.data["memories"]["allergy"][0]["content"], "shellfish");
        assert_eq!(all.data["memories"]["preference"][0]["metadata"], r#"{"strength":"strong"}"#);
        assert!(all.message.contains("allergy: shellfish"));

        let only = tools.execute("recall_memories", "u1", &json!({ "memory_type": "preference" }));
        assert_eq!(only.data["count"], 1);
    }

    #[test]
    fn forget_removes_matching_items_only() {
        let (_dir, tools, _clock) = tools_at("2026-10-16 12:00:00");
        tools.execute("store_memory", "u1", &json!({ "memory_type": "habit", "content": "Coffee every morning" }));
        tools.execute("store_memory", "u1", &json!({ "memory_type": "habit", "content": "walks after dinner" }));

        let out = tools.execute("forget_memory", "u1", &json!({ "content_substring": "coffee" }));
        assert_eq!(out.data["removed"], 1);
        let missing = tools.execute("forget_memory", "u1", &json!({ "content_substring": "coffee" }));
        assert_eq!(missing.kind, Some(ErrorKind::NotFound));
        assert_eq!(tools.store.memories("u1", None).unwrap().len(), 1);
    }

    #[test]
    fn unknown_memory_type_rejected() {
        let (_dir, tools, _clock) = tools_at("2026-10-16 12:00:00");
        let out = tools.execute("store_memory", "u1", &json!({ "memory_type": "mood", "content": "x" }));
        assert_eq!(out.kind, Some(ErrorKind::Validation));
    }
}
