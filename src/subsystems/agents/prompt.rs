//! Layered prompt builder for the coordinator agent.
//!
//! The system prompt is assembled from a stack of plain-text template
//! fragments stored under `config/prompts/`.  Each layer is appended in
//! order; missing files are silently skipped so layers can be optional.
//!
//! ## Layer ordering convention
//!
//! ```text
//! 0. persona.md       — who the bot is and how it talks
//! 1. coordinator.md   — how requests are routed to the roles below
//! 2. food_analyst.md  — estimating calories and macros from descriptions
//! 3. coach.md         — progress, goals, weight trend interpretation
//! 4. data_manager.md  — when and how to call the CRUD tools
//! 5. tools.md         — tool catalogue; {{tools}} placeholder
//! ```
//!
//! Variable substitution uses `{{key}}` syntax and is applied once at
//! [`build()`](PromptBuilder::build) time, after all layers are joined.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::llm::ToolSpec;

const SEPARATOR: &str = "\n\n";

/// Used when no layer file could be loaded at all.
const FALLBACK_PROMPT: &str = "You are {{bot_name}}, a friendly nutrition assistant. \
Today is {{today}} and you are talking to user {{user_id}}. Record the meals, weight and preferences the user reports \
with the available tools and answer questions about their progress. \
Estimate calories, protein, fat and carbs when the user does not give them.";

/// Fluent builder that assembles a layered prompt from template files.
pub struct PromptBuilder {
    prompts_dir: PathBuf,
    parts: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    /// Create a builder rooted at `prompts_dir` (e.g. `"config/prompts"`).
    pub fn new(prompts_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompts_dir: prompts_dir.into(),
            parts: Vec::new(),
            vars: HashMap::new(),
        }
    }

    /// Append a layer by loading `filename` from the prompts directory.
    /// Silently skips the layer when the file does not exist.
    pub fn layer(mut self, filename: &str) -> Self {
        let path = self.prompts_dir.join(filename);
        match fs::read_to_string(&path) {
            Ok(text) => {
                let trimmed = text.trim().to_string();
                if !trimmed.is_empty() {
                    self.parts.push(trimmed);
                }
            }
            Err(_) => {
                tracing::debug!("prompt: layer '{}' not found — skipped", path.display());
            }
        }
        self
    }

    /// Load `tools.md` and substitute `{{tools}}` with one `- name: description`
    /// line per tool.  Falls back to an inline sentence if the file is missing.
    pub fn with_tools(mut self, tools: &[ToolSpec]) -> Self {
        let tools_str = if tools.is_empty() {
            "none".to_string()
        } else {
            tools
                .iter()
                .map(|t| format!("- {}: {}", t.name, t.description))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let path = self.prompts_dir.join("tools.md");
        let text = fs::read_to_string(&path)
            .unwrap_or_else(|_| "You have access to the following tools:\n{{tools}}".to_string());
        let rendered = text.trim().replace("{{tools}}", &tools_str);
        if !rendered.is_empty() {
            self.parts.push(rendered);
        }
        self
    }

    /// Directly append a text fragment.
    pub fn append(mut self, text: impl Into<String>) -> Self {
        let s = text.into();
        let trimmed = s.trim().to_string();
        if !trimmed.is_empty() {
            self.parts.push(trimmed);
        }
        self
    }

    /// Register `{{key}}` → `value` substitution pairs applied at build time.
    pub fn with_vars<'a, I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (k, v) in vars {
            self.vars.insert(k.to_string(), v.to_string());
        }
        self
    }

    /// Register a single variable.
    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    /// True when no layer or fragment has been added yet.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Assemble all layers, join with blank lines, and apply variable substitution.
    pub fn build(self) -> String {
        let mut prompt = self.parts.join(SEPARATOR);
        for (k, v) in &self.vars {
            let placeholder = format!("{{{{{}}}}}", k);
            prompt = prompt.replace(&placeholder, v);
        }
        prompt
    }
}

/// The coordinator's system prompt: persona, the three roles, data rules and
/// the tool catalogue, with `bot_name`, `user_id` and `today` substituted.
pub fn coordinator_prompt(
    prompts_dir: impl AsRef<Path>,
    tools: &[ToolSpec],
    bot_name: &str,
    user_id: &str,
    today: &str,
) -> String {
    let builder = PromptBuilder::new(prompts_dir.as_ref())
        .layer("persona.md")
        .layer("coordinator.md")
        .layer("food_analyst.md")
        .layer("coach.md")
        .layer("data_manager.md");
    let builder = if builder.is_empty() {
        builder.append(FALLBACK_PROMPT)
    } else {
        builder
    };
    builder
        .with_tools(tools)
        .with_vars([("bot_name", bot_name), ("user_id", user_id), ("today", today)])
        .build()
}
