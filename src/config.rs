//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory (or
//! the path given with `-f`), then applies `NUTRI_WORK_DIR` and
//! `NUTRI_LOG_LEVEL` env overrides.  Secrets are never read from TOML.

use std::{
    collections::{HashMap, HashSet},
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// PTY (console) channel configuration.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Whether the PTY channel is explicitly enabled.
    pub enabled: bool,
    /// User id attributed to every console message.
    pub user_id: String,
}

/// How the Telegram channel receives updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelegramMode {
    Polling,
    Webhook,
}

/// Telegram channel configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Whether the Telegram channel is explicitly enabled.
    pub enabled: bool,
    pub mode: TelegramMode,
    /// Public base URL; `/webhook` is appended when registering with Telegram.
    /// `NUTRI_WEBHOOK_URL` overrides the TOML value.
    pub webhook_url: Option<String>,
    /// Socket address the webhook HTTP server binds to.
    pub webhook_bind: String,
}

/// Comms subsystem configuration.
#[derive(Debug, Clone)]
pub struct CommsConfig {
    pub pty: PtyConfig,
    pub telegram: TelegramConfig,
}

/// OpenAI / OpenAI-compatible provider configuration.
/// Populated from `[llm.openai]` in the TOML.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Model name passed in the request body.
    pub model: String,
    /// Sampling temperature (ignored for models that forbid it).
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// LLM subsystem configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (e.g. `"dummy"`, `"openai"`).
    /// Maps to `default` in `[llm]` TOML.
    pub provider: String,
    pub openai: OpenAiConfig,
}

/// Agents subsystem configuration.
#[derive(Debug, Clone)]
pub struct AgentsConfig {
    /// Agent that handles messages with no explicit routing.
    pub default_agent: String,
    /// channel_id -> agent_id overrides (from `[agents.routing]`).
    pub channel_map: HashMap<String, String>,
    /// Set of agent IDs whose config section has `enabled` != false.
    pub enabled: HashSet<String>,
    /// Upper bound on LLM ↔ tool round-trips for a single user message.
    pub max_tool_rounds: usize,
    /// Per-user conversation history cap (messages, excluding the system prompt).
    pub history_cap: usize,
    /// Directory holding the layered prompt templates.
    pub prompts_dir: PathBuf,
}

/// Which storage backend the tools run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    Sheets,
}

/// Google Sheets backend configuration (`[storage.sheets]`).
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub api_base_url: String,
    pub timeout_seconds: u64,
}

/// Storage subsystem configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// SQLite database file (already resolved against `work_dir`).
    pub db_path: PathBuf,
    pub sheets: SheetsConfig,
}

/// Daily targets applied when a user has not set goals yet.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultGoals {
    pub goal_type: String,
    pub daily_calories: f64,
    pub daily_protein: f64,
    pub daily_fat: f64,
    pub daily_carbs: f64,
}

impl Default for DefaultGoals {
    fn default() -> Self {
        Self {
            goal_type: "maintenance".to_string(),
            daily_calories: 2000.0,
            daily_protein: 150.0,
            daily_fat: 70.0,
            daily_carbs: 200.0,
        }
    }
}

/// Tool-layer tuning (`[nutrition]`).
#[derive(Debug, Clone)]
pub struct NutritionConfig {
    /// Duplicate-meal guard window in seconds.
    pub duplicate_window_secs: i64,
    pub default_goals: DefaultGoals,
}

impl Default for NutritionConfig {
    fn default() -> Self {
        Self {
            duplicate_window_secs: default_duplicate_window_minutes() * 60,
            default_goals: DefaultGoals::default(),
        }
    }
}

/// Fully-resolved supervisor configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    /// Working directory for all persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    /// Optional log file; stderr when absent.
    pub log_file: Option<PathBuf>,
    pub comms: CommsConfig,
    pub agents: AgentsConfig,
    pub llm: LlmConfig,
    /// API key from `LLM_API_KEY` env var — `None` for keyless local models.
    pub llm_api_key: Option<String>,
    pub storage: StorageConfig,
    /// Bearer token from `GOOGLE_SHEETS_ACCESS_TOKEN`.
    pub sheets_access_token: Option<String>,
    pub nutrition: NutritionConfig,
}

impl Config {
    /// Returns `true` if the PTY channel should be loaded.
    pub fn comms_pty_should_load(&self) -> bool {
        self.comms.pty.enabled
    }

    /// Returns `true` if the Telegram channel should be loaded.
    pub fn comms_telegram_should_load(&self) -> bool {
        self.comms.telegram.enabled
    }
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    supervisor: RawSupervisor,
    #[serde(default)]
    comms: RawComms,
    #[serde(default)]
    agents: RawAgents,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    storage: RawStorage,
    #[serde(default)]
    nutrition: RawNutrition,
}

#[derive(Deserialize)]
struct RawSupervisor {
    bot_name: String,
    work_dir: String,
    log_level: String,
    #[serde(default)]
    log_file: Option<String>,
}

#[derive(Deserialize, Default)]
struct RawComms {
    #[serde(default)]
    pty: RawPty,
    #[serde(default)]
    telegram: RawTelegram,
}

#[derive(Deserialize)]
struct RawPty {
    /// Defaults to `true`: the console is the fallback channel.
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_pty_user_id")]
    user_id: String,
}

impl Default for RawPty {
    fn default() -> Self {
        Self { enabled: true, user_id: default_pty_user_id() }
    }
}

#[derive(Deserialize)]
struct RawTelegram {
    /// Defaults to `false`: Telegram must be explicitly enabled.
    #[serde(default = "default_false")]
    enabled: bool,
    #[serde(default = "default_telegram_mode")]
    mode: String,
    #[serde(default)]
    webhook_url: Option<String>,
    #[serde(default = "default_webhook_bind")]
    webhook_bind: String,
}

impl Default for RawTelegram {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: default_telegram_mode(),
            webhook_url: None,
            webhook_bind: default_webhook_bind(),
        }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    openai: RawOpenAiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_llm_provider(), openai: RawOpenAiConfig::default() }
    }
}

#[derive(Deserialize)]
struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default = "default_openai_temperature")]
    temperature: f32,
    #[serde(default = "default_openai_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            timeout_seconds: default_openai_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawAgents {
    /// `default = "..."` in `[agents]` — which agent handles unrouted messages.
    #[serde(rename = "default", default = "default_agent_name")]
    default_agent: String,
    #[serde(default = "default_max_tool_rounds")]
    max_tool_rounds: usize,
    #[serde(default = "default_history_cap")]
    history_cap: usize,
    #[serde(default = "default_prompts_dir")]
    prompts_dir: String,
    /// `[agents.routing]` — channel_id -> agent_id overrides.
    #[serde(default)]
    routing: HashMap<String, String>,
    /// All other `[agents.<id>]` subsections — one entry per configured agent.
    #[serde(flatten)]
    entries: HashMap<String, RawAgentEntry>,
}

impl Default for RawAgents {
    fn default() -> Self {
        Self {
            default_agent: default_agent_name(),
            max_tool_rounds: default_max_tool_rounds(),
            history_cap: default_history_cap(),
            prompts_dir: default_prompts_dir(),
            routing: HashMap::new(),
            entries: HashMap::new(),
        }
    }
}

#[derive(Deserialize)]
struct RawAgentEntry {
    /// Defaults to `true`; set to `false` to disable without removing the section.
    #[serde(default = "default_true")]
    enabled: bool,
}

#[derive(Deserialize)]
struct RawStorage {
    #[serde(default = "default_storage_backend")]
    backend: String,
    #[serde(default = "default_db_file")]
    db_file: String,
    #[serde(default)]
    sheets: RawSheets,
}

impl Default for RawStorage {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            db_file: default_db_file(),
            sheets: RawSheets::default(),
        }
    }
}

#[derive(Deserialize)]
struct RawSheets {
    #[serde(default)]
    spreadsheet_id: String,
    #[serde(default = "default_sheets_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_sheets_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawSheets {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            api_base_url: default_sheets_api_base_url(),
            timeout_seconds: default_sheets_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawNutrition {
    #[serde(default = "default_duplicate_window_minutes")]
    duplicate_window_minutes: i64,
    #[serde(default)]
    default_goals: RawDefaultGoals,
}

impl Default for RawNutrition {
    fn default() -> Self {
        Self {
            duplicate_window_minutes: default_duplicate_window_minutes(),
            default_goals: RawDefaultGoals::default(),
        }
    }
}

#[derive(Deserialize, Default)]
struct RawDefaultGoals {
    goal_type: Option<String>,
    daily_calories: Option<f64>,
    daily_protein: Option<f64>,
    daily_fat: Option<f64>,
    daily_carbs: Option<f64>,
}

fn default_llm_provider() -> String { "dummy".to_string() }
fn default_openai_api_base_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "gpt-4o-mini".to_string() }
fn default_openai_temperature() -> f32 { 0.2 }
fn default_openai_timeout_seconds() -> u64 { 60 }
fn default_agent_name() -> String { "nutrition".to_string() }
fn default_max_tool_rounds() -> usize { 6 }
fn default_history_cap() -> usize { 20 }
fn default_prompts_dir() -> String { "config/prompts".to_string() }
fn default_pty_user_id() -> String { "local".to_string() }
fn default_telegram_mode() -> String { "polling".to_string() }
fn default_webhook_bind() -> String { "0.0.0.0:8080".to_string() }
fn default_storage_backend() -> String { "sqlite".to_string() }
fn default_db_file() -> String { "nutrition.db".to_string() }
fn default_sheets_api_base_url() -> String { "https://sheets.googleapis.com/v4/spreadsheets".to_string() }
fn default_sheets_timeout_seconds() -> u64 { 30 }
fn default_duplicate_window_minutes() -> i64 { 5 }

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

/// Load config from `path` (or `config/default.toml`), then apply env-var overrides.
pub fn load(path: Option<&str>) -> Result<Config, AppError> {
    let work_dir_override = env::var("NUTRI_WORK_DIR").ok();
    let log_level_override = env::var("NUTRI_LOG_LEVEL").ok();
    let mut config = load_from(
        Path::new(path.unwrap_or(DEFAULT_CONFIG_PATH)),
        work_dir_override.as_deref(),
        log_level_override.as_deref(),
    )?;

    config.llm_api_key = env::var("LLM_API_KEY").ok();
    config.sheets_access_token = env::var("GOOGLE_SHEETS_ACCESS_TOKEN").ok();
    if let Ok(url) = env::var("NUTRI_WEBHOOK_URL") {
        config.comms.telegram.webhook_url = Some(url);
    }
    Ok(config)
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    work_dir_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let s = parsed.supervisor;

    let work_dir_str = work_dir_override.unwrap_or(&s.work_dir).to_string();
    let work_dir = expand_home(&work_dir_str);
    let log_level = log_level_override.unwrap_or(&s.log_level).to_string();
    let log_file = s.log_file.map(|p| resolve_in(&work_dir, &p));

    let mode = match parsed.comms.telegram.mode.as_str() {
        "polling" => TelegramMode::Polling,
        "webhook" => TelegramMode::Webhook,
        other => {
            return Err(AppError::Config(format!(
                "unknown telegram mode '{other}' (expected \"polling\" or \"webhook\")"
            )));
        }
    };

    let backend = match parsed.storage.backend.as_str() {
        "sqlite" => StorageBackend::Sqlite,
        "sheets" => StorageBackend::Sheets,
        other => {
            return Err(AppError::Config(format!(
                "unknown storage backend '{other}' (expected \"sqlite\" or \"sheets\")"
            )));
        }
    };

    if parsed.nutrition.duplicate_window_minutes < 0 {
        return Err(AppError::Config(
            "nutrition.duplicate_window_minutes must not be negative".to_string(),
        ));
    }

    let defaults = DefaultGoals::default();
    let raw_goals = parsed.nutrition.default_goals;
    let default_goals = DefaultGoals {
        goal_type: raw_goals.goal_type.unwrap_or(defaults.goal_type),
        daily_calories: raw_goals.daily_calories.unwrap_or(defaults.daily_calories),
        daily_protein: raw_goals.daily_protein.unwrap_or(defaults.daily_protein),
        daily_fat: raw_goals.daily_fat.unwrap_or(defaults.daily_fat),
        daily_carbs: raw_goals.daily_carbs.unwrap_or(defaults.daily_carbs),
    };

    let db_path = resolve_in(&work_dir, &parsed.storage.db_file);

    Ok(Config {
        bot_name: s.bot_name,
        work_dir,
        log_level,
        log_file,
        comms: CommsConfig {
            pty: PtyConfig {
                enabled: parsed.comms.pty.enabled,
                user_id: parsed.comms.pty.user_id,
            },
            telegram: TelegramConfig {
                enabled: parsed.comms.telegram.enabled,
                mode,
                webhook_url: parsed.comms.telegram.webhook_url,
                webhook_bind: parsed.comms.telegram.webhook_bind,
            },
        },
        agents: AgentsConfig {
            default_agent: parsed.agents.default_agent,
            channel_map: parsed.agents.routing,
            enabled: parsed.agents.entries
                .iter()
                .filter(|(_, e)| e.enabled)
                .map(|(id, _)| id.clone())
                .collect(),
            max_tool_rounds: parsed.agents.max_tool_rounds.max(1),
            history_cap: parsed.agents.history_cap,
            prompts_dir: PathBuf::from(parsed.agents.prompts_dir),
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
            },
        },
        llm_api_key: None,
        storage: StorageConfig {
            backend,
            db_path,
            sheets: SheetsConfig {
                spreadsheet_id: parsed.storage.sheets.spreadsheet_id,
                api_base_url: parsed.storage.sheets.api_base_url,
                timeout_seconds: parsed.storage.sheets.timeout_seconds,
            },
        },
        sheets_access_token: None,
        nutrition: NutritionConfig {
            duplicate_window_secs: parsed.nutrition.duplicate_window_minutes * 60,
            default_goals,
        },
    })
}

/// Resolve `path` against `base` unless it is already absolute (or `~`-rooted).
fn resolve_in(base: &Path, path: &str) -> PathBuf {
    let expanded = expand_home(path);
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Safe `Config` for unit tests — dummy LLM, no API keys, no external calls.
#[cfg(test)]
impl Config {
    pub fn test_default(work_dir: &Path) -> Self {
        Self {
            bot_name: "test".into(),
            work_dir: work_dir.to_path_buf(),
            log_level: "info".into(),
            log_file: None,
            comms: CommsConfig {
                pty: PtyConfig { enabled: true, user_id: "local".into() },
                telegram: TelegramConfig {
                    enabled: false,
                    mode: TelegramMode::Polling,
                    webhook_url: None,
                    webhook_bind: default_webhook_bind(),
                },
            },
            agents: AgentsConfig {
                default_agent: "echo".into(),
                enabled: HashSet::from(["echo".to_string()]),
                channel_map: HashMap::new(),
                max_tool_rounds: default_max_tool_rounds(),
                history_cap: default_history_cap(),
                prompts_dir: work_dir.join("prompts"),
            },
            llm: LlmConfig {
                provider: "dummy".into(),
                openai: OpenAiConfig {
                    api_base_url: "http://localhost:0/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                },
            },
            llm_api_key: None,
            storage: StorageConfig {
                backend: StorageBackend::Sqlite,
                db_path: work_dir.join("nutrition.db"),
                sheets: SheetsConfig {
                    spreadsheet_id: String::new(),
                    api_base_url: default_sheets_api_base_url(),
                    timeout_seconds: 1,
                },
            },
            sheets_access_token: None,
            nutrition: NutritionConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL_TOML: &str = r#"
[supervisor]
bot_name = "test-bot"
work_dir = "~/.nutri-bot"
log_level = "info"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_basic_config() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.bot_name, "test-bot");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.agents.default_agent, "nutrition");
        assert_eq!(cfg.storage.backend, StorageBackend::Sqlite);
        assert_eq!(cfg.nutrition.duplicate_window_secs, 300);
        assert_eq!(cfg.comms.telegram.mode, TelegramMode::Polling);
    }

    #[test]
    fn db_path_resolves_against_work_dir() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), Some("/tmp/nutri"), None).unwrap();
        assert_eq!(cfg.storage.db_path, PathBuf::from("/tmp/nutri/nutrition.db"));
    }

    #[test]
    fn full_sections_parse() {
        let f = write_toml(r#"
[supervisor]
bot_name = "nb"
work_dir = "/var/lib/nb"
log_level = "debug"

[comms.pty]
enabled = false
user_id = "alice"

[comms.telegram]
enabled = true
mode = "webhook"
webhook_url = "https://bot.example.com"

[agents]
default = "echo"
max_tool_rounds = 3

[agents.echo]
enabled = true

[agents.nutrition]
enabled = false

[storage]
backend = "sheets"
db_file = "/data/n.db"

[storage.sheets]
spreadsheet_id = "abc123"

[nutrition]
duplicate_window_minutes = 2

[nutrition.default_goals]
daily_calories = 1800
"#);
        let cfg = load_from(f.path(), None, None).unwrap();
        assert!(!cfg.comms.pty.enabled);
        assert_eq!(cfg.comms.pty.user_id, "alice");
        assert_eq!(cfg.comms.telegram.mode, TelegramMode::Webhook);
        assert_eq!(cfg.comms.telegram.webhook_url.as_deref(), Some("https://bot.example.com"));
        assert_eq!(cfg.agents.default_agent, "echo");
        assert_eq!(cfg.agents.max_tool_rounds, 3);
        assert!(cfg.agents.enabled.contains("echo"));
        assert!(!cfg.agents.enabled.contains("nutrition"));
        assert_eq!(cfg.storage.backend, StorageBackend::Sheets);
        assert_eq!(cfg.storage.db_path, PathBuf::from("/data/n.db"));
        assert_eq!(cfg.storage.sheets.spreadsheet_id, "abc123");
        assert_eq!(cfg.nutrition.duplicate_window_secs, 120);
        assert_eq!(cfg.nutrition.default_goals.daily_calories, 1800.0);
        assert_eq!(cfg.nutrition.default_goals.daily_protein, 150.0);
    }

    #[test]
    fn shipped_default_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml");
        let cfg = load_from(&path, Some("/tmp/nutri"), None).unwrap();
        assert_eq!(cfg.agents.default_agent, "nutrition");
        assert!(cfg.agents.enabled.contains("nutrition"));
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.storage.db_path, PathBuf::from("/tmp/nutri/nutrition.db"));
        assert_eq!(cfg.agents.prompts_dir, PathBuf::from("config/prompts"));
    }

    #[test]
    fn unknown_backend_errors() {
        let f = write_toml(&format!("{MINIMAL_TOML}\n[storage]\nbackend = \"postgres\"\n"));
        let msg = load_from(f.path(), None, None).unwrap_err().to_string();
        assert!(msg.contains("postgres"));
    }

    #[test]
    fn unknown_telegram_mode_errors() {
        let f = write_toml(&format!("{MINIMAL_TOML}\n[comms.telegram]\nmode = \"carrier-pigeon\"\n"));
        assert!(load_from(f.path(), None, None).is_err());
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs::home_dir().expect("home dir must exist in test env");
        let expanded = expand_home("~/.nutri-bot");
        assert!(expanded.starts_with(&home));
        assert!(expanded.ends_with(".nutri-bot"));
    }

    #[test]
    fn absolute_path_unchanged() {
        let p = expand_home("/absolute/path");
        assert_eq!(p, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(Path::new("/nonexistent/config.toml"), None, None);
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("config error"));
    }

    #[test]
    fn env_work_dir_override() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), Some("/tmp/test-override"), None).unwrap();
        assert_eq!(cfg.work_dir, PathBuf::from("/tmp/test-override"));
    }

    #[test]
    fn env_log_level_override() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), None, Some("debug")).unwrap();
        assert_eq!(cfg.log_level, "debug");
    }
}
