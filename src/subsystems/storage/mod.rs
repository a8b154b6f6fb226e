//! Persistent store for meals, goals, weight entries and memory items.
//!
//! [`NutritionStore`] is the seam between the tools and the backend.  The
//! SQLite store is always available; the spreadsheet store is compiled in
//! with the `backend-sheets` feature.  All methods are synchronous (blocking
//! I/O) — async callers go through `tokio::task::spawn_blocking`.
//!
//! Every query is scoped to a user id: one user can never see or touch
//! another user's rows through this trait.

pub mod sqlite;
#[cfg(feature = "backend-sheets")]
pub mod sheets;
#[cfg(feature = "backend-sheets")]
pub mod google_sheets;
pub mod types;

use std::sync::{Arc, Mutex};

use chrono::{Duration, Local, NaiveDateTime};
use thiserror::Error;
use tracing::info;

use crate::config::{Config, StorageBackend};
use crate::error::AppError;
use types::{Meal, MemoryItem, MemoryType, NewMeal, NewMemory, NewWeight, UserGoals, WeightEntry};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// A uniqueness rule would be broken (e.g. two weight entries on one date).
    #[error("conflict: {0}")]
    Conflict(String),
    /// A stored row could not be decoded.
    #[error("corrupt row in {table}: {message}")]
    Corrupt { table: &'static str, message: String },
}

/// Backend-neutral CRUD surface used by the tools.
pub trait NutritionStore: Send + Sync {
    /// Short backend name for logs (`"sqlite"`, `"sheets"`).
    fn backend(&self) -> &'static str;

    // meals
    fn insert_meal(&self, meal: NewMeal) -> Result<Meal, StoreError>;
    fn meal(&self, user_id: &str, id: i64) -> Result<Option<Meal>, StoreError>;
    /// Most recently created meal.
    fn latest_meal(&self, user_id: &str) -> Result<Option<Meal>, StoreError>;
    /// Meals with `from <= date <= to`, oldest first.
    fn meals_between(&self, user_id: &str, from: &str, to: &str) -> Result<Vec<Meal>, StoreError>;
    /// Meals whose `created_at` is at or after `since`.
    fn meals_created_since(&self, user_id: &str, since: &str) -> Result<Vec<Meal>, StoreError>;
    /// Overwrite the stored row with the same id.  `false` when it is gone.
    fn update_meal(&self, meal: &Meal) -> Result<bool, StoreError>;
    fn delete_meal(&self, user_id: &str, id: i64) -> Result<bool, StoreError>;

    // goals
    fn goals(&self, user_id: &str) -> Result<Option<UserGoals>, StoreError>;
    fn upsert_goals(&self, goals: &UserGoals) -> Result<(), StoreError>;

    // weight
    fn insert_weight(&self, entry: NewWeight) -> Result<WeightEntry, StoreError>;
    fn update_weight(&self, entry: &WeightEntry) -> Result<bool, StoreError>;
    /// Entries with `date >= from`, newest first.
    fn weights_since(&self, user_id: &str, from: &str) -> Result<Vec<WeightEntry>, StoreError>;
    /// Newest entry with `date < before`.
    fn weight_before(&self, user_id: &str, before: &str) -> Result<Option<WeightEntry>, StoreError>;
    fn delete_weight(&self, user_id: &str, id: i64) -> Result<bool, StoreError>;

    // memory bank
    fn insert_memory(&self, item: NewMemory) -> Result<MemoryItem, StoreError>;
    /// Items for the user, optionally filtered by type, newest first.
    fn memories(&self, user_id: &str, memory_type: Option<MemoryType>) -> Result<Vec<MemoryItem>, StoreError>;
    /// Delete every item whose content contains `needle`; returns the count.
    fn delete_memories_containing(&self, user_id: &str, needle: &str) -> Result<usize, StoreError>;

    /// Entry recorded for exactly `date`, if any.
    fn weight_on(&self, user_id: &str, date: &str) -> Result<Option<WeightEntry>, StoreError> {
        Ok(self
            .weights_since(user_id, date)?
            .into_iter()
            .find(|w| w.date == date))
    }

    /// Newest entry overall.
    fn latest_weight(&self, user_id: &str) -> Result<Option<WeightEntry>, StoreError> {
        Ok(self.weights_since(user_id, "")?.into_iter().next())
    }
}

/// Build the configured backend.
pub fn open(config: &Config) -> Result<Arc<dyn NutritionStore>, AppError> {
    match config.storage.backend {
        StorageBackend::Sqlite => {
            let store = sqlite::SqliteStore::open(&config.storage.db_path)
                .map_err(|e| AppError::Storage(e.to_string()))?;
            info!(path = %config.storage.db_path.display(), "sqlite store ready");
            Ok(Arc::new(store))
        }
        #[cfg(feature = "backend-sheets")]
        StorageBackend::Sheets => {
            let token = config.sheets_access_token.clone().ok_or_else(|| {
                AppError::Config("GOOGLE_SHEETS_ACCESS_TOKEN is required for the sheets backend".into())
            })?;
            if config.storage.sheets.spreadsheet_id.is_empty() {
                return Err(AppError::Config("storage.sheets.spreadsheet_id is empty".into()));
            }
            let client = google_sheets::GoogleSheetsClient::new(
                &config.storage.sheets.api_base_url,
                &config.storage.sheets.spreadsheet_id,
                token,
                config.storage.sheets.timeout_seconds,
            )
            .map_err(|e| AppError::Storage(e.to_string()))?;
            let store = sheets::SheetStore::open(client).map_err(|e| AppError::Storage(e.to_string()))?;
            info!(spreadsheet = %config.storage.sheets.spreadsheet_id, "sheets store ready");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "backend-sheets"))]
        StorageBackend::Sheets => Err(AppError::Config(
            "sheets backend requested but the binary was built without `backend-sheets`".into(),
        )),
    }
}

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Source of "now" (local wall-clock time).
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> String {
        self.now().format(DATE_FORMAT).to_string()
    }

    fn time_of_day(&self) -> String {
        self.now().format(TIME_FORMAT).to_string()
    }

    fn timestamp(&self) -> String {
        self.now().format(TIMESTAMP_FORMAT).to_string()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self { now: Mutex::new(start) }
    }

    /// Parse `YYYY-MM-DD HH:MM:SS`.
    pub fn at(timestamp: &str) -> Result<Self, chrono::ParseError> {
        NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).map(Self::new)
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
