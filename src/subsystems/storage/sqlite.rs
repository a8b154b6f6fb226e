//! SQLite backend — one database file, four tables, a fresh connection per call.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::types::{
    Macros, Meal, MealSource, MealType, MemoryItem, MemoryType, NewMeal, NewMemory,
    NewWeight, UserGoals, WeightEntry,
};
use super::{NutritionStore, StoreError};

const SCHEMA_VERSION: i64 = 1;

const MEAL_COLUMNS: &str =
    "id, user_id, date, time, meal_type, description, calories, protein, fat, carbs, source, created_at";
const WEIGHT_COLUMNS: &str = "id, user_id, date, time, weight, note, created_at";
const MEMORY_COLUMNS: &str = "id, user_id, memory_type, content, metadata, created_at";

#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `db_path` and ensure the schema.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("sqlite: cannot create {}: {e}", parent.display()))
            })?;
        }
        let store = Self { db_path: db_path.to_path_buf() };
        store.init_db()?;
        Ok(store)
    }

    fn init_db(&self) -> Result<(), StoreError> {
        let conn = self.open_conn()?;
        let version: i64 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .map_err(|e| unavailable("read schema version", e))?;

        if version < SCHEMA_VERSION {
            conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS meals (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL,
                    date TEXT NOT NULL,
                    time TEXT NOT NULL,
                    meal_type TEXT NOT NULL DEFAULT 'snack',
                    description TEXT NOT NULL,
                    calories REAL NOT NULL DEFAULT 0,
                    protein REAL NOT NULL DEFAULT 0,
                    fat REAL NOT NULL DEFAULT 0,
                    carbs REAL NOT NULL DEFAULT 0,
                    source TEXT NOT NULL DEFAULT 'text',
                    created_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_meals_user_date ON meals (user_id, date);

                CREATE TABLE IF NOT EXISTS users (
                    user_id TEXT PRIMARY KEY,
                    name TEXT,
                    goal_type TEXT NOT NULL DEFAULT 'maintenance',
                    daily_calories REAL NOT NULL,
                    daily_protein REAL NOT NULL,
                    daily_fat REAL NOT NULL,
                    daily_carbs REAL NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS weight_log (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL,
                    date TEXT NOT NULL,
                    time TEXT NOT NULL,
                    weight REAL NOT NULL,
                    note TEXT,
                    created_at TEXT NOT NULL,
                    UNIQUE (user_id, date)
                );

                CREATE TABLE IF NOT EXISTS memory_bank (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL,
                    memory_type TEXT NOT NULL,
                    content TEXT NOT NULL,
                    metadata TEXT,
                    created_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_memory_user ON memory_bank (user_id);

                PRAGMA user_version = 1;
                ",
            )
            .map_err(|e| unavailable("initialize schema", e))?;
        }
        Ok(())
    }

    fn open_conn(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.db_path).map_err(|e| {
            StoreError::Unavailable(format!("sqlite: open {}: {e}", self.db_path.display()))
        })?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| unavailable("set journal_mode WAL", e))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| unavailable("set busy_timeout", e))?;
        Ok(conn)
    }

    fn query_meals(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<Meal>, StoreError> {
        let conn = self.open_conn()?;
        let mut stmt = conn.prepare(sql).map_err(|e| unavailable("prepare meals query", e))?;
        let rows = stmt
            .query_map(args, RawMeal::from_row)
            .map_err(|e| unavailable("query meals", e))?;
        let mut meals = Vec::new();
        for row in rows {
            meals.push(row.map_err(|e| unavailable("read meal row", e))?.decode()?);
        }
        Ok(meals)
    }

    fn query_weights(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<WeightEntry>, StoreError> {
        let conn = self.open_conn()?;
        let mut stmt = conn.prepare(sql).map_err(|e| unavailable("prepare weight query", e))?;
        let rows = stmt
            .query_map(args, weight_from_row)
            .map_err(|e| unavailable("query weight_log", e))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| unavailable("read weight row", e))?);
        }
        Ok(out)
    }
}

impl NutritionStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn insert_meal(&self, meal: NewMeal) -> Result<Meal, StoreError> {
        let conn = self.open_conn()?;
        conn.execute(
            "INSERT INTO meals (user_id, date, time, meal_type, description, calories, protein, fat, carbs, source, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                meal.user_id,
                meal.date,
                meal.time,
                meal.meal_type.as_str(),
                meal.description,
                meal.macros.calories,
                meal.macros.protein,
                meal.macros.fat,
                meal.macros.carbs,
                meal.source.as_str(),
                meal.created_at,
            ],
        )
        .map_err(|e| unavailable("insert meal", e))?;
        Ok(meal.with_id(conn.last_insert_rowid()))
    }

    fn meal(&self, user_id: &str, id: i64) -> Result<Option<Meal>, StoreError> {
        let sql = format!("SELECT {MEAL_COLUMNS} FROM meals WHERE user_id = ?1 AND id = ?2");
        Ok(self.query_meals(&sql, params![user_id, id])?.into_iter().next())
    }

    fn latest_meal(&self, user_id: &str) -> Result<Option<Meal>, StoreError> {
        let sql = format!(
            "SELECT {MEAL_COLUMNS} FROM meals WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        Ok(self.query_meals(&sql, params![user_id])?.into_iter().next())
    }

    fn meals_between(&self, user_id: &str, from: &str, to: &str) -> Result<Vec<Meal>, StoreError> {
        let sql = format!(
            "SELECT {MEAL_COLUMNS} FROM meals WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date, time, id"
        );
        self.query_meals(&sql, params![user_id, from, to])
    }

    fn meals_created_since(&self, user_id: &str, since: &str) -> Result<Vec<Meal>, StoreError> {
        let sql = format!(
            "SELECT {MEAL_COLUMNS} FROM meals WHERE user_id = ?1 AND created_at >= ?2
             ORDER BY created_at DESC, id DESC"
        );
        self.query_meals(&sql, params![user_id, since])
    }

    fn update_meal(&self, meal: &Meal) -> Result<bool, StoreError> {
        let conn = self.open_conn()?;
        let changed = conn
            .execute(
                "UPDATE meals SET meal_type = ?1, description = ?2, calories = ?3, protein = ?4,
                 fat = ?5, carbs = ?6 WHERE user_id = ?7 AND id = ?8",
                params![
                    meal.meal_type.as_str(),
                    meal.description,
                    meal.macros.calories,
                    meal.macros.protein,
                    meal.macros.fat,
                    meal.macros.carbs,
                    meal.user_id,
                    meal.id,
                ],
            )
            .map_err(|e| unavailable("update meal", e))?;
        Ok(changed > 0)
    }

    fn delete_meal(&self, user_id: &str, id: i64) -> Result<bool, StoreError> {
        let conn = self.open_conn()?;
        let changed = conn
            .execute("DELETE FROM meals WHERE user_id = ?1 AND id = ?2", params![user_id, id])
            .map_err(|e| unavailable("delete meal", e))?;
        Ok(changed > 0)
    }

    fn goals(&self, user_id: &str) -> Result<Option<UserGoals>, StoreError> {
        let conn = self.open_conn()?;
        let raw = conn
            .query_row(
                "SELECT user_id, name, goal_type, daily_calories, daily_protein, daily_fat, daily_carbs, updated_at
                 FROM users WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, f64>(5)?,
                        row.get::<_, f64>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| unavailable("read goals", e))?;

        raw.map(|(user_id, name, goal_type, cal, protein, fat, carbs, updated_at)| {
            Ok(UserGoals {
                user_id,
                name,
                goal_type: decode("users", &goal_type)?,
                daily_calories: cal,
                daily_protein: protein,
                daily_fat: fat,
                daily_carbs: carbs,
                updated_at,
            })
        })
        .transpose()
    }

    fn upsert_goals(&self, goals: &UserGoals) -> Result<(), StoreError> {
        let conn = self.open_conn()?;
        conn.execute(
            "INSERT INTO users (user_id, name, goal_type, daily_calories, daily_protein, daily_fat, daily_carbs, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(user_id) DO UPDATE SET
                name = excluded.name,
                goal_type = excluded.goal_type,
                daily_calories = excluded.daily_calories,
                daily_protein = excluded.daily_protein,
                daily_fat = excluded.daily_fat,
                daily_carbs = excluded.daily_carbs,
                updated_at = excluded.updated_at",
            params![
                goals.user_id,
                goals.name,
                goals.goal_type.as_str(),
                goals.daily_calories,
                goals.daily_protein,
                goals.daily_fat,
                goals.daily_carbs,
                goals.updated_at,
            ],
        )
        .map_err(|e| unavailable("upsert goals", e))?;
        Ok(())
    }

    fn insert_weight(&self, entry: NewWeight) -> Result<WeightEntry, StoreError> {
        let conn = self.open_conn()?;
        conn.execute(
            "INSERT INTO weight_log (user_id, date, time, weight, note, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![entry.user_id, entry.date, entry.time, entry.weight, entry.note, entry.created_at],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref f, _) if f.code == rusqlite::ErrorCode::ConstraintViolation => {
                StoreError::Conflict(format!("weight already recorded for {}", entry.date))
            }
            other => unavailable("insert weight", other),
        })?;
        Ok(entry.with_id(conn.last_insert_rowid()))
    }

    fn update_weight(&self, entry: &WeightEntry) -> Result<bool, StoreError> {
        let conn = self.open_conn()?;
        let changed = conn
            .execute(
                "UPDATE weight_log SET time = ?1, weight = ?2, note = ?3 WHERE user_id = ?4 AND id = ?5",
                params![entry.time, entry.weight, entry.note, entry.user_id, entry.id],
            )
            .map_err(|e| unavailable("update weight", e))?;
        Ok(changed > 0)
    }

    fn weights_since(&self, user_id: &str, from: &str) -> Result<Vec<WeightEntry>, StoreError> {
        let sql = format!(
            "SELECT {WEIGHT_COLUMNS} FROM weight_log WHERE user_id = ?1 AND date >= ?2 ORDER BY date DESC, id DESC"
        );
        self.query_weights(&sql, params![user_id, from])
    }

    fn weight_before(&self, user_id: &str, before: &str) -> Result<Option<WeightEntry>, StoreError> {
        let sql = format!(
            "SELECT {WEIGHT_COLUMNS} FROM weight_log WHERE user_id = ?1 AND date < ?2 ORDER BY date DESC, id DESC LIMIT 1"
        );
        Ok(self.query_weights(&sql, params![user_id, before])?.into_iter().next())
    }

    fn weight_on(&self, user_id: &str, date: &str) -> Result<Option<WeightEntry>, StoreError> {
        let sql = format!("SELECT {WEIGHT_COLUMNS} FROM weight_log WHERE user_id = ?1 AND date = ?2");
        Ok(self.query_weights(&sql, params![user_id, date])?.into_iter().next())
    }

    fn delete_weight(&self, user_id: &str, id: i64) -> Result<bool, StoreError> {
        let conn = self.open_conn()?;
        let changed = conn
            .execute("DELETE FROM weight_log WHERE user_id = ?1 AND id = ?2", params![user_id, id])
            .map_err(|e| unavailable("delete weight", e))?;
        Ok(changed > 0)
    }

    fn insert_memory(&self, item: NewMemory) -> Result<MemoryItem, StoreError> {
        let conn = self.open_conn()?;
        conn.execute(
            "INSERT INTO memory_bank (user_id, memory_type, content, metadata, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![item.user_id, item.memory_type.as_str(), item.content, item.metadata, item.created_at],
        )
        .map_err(|e| unavailable("insert memory", e))?;
        Ok(item.with_id(conn.last_insert_rowid()))
    }

    fn memories(&self, user_id: &str, memory_type: Option<MemoryType>) -> Result<Vec<MemoryItem>, StoreError> {
        let conn = self.open_conn()?;
        let sql = format!(
            "SELECT {MEMORY_COLUMNS} FROM memory_bank WHERE user_id = ?1 AND (?2 IS NULL OR memory_type = ?2)
             ORDER BY created_at DESC, id DESC"
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| unavailable("prepare memories", e))?;
        let rows = stmt
            .query_map(params![user_id, memory_type.map(|t| t.as_str())], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(|e| unavailable("query memories", e))?;

        let mut items = Vec::new();
        for row in rows {
            let (id, user_id, memory_type, content, metadata, created_at) =
                row.map_err(|e| unavailable("read memory row", e))?;
            items.push(MemoryItem {
                id,
                user_id,
                memory_type: decode("memory_bank", &memory_type)?,
                content,
                metadata,
                created_at,
            });
        }
        Ok(items)
    }

    fn delete_memories_containing(&self, user_id: &str, needle: &str) -> Result<usize, StoreError> {
        // SQLite's lower() folds ASCII only, so matching happens here.
        let needle = needle.to_lowercase();
        let mut conn = self.open_conn()?;
        let tx = conn.transaction().map_err(|e| unavailable("begin transaction", e))?;
        let ids: Vec<i64> = {
            let mut stmt = tx
                .prepare("SELECT id, content FROM memory_bank WHERE user_id = ?1")
                .map_err(|e| unavailable("prepare memory scan", e))?;
            let rows = stmt
                .query_map(params![user_id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
                .map_err(|e| unavailable("scan memories", e))?;
            let mut ids = Vec::new();
            for row in rows {
                let (id, content) = row.map_err(|e| unavailable("read memory", e))?;
                if content.to_lowercase().contains(&needle) {
                    ids.push(id);
                }
            }
            ids
        };
        for id in &ids {
            tx.execute("DELETE FROM memory_bank WHERE id = ?1", params![id])
                .map_err(|e| unavailable("delete memory", e))?;
        }
        tx.commit().map_err(|e| unavailable("commit", e))?;
        Ok(ids.len())
    }
}

// ── Row decoding ──────────────────────────────────────────────────────────────

/// Meal row as stored; enum columns still text.
struct RawMeal {
    id: i64,
    user_id: String,
    date: String,
    time: String,
    meal_type: String,
    description: String,
    macros: Macros,
    source: String,
    created_at: String,
}

impl RawMeal {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            date: row.get(2)?,
            time: row.get(3)?,
            meal_type: row.get(4)?,
            description: row.get(5)?,
            macros: Macros {
                calories: row.get(6)?,
                protein: row.get(7)?,
                fat: row.get(8)?,
                carbs: row.get(9)?,
            },
            source: row.get(10)?,
            created_at: row.get(11)?,
        })
    }

    fn decode(self) -> Result<Meal, StoreError> {
        Ok(Meal {
            id: self.id,
            user_id: self.user_id,
            date: self.date,
            time: self.time,
            meal_type: decode::<MealType>("meals", &self.meal_type)?,
            description: self.description,
            macros: self.macros,
            source: decode::<MealSource>("meals", &self.source)?,
            created_at: self.created_at,
        })
    }
}

fn weight_from_row(row: &Row<'_>) -> rusqlite::Result<WeightEntry> {
    Ok(WeightEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: row.get(2)?,
        time: row.get(3)?,
        weight: row.get(4)?,
        note: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn decode<T>(table: &'static str, value: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| StoreError::Corrupt { table, message: e.to_string() })
}

fn unavailable(what: &str, e: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(format!("sqlite: {what}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystems::storage::types::GoalType;
    use tempfile::TempDir;

    fn store() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&dir.path().join("nutrition.db")).unwrap();
        (dir, store)
    }

    fn new_meal(user: &str, date: &str, created_at: &str, description: &str, calories: f64) -> NewMeal {
        NewMeal {
            user_id: user.into(),
            date: date.into(),
            time: created_at[11..16].into(),
            meal_type: MealType::Lunch,
            description: description.into(),
            macros: Macros { calories, protein: 10.0, fat: 5.0, carbs: 20.0 },
            source: MealSource::Text,
            created_at: created_at.into(),
        }
    }

    #[test]
    fn insert_and_fetch_meal() {
        let (_dir, store) = store();
        let saved = store
            .insert_meal(new_meal("u1", "2026-10-16", "2026-10-16 12:00:00", "chicken salad", 420.5))
            .unwrap();
        assert!(saved.id > 0);

        let fetched = store.meal("u1", saved.id).unwrap().unwrap();
        assert_eq!(fetched, saved);
        assert!(store.meal("someone-else", saved.id).unwrap().is_none());
    }

    #[test]
    fn meals_between_is_inclusive_and_ordered() {
        let (_dir, store) = store();
        store.insert_meal(new_meal("u1", "2026-10-14", "2026-10-14 19:00:00", "pasta", 600.0)).unwrap();
        store.insert_meal(new_meal("u1", "2026-10-16", "2026-10-16 08:00:00", "eggs", 200.0)).unwrap();
        store.insert_meal(new_meal("u1", "2026-10-17", "2026-10-17 08:00:00", "toast", 150.0)).unwrap();

        let meals = store.meals_between("u1", "2026-10-14", "2026-10-16").unwrap();
        let names: Vec<_> = meals.iter().map(|m| m.description.as_str()).collect();
        assert_eq!(names, vec!["pasta", "eggs"]);
    }

    #[test]
    fn latest_meal_and_delete() {
        let (_dir, store) = store();
        store.insert_meal(new_meal("u1", "2026-10-16", "2026-10-16 08:00:00", "eggs", 200.0)).unwrap();
        let last = store
            .insert_meal(new_meal("u1", "2026-10-16", "2026-10-16 12:00:00", "soup", 300.0))
            .unwrap();

        assert_eq!(store.latest_meal("u1").unwrap().unwrap().id, last.id);
        assert!(store.delete_meal("u1", last.id).unwrap());
        assert!(!store.delete_meal("u1", last.id).unwrap());
        assert_eq!(store.latest_meal("u1").unwrap().unwrap().description, "eggs");
    }

    #[test]
    fn update_meal_overwrites_row() {
        let (_dir, store) = store();
        let mut meal = store
            .insert_meal(new_meal("u1", "2026-10-16", "2026-10-16 12:00:00", "soup", 300.0))
            .unwrap();
        meal.macros.calories = 350.0;
        meal.meal_type = MealType::Dinner;
        assert!(store.update_meal(&meal).unwrap());
        assert_eq!(store.meal("u1", meal.id).unwrap().unwrap(), meal);
    }

    #[test]
    fn goals_upsert_replaces() {
        let (_dir, store) = store();
        assert!(store.goals("u1").unwrap().is_none());

        let mut goals = UserGoals {
            user_id: "u1".into(),
            name: None,
            goal_type: GoalType::Maintenance,
            daily_calories: 2000.0,
            daily_protein: 150.0,
            daily_fat: 70.0,
            daily_carbs: 200.0,
            updated_at: "2026-10-16 10:00:00".into(),
        };
        store.upsert_goals(&goals).unwrap();
        goals.goal_type = GoalType::WeightLoss;
        goals.daily_calories = 1700.0;
        store.upsert_goals(&goals).unwrap();

        assert_eq!(store.goals("u1").unwrap().unwrap(), goals);
    }

    #[test]
    fn weight_queries() {
        let (_dir, store) = store();
        for (date, w) in [("2026-10-01", 82.0), ("2026-10-10", 81.2), ("2026-10-16", 80.5)] {
            store
                .insert_weight(NewWeight {
                    user_id: "u1".into(),
                    date: date.into(),
                    time: "07:00".into(),
                    weight: w,
                    note: None,
                    created_at: format!("{date} 07:00:00"),
                })
                .unwrap();
        }

        let recent = store.weights_since("u1", "2026-10-05").unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].date, "2026-10-16");

        assert_eq!(store.weight_before("u1", "2026-10-16").unwrap().unwrap().weight, 81.2);
        assert_eq!(store.weight_on("u1", "2026-10-10").unwrap().unwrap().weight, 81.2);
        assert_eq!(store.latest_weight("u1").unwrap().unwrap().weight, 80.5);
    }

    #[test]
    fn one_weight_row_per_user_and_date() {
        let (_dir, store) = store();
        let entry = NewWeight {
            user_id: "u1".into(),
            date: "2026-10-16".into(),
            time: "07:00".into(),
            weight: 80.0,
            note: None,
            created_at: "2026-10-16 07:00:00".into(),
        };
        store.insert_weight(entry.clone()).unwrap();
        assert!(matches!(store.insert_weight(entry), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn memory_filter_and_substring_delete() {
        let (_dir, store) = store();
        for (kind, content) in [
            (MemoryType::Allergy, "Allergic to peanuts"),
            (MemoryType::Preference, "Likes 100% dark chocolate"),
            (MemoryType::Habit, "Skips breakfast"),
        ] {
            store
                .insert_memory(NewMemory {
                    user_id: "u1".into(),
                    memory_type: kind,
                    content: content.into(),
                    metadata: None,
                    created_at: "2026-10-16 09:00:00".into(),
                })
                .unwrap();
        }

        assert_eq!(store.memories("u1", None).unwrap().len(), 3);
        assert_eq!(store.memories("u1", Some(MemoryType::Allergy)).unwrap().len(), 1);

        assert_eq!(store.delete_memories_containing("u1", "PEANUT").unwrap(), 1);
        // '%' is matched literally.
        assert_eq!(store.delete_memories_containing("u1", "0% d").unwrap(), 1);
        assert_eq!(store.delete_memories_containing("u1", "%").unwrap(), 0);
        assert_eq!(store.memories("u1", None).unwrap().len(), 1);
    }

    #[test]
    fn corrupt_enum_is_reported() {
        let (_dir, store) = store();
        let meal = store
            .insert_meal(new_meal("u1", "2026-10-16", "2026-10-16 12:00:00", "soup", 300.0))
            .unwrap();
        let conn = store.open_conn().unwrap();
        conn.execute("UPDATE meals SET meal_type = 'brunch' WHERE id = ?1", params![meal.id]).unwrap();
        assert!(matches!(store.meal("u1", meal.id), Err(StoreError::Corrupt { table: "meals", .. })));
    }
}
