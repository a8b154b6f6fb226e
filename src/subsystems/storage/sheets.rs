//! Spreadsheet backend — one worksheet per table, header row plus data rows.
//!
//! [`SheetStore`] implements [`NutritionStore`] over any [`SheetClient`]: the
//! Google Sheets REST client in production, [`InMemorySheets`] in tests.
//! Spreadsheets have no query engine, so every call reads the worksheet and
//! filters in memory.  Writes are serialised through a mutex so id allocation
//! and read-modify-write cycles do not interleave within this process.
//! Ids are drawn from the `sequences` worksheet and never reused.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use super::types::{
    Macros, Meal, MealSource, MealType, MemoryItem, MemoryType, NewMeal, NewMemory, NewWeight,
    UserGoals, WeightEntry,
};
use super::{NutritionStore, StoreError};

pub const MEALS: &str = "meals";
pub const USERS: &str = "users";
pub const WEIGHT_LOG: &str = "weight_log";
pub const MEMORY_BANK: &str = "memory_bank";
/// Last id handed out per table, so ids of deleted rows are never reused.
pub const SEQUENCES: &str = "sequences";

const MEAL_HEADER: &[&str] = &[
    "id", "user_id", "date", "time", "meal_type", "description", "calories", "protein", "fat",
    "carbs", "source", "created_at",
];
const USER_HEADER: &[&str] = &[
    "user_id", "name", "goal_type", "daily_calories", "daily_protein", "daily_fat", "daily_carbs",
    "updated_at",
];
const WEIGHT_HEADER: &[&str] = &["id", "user_id", "date", "time", "weight", "note", "created_at"];
const MEMORY_HEADER: &[&str] = &["id", "user_id", "memory_type", "content", "metadata", "created_at"];
const SEQUENCE_HEADER: &[&str] = &["table", "last_id"];

/// Minimal worksheet operations the store needs.
///
/// Row indices are zero-based over the data rows (the header is not counted).
pub trait SheetClient: Send + Sync {
    /// Create the worksheet with `header` as its first row when it is missing.
    fn ensure_sheet(&self, title: &str, header: &[&str]) -> Result<(), StoreError>;
    /// All data rows, in sheet order.  Trailing empty cells may be absent.
    fn read_rows(&self, title: &str) -> Result<Vec<Vec<String>>, StoreError>;
    fn append_row(&self, title: &str, row: Vec<String>) -> Result<(), StoreError>;
    fn update_row(&self, title: &str, index: usize, row: Vec<String>) -> Result<(), StoreError>;
    /// Remove the given rows; indices refer to the sheet before deletion.
    fn delete_rows(&self, title: &str, indices: &[usize]) -> Result<(), StoreError>;
}

impl<T: SheetClient + ?Sized> SheetClient for &T {
    fn ensure_sheet(&self, title: &str, header: &[&str]) -> Result<(), StoreError> {
        (**self).ensure_sheet(title, header)
    }

    fn read_rows(&self, title: &str) -> Result<Vec<Vec<String>>, StoreError> {
        (**self).read_rows(title)
    }

    fn append_row(&self, title: &str, row: Vec<String>) -> Result<(), StoreError> {
        (**self).append_row(title, row)
    }

    fn update_row(&self, title: &str, index: usize, row: Vec<String>) -> Result<(), StoreError> {
        (**self).update_row(title, index, row)
    }

    fn delete_rows(&self, title: &str, indices: &[usize]) -> Result<(), StoreError> {
        (**self).delete_rows(title, indices)
    }
}

pub struct SheetStore<C: SheetClient> {
    client: C,
    write_lock: Mutex<()>,
}

impl<C: SheetClient> SheetStore<C> {
    /// Wrap `client` and make sure the four worksheets exist.
    pub fn open(client: C) -> Result<Self, StoreError> {
        for (title, header) in [
            (MEALS, MEAL_HEADER),
            (USERS, USER_HEADER),
            (WEIGHT_LOG, WEIGHT_HEADER),
            (MEMORY_BANK, MEMORY_HEADER),
            (SEQUENCES, SEQUENCE_HEADER),
        ] {
            client.ensure_sheet(title, header)?;
        }
        Ok(Self { client, write_lock: Mutex::new(()) })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Next id for `table`: one past both the recorded high-water mark and
    /// the largest id still present. Caller holds the write lock.
    fn allocate_id(&self, table: &str, rows: &[Vec<String>]) -> Result<i64, StoreError> {
        let sequences = self.client.read_rows(SEQUENCES)?;
        let index = sequences.iter().position(|r| cell(r, 0) == table);
        let last = index
            .and_then(|i| cell(&sequences[i], 1).trim().parse::<i64>().ok())
            .unwrap_or(0);
        let id = last.max(max_id(rows)) + 1;
        let row = vec![table.to_string(), id.to_string()];
        match index {
            Some(i) => self.client.update_row(SEQUENCES, i, row)?,
            None => self.client.append_row(SEQUENCES, row)?,
        }
        Ok(id)
    }

    /// Decoded meals for `user_id` paired with their row index.
    fn user_meals(&self, user_id: &str) -> Result<Vec<(usize, Meal)>, StoreError> {
        decode_rows(&self.client.read_rows(MEALS)?, meal_from_row)
            .map(|rows| rows.into_iter().filter(|(_, m)| m.user_id == user_id).collect())
    }

    fn user_weights(&self, user_id: &str) -> Result<Vec<(usize, WeightEntry)>, StoreError> {
        decode_rows(&self.client.read_rows(WEIGHT_LOG)?, weight_from_row)
            .map(|rows| rows.into_iter().filter(|(_, w)| w.user_id == user_id).collect())
    }

    fn user_memories(&self, user_id: &str) -> Result<Vec<(usize, MemoryItem)>, StoreError> {
        decode_rows(&self.client.read_rows(MEMORY_BANK)?, memory_from_row)
            .map(|rows| rows.into_iter().filter(|(_, m)| m.user_id == user_id).collect())
    }
}

impl<C: SheetClient> NutritionStore for SheetStore<C> {
    fn backend(&self) -> &'static str {
        "sheets"
    }

    fn insert_meal(&self, meal: NewMeal) -> Result<Meal, StoreError> {
        let _guard = self.lock();
        let id = self.allocate_id(MEALS, &self.client.read_rows(MEALS)?)?;
        let meal = meal.with_id(id);
        self.client.append_row(MEALS, meal_to_row(&meal))?;
        debug!(id, "sheets: meal appended");
        Ok(meal)
    }

    fn meal(&self, user_id: &str, id: i64) -> Result<Option<Meal>, StoreError> {
        Ok(self
            .user_meals(user_id)?
            .into_iter()
            .map(|(_, m)| m)
            .find(|m| m.id == id))
    }

    fn latest_meal(&self, user_id: &str) -> Result<Option<Meal>, StoreError> {
        Ok(self
            .user_meals(user_id)?
            .into_iter()
            .map(|(_, m)| m)
            .max_by(|a, b| (&a.created_at, a.id).cmp(&(&b.created_at, b.id))))
    }

    fn meals_between(&self, user_id: &str, from: &str, to: &str) -> Result<Vec<Meal>, StoreError> {
        let mut meals: Vec<Meal> = self
            .user_meals(user_id)?
            .into_iter()
            .map(|(_, m)| m)
            .filter(|m| m.date.as_str() >= from && m.date.as_str() <= to)
            .collect();
        meals.sort_by(|a, b| (&a.date, &a.time, a.id).cmp(&(&b.date, &b.time, b.id)));
        Ok(meals)
    }

    fn meals_created_since(&self, user_id: &str, since: &str) -> Result<Vec<Meal>, StoreError> {
        let mut meals: Vec<Meal> = self
            .user_meals(user_id)?
            .into_iter()
            .map(|(_, m)| m)
            .filter(|m| m.created_at.as_str() >= since)
            .collect();
        meals.sort_by(|a, b| (&b.created_at, b.id).cmp(&(&a.created_at, a.id)));
        Ok(meals)
    }

    fn update_meal(&self, meal: &Meal) -> Result<bool, StoreError> {
        let _guard = self.lock();
        match self.user_meals(&meal.user_id)?.into_iter().find(|(_, m)| m.id == meal.id) {
            Some((index, _)) => {
                self.client.update_row(MEALS, index, meal_to_row(meal))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_meal(&self, user_id: &str, id: i64) -> Result<bool, StoreError> {
        let _guard = self.lock();
        match self.user_meals(user_id)?.into_iter().find(|(_, m)| m.id == id) {
            Some((index, _)) => {
                self.client.delete_rows(MEALS, &[index])?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn goals(&self, user_id: &str) -> Result<Option<UserGoals>, StoreError> {
        let rows = decode_rows(&self.client.read_rows(USERS)?, goals_from_row)?;
        Ok(rows.into_iter().map(|(_, g)| g).find(|g| g.user_id == user_id))
    }

    fn upsert_goals(&self, goals: &UserGoals) -> Result<(), StoreError> {
        let _guard = self.lock();
        let rows = decode_rows(&self.client.read_rows(USERS)?, goals_from_row)?;
        match rows.into_iter().find(|(_, g)| g.user_id == goals.user_id) {
            Some((index, _)) => self.client.update_row(USERS, index, goals_to_row(goals)),
            None => self.client.append_row(USERS, goals_to_row(goals)),
        }
    }

    fn insert_weight(&self, entry: NewWeight) -> Result<WeightEntry, StoreError> {
        let _guard = self.lock();
        let rows = self.client.read_rows(WEIGHT_LOG)?;
        let taken = decode_rows(&rows, weight_from_row)?
            .iter()
            .any(|(_, w)| w.user_id == entry.user_id && w.date == entry.date);
        if taken {
            return Err(StoreError::Conflict(format!("weight already recorded for {}", entry.date)));
        }
        let entry = entry.with_id(self.allocate_id(WEIGHT_LOG, &rows)?);
        self.client.append_row(WEIGHT_LOG, weight_to_row(&entry))?;
        Ok(entry)
    }

    fn update_weight(&self, entry: &WeightEntry) -> Result<bool, StoreError> {
        let _guard = self.lock();
        match self.user_weights(&entry.user_id)?.into_iter().find(|(_, w)| w.id == entry.id) {
            Some((index, _)) => {
                self.client.update_row(WEIGHT_LOG, index, weight_to_row(entry))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn weights_since(&self, user_id: &str, from: &str) -> Result<Vec<WeightEntry>, StoreError> {
        let mut entries: Vec<WeightEntry> = self
            .user_weights(user_id)?
            .into_iter()
            .map(|(_, w)| w)
            .filter(|w| w.date.as_str() >= from)
            .collect();
        entries.sort_by(|a, b| (&b.date, b.id).cmp(&(&a.date, a.id)));
        Ok(entries)
    }

    fn weight_before(&self, user_id: &str, before: &str) -> Result<Option<WeightEntry>, StoreError> {
        Ok(self
            .user_weights(user_id)?
            .into_iter()
            .map(|(_, w)| w)
            .filter(|w| w.date.as_str() < before)
            .max_by(|a, b| (&a.date, a.id).cmp(&(&b.date, b.id))))
    }

    fn delete_weight(&self, user_id: &str, id: i64) -> Result<bool, StoreError> {
        let _guard = self.lock();
        match self.user_weights(user_id)?.into_iter().find(|(_, w)| w.id == id) {
            Some((index, _)) => {
                self.client.delete_rows(WEIGHT_LOG, &[index])?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn insert_memory(&self, item: NewMemory) -> Result<MemoryItem, StoreError> {
        let _guard = self.lock();
        let id = self.allocate_id(MEMORY_BANK, &self.client.read_rows(MEMORY_BANK)?)?;
        let item = item.with_id(id);
        self.client.append_row(MEMORY_BANK, memory_to_row(&item))?;
        Ok(item)
    }

    fn memories(&self, user_id: &str, memory_type: Option<MemoryType>) -> Result<Vec<MemoryItem>, StoreError> {
        let mut items: Vec<MemoryItem> = self
            .user_memories(user_id)?
            .into_iter()
            .map(|(_, m)| m)
            .filter(|m| memory_type.is_none_or(|t| m.memory_type == t))
            .collect();
        items.sort_by(|a, b| (&b.created_at, b.id).cmp(&(&a.created_at, a.id)));
        Ok(items)
    }

    fn delete_memories_containing(&self, user_id: &str, needle: &str) -> Result<usize, StoreError> {
        let _guard = self.lock();
        let needle = needle.to_lowercase();
        let indices: Vec<usize> = self
            .user_memories(user_id)?
            .into_iter()
            .filter(|(_, m)| m.content.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect();
        if !indices.is_empty() {
            self.client.delete_rows(MEMORY_BANK, &indices)?;
        }
        Ok(indices.len())
    }
}

// ── Row codecs ────────────────────────────────────────────────────────────────

fn decode_rows<T>(
    rows: &[Vec<String>],
    decode: fn(&[String]) -> Result<T, StoreError>,
) -> Result<Vec<(usize, T)>, StoreError> {
    rows.iter()
        .enumerate()
        // Blank rows can be left behind by manual edits in the spreadsheet UI.
        .filter(|(_, row)| row.iter().any(|c| !c.trim().is_empty()))
        .map(|(i, row)| decode(row).map(|v| (i, v)))
        .collect()
}

/// Largest id in column A, 0 for an empty sheet.
fn max_id(rows: &[Vec<String>]) -> i64 {
    rows.iter()
        .filter_map(|r| r.first().and_then(|c| c.trim().parse::<i64>().ok()))
        .max()
        .unwrap_or(0)
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|s| s.as_str()).unwrap_or("")
}

fn optional(row: &[String], index: usize) -> Option<String> {
    Some(cell(row, index).to_string()).filter(|s| !s.is_empty())
}

fn parse<T>(table: &'static str, column: &str, value: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| StoreError::Corrupt {
        table,
        message: format!("{column} = '{value}': {e}"),
    })
}

/// Empty numeric cells read as zero.
fn number(table: &'static str, column: &str, value: &str) -> Result<f64, StoreError> {
    if value.trim().is_empty() {
        return Ok(0.0);
    }
    parse(table, column, value)
}

fn meal_to_row(m: &Meal) -> Vec<String> {
    vec![
        m.id.to_string(),
        m.user_id.clone(),
        m.date.clone(),
        m.time.clone(),
        m.meal_type.to_string(),
        m.description.clone(),
        m.macros.calories.to_string(),
        m.macros.protein.to_string(),
        m.macros.fat.to_string(),
        m.macros.carbs.to_string(),
        m.source.to_string(),
        m.created_at.clone(),
    ]
}

fn meal_from_row(row: &[String]) -> Result<Meal, StoreError> {
    Ok(Meal {
        id: parse(MEALS, "id", cell(row, 0))?,
        user_id: cell(row, 1).to_string(),
        date: cell(row, 2).to_string(),
        time: cell(row, 3).to_string(),
        meal_type: parse::<MealType>(MEALS, "meal_type", cell(row, 4))?,
        description: cell(row, 5).to_string(),
        macros: Macros {
            calories: number(MEALS, "calories", cell(row, 6))?,
            protein: number(MEALS, "protein", cell(row, 7))?,
            fat: number(MEALS, "fat", cell(row, 8))?,
            carbs: number(MEALS, "carbs", cell(row, 9))?,
        },
        source: parse::<MealSource>(MEALS, "source", cell(row, 10))?,
        created_at: cell(row, 11).to_string(),
    })
}

fn goals_to_row(g: &UserGoals) -> Vec<String> {
    vec![
        g.user_id.clone(),
        g.name.clone().unwrap_or_default(),
        g.goal_type.to_string(),
        g.daily_calories.to_string(),
        g.daily_protein.to_string(),
        g.daily_fat.to_string(),
        g.daily_carbs.to_string(),
        g.updated_at.clone(),
    ]
}

fn goals_from_row(row: &[String]) -> Result<UserGoals, StoreError> {
    Ok(UserGoals {
        user_id: cell(row, 0).to_string(),
        name: optional(row, 1),
        goal_type: parse(USERS, "goal_type", cell(row, 2))?,
        daily_calories: number(USERS, "daily_calories", cell(row, 3))?,
        daily_protein: number(USERS, "daily_protein", cell(row, 4))?,
        daily_fat: number(USERS, "daily_fat", cell(row, 5))?,
        daily_carbs: number(USERS, "daily_carbs", cell(row, 6))?,
        updated_at: cell(row, 7).to_string(),
    })
}

fn weight_to_row(w: &WeightEntry) -> Vec<String> {
    vec![
        w.id.to_string(),
        w.user_id.clone(),
        w.date.clone(),
        w.time.clone(),
        w.weight.to_string(),
        w.note.clone().unwrap_or_default(),
        w.created_at.clone(),
    ]
}

fn weight_from_row(row: &[String]) -> Result<WeightEntry, StoreError> {
    Ok(WeightEntry {
        id: parse(WEIGHT_LOG, "id", cell(row, 0))?,
        user_id: cell(row, 1).to_string(),
        date: cell(row, 2).to_string(),
        time: cell(row, 3).to_string(),
        weight: parse(WEIGHT_LOG, "weight", cell(row, 4))?,
        note: optional(row, 5),
        created_at: cell(row, 6).to_string(),
    })
}

fn memory_to_row(m: &MemoryItem) -> Vec<String> {
    vec![
        m.id.to_string(),
        m.user_id.clone(),
        m.memory_type.to_string(),
        m.content.clone(),
        m.metadata.clone().unwrap_or_default(),
        m.created_at.clone(),
    ]
}

fn memory_from_row(row: &[String]) -> Result<MemoryItem, StoreError> {
    Ok(MemoryItem {
        id: parse(MEMORY_BANK, "id", cell(row, 0))?,
        user_id: cell(row, 1).to_string(),
        memory_type: parse(MEMORY_BANK, "memory_type", cell(row, 2))?,
        content: cell(row, 3).to_string(),
        metadata: optional(row, 4),
        created_at: cell(row, 5).to_string(),
    })
}

// ── In-memory client ──────────────────────────────────────────────────────────

/// [`SheetClient`] over process memory.  Used by tests and for dry runs.
#[derive(Debug, Default)]
pub struct InMemorySheets {
    sheets: Mutex<HashMap<String, (Vec<String>, Vec<Vec<String>>)>>,
}

impl InMemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Header row of `title`, if the sheet exists.
    pub fn header(&self, title: &str) -> Option<Vec<String>> {
        self.guard().get(title).map(|(h, _)| h.clone())
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, HashMap<String, (Vec<String>, Vec<Vec<String>>)>> {
        self.sheets.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn missing(title: &str) -> StoreError {
        StoreError::Unavailable(format!("sheets: no worksheet named '{title}'"))
    }
}

impl SheetClient for InMemorySheets {
    fn ensure_sheet(&self, title: &str, header: &[&str]) -> Result<(), StoreError> {
        self.guard()
            .entry(title.to_string())
            .or_insert_with(|| (header.iter().map(|h| h.to_string()).collect(), Vec::new()));
        Ok(())
    }

    fn read_rows(&self, title: &str) -> Result<Vec<Vec<String>>, StoreError> {
        self.guard().get(title).map(|(_, rows)| rows.clone()).ok_or_else(|| Self::missing(title))
    }

    fn append_row(&self, title: &str, row: Vec<String>) -> Result<(), StoreError> {
        let mut sheets = self.guard();
        let (_, rows) = sheets.get_mut(title).ok_or_else(|| Self::missing(title))?;
        rows.push(row);
        Ok(())
    }

    fn update_row(&self, title: &str, index: usize, row: Vec<String>) -> Result<(), StoreError> {
        let mut sheets = self.guard();
        let (_, rows) = sheets.get_mut(title).ok_or_else(|| Self::missing(title))?;
        let slot = rows
            .get_mut(index)
            .ok_or_else(|| StoreError::Unavailable(format!("sheets: row {index} out of range in '{title}'")))?;
        *slot = row;
        Ok(())
    }

    fn delete_rows(&self, title: &str, indices: &[usize]) -> Result<(), StoreError> {
        let mut sheets = self.guard();
        let (_, rows) = sheets.get_mut(title).ok_or_else(|| Self::missing(title))?;
        let mut sorted = indices.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        for index in sorted {
            if index < rows.len() {
                rows.remove(index);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SheetStore<InMemorySheets> {
        SheetStore::open(InMemorySheets::new()).unwrap()
    }

    fn meal(user: &str, description: &str, created_at: &str) -> NewMeal {
        NewMeal {
            user_id: user.into(),
            date: created_at[..10].into(),
            time: created_at[11..16].into(),
            meal_type: MealType::Snack,
            description: description.into(),
            macros: Macros { calories: 95.0, protein: 0.5, fat: 0.3, carbs: 25.0 },
            source: MealSource::Text,
            created_at: created_at.into(),
        }
    }

    #[test]
    fn open_creates_worksheets_with_headers() {
        let client = InMemorySheets::new();
        let _ = SheetStore::open(&client).unwrap();
        assert_eq!(client.header(MEALS).unwrap()[0], "id");
        assert_eq!(client.header(USERS).unwrap()[0], "user_id");
        assert!(client.header(WEIGHT_LOG).is_some());
        assert!(client.header(MEMORY_BANK).is_some());
    }

    #[test]
    fn ids_increment_and_survive_deletes() {
        let store = store();
        let a = store.insert_meal(meal("u1", "apple", "2026-10-16 10:00:00")).unwrap();
        let b = store.insert_meal(meal("u1", "banana", "2026-10-16 11:00:00")).unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        assert!(store.delete_meal("u1", a.id).unwrap());
        let c = store.insert_meal(meal("u1", "cherry", "2026-10-16 12:00:00")).unwrap();
        assert_eq!(c.id, 3);
        assert_eq!(store.latest_meal("u1").unwrap().unwrap().description, "cherry");
    }

    #[test]
    fn deleted_newest_id_is_not_reused() {
        let client = InMemorySheets::new();
        let store = SheetStore::open(&client).unwrap();
        store.insert_meal(meal("u1", "apple", "2026-10-16 10:00:00")).unwrap();
        let b = store.insert_meal(meal("u1", "banana", "2026-10-16 11:00:00")).unwrap();
        assert!(store.delete_meal("u1", b.id).unwrap());
        drop(store);

        let reopened = SheetStore::open(&client).unwrap();
        let c = reopened.insert_meal(meal("u1", "cherry", "2026-10-16 12:00:00")).unwrap();
        assert_eq!(c.id, 3);
        assert!(reopened.meal("u1", b.id).unwrap().is_none());
    }

    #[test]
    fn rows_are_scoped_by_user() {
        let store = store();
        let theirs = store.insert_meal(meal("u2", "pizza", "2026-10-16 20:00:00")).unwrap();
        assert!(store.meal("u1", theirs.id).unwrap().is_none());
        assert!(!store.delete_meal("u1", theirs.id).unwrap());
        assert!(store.meal("u2", theirs.id).unwrap().is_some());
    }

    #[test]
    fn trailing_empty_cells_decode() {
        let client = InMemorySheets::new();
        let store = SheetStore::open(&client).unwrap();
        // The Sheets API drops trailing empty cells; note is column F.
        client
            .append_row(WEIGHT_LOG, vec!["1".into(), "u1".into(), "2026-10-16".into(), "07:00".into(), "80.2".into()])
            .unwrap();
        let entry = store.latest_weight("u1").unwrap().unwrap();
        assert_eq!(entry.weight, 80.2);
        assert!(entry.note.is_none());
        assert_eq!(entry.created_at, "");
    }

    #[test]
    fn weight_conflict_on_same_date() {
        let store = store();
        let entry = NewWeight {
            user_id: "u1".into(),
            date: "2026-10-16".into(),
            time: "07:00".into(),
            weight: 80.0,
            note: Some("morning".into()),
            created_at: "2026-10-16 07:00:00".into(),
        };
        store.insert_weight(entry.clone()).unwrap();
        assert!(matches!(store.insert_weight(entry), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn corrupt_cell_is_reported() {
        let client = InMemorySheets::new();
        let store = SheetStore::open(&client).unwrap();
        let mut row = meal_to_row(&meal("u1", "tea", "2026-10-16 09:00:00").with_id(1));
        row[6] = "lots".into();
        client.append_row(MEALS, row).unwrap();
        assert!(matches!(store.meal("u1", 1), Err(StoreError::Corrupt { table: MEALS, .. })));
    }
}
