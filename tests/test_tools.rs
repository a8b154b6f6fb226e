//! The meal/goal/weight tools against each storage backend.
//!
//! Every scenario runs twice: on a fresh SQLite file and on the spreadsheet
//! store over an in-memory sheet client.

use std::sync::Arc;

use chrono::Duration;
use serde_json::{Value, json};
use tempfile::TempDir;

use nutri_bot::config::NutritionConfig;
use nutri_bot::subsystems::storage::sqlite::SqliteStore;
use nutri_bot::subsystems::storage::{ManualClock, NutritionStore};
use nutri_bot::subsystems::tools::{NutritionTools, ToolStatus};

const START: &str = "2026-10-16 08:30:00";

struct Fixture {
    _dir: Option<TempDir>,
    tools: NutritionTools,
    clock: Arc<ManualClock>,
}

fn with_store(store: Arc<dyn NutritionStore>, dir: Option<TempDir>) -> Fixture {
    let clock = Arc::new(ManualClock::at(START).unwrap());
    let tools = NutritionTools::new(store, clock.clone(), NutritionConfig::default());
    Fixture { _dir: dir, tools, clock }
}

fn sqlite() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("nutrition.db")).unwrap();
    with_store(Arc::new(store), Some(dir))
}

#[cfg(feature = "backend-sheets")]
fn sheets() -> Fixture {
    use nutri_bot::subsystems::storage::sheets::{InMemorySheets, SheetStore};
    let store = SheetStore::open(InMemorySheets::new()).unwrap();
    with_store(Arc::new(store), None)
}

fn backends() -> Vec<(&'static str, Fixture)> {
    #[allow(unused_mut)]
    let mut all = vec![("sqlite", sqlite())];
    #[cfg(feature = "backend-sheets")]
    all.push(("sheets", sheets()));
    all
}

fn breakfast() -> Value {
    json!({
        "description": "Greek yogurt with honey and walnuts",
        "calories": 320,
        "protein": 18.5,
        "fat": 14,
        "carbs": 30.5,
        "meal_type": "breakfast",
    })
}

fn saved_id(out: &nutri_bot::subsystems::tools::ToolOutcome) -> i64 {
    out.data["meal"]["id"].as_i64().expect("meal id")
}

#[test]
fn saved_meal_reads_back_unchanged() {
    for (backend, f) in backends() {
        let out = f.tools.execute("save_meal", "u1", &breakfast());
        assert_eq!(out.status, ToolStatus::Success, "{backend}");

        let today = f.tools.execute("get_today_meals", "u1", &json!({}));
        let meal = &today.data["meals"][0];
        assert_eq!(today.data["count"], 1, "{backend}");
        assert_eq!(meal["id"].as_i64(), Some(saved_id(&out)), "{backend}");
        assert_eq!(meal["description"], "Greek yogurt with honey and walnuts", "{backend}");
        assert_eq!(meal["calories"], 320.0, "{backend}");
        assert_eq!(meal["protein"], 18.5, "{backend}");
        assert_eq!(meal["fat"], 14.0, "{backend}");
        assert_eq!(meal["carbs"], 30.5, "{backend}");
        assert_eq!(meal["meal_type"], "breakfast", "{backend}");
        assert_eq!(meal["date"], "2026-10-16", "{backend}");
    }
}

#[test]
fn edit_touches_only_named_fields() {
    for (backend, f) in backends() {
        let id = saved_id(&f.tools.execute("save_meal", "u1", &breakfast()));
        let out = f.tools.execute("edit_meal", "u1", &json!({ "meal_id": id, "fat": 9 }));
        assert_eq!(out.status, ToolStatus::Updated, "{backend}");

        let meal = &f.tools.execute("get_today_meals", "u1", &json!({})).data["meals"][0];
        assert_eq!(meal["fat"], 9.0, "{backend}");
        assert_eq!(meal["calories"], 320.0, "{backend}");
        assert_eq!(meal["protein"], 18.5, "{backend}");
        assert_eq!(meal["description"], "Greek yogurt with honey and walnuts", "{backend}");
    }
}

#[test]
fn deleted_meal_disappears() {
    for (backend, f) in backends() {
        let first = saved_id(&f.tools.execute("save_meal", "u1", &breakfast()));
        f.clock.advance(Duration::hours(4));
        f.tools.execute(
            "save_meal",
            "u1",
            &json!({ "description": "chicken salad", "calories": 450, "protein": 35, "fat": 20, "carbs": 15 }),
        );

        let out = f.tools.execute("delete_meal", "u1", &json!({ "meal_id": first }));
        assert_eq!(out.status, ToolStatus::Success, "{backend}");

        let today = f.tools.execute("get_today_meals", "u1", &json!({}));
        assert_eq!(today.data["count"], 1, "{backend}");
        assert_eq!(today.data["meals"][0]["description"], "chicken salad", "{backend}");
    }
}

#[test]
fn daily_totals_sum_the_days_meals() {
    for (backend, f) in backends() {
        f.tools.execute("save_meal", "u1", &breakfast());
        f.clock.advance(Duration::hours(4));
        f.tools.execute(
            "save_meal",
            "u1",
            &json!({ "description": "lentil soup", "calories": 230.5, "protein": 16, "fat": 4.5, "carbs": 35.5 }),
        );
        // Another user's meal stays out of the total.
        f.tools.execute("save_meal", "u2", &breakfast());

        let totals = &f.tools.execute("get_today_meals", "u1", &json!({})).data["totals"];
        assert_eq!(totals["calories"], 550.5, "{backend}");
        assert_eq!(totals["protein"], 34.5, "{backend}");
        assert_eq!(totals["fat"], 18.5, "{backend}");
        assert_eq!(totals["carbs"], 66.0, "{backend}");

        let progress = f.tools.execute("get_daily_progress", "u1", &json!({}));
        assert_eq!(progress.data["calories"]["consumed"], 550.5, "{backend}");
    }
}

#[test]
fn duplicate_guard_expires_after_window() {
    for (backend, f) in backends() {
        assert_eq!(f.tools.execute("save_meal", "u1", &breakfast()).status, ToolStatus::Success);

        f.clock.advance(Duration::minutes(2));
        let mut again = breakfast();
        again["description"] = json!("greek Yogurt with  HONEY and walnuts");
        let dup = f.tools.execute("save_meal", "u1", &again);
        assert_eq!(dup.status, ToolStatus::DuplicatePrevented, "{backend}");
        assert!(dup.data["existing_meal"]["id"].is_i64(), "{backend}");

        f.clock.advance(Duration::minutes(4));
        assert_eq!(f.tools.execute("save_meal", "u1", &again).status, ToolStatus::Success, "{backend}");
        assert_eq!(f.tools.execute("get_today_meals", "u1", &json!({})).data["count"], 2, "{backend}");
    }
}

#[test]
fn weight_same_day_replaces_entry() {
    for (backend, f) in backends() {
        f.tools.execute("save_weight", "u1", &json!({ "weight": 82.0 }));
        f.clock.advance(Duration::days(1));
        f.tools.execute("save_weight", "u1", &json!({ "weight": 81.6 }));
        let second = f.tools.execute("save_weight", "u1", &json!({ "weight": 81.4, "note": "after run" }));
        assert_eq!(second.status, ToolStatus::Updated, "{backend}");

        let history = f.tools.execute("get_weight_history", "u1", &json!({ "days": 7 }));
        let entries = history.data["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2, "{backend}");
        assert_eq!(entries[0]["weight"], 81.4, "{backend}");
        assert_eq!(entries[0]["note"], "after run", "{backend}");
    }
}

#[test]
fn memories_are_scoped_to_user() {
    for (backend, f) in backends() {
        f.tools.execute("store_memory", "u1", &json!({ "memory_type": "allergy", "content": "peanuts" }));
        let theirs = f.tools.execute("recall_memories", "u2", &json!({}));
        assert_eq!(theirs.data["count"], 0, "{backend}");
        let mine = f.tools.execute("recall_memories", "u1", &json!({}));
        assert_eq!(mine.data["memories"]["allergy"][0]["content"], "peanuts", "{backend}");
    }
}

#[test]
fn forget_memory_folds_non_ascii_case() {
    for (backend, f) in backends() {
        f.tools.execute("store_memory", "u1", &json!({ "memory_type": "habit", "content": "Кофе каждое утро" }));
        f.tools.execute("store_memory", "u1", &json!({ "memory_type": "preference", "content": "Любит гречку" }));

        let out = f.tools.execute("forget_memory", "u1", &json!({ "content_substring": "кофе" }));
        assert_eq!(out.status, ToolStatus::Success, "{backend}");
        assert_eq!(out.data["removed"], 1, "{backend}");

        let left = f.tools.execute("recall_memories", "u1", &json!({}));
        assert_eq!(left.data["count"], 1, "{backend}");
        assert_eq!(left.data["memories"]["preference"][0]["content"], "Любит гречку", "{backend}");
    }
}

#[test]
fn deleted_meal_id_is_never_reused() {
    for (backend, f) in backends() {
        f.tools.execute("save_meal", "u1", &breakfast());
        f.clock.advance(Duration::hours(4));
        let lunch = json!({ "description": "chicken salad", "calories": 450, "protein": 35, "fat": 20, "carbs": 15 });
        let second = saved_id(&f.tools.execute("save_meal", "u1", &lunch));
        f.tools.execute("delete_last_meal", "u1", &json!({}));

        f.clock.advance(Duration::hours(4));
        let dinner = json!({ "description": "baked salmon", "calories": 520, "protein": 40, "fat": 28, "carbs": 10 });
        let third = saved_id(&f.tools.execute("save_meal", "u1", &dinner));
        assert!(third > second, "{backend}: id {third} reused");
        let gone = f.tools.execute("get_meals_by_date", "u1", &json!({ "date": "2026-10-16" }));
        assert_eq!(gone.data["count"], 2, "{backend}");
    }
}
